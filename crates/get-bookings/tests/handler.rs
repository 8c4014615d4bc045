use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use blp_get_bookings::handler::GetBookings;
use blp_store::{Booking, BookingRepository, FieldCipher, KeyService, StoreError};
use lambda_http::{Body, Request};
use serde_json::Value;

struct FakeBookingStore {
    bookings: Vec<Booking>,
}

#[async_trait]
impl BookingRepository for FakeBookingStore {
    async fn by_capsule(&self, capsule_id: &str) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|booking| booking.capsule_id == capsule_id)
            .cloned()
            .collect())
    }

    async fn by_company_week(
        &self,
        company: &str,
        start_of_week: &str,
        location: &str,
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|booking| {
                booking.company == company
                    && booking.start_of_week == start_of_week
                    && booking.location == location
            })
            .cloned()
            .collect())
    }

    async fn scan_all(&self) -> Result<Vec<Booking>, StoreError> {
        Ok(self.bookings.clone())
    }
}

struct FailingBookingStore;

#[async_trait]
impl BookingRepository for FailingBookingStore {
    async fn by_capsule(&self, _capsule_id: &str) -> Result<Vec<Booking>, StoreError> {
        Err(store_down())
    }

    async fn by_company_week(
        &self,
        _company: &str,
        _start_of_week: &str,
        _location: &str,
    ) -> Result<Vec<Booking>, StoreError> {
        Err(store_down())
    }

    async fn scan_all(&self) -> Result<Vec<Booking>, StoreError> {
        Err(store_down())
    }
}

fn store_down() -> StoreError {
    StoreError {
        code: "ERR_DYNAMODB",
        message: "table unavailable".to_string(),
    }
}

struct TaggingKeyService;

#[async_trait]
impl KeyService for TaggingKeyService {
    async fn encrypt(&self, plaintext: &str) -> Result<String, StoreError> {
        Ok(format!("enc:{plaintext}"))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String, StoreError> {
        ciphertext
            .strip_prefix("enc:")
            .map(str::to_string)
            .ok_or_else(|| StoreError {
                code: "ERR_KMS",
                message: "not a ciphertext".to_string(),
            })
    }
}

fn booking(capsule_id: &str, company: &str, start_of_week: &str, location: &str) -> Booking {
    Booking {
        capsule_id: capsule_id.to_string(),
        activity_date: "2022-01-04".to_string(),
        company: company.to_string(),
        start_of_week: start_of_week.to_string(),
        location: location.to_string(),
        nric_sha: "enc:S1234567D".to_string(),
        bags: HashMap::new(),
    }
}

fn handler_with(bookings: Vec<Booking>) -> GetBookings {
    GetBookings::new(
        Arc::new(FakeBookingStore { bookings }),
        FieldCipher::new(Arc::new(TaggingKeyService)),
        Some("*".to_string()),
    )
}

fn request(body: &str) -> Request {
    Request::new(Body::Text(body.to_string()))
}

fn decode_rows(body: &str) -> Vec<Value> {
    let decoded: Value = serde_json::from_str(body).expect("body must be JSON");
    decoded.as_array().cloned().expect("body must be an array")
}

#[tokio::test]
async fn unknown_query_param_is_a_400() {
    let handler = handler_with(vec![booking("888888", "CAG", "2022-01-03", "Airport")]);

    let response = handler.handle(&request(r#"{"bad_param":"0000"}"#)).await;

    assert_eq!(response.status_code, 400);
    assert!(response.body.contains("fields that are not expected"));
}

#[tokio::test]
async fn invalid_json_body_is_a_400() {
    let handler = handler_with(Vec::new());
    let response = handler.handle(&request("0000")).await;
    assert_eq!(response.status_code, 400);
}

#[tokio::test]
async fn capsule_query_returns_the_projected_decrypted_record() {
    let handler = handler_with(vec![
        booking("888888", "CAG", "2022-01-03", "Airport"),
        booking("777777", "Certis", "2022-01-03", "Harbour"),
    ]);

    let response = handler.handle(&request(r#"{"capsule_id":"888888"}"#)).await;

    assert_eq!(response.status_code, 200);
    let rows = decode_rows(&response.body);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["capsule_id"], "888888");
    assert_eq!(rows[0]["nric_sha"], "S1234567D");
    // Only the declared output keys survive projection.
    assert!(rows[0].get("start_of_week").is_none());
    assert!(rows[0].get("bags").is_none());
}

#[tokio::test]
async fn company_week_query_filters_on_all_three_conditions() {
    let handler = handler_with(vec![
        booking("888888", "CAG", "2022-01-03", "Airport"),
        booking("777777", "CAG", "2022-01-03", "Harbour"),
        booking("666666", "CAG", "2022-01-10", "Airport"),
    ]);

    let response = handler
        .handle(&request(
            r#"{"company":"CAG","start_of_week":"2022-01-03","location":"Airport"}"#,
        ))
        .await;

    assert_eq!(response.status_code, 200);
    let rows = decode_rows(&response.body);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["capsule_id"], "888888");
}

#[tokio::test]
async fn empty_body_scans_every_record() {
    let handler = handler_with(vec![
        booking("888888", "CAG", "2022-01-03", "Airport"),
        booking("777777", "Certis", "2022-01-03", "Harbour"),
    ]);

    let response = handler.handle(&request("{}")).await;

    assert_eq!(response.status_code, 200);
    let rows = decode_rows(&response.body);
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.as_object().map(|object| object.len()), Some(5));
    }
}

#[tokio::test]
async fn no_matching_rows_is_an_empty_200() {
    let handler = handler_with(vec![booking("888888", "CAG", "2022-01-03", "Airport")]);

    let response = handler.handle(&request(r#"{"capsule_id":"000000"}"#)).await;

    assert_eq!(response.status_code, 200);
    assert!(decode_rows(&response.body).is_empty());
}

#[tokio::test]
async fn store_failure_is_a_500_with_no_detail() {
    let handler = GetBookings::new(
        Arc::new(FailingBookingStore),
        FieldCipher::new(Arc::new(TaggingKeyService)),
        None,
    );

    let response = handler.handle(&request("{}")).await;

    assert_eq!(response.status_code, 500);
    assert_eq!(response.body, "");
}

#[tokio::test]
async fn responses_always_carry_the_security_headers() {
    let handler = handler_with(Vec::new());
    let response = handler.handle(&request("{}")).await;

    assert!(response.headers.contains_key("Strict-Transport-Security"));
    assert_eq!(
        response.headers.get("Access-Control-Allow-Origin").map(String::as_str),
        Some("*")
    );
}
