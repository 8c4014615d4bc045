use std::sync::Arc;

use blp_contracts::{ApiError, ApiGwResponse};
use blp_dispatch::{api_response_handler, request_body_text};
use blp_store::{project_row, Booking, BookingRepository, FieldCipher};
use blp_validation::parse_record;
use lambda_http::Request;
use serde_json::Value;

use crate::input::BookingQuery;

pub const BOOKING_OUTPUT_KEYS: &[&str] =
    &["company", "location", "capsule_id", "activity_date", "nric_sha"];
pub const ENCRYPTED_BOOKING_KEYS: &[&str] = &["nric_sha"];

/// Booking lookup endpoint. Parsing and querying happen inside the
/// business path; the response wrapper maps the outcome, so an empty
/// result is a valid 200 with an empty list.
pub struct GetBookings {
    repository: Arc<dyn BookingRepository>,
    cipher: FieldCipher,
    cors: Option<String>,
}

impl GetBookings {
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        cipher: FieldCipher,
        cors: Option<String>,
    ) -> Self {
        Self {
            repository,
            cipher,
            cors,
        }
    }

    pub async fn handle(&self, request: &Request) -> ApiGwResponse {
        api_response_handler(self.cors.as_deref(), self.run(request)).await
    }

    async fn run(&self, request: &Request) -> Result<Value, ApiError> {
        let raw_body = request_body_text(request)?;
        let query: BookingQuery = parse_record(&raw_body)?;
        let bookings = self.find_relevant_bookings(&query).await?;
        self.map_to_output(bookings).await
    }

    async fn find_relevant_bookings(
        &self,
        query: &BookingQuery,
    ) -> Result<Vec<Booking>, ApiError> {
        let capsule_id = query.capsule_id.as_deref().filter(|value| !value.is_empty());
        let company = query.company.as_deref().filter(|value| !value.is_empty());

        let bookings = if let Some(capsule_id) = capsule_id {
            self.repository.by_capsule(capsule_id).await?
        } else if let Some(company) = company {
            self.repository
                .by_company_week(
                    company,
                    query.start_of_week.as_deref().unwrap_or_default(),
                    query.location.as_deref().unwrap_or_default(),
                )
                .await?
        } else {
            self.repository.scan_all().await?
        };

        Ok(bookings)
    }

    async fn map_to_output(&self, bookings: Vec<Booking>) -> Result<Value, ApiError> {
        let mut output = Vec::with_capacity(bookings.len());

        for booking in bookings {
            let mut row = booking.into_row();
            project_row(&mut row, BOOKING_OUTPUT_KEYS);
            self.cipher
                .decrypt_fields(&mut row, ENCRYPTED_BOOKING_KEYS)
                .await?;
            output.push(Value::Object(row));
        }

        Ok(Value::Array(output))
    }
}
