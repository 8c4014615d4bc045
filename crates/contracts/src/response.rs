use std::collections::BTreeMap;

use lambda_http::Body;
use serde::Serialize;
use serde_json::Value;

/// API Gateway proxy response envelope. Built once per invocation; the
/// header set is fixed apart from the optional CORS origin, so two builds
/// with the same arguments are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiGwResponse {
    pub is_base64_encoded: bool,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ApiGwResponse {
    pub fn new(
        status_code: u16,
        body: String,
        cors: Option<&str>,
        is_base64_encoded: bool,
    ) -> Self {
        Self {
            is_base64_encoded,
            status_code,
            headers: secure_headers(cors),
            body,
        }
    }

    /// Envelope around a structured body. A JSON string value passes
    /// through unchanged; anything else is serialized.
    pub fn json(status_code: u16, body: &Value, cors: Option<&str>) -> Self {
        let body = match body {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        Self::new(status_code, body, cors, false)
    }

    pub fn text(status_code: u16, body: impl Into<String>, cors: Option<&str>) -> Self {
        Self::new(status_code, body.into(), cors, false)
    }

    pub fn empty(status_code: u16, cors: Option<&str>) -> Self {
        Self::new(status_code, String::new(), cors, false)
    }

    pub fn into_response(self) -> Result<lambda_http::Response<Body>, lambda_http::http::Error> {
        let mut builder = lambda_http::Response::builder().status(self.status_code);
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        builder.body(Body::Text(self.body))
    }
}

/// The fixed security-header set every response carries. The CORS origin
/// is appended only when one is configured.
pub fn secure_headers(cors: Option<&str>) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("X-Content-Type-Options".to_string(), "nosniff".to_string());
    headers.insert(
        "Strict-Transport-Security".to_string(),
        "max-age=16070400; includeSubDomains".to_string(),
    );
    headers.insert("X-XSS-Protection".to_string(), "1; mode=block".to_string());
    headers.insert("X-Frame-Options".to_string(), "SAMEORIGIN".to_string());
    headers.insert("Cache-Control".to_string(), "no-store".to_string());
    headers.insert(
        "content-security-policy".to_string(),
        "default-src 'self'; object-src 'none';".to_string(),
    );
    headers.insert(
        "x-permitted-cross-domain-policies".to_string(),
        "master-only".to_string(),
    );
    if let Some(origin) = cors {
        headers.insert("Access-Control-Allow-Origin".to_string(), origin.to_string());
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_is_idempotent() {
        let a = ApiGwResponse::json(200, &serde_json::json!({"a": 1}), Some("*"));
        let b = ApiGwResponse::json(200, &serde_json::json!({"a": 1}), Some("*"));
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn structured_body_round_trips() {
        let response = ApiGwResponse::json(200, &serde_json::json!({"a": 1}), None);
        let decoded: Value = serde_json::from_str(&response.body).unwrap();
        assert_eq!(decoded, serde_json::json!({"a": 1}));
    }

    #[test]
    fn string_body_passes_through_unchanged() {
        let response = ApiGwResponse::json(400, &Value::String("bad input".to_string()), None);
        assert_eq!(response.body, "bad input");
    }

    #[test]
    fn headers_carry_the_fixed_security_set() {
        let response = ApiGwResponse::empty(204, None);
        assert_eq!(response.headers.len(), 8);
        assert_eq!(
            response.headers.get("Content-Type").map(String::as_str),
            Some("application/json")
        );
        assert_eq!(
            response.headers.get("X-Content-Type-Options").map(String::as_str),
            Some("nosniff")
        );
        assert_eq!(
            response.headers.get("Cache-Control").map(String::as_str),
            Some("no-store")
        );
        assert!(!response.headers.contains_key("Access-Control-Allow-Origin"));
    }

    #[test]
    fn cors_header_appears_only_when_configured() {
        let with = secure_headers(Some("https://app.example"));
        assert_eq!(
            with.get("Access-Control-Allow-Origin").map(String::as_str),
            Some("https://app.example")
        );

        let without = secure_headers(None);
        assert!(!without.contains_key("Access-Control-Allow-Origin"));
    }

    #[test]
    fn envelope_serializes_with_transport_field_names() {
        let response = ApiGwResponse::empty(404, None);
        let encoded = serde_json::to_value(&response).unwrap();
        assert_eq!(encoded["statusCode"], 404);
        assert_eq!(encoded["isBase64Encoded"], false);
        assert!(encoded["headers"].is_object());
    }

    #[test]
    fn into_response_keeps_status_and_headers() {
        let response = ApiGwResponse::text(401, "", Some("*"))
            .into_response()
            .unwrap();
        assert_eq!(response.status(), 401);
        assert_eq!(
            response
                .headers()
                .get("Access-Control-Allow-Origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }
}
