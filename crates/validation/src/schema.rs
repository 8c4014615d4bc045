//! Declarative record schemas and the event-body parser.
//!
//! A record type declares a static [`RecordSchema`] (ordered field
//! descriptors) and a constructor from the parsed field values. The parser
//! enforces exactly the declared field set and the per-field coercions,
//! so handlers only ever see a well-formed record.

use blp_contracts::ApiError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde_json::{Map, Value};

use crate::value_text;

/// One field of a request record: its name, whether the record admits its
/// absence, and optional coercion metadata.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
    pub pattern: Option<&'static str>,
    pub date_format: Option<&'static str>,
}

impl FieldSpec {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
            pattern: None,
            date_format: None,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            pattern: None,
            date_format: None,
        }
    }

    pub const fn with_pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub const fn with_date_format(mut self, format: &'static str) -> Self {
        self.date_format = Some(format);
        self
    }
}

/// Ordered field descriptors for one record type.
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    pub fields: &'static [FieldSpec],
}

/// A field value after coercion, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Absent,
    Date(NaiveDateTime),
    Raw(Value),
}

/// The parsed field values of one request body, positionally aligned with
/// the schema's declaration order.
#[derive(Debug)]
pub struct ParsedRecord {
    values: Vec<(&'static str, ParsedValue)>,
}

impl ParsedRecord {
    pub fn value(&self, index: usize) -> Result<&ParsedValue, RecordError> {
        self.values
            .get(index)
            .map(|(_, value)| value)
            .ok_or_else(|| RecordError::new(format!("no field declared at position {index}")))
    }

    pub fn opt_string(&self, index: usize) -> Result<Option<String>, RecordError> {
        match self.value(index)? {
            ParsedValue::Absent => Ok(None),
            ParsedValue::Raw(Value::String(text)) => Ok(Some(text.clone())),
            other => Err(self.type_error(index, "a string", other)),
        }
    }

    pub fn opt_f64(&self, index: usize) -> Result<Option<f64>, RecordError> {
        match self.value(index)? {
            ParsedValue::Absent => Ok(None),
            ParsedValue::Raw(Value::Number(number)) => Ok(number.as_f64()),
            other => Err(self.type_error(index, "a number", other)),
        }
    }

    pub fn opt_date(&self, index: usize) -> Result<Option<NaiveDateTime>, RecordError> {
        match self.value(index)? {
            ParsedValue::Absent => Ok(None),
            ParsedValue::Date(parsed) => Ok(Some(*parsed)),
            other => Err(self.type_error(index, "a parsed date", other)),
        }
    }

    fn type_error(&self, index: usize, expected: &str, got: &ParsedValue) -> RecordError {
        let name = self
            .values
            .get(index)
            .map(|(name, _)| *name)
            .unwrap_or("<unknown>");
        RecordError::new(format!("field `{name}` is not {expected}: {got:?}"))
    }
}

/// Record construction failure; wrapped into `BadRequest` at the parser
/// boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    message: String,
}

impl RecordError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RecordError {}

/// A request record type constructible from its parsed field values.
pub trait FromRecord: Sized {
    const SCHEMA: RecordSchema;

    fn from_record(record: &ParsedRecord) -> Result<Self, RecordError>;
}

/// Decode and validate a raw request body against `T`'s schema.
///
/// Pure function of its inputs: the same body and schema always produce
/// the same outcome.
pub fn parse_record<T: FromRecord>(raw_body: &str) -> Result<T, ApiError> {
    let body = parse_body(raw_body)?;
    let schema = T::SCHEMA;

    let required: Vec<&str> = schema
        .fields
        .iter()
        .filter(|field| field.required)
        .map(|field| field.name)
        .collect();
    if !required.iter().all(|field| body.contains_key(*field)) {
        return Err(ApiError::BadRequest(format!(
            "{raw_body} does not contain all of these fields {required:?}"
        )));
    }

    let declared: Vec<&str> = schema.fields.iter().map(|field| field.name).collect();
    if body.keys().any(|key| !declared.contains(&key.as_str())) {
        return Err(ApiError::BadRequest(format!(
            "{raw_body} contains fields that are not expected {declared:?}"
        )));
    }

    let mut values = Vec::with_capacity(schema.fields.len());
    for spec in schema.fields {
        values.push((spec.name, parse_field(spec, &body)?));
    }

    let record = ParsedRecord { values };
    T::from_record(&record).map_err(|err| {
        ApiError::BadRequest(format!("Unable to parse event: {raw_body}. Error: {err}"))
    })
}

fn parse_body(raw_body: &str) -> Result<Map<String, Value>, ApiError> {
    let decoded: Value = serde_json::from_str(raw_body).map_err(|err| {
        ApiError::BadRequest(format!(
            "Unexpected format of input event: {raw_body}. Parsing failed due to error: {err}"
        ))
    })?;

    match decoded {
        Value::Object(map) => Ok(map),
        _ => Err(ApiError::BadRequest(format!(
            "Unexpected format of input event: {raw_body}. Parsing failed due to error: body is not a JSON object"
        ))),
    }
}

fn parse_field(spec: &FieldSpec, body: &Map<String, Value>) -> Result<ParsedValue, ApiError> {
    let value = match body.get(spec.name) {
        None | Some(Value::Null) => return Ok(ParsedValue::Absent),
        Some(value) => value,
    };

    if let Some(format) = spec.date_format {
        // A malformed date is classified as a server-side failure at the
        // dispatch boundary, not a client rejection.
        let text = value_text(value);
        let parsed = parse_date(&text, format).map_err(|err| {
            ApiError::Server(format!(
                "failed to parse field `{}` with format `{}`: {}",
                spec.name, format, err
            ))
        })?;
        return Ok(ParsedValue::Date(parsed));
    }

    if let Some(pattern) = spec.pattern {
        let regex = Regex::new(pattern).map_err(|err| {
            ApiError::Server(format!("invalid pattern for field `{}`: {}", spec.name, err))
        })?;
        let text = value_text(value);
        if !regex.is_match(&text) {
            return Err(ApiError::BadRequest(format!(
                "{} is not a valid format for field {}. It has to conform to this regex: {}",
                text, spec.name, pattern
            )));
        }
    }

    Ok(ParsedValue::Raw(value.clone()))
}

fn parse_date(text: &str, format: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(text, format)
        .or_else(|_| NaiveDate::parse_from_str(text, format).map(|date| date.and_time(NaiveTime::MIN)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns;

    #[derive(Debug, PartialEq)]
    struct ShipmentQuery {
        reference: Option<String>,
        company: Option<String>,
        start_of_week: Option<String>,
    }

    impl FromRecord for ShipmentQuery {
        const SCHEMA: RecordSchema = RecordSchema {
            fields: &[
                FieldSpec::optional("reference"),
                FieldSpec::optional("company"),
                FieldSpec::optional("start_of_week").with_pattern(patterns::DATE_PATTERN),
            ],
        };

        fn from_record(record: &ParsedRecord) -> Result<Self, RecordError> {
            Ok(Self {
                reference: record.opt_string(0)?,
                company: record.opt_string(1)?,
                start_of_week: record.opt_string(2)?,
            })
        }
    }

    #[derive(Debug, PartialEq)]
    struct DelayReport {
        flight_no: String,
        scheduled_dt: Option<NaiveDateTime>,
    }

    impl FromRecord for DelayReport {
        const SCHEMA: RecordSchema = RecordSchema {
            fields: &[
                FieldSpec::required("flight_no"),
                FieldSpec::optional("scheduled_dt").with_date_format(patterns::DATE_FORMAT),
            ],
        };

        fn from_record(record: &ParsedRecord) -> Result<Self, RecordError> {
            let flight_no = record
                .opt_string(0)?
                .ok_or_else(|| RecordError::new("field `flight_no` is required"))?;
            Ok(Self {
                flight_no,
                scheduled_dt: record.opt_date(1)?,
            })
        }
    }

    #[test]
    fn parses_a_fully_populated_body() {
        let parsed: ShipmentQuery = parse_record(
            r#"{"reference":"888888","company":"CAG","start_of_week":"2022-01-03"}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            ShipmentQuery {
                reference: Some("888888".to_string()),
                company: Some("CAG".to_string()),
                start_of_week: Some("2022-01-03".to_string()),
            }
        );
    }

    #[test]
    fn absent_optional_fields_parse_to_none() {
        let parsed: ShipmentQuery = parse_record("{}").unwrap();
        assert_eq!(parsed.reference, None);
        assert_eq!(parsed.company, None);
    }

    #[test]
    fn json_null_counts_as_absent() {
        let parsed: ShipmentQuery = parse_record(r#"{"reference": null}"#).unwrap();
        assert_eq!(parsed.reference, None);
    }

    #[test]
    fn invalid_json_is_a_bad_request() {
        let err = parse_record::<ShipmentQuery>("not json").unwrap_err();
        match err {
            ApiError::BadRequest(message) => {
                assert!(message.contains("Unexpected format of input event"));
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn non_object_json_is_a_bad_request() {
        let err = parse_record::<ShipmentQuery>("[1, 2]").unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn missing_required_field_is_a_bad_request() {
        let err = parse_record::<DelayReport>("{}").unwrap_err();
        match err {
            ApiError::BadRequest(message) => assert!(message.contains("flight_no")),
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn unknown_field_is_a_bad_request() {
        let err = parse_record::<ShipmentQuery>(r#"{"bad_param":"0000"}"#).unwrap_err();
        match err {
            ApiError::BadRequest(message) => {
                assert!(message.contains("fields that are not expected"));
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn pattern_mismatch_names_field_value_and_pattern() {
        let err =
            parse_record::<ShipmentQuery>(r#"{"start_of_week":"03/01/2022"}"#).unwrap_err();
        match err {
            ApiError::BadRequest(message) => {
                assert!(message.contains("03/01/2022"));
                assert!(message.contains("start_of_week"));
                assert!(message.contains(patterns::DATE_PATTERN));
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }

    #[test]
    fn declared_date_format_is_applied() {
        let parsed: DelayReport =
            parse_record(r#"{"flight_no":"SQ108","scheduled_dt":"2022-01-03"}"#).unwrap();
        let expected = NaiveDate::from_ymd_opt(2022, 1, 3)
            .map(|date| date.and_time(NaiveTime::MIN));
        assert_eq!(parsed.scheduled_dt, expected);
    }

    #[test]
    fn date_parse_failure_is_a_server_error() {
        let err = parse_record::<DelayReport>(
            r#"{"flight_no":"SQ108","scheduled_dt":"January 3rd"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Server(_)));
    }

    #[test]
    fn construction_failure_wraps_into_bad_request() {
        // `flight_no` passes the field-set checks as a number, then fails
        // the typed construction.
        let err = parse_record::<DelayReport>(r#"{"flight_no": 108}"#).unwrap_err();
        match err {
            ApiError::BadRequest(message) => {
                assert!(message.contains("Unable to parse event"));
            }
            other => panic!("expected BadRequest, got {other:?}"),
        }
    }
}
