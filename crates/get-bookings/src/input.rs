use blp_validation::patterns;
use blp_validation::{FieldSpec, FromRecord, ParsedRecord, RecordError, RecordSchema};

/// Query parameters accepted by the booking lookup. All fields are
/// optional; which ones are present picks the query branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingQuery {
    pub company: Option<String>,
    pub start_of_week: Option<String>,
    pub location: Option<String>,
    pub capsule_id: Option<String>,
}

impl FromRecord for BookingQuery {
    const SCHEMA: RecordSchema = RecordSchema {
        fields: &[
            FieldSpec::optional("company"),
            FieldSpec::optional("start_of_week").with_pattern(patterns::DATE_PATTERN),
            FieldSpec::optional("location"),
            FieldSpec::optional("capsule_id"),
        ],
    };

    fn from_record(record: &ParsedRecord) -> Result<Self, RecordError> {
        Ok(Self {
            company: record.opt_string(0)?,
            start_of_week: record.opt_string(1)?,
            location: record.opt_string(2)?,
            capsule_id: record.opt_string(3)?,
        })
    }
}
