pub mod crypto;
pub mod dynamo;
pub mod rules;

pub use crypto::{FieldCipher, KeyService, KmsKeyService};
pub use dynamo::{DynamoBagStore, DynamoBookingStore};

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use blp_contracts::ApiError;
use serde_json::{Map, Value};

pub const BOOKING_STATUS_ACTIVE: &str = "Active";
pub const BOOKING_STATUS_INACTIVE: &str = "Inactive";

pub type Item = HashMap<String, AttributeValue>;

#[derive(Debug, Clone)]
pub struct StoreError {
    pub code: &'static str,
    pub message: String,
}

impl StoreError {
    fn attribute(name: &str, expected: &str) -> Self {
        Self {
            code: "ERR_ITEM_SHAPE",
            message: format!("attribute `{name}` is missing or not {expected}"),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<StoreError> for ApiError {
    fn from(value: StoreError) -> Self {
        ApiError::Server(value.to_string())
    }
}

/// A booking row in the `blp-booking` table. `nric_sha` is stored
/// encrypted; callers decrypt it through [`FieldCipher`] at the output
/// boundary only.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub capsule_id: String,
    pub activity_date: String,
    pub company: String,
    pub start_of_week: String,
    pub location: String,
    pub nric_sha: String,
    pub bags: HashMap<String, Bag>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bag {
    pub bag_id: String,
    pub color: String,
    /// Grams; fractional for calibrated scales.
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BaggageDelay {
    pub flight_no: String,
    pub scheduled_dt: String,
    pub delays: Vec<Delay>,
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delay {
    pub delay_type: String,
    pub duration: Option<f64>,
    pub reason: Option<String>,
    pub timestamp: String,
}

impl Booking {
    pub fn from_item(item: &Item) -> Result<Self, StoreError> {
        let mut bags = HashMap::new();
        if let Some(value) = item.get("bags") {
            let map = value
                .as_m()
                .map_err(|_| StoreError::attribute("bags", "a map"))?;
            for (name, bag_value) in map {
                let bag_item = bag_value
                    .as_m()
                    .map_err(|_| StoreError::attribute("bags", "a map of bags"))?;
                bags.insert(name.clone(), Bag::from_item(bag_item)?);
            }
        }

        Ok(Self {
            capsule_id: required_string(item, "capsule_id")?,
            activity_date: required_string(item, "activity_date")?,
            company: required_string(item, "company")?,
            start_of_week: required_string(item, "start_of_week")?,
            location: required_string(item, "location")?,
            nric_sha: required_string(item, "nric_sha")?,
            bags,
        })
    }

    /// Flat attribute map in the output shape; bags nest as objects.
    pub fn into_row(self) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("capsule_id".to_string(), Value::String(self.capsule_id));
        row.insert("activity_date".to_string(), Value::String(self.activity_date));
        row.insert("company".to_string(), Value::String(self.company));
        row.insert("start_of_week".to_string(), Value::String(self.start_of_week));
        row.insert("location".to_string(), Value::String(self.location));
        row.insert("nric_sha".to_string(), Value::String(self.nric_sha));
        row.insert(
            "bags".to_string(),
            Value::Object(
                self.bags
                    .into_iter()
                    .map(|(name, bag)| (name, Value::Object(bag.into_row())))
                    .collect(),
            ),
        );
        row
    }
}

impl Bag {
    pub fn from_item(item: &Item) -> Result<Self, StoreError> {
        Ok(Self {
            bag_id: required_string(item, "bag_id")?,
            color: required_string(item, "color")?,
            weight: required_number(item, "weight")?,
        })
    }

    pub fn into_row(self) -> Map<String, Value> {
        let mut row = Map::new();
        row.insert("bag_id".to_string(), Value::String(self.bag_id));
        row.insert("color".to_string(), Value::String(self.color));
        row.insert(
            "weight".to_string(),
            serde_json::Number::from_f64(self.weight)
                .map(Value::Number)
                .unwrap_or(Value::Null),
        );
        row
    }
}

impl BaggageDelay {
    pub fn from_item(item: &Item) -> Result<Self, StoreError> {
        let mut delays = Vec::new();
        if let Some(value) = item.get("delays") {
            let list = value
                .as_l()
                .map_err(|_| StoreError::attribute("delays", "a list"))?;
            for entry in list {
                let delay_item = entry
                    .as_m()
                    .map_err(|_| StoreError::attribute("delays", "a list of maps"))?;
                delays.push(Delay::from_item(delay_item)?);
            }
        }

        Ok(Self {
            flight_no: required_string(item, "flight_no")?,
            scheduled_dt: required_string(item, "scheduled_dt")?,
            delays,
            ttl: optional_integer(item, "ttl")?,
        })
    }
}

impl Delay {
    pub fn from_item(item: &Item) -> Result<Self, StoreError> {
        Ok(Self {
            delay_type: required_string(item, "delay_type")?,
            duration: optional_number(item, "duration")?,
            reason: optional_string(item, "reason"),
            timestamp: required_string(item, "timestamp")?,
        })
    }
}

/// Query surface for bookings; implemented by the DynamoDB-backed store
/// and by in-memory fakes in handler tests.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn by_capsule(&self, capsule_id: &str) -> Result<Vec<Booking>, StoreError>;

    async fn by_company_week(
        &self,
        company: &str,
        start_of_week: &str,
        location: &str,
    ) -> Result<Vec<Booking>, StoreError>;

    async fn scan_all(&self) -> Result<Vec<Booking>, StoreError>;
}

#[async_trait]
pub trait BagRepository: Send + Sync {
    async fn scan_all(&self) -> Result<Vec<Bag>, StoreError>;
}

/// Retain only the declared output keys of a row.
pub fn project_row(row: &mut Map<String, Value>, keys: &[&str]) {
    row.retain(|key, _| keys.contains(&key.as_str()));
}

fn required_string(item: &Item, name: &str) -> Result<String, StoreError> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(String::clone)
        .ok_or_else(|| StoreError::attribute(name, "a string"))
}

fn optional_string(item: &Item, name: &str) -> Option<String> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .map(String::clone)
}

fn required_number(item: &Item, name: &str) -> Result<f64, StoreError> {
    item.get(name)
        .and_then(|value| value.as_n().ok())
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| StoreError::attribute(name, "a number"))
}

fn optional_number(item: &Item, name: &str) -> Result<Option<f64>, StoreError> {
    match item.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_n()
            .ok()
            .and_then(|text| text.parse().ok())
            .map(Some)
            .ok_or_else(|| StoreError::attribute(name, "a number")),
    }
}

fn optional_integer(item: &Item, name: &str) -> Result<Option<i64>, StoreError> {
    match item.get(name) {
        None => Ok(None),
        Some(value) => value
            .as_n()
            .ok()
            .and_then(|text| text.parse().ok())
            .map(Some)
            .ok_or_else(|| StoreError::attribute(name, "an integer")),
    }
}
