//! DynamoDB-backed repositories.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;

use crate::{Bag, BagRepository, Booking, BookingRepository, Item, StoreError};

pub const COMPANY_START_OF_WEEK_INDEX: &str = "company-start_of_week-index";

#[derive(Clone)]
pub struct DynamoBookingStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoBookingStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl BookingRepository for DynamoBookingStore {
    async fn by_capsule(&self, capsule_id: &str) -> Result<Vec<Booking>, StoreError> {
        let output = self
            .client
            .query()
            .table_name(&self.table)
            .key_condition_expression("capsule_id = :capsule_id")
            .expression_attribute_values(
                ":capsule_id",
                AttributeValue::S(capsule_id.to_string()),
            )
            .send()
            .await
            .map_err(|err| request_error("query", err))?;

        map_items(output.items(), Booking::from_item)
    }

    async fn by_company_week(
        &self,
        company: &str,
        start_of_week: &str,
        location: &str,
    ) -> Result<Vec<Booking>, StoreError> {
        // `location` is a DynamoDB reserved word, hence the name alias.
        let output = self
            .client
            .query()
            .table_name(&self.table)
            .index_name(COMPANY_START_OF_WEEK_INDEX)
            .key_condition_expression("company = :company AND start_of_week = :start_of_week")
            .filter_expression("#location = :location")
            .expression_attribute_names("#location", "location")
            .expression_attribute_values(":company", AttributeValue::S(company.to_string()))
            .expression_attribute_values(
                ":start_of_week",
                AttributeValue::S(start_of_week.to_string()),
            )
            .expression_attribute_values(":location", AttributeValue::S(location.to_string()))
            .send()
            .await
            .map_err(|err| request_error("query", err))?;

        map_items(output.items(), Booking::from_item)
    }

    async fn scan_all(&self) -> Result<Vec<Booking>, StoreError> {
        scan_table(&self.client, &self.table, Booking::from_item).await
    }
}

#[derive(Clone)]
pub struct DynamoBagStore {
    client: aws_sdk_dynamodb::Client,
    table: String,
}

impl DynamoBagStore {
    pub fn new(client: aws_sdk_dynamodb::Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl BagRepository for DynamoBagStore {
    async fn scan_all(&self) -> Result<Vec<Bag>, StoreError> {
        scan_table(&self.client, &self.table, Bag::from_item).await
    }
}

async fn scan_table<T>(
    client: &aws_sdk_dynamodb::Client,
    table: &str,
    map_item: fn(&Item) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    let mut records = Vec::new();
    let mut exclusive_start_key: Option<Item> = None;

    loop {
        let output = client
            .scan()
            .table_name(table)
            .set_exclusive_start_key(exclusive_start_key.take())
            .send()
            .await
            .map_err(|err| request_error("scan", err))?;

        records.extend(map_items(output.items(), map_item)?);

        match output.last_evaluated_key() {
            Some(key) if !key.is_empty() => exclusive_start_key = Some(key.clone()),
            _ => break,
        }
    }

    Ok(records)
}

fn map_items<T>(
    items: &[Item],
    map_item: fn(&Item) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    items.iter().map(map_item).collect()
}

fn request_error(operation: &str, err: impl std::fmt::Display) -> StoreError {
    StoreError {
        code: "ERR_DYNAMODB",
        message: format!("dynamodb {operation} failed: {err}"),
    }
}
