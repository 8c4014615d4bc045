use std::sync::Arc;

use blp_auth::AuthGate;
use blp_contracts::ApiGwResponse;
use blp_dispatch::{request_body_text, Authorize, DecodeJson, Pipeline, ValidateRuleSet};
use blp_store::rules::{BAG_QUERY_OPTIONAL, BAG_QUERY_REQUIRED, BAG_RULES};
use blp_store::{project_row, BagRepository};
use lambda_http::Request;
use once_cell::sync::Lazy;
use serde_json::Value;

pub const BAG_OUTPUT_KEYS: &[&str] = &["bag_id", "color", "weight"];

/// Bag listing endpoint behind the role-gated pipeline. Under this
/// dispatcher "no data" is a 404: an empty scan maps to `None`.
pub struct GetBags {
    repository: Arc<dyn BagRepository>,
    pipeline: Pipeline,
}

impl GetBags {
    pub fn new(
        repository: Arc<dyn BagRepository>,
        gate: AuthGate,
        allowed_roles: Vec<String>,
        cors: Option<String>,
    ) -> Self {
        let pipeline = Pipeline::new(cors)
            .stage(DecodeJson)
            .stage(ValidateRuleSet::new(
                Lazy::force(&BAG_RULES),
                BAG_QUERY_REQUIRED,
                BAG_QUERY_OPTIONAL,
            ))
            .stage(Authorize::new(gate, allowed_roles));

        Self {
            repository,
            pipeline,
        }
    }

    pub async fn handle(&self, request: &Request) -> ApiGwResponse {
        let raw_body = request_body_text(request).unwrap_or_default();
        let repository = Arc::clone(&self.repository);

        self.pipeline
            .process_request(raw_body, request.headers().clone(), move |_ctx| async move {
                let bags = repository.scan_all().await?;
                if bags.is_empty() {
                    return Ok(None);
                }

                let mut rows = Vec::with_capacity(bags.len());
                for bag in bags {
                    let mut row = bag.into_row();
                    project_row(&mut row, BAG_OUTPUT_KEYS);
                    rows.push(Value::Object(row));
                }

                Ok(Some(Value::Array(rows)))
            })
            .await
    }
}
