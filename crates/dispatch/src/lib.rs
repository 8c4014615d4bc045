//! Request dispatch: an explicit middleware pipeline for role-gated
//! endpoints, and a lighter response-mapping wrapper for handlers that do
//! their own parsing.
//!
//! Both always produce a complete [`ApiGwResponse`]; no error escapes the
//! dispatch boundary.

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use blp_auth::{bearer_token, AuthGate, Credentials};
use blp_contracts::{ApiError, ApiGwResponse};
use blp_validation::RuleSet;
use http::HeaderMap;
use lambda_http::Body;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

/// Per-invocation state threaded through the pipeline stages.
pub struct RequestContext {
    pub raw_body: String,
    pub headers: HeaderMap,
    /// Decoded request body; populated by [`DecodeJson`].
    pub body: Map<String, Value>,
    /// Caller credentials; populated by [`Authorize`] when present.
    pub credentials: Credentials,
}

/// One request-handling middleware stage. Stages run in registration
/// order; the first failing stage aborts the chain.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), ApiError>;
}

/// Decodes the raw body into a JSON object.
pub struct DecodeJson;

#[async_trait]
impl Stage for DecodeJson {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let decoded: Value = serde_json::from_str(&ctx.raw_body).map_err(|err| {
            ApiError::BadRequest(format!("unable to decode request body: {err}"))
        })?;

        match decoded {
            Value::Object(map) => {
                ctx.body = map;
                Ok(())
            }
            _ => Err(ApiError::BadRequest(
                "request body is not a JSON object".to_string(),
            )),
        }
    }
}

/// Validates the decoded body against a record ruleset.
pub struct ValidateRuleSet {
    rules: &'static RuleSet,
    required: &'static [&'static str],
    optional: &'static [&'static str],
}

impl ValidateRuleSet {
    pub fn new(
        rules: &'static RuleSet,
        required: &'static [&'static str],
        optional: &'static [&'static str],
    ) -> Self {
        Self {
            rules,
            required,
            optional,
        }
    }
}

#[async_trait]
impl Stage for ValidateRuleSet {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        if !self.rules.validate(&ctx.body, self.required, self.optional) {
            return Err(ApiError::BadRequest(
                "request body failed schema validation".to_string(),
            ));
        }
        Ok(())
    }
}

/// Gates the request on the caller's resolved role.
pub struct Authorize {
    gate: AuthGate,
    allowed_roles: Vec<String>,
}

impl Authorize {
    pub fn new(gate: AuthGate, allowed_roles: Vec<String>) -> Self {
        Self {
            gate,
            allowed_roles,
        }
    }
}

#[async_trait]
impl Stage for Authorize {
    async fn handle(&self, ctx: &mut RequestContext) -> Result<(), ApiError> {
        let token = bearer_token(&ctx.headers).unwrap_or_default();
        let (authorized, credentials) = self.gate.authorize(&self.allowed_roles, &token).await;

        if !authorized {
            return Err(ApiError::Unauthorized(
                "caller role is not in the allow-list".to_string(),
            ));
        }

        ctx.credentials = credentials;
        Ok(())
    }
}

/// Ordered middleware chain in front of a business function.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    cors: Option<String>,
}

impl Pipeline {
    pub fn new(cors: Option<String>) -> Self {
        Self {
            stages: Vec::new(),
            cors,
        }
    }

    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Run the stages in order, then the business function, and classify
    /// the outcome into a response envelope. Client-side rejections keep
    /// generic bodies; the specific reason goes to the log only.
    pub async fn process_request<F, Fut>(
        &self,
        raw_body: String,
        headers: HeaderMap,
        business: F,
    ) -> ApiGwResponse
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<Option<Value>, ApiError>>,
    {
        let started = Instant::now();
        let cors = self.cors.as_deref();

        let mut ctx = RequestContext {
            raw_body,
            headers,
            body: Map::new(),
            credentials: Credentials::new(),
        };

        let mut stage_failure = None;
        for stage in &self.stages {
            if let Err(err) = stage.handle(&mut ctx).await {
                stage_failure = Some(err);
                break;
            }
        }

        let response = match stage_failure {
            Some(err) => stage_failure_response(&err, cors),
            None => match business(ctx).await {
                Ok(Some(data)) => ApiGwResponse::json(200, &data, cors),
                Ok(None) => ApiGwResponse::text(404, "Data not found.", cors),
                Err(err) => {
                    error!(error = %err, "REQUEST: business logic failed");
                    ApiGwResponse::text(500, "Server side error while processing request.", cors)
                }
            },
        };

        info!(
            status = response.status_code,
            duration_ms = started.elapsed().as_millis() as u64,
            "RESP: request completed"
        );
        response
    }
}

fn stage_failure_response(err: &ApiError, cors: Option<&str>) -> ApiGwResponse {
    match err {
        ApiError::BadRequest(_) => {
            warn!(error = %err, "REQUEST: failed validation");
            ApiGwResponse::text(400, "Invalid request data provided.", cors)
        }
        ApiError::Unauthorized(_) => {
            warn!(error = %err, "AUTH: unauthorized");
            ApiGwResponse::text(401, "User role unauthorized.", cors)
        }
        other => {
            error!(error = %other, "REQUEST: processing failed");
            ApiGwResponse::text(500, "Server side error while processing request.", cors)
        }
    }
}

/// Maps a business function's typed outcome straight onto the envelope.
/// Only `BadRequest` detail is echoed to the caller; the other kinds keep
/// an empty body.
pub async fn api_response_handler<Fut>(cors: Option<&str>, business: Fut) -> ApiGwResponse
where
    Fut: Future<Output = Result<Value, ApiError>>,
{
    match business.await {
        Ok(data) => ApiGwResponse::json(200, &data, cors),
        Err(err) => {
            match err {
                ApiError::Server(_) => error!(error = %err, "REQUEST: unhandled server error"),
                _ => warn!(error = %err, "REQUEST: rejected"),
            }
            ApiGwResponse::text(err.status_code(), err.public_message(), cors)
        }
    }
}

/// The request body as text; the parsers upstream treat an empty body the
/// same as any other invalid JSON document.
pub fn request_body_text(request: &lambda_http::Request) -> Result<String, ApiError> {
    match request.body() {
        Body::Empty => Ok(String::new()),
        Body::Text(text) => Ok(text.clone()),
        Body::Binary(bytes) => String::from_utf8(bytes.clone())
            .map_err(|err| ApiError::BadRequest(format!("request body is not utf-8: {err}"))),
    }
}
