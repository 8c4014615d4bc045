pub mod cognito;

pub use cognito::{CognitoIdentityProvider, SsmParameterStore};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::{header, HeaderMap};
use tracing::{error, info, warn};

/// Flattened caller attributes plus the resolved `role` key.
pub type Credentials = HashMap<String, String>;

#[derive(Debug, Clone)]
pub struct AuthError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AuthError {}

/// A user as resolved by the identity capability.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub username: String,
    pub attributes: Vec<(String, String)>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn user_for_token(&self, access_token: &str) -> Result<UserProfile, AuthError>;

    async fn groups_for_user(
        &self,
        username: &str,
        user_pool_id: &str,
    ) -> Result<Vec<String>, AuthError>;
}

#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn parameter(&self, name: &str) -> Result<String, AuthError>;
}

/// Role allow-list gate over the external identity capability.
///
/// Collaborators are injected so handlers and tests construct the gate
/// against fakes without process-global state.
#[derive(Clone)]
pub struct AuthGate {
    identity: Arc<dyn IdentityProvider>,
    parameters: Arc<dyn ParameterStore>,
    pool_id_parameter: String,
}

impl AuthGate {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        parameters: Arc<dyn ParameterStore>,
        pool_id_parameter: impl Into<String>,
    ) -> Self {
        Self {
            identity,
            parameters,
            pool_id_parameter: pool_id_parameter.into(),
        }
    }

    /// Resolve the caller behind `access_token` and check its role against
    /// the allow-list. Never fails: every provider error is contained and
    /// reported as unauthorized with empty credentials.
    pub async fn authorize(
        &self,
        allowed_roles: &[String],
        access_token: &str,
    ) -> (bool, Credentials) {
        if access_token.is_empty() {
            return (false, Credentials::new());
        }

        let credentials = match self.resolve(access_token).await {
            Ok(credentials) => credentials,
            Err(err) => {
                error!(error = %err, "AUTH: access token failed");
                return (false, Credentials::new());
            }
        };

        let role = credentials.get("role").cloned().unwrap_or_default();
        if !allowed_roles.iter().any(|allowed| *allowed == role) {
            warn!(role = %role, "AUTH: not authorized to proceed");
            return (false, Credentials::new());
        }

        (true, credentials)
    }

    async fn resolve(&self, access_token: &str) -> Result<Credentials, AuthError> {
        let profile = self.identity.user_for_token(access_token).await?;

        let mut credentials: Credentials = profile.attributes.into_iter().collect();

        let pool_id = self.parameters.parameter(&self.pool_id_parameter).await?;
        let groups = self
            .identity
            .groups_for_user(&profile.username, &pool_id)
            .await?;

        // First group wins for multi-group users.
        let role = groups.into_iter().next().unwrap_or_default();
        info!(username = %profile.username, role = %role, "AUTH: user resolved");
        credentials.insert("role".to_string(), role);

        Ok(credentials)
    }
}

/// Access token from the `Authorization` header, with an optional scheme
/// prefix stripped. `None` for a missing or empty header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .unwrap_or(value)
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
