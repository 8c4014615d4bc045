//! Cognito- and SSM-backed implementations of the identity seams.

use async_trait::async_trait;

use crate::{AuthError, IdentityProvider, ParameterStore, UserProfile};

#[derive(Clone)]
pub struct CognitoIdentityProvider {
    client: aws_sdk_cognitoidentityprovider::Client,
}

impl CognitoIdentityProvider {
    pub fn new(client: aws_sdk_cognitoidentityprovider::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn user_for_token(&self, access_token: &str) -> Result<UserProfile, AuthError> {
        let output = self
            .client
            .get_user()
            .access_token(access_token)
            .send()
            .await
            .map_err(|err| AuthError {
                code: "ERR_IDENTITY_LOOKUP",
                message: format!("cognito get-user failed: {err}"),
            })?;

        let attributes = output
            .user_attributes()
            .iter()
            .map(|attribute| {
                (
                    attribute.name().to_string(),
                    attribute.value().unwrap_or_default().to_string(),
                )
            })
            .collect();

        Ok(UserProfile {
            username: output.username().to_string(),
            attributes,
        })
    }

    async fn groups_for_user(
        &self,
        username: &str,
        user_pool_id: &str,
    ) -> Result<Vec<String>, AuthError> {
        let output = self
            .client
            .admin_list_groups_for_user()
            .username(username)
            .user_pool_id(user_pool_id)
            .send()
            .await
            .map_err(|err| AuthError {
                code: "ERR_IDENTITY_LOOKUP",
                message: format!("cognito list-groups failed: {err}"),
            })?;

        Ok(output
            .groups()
            .iter()
            .filter_map(|group| group.group_name())
            .map(str::to_string)
            .collect())
    }
}

#[derive(Clone)]
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn parameter(&self, name: &str) -> Result<String, AuthError> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(false)
            .send()
            .await
            .map_err(|err| AuthError {
                code: "ERR_PARAMETER_LOOKUP",
                message: format!("ssm get-parameter failed: {err}"),
            })?;

        output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string)
            .ok_or_else(|| AuthError {
                code: "ERR_PARAMETER_LOOKUP",
                message: format!("parameter `{name}` has no value"),
            })
    }
}
