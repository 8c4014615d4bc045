//! Field-level encryption for sensitive record attributes.
//!
//! Ciphertext travels base64-encoded inside ordinary string attributes, so
//! encrypted fields need no special table schema.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_kms::primitives::Blob;
use base64::{engine::general_purpose, Engine as _};
use serde_json::{Map, Value};

use crate::StoreError;

#[async_trait]
pub trait KeyService: Send + Sync {
    async fn encrypt(&self, plaintext: &str) -> Result<String, StoreError>;
    async fn decrypt(&self, ciphertext: &str) -> Result<String, StoreError>;
}

#[derive(Clone)]
pub struct KmsKeyService {
    client: aws_sdk_kms::Client,
    key_id: Option<String>,
}

impl KmsKeyService {
    /// `key_id` is only needed for the encrypt side; decryption resolves
    /// the key from the ciphertext itself.
    pub fn new(client: aws_sdk_kms::Client, key_id: Option<String>) -> Self {
        Self { client, key_id }
    }
}

#[async_trait]
impl KeyService for KmsKeyService {
    async fn encrypt(&self, plaintext: &str) -> Result<String, StoreError> {
        let key_id = self.key_id.as_ref().ok_or_else(|| StoreError {
            code: "ERR_KEY_CONFIG",
            message: "no KMS key id configured for encryption".to_string(),
        })?;

        let output = self
            .client
            .encrypt()
            .key_id(key_id)
            .plaintext(Blob::new(plaintext.as_bytes()))
            .send()
            .await
            .map_err(|err| StoreError {
                code: "ERR_KMS",
                message: format!("kms encrypt failed: {err}"),
            })?;

        let blob = output.ciphertext_blob().ok_or_else(|| StoreError {
            code: "ERR_KMS",
            message: "kms encrypt returned no ciphertext".to_string(),
        })?;

        Ok(general_purpose::STANDARD.encode(blob.as_ref()))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String, StoreError> {
        let decoded = general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|err| StoreError {
                code: "ERR_KMS",
                message: format!("ciphertext is not valid base64: {err}"),
            })?;

        let output = self
            .client
            .decrypt()
            .ciphertext_blob(Blob::new(decoded))
            .send()
            .await
            .map_err(|err| StoreError {
                code: "ERR_KMS",
                message: format!("kms decrypt failed: {err}"),
            })?;

        let blob = output.plaintext().ok_or_else(|| StoreError {
            code: "ERR_KMS",
            message: "kms decrypt returned no plaintext".to_string(),
        })?;

        String::from_utf8(blob.as_ref().to_vec()).map_err(|err| StoreError {
            code: "ERR_KMS",
            message: format!("decrypted value is not utf-8: {err}"),
        })
    }
}

/// Applies the key service to a configured subset of a row's fields.
/// Absent, non-string, and empty values are skipped.
#[derive(Clone)]
pub struct FieldCipher {
    keys: Arc<dyn KeyService>,
}

impl FieldCipher {
    pub fn new(keys: Arc<dyn KeyService>) -> Self {
        Self { keys }
    }

    pub async fn encrypt_fields(
        &self,
        row: &mut Map<String, Value>,
        fields: &[&str],
    ) -> Result<(), StoreError> {
        for field in fields {
            let Some(plaintext) = eligible_value(row, field) else {
                continue;
            };
            let encrypted = self.keys.encrypt(&plaintext).await?;
            row.insert(field.to_string(), Value::String(encrypted));
        }
        Ok(())
    }

    pub async fn decrypt_fields(
        &self,
        row: &mut Map<String, Value>,
        fields: &[&str],
    ) -> Result<(), StoreError> {
        for field in fields {
            let Some(ciphertext) = eligible_value(row, field) else {
                continue;
            };
            let decrypted = self.keys.decrypt(&ciphertext).await?;
            row.insert(field.to_string(), Value::String(decrypted));
        }
        Ok(())
    }
}

fn eligible_value(row: &Map<String, Value>, field: &str) -> Option<String> {
    match row.get(field) {
        Some(Value::String(text)) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}
