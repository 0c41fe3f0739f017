//! Read-only credential lookup
//!
//! Credential records are managed elsewhere; the gateway only lists them.
//! Every call reads the backing store again so edits made by the
//! management side show up on the next request.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::fs;
use tracing::{debug, warn};

use crate::models::Credential;
use crate::types::{AppError, AppResult};

/// Table written by the credential-management side
const CREDENTIALS_TABLE: &str = "api_storagecredential";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Every stored credential, active or not
    async fn list_credentials(&self) -> AppResult<Vec<Credential>>;
}

/// Fixed in-memory list
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialStore {
    credentials: Vec<Credential>,
}

impl StaticCredentialStore {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialStore for StaticCredentialStore {
    async fn list_credentials(&self) -> AppResult<Vec<Credential>> {
        Ok(self.credentials.clone())
    }
}

/// JSON array of credential records on disk
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn list_credentials(&self) -> AppResult<Vec<Credential>> {
        if !self.path.exists() {
            warn!("Credentials file {:?} not found, no credentials available", self.path);
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read {:?}: {}", self.path, e)))?;
        let credentials: Vec<Credential> = serde_json::from_str(&content)
            .map_err(|e| AppError::Internal(format!("Malformed credentials file {:?}: {}", self.path, e)))?;

        debug!("Loaded {} credentials from {:?}", credentials.len(), self.path);
        Ok(credentials)
    }
}

/// Postgres table shared with the credential-management service
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn list_credentials(&self) -> AppResult<Vec<Credential>> {
        let query = format!(
            r#"
            SELECT id, name, provider, public_key, private_key_encrypted,
                   url_endpoint, region, bucket_name, is_active
            FROM {}
            "#,
            CREDENTIALS_TABLE
        );

        let credentials = sqlx::query_as::<_, Credential>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(credentials)
    }
}
