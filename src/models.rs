use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::storage::{AdapterRegistry, CredentialStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub credentials: Arc<dyn CredentialStore>,
    pub adapters: Arc<AdapterRegistry>,
}

/// External object-storage backends a credential can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageProvider {
    #[serde(rename = "imagekit")]
    ImageKit,
    #[serde(rename = "cloudinary")]
    Cloudinary,
    #[serde(rename = "aws_s3")]
    S3,
    #[serde(rename = "google_drive")]
    GoogleDrive,
}

impl StorageProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageProvider::ImageKit => "imagekit",
            StorageProvider::Cloudinary => "cloudinary",
            StorageProvider::S3 => "aws_s3",
            StorageProvider::GoogleDrive => "google_drive",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "imagekit" => Some(StorageProvider::ImageKit),
            "cloudinary" => Some(StorageProvider::Cloudinary),
            "aws_s3" => Some(StorageProvider::S3),
            "google_drive" => Some(StorageProvider::GoogleDrive),
            _ => None,
        }
    }
}

impl fmt::Display for StorageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for StorageProvider {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        StorageProvider::from_id(&value).ok_or_else(|| format!("unknown storage provider '{}'", value))
    }
}

/// Access parameters for one provider account.
///
/// Records are owned by the credential-management side of the system; the
/// gateway only reads them. `private_key` is never serialized and is
/// redacted from `Debug` output.
// FromRow is used with runtime query_as (no DATABASE_URL at compile time)
#[derive(Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Credential {
    pub id: Uuid,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub provider: StorageProvider,
    pub public_key: String,
    #[serde(skip_serializing, alias = "private_key_encrypted")]
    #[sqlx(rename = "private_key_encrypted")]
    pub private_key: String,
    #[serde(default)]
    pub url_endpoint: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub bucket_name: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("provider", &self.provider)
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("url_endpoint", &self.url_endpoint)
            .field("region", &self.region)
            .field("bucket_name", &self.bucket_name)
            .field("is_active", &self.is_active)
            .finish()
    }
}

/// One inbound upload, alive for the duration of a single HTTP call
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file_bytes: Vec<u8>,
    pub file_name: String,
    pub provider_filter: Option<StorageProvider>,
}

/// What a provider hands back after a successful upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub url: String,
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptError {
    #[serde(rename = "provider")]
    pub credential_name: String,
    #[serde(rename = "error")]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Success {
        file: StoredFile,
        credential_name: String,
    },
    /// Every eligible credential failed, in attempt order
    Exhausted { errors: Vec<AttemptError> },
}

impl UploadOutcome {
    pub fn success(&self) -> bool {
        matches!(self, UploadOutcome::Success { .. })
    }

    pub fn errors(&self) -> &[AttemptError] {
        match self {
            UploadOutcome::Success { .. } => &[],
            UploadOutcome::Exhausted { errors } => errors,
        }
    }
}

/// Client-side signing material, shaped per provider
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UploadSignature {
    ImageKit {
        token: String,
        expire: i64,
        signature: String,
        public_key: String,
    },
    Cloudinary {
        signature: String,
        timestamp: i64,
        api_key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cloud_name: Option<String>,
    },
}

#[derive(Debug, Serialize)]
pub struct UploadSuccessResponse {
    pub success: bool,
    pub data: StoredFile,
    pub provider: String,
}

#[derive(Debug, Serialize)]
pub struct UploadFailureResponse {
    pub success: bool,
    pub errors: Vec<AttemptError>,
}

#[derive(Debug, Deserialize)]
pub struct SignatureRequest {
    pub credential_id: Uuid,
    pub file_name: String,
}

#[derive(Debug, Serialize)]
pub struct SignatureResponse {
    pub success: bool,
    pub provider: String,
    pub signature: UploadSignature,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}
