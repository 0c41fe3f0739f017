//! Storage providers and failover upload
//!
//! - `credentials` - read-only credential lookup (file, Postgres, in-memory)
//! - `pool` - active/filtered credentials in randomized order
//! - `imagekit`, `cloudinary` - provider upload and signing protocols
//! - `orchestrator` - tries credentials one by one until an upload succeeds

pub mod cloudinary;
pub mod credentials;
pub mod imagekit;
pub mod orchestrator;
pub mod pool;

pub use cloudinary::*;
pub use credentials::*;
pub use imagekit::*;
pub use orchestrator::*;
pub use pool::*;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::UploadConfig;
use crate::models::{Credential, StorageProvider, StoredFile, UploadSignature};
use crate::types::{AppError, AppResult};

/// Upload and signing protocol for one provider
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> StorageProvider;

    /// Upload `file_bytes` using `credential`. Any failure is an
    /// `AppError::ProviderUpload` carrying the credential name.
    async fn upload(
        &self,
        credential: &Credential,
        file_bytes: &[u8],
        file_name: &str,
    ) -> AppResult<StoredFile>;

    /// Signing material for a client that uploads directly to the provider
    fn sign(&self, credential: &Credential, file_name: &str) -> AppResult<UploadSignature>;
}

/// Adapters keyed by provider
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<StorageProvider, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in adapter sharing one HTTP client
    pub fn from_config(config: &UploadConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let mut registry = Self::new();
        registry.register(Arc::new(ImageKitAdapter::new(
            client.clone(),
            &config.imagekit_upload_url,
            config.imagekit_signature_ttl_secs,
        )));
        registry.register(Arc::new(CloudinaryAdapter::new(client, &config.cloudinary_api_base)));
        Ok(registry)
    }

    /// Replaces any adapter already registered for the same provider
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.provider(), adapter);
    }

    pub fn get(&self, provider: StorageProvider) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider).cloned()
    }

    /// `Ok(None)` when no adapter handles the credential's provider
    pub fn sign(&self, credential: &Credential, file_name: &str) -> AppResult<Option<UploadSignature>> {
        match self.adapters.get(&credential.provider) {
            Some(adapter) => adapter.sign(credential, file_name).map(Some),
            None => Ok(None),
        }
    }
}

/// Current Unix time in seconds
pub(crate) fn unix_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Best-effort content type for the multipart file part
pub(crate) fn guess_mime(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_registry_lookup_by_provider() {
        let registry = AdapterRegistry::from_config(&UploadConfig::default()).unwrap();
        assert!(registry.get(StorageProvider::ImageKit).is_some());
        assert!(registry.get(StorageProvider::Cloudinary).is_some());
        assert!(registry.get(StorageProvider::S3).is_none());
        assert!(registry.get(StorageProvider::GoogleDrive).is_none());
    }

    #[test]
    fn test_register_replaces_existing_adapter() {
        let mut registry = AdapterRegistry::from_config(&UploadConfig::default()).unwrap();
        registry.register(Arc::new(ScriptedAdapter::new(StorageProvider::ImageKit, &[])));
        let cred = credential("ik", StorageProvider::ImageKit);
        let signature = registry.sign(&cred, "a.png").unwrap();
        assert!(matches!(signature, Some(UploadSignature::Cloudinary { ref signature, .. }) if signature == "scripted"));
    }

    #[test]
    fn test_sign_unsupported_provider_returns_none() {
        let registry = AdapterRegistry::from_config(&UploadConfig::default()).unwrap();
        let cred = credential("s3", StorageProvider::S3);
        assert!(registry.sign(&cred, "a.png").unwrap().is_none());
    }

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime("photo.png"), "image/png");
        assert_eq!(guess_mime("blob"), "application/octet-stream");
    }
}
