use std::sync::Arc;

use tracing::{info, warn};

use super::{AdapterRegistry, CredentialPool};
use crate::models::{AttemptError, Credential, UploadOutcome, UploadRequest};
use crate::types::{AppError, AppResult};

/// Failover upload: try each checked-out credential once, in order, until one works.
///
/// Attempts are sequential. A failure is final for that credential within the
/// request; the only retry is moving on to the next credential.
pub struct UploadOrchestrator {
    pool: CredentialPool,
    adapters: Arc<AdapterRegistry>,
}

impl UploadOrchestrator {
    pub fn new(pool: CredentialPool, adapters: Arc<AdapterRegistry>) -> Self {
        Self { pool, adapters }
    }

    /// Fails only when no credential is eligible; provider failures end up
    /// in `UploadOutcome::Exhausted`.
    pub async fn upload(&self, request: &UploadRequest) -> AppResult<UploadOutcome> {
        let credentials = self.pool.checkout(request.provider_filter).await?;
        Ok(self.run(&credentials, request).await)
    }

    /// Walk `credentials` in the given order
    pub async fn run(&self, credentials: &[Credential], request: &UploadRequest) -> UploadOutcome {
        let mut errors = Vec::new();

        for credential in credentials {
            let Some(adapter) = self.adapters.get(credential.provider) else {
                warn!(
                    credential = %credential.name,
                    provider = %credential.provider,
                    "No adapter registered, skipping credential"
                );
                errors.push(AttemptError {
                    credential_name: credential.name.clone(),
                    message: AppError::UnsupportedProvider(credential.provider.to_string()).to_string(),
                });
                continue;
            };

            match adapter
                .upload(credential, &request.file_bytes, &request.file_name)
                .await
            {
                Ok(file) => {
                    info!(
                        credential = %credential.name,
                        provider = %credential.provider,
                        file_name = %request.file_name,
                        failed_attempts = errors.len(),
                        "Upload succeeded"
                    );
                    return UploadOutcome::Success {
                        file,
                        credential_name: credential.name.clone(),
                    };
                }
                Err(e) => {
                    warn!(
                        credential = %credential.name,
                        provider = %credential.provider,
                        "Upload attempt failed: {}",
                        e
                    );
                    errors.push(AttemptError {
                        credential_name: credential.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        warn!(
            file_name = %request.file_name,
            attempts = errors.len(),
            "All storage credentials failed"
        );
        UploadOutcome::Exhausted { errors }
    }
}
