use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use super::CredentialStore;
use crate::models::{Credential, StorageProvider};
use crate::types::{AppError, AppResult};

/// Active credentials for one request, in random order.
///
/// Nothing is cached between calls: each checkout re-reads the store and
/// shuffles with the thread-local RNG, so no ordering state survives a request.
#[derive(Clone)]
pub struct CredentialPool {
    store: Arc<dyn CredentialStore>,
}

impl CredentialPool {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    pub async fn checkout(&self, filter: Option<StorageProvider>) -> AppResult<Vec<Credential>> {
        let all = self.store.list_credentials().await?;
        let mut eligible = eligible(all, filter);

        if eligible.is_empty() {
            return Err(AppError::NoCredentials);
        }

        // ThreadRng is !Send; keep it out of any await
        shuffle(&mut eligible, &mut rand::thread_rng());
        debug!(
            filter = ?filter,
            count = eligible.len(),
            "Checked out storage credentials"
        );
        Ok(eligible)
    }
}

/// Active credentials, narrowed to `filter` when given
pub fn eligible(credentials: Vec<Credential>, filter: Option<StorageProvider>) -> Vec<Credential> {
    credentials
        .into_iter()
        .filter(|c| c.is_active)
        .filter(|c| filter.map_or(true, |provider| c.provider == provider))
        .collect()
}

pub fn shuffle<R: Rng + ?Sized>(credentials: &mut [Credential], rng: &mut R) {
    credentials.shuffle(rng);
}
