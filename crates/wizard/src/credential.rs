use omni_setup_client::{SetupBackend, SetupError, SetupResult};
use std::sync::Arc;
use tracing::info;

/// Persists the cloud API key. Callers keep at most one save in flight.
pub struct CredentialSaver<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: ?Sized> Clone for CredentialSaver<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: SetupBackend + ?Sized> CredentialSaver<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn save(&self, key: &str) -> SetupResult<()> {
        if key.trim().is_empty() {
            return Err(SetupError::Validation("API key is empty".to_string()));
        }
        self.backend.save_key(key).await?;
        info!("Cloud credential saved");
        Ok(())
    }
}
