use omni_setup_client::{SetupBackend, SetupResult, SetupStatus};
use std::sync::Arc;
use tracing::info;

pub struct StatusClient<B: ?Sized> {
    backend: Arc<B>,
}

impl<B: SetupBackend + ?Sized> StatusClient<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn fetch_status(&self) -> SetupResult<SetupStatus> {
        let status = self.backend.fetch_status().await?;
        info!(
            ram_gb = status.ram_gb,
            tier = %status.recommendation,
            ollama_running = status.ollama_running,
            models = status.models.len(),
            has_gemini_key = status.has_gemini_key,
            "Fetched setup status"
        );
        Ok(status)
    }
}
