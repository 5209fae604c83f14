//! Trait seam over the setup service.
//!
//! The wizard talks to the service only through [`SetupBackend`], so tests can
//! script responses and count requests without a network.

use crate::error::SetupResult;
use crate::types::{InstallProgress, SetupStatus};
use async_trait::async_trait;

#[async_trait]
pub trait SetupBackend: Send + Sync {
    /// `GET /api/setup/status`
    async fn fetch_status(&self) -> SetupResult<SetupStatus>;

    /// `POST /api/setup/install_local`. Only acknowledges the trigger; the
    /// download itself is observed through [`SetupBackend::fetch_progress`].
    async fn install_local(&self, model_name: &str) -> SetupResult<()>;

    /// `GET /api/setup/progress`
    async fn fetch_progress(&self) -> SetupResult<InstallProgress>;

    /// `POST /api/setup/save_key`
    async fn save_key(&self, key: &str) -> SetupResult<()>;
}
