pub mod config;
pub mod credential;
pub mod orchestrator;
pub mod policy;
pub mod poller;
pub mod state;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::WizardConfig;
pub use credential::CredentialSaver;
pub use orchestrator::{HostSignal, SetupOrchestrator, WizardEvent};
pub use policy::{ModelId, SetupPath};
pub use poller::{InstallProgressPoller, PollOutcome, PollerState};
pub use state::WizardState;
pub use status::StatusClient;
