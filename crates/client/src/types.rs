use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware tier computed by the setup service from the host's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    CloudOnly,
    HybridLite,
    HybridPro,
}

impl Tier {
    pub fn is_hybrid(self) -> bool {
        matches!(self, Tier::HybridLite | Tier::HybridPro)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::CloudOnly => "CLOUD_ONLY",
            Tier::HybridLite => "HYBRID_LITE",
            Tier::HybridPro => "HYBRID_PRO",
        };
        f.write_str(name)
    }
}

/// Snapshot returned by `GET /api/setup/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetupStatus {
    pub ram_gb: f64,
    pub recommendation: Tier,
    pub ollama_running: bool,
    pub models: Vec<String>,
    pub has_gemini_key: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    Pending,
    Running,
    Completed,
    Error,
}

impl ProgressState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProgressState::Completed | ProgressState::Error)
    }
}

/// Body of `GET /api/setup/progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallProgress {
    pub status: ProgressState,
    pub message: String,
}

impl InstallProgress {
    pub fn new(status: ProgressState, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallRequest<'a> {
    pub model_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveKeyRequest<'a> {
    pub key: &'a str,
}
