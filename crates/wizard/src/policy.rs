//! Pure decisions derived from a [`SetupStatus`] snapshot. No I/O.

use omni_setup_client::{SetupStatus, Tier};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelId {
    name: &'static str,
    download_size: &'static str,
}

pub const PRO_MODEL: ModelId = ModelId {
    name: "qwen2.5-coder:7b",
    download_size: "4.7 GB",
};

pub const LITE_MODEL: ModelId = ModelId {
    name: "qwen2.5-coder:3b",
    download_size: "1.9 GB",
};

impl ModelId {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.download_size)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupPath {
    Cloud,
    Hybrid,
}

/// The wizard is shown whenever no cloud credential is stored. Local models or
/// a running daemon never suppress it: a missing key means setup is incomplete.
pub fn decide_visibility(status: &SetupStatus) -> bool {
    !status.has_gemini_key
}

pub fn install_target(status: &SetupStatus) -> ModelId {
    match status.recommendation {
        Tier::HybridPro => PRO_MODEL,
        Tier::HybridLite | Tier::CloudOnly => LITE_MODEL,
    }
}

/// Installing needs the local daemon, whatever the tier.
pub fn install_enabled(status: &SetupStatus) -> bool {
    status.ollama_running
}

pub fn recommended_path(tier: Tier) -> SetupPath {
    if tier.is_hybrid() {
        SetupPath::Hybrid
    } else {
        SetupPath::Cloud
    }
}
