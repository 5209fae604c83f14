use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use omni_setup_client::{ApiOptions, DEFAULT_BASE_URL};
use omni_setup_wizard::config::{DEFAULT_GRACE_DELAY, DEFAULT_POLL_INTERVAL};
use omni_setup_wizard::WizardConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const BASE_URL_ENV: &str = "OMNI_SETUP_BASE_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub wizard: WizardSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardSection {
    pub poll_interval_ms: u64,
    pub grace_delay_ms: u64,
    pub poll_failure_budget: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: None,
        }
    }
}

impl Default for WizardSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            grace_delay_ms: DEFAULT_GRACE_DELAY.as_millis() as u64,
            poll_failure_budget: 0,
        }
    }
}

pub fn config_path() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("com", "omni-ide", "omni-setup") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("config/default.toml")
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring config file: {e:#}");
            Self::default()
        })
    }

    pub fn apply_overrides(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.backend.base_url = url.trim().to_string();
        }
    }

    pub fn base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.backend.base_url)
            .with_context(|| format!("invalid backend base_url {:?}", self.backend.base_url))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(anyhow!("unsupported backend scheme {other:?}")),
        }
    }

    pub fn api_options(&self) -> ApiOptions {
        ApiOptions {
            connect_timeout: Duration::from_secs(self.backend.connect_timeout_secs),
            request_timeout: self.backend.request_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn wizard_config(&self) -> WizardConfig {
        WizardConfig {
            poll_interval: Duration::from_millis(self.wizard.poll_interval_ms),
            grace_delay: Duration::from_millis(self.wizard.grace_delay_ms),
            poll_failure_budget: self.wizard.poll_failure_budget,
        }
    }
}
