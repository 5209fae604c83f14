use crate::backend::SetupBackend;
use crate::error::{SetupError, SetupResult};
use crate::types::{InstallProgress, InstallRequest, SaveKeyRequest, SetupStatus};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

const STATUS_PATH: &str = "api/setup/status";
const INSTALL_PATH: &str = "api/setup/install_local";
const PROGRESS_PATH: &str = "api/setup/progress";
const SAVE_KEY_PATH: &str = "api/setup/save_key";

#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub connect_timeout: Duration,
    /// `None` leaves requests bounded only by the transport.
    pub request_timeout: Option<Duration>,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: None,
        }
    }
}

#[derive(Clone)]
pub struct SetupApi {
    client: Client,
    base_url: String,
}

impl SetupApi {
    pub fn new(base_url: &Url) -> Self {
        Self::with_options(base_url, &ApiOptions::default())
    }

    pub fn with_options(base_url: &Url, options: &ApiOptions) -> Self {
        let mut builder = Client::builder()
            .user_agent("omni-setup/0.2")
            .connect_timeout(options.connect_timeout);
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

async fn ensure_success(response: Response) -> SetupResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(SetupError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> SetupResult<T> {
    let response = ensure_success(response).await?;
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl SetupBackend for SetupApi {
    async fn fetch_status(&self) -> SetupResult<SetupStatus> {
        let response = self.client.get(self.endpoint(STATUS_PATH)).send().await?;
        read_json(response).await
    }

    async fn install_local(&self, model_name: &str) -> SetupResult<()> {
        debug!(model = model_name, "Requesting local model install");
        let response = self
            .client
            .post(self.endpoint(INSTALL_PATH))
            .json(&InstallRequest { model_name })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn fetch_progress(&self) -> SetupResult<InstallProgress> {
        let response = self
            .client
            .get(self.endpoint(PROGRESS_PATH))
            .send()
            .await?;
        read_json(response).await
    }

    async fn save_key(&self, key: &str) -> SetupResult<()> {
        let response = self
            .client
            .post(self.endpoint(SAVE_KEY_PATH))
            .json(&SaveKeyRequest { key })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
