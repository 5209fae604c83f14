use thiserror::Error;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Setup service returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] serde_json::Error),

    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl SetupError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SetupError::Network(_) => "Could not reach the setup service. Check that it is running.",
            SetupError::Status { .. } => "The setup service rejected the request. Please try again.",
            SetupError::Validation(_) => "Please enter an API key first.",
            SetupError::MalformedResponse(_) => "The setup service sent an unexpected response.",
            SetupError::InvalidState(_) => "That action is not available right now.",
        }
    }

    /// Transport failures and non-2xx replies both count as network errors.
    pub fn is_network(&self) -> bool {
        matches!(self, SetupError::Network(_) | SetupError::Status { .. })
    }
}

pub type SetupResult<T> = Result<T, SetupError>;

/// Replaces every occurrence of `secret` in `input` before the text reaches a
/// log line or the user.
pub fn redact_secret(input: &str, secret: &str) -> String {
    if secret.is_empty() {
        return input.to_string();
    }
    input.replace(secret, "[REDACTED]")
}
