pub mod api;
pub mod backend;
pub mod error;
pub mod types;

pub use api::{ApiOptions, SetupApi, DEFAULT_BASE_URL};
pub use backend::SetupBackend;
pub use error::{redact_secret, SetupError, SetupResult};
pub use types::*;
