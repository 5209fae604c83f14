pub mod app;
pub mod config;

pub use app::{App, SessionEnd};
pub use config::Config;
