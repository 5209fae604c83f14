use anyhow::Result;
use omni_setup::config::{self, Config, BASE_URL_ENV};
use omni_setup::{App, SessionEnd};
use omni_setup_client::SetupApi;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr so prompts on stdout stay readable (RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = Config::load_or_default(&config::config_path());
    config.apply_overrides(std::env::var(BASE_URL_ENV).ok());
    let base_url = config.base_url()?;

    let api = Arc::new(SetupApi::with_options(&base_url, &config.api_options()));
    let mut app = App::new(api, config.wizard_config());

    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut out = std::io::stdout();
    match app.run(input, &mut out).await? {
        SessionEnd::AlreadyConfigured => println!("AI engine already configured."),
        SessionEnd::Unavailable => {
            eprintln!("Setup service at {base_url} is unavailable; skipping setup.")
        }
        SessionEnd::Completed | SessionEnd::Dismissed => {}
    }

    Ok(())
}
