//! Slipway Runner binary
//!
//! Entry point for CI jobs: reads its configuration from the environment
//! the CI platform provides, executes the release definition and exits
//! non-zero when any unit failed or was blocked.

use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use slipway_runner::{Config, report};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slipway_runner=info,definition=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Slipway Runner");

    let config = load_config()?;
    info!(
        "Loaded configuration: ref={}, event={}, engine={}, definition={}",
        config.ref_name,
        config.event,
        config.engine,
        config.definition_file().display()
    );

    let run = match slipway_runner::run(&config, &[]).await {
        Ok(run) => run,
        Err(e) => {
            error!("Run aborted: {:#}", e);
            return Err(e);
        }
    };

    report::log_summary(&run);
    std::process::exit(report::exit_code(&run));
}

/// Loads configuration from the environment, falling back to a dry build
/// outside CI
fn load_config() -> Result<Config> {
    let config = Config::from_env_or_default()?;
    config.validate()?;
    Ok(config)
}
