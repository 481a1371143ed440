//! Userbot fleet entry point
//!
//! Run with:
//! ```bash
//! cargo run -p adwatch-fleet --features mtproto
//! ```
//!
//! Configuration is loaded from environment variables and `.env`.

use adwatch_common::{try_init_tracing_with_config, AppConfig, AppError, TracingConfig};
use clap::Parser;
use tracing::{error, info};

/// Telegram userbot fleet
#[derive(Debug, Parser)]
#[command(name = "adwatch-fleet", version, about)]
struct Cli {
    /// Check every stored session's authorization, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(&TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(cli, config).await {
        error!(error = %e, code = e.error_code(), "Fleet service failed");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<(), AppError> {
    info!(
        env = ?config.app.env,
        check = cli.check,
        "Configuration loaded"
    );

    if cli.check {
        adwatch_fleet::check_sessions(config).await
    } else {
        adwatch_fleet::run(config).await
    }
}
