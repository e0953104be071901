//! Climate & Wildlife AI dashboard.
//!
//! ```text
//! cwai-dashboard                          # interactive console
//! cwai-dashboard analyze "threats to arctic" --ecosystem arctic-terrestrial
//! cwai-dashboard --offline report 1
//! ```

mod commands;
mod config;
mod console;
mod format;
mod logging;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use cwai_api::{AnalysisApi, FixtureApi, HttpApiClient};
use cwai_protocol::Catalog;

use crate::commands::Command;
use crate::config::DashboardConfig;

#[derive(Parser, Debug)]
#[command(
    name = "cwai-dashboard",
    version,
    about = "Climate & Wildlife AI analysis dashboard",
    long_about = None
)]
struct Cli {
    /// Config file (default: <config dir>/cwai/dashboard.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Backend base URL including /api/v1. Overrides CWAI_API_URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Use the built-in offline backend.
    #[arg(long, global = true)]
    offline: bool,
    /// Per-request timeout in seconds; 0 disables it.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Option<Command>,
}

/// Layer command-line flags over the loaded config.
fn apply_cli_overrides(config: &mut DashboardConfig, cli: &Cli) {
    if let Some(url) = &cli.api_url {
        config.api.base_url = url.clone();
    }
    if cli.offline {
        config.api.offline = true;
    }
    if let Some(secs) = cli.timeout_secs {
        config.api.timeout_secs = secs;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
}

fn resolve_config(cli: &Cli) -> anyhow::Result<DashboardConfig> {
    let mut config = DashboardConfig::load(cli.config.as_deref())?;
    config.apply_env();
    apply_cli_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn build_api(config: &DashboardConfig) -> anyhow::Result<Arc<dyn AnalysisApi>> {
    if config.api.offline {
        return Ok(Arc::new(FixtureApi::new()));
    }
    Ok(Arc::new(HttpApiClient::new(config.client_config())?))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;
    let api = build_api(&config)?;

    match cli.command.clone().unwrap_or(Command::Console) {
        Command::Console => {
            let logs = logging::init_console(&config.logging.level);
            console::run_console(api, Catalog::builtin(), &config.console, logs).await
        }
        command => {
            logging::init_stderr(&config.logging.level);
            tracing::debug!(backend = %api.describe(), ?command, "Running command");
            let output = commands::execute(command, api.as_ref()).await?;
            println!("{output}");
            Ok(())
        }
    }
}
