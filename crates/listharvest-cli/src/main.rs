use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

mod harvest;
mod profiles;

use harvest::{RunStatus, EXIT_FATAL};

#[derive(Debug, Parser)]
#[command(name = "listharvest")]
#[command(about = "Harvest paginated vendor listings for a set of coordinates")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Harvest every coordinate until its listing is exhausted (default)
    Run(RunArgs),
    /// List the built-in endpoint profiles
    Profiles,
}

/// Flags for `run`. Each one overrides the matching `LISTHARVEST_*` variable.
#[derive(Debug, Default, Clone, PartialEq, Args)]
pub(crate) struct RunArgs {
    /// Endpoint profile to harvest (see `listharvest profiles`)
    #[arg(long)]
    pub profile: Option<String>,

    /// Coordinates file, one JSON object per line
    #[arg(long, value_name = "PATH")]
    pub coordinates: Option<PathBuf>,

    /// Directory page artifacts are written to
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Harvest a single coordinate instead of reading the coordinates file
    #[arg(long, requires = "lng", allow_hyphen_values = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    pub lng: Option<f64>,

    /// Replace the profile's base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Retries per page before giving up on a coordinate
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Re-fetch pages that already have an artifact on disk
    #[arg(long)]
    pub no_resume: bool,

    /// Print the first request of each coordinate without sending anything
    #[arg(long)]
    pub dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match listharvest_core::load_app_config() {
        Ok(config) => config,
        Err(e) => {
            init_tracing("info");
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    init_tracing(&config.log_level);

    let outcome = match cli
        .command
        .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    {
        Commands::Run(args) => {
            let (handle, signal) = listharvest_scraper::stop_channel();
            tokio::spawn(async move {
                shutdown_signal().await;
                tracing::warn!("shutdown requested; stopping after the current request");
                handle.stop();
            });
            harvest::run_harvest(&config, &args, signal).await
        }
        Commands::Profiles => {
            profiles::print_profiles(&config.profile);
            Ok(RunStatus::Completed)
        }
    };

    match outcome {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "harvest aborted");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// `RUST_LOG` wins over `LISTHARVEST_LOG_LEVEL` when both are set.
fn init_tracing(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

#[cfg(test)]
mod tests;
