//! Webapp Devkit
//!
//! Deployment toolkit for small data-science web apps (Streamlit, Dash,
//! FastAPI): config sync, container smoke tests, and AWS role credential
//! provisioning.

use clap::Parser;
use std::path::PathBuf;
use webapp_devkit::{commands, commands::Commands, Project};

/// Webapp Devkit
///
/// Deployment toolkit for small data-science web apps.
#[derive(Parser, Debug)]
#[command(name = "webapp-devkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project root directory (defaults to the current directory)
    #[arg(long, value_name = "DIR", global = true)]
    project_root: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Load .env if present, so AWS_PROFILE and friends can live there
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let project = match cli.project_root {
        Some(root) => Ok(Project::new(root)),
        None => Project::discover(),
    };
    let project = match project {
        Ok(project) => project,
        Err(err) => {
            eprintln!("Error: {}", err);
            std::process::exit(err.exit_code());
        }
    };

    if let Err(err) = commands::execute(cli.command, &project).await {
        eprintln!("Error: {}", err);
        std::process::exit(err.exit_code());
    }
}

/// Initialize tracing with RUST_LOG or the given level (default: warn).
///
/// Operator-facing progress goes to stdout via println; tracing output is
/// diagnostics only and goes to stderr.
fn init_tracing(log_level: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level.unwrap_or("warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
