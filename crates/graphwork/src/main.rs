//! graphwork - Microsoft Graph from the command line
//!
//! Main entry point for the graphwork CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

mod commands;
mod prompt;

use commands::{files, me, token, users, workflow};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// graphwork - Microsoft Graph token flows, paging and workbook workflows
#[derive(Parser)]
#[command(name = "graphwork")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding config.toml (default: platform config dir)
    #[arg(long, global = true, env = "GRAPHWORK_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Acquire a token with one of the credential flows
    Token(token::TokenArgs),

    /// Show the signed-in user's profile
    Me(me::MeArgs),

    /// Enumerate every user in the tenant
    Users(users::UsersArgs),

    /// List the files in a site folder
    Files(files::FilesArgs),

    /// Copy a workbook template and rewrite its range
    CopyTransform(workflow::CopyTransformArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console (human-readable) + rotating JSON file
    let filter = if cli.verbose {
        "graphwork=debug,graphwork_auth=debug,graphwork_client=debug,graphwork_config=debug,info"
    } else {
        "graphwork=info,graphwork_auth=info,graphwork_client=info,warn"
    };

    let log_dir = cli
        .config_dir
        .clone()
        .or_else(graphwork_config::user_config_dir)
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "graphwork.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "graphwork=trace,graphwork_auth=trace,graphwork_client=trace,graphwork_config=trace,info",
                )),
        )
        .init();

    let loaded = graphwork_config::load_config_with_options(
        None,
        cli.config_dir.as_deref(),
        &graphwork_config::process_env,
    )?;
    for warning in &loaded.warnings {
        tracing::warn!("{}", warning);
    }
    tracing::debug!(
        sources = ?loaded.loaded_from(),
        env_overrides = ?loaded.env_overrides,
        "configuration loaded"
    );

    // Ctrl-C aborts whatever request is in flight.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let ctx = commands::Context {
        config: loaded.config,
        json_output: cli.json,
        verbose: cli.verbose,
        cancel,
    };

    match cli.command {
        Commands::Token(args) => token::run(args, &ctx).await,
        Commands::Me(args) => me::run(args, &ctx).await,
        Commands::Users(args) => users::run(args, &ctx).await,
        Commands::Files(args) => files::run(args, &ctx).await,
        Commands::CopyTransform(args) => workflow::run(args, &ctx).await,
    }
}
