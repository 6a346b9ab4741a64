//! # kudos CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.
//! Uses clap derive macros; every subcommand talks to a running kudos-api
//! instance over HTTP.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kudos_cli::client::ApiClient;
use kudos_cli::reset::{run_reset, ResetArgs};
use kudos_cli::status::{run_status, StatusArgs};
use kudos_cli::user::{run_user, UserArgs};

/// Kudos operator CLI.
///
/// Drives the administrative API of a running kudos-api instance: account
/// provisioning and deactivation, the weekly point reset, and health
/// checks.
#[derive(Parser, Debug)]
#[command(name = "kudos", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Base URL of the kudos-api instance.
    #[arg(long, global = true, env = "KUDOS_API_URL", default_value = "http://localhost:8080")]
    api_url: String,

    /// Session token of an admin account (from /api/auth/login).
    #[arg(long, global = true, env = "KUDOS_API_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Account administration (list, add, deactivate).
    User(UserArgs),

    /// Apply the weekly point reset.
    Reset(ResetArgs),

    /// Check service health probes.
    Status(StatusArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let client = ApiClient::new(&cli.api_url, cli.token.clone());

    let result = match &cli.command {
        Commands::User(args) => run_user(args, &client).await,
        Commands::Reset(args) => run_reset(args, &client).await,
        Commands::Status(args) => run_status(args, &client).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
