//! # cater CLI entry point
//!
//! Parses arguments, sets up logging, picks the notifier, and hands off to
//! [`cater_cli::run`].

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cater_cli::commands::Command;
use cater_cli::notifier::CliNotifier;
use cater_workflow::WorkflowConfig;

/// Catering billing workflow over a JSON snapshot file.
///
/// Notifications go to the service at CATER_NOTIFY_URL (with
/// CATER_NOTIFY_TOKEN); without it they are logged only.
#[derive(Parser, Debug)]
#[command(name = "cater", version, about, long_about = None)]
struct Cli {
    /// Snapshot file holding quotes, invoices, milestones, and the audit log.
    #[arg(long, short = 's', global = true, default_value = "cater-state.json")]
    snapshot: PathBuf,

    /// Print full reports as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing(verbose: u8, json: bool) {
    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        })
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let setup = WorkflowConfig::from_env()
        .map_err(anyhow::Error::from)
        .and_then(|config| Ok((config, CliNotifier::from_env()?)));
    let (config, notifier) = match setup {
        Ok(setup) => setup,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };
    tracing::debug!(?config, snapshot = %cli.snapshot.display(), "cater starting");

    let mut stdout = std::io::stdout().lock();
    match cater_cli::run(&cli.snapshot, &cli.command, notifier, config, cli.json, &mut stdout).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(cater_cli::exit_code(&e))
        }
    }
}
