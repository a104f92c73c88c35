// Bursary CLI - student profile administration and claim reconciliation

mod account;
mod claims;
mod context;
mod exit_codes;
mod logging;
mod profile;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use bursary_claim::{ClaimError, StoreError};
use bursary_config::Settings;

use account::AccountCommands;
use context::Context;
use exit_codes::{claim_exit_code, config_exit_code, store_exit_code, EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};
use profile::ProfileCommands;

#[derive(Parser)]
#[command(name = "bursary")]
#[command(about = "Scholarship back office: student profiles and account claims")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Database file (overrides settings)
    #[arg(long, global = true, env = "BURSARY_DB")]
    db: Option<PathBuf>,

    /// Settings file (default: <config dir>/bursary/settings.toml)
    #[arg(long, global = true, env = "BURSARY_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `bursary=debug` (overrides settings)
    #[arg(long, global = true, env = "BURSARY_LOG")]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    #[command(after_help = "\
Examples:
  bursary init
  bursary init --db ./bursary.db --write-config")]
    Init {
        /// Also write a commented default settings file if none exists
        #[arg(long)]
        write_config: bool,
    },

    /// Manage student profiles
    #[command(subcommand)]
    Profile(ProfileCommands),

    /// Register and list accounts
    #[command(subcommand)]
    Account(AccountCommands),

    /// Re-deliver the registration event for an existing account
    #[command(after_help = "\
Examples:
  bursary reconcile --account 3
  bursary reconcile --account 3 --json")]
    Reconcile {
        /// Account id
        #[arg(long)]
        account: i64,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Reconcile every registered account (recovers from lost events)
    Backfill {
        /// Output JSON report to stdout
        #[arg(long)]
        json: bool,
    },

    /// List recorded claim audit entries
    Audit {
        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let write_config = matches!(cli.command, Commands::Init { write_config: true });
    let settings = match cli.config.as_deref() {
        // `init --write-config --config <new file>` creates the file below.
        Some(path) if write_config && !path.exists() => Settings::default(),
        config => context::load_settings(config)?,
    };
    let filter = cli.log.clone().unwrap_or_else(|| settings.logging.filter.clone());
    logging::init(&filter);

    let ctx = Context::open(settings, cli.db)?;

    match cli.command {
        Commands::Init { .. } => cmd_init(&ctx, cli.config, write_config),
        Commands::Profile(cmd) => profile::cmd_profile(&ctx, cmd),
        Commands::Account(cmd) => account::cmd_account(&ctx, cmd),
        Commands::Reconcile { account, json } => claims::cmd_reconcile(&ctx, account, json),
        Commands::Backfill { json } => claims::cmd_backfill(&ctx, json),
        Commands::Audit { json } => claims::cmd_audit(&ctx, json),
    }
}

fn cmd_init(ctx: &Context, config: Option<PathBuf>, write_config: bool) -> Result<(), CliError> {
    // Opening the context already applied the schema.
    println!("database ready: {}", ctx.db_path.display());

    if write_config {
        let path = config.unwrap_or_else(Settings::config_path);
        let created = Settings::create_default_file(&path).map_err(|e| CliError {
            code: config_exit_code(&e),
            message: e.to_string(),
            hint: None,
        })?;
        if created {
            println!("wrote settings: {}", path.display());
        } else {
            eprintln!("settings already exist: {}", path.display());
        }
    }
    Ok(())
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError {
        code: EXIT_ERROR,
        message: format!("JSON serialization error: {e}"),
        hint: None,
    })?;
    println!("{json}");
    Ok(())
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn store(err: StoreError) -> Self {
        let hint = match &err {
            StoreError::Constraint(_) => Some("the record conflicts with an existing one".to_string()),
            StoreError::Unavailable(_) => Some("check the database path and permissions".to_string()),
            _ => None,
        };
        Self { code: store_exit_code(&err), message: err.to_string(), hint }
    }

    pub fn claim(err: ClaimError) -> Self {
        Self { code: claim_exit_code(&err), message: err.to_string(), hint: None }
    }
}
