//! `bursary account`: registration and listing.

use clap::Subcommand;

use bursary_claim::{AccountStore, ClaimResult, NewAccount, Outcome, Registrar};

use crate::context::Context;
use crate::{print_json, CliError};

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Register an account and claim its student profile
    #[command(after_help = "\
Examples:
  bursary account register --email ada@uni.edu
  bursary account register --email ada@uni.edu --name Ada --json")]
    Register {
        /// Account email
        #[arg(long)]
        email: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// List registered accounts
    List {
        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_account(ctx: &Context, cmd: AccountCommands) -> Result<(), CliError> {
    match cmd {
        AccountCommands::Register { email, name, json } => cmd_account_register(ctx, email, name, json),
        AccountCommands::List { json } => cmd_account_list(ctx, json),
    }
}

fn cmd_account_register(
    ctx: &Context,
    email: String,
    name: Option<String>,
    json: bool,
) -> Result<(), CliError> {
    let audit = ctx.audit_sink();
    let reconciler = ctx.reconciler(&audit);
    let registrar = Registrar::new(&ctx.store, &reconciler);

    let registration = registrar
        .register(NewAccount { email, name })
        .map_err(CliError::store)?;

    if json {
        return print_json(&registration);
    }

    println!("registered account {}", registration.account.id);
    // Claim failures never fail registration.
    match &registration.claim {
        ClaimResult::Done { outcome: Outcome::Claimed(profile_id) } => {
            println!("claimed student profile {profile_id}");
        }
        ClaimResult::Done { outcome: Outcome::NoMatch } => {
            eprintln!("no unclaimed student profile for this email");
        }
        ClaimResult::Failed { message } => {
            eprintln!("warning: profile claim failed: {message}");
            eprintln!("hint:    retry with `bursary reconcile --account {}`", registration.account.id);
        }
    }
    Ok(())
}

fn cmd_account_list(ctx: &Context, json: bool) -> Result<(), CliError> {
    let accounts = ctx.store.list_accounts().map_err(CliError::store)?;
    if json {
        return print_json(&accounts);
    }
    println!("{:>6}  {:<32}  NAME", "ID", "EMAIL");
    for a in &accounts {
        println!(
            "{:>6}  {:<32}  {}",
            a.id,
            a.email,
            a.name.as_deref().unwrap_or("-")
        );
    }
    eprintln!("{} account(s)", accounts.len());
    Ok(())
}
