//! `bursary profile`: administrative student profile entry.

use clap::{Subcommand, ValueEnum};

use bursary_claim::{ClaimStatus, NewProfile, ProfileId, ProfileStore, StudentProfile};

use crate::context::Context;
use crate::exit_codes::EXIT_NOT_FOUND;
use crate::{print_json, CliError};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StatusArg {
    Unclaimed,
    Claimed,
}

impl From<StatusArg> for ClaimStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Unclaimed => ClaimStatus::Unclaimed,
            StatusArg::Claimed => ClaimStatus::Claimed,
        }
    }
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Provision an unclaimed student profile
    #[command(after_help = "\
Examples:
  bursary profile add --email ada@uni.edu --name 'Ada Lovelace'")]
    Add {
        /// Student email; the account registering with it claims the profile
        #[arg(long)]
        email: String,

        /// Student full name
        #[arg(long)]
        name: String,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// List student profiles
    #[command(after_help = "\
Examples:
  bursary profile list
  bursary profile list --status unclaimed --json")]
    List {
        /// Only show profiles with this claim status
        #[arg(long)]
        status: Option<StatusArg>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Show one profile
    Show {
        /// Profile id
        id: i64,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_profile(ctx: &Context, cmd: ProfileCommands) -> Result<(), CliError> {
    match cmd {
        ProfileCommands::Add { email, name, json } => cmd_profile_add(ctx, email, name, json),
        ProfileCommands::List { status, json } => cmd_profile_list(ctx, status, json),
        ProfileCommands::Show { id, json } => cmd_profile_show(ctx, ProfileId(id), json),
    }
}

fn cmd_profile_add(ctx: &Context, email: String, name: String, json: bool) -> Result<(), CliError> {
    if email.trim().is_empty() {
        return Err(CliError::args("--email must not be empty"));
    }
    let profile = ctx
        .store
        .insert_profile(NewProfile { email, full_name: name })
        .map_err(CliError::store)?;

    if json {
        return print_json(&profile);
    }
    println!("added profile {} <{}>", profile.id, profile.email);
    Ok(())
}

fn cmd_profile_list(ctx: &Context, status: Option<StatusArg>, json: bool) -> Result<(), CliError> {
    let profiles = ctx
        .store
        .list_profiles(status.map(ClaimStatus::from))
        .map_err(CliError::store)?;

    if json {
        return print_json(&profiles);
    }
    println!("{:>6}  {:<9}  {:>7}  {:<32}  NAME", "ID", "STATUS", "OWNER", "EMAIL");
    for p in &profiles {
        print_row(p);
    }
    eprintln!("{} profile(s)", profiles.len());
    Ok(())
}

fn cmd_profile_show(ctx: &Context, id: ProfileId, json: bool) -> Result<(), CliError> {
    let profile = ctx
        .store
        .get_profile(id)
        .map_err(CliError::store)?
        .ok_or_else(|| CliError {
            code: EXIT_NOT_FOUND,
            message: format!("profile {id} not found"),
            hint: None,
        })?;

    if json {
        return print_json(&profile);
    }
    print_row(&profile);
    Ok(())
}

fn print_row(p: &StudentProfile) {
    let owner = p.owner().map(|a| a.to_string()).unwrap_or_else(|| "-".into());
    println!(
        "{:>6}  {:<9}  {:>7}  {:<32}  {}",
        p.id,
        p.status(),
        owner,
        p.email,
        p.full_name
    );
}
