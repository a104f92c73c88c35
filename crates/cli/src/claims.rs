//! `bursary reconcile`, `bursary backfill`, `bursary audit`.

use bursary_claim::{backfill, AccountId, AccountRegistered, AccountStore, Outcome, Registrar};

use crate::context::Context;
use crate::exit_codes::{EXIT_BACKFILL_ERRORS, EXIT_NOT_FOUND};
use crate::{print_json, CliError};

#[derive(serde::Serialize)]
struct ReconcileOutput {
    account_id: AccountId,
    outcome: Outcome,
}

/// Replay the registration event for an existing account.
pub fn cmd_reconcile(ctx: &Context, account_id: i64, json: bool) -> Result<(), CliError> {
    let account_id = AccountId(account_id);
    let account = ctx
        .store
        .get_account(account_id)
        .map_err(CliError::store)?
        .ok_or_else(|| CliError {
            code: EXIT_NOT_FOUND,
            message: format!("account {account_id} not found"),
            hint: Some("list accounts with `bursary account list`".into()),
        })?;

    let audit = ctx.audit_sink();
    let reconciler = ctx.reconciler(&audit);
    let registrar = Registrar::new(&ctx.store, &reconciler);
    let outcome = registrar
        .handle(&AccountRegistered::from(&account))
        .map_err(CliError::claim)?;

    if json {
        return print_json(&ReconcileOutput { account_id, outcome });
    }
    println!("account {account_id}: {outcome}");
    Ok(())
}

/// Reconcile every account in the database.
pub fn cmd_backfill(ctx: &Context, json: bool) -> Result<(), CliError> {
    let accounts = ctx.store.list_accounts().map_err(CliError::store)?;
    let audit = ctx.audit_sink();
    let reconciler = ctx.reconciler(&audit);
    let report = backfill(&reconciler, &accounts);

    if json {
        print_json(&report)?;
    } else {
        for pair in &report.claims {
            println!("account {} claimed profile {}", pair.account_id, pair.profile_id);
        }
        for failure in &report.failures {
            eprintln!("account {}: {}", failure.account_id, failure.message);
        }
        eprintln!(
            "backfill: {} accounts, {} claimed, {} no match, {} skipped (no email), {} errors",
            report.total, report.claimed, report.no_match, report.skipped_invalid, report.errors,
        );
    }

    if !report.is_clean() {
        return Err(CliError {
            code: EXIT_BACKFILL_ERRORS,
            message: format!("{} account(s) failed to reconcile", report.errors),
            hint: None,
        });
    }
    Ok(())
}

/// List recorded audit entries from the database channel.
pub fn cmd_audit(ctx: &Context, json: bool) -> Result<(), CliError> {
    let records = ctx.store.list_audit().map_err(CliError::store)?;
    if json {
        return print_json(&records);
    }
    for r in &records {
        println!(
            "{}  {}  account={}  profile={}",
            r.recorded_at.to_rfc3339(),
            r.event,
            r.account_id,
            r.profile_id
        );
    }
    eprintln!("{} record(s)", records.len());
    Ok(())
}
