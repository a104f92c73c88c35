use serde::Serialize;

use crate::model::{Account, AccountId, Outcome, ProfileId};
use crate::reconciler::Reconciler;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClaimedPair {
    pub account_id: AccountId,
    pub profile_id: ProfileId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountFailure {
    pub account_id: AccountId,
    pub message: String,
}

/// Summary of a reconciliation sweep over existing accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub total: usize,
    pub claimed: usize,
    pub no_match: usize,
    pub skipped_invalid: usize,
    pub errors: usize,
    pub claims: Vec<ClaimedPair>,
    pub failures: Vec<AccountFailure>,
}

impl BackfillReport {
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}

/// Re-run the reconciler for every account. One failure does not stop the sweep.
pub fn backfill(reconciler: &Reconciler<'_>, accounts: &[Account]) -> BackfillReport {
    let mut report = BackfillReport {
        total: accounts.len(),
        ..Default::default()
    };

    for account in accounts {
        if account.claim_email().is_none() {
            report.skipped_invalid += 1;
            continue;
        }
        match reconciler.reconcile(account) {
            Ok(Outcome::Claimed(profile_id)) => {
                report.claimed += 1;
                report.claims.push(ClaimedPair {
                    account_id: account.id,
                    profile_id,
                });
            }
            Ok(Outcome::NoMatch) => report.no_match += 1,
            Err(e) => {
                log::error!("backfill: account {} failed: {}", account.id, e);
                report.errors += 1;
                report.failures.push(AccountFailure {
                    account_id: account.id,
                    message: e.to_string(),
                });
            }
        }
    }

    log::info!(
        "backfill: {} accounts, {} claimed, {} no match, {} skipped, {} errors",
        report.total,
        report.claimed,
        report.no_match,
        report.skipped_invalid,
        report.errors
    );
    report
}
