use serde::{Deserialize, Serialize};

use crate::audit::{AuditRecord, AuditSink};
use crate::error::{ClaimError, StoreError};
use crate::model::{Account, EmailMatch, Outcome};
use crate::store::ProfileStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimOptions {
    #[serde(default)]
    pub email_match: EmailMatch,
}

/// Binds newly registered accounts to the unclaimed profile sharing their email.
pub struct Reconciler<'a> {
    profiles: &'a dyn ProfileStore,
    audit: &'a dyn AuditSink,
    options: ClaimOptions,
}

impl<'a> Reconciler<'a> {
    pub fn new(profiles: &'a dyn ProfileStore, audit: &'a dyn AuditSink) -> Self {
        Self {
            profiles,
            audit,
            options: ClaimOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ClaimOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> ClaimOptions {
        self.options
    }

    /// Claim the lowest-id unclaimed profile whose email matches the account.
    ///
    /// A blank email is a no-op, and so is an account that already owns a
    /// profile. A claim lost to a concurrent caller reads as `NoMatch`. Store
    /// failures are returned as-is with nothing written.
    pub fn reconcile(&self, account: &Account) -> Result<Outcome, ClaimError> {
        let Some(email) = account.claim_email() else {
            log::debug!("account {} has no email; skipping claim", account.id);
            return Ok(Outcome::NoMatch);
        };

        if let Some(owned) = self.profiles.find_by_owner(account.id)? {
            log::debug!("account {} already owns profile {}", account.id, owned);
            return Ok(Outcome::NoMatch);
        }

        let Some(profile_id) = self
            .profiles
            .find_unclaimed_by_email(email, self.options.email_match)?
        else {
            log::debug!("no unclaimed profile for account {}", account.id);
            return Ok(Outcome::NoMatch);
        };

        match self.profiles.claim(profile_id, account.id) {
            Ok(()) => {}
            Err(StoreError::ConflictLost(id)) => {
                log::debug!("account {} lost claim race for profile {}", account.id, id);
                return Ok(Outcome::NoMatch);
            }
            Err(e) => return Err(e.into()),
        }

        log::info!("linked student profile {} to account {}", profile_id, account.id);
        let record = AuditRecord::profile_claimed(account.id, profile_id);
        if let Err(e) = self.audit.record(&record) {
            log::warn!("claim of profile {profile_id} not fully audited: {e}");
        }

        Ok(Outcome::Claimed(profile_id))
    }
}
