//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Code | Domain    | Description                                        |
//! |------|-----------|----------------------------------------------------|
//! | 0    | Universal | Success                                            |
//! | 1    | Universal | General error (unspecified)                        |
//! | 2    | Universal | CLI usage error (bad args)                         |
//! | 3    | settings  | Settings file missing, unreadable, or invalid      |
//! | 4    | store     | Database unavailable or constraint violated        |
//! | 5    | store     | Referenced account or profile does not exist       |
//! | 6    | backfill  | Sweep finished but some accounts failed            |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use bursary_claim::{ClaimError, StoreError};
use bursary_config::ConfigError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Settings / store / backfill (3-6)
// =============================================================================

/// Settings file could not be loaded or failed validation.
pub const EXIT_CONFIG: u8 = 3;

/// Store failure (database unavailable, constraint violation, corrupt row).
pub const EXIT_STORE: u8 = 4;

/// Account or profile id not found.
pub const EXIT_NOT_FOUND: u8 = 5;

/// Backfill completed with per-account failures.
pub const EXIT_BACKFILL_ERRORS: u8 = 6;

// =============================================================================
// Error mapping
// =============================================================================

pub fn store_exit_code(err: &StoreError) -> u8 {
    match err {
        StoreError::NotFound(_) => EXIT_NOT_FOUND,
        StoreError::Unavailable(_)
        | StoreError::Constraint(_)
        | StoreError::ConflictLost(_)
        | StoreError::Corrupt(_) => EXIT_STORE,
    }
}

pub fn claim_exit_code(err: &ClaimError) -> u8 {
    match err {
        ClaimError::Store(e) => store_exit_code(e),
    }
}

pub fn config_exit_code(_err: &ConfigError) -> u8 {
    EXIT_CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use bursary_claim::ProfileId;

    #[test]
    fn store_errors_map_to_codes() {
        assert_eq!(store_exit_code(&StoreError::NotFound("x".into())), EXIT_NOT_FOUND);
        assert_eq!(store_exit_code(&StoreError::Unavailable("x".into())), EXIT_STORE);
        assert_eq!(store_exit_code(&StoreError::ConflictLost(ProfileId(1))), EXIT_STORE);
        assert_eq!(
            claim_exit_code(&ClaimError::Store(StoreError::Constraint("x".into()))),
            EXIT_STORE
        );
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_CONFIG,
            EXIT_STORE,
            EXIT_NOT_FOUND,
            EXIT_BACKFILL_ERRORS,
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
