use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(pub i64);

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Display for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// A registered user account. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The trimmed email, or `None` when the account carries no usable address.
    pub fn claim_email(&self) -> Option<&str> {
        let trimmed = self.email.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}

/// Input for account registration.
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub name: Option<String>,
}

/// Emitted once an account has been created. Delivery is at-least-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRegistered {
    pub account_id: AccountId,
    pub email: String,
}

impl From<&Account> for AccountRegistered {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            email: account.email.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Student profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Unclaimed,
    Claimed,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unclaimed => "unclaimed",
            Self::Claimed => "claimed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unclaimed" => Some(Self::Unclaimed),
            "claimed" => Some(Self::Claimed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Owner is carried only by the `Claimed` state, so a profile can never have
/// an owning account while unclaimed (or vice versa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClaimState {
    Unclaimed,
    Claimed {
        account_id: AccountId,
        claimed_at: DateTime<Utc>,
    },
}

/// A pre-provisioned scholarship record for a student who may not have an account yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: ProfileId,
    pub email: String,
    pub full_name: String,
    #[serde(flatten)]
    pub claim: ClaimState,
    pub created_at: DateTime<Utc>,
}

impl StudentProfile {
    pub fn status(&self) -> ClaimStatus {
        match self.claim {
            ClaimState::Unclaimed => ClaimStatus::Unclaimed,
            ClaimState::Claimed { .. } => ClaimStatus::Claimed,
        }
    }

    pub fn owner(&self) -> Option<AccountId> {
        match self.claim {
            ClaimState::Unclaimed => None,
            ClaimState::Claimed { account_id, .. } => Some(account_id),
        }
    }

    pub fn is_unclaimed(&self) -> bool {
        self.claim == ClaimState::Unclaimed
    }
}

/// Input for administrative profile entry. New profiles always start unclaimed.
#[derive(Debug, Clone, Default)]
pub struct NewProfile {
    pub email: String,
    pub full_name: String,
}

// ---------------------------------------------------------------------------
// Email matching
// ---------------------------------------------------------------------------

/// How a registering account's email is compared against profile emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailMatch {
    /// Byte-for-byte after trimming surrounding whitespace.
    #[default]
    Exact,
    /// Trimmed and ASCII-lowercased on both sides.
    CaseInsensitive,
}

impl EmailMatch {
    /// Normalize an email for comparison under this mode.
    pub fn normalize(&self, email: &str) -> String {
        match self {
            Self::Exact => email.trim().to_string(),
            Self::CaseInsensitive => email.trim().to_ascii_lowercase(),
        }
    }

    pub fn matches(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }
}

impl std::fmt::Display for EmailMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::CaseInsensitive => write!(f, "case_insensitive"),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a single reconciliation. Store failures travel in the `Err` arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "profile_id", rename_all = "snake_case")]
pub enum Outcome {
    Claimed(ProfileId),
    NoMatch,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Claimed(id) => write!(f, "claimed profile {id}"),
            Self::NoMatch => write!(f, "no match"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str) -> Account {
        Account {
            id: AccountId(1),
            email: email.into(),
            name: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn blank_email_has_no_claim_email() {
        assert_eq!(account("").claim_email(), None);
        assert_eq!(account("   ").claim_email(), None);
        assert_eq!(account(" a@x.com ").claim_email(), Some("a@x.com"));
    }

    #[test]
    fn email_match_modes() {
        assert!(EmailMatch::Exact.matches("a@x.com", " a@x.com"));
        assert!(!EmailMatch::Exact.matches("A@x.com", "a@x.com"));
        assert!(EmailMatch::CaseInsensitive.matches("A@X.com", "a@x.COM"));
        assert!(!EmailMatch::CaseInsensitive.matches("a@x.com", "b@x.com"));
    }

    #[test]
    fn claimed_profile_serializes_flat() {
        let profile = StudentProfile {
            id: ProfileId(9),
            email: "c@x.com".into(),
            full_name: "Chidi".into(),
            claim: ClaimState::Claimed {
                account_id: AccountId(2),
                claimed_at: "2026-01-15T10:00:00Z".parse().unwrap(),
            },
            created_at: "2026-01-01T00:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["status"], "claimed");
        assert_eq!(json["account_id"], 2);
        assert_eq!(profile.status(), ClaimStatus::Claimed);
        assert_eq!(profile.owner(), Some(AccountId(2)));
    }

    #[test]
    fn outcome_json_shape() {
        let json = serde_json::to_value(Outcome::Claimed(ProfileId(7))).unwrap();
        assert_eq!(json["outcome"], "claimed");
        assert_eq!(json["profile_id"], 7);
        let json = serde_json::to_value(Outcome::NoMatch).unwrap();
        assert_eq!(json["outcome"], "no_match");
    }

    #[test]
    fn status_parse_round_trip() {
        for s in [ClaimStatus::Unclaimed, ClaimStatus::Claimed] {
            assert_eq!(ClaimStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ClaimStatus::parse("pending"), None);
    }
}
