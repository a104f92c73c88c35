// SQLite-backed profile and account stores

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use bursary_claim::{
    Account, AccountId, AccountStore, AuditRecord, ClaimState, ClaimStatus, EmailMatch,
    NewAccount, NewProfile, ProfileId, ProfileStore, StoreError, StudentProfile,
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT UNIQUE,                   -- NULL when the account has no email
    name TEXT,
    created_at TEXT NOT NULL             -- RFC 3339, UTC
);

CREATE TABLE IF NOT EXISTS student_profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL,
    full_name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'unclaimed'
        CHECK (status IN ('unclaimed', 'claimed')),
    account_id INTEGER,                  -- NULL while unclaimed
    claimed_at TEXT,
    created_at TEXT NOT NULL,
    CHECK ((status = 'claimed') = (account_id IS NOT NULL))
);

-- Emails are trimmed on insert, so lookups compare the column directly.
CREATE INDEX IF NOT EXISTS idx_profiles_unclaimed_email
    ON student_profiles (email) WHERE status = 'unclaimed';
CREATE INDEX IF NOT EXISTS idx_profiles_unclaimed_email_ci
    ON student_profiles (lower(email)) WHERE status = 'unclaimed';

-- An account owns at most one profile.
CREATE UNIQUE INDEX IF NOT EXISTS idx_profiles_owner
    ON student_profiles (account_id) WHERE account_id IS NOT NULL;

CREATE TABLE IF NOT EXISTS audit_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    profile_id INTEGER NOT NULL,
    recorded_at TEXT NOT NULL
);
"#;

const PROFILE_COLUMNS: &str =
    "id, email, full_name, status, account_id, claimed_at, created_at";

const ACCOUNT_COLUMNS: &str = "id, email, name, created_at";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Map a SQLite failure onto the store taxonomy.
pub(crate) fn store_err(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, msg) if err.code == ErrorCode::ConstraintViolation => {
            StoreError::Constraint(msg.clone().unwrap_or_else(|| e.to_string()))
        }
        _ => StoreError::Unavailable(e.to_string()),
    }
}

fn parse_time(column: &str, value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt(format!("{column}: bad timestamp '{value}'")))
}

/// Raw profile row, validated into a `StudentProfile` by `into_profile`.
struct ProfileRow {
    id: i64,
    email: String,
    full_name: String,
    status: String,
    account_id: Option<i64>,
    claimed_at: Option<String>,
    created_at: String,
}

impl ProfileRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            full_name: row.get(2)?,
            status: row.get(3)?,
            account_id: row.get(4)?,
            claimed_at: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn into_profile(self) -> Result<StudentProfile, StoreError> {
        let status = ClaimStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("profile {}: unknown status '{}'", self.id, self.status))
        })?;
        let claim = match (status, self.account_id) {
            (ClaimStatus::Unclaimed, None) => ClaimState::Unclaimed,
            (ClaimStatus::Claimed, Some(account_id)) => {
                let claimed_at = match self.claimed_at.as_deref() {
                    Some(t) => parse_time("claimed_at", t)?,
                    None => {
                        return Err(StoreError::Corrupt(format!(
                            "profile {}: claimed without claimed_at",
                            self.id
                        )))
                    }
                };
                ClaimState::Claimed {
                    account_id: AccountId(account_id),
                    claimed_at,
                }
            }
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "profile {}: status '{}' disagrees with owner",
                    self.id, self.status
                )))
            }
        };
        Ok(StudentProfile {
            id: ProfileId(self.id),
            email: self.email,
            full_name: self.full_name,
            claim,
            created_at: parse_time("created_at", &self.created_at)?,
        })
    }
}

struct AccountRow {
    id: i64,
    email: Option<String>,
    name: Option<String>,
    created_at: String,
}

impl AccountRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_account(self) -> Result<Account, StoreError> {
        Ok(Account {
            id: AccountId(self.id),
            email: self.email.unwrap_or_default(),
            name: self.name,
            created_at: parse_time("created_at", &self.created_at)?,
        })
    }
}

/// Accounts, profiles, and the audit log in one SQLite database.
///
/// The connection is held behind a mutex so the store can be shared across
/// threads. Separate processes coordinate through SQLite's own locking.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Unavailable(format!("{}: {e}", parent.display())))?;
            }
        }
        let conn = Connection::open(path).map_err(store_err)?;
        log::debug!("opened database {}", path.display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(store_err)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(store_err)?;
        conn.execute_batch(SCHEMA).map_err(store_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append one audit record.
    pub fn append_audit(&self, record: &AuditRecord) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute(
                "INSERT INTO audit_log (event, account_id, profile_id, recorded_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.event,
                    record.account_id.0,
                    record.profile_id.0,
                    record.recorded_at.to_rfc3339()
                ],
            )
            .map_err(store_err)?;
        Ok(())
    }

    /// All audit records in insertion order.
    pub fn list_audit(&self) -> Result<Vec<AuditRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare("SELECT event, account_id, profile_id, recorded_at FROM audit_log ORDER BY id")
            .map_err(store_err)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(store_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (event, account_id, profile_id, recorded_at) = row.map_err(store_err)?;
            records.push(AuditRecord {
                event,
                account_id: AccountId(account_id),
                profile_id: ProfileId(profile_id),
                recorded_at: parse_time("recorded_at", &recorded_at)?,
            });
        }
        Ok(records)
    }

    fn query_profiles(
        &self,
        sql: &str,
        args: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<StudentProfile>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).map_err(store_err)?;
        let rows = stmt.query_map(args, ProfileRow::from_row).map_err(store_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err)?.into_profile()?);
        }
        Ok(out)
    }
}

impl ProfileStore for SqliteStore {
    fn find_unclaimed_by_email(
        &self,
        email: &str,
        mode: EmailMatch,
    ) -> Result<Option<ProfileId>, StoreError> {
        let sql = match mode {
            EmailMatch::Exact => {
                "SELECT id FROM student_profiles
                 WHERE email = ?1 AND status = 'unclaimed' AND account_id IS NULL
                 ORDER BY id LIMIT 1"
            }
            EmailMatch::CaseInsensitive => {
                "SELECT id FROM student_profiles
                 WHERE lower(email) = ?1 AND status = 'unclaimed' AND account_id IS NULL
                 ORDER BY id LIMIT 1"
            }
        };
        let needle = mode.normalize(email);
        let id: Option<i64> = self
            .conn
            .lock()
            .query_row(sql, params![needle], |row| row.get(0))
            .optional()
            .map_err(store_err)?;
        Ok(id.map(ProfileId))
    }

    fn find_by_owner(&self, account_id: AccountId) -> Result<Option<ProfileId>, StoreError> {
        let id: Option<i64> = self
            .conn
            .lock()
            .query_row(
                "SELECT id FROM student_profiles WHERE account_id = ?1",
                params![account_id.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        Ok(id.map(ProfileId))
    }

    fn claim(&self, profile_id: ProfileId, account_id: AccountId) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        // Single conditional update: owner and status change together or not at all,
        // and never for an account that already owns a profile.
        let changed = conn
            .execute(
                "UPDATE student_profiles
                 SET status = 'claimed', account_id = ?2, claimed_at = ?3
                 WHERE id = ?1 AND status = 'unclaimed' AND account_id IS NULL
                   AND NOT EXISTS (SELECT 1 FROM student_profiles WHERE account_id = ?2)",
                params![profile_id.0, account_id.0, Utc::now().to_rfc3339()],
            )
            .map_err(store_err)?;
        if changed == 1 {
            return Ok(());
        }

        let exists: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM student_profiles WHERE id = ?1",
                params![profile_id.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(store_err)?;
        match exists {
            Some(_) => Err(StoreError::ConflictLost(profile_id)),
            None => Err(StoreError::NotFound(format!("profile {profile_id}"))),
        }
    }

    fn insert_profile(&self, new: NewProfile) -> Result<StudentProfile, StoreError> {
        let created_at = Utc::now();
        let email = new.email.trim().to_string();
        let id = {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO student_profiles (email, full_name, status, created_at) VALUES (?1, ?2, 'unclaimed', ?3)",
                params![email, new.full_name, created_at.to_rfc3339()],
            )
            .map_err(store_err)?;
            conn.last_insert_rowid()
        };
        Ok(StudentProfile {
            id: ProfileId(id),
            email,
            full_name: new.full_name,
            claim: ClaimState::Unclaimed,
            created_at,
        })
    }

    fn get_profile(&self, id: ProfileId) -> Result<Option<StudentProfile>, StoreError> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM student_profiles WHERE id = ?1");
        Ok(self.query_profiles(&sql, &[&id.0 as &dyn rusqlite::ToSql])?.into_iter().next())
    }

    fn list_profiles(&self, status: Option<ClaimStatus>) -> Result<Vec<StudentProfile>, StoreError> {
        match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {PROFILE_COLUMNS} FROM student_profiles WHERE status = ?1 ORDER BY id"
                );
                self.query_profiles(&sql, &[&status.as_str() as &dyn rusqlite::ToSql])
            }
            None => {
                let sql = format!("SELECT {PROFILE_COLUMNS} FROM student_profiles ORDER BY id");
                self.query_profiles(&sql, &[])
            }
        }
    }
}

impl AccountStore for SqliteStore {
    fn insert_account(&self, new: NewAccount) -> Result<Account, StoreError> {
        let created_at = Utc::now();
        let email = new.email.trim().to_string();
        let stored_email = if email.is_empty() { None } else { Some(email.as_str()) };
        let id = {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO accounts (email, name, created_at) VALUES (?1, ?2, ?3)",
                params![stored_email, new.name, created_at.to_rfc3339()],
            )
            .map_err(|e| match store_err(e) {
                StoreError::Constraint(_) => {
                    StoreError::Constraint(format!("account email '{email}' already registered"))
                }
                other => other,
            })?;
            conn.last_insert_rowid()
        };
        Ok(Account {
            id: AccountId(id),
            email,
            name: new.name,
            created_at,
        })
    }

    fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = self
            .conn
            .lock()
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                params![id.0],
                AccountRow::from_row,
            )
            .optional()
            .map_err(store_err)?;
        row.map(AccountRow::into_account).transpose()
    }

    fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = self
            .conn
            .lock()
            .query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
                params![email.trim()],
                AccountRow::from_row,
            )
            .optional()
            .map_err(store_err)?;
        row.map(AccountRow::into_account).transpose()
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id"))
            .map_err(store_err)?;
        let rows = stmt.query_map([], AccountRow::from_row).map_err(store_err)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(store_err)?.into_account()?);
        }
        Ok(out)
    }
}
