//! Per-invocation wiring: settings, database, and audit channels.

use std::path::{Path, PathBuf};

use bursary_claim::{AuditSink, FanoutSink, LogSink, Reconciler};
use bursary_config::{AuditChannel, Settings};
use bursary_store::{DatabaseSink, SqliteStore};

use crate::exit_codes::{config_exit_code, store_exit_code};
use crate::CliError;

pub struct Context {
    pub settings: Settings,
    pub db_path: PathBuf,
    pub store: SqliteStore,
}

/// Load settings from `--config` (or the default location).
pub fn load_settings(config: Option<&Path>) -> Result<Settings, CliError> {
    Settings::load(config).map_err(|e| {
        let hint = match config {
            Some(_) => None,
            None => Some(format!("settings file: {}", Settings::config_path().display())),
        };
        CliError {
            code: config_exit_code(&e),
            message: e.to_string(),
            hint,
        }
    })
}

impl Context {
    /// Open the database named by `--db`, falling back to settings.
    pub fn open(settings: Settings, db: Option<PathBuf>) -> Result<Self, CliError> {
        let db_path = db.unwrap_or_else(|| settings.database_path());
        let store = SqliteStore::open(&db_path).map_err(|e| CliError {
            code: store_exit_code(&e),
            message: e.to_string(),
            hint: Some(format!("database: {}", db_path.display())),
        })?;
        log::debug!(
            "email matching: {}, audit channels: {:?}",
            settings.claim.email_match, settings.audit.channels
        );
        Ok(Self {
            settings,
            db_path,
            store,
        })
    }

    /// Audit fan-out built from `audit.channels`.
    pub fn audit_sink(&self) -> FanoutSink<'_> {
        let mut sink = FanoutSink::default();
        for channel in &self.settings.audit.channels {
            let boxed: Box<dyn AuditSink + '_> = match channel {
                AuditChannel::Log => Box::new(LogSink),
                AuditChannel::Database => Box::new(DatabaseSink::new(&self.store)),
            };
            sink.push(boxed);
        }
        sink
    }

    pub fn reconciler<'a>(&'a self, audit: &'a FanoutSink<'a>) -> Reconciler<'a> {
        Reconciler::new(&self.store, audit).with_options(self.settings.claim_options())
    }
}
