// Application settings
// Loaded from ~/.config/bursary/settings.toml

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use bursary_claim::{ClaimOptions, EmailMatch};

use crate::error::ConfigError;

/// Destinations for claim audit records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditChannel {
    /// `log` facade at info level, target `bursary::audit`
    Log,
    /// `audit_log` table in the application database
    Database,
}

impl std::fmt::Display for AuditChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::Database => write!(f, "database"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Database file. `None` = `<data dir>/bursary/bursary.db`
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimSettings {
    pub email_match: EmailMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    pub channels: Vec<AuditChannel>,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            channels: vec![AuditChannel::Log, AuditChannel::Database],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `bursary=debug`
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub claim: ClaimSettings,
    pub audit: AuditSettings,
    pub logging: LoggingSettings,
}

const DEFAULT_FILE: &str = r#"# Bursary settings

[database]
# path = "/var/lib/bursary/bursary.db"

[claim]
# "exact" compares trimmed emails byte for byte;
# "case_insensitive" also ignores ASCII case.
email_match = "exact"

[audit]
# Allowed: "log", "database"
channels = ["log", "database"]

[logging]
filter = "info"
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bursary")
            .join("settings.toml")
    }

    /// Default database location when `database.path` is unset.
    pub fn default_database_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bursary")
            .join("bursary.db")
    }

    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// read if present and defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::config_path(), false),
        };

        if !path.exists() {
            if required {
                return Err(ConfigError::Io(format!("{}: file not found", path.display())));
            }
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audit.channels.is_empty() {
            return Err(ConfigError::Validation(
                "audit.channels must name at least one channel".into(),
            ));
        }
        let mut seen = Vec::with_capacity(self.audit.channels.len());
        for channel in &self.audit.channels {
            if seen.contains(channel) {
                return Err(ConfigError::Validation(format!(
                    "audit.channels lists '{channel}' more than once"
                )));
            }
            seen.push(*channel);
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::Validation("logging.filter must not be empty".into()));
        }
        Ok(())
    }

    /// Effective database path (configured or default).
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(Self::default_database_path)
    }

    pub fn claim_options(&self) -> ClaimOptions {
        ClaimOptions {
            email_match: self.claim.email_match,
        }
    }

    /// Write a commented default settings file unless one already exists.
    /// Returns `true` when a file was created.
    pub fn create_default_file(path: &Path) -> Result<bool, ConfigError> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::Io(format!("{}: {e}", parent.display())))?;
        }
        fs::write(path, DEFAULT_FILE)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.claim.email_match, EmailMatch::Exact);
        assert_eq!(
            settings.audit.channels,
            vec![AuditChannel::Log, AuditChannel::Database]
        );
        assert_eq!(settings.logging.filter, "info");
    }

    #[test]
    fn default_file_parses_to_defaults() {
        assert_eq!(Settings::from_toml(DEFAULT_FILE).unwrap(), Settings::default());
    }

    #[test]
    fn full_file() {
        let settings = Settings::from_toml(
            r#"
[database]
path = "/tmp/bursary-test.db"

[claim]
email_match = "case_insensitive"

[audit]
channels = ["database"]

[logging]
filter = "bursary=debug"
"#,
        )
        .unwrap();
        assert_eq!(settings.database_path(), PathBuf::from("/tmp/bursary-test.db"));
        assert_eq!(settings.claim_options().email_match, EmailMatch::CaseInsensitive);
        assert_eq!(settings.audit.channels, vec![AuditChannel::Database]);
        assert_eq!(settings.logging.filter, "bursary=debug");
    }

    #[test]
    fn unknown_channel_rejected() {
        let err = Settings::from_toml("[audit]\nchannels = [\"email\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_and_duplicate_channels_rejected() {
        let err = Settings::from_toml("[audit]\nchannels = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = Settings::from_toml("[audit]\nchannels = [\"log\", \"log\"]\n").unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn bad_email_match_rejected() {
        let err = Settings::from_toml("[claim]\nemail_match = \"fuzzy\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("missing.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn create_default_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf/settings.toml");
        assert!(Settings::create_default_file(&path).unwrap());
        assert!(!Settings::create_default_file(&path).unwrap());
        assert_eq!(Settings::load(Some(&path)).unwrap(), Settings::default());
    }
}
