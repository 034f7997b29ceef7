//! Migration configuration
//!
//! ```toml
//! shadow_timeout_ms = 2000
//! diff_log = "/var/lib/dualstore/diffs.jsonl"
//!
//! [recorder]
//! queue_capacity = 1024
//! overflow_policy = "drop_newest"
//! store_timeout_ms = 5000
//!
//! [[phases]]
//! domain = "task"
//! method = "*"
//! phase = "dual_legacy_primary"
//!
//! [[classification]]
//! domain = "task"
//! path = "title"
//! class = "derived"
//! ```

use crate::error::ConfigError;
use dualstore_cutover::{PhaseEntry, PhaseTable};
use dualstore_diff::{ClassificationTable, FieldClass};
use dualstore_recorder::RecorderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Classification override row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRow {
    pub domain: String,
    pub path: String,
    pub class: FieldClass,
}

/// Everything the migration runtime needs at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Bound on each shadow call
    pub shadow_timeout_ms: u64,
    pub recorder: RecorderConfig,
    /// JSONL diff log; in-memory store when unset
    pub diff_log: Option<PathBuf>,
    /// Phase file polled for changes; overrides `phases` when set
    pub phase_file: Option<PathBuf>,
    pub reload_interval_ms: u64,
    pub phases: Vec<PhaseEntry>,
    pub classification: Vec<ClassificationRow>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            shadow_timeout_ms: 2000,
            recorder: RecorderConfig::default(),
            diff_log: None,
            phase_file: None,
            reload_interval_ms: 10_000,
            phases: Vec::new(),
            classification: Vec::new(),
        }
    }
}

impl MigrationConfig {
    /// Parse and validate TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` on malformed input, `ConfigError::Invalid` on
    /// unusable values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    ///
    /// # Errors
    /// As [`Self::from_toml_str`], plus `ConfigError::Io`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns the first unusable value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shadow_timeout_ms == 0 {
            return Err(ConfigError::invalid("shadow_timeout_ms", "must be positive"));
        }
        if self.recorder.queue_capacity == 0 {
            return Err(ConfigError::invalid("recorder.queue_capacity", "must be positive"));
        }
        if self.recorder.store_timeout_ms == 0 {
            return Err(ConfigError::invalid("recorder.store_timeout_ms", "must be positive"));
        }
        if self.phase_file.is_some() && self.reload_interval_ms == 0 {
            return Err(ConfigError::invalid("reload_interval_ms", "must be positive"));
        }
        for entry in &self.phases {
            if entry.domain.trim().is_empty() || entry.method.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "phases",
                    format!("empty key '{}'.'{}'", entry.domain, entry.method),
                ));
            }
        }
        for row in &self.classification {
            if row.domain.trim().is_empty() || row.path.trim().is_empty() {
                return Err(ConfigError::invalid(
                    "classification",
                    format!("empty row '{}'.'{}'", row.domain, row.path),
                ));
            }
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn shadow_timeout(&self) -> Duration {
        Duration::from_millis(self.shadow_timeout_ms)
    }

    #[inline]
    #[must_use]
    pub fn reload_interval(&self) -> Duration {
        Duration::from_millis(self.reload_interval_ms)
    }

    /// Phase table from `[[phases]]`
    #[must_use]
    pub fn phase_table(&self) -> PhaseTable {
        PhaseTable::from_entries(self.phases.clone())
    }

    /// Override rows from `[[classification]]`
    #[must_use]
    pub fn classification_overrides(&self) -> ClassificationTable {
        let mut table = ClassificationTable::empty();
        for row in &self.classification {
            table.insert(row.domain.clone(), row.path.clone(), row.class);
        }
        table
    }
}
