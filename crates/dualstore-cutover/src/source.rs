//! Dynamic phase sources
//!
//! Phases are owned by deployment configuration, not compiled in. A
//! [`PhaseSource`] produces a fresh [`PhaseTable`] whenever the controller
//! reloads.

use crate::error::CutoverError;
use crate::table::{PhaseEntry, PhaseTable};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source of phase configuration
#[async_trait]
pub trait PhaseSource: Send + Sync + std::fmt::Debug {
    /// Load the current table
    async fn load(&self) -> Result<PhaseTable, CutoverError>;
}

/// Fixed table (tests, embedded defaults)
#[derive(Debug, Clone, Default)]
pub struct StaticPhaseSource {
    table: PhaseTable,
}

impl StaticPhaseSource {
    #[inline]
    #[must_use]
    pub fn new(table: PhaseTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl PhaseSource for StaticPhaseSource {
    async fn load(&self) -> Result<PhaseTable, CutoverError> {
        Ok(self.table.clone())
    }
}

/// On-disk shape: a list of `[[phases]]` rows
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseFile {
    #[serde(default)]
    pub phases: Vec<PhaseEntry>,
}

impl PhaseFile {
    /// Parse TOML text
    ///
    /// # Errors
    /// Returns `CutoverError::Parse` on malformed TOML.
    pub fn parse(path: &Path, text: &str) -> Result<Self, CutoverError> {
        toml::from_str(text).map_err(|e| CutoverError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Render as TOML text
    ///
    /// # Errors
    /// Returns `CutoverError::Serialize` if rendering fails.
    pub fn render(&self) -> Result<String, CutoverError> {
        toml::to_string_pretty(self).map_err(|e| CutoverError::Serialize(e.to_string()))
    }
}

/// TOML file of `[[phases]]` rows
///
/// A missing file is an empty table, so a fresh deployment starts fully on
/// the legacy store.
#[derive(Debug, Clone)]
pub struct FilePhaseSource {
    path: PathBuf,
}

impl FilePhaseSource {
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a table back to the file
    ///
    /// # Errors
    /// Returns `CutoverError::Io` if the file cannot be written.
    pub async fn save(&self, table: &PhaseTable) -> Result<(), CutoverError> {
        let text = PhaseFile {
            phases: table.entries(),
        }
        .render()?;
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| CutoverError::io_error(&self.path, e))
    }
}

#[async_trait]
impl PhaseSource for FilePhaseSource {
    async fn load(&self) -> Result<PhaseTable, CutoverError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PhaseTable::new()),
            Err(e) => return Err(CutoverError::io_error(&self.path, e)),
        };
        let file = PhaseFile::parse(&self.path, &text)?;
        Ok(PhaseTable::from_entries(file.phases))
    }
}
