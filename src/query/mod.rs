//! License key pack retrieval module
//!
//! Handles:
//! - Querying a license server's key packs through PowerShell/CIM
//! - Reading previously captured query output from a file
//! - Decoding `ConvertTo-Json` output (object, array or empty)

use serde::Deserialize;
use std::path::PathBuf;

use crate::models::{CheckConfig, LicenseKeyPackRecord, RecordSource};

pub mod powershell;

pub use powershell::PowerShellSource;

/// Anything that can produce the key pack inventory of a license server
pub trait KeyPackSource {
    fn fetch(&self) -> Result<Vec<LicenseKeyPackRecord>, QueryError>;
}

/// Failures while retrieving key pack records
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Failed to launch {shell}: {source}")]
    Launch {
        shell: String,
        source: std::io::Error,
    },
    #[error("License query against {computer_name} failed: {message}")]
    Failed {
        computer_name: String,
        message: String,
    },
    #[error("License query against {computer_name} timed out after {timeout_secs}s: {message}")]
    TimedOut {
        computer_name: String,
        timeout_secs: u32,
        message: String,
    },
    #[error("Failed to read key pack file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to decode key pack records: {0}")]
    Decode(#[from] serde_json::Error),
}

/// `ConvertTo-Json` emits a bare object when only one instance is returned
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<LicenseKeyPackRecord>),
    One(LicenseKeyPackRecord),
}

/// Decode key pack records from `ConvertTo-Json` output
pub fn decode_records(json: &str) -> Result<Vec<LicenseKeyPackRecord>, QueryError> {
    let trimmed = json.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }

    match serde_json::from_str::<OneOrMany>(trimmed) {
        Ok(OneOrMany::Many(records)) => Ok(records),
        Ok(OneOrMany::One(record)) => Ok(vec![record]),
        // Re-parse as an array to surface serde's positional error instead of
        // the untagged "did not match any variant" message
        Err(_) => Ok(serde_json::from_str::<Vec<LicenseKeyPackRecord>>(trimmed)?),
    }
}

/// Key packs read from a captured JSON file
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl KeyPackSource for FileSource {
    fn fetch(&self) -> Result<Vec<LicenseKeyPackRecord>, QueryError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| QueryError::ReadFile {
            path: self.path.clone(),
            source,
        })?;
        let records = decode_records(&content)?;
        log::debug!("Read {} key packs from {}", records.len(), self.path.display());
        Ok(records)
    }
}

/// Build the record source selected by the configuration
pub fn source_for(config: &CheckConfig) -> Box<dyn KeyPackSource> {
    match &config.source {
        RecordSource::File(path) => Box::new(FileSource::new(path.clone())),
        RecordSource::Host => Box::new(PowerShellSource::new(
            config.computer_name.clone(),
            config.query.clone(),
        )),
    }
}
