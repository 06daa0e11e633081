//! Data models module
//!
//! Defines core data structures:
//! - LicenseKeyPackRecord: One key pack as reported by the license server
//! - KeyPackType / ProductVersionId: Bounded enums used by the filters
//! - Thresholds / ServiceState: Free-license thresholds and plugin states
//! - AggregateResult / DetailGroup / CheckReport: Derived per-run results

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::config::QuerySettings;


/// How a license key pack was purchased
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPackType {
    Unknown = 0,
    Retail = 1,
    Volume = 2,
    Concurrent = 3,
    Temporary = 4,
    Open = 5,
    Unsupported = 6,
}

impl KeyPackType {
    pub const ALL: [KeyPackType; 7] = [
        KeyPackType::Unknown,
        KeyPackType::Retail,
        KeyPackType::Volume,
        KeyPackType::Concurrent,
        KeyPackType::Temporary,
        KeyPackType::Open,
        KeyPackType::Unsupported,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for KeyPackType {
    type Error = ModelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|t| t.id() == value)
            .ok_or(ModelError::KeyPackTypeOutOfRange(value))
    }
}

/// Server OS version a key pack applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductVersionId {
    NotSupported = 0,
    Windows2000Server = 1,
    WindowsServer2003 = 2,
    WindowsServer2008 = 3,
    WindowsServer2008R2 = 4,
    WindowsServer2012 = 5,
    WindowsServer2016 = 6,
    WindowsServer2019 = 7,
    WindowsServer2022 = 8,
}

impl ProductVersionId {
    pub const ALL: [ProductVersionId; 9] = [
        ProductVersionId::NotSupported,
        ProductVersionId::Windows2000Server,
        ProductVersionId::WindowsServer2003,
        ProductVersionId::WindowsServer2008,
        ProductVersionId::WindowsServer2008R2,
        ProductVersionId::WindowsServer2012,
        ProductVersionId::WindowsServer2016,
        ProductVersionId::WindowsServer2019,
        ProductVersionId::WindowsServer2022,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for ProductVersionId {
    type Error = ModelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|v| v.id() == value)
            .ok_or(ModelError::ProductVersionOutOfRange(value))
    }
}

/// A single `Win32_TSLicenseKeyPack` instance
///
/// Field names follow the CIM property names so the record can be decoded
/// straight from `ConvertTo-Json` output. The enum columns are kept raw;
/// values outside the known ranges simply never match a filter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LicenseKeyPackRecord {
    #[serde(default, deserialize_with = "zero_if_null")]
    pub key_pack_type: u32,
    #[serde(rename = "ProductVersionID", default, deserialize_with = "zero_if_null")]
    pub product_version_id: u32,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub product_version: String,
    #[serde(default, deserialize_with = "empty_if_null")]
    pub type_and_model: String,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub total_licenses: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub issued_licenses: u32,
    #[serde(default, deserialize_with = "zero_if_null")]
    pub available_licenses: u32,
}

fn zero_if_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_if_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    zero_if_null(deserializer)
}

/// Filter criteria applied before aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPackFilter {
    pub key_pack_types: BTreeSet<KeyPackType>,
    pub product_versions: BTreeSet<ProductVersionId>,
}

impl Default for KeyPackFilter {
    fn default() -> Self {
        Self {
            key_pack_types: KeyPackType::ALL.into_iter().collect(),
            product_versions: ProductVersionId::ALL.into_iter().collect(),
        }
    }
}

impl KeyPackFilter {
    /// A record matches when both its type and its product version are selected
    pub fn matches(&self, record: &LicenseKeyPackRecord) -> bool {
        let type_selected = KeyPackType::try_from(record.key_pack_type)
            .map(|t| self.key_pack_types.contains(&t))
            .unwrap_or(false);
        let version_selected = ProductVersionId::try_from(record.product_version_id)
            .map(|v| self.product_versions.contains(&v))
            .unwrap_or(false);

        type_selected && version_selected
    }
}

/// Free-license thresholds; fewer free licenses is worse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    warning: i64,
    critical: i64,
}

impl Thresholds {
    pub fn new(warning: i64, critical: i64) -> Result<Self, ModelError> {
        if critical >= warning {
            return Err(ModelError::InvalidThresholds { warning, critical });
        }
        Ok(Self { warning, critical })
    }

    pub fn warning(&self) -> i64 {
        self.warning
    }

    pub fn critical(&self) -> i64 {
        self.critical
    }

    /// Map a free-license count onto a plugin state
    pub fn evaluate(&self, free_licenses: i64) -> ServiceState {
        if free_licenses <= self.critical {
            ServiceState::Critical
        } else if free_licenses <= self.warning {
            ServiceState::Warning
        } else {
            ServiceState::Ok
        }
    }
}

/// Monitoring plugin states, valued as their exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    Ok = 0,
    Warning = 1,
    Critical = 2,
    Unknown = 3,
}

impl ServiceState {
    pub fn exit_code(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            ServiceState::Ok => "OK",
            ServiceState::Warning => "WARNING",
            ServiceState::Critical => "CRITICAL",
            ServiceState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Sums over the filtered key packs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub total_licenses: i64,
    pub issued_licenses: i64,
    /// Summed from the source column; reported only, never thresholded
    pub available_licenses: i64,
    pub matched_packs: usize,
}

impl AggregateResult {
    /// Free licenses as compared against the thresholds
    pub fn free_licenses(&self) -> i64 {
        self.total_licenses - self.issued_licenses
    }

    /// No licenses installed and none handed out
    pub fn is_empty(&self) -> bool {
        self.total_licenses == 0 && self.issued_licenses == 0
    }
}

/// Per (ProductVersion, TypeAndModel) breakdown line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailGroup {
    pub name: String,
    pub issued_licenses: i64,
    pub total_licenses: i64,
    pub usage_percent: i64,
}

/// Outcome of one check run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub status: ServiceState,
    pub exit_code: u8,
    pub computer_name: String,
    pub free_licenses: i64,
    pub total_licenses: i64,
    pub issued_licenses: i64,
    pub usage_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<DetailGroup>>,
}

impl CheckReport {
    /// No licenses installed and none handed out among the selected packs
    pub fn has_no_licenses(&self) -> bool {
        self.total_licenses == 0 && self.issued_licenses == 0
    }
}

/// Where key pack records come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// Live CIM query against the named host
    Host,
    /// Previously captured `ConvertTo-Json` output
    File(PathBuf),
}

/// Configuration for a single check run
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub thresholds: Thresholds,
    pub filter: KeyPackFilter,
    /// Target license server (defaults to the local host name)
    pub computer_name: String,
    /// Whether to append the per-group breakdown
    pub detailed: bool,
    /// Whether to print the report as JSON instead of plugin text
    pub json_output: bool,
    /// Diagnostic verbosity (number of -v flags)
    pub verbosity: u8,
    pub source: RecordSource,
    pub query: QuerySettings,
}

/// Validation errors raised while building the check configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Critical threshold ({critical}) must be lower than warning threshold ({warning})")]
    InvalidThresholds { warning: i64, critical: i64 },
    #[error("Invalid key pack type: {0}. Must be between 0 and 6")]
    KeyPackTypeOutOfRange(u32),
    #[error("Invalid product version ID: {0}. Must be between 0 and 8")]
    ProductVersionOutOfRange(u32),
}
