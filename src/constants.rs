//! Global constants for check-rds-licenses
//!
//! Centralized location for application-wide constants

/// Binary name as reported in help and version output
pub const APP_NAME: &str = "check-rds-licenses";

/// CIM class holding the license server's key packs
pub const KEY_PACK_CLASS: &str = "Win32_TSLicenseKeyPack";

/// Default CIM namespace for the key pack class
pub const DEFAULT_NAMESPACE: &str = "root/cimv2";

/// Default PowerShell executable used to run the CIM query
pub const DEFAULT_SHELL: &str = "powershell.exe";

/// Default operation timeout handed to Get-CimInstance, in seconds
pub const DEFAULT_TIMEOUT_SECS: u32 = 30;

/// Properties selected from each key pack before JSON conversion
pub const KEY_PACK_PROPERTIES: &[&str] = &[
    "KeyPackType",
    "ProductVersionID",
    "ProductVersion",
    "TypeAndModel",
    "TotalLicenses",
    "IssuedLicenses",
    "AvailableLicenses",
];
