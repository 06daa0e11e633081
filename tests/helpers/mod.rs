//! Shared fixtures for CLI tests
//!
//! Key pack inventories are written as captured `ConvertTo-Json` output and
//! fed to the binary through `--input`, so no license server is needed.

#![allow(dead_code)]

use assert_cmd::Command;
use std::io::Write;
use tempfile::NamedTempFile;

/// One key pack as emitted by `Get-CimInstance | ConvertTo-Json`
pub fn key_pack(
    key_pack_type: u32,
    product_version_id: u32,
    product_version: &str,
    type_and_model: &str,
    total: u32,
    issued: u32,
) -> serde_json::Value {
    serde_json::json!({
        "KeyPackType": key_pack_type,
        "ProductVersionID": product_version_id,
        "ProductVersion": product_version,
        "TypeAndModel": type_and_model,
        "TotalLicenses": total,
        "IssuedLicenses": issued,
        "AvailableLicenses": total.saturating_sub(issued),
    })
}

/// Write raw JSON text to a temporary file
pub fn write_fixture(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Write a list of key packs as a JSON array fixture
pub fn write_packs(packs: &[serde_json::Value]) -> NamedTempFile {
    write_fixture(&serde_json::Value::Array(packs.to_vec()).to_string())
}

/// Binary invocation reading key packs from the given fixture
pub fn check_with_input(fixture: &NamedTempFile) -> Command {
    let mut cmd = assert_cmd::cargo_bin_cmd!("check-rds-licenses");
    cmd.env_remove("RUST_LOG").arg("--input").arg(fixture.path());
    cmd
}
