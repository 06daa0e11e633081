//! CIM query through PowerShell
//!
//! Runs `Get-CimInstance` for the license server's key packs and converts the
//! result to JSON on the PowerShell side, so only plain text crosses the
//! process boundary.

use std::process::{Command, Stdio};
use std::time::Instant;

use sysinfo::{System, SystemExt};

use super::{decode_records, KeyPackSource, QueryError};
use crate::config::QuerySettings;
use crate::constants::{KEY_PACK_CLASS, KEY_PACK_PROPERTIES};
use crate::models::LicenseKeyPackRecord;

/// Key packs fetched live from a license server
#[derive(Debug, Clone)]
pub struct PowerShellSource {
    computer_name: String,
    settings: QuerySettings,
}

impl PowerShellSource {
    pub fn new(computer_name: String, settings: QuerySettings) -> Self {
        Self {
            computer_name,
            settings,
        }
    }

    /// PowerShell script that emits the key packs as compressed JSON
    pub fn script(&self) -> String {
        let mut query = format!(
            "Get-CimInstance -Namespace {} -ClassName {} -OperationTimeoutSec {}",
            quote(&self.settings.namespace),
            KEY_PACK_CLASS,
            self.settings.timeout_secs
        );
        if !is_local_host(&self.computer_name) {
            query.push_str(&format!(" -ComputerName {}", quote(&self.computer_name)));
        }

        format!(
            "$ErrorActionPreference = 'Stop'; {} | Select-Object {} | ConvertTo-Json -Compress",
            query,
            KEY_PACK_PROPERTIES.join(",")
        )
    }

    fn failure(&self, message: String) -> QueryError {
        let lowered = message.to_lowercase();
        if lowered.contains("operationtimeout") || lowered.contains("timed out") {
            QueryError::TimedOut {
                computer_name: self.computer_name.clone(),
                timeout_secs: self.settings.timeout_secs,
                message,
            }
        } else {
            QueryError::Failed {
                computer_name: self.computer_name.clone(),
                message,
            }
        }
    }
}

impl KeyPackSource for PowerShellSource {
    fn fetch(&self) -> Result<Vec<LicenseKeyPackRecord>, QueryError> {
        let script = self.script();
        log::debug!("Running {} -Command \"{}\"", self.settings.shell, script);

        let started = Instant::now();
        let output = Command::new(&self.settings.shell)
            .args(["-NoLogo", "-NoProfile", "-NonInteractive", "-Command", &script])
            .stdin(Stdio::null())
            .output()
            .map_err(|source| QueryError::Launch {
                shell: self.settings.shell.clone(),
                source,
            })?;
        log::debug!(
            "{} exited with {} after {}ms",
            self.settings.shell,
            output.status,
            started.elapsed().as_millis()
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.settings.shell, output.status)
            } else {
                stderr
            };
            return Err(self.failure(message));
        }

        let records = decode_records(&String::from_utf8_lossy(&output.stdout))?;
        log::info!(
            "Fetched {} key packs from {}",
            records.len(),
            self.computer_name
        );
        Ok(records)
    }
}

/// Single-quote a PowerShell string literal
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Name of the machine this check runs on
pub fn local_host_name() -> String {
    System::new()
        .host_name()
        .filter(|name| !name.trim().is_empty())
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Whether the target refers to this machine, so no remoting is needed
pub fn is_local_host(computer_name: &str) -> bool {
    let target = computer_name.trim();
    if target.is_empty()
        || target == "."
        || target.eq_ignore_ascii_case("localhost")
        || target == "127.0.0.1"
        || target == "::1"
    {
        return true;
    }

    let local = local_host_name();
    let short = |name: &str| name.split('.').next().unwrap_or(name).to_ascii_lowercase();
    target.eq_ignore_ascii_case(&local) || short(target) == short(&local)
}
