//! Output formatting module
//!
//! Handles:
//! - Plugin status line (`<STATE> - <message>`) and detail block
//! - JSON report output
//! - Query failure text

use anyhow::Result;

use crate::models::{CheckReport, DetailGroup};

/// Render the report as monitoring plugin text
pub fn format_plugin(report: &CheckReport) -> String {
    let mut text = if report.has_no_licenses() {
        format!(
            "{} - no rds device cals found matching the selected filters (0% usage)",
            report.status
        )
    } else {
        format!(
            "{} - {} rds device cals available from {} ({}% usage)",
            report.status, report.free_licenses, report.total_licenses, report.usage_percent
        )
    };

    for group in report.groups.iter().flatten() {
        text.push('\n');
        text.push_str(&format_group(group));
    }

    text
}

/// One detail line per (ProductVersion, TypeAndModel) group
pub fn format_group(group: &DetailGroup) -> String {
    format!(
        "{}: has issued {} licenses from a total of {} licenses, for a usage of {}%.",
        group.name, group.issued_licenses, group.total_licenses, group.usage_percent
    )
}

/// Render the report as pretty-printed JSON
pub fn format_json(report: &CheckReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Print the report in the configured format
pub fn print_report(report: &CheckReport, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", format_json(report)?);
    } else {
        println!("{}", format_plugin(report));
    }
    Ok(())
}
