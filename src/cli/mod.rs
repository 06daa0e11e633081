//! CLI argument parsing and validation module
//!
//! Handles command-line interface using clap, including:
//! - Warning/critical free-license thresholds
//! - Key pack type and product version filters
//! - Target license server selection
//! - Detail, JSON, input file and verbosity options

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::{validate_timeout, FileConfiguration};
use crate::constants::APP_NAME;
use crate::models::{
    CheckConfig, KeyPackFilter, KeyPackType, ProductVersionId, RecordSource, Thresholds,
};
use crate::query::powershell::local_host_name;

const VERSION: &str = concat!(env!("CHECK_RDS_VERSION"), " (", env!("GIT_HASH"), ")");

/// Build the clap command definition
pub fn build_command() -> Command {
    Command::new(APP_NAME)
        .version(VERSION)
        .about("Check RDS device CAL usage on a license server")
        .long_about(
            "Monitoring plugin that sums the Remote Desktop Services device CALs of a license \
             server and compares the number of free licenses against warning and critical \
             thresholds.\n\nExit codes: 0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN.",
        )
        .arg(
            Arg::new("warning")
                .value_name("WARNING")
                .help("Warn when free licenses drop to this number or below")
                .required(true)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("critical")
                .value_name("CRITICAL")
                .help("Critical when free licenses drop to this number or below (must be lower than WARNING)")
                .required(true)
                .allow_negative_numbers(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(
            Arg::new("key_pack_types")
                .value_name("KEY_PACK_TYPES")
                .help("Comma separated key pack types to include, 0-6 [default: all]")
                .value_delimiter(',')
                .value_parser(value_parser!(u32).range(0..=6)),
        )
        .arg(
            Arg::new("product_version_ids")
                .value_name("PRODUCT_VERSION_IDS")
                .help("Comma separated product version IDs to include, 0-8 [default: all]")
                .value_delimiter(',')
                .value_parser(value_parser!(u32).range(0..=8)),
        )
        .arg(
            Arg::new("computer_name")
                .value_name("COMPUTER_NAME")
                .help("License server to query [default: local host]"),
        )
        .arg(
            Arg::new("host")
                .short('H')
                .long("host")
                .value_name("COMPUTER_NAME")
                .help("License server to query, without giving the filter lists")
                .conflicts_with("computer_name"),
        )
        .arg(
            Arg::new("detailed")
                .short('d')
                .long("detailed")
                .help("Append per product version and model usage lines")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output the report in JSON format")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE")
                .help("Read key packs from captured ConvertTo-Json output instead of querying")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file with query settings")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECS")
                .help("Query operation timeout in seconds (1-3600)")
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log diagnostics to stderr (repeat for more detail)")
                .action(ArgAction::Count),
        )
}

/// Parse command line arguments and return configuration
pub fn parse_args() -> Result<CheckConfig> {
    parse_args_from(std::env::args_os())
}

/// Parse the given argument list (first item is the program name)
pub fn parse_args_from<I, T>(args: I) -> Result<CheckConfig>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command().try_get_matches_from(args)?;
    config_from_matches(&matches)
}

fn config_from_matches(matches: &ArgMatches) -> Result<CheckConfig> {
    // Both are required, so clap guarantees presence
    let warning = matches.get_one::<i64>("warning").copied().unwrap_or_default();
    let critical = matches.get_one::<i64>("critical").copied().unwrap_or_default();
    let thresholds = Thresholds::new(warning, critical)?;

    let filter = KeyPackFilter {
        key_pack_types: selected(matches, "key_pack_types", &KeyPackType::ALL)?,
        product_versions: selected(matches, "product_version_ids", &ProductVersionId::ALL)?,
    };

    let computer_name = matches
        .get_one::<String>("computer_name")
        .or_else(|| matches.get_one::<String>("host"))
        .cloned()
        .unwrap_or_else(local_host_name);

    let mut query = match matches.get_one::<PathBuf>("config") {
        Some(path) => FileConfiguration::load(path)?.query,
        None => FileConfiguration::default().query,
    };
    if let Some(&timeout_secs) = matches.get_one::<u32>("timeout") {
        validate_timeout(timeout_secs)?;
        query.timeout_secs = timeout_secs;
    }

    let source = match matches.get_one::<PathBuf>("input") {
        Some(path) => {
            if !path.is_file() {
                anyhow::bail!("Input file does not exist: {}", path.display());
            }
            RecordSource::File(path.clone())
        }
        None => RecordSource::Host,
    };

    Ok(CheckConfig {
        thresholds,
        filter,
        computer_name,
        detailed: matches.get_flag("detailed"),
        json_output: matches.get_flag("json"),
        verbosity: matches.get_count("verbose"),
        source,
        query,
    })
}

/// Collect a filter set, defaulting to every known value when not given
fn selected<T>(matches: &ArgMatches, id: &str, all: &[T]) -> Result<BTreeSet<T>>
where
    T: Copy + Ord + TryFrom<u32>,
    <T as TryFrom<u32>>::Error: std::error::Error + Send + Sync + 'static,
{
    match matches.get_many::<u32>(id) {
        Some(values) => values
            .map(|&value| T::try_from(value).with_context(|| format!("Invalid value for {}", id)))
            .collect(),
        None => Ok(all.iter().copied().collect()),
    }
}
