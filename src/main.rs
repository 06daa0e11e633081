#![forbid(unsafe_code)]

use std::process::ExitCode;

use check_rds_licenses::models::{CheckConfig, ServiceState};
use check_rds_licenses::{check, cli, logging, output, query};

fn main() -> ExitCode {
    let config = match cli::parse_args() {
        Ok(config) => config,
        Err(err) => return argument_failure(err),
    };

    logging::init(config.verbosity);
    run(&config)
}

fn run(config: &CheckConfig) -> ExitCode {
    log::info!("Checking RDS device CALs on {}", config.computer_name);

    // A failed query is reported as-is; there is no partial result to evaluate
    let records = match query::source_for(config).fetch() {
        Ok(records) => records,
        Err(err) => {
            println!("{}", err);
            return ExitCode::from(ServiceState::Unknown.exit_code());
        }
    };

    let report = check::evaluate(config, &records);

    if let Err(err) = output::print_report(&report, config.json_output) {
        eprintln!("Error: {:#}", err);
        return ExitCode::from(ServiceState::Unknown.exit_code());
    }

    ExitCode::from(report.exit_code)
}

/// Help and version exit cleanly; anything else means the check could not run
fn argument_failure(err: anyhow::Error) -> ExitCode {
    if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
        let _ = clap_err.print();
        return match clap_err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                ExitCode::SUCCESS
            }
            _ => ExitCode::from(ServiceState::Unknown.exit_code()),
        };
    }

    eprintln!("Error: {:#}", err);
    ExitCode::from(ServiceState::Unknown.exit_code())
}
