//! check-rds-licenses - RDS device CAL monitoring plugin
//!
//! This library exposes the data models, the key pack query sources and the
//! aggregation logic behind the `check-rds-licenses` binary.

#![forbid(unsafe_code)]

pub mod check;
pub mod cli;
pub mod config;
pub mod constants;
pub mod logging;
pub mod models;
pub mod output;
pub mod query;
