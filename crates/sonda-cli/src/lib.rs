//! Sonda CLI library
//!
//! Command-line front end for running YAML scenarios with Sonda.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
pub mod runner;

pub use commands::{
    Cli, ColorArg, Commands, ListArgs, LogFormat, RunArgs, ValidateArgs, DEFAULT_CONFIG_FILE,
    DEFAULT_SCENARIO_DIR,
};
pub use config::{CliConfig, ColorChoice, FileConfig, RunSettings, Verbosity, DEFAULT_REPORT_DIR};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
