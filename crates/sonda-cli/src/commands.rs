//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::ReadinessPreset;

/// Default scenario location when no paths are given
pub const DEFAULT_SCENARIO_DIR: &str = "scenarios";

/// Default config file, read when present
pub const DEFAULT_CONFIG_FILE: &str = "sonda.yaml";

/// Sonda: resilient browser end-to-end scenarios
#[derive(Parser, Debug)]
#[command(name = "sonda")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run scenarios against a browser
    Run(RunArgs),

    /// List scenarios without running them
    List(ListArgs),

    /// Parse and check scenario files
    Validate(ValidateArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Scenario files, directories or glob patterns
    pub paths: Vec<PathBuf>,

    /// Base URL for relative navigation
    #[arg(long, env = "SONDA_BASE_URL")]
    pub base_url: Option<String>,

    /// Run only scenarios whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Run only scenarios carrying one of these tags
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,

    /// Stop after the first failing scenario
    #[arg(long)]
    pub fail_fast: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the chromium sandbox (containers/CI)
    #[arg(long, env = "SONDA_NO_SANDBOX")]
    pub no_sandbox: bool,

    /// Chromium binary
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<String>,

    /// Default wait timeout in milliseconds
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Per-scenario timeout in milliseconds
    #[arg(long)]
    pub scenario_timeout_ms: Option<u64>,

    /// Readiness preset awaited after opening the base URL
    #[arg(long, value_enum)]
    pub readiness: Option<ReadinessPreset>,

    /// Directory for debug artifacts of failed scenarios
    #[arg(long, env = "SONDA_ARTIFACTS_DIR")]
    pub artifacts_dir: Option<PathBuf>,

    /// Directory artifacts are mirrored into
    #[arg(long)]
    pub mirror_dir: Option<PathBuf>,

    /// Directory for HTML, JUnit and JSON reports
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Config file (defaults to ./sonda.yaml when present)
    #[arg(short, long, env = "SONDA_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Arguments for the list command
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Scenario files, directories or glob patterns
    pub paths: Vec<PathBuf>,

    /// Only scenarios carrying one of these tags
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

/// Arguments for the validate command
#[derive(Parser, Debug, Default)]
pub struct ValidateArgs {
    /// Scenario files, directories or glob patterns
    pub paths: Vec<PathBuf>,
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}
