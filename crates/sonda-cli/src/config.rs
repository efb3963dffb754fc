//! CLI configuration
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! the YAML config file (`sonda.yaml`), command line flags and their
//! environment fallbacks.

use serde::{Deserialize, Serialize};
use sonda::{
    ArtifactConfig, BrowserConfig, Condition, SuiteConfig, WaitOptions, DEFAULT_MIRROR_DIR,
    DEFAULT_PRIMARY_DIR,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::commands::{RunArgs, DEFAULT_CONFIG_FILE};
use crate::error::{CliError, CliResult};

/// Default report directory
pub const DEFAULT_REPORT_DIR: &str = "target/sonda-reports";

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - minimal output
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Default log filter for this level
    #[must_use]
    pub const fn log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "info",
            Self::Debug => "debug",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stderr().features().colors_supported(),
        }
    }
}

/// Output settings shared by all commands
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}

/// Built-in readiness condition sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessPreset {
    /// `document.readyState` is complete
    Document,
    /// Document complete and the `#root` app has rendered text
    Spa,
}

impl ReadinessPreset {
    /// Conditions this preset waits for
    #[must_use]
    pub fn conditions(self) -> Vec<Condition> {
        match self {
            Self::Document => vec![Condition::DocumentReady],
            Self::Spa => SuiteConfig::spa_readiness(),
        }
    }
}

/// Readiness in `sonda.yaml`: a preset name or an explicit condition list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Readiness {
    /// `readiness: spa`
    Preset(ReadinessPreset),
    /// All listed conditions must hold
    Conditions(Vec<Condition>),
}

impl Readiness {
    /// Expand into conditions
    #[must_use]
    pub fn into_conditions(self) -> Vec<Condition> {
        match self {
            Self::Preset(preset) => preset.conditions(),
            Self::Conditions(conditions) => conditions,
        }
    }
}

/// Contents of `sonda.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Suite name in reports
    pub name: Option<String>,
    /// Base URL for relative navigation
    pub base_url: Option<String>,
    /// Wait timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Poll interval in milliseconds
    pub poll_ms: Option<u64>,
    /// Per-scenario timeout in milliseconds
    pub scenario_timeout_ms: Option<u64>,
    /// Conditions awaited after opening the base URL
    pub readiness: Option<Readiness>,
    /// Stop after the first failure
    pub fail_fast: Option<bool>,
    /// Tag filter
    pub tags: Vec<String>,
    /// Browser settings
    pub browser: Option<BrowserConfig>,
    /// Artifact directory
    pub artifacts_dir: Option<PathBuf>,
    /// Mirror directory
    pub mirror_dir: Option<PathBuf>,
    /// Report directory
    pub report_dir: Option<PathBuf>,
}

impl FileConfig {
    /// Parse YAML text
    pub fn from_yaml(text: &str) -> CliResult<Self> {
        serde_yaml_ng::from_str(text).map_err(|e| CliError::config(e.to_string()))
    }

    /// Load the given file, or `./sonda.yaml` if it exists
    pub fn load(explicit: Option<&Path>) -> CliResult<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path).map_err(|e| {
            CliError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), "config file loaded");
        Self::from_yaml(&text).map_err(|e| CliError::config(format!("{}: {e}", path.display())))
    }
}

/// Everything a `run` needs, after merging all layers
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Suite settings
    pub suite: SuiteConfig,
    /// Browser settings
    pub browser: BrowserConfig,
    /// Report directory
    pub report_dir: PathBuf,
}

impl RunSettings {
    /// Merge flags over the file over defaults.
    ///
    /// A base URL given here overrides the ones declared in scenario files.
    pub fn resolve(args: &RunArgs, file: FileConfig) -> CliResult<Self> {
        let base_url = args.base_url.clone().or(file.base_url);
        if let Some(url) = &base_url {
            if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with("file://")) {
                return Err(CliError::invalid_argument(format!(
                    "base url must be absolute: {url}"
                )));
            }
        }

        let mut wait = WaitOptions::default();
        if let Some(ms) = args.timeout_ms.or(file.timeout_ms) {
            wait = wait.with_timeout(ms);
        }
        if let Some(ms) = args.poll_ms.or(file.poll_ms) {
            if ms == 0 {
                return Err(CliError::invalid_argument("poll interval must be positive"));
            }
            wait = wait.with_poll_interval(ms);
        }

        let mut suite = SuiteConfig {
            base_url,
            wait,
            fail_fast: args.fail_fast || file.fail_fast.unwrap_or(false),
            filter: args.filter.clone(),
            tags: if args.tags.is_empty() {
                file.tags
            } else {
                args.tags.clone()
            },
            artifacts: ArtifactConfig::in_dir(
                args.artifacts_dir
                    .clone()
                    .or(file.artifacts_dir)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PRIMARY_DIR)),
            )
            .with_mirror(
                args.mirror_dir
                    .clone()
                    .or(file.mirror_dir)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_MIRROR_DIR)),
            ),
            ..SuiteConfig::default()
        };
        if let Some(name) = file.name {
            suite.name = name;
        }
        if let Some(preset) = args.readiness {
            suite.readiness = preset.conditions();
        } else if let Some(readiness) = file.readiness {
            suite.readiness = readiness.into_conditions();
        }
        if let Some(ms) = args.scenario_timeout_ms.or(file.scenario_timeout_ms) {
            suite.scenario_timeout = Duration::from_millis(ms);
        }

        let mut browser = file.browser.unwrap_or_default();
        if args.headed {
            browser = browser.with_headless(false);
        }
        if args.no_sandbox {
            browser = browser.with_no_sandbox();
        }
        if let Some(path) = &args.chromium_path {
            browser = browser.with_chromium_path(path.clone());
        }

        Ok(Self {
            suite,
            browser,
            report_dir: args
                .report_dir
                .clone()
                .or(file.report_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_DIR)),
        })
    }
}
