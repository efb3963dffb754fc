//! Scenario discovery and the `run`, `list` and `validate` commands

use sonda::{Reporter, Scenario, ScenarioFile, SuiteRunner};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::commands::{ListArgs, RunArgs, ValidateArgs, DEFAULT_SCENARIO_DIR};
use crate::config::{CliConfig, FileConfig, RunSettings};
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;

/// A parsed scenario file and where it came from
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// File path
    pub path: PathBuf,
    /// Parsed contents
    pub file: ScenarioFile,
}

fn is_scenario_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    )
}

fn glob_paths(pattern: &str) -> CliResult<Vec<PathBuf>> {
    let entries = glob::glob(pattern)
        .map_err(|e| CliError::invalid_argument(format!("bad pattern '{pattern}': {e}")))?;
    Ok(entries.filter_map(Result::ok).filter(|p| p.is_file()).collect())
}

/// Expand files, directories and glob patterns into scenario files.
///
/// Directories are searched recursively for `.yaml`/`.yml`. With no
/// paths the `scenarios/` directory is used.
pub fn discover(paths: &[PathBuf]) -> CliResult<Vec<PathBuf>> {
    let defaults = [PathBuf::from(DEFAULT_SCENARIO_DIR)];
    let paths = if paths.is_empty() { &defaults[..] } else { paths };

    let mut found = Vec::new();
    for path in paths {
        if path.is_file() {
            found.push(path.clone());
        } else if path.is_dir() {
            let root = path.display().to_string();
            let root = root.trim_end_matches('/');
            for pattern in [format!("{root}/**/*.yaml"), format!("{root}/**/*.yml")] {
                found.extend(glob_paths(&pattern)?);
            }
        } else {
            let matched: Vec<PathBuf> = glob_paths(&path.display().to_string())?
                .into_iter()
                .filter(|p| is_scenario_file(p))
                .collect();
            if matched.is_empty() {
                return Err(CliError::invalid_argument(format!(
                    "no scenario files at '{}'",
                    path.display()
                )));
            }
            found.extend(matched);
        }
    }
    found.sort();
    found.dedup();
    tracing::debug!(files = found.len(), "scenario files discovered");
    Ok(found)
}

/// Discover and parse every scenario file, stopping at the first bad one
pub fn load_all(paths: &[PathBuf]) -> CliResult<Vec<LoadedFile>> {
    let files = discover(paths)?;
    if files.is_empty() {
        return Err(CliError::invalid_argument("no scenario files found"));
    }
    files
        .into_iter()
        .map(|path| {
            let file = ScenarioFile::load(&path)?;
            Ok(LoadedFile { path, file })
        })
        .collect()
}

/// Execute `sonda run`
pub async fn run(config: &CliConfig, args: &RunArgs) -> CliResult<Reporter> {
    let started = Instant::now();
    let files = load_all(&args.paths)?;
    let file_config = FileConfig::load(args.config.as_deref())?;
    let settings = RunSettings::resolve(args, file_config)?;

    let scenarios: Vec<Scenario> = files
        .into_iter()
        .flat_map(|loaded| loaded.file.into_scenarios())
        .collect();
    let selected = scenarios
        .iter()
        .filter(|s| s.matches(settings.suite.filter.as_deref(), &settings.suite.tags))
        .count();
    if selected == 0 {
        return Err(CliError::invalid_argument("no scenarios match the filters"));
    }

    let mut progress = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    progress.header(&settings.suite.name);
    if let Some(url) = &settings.suite.base_url {
        progress.info(&format!("base url {url}"));
    }
    progress.start_progress(selected as u64, "scenarios");

    let browser = settings.browser.clone();
    let outcome = SuiteRunner::new(settings.suite.clone())
        .run_observed(
            move || sonda::launch(browser),
            &scenarios,
            |entry| progress.scenario(entry),
        )
        .await;
    progress.finish();
    let reporter = outcome?;

    progress.summary(
        reporter.passed_count(),
        reporter.failed_count(),
        reporter.skipped_count(),
        started.elapsed(),
    );
    match reporter.write_all(&settings.report_dir) {
        Ok(written) => {
            for path in written {
                progress.info(&format!("report {}", path.display()));
            }
        }
        Err(e) => progress.warning(&format!("reports not written: {e}")),
    }

    if reporter.all_passed() {
        Ok(reporter)
    } else {
        Err(CliError::ScenariosFailed {
            failed: reporter.failed_count(),
            total: reporter.total_count(),
        })
    }
}

/// Lines printed by `sonda list`
pub fn list(args: &ListArgs) -> CliResult<Vec<String>> {
    let mut lines = Vec::new();
    for loaded in load_all(&args.paths)? {
        for spec in &loaded.file.scenarios {
            if !args.tags.is_empty() && !args.tags.iter().any(|t| spec.tags.contains(t)) {
                continue;
            }
            let mut line = format!("{}: {}", loaded.path.display(), spec.name);
            if !spec.tags.is_empty() {
                line.push_str(&format!(" [{}]", spec.tags.join(", ")));
            }
            if let Some(reason) = &spec.skip {
                line.push_str(&format!(" (skip: {reason})"));
            }
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Check every file, reporting each; fails if any is invalid
pub fn validate(args: &ValidateArgs, progress: &ProgressReporter) -> CliResult<usize> {
    let files = discover(&args.paths)?;
    if files.is_empty() {
        return Err(CliError::invalid_argument("no scenario files found"));
    }

    let mut scenarios = 0;
    let mut invalid = 0;
    for path in &files {
        match ScenarioFile::load(path) {
            Ok(file) => {
                scenarios += file.scenarios.len();
                progress.success(&format!(
                    "{} ({} scenarios)",
                    path.display(),
                    file.scenarios.len()
                ));
            }
            Err(e) => {
                invalid += 1;
                progress.failure(&e.to_string());
            }
        }
    }
    if invalid > 0 {
        return Err(CliError::config(format!(
            "{invalid} of {} scenario file(s) invalid",
            files.len()
        )));
    }
    Ok(scenarios)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const TITLE: &str = "base_url: https://example.com\nscenarios:\n  - name: title\n    tags: [smoke]\n    steps:\n      - action: navigate\n        url: /\n      - action: assert_title\n        contains: Example\n";
    const ADMIN: &str = "scenarios:\n  - name: admin login\n    skip: needs credentials\n    steps: []\n";

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("title.yaml"), TITLE).unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("admin.yml"), ADMIN).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a scenario").unwrap();
        dir
    }

    mod discover_tests {
        use super::*;

        #[test]
        fn test_directory_is_searched_recursively() {
            let dir = fixture();
            let files = discover(&[dir.path().to_path_buf()]).unwrap();
            assert_eq!(files.len(), 2);
            assert!(files.iter().all(|f| is_scenario_file(f)));
        }

        #[test]
        fn test_glob_pattern() {
            let dir = fixture();
            let pattern = dir.path().join("*.yaml");
            let files = discover(&[pattern]).unwrap();
            assert_eq!(files, vec![dir.path().join("title.yaml")]);
        }

        #[test]
        fn test_missing_path_is_error() {
            let dir = fixture();
            let err = discover(&[dir.path().join("missing.yaml")]).unwrap_err();
            assert!(err.to_string().contains("no scenario files"));
        }

        #[test]
        fn test_duplicates_collapse() {
            let dir = fixture();
            let file = dir.path().join("title.yaml");
            let files = discover(&[file.clone(), file, dir.path().to_path_buf()]).unwrap();
            assert_eq!(files.len(), 2);
        }
    }

    mod command_tests {
        use super::*;

        #[test]
        fn test_list_lines() {
            let dir = fixture();
            let lines = list(&ListArgs {
                paths: vec![dir.path().to_path_buf()],
                tags: Vec::new(),
            })
            .unwrap();
            assert_eq!(lines.len(), 2);
            assert!(lines.iter().any(|l| l.ends_with("admin login (skip: needs credentials)")));
            assert!(lines.iter().any(|l| l.ends_with("title [smoke]")));

            let smoke = list(&ListArgs {
                paths: vec![dir.path().to_path_buf()],
                tags: vec!["smoke".into()],
            })
            .unwrap();
            assert_eq!(smoke.len(), 1);
        }

        #[test]
        fn test_validate_counts_and_fails_on_bad_file() {
            let dir = fixture();
            let progress = ProgressReporter::new(false, true);
            let args = ValidateArgs {
                paths: vec![dir.path().to_path_buf()],
            };
            assert_eq!(validate(&args, &progress).unwrap(), 2);

            fs::write(dir.path().join("broken.yaml"), "scenarios: [{name: x}]\n").unwrap();
            let err = validate(&args, &progress).unwrap_err();
            assert!(err.to_string().contains("1 of 3 scenario file(s) invalid"));
        }

        #[tokio::test]
        async fn test_run_without_matching_scenarios() {
            let dir = fixture();
            let args = RunArgs {
                paths: vec![dir.path().to_path_buf()],
                filter: Some("nothing like this".into()),
                config: Some(dir.path().join("missing-config.yaml")),
                ..RunArgs::default()
            };
            let err = run(&CliConfig::new(), &args).await.unwrap_err();
            assert!(err.to_string().contains("Configuration error"));

            let config_dir = TempDir::new().unwrap();
            let config_file = config_dir.path().join("sonda.yaml");
            fs::write(&config_file, "timeout_ms: 1000\n").unwrap();
            let args = RunArgs {
                config: Some(config_file),
                ..args
            };
            let err = run(&CliConfig::new(), &args).await.unwrap_err();
            assert!(err.to_string().contains("no scenarios match"));
        }
    }
}
