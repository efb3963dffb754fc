//! Reporter - suite results with fail-fast support
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │  FailureMode::       │     │  FailureMode::       │
//! │  FailFast            │     │  CollectAll          │
//! │  stop on first       │     │  run every scenario  │
//! │  failure             │     │  (default)           │
//! └──────────────────────┘     └──────────────────────┘
//!                 │                     │
//!                 ▼                     ▼
//!        report.html  ·  junit.xml  ·  report.json
//! ```
//!
//! Failed entries link the newest DOM snapshot and screenshot captured for
//! that test.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::artifact::{DebugArtifact, LatestArtifacts};
use crate::result::{SondaError, SondaResult};

/// HTML report file name
pub const HTML_REPORT: &str = "report.html";
/// JUnit report file name
pub const JUNIT_REPORT: &str = "junit.xml";
/// JSON report file name
pub const JSON_REPORT: &str = "report.json";

/// What happens after a failure is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Stop on first failure
    FailFast,
    /// Run everything and collect failures
    #[default]
    CollectAll,
}

/// Final status of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Test passed
    Passed,
    /// Test failed
    Failed,
    /// Test was skipped
    Skipped,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    const fn css_class(self) -> &'static str {
        match self {
            Self::Passed => "pass",
            Self::Failed => "fail",
            Self::Skipped => "skip",
        }
    }
}

/// Artifact files attached to a failed entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
    /// DOM snapshot
    pub html: Option<PathBuf>,
    /// Screenshot
    pub screenshot: Option<PathBuf>,
}

impl From<&DebugArtifact> for Attachments {
    fn from(artifact: &DebugArtifact) -> Self {
        Self {
            html: artifact.html_path().map(Path::to_path_buf),
            screenshot: artifact.screenshot_path().map(Path::to_path_buf),
        }
    }
}

impl From<LatestArtifacts> for Attachments {
    fn from(latest: LatestArtifacts) -> Self {
        Self {
            html: latest.html,
            screenshot: latest.screenshot,
        }
    }
}

impl Attachments {
    /// Whether anything is attached
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.html.is_none() && self.screenshot.is_none()
    }
}

/// Individual test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResultEntry {
    /// Test name
    pub name: String,
    /// Test status
    pub status: TestStatus,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Error message if failed
    pub error: Option<String>,
    /// Reason if skipped
    pub skip_reason: Option<String>,
    /// Tags of the scenario
    #[serde(default)]
    pub tags: Vec<String>,
    /// Debug artifacts
    #[serde(default, skip_serializing_if = "Attachments::is_empty")]
    pub attachments: Attachments,
    /// When the test finished
    pub finished_at: DateTime<Utc>,
}

impl TestResultEntry {
    fn new(name: impl Into<String>, status: TestStatus, duration: Duration) -> Self {
        Self {
            name: name.into(),
            status,
            duration_ms: duration.as_millis() as u64,
            error: None,
            skip_reason: None,
            tags: Vec::new(),
            attachments: Attachments::default(),
            finished_at: Utc::now(),
        }
    }

    /// Create a passing test result
    #[must_use]
    pub fn passed(name: impl Into<String>, duration: Duration) -> Self {
        Self::new(name, TestStatus::Passed, duration)
    }

    /// Create a failing test result
    #[must_use]
    pub fn failed(name: impl Into<String>, duration: Duration, error: impl Into<String>) -> Self {
        let mut entry = Self::new(name, TestStatus::Failed, duration);
        entry.error = Some(error.into());
        entry
    }

    /// Create a skipped test result
    #[must_use]
    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut entry = Self::new(name, TestStatus::Skipped, Duration::ZERO);
        entry.skip_reason = Some(reason.into());
        entry
    }

    /// Attach artifacts
    #[must_use]
    pub fn with_attachments(mut self, attachments: Attachments) -> Self {
        self.attachments = attachments;
        self
    }

    /// Set tags
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Duration as Duration
    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

/// Collects test results and renders reports
#[derive(Debug, Default)]
pub struct Reporter {
    results: Vec<TestResultEntry>,
    failure_mode: FailureMode,
    suite_name: String,
    started_at: Option<DateTime<Utc>>,
}

impl Reporter {
    /// Create new reporter (CollectAll mode)
    #[must_use]
    pub fn new() -> Self {
        Self {
            suite_name: "Sonda Suite".to_string(),
            ..Default::default()
        }
    }

    /// Create reporter that stops on first failure
    #[must_use]
    pub fn fail_fast() -> Self {
        Self {
            failure_mode: FailureMode::FailFast,
            ..Self::new()
        }
    }

    /// Set suite name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.suite_name = name.into();
        self
    }

    /// Suite name
    #[must_use]
    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    /// Failure mode
    #[must_use]
    pub const fn failure_mode(&self) -> FailureMode {
        self.failure_mode
    }

    /// Start the test suite
    pub fn start(&mut self) {
        self.started_at = Some(Utc::now());
    }

    /// Record a test result
    ///
    /// # Errors
    ///
    /// In fail-fast mode, returns an error once a failure is recorded.
    pub fn record(&mut self, result: TestResultEntry) -> SondaResult<()> {
        let failure = result
            .status
            .is_failed()
            .then(|| (result.name.clone(), result.error.clone().unwrap_or_default()));

        tracing::info!(test = %result.name, status = ?result.status, duration_ms = result.duration_ms, "test finished");
        self.results.push(result);

        match (self.failure_mode, failure) {
            (FailureMode::FailFast, Some((name, error))) => Err(SondaError::AssertionFailed {
                message: format!("stopping after '{name}' failed: {error}"),
            }),
            _ => Ok(()),
        }
    }

    /// Get number of passed tests
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.count(TestStatus::Passed)
    }

    /// Get number of failed tests
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(TestStatus::Failed)
    }

    /// Get number of skipped tests
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(TestStatus::Skipped)
    }

    fn count(&self, status: TestStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Get total test count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Pass rate over executed (non-skipped) tests, 0.0 to 1.0
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        let executed = self.passed_count() + self.failed_count();
        if executed == 0 {
            return 1.0;
        }
        self.passed_count() as f64 / executed as f64
    }

    /// Check if no test failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Get total duration
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.results.iter().map(TestResultEntry::duration).sum()
    }

    /// Get test results
    #[must_use]
    pub fn results(&self) -> &[TestResultEntry] {
        &self.results
    }

    /// Get failing tests
    #[must_use]
    pub fn failures(&self) -> Vec<&TestResultEntry> {
        self.results
            .iter()
            .filter(|r| r.status.is_failed())
            .collect()
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {} passed, {} failed, {} skipped ({:.1}%)",
            self.suite_name,
            self.passed_count(),
            self.failed_count(),
            self.skipped_count(),
            self.pass_rate() * 100.0
        )
    }

    /// Write HTML, JUnit and JSON reports into a directory
    ///
    /// # Errors
    ///
    /// Returns error if the directory or a file cannot be written
    pub fn write_all(&self, dir: &Path) -> SondaResult<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let html = dir.join(HTML_REPORT);
        let junit = dir.join(JUNIT_REPORT);
        let json = dir.join(JSON_REPORT);
        self.generate_html(&html)?;
        self.generate_junit(&junit)?;
        self.generate_json(&json)?;
        Ok(vec![html, junit, json])
    }

    /// Generate HTML report
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn generate_html(&self, output_path: &Path) -> SondaResult<()> {
        fs::write(output_path, self.render_html())?;
        Ok(())
    }

    /// Render HTML report content
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut html = String::new();

        html.push_str(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Sonda Test Report</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        .progress-bar { background: #ddd; height: 20px; border-radius: 10px; overflow: hidden; }
        .passed { background: #4caf50; height: 100%; }
        .test { padding: 10px; margin: 5px 0; border-radius: 4px; }
        .test.pass { background: #e8f5e9; border-left: 4px solid #4caf50; }
        .test.fail { background: #ffebee; border-left: 4px solid #f44336; }
        .test.skip { background: #fff3e0; border-left: 4px solid #ff9800; }
        .error { color: #d32f2f; font-family: monospace; white-space: pre-wrap; }
        .artifacts img { max-width: 480px; border: 1px solid #ddd; margin-top: 8px; }
    </style>
</head>
<body>
"#,
        );

        let _ = write!(
            html,
            r#"<div class="summary">
    <h1>{}</h1>
    <h2>Results: {}/{} passed, {} skipped ({:.1}%)</h2>
    <div class="progress-bar">
        <div class="passed" style="width: {:.1}%"></div>
    </div>
    <p>Duration: {:.2}s</p>
</div>
"#,
            escape_xml(&self.suite_name),
            self.passed_count(),
            self.passed_count() + self.failed_count(),
            self.skipped_count(),
            self.pass_rate() * 100.0,
            self.pass_rate() * 100.0,
            self.total_duration().as_secs_f64()
        );

        html.push_str("<h2>Test Results</h2>\n");
        for result in &self.results {
            let _ = write!(
                html,
                "<div class=\"test {}\">\n    <strong>{}</strong> - {:?} ({}ms)\n",
                result.status.css_class(),
                escape_xml(&result.name),
                result.status,
                result.duration_ms
            );

            if let Some(error) = &result.error {
                let _ = writeln!(html, r#"    <div class="error">{}</div>"#, escape_xml(error));
            }
            if let Some(reason) = &result.skip_reason {
                let _ = writeln!(html, "    <div>Skipped: {}</div>", escape_xml(reason));
            }
            if !result.attachments.is_empty() {
                html.push_str("    <div class=\"artifacts\">\n");
                if let Some(dom) = &result.attachments.html {
                    let href = escape_xml(&dom.display().to_string());
                    let _ = writeln!(html, r#"        <a href="{href}">DOM snapshot</a>"#);
                }
                if let Some(png) = &result.attachments.screenshot {
                    let src = escape_xml(&png.display().to_string());
                    let _ = writeln!(
                        html,
                        r#"        <br><a href="{src}"><img src="{src}" alt="Screenshot"></a>"#
                    );
                }
                html.push_str("    </div>\n");
            }

            html.push_str("</div>\n");
        }

        html.push_str(
            r#"
<footer>
    <p>Generated by Sonda</p>
</footer>
</body>
</html>
"#,
        );

        html
    }

    /// Generate JUnit XML for CI integration
    ///
    /// # Errors
    ///
    /// Returns error if file writing fails
    pub fn generate_junit(&self, output_path: &Path) -> SondaResult<()> {
        fs::write(output_path, self.render_junit())?;
        Ok(())
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.total_count(),
            self.failed_count(),
            self.skipped_count(),
            self.total_duration().as_secs_f64()
        );

        for result in &self.results {
            let _ = writeln!(
                xml,
                r#"  <testcase name="{}" time="{:.3}">"#,
                escape_xml(&result.name),
                result.duration().as_secs_f64()
            );

            if let Some(error) = &result.error {
                let _ = writeln!(
                    xml,
                    r#"    <failure message="{}">{}</failure>"#,
                    escape_xml(error),
                    escape_xml(error)
                );
            }
            if result.status == TestStatus::Skipped {
                let reason = result.skip_reason.as_deref().unwrap_or_default();
                let _ = writeln!(xml, r#"    <skipped message="{}"/>"#, escape_xml(reason));
            }
            let attached: Vec<String> = [&result.attachments.html, &result.attachments.screenshot]
                .into_iter()
                .flatten()
                .map(|p| format!("[[ATTACHMENT|{}]]", p.display()))
                .collect();
            if !attached.is_empty() {
                let _ = writeln!(
                    xml,
                    "    <system-out>{}</system-out>",
                    escape_xml(&attached.join("\n"))
                );
            }

            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    /// Generate JSON report
    ///
    /// # Errors
    ///
    /// Returns error if serialization or file writing fails
    pub fn generate_json(&self, output_path: &Path) -> SondaResult<()> {
        fs::write(output_path, self.render_json()?)?;
        Ok(())
    }

    /// Render JSON report content
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn render_json(&self) -> SondaResult<String> {
        let report = serde_json::json!({
            "suite": self.suite_name,
            "started_at": self.started_at,
            "passed": self.passed_count(),
            "failed": self.failed_count(),
            "skipped": self.skipped_count(),
            "duration_ms": self.total_duration().as_millis() as u64,
            "results": self.results,
        });
        Ok(serde_json::to_string_pretty(&report)?)
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
