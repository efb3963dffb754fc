//! Terminal output and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use sonda::{TestResultEntry, TestStatus};
use std::time::Duration;

/// Progress reporter for scenario execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Advance the bar by one scenario
    pub fn increment(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.inc(1);
        }
    }

    /// Finish the progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn emit(&self, line: &str) {
        match self.progress_bar {
            Some(ref pb) if !pb.is_finished() => pb.println(line),
            _ => {
                let _ = self.term.write_line(line);
            }
        }
    }

    fn prefixed(&self, symbol: &str, plain: &str, paint: Style, message: &str) -> String {
        let prefix = if self.use_color {
            paint.apply_to(symbol).bold().to_string()
        } else {
            plain.to_string()
        };
        format!("{prefix} {message}")
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.emit(&self.prefixed("✓", "PASS", Style::new().green(), message));
        }
    }

    /// Print a failure message, even in quiet mode
    pub fn failure(&self, message: &str) {
        self.emit(&self.prefixed("✗", "FAIL", Style::new().red(), message));
    }

    /// Print a skip message
    pub fn skipped(&self, message: &str) {
        if !self.quiet {
            self.emit(&self.prefixed("○", "SKIP", Style::new().yellow(), message));
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            self.emit(&self.prefixed("⚠", "WARN", Style::new().yellow(), message));
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.emit(&self.prefixed("ℹ", "INFO", Style::new().blue(), message));
        }
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        self.emit("");
        self.emit(&styled);
    }

    /// Print one scenario outcome and advance the bar
    pub fn scenario(&self, entry: &TestResultEntry) {
        let timing = format!("{} ({}ms)", entry.name, entry.duration_ms);
        match entry.status {
            TestStatus::Passed => self.success(&timing),
            TestStatus::Failed => {
                let error = entry.error.as_deref().unwrap_or("unknown error");
                self.failure(&format!("{timing}: {error}"));
                for path in [&entry.attachments.screenshot, &entry.attachments.html]
                    .into_iter()
                    .flatten()
                {
                    self.emit(&format!("    artifact: {}", path.display()));
                }
            }
            TestStatus::Skipped => {
                let reason = entry.skip_reason.as_deref().unwrap_or("skipped");
                self.skipped(&format!("{}: {reason}", entry.name));
            }
        }
        self.increment();
    }

    /// Print the run summary
    pub fn summary(&self, passed: usize, failed: usize, skipped: usize, duration: Duration) {
        if self.quiet && failed == 0 {
            return;
        }

        let _ = self.term.write_line("");

        let total = passed + failed + skipped;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let passed_style = Style::new().green().bold();
            let failed_style = Style::new().red().bold();
            let skipped_style = Style::new().yellow();

            let status = if failed > 0 {
                failed_style.apply_to("FAILED")
            } else {
                passed_style.apply_to("PASSED")
            };

            let _ = self.term.write_line(&format!(
                "{} {} scenarios in {:.2}s ({} passed, {} failed, {} skipped)",
                status,
                total,
                duration_secs,
                passed_style.apply_to(passed),
                if failed > 0 {
                    failed_style.apply_to(failed).to_string()
                } else {
                    failed.to_string()
                },
                skipped_style.apply_to(skipped)
            ));
        } else {
            let status = if failed > 0 { "FAILED" } else { "PASSED" };
            let _ = self.term.write_line(&format!(
                "{status} {total} scenarios in {duration_secs:.2}s ({passed} passed, {failed} failed, {skipped} skipped)"
            ));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use sonda::Attachments;
    use std::path::PathBuf;

    #[test]
    fn test_new_reporter() {
        let reporter = ProgressReporter::new(true, false);
        assert!(reporter.use_color);
        assert!(!reporter.quiet);
    }

    #[test]
    fn test_plain_prefixes() {
        let reporter = ProgressReporter::new(false, false);
        assert_eq!(
            reporter.prefixed("✓", "PASS", Style::new().green(), "loads"),
            "PASS loads"
        );
    }

    #[test]
    fn test_scenario_lines_do_not_panic() {
        let reporter = ProgressReporter::new(false, false);
        reporter.scenario(&TestResultEntry::passed("a", Duration::from_millis(12)));
        reporter.scenario(
            &TestResultEntry::failed("b", Duration::from_millis(40), "Element not found")
                .with_attachments(Attachments {
                    html: Some(PathBuf::from("target/test-debug/b-1.html")),
                    screenshot: None,
                }),
        );
        reporter.scenario(&TestResultEntry::skipped("c", "needs credentials"));
        reporter.summary(1, 1, 1, Duration::from_secs(2));
    }

    #[test]
    fn test_quiet_progress_has_no_bar() {
        let mut reporter = ProgressReporter::new(false, true);
        reporter.start_progress(3, "scenarios");
        assert!(reporter.progress_bar.is_none());
        reporter.failure("still shown");
        reporter.finish();
    }
}
