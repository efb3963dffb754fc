//! Debug artifacts captured when a test fails.
//!
//! For each failure the DOM and a screenshot are written as
//! `{test}-{unix_millis}.html` and `{test}-{unix_millis}.png` into the
//! primary directory and copied into the mirror directory that report
//! tooling picks up. Capture is best effort: every I/O or driver failure is
//! logged and swallowed so it can never mask the test failure itself.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::driver::BrowserDriver;
use crate::result::{SondaError, SondaResult};

/// Default primary artifact directory
pub const DEFAULT_PRIMARY_DIR: &str = "target/test-debug";

/// Default mirror directory for report intake
pub const DEFAULT_MIRROR_DIR: &str = "target/sonda-reports/test-debug";

/// Artifact directories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Directory written on every capture
    pub primary_dir: PathBuf,
    /// Directory receiving copies, if any
    pub mirror_dir: Option<PathBuf>,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            primary_dir: PathBuf::from(DEFAULT_PRIMARY_DIR),
            mirror_dir: Some(PathBuf::from(DEFAULT_MIRROR_DIR)),
        }
    }
}

impl ArtifactConfig {
    /// Config rooted at a single directory, no mirror
    #[must_use]
    pub fn in_dir(primary_dir: impl Into<PathBuf>) -> Self {
        Self {
            primary_dir: primary_dir.into(),
            mirror_dir: None,
        }
    }

    /// Set the mirror directory
    #[must_use]
    pub fn with_mirror(mut self, mirror_dir: impl Into<PathBuf>) -> Self {
        self.mirror_dir = Some(mirror_dir.into());
        self
    }
}

/// DOM snapshot and screenshot of a failed test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugArtifact {
    test_name: String,
    timestamp_ms: i64,
    html: Option<String>,
    screenshot: Option<Vec<u8>>,
    html_path: Option<PathBuf>,
    screenshot_path: Option<PathBuf>,
}

impl DebugArtifact {
    /// Test the artifact belongs to
    #[must_use]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Capture time in Unix milliseconds
    #[must_use]
    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Serialized DOM, if it could be read
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref()
    }

    /// PNG bytes, if a screenshot could be taken
    #[must_use]
    pub fn screenshot(&self) -> Option<&[u8]> {
        self.screenshot.as_deref()
    }

    /// Written DOM file, in the primary directory unless only the mirror took it
    #[must_use]
    pub fn html_path(&self) -> Option<&Path> {
        self.html_path.as_deref()
    }

    /// Written PNG file, in the primary directory unless only the mirror took it
    #[must_use]
    pub fn screenshot_path(&self) -> Option<&Path> {
        self.screenshot_path.as_deref()
    }
}

/// Most recent artifact files of one test
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestArtifacts {
    /// Newest `.html`
    pub html: Option<PathBuf>,
    /// Newest `.png`
    pub screenshot: Option<PathBuf>,
}

/// Make a test name safe to use as a file name stem
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Writes debug artifacts for failed tests
#[derive(Debug, Clone, Default)]
pub struct ArtifactCapturer {
    config: ArtifactConfig,
}

impl ArtifactCapturer {
    /// Create a capturer
    #[must_use]
    pub const fn new(config: ArtifactConfig) -> Self {
        Self { config }
    }

    /// Directories in use
    #[must_use]
    pub const fn config(&self) -> &ArtifactConfig {
        &self.config
    }

    /// Capture the current page state for a failed test, stamped now
    pub async fn capture_on_failure(
        &self,
        test_name: &str,
        driver: &dyn BrowserDriver,
    ) -> Option<DebugArtifact> {
        let stamp = chrono::Utc::now().timestamp_millis();
        self.capture_at(test_name, stamp, driver).await
    }

    /// Capture with an explicit timestamp.
    ///
    /// Returns `None` when neither the DOM nor the screenshot was written.
    pub async fn capture_at(
        &self,
        test_name: &str,
        timestamp_ms: i64,
        driver: &dyn BrowserDriver,
    ) -> Option<DebugArtifact> {
        let stem = format!("{}-{timestamp_ms}", sanitize_name(test_name));

        let html = match driver.page_source().await {
            Ok(html) => Some(html),
            Err(e) => {
                tracing::warn!(test = test_name, error = %e, "could not read page source for debug artifact");
                None
            }
        };
        let screenshot = match driver.screenshot().await {
            Ok(png) => Some(png),
            Err(e) => {
                tracing::warn!(test = test_name, error = %e, "could not take screenshot for debug artifact");
                None
            }
        };

        let html_path = html
            .as_ref()
            .and_then(|h| self.store(&format!("{stem}.html"), h.as_bytes()));
        let screenshot_path = screenshot
            .as_ref()
            .and_then(|png| self.store(&format!("{stem}.png"), png));

        if html_path.is_none() && screenshot_path.is_none() {
            return None;
        }
        tracing::info!(
            test = test_name,
            html = ?html_path,
            screenshot = ?screenshot_path,
            "debug artifacts captured"
        );

        Some(DebugArtifact {
            test_name: test_name.to_string(),
            timestamp_ms,
            html,
            screenshot,
            html_path,
            screenshot_path,
        })
    }

    /// Write into the primary directory and mirror.
    ///
    /// Path of the primary copy, or of the mirror copy when only that one
    /// was written.
    fn store(&self, file_name: &str, bytes: &[u8]) -> Option<PathBuf> {
        let primary = self.config.primary_dir.join(file_name);
        let written = match write_truncate(&primary, bytes) {
            Ok(()) => Some(primary),
            Err(e) => {
                tracing::warn!(error = %e, "debug artifact not written");
                None
            }
        };
        let Some(mirror_dir) = &self.config.mirror_dir else {
            return written;
        };
        let mirror = mirror_dir.join(file_name);
        match write_truncate(&mirror, bytes) {
            Ok(()) => written.or(Some(mirror)),
            Err(e) => {
                tracing::warn!(error = %e, "debug artifact not mirrored");
                written
            }
        }
    }

    /// Copy every primary artifact into the mirror directory.
    ///
    /// Flat copy, existing files replaced, failures ignored. Returns the
    /// number of files copied.
    pub fn mirror_all(&self) -> usize {
        let Some(mirror_dir) = &self.config.mirror_dir else {
            return 0;
        };
        let entries = match fs::read_dir(&self.config.primary_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.config.primary_dir.display(), error = %e, "nothing to mirror");
                return 0;
            }
        };
        if let Err(e) = fs::create_dir_all(mirror_dir) {
            tracing::warn!(dir = %mirror_dir.display(), error = %e, "mirror directory unavailable");
            return 0;
        }

        let mut copied = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            match fs::copy(&path, mirror_dir.join(name)) {
                Ok(_) => copied += 1,
                Err(e) => tracing::warn!(file = %path.display(), error = %e, "artifact not mirrored"),
            }
        }
        copied
    }

    /// Newest `.html` and `.png` of a test in the primary directory,
    /// ignoring files stamped before `since_ms`
    #[must_use]
    pub fn latest_for(&self, test_name: &str, since_ms: i64) -> LatestArtifacts {
        let prefix = format!("{}-", sanitize_name(test_name));
        let mut newest_html: Option<(SystemTime, PathBuf)> = None;
        let mut newest_png: Option<(SystemTime, PathBuf)> = None;

        let Ok(entries) = fs::read_dir(&self.config.primary_dir) else {
            return LatestArtifacts::default();
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(rest) = name.strip_prefix(&prefix) else {
                continue;
            };
            let (stamp, slot) = if let Some(stamp) = rest.strip_suffix(".html") {
                (stamp, &mut newest_html)
            } else if let Some(stamp) = rest.strip_suffix(".png") {
                (stamp, &mut newest_png)
            } else {
                continue;
            };
            if stamp.is_empty() || !stamp.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            if stamp.parse::<i64>().map_or(true, |stamp| stamp < since_ms) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            // equal mtimes fall back to the name, whose stamp sorts by time
            let newer = slot
                .as_ref()
                .map_or(true, |(t, p)| (modified, &path) > (*t, p));
            if newer {
                *slot = Some((modified, path));
            }
        }

        LatestArtifacts {
            html: newest_html.map(|(_, p)| p),
            screenshot: newest_png.map(|(_, p)| p),
        }
    }
}

/// Create or truncate, then write
fn write_truncate(path: &Path, bytes: &[u8]) -> SondaResult<()> {
    let to_err = |e: std::io::Error| SondaError::ArtifactWrite {
        path: path.display().to_string(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(to_err)?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(to_err)?;
    file.write_all(bytes).map_err(to_err)?;
    file.flush().map_err(to_err)
}
