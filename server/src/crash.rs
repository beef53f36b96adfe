//! Crash report intake.

use async_trait::async_trait;
use keyward_types::{Platform, Version};
use std::io;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

/// Largest report kept, in bytes.
pub const MAX_CRASH_BYTES: usize = 64_000;
/// Most lines kept from a report.
pub const MAX_CRASH_LINES: usize = 1024;
/// Longest accepted OS slug, in bytes.
pub const MAX_OS_LEN: usize = 16;

/// A capped report ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReport {
    pub content: String,
    pub os: Platform,
    pub version: Version,
    /// Set when the reporter sent valid credentials.
    pub email: Option<String>,
}

impl CrashReport {
    /// `.ips` for JSON reports from the macOS crash reporter, `.crash` otherwise.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        if self.content.starts_with(r#"{"app_name":"#) {
            "ips"
        } else {
            "crash"
        }
    }
}

/// Cuts `content` to at most [`MAX_CRASH_BYTES`] and [`MAX_CRASH_LINES`].
///
/// The byte cut backs off to a character boundary.
#[must_use]
pub fn cap_crash_report(content: &str) -> &str {
    let mut end = content.len().min(MAX_CRASH_BYTES);
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    let content = &content[..end];

    match content.match_indices('\n').nth(MAX_CRASH_LINES - 1) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Where crash reports end up.
#[async_trait]
pub trait CrashSink: Send + Sync {
    /// Stores a report and returns its name.
    async fn store(&self, report: &CrashReport) -> io::Result<String>;
}

/// Writes each report to `crash-<uuid>.<ext>` in a directory.
pub struct FsCrashSink {
    dir: PathBuf,
}

impl FsCrashSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CrashSink for FsCrashSink {
    async fn store(&self, report: &CrashReport) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let name = format!("crash-{}.{}", Uuid::new_v4(), report.extension());
        tokio::fs::write(self.dir.join(&name), report.content.as_bytes()).await?;
        info!(
            file = %name,
            os = %report.os,
            version = %report.version,
            email = report.email.as_deref().unwrap_or("-"),
            bytes = report.content.len(),
            "crash report stored"
        );
        Ok(name)
    }
}
