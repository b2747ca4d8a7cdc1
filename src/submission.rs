//! `.pbr` submission files: a `#` comment header followed by one encoded line.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::codec::encode;
use crate::config::{Config, DEFAULT_UPLOAD_URL};
use crate::error::SubmissionError;
use crate::types::SignedPackage;

pub const EXTENSION: &str = "pbr";
const FILE_PREFIX: &str = "piggybank_benchmark";
const HEADER_TITLE: &str = "PiggyBankPC Benchmark Results";

/// First non-blank line that does not start with `#`, trimmed.
///
/// Only a `#` in the first column marks a comment; an indented `#` is payload.
pub fn extract_payload(content: &str) -> Option<&str> {
    content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::trim)
        .find(|line| !line.is_empty())
}

pub fn is_submission_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(EXTENSION))
}

/// `piggybank_benchmark_<YYYYmmdd_HHMMSS>_<fp8>.pbr`
pub fn file_name(hardware_fingerprint: &str, at: NaiveDateTime) -> String {
    let fp8: String = hardware_fingerprint
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(8)
        .collect();
    format!("{}_{}_{}.{}", FILE_PREFIX, at.format("%Y%m%d_%H%M%S"), fp8, EXTENSION)
}

/// The most recently modified `.pbr` file in `dir`, if any.
pub fn find_latest(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_pbr = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_submission_file);
        if !is_pbr || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if latest.as_ref().is_none_or(|(t, _)| modified > *t) {
            latest = Some((modified, path));
        }
    }
    Ok(latest.map(|(_, path)| path))
}

#[derive(Debug, Clone)]
pub struct SubmissionWriter {
    upload_url: String,
}

impl Default for SubmissionWriter {
    fn default() -> Self {
        Self { upload_url: DEFAULT_UPLOAD_URL.to_string() }
    }
}

impl SubmissionWriter {
    pub fn new(upload_url: impl Into<String>) -> Self {
        Self { upload_url: upload_url.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.upload_url.clone())
    }

    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Header comments plus the encoded package, newline terminated.
    pub fn render(&self, package: &SignedPackage, at: NaiveDateTime) -> Result<String, SubmissionError> {
        let encoded = encode(package)?;
        Ok(format!(
            "# {}\n# DO NOT EDIT THIS FILE\n# Upload this file to: {}\n# Version: {}\n# Timestamp: {}\n#\n{}\n",
            HEADER_TITLE,
            self.upload_url,
            package.data.version,
            at.format("%Y%m%d_%H%M%S"),
            encoded,
        ))
    }

    pub fn write(&self, package: &SignedPackage, output_dir: &Path) -> Result<PathBuf, SubmissionError> {
        self.write_at(package, output_dir, Local::now().naive_local())
    }

    /// Never overwrites: a taken name gets a `_1`, `_2`, ... suffix.
    pub fn write_at(
        &self,
        package: &SignedPackage,
        output_dir: &Path,
        at: NaiveDateTime,
    ) -> Result<PathBuf, SubmissionError> {
        fs::create_dir_all(output_dir)?;
        let content = self.render(package, at)?;
        let base = file_name(&package.data.hardware_fingerprint, at);
        let stem = base.trim_end_matches(".pbr");

        let mut attempt = 0u32;
        loop {
            let path = if attempt == 0 {
                output_dir.join(&base)
            } else {
                output_dir.join(format!("{}_{}.{}", stem, attempt, EXTENSION))
            };
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => {
                    fill_or_remove(file, &path, |f| {
                        f.write_all(content.as_bytes())?;
                        f.sync_all()
                    })?;
                    info!("Submission file created: {}", path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Runs `fill` on a freshly created file; on failure the partial file is deleted.
fn fill_or_remove<F>(mut file: File, path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    if let Err(e) = fill(&mut file) {
        drop(file);
        if let Err(remove_err) = fs::remove_file(path) {
            warn!("Could not remove partial file {}: {}", path.display(), remove_err);
        }
        return Err(e);
    }
    Ok(())
}
