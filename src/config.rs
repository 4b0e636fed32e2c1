// Command-line configuration. `Cli` is what clap parses; `RunConfig` is
// the validated, immutable form the rest of the crate works with.

use crate::error::UploadError;
use clap::Parser;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Import DICOM files, directories and archives into a DICOM server
/// through its REST API.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "dicom-upload", author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the server's REST API, e.g. http://localhost:8042
    #[arg(long, env = "DICOM_SERVER_URL")]
    pub url: Option<String>,

    /// Remove every study stored on the server before importing
    #[arg(long)]
    pub clear: bool,

    /// Do not ask for confirmation before clearing
    #[arg(long)]
    pub force: bool,

    /// Be verbose
    #[arg(long)]
    pub verbose: bool,

    /// Do not report files the server refuses
    #[arg(long)]
    pub ignore_errors: bool,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Files, directories or archives to import
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,
}

/// Settings for one run, built once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub url: String,
    pub clear: bool,
    pub force: bool,
    pub verbose: bool,
    pub ignore_errors: bool,
    pub timeout: Option<Duration>,
    pub paths: Vec<PathBuf>,
}

impl Cli {
    /// Validate the parsed options. Never touches the filesystem or the
    /// network, so a bad invocation fails before any work starts.
    pub fn into_config(self) -> Result<RunConfig, UploadError> {
        let url = match self.url.as_deref().map(str::trim) {
            Some(u) if !u.is_empty() => normalize_url(u)?,
            _ => {
                return Err(UploadError::Configuration(
                    "--url is required (or set DICOM_SERVER_URL)".into(),
                ))
            }
        };

        if self.paths.is_empty() && !self.clear {
            return Err(UploadError::Configuration(
                "no file or directory to import (pass at least one PATH, or --clear)".into(),
            ));
        }

        if self.timeout == Some(0) {
            return Err(UploadError::Configuration(
                "--timeout must be at least 1 second".into(),
            ));
        }

        Ok(RunConfig {
            url,
            clear: self.clear,
            force: self.force,
            verbose: self.verbose,
            ignore_errors: self.ignore_errors,
            timeout: self.timeout.map(Duration::from_secs),
            paths: self.paths,
        })
    }
}

/// Log filter for a run. Debug output is limited to this crate so that
/// `--verbose` shows per-file lines, not HTTP internals.
pub fn log_directive(verbose: bool) -> &'static str {
    if verbose {
        "warn,dicom_upload=debug"
    } else {
        "warn,dicom_upload=info"
    }
}

fn normalize_url(raw: &str) -> Result<String, UploadError> {
    let parsed = Url::parse(raw)
        .map_err(|e| UploadError::Configuration(format!("invalid --url '{}': {}", raw, e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(UploadError::Configuration(format!(
            "invalid --url '{}': expected an http:// or https:// address",
            raw
        )));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
