// Run driver: optional clear, then every input path is walked and each
// buffer found is posted to the server. Upload failures are counted per
// file and never stop the run; missing inputs and a failed clear do.

use crate::api::ApiClient;
use crate::archive::{self, Payload};
use crate::config::RunConfig;
use crate::error::UploadError;
use crate::ui;
use crate::walker;
use indicatif::ProgressBar;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Counters for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub instances: usize,
    pub studies: BTreeSet<String>,
    pub json_ignored: usize,
    pub errors: usize,
    /// Studies removed by `--clear`, if it ran.
    pub cleared: Option<usize>,
}

impl Report {
    pub fn is_success(&self) -> bool {
        self.errors == 0
    }
}

pub struct Uploader {
    api: ApiClient,
    ignore_errors: bool,
    report: Report,
    progress: ProgressBar,
}

impl Uploader {
    pub fn new(api: ApiClient, config: &RunConfig) -> Self {
        Uploader {
            api,
            ignore_errors: config.ignore_errors,
            report: Report::default(),
            progress: ui::spinner(),
        }
    }

    /// Remove everything from the server. Unlike uploads this is not
    /// best-effort: any failure is returned to the caller.
    pub fn clear(&mut self) -> Result<usize, UploadError> {
        let removed = self.api.clear()?;
        self.report.cleared = Some(removed);
        Ok(removed)
    }

    /// Import a file or everything below a directory. Only a missing root
    /// is an error here; problems with individual files are counted.
    pub fn upload_path(&mut self, root: &Path) -> Result<(), UploadError> {
        for entry in walker::walk(root)? {
            match entry {
                Ok(path) => self.upload_file(&path),
                Err(e) => self.record_failure(&entry_name(root, &e), &e),
            }
        }
        Ok(())
    }

    /// Decode one file (unpacking archives) and upload what it contains.
    pub fn upload_file(&mut self, path: &Path) {
        let kind = archive::classify(path);
        if kind.is_archive() {
            debug!(path = %path.display(), ?kind, "uncompressing archive");
        }
        let result = archive::for_each_payload(path, |payload| self.upload_buffer(payload));
        if let Err(e) = result {
            self.record_failure(&path.display().to_string(), &e);
        }
    }

    /// Send one buffer, unless it is JSON, and update the report.
    pub fn upload_buffer(&mut self, payload: Payload) {
        if is_json(&payload.bytes) {
            debug!(file = %payload.name, "skipping JSON file");
            self.report.json_ignored += 1;
            return;
        }

        debug!(
            file = %payload.name,
            size_mb = payload.bytes.len() / (1024 * 1024),
            "uploading"
        );
        self.progress.set_message(payload.name.clone());
        self.progress.inc(1);

        let receipt = match self.api.upload_instance(payload.bytes) {
            Ok(Some(receipt)) => receipt,
            Ok(None) => {
                // Stored, but the answer does not name a single study.
                self.report.instances += 1;
                return;
            }
            Err(e) => {
                self.record_failure(&payload.name, &e);
                return;
            }
        };
        self.report.instances += 1;

        if self.report.studies.insert(receipt.parent_study.clone()) {
            let tags = match self.api.instance_tags(&receipt.id) {
                Ok(tags) => Some(tags),
                Err(e) => {
                    warn!(instance = %receipt.id, error = %e, "could not fetch tags of new study");
                    None
                }
            };
            self.progress
                .suspend(|| ui::print_new_study(&receipt, tags.as_ref()));
        }
    }

    fn record_failure(&mut self, name: &str, err: &UploadError) {
        self.report.errors += 1;
        if self.ignore_errors {
            debug!(file = name, error = %err, "not a valid DICOM file, ignoring it");
        } else {
            self.progress
                .suspend(|| warn!(file = name, error = %err, "upload failed"));
        }
    }

    pub fn finish(self) -> Report {
        self.progress.finish_and_clear();
        self.report
    }
}

/// Name to report a walker error under: the failing entry when known.
fn entry_name(root: &Path, err: &UploadError) -> String {
    match err {
        UploadError::Io { path, .. } => path.display().to_string(),
        _ => root.display().to_string(),
    }
}

/// Buffers that parse as JSON are metadata sitting next to the images and
/// are not sent.
pub fn is_json(bytes: &[u8]) -> bool {
    serde_json::from_slice::<serde::de::IgnoredAny>(bytes).is_ok()
}

/// Execute a whole run: validate inputs, clear if asked, upload.
///
/// Every input path is checked before the first request so that a typo
/// never leaves the server half-cleared.
pub fn run(config: &RunConfig) -> Result<Report, UploadError> {
    if let Some(missing) = config.paths.iter().find(|p| !p.exists()) {
        return Err(UploadError::PathNotFound(missing.clone()));
    }

    let api = ApiClient::new(&config.url, config.timeout)?;
    let mut uploader = Uploader::new(api, config);

    if config.clear {
        if !ui::confirm_clear(&config.url, config.force)? {
            return Err(UploadError::Configuration("clear cancelled".into()));
        }
        let removed = uploader.clear()?;
        ui::print_cleared(removed);
    }

    for path in &config.paths {
        info!(path = %path.display(), "importing");
        uploader.upload_path(path)?;
    }

    Ok(uploader.finish())
}
