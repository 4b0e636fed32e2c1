// Error taxonomy for a run. Local problems (missing paths, bad options)
// are fatal; server problems are fatal during `clear` and per-file during
// uploads. `main` maps whatever reaches it to an exit status.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Missing file or directory: {}", .0.display())]
    PathNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Server unreachable at {url}: {source}")]
    ServerUnreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server error from {url}: {status} - {body}")]
    Server {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UploadError {
    /// Process exit status for an error that aborted the run.
    pub fn exit_code(&self) -> u8 {
        match self {
            UploadError::Configuration(_) => 2,
            _ => 1,
        }
    }
}
