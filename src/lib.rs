// Library root
// ------------
// The binary (`main.rs`) is a thin wrapper around these modules so the
// whole import flow can be driven from tests.
//
// Module responsibilities:
// - `config`: command-line options and their validation into `RunConfig`.
// - `walker`: lazy recursive discovery of the files to import.
// - `archive`: unpacks tar/zip/gzip inputs into upload buffers.
// - `api`: HTTP interactions with the DICOM server (clear, upload, tags).
// - `upload`: drives a run and keeps the per-run `Report`.
// - `ui`: confirmation prompt, spinner and the text printed to the user.
// - `error`: the error taxonomy shared by all of the above.
pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod ui;
pub mod upload;
pub mod walker;

pub use config::{Cli, RunConfig};
pub use error::UploadError;
pub use upload::{run, Report};
