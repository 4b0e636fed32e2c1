// UI layer: confirmation prompt, progress spinner and the report blocks
// printed to stdout. Logging goes through `tracing`; everything a user is
// expected to read at the end of a run goes through here.

use crate::api::{InstanceReceipt, ShortTags, TAG_PATIENT_ID, TAG_STUDY_INSTANCE_UID};
use crate::error::UploadError;
use crate::upload::Report;
use anyhow::Context;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;

/// Ask before wiping the server. Only prompts on an interactive stdin;
/// with `--force` or when scripted, the clear goes ahead.
pub fn confirm_clear(url: &str, force: bool) -> Result<bool, UploadError> {
    if force || !std::io::stdin().is_terminal() {
        return Ok(true);
    }
    let ok = Confirm::new()
        .with_prompt(format!("Remove ALL studies stored on {}?", url))
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;
    Ok(ok)
}

/// Spinner shown while files are sent. indicatif hides it by itself when
/// stderr is not a terminal.
pub fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} [{pos}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner
}

pub fn print_cleared(count: usize) {
    println!("Removing the content of the server");
    println!("  {} studies removed", count);
    println!("The server is now empty");
    println!();
}

/// Block printed the first time a study shows up in a run.
pub fn print_new_study(receipt: &InstanceReceipt, tags: Option<&ShortTags>) {
    let tag = |key: &str| {
        tags.and_then(|t| t.get(key))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("(empty)")
            .to_string()
    };
    println!();
    println!("New imported study:");
    println!("  Orthanc ID of the patient: {}", receipt.parent_patient);
    println!("  Orthanc ID of the study: {}", receipt.parent_study);
    println!("  DICOM Patient ID: {}", tag(TAG_PATIENT_ID));
    println!("  DICOM Study Instance UID: {}", tag(TAG_STUDY_INSTANCE_UID));
    println!();
}

pub fn print_summary(report: &Report) {
    println!();
    println!("{}", summary(report));
}

/// Final summary text, `SUCCESS:` or `WARNING:` depending on errors.
pub fn summary(report: &Report) -> String {
    let head = if report.errors == 0 { "SUCCESS:" } else { "WARNING:" };
    format!(
        "{}\n  {} DICOM instances properly imported\n  {} DICOM studies properly imported\n  {} JSON files ignored\n  Error in {} files\n",
        head,
        report.instances,
        report.studies.len(),
        report.json_ignored,
        report.errors,
    )
}
