// Input decoding: turns one file found by the walker into the buffers that
// get sent to the server. Plain files are a single buffer; tar, zip, gzip
// and bzip2 inputs are unpacked in memory, one buffer per member.

use crate::error::UploadError;
use anyhow::Context;
use bzip2::read::{BzDecoder, MultiBzDecoder};
use flate2::read::{GzDecoder, MultiGzDecoder};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// How a file is unpacked, decided from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    TarGz,
    TarBz2,
    Tar,
    Zip,
    Gzip,
    Bzip2,
    Plain,
}

impl InputKind {
    pub fn is_archive(self) -> bool {
        matches!(
            self,
            InputKind::TarGz | InputKind::TarBz2 | InputKind::Tar | InputKind::Zip
        )
    }
}

pub fn classify(path: &Path) -> InputKind {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        InputKind::TarGz
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        InputKind::TarBz2
    } else if name.ends_with(".tar") {
        InputKind::Tar
    } else if name.ends_with(".zip") {
        InputKind::Zip
    } else if name.ends_with(".gz") {
        InputKind::Gzip
    } else if name.ends_with(".bz2") {
        InputKind::Bzip2
    } else {
        InputKind::Plain
    }
}

/// One buffer to upload, labelled for progress and error messages.
#[derive(Debug)]
pub struct Payload {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Decode `path` and hand every payload it contains to `sink`, in order.
///
/// Payloads already handed over stay handed over if the input turns out
/// to be corrupt halfway through; the error is returned afterwards.
pub fn for_each_payload<F>(path: &Path, mut sink: F) -> Result<(), UploadError>
where
    F: FnMut(Payload),
{
    let open = || {
        File::open(path).map_err(|source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        })
    };

    match classify(path) {
        InputKind::Plain => {
            let bytes = std::fs::read(path).map_err(|source| UploadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            sink(Payload {
                name: path.display().to_string(),
                bytes,
            });
        }
        // Concatenated members are read as one stream.
        InputKind::Gzip => sink(Payload {
            name: path.display().to_string(),
            bytes: decompress(path, MultiGzDecoder::new(open()?))?,
        }),
        InputKind::Bzip2 => sink(Payload {
            name: path.display().to_string(),
            bytes: decompress(path, MultiBzDecoder::new(open()?))?,
        }),
        InputKind::Tar => read_tar(path, open()?, &mut sink)?,
        InputKind::TarGz => read_tar(path, GzDecoder::new(open()?), &mut sink)?,
        InputKind::TarBz2 => read_tar(path, BzDecoder::new(open()?), &mut sink)?,
        InputKind::Zip => read_zip(path, open()?, &mut sink)?,
    }
    Ok(())
}

fn decompress<R: Read>(path: &Path, mut reader: R) -> anyhow::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .with_context(|| format!("Failed to decompress {}", path.display()))?;
    Ok(bytes)
}

fn read_tar<R: Read>(
    path: &Path,
    reader: R,
    sink: &mut dyn FnMut(Payload),
) -> anyhow::Result<()> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive
        .entries()
        .with_context(|| format!("Failed to read tar archive {}", path.display()))?;
    for entry in entries {
        let mut entry =
            entry.with_context(|| format!("Corrupt entry in tar archive {}", path.display()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.display().to_string();
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to extract {} from {}", name, path.display()))?;
        sink(Payload { name, bytes });
    }
    Ok(())
}

fn read_zip(path: &Path, file: File, sink: &mut dyn FnMut(Payload)) -> anyhow::Result<()> {
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read zip archive {}", path.display()))?;
    for i in 0..archive.len() {
        let mut member = archive
            .by_index(i)
            .with_context(|| format!("Corrupt entry in zip archive {}", path.display()))?;
        if member.is_dir() || member.size() == 0 {
            continue;
        }
        let name = member.name().to_string();
        let mut bytes = Vec::new();
        member
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to extract {} from {}", name, path.display()))?;
        sink(Payload { name, bytes });
    }
    Ok(())
}
