// File discovery. A path given on the command line is either a single
// file or a directory that is walked recursively; either way the caller
// gets a lazy sequence of regular files.

use crate::error::UploadError;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Lazy, single-pass sequence of the regular files under a root.
///
/// Entries that cannot be read (permissions, symlink loops) come out as
/// `Err` items so the caller can count them and keep going.
pub struct FileWalker {
    root: PathBuf,
    inner: walkdir::IntoIter,
}

/// Start walking `root`. Fails with `PathNotFound` if it does not exist.
pub fn walk(root: &Path) -> Result<FileWalker, UploadError> {
    if !root.exists() {
        return Err(UploadError::PathNotFound(root.to_path_buf()));
    }
    Ok(FileWalker {
        root: root.to_path_buf(),
        inner: WalkDir::new(root).follow_links(true).into_iter(),
    })
}

impl Iterator for FileWalker {
    type Item = Result<PathBuf, UploadError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) if entry.file_type().is_file() => return Some(Ok(entry.into_path())),
                Ok(_) => continue,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(UploadError::Io {
                        path,
                        source: e.into(),
                    }));
                }
            }
        }
    }
}
