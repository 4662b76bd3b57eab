use std::path::{Path, PathBuf};

use tracing::{debug, error};
use walkdir::WalkDir;

use crate::error::TraversalError;

/// A regular file discovered under the walked root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    path: PathBuf,
    depth: usize,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, depth: usize) -> Self {
        Self {
            path: path.into(),
            depth,
        }
    }

    /// Absolute path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Distance from the walked root, the root itself being 0.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Lists every non-directory entry at most `max_depth` levels below `root`.
///
/// Any traversal failure is logged and yields an empty list, so callers can still
/// report a run that processed zero files.
pub fn list_files(root: &Path, max_depth: usize) -> Vec<SourceFile> {
    match try_list_files(root, max_depth) {
        Ok(files) => {
            debug!(
                root = %root.display(),
                max_depth,
                "found {} files",
                files.len()
            );
            files
        }
        Err(err) => {
            error!(
                root = %root.display(),
                "read files from the directory error: {}", err
            );
            Vec::new()
        }
    }
}

pub fn try_list_files(root: &Path, max_depth: usize) -> Result<Vec<SourceFile>, TraversalError> {
    let root = root.canonicalize().map_err(|source| TraversalError::Root {
        path: root.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in WalkDir::new(&root).max_depth(max_depth) {
        let entry = entry?;
        // Symlinks count as directories when they point at one
        if entry.path().is_dir() {
            continue;
        }
        files.push(SourceFile::new(entry.path(), entry.depth()));
    }
    Ok(files)
}
