//! File-backed readiness flag, shared by the reconcile tail (writer) and
//! the /readyz route (reader). Presence of the marker file means ready.

use std::io;
use std::path::{Path, PathBuf};

pub struct ReadinessFile {
    path: PathBuf,
}

impl ReadinessFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ReadinessFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mark ready. Creates or truncates the marker file.
    pub fn set(&self) -> io::Result<()> {
        std::fs::write(&self.path, b"ok")
    }

    /// Mark unready. A missing marker is not an error.
    pub fn unset(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn is_set(&self) -> bool {
        self.path.exists()
    }
}
