//! Scoped scratch space for one pipeline run
//!
//! Every run gets its own uniquely named directory, so repeated or
//! concurrent runs never share intermediate file names. The directory and
//! anything left inside it is removed when the workspace is dropped.

use crate::types::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a workspace under `parent`, or the system temp dir when `None`
    pub fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("panel-run-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a named artifact inside the workspace
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Best-effort removal of a consumed artifact
    pub fn discard(&self, path: &Path) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Could not remove temporary file {}: {}", path.display(), e);
        } else {
            debug!("Removed temporary file {}", path.display());
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        debug!("Releasing workspace {}", self.dir.path().display());
    }
}
