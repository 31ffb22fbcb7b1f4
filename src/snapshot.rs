//! Scratch snapshots of live browser stores.
//!
//! Browsers hold exclusive locks on their databases while running, so every
//! reader works on a copy. The copy lives until the guard drops, which also
//! covers error paths.

use rusqlite::{Connection, OpenFlags};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{HarvestError, HarvestResult};

static SQLITE_FLAGS: OpenFlags = {
    let read_only = OpenFlags::SQLITE_OPEN_READ_ONLY;
    let no_mutex = OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let uri = OpenFlags::SQLITE_OPEN_URI;
    read_only.union(no_mutex).union(uri)
};

/// A copy of a browser file in the scratch directory, removed on drop.
#[derive(Debug)]
pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    /// Copy `source` into `scratch_dir`. The filename is prefixed with
    /// `namespace` so that concurrent runs against different browsers never
    /// collide on the shared basenames (`Cookies`, `History`, ...).
    pub fn take(source: &Path, scratch_dir: &Path, namespace: &str) -> HarvestResult<Self> {
        let basename = source
            .file_name()
            .ok_or_else(|| HarvestError::Io(format!("not a file: {}", source.display())))?
            .to_string_lossy();
        let path = scratch_dir.join(format!("{namespace}_{basename}"));

        fs::copy(source, &path).map_err(|e| {
            HarvestError::Io(format!("failed to snapshot {}: {e}", source.display()))
        })?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the snapshot read-only with journaling off, tolerating WAL
    /// sidecars the browser left next to the original file.
    pub fn open_db(&self) -> HarvestResult<Connection> {
        let conn = Connection::open_with_flags(&self.path, SQLITE_FLAGS)
            .map_err(|e| HarvestError::Database(e).with_info(format!("{:?}", self.path)))?;

        if let Err(e) = conn.query_row("PRAGMA journal_mode=off", [], |_| Ok(())) {
            debug!("journal_mode pragma failed on {:?}: {e}", self.path);
        }

        Ok(conn)
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            debug!("failed to remove snapshot {:?}: {e}", self.path);
        }
    }
}
