//! Filesystem side of the engine.
//!
//! Thin wrappers over `std::fs` that log the failing path before the
//! error is returned.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, error, warn};

use crate::{PortalError, Result};

fn fail(action: &str, path: &Path, e: io::Error) -> PortalError {
    error!(path = %path.display(), error = %e, "Failed to {}", action);
    e.into()
}

/// Create a single directory. The parent must exist.
pub(super) fn create_dir(path: &Path) -> Result<()> {
    fs::create_dir(path).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            return PortalError::Conflict(format!("'{}' already exists", path.display()));
        }
        fail("create directory", path, e)
    })?;
    debug!("Created directory {}", path.display());
    Ok(())
}

/// Rename a file or directory.
pub(super) fn rename(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to).map_err(|e| {
        error!(from = %from.display(), to = %to.display(), error = %e, "Failed to rename");
        PortalError::from(e)
    })?;
    debug!("Renamed {} to {}", from.display(), to.display());
    Ok(())
}

/// Remove an empty directory. A missing directory is not an error.
pub(super) fn remove_dir(path: &Path) -> Result<()> {
    match fs::remove_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("Directory {} was already gone", path.display());
            Ok(())
        }
        Err(e) => Err(fail("remove directory", path, e)),
    }
}

/// Remove a file. A missing file is not an error.
pub(super) fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            warn!("File {} was already gone", path.display());
            Ok(())
        }
        Err(e) => Err(fail("remove file", path, e)),
    }
}

/// Copy file bytes, returning the number of bytes copied.
pub(super) fn copy_file(from: &Path, to: &Path) -> Result<u64> {
    fs::copy(from, to).map_err(|e| {
        error!(from = %from.display(), to = %to.display(), error = %e, "Failed to copy file");
        PortalError::from(e)
    })
}

/// Write a new file; fails if something already exists at `path`.
pub(super) fn write_new_file(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                return PortalError::Conflict(format!("'{}' already exists", path.display()));
            }
            fail("create file", path, e)
        })?;
    file.write_all(content).map_err(|e| fail("write file", path, e))
}

/// Replace the content of an existing file.
pub(super) fn overwrite_file(path: &Path, content: &[u8]) -> Result<()> {
    fs::write(path, content).map_err(|e| fail("overwrite file", path, e))?;
    debug!("Overwrote {}", path.display());
    Ok(())
}

/// Read a whole file.
pub(super) fn read_file(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(PortalError::NotFound(format!(
            "stored content for {}",
            path.display()
        ))),
        Err(e) => Err(fail("read file", path, e)),
    }
}
