//! Filesystem primitives shared by objects and queues.
//!
//! Every write goes through a hidden `.pending-*` temporary file in the
//! destination directory and is published with a single rename or link, so
//! readers only ever see complete files. Permission bits are applied
//! explicitly after creation so the process umask cannot change them.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::trace;

use crate::error::{StoreError, StoreResult};

/// Prefix of staging files. Hidden, so queue listings skip them.
const PENDING_PREFIX: &str = ".pending-";

/// Ensure `path` and any missing ancestors exist as directories with `mode`.
///
/// Existing directories are left untouched. Losing a creation race to a
/// concurrent caller is not an error.
pub(crate) fn ensure_dir(path: &Path, mode: u32) -> StoreResult<()> {
    if path.is_dir() {
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_dir(parent, mode)?;
        }
    }

    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }

    match builder.create(path) {
        Ok(()) => {
            set_path_mode(path, mode).map_err(StoreError::io("set permissions on", path))?;
            trace!(path = %path.display(), mode = format_args!("{mode:o}"), "created directory");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(e) => Err(StoreError::io("create directory", path)(e)),
    }
}

/// Atomically create or replace `path` with `content`.
pub(crate) fn write_replace(path: &Path, content: &[u8], mode: u32) -> StoreResult<()> {
    let staged = stage(path, content, mode)?;
    staged
        .persist(path)
        .map_err(|e| StoreError::io("write", path)(e.error))?;
    Ok(())
}

/// Atomically create `path` with `content`, failing if it already exists.
pub(crate) fn write_new(path: &Path, content: &[u8], mode: u32) -> StoreResult<()> {
    let staged = stage(path, content, mode)?;
    match staged.persist_noclobber(path) {
        Ok(_) => Ok(()),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Err(StoreError::TokenCollision {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(StoreError::io("write", path)(e.error)),
    }
}

/// Read a whole file, mapping absence to [`StoreError::NotFound`].
pub(crate) fn read(path: &Path) -> StoreResult<Vec<u8>> {
    fs::read(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            StoreError::io("read", path)(e)
        }
    })
}

/// Write `content` into a hidden temporary file next to `path`.
fn stage(path: &Path, content: &[u8], mode: u32) -> StoreResult<NamedTempFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(PENDING_PREFIX)
        .tempfile_in(dir)
        .map_err(StoreError::io("stage a file in", dir))?;

    let staged_path = staged.path().to_path_buf();
    staged
        .write_all(content)
        .and_then(|()| staged.flush())
        .map_err(StoreError::io("write", staged_path))?;
    set_file_mode(staged.as_file(), mode).map_err(StoreError::io("set permissions on", path))?;
    Ok(staged)
}

#[cfg(unix)]
fn set_path_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_path_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn set_file_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_file_mode(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}
