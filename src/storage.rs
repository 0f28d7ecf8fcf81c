//! Directory provisioning and artifact writes.
//!
//! All artifact writes go through [`write_atomic`]: bytes land in a temp
//! file inside the destination directory and are renamed over the final
//! name, so readers only ever see complete files. Temp files carry the
//! [`TEMP_PREFIX`] so the sweep can recognise leftovers from interrupted
//! writes.

use crate::error::ImageError;
use crate::paths::StorageLayout;
use std::fs::{self, DirBuilder};
use std::io::{self, Write};
use std::path::Path;

/// File name prefix of in-flight atomic writes.
pub const TEMP_PREFIX: &str = ".tmp-";

/// Check the files root and create `<files_root>/users` if absent.
///
/// A missing files root is a deployment error and is reported, not created.
pub fn prepare_files_root(files_root: &Path) -> io::Result<StorageLayout> {
    if !files_root.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("files root {} does not exist", files_root.display()),
        ));
    }
    let layout = StorageLayout::new(files_root);
    fs::create_dir_all(layout.users_root())?;
    Ok(layout)
}

/// Idempotently create a user's root plus `images/` and `thumbnails/`.
pub fn ensure_user_directories(
    layout: &StorageLayout,
    user_id: &str,
    dir_mode: u32,
) -> Result<(), ImageError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(dir_mode);
    }
    #[cfg(not(unix))]
    let _ = dir_mode;

    builder.create(layout.images_dir(user_id)?)?;
    builder.create(layout.thumbnails_dir(user_id)?)?;
    Ok(())
}

/// Write `bytes` to `path` via temp file + rename in the same directory.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", path.display()),
        )
    })?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Remove a file, logging instead of failing. Returns whether it was removed.
pub fn remove_best_effort(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove artifact");
            false
        }
    }
}
