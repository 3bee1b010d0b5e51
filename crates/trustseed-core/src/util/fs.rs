//! Filesystem utilities.

use std::io::Write;
use std::path::{Path, PathBuf};
use trustseed_types::Result;

/// Expand a leading tilde to the home directory.
pub fn expand_path(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();

    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }

    path.to_path_buf()
}

/// Replace `path` with `contents` in one rename.
///
/// The data is written to a temporary file in the destination directory and
/// renamed over the target, so readers never observe a half-written file.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> std::io::Result<()> {
    let path = path.as_ref();
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    std::fs::create_dir_all(directory)?;

    let mut temp = tempfile::NamedTempFile::new_in(directory)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write `contents` to `path`, creating it readable by the owner only.
///
/// A new file is created with mode 0600 so the contents are never exposed
/// under the default umask. An existing file keeps its permission bits.
pub fn write_private(path: impl AsRef<Path>, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

/// Set unix permission bits on a file. A no-op on other platforms.
#[cfg(unix)]
pub fn set_mode(path: impl AsRef<Path>, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

/// Set unix permission bits on a file. A no-op on other platforms.
#[cfg(not(unix))]
pub fn set_mode(_path: impl AsRef<Path>, _mode: u32) -> Result<()> {
    Ok(())
}
