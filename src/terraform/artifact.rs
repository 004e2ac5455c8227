//! Writes the accepted template into the working directory.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::types::Result;

/// Write `contents` to `dir/file_name` with leading whitespace stripped.
///
/// Replaces an existing file. On Unix the file is created with mode `0600`.
pub fn store_template(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(file_name);

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&path)?;
    file.write_all(contents.trim_start().as_bytes())?;
    file.sync_all()?;

    // mode() only applies on create
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }

    info!("Template written to {}", path.display());
    Ok(path)
}
