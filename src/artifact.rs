//! Screenshot persistence.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Write PNG bytes to `path`, replacing whatever was there.
///
/// Missing parent directories are created. Empty buffers and buffers without
/// a PNG signature are rejected before anything touches the disk.
pub fn write_png(path: impl AsRef<Path>, data: &[u8]) -> Result<PathBuf> {
    let path = path.as_ref();
    if data.is_empty() {
        return Err(Error::Artifact(format!(
            "refusing to write empty screenshot to {}",
            path.display()
        )));
    }
    if !data.starts_with(PNG_SIGNATURE) {
        return Err(Error::Artifact(format!(
            "screenshot for {} is not a PNG ({} bytes)",
            path.display(),
            data.len()
        )));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    debug!("wrote {} bytes to {}", data.len(), path.display());
    Ok(path.to_path_buf())
}
