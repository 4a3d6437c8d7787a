//! Fresh temporary archive paths
//!
//! Allocated paths are kept on disk; the caller owns them afterwards.

use std::path::PathBuf;
use tidebag_core::{BagError, BagResult};

/// Path value that asks the backend for a fresh temp path
pub const TEMP_PLACEHOLDER: &str = "<tempfile>";

const TEMP_PREFIX: &str = "tidebag-";

/// True if `path` is [`TEMP_PLACEHOLDER`]
pub fn is_placeholder(path: &str) -> bool {
    path == TEMP_PLACEHOLDER
}

/// Create an empty, persistent temp directory
pub fn temp_dir() -> BagResult<PathBuf> {
    let dir = tempfile::Builder::new().prefix(TEMP_PREFIX).tempdir()?;
    Ok(dir.keep())
}

/// Create an empty, persistent temp file ending in `suffix`
pub fn temp_file(suffix: &str) -> BagResult<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(suffix)
        .tempfile()?;
    file.into_temp_path()
        .keep()
        .map_err(|e| BagError::backend("create temp file", e.path.display().to_string(), e.error))
}
