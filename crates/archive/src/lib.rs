//! Storage backends for tidebag archives
//!
//! An archive stores byte blobs under entry names. Every backend implements
//! the [`Archive`] trait and is chosen by [`open_archive`] from an
//! [`ArchiveSpec`]:
//! - [`DirectoryArchive`]: one file per entry under a root directory
//! - [`MemoryArchive`]: a shared in-process map
//! - [`TarArchive`]: a plain or zstd-compressed tar file
//! - [`ZipArchive`]: a zip file
//!
//! Compressed backends are streams: writing appends to one forward-only
//! output, and every read rescans the file from the start.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod directory;
pub mod memory;
pub mod spec;
pub mod tarball;
pub mod temp;
pub mod zipfile;

pub use directory::DirectoryArchive;
pub use memory::MemoryArchive;
pub use spec::{open_archive, parse_format, ArchiveSpec, Format, Mode};
pub use tarball::TarArchive;
pub use temp::TEMP_PLACEHOLDER;
pub use zipfile::ZipArchive;

use tidebag_core::{BagError, BagResult};

/// Byte blobs keyed by entry name
///
/// Names may be given with or without a leading `/`; listings always use the
/// canonical form with one leading `/`. Implementations are used from one
/// thread at a time and do no internal locking of their own.
pub trait Archive: Send {
    /// Canonical names of every entry, in backend listing order
    fn list(&self) -> BagResult<Vec<String>>;

    /// Bytes stored at `entryname`, or [`BagError::NotFound`]
    fn read(&self, entryname: &str) -> BagResult<Vec<u8>>;

    /// Store `data` at `entryname`
    fn write(&mut self, entryname: &str, data: &[u8]) -> BagResult<()>;

    /// Flush and release the backing storage; idempotent
    fn close(&mut self) -> BagResult<()>;

    /// The resolved spec this archive was opened with
    fn spec(&self) -> &ArchiveSpec;

    /// Human-readable description for diagnostics
    fn describe(&self) -> String {
        self.spec().to_string()
    }
}

pub(crate) fn require_mode(spec: &ArchiveSpec, mode: Mode, operation: &str) -> BagResult<()> {
    if spec.mode == mode {
        Ok(())
    } else {
        Err(BagError::invalid_argument(format!(
            "cannot {} {}",
            operation, spec
        )))
    }
}

/// Reject names that would leave the archive root once joined to it
pub(crate) fn check_entryname(entryname: &str) -> BagResult<&str> {
    let relative = tidebag_core::relative_entryname(entryname);
    if relative.is_empty() {
        return Err(BagError::invalid_argument("empty entry name"));
    }
    if relative.split('/').any(|part| part == "..") {
        return Err(BagError::invalid_argument(format!(
            "entry name escapes the archive root: {}",
            entryname
        )));
    }
    Ok(relative)
}
