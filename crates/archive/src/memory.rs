//! In-process backend
//!
//! Clones share one store, so a bag written through one handle can be read
//! back through another without touching disk.

use crate::spec::{ArchiveSpec, Format, Mode};
use crate::{check_entryname, require_mode, Archive};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tidebag_core::{canonical_entryname, BagError, BagResult};
use tracing::debug;

/// An archive held in memory
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    spec: ArchiveSpec,
    entries: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryArchive {
    /// An empty archive
    pub fn new() -> Self {
        Self::with_spec(ArchiveSpec::memory())
    }

    pub(crate) fn with_spec(spec: ArchiveSpec) -> Self {
        MemoryArchive {
            spec: ArchiveSpec {
                format: Some(Format::Memory),
                ..spec
            },
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryArchive {
    fn default() -> Self {
        Self::new()
    }
}

impl Archive for MemoryArchive {
    fn list(&self) -> BagResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }

    fn read(&self, entryname: &str) -> BagResult<Vec<u8>> {
        let key = canonical_entryname(check_entryname(entryname)?);
        self.entries
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| BagError::not_found(key))
    }

    fn write(&mut self, entryname: &str, data: &[u8]) -> BagResult<()> {
        require_mode(&self.spec, Mode::Write, "write to")?;
        let key = canonical_entryname(check_entryname(entryname)?);
        debug!(entryname = %key, bytes = data.len(), "Writing entry to memory");
        self.entries.write().insert(key, data.to_vec());
        Ok(())
    }

    fn close(&mut self) -> BagResult<()> {
        Ok(())
    }

    fn spec(&self) -> &ArchiveSpec {
        &self.spec
    }

    fn describe(&self) -> String {
        format!("memory archive with {} entries", self.len())
    }
}
