//! Filesystem tree backend
//!
//! Entry `/a/b/c` lives at `{root}/a/b/c`. Leading separators are stripped
//! before joining so that no name can address a path outside the root.

use crate::spec::{ArchiveSpec, Format, Mode};
use crate::{check_entryname, require_mode, Archive};
use std::fs;
use std::path::{Path, PathBuf};
use tidebag_core::{canonical_entryname, BagError, BagResult};
use tracing::debug;

/// An archive backed by a directory
#[derive(Debug)]
pub struct DirectoryArchive {
    spec: ArchiveSpec,
    root: PathBuf,
}

impl DirectoryArchive {
    /// Open the directory named by `spec.path`
    ///
    /// In write mode the directory is created if missing; in read mode it
    /// must already exist.
    pub fn open(spec: ArchiveSpec) -> BagResult<Self> {
        let root = PathBuf::from(&spec.path);
        match spec.mode {
            Mode::Write => fs::create_dir_all(&root)
                .map_err(|e| BagError::backend("open", &spec.path, e))?,
            Mode::Read => {
                if !root.is_dir() {
                    return Err(BagError::backend("open", &spec.path, "not a directory"));
                }
            }
        }
        Ok(DirectoryArchive {
            spec: ArchiveSpec {
                format: Some(Format::Directory),
                ..spec
            },
            root,
        })
    }

    /// Root directory of the archive
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, entryname: &str) -> BagResult<PathBuf> {
        Ok(self.root.join(check_entryname(entryname)?))
    }
}

impl Archive for DirectoryArchive {
    fn list(&self) -> BagResult<Vec<String>> {
        let mut names = Vec::new();
        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir)
                .map_err(|e| BagError::backend("list", dir.display().to_string(), e))?;
            for entry in entries {
                let entry =
                    entry.map_err(|e| BagError::backend("list", dir.display().to_string(), e))?;
                let file_type = entry
                    .file_type()
                    .map_err(|e| BagError::backend("list", entry.path().display().to_string(), e))?;
                let path = entry.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    if let Ok(rel) = path.strip_prefix(&self.root) {
                        let parts: Vec<_> = rel
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect();
                        names.push(canonical_entryname(&parts.join("/")));
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read(&self, entryname: &str) -> BagResult<Vec<u8>> {
        let path = self.entry_path(entryname)?;
        if !path.is_file() {
            return Err(BagError::not_found(canonical_entryname(entryname)));
        }
        debug!(entryname, path = %path.display(), "Reading entry");
        fs::read(&path).map_err(|e| BagError::backend("read", path.display().to_string(), e))
    }

    fn write(&mut self, entryname: &str, data: &[u8]) -> BagResult<()> {
        require_mode(&self.spec, Mode::Write, "write to")?;
        let path = self.entry_path(entryname)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| BagError::backend("write", parent.display().to_string(), e))?;
        }
        debug!(entryname, bytes = data.len(), "Writing entry");
        fs::write(&path, data).map_err(|e| BagError::backend("write", path.display().to_string(), e))
    }

    fn close(&mut self) -> BagResult<()> {
        Ok(())
    }

    fn spec(&self) -> &ArchiveSpec {
        &self.spec
    }
}
