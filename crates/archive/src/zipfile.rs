//! Zip backend
//!
//! Reads walk local file headers front to back with
//! `zip::read::read_zipfile_from_stream`, so the central directory is never
//! consulted and each read costs one pass over the file.

use crate::spec::{ArchiveSpec, Format, Mode};
use crate::{check_entryname, require_mode, Archive};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tidebag_core::{canonical_entryname, BagError, BagResult};
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// An archive backed by a `.zip` file
pub struct ZipArchive {
    spec: ArchiveSpec,
    writer: Option<ZipWriter<BufWriter<File>>>,
}

impl ZipArchive {
    /// Open the file named by `spec.path`
    ///
    /// Write mode truncates the file; read mode requires it to exist.
    pub fn open(spec: ArchiveSpec) -> BagResult<Self> {
        let spec = ArchiveSpec {
            format: Some(Format::Zip),
            ..spec
        };
        let writer = match spec.mode {
            Mode::Write => {
                let path = Path::new(&spec.path);
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        fs::create_dir_all(parent)
                            .map_err(|e| BagError::backend("open", &spec.path, e))?;
                    }
                }
                let file =
                    File::create(path).map_err(|e| BagError::backend("open", &spec.path, e))?;
                Some(ZipWriter::new(BufWriter::new(file)))
            }
            Mode::Read => {
                if !Path::new(&spec.path).is_file() {
                    return Err(BagError::backend("open", &spec.path, "no such file"));
                }
                None
            }
        };
        info!(archive = %spec, "Opened zip archive");
        Ok(ZipArchive { spec, writer })
    }

    /// Walk file entries until `visit` returns `Some`
    fn scan<T, F>(&self, operation: &str, mut visit: F) -> BagResult<Option<T>>
    where
        F: FnMut(&str, &mut dyn Read) -> BagResult<Option<T>>,
    {
        let file = File::open(&self.spec.path)
            .map_err(|e| BagError::backend(operation, &self.spec.path, e))?;
        let mut reader = BufReader::new(file);
        loop {
            let next = zip::read::read_zipfile_from_stream(&mut reader)
                .map_err(|e| BagError::backend(operation, &self.spec.path, e))?;
            let mut entry = match next {
                Some(entry) => entry,
                None => return Ok(None),
            };
            if entry.is_dir() {
                continue;
            }
            let name = canonical_entryname(entry.name());
            if let Some(found) = visit(&name, &mut entry)? {
                return Ok(Some(found));
            }
            // skip the rest of the body before the next header
            io::copy(&mut entry, &mut io::sink())
                .map_err(|e| BagError::backend(operation, &self.spec.path, e))?;
        }
    }
}

impl Archive for ZipArchive {
    fn list(&self) -> BagResult<Vec<String>> {
        require_mode(&self.spec, Mode::Read, "list")?;
        let mut names = Vec::new();
        self.scan::<(), _>("list", |name, _| {
            names.push(name.to_string());
            Ok(None)
        })?;
        Ok(names)
    }

    fn read(&self, entryname: &str) -> BagResult<Vec<u8>> {
        require_mode(&self.spec, Mode::Read, "read from")?;
        let target = canonical_entryname(check_entryname(entryname)?);
        debug!(entryname = %target, archive = %self.spec.path, "Scanning zip for entry");
        let found = self.scan("read", |name, body| {
            if name != target {
                return Ok(None);
            }
            let mut data = Vec::new();
            body.read_to_end(&mut data)
                .map_err(|e| BagError::backend("read", &target, e))?;
            Ok(Some(data))
        })?;
        found.ok_or_else(|| BagError::not_found(target))
    }

    fn write(&mut self, entryname: &str, data: &[u8]) -> BagResult<()> {
        require_mode(&self.spec, Mode::Write, "write to")?;
        let path = check_entryname(entryname)?;
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| BagError::invalid_argument(format!("{} is closed", self.spec)))?;

        let options = FileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);
        writer
            .start_file(path, options)
            .map_err(|e| BagError::backend("write", entryname, e))?;
        writer
            .write_all(data)
            .map_err(|e| BagError::backend("write", entryname, e))?;
        debug!(entryname, bytes = data.len(), "Appended zip entry");
        Ok(())
    }

    fn close(&mut self) -> BagResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let mut inner = writer
                .finish()
                .map_err(|e| BagError::backend("close", &self.spec.path, e))?;
            inner
                .flush()
                .map_err(|e| BagError::backend("close", &self.spec.path, e))?;
            info!(archive = %self.spec, "Closed zip archive");
        }
        Ok(())
    }

    fn spec(&self) -> &ArchiveSpec {
        &self.spec
    }
}

impl Drop for ZipArchive {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(archive = %self.spec, error = %e, "Failed to close zip archive");
        }
    }
}
