//! Tar backend, plain or zstd-compressed
//!
//! Write mode owns a single `tar::Builder` over a buffered file, optionally
//! wrapped in a zstd encoder. Read mode keeps no state: every call reopens the
//! file and walks the headers from the start, skipping bodies of entries that
//! do not match.

use crate::spec::{ArchiveSpec, Format, Mode};
use crate::{check_entryname, require_mode, Archive};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tar::{Builder, EntryType, Header};
use tidebag_core::{canonical_entryname, BagError, BagResult};
use tracing::{debug, info, warn};

const ZSTD_LEVEL: i32 = 3;

/// Output stream under the tar builder
enum TarSink {
    Plain(BufWriter<File>),
    Zstd(zstd::Encoder<'static, BufWriter<File>>),
}

impl TarSink {
    fn finish(self) -> io::Result<()> {
        match self {
            TarSink::Plain(mut w) => w.flush(),
            TarSink::Zstd(encoder) => {
                let mut w = encoder.finish()?;
                w.flush()
            }
        }
    }
}

impl Write for TarSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            TarSink::Plain(w) => w.write(buf),
            TarSink::Zstd(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            TarSink::Plain(w) => w.flush(),
            TarSink::Zstd(w) => w.flush(),
        }
    }
}

/// An archive backed by a `.tar` or `.tar.zst` file
pub struct TarArchive {
    spec: ArchiveSpec,
    compressed: bool,
    builder: Option<Builder<TarSink>>,
}

impl TarArchive {
    /// Open the file named by `spec.path`
    ///
    /// Write mode truncates the file; read mode requires it to exist.
    pub fn open(spec: ArchiveSpec) -> BagResult<Self> {
        let compressed = match spec.format {
            Some(Format::TarZstd) => true,
            Some(Format::Tar) | None => false,
            Some(other) => {
                return Err(BagError::invalid_argument(format!(
                    "tar backend cannot open format {}",
                    other
                )))
            }
        };
        let format = if compressed { Format::TarZstd } else { Format::Tar };
        let spec = ArchiveSpec {
            format: Some(format),
            ..spec
        };

        let builder = match spec.mode {
            Mode::Write => Some(Builder::new(Self::create_sink(&spec.path, compressed)?)),
            Mode::Read => {
                if !Path::new(&spec.path).is_file() {
                    return Err(BagError::backend("open", &spec.path, "no such file"));
                }
                None
            }
        };
        info!(archive = %spec, "Opened tar archive");
        Ok(TarArchive {
            spec,
            compressed,
            builder,
        })
    }

    fn create_sink(path: &str, compressed: bool) -> BagResult<TarSink> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| BagError::backend("open", path, e))?;
            }
        }
        let file = File::create(path).map_err(|e| BagError::backend("open", path, e))?;
        let writer = BufWriter::new(file);
        if compressed {
            let encoder = zstd::Encoder::new(writer, ZSTD_LEVEL)
                .map_err(|e| BagError::backend("open", path, format!("zstd encoder: {}", e)))?;
            Ok(TarSink::Zstd(encoder))
        } else {
            Ok(TarSink::Plain(writer))
        }
    }

    fn open_reader(&self) -> BagResult<Box<dyn Read>> {
        let file = File::open(&self.spec.path)
            .map_err(|e| BagError::backend("read", &self.spec.path, e))?;
        let reader = BufReader::new(file);
        if self.compressed {
            let decoder = zstd::Decoder::new(reader).map_err(|e| {
                BagError::backend("read", &self.spec.path, format!("zstd decode: {}", e))
            })?;
            Ok(Box::new(decoder))
        } else {
            Ok(Box::new(reader))
        }
    }

    /// Walk regular-file entries until `visit` returns `Some`
    fn scan<T, F>(&self, operation: &str, mut visit: F) -> BagResult<Option<T>>
    where
        F: FnMut(&str, &mut dyn Read) -> BagResult<Option<T>>,
    {
        let backend_err = |e: io::Error| BagError::backend(operation, &self.spec.path, e);

        let mut archive = tar::Archive::new(self.open_reader()?);
        for entry in archive.entries().map_err(backend_err)? {
            let mut entry = entry.map_err(backend_err)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let name = canonical_entryname(&entry.path().map_err(backend_err)?.to_string_lossy());
            if let Some(found) = visit(&name, &mut entry)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl Archive for TarArchive {
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
        debug!(entryname = %target, archive = %self.spec.path, "Scanning tar for entry");
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
        let builder = self
            .builder
            .as_mut()
            .ok_or_else(|| BagError::invalid_argument(format!("{} is closed", self.spec)))?;

        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        builder
            .append_data(&mut header, path, data)
            .map_err(|e| BagError::backend("write", entryname, e))?;
        debug!(entryname, bytes = data.len(), "Appended tar entry");
        Ok(())
    }

    fn close(&mut self) -> BagResult<()> {
        if let Some(builder) = self.builder.take() {
            let sink = builder
                .into_inner()
                .map_err(|e| BagError::backend("close", &self.spec.path, e))?;
            sink.finish()
                .map_err(|e| BagError::backend("close", &self.spec.path, e))?;
            info!(archive = %self.spec, "Closed tar archive");
        }
        Ok(())
    }

    fn spec(&self) -> &ArchiveSpec {
        &self.spec
    }
}

impl Drop for TarArchive {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(archive = %self.spec, error = %e, "Failed to close tar archive");
        }
    }
}
