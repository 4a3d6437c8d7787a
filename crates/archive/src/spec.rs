//! Archive construction parameters and the backend factory

use crate::directory::DirectoryArchive;
use crate::memory::MemoryArchive;
use crate::tarball::TarArchive;
use crate::temp;
use crate::zipfile::ZipArchive;
use crate::Archive;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tidebag_core::{BagError, BagResult};
use tracing::debug;

/// Whether an archive is opened for reading or writing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Read existing entries
    Read,
    /// Add entries
    Write,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Read => write!(f, "read"),
            Mode::Write => write!(f, "write"),
        }
    }
}

impl FromStr for Mode {
    type Err = BagError;

    fn from_str(s: &str) -> BagResult<Self> {
        match s {
            "read" | "r" => Ok(Mode::Read),
            "write" | "w" => Ok(Mode::Write),
            other => Err(BagError::invalid_argument(format!(
                "unknown archive mode '{}'",
                other
            ))),
        }
    }
}

/// Storage backend of an archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// A filesystem tree
    Directory,
    /// An in-process map; the path is ignored
    Memory,
    /// A zip file
    Zip,
    /// An uncompressed tar file
    Tar,
    /// A zstd-compressed tar file
    TarZstd,
}

impl Format {
    /// Backend implied by a path: an existing directory, then the file extension
    ///
    /// Paths with no recognized extension are treated as directories.
    pub fn infer(path: &str) -> Format {
        if Path::new(path).is_dir() {
            return Format::Directory;
        }
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Format::Zip
        } else if lower.ends_with(".tar.zst") || lower.ends_with(".tzst") {
            Format::TarZstd
        } else if lower.ends_with(".tar") {
            Format::Tar
        } else {
            Format::Directory
        }
    }

    /// File suffix used when allocating a temporary archive of this format
    pub fn temp_suffix(&self) -> &'static str {
        match self {
            Format::Directory | Format::Memory => "",
            Format::Zip => ".zip",
            Format::Tar => ".tar",
            Format::TarZstd => ".tar.zst",
        }
    }

    /// Name accepted by [`Format::from_str`]
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Directory => "directory",
            Format::Memory => "memory",
            Format::Zip => "zip",
            Format::Tar => "tar",
            Format::TarZstd => "tar.zst",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = BagError;

    fn from_str(s: &str) -> BagResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "directory" | "dir" => Ok(Format::Directory),
            "memory" => Ok(Format::Memory),
            "zip" => Ok(Format::Zip),
            "tar" => Ok(Format::Tar),
            "tar.zst" | "tzst" | "tar_zstd" => Ok(Format::TarZstd),
            other => Err(BagError::invalid_argument(format!(
                "unsupported archive format '{}'",
                other
            ))),
        }
    }
}

/// Parse a format string where `""` means "infer from the path"
pub fn parse_format(s: &str) -> BagResult<Option<Format>> {
    if s.is_empty() {
        Ok(None)
    } else {
        s.parse().map(Some)
    }
}

/// How to open an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSpec {
    /// Read or write
    pub mode: Mode,
    /// Filesystem path, or [`temp::TEMP_PLACEHOLDER`] for a fresh temp path
    pub path: String,
    /// Backend; inferred from `path` when `None`
    pub format: Option<Format>,
}

impl ArchiveSpec {
    /// Open `path` for reading, inferring the format
    pub fn read(path: impl Into<String>) -> Self {
        ArchiveSpec {
            mode: Mode::Read,
            path: path.into(),
            format: None,
        }
    }

    /// Open `path` for writing, inferring the format
    pub fn write(path: impl Into<String>) -> Self {
        ArchiveSpec {
            mode: Mode::Write,
            path: path.into(),
            format: None,
        }
    }

    /// Write to a freshly allocated temp path
    pub fn write_temp(format: Format) -> Self {
        ArchiveSpec::write(temp::TEMP_PLACEHOLDER).with_format(format)
    }

    /// An empty in-memory archive
    pub fn memory() -> Self {
        ArchiveSpec::write(String::new()).with_format(Format::Memory)
    }

    /// Force a backend
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Same path and format, other mode
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Pin the format and replace a placeholder path by a real temp path
    pub fn resolve(self) -> BagResult<ArchiveSpec> {
        let placeholder = temp::is_placeholder(&self.path);
        let format = match self.format {
            Some(format) => format,
            None if placeholder => Format::Directory,
            None => Format::infer(&self.path),
        };

        if !placeholder || format == Format::Memory {
            return Ok(ArchiveSpec {
                format: Some(format),
                ..self
            });
        }

        if self.mode != Mode::Write {
            return Err(BagError::invalid_argument(
                "a temp path can only be allocated for writing",
            ));
        }
        let path = match format {
            Format::Directory => temp::temp_dir()?,
            other => temp::temp_file(other.temp_suffix())?,
        };
        debug!(path = %path.display(), format = %format, "Allocated temp archive path");
        Ok(ArchiveSpec {
            mode: self.mode,
            path: path.to_string_lossy().into_owned(),
            format: Some(format),
        })
    }
}

impl fmt::Display for ArchiveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            Some(Format::Memory) => write!(f, "memory archive ({})", self.mode),
            Some(format) => write!(f, "{} archive at {} ({})", format, self.path, self.mode),
            None => write!(f, "archive at {} ({})", self.path, self.mode),
        }
    }
}

/// Open the backend selected by `spec`
pub fn open_archive(spec: ArchiveSpec) -> BagResult<Box<dyn Archive>> {
    let spec = spec.resolve()?;
    debug!(archive = %spec, "Opening archive");
    let archive: Box<dyn Archive> = match spec.format {
        Some(Format::Memory) => Box::new(MemoryArchive::with_spec(spec)),
        Some(Format::Zip) => Box::new(ZipArchive::open(spec)?),
        Some(Format::Tar) | Some(Format::TarZstd) => Box::new(TarArchive::open(spec)?),
        Some(Format::Directory) | None => Box::new(DirectoryArchive::open(spec)?),
    };
    Ok(archive)
}
