//! Bag configuration via `tidebag.toml`
//!
//! A small TOML file holding the defaults used to open write sessions, read
//! sessions and time synchronizers. Missing keys fall back to their defaults,
//! so an empty file is a valid configuration.

use crate::read_session::ReadSpec;
use crate::time_sync::TimeSyncSpec;
use crate::write_session::WriteSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tidebag_archive::{parse_format, ArchiveSpec, Format};
use tidebag_core::{BagError, BagResult, Encoding, Selection};

/// Config file name looked up next to a bag
pub const CONFIG_FILE_NAME: &str = "tidebag.toml";

/// Settings for approximate time synchronization, under `[time_sync]`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSyncConfig {
    /// Largest allowed spread within a bundle, in milliseconds (default: 0)
    #[serde(default)]
    pub max_slop_ms: u64,
    /// Entries buffered per topic (default: 1)
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,
}

fn default_max_queue_size() -> usize {
    1
}

impl Default for TimeSyncConfig {
    fn default() -> Self {
        Self {
            max_slop_ms: 0,
            max_queue_size: default_max_queue_size(),
        }
    }
}

/// Bag configuration loaded from `tidebag.toml`.
///
/// # Example
///
/// ```toml
/// format = "tar.zst"
/// encoding = "binary"
///
/// [time_sync]
/// max_slop_ms = 50
/// max_queue_size = 4
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BagConfig {
    /// Archive format; empty means infer from the path
    #[serde(default)]
    pub format: String,
    /// Maintain the time-series index when writing
    #[serde(default = "default_true")]
    pub timeseries_index: bool,
    /// Maintain the schema index when writing
    #[serde(default = "default_true")]
    pub schema_index: bool,
    /// Entry encoding: `"binary"` or `"text"`
    #[serde(default = "default_encoding_str")]
    pub encoding: String,
    /// Time synchronization defaults
    #[serde(default)]
    pub time_sync: TimeSyncConfig,
}

fn default_true() -> bool {
    true
}

fn default_encoding_str() -> String {
    "binary".to_string()
}

impl Default for BagConfig {
    fn default() -> Self {
        Self {
            format: String::new(),
            timeseries_index: true,
            schema_index: true,
            encoding: default_encoding_str(),
            time_sync: TimeSyncConfig::default(),
        }
    }
}

impl BagConfig {
    /// Parse the encoding string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string names no known encoding.
    pub fn encoding(&self) -> BagResult<Encoding> {
        self.encoding.parse().map_err(|e| {
            BagError::config(format!(
                "Invalid encoding '{}' in {}: {}",
                self.encoding, CONFIG_FILE_NAME, e
            ))
        })
    }

    /// Parse the format string; `None` means infer from the path.
    pub fn archive_format(&self) -> BagResult<Option<Format>> {
        parse_format(&self.format).map_err(|e| {
            BagError::config(format!(
                "Invalid format '{}' in {}: {}",
                self.format, CONFIG_FILE_NAME, e
            ))
        })
    }

    /// Check every field that has a restricted range
    pub fn validate(&self) -> BagResult<()> {
        self.encoding()?;
        self.archive_format()?;
        if self.time_sync.max_queue_size == 0 {
            return Err(BagError::config(format!(
                "time_sync.max_queue_size in {} must be positive",
                CONFIG_FILE_NAME
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Tidebag configuration
#
# Archive format: "directory", "memory", "zip", "tar", "tar.zst"
# Leave empty to infer from the path (existing directory, then extension).
format = ""

# Index maintained by write sessions (both default to true).
# The time-series index is needed for window and event selections.
timeseries_index = true
schema_index = true

# Entry encoding: "binary" (default) or "text" (JSON)
encoding = "binary"

[time_sync]
# Largest timestamp spread allowed within one bundle (default: 0)
max_slop_ms = 0
# Entries buffered per topic while searching for a match (default: 1)
max_queue_size = 1
"#
    }

    /// Load a config file, filling absent keys with defaults
    pub fn from_file(path: &Path) -> BagResult<Self> {
        let content = std::fs::read_to_string(path).map_err(config_error("read", path))?;
        let config: BagConfig = toml::from_str(&content).map_err(config_error("parse", path))?;
        config.validate()?;
        Ok(config)
    }

    /// Write [`BagConfig::default_toml`] to `path` unless a file is already there
    pub fn write_default_if_missing(path: &Path) -> BagResult<()> {
        if path.exists() {
            return Ok(());
        }
        std::fs::write(path, Self::default_toml()).map_err(config_error("write", path))
    }

    /// Save this config as TOML
    pub fn write_to_file(&self, path: &Path) -> BagResult<()> {
        let content = toml::to_string_pretty(self).map_err(config_error("serialize", path))?;
        std::fs::write(path, content).map_err(config_error("write", path))
    }

    fn archive(&self, spec: ArchiveSpec) -> BagResult<ArchiveSpec> {
        Ok(match self.archive_format()? {
            Some(format) => spec.with_format(format),
            None => spec,
        })
    }

    /// Write session settings for a bag at `path`
    pub fn write_spec(&self, path: &str) -> BagResult<WriteSpec> {
        Ok(WriteSpec::new(self.archive(ArchiveSpec::write(path))?)
            .with_timeseries_index(self.timeseries_index)
            .with_schema_index(self.schema_index)
            .with_encoding(self.encoding()?))
    }

    /// Read session settings for `selection` over the bag at `path`
    pub fn read_spec(&self, path: &str, selection: Selection) -> BagResult<ReadSpec> {
        Ok(ReadSpec::new(self.archive(ArchiveSpec::read(path))?, selection))
    }

    /// Time synchronization settings for `topics`
    pub fn time_sync_spec<I, S>(&self, topics: I) -> TimeSyncSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TimeSyncSpec::new(topics)
            .with_max_slop(Duration::from_millis(self.time_sync.max_slop_ms))
            .with_max_queue_size(self.time_sync.max_queue_size)
    }
}

fn config_error<'a, E: std::fmt::Display + 'a>(
    action: &'a str,
    path: &'a Path,
) -> impl FnOnce(E) -> BagError + 'a {
    move |e| BagError::config(format!("cannot {} {}: {}", action, path.display(), e))
}
