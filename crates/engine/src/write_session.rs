//! Writing entries into a bag
//!
//! A [`WriteSession`] serializes entries into its archive and feeds them to
//! an [`IndexBuilder`]. Closing the session writes the finished index as a
//! stamped entry under [`INDEX_TOPIC`]. Dropping an open session closes it.

use crate::index_builder::{IndexBuilder, IndexOptions};
use tidebag_archive::{open_archive, Archive, ArchiveSpec, Mode};
use tidebag_core::{
    canonical_entryname, encode_envelope, is_reserved_topic, stamped_entryname, BagError,
    BagResult, Encoding, Entry, Timestamp, INDEX_TOPIC,
};
use tracing::{debug, info, warn};

/// How to open a write session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSpec {
    /// Archive to write into; opened in write mode
    pub archive: ArchiveSpec,
    /// Maintain topic statistics and the time-ordered entry list
    pub timeseries_index: bool,
    /// Maintain schema closures
    pub schema_index: bool,
    /// Default encoding for [`WriteSession::write_entry`]
    pub encoding: Encoding,
}

impl WriteSpec {
    /// Write to `archive` with both indexes and binary encoding
    pub fn new(archive: ArchiveSpec) -> Self {
        WriteSpec {
            archive,
            timeseries_index: true,
            schema_index: true,
            encoding: Encoding::Binary,
        }
    }

    /// Toggle the time-series index
    pub fn with_timeseries_index(mut self, enabled: bool) -> Self {
        self.timeseries_index = enabled;
        self
    }

    /// Toggle the schema index
    pub fn with_schema_index(mut self, enabled: bool) -> Self {
        self.schema_index = enabled;
        self
    }

    /// Set the default encoding
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Index options implied by the two toggles
    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            timeseries: self.timeseries_index,
            schemas: self.schema_index,
        }
    }
}

/// An open bag being written
pub struct WriteSession {
    archive: Box<dyn Archive>,
    builder: Option<IndexBuilder>,
    encoding: Encoding,
    written: u64,
    closed: bool,
}

impl WriteSession {
    /// Open the archive named by `spec` and start a session
    pub fn create(spec: WriteSpec) -> BagResult<Self> {
        if spec.archive.mode != Mode::Write {
            return Err(BagError::invalid_argument(format!(
                "write session needs a write-mode archive, got {}",
                spec.archive
            )));
        }
        let archive = open_archive(spec.archive.clone())?;
        Ok(Self::with_archive(archive, spec.index_options(), spec.encoding))
    }

    /// Start a session over an already open archive
    pub fn with_archive(archive: Box<dyn Archive>, index: IndexOptions, encoding: Encoding) -> Self {
        info!(
            archive = %archive.describe(),
            timeseries_index = index.timeseries,
            schema_index = index.schemas,
            "Opened write session"
        );
        let builder = if index.is_disabled() {
            None
        } else {
            Some(IndexBuilder::new(index))
        };
        WriteSession {
            archive,
            builder,
            encoding,
            written: 0,
            closed: false,
        }
    }

    /// Resolved spec of the underlying archive
    ///
    /// Useful to find the path picked for a temp archive.
    pub fn archive_spec(&self) -> &ArchiveSpec {
        self.archive.spec()
    }

    /// Number of entries written so far, not counting the index
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write `entry` with the session's default encoding
    ///
    /// Returns the entry name the entry was stored under.
    pub fn write_entry(&mut self, entry: &Entry) -> BagResult<String> {
        self.write_entry_encoded(entry, self.encoding)
    }

    /// Write `entry` with an explicit encoding
    pub fn write_entry_encoded(&mut self, entry: &Entry, encoding: Encoding) -> BagResult<String> {
        let entryname = resolve_entryname(entry, encoding)?;
        if is_reserved_topic(&entryname) {
            return Err(BagError::invalid_argument(format!(
                "entry name {} is in the reserved index namespace",
                entryname
            )));
        }
        self.put(entry, &entryname, encoding)?;
        if let Some(builder) = self.builder.as_mut() {
            builder.observe(entry, &entryname);
        }
        self.written += 1;
        Ok(entryname)
    }

    fn put(&mut self, entry: &Entry, entryname: &str, encoding: Encoding) -> BagResult<()> {
        if self.closed {
            return Err(BagError::invalid_argument(format!(
                "write session on {} is closed",
                self.archive.describe()
            )));
        }
        let bytes = if entry.is_raw() {
            entry.payload.value.clone()
        } else {
            encode_envelope(&entry.payload, encoding)?
        };
        debug!(entryname, bytes = bytes.len(), "Writing entry");
        self.archive.write(entryname, &bytes)
    }

    /// Write the index (if any) and close the archive; idempotent
    pub fn close(&mut self) -> BagResult<()> {
        if self.closed {
            return Ok(());
        }
        let index_result = match self.builder.take() {
            Some(builder) => self.write_index(builder),
            None => Ok(()),
        };
        let close_result = self.archive.close();
        self.closed = true;
        info!(
            archive = %self.archive.describe(),
            entries = self.written,
            "Closed write session"
        );
        index_result.and(close_result)
    }

    fn write_index(&mut self, builder: IndexBuilder) -> BagResult<()> {
        let index = builder.finish();
        let entry = Entry::stamped_named(INDEX_TOPIC, Timestamp::now(), &index);
        let entryname = resolve_entryname(&entry, self.encoding)?;
        self.put(&entry, &entryname, self.encoding)?;
        info!(
            entryname = %entryname,
            topics = index.topic_stats.len(),
            rows = index.time_ordered_entries.len(),
            schemas = index.schema_pool.type_url_to_schema.len(),
            "Wrote bag index"
        );
        Ok(())
    }
}

impl Drop for WriteSession {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Failed to close write session");
        }
    }
}

/// The name `entry` is stored under
///
/// An explicit entry name wins; otherwise the name is derived from topic and
/// timestamp. A topic without a timestamp is rejected either way.
pub fn resolve_entryname(entry: &Entry, encoding: Encoding) -> BagResult<String> {
    let ctx = entry.context.as_ref();
    let topic = ctx.map_or("", |c| c.topic.as_str());
    let timestamp = ctx.and_then(|c| c.timestamp);

    if !topic.is_empty() && timestamp.is_none() {
        return Err(BagError::invalid_argument(format!(
            "entry on topic {} has no timestamp",
            topic
        )));
    }
    if !entry.entryname.is_empty() {
        return Ok(canonical_entryname(&entry.entryname));
    }
    match timestamp {
        Some(t) if !topic.is_empty() => Ok(stamped_entryname(topic, &t, encoding)),
        _ => Err(BagError::invalid_argument(
            "entry needs an entryname or a topic",
        )),
    }
}
