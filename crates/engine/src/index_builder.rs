//! Incremental construction of a [`BagIndex`]
//!
//! A write session offers every entry it writes to an [`IndexBuilder`].
//! Time-series rows are collected unordered and sorted once in
//! [`IndexBuilder::finish`], which consumes the builder.

use crate::schema::schema_closure;
use std::collections::btree_map::Entry as MapEntry;
use tidebag_core::{BagIndex, Entry, Timestamp, TopicTime};
use tracing::debug;

/// Which parts of the index to maintain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Topic statistics, time order and start/end
    pub timeseries: bool,
    /// Schema closures and entry name to type URL pins
    pub schemas: bool,
}

impl Default for IndexOptions {
    fn default() -> Self {
        IndexOptions {
            timeseries: true,
            schemas: true,
        }
    }
}

impl IndexOptions {
    /// True if neither part is maintained
    pub fn is_disabled(&self) -> bool {
        !self.timeseries && !self.schemas
    }
}

/// Aggregates observed entries into a [`BagIndex`]
#[derive(Debug)]
pub struct IndexBuilder {
    options: IndexOptions,
    index: BagIndex,
    rows: Vec<TopicTime>,
}

impl IndexBuilder {
    /// An empty builder
    pub fn new(options: IndexOptions) -> Self {
        IndexBuilder {
            options,
            index: BagIndex::empty(),
            rows: Vec::new(),
        }
    }

    /// Options this builder was created with
    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// Number of time-series rows observed so far
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Record `entry`, which was written under `entryname`
    ///
    /// Raw entries are ignored.
    pub fn observe(&mut self, entry: &Entry, entryname: &str) {
        if entry.is_raw() {
            return;
        }
        if self.options.timeseries {
            self.observe_time(entry, entryname);
        }
        if self.options.schemas {
            self.observe_schema(entry, entryname);
        }
    }

    fn observe_time(&mut self, entry: &Entry, entryname: &str) {
        let Some(tt) = entry.topic_time() else {
            return;
        };
        self.index
            .topic_stats
            .entry(tt.topic.clone())
            .or_default()
            .message_count += 1;
        self.widen(tt.timestamp);
        self.rows
            .push(TopicTime::new(tt.topic, tt.timestamp, entryname));
    }

    fn widen(&mut self, t: Timestamp) {
        self.index.start = self.index.start.min(t);
        self.index.end = self.index.end.max(t);
    }

    fn observe_schema(&mut self, entry: &Entry, entryname: &str) {
        let ctx = entry.context.as_ref();
        let type_url = match ctx {
            Some(c) if !c.inner_type_url.is_empty() => c.inner_type_url.clone(),
            _ => entry.type_url().to_string(),
        };

        let pool = &mut self.index.schema_pool;
        pool.entryname_to_type_url
            .insert(entryname.to_string(), type_url.clone());

        let Some(descriptor) = ctx.and_then(|c| c.descriptor.as_ref()) else {
            return;
        };
        if let MapEntry::Vacant(slot) = pool.type_url_to_schema.entry(type_url) {
            let closure = schema_closure(&descriptor.parent_file());
            debug!(
                type_url = %slot.key(),
                files = closure.file.len(),
                "Indexed schema closure"
            );
            slot.insert(closure);
        }
    }

    /// Sort the time-series rows and return the finished index
    pub fn finish(self) -> BagIndex {
        let IndexBuilder {
            mut index,
            mut rows,
            ..
        } = self;
        rows.sort();
        index.time_ordered_entries = rows;
        index
    }
}
