//! Approximate time alignment across topics
//!
//! [`TimeSync`] pulls entries from an [`EntrySource`], keeps a bounded buffer
//! per topic and emits a bundle (one entry per topic, in topic order) whenever
//! some choice of one entry per buffer spans at most `max_slop`. Entries still
//! buffered when the source runs dry are dropped.

use crate::products::IterProducts;
use crate::read_session::{EntrySource, ReadSession};
use std::time::Duration;
use tidebag_archive::{open_archive, ArchiveSpec, Mode};
use tidebag_core::{BagError, BagResult, Entry, Selection, Timestamp};
use tracing::debug;

/// Topics to align and the alignment tolerances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSyncSpec {
    /// One entry of each topic per bundle, in this order
    pub topics: Vec<String>,
    /// Largest allowed spread between timestamps within a bundle
    pub max_slop: Duration,
    /// Buffer capacity per topic; the oldest entry is evicted on overflow
    pub max_queue_size: usize,
}

impl TimeSyncSpec {
    /// Exact alignment with one buffered entry per topic
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TimeSyncSpec {
            topics: topics.into_iter().map(Into::into).collect(),
            max_slop: Duration::ZERO,
            max_queue_size: 1,
        }
    }

    /// Set the allowed spread
    pub fn with_max_slop(mut self, max_slop: Duration) -> Self {
        self.max_slop = max_slop;
        self
    }

    /// Set the per-topic buffer capacity
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Reject empty or duplicated topic lists and zero-sized buffers
    pub fn validate(&self) -> BagResult<()> {
        if self.topics.is_empty() {
            return Err(BagError::invalid_argument("time sync needs at least one topic"));
        }
        for (i, topic) in self.topics.iter().enumerate() {
            if self.topics[..i].contains(topic) {
                return Err(BagError::invalid_argument(format!(
                    "time sync topic {} listed twice",
                    topic
                )));
            }
        }
        if self.max_queue_size == 0 {
            return Err(BagError::invalid_argument("max_queue_size must be positive"));
        }
        Ok(())
    }
}

/// Bundles of time-aligned entries drawn from a source
pub struct TimeSync<S> {
    source: S,
    spec: TimeSyncSpec,
    /// Per topic, sorted by timestamp
    buffers: Vec<Vec<(Timestamp, Entry)>>,
    done: bool,
}

impl TimeSync<ReadSession> {
    /// Align the topics of the bag at `archive`, read through a time window
    pub fn over_bag(archive: ArchiveSpec, spec: TimeSyncSpec) -> BagResult<Self> {
        spec.validate()?;
        let selection = Selection::window().with_topics(spec.topics.iter().cloned());
        let archive = open_archive(archive.with_mode(Mode::Read))?;
        Self::new(ReadSession::with_archive(archive, selection), spec)
    }
}

impl<S: EntrySource> TimeSync<S> {
    /// Align entries from `source`
    pub fn new(source: S, spec: TimeSyncSpec) -> BagResult<Self> {
        spec.validate()?;
        let buffers = spec.topics.iter().map(|_| Vec::new()).collect();
        Ok(TimeSync {
            source,
            spec,
            buffers,
            done: false,
        })
    }

    /// The alignment settings
    pub fn spec(&self) -> &TimeSyncSpec {
        &self.spec
    }

    /// The next bundle, or `Ok(None)` once the source is exhausted
    pub fn next_bundle(&mut self) -> BagResult<Option<Vec<Entry>>> {
        if self.done {
            return Ok(None);
        }
        while let Some(entry) = self.source.next_entry()? {
            if !self.push(entry) {
                continue;
            }
            if let Some(bundle) = self.try_emit() {
                return Ok(Some(bundle));
            }
        }

        let dropped: usize = self.buffers.iter().map(Vec::len).sum();
        if dropped > 0 {
            debug!(dropped, "Discarding unmatched buffered entries");
        }
        self.buffers.iter_mut().for_each(Vec::clear);
        self.done = true;
        Ok(None)
    }

    /// Buffer `entry` if it is timestamped and on a wanted topic
    fn push(&mut self, entry: Entry) -> bool {
        let Some(timestamp) = entry.timestamp() else {
            return false;
        };
        let Some(slot) = self.spec.topics.iter().position(|t| t == entry.topic()) else {
            return false;
        };
        let buffer = &mut self.buffers[slot];
        if buffer.len() >= self.spec.max_queue_size {
            buffer.remove(0);
        }
        let at = buffer.partition_point(|(t, _)| *t <= timestamp);
        buffer.insert(at, (timestamp, entry));
        true
    }

    fn try_emit(&mut self) -> Option<Vec<Entry>> {
        if self.buffers.iter().any(Vec::is_empty) {
            return None;
        }
        let sizes = self.buffers.iter().map(Vec::len).collect();
        let mut best: Option<(Duration, Vec<usize>)> = None;
        for choice in IterProducts::new(sizes) {
            let spread = self.spread(&choice);
            if best.as_ref().map_or(true, |(b, _)| spread < *b) {
                best = Some((spread, choice));
            }
        }
        let (spread, choice) = best?;
        if spread > self.spec.max_slop {
            return None;
        }
        debug!(spread_ns = spread.as_nanos() as u64, "Emitting synchronized bundle");
        Some(
            self.buffers
                .iter_mut()
                .zip(choice)
                .map(|(buffer, i)| buffer.remove(i).1)
                .collect(),
        )
    }

    fn spread(&self, choice: &[usize]) -> Duration {
        let mut times = self.buffers.iter().zip(choice).map(|(b, &i)| b[i].0);
        let Some(first) = times.next() else {
            return Duration::ZERO;
        };
        let (lo, hi) = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        hi.abs_diff(&lo)
    }
}

impl<S: EntrySource> Iterator for TimeSync<S> {
    type Item = BagResult<Vec<Entry>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_bundle().transpose()
    }
}
