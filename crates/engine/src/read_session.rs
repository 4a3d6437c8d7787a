//! Reading entries back out of a bag
//!
//! A [`ReadSession`] is lazy. The first call to [`ReadSession::next_entry`]
//! lists the archive, loads the latest index snapshot and turns the
//! [`Selection`] into a [`ReadPlan`]; later calls pop one entry name at a time.

use std::collections::{HashMap, HashSet, VecDeque};

use tidebag_archive::{open_archive, Archive, ArchiveSpec, Mode};
use tidebag_core::{
    canonical_entryname, decode_envelope, topic_from_entryname, BagError, BagIndex, BagResult,
    Entry, Selection, SelectionMsg, Timestamp, INDEX_TOPIC,
};
use tracing::{debug, info, warn};

/// How to open a read session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadSpec {
    /// Archive to read from; opened in read mode
    pub archive: ArchiveSpec,
    /// Which entries to produce
    pub selection: Selection,
    /// Return stamped entries unwrapped with their context
    pub unpack_stamped: bool,
}

impl ReadSpec {
    /// Read `selection` from `archive`, unpacking stamped entries
    pub fn new(archive: ArchiveSpec, selection: Selection) -> Self {
        ReadSpec {
            archive,
            selection,
            unpack_stamped: true,
        }
    }

    /// Build a spec from the wire form of a selection
    pub fn from_message(archive: ArchiveSpec, selection: SelectionMsg) -> BagResult<Self> {
        Ok(Self::new(archive, Selection::try_from(selection)?))
    }

    /// Toggle unpacking of stamped entries
    pub fn with_unpack_stamped(mut self, unpack: bool) -> Self {
        self.unpack_stamped = unpack;
        self
    }
}

/// Entry names to read, in order, and how to treat them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPlan {
    /// Names still to be read
    pub queue: VecDeque<String>,
    /// A missing entry is an error rather than skipped
    pub require_all: bool,
    /// Return bytes untouched instead of decoding
    pub raw: bool,
}

impl ReadPlan {
    /// Plan `selection` against an archive listing and its index
    ///
    /// `archive` only names the archive in errors. Event selections fail with
    /// [`BagError::UnmatchedEvents`] before anything is read when an event is
    /// required but absent from the index.
    pub fn for_selection(
        selection: &Selection,
        names: &[String],
        index: Option<&BagIndex>,
        archive: &str,
    ) -> BagResult<Self> {
        let require_index = || {
            index.ok_or_else(|| BagError::MissingIndex {
                archive: archive.to_string(),
            })
        };

        match selection {
            Selection::All { raw } => Ok(ReadPlan {
                queue: names.iter().cloned().collect(),
                require_all: false,
                raw: *raw,
            }),
            Selection::Names {
                names,
                ignore_missing,
                raw,
            } => Ok(ReadPlan {
                queue: names.iter().map(|n| canonical_entryname(n)).collect(),
                require_all: !ignore_missing,
                raw: *raw,
            }),
            Selection::Events {
                events,
                require_all,
            } => {
                let index = require_index()?;
                let wanted: HashSet<(&str, Timestamp)> = events.iter().map(|e| e.key()).collect();
                let mut found = HashSet::new();
                let mut queue = VecDeque::new();
                for row in &index.time_ordered_entries {
                    if wanted.contains(&row.key()) {
                        found.insert(row.key());
                        queue.push_back(row.entryname.clone());
                    }
                }

                let mut reported = HashSet::new();
                let unmatched: Vec<String> = events
                    .iter()
                    .filter(|e| !found.contains(&e.key()) && reported.insert(e.key()))
                    .map(|e| format!("{}@{}", e.topic, e.timestamp))
                    .collect();
                if !unmatched.is_empty() {
                    if *require_all {
                        return Err(BagError::UnmatchedEvents { events: unmatched });
                    }
                    debug!(missing = unmatched.len(), "Some selected events are not in the index");
                }
                Ok(ReadPlan {
                    queue,
                    require_all: *require_all,
                    raw: false,
                })
            }
            Selection::Window {
                include_topics,
                exclude_topics,
                start,
                end,
            } => {
                let index = require_index()?;
                let queue = index
                    .time_ordered_entries
                    .iter()
                    .filter(|row| !exclude_topics.contains(&row.topic))
                    .filter(|row| include_topics.is_empty() || include_topics.contains(&row.topic))
                    .filter(|row| start.map_or(true, |s| row.timestamp >= s))
                    .filter(|row| end.map_or(true, |e| row.timestamp <= e))
                    .map(|row| row.entryname.clone())
                    .collect();
                Ok(ReadPlan {
                    queue,
                    require_all: false,
                    raw: false,
                })
            }
        }
    }

    /// Number of names left to read
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True if nothing is left to read
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Anything that yields entries one at a time
pub trait EntrySource {
    /// The next entry, or `Ok(None)` once exhausted
    fn next_entry(&mut self) -> BagResult<Option<Entry>>;
}

impl<S: EntrySource + ?Sized> EntrySource for &mut S {
    fn next_entry(&mut self) -> BagResult<Option<Entry>> {
        (**self).next_entry()
    }
}

/// Adapts an iterator of entries into an [`EntrySource`]
#[derive(Debug, Clone)]
pub struct IterSource<I>(pub I);

impl<I: Iterator<Item = Entry>> EntrySource for IterSource<I> {
    fn next_entry(&mut self) -> BagResult<Option<Entry>> {
        Ok(self.0.next())
    }
}

struct ReadState {
    plan: ReadPlan,
    index: Option<BagIndex>,
    topics: HashMap<String, String>,
}

impl ReadState {
    fn exhausted() -> Self {
        ReadState {
            plan: ReadPlan::default(),
            index: None,
            topics: HashMap::new(),
        }
    }
}

/// An open bag being read
pub struct ReadSession {
    archive: Box<dyn Archive>,
    selection: Selection,
    unpack_stamped: bool,
    state: Option<ReadState>,
}

impl ReadSession {
    /// Open the archive named by `spec` in read mode
    pub fn create(spec: ReadSpec) -> BagResult<Self> {
        let archive = open_archive(spec.archive.with_mode(Mode::Read))?;
        Ok(Self::with_archive(archive, spec.selection).unpacking_stamped(spec.unpack_stamped))
    }

    /// Read `selection` from an already open archive
    pub fn with_archive(archive: Box<dyn Archive>, selection: Selection) -> Self {
        info!(archive = %archive.describe(), ?selection, "Opened read session");
        ReadSession {
            archive,
            selection,
            unpack_stamped: true,
            state: None,
        }
    }

    /// Toggle unpacking of stamped entries
    pub fn unpacking_stamped(mut self, unpack: bool) -> Self {
        self.unpack_stamped = unpack;
        self
    }

    /// The index the plan was built from; `None` before the first read or if
    /// the bag has none
    pub fn index(&self) -> Option<&BagIndex> {
        self.state.as_ref().and_then(|s| s.index.as_ref())
    }

    /// The latest index of the bag at `spec`
    pub fn read_index(spec: ArchiveSpec) -> BagResult<BagIndex> {
        let archive = open_archive(spec.with_mode(Mode::Read))?;
        let names = archive.list()?;
        latest_index(archive.as_ref(), &names).ok_or_else(|| BagError::MissingIndex {
            archive: archive.describe(),
        })
    }

    fn plan(&self) -> BagResult<ReadState> {
        let names = self.archive.list()?;
        let index = latest_index(self.archive.as_ref(), &names);
        let plan = ReadPlan::for_selection(
            &self.selection,
            &names,
            index.as_ref(),
            &self.archive.describe(),
        )?;
        let topics = index
            .iter()
            .flat_map(|i| i.time_ordered_entries.iter())
            .map(|row| (row.entryname.clone(), row.topic.clone()))
            .collect();
        debug!(
            planned = plan.len(),
            require_all = plan.require_all,
            has_index = index.is_some(),
            "Planned read"
        );
        Ok(ReadState {
            plan,
            index,
            topics,
        })
    }

    fn decode(&self, state: &ReadState, entryname: String, bytes: Vec<u8>) -> BagResult<Entry> {
        if state.plan.raw {
            return Ok(Entry::raw(entryname, bytes));
        }
        let payload = decode_envelope(&bytes).map_err(|e| match e {
            BagError::Decode { reason, .. } => BagError::decode(&entryname, reason),
            other => other,
        })?;
        let entry = Entry {
            entryname,
            payload,
            context: None,
        };
        if !(self.unpack_stamped && entry.is_stamped()) {
            return Ok(entry);
        }
        let mut unpacked = entry.unpack_stamped()?;
        if let (Some(topic), Some(ctx)) = (
            state.topics.get(&unpacked.entryname),
            unpacked.context.as_mut(),
        ) {
            ctx.topic = topic.clone();
        }
        Ok(unpacked)
    }
}

impl EntrySource for ReadSession {
    fn next_entry(&mut self) -> BagResult<Option<Entry>> {
        let mut state = match self.state.take() {
            Some(state) => state,
            None => match self.plan() {
                Ok(state) => state,
                Err(e) => {
                    self.state = Some(ReadState::exhausted());
                    return Err(e);
                }
            },
        };
        let result = loop {
            let Some(entryname) = state.plan.queue.pop_front() else {
                break Ok(None);
            };
            match self.archive.read(&entryname) {
                Ok(bytes) => {
                    debug!(entryname = %entryname, bytes = bytes.len(), "Read entry");
                    break self.decode(&state, entryname, bytes).map(Some);
                }
                Err(e) if e.is_not_found() && !state.plan.require_all => {
                    warn!(entryname = %entryname, "Skipping missing entry");
                }
                Err(e) => break Err(e),
            }
        };
        self.state = Some(state);
        result
    }
}

impl Iterator for ReadSession {
    type Item = BagResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

/// The index snapshot with the greatest timestamp
///
/// Snapshots that fail to decode are skipped with a warning. On equal
/// timestamps the one listed first wins.
pub fn latest_index(archive: &dyn Archive, names: &[String]) -> Option<BagIndex> {
    let mut latest: Option<(Timestamp, BagIndex)> = None;
    for name in names.iter().filter(|n| topic_from_entryname(n) == INDEX_TOPIC) {
        match read_snapshot(archive, name) {
            Ok((t, index)) => {
                if latest.as_ref().map_or(true, |(best, _)| t > *best) {
                    latest = Some((t, index));
                }
            }
            Err(e) => warn!(entryname = %name, error = %e, "Skipping unreadable index snapshot"),
        }
    }
    if let Some((t, _)) = &latest {
        debug!(timestamp = %t, "Loaded latest index");
    }
    latest.map(|(_, index)| index)
}

fn read_snapshot(archive: &dyn Archive, entryname: &str) -> BagResult<(Timestamp, BagIndex)> {
    let bytes = archive.read(entryname)?;
    let entry = Entry {
        entryname: entryname.to_string(),
        payload: decode_envelope(&bytes)?,
        context: None,
    };
    let inner = entry.unpack_stamped()?;
    let timestamp = inner
        .timestamp()
        .ok_or_else(|| BagError::decode(entryname, "index snapshot has no timestamp"))?;
    Ok((timestamp, inner.decode_as::<BagIndex>()?))
}
