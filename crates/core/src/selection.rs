//! Read queries
//!
//! [`Selection`] is the in-memory query type used by read sessions.
//! [`SelectionMsg`] is its protobuf form for callers that ship queries across
//! a process boundary; it converts into a `Selection` with `TryFrom`.

use crate::error::{BagError, BagResult};
use crate::proto::{type_url_for, TopicTime, PACKAGE};
use crate::time::Timestamp;
use prost::Name;

/// Which entries a read session produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every entry in archive listing order
    All {
        /// Return every entry's bytes untouched
        raw: bool,
    },
    /// The named entries, in the given order
    Names {
        /// Entry names to read
        names: Vec<String>,
        /// Skip names that are absent instead of failing
        ignore_missing: bool,
        /// Return every entry's bytes untouched
        raw: bool,
    },
    /// Entries matching `(topic, timestamp)` events, in index order
    Events {
        /// Events to look up; `entryname` is ignored
        events: Vec<TopicTime>,
        /// Fail if any event has no match
        require_all: bool,
    },
    /// Entries in an inclusive time window, in index order
    Window {
        /// Keep only these topics (all topics when empty)
        include_topics: Vec<String>,
        /// Drop these topics
        exclude_topics: Vec<String>,
        /// Inclusive lower bound
        start: Option<Timestamp>,
        /// Inclusive upper bound
        end: Option<Timestamp>,
    },
}

impl Default for Selection {
    fn default() -> Self {
        Selection::all()
    }
}

impl Selection {
    /// Every entry, decoded
    pub fn all() -> Self {
        Selection::All { raw: false }
    }

    /// Every entry, undecoded
    pub fn all_raw() -> Self {
        Selection::All { raw: true }
    }

    /// A single required entry
    pub fn entry(name: impl Into<String>) -> Self {
        Selection::names([name.into()])
    }

    /// Required entries by name
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Names {
            names: names.into_iter().map(Into::into).collect(),
            ignore_missing: false,
            raw: false,
        }
    }

    /// Entries matching the given events; all must be present
    pub fn events<I: IntoIterator<Item = TopicTime>>(events: I) -> Self {
        Selection::Events {
            events: events.into_iter().collect(),
            require_all: true,
        }
    }

    /// Unbounded window over every topic
    pub fn window() -> Self {
        Selection::Window {
            include_topics: Vec::new(),
            exclude_topics: Vec::new(),
            start: None,
            end: None,
        }
    }

    /// Set `ignore_missing` on a name selection
    pub fn ignoring_missing(mut self) -> Self {
        if let Selection::Names { ignore_missing, .. } = &mut self {
            *ignore_missing = true;
        }
        self
    }

    /// Set `raw` on an all/name selection
    pub fn raw(mut self) -> Self {
        match &mut self {
            Selection::All { raw } | Selection::Names { raw, .. } => *raw = true,
            _ => {}
        }
        self
    }

    /// Clear `require_all` on an event selection
    pub fn allow_missing_events(mut self) -> Self {
        if let Selection::Events { require_all, .. } = &mut self {
            *require_all = false;
        }
        self
    }

    /// Restrict a window to these topics
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Selection::Window { include_topics, .. } = &mut self {
            include_topics.extend(topics.into_iter().map(Into::into));
        }
        self
    }

    /// Exclude these topics from a window
    pub fn excluding<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Selection::Window { exclude_topics, .. } = &mut self {
            exclude_topics.extend(topics.into_iter().map(Into::into));
        }
        self
    }

    /// Inclusive lower bound of a window
    pub fn since(mut self, t: Timestamp) -> Self {
        if let Selection::Window { start, .. } = &mut self {
            *start = Some(t);
        }
        self
    }

    /// Inclusive upper bound of a window
    pub fn until(mut self, t: Timestamp) -> Self {
        if let Selection::Window { end, .. } = &mut self {
            *end = Some(t);
        }
        self
    }

    /// True if planning this selection needs the bag's index
    pub fn needs_index(&self) -> bool {
        matches!(self, Selection::Events { .. } | Selection::Window { .. })
    }
}

// ============================================================================
// Wire form
// ============================================================================

/// Protobuf form of a [`Selection`]
#[derive(Clone, PartialEq, prost::Message)]
pub struct SelectionMsg {
    /// The active criteria
    #[prost(oneof = "selection_msg::Criteria", tags = "1, 2, 3, 4")]
    pub criteria: Option<selection_msg::Criteria>,
}

impl Name for SelectionMsg {
    const NAME: &'static str = "Selection";
    const PACKAGE: &'static str = PACKAGE;

    fn type_url() -> String {
        type_url_for(&Self::full_name())
    }
}

/// Nested messages of [`SelectionMsg`]
pub mod selection_msg {
    use crate::proto::TopicTime;
    use crate::time::Timestamp;

    /// One of the four criteria
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Criteria {
        /// Every entry
        #[prost(message, tag = "1")]
        SelectAll(SelectAll),
        /// Named entries
        #[prost(message, tag = "2")]
        Entrynames(Entrynames),
        /// Matching events
        #[prost(message, tag = "3")]
        Events(Events),
        /// Time window
        #[prost(message, tag = "4")]
        Window(Window),
    }

    /// Every entry
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct SelectAll {
        /// Return bytes untouched
        #[prost(bool, tag = "1")]
        pub all_entries_are_raw: bool,
    }

    /// Named entries
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Entrynames {
        /// Names to read
        #[prost(string, repeated, tag = "1")]
        pub entrynames: Vec<String>,
        /// Skip absent names
        #[prost(bool, tag = "2")]
        pub ignore_missing_entries: bool,
        /// Return bytes untouched
        #[prost(bool, tag = "3")]
        pub entries_are_raw: bool,
    }

    /// Matching events
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Events {
        /// Events to look up
        #[prost(message, repeated, tag = "1")]
        pub events: Vec<TopicTime>,
        /// Fail if any is unmatched
        #[prost(bool, tag = "2")]
        pub require_all: bool,
    }

    /// Time window
    #[derive(Clone, PartialEq, prost::Message)]
    pub struct Window {
        /// Topics to keep (all when empty)
        #[prost(string, repeated, tag = "1")]
        pub topics: Vec<String>,
        /// Inclusive lower bound
        #[prost(message, optional, tag = "2")]
        pub start: Option<Timestamp>,
        /// Inclusive upper bound
        #[prost(message, optional, tag = "3")]
        pub end: Option<Timestamp>,
        /// Topics to drop
        #[prost(string, repeated, tag = "4")]
        pub exclude_topics: Vec<String>,
    }
}

impl TryFrom<SelectionMsg> for Selection {
    type Error = BagError;

    fn try_from(msg: SelectionMsg) -> BagResult<Self> {
        use selection_msg::Criteria;

        match msg.criteria {
            Some(Criteria::SelectAll(s)) => Ok(Selection::All {
                raw: s.all_entries_are_raw,
            }),
            Some(Criteria::Entrynames(s)) => Ok(Selection::Names {
                names: s.entrynames,
                ignore_missing: s.ignore_missing_entries,
                raw: s.entries_are_raw,
            }),
            Some(Criteria::Events(s)) => Ok(Selection::Events {
                events: s.events,
                require_all: s.require_all,
            }),
            Some(Criteria::Window(s)) => Ok(Selection::Window {
                include_topics: s.topics,
                exclude_topics: s.exclude_topics,
                start: s.start,
                end: s.end,
            }),
            None => Err(BagError::invalid_argument("selection has no criteria set")),
        }
    }
}

impl From<Selection> for SelectionMsg {
    fn from(sel: Selection) -> Self {
        use selection_msg::*;

        let criteria = match sel {
            Selection::All { raw } => Criteria::SelectAll(SelectAll {
                all_entries_are_raw: raw,
            }),
            Selection::Names {
                names,
                ignore_missing,
                raw,
            } => Criteria::Entrynames(Entrynames {
                entrynames: names,
                ignore_missing_entries: ignore_missing,
                entries_are_raw: raw,
            }),
            Selection::Events {
                events,
                require_all,
            } => Criteria::Events(Events {
                events,
                require_all,
            }),
            Selection::Window {
                include_topics,
                exclude_topics,
                start,
                end,
            } => Criteria::Window(Window {
                topics: include_topics,
                start,
                end,
                exclude_topics,
            }),
        };
        SelectionMsg {
            criteria: Some(criteria),
        }
    }
}
