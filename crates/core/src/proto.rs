//! Wire messages stored inside a bag
//!
//! These are hand-derived `prost` messages; no build-time code generation is
//! involved. Field numbers are part of the on-disk format and must not change.
//!
//! - [`Envelope`]: the type-tagged payload, wire-compatible with
//!   `google.protobuf.Any`
//! - [`StampedMessage`]: the time-stamped wrapper around an inner envelope
//! - [`TopicTime`]: one `(topic, timestamp, entryname)` index row
//! - [`BagIndex`]: the per-session index snapshot

use crate::time::Timestamp;
use prost::Name;
use prost_types::FileDescriptorSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of every type URL written by tidebag
pub const TYPE_URL_PREFIX: &str = "type.googleapis.com/";

/// Package of the tidebag wire messages
pub const PACKAGE: &str = "tidebag";

/// Type URL of [`StampedMessage`]
pub const STAMPED_MESSAGE_TYPE_URL: &str = "type.googleapis.com/tidebag.StampedMessage";

/// Index format version written into every [`BagIndex`]
pub const FORMAT_VERSION: &str = concat!("tidebag-", env!("CARGO_PKG_VERSION"));

/// Build the type URL for a fully-qualified message name
pub fn type_url_for(full_name: &str) -> String {
    format!("{}{}", TYPE_URL_PREFIX, full_name)
}

/// Fully-qualified message name named by a type URL (the part after the last `/`)
pub fn message_name_from_type_url(type_url: &str) -> &str {
    match type_url.rsplit_once('/') {
        Some((_, name)) => name,
        None => type_url,
    }
}

// ============================================================================
// Envelope
// ============================================================================

/// A type-tagged payload: `{type_url, value}`
///
/// An empty `type_url` marks a raw (untyped) payload.
#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct Envelope {
    /// Type URL of the serialized value; empty for raw payloads
    #[prost(string, tag = "1")]
    #[serde(default)]
    pub type_url: String,
    /// Serialized message body
    #[prost(bytes = "vec", tag = "2")]
    #[serde(default, with = "base64_bytes")]
    pub value: Vec<u8>,
}

impl Envelope {
    /// Create an envelope from a type URL and serialized bytes
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Envelope {
            type_url: type_url.into(),
            value,
        }
    }

    /// Pack a named message
    pub fn pack<M: prost::Message + Name>(msg: &M) -> Self {
        Envelope {
            type_url: M::type_url(),
            value: msg.encode_to_vec(),
        }
    }

    /// True if no type URL is attached
    pub fn is_raw(&self) -> bool {
        self.type_url.is_empty()
    }
}

/// A message wrapped together with its timestamp
#[derive(Clone, PartialEq, prost::Message, Serialize, Deserialize)]
pub struct StampedMessage {
    /// Time associated with the inner message
    #[prost(message, optional, tag = "1")]
    pub timestamp: Option<Timestamp>,
    /// The inner payload
    #[prost(message, optional, tag = "2")]
    pub msg: Option<Envelope>,
}

impl Name for StampedMessage {
    const NAME: &'static str = "StampedMessage";
    const PACKAGE: &'static str = PACKAGE;

    fn type_url() -> String {
        type_url_for(&Self::full_name())
    }
}

// ============================================================================
// TopicTime
// ============================================================================

/// One time-series observation: `(topic, timestamp, entryname)`
///
/// Ordered by timestamp, then topic, then entryname. Selection matching uses
/// only `(topic, timestamp)`; see [`TopicTime::key`].
#[derive(Clone, PartialEq, Eq, Hash, prost::Message)]
pub struct TopicTime {
    /// Topic the entry was written under
    #[prost(string, tag = "1")]
    pub topic: String,
    /// Entry timestamp
    #[prost(message, required, tag = "2")]
    pub timestamp: Timestamp,
    /// Resolved archive entry name; may be empty in queries
    #[prost(string, tag = "10")]
    pub entryname: String,
}

impl TopicTime {
    /// Create a new observation
    pub fn new(
        topic: impl Into<String>,
        timestamp: Timestamp,
        entryname: impl Into<String>,
    ) -> Self {
        TopicTime {
            topic: topic.into(),
            timestamp,
            entryname: entryname.into(),
        }
    }

    /// An event query (no entryname)
    pub fn event(topic: impl Into<String>, timestamp: Timestamp) -> Self {
        TopicTime::new(topic, timestamp, String::new())
    }

    /// Identity used for matching: `(topic, timestamp)`
    pub fn key(&self) -> (&str, Timestamp) {
        (self.topic.as_str(), self.timestamp)
    }
}

impl Ord for TopicTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.topic.cmp(&other.topic))
            .then_with(|| self.entryname.cmp(&other.entryname))
    }
}

impl PartialOrd for TopicTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TopicTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.topic, self.timestamp)?;
        if !self.entryname.is_empty() {
            write!(f, " ({})", self.entryname)?;
        }
        Ok(())
    }
}

impl Name for TopicTime {
    const NAME: &'static str = "TopicTime";
    const PACKAGE: &'static str = PACKAGE;

    fn type_url() -> String {
        type_url_for(&Self::full_name())
    }
}

// ============================================================================
// BagIndex
// ============================================================================

/// Per-topic statistics
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct TopicStats {
    /// Number of entries written under the topic
    #[prost(uint64, tag = "1")]
    pub message_count: u64,
}

/// Schema closures collected while writing
#[derive(Clone, PartialEq, prost::Message)]
pub struct SchemaPool {
    /// Type URL -> every schema file needed to decode that type
    #[prost(btree_map = "string, message", tag = "1")]
    pub type_url_to_schema: BTreeMap<String, FileDescriptorSet>,
    /// Entry name -> type URL of the value stored there
    #[prost(btree_map = "string, string", tag = "2")]
    pub entryname_to_type_url: BTreeMap<String, String>,
}

/// The index snapshot written at the end of every write session
///
/// Immutable once written; each session appends its own snapshot.
#[derive(Clone, PartialEq, prost::Message)]
pub struct BagIndex {
    /// Earliest observed timestamp (`Timestamp::MAX` if none)
    #[prost(message, required, tag = "1")]
    pub start: Timestamp,
    /// Latest observed timestamp (`Timestamp::MIN` if none)
    #[prost(message, required, tag = "2")]
    pub end: Timestamp,
    /// Version of the writer that produced this index
    #[prost(string, tag = "3")]
    pub format_version: String,
    /// Topic -> statistics
    #[prost(btree_map = "string, message", tag = "4")]
    pub topic_stats: BTreeMap<String, TopicStats>,
    /// Every timestamped entry, sorted by [`TopicTime`] order
    #[prost(message, repeated, tag = "5")]
    pub time_ordered_entries: Vec<TopicTime>,
    /// Schema closures for dynamic decoding
    #[prost(message, required, tag = "6")]
    pub schema_pool: SchemaPool,
}

impl BagIndex {
    /// An index with no observations; `start`/`end` hold the inverted sentinels
    pub fn empty() -> Self {
        BagIndex {
            start: Timestamp::MAX,
            end: Timestamp::MIN,
            format_version: FORMAT_VERSION.to_string(),
            ..Default::default()
        }
    }

    /// Number of entries recorded for `topic`
    pub fn message_count(&self, topic: &str) -> u64 {
        self.topic_stats
            .get(topic)
            .map(|s| s.message_count)
            .unwrap_or(0)
    }

    /// True if no timestamped entry was observed
    pub fn is_time_empty(&self) -> bool {
        self.time_ordered_entries.is_empty()
    }
}

impl Name for BagIndex {
    const NAME: &'static str = "BagIndex";
    const PACKAGE: &'static str = PACKAGE;

    fn type_url() -> String {
        type_url_for(&Self::full_name())
    }
}

// ============================================================================
// serde helper
// ============================================================================

pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
