//! Core types for tidebag
//!
//! This crate defines the data model shared by the archive and engine crates:
//! - BagError / BagResult: error type hierarchy
//! - Timestamp: protobuf-compatible point in time
//! - Envelope, StampedMessage, TopicTime, BagIndex: wire messages
//! - Entry / Context: one record plus its topic/time metadata
//! - Selection / SelectionMsg: read queries
//! - Encoding: binary or text envelope encoding
//! - naming: canonical entry names and the reserved index namespace

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod entry;
pub mod error;
pub mod naming;
pub mod proto;
pub mod selection;
pub mod time;

pub use codec::{decode_envelope, encode_envelope, Encoding};
pub use entry::{Context, Entry};
pub use error::{BagError, BagResult};
pub use naming::{
    canonical_entryname, is_reserved_topic, relative_entryname, stamped_entryname,
    topic_from_entryname, INDEX_TOPIC, RESERVED_PREFIX,
};
pub use proto::{
    message_name_from_type_url, type_url_for, BagIndex, Envelope, SchemaPool, StampedMessage,
    TopicStats, TopicTime, FORMAT_VERSION, STAMPED_MESSAGE_TYPE_URL,
};
pub use selection::{Selection, SelectionMsg};
pub use time::Timestamp;
