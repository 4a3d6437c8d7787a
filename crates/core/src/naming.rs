//! Entry names and the reserved index namespace
//!
//! Entry names are archive paths. The canonical form has exactly one leading
//! `/`; backends store names without it and list them with it, so callers may
//! use either form.

use crate::codec::Encoding;
use crate::time::Timestamp;

/// Prefix of every entry written by the bag itself
pub const RESERVED_PREFIX: &str = "/_bag_index";

/// Topic under which index snapshots are written
pub const INDEX_TOPIC: &str = "/_bag_index/index";

/// Marker in auto-derived time-series entry names
pub const STAMPED_MARKER: &str = "stampedmsg";

/// Canonical form of an entry name: one leading `/`, no trailing `/`
pub fn canonical_entryname(name: &str) -> String {
    format!("/{}", relative_entryname(name))
}

/// Entry name with every leading `/` stripped, as used for backend paths
pub fn relative_entryname(name: &str) -> &str {
    name.trim_start_matches('/').trim_end_matches('/')
}

/// True if `name` is the reserved prefix itself or lies beneath it
pub fn is_reserved_topic(name: &str) -> bool {
    let reserved = relative_entryname(RESERVED_PREFIX);
    let name = relative_entryname(name);
    match name.strip_prefix(reserved) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Name for a time-series entry: `{topic}/{seconds}.{nanos}.stampedmsg.{ext}`
pub fn stamped_entryname(topic: &str, timestamp: &Timestamp, encoding: Encoding) -> String {
    canonical_entryname(&format!(
        "{}/{}.{}.{}.{}",
        relative_entryname(topic),
        timestamp.seconds,
        timestamp.nanos,
        STAMPED_MARKER,
        encoding.extension()
    ))
}

/// Parent path of an entry name, used as its topic when no index says otherwise
pub fn topic_from_entryname(name: &str) -> String {
    let canonical = canonical_entryname(name);
    match canonical.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}
