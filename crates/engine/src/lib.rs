//! Bag engine for tidebag
//!
//! This crate turns archives into bags:
//! - Write sessions: entry writes plus an index snapshot on close
//! - Index building: topic statistics, time order, schema closures
//! - Read sessions: lazy query planning over the latest index
//! - Time synchronization: approximately aligned bundles across topics
//! - Dynamic decoding from the schema closures stored in an index
//!
//! The engine is the only component that knows about the reserved index
//! namespace and how snapshots inside it are chosen.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dynamic;
pub mod index_builder;
pub mod products;
pub mod read_session;
pub mod schema;
pub mod time_sync;
pub mod write_session;

pub use config::{BagConfig, TimeSyncConfig, CONFIG_FILE_NAME};
pub use dynamic::DynamicMessageFactory;
pub use index_builder::{IndexBuilder, IndexOptions};
pub use products::IterProducts;
pub use read_session::{latest_index, EntrySource, IterSource, ReadPlan, ReadSession, ReadSpec};
pub use schema::{bfs_closure, schema_closure};
pub use time_sync::{TimeSync, TimeSyncSpec};
pub use write_session::{resolve_entryname, WriteSession, WriteSpec};
