//! Tidebag - archives of timestamped, self-describing protobuf records
//!
//! A bag stores typed entries under path-like names inside a directory, zip,
//! tar or in-memory archive. Every write session appends an index snapshot
//! with per-topic statistics, a time-ordered entry list and the schema
//! closures needed to decode entries without compiled-in message types.
//!
//! # Quick Start
//!
//! ```ignore
//! use tidebag::{ArchiveSpec, Entry, ReadSession, ReadSpec, Selection, Timestamp};
//! use tidebag::{WriteSession, WriteSpec};
//!
//! let mut writer = WriteSession::create(WriteSpec::new(ArchiveSpec::write("run.tar.zst")))?;
//! writer.write_entry(&Entry::stamped("/imu", Timestamp::now(), &reading))?;
//! writer.close()?;
//!
//! let spec = ReadSpec::new(ArchiveSpec::read("run.tar.zst"), Selection::window());
//! for entry in ReadSession::create(spec)? {
//!     println!("{}", entry?);
//! }
//! ```
//!
//! # Architecture
//!
//! - `tidebag-core`: errors, timestamps, wire messages, entries, selections
//! - `tidebag-archive`: the [`Archive`] trait and its backends
//! - `tidebag-engine`: sessions, index building, time sync, dynamic decoding

pub use tidebag_archive::*;
pub use tidebag_core::*;
pub use tidebag_engine::*;
