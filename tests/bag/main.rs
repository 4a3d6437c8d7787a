//! Bag Tests
//!
//! End-to-end tests across the archive, core and engine crates:
//! - Round trips through every backend and both encodings
//! - Index contents and latest-snapshot selection
//! - Selection planning against real bags
//! - Time synchronization over a written bag
//! - Decoding with only the schemas stored in the index

#[path = "../common/mod.rs"]
mod common;

mod backends;
mod dynamic_decode;
mod round_trip;
mod selection;
mod time_sync;
