//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use prost_reflect::{DescriptorPool, DynamicMessage, Value};
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use std::sync::{Arc, Mutex, Once};
use tempfile::TempDir;
use tidebag::{
    Archive, ArchiveSpec, BagResult, Encoding, Entry, IndexOptions, MemoryArchive, Timestamp,
    WriteSession,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness once per binary.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

// ============================================================================
// Schemas
// ============================================================================

fn field(name: &str, number: i32, label: Label, ty: Type, type_name: Option<&str>) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        type_name: type_name.map(str::to_string),
        json_name: Some(name.to_string()),
        ..Default::default()
    }
}

/// `test/point.proto`: `message Point { double x = 1; double y = 2; }`
pub fn point_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("test/point.proto".to_string()),
        package: Some("test".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("Point".to_string()),
            field: vec![
                field("x", 1, Label::Optional, Type::Double, None),
                field("y", 2, Label::Optional, Type::Double, None),
            ],
            ..Default::default()
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// `test/track.proto`: `message Track { string label = 1; repeated Point points = 2; }`
pub fn track_file() -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("test/track.proto".to_string()),
        package: Some("test".to_string()),
        dependency: vec!["test/point.proto".to_string()],
        message_type: vec![DescriptorProto {
            name: Some("Track".to_string()),
            field: vec![
                field("label", 1, Label::Optional, Type::String, None),
                field("points", 2, Label::Repeated, Type::Message, Some(".test.Point")),
            ],
            ..Default::default()
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

/// Descriptor pool holding both test schemas, as a writer would have compiled in.
pub fn test_pool() -> DescriptorPool {
    let mut pool = DescriptorPool::new();
    pool.add_file_descriptor_proto(point_file())
        .expect("point.proto is valid");
    pool.add_file_descriptor_proto(track_file())
        .expect("track.proto is valid");
    pool
}

pub fn point(pool: &DescriptorPool, x: f64, y: f64) -> DynamicMessage {
    let desc = pool.get_message_by_name("test.Point").expect("Point is registered");
    let mut msg = DynamicMessage::new(desc);
    msg.set_field_by_name("x", Value::F64(x));
    msg.set_field_by_name("y", Value::F64(y));
    msg
}

pub fn track(pool: &DescriptorPool, label: &str, points: Vec<DynamicMessage>) -> DynamicMessage {
    let desc = pool.get_message_by_name("test.Track").expect("Track is registered");
    let mut msg = DynamicMessage::new(desc);
    msg.set_field_by_name("label", Value::String(label.to_string()));
    msg.set_field_by_name(
        "points",
        Value::List(points.into_iter().map(Value::Message).collect()),
    );
    msg
}

// ============================================================================
// Bags
// ============================================================================

/// Path for a bag file named `name` inside `dir`.
pub fn bag_path(dir: &TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

/// Timestamp at fractional seconds.
pub fn secs(s: f64) -> Timestamp {
    Timestamp::from_secs_f64(s)
}

/// Stamped `Point` entry on `topic` at `t` seconds.
pub fn point_at(pool: &DescriptorPool, topic: &str, t: f64) -> Entry {
    Entry::stamped(topic, secs(t), &point(pool, t, -t))
}

/// Write `entries` into an in-memory bag and close it.
pub fn memory_bag(entries: &[Entry]) -> MemoryArchive {
    let store = MemoryArchive::new();
    let mut session =
        WriteSession::with_archive(Box::new(store.clone()), IndexOptions::default(), Encoding::Binary);
    for entry in entries {
        session.write_entry(entry).expect("write entry");
    }
    session.close().expect("close session");
    store
}

// ============================================================================
// RecordingArchive - observes reads issued against a backend
// ============================================================================

/// Names passed to `read`, in call order.
pub type ReadLog = Arc<Mutex<Vec<String>>>;

/// Wraps an archive and records every `read` call.
pub struct RecordingArchive<A> {
    inner: A,
    reads: ReadLog,
}

impl<A: Archive> RecordingArchive<A> {
    pub fn new(inner: A) -> (Self, ReadLog) {
        let reads = ReadLog::default();
        (
            RecordingArchive {
                inner,
                reads: reads.clone(),
            },
            reads,
        )
    }
}

/// Recorded reads outside the reserved index namespace.
pub fn data_reads(log: &ReadLog) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|name| !tidebag::is_reserved_topic(name))
        .cloned()
        .collect()
}

impl<A: Archive> Archive for RecordingArchive<A> {
    fn list(&self) -> BagResult<Vec<String>> {
        self.inner.list()
    }

    fn read(&self, entryname: &str) -> BagResult<Vec<u8>> {
        self.reads.lock().unwrap().push(entryname.to_string());
        self.inner.read(entryname)
    }

    fn write(&mut self, entryname: &str, data: &[u8]) -> BagResult<()> {
        self.inner.write(entryname, data)
    }

    fn close(&mut self) -> BagResult<()> {
        self.inner.close()
    }

    fn spec(&self) -> &ArchiveSpec {
        self.inner.spec()
    }
}
