//! Selections planned against written bags

use crate::common::*;
use tidebag::{
    ArchiveSpec, BagError, Entry, EntrySource, ReadSession, ReadSpec, Selection, SelectionMsg,
    TopicTime, WriteSession, WriteSpec,
};

fn two_topic_bag() -> tidebag::MemoryArchive {
    let pool = test_pool();
    let mut entries = Vec::new();
    for i in 0..4 {
        entries.push(point_at(&pool, "/a", i as f64));
        entries.push(point_at(&pool, "/b", i as f64 + 0.5));
    }
    memory_bag(&entries)
}

fn names(session: ReadSession) -> Vec<String> {
    session.map(|e| e.unwrap().entryname).collect()
}

#[test]
fn events_come_back_in_index_order() {
    let sel = Selection::events([
        TopicTime::event("/b", secs(2.5)),
        TopicTime::event("/a", secs(0.0)),
        TopicTime::event("/a", secs(3.0)),
    ]);
    let session = ReadSession::with_archive(Box::new(two_topic_bag()), sel);
    assert_eq!(
        names(session),
        vec![
            "/a/0.0.stampedmsg.bin",
            "/b/2.500000000.stampedmsg.bin",
            "/a/3.0.stampedmsg.bin",
        ]
    );
}

#[test]
fn unmatched_required_event_fails_before_reading() {
    init_tracing();
    let (archive, log) = RecordingArchive::new(two_topic_bag());
    let sel = Selection::events([
        TopicTime::event("/a", secs(1.0)),
        TopicTime::event("/a", secs(1.5)),
        TopicTime::event("/c", secs(0.0)),
    ]);
    let mut session = ReadSession::with_archive(Box::new(archive), sel);

    match session.next_entry() {
        Err(BagError::UnmatchedEvents { events }) => {
            assert_eq!(events, vec!["/a@1.500000000", "/c@0.000000000"]);
        }
        other => panic!("expected unmatched events, got {:?}", other),
    }
    assert!(data_reads(&log).is_empty());
    assert!(session.next_entry().unwrap().is_none());
}

#[test]
fn unmatched_optional_event_is_skipped() {
    let sel = Selection::events([
        TopicTime::event("/a", secs(1.0)),
        TopicTime::event("/a", secs(1.5)),
    ])
    .allow_missing_events();
    let session = ReadSession::with_archive(Box::new(two_topic_bag()), sel);
    assert_eq!(names(session), vec!["/a/1.0.stampedmsg.bin"]);
}

#[test]
fn window_bounds_are_inclusive() {
    let sel = Selection::window().since(secs(1.0)).until(secs(2.5));
    let session = ReadSession::with_archive(Box::new(two_topic_bag()), sel);
    assert_eq!(
        names(session),
        vec![
            "/a/1.0.stampedmsg.bin",
            "/b/1.500000000.stampedmsg.bin",
            "/a/2.0.stampedmsg.bin",
            "/b/2.500000000.stampedmsg.bin",
        ]
    );
}

#[test]
fn window_topic_filters() {
    let store = two_topic_bag();

    let only_b = ReadSession::with_archive(Box::new(store.clone()), Selection::window().with_topics(["/b"]));
    let only_b = names(only_b);
    assert_eq!(only_b.len(), 4);
    assert!(only_b.iter().all(|n| n.starts_with("/b/")));

    let not_b = ReadSession::with_archive(Box::new(store), Selection::window().excluding(["/b"]));
    let not_b = names(not_b);
    assert_eq!(not_b.len(), 4);
    assert!(not_b.iter().all(|n| n.starts_with("/a/")));
}

#[test]
fn names_missing_required_vs_ignored() {
    let store = two_topic_bag();

    let strict = Selection::names(["/a/0.0.stampedmsg.bin", "/missing"]);
    let mut session = ReadSession::with_archive(Box::new(store.clone()), strict);
    assert!(session.next_entry().unwrap().is_some());
    let err = session.next_entry().unwrap_err();
    assert!(err.is_not_found());

    let lenient = Selection::names(["/missing", "a/0.0.stampedmsg.bin", "/also/missing"])
        .ignoring_missing();
    let session = ReadSession::with_archive(Box::new(store), lenient);
    assert_eq!(names(session), vec!["/a/0.0.stampedmsg.bin"]);
}

#[test]
fn selection_message_drives_a_session() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = bag_path(&dir, "bag.zip");
    let pool = test_pool();
    let mut writer = WriteSession::create(WriteSpec::new(ArchiveSpec::write(&path))).unwrap();
    for i in 0..3 {
        writer.write_entry(&point_at(&pool, "/a", i as f64)).unwrap();
    }
    writer.close().unwrap();

    let msg = SelectionMsg::from(Selection::window().since(secs(1.0)));
    let spec = ReadSpec::from_message(ArchiveSpec::read(&path), msg).unwrap();
    let entries: Vec<Entry> = ReadSession::create(spec).unwrap().map(Result::unwrap).collect();
    assert_eq!(entries.len(), 2);

    let empty = ReadSpec::from_message(ArchiveSpec::read(&path), SelectionMsg::default());
    assert!(matches!(empty, Err(BagError::InvalidArgument(_))));
}

#[test]
fn named_reads_ignore_leading_slash() {
    let pool = test_pool();
    let mut fix = point_at(&pool, "/gps", 1.0);
    fix.entryname = "/calib/fix".to_string();
    let store = memory_bag(&[fix]);

    let read = |name: &str| {
        let mut session =
            ReadSession::with_archive(Box::new(store.clone()), Selection::entry(name));
        session.next_entry().unwrap().unwrap()
    };
    let with_slash = read("/calib/fix");
    let without_slash = read("calib/fix");

    assert_eq!(with_slash.topic(), "/gps");
    assert_eq!(without_slash.topic(), "/gps");
    assert_eq!(without_slash.entryname, "/calib/fix");
    assert_eq!(without_slash.timestamp(), Some(secs(1.0)));
}
