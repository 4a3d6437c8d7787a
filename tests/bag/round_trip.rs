//! Write-then-read round trips

use crate::common::*;
use std::collections::BTreeSet;
use tidebag::{
    is_reserved_topic, BagError, BagIndex, Encoding, Entry, IndexOptions, MemoryArchive,
    ReadSession, Selection, TopicTime, WriteSession,
};

fn sample_entries() -> Vec<Entry> {
    let pool = test_pool();
    let mut entries = vec![
        Entry::from_message("/calib/origin", &point(&pool, 0.0, 0.0)),
        Entry::from_named("/meta/first", &TopicTime::event("/gps", secs(1.0))),
    ];
    for i in 0..5 {
        entries.push(point_at(&pool, "/gps", i as f64));
        entries.push(point_at(&pool, "/imu", i as f64 + 0.25));
    }
    entries
}

fn write_all(entries: &[Entry], encoding: Encoding) -> (MemoryArchive, BTreeSet<String>) {
    let store = MemoryArchive::new();
    let mut session =
        WriteSession::with_archive(Box::new(store.clone()), IndexOptions::default(), encoding);
    let names = entries
        .iter()
        .map(|e| session.write_entry(e).unwrap())
        .collect();
    session.close().unwrap();
    (store, names)
}

#[test]
fn select_all_returns_every_written_name() {
    init_tracing();
    for encoding in [Encoding::Binary, Encoding::Text] {
        let entries = sample_entries();
        let (store, written) = write_all(&entries, encoding);

        let read: BTreeSet<String> = ReadSession::with_archive(Box::new(store), Selection::all())
            .map(|e| e.unwrap().entryname)
            .filter(|name| !is_reserved_topic(name))
            .collect();
        assert_eq!(read, written, "encoding {}", encoding);
    }
}

#[test]
fn select_all_raw_returns_stored_bytes() {
    let mut entries = sample_entries();
    entries.push(Entry::raw("/notes/readme.txt", b"hello bag".to_vec()));
    let (store, written) = write_all(&entries, Encoding::Binary);
    let entries: Vec<Entry> = ReadSession::with_archive(Box::new(store.clone()), Selection::all_raw())
        .map(Result::unwrap)
        .collect();
    assert!(entries.iter().all(Entry::is_raw));
    assert_eq!(entries.len(), written.len() + 1);

    let note = entries
        .iter()
        .find(|e| e.entryname == "/notes/readme.txt")
        .unwrap();
    assert_eq!(note.payload.value, b"hello bag");
}

#[test]
fn text_encoded_entries_use_json_names() {
    let pool = test_pool();
    let (store, written) = write_all(&[point_at(&pool, "/gps", 2.5)], Encoding::Text);
    assert_eq!(
        written.into_iter().collect::<Vec<_>>(),
        vec!["/gps/2.500000000.stampedmsg.json".to_string()]
    );
    let bytes = tidebag::Archive::read(&store, "/gps/2.500000000.stampedmsg.json").unwrap();
    assert_eq!(bytes.first(), Some(&b'{'));
}

#[test]
fn typed_decode_checks_type() {
    let event = TopicTime::event("/gps", secs(1.0));
    let (store, _) = write_all(&[Entry::from_named("/meta/first", &event)], Encoding::Binary);

    let mut session = ReadSession::with_archive(Box::new(store), Selection::entry("/meta/first"));
    let entry = tidebag::EntrySource::next_entry(&mut session).unwrap().unwrap();

    let decoded: TopicTime = entry.decode_as().unwrap();
    assert_eq!(decoded, event);

    let mismatch = entry.decode_as::<BagIndex>();
    assert!(matches!(mismatch, Err(BagError::Decode { .. })));

    // unchecked decoding trusts the caller
    let unchecked: TopicTime = entry.decode_unchecked().unwrap();
    assert_eq!(unchecked, event);
}

#[test]
fn stamped_entries_come_back_with_context() {
    let pool = test_pool();
    let (store, _) = write_all(&[point_at(&pool, "/sensors/gps", 3.0)], Encoding::Binary);

    let entries: Vec<Entry> = ReadSession::with_archive(Box::new(store.clone()), Selection::window())
        .map(Result::unwrap)
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].topic(), "/sensors/gps");
    assert_eq!(entries[0].timestamp(), Some(secs(3.0)));
    assert_eq!(entries[0].type_url(), "type.googleapis.com/test.Point");

    let wrapped: Vec<Entry> = ReadSession::with_archive(Box::new(store), Selection::window())
        .unpacking_stamped(false)
        .map(Result::unwrap)
        .collect();
    assert!(wrapped[0].is_stamped());
}
