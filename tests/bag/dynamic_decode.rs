//! Decoding with only the schemas stored in a bag's index

use crate::common::*;
use prost::Message;
use prost_reflect::ReflectMessage;
use tidebag::{
    ArchiveSpec, BagError, DynamicMessageFactory, Entry, ReadSession, ReadSpec, Selection,
    WriteSession, WriteSpec,
};

#[test]
fn index_closure_decodes_nested_types() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let path = bag_path(&dir, "tracks.zip");

    let writer_pool = test_pool();
    let originals: Vec<_> = (0..3)
        .map(|i| {
            let pts = (0..=i).map(|j| point(&writer_pool, j as f64, i as f64)).collect();
            track(&writer_pool, &format!("lap-{}", i), pts)
        })
        .collect();

    let mut writer = WriteSession::create(WriteSpec::new(ArchiveSpec::write(&path))).unwrap();
    for (i, msg) in originals.iter().enumerate() {
        writer
            .write_entry(&Entry::stamped("/tracks", secs(i as f64), msg))
            .unwrap();
    }
    writer.close().unwrap();

    let index = ReadSession::read_index(ArchiveSpec::read(&path)).unwrap();
    let factory = DynamicMessageFactory::from_index(&index).unwrap();
    assert_eq!(factory.type_names(), vec!["test.Point", "test.Track"]);
    assert!(factory.describe().contains("test/track.proto"));

    let session = ReadSession::create(ReadSpec::new(ArchiveSpec::read(&path), Selection::window())).unwrap();
    for (entry, original) in session.zip(&originals) {
        let decoded = factory.decode_entry(&entry.unwrap()).unwrap();
        assert_eq!(decoded.descriptor().full_name(), "test.Track");
        assert_eq!(decoded.encode_to_vec(), original.encode_to_vec());
    }
}

#[test]
fn raw_reads_fall_back_to_pinned_types() {
    let pool = test_pool();
    let store = memory_bag(&[Entry::from_message("/calib", &point(&pool, 4.0, 5.0))]);

    let index = {
        let names = tidebag::Archive::list(&store).unwrap();
        tidebag::latest_index(&store, &names).unwrap()
    };
    let factory = DynamicMessageFactory::from_index(&index).unwrap();
    assert_eq!(
        factory.pinned_type("/calib"),
        Some("type.googleapis.com/test.Point")
    );

    // a raw read of an envelope leaves the type to the pin
    let bytes = tidebag::Archive::read(&store, "/calib").unwrap();
    let envelope = tidebag::decode_envelope(&bytes).unwrap();
    let raw = Entry::raw("/calib", envelope.value);
    let decoded = factory.decode_entry(&raw).unwrap();
    assert_eq!(
        decoded.get_field_by_name("y").unwrap().as_f64(),
        Some(5.0)
    );
}

#[test]
fn unknown_types_are_decode_errors() {
    let factory = DynamicMessageFactory::new();
    let entry = Entry::unchecked("/x", "type.googleapis.com/test.Point", vec![]);
    assert!(matches!(
        factory.decode_entry(&entry),
        Err(BagError::Decode { .. })
    ));
    assert!(matches!(
        factory.decode_entry(&Entry::raw("/y", vec![])),
        Err(BagError::Decode { .. })
    ));
}
