//! The same bag through every storage backend

use crate::common::*;
use std::path::Path;
use tidebag::{
    open_archive, ArchiveSpec, Entry, Format, ReadSession, ReadSpec, Selection, WriteSession,
    WriteSpec, TEMP_PLACEHOLDER,
};

fn write_sample(spec: WriteSpec) -> ArchiveSpec {
    let pool = test_pool();
    let mut session = WriteSession::create(spec).unwrap();
    for i in 0..3 {
        session.write_entry(&point_at(&pool, "/gps", i as f64)).unwrap();
    }
    session
        .write_entry(&Entry::from_message("/calib/deep/origin", &point(&pool, 1.0, 2.0)))
        .unwrap();
    let written = session.archive_spec().clone();
    session.close().unwrap();
    written.with_mode(tidebag::Mode::Read)
}

fn read_window(spec: ArchiveSpec) -> Vec<String> {
    ReadSession::create(ReadSpec::new(spec, Selection::window()))
        .unwrap()
        .map(|e| e.unwrap().entryname)
        .collect()
}

#[test]
fn every_file_backend_round_trips() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    for file in ["bag", "bag.zip", "bag.tar", "bag.tar.zst"] {
        let path = bag_path(&dir, file);
        let read = write_sample(WriteSpec::new(ArchiveSpec::write(&path)));
        assert_eq!(
            read_window(read.clone()),
            vec![
                "/gps/0.0.stampedmsg.bin",
                "/gps/1.0.stampedmsg.bin",
                "/gps/2.0.stampedmsg.bin",
            ],
            "backend {}",
            read
        );

        let calib = ReadSession::create(ReadSpec::new(read, Selection::entry("/calib/deep/origin")))
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert_eq!(calib.type_url(), "type.googleapis.com/test.Point");
    }
}

#[test]
fn formats_are_inferred_from_paths() {
    let dir = tempfile::TempDir::new().unwrap();
    let cases = [
        ("a.zip", Format::Zip),
        ("a.tar", Format::Tar),
        ("a.tar.zst", Format::TarZstd),
        ("a.tzst", Format::TarZstd),
        ("a_dir", Format::Directory),
    ];
    for (file, format) in cases {
        let read = write_sample(WriteSpec::new(ArchiveSpec::write(bag_path(&dir, file))));
        assert_eq!(read.format, Some(format), "{}", file);
    }
}

#[test]
fn temp_placeholder_allocates_a_fresh_path() {
    for format in [Format::Directory, Format::Zip, Format::TarZstd] {
        let read = write_sample(WriteSpec::new(ArchiveSpec::write_temp(format)));
        assert_ne!(read.path, TEMP_PLACEHOLDER);
        assert!(Path::new(&read.path).exists());
        assert_eq!(read_window(read.clone()).len(), 3);

        if format == Format::Directory {
            std::fs::remove_dir_all(&read.path).unwrap();
        } else {
            std::fs::remove_file(&read.path).unwrap();
        }
    }
}

#[test]
fn directory_backend_creates_segments_and_ignores_leading_slash() {
    let dir = tempfile::TempDir::new().unwrap();
    let root = bag_path(&dir, "tree");
    let mut archive = open_archive(ArchiveSpec::write(&root).with_format(Format::Directory)).unwrap();
    archive.write("/x/y/z.bin", b"deep").unwrap();
    archive.close().unwrap();

    assert!(Path::new(&root).join("x").join("y").is_dir());
    let archive = open_archive(ArchiveSpec::read(&root)).unwrap();
    assert_eq!(archive.read("/x/y/z.bin").unwrap(), b"deep");
    assert_eq!(archive.read("x/y/z.bin").unwrap(), b"deep");
    assert_eq!(archive.list().unwrap(), vec!["/x/y/z.bin".to_string()]);
}

#[test]
fn entrynames_cannot_escape_the_root() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut archive = open_archive(ArchiveSpec::write(bag_path(&dir, "tree"))).unwrap();
    assert!(matches!(
        archive.write("/../escape", b"no"),
        Err(tidebag::BagError::InvalidArgument(_))
    ));
    assert!(!dir.path().join("escape").exists());
}
