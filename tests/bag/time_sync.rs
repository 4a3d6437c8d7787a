//! Time synchronization over written bags

use crate::common::*;
use std::collections::HashSet;
use std::time::Duration;
use tidebag::{
    ArchiveSpec, BagConfig, ReadSession, Selection, TimeSync, TimeSyncConfig, TimeSyncSpec,
    WriteSession, WriteSpec,
};

#[test]
fn same_second_pairs_form_three_bundles() {
    init_tracing();
    let dir = tempfile::TempDir::new().unwrap();
    let path = bag_path(&dir, "sync.tar");
    let pool = test_pool();

    let mut writer = WriteSession::create(WriteSpec::new(ArchiveSpec::write(&path))).unwrap();
    for t in [0.0, 1.0, 2.0] {
        writer.write_entry(&point_at(&pool, "/a", t)).unwrap();
        writer.write_entry(&point_at(&pool, "/b", t)).unwrap();
    }
    writer.close().unwrap();

    let spec = TimeSyncSpec::new(["/a", "/b"])
        .with_max_slop(Duration::from_millis(500))
        .with_max_queue_size(1);
    let bundles: Vec<_> = TimeSync::over_bag(ArchiveSpec::read(&path), spec)
        .unwrap()
        .map(Result::unwrap)
        .collect();

    assert_eq!(bundles.len(), 3);
    let mut seen = HashSet::new();
    for (t, bundle) in bundles.iter().enumerate() {
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle[0].topic(), "/a");
        assert_eq!(bundle[1].topic(), "/b");
        for entry in bundle {
            assert_eq!(entry.timestamp(), Some(secs(t as f64)));
            assert!(seen.insert(entry.entryname.clone()), "emitted twice: {}", entry);
        }
    }
}

#[test]
fn jittered_topics_align_within_slop() {
    let pool = test_pool();
    let mut entries = Vec::new();
    for i in 0..10 {
        let t = i as f64 * 0.1;
        entries.push(point_at(&pool, "/cam", t));
        entries.push(point_at(&pool, "/lidar", t + 0.013));
        entries.push(point_at(&pool, "/imu", t + 0.021));
    }
    let store = memory_bag(&entries);

    let config = BagConfig {
        time_sync: TimeSyncConfig {
            max_slop_ms: 30,
            max_queue_size: 3,
        },
        ..BagConfig::default()
    };
    let spec = config.time_sync_spec(["/cam", "/lidar", "/imu"]);
    let session = ReadSession::with_archive(
        Box::new(store),
        Selection::window().with_topics(["/cam", "/lidar", "/imu"]),
    );
    let bundles: Vec<_> = TimeSync::new(session, spec)
        .unwrap()
        .map(Result::unwrap)
        .collect();

    assert_eq!(bundles.len(), 10);
    for bundle in &bundles {
        let times: Vec<_> = bundle.iter().map(|e| e.timestamp().unwrap()).collect();
        let lo = times.iter().min().unwrap();
        let hi = times.iter().max().unwrap();
        assert!(hi.abs_diff(lo) <= Duration::from_millis(30));
    }
}

#[test]
fn leftovers_are_dropped() {
    let pool = test_pool();
    let store = memory_bag(&[
        point_at(&pool, "/a", 0.0),
        point_at(&pool, "/a", 1.0),
        point_at(&pool, "/b", 5.0),
    ]);
    let session = ReadSession::with_archive(Box::new(store), Selection::window());
    let mut sync = TimeSync::new(session, TimeSyncSpec::new(["/a", "/b"])).unwrap();
    assert!(sync.next_bundle().unwrap().is_none());
    assert!(sync.next().is_none());
}
