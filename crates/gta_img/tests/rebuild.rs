use std::sync::Arc;

use gta_img::{ImgSession, ImgVersion, MemFs, RebuildOptions};
use tracing_test::traced_test;

mod common;

#[traced_test]
#[test]
fn v1_scenario_remove_and_add() {
    let fs = MemFs::new();
    common::seed_v1(
        &fs,
        "models/gta3",
        &[
            ("a.dff", &[0xA; 100]),
            ("b.txd", &[0xB; 5000]),
            ("c.col", &[0xC; 10]),
        ],
    );

    let mut session = ImgSession::open_with(Arc::new(fs.clone()), "models/gta3.img").unwrap();
    assert_eq!(session.version(), ImgVersion::V1);

    session.stage_remove("b.txd");
    session.stage_add("d.col", vec![0xD; 50]);

    let result = session
        .commit(RebuildOptions::builder().verify_after_write(true).build())
        .unwrap();

    let names: Vec<_> = result.entries.iter().map(|e| e.name.as_ref()).collect();
    assert_eq!(names, vec!["a.dff", "c.col", "d.col"]);

    for entry in &result.entries {
        assert_eq!(entry.offset % 2048, 0);
    }
    for window in result.entries.windows(2) {
        assert!(window[0].offset + window[0].padded_size() <= window[1].offset);
    }

    // Directory holds exactly three records.
    assert_eq!(fs.get("models/gta3.dir").unwrap().len(), 3 * 32);

    // Reading d.col back yields the staged bytes exactly.
    assert_eq!(session.read_payload("d.col").unwrap(), vec![0xD; 50]);
}

#[test]
fn round_trip_preserves_names_sizes_and_bytes() {
    let fs = MemFs::new();
    common::seed_v2(&fs, "test.img", &[("keep.dff", &[1; 4096])]);

    let mut session = ImgSession::open_with(Arc::new(fs.clone()), "test.img").unwrap();
    session.stage_add("new.col", vec![2; 2048]);
    session.stage_replace("keep.dff", vec![3; 2048]);
    session
        .commit(RebuildOptions::builder().verify_after_write(true).build())
        .unwrap();

    // A cold re-open of the committed archive sees the same entry set.
    let mut reopened = ImgSession::open_with(Arc::new(fs.clone()), "test.img").unwrap();
    let names: Vec<_> = reopened.entries().iter().map(|e| e.name.to_string()).collect();
    assert_eq!(names, vec!["keep.dff", "new.col"]);

    assert_eq!(reopened.read_payload("keep.dff").unwrap(), vec![3; 2048]);
    assert_eq!(reopened.read_payload("new.col").unwrap(), vec![2; 2048]);
}

#[test]
fn empty_commit_is_idempotent() {
    let fs = MemFs::new();
    common::seed_v2(
        &fs,
        "test.img",
        &[("a.dff", &[1; 2048]), ("b.col", &[2; 4096])],
    );

    let mut session = ImgSession::open_with(Arc::new(fs.clone()), "test.img").unwrap();
    let before: Vec<_> = session
        .entries()
        .iter()
        .map(|e| (e.name.to_string(), e.size))
        .collect();
    let payloads: Vec<_> = (0..before.len())
        .map(|i| session.by_index(i).map(read_all).unwrap())
        .collect();

    session
        .commit(RebuildOptions::builder().verify_after_write(true).build())
        .unwrap();

    let mut reopened = ImgSession::open_with(Arc::new(fs), "test.img").unwrap();
    let after: Vec<_> = reopened
        .entries()
        .iter()
        .map(|e| (e.name.to_string(), e.size))
        .collect();
    assert_eq!(before, after);

    for (i, expected) in payloads.iter().enumerate() {
        let actual = reopened.by_index(i).map(read_all).unwrap();
        assert_eq!(&actual, expected);
    }
}

#[test]
fn v1_pair_is_replaced_together() {
    let fs = MemFs::new();
    common::seed_v1(&fs, "cuts", &[("intro.dat", &[5; 100])]);

    let mut session = ImgSession::open_with(Arc::new(fs.clone()), "cuts.img").unwrap();
    session.stage_add("outro.dat", vec![6; 100]);
    session.commit(RebuildOptions::builder().build()).unwrap();

    // Both halves of the pair describe the same two entries.
    assert_eq!(fs.get("cuts.dir").unwrap().len(), 2 * 32);
    let reopened = ImgSession::open_with(Arc::new(fs), "cuts.img").unwrap();
    assert_eq!(reopened.entries().len(), 2);
}

fn read_all(mut file: impl std::io::Read) -> Vec<u8> {
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).unwrap();
    buf
}
