use proptest::prelude::*;
use regionex_core::{
    ExportSession, ExportSettings, RegionReport,
    fixtures::{DEMO_MEDIA_LENGTH_SECONDS, demo_track_document},
    persistence::{load_report, save_report},
    read_document_str,
};
use tempfile::tempdir;

fn demo_report() -> RegionReport {
    let extraction = read_document_str(demo_track_document()).expect("demo document should parse");
    ExportSession::new(
        extraction,
        DEMO_MEDIA_LENGTH_SECONDS,
        ExportSettings::default(),
    )
    .expect("demo session should build")
    .report()
}

#[test]
fn saved_report_loads_back_unchanged() {
    let temp = tempdir().expect("tempdir should be creatable");
    let path = temp.path().join("nested").join("demo.report.json");
    let report = demo_report();

    save_report(&path, &report).expect("saving report should work");
    let loaded = load_report(&path).expect("loading report should work");
    assert_eq!(loaded, report);
}

#[test]
fn session_saves_its_own_report() {
    let temp = tempdir().expect("tempdir should be creatable");
    let path = temp.path().join("session.report.json");
    let extraction = read_document_str(demo_track_document()).expect("demo document should parse");
    let session = ExportSession::new(extraction, 20.0, ExportSettings::default())
        .expect("session should build");

    session.save_report(&path).expect("session report should save");
    let loaded = load_report(&path).expect("loading report should work");
    assert_eq!(loaded.session_id, session.session_id());
    assert_eq!(loaded.regions.len(), 6);
    assert_eq!(loaded.outside_media_range, 0);
}

#[test]
fn overwriting_replaces_the_previous_report() {
    let temp = tempdir().expect("tempdir should be creatable");
    let path = temp.path().join("demo.report.json");
    std::fs::write(&path, b"stale").expect("fixture write should work");

    save_report(&path, &demo_report()).expect("saving report should work");
    assert!(load_report(&path).is_ok());
    let leftovers = std::fs::read_dir(temp.path())
        .expect("tempdir should be listable")
        .count();
    assert_eq!(leftovers, 1);
}

#[test]
fn missing_report_is_an_error() {
    let temp = tempdir().expect("tempdir should be creatable");
    assert!(load_report(&temp.path().join("absent.json")).is_err());
}

fn no_panic_load(path: &std::path::Path) -> bool {
    std::panic::catch_unwind(|| {
        let _ = load_report(path);
    })
    .is_ok()
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn truncated_reports_do_not_panic(prefix_len in 0usize..8192usize) {
        let temp = tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("truncated.report.json");
        save_report(&path, &demo_report()).expect("saving report should work");

        let mut payload = std::fs::read(&path).expect("reading saved report should work");
        payload.truncate(prefix_len.min(payload.len()));
        std::fs::write(&path, payload).expect("writing truncated payload should work");

        prop_assert!(no_panic_load(&path));
    }
}
