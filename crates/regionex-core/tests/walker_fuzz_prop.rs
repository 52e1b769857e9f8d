use proptest::prelude::*;
use regionex_core::{
    ParseEvent, extract_regions,
    fixtures::demo_track_document,
    read_document, read_document_str,
    reader::parse_events,
};

fn no_panic(run: impl FnOnce() + std::panic::UnwindSafe) -> bool {
    std::panic::catch_unwind(run).is_ok()
}

fn event_strategy() -> impl Strategy<Value = ParseEvent> {
    let tags = prop::sample::select(vec!["obj", "float", "int", "string", "member", "list"]);
    let classes = prop::sample::select(vec![
        "MAudioTrackEvent",
        "MMarkerTrackEvent",
        "MMidiTrackEvent",
        "MAudioEvent",
        "MAudioPartEvent",
        "MAudioPart",
        "PAudioClip",
        "MRangeMarkerEvent",
        "MMidiPartEvent",
        "MMidiPart",
        "MTempoEvent",
        "PArrangeSetup",
        "MListNode",
    ]);
    let names = prop::sample::select(vec![
        "Start",
        "Length",
        "Name",
        "Description",
        "AudioClip",
        "SampleRate",
        "BPM",
        "PPQ",
        "Func",
        "Domain",
        "Type",
        "RehearsalTempo",
        "RehearsalMode",
    ]);
    let values = prop::sample::select(vec!["0", "1", "960", "-480", "48000", "1e308", "nan", "x", ""]);

    prop_oneof![
        1 => Just(ParseEvent::Close),
        1 => (tags, prop::option::of(classes), prop::option::of(names), prop::option::of(values), prop::option::of(0u8..4))
            .prop_map(|(tag, class, name, value, id)| {
                let mut event = ParseEvent::open(tag);
                if let Some(class) = class {
                    event = event.with("class", class);
                }
                if let Some(name) = name {
                    event = event.with("name", name);
                }
                if let Some(value) = value {
                    event = event.with("value", value);
                }
                if let Some(id) = id {
                    event = event.with("ID", id.to_string());
                }
                event
            }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn random_bytes_do_not_panic(raw in prop::collection::vec(any::<u8>(), 0..4096)) {
        let completed = no_panic(|| {
            let _ = read_document(raw.as_slice());
        });
        prop_assert!(completed);
    }

    #[test]
    fn truncated_documents_do_not_panic(prefix_len in 0usize..6000usize) {
        let document = demo_track_document().as_bytes();
        let truncated = &document[..prefix_len.min(document.len())];
        let completed = no_panic(|| {
            let _ = read_document(truncated);
        });
        prop_assert!(completed);
    }

    #[test]
    fn mutated_documents_do_not_panic(index in 0usize..6000usize, delta in any::<u8>()) {
        let mut payload = demo_track_document().as_bytes().to_vec();
        let target = index % payload.len();
        payload[target] ^= delta.max(1);
        let completed = no_panic(|| {
            let _ = read_document(payload.as_slice());
        });
        prop_assert!(completed);
    }

    #[test]
    fn random_event_streams_do_not_panic(events in prop::collection::vec(event_strategy(), 0..256)) {
        let completed = no_panic(|| {
            let _ = extract_regions(&events);
        });
        prop_assert!(completed);
    }

    #[test]
    fn resolved_regions_are_ordered_and_well_formed(events in prop::collection::vec(event_strategy(), 0..256)) {
        if let Ok(extraction) = extract_regions(&events) {
            for pair in extraction.regions.windows(2) {
                prop_assert!(pair[0].start_seconds() <= pair[1].start_seconds());
            }
            for region in &extraction.regions {
                prop_assert!(region.end_seconds() >= region.start_seconds());
            }
        }
    }
}

#[test]
fn adapter_and_direct_walk_agree_on_the_demo() {
    let events = parse_events(demo_track_document()).expect("demo document should parse");
    let direct = extract_regions(&events).expect("demo events should walk");
    let streamed = read_document_str(demo_track_document()).expect("demo document should parse");
    assert_eq!(direct.records(), streamed.records());
    assert_eq!(direct.diagnostics, streamed.diagnostics);
}
