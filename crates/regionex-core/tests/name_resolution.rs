use std::collections::HashSet;

use proptest::prelude::*;
use regionex_core::{RegionDraft, RegionSource, naming::resolve_names};

fn drafts(names: &[&str]) -> Vec<RegionDraft> {
    names
        .iter()
        .map(|name| {
            let mut draft = RegionDraft::new(RegionSource::RangeMarkerEvent);
            draft.set_name(name);
            draft
        })
        .collect()
}

fn names(regions: &[RegionDraft]) -> Vec<String> {
    regions.iter().map(|region| region.name().to_string()).collect()
}

#[test]
fn every_holder_of_a_shared_name_is_suffixed() {
    let mut regions = drafts(&["kick", "kick", "snare"]);
    assert_eq!(resolve_names(&mut regions), 2);
    assert_eq!(names(&regions), ["kick_0001", "kick_0002", "snare"]);
}

#[test]
fn suffixes_already_taken_are_skipped() {
    let mut regions = drafts(&["kick_0001", "kick", "kick"]);
    assert_eq!(resolve_names(&mut regions), 2);
    assert_eq!(names(&regions), ["kick_0001", "kick_0002", "kick_0003"]);
}

#[test]
fn single_occurrence_next_to_a_suffixed_name_is_kept() {
    let mut regions = drafts(&["kick_0001", "kick"]);
    assert_eq!(resolve_names(&mut regions), 0);
    assert_eq!(names(&regions), ["kick_0001", "kick"]);
}

#[test]
fn generated_names_are_reserved_for_later_groups() {
    let mut regions = drafts(&["a", "a", "a_0001", "a_0001"]);
    assert_eq!(resolve_names(&mut regions), 4);
    assert_eq!(
        names(&regions),
        ["a_0001", "a_0002", "a_0001_0001", "a_0001_0002"]
    );
}

#[test]
fn untitled_regions_collide_like_any_other() {
    let mut regions = vec![
        RegionDraft::new(RegionSource::AudioEvent),
        RegionDraft::new(RegionSource::AudioEvent),
    ];
    assert_eq!(resolve_names(&mut regions), 2);
    assert_eq!(names(&regions), ["untitled_0001", "untitled_0002"]);
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn resolved_names_are_unique_and_deterministic(
        raw in prop::collection::vec(prop::sample::select(vec!["kick", "snare", "kick_0001", "hat", "kick_0002"]), 0..24)
    ) {
        let mut first = drafts(&raw);
        let mut second = drafts(&raw);
        let renamed = resolve_names(&mut first);
        prop_assert_eq!(renamed, resolve_names(&mut second));
        prop_assert_eq!(names(&first), names(&second));

        let unique: HashSet<String> = names(&first).into_iter().collect();
        prop_assert_eq!(unique.len(), first.len());

        let unchanged = raw
            .iter()
            .zip(names(&first))
            .filter(|(before, after)| **before == after.as_str())
            .count();
        prop_assert_eq!(unchanged + renamed, raw.len());
    }
}
