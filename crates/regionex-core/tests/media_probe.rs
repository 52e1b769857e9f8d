use std::path::Path;

use regionex_core::{
    ExportSession, ExportSettings, SessionError, fixtures::demo_track_document, probe_media,
};
use tempfile::tempdir;

fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, frames: u32) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).expect("test wav should be creatable");
    for frame in 0..frames {
        let phase = frame as f32 / sample_rate as f32 * 220.0 * std::f32::consts::TAU;
        let sample = (phase.sin() * 0.5 * f32::from(i16::MAX)).round() as i16;
        for _ in 0..channels {
            writer
                .write_sample(sample)
                .expect("test wav sample write should succeed");
        }
    }
    writer.finalize().expect("test wav finalize should succeed");
}

#[test]
fn probe_reports_length_and_layout() {
    let temp = tempdir().expect("tempdir should be creatable");
    let path = temp.path().join("Tone.WAV");
    write_test_wav(&path, 48_000, 2, 36_000);

    let probe = probe_media(&path).expect("probe should succeed");
    assert_eq!(probe.sample_rate, 48_000);
    assert_eq!(probe.channels, 2);
    assert_eq!(probe.total_frames, 36_000);
    assert_eq!(probe.extension, "wav");
    assert!((probe.length_seconds - 0.75).abs() < 1e-9);
}

#[test]
fn probe_rejects_non_audio() {
    let temp = tempdir().expect("tempdir should be creatable");
    let path = temp.path().join("notes.wav");
    std::fs::write(&path, b"definitely not a riff header").expect("fixture write should work");
    assert!(probe_media(&path).is_err());
    assert!(probe_media(&temp.path().join("missing.wav")).is_err());
}

#[test]
fn session_from_paths_uses_the_probed_length() {
    let temp = tempdir().expect("tempdir should be creatable");
    let track_xml = temp.path().join("demo.tracks.xml");
    std::fs::write(&track_xml, demo_track_document()).expect("fixture write should work");
    let media = temp.path().join("mix.wav");
    write_test_wav(&media, 8_000, 1, 8_000 * 11);

    let session = ExportSession::from_paths(&track_xml, &media, ExportSettings::default())
        .expect("session should build");
    assert!((session.media_length_seconds() - 11.0).abs() < 1e-9);
    // Verse_0001 (ends at 12s) and Verse_0002 (14s) do not fit.
    assert_eq!(session.outside_media_range(), 2);
    assert_eq!(session.regions().len(), 4);
}

#[test]
fn session_from_paths_plans_outputs_with_the_media_extension() {
    let temp = tempdir().expect("tempdir should be creatable");
    let track_xml = temp.path().join("demo.tracks.xml");
    std::fs::write(&track_xml, demo_track_document()).expect("fixture write should work");
    let media = temp.path().join("mix.wave");
    write_test_wav(&media, 8_000, 1, 8_000 * 20);

    let session = ExportSession::from_paths(&track_xml, &media, ExportSettings::default())
        .expect("session should build");
    assert_eq!(session.media_extension(), Some("wave"));
    let output_dir = temp.path().join("out");
    let plan = session.plan_outputs(&output_dir, "flac", Some(&media));
    assert_eq!(plan.outputs[0].path, output_dir.join("Guitar_01_0001.wave"));
    assert!(!plan.overwrites_input);
}

#[test]
fn session_from_paths_surfaces_document_errors() {
    let temp = tempdir().expect("tempdir should be creatable");
    let track_xml = temp.path().join("broken.tracks.xml");
    std::fs::write(&track_xml, "<tracklist2><obj class=\"MTempoEvent\">").expect("fixture write should work");
    let media = temp.path().join("mix.wav");
    write_test_wav(&media, 8_000, 1, 8_000);

    let error = ExportSession::from_paths(&track_xml, &media, ExportSettings::default())
        .expect_err("a document without sample rate should fail");
    assert!(matches!(error, SessionError::Document(_)));
}
