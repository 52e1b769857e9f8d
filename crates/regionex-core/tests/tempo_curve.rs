use proptest::prelude::*;
use regionex_core::{
    TempoCurve, TempoError,
    time::{TICKS_PER_SECOND_PER_BPM, ticks_to_seconds},
};

fn finalized(points: &[(f64, f64, bool)]) -> TempoCurve {
    let mut curve = TempoCurve::new();
    for &(tick_position, bpm, is_ramp) in points {
        curve.append_point(tick_position, bpm, is_ramp);
    }
    curve.finalize().expect("curve should finalize");
    curve
}

fn seconds(curve: &TempoCurve, tick_position: f64) -> f64 {
    curve
        .position_to_seconds(tick_position)
        .expect("curve should be ready")
}

fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

/// Midpoint integration of `1 / v(tick)` over `[from, to]`.
fn integrate_ramp(v0: f64, slope: f64, from: f64, to: f64) -> f64 {
    let steps = 20_000;
    let width = (to - from) / f64::from(steps);
    (0..steps)
        .map(|step| {
            let tick = from + (f64::from(step) + 0.5) * width;
            width / (v0 + slope * tick)
        })
        .sum()
}

#[test]
fn jump_changes_tempo_at_the_point() {
    let curve = finalized(&[(0.0, 120.0, false), (7_680.0, 60.0, false)]);
    assert_close(seconds(&curve, 1_920.0), 2.0, 1e-12);
    assert_close(seconds(&curve, 7_680.0), 8.0, 1e-12);
    assert_close(seconds(&curve, 8_640.0), 10.0, 1e-12);
    assert_close(
        curve
            .length_to_seconds(960.0, 7_680.0)
            .expect("curve should be ready"),
        2.0,
        1e-12,
    );
}

#[test]
fn ramp_segment_matches_numeric_integration() {
    let curve = finalized(&[(0.0, 120.0, false), (1_920.0, 240.0, true)]);
    let v0 = 120.0 * TICKS_PER_SECOND_PER_BPM;
    let v = 240.0 * TICKS_PER_SECOND_PER_BPM;
    let slope = (v - v0) / 1_920.0;

    assert_close(
        curve.points()[1].seconds_position,
        (v / v0).ln() * 1_920.0 / (v - v0),
        1e-12,
    );
    for target in [240.0, 960.0, 1_700.0] {
        assert_close(
            seconds(&curve, target),
            integrate_ramp(v0, slope, 0.0, target),
            1e-7,
        );
    }
}

#[test]
fn same_tempo_jump_keeps_the_flat_rate() {
    let curve = finalized(&[(0.0, 120.0, false), (960.0, 120.0, false)]);
    let at_point = seconds(&curve, 960.0);
    let after = seconds(&curve, 1_920.0);
    assert_close(at_point, 1.0, 1e-12);
    assert_close(
        after,
        at_point + ticks_to_seconds(960.0, 120.0),
        1e-12,
    );
    assert_close(after, 2.0, 1e-12);
}

#[test]
fn ramp_length_from_its_start_is_logarithmic() {
    let curve = finalized(&[(0.0, 120.0, false), (960.0, 240.0, true)]);
    let length = curve
        .length_to_seconds(960.0, 0.0)
        .expect("curve should be ready");
    assert_close(length, std::f64::consts::LN_2, 1e-12);
    assert_close(seconds(&curve, 960.0), std::f64::consts::LN_2, 1e-12);
}

#[test]
fn positions_past_the_last_point_run_at_its_tempo() {
    let curve = finalized(&[(0.0, 120.0, false), (1_920.0, 240.0, true)]);
    let end_of_ramp = curve.points()[1].seconds_position;
    assert_close(
        seconds(&curve, 3_840.0),
        end_of_ramp + ticks_to_seconds(1_920.0, 240.0),
        1e-12,
    );
}

#[test]
fn positions_before_the_first_point_extrapolate_backwards() {
    let curve = finalized(&[(960.0, 120.0, false), (1_920.0, 60.0, false)]);
    assert_close(seconds(&curve, 960.0), 0.0, 1e-12);
    assert_close(seconds(&curve, 0.0), -1.0, 1e-12);
}

#[test]
fn inverse_requires_finalize() {
    let mut curve = TempoCurve::new();
    curve.append_point(0.0, 120.0, false);
    assert_eq!(curve.seconds_to_position(1.0), Err(TempoError::NotFinalized));
}

#[test]
fn flat_curve_inverts_exactly() {
    let curve = TempoCurve::flat(96.0);
    assert_close(
        curve
            .seconds_to_position(2.5)
            .expect("flat curve is always ready"),
        2.5 * 96.0 * TICKS_PER_SECOND_PER_BPM,
        1e-9,
    );
}

fn curve_points() -> impl Strategy<Value = Vec<(f64, f64, bool)>> {
    (
        20.0_f64..300.0,
        prop::collection::vec((1.0_f64..8_000.0, 20.0_f64..300.0, any::<bool>()), 0..6),
    )
        .prop_map(|(first_bpm, rest)| {
            let mut tick_position = 0.0;
            let mut points = vec![(0.0, first_bpm, false)];
            for (delta, bpm, is_ramp) in rest {
                tick_position += delta;
                points.push((tick_position, bpm, is_ramp));
            }
            points
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn flat_tempo_is_linear(bpm in 20.0_f64..300.0, ticks in 0.0_f64..1.0e6) {
        let curve = finalized(&[(0.0, bpm, false)]);
        let expected = ticks / (bpm * TICKS_PER_SECOND_PER_BPM);
        prop_assert!((seconds(&curve, ticks) - expected).abs() <= 1e-9 * expected.max(1.0));
    }

    #[test]
    fn seconds_grow_with_ticks(points in curve_points(), a in 0.0_f64..50_000.0, b in 0.0_f64..50_000.0) {
        let curve = finalized(&points);
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(seconds(&curve, low) <= seconds(&curve, high) + 1e-9);
    }

    #[test]
    fn inverse_round_trips(points in curve_points(), ticks in 0.0_f64..50_000.0) {
        let curve = finalized(&points);
        let restored = curve
            .seconds_to_position(seconds(&curve, ticks))
            .expect("curve should be ready");
        prop_assert!((restored - ticks).abs() <= 1e-6 * ticks.max(1.0));
    }

    #[test]
    fn lengths_add_up(points in curve_points(), start in 0.0_f64..20_000.0, first in 0.0_f64..10_000.0, second in 0.0_f64..10_000.0) {
        let curve = finalized(&points);
        let whole = curve.length_to_seconds(first + second, start).expect("curve should be ready");
        let split = curve.length_to_seconds(first, start).expect("curve should be ready")
            + curve.length_to_seconds(second, start + first).expect("curve should be ready");
        prop_assert!((whole - split).abs() <= 1e-9 * whole.max(1.0));
    }
}
