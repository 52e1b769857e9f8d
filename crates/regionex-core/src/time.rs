use std::fmt;

use serde::{Deserialize, Serialize};

/// Ticks that elapse per second for every beat-per-minute of tempo.
///
/// At 120 BPM the timeline advances 960 ticks a second (480 per quarter note).
pub const TICKS_PER_SECOND_PER_BPM: f64 = 8.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Unset,
    Seconds,
    MidiTicks,
    Samples,
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unset => "unset",
            Self::Seconds => "seconds",
            Self::MidiTicks => "midi ticks",
            Self::Samples => "samples",
        };
        f.write_str(label)
    }
}

/// A position or duration tagged with the unit it was read in.
///
/// A value whose unit is [`TimeUnit::Unset`] has not been supplied and must
/// never take part in arithmetic; [`TemporalValue::is_set`] guards that.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalValue {
    pub magnitude: f64,
    pub unit: TimeUnit,
}

impl TemporalValue {
    pub const UNSET: Self = Self {
        magnitude: 0.0,
        unit: TimeUnit::Unset,
    };

    #[must_use]
    pub fn new(magnitude: f64, unit: TimeUnit) -> Self {
        Self { magnitude, unit }
    }

    #[must_use]
    pub fn seconds(magnitude: f64) -> Self {
        Self::new(magnitude, TimeUnit::Seconds)
    }

    #[must_use]
    pub fn ticks(magnitude: f64) -> Self {
        Self::new(magnitude, TimeUnit::MidiTicks)
    }

    #[must_use]
    pub fn samples(magnitude: f64) -> Self {
        Self::new(magnitude, TimeUnit::Samples)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.unit != TimeUnit::Unset
    }
}

/// Parses a decimal the way the document stores it: `.` as separator, no
/// grouping, independent of the host locale.
#[must_use]
pub fn parse_decimal(text: &str) -> Option<f64> {
    let value = text.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

#[must_use]
pub fn parse_integer(text: &str) -> Option<i64> {
    text.trim().parse::<i64>().ok()
}

#[must_use]
pub fn ticks_per_second(bpm: f64) -> f64 {
    bpm * TICKS_PER_SECOND_PER_BPM
}

/// Converts ticks to seconds at a constant tempo.
#[must_use]
pub fn ticks_to_seconds(ticks: f64, bpm: f64) -> f64 {
    ticks / ticks_per_second(bpm)
}

#[must_use]
pub fn seconds_to_ticks(seconds: f64, bpm: f64) -> f64 {
    seconds * ticks_per_second(bpm)
}

#[must_use]
pub fn samples_to_seconds(samples: f64, sample_rate: f64) -> f64 {
    samples / sample_rate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_tick_round_trip_is_stable() {
        let bpm = 128.0;
        let ticks = 9_876.0;
        let seconds = ticks_to_seconds(ticks, bpm);
        let restored = seconds_to_ticks(seconds, bpm);
        assert!((ticks - restored).abs() < 1e-9);
    }

    #[test]
    fn one_beat_at_120_bpm_is_half_a_second() {
        assert!((ticks_to_seconds(480.0, 120.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn decimals_parse_independent_of_locale() {
        assert_eq!(parse_decimal("48000"), Some(48_000.0));
        assert_eq!(parse_decimal(" 1920.5 "), Some(1_920.5));
        assert_eq!(parse_decimal("1920,5"), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn unset_values_report_unset() {
        assert!(!TemporalValue::UNSET.is_set());
        assert!(TemporalValue::samples(96_000.0).is_set());
    }
}
