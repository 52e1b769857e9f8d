use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    tempo::{TempoCurve, TempoError},
    time::{TemporalValue, TimeUnit, samples_to_seconds},
};

pub const UNTITLED_REGION_NAME: &str = "untitled";

const FILE_NAME_HOSTILE: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// The document element a region was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSource {
    AudioEvent,
    AudioPartEvent,
    RangeMarkerEvent,
    MidiPartEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionStatus {
    Incomplete,
    Resolved,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionField {
    Start,
    Length,
}

#[derive(Debug, Error, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveError {
    #[error("region has no start value")]
    MissingStart,
    #[error("region has no length value")]
    MissingLength,
    #[error("malformed {field:?} value: {text:?}")]
    MalformedValue { field: RegionField, text: String },
    #[error("length is in midi ticks but start is in {start_unit}")]
    TickLengthWithoutTickStart { start_unit: TimeUnit },
    #[error("length is in seconds but start is in midi ticks")]
    SecondsLengthWithTickStart,
    #[error("sample rate is required to resolve sample values")]
    MissingSampleRate,
    #[error("region ends before it starts ({start_seconds}s..{end_seconds}s)")]
    NegativeLength {
        start_seconds: f64,
        end_seconds: f64,
    },
    #[error("region time is out of range ({start_seconds}s..{end_seconds}s)")]
    NonFinite {
        start_seconds: f64,
        end_seconds: f64,
    },
    #[error("tempo curve: {0}")]
    Tempo(#[from] TempoError),
}

/// A finalized region handed to the orchestration layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

/// One region while it is being read and after it has been placed in time.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionDraft {
    source: RegionSource,
    start_value: TemporalValue,
    length_value: TemporalValue,
    start_seconds: f64,
    end_seconds: f64,
    effective_end_seconds: Option<f64>,
    name: String,
    name_is_explicit: bool,
    status: RegionStatus,
    rejection: Option<ResolveError>,
}

impl RegionDraft {
    #[must_use]
    pub fn new(source: RegionSource) -> Self {
        Self {
            source,
            start_value: TemporalValue::UNSET,
            length_value: TemporalValue::UNSET,
            start_seconds: 0.0,
            end_seconds: 0.0,
            effective_end_seconds: None,
            name: UNTITLED_REGION_NAME.to_string(),
            name_is_explicit: false,
            status: RegionStatus::Incomplete,
            rejection: None,
        }
    }

    #[must_use]
    pub fn source(&self) -> RegionSource {
        self.source
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn name_is_explicit(&self) -> bool {
        self.name_is_explicit
    }

    #[must_use]
    pub fn status(&self) -> RegionStatus {
        self.status
    }

    #[must_use]
    pub fn start_value(&self) -> TemporalValue {
        self.start_value
    }

    #[must_use]
    pub fn length_value(&self) -> TemporalValue {
        self.length_value
    }

    #[must_use]
    pub fn start_seconds(&self) -> f64 {
        self.start_seconds
    }

    #[must_use]
    pub fn end_seconds(&self) -> f64 {
        self.end_seconds
    }

    #[must_use]
    pub fn effective_end_seconds(&self) -> Option<f64> {
        self.effective_end_seconds
    }

    pub fn set_start_value(&mut self, value: TemporalValue) {
        self.start_value = value;
    }

    pub fn set_length_value(&mut self, value: TemporalValue) {
        self.length_value = value;
    }

    /// Sets the name read from the element's own description.
    pub fn set_name(&mut self, name: &str) {
        self.name = sanitize_file_name(name);
        self.name_is_explicit = true;
    }

    /// Sets the clip name, unless the element already named itself.
    pub fn set_fallback_name(&mut self, name: &str) {
        if !self.name_is_explicit {
            self.name = sanitize_file_name(name);
        }
    }

    /// Replaces the name without touching the explicit flag.
    pub fn rename(&mut self, name: &str) {
        self.name = sanitize_file_name(name);
    }

    /// Records a defect found while reading; resolution will fail with it.
    pub fn reject(&mut self, error: ResolveError) {
        if self.rejection.is_none() {
            self.rejection = Some(error);
        }
    }

    /// Places the region in absolute time.
    ///
    /// On failure the draft is marked [`RegionStatus::Invalid`] and the reason
    /// is returned.
    pub fn resolve(
        &mut self,
        sample_rate: Option<f64>,
        tempo_curve: &TempoCurve,
    ) -> Result<(), ResolveError> {
        match self.compute_bounds(sample_rate, tempo_curve) {
            Ok((start_seconds, end_seconds)) => {
                self.start_seconds = start_seconds;
                self.end_seconds = end_seconds;
                self.status = RegionStatus::Resolved;
                Ok(())
            }
            Err(error) => {
                self.status = RegionStatus::Invalid;
                Err(error)
            }
        }
    }

    fn compute_bounds(
        &self,
        sample_rate: Option<f64>,
        tempo_curve: &TempoCurve,
    ) -> Result<(f64, f64), ResolveError> {
        if let Some(rejection) = &self.rejection {
            return Err(rejection.clone());
        }
        if !self.start_value.is_set() {
            return Err(ResolveError::MissingStart);
        }
        if !self.length_value.is_set() {
            return Err(ResolveError::MissingLength);
        }

        let start = self.start_value;
        let length = self.length_value;
        let start_seconds = match start.unit {
            TimeUnit::Seconds => start.magnitude,
            TimeUnit::MidiTicks => tempo_curve.position_to_seconds(start.magnitude)?,
            TimeUnit::Samples => samples_to_seconds(start.magnitude, require_rate(sample_rate)?),
            TimeUnit::Unset => return Err(ResolveError::MissingStart),
        };
        let length_seconds = match length.unit {
            TimeUnit::Seconds => {
                if start.unit == TimeUnit::MidiTicks {
                    return Err(ResolveError::SecondsLengthWithTickStart);
                }
                length.magnitude
            }
            TimeUnit::MidiTicks => {
                if start.unit != TimeUnit::MidiTicks {
                    return Err(ResolveError::TickLengthWithoutTickStart {
                        start_unit: start.unit,
                    });
                }
                tempo_curve.length_to_seconds(length.magnitude, start.magnitude)?
            }
            TimeUnit::Samples => {
                samples_to_seconds(length.magnitude, require_rate(sample_rate)?)
            }
            TimeUnit::Unset => return Err(ResolveError::MissingLength),
        };

        let end_seconds = start_seconds + length_seconds;
        if !start_seconds.is_finite() || !end_seconds.is_finite() {
            return Err(ResolveError::NonFinite {
                start_seconds,
                end_seconds,
            });
        }
        if end_seconds < start_seconds {
            return Err(ResolveError::NegativeLength {
                start_seconds,
                end_seconds,
            });
        }
        Ok((start_seconds, end_seconds))
    }

    /// Applies trailing time and clamps to the media length.
    ///
    /// The result never precedes the start, whatever the inputs.
    pub fn set_effective_end(
        &mut self,
        trailing_time_seconds: f64,
        media_length_seconds: f64,
    ) -> f64 {
        let effective_end = effective_end_seconds(
            self.start_seconds,
            self.end_seconds,
            trailing_time_seconds,
            media_length_seconds,
        );
        self.effective_end_seconds = Some(effective_end);
        effective_end
    }

    #[must_use]
    pub fn to_region(&self) -> Region {
        Region {
            name: self.name.clone(),
            start_seconds: self.start_seconds,
            end_seconds: self.end_seconds,
        }
    }
}

fn require_rate(sample_rate: Option<f64>) -> Result<f64, ResolveError> {
    sample_rate
        .filter(|rate| *rate > 0.0)
        .ok_or(ResolveError::MissingSampleRate)
}

/// `min(end + trailing, media_length)`, floored at `start`.
#[must_use]
pub fn effective_end_seconds(
    start_seconds: f64,
    end_seconds: f64,
    trailing_time_seconds: f64,
    media_length_seconds: f64,
) -> f64 {
    (end_seconds + trailing_time_seconds.max(0.0))
        .min(media_length_seconds)
        .max(start_seconds)
}

/// Replaces characters that cannot appear in a file name with `_`.
#[must_use]
pub fn sanitize_file_name(input: &str) -> String {
    input
        .chars()
        .map(|character| {
            if FILE_NAME_HOSTILE.contains(&character) {
                '_'
            } else {
                character
            }
        })
        .collect()
}
