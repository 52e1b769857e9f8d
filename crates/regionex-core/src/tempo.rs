use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::time::{seconds_to_ticks, ticks_per_second, ticks_to_seconds};

pub const DEFAULT_REHEARSAL_TEMPO: f64 = 120.0;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TempoError {
    #[error("tempo curve has not been finalized")]
    NotFinalized,
    #[error("tempo curve has no tempo points")]
    Empty,
}

/// One break-point of the tempo track.
///
/// `is_ramp` describes how the tempo travels *into* this point from the
/// previous one; it is never consulted on the first point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempoPoint {
    pub tick_position: f64,
    pub bpm: f64,
    pub is_ramp: bool,
    pub seconds_position: f64,
}

/// Piecewise tempo model used to place tick positions in absolute time.
///
/// Points are appended while the document is read and their seconds positions
/// are computed once by [`TempoCurve::finalize`]. Conversions are refused until
/// then. When rehearsal mode is on the curve is flat at the rehearsal tempo and
/// the points are ignored.
#[derive(Debug, Clone, Serialize)]
pub struct TempoCurve {
    points: Vec<TempoPoint>,
    rehearsal_tempo: f64,
    rehearsal_tempo_set: bool,
    use_rehearsal_tempo: bool,
    finalized: bool,
}

impl Default for TempoCurve {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            rehearsal_tempo: DEFAULT_REHEARSAL_TEMPO,
            rehearsal_tempo_set: false,
            use_rehearsal_tempo: false,
            finalized: false,
        }
    }
}

impl TempoCurve {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A finalized curve that runs at `bpm` forever.
    #[must_use]
    pub fn flat(bpm: f64) -> Self {
        Self {
            rehearsal_tempo: bpm,
            rehearsal_tempo_set: true,
            use_rehearsal_tempo: true,
            finalized: true,
            ..Self::default()
        }
    }

    pub fn append_point(&mut self, tick_position: f64, bpm: f64, is_ramp: bool) {
        self.points.push(TempoPoint {
            tick_position,
            bpm,
            is_ramp,
            seconds_position: 0.0,
        });
        self.finalized = false;
    }

    pub fn set_rehearsal_tempo(&mut self, bpm: f64) {
        self.rehearsal_tempo = bpm;
        self.rehearsal_tempo_set = true;
        debug!(bpm, "rehearsal tempo set");
    }

    pub fn set_rehearsal_mode(&mut self, enabled: bool) {
        self.use_rehearsal_tempo = enabled;
        self.finalized = false;
        debug!(enabled, "rehearsal mode set");
    }

    #[must_use]
    pub fn points(&self) -> &[TempoPoint] {
        &self.points
    }

    #[must_use]
    pub fn rehearsal_tempo(&self) -> f64 {
        self.rehearsal_tempo
    }

    #[must_use]
    pub fn has_rehearsal_tempo(&self) -> bool {
        self.rehearsal_tempo_set
    }

    #[must_use]
    pub fn uses_rehearsal_tempo(&self) -> bool {
        self.use_rehearsal_tempo
    }

    #[must_use]
    pub fn is_populated(&self) -> bool {
        self.use_rehearsal_tempo || !self.points.is_empty()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.finalized && self.is_populated()
    }

    /// Computes every point's seconds position in one forward pass.
    ///
    /// Points are stably ordered by tick position first. The first point sits
    /// at zero seconds regardless of its tick position.
    #[instrument(skip(self), fields(points = self.points.len(), rehearsal = self.use_rehearsal_tempo))]
    pub fn finalize(&mut self) -> Result<(), TempoError> {
        if self.use_rehearsal_tempo {
            self.finalized = true;
            return Ok(());
        }
        if self.points.is_empty() {
            return Err(TempoError::Empty);
        }

        self.points
            .sort_by(|left, right| left.tick_position.total_cmp(&right.tick_position));

        if self.points[0].tick_position != 0.0 {
            warn!(
                tick_position = self.points[0].tick_position,
                "first tempo point is not at tick zero"
            );
        }
        self.points[0].seconds_position = 0.0;
        for index in 1..self.points.len() {
            let previous = self.points[index - 1];
            let point = self.points[index];
            self.points[index].seconds_position =
                previous.seconds_position + segment_seconds(&previous, &point);
        }

        self.finalized = true;
        debug!("tempo curve finalized");
        Ok(())
    }

    pub fn position_to_seconds(&self, tick_position: f64) -> Result<f64, TempoError> {
        self.ensure_ready()?;
        if self.use_rehearsal_tempo {
            return Ok(ticks_to_seconds(tick_position, self.rehearsal_tempo));
        }

        let later = self
            .points
            .iter()
            .position(|point| point.tick_position > tick_position);
        let seconds = match later {
            None => {
                let last = self.last_point()?;
                last.seconds_position
                    + ticks_to_seconds(tick_position - last.tick_position, last.bpm)
            }
            Some(0) => {
                let first = &self.points[0];
                first.seconds_position
                    + ticks_to_seconds(tick_position - first.tick_position, first.bpm)
            }
            Some(index) => {
                let from = &self.points[index - 1];
                let to = &self.points[index];
                from.seconds_position
                    + offset_seconds(from, to, tick_position - from.tick_position)
            }
        };
        Ok(seconds)
    }

    /// Duration of `tick_length` ticks starting at `start_tick_position`.
    pub fn length_to_seconds(
        &self,
        tick_length: f64,
        start_tick_position: f64,
    ) -> Result<f64, TempoError> {
        Ok(self.position_to_seconds(start_tick_position + tick_length)?
            - self.position_to_seconds(start_tick_position)?)
    }

    /// Inverse of [`TempoCurve::position_to_seconds`].
    pub fn seconds_to_position(&self, seconds: f64) -> Result<f64, TempoError> {
        self.ensure_ready()?;
        if self.use_rehearsal_tempo {
            return Ok(seconds_to_ticks(seconds, self.rehearsal_tempo));
        }

        let later = self
            .points
            .iter()
            .position(|point| point.seconds_position > seconds);
        let ticks = match later {
            None => {
                let last = self.last_point()?;
                last.tick_position + seconds_to_ticks(seconds - last.seconds_position, last.bpm)
            }
            Some(0) => {
                let first = &self.points[0];
                first.tick_position
                    + seconds_to_ticks(seconds - first.seconds_position, first.bpm)
            }
            Some(index) => {
                let from = &self.points[index - 1];
                let to = &self.points[index];
                from.tick_position + offset_ticks(from, to, seconds - from.seconds_position)
            }
        };
        Ok(ticks)
    }

    fn ensure_ready(&self) -> Result<(), TempoError> {
        if !self.finalized {
            return Err(TempoError::NotFinalized);
        }
        if !self.is_populated() {
            return Err(TempoError::Empty);
        }
        Ok(())
    }

    fn last_point(&self) -> Result<&TempoPoint, TempoError> {
        self.points.last().ok_or(TempoError::Empty)
    }
}

/// Seconds between two consecutive points.
///
/// A ramp follows `v(t) = v0 * e^(b*t)`, so covering `Δticks` takes
/// `ln(v/v0) * Δticks / (v - v0)`. Equal end tempos use the jump formula.
#[allow(clippy::float_cmp)]
fn segment_seconds(previous: &TempoPoint, point: &TempoPoint) -> f64 {
    let delta_ticks = point.tick_position - previous.tick_position;
    let v0 = ticks_per_second(previous.bpm);
    if point.is_ramp {
        let v = ticks_per_second(point.bpm);
        if v != v0 {
            return (v / v0).ln() * delta_ticks / (v - v0);
        }
    }
    delta_ticks / v0
}

#[allow(clippy::float_cmp)]
fn offset_seconds(from: &TempoPoint, to: &TempoPoint, delta_ticks: f64) -> f64 {
    if delta_ticks <= 0.0 {
        return 0.0;
    }
    let v0 = ticks_per_second(from.bpm);
    if to.is_ramp {
        let v = ticks_per_second(to.bpm);
        if v != v0 {
            let b = (v - v0) / (to.tick_position - from.tick_position);
            return ((b * delta_ticks + v0) / v0).ln() / b;
        }
    }
    delta_ticks / v0
}

#[allow(clippy::float_cmp)]
fn offset_ticks(from: &TempoPoint, to: &TempoPoint, delta_seconds: f64) -> f64 {
    if delta_seconds <= 0.0 {
        return 0.0;
    }
    let v0 = ticks_per_second(from.bpm);
    if to.is_ramp {
        let v = ticks_per_second(to.bpm);
        if v != v0 {
            let b = (v - v0) / (to.tick_position - from.tick_position);
            return v0 * ((b * delta_seconds).exp() - 1.0) / b;
        }
    }
    delta_seconds * v0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_require_finalize() {
        let mut curve = TempoCurve::new();
        curve.append_point(0.0, 120.0, false);
        assert_eq!(
            curve.position_to_seconds(960.0),
            Err(TempoError::NotFinalized)
        );
        curve.finalize().expect("finalize should succeed");
        assert!(curve.is_ready());
    }

    #[test]
    fn empty_curve_cannot_finalize() {
        let mut curve = TempoCurve::new();
        assert_eq!(curve.finalize(), Err(TempoError::Empty));
        assert!(!curve.is_ready());
    }

    #[test]
    fn rehearsal_mode_ignores_points() {
        let mut curve = TempoCurve::new();
        curve.append_point(0.0, 60.0, false);
        curve.set_rehearsal_tempo(120.0);
        curve.set_rehearsal_mode(true);
        curve.finalize().expect("finalize should succeed");
        let seconds = curve.position_to_seconds(1_920.0).expect("curve is ready");
        assert!((seconds - 2.0).abs() < 1e-12);
    }

    #[test]
    fn appending_after_finalize_requires_another_pass() {
        let mut curve = TempoCurve::new();
        curve.append_point(0.0, 120.0, false);
        curve.finalize().expect("finalize should succeed");
        curve.append_point(960.0, 60.0, false);
        assert_eq!(curve.position_to_seconds(0.0), Err(TempoError::NotFinalized));
    }

    #[test]
    fn points_are_ordered_before_seconds_are_computed() {
        let mut curve = TempoCurve::new();
        curve.append_point(1_920.0, 60.0, false);
        curve.append_point(0.0, 120.0, false);
        curve.finalize().expect("finalize should succeed");
        let points = curve.points();
        assert_eq!(points[0].tick_position, 0.0);
        assert_eq!(points[0].seconds_position, 0.0);
        assert!((points[1].seconds_position - 2.0).abs() < 1e-12);
    }

    #[test]
    fn equal_tempo_ramp_falls_back_to_linear() {
        let mut curve = TempoCurve::new();
        curve.append_point(0.0, 90.0, false);
        curve.append_point(1_440.0, 90.0, true);
        curve.finalize().expect("finalize should succeed");
        let midway = curve.position_to_seconds(720.0).expect("curve is ready");
        assert!((midway - 1.0).abs() < 1e-12);
        assert!((curve.points()[1].seconds_position - 2.0).abs() < 1e-12);
    }
}
