use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    diagnostics::Diagnostic,
    media, naming, persistence,
    reader::{self, DocumentError},
    region::RegionDraft,
    walker::Extraction,
};

pub const DEFAULT_OUTSIDE_TOLERANCE_SECONDS: f64 = 0.01;
pub const DEFAULT_OUTPUT_EXTENSION: &str = "wav";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("track document contains no regions")]
    NoRegions,
    #[error("none of the {found} regions end within the media length")]
    NoRegionsInMediaRange { found: usize },
    #[error("invalid setting: {0}")]
    InvalidSetting(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<anyhow::Error> for SessionError {
    fn from(value: anyhow::Error) -> Self {
        Self::Io(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "base")]
pub enum NamingMode {
    /// Names read from the document, deduplicated.
    Document,
    /// `{base}_0001`, `{base}_0002`, .. in start order.
    Fixed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub trailing_time_seconds: f64,
    pub outside_tolerance_seconds: f64,
    pub naming: NamingMode,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            trailing_time_seconds: 0.0,
            outside_tolerance_seconds: DEFAULT_OUTSIDE_TOLERANCE_SECONDS,
            naming: NamingMode::Document,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedOutput {
    pub name: String,
    pub path: PathBuf,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPlan {
    pub outputs: Vec<PlannedOutput>,
    /// Targets that already exist on disk.
    pub existing: Vec<PathBuf>,
    /// Set when a target is the input media file itself.
    pub overwrites_input: bool,
}

impl OutputPlan {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        self.overwrites_input || !self.existing.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedRegion {
    pub name: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub effective_end_seconds: f64,
}

/// User-facing summary of one session, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReport {
    pub session_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub sample_rate: f64,
    pub media_length_seconds: f64,
    pub trailing_time_seconds: f64,
    pub naming: NamingMode,
    pub found: usize,
    pub outside_media_range: usize,
    pub renamed: usize,
    pub dropped: usize,
    pub regions: Vec<ReportedRegion>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
}

/// Regions of one document matched against one media file.
#[derive(Debug, Clone)]
pub struct ExportSession {
    session_id: Uuid,
    regions: Vec<RegionDraft>,
    sample_rate: f64,
    media_length_seconds: f64,
    media_extension: Option<String>,
    settings: ExportSettings,
    found: usize,
    outside_media_range: usize,
    renamed: usize,
    dropped: usize,
    diagnostics: Vec<Diagnostic>,
}

impl ExportSession {
    /// Keeps the regions that end within the media (plus tolerance) and
    /// computes their effective ends.
    #[instrument(skip(extraction, settings), fields(regions = extraction.regions.len(), media_length_seconds))]
    pub fn new(
        extraction: Extraction,
        media_length_seconds: f64,
        settings: ExportSettings,
    ) -> Result<Self, SessionError> {
        validate_seconds("media length", media_length_seconds)?;
        validate_seconds("trailing time", settings.trailing_time_seconds)?;
        validate_seconds("outside tolerance", settings.outside_tolerance_seconds)?;

        let found = extraction.regions.len();
        if found == 0 {
            return Err(SessionError::NoRegions);
        }

        let limit = media_length_seconds + settings.outside_tolerance_seconds;
        let (regions, outside): (Vec<_>, Vec<_>) = extraction
            .regions
            .into_iter()
            .partition(|region| region.end_seconds() <= limit);
        for region in &outside {
            debug!(
                name = region.name(),
                end_seconds = region.end_seconds(),
                "region ends past the media"
            );
        }
        if regions.is_empty() {
            return Err(SessionError::NoRegionsInMediaRange { found });
        }
        if !outside.is_empty() {
            warn!(count = outside.len(), "regions outside the media range skipped");
        }

        let mut session = Self {
            session_id: Uuid::new_v4(),
            regions,
            sample_rate: extraction.sample_rate,
            media_length_seconds,
            media_extension: None,
            settings,
            found,
            outside_media_range: outside.len(),
            renamed: extraction.renamed,
            dropped: extraction.dropped,
            diagnostics: extraction.diagnostics,
        };
        session.apply_effective_ends();
        info!(
            session_id = %session.session_id,
            kept = session.regions.len(),
            outside = session.outside_media_range,
            "export session created"
        );
        Ok(session)
    }

    /// Extracts `track_xml` and measures the media file before building the
    /// session.
    #[instrument(skip(settings), fields(track_xml = %track_xml.display(), media = %media_path.display()))]
    pub fn from_paths(
        track_xml: &Path,
        media_path: &Path,
        settings: ExportSettings,
    ) -> Result<Self, SessionError> {
        let extraction = reader::extract_from_path(track_xml)?;
        let probe = media::probe_media(media_path)?;
        let mut session = Self::new(extraction, probe.length_seconds, settings)?;
        session.set_media_extension(&probe.extension);
        Ok(session)
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    #[must_use]
    pub fn regions(&self) -> &[RegionDraft] {
        &self.regions
    }

    #[must_use]
    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    #[must_use]
    pub fn media_length_seconds(&self) -> f64 {
        self.media_length_seconds
    }

    #[must_use]
    pub fn outside_media_range(&self) -> usize {
        self.outside_media_range
    }

    /// Extension of the measured media file, used for every output.
    #[must_use]
    pub fn media_extension(&self) -> Option<&str> {
        self.media_extension.as_deref()
    }

    /// An empty extension clears the value.
    pub fn set_media_extension(&mut self, extension: &str) {
        let extension = extension.trim().trim_start_matches('.');
        self.media_extension = (!extension.is_empty()).then(|| extension.to_string());
    }

    #[instrument(skip(self), fields(session_id = %self.session_id, seconds))]
    pub fn set_trailing_time(&mut self, seconds: f64) -> Result<(), SessionError> {
        validate_seconds("trailing time", seconds)?;
        self.settings.trailing_time_seconds = seconds;
        self.apply_effective_ends();
        info!("trailing time updated");
        Ok(())
    }

    #[instrument(skip(self), fields(session_id = %self.session_id, naming = ?naming))]
    pub fn set_naming_mode(&mut self, naming: NamingMode) {
        self.settings.naming = naming;
        debug!("naming mode updated");
    }

    /// Output names in region order for the current naming mode.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        match &self.settings.naming {
            NamingMode::Document => self
                .regions
                .iter()
                .map(|region| region.name().to_string())
                .collect(),
            NamingMode::Fixed(base) => naming::fixed_names(base, self.regions.len()),
        }
    }

    /// Plans one output per region. Outputs carry the media file's extension;
    /// `fallback_extension` applies when no media extension is known.
    #[instrument(skip(self, input_path), fields(session_id = %self.session_id, output_dir = %output_dir.display(), fallback_extension))]
    pub fn plan_outputs(
        &self,
        output_dir: &Path,
        fallback_extension: &str,
        input_path: Option<&Path>,
    ) -> OutputPlan {
        let extension = match self.media_extension.as_deref() {
            Some(extension) => extension,
            None => match fallback_extension.trim().trim_start_matches('.') {
                "" => DEFAULT_OUTPUT_EXTENSION,
                trimmed => trimmed,
            },
        };

        let outputs: Vec<PlannedOutput> = self
            .output_names()
            .into_iter()
            .zip(&self.regions)
            .map(|(name, region)| PlannedOutput {
                path: output_dir.join(format!("{name}.{extension}")),
                name,
                start_seconds: region.start_seconds(),
                end_seconds: region
                    .effective_end_seconds()
                    .unwrap_or_else(|| region.end_seconds()),
            })
            .collect();

        let existing: Vec<PathBuf> = outputs
            .iter()
            .filter(|output| output.path.exists())
            .map(|output| output.path.clone())
            .collect();
        let overwrites_input = input_path.is_some_and(|input| {
            outputs
                .iter()
                .any(|output| same_file(&output.path, input))
        });

        if overwrites_input {
            warn!("an output would overwrite the input media");
        }
        if !existing.is_empty() {
            warn!(count = existing.len(), "output files already exist");
        }
        OutputPlan {
            outputs,
            existing,
            overwrites_input,
        }
    }

    #[must_use]
    pub fn report(&self) -> RegionReport {
        let regions = self
            .output_names()
            .into_iter()
            .zip(&self.regions)
            .map(|(name, region)| ReportedRegion {
                name,
                start_seconds: region.start_seconds(),
                end_seconds: region.end_seconds(),
                effective_end_seconds: region
                    .effective_end_seconds()
                    .unwrap_or_else(|| region.end_seconds()),
            })
            .collect();

        RegionReport {
            session_id: self.session_id,
            generated_at: Utc::now(),
            sample_rate: self.sample_rate,
            media_length_seconds: self.media_length_seconds,
            trailing_time_seconds: self.settings.trailing_time_seconds,
            naming: self.settings.naming.clone(),
            found: self.found,
            outside_media_range: self.outside_media_range,
            renamed: self.renamed,
            dropped: self.dropped,
            regions,
            diagnostics: self.diagnostics.clone(),
        }
    }

    #[instrument(skip(self), fields(session_id = %self.session_id, path = %path.display()))]
    pub fn save_report(&self, path: &Path) -> Result<(), SessionError> {
        persistence::save_report(path, &self.report())?;
        Ok(())
    }

    fn apply_effective_ends(&mut self) {
        let trailing = self.settings.trailing_time_seconds;
        let media_length = self.media_length_seconds;
        for region in &mut self.regions {
            region.set_effective_end(trailing, media_length);
        }
    }
}

fn validate_seconds(label: &str, seconds: f64) -> Result<(), SessionError> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(())
    } else {
        Err(SessionError::InvalidSetting(format!(
            "{label} must be a non-negative number of seconds, got {seconds}"
        )))
    }
}

fn same_file(left: &Path, right: &Path) -> bool {
    match (fs::canonicalize(left), fs::canonicalize(right)) {
        (Ok(left), Ok(right)) => left == right,
        _ => left == right,
    }
}
