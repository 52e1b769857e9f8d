use std::{fs, path::Path};

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use crate::{region::ResolveError, walker::ContentKind};

pub const DEFAULT_LOG_FILTER: &str = "info,regionex_core=debug";
pub const DEFAULT_TRACE_FILE_PREFIX: &str = "regionex";

/// Something the walker noticed and stepped over.
///
/// None of these abort a walk; they are returned to the caller alongside the
/// extracted regions and mirrored to `tracing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Diagnostic {
    ContentOutsideTrack {
        content: ContentKind,
    },
    DuplicateClipId {
        id: String,
    },
    MalformedNumber {
        field: String,
        text: String,
    },
    IncompleteTempoPoint {
        bpm: Option<f64>,
        tick_position: Option<f64>,
    },
    FirstTempoPointNotAtZero {
        tick_position: f64,
    },
    RehearsalTempoDefaulted {
        bpm: f64,
    },
    UnterminatedElement {
        content: ContentKind,
    },
    RegionDropped {
        index: usize,
        name: String,
        reason: String,
    },
}

impl Diagnostic {
    #[must_use]
    pub fn region_dropped(index: usize, name: &str, reason: &ResolveError) -> Self {
        Self::RegionDropped {
            index,
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the anomaly loses data the user would expect to see.
    #[must_use]
    pub fn is_lossy(&self) -> bool {
        matches!(
            self,
            Self::IncompleteTempoPoint { .. }
                | Self::UnterminatedElement { .. }
                | Self::RegionDropped { .. }
        )
    }

    pub fn trace(&self) {
        if self.is_lossy() {
            warn!(diagnostic = ?self, "document anomaly");
        } else {
            debug!(diagnostic = ?self, "document anomaly");
        }
    }
}

pub struct TelemetryGuard {
    pub session_id: Uuid,
    _file_guard: WorkerGuard,
}

pub fn init_tracing(log_dir: impl AsRef<Path>) -> anyhow::Result<TelemetryGuard> {
    init_tracing_with_options(log_dir, DEFAULT_TRACE_FILE_PREFIX, DEFAULT_LOG_FILTER)
}

pub fn init_tracing_with_options(
    log_dir: impl AsRef<Path>,
    file_prefix: &str,
    default_filter: &str,
) -> anyhow::Result<TelemetryGuard> {
    let log_dir = log_dir.as_ref();
    fs::create_dir_all(log_dir)
        .with_context(|| format!("failed to create log directory: {}", log_dir.display()))?;

    let session_id = Uuid::new_v4();
    let timestamp = Utc::now().format("%Y%m%d-%H%M%S");
    let file_name = format!("{file_prefix}-{timestamp}.log");
    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(file_writer);

    if let Err(error) = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
    {
        warn!(?error, "global tracing subscriber already initialized");
    } else {
        info!(%session_id, "tracing initialized");
    }

    Ok(TelemetryGuard {
        session_id,
        _file_guard: file_guard,
    })
}
