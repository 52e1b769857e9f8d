pub mod config;
pub mod diagnostics;
pub mod fixtures;
pub mod media;
pub mod naming;
pub mod persistence;
pub mod reader;
pub mod region;
pub mod session;
pub mod tempo;
pub mod time;
pub mod walker;

pub use config::AppConfig;
pub use diagnostics::{Diagnostic, TelemetryGuard, init_tracing, init_tracing_with_options};
pub use media::{MediaProbe, probe_media};
pub use naming::resolve_names;
pub use reader::{DocumentError, extract_from_path, read_document, read_document_str};
pub use region::{Region, RegionDraft, RegionSource, RegionStatus, ResolveError};
pub use session::{
    ExportSession, ExportSettings, NamingMode, OutputPlan, PlannedOutput, RegionReport,
    SessionError,
};
pub use tempo::{TempoCurve, TempoError, TempoPoint};
pub use time::{TemporalValue, TimeUnit};
pub use walker::{
    DocumentWalker, Effect, Extraction, ParseEvent, WalkError, WalkerState, extract_regions,
};
