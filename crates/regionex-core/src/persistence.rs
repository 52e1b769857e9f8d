use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::session::RegionReport;

#[instrument(skip(report), fields(session_id = %report.session_id, path = %path.display()))]
pub fn save_report(path: &Path, report: &RegionReport) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(report).context("failed to serialize region report")?;
    let mut temp_file = tempfile::NamedTempFile::new_in(
        path.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf),
    )
    .context("failed to create temp report file")?;

    temp_file
        .write_all(&json)
        .context("failed to write temp report file")?;
    temp_file
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to persist report: {}", path.display()))?;

    info!(regions = report.regions.len(), "region report saved");
    Ok(())
}

#[instrument(fields(path = %path.display()))]
pub fn load_report(path: &Path) -> Result<RegionReport> {
    let content =
        fs::read(path).with_context(|| format!("failed to read report: {}", path.display()))?;
    let report: RegionReport =
        serde_json::from_slice(&content).context("invalid region report json")?;
    info!(session_id = %report.session_id, "region report loaded");
    Ok(report)
}
