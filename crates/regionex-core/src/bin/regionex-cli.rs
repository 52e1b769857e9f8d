use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use regionex_core::{
    AppConfig, ExportSession, NamingMode,
    diagnostics::init_tracing_with_options,
    fixtures::{DEMO_MEDIA_LENGTH_SECONDS, demo_track_document},
    persistence::save_report,
    probe_media, read_document_str,
    reader::extract_from_path,
};
use serde_json::json;

#[derive(Debug, Parser)]
#[command(name = "regionex-cli")]
#[command(about = "Extracts named time regions from exported track documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Overrides the configured log directory.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Reads configuration from this file instead of discovering it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Prints the regions of a track document as JSON.
    Inspect {
        #[arg(long)]
        track_xml: PathBuf,
    },
    /// Matches a track document against media and plans the outputs.
    Extract(ExtractArgs),
    /// Writes the bundled demo document and its report.
    Demo {
        #[arg(long, default_value = "data/demo")]
        output_dir: PathBuf,
    },
}

#[derive(Debug, Args)]
struct ExtractArgs {
    #[arg(long)]
    track_xml: PathBuf,

    #[arg(long, conflicts_with = "media_length", required_unless_present = "media_length")]
    media: Option<PathBuf>,

    #[arg(long)]
    media_length: Option<f64>,

    #[arg(long)]
    trailing_time: Option<f64>,

    #[arg(long)]
    fixed_name: Option<String>,

    #[arg(long, default_value = "data/regions")]
    output_dir: PathBuf,

    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, discovered) = load_config(cli.config.as_deref())?;
    let log_dir = cli
        .log_dir
        .clone()
        .unwrap_or_else(|| config.diagnostics.logs_dir.clone());
    let _telemetry = init_tracing_with_options(
        &log_dir,
        &config.diagnostics.trace_file_prefix,
        &config.diagnostics.rust_log_filter,
    )?;
    if !discovered {
        tracing::info!("no config file found, using defaults");
    }

    match cli.command {
        Commands::Inspect { track_xml } => {
            let extraction = extract_from_path(&track_xml)?;
            let output = json!({
                "sample_rate": extraction.sample_rate,
                "renamed": extraction.renamed,
                "dropped": extraction.dropped,
                "regions": extraction.records(),
                "diagnostics": extraction.diagnostics,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Extract(args) => run_extract(&config, args)?,
        Commands::Demo { output_dir } => {
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("failed to create {}", output_dir.display()))?;
            let document_path = output_dir.join("demo.tracks.xml");
            std::fs::write(&document_path, demo_track_document())
                .with_context(|| format!("failed to write {}", document_path.display()))?;

            let extraction = read_document_str(demo_track_document())?;
            let session = ExportSession::new(
                extraction,
                DEMO_MEDIA_LENGTH_SECONDS,
                config.export.settings(),
            )?;
            let report_path = output_dir.join("demo.report.json");
            save_report(&report_path, &session.report())?;
            tracing::info!(
                document = %document_path.display(),
                report = %report_path.display(),
                "demo written"
            );
        }
    }

    Ok(())
}

fn run_extract(config: &AppConfig, args: ExtractArgs) -> anyhow::Result<()> {
    let mut settings = config.export.settings();
    if let Some(trailing_time) = args.trailing_time {
        settings.trailing_time_seconds = trailing_time;
    }
    if let Some(base) = args.fixed_name {
        settings.naming = NamingMode::Fixed(base);
    }

    let probe = args.media.as_deref().map(probe_media).transpose()?;
    let media_length = match (&probe, args.media_length) {
        (Some(probe), _) => probe.length_seconds,
        (None, Some(length)) => length,
        (None, None) => anyhow::bail!("either --media or --media-length is required"),
    };

    let extraction = extract_from_path(&args.track_xml)?;
    let mut session = ExportSession::new(extraction, media_length, settings)?;
    if let Some(probe) = &probe {
        session.set_media_extension(&probe.extension);
    }
    let report = session.report();
    tracing::info!(
        found = report.found,
        outside_media_range = report.outside_media_range,
        renamed = report.renamed,
        dropped = report.dropped,
        "regions extracted"
    );

    let plan = session.plan_outputs(
        &args.output_dir,
        &config.export.output_extension,
        args.media.as_deref(),
    );
    if let Some(report_path) = &args.report {
        save_report(report_path, &report)?;
    }
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

/// Returns the config and whether a file was actually read.
fn load_config(explicit: Option<&Path>) -> anyhow::Result<(AppConfig, bool)> {
    if let Some(path) = explicit {
        return Ok((AppConfig::load_from(path)?, true));
    }
    Ok(AppConfig::load().map_or_else(|_| (AppConfig::default(), false), |config| (config, true)))
}
