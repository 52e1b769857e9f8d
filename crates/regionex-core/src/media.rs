use std::{fs::File, io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use symphonia::core::{
    errors::Error as SymphoniaError, formats::FormatOptions, io::MediaSourceStream,
    meta::MetadataOptions, probe::Hint,
};
use tracing::{debug, instrument};

/// Length and layout of an audio file, measured without decoding it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaProbe {
    pub source_path: String,
    pub extension: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub total_frames: u64,
    pub length_seconds: f64,
}

#[instrument(fields(path = %path.display()))]
pub fn probe_media(path: &Path) -> Result<MediaProbe> {
    let file = File::open(path)
        .with_context(|| format!("failed to open media file: {}", path.display()))?;
    let source = MediaSourceStream::new(Box::new(file), Default::default());

    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut hint = Hint::new();
    if !extension.is_empty() {
        hint.with_extension(&extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .with_context(|| format!("unsupported media format: {}", path.display()))?;
    let mut format = probed.format;
    let track = format
        .default_track()
        .ok_or_else(|| anyhow::anyhow!("no default audio track found in {}", path.display()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .filter(|rate| *rate > 0)
        .ok_or_else(|| anyhow::anyhow!("media has no sample rate: {}", path.display()))?;
    let channels = track
        .codec_params
        .channels
        .map_or(0, |value| u16::try_from(value.count()).unwrap_or(u16::MAX));

    let total_frames = match track.codec_params.n_frames {
        Some(frames) => frames,
        None => {
            debug!("container has no frame count, summing packet durations");
            let mut frames = 0_u64;
            loop {
                let packet = match format.next_packet() {
                    Ok(packet) => packet,
                    Err(SymphoniaError::IoError(error))
                        if error.kind() == ErrorKind::UnexpectedEof =>
                    {
                        break;
                    }
                    Err(error) => {
                        return Err(error).with_context(|| {
                            format!("failed to read media packets: {}", path.display())
                        });
                    }
                };
                if packet.track_id() == track_id {
                    frames += packet.dur();
                }
            }
            frames
        }
    };

    #[allow(clippy::cast_precision_loss)]
    let length_seconds = total_frames as f64 / f64::from(sample_rate);
    debug!(sample_rate, channels, total_frames, length_seconds, "media probed");

    Ok(MediaProbe {
        source_path: path.display().to_string(),
        extension,
        sample_rate,
        channels,
        total_frames,
        length_seconds,
    })
}
