use std::{io::Write, path::PathBuf};

use crate::{
    foundation::error::{EngineError, EngineResult},
    params::{
        kind::MediaKind,
        set::{ASSUMED_SOURCE_FRAME_RATE, SourceStats},
    },
    probe::SourceProbe,
};

/// Probes audio/video by spooling the source to a temp file and running `ffprobe` on it.
#[derive(Clone, Debug)]
pub struct FfprobeProbe {
    binary: PathBuf,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeProbe {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }
}

impl SourceProbe for FfprobeProbe {
    #[tracing::instrument(skip(self, bytes), fields(len = bytes.len(), kind = kind.as_str()))]
    fn probe(&self, bytes: &[u8], kind: MediaKind) -> EngineResult<SourceStats> {
        if kind == MediaKind::Image {
            return Err(EngineError::probe("ffprobe probe does not handle images"));
        }

        let mut spool = tempfile::NamedTempFile::new()
            .map_err(|e| EngineError::probe(format!("failed to create probe spool file: {e}")))?;
        spool
            .write_all(bytes)
            .and_then(|()| spool.flush())
            .map_err(|e| EngineError::probe(format!("failed to spool source: {e}")))?;

        let out = std::process::Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
            ])
            .arg(spool.path())
            .output()
            .map_err(|e| EngineError::probe(format!("failed to run ffprobe: {e}")))?;
        if !out.status.success() {
            return Err(EngineError::probe(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        parse_probe_output(&out.stdout, kind, bytes.len() as u64)
    }
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Turn `ffprobe -print_format json -show_streams -show_format` output into [`SourceStats`].
///
/// Duration is required for both kinds; video additionally needs a video stream with
/// dimensions. The frame rate is recorded as [`ASSUMED_SOURCE_FRAME_RATE`].
pub(crate) fn parse_probe_output(
    json: &[u8],
    kind: MediaKind,
    byte_size: u64,
) -> EngineResult<SourceStats> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| EngineError::probe(format!("ffprobe json parse failed: {e}")))?;

    let duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| EngineError::probe("missing or invalid duration from ffprobe"))?;

    let mut stats = SourceStats {
        duration_secs: Some(duration),
        byte_size,
        ..SourceStats::default()
    };

    match kind {
        MediaKind::Video => {
            let video_stream = parsed
                .streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
                .ok_or_else(|| EngineError::probe("no video stream found"))?;
            let width = video_stream
                .width
                .filter(|w| *w > 0)
                .ok_or_else(|| EngineError::probe("missing video width from ffprobe"))?;
            let height = video_stream
                .height
                .filter(|h| *h > 0)
                .ok_or_else(|| EngineError::probe("missing video height from ffprobe"))?;
            stats.width = Some(width);
            stats.height = Some(height);
            stats.frame_rate = Some(ASSUMED_SOURCE_FRAME_RATE);
        }
        MediaKind::Audio => {
            if !parsed
                .streams
                .iter()
                .any(|s| s.codec_type.as_deref() == Some("audio"))
            {
                return Err(EngineError::probe("no audio stream found"));
            }
        }
        MediaKind::Image => {
            return Err(EngineError::probe("ffprobe probe does not handle images"));
        }
    }

    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/probe/ffprobe.rs"]
mod tests;
