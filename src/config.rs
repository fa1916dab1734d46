use std::{
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    foundation::error::{EngineError, EngineResult},
    stream::Pacing,
};

/// Engine settings, read from JSON. Every field is optional.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// `ffmpeg` binary used for batch encodes and streaming.
    pub ffmpeg_path: PathBuf,
    /// `ffprobe` binary used to probe audio/video.
    pub ffprobe_path: PathBuf,
    /// Render tick for streaming jobs, in milliseconds.
    pub tick_interval_ms: u64,
    /// Frame pacing for streaming jobs.
    pub pacing: Pacing,
    /// Overwrite existing output files.
    pub overwrite: bool,
    /// Wall-clock cap for streaming jobs, in seconds. Unlimited when absent.
    pub stream_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            tick_interval_ms: 16,
            pacing: Pacing::Realtime,
            overwrite: true,
            stream_timeout_secs: None,
        }
    }
}

impl EngineConfig {
    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            EngineError::config(format!("open config '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn from_reader(r: impl Read) -> EngineResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| EngineError::config(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_str(s: &str) -> EngineResult<Self> {
        Self::from_reader(s.as_bytes())
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.ffmpeg_path.as_os_str().is_empty() {
            return Err(EngineError::config("ffmpeg_path must not be empty"));
        }
        if self.ffprobe_path.as_os_str().is_empty() {
            return Err(EngineError::config("ffprobe_path must not be empty"));
        }
        if self.tick_interval_ms == 0 {
            return Err(EngineError::config("tick_interval_ms must be non-zero"));
        }
        if self.stream_timeout_secs == Some(0) {
            return Err(EngineError::config("stream_timeout_secs must be non-zero"));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn stream_timeout(&self) -> Option<Duration> {
        self.stream_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
