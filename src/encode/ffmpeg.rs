use std::path::{Path, PathBuf};

use crate::{
    compile::job::{EncoderScale, Operation, TransformJob},
    encode::ExternalEncoder,
    foundation::error::{EncodeError, EngineResult},
    metadata::parse_metadata_entries,
    params::{
        kind::{MediaKind, MetadataPolicy, OutputFormat},
        set::BASELINE_QUALITY,
    },
};

/// Name the source bytes are written under inside the encoder's scratch directory.
pub const INPUT_NAME: &str = "input";

/// Pads odd frame sizes up to even ones; yuv420p encoders reject odd dimensions.
pub(crate) const EVEN_PAD: &str = "pad=ceil(iw/2)*2:ceil(ih/2)*2";

/// Batch encoder backed by the system `ffmpeg` binary.
///
/// Each invocation gets a fresh scratch directory as its file namespace: the source is written
/// to [`INPUT_NAME`], ffmpeg runs with that directory as its working directory, and the named
/// output is read back before the directory is removed.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl ExternalEncoder for FfmpegEncoder {
    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn translate(&self, job: &TransformJob, output_name: &str) -> Vec<String> {
        ffmpeg_args(job, output_name)
    }

    fn invoke(
        &mut self,
        input: &[u8],
        args: &[String],
        output_name: &str,
    ) -> Result<Vec<u8>, EncodeError> {
        let scratch = tempfile::Builder::new()
            .prefix("mediashift-")
            .tempdir()
            .map_err(|e| EncodeError::open(format!("failed to create scratch directory: {e}")))?;

        std::fs::write(scratch.path().join(INPUT_NAME), input)
            .map_err(|e| EncodeError::write(format!("failed to write ffmpeg input: {e}")))?;

        let out = std::process::Command::new(&self.binary)
            .args(args)
            .current_dir(scratch.path())
            .stdin(std::process::Stdio::null())
            .output()
            .map_err(|e| {
                EncodeError::open(format!(
                    "failed to spawn {} (is it installed and on PATH?): {e}",
                    self.binary.display()
                ))
            })?;
        if !out.status.success() {
            return Err(EncodeError::run(format!(
                "ffmpeg exited with status {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        std::fs::read(scratch.path().join(output_name))
            .map_err(|e| EncodeError::read(format!("failed to read '{output_name}': {e}")))
    }
}

/// Translate a job into ffmpeg's flag grammar.
///
/// Paths are relative to the scratch directory: the input is always [`INPUT_NAME`] and the
/// last argument is `output_name`. A job without a quality op still pins the encoder to the
/// baseline quality so ffmpeg's own codec defaults never apply.
pub fn ffmpeg_args(job: &TransformJob, output_name: &str) -> Vec<String> {
    let mut args: Vec<String> = ["-y", "-hide_banner", "-loglevel", "error", "-i", INPUT_NAME]
        .into_iter()
        .map(String::from)
        .collect();

    let duration = job.params().source_stats().duration();
    let mut quality_set = false;
    for op in job.operations() {
        match op {
            Operation::Trim { start, end } => {
                if *start > 0.0 {
                    args.extend(["-ss".to_string(), seconds(*start)]);
                }
                if duration.is_none_or(|d| *end < d) {
                    args.extend(["-t".to_string(), seconds(end - start)]);
                }
            }
            Operation::Scale { width, height } => {
                let mut filter = format!("scale={width}:{height}");
                if needs_even_size(job, *width, *height) {
                    filter.push(',');
                    filter.push_str(EVEN_PAD);
                }
                args.extend(["-vf".to_string(), filter]);
            }
            Operation::SetFrameRate { fps } => {
                args.extend(["-r".to_string(), fps.to_string()]);
            }
            Operation::SetQuality { scale } => {
                quality_set = true;
                quality_args(&mut args, *scale);
            }
            Operation::SetFormat { format } => {
                if !quality_set {
                    quality_set = true;
                    quality_args(
                        &mut args,
                        EncoderScale::for_quality(job.kind(), BASELINE_QUALITY),
                    );
                }
                args.extend(["-f".to_string(), muxer(*format).to_string()]);
            }
            Operation::SetMetadataPolicy { policy } => match policy {
                MetadataPolicy::Keep => {}
                MetadataPolicy::Remove => {
                    args.extend(["-map_metadata".to_string(), "-1".to_string()]);
                }
                MetadataPolicy::Edit(text) => {
                    // Compile already rejected unparsable text.
                    for (key, value) in parse_metadata_entries(text).unwrap_or_default() {
                        args.extend(["-metadata".to_string(), format!("{key}={value}")]);
                    }
                }
            },
        }
    }

    args.push(output_name.to_string());
    args
}

fn quality_args(args: &mut Vec<String>, scale: EncoderScale) {
    match scale {
        EncoderScale::AudioVbr(q) => args.extend(["-q:a".to_string(), number(q)]),
        EncoderScale::VideoCrf(crf) => args.extend(["-crf".to_string(), number(crf)]),
        // JPEG qscale: 2 (best) ..= 31 (worst).
        EncoderScale::ImageQuality(q) => {
            let qscale = 31 - (u32::from(q) * 29 / 100);
            args.extend(["-q:v".to_string(), qscale.to_string()]);
        }
    }
}

/// mp4 goes through libx264/yuv420p, which needs even frame sizes.
fn needs_even_size(job: &TransformJob, width: u32, height: u32) -> bool {
    job.kind() == MediaKind::Video
        && job.output_format() == OutputFormat::Mp4
        && (width % 2 != 0 || height % 2 != 0)
}

fn muxer(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Jpeg | OutputFormat::Png => "image2",
        OutputFormat::Webp => "webp",
        OutputFormat::Mp3 => "mp3",
        OutputFormat::Wav => "wav",
        OutputFormat::Ogg => "ogg",
        OutputFormat::Mp4 => "mp4",
        OutputFormat::Webm => "webm",
    }
}

fn seconds(v: f64) -> String {
    format!("{v:.3}")
}

fn number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        let s = format!("{v:.3}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> EngineResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `binary -version` runs successfully.
pub fn is_tool_available(binary: &Path) -> bool {
    std::process::Command::new(binary)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_tool_available(Path::new("ffmpeg"))
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
