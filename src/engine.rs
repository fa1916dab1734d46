use std::sync::Arc;

use crate::{
    compile::{
        compiler::compile,
        job::{Backend, TransformJob},
    },
    config::EngineConfig,
    encode::{
        Artifact, Executor, batch::BatchExecutor, ffmpeg::FfmpegEncoder, image_codec::ImageCodec,
    },
    estimate::cost::estimate_size,
    foundation::error::{EngineError, EngineResult},
    params::{
        kind::MediaKind,
        set::{ParameterSet, SourceRef},
        solver::{ParamChange, apply},
    },
    probe::{MediaProbe, SourceProbe, ffprobe::FfprobeProbe},
    stream::host::RealtimeExecutor,
};

/// Entry point tying the probe, the parameter solver, the compiler, and the executors
/// together.
///
/// The engine keeps no parameter state between calls: callers hold the live [`ParameterSet`]
/// and pass it back in.
pub struct Engine {
    probe: Box<dyn SourceProbe>,
    image: Box<dyn Executor>,
    media: Box<dyn Executor>,
    streaming: Box<dyn Executor>,
}

impl Engine {
    /// Build an engine from explicit collaborators.
    ///
    /// `image` and `media` run batch jobs for image and audio/video sources; `streaming` runs
    /// every streaming job.
    pub fn new(
        probe: Box<dyn SourceProbe>,
        image: Box<dyn Executor>,
        media: Box<dyn Executor>,
        streaming: Box<dyn Executor>,
    ) -> Self {
        Self {
            probe,
            image,
            media,
            streaming,
        }
    }

    /// Engine wired to the system `ffmpeg`/`ffprobe` and the in-process image codec.
    pub fn with_ffmpeg(cfg: &EngineConfig) -> Self {
        Self::new(
            Box::new(MediaProbe::new(FfprobeProbe::new(cfg.ffprobe_path.clone()))),
            Box::new(BatchExecutor::new(ImageCodec)),
            Box::new(BatchExecutor::new(FfmpegEncoder::new(cfg.ffmpeg_path.clone()))),
            Box::new(
                RealtimeExecutor::new(cfg.ffmpeg_path.clone(), cfg.tick_interval(), cfg.pacing)
                    .with_deadline(cfg.stream_timeout()),
            ),
        )
    }

    /// Classify and probe a source, returning its initial parameter set.
    ///
    /// Fails with [`EngineError::UnsupportedKind`] when `declared_mime` is not an image, audio,
    /// or video type, and with [`EngineError::Probe`] when the bytes cannot be read.
    #[tracing::instrument(skip(self, bytes))]
    pub fn load_source(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        declared_mime: &str,
    ) -> EngineResult<ParameterSet> {
        let kind = MediaKind::from_mime(declared_mime)?;
        let source = SourceRef::new(bytes, declared_mime);
        if source.is_empty() {
            return Err(EngineError::probe("source is empty"));
        }

        let mut stats = self.probe.probe(source.bytes(), kind)?;
        stats.byte_size = source.len() as u64;
        tracing::debug!(?stats, "source probed");
        Ok(ParameterSet::populated(kind, source, stats))
    }

    /// Apply one field change; the previous set is untouched on error.
    pub fn update_parameter(
        &self,
        set: &ParameterSet,
        change: &ParamChange,
    ) -> EngineResult<ParameterSet> {
        apply(set, change)
    }

    /// Advisory output size in bytes.
    pub fn estimate_size(&self, set: &ParameterSet) -> u64 {
        estimate_size(set)
    }

    /// Freeze `set` into a job for `backend`.
    pub fn confirm(&self, set: &ParameterSet, backend: Backend) -> EngineResult<TransformJob> {
        compile(set, backend)
    }

    /// Run a job on the executor matching its backend and kind.
    #[tracing::instrument(skip(self, job), fields(kind = job.kind().as_str(), backend = ?job.backend()))]
    pub fn execute(&mut self, job: &TransformJob) -> EngineResult<Artifact> {
        let executor = match (job.backend(), job.kind()) {
            (Backend::Streaming, _) => &mut self.streaming,
            (Backend::Batch, MediaKind::Image) => &mut self.image,
            (Backend::Batch, MediaKind::Audio | MediaKind::Video) => &mut self.media,
        };
        let artifact = executor.execute(job)?;
        tracing::info!(
            bytes = artifact.byte_size(),
            mime = artifact.mime(),
            "transform finished"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
#[path = "../tests/unit/engine.rs"]
mod tests;
