use std::{
    path::PathBuf,
    task::Poll,
    time::{Duration, Instant},
};

use crate::{
    compile::job::TransformJob,
    encode::{Artifact, Executor},
    foundation::error::EncodeError,
    stream::{
        IncrementalEncoder, MediaSource, Pacing, RenderSurface,
        executor::StreamingExecutor,
        ffmpeg::{FfmpegFrameSource, FfmpegIncrementalEncoder},
        surface::CpuSurface,
    },
};

/// Start `exec` and tick it every `tick` until it finishes.
///
/// With a `deadline` the job is cancelled once that much wall time has passed; without one a
/// source that never ends keeps this loop running.
pub fn drive<S, R, E>(
    exec: &mut StreamingExecutor<S, R, E>,
    tick: Duration,
    deadline: Option<Duration>,
) -> Result<Artifact, EncodeError>
where
    S: MediaSource,
    R: RenderSurface,
    E: IncrementalEncoder,
{
    let started = Instant::now();
    exec.start()?;
    loop {
        if let Poll::Ready(res) = exec.tick() {
            return res;
        }
        if let Some(limit) = deadline
            && started.elapsed() >= limit
        {
            exec.cancel();
            return Err(EncodeError::run(format!(
                "streaming job exceeded {:.1}s",
                limit.as_secs_f64()
            )));
        }
        std::thread::sleep(tick);
    }
}

/// [`Executor`] for streaming jobs built from the ffmpeg-backed collaborators.
#[derive(Clone, Debug)]
pub struct RealtimeExecutor {
    ffmpeg: PathBuf,
    tick: Duration,
    pacing: Pacing,
    deadline: Option<Duration>,
}

impl RealtimeExecutor {
    pub fn new(ffmpeg: impl Into<PathBuf>, tick: Duration, pacing: Pacing) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            tick,
            pacing,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

impl Executor for RealtimeExecutor {
    #[tracing::instrument(skip(self, job), fields(pacing = ?self.pacing))]
    fn execute(&mut self, job: &TransformJob) -> Result<Artifact, EncodeError> {
        let source = FfmpegFrameSource::from_job(self.ffmpeg.clone(), job, self.pacing)?;
        let mut exec = StreamingExecutor::new(
            job,
            source,
            CpuSurface::default(),
            FfmpegIncrementalEncoder::new(self.ffmpeg.clone()),
        )?;
        let artifact = drive(&mut exec, self.tick, self.deadline)?;
        tracing::debug!(
            frames = exec.frames_drawn(),
            bytes = artifact.byte_size(),
            "streaming job done"
        );
        Ok(artifact)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/host.rs"]
mod tests;
