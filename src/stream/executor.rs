use std::{
    sync::mpsc::{self, Receiver, TryRecvError},
    task::Poll,
};

use crate::{
    compile::job::{Backend, TransformJob},
    encode::Artifact,
    foundation::error::EncodeError,
    stream::{
        EncoderEvent, EncoderSettings, IncrementalEncoder, MediaSource, RenderSurface, SourcePoll,
    },
};

/// Lifecycle of a streaming job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamState {
    Idle,
    Priming,
    Capturing,
    Finalizing,
    Done,
    Failed,
}

/// Tick-driven real-time re-encoder.
///
/// `start` attaches the surface, opens the encoder, and starts playback. Every `tick` then
/// collects encoder chunks and draws at most one source frame. End of stream asks the encoder
/// to stop; once it reports completion the chunks are joined, in emission order, into the
/// artifact.
///
/// Collaborators are released exactly once: on completion, on failure, on [`cancel`], or on
/// drop, whichever comes first.
///
/// [`cancel`]: StreamingExecutor::cancel
pub struct StreamingExecutor<S, R, E>
where
    S: MediaSource,
    R: RenderSurface,
    E: IncrementalEncoder,
{
    source: S,
    surface: R,
    encoder: E,
    settings: EncoderSettings,
    state: StreamState,
    events: Option<Receiver<EncoderEvent>>,
    chunks: Vec<Vec<u8>>,
    error: Option<EncodeError>,
    frames_drawn: u64,
    released: bool,
}

impl<S, R, E> StreamingExecutor<S, R, E>
where
    S: MediaSource,
    R: RenderSurface,
    E: IncrementalEncoder,
{
    /// Bind collaborators to a compiled streaming job.
    pub fn new(job: &TransformJob, source: S, surface: R, encoder: E) -> Result<Self, EncodeError> {
        if job.backend() != Backend::Streaming {
            return Err(EncodeError::open(
                "streaming executor received a batch job",
            ));
        }
        let (width, height) = job
            .output_dimensions()
            .ok_or_else(|| EncodeError::open("streaming jobs need output dimensions"))?;
        let fps = job
            .output_frame_rate()
            .ok_or_else(|| EncodeError::open("streaming jobs need an output frame rate"))?;

        Ok(Self {
            source,
            surface,
            encoder,
            settings: EncoderSettings {
                bitrate: job.streaming_bitrate(),
                mime: job.output_mime(),
                width,
                height,
                fps,
            },
            state: StreamState::Idle,
            events: None,
            chunks: Vec::new(),
            error: None,
            frames_drawn: 0,
            released: false,
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Frames drawn onto the capture surface so far.
    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }

    /// Chunks received so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn error(&self) -> Option<&EncodeError> {
        self.error.as_ref()
    }

    /// Attach, open, and start playback: `Idle -> Priming -> Capturing`.
    #[tracing::instrument(skip(self), fields(w = self.settings.width, h = self.settings.height))]
    pub fn start(&mut self) -> Result<(), EncodeError> {
        if self.state != StreamState::Idle {
            return Err(EncodeError::open(format!(
                "cannot start from state {:?}",
                self.state
            )));
        }
        self.transition(StreamState::Priming);

        if let Err(e) = self.prime() {
            self.fail(e.clone());
            return Err(e);
        }
        if let Err(e) = self.source.play() {
            self.fail(e.clone());
            return Err(e);
        }

        self.transition(StreamState::Capturing);
        Ok(())
    }

    fn prime(&mut self) -> Result<(), EncodeError> {
        let (w, h) = (self.settings.width, self.settings.height);
        self.surface.attach(w, h)?;
        let stream = self.surface.capture_as_stream()?;
        let (tx, rx) = mpsc::channel();
        self.encoder.open(stream, &self.settings, tx)?;
        self.events = Some(rx);
        Ok(())
    }

    /// Advance by one render tick. Never blocks.
    ///
    /// Returns `Ready` exactly when the job reached `Done` or `Failed`. A source that never ends
    /// keeps the job in `Capturing`.
    pub fn tick(&mut self) -> Poll<Result<Artifact, EncodeError>> {
        match self.state {
            StreamState::Idle | StreamState::Priming => return Poll::Pending,
            StreamState::Done => {
                return Poll::Ready(Err(EncodeError::read("artifact was already taken")));
            }
            StreamState::Failed => return Poll::Ready(Err(self.failure())),
            StreamState::Capturing | StreamState::Finalizing => {}
        }

        let stopped = match self.drain_events() {
            Ok(stopped) => stopped,
            Err(e) => {
                self.fail(e.clone());
                return Poll::Ready(Err(e));
            }
        };

        if self.state == StreamState::Capturing
            && let Err(e) = self.render_once()
        {
            self.fail(e.clone());
            return Poll::Ready(Err(e));
        }

        if self.state == StreamState::Finalizing && stopped {
            return Poll::Ready(Ok(self.finish()));
        }
        Poll::Pending
    }

    /// Abandon the job: stop playback, close the encoder, release the surface.
    pub fn cancel(&mut self) {
        if matches!(self.state, StreamState::Done | StreamState::Failed) {
            return;
        }
        tracing::debug!(state = ?self.state, "streaming job cancelled");
        self.fail(EncodeError::run("streaming job was cancelled"));
    }

    /// Returns `true` once the encoder reported `Stopped`.
    fn drain_events(&mut self) -> Result<bool, EncodeError> {
        let Some(events) = self.events.as_ref() else {
            return Ok(false);
        };
        let mut stopped = false;
        loop {
            match events.try_recv() {
                Ok(EncoderEvent::Chunk(bytes)) => self.chunks.push(bytes),
                Ok(EncoderEvent::Stopped) => stopped = true,
                Ok(EncoderEvent::Failed(e)) => return Err(e),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !stopped {
                        return Err(EncodeError::flush(
                            "encoder went away without reporting completion",
                        ));
                    }
                    break;
                }
            }
        }
        Ok(stopped)
    }

    fn render_once(&mut self) -> Result<(), EncodeError> {
        match self.source.poll_frame()? {
            SourcePoll::Frame(frame) => {
                let (w, h) = (self.settings.width, self.settings.height);
                self.surface.draw_frame(&frame, w, h)?;
                self.frames_drawn += 1;
            }
            SourcePoll::Pending => {}
            SourcePoll::Ended => {
                tracing::debug!(frames = self.frames_drawn, "source reached end of stream");
                self.source.stop();
                self.encoder.stop()?;
                self.transition(StreamState::Finalizing);
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Artifact {
        let bytes = self.chunks.drain(..).flatten().collect::<Vec<u8>>();
        self.release();
        self.transition(StreamState::Done);
        Artifact::new(bytes, self.settings.mime)
    }

    fn fail(&mut self, e: EncodeError) {
        tracing::debug!(error = %e, "streaming job failed");
        self.chunks.clear();
        self.error = Some(e);
        self.release();
        self.transition(StreamState::Failed);
    }

    fn failure(&self) -> EncodeError {
        self.error
            .clone()
            .unwrap_or_else(|| EncodeError::run("streaming job failed"))
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.source.stop();
        self.encoder.close();
        self.surface.release();
        self.events = None;
    }

    fn transition(&mut self, next: StreamState) {
        tracing::debug!(from = ?self.state, to = ?next, "streaming state");
        self.state = next;
    }
}

impl<S, R, E> Drop for StreamingExecutor<S, R, E>
where
    S: MediaSource,
    R: RenderSurface,
    E: IncrementalEncoder,
{
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/executor.rs"]
mod tests;
