//! Real-time re-encoding: a render loop draws source frames onto a capture surface while an
//! incremental encoder turns the captured stream into container chunks.
//!
//! The [`executor::StreamingExecutor`] owns one [`MediaSource`], one [`RenderSurface`], and one
//! [`IncrementalEncoder`] and advances only when the host calls `tick`. Collaborators may use
//! their own threads; the executor itself never blocks.

use std::{
    sync::mpsc::{Receiver, Sender},
    time::{Duration, Instant},
};

use crate::foundation::error::EncodeError;

pub(crate) mod executor;
pub(crate) mod ffmpeg;
pub(crate) mod host;
pub(crate) mod surface;

/// One RGBA8 frame, straight alpha, tightly packed rows.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, EncodeError> {
        let expected = (width as usize) * (height as usize) * 4;
        if data.len() != expected {
            return Err(EncodeError::write(format!(
                "frame data is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Frame filled with a single RGBA color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * 4)
            .collect();
        Self {
            width,
            height,
            data,
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Result of asking a source for its next frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourcePoll {
    /// A frame is due for display.
    Frame(Frame),
    /// Nothing new yet.
    Pending,
    /// End of stream; no more frames will be produced.
    Ended,
}

/// Playable source media.
pub trait MediaSource: Send {
    /// Start playback. Frames become available through [`poll_frame`](Self::poll_frame).
    fn play(&mut self) -> Result<(), EncodeError>;

    /// Non-blocking. Errors are decode failures.
    fn poll_frame(&mut self) -> Result<SourcePoll, EncodeError>;

    /// Stop playback and drop decoder handles. Safe to call more than once.
    fn stop(&mut self);
}

/// Frames captured from a surface, in draw order.
///
/// The stream ends when the surface is released.
pub struct CaptureStream {
    pub width: u32,
    pub height: u32,
    pub frames: Receiver<Frame>,
}

impl std::fmt::Debug for CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStream")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// Drawable surface whose contents can be captured as a frame stream.
///
/// A surface is attached to at most one executor at a time.
pub trait RenderSurface: Send {
    /// Allocate the surface at the output dimensions.
    fn attach(&mut self, width: u32, height: u32) -> Result<(), EncodeError>;

    /// Draw `frame` scaled to `width`x`height` and publish the result to the capture stream.
    fn draw_frame(&mut self, frame: &Frame, width: u32, height: u32) -> Result<(), EncodeError>;

    /// Hand out the capture stream. Only one stream exists per attachment.
    fn capture_as_stream(&mut self) -> Result<CaptureStream, EncodeError>;

    /// Free the surface and end the capture stream.
    fn release(&mut self);
}

/// Parameters an incremental encoder is opened with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncoderSettings {
    /// Target bitrate in bits per second.
    pub bitrate: u64,
    /// Container MIME hint.
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Asynchronous notifications from an incremental encoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncoderEvent {
    /// Next piece of container output, in emission order.
    Chunk(Vec<u8>),
    /// The stop request has completed; everything buffered was emitted.
    Stopped,
    Failed(EncodeError),
}

/// Encoder that consumes a capture stream and emits container chunks at its own pace.
pub trait IncrementalEncoder: Send {
    fn open(
        &mut self,
        stream: CaptureStream,
        settings: &EncoderSettings,
        events: Sender<EncoderEvent>,
    ) -> Result<(), EncodeError>;

    /// Ask the encoder to flush and finish. Completion is reported as [`EncoderEvent::Stopped`].
    fn stop(&mut self) -> Result<(), EncodeError>;

    /// Release encoder handles. Safe to call more than once.
    fn close(&mut self);
}

/// Playback clock used to pace frame delivery.
pub trait Clock: Send {
    /// Current playback position.
    fn position(&self) -> Duration;

    /// Restart the clock at `position`.
    fn reset_to(&mut self, position: Duration);
}

/// Wall-time clock.
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    origin: Instant,
}

impl Default for WallClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for WallClock {
    fn position(&self) -> Duration {
        self.origin.elapsed()
    }

    fn reset_to(&mut self, position: Duration) {
        self.origin = Instant::now()
            .checked_sub(position)
            .unwrap_or_else(Instant::now);
    }
}

/// How a frame source releases decoded frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pacing {
    /// One frame per `1/fps` of clock time, like on-screen playback.
    #[default]
    Realtime,
    /// Frames as fast as they decode.
    Unthrottled,
}
