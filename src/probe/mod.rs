//! Source probing collaborators.
//!
//! A [`SourceProbe`] reads the statistics a parameter set is initialized from. Failures are
//! reported as [`EngineError::Probe`](crate::EngineError::Probe) and are terminal for the load.

use crate::{
    foundation::error::EngineResult,
    params::{kind::MediaKind, set::SourceStats},
};

pub(crate) mod ffprobe;
pub(crate) mod image;

/// Reads duration, dimensions, and size from a source artifact.
pub trait SourceProbe: Send {
    /// Probe `bytes`, already classified as `kind`.
    fn probe(&self, bytes: &[u8], kind: MediaKind) -> EngineResult<SourceStats>;
}

/// Dispatching probe: images in-process, audio/video through `ffprobe`.
#[derive(Clone, Debug, Default)]
pub struct MediaProbe {
    image: image::ImageProbe,
    media: ffprobe::FfprobeProbe,
}

impl MediaProbe {
    /// Build a probe that runs the given `ffprobe` binary for audio/video.
    pub fn new(media: ffprobe::FfprobeProbe) -> Self {
        Self {
            image: image::ImageProbe,
            media,
        }
    }
}

impl SourceProbe for MediaProbe {
    fn probe(&self, bytes: &[u8], kind: MediaKind) -> EngineResult<SourceStats> {
        match kind {
            MediaKind::Image => self.image.probe(bytes, kind),
            MediaKind::Audio | MediaKind::Video => self.media.probe(bytes, kind),
        }
    }
}
