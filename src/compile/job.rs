use crate::params::{
    kind::{MediaKind, MetadataPolicy, OutputFormat},
    set::{ParameterSet, SourceRef},
};

/// Which executor a job is routed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Single blocking invocation of an external encoder over the whole input.
    #[default]
    Batch,
    /// Real-time frame render + incremental encode driven by source playback.
    Streaming,
}

/// Quality expressed on the encoder's own rate-control scale.
///
/// Lower numbers mean higher fidelity for both the audio VBR and video CRF scales.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "scale", content = "value", rename_all = "snake_case")]
pub enum EncoderScale {
    /// Audio VBR quality `5 - quality/25`.
    AudioVbr(f64),
    /// Video constant rate factor `51 - quality/2`.
    VideoCrf(f64),
    /// Image encoder quality, `1..=100` (higher is better).
    ImageQuality(u8),
}

impl EncoderScale {
    /// Map a `1..=100` quality onto the encoder scale for `kind`.
    pub fn for_quality(kind: MediaKind, quality: u8) -> Self {
        let q = f64::from(quality);
        match kind {
            MediaKind::Audio => Self::AudioVbr(5.0 - q / 25.0),
            MediaKind::Video => Self::VideoCrf(51.0 - q / 2.0),
            MediaKind::Image => Self::ImageQuality(quality),
        }
    }
}

/// One step of a compiled transformation.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Keep `[start, end)` seconds of the source.
    Trim {
        /// Start in seconds.
        start: f64,
        /// End in seconds.
        end: f64,
    },
    /// Resize to the given pixel dimensions.
    Scale {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Change the output frame rate.
    SetFrameRate {
        /// Frames per second.
        fps: u32,
    },
    /// Set encoder rate control.
    SetQuality {
        /// Quality on the encoder's scale.
        scale: EncoderScale,
    },
    /// Select the output container/codec.
    SetFormat {
        /// Output format.
        format: OutputFormat,
    },
    /// Select metadata handling.
    SetMetadataPolicy {
        /// Metadata policy.
        policy: MetadataPolicy,
    },
}

/// Immutable, ordered description of a transformation ready for execution.
///
/// The parameter set it was compiled from is frozen inside, so later edits to a live set
/// never affect an in-flight job.
#[derive(Clone, Debug, serde::Serialize)]
pub struct TransformJob {
    kind: MediaKind,
    backend: Backend,
    operations: Vec<Operation>,
    #[serde(skip)]
    params: ParameterSet,
}

impl TransformJob {
    pub(crate) fn new(params: ParameterSet, backend: Backend, operations: Vec<Operation>) -> Self {
        Self {
            kind: params.kind(),
            backend,
            operations,
            params,
        }
    }

    /// Source kind.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Executor this job targets.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Operations in execution order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Frozen parameters the job was compiled from.
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Handle to the source bytes.
    pub fn source(&self) -> &SourceRef {
        self.params.source()
    }

    /// Output format.
    pub fn output_format(&self) -> OutputFormat {
        self.params.output_format()
    }

    /// MIME type of the produced artifact.
    pub fn output_mime(&self) -> &'static str {
        self.output_format().mime(self.kind)
    }

    /// Output pixel dimensions (image/video).
    pub fn output_dimensions(&self) -> Option<(u32, u32)> {
        self.kind
            .has_dimensions()
            .then(|| (self.params.target_width(), self.params.target_height()))
    }

    /// Output frame rate (video).
    pub fn output_frame_rate(&self) -> Option<u32> {
        (self.kind == MediaKind::Video).then(|| self.params.frame_rate())
    }

    /// Bitrate ceiling for the real-time encoder, linear in quality.
    ///
    /// Quality 75 maps to 1 Mbit/s.
    pub fn streaming_bitrate(&self) -> u64 {
        u64::from(self.params.quality()) * 1_000_000 / 75
    }

    /// `true` when the job performs nothing beyond format and metadata selection.
    pub fn is_passthrough(&self) -> bool {
        self.operations.iter().all(|op| {
            matches!(
                op,
                Operation::SetFormat { .. }
                    | Operation::SetMetadataPolicy {
                        policy: MetadataPolicy::Keep
                    }
            )
        })
    }
}
