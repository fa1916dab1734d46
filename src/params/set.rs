use std::sync::Arc;

use crate::params::kind::{MediaKind, MetadataPolicy, OutputFormat};

/// Frame rate assumed for video sources.
///
/// Source frame rate is not probed; this value is the calibration baseline for both the
/// initial `frame_rate` parameter and the size estimator.
pub const ASSUMED_SOURCE_FRAME_RATE: u32 = 30;

/// Quality value that means "no change" to the size estimate and encoder defaults.
pub const BASELINE_QUALITY: u8 = 75;

/// Upper bound for the output frame rate.
pub const MAX_FRAME_RATE: u32 = 60;

/// Immutable snapshot of source properties taken at load time.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceStats {
    /// Duration in seconds (audio/video).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Width in pixels (image/video).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels (image/video).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Frames per second (video).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
    /// Size of the source artifact in bytes.
    pub byte_size: u64,
}

impl SourceStats {
    /// Source dimensions when both are known and non-zero.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }

    /// `width / height`, undefined until dimensions are known.
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.dimensions()
            .map(|(w, h)| f64::from(w) / f64::from(h))
    }

    /// Known, strictly positive duration.
    pub fn duration(&self) -> Option<f64> {
        self.duration_secs.filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Source frame rate, falling back to [`ASSUMED_SOURCE_FRAME_RATE`].
    pub fn frame_rate_or_assumed(&self) -> u32 {
        self.frame_rate
            .filter(|fr| *fr > 0)
            .unwrap_or(ASSUMED_SOURCE_FRAME_RATE)
    }
}

/// Opaque shared handle to the source artifact bytes.
#[derive(Clone)]
pub struct SourceRef {
    bytes: Arc<[u8]>,
    mime: Arc<str>,
}

impl SourceRef {
    /// Wrap source bytes together with their declared MIME type.
    pub fn new(bytes: impl Into<Arc<[u8]>>, mime: impl Into<Arc<str>>) -> Self {
        Self {
            bytes: bytes.into(),
            mime: mime.into(),
        }
    }

    /// Borrow the source bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Declared MIME type.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Source length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Return `true` when the source has no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRef")
            .field("mime", &&*self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The constrained record of transformation inputs for one loaded source.
///
/// Fields are read through accessors; all mutation goes through
/// [`apply`](crate::apply) so the cross-field invariants are kept.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ParameterSet {
    pub(crate) kind: MediaKind,
    #[serde(rename = "source_stats")]
    pub(crate) stats: SourceStats,
    #[serde(skip)]
    pub(crate) source: SourceRef,
    pub(crate) target_width: u32,
    pub(crate) target_height: u32,
    pub(crate) maintain_aspect: bool,
    pub(crate) size_scale_percent: f64,
    pub(crate) resolution_scale_percent: f64,
    pub(crate) quality: u8,
    pub(crate) frame_rate: u32,
    pub(crate) trim_start: f64,
    pub(crate) trim_end: f64,
    pub(crate) output_format: OutputFormat,
    pub(crate) keep_transparency: bool,
    pub(crate) metadata_policy: MetadataPolicy,
}

impl ParameterSet {
    /// A freshly accepted source whose statistics are not known yet.
    pub fn empty(kind: MediaKind, source: SourceRef) -> Self {
        let stats = SourceStats {
            byte_size: source.len() as u64,
            ..SourceStats::default()
        };
        Self {
            kind,
            stats,
            source,
            target_width: 0,
            target_height: 0,
            maintain_aspect: true,
            size_scale_percent: 100.0,
            resolution_scale_percent: 100.0,
            quality: BASELINE_QUALITY,
            frame_rate: ASSUMED_SOURCE_FRAME_RATE,
            trim_start: 0.0,
            trim_end: 0.0,
            output_format: kind.default_format(),
            keep_transparency: true,
            metadata_policy: MetadataPolicy::Keep,
        }
    }

    /// Populate defaults from probed source statistics.
    ///
    /// Targets start at the source dimensions, the trim covers the whole duration, and
    /// frame rate starts at the source (assumed) rate.
    pub fn populated(kind: MediaKind, source: SourceRef, stats: SourceStats) -> Self {
        let mut set = Self::empty(kind, source);
        if kind.has_dimensions()
            && let Some((w, h)) = stats.dimensions()
        {
            set.target_width = w;
            set.target_height = h;
        }
        if kind.has_duration() {
            set.trim_end = stats.duration().unwrap_or(0.0);
        }
        if kind == MediaKind::Video {
            set.frame_rate = stats.frame_rate_or_assumed();
        }
        set.stats = stats;
        set
    }

    /// Source artifact kind.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Probed source statistics.
    pub fn source_stats(&self) -> &SourceStats {
        &self.stats
    }

    /// Handle to the source bytes.
    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    /// Target width in pixels (0 for audio).
    pub fn target_width(&self) -> u32 {
        self.target_width
    }

    /// Target height in pixels (0 for audio).
    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    /// Whether width/height edits keep the source aspect ratio.
    pub fn maintain_aspect(&self) -> bool {
        self.maintain_aspect
    }

    /// Output area as a percentage of the source area.
    pub fn size_scale_percent(&self) -> f64 {
        self.size_scale_percent
    }

    /// Output width as a percentage of the source width.
    pub fn resolution_scale_percent(&self) -> f64 {
        self.resolution_scale_percent
    }

    /// Quality in `1..=100`.
    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Output frame rate (video).
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    /// Trim start in seconds.
    pub fn trim_start(&self) -> f64 {
        self.trim_start
    }

    /// Trim end in seconds.
    pub fn trim_end(&self) -> f64 {
        self.trim_end
    }

    /// Selected output format.
    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Whether alpha is preserved (png/webp only).
    pub fn keep_transparency(&self) -> bool {
        self.keep_transparency
    }

    /// Alpha survives only when requested and the output format carries it.
    pub fn effective_transparency(&self) -> bool {
        self.keep_transparency && self.output_format.supports_transparency()
    }

    /// Metadata handling for the output.
    pub fn metadata_policy(&self) -> &MetadataPolicy {
        &self.metadata_policy
    }
}
