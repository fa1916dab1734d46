use crate::foundation::error::{EngineError, EngineResult};

/// Kind of source artifact. Fixed once a source is loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Still image.
    Image,
    /// Audio-only stream.
    Audio,
    /// Video stream (optionally with audio).
    Video,
}

impl MediaKind {
    /// Classify a declared MIME type by its top-level type.
    pub fn from_mime(declared: &str) -> EngineResult<Self> {
        let top = declared
            .split_once('/')
            .map(|(top, _)| top.trim().to_ascii_lowercase());
        match top.as_deref() {
            Some("image") => Ok(Self::Image),
            Some("audio") => Ok(Self::Audio),
            Some("video") => Ok(Self::Video),
            _ => Err(EngineError::unsupported_kind(format!(
                "'{declared}' is not an image, audio, or video type"
            ))),
        }
    }

    /// Output formats selectable for this kind, default first.
    pub fn allowed_formats(self) -> &'static [OutputFormat] {
        match self {
            Self::Image => &[OutputFormat::Jpeg, OutputFormat::Png, OutputFormat::Webp],
            Self::Audio => &[OutputFormat::Mp3, OutputFormat::Wav, OutputFormat::Ogg],
            Self::Video => &[OutputFormat::Mp4, OutputFormat::Webm, OutputFormat::Ogg],
        }
    }

    /// Default output format for this kind.
    pub fn default_format(self) -> OutputFormat {
        self.allowed_formats()[0]
    }

    /// Whether the kind has a time axis (duration, trim).
    pub fn has_duration(self) -> bool {
        matches!(self, Self::Audio | Self::Video)
    }

    /// Whether the kind has pixel dimensions.
    pub fn has_dimensions(self) -> bool {
        matches!(self, Self::Image | Self::Video)
    }

    /// Lowercase name used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}

/// Output container/codec family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG image.
    Jpeg,
    /// PNG image.
    Png,
    /// WebP image.
    Webp,
    /// MP3 audio.
    Mp3,
    /// WAV audio.
    Wav,
    /// Ogg container (audio or video).
    Ogg,
    /// MP4 video.
    Mp4,
    /// WebM video.
    Webm,
}

impl OutputFormat {
    /// Parse a lowercase format name (`"jpg"` is accepted for JPEG).
    pub fn parse(s: &str) -> EngineResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            "mp3" => Ok(Self::Mp3),
            "wav" => Ok(Self::Wav),
            "ogg" => Ok(Self::Ogg),
            "mp4" => Ok(Self::Mp4),
            "webm" => Ok(Self::Webm),
            other => Err(EngineError::invalid_value(
                "outputFormat",
                format!("unknown format '{other}'"),
            )),
        }
    }

    /// File extension (also the ffmpeg muxer name for audio/video).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
        }
    }

    /// MIME type of an artifact in this format for a given source kind.
    pub fn mime(self, kind: MediaKind) -> &'static str {
        match (self, kind) {
            (Self::Jpeg, _) => "image/jpeg",
            (Self::Png, _) => "image/png",
            (Self::Webp, _) => "image/webp",
            (Self::Mp3, _) => "audio/mpeg",
            (Self::Wav, _) => "audio/wav",
            (Self::Ogg, MediaKind::Video) => "video/ogg",
            (Self::Ogg, _) => "audio/ogg",
            (Self::Mp4, _) => "video/mp4",
            (Self::Webm, _) => "video/webm",
        }
    }

    /// Whether the format can carry an alpha channel.
    pub fn supports_transparency(self) -> bool {
        matches!(self, Self::Png | Self::Webp)
    }

    /// Multiplicative size factor relative to the baseline formats.
    pub(crate) fn size_factor(self) -> f64 {
        match self {
            Self::Webm | Self::Ogg | Self::Webp => 0.8,
            Self::Png => 1.5,
            Self::Jpeg | Self::Mp3 | Self::Wav | Self::Mp4 => 1.0,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// What happens to container metadata in the output.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "text")]
pub enum MetadataPolicy {
    /// Carry source metadata over unchanged.
    #[default]
    Keep,
    /// Strip all metadata.
    Remove,
    /// Replace metadata with user-edited entries (JSON object or `key=value` lines).
    Edit(String),
}

/// Guess a MIME type from a file extension, for callers without a declared type.
pub fn mime_from_extension(path: &std::path::Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "oga" => "audio/ogg",
        "ogg" => "audio/ogg",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mov" => "video/quicktime",
        "ogv" => "video/ogg",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
#[path = "../../tests/unit/params/kind.rs"]
mod tests;
