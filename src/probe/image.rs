use std::io::Cursor;

use crate::{
    foundation::error::{EngineError, EngineResult},
    params::{kind::MediaKind, set::SourceStats},
    probe::SourceProbe,
};

/// Reads image dimensions from the encoded header without decoding pixels.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageProbe;

impl SourceProbe for ImageProbe {
    #[tracing::instrument(skip(self, bytes), fields(len = bytes.len()))]
    fn probe(&self, bytes: &[u8], kind: MediaKind) -> EngineResult<SourceStats> {
        if kind != MediaKind::Image {
            return Err(EngineError::probe(format!(
                "image probe cannot read {} sources",
                kind.as_str()
            )));
        }

        let (width, height) = ::image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| EngineError::probe(format!("failed to sniff image format: {e}")))?
            .into_dimensions()
            .map_err(|e| EngineError::probe(format!("failed to read image header: {e}")))?;

        if width == 0 || height == 0 {
            return Err(EngineError::probe("image has zero width or height"));
        }

        Ok(SourceStats {
            width: Some(width),
            height: Some(height),
            byte_size: bytes.len() as u64,
            ..SourceStats::default()
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/probe/image.rs"]
mod tests;
