use std::io::Cursor;

use image::{DynamicImage, RgbImage, RgbaImage, imageops::FilterType};

use crate::{
    compile::job::{EncoderScale, Operation, TransformJob},
    encode::ExternalEncoder,
    foundation::error::EncodeError,
    params::kind::{MetadataPolicy, OutputFormat},
};

/// JPEG quality used when a job carries no explicit quality.
const DEFAULT_JPEG_QUALITY: u8 = 75;

/// In-process image encoder.
///
/// Decodes the source, resizes with a Lanczos filter, and re-encodes. Alpha survives only
/// for png/webp with transparency requested; everything else is flattened over white.
/// Container metadata (EXIF and friends) is never carried over.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCodec;

#[derive(Debug, PartialEq)]
struct CodecOptions {
    size: Option<(u32, u32)>,
    quality: u8,
    format: OutputFormat,
    keep_alpha: bool,
    metadata: String,
}

impl ExternalEncoder for ImageCodec {
    fn name(&self) -> &'static str {
        "image"
    }

    fn translate(&self, job: &TransformJob, output_name: &str) -> Vec<String> {
        let mut args = Vec::new();
        for op in job.operations() {
            match op {
                Operation::Scale { width, height } => {
                    args.extend(["-s".to_string(), format!("{width}x{height}")]);
                }
                Operation::SetQuality {
                    scale: EncoderScale::ImageQuality(q),
                } => {
                    args.extend(["-q".to_string(), q.to_string()]);
                }
                Operation::SetFormat { format } => {
                    args.extend(["-f".to_string(), format.extension().to_string()]);
                }
                Operation::SetMetadataPolicy { policy } => {
                    let mode = match policy {
                        MetadataPolicy::Keep => "keep",
                        MetadataPolicy::Remove => "remove",
                        MetadataPolicy::Edit(_) => "edit",
                    };
                    args.extend(["-metadata".to_string(), mode.to_string()]);
                }
                _ => {}
            }
        }
        let alpha = if job.params().effective_transparency() {
            "keep"
        } else {
            "flatten"
        };
        args.extend(["-alpha".to_string(), alpha.to_string()]);
        args.push(output_name.to_string());
        args
    }

    fn invoke(
        &mut self,
        input: &[u8],
        args: &[String],
        output_name: &str,
    ) -> Result<Vec<u8>, EncodeError> {
        let opts = parse_args(args, output_name)?;
        if opts.metadata != "remove" {
            tracing::warn!(
                policy = %opts.metadata,
                "image re-encoding does not carry container metadata"
            );
        }

        let decoded = image::load_from_memory(input)
            .map_err(|e| EncodeError::run(format!("failed to decode source image: {e}")))?;
        let resized = match opts.size {
            Some((w, h)) if (w, h) != (decoded.width(), decoded.height()) => {
                decoded.resize_exact(w, h, FilterType::Lanczos3)
            }
            _ => decoded,
        };

        let prepared = if opts.keep_alpha && opts.format.supports_transparency() {
            DynamicImage::ImageRgba8(resized.to_rgba8())
        } else {
            DynamicImage::ImageRgb8(flatten_over_white(&resized.to_rgba8()))
        };

        encode(&prepared, opts.format, opts.quality)
    }
}

fn parse_args(args: &[String], output_name: &str) -> Result<CodecOptions, EncodeError> {
    let Some((last, flags)) = args.split_last() else {
        return Err(EncodeError::open("image codec needs an output name"));
    };
    if last != output_name {
        return Err(EncodeError::open(format!(
            "last argument '{last}' does not name the output '{output_name}'"
        )));
    }

    let ext = output_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    let mut opts = CodecOptions {
        size: None,
        quality: DEFAULT_JPEG_QUALITY,
        format: OutputFormat::parse(ext).unwrap_or(OutputFormat::Png),
        keep_alpha: false,
        metadata: "keep".to_string(),
    };

    let mut it = flags.iter();
    while let Some(flag) = it.next() {
        let value = it
            .next()
            .ok_or_else(|| EncodeError::open(format!("flag '{flag}' is missing its value")))?;
        let bad = || EncodeError::open(format!("invalid value '{value}' for '{flag}'"));
        match flag.as_str() {
            "-s" => {
                let (w, h) = value.split_once('x').ok_or_else(bad)?;
                let w: u32 = w.parse().map_err(|_| bad())?;
                let h: u32 = h.parse().map_err(|_| bad())?;
                if w == 0 || h == 0 {
                    return Err(bad());
                }
                opts.size = Some((w, h));
            }
            "-q" => {
                opts.quality = value
                    .parse::<u8>()
                    .ok()
                    .filter(|q| (1..=100).contains(q))
                    .ok_or_else(bad)?;
            }
            "-f" => opts.format = OutputFormat::parse(value).map_err(|_| bad())?,
            "-alpha" => {
                opts.keep_alpha = match value.as_str() {
                    "keep" => true,
                    "flatten" => false,
                    _ => return Err(bad()),
                }
            }
            "-metadata" => opts.metadata = value.clone(),
            _ => return Err(EncodeError::open(format!("unknown image codec flag '{flag}'"))),
        }
    }

    if !matches!(
        opts.format,
        OutputFormat::Jpeg | OutputFormat::Png | OutputFormat::Webp
    ) {
        return Err(EncodeError::open(format!(
            "{} is not an image format",
            opts.format
        )));
    }
    Ok(opts)
}

/// Composite straight-alpha RGBA over an opaque white background.
fn flatten_over_white(src: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(src.width(), src.height(), |x, y| {
        let [r, g, b, a] = src.get_pixel(x, y).0;
        let a = u16::from(a);
        let inv = 255 - a;
        let mix = |c: u8| ((u16::from(c) * a + 255 * inv + 127) / 255) as u8;
        image::Rgb([mix(r), mix(g), mix(b)])
    })
}

fn encode(img: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Cursor::new(Vec::new());
    let res = match format {
        OutputFormat::Jpeg => {
            let enc = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
            img.write_with_encoder(enc)
        }
        OutputFormat::Png => {
            let enc = image::codecs::png::PngEncoder::new(&mut buf);
            img.write_with_encoder(enc)
        }
        OutputFormat::Webp => {
            let enc = image::codecs::webp::WebPEncoder::new_lossless(&mut buf);
            img.write_with_encoder(enc)
        }
        other => {
            return Err(EncodeError::run(format!("{other} is not an image format")));
        }
    };
    res.map_err(|e| EncodeError::run(format!("failed to encode {format}: {e}")))?;
    Ok(buf.into_inner())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/image_codec.rs"]
mod tests;
