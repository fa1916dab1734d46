use std::sync::mpsc::{self, Sender};

use image::{RgbaImage, imageops::FilterType};

use crate::{
    foundation::error::EncodeError,
    stream::{CaptureStream, Frame, RenderSurface},
};

/// CPU render surface backed by an RGBA8 buffer.
///
/// Every drawn frame is copied into the capture stream unchanged. Frames that already match
/// the surface size skip the resize.
#[derive(Debug)]
pub struct CpuSurface {
    filter: FilterType,
    canvas: Option<RgbaImage>,
    capture: Option<Sender<Frame>>,
    stream_taken: bool,
}

impl Default for CpuSurface {
    fn default() -> Self {
        Self::new(FilterType::Triangle)
    }
}

impl CpuSurface {
    pub fn new(filter: FilterType) -> Self {
        Self {
            filter,
            canvas: None,
            capture: None,
            stream_taken: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.canvas.is_some()
    }
}

impl RenderSurface for CpuSurface {
    fn attach(&mut self, width: u32, height: u32) -> Result<(), EncodeError> {
        if self.canvas.is_some() {
            return Err(EncodeError::open("surface is already attached"));
        }
        if width == 0 || height == 0 {
            return Err(EncodeError::open(format!(
                "surface size must be non-zero, got {width}x{height}"
            )));
        }
        self.canvas = Some(RgbaImage::new(width, height));
        self.stream_taken = false;
        Ok(())
    }

    fn draw_frame(&mut self, frame: &Frame, width: u32, height: u32) -> Result<(), EncodeError> {
        let canvas = self
            .canvas
            .as_mut()
            .ok_or_else(|| EncodeError::write("surface is not attached"))?;
        if (width, height) != canvas.dimensions() {
            return Err(EncodeError::write(format!(
                "draw size {width}x{height} does not match surface {}x{}",
                canvas.width(),
                canvas.height()
            )));
        }

        let src = RgbaImage::from_raw(frame.width, frame.height, frame.data.clone())
            .ok_or_else(|| EncodeError::write("frame buffer does not match its dimensions"))?;
        *canvas = if src.dimensions() == (width, height) {
            src
        } else {
            image::imageops::resize(&src, width, height, self.filter)
        };

        if let Some(tx) = &self.capture {
            let captured = Frame {
                width,
                height,
                data: canvas.as_raw().clone(),
            };
            // Receiver gone means the encoder already closed; drawing stays harmless.
            let _ = tx.send(captured);
        }
        Ok(())
    }

    fn capture_as_stream(&mut self) -> Result<CaptureStream, EncodeError> {
        let canvas = self
            .canvas
            .as_ref()
            .ok_or_else(|| EncodeError::open("surface is not attached"))?;
        if self.stream_taken {
            return Err(EncodeError::open("capture stream was already taken"));
        }
        let (tx, rx) = mpsc::channel();
        self.capture = Some(tx);
        self.stream_taken = true;
        Ok(CaptureStream {
            width: canvas.width(),
            height: canvas.height(),
            frames: rx,
        })
    }

    fn release(&mut self) {
        self.capture = None;
        self.canvas = None;
        self.stream_taken = false;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stream/surface.rs"]
mod tests;
