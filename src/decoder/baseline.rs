//! [`RowGroupDecoder`] backed by the `jpeg-decoder` crate.
//!
//! Init drains the source and reads only the headers. The entropy-coded
//! data is decoded on the first pull, so a corrupt or truncated scan is
//! reported by `pull_row_group`, after the driver has committed to an
//! output file. Rows are then handed out one MCU row at a time, cropped to
//! the window and packed into the output format.

use std::io::Cursor;

use jpeg_decoder::{CodingProcess, Decoder, PixelFormat};
use rgb::AsPixels as _;

use super::frame::{FrameInfo, probe_frame};
use super::{DecodeError, Pull, RowGroupDecoder, StorageSize};
use crate::info::ImageDescriptor;
use crate::pixel::{OutputFormat, SourceRow};
use crate::source::{DataSource, drain};
use crate::window::DecodeWindow;

/// Baseline (sequential, Huffman) JPEG decoder with grayscale, H1V1,
/// H2V1, H1V2 and H2V2 layouts.
///
/// Window offsets left unspecified are placed at 0.
#[derive(Debug, Default)]
pub struct BaselineDecoder {
    input: Vec<u8>,
    format: Option<OutputFormat>,
    frame: Option<FrameInfo>,
    row_group_height: u32,
    window: Option<DecodeWindow>,
    pixels: Option<Vec<u8>>,
    next_row: u32,
    closed: bool,
}

/// Window resolved against the frame.
#[derive(Clone, Copy, Debug)]
struct Crop {
    x: usize,
    y: usize,
    width: usize,
    height: u32,
}

impl BaselineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn requested_window(&self) -> Option<DecodeWindow> {
        self.window.or_else(|| {
            self.frame
                .as_ref()
                .map(|f| DecodeWindow::full(f.width.into(), f.height.into()))
        })
    }

    fn crop(&self, frame: &FrameInfo) -> Result<Crop, DecodeError> {
        let native_width = u32::from(frame.width);
        let native_height = u32::from(frame.height);
        let window = self
            .window
            .unwrap_or_else(|| DecodeWindow::full(native_width, native_height));
        let x = window.x.unwrap_or(0);
        let y = window.y.unwrap_or(0);
        let fits = window.width > 0
            && window.height > 0
            && u64::from(x) + u64::from(window.width) <= u64::from(native_width)
            && u64::from(y) + u64::from(window.height) <= u64::from(native_height);
        if !fits {
            return Err(DecodeError::WindowOutOfBounds {
                x,
                y,
                width: window.width,
                height: window.height,
                native_width,
                native_height,
            });
        }
        Ok(Crop {
            x: x as usize,
            y: y as usize,
            width: window.width as usize,
            height: window.height,
        })
    }

    fn decode_frame(&mut self, frame: &FrameInfo) -> Result<Vec<u8>, DecodeError> {
        let pixels = {
            let mut decoder = Decoder::new(Cursor::new(&self.input[..]));
            decoder.decode().map_err(map_error)?
        };
        let expected =
            usize::from(frame.width) * usize::from(frame.height) * usize::from(frame.components());
        if pixels.len() != expected {
            return Err(DecodeError::Corrupt(format!(
                "decoded {} bytes, expected {expected}",
                pixels.len()
            )));
        }
        log::debug!("decoded {}x{} frame", frame.width, frame.height);
        // The compressed stream is not needed past this point.
        self.input = Vec::new();
        Ok(pixels)
    }

    fn next_group(&mut self, buf: &mut [u8]) -> Result<Pull, DecodeError> {
        let frame = self.frame.clone().ok_or(DecodeError::NotInitialized)?;
        let format = self.format.ok_or(DecodeError::NotInitialized)?;
        let crop = self.crop(&frame)?;
        if self.pixels.is_none() {
            let pixels = self.decode_frame(&frame)?;
            self.pixels = Some(pixels);
        }
        if self.next_row >= crop.height {
            return Ok(Pull::Exhausted);
        }

        let rows = (crop.height - self.next_row).min(self.row_group_height) as usize;
        let stride = format
            .row_stride(crop.width as u32)
            .ok_or_else(|| DecodeError::Corrupt("row stride overflows".into()))?;
        let bytes = rows * stride;
        if bytes > buf.len() {
            return Err(DecodeError::Overrun {
                produced: bytes,
                capacity: buf.len(),
            });
        }

        let comps = usize::from(frame.components());
        let native_width = usize::from(frame.width);
        let first = crop.y + self.next_row as usize;
        let pixels = self.pixels.as_deref().unwrap_or_default();
        for (i, dst) in buf[..bytes].chunks_exact_mut(stride).enumerate() {
            let start = ((first + i) * native_width + crop.x) * comps;
            let src = &pixels[start..start + crop.width * comps];
            let row = if comps == 1 {
                SourceRow::Gray(src)
            } else {
                SourceRow::Rgb(src.as_pixels())
            };
            format.pack_row(row, dst);
        }
        self.next_row += rows as u32;
        Ok(Pull::Rows { bytes })
    }
}

impl RowGroupDecoder for BaselineDecoder {
    fn init(
        &mut self,
        source: &mut dyn DataSource,
        format: OutputFormat,
    ) -> Result<ImageDescriptor, DecodeError> {
        *self = Self::default();
        self.input = drain(source)?;

        let frame = probe_frame(&self.input)?;
        if frame.is_progressive() {
            return Err(DecodeError::Unsupported(
                "progressive JPEG files are not supported".into(),
            ));
        }
        if !frame.is_sequential_huffman() {
            return Err(DecodeError::Unsupported(format!(
                "SOF{} coding is not supported",
                frame.sof_type
            )));
        }
        if frame.precision != 8 {
            return Err(DecodeError::Unsupported(format!(
                "{}-bit samples are not supported",
                frame.precision
            )));
        }
        let scan_type = frame.scan_type().ok_or_else(|| {
            DecodeError::Unsupported(format!(
                "{} components with sampling {:?} are not supported",
                frame.components(),
                frame.sampling
            ))
        })?;

        // Let the real decoder validate the tables too, so bad headers fail
        // here rather than mid-session.
        let mut headers = Decoder::new(Cursor::new(&self.input[..]));
        headers.read_info().map_err(map_error)?;
        let info = headers
            .info()
            .ok_or_else(|| DecodeError::Corrupt("no frame header".into()))?;
        if info.coding_process != CodingProcess::DctSequential {
            return Err(DecodeError::Unsupported(format!(
                "{:?} coding is not supported",
                info.coding_process
            )));
        }
        if !matches!(info.pixel_format, PixelFormat::L8 | PixelFormat::RGB24) {
            return Err(DecodeError::Unsupported(format!(
                "{:?} output is not supported",
                info.pixel_format
            )));
        }

        log::debug!(
            "frame SOF{} {}x{}, {} components, {}",
            frame.sof_type,
            frame.width,
            frame.height,
            frame.components(),
            scan_type
        );
        self.row_group_height = scan_type.mcu_height();
        self.format = Some(format);
        let descriptor = ImageDescriptor::new(
            frame.width.into(),
            frame.height.into(),
            frame.components(),
            scan_type,
            self.row_group_height,
        );
        self.frame = Some(frame);
        Ok(descriptor)
    }

    fn set_window(&mut self, window: &DecodeWindow) {
        self.window = Some(*window);
    }

    fn storage_size(&self) -> StorageSize {
        let (Some(frame), Some(format), Some(window)) =
            (self.frame.as_ref(), self.format, self.requested_window())
        else {
            return StorageSize {
                decoder_bytes: 0,
                row_group_bytes: 0,
                row_stride: 0,
            };
        };
        let frame_bytes = usize::from(frame.width)
            * usize::from(frame.height)
            * usize::from(frame.components());
        let row_stride = format.row_stride(window.width).unwrap_or(usize::MAX);
        StorageSize {
            decoder_bytes: self.input.len().saturating_add(frame_bytes),
            row_group_bytes: row_stride.saturating_mul(self.row_group_height as usize),
            row_stride,
        }
    }

    fn pull_row_group(
        &mut self,
        _source: &mut dyn DataSource,
        buf: &mut [u8],
    ) -> Result<Pull, DecodeError> {
        if self.closed {
            return Err(DecodeError::SessionClosed);
        }
        let pulled = self.next_group(buf);
        if pulled.is_err() {
            self.closed = true;
            self.pixels = None;
        }
        pulled
    }
}

fn map_error(e: jpeg_decoder::Error) -> DecodeError {
    match e {
        jpeg_decoder::Error::Unsupported(feature) => {
            DecodeError::Unsupported(format!("{feature:?} is not supported"))
        }
        jpeg_decoder::Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            DecodeError::Corrupt("unexpected end of compressed data".into())
        }
        jpeg_decoder::Error::Io(e) => DecodeError::Io(e),
        other => DecodeError::Corrupt(other.to_string()),
    }
}
