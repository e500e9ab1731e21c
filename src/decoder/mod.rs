//! The decoder seam.
//!
//! The driver never looks inside a JPEG. It talks to a [`RowGroupDecoder`]
//! through four calls: `init`, `set_window`, `storage_size` and
//! `pull_row_group`, handing it a [`DataSource`] whenever it needs input
//! bytes. [`BaselineDecoder`] is the implementation the CLI uses; tests
//! substitute their own.

mod baseline;
mod frame;

pub use baseline::BaselineDecoder;
pub use frame::{FrameInfo, probe_frame};

use crate::info::ImageDescriptor;
use crate::pixel::OutputFormat;
use crate::source::DataSource;
use crate::window::DecodeWindow;

/// Failure status reported by a decoder.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// Valid JPEG this decoder does not handle, such as progressive scans.
    #[error("{0}")]
    Unsupported(String),

    #[error("corrupt stream: {0}")]
    Corrupt(String),

    #[error(
        "window {width}x{height} at ({x}, {y}) does not fit the \
         {native_width}x{native_height} frame"
    )]
    WindowOutOfBounds {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        native_width: u32,
        native_height: u32,
    },

    #[error("decoder produced {produced} bytes into a {capacity}-byte buffer")]
    Overrun { produced: usize, capacity: usize },

    #[error("pull called before init")]
    NotInitialized,

    /// The session already failed; it cannot be resumed.
    #[error("decode session is closed")]
    SessionClosed,

    #[error("read error: {0}")]
    Io(#[from] std::io::Error),
}

/// Memory the decoder needs, as reported after the window is set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StorageSize {
    /// Working storage owned by the decoder itself.
    pub decoder_bytes: usize,
    /// Bytes in one row-group of output pixels.
    pub row_group_bytes: usize,
    /// Bytes per output row, padding included.
    pub row_stride: usize,
}

/// Result of one pull.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pull {
    /// `bytes` of pixel data were written to the front of the buffer.
    Rows { bytes: usize },
    /// The window has been fully delivered.
    Exhausted,
}

/// A row-group at a time JPEG decoder.
pub trait RowGroupDecoder {
    /// Read stream headers and report the native geometry.
    fn init(
        &mut self,
        source: &mut dyn DataSource,
        format: OutputFormat,
    ) -> Result<ImageDescriptor, DecodeError>;

    /// Restrict output to `window`. Problems surface at the next pull.
    fn set_window(&mut self, window: &DecodeWindow);

    fn storage_size(&self) -> StorageSize;

    /// Decode the next row-group into the front of `buf`.
    fn pull_row_group(
        &mut self,
        source: &mut dyn DataSource,
        buf: &mut [u8],
    ) -> Result<Pull, DecodeError>;
}

impl<D: RowGroupDecoder + ?Sized> RowGroupDecoder for &mut D {
    fn init(
        &mut self,
        source: &mut dyn DataSource,
        format: OutputFormat,
    ) -> Result<ImageDescriptor, DecodeError> {
        (**self).init(source, format)
    }

    fn set_window(&mut self, window: &DecodeWindow) {
        (**self).set_window(window)
    }

    fn storage_size(&self) -> StorageSize {
        (**self).storage_size()
    }

    fn pull_row_group(
        &mut self,
        source: &mut dyn DataSource,
        buf: &mut [u8],
    ) -> Result<Pull, DecodeError> {
        (**self).pull_row_group(source, buf)
    }
}
