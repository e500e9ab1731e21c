//! # jpgd2bmp
//!
//! Converts baseline JPEG images into uncompressed bottom-up BMP files
//! while holding only one row-group of decoded pixels at a time.
//!
//! ## How it works
//!
//! A [`RowGroupDecoder`] hands out the image a row-group (one MCU row) at
//! a time, top to bottom. BMP wants rows bottom to top, so the writer
//! places each row-group at its final position counted from the end of
//! the file: it writes the header, seeks to where the last row-group
//! belongs, and after each write steps back to the slot of the group
//! above. The output file is never buffered in memory, and the decoded
//! frame is never handed to the driver as a whole.
//!
//! ## Output format
//!
//! - **RGB565** (default): 16 bits per pixel, `BI_BITFIELDS` with
//!   `F800/07E0/001F` masks
//! - **BGR888** (`rgb888` feature): 24 bits per pixel, `BI_RGB`
//!
//! Both carry a 124-byte `BITMAPV5HEADER` tagged sRGB, and rows are
//! padded to a multiple of 4 bytes.
//!
//! ## Non-Goals
//!
//! - Progressive, arithmetic-coded or 12-bit JPEG
//! - Color management beyond the sRGB tag
//! - Any output format other than BMP
//!
//! ## Usage
//!
//! ```no_run
//! use jpgd2bmp::{ConvertRequest, Limits, WindowOverrides, convert_file};
//! use enough::Unstoppable;
//!
//! let limits = Limits {
//!     max_pixels: Some(100_000_000),
//!     ..Default::default()
//! };
//! let request = ConvertRequest::new()
//!     .with_overrides(WindowOverrides {
//!         width: Some(256),
//!         height: Some(256),
//!         ..Default::default()
//!     })
//!     .with_limits(&limits);
//!
//! let report = convert_file("photo.jpg", "photo.bmp", &request, Unstoppable)?;
//! println!(
//!     "{}x{} {}",
//!     report.descriptor.native_width,
//!     report.descriptor.native_height,
//!     report.descriptor.scan_type
//! );
//! # Ok::<(), jpgd2bmp::ConvertError>(())
//! ```

#![forbid(unsafe_code)]

mod convert;
mod error;
mod info;
mod limits;
mod pixel;
mod source;
mod window;

pub mod bmp;
pub mod decoder;

// Re-exports
pub use convert::{
    ConversionReport, ConvertRequest, PreparedConversion, RasterLayout, convert, convert_file,
    create_output, open_input,
};
pub use decoder::{BaselineDecoder, DecodeError, Pull, RowGroupDecoder, StorageSize};
pub use enough::{Stop, StopReason, Unstoppable};
pub use error::{ConvertError, IoStage};
pub use info::{ImageDescriptor, ScanType};
pub use limits::Limits;
pub use pixel::{OutputFormat, SourceRow};
pub use source::{DataSource, ScanlineSource};
pub use window::{DecodeWindow, WindowOverrides, plan_window};
