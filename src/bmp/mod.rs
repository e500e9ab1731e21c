//! BMP output: the fixed header and the bottom-up raster writer.

mod header;
mod writer;

pub use header::{BitmapHeader, HEADER_LEN};
pub use writer::{BottomUpRasterWriter, DataSink, RasterCursor};
