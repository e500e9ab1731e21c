//! The conversion session.
//!
//! A session runs in two steps. [`ConvertRequest::prepare`] initializes
//! the decoder, plans the window, validates the geometry the decoder
//! reports and allocates the single row-group buffer. Nothing is written
//! yet, so every failure up to here leaves the output untouched.
//! [`PreparedConversion::write_to`] then writes the header, positions the
//! cursor and runs the pull/write/seek loop. A failure in that step
//! aborts immediately and leaves whatever was written in place.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use enough::Stop;

use crate::bmp::{BitmapHeader, BottomUpRasterWriter, DataSink, HEADER_LEN, RasterCursor};
use crate::decoder::{BaselineDecoder, DecodeError, RowGroupDecoder, StorageSize};
use crate::error::{ConvertError, IoStage};
use crate::info::ImageDescriptor;
use crate::limits::Limits;
use crate::pixel::OutputFormat;
use crate::source::{DataSource, ScanlineSource};
use crate::window::{WindowOverrides, plan_window};

/// Settings for one conversion.
#[derive(Clone, Debug)]
pub struct ConvertRequest<'a> {
    overrides: WindowOverrides,
    limits: Option<&'a Limits>,
    format: OutputFormat,
}

impl Default for ConvertRequest<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> ConvertRequest<'a> {
    /// Full frame, no limits, the build's output format.
    pub fn new() -> Self {
        Self {
            overrides: WindowOverrides::default(),
            limits: None,
            format: OutputFormat::BUILD_DEFAULT,
        }
    }

    pub fn with_overrides(mut self, overrides: WindowOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Initialize `decoder` on `source` and get everything ready to write.
    pub fn prepare<D, R>(
        &self,
        mut decoder: D,
        mut source: R,
    ) -> Result<PreparedConversion<D, R>, ConvertError>
    where
        D: RowGroupDecoder,
        R: DataSource,
    {
        let descriptor = decoder
            .init(&mut source, self.format)
            .map_err(|e| match e {
                DecodeError::Unsupported(msg) => ConvertError::UnsupportedInput(msg),
                other => ConvertError::Init(other),
            })?;

        let window = plan_window(
            descriptor.native_width,
            descriptor.native_height,
            &self.overrides,
        )?;
        decoder.set_window(&window);
        let descriptor = descriptor.with_window(window);
        if let Some(limits) = self.limits {
            limits.check(window.width, window.height)?;
        }

        let storage = decoder.storage_size();
        let layout = RasterLayout::new(&descriptor, &storage, self.format)?;
        if let Some(limits) = self.limits {
            limits.check_memory("decoder storage", storage.decoder_bytes)?;
            limits.check_memory("row-group buffer", layout.row_group_bytes)?;
        }
        let buffer = allocate(layout.row_group_bytes)?;

        log::info!(
            "{}x{} window of a {}x{} {} image, {} rows per group, {} byte stride",
            window.width,
            window.height,
            descriptor.native_width,
            descriptor.native_height,
            descriptor.scan_type,
            layout.row_group_height,
            layout.row_stride
        );
        Ok(PreparedConversion {
            decoder,
            source,
            descriptor,
            storage,
            layout,
            buffer,
        })
    }
}

fn allocate(bytes: usize) -> Result<Vec<u8>, ConvertError> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(bytes)
        .map_err(|_| ConvertError::OutOfMemory { bytes })?;
    buffer.resize(bytes, 0);
    Ok(buffer)
}

/// Output geometry derived from the window and the decoder's report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterLayout {
    pub row_stride: usize,
    pub row_group_height: u32,
    pub row_group_bytes: usize,
    pub header: BitmapHeader,
}

impl RasterLayout {
    /// Cross-check the decoder's stride report against the window.
    ///
    /// The row-group buffer must be exactly `row_group_height` rows of
    /// `row_stride` bytes, and a row must hold at least the window width.
    fn new(
        descriptor: &ImageDescriptor,
        storage: &StorageSize,
        format: OutputFormat,
    ) -> Result<Self, ConvertError> {
        let window = descriptor.window();
        let too_large = || ConvertError::DimensionsTooLarge {
            width: window.width.into(),
            height: window.height.into(),
        };
        let min_stride = (window.width as usize)
            .checked_mul(format.bytes_per_pixel())
            .ok_or_else(too_large)?;
        let group_height = descriptor.row_group_height;
        let consistent = group_height > 0
            && storage.row_stride >= min_stride
            && storage.row_stride.checked_mul(group_height as usize)
                == Some(storage.row_group_bytes);
        if !consistent {
            return Err(ConvertError::StrideMismatch {
                row_group_bytes: storage.row_group_bytes,
                row_stride: storage.row_stride,
                row_group_height: group_height,
            });
        }

        let pixel_data_size = (storage.row_stride as u64)
            .checked_mul(u64::from(window.height))
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(too_large)?;
        let header = BitmapHeader::new(window.width, window.height, pixel_data_size, format)
            .ok_or_else(too_large)?;
        Ok(Self {
            row_stride: storage.row_stride,
            row_group_height: group_height,
            row_group_bytes: storage.row_group_bytes,
            header,
        })
    }
}

/// A session that has passed every check and owns its row-group buffer.
pub struct PreparedConversion<D, R> {
    decoder: D,
    source: R,
    descriptor: ImageDescriptor,
    storage: StorageSize,
    layout: RasterLayout,
    buffer: Vec<u8>,
}

impl<D, R> PreparedConversion<D, R>
where
    D: RowGroupDecoder,
    R: DataSource,
{
    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    pub fn storage(&self) -> &StorageSize {
        &self.storage
    }

    pub fn layout(&self) -> &RasterLayout {
        &self.layout
    }

    /// Write the BMP to `sink`, which must be positioned at offset 0.
    pub fn write_to<S: DataSink>(
        self,
        mut sink: S,
        stop: impl Stop,
    ) -> Result<ConversionReport, ConvertError> {
        let Self {
            mut decoder,
            mut source,
            descriptor,
            storage,
            layout,
            mut buffer,
        } = self;

        let header = layout.header.to_bytes();
        let written = sink
            .write_bytes(&header)
            .map_err(ConvertError::io(IoStage::WriteHeader))?;
        if written != header.len() {
            return Err(ConvertError::PartialWrite {
                written,
                expected: header.len(),
            });
        }

        let cursor = RasterCursor::new(
            HEADER_LEN as u64,
            layout.row_stride,
            descriptor.window().height,
            layout.row_group_height,
        );
        let mut writer = BottomUpRasterWriter::begin(sink, cursor)?;
        let mut groups = ScanlineSource::new(&mut decoder, &mut source);
        loop {
            stop.check()?;
            let group = match groups.pull(&mut buffer) {
                Ok(Some(group)) => group,
                Ok(None) => break,
                Err(source) => {
                    log::warn!("decode failed after {} rows", writer.rows_written());
                    return Err(ConvertError::Decode {
                        rows_written: writer.rows_written(),
                        source,
                    });
                }
            };
            writer.write_group(group)?;
        }

        let report = ConversionReport {
            descriptor,
            storage,
            layout,
            row_groups: groups.groups(),
            rows_written: writer.rows_written(),
            pixel_bytes: writer.bytes_written(),
            buffer_bytes: buffer.len(),
        };
        writer.finish()?;
        log::info!(
            "wrote {} rows in {} row-groups, {} bytes",
            report.rows_written,
            report.row_groups,
            u64::from(report.layout.header.file_size)
        );
        Ok(report)
    }
}

/// What a finished session did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversionReport {
    pub descriptor: ImageDescriptor,
    pub storage: StorageSize,
    pub layout: RasterLayout,
    pub row_groups: u32,
    pub rows_written: u32,
    /// Raster bytes written, header excluded.
    pub pixel_bytes: u64,
    /// Size of the one row-group buffer the session held.
    pub buffer_bytes: usize,
}

/// Run a whole session against an arbitrary decoder, source and sink.
pub fn convert<D, R, S>(
    request: &ConvertRequest<'_>,
    decoder: D,
    source: R,
    sink: S,
    stop: impl Stop,
) -> Result<ConversionReport, ConvertError>
where
    D: RowGroupDecoder,
    R: DataSource,
    S: DataSink,
{
    request.prepare(decoder, source)?.write_to(sink, stop)
}

/// Open a JPEG for reading.
pub fn open_input(path: impl AsRef<Path>) -> Result<BufReader<File>, ConvertError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(ConvertError::io(IoStage::OpenInput))
}

/// Create (or truncate) the output BMP.
pub fn create_output(path: impl AsRef<Path>) -> Result<File, ConvertError> {
    File::create(path).map_err(ConvertError::io(IoStage::CreateOutput))
}

/// Convert the JPEG at `src` into a BMP at `dst` with [`BaselineDecoder`].
///
/// `dst` is only created once the session is prepared, so unsupported
/// input or a rejected allocation never creates it.
pub fn convert_file(
    src: impl AsRef<Path>,
    dst: impl AsRef<Path>,
    request: &ConvertRequest<'_>,
    stop: impl Stop,
) -> Result<ConversionReport, ConvertError> {
    let input = open_input(src)?;
    let prepared = request.prepare(BaselineDecoder::new(), input)?;
    let output = create_output(dst)?;
    prepared.write_to(output, stop)
}
