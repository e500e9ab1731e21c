use enough::StopReason;

use crate::decoder::DecodeError;

/// Stage of the conversion an I/O failure happened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoStage {
    OpenInput,
    CreateOutput,
    WriteHeader,
    Seek,
    WriteRaster,
}

impl std::fmt::Display for IoStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::OpenInput => "opening the source image",
            Self::CreateOutput => "creating the output file",
            Self::WriteHeader => "writing the bitmap header",
            Self::Seek => "repositioning the output cursor",
            Self::WriteRaster => "writing raster data",
        })
    }
}

/// Errors from a JPEG to BMP conversion session.
///
/// Every variant is fatal. Nothing is retried, and an output file left
/// behind by a failed session is not removed.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConvertError {
    #[error("out of memory: could not allocate {bytes} bytes for the row-group buffer")]
    OutOfMemory { bytes: usize },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("decoder initialization failed: {0}")]
    Init(#[source] DecodeError),

    #[error("decoding failed after {rows_written} rows: {source}")]
    Decode {
        rows_written: u32,
        #[source]
        source: DecodeError,
    },

    #[error("i/o error while {stage}: {source}")]
    Io {
        stage: IoStage,
        #[source]
        source: std::io::Error,
    },

    #[error("short write: {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u64, height: u64 },

    #[error(
        "decoder reported {row_group_bytes} bytes per row-group, \
         which is not {row_group_height} rows of {row_stride} bytes"
    )]
    StrideMismatch {
        row_group_bytes: usize,
        row_stride: usize,
        row_group_height: u32,
    },

    #[error("row-group of {bytes} bytes is not a whole number of {row_stride}-byte rows")]
    PartialRow { bytes: usize, row_stride: usize },

    #[error("row-group of {rows} rows overflows the {remaining} rows left in the raster")]
    RasterOverflow { rows: u32, remaining: u32 },

    #[error("decoder finished after {written} of {expected} rows")]
    IncompleteRaster { written: u32, expected: u32 },

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

impl ConvertError {
    pub(crate) fn io(stage: IoStage) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::Io { stage, source }
    }
}

impl From<StopReason> for ConvertError {
    fn from(r: StopReason) -> Self {
        ConvertError::Cancelled(r)
    }
}
