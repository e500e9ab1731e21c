//! Input side: the byte source a decoder reads from, and the lazy
//! row-group sequence the driver pulls.

use std::io::Read;

use crate::decoder::{DecodeError, Pull, RowGroupDecoder};

/// Where a decoder gets compressed bytes from.
///
/// Returns the number of bytes placed in `buf`; `0` means end of input.
pub trait DataSource {
    fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

impl<R: Read> DataSource for R {
    fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            match self.read(buf) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }
}

/// Read everything `source` has left.
pub(crate) fn drain(source: &mut dyn DataSource) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = source.read_bytes(&mut chunk)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&chunk[..n]);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Active,
    Exhausted,
    Failed,
}

/// Finite, non-restartable sequence of row-groups.
///
/// Once the decoder reports exhaustion, later pulls return `None` without
/// calling it again. Once a pull fails, later pulls fail with
/// [`DecodeError::SessionClosed`]; starting over means a fresh decoder.
pub struct ScanlineSource<'a, D: ?Sized, R: ?Sized> {
    decoder: &'a mut D,
    source: &'a mut R,
    state: State,
    groups: u32,
}

impl<'a, D, R> ScanlineSource<'a, D, R>
where
    D: RowGroupDecoder + ?Sized,
    R: DataSource,
{
    pub fn new(decoder: &'a mut D, source: &'a mut R) -> Self {
        Self {
            decoder,
            source,
            state: State::Active,
            groups: 0,
        }
    }

    /// Pull the next row-group into `buf` and return the filled prefix.
    pub fn pull<'b>(&mut self, buf: &'b mut [u8]) -> Result<Option<&'b mut [u8]>, DecodeError> {
        match self.state {
            State::Exhausted => return Ok(None),
            State::Failed => return Err(DecodeError::SessionClosed),
            State::Active => {}
        }
        let capacity = buf.len();
        match self.decoder.pull_row_group(&mut *self.source, buf) {
            Ok(Pull::Rows { bytes }) if bytes > capacity => {
                self.state = State::Failed;
                Err(DecodeError::Overrun {
                    produced: bytes,
                    capacity,
                })
            }
            Ok(Pull::Rows { bytes }) => {
                self.groups += 1;
                Ok(Some(&mut buf[..bytes]))
            }
            Ok(Pull::Exhausted) => {
                self.state = State::Exhausted;
                Ok(None)
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Row-groups delivered so far.
    pub fn groups(&self) -> u32 {
        self.groups
    }
}
