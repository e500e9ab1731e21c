//! Bottom-up raster writer.
//!
//! The decoder produces rows top-down, a BMP with positive height stores
//! them bottom-up. Instead of buffering the frame, each row-group is
//! written at its final position and the cursor then moves back by twice
//! the bytes just written, which lands it at the start of the next group
//! up. Memory use is one row-group.

use std::io::{Seek, SeekFrom, Write};

use crate::error::{ConvertError, IoStage};

/// Where the raster is written. Implemented for every `Write + Seek`.
///
/// `write_bytes` is called once per row-group; a short count is fatal and
/// is never retried.
pub trait DataSink {
    fn write_bytes(&mut self, bytes: &[u8]) -> std::io::Result<usize>;

    /// Move the cursor by `delta` bytes and return the new position.
    fn seek_relative(&mut self, delta: i64) -> std::io::Result<u64>;

    fn seek_to(&mut self, offset: u64) -> std::io::Result<u64>;
}

impl<W: Write + Seek> DataSink for W {
    fn write_bytes(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        loop {
            match self.write(bytes) {
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn seek_relative(&mut self, delta: i64) -> std::io::Result<u64> {
        self.seek(SeekFrom::Current(delta))
    }

    fn seek_to(&mut self, offset: u64) -> std::io::Result<u64> {
        self.seek(SeekFrom::Start(offset))
    }
}

/// Placement arithmetic for a bottom-up raster, without any I/O.
///
/// Tracks how many rows have been placed and where the next group goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterCursor {
    header_len: u64,
    stride: u64,
    rows_total: u32,
    group_height: u32,
    rows_placed: u32,
}

impl RasterCursor {
    pub fn new(header_len: u64, stride: usize, rows_total: u32, group_height: u32) -> Self {
        Self {
            header_len,
            stride: stride as u64,
            rows_total,
            group_height,
            rows_placed: 0,
        }
    }

    /// Offset of the first write: the last full group's slot at the bottom
    /// of the file's raster area, i.e. the top of the image.
    pub fn start_offset(&self) -> u64 {
        let first = self.group_height.min(self.rows_total);
        self.offset_of_row(self.rows_total - first)
    }

    /// Slot of the next group, assuming it is a full group or the rest of
    /// the image, whichever is smaller.
    pub fn next_offset(&self) -> u64 {
        let remaining = self.rows_remaining();
        self.offset_of_row(remaining - self.group_height.min(remaining))
    }

    /// File offset of the `row`-th row counted from the top of the raster
    /// area, which is the bottom image row.
    fn offset_of_row(&self, row: u32) -> u64 {
        self.header_len + u64::from(row) * self.stride
    }

    /// Reserve the slot for a group of `rows` rows and return its offset.
    pub fn place(&mut self, rows: u32) -> Result<u64, ConvertError> {
        let remaining = self.rows_remaining();
        if rows > remaining || rows > self.group_height {
            return Err(ConvertError::RasterOverflow { rows, remaining });
        }
        self.rows_placed += rows;
        Ok(self.offset_of_row(remaining - rows))
    }

    pub fn rows_remaining(&self) -> u32 {
        self.rows_total - self.rows_placed
    }

    pub fn rows_placed(&self) -> u32 {
        self.rows_placed
    }

    pub fn is_complete(&self) -> bool {
        self.rows_placed == self.rows_total
    }

    pub fn stride(&self) -> usize {
        self.stride as usize
    }
}

/// Writes row-groups into a [`DataSink`] so they end up bottom-up.
pub struct BottomUpRasterWriter<S> {
    sink: S,
    cursor: RasterCursor,
    /// Where the sink's cursor is, as far as we know.
    position: u64,
    bytes_written: u64,
}

impl<S: DataSink> BottomUpRasterWriter<S> {
    /// Move the sink to the first group's slot. The header must already be
    /// written.
    pub fn begin(mut sink: S, cursor: RasterCursor) -> Result<Self, ConvertError> {
        let start = cursor.start_offset();
        let position = sink
            .seek_to(start)
            .map_err(ConvertError::io(IoStage::Seek))?;
        log::trace!("raster starts at offset {position}");
        Ok(Self {
            sink,
            cursor,
            position,
            bytes_written: 0,
        })
    }

    /// Write one row-group given top-down, as the decoder produced it.
    ///
    /// Rows are reversed in place before the write, so `group` holds
    /// garbage afterwards.
    pub fn write_group(&mut self, group: &mut [u8]) -> Result<(), ConvertError> {
        let stride = self.cursor.stride();
        if stride == 0 || group.len() % stride != 0 {
            return Err(ConvertError::PartialRow {
                bytes: group.len(),
                row_stride: stride,
            });
        }
        let rows = (group.len() / stride) as u32;
        if rows == 0 {
            return Ok(());
        }
        let target = self.cursor.place(rows)?;
        if target != self.position {
            // The decoder delivered fewer rows than a full group before
            // the end of the image.
            let delta = target as i64 - self.position as i64;
            self.position = self
                .sink
                .seek_relative(delta)
                .map_err(ConvertError::io(IoStage::Seek))?;
        }

        reverse_rows(group, stride);
        let written = self
            .sink
            .write_bytes(group)
            .map_err(ConvertError::io(IoStage::WriteRaster))?;
        if written != group.len() {
            return Err(ConvertError::PartialWrite {
                written,
                expected: group.len(),
            });
        }
        self.position += written as u64;
        self.bytes_written += written as u64;

        if !self.cursor.is_complete() {
            // Back by twice the bytes written when the next group is full
            // height; less when it is the short last one.
            let delta = self.cursor.next_offset() as i64 - self.position as i64;
            self.position = self
                .sink
                .seek_relative(delta)
                .map_err(ConvertError::io(IoStage::Seek))?;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> u32 {
        self.cursor.rows_placed()
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Check that every row was written and hand the sink back.
    pub fn finish(self) -> Result<S, ConvertError> {
        if !self.cursor.is_complete() {
            return Err(ConvertError::IncompleteRaster {
                written: self.cursor.rows_placed(),
                expected: self.cursor.rows_total,
            });
        }
        Ok(self.sink)
    }
}

/// Reverse the order of `stride`-byte rows in `group`.
fn reverse_rows(group: &mut [u8], stride: usize) {
    let rows = group.len() / stride;
    for i in 0..rows / 2 {
        let (head, tail) = group.split_at_mut((rows - 1 - i) * stride);
        head[i * stride..(i + 1) * stride].swap_with_slice(&mut tail[..stride]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: u64 = 4;

    /// Rows of `stride` bytes, each filled with its top-down row number.
    fn group(first_row: u8, rows: u8, stride: usize) -> Vec<u8> {
        (first_row..first_row + rows)
            .flat_map(|r| std::iter::repeat_n(r, stride))
            .collect()
    }

    fn write_all_groups(total: u8, group_height: u8, stride: usize) -> Vec<u8> {
        let mut sink = Cursor::new(vec![0xEEu8; HEADER as usize]);
        sink.set_position(HEADER);
        let cursor = RasterCursor::new(HEADER, stride, total.into(), group_height.into());
        let mut writer = BottomUpRasterWriter::begin(&mut sink, cursor).unwrap();
        let mut row = 0;
        while row < total {
            let rows = group_height.min(total - row);
            writer.write_group(&mut group(row, rows, stride)).unwrap();
            row += rows;
        }
        writer.finish().unwrap();
        sink.into_inner()
    }

    /// Top-down row numbers as read back from a bottom-up raster.
    fn rows_top_down(file: &[u8], stride: usize) -> Vec<u8> {
        file[HEADER as usize..]
            .chunks_exact(stride)
            .rev()
            .map(|row| {
                assert!(row.iter().all(|&b| b == row[0]), "torn row {row:?}");
                row[0]
            })
            .collect()
    }

    #[test]
    fn start_offset_is_last_group_slot() {
        let cursor = RasterCursor::new(138, 960, 320, 8);
        assert_eq!(cursor.start_offset(), 138 + 312 * 960);
        let short = RasterCursor::new(138, 960, 5, 8);
        assert_eq!(short.start_offset(), 138);
    }

    #[test]
    fn full_groups_end_up_bottom_up() {
        let file = write_all_groups(12, 4, 3);
        assert_eq!(file.len(), HEADER as usize + 12 * 3);
        assert_eq!(&file[..HEADER as usize], &[0xEE; 4]);
        assert_eq!(rows_top_down(&file, 3), (0..12).collect::<Vec<u8>>());
    }

    #[test]
    fn short_last_group_lands_at_end_of_header() {
        let file = write_all_groups(10, 4, 2);
        assert_eq!(file.len(), HEADER as usize + 10 * 2);
        assert_eq!(rows_top_down(&file, 2), (0..10).collect::<Vec<u8>>());
    }

    #[test]
    fn single_group_image() {
        let file = write_all_groups(3, 8, 4);
        assert_eq!(rows_top_down(&file, 4), vec![0, 1, 2]);
    }

    #[test]
    fn overflowing_group_is_rejected() {
        let mut sink = Cursor::new(Vec::new());
        let cursor = RasterCursor::new(0, 2, 4, 4);
        let mut writer = BottomUpRasterWriter::begin(&mut sink, cursor).unwrap();
        writer.write_group(&mut group(0, 4, 2)).unwrap();
        assert!(matches!(
            writer.write_group(&mut group(4, 1, 2)),
            Err(ConvertError::RasterOverflow {
                rows: 1,
                remaining: 0
            })
        ));
    }

    #[test]
    fn ragged_group_is_rejected() {
        let mut sink = Cursor::new(Vec::new());
        let cursor = RasterCursor::new(0, 4, 4, 4);
        let mut writer = BottomUpRasterWriter::begin(&mut sink, cursor).unwrap();
        assert!(matches!(
            writer.write_group(&mut [0u8; 6]),
            Err(ConvertError::PartialRow { bytes: 6, row_stride: 4 })
        ));
    }

    #[test]
    fn missing_rows_fail_finish() {
        let mut sink = Cursor::new(Vec::new());
        let cursor = RasterCursor::new(0, 2, 8, 4);
        let mut writer = BottomUpRasterWriter::begin(&mut sink, cursor).unwrap();
        writer.write_group(&mut group(0, 4, 2)).unwrap();
        assert!(matches!(
            writer.finish(),
            Err(ConvertError::IncompleteRaster {
                written: 4,
                expected: 8
            })
        ));
    }

    /// Accepts at most `limit` bytes per write.
    struct ShortWrites {
        inner: Cursor<Vec<u8>>,
        limit: usize,
    }

    impl DataSink for ShortWrites {
        fn write_bytes(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            let n = bytes.len().min(self.limit);
            self.inner.write(&bytes[..n])
        }

        fn seek_relative(&mut self, delta: i64) -> std::io::Result<u64> {
            self.inner.seek(SeekFrom::Current(delta))
        }

        fn seek_to(&mut self, offset: u64) -> std::io::Result<u64> {
            self.inner.seek(SeekFrom::Start(offset))
        }
    }

    #[test]
    fn short_write_is_fatal() {
        let sink = ShortWrites {
            inner: Cursor::new(Vec::new()),
            limit: 5,
        };
        let cursor = RasterCursor::new(0, 4, 8, 4);
        let mut writer = BottomUpRasterWriter::begin(sink, cursor).unwrap();
        assert!(matches!(
            writer.write_group(&mut group(0, 4, 4)),
            Err(ConvertError::PartialWrite {
                written: 5,
                expected: 16
            })
        ));
    }

    /// Records every relative seek.
    struct SeekLog {
        inner: Cursor<Vec<u8>>,
        seeks: Vec<i64>,
    }

    impl DataSink for SeekLog {
        fn write_bytes(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            self.inner.write(bytes)
        }

        fn seek_relative(&mut self, delta: i64) -> std::io::Result<u64> {
            self.seeks.push(delta);
            self.inner.seek(SeekFrom::Current(delta))
        }

        fn seek_to(&mut self, offset: u64) -> std::io::Result<u64> {
            self.inner.seek(SeekFrom::Start(offset))
        }
    }

    #[test]
    fn full_groups_seek_back_twice_the_bytes_written() {
        let sink = SeekLog {
            inner: Cursor::new(Vec::new()),
            seeks: Vec::new(),
        };
        let cursor = RasterCursor::new(HEADER, 3, 12, 4);
        let mut writer = BottomUpRasterWriter::begin(sink, cursor).unwrap();
        for first in [0, 4, 8] {
            writer.write_group(&mut group(first, 4, 3)).unwrap();
        }
        assert_eq!(writer.bytes_written(), 36);
        let sink = writer.finish().unwrap();
        // No seek after the last group.
        assert_eq!(sink.seeks, vec![-24, -24]);
    }

    #[test]
    fn short_last_group_shortens_the_final_seek() {
        let sink = SeekLog {
            inner: Cursor::new(Vec::new()),
            seeks: Vec::new(),
        };
        let cursor = RasterCursor::new(HEADER, 2, 6, 4);
        let mut writer = BottomUpRasterWriter::begin(sink, cursor).unwrap();
        writer.write_group(&mut group(0, 4, 2)).unwrap();
        writer.write_group(&mut group(4, 2, 2)).unwrap();
        let sink = writer.finish().unwrap();
        assert_eq!(sink.seeks, vec![-12]);
    }

    #[test]
    fn reverse_rows_in_place() {
        let mut g = vec![1, 1, 2, 2, 3, 3];
        reverse_rows(&mut g, 2);
        assert_eq!(g, vec![3, 3, 2, 2, 1, 1]);
    }
}
