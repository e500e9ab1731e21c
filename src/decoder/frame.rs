//! Start-of-frame probe.
//!
//! Walks the marker segments in front of the first scan and pulls out the
//! frame header. Only the fields the row-group decoder needs are kept:
//! coding process, precision, dimensions and sampling factors.

use super::DecodeError;
use crate::info::ScanType;

const SOI: u8 = 0xD8;
const EOI: u8 = 0xD9;
const SOS: u8 = 0xDA;
const TEM: u8 = 0x01;

/// Frame header fields from the SOFn segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    /// n in SOFn: 0 baseline, 1 extended sequential, 2 progressive, ...
    pub sof_type: u8,
    pub precision: u8,
    pub width: u16,
    pub height: u16,
    /// (h, v) sampling factors per component, in frame order.
    pub sampling: Vec<(u8, u8)>,
}

impl FrameInfo {
    pub fn is_progressive(&self) -> bool {
        matches!(self.sof_type, 2 | 6 | 10 | 14)
    }

    /// Huffman-coded sequential DCT (SOF0 or SOF1).
    pub fn is_sequential_huffman(&self) -> bool {
        matches!(self.sof_type, 0 | 1)
    }

    pub fn components(&self) -> u8 {
        self.sampling.len() as u8
    }

    /// The scan type, or `None` for a component count or sampling layout
    /// the row-group decoder does not produce.
    pub fn scan_type(&self) -> Option<ScanType> {
        match self.sampling.as_slice() {
            [_] => Some(ScanType::Grayscale),
            [(h, v), (1, 1), (1, 1)] => ScanType::from_luma_sampling(*h, *v),
            _ => None,
        }
    }
}

/// Find and parse the frame header in `data`.
pub fn probe_frame(data: &[u8]) -> Result<FrameInfo, DecodeError> {
    if data.len() < 2 || data[0] != 0xFF || data[1] != SOI {
        return Err(DecodeError::Corrupt("not a JPEG file (missing SOI marker)".into()));
    }
    let mut pos = 2;
    loop {
        let marker = next_marker(data, &mut pos)?;
        match marker {
            SOS | EOI => {
                return Err(DecodeError::Corrupt("no frame header before first scan".into()));
            }
            TEM | 0xD0..=0xD7 => continue,
            _ => {}
        }
        let body = segment(data, &mut pos)?;
        // C4 DHT, C8 JPG and CC DAC share the range but are not frames.
        if matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            return parse_sof(marker - 0xC0, body);
        }
    }
}

fn next_marker(data: &[u8], pos: &mut usize) -> Result<u8, DecodeError> {
    // Skip anything up to an 0xFF, then any fill bytes.
    while *pos < data.len() && data[*pos] != 0xFF {
        *pos += 1;
    }
    while *pos < data.len() && data[*pos] == 0xFF {
        *pos += 1;
    }
    match data.get(*pos) {
        Some(&m) if m != 0x00 => {
            *pos += 1;
            Ok(m)
        }
        Some(_) => Err(DecodeError::Corrupt("stuffed byte outside entropy data".into())),
        None => Err(DecodeError::Corrupt("unexpected end of input in markers".into())),
    }
}

fn segment<'a>(data: &'a [u8], pos: &mut usize) -> Result<&'a [u8], DecodeError> {
    let eof = || DecodeError::Corrupt("unexpected end of input in segment".into());
    let len_bytes = data.get(*pos..*pos + 2).ok_or_else(eof)?;
    let len = usize::from(u16::from_be_bytes([len_bytes[0], len_bytes[1]]));
    if len < 2 {
        return Err(DecodeError::Corrupt(format!("segment length {len} is too short")));
    }
    let body = data.get(*pos + 2..*pos + len).ok_or_else(eof)?;
    *pos += len;
    Ok(body)
}

fn parse_sof(sof_type: u8, data: &[u8]) -> Result<FrameInfo, DecodeError> {
    if data.len() < 6 {
        return Err(DecodeError::Corrupt("frame header too short".into()));
    }
    let precision = data[0];
    let height = u16::from_be_bytes([data[1], data[2]]);
    let width = u16::from_be_bytes([data[3], data[4]]);
    let count = usize::from(data[5]);
    if width == 0 || height == 0 {
        return Err(DecodeError::Corrupt(format!(
            "frame dimensions {width}x{height} are not supported"
        )));
    }
    let specs = data
        .get(6..6 + count * 3)
        .ok_or_else(|| DecodeError::Corrupt("frame header truncated in component list".into()))?;
    let sampling = specs
        .chunks_exact(3)
        .map(|c| (c[1] >> 4, c[1] & 0x0F))
        .collect();
    Ok(FrameInfo {
        sof_type,
        precision,
        width,
        height,
        sampling,
    })
}
