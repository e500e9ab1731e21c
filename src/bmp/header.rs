//! BITMAPFILEHEADER + BITMAPV5HEADER.

use crate::pixel::OutputFormat;

/// Serialized header size, and offset of the first raster byte.
pub const HEADER_LEN: usize = FILE_HEADER_LEN + V5_HEADER_LEN;

const FILE_HEADER_LEN: usize = 14;
const V5_HEADER_LEN: usize = 124;

const BI_RGB: u32 = 0;
const BI_BITFIELDS: u32 = 3;
/// 300 DPI.
const PIXELS_PER_METER: u32 = 11811;
/// 'sRGB', stored little-endian as "BGRs".
const LCS_SRGB: u32 = 0x7352_4742;
const LCS_GM_GRAPHICS: u32 = 2;

/// Header for a bottom-up BMP.
///
/// Everything but the four size fields is fixed by `format`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapHeader {
    /// Header plus pixel data.
    pub file_size: u32,
    pub width: u32,
    /// Written as a positive height, i.e. bottom-up rows.
    pub height: u32,
    pub pixel_data_size: u32,
    pub format: OutputFormat,
}

impl BitmapHeader {
    pub fn new(width: u32, height: u32, pixel_data_size: u32, format: OutputFormat) -> Option<Self> {
        let file_size = pixel_data_size.checked_add(HEADER_LEN as u32)?;
        Some(Self {
            file_size,
            width,
            height,
            pixel_data_size,
            format,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let (compression, masks) = match self.format {
            OutputFormat::Rgb565 => (BI_BITFIELDS, [0xF800, 0x07E0, 0x001F, 0]),
            OutputFormat::Bgr888 => (BI_RGB, [0; 4]),
        };

        let mut out = Vec::with_capacity(HEADER_LEN);
        // File header (14 bytes)
        out.extend_from_slice(b"BM");
        out.extend_from_slice(&self.file_size.to_le_bytes());
        out.extend_from_slice(&[0u8; 4]); // reserved
        out.extend_from_slice(&(HEADER_LEN as u32).to_le_bytes()); // data offset

        // BITMAPV5HEADER (124 bytes)
        out.extend_from_slice(&(V5_HEADER_LEN as u32).to_le_bytes());
        out.extend_from_slice(&self.width.to_le_bytes());
        out.extend_from_slice(&self.height.to_le_bytes()); // positive = bottom-up
        out.extend_from_slice(&1u16.to_le_bytes()); // planes
        out.extend_from_slice(&self.format.bits_per_pixel().to_le_bytes());
        out.extend_from_slice(&compression.to_le_bytes());
        out.extend_from_slice(&self.pixel_data_size.to_le_bytes());
        out.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
        out.extend_from_slice(&PIXELS_PER_METER.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // colors used
        out.extend_from_slice(&0u32.to_le_bytes()); // important colors
        for mask in masks {
            out.extend_from_slice(&u32::to_le_bytes(mask));
        }
        out.extend_from_slice(&LCS_SRGB.to_le_bytes());
        out.extend_from_slice(&[0u8; 36]); // endpoints, unused for sRGB
        out.extend_from_slice(&[0u8; 12]); // gamma
        out.extend_from_slice(&LCS_GM_GRAPHICS.to_le_bytes());
        out.extend_from_slice(&[0u8; 12]); // profile data, profile size, reserved

        let mut bytes = [0u8; HEADER_LEN];
        bytes.copy_from_slice(&out);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le32(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn size_fields_land_at_their_offsets() {
        let header = BitmapHeader::new(480, 320, 480 * 320 * 2, OutputFormat::Rgb565).unwrap();
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..2], b"BM");
        assert_eq!(le32(&bytes, 2), 138 + 480 * 320 * 2);
        assert_eq!(le32(&bytes, 10), 138);
        assert_eq!(le32(&bytes, 14), 124);
        assert_eq!(le32(&bytes, 18), 480);
        assert_eq!(le32(&bytes, 22), 320);
        assert_eq!(le32(&bytes, 34), 480 * 320 * 2);
    }

    #[test]
    fn rgb565_uses_bitfields() {
        let bytes = BitmapHeader::new(2, 2, 16, OutputFormat::Rgb565)
            .unwrap()
            .to_bytes();
        assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 16);
        assert_eq!(le32(&bytes, 30), 3);
        assert_eq!(le32(&bytes, 54), 0xF800);
        assert_eq!(le32(&bytes, 58), 0x07E0);
        assert_eq!(le32(&bytes, 62), 0x001F);
        assert_eq!(&bytes[70..74], b"BGRs");
        assert_eq!(le32(&bytes, 122), 2);
    }

    #[test]
    fn bgr888_is_plain_rgb() {
        let bytes = BitmapHeader::new(4, 1, 12, OutputFormat::Bgr888)
            .unwrap()
            .to_bytes();
        assert_eq!(u16::from_le_bytes([bytes[28], bytes[29]]), 24);
        assert_eq!(le32(&bytes, 30), 0);
        assert_eq!(le32(&bytes, 54), 0);
    }

    #[test]
    fn file_size_overflow_is_none() {
        assert!(BitmapHeader::new(1, 1, u32::MAX, OutputFormat::Rgb565).is_none());
    }
}
