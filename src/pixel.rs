use rgb::RGB8;

/// Pixel format of the output raster.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// 16-bit packed RGB, 5-6-5, little-endian. Stored with BI_BITFIELDS.
    Rgb565,
    /// 24-bit truecolor in BMP byte order (B, G, R).
    Bgr888,
}

/// One decoded source row handed to [`OutputFormat::pack_row`].
#[derive(Clone, Copy, Debug)]
pub enum SourceRow<'a> {
    Gray(&'a [u8]),
    Rgb(&'a [RGB8]),
}

impl SourceRow<'_> {
    pub fn width(&self) -> usize {
        match self {
            Self::Gray(px) => px.len(),
            Self::Rgb(px) => px.len(),
        }
    }
}

impl OutputFormat {
    /// The format this binary was built for: RGB565 unless the `rgb888`
    /// feature is enabled.
    pub const BUILD_DEFAULT: OutputFormat = if cfg!(feature = "rgb888") {
        OutputFormat::Bgr888
    } else {
        OutputFormat::Rgb565
    };

    /// Bytes per pixel for this format.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Rgb565 => 2,
            Self::Bgr888 => 3,
        }
    }

    pub fn bits_per_pixel(&self) -> u16 {
        (self.bytes_per_pixel() * 8) as u16
    }

    /// Row stride for `width` pixels, padded to the 4-byte boundary BMP
    /// readers expect. `None` on overflow.
    pub fn row_stride(&self, width: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(self.bytes_per_pixel())
            .and_then(|r| r.checked_add(3))
            .map(|r| r & !3)
    }

    /// Pack one source row into `dst` and zero the padding after it.
    ///
    /// `dst` must hold at least `row.width() * bytes_per_pixel()` bytes.
    pub fn pack_row(&self, row: SourceRow<'_>, dst: &mut [u8]) {
        let bpp = self.bytes_per_pixel();
        let used = row.width() * bpp;
        let (pixels, padding) = dst.split_at_mut(used);
        match row {
            SourceRow::Gray(src) => {
                for (out, &g) in pixels.chunks_exact_mut(bpp).zip(src) {
                    self.put(out, RGB8::new(g, g, g));
                }
            }
            SourceRow::Rgb(src) => {
                for (out, &px) in pixels.chunks_exact_mut(bpp).zip(src) {
                    self.put(out, px);
                }
            }
        }
        padding.fill(0);
    }

    #[inline]
    fn put(&self, out: &mut [u8], px: RGB8) {
        match self {
            Self::Rgb565 => out.copy_from_slice(&pack_565(px).to_le_bytes()),
            Self::Bgr888 => {
                out[0] = px.b;
                out[1] = px.g;
                out[2] = px.r;
            }
        }
    }
}

#[inline]
fn pack_565(px: RGB8) -> u16 {
    (u16::from(px.r >> 3) << 11) | (u16::from(px.g >> 2) << 5) | u16::from(px.b >> 3)
}
