use crate::window::DecodeWindow;

/// Chroma subsampling layout reported by the decoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScanType {
    Grayscale,
    H1V1,
    H2V1,
    H1V2,
    H2V2,
}

impl ScanType {
    /// Scan type for a luma sampling factor pair, with chroma at 1x1.
    pub fn from_luma_sampling(h: u8, v: u8) -> Option<Self> {
        match (h, v) {
            (1, 1) => Some(Self::H1V1),
            (2, 1) => Some(Self::H2V1),
            (1, 2) => Some(Self::H1V2),
            (2, 2) => Some(Self::H2V2),
            _ => None,
        }
    }

    /// Height in pixels of one MCU row.
    pub fn mcu_height(&self) -> u32 {
        match self {
            Self::Grayscale | Self::H1V1 | Self::H2V1 => 8,
            Self::H1V2 | Self::H2V2 => 16,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Grayscale => "GRAYSCALE",
            Self::H1V1 => "H1V1",
            Self::H2V1 => "H2V1",
            Self::H1V2 => "H1V2",
            Self::H2V2 => "H2V2",
        }
    }
}

impl std::fmt::Display for ScanType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Image metadata produced by decoder init.
///
/// The window starts out as the full native frame and is replaced exactly
/// once, by [`ImageDescriptor::with_window`], after planning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub native_width: u32,
    pub native_height: u32,
    pub components: u8,
    pub scan_type: ScanType,
    /// Rows per pull, as reported by the decoder. Opaque to the driver.
    pub row_group_height: u32,
    window: DecodeWindow,
}

impl ImageDescriptor {
    pub fn new(
        native_width: u32,
        native_height: u32,
        components: u8,
        scan_type: ScanType,
        row_group_height: u32,
    ) -> Self {
        Self {
            native_width,
            native_height,
            components,
            scan_type,
            row_group_height,
            window: DecodeWindow::full(native_width, native_height),
        }
    }

    pub fn window(&self) -> &DecodeWindow {
        &self.window
    }

    /// Replace the window with a planned one.
    pub fn with_window(self, window: DecodeWindow) -> Self {
        Self { window, ..self }
    }
}
