//! Decode window planning.

use crate::error::ConvertError;

/// User overrides for the decode window, straight from the command line.
///
/// Width and height that are unset or `<= 0` fall back to the native
/// dimension. A negative offset means the same as an unset one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowOverrides {
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub x_offset: Option<i64>,
    pub y_offset: Option<i64>,
}

/// The rectangle requested from the decoder.
///
/// `None` offsets are left to the decoder's default placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodeWindow {
    pub x: Option<u32>,
    pub y: Option<u32>,
    pub width: u32,
    pub height: u32,
}

impl DecodeWindow {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: None,
            y: None,
            width,
            height,
        }
    }
}

/// Resolve the decode window from native dimensions and overrides.
///
/// Whether the result fits the native frame is not checked here; the
/// decoder owns that rule and reports violations on the next pull.
pub fn plan_window(
    native_width: u32,
    native_height: u32,
    overrides: &WindowOverrides,
) -> Result<DecodeWindow, ConvertError> {
    let width = dimension(overrides.width, native_width);
    let height = dimension(overrides.height, native_height);
    let (Some(width), Some(height)) = (width, height) else {
        return Err(ConvertError::DimensionsTooLarge {
            width: overrides.width.map_or(u64::from(native_width), |w| w as u64),
            height: overrides.height.map_or(u64::from(native_height), |h| h as u64),
        });
    };
    Ok(DecodeWindow {
        x: offset(overrides.x_offset),
        y: offset(overrides.y_offset),
        width,
        height,
    })
}

fn dimension(requested: Option<i64>, native: u32) -> Option<u32> {
    match requested {
        Some(v) if v > 0 => u32::try_from(v).ok(),
        _ => Some(native),
    }
}

fn offset(requested: Option<i64>) -> Option<u32> {
    // Offsets past u32::MAX are out of bounds for any frame; saturate and
    // let the decoder reject them.
    requested
        .filter(|&v| v >= 0)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_overrides_is_the_native_frame() {
        let w = plan_window(480, 320, &WindowOverrides::default()).unwrap();
        assert_eq!(w, DecodeWindow::full(480, 320));
    }

    #[test]
    fn non_positive_dimensions_fall_back() {
        let overrides = WindowOverrides {
            width: Some(0),
            height: Some(-5),
            ..Default::default()
        };
        let w = plan_window(480, 320, &overrides).unwrap();
        assert_eq!((w.width, w.height), (480, 320));
    }

    #[test]
    fn positive_dimensions_and_offsets_pass_through() {
        let overrides = WindowOverrides {
            width: Some(64),
            height: Some(32),
            x_offset: Some(16),
            y_offset: Some(0),
        };
        let w = plan_window(480, 320, &overrides).unwrap();
        assert_eq!(
            w,
            DecodeWindow {
                x: Some(16),
                y: Some(0),
                width: 64,
                height: 32
            }
        );
    }

    #[test]
    fn oversized_window_is_not_clamped() {
        let overrides = WindowOverrides {
            width: Some(4096),
            x_offset: Some(1000),
            ..Default::default()
        };
        let w = plan_window(480, 320, &overrides).unwrap();
        assert_eq!(w.width, 4096);
        assert_eq!(w.x, Some(1000));
    }

    #[test]
    fn negative_offset_is_unspecified() {
        let overrides = WindowOverrides {
            x_offset: Some(-1),
            y_offset: Some(-1),
            ..Default::default()
        };
        let w = plan_window(8, 8, &overrides).unwrap();
        assert_eq!((w.x, w.y), (None, None));
    }

    #[test]
    fn width_beyond_u32_is_rejected() {
        let overrides = WindowOverrides {
            width: Some(i64::from(u32::MAX) + 1),
            ..Default::default()
        };
        assert!(matches!(
            plan_window(8, 8, &overrides),
            Err(ConvertError::DimensionsTooLarge { .. })
        ));
    }
}
