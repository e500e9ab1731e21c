/// Resource limits for a conversion session.
///
/// All fields default to `None` (no limit). Limits are checked after the
/// window is planned and before the row-group buffer is allocated, so a
/// rejected session never touches the output file.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height) of the decode window.
    pub max_pixels: Option<u64>,
    /// Maximum bytes for any single allocation: the row-group buffer, or
    /// the working storage the decoder asks for.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Check window dimensions against limits.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), crate::ConvertError> {
        if let Some(max_w) = self.max_width {
            if u64::from(width) > max_w {
                return Err(crate::ConvertError::LimitExceeded(format!(
                    "width {width} exceeds limit {max_w}"
                )));
            }
        }
        if let Some(max_h) = self.max_height {
            if u64::from(height) > max_h {
                return Err(crate::ConvertError::LimitExceeded(format!(
                    "height {height} exceeds limit {max_h}"
                )));
            }
        }
        if let Some(max_px) = self.max_pixels {
            let pixels = u64::from(width) * u64::from(height);
            if pixels > max_px {
                return Err(crate::ConvertError::LimitExceeded(format!(
                    "pixel count {pixels} exceeds limit {max_px}"
                )));
            }
        }
        Ok(())
    }

    /// Check that an allocation size is within memory limits.
    pub(crate) fn check_memory(&self, what: &str, bytes: usize) -> Result<(), crate::ConvertError> {
        if let Some(max_mem) = self.max_memory_bytes {
            if bytes as u64 > max_mem {
                return Err(crate::ConvertError::LimitExceeded(format!(
                    "{what} of {bytes} bytes exceeds memory limit {max_mem}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConvertError;

    #[test]
    fn unlimited_accepts_anything() {
        let limits = Limits::default();
        assert!(limits.check(u32::MAX, u32::MAX).is_ok());
        assert!(limits.check_memory("buffer", usize::MAX).is_ok());
    }

    #[test]
    fn pixel_count_is_checked_in_u64() {
        let limits = Limits {
            max_pixels: Some(480 * 320),
            ..Default::default()
        };
        assert!(limits.check(480, 320).is_ok());
        assert!(matches!(
            limits.check(481, 320),
            Err(ConvertError::LimitExceeded(_))
        ));
    }

    #[test]
    fn memory_limit_names_the_allocation() {
        let limits = Limits {
            max_memory_bytes: Some(1024),
            ..Default::default()
        };
        match limits.check_memory("row-group buffer", 4096) {
            Err(ConvertError::LimitExceeded(msg)) => assert!(msg.contains("row-group buffer")),
            other => panic!("expected LimitExceeded, got {other:?}"),
        }
    }
}
