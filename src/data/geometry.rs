//! Pixel-space to frame-relative coordinate mapping.
//!
//! The sensing backend reports bounding boxes in the pixels of its fixed
//! capture resolution. Overlay rendering wants positions as percentages of
//! the displayed frame, so boxes scale with whatever size the frame is
//! shown at. The reference resolution is a configuration constant, not
//! something inferred from the stream.

/// Default reference resolution of the upstream capture.
pub const DEFAULT_REFERENCE_WIDTH: f64 = 640.0;
pub const DEFAULT_REFERENCE_HEIGHT: f64 = 640.0;

/// Axis-aligned box in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Box expressed as percentages of the reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Maps pixel boxes onto percent-of-frame coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FrameGeometry {
    reference_width: f64,
    reference_height: f64,
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_WIDTH, DEFAULT_REFERENCE_HEIGHT)
    }
}

impl FrameGeometry {
    /// Create a mapper for the given reference resolution.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is non-positive or non-finite; a bad
    /// reference resolution is a configuration error and is rejected at
    /// construction time.
    pub fn new(reference_width: f64, reference_height: f64) -> Self {
        assert!(
            reference_width.is_finite() && reference_width > 0.0,
            "reference width must be positive"
        );
        assert!(
            reference_height.is_finite() && reference_height > 0.0,
            "reference height must be positive"
        );
        Self {
            reference_width,
            reference_height,
        }
    }

    pub fn reference_width(&self) -> f64 {
        self.reference_width
    }

    pub fn reference_height(&self) -> f64 {
        self.reference_height
    }

    /// Remap a pixel box to percent-of-frame units.
    pub fn normalize(&self, pixels: &PixelBox) -> OverlayBox {
        OverlayBox {
            x: pixels.x / self.reference_width * 100.0,
            y: pixels.y / self.reference_height * 100.0,
            width: pixels.width / self.reference_width * 100.0,
            height: pixels.height / self.reference_height * 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_centered_box() {
        let geometry = FrameGeometry::default();
        let overlay = geometry.normalize(&PixelBox {
            x: 320.0,
            y: 320.0,
            width: 64.0,
            height: 64.0,
        });
        assert_eq!(overlay.x, 50.0);
        assert_eq!(overlay.y, 50.0);
        assert_eq!(overlay.width, 10.0);
        assert_eq!(overlay.height, 10.0);
    }

    #[test]
    fn test_normalize_non_square_reference() {
        let geometry = FrameGeometry::new(1280.0, 720.0);
        let overlay = geometry.normalize(&PixelBox {
            x: 640.0,
            y: 360.0,
            width: 128.0,
            height: 72.0,
        });
        assert_eq!(overlay.x, 50.0);
        assert_eq!(overlay.y, 50.0);
        assert_eq!(overlay.width, 10.0);
        assert_eq!(overlay.height, 10.0);
    }

    #[test]
    fn test_origin_maps_to_zero() {
        let geometry = FrameGeometry::default();
        let overlay = geometry.normalize(&PixelBox {
            x: 0.0,
            y: 0.0,
            width: 640.0,
            height: 640.0,
        });
        assert_eq!(overlay.x, 0.0);
        assert_eq!(overlay.width, 100.0);
    }

    #[test]
    #[should_panic(expected = "reference width must be positive")]
    fn test_zero_reference_rejected() {
        let _ = FrameGeometry::new(0.0, 640.0);
    }

    #[test]
    #[should_panic(expected = "reference height must be positive")]
    fn test_negative_reference_rejected() {
        let _ = FrameGeometry::new(640.0, -640.0);
    }
}
