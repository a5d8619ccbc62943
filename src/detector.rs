//! Detectors seen from the kinematics side.
//!
//! The core only needs the direction of the outgoing beam in the detector
//! frame; pixel geometries are carried along for the 1D/2D kinds so that
//! callers can map pixels to angular offsets, but no image processing
//! happens here.

use nalgebra::Vector3;

/// Pixel layout of a position-sensitive detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelGeometry {
    /// Pixel pitch along the fast axis, in meter.
    pub pixel_size: f64,
    /// Number of pixels along the fast axis.
    pub n_pixels: u32,
}

impl Default for PixelGeometry {
    fn default() -> Self {
        PixelGeometry {
            pixel_size: 55e-6,
            n_pixels: 1024,
        }
    }
}

/// The supported detector families.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorKind {
    /// Point detector.
    ZeroD,
    /// Strip detector.
    OneD(PixelGeometry),
    /// Area detector.
    TwoD(PixelGeometry),
}

/// A detector bound to the last holder of a [`Geometry`](crate::geometry::Geometry).
#[derive(Debug, Clone, PartialEq)]
pub struct Detector {
    kind: DetectorKind,
}

impl Detector {
    pub fn new(kind: DetectorKind) -> Detector {
        Detector { kind }
    }

    /// Point detector, the default of every test and most beamline setups.
    pub fn zero_d() -> Detector {
        Detector::new(DetectorKind::ZeroD)
    }

    pub fn kind(&self) -> DetectorKind {
        self.kind
    }

    /// Direction of the detected beam in the detector frame.
    ///
    /// All kinds point along x; the detector holder rotations carry this
    /// direction into the laboratory frame.
    pub fn kf_direction(&self) -> Vector3<f64> {
        Vector3::x()
    }
}

impl Default for Detector {
    fn default() -> Self {
        Detector::zero_d()
    }
}

#[cfg(test)]
mod detector_test {
    use super::*;

    #[test]
    fn test_kinds() {
        let d0 = Detector::zero_d();
        assert_eq!(d0.kind(), DetectorKind::ZeroD);
        assert_eq!(d0.kf_direction(), Vector3::x());

        let d1 = Detector::new(DetectorKind::OneD(PixelGeometry::default()));
        assert_eq!(d1.kf_direction(), Vector3::x());
        match d1.kind() {
            DetectorKind::OneD(pixels) => assert_eq!(pixels.n_pixels, 1024),
            _ => panic!("wrong detector kind"),
        }
    }
}
