//! # Read-only engines: incidence & emergence
//!
//! Signed angles between the beams and the sample surface. The surface
//! normal is a mode parameter triple (x, y, z), rotated with the sample
//! holder before the projection. Convention: with an outward normal, a
//! beam dipping **into** the surface has positive incidence
//! (α_i = asin(−k̂ᵢ·n̂)) and a beam leaving the surface has positive
//! emergence (α_e = asin(k̂f·n̂)). The second pseudo-axis, azimuth, is the
//! orientation of the rotated normal in the yOz plane.

use nalgebra::Vector3;

use crate::constants::EPSILON;
use crate::detector::Detector;
use crate::engine::{Dependencies, Engine, Mode};
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;
use crate::parameter::Parameter;
use crate::sample::Sample;

use super::hkl::{angle_parameter, surface_normal};

fn rotated_normal(geometry: &Geometry, n: &Vector3<f64>) -> Result<Vector3<f64>, GonioError> {
    if n.norm() < EPSILON {
        return Err(GonioError::Degenerate(
            "the surface normal parameters are null".to_string(),
        ));
    }
    Ok((geometry.sample_rotation() * n).normalize())
}

/// Signed incidence angle of ki above the surface of normal `n`
/// (detector-independent).
pub(crate) fn incidence_of(geometry: &Geometry, n: &Vector3<f64>) -> Result<f64, GonioError> {
    let n = rotated_normal(geometry, n)?;
    let ki = geometry.ki().normalize();
    Ok((-ki.dot(&n)).clamp(-1.0, 1.0).asin())
}

/// Signed emergence angle of kf above the surface of normal `n`.
pub(crate) fn emergence_of(
    geometry: &Geometry,
    detector: &Detector,
    n: &Vector3<f64>,
) -> Result<f64, GonioError> {
    let n = rotated_normal(geometry, n)?;
    let kf = geometry.kf(detector).normalize();
    Ok(kf.dot(&n).clamp(-1.0, 1.0).asin())
}

fn azimuth_of(geometry: &Geometry, n: &Vector3<f64>) -> Result<f64, GonioError> {
    let n = rotated_normal(geometry, n)?;
    Ok(f64::atan2(n.z, n.y))
}

fn incidence_get(
    mode: &Mode,
    geometry: &Geometry,
    _detector: &Detector,
    _sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    let n = surface_normal(mode.parameters());
    Ok(vec![incidence_of(geometry, &n)?, azimuth_of(geometry, &n)?])
}

fn emergence_get(
    mode: &Mode,
    geometry: &Geometry,
    detector: &Detector,
    _sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    let n = surface_normal(mode.parameters());
    Ok(vec![
        emergence_of(geometry, detector, &n)?,
        azimuth_of(geometry, &n)?,
    ])
}

/// Read-only incidence engine over the sample axes.
pub fn incidence_engine(
    axes_r: &'static [&'static str],
    surface: Vec<Parameter>,
) -> Engine {
    Engine::new(
        "incidence",
        vec![
            angle_parameter("incidence", "signed angle between ki and the surface", 0.0),
            angle_parameter("azimuth", "orientation of the surface normal in yOz", 0.0),
        ],
        Dependencies::AXES_ENERGY,
        vec![Mode::readonly("incidence", axes_r, surface, incidence_get)],
    )
}

/// Read-only emergence engine over the full axis set.
pub fn emergence_engine(
    axes_r: &'static [&'static str],
    surface: Vec<Parameter>,
) -> Engine {
    Engine::new(
        "emergence",
        vec![
            angle_parameter("emergence", "signed angle between kf and the surface", 0.0),
            angle_parameter("azimuth", "orientation of the surface normal in yOz", 0.0),
        ],
        Dependencies::AXES_ENERGY,
        vec![Mode::readonly("emergence", axes_r, surface, emergence_get)],
    )
}
