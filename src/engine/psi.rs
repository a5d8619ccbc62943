//! # The psi engine
//!
//! psi is the azimuth of a reference reflection around the momentum
//! transfer Q. The engine is stateful: `initialized_set(true)` captures
//! the (h, k, l) of the current position, and the inverse solve rotates
//! the sample around Q while keeping that reflection in diffraction
//! condition (three residual rows pin the captured hkl, the fourth pins
//! psi).

use nalgebra::{DVector, Vector3};

use crate::algebra::{any_nan, oriented_angle, project_on_plane};
use crate::constants::EPSILON;
use crate::detector::Detector;
use crate::engine::{Dependencies, Engine, Mode, ModeData, ResidualFunction, Workspace};
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;
use crate::sample::Sample;

use super::hkl::{angle_parameter, scalar_parameter};

/// The azimuth of `reference` (Miller indices) around the current Q.
///
/// Geometry: Q = kf − ki is normalized; the zero of psi is the
/// intersection of the scattering plane (ki, kf) with the plane normal to
/// Q, i.e. the direction (kf × ki) × Q; psi is the oriented angle from
/// that direction to the projection of R·UB·reference, around Q.
pub(crate) fn compute_psi(
    geometry: &Geometry,
    detector: &Detector,
    sample: &Sample,
    reference: &Vector3<f64>,
) -> Result<f64, GonioError> {
    let ki = geometry.ki();
    let kf = geometry.kf(detector);
    let q = kf - ki;
    if q.norm() < EPSILON {
        return Err(GonioError::Degenerate(
            "psi is undefined when kf == ki".to_string(),
        ));
    }
    let q = q.normalize();

    let zero = kf.cross(&ki).cross(&q);
    let hkl1 = geometry.sample_rotation() * (sample.ub() * reference);
    let hkl1 = project_on_plane(&hkl1, &q);
    if hkl1.norm() < EPSILON {
        return Err(GonioError::Degenerate(
            "the psi reference reflection is parallel to Q".to_string(),
        ));
    }
    Ok(oriented_angle(&zero, &hkl1, &q))
}

fn psi_parameters() -> Vec<crate::parameter::Parameter> {
    vec![
        scalar_parameter("h2", "h of the reference reflection", 1.0),
        scalar_parameter("k2", "k of the reference reflection", 1.0),
        scalar_parameter("l2", "l of the reference reflection", 1.0),
    ]
}

fn psi_init(
    mode: &mut Mode,
    geometry: &Geometry,
    detector: &Detector,
    sample: &Sample,
) -> Result<(), GonioError> {
    let q = geometry.kf(detector) - geometry.ki();
    if q.norm() < EPSILON {
        return Err(GonioError::Degenerate(
            "can not initialize the psi engine when kf == ki".to_string(),
        ));
    }
    let hkl0 = geometry.project_into_reciprocal(&q, sample)?;
    mode.data = ModeData::Psi { hkl0 };
    Ok(())
}

fn psi_get(
    mode: &Mode,
    geometry: &Geometry,
    detector: &Detector,
    sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    let reference = super::hkl::surface_normal(mode.parameters());
    Ok(vec![compute_psi(geometry, detector, sample, &reference)?])
}

/// Four rows: keep the captured reflection in diffraction condition and
/// pin psi to its target.
fn psi_func(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    if any_nan(x) {
        return Err(GonioError::bad_input("psi", "NaN in the solver vector"));
    }
    w.set_axes(x);

    let hkl0 = match w.data {
        ModeData::Psi { hkl0 } => *hkl0,
        ModeData::None => return Err(GonioError::NotInitialized("psi".to_string())),
    };
    let q = w.geometry.kf(w.detector) - w.geometry.ki();
    let hkl = w.geometry.project_into_reciprocal(&q, w.sample)?;
    let d_hkl = hkl - hkl0;

    let reference = Vector3::new(w.parameter(0), w.parameter(1), w.parameter(2));
    let psi = compute_psi(w.geometry, w.detector, w.sample, &reference)?;

    Ok(DVector::from_vec(vec![
        d_hkl.x,
        d_hkl.y,
        d_hkl.z,
        psi - w.targets[0],
    ]))
}

static PSI_FUNCS: [ResidualFunction; 1] = [ResidualFunction { f: psi_func, size: 4 }];

/// The psi mode over four write axes (sample circles + detector circle).
pub fn psi_mode(axes: &'static [&'static str]) -> Mode {
    Mode::auto("psi", axes, axes, &PSI_FUNCS, psi_parameters(), psi_get).with_init(psi_init)
}

pub fn new_engine(mode: Mode) -> Engine {
    Engine::new(
        "psi",
        vec![angle_parameter("psi", "azimuth of the reference reflection around Q", 0.0)],
        Dependencies::ALL,
        vec![mode],
    )
}
