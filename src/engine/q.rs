//! # Momentum-transfer engines: q, q2, qper_qpar
//!
//! * `q`: the signed norm of the momentum transfer on a single detector
//!   circle: q = q_max·sin(θ) with θ = ∠(ki, kf)/2 and
//!   q_max = 2·(2π/λ).
//! * `q2`: (q, alpha) on a two-circle detector arm, alpha being the
//!   angle of the projection of kf on the yOz plane.
//! * `qper_qpar`: decomposition of q = kf − ki along the sample surface
//!   normal (rotated with the sample) and in-plane.
//!
//! The sign of θ follows the orientation of kf in direct space (negative
//! when kf_y < 0 or kf_z < 0). This is a convention inherited from the
//! beamline control history, not a derivation.

use nalgebra::{DVector, Vector3};

use crate::algebra::{angle_restrict_symm, any_nan, project_on_plane, vector_angle};
use crate::constants::TAU;
use crate::detector::Detector;
use crate::engine::{Dependencies, Engine, Mode, ResidualFunction, Workspace};
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;
use crate::parameter::Parameter;
use crate::sample::Sample;
use crate::unit::Unit;

use super::hkl::{angle_parameter, surface_normal};

/// Largest reachable |q| at the given wavelength.
pub fn qmax(wavelength: f64) -> f64 {
    2.0 * TAU / wavelength
}

fn q_pseudo(name: &'static str, description: &'static str) -> Parameter {
    Parameter::new(name, description, -1.0, 0.0, 1.0, true, Unit::Unitless, Unit::Unitless)
        .expect("the q pseudo-axis defaults are admissible")
}

/// Signed half-scattering angle; see the module doc for the convention.
pub(crate) fn signed_theta(geometry: &Geometry, detector: &Detector) -> f64 {
    let ki = geometry.ki();
    let kf = geometry.kf(detector);
    let theta = vector_angle(&ki, &kf) / 2.0;
    if kf.y < 0.0 || kf.z < 0.0 {
        -theta
    } else {
        theta
    }
}

/*****/
/* q */
/*****/

fn q_get(
    _mode: &Mode,
    geometry: &Geometry,
    detector: &Detector,
    _sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    let theta = signed_theta(geometry, detector);
    Ok(vec![qmax(geometry.source().wavelength()) * theta.sin()])
}

fn q_func(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    if any_nan(x) {
        return Err(GonioError::bad_input("q", "NaN in the solver vector"));
    }
    w.set_axes(x);

    let tth = angle_restrict_symm(x[0]);
    let q = qmax(w.geometry.source().wavelength()) * (tth / 2.0).sin();
    Ok(DVector::from_vec(vec![w.targets[0] - q]))
}

static Q_FUNCS: [ResidualFunction; 1] = [ResidualFunction { f: q_func, size: 1 }];

/// The q engine over a single detector circle.
pub fn q_engine(tth_axis: &'static [&'static str]) -> Engine {
    Engine::new(
        "q",
        vec![q_pseudo("q", "norm of the momentum transfer")],
        Dependencies::AXES_ENERGY,
        vec![Mode::auto("q", tth_axis, tth_axis, &Q_FUNCS, vec![], q_get)],
    )
}

/******/
/* q2 */
/******/

fn q2_values(geometry: &Geometry, detector: &Detector) -> (f64, f64) {
    let ki = geometry.ki();
    let kf = geometry.kf(detector);
    let theta = vector_angle(&ki, &kf) / 2.0;
    let q = qmax(geometry.source().wavelength()) * theta.sin();

    // project kf on the yOz plane to compute alpha
    let kf = project_on_plane(&kf, &Vector3::x());
    (q, f64::atan2(kf.z, kf.y))
}

fn q2_get(
    _mode: &Mode,
    geometry: &Geometry,
    detector: &Detector,
    _sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    let (q, alpha) = q2_values(geometry, detector);
    Ok(vec![q, alpha])
}

fn q2_func(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    if any_nan(x) {
        return Err(GonioError::bad_input("q2", "NaN in the solver vector"));
    }
    w.set_axes(x);

    let (q, alpha) = q2_values(w.geometry, w.detector);
    Ok(DVector::from_vec(vec![
        w.targets[0] - q,
        w.targets[1] - alpha,
    ]))
}

static Q2_FUNCS: [ResidualFunction; 1] = [ResidualFunction { f: q2_func, size: 2 }];

/// The q2 engine over a two-circle detector arm.
pub fn q2_engine(detector_axes: &'static [&'static str]) -> Engine {
    Engine::new(
        "q2",
        vec![
            q_pseudo("q", "norm of the momentum transfer"),
            angle_parameter("alpha", "angle of the projection of kf on the yOz plane", 0.0),
        ],
        Dependencies::AXES_ENERGY,
        vec![Mode::auto(
            "q2",
            detector_axes,
            detector_axes,
            &Q2_FUNCS,
            vec![],
            q2_get,
        )],
    )
}

/************/
/* qper_qpar */
/************/

fn qper_qpar_values(
    geometry: &Geometry,
    detector: &Detector,
    n: &Vector3<f64>,
) -> (f64, f64) {
    let ki = geometry.ki();
    let q = geometry.kf(detector) - ki;

    // real orientation of the surface normal
    let n = (geometry.sample_rotation() * n).normalize();

    // in-plane direction fixing the sign of qpar
    let npar = ki.cross(&n);

    let along = q.dot(&n);
    let qper_v = n * along;
    let mut qper = qper_v.norm();
    if along.is_sign_negative() {
        qper = -qper;
    }

    let across = q.dot(&npar);
    let qpar_v = q - qper_v;
    let mut qpar = qpar_v.norm();
    if across.is_sign_negative() {
        qpar = -qpar;
    }

    (qper, qpar)
}

fn qper_qpar_get(
    mode: &Mode,
    geometry: &Geometry,
    detector: &Detector,
    _sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    let n = surface_normal(mode.parameters());
    let (qper, qpar) = qper_qpar_values(geometry, detector, &n);
    Ok(vec![qper, qpar])
}

fn qper_qpar_func(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    if any_nan(x) {
        return Err(GonioError::bad_input("qper_qpar", "NaN in the solver vector"));
    }
    w.set_axes(x);

    let n = Vector3::new(w.parameter(0), w.parameter(1), w.parameter(2));
    let (qper, qpar) = qper_qpar_values(w.geometry, w.detector, &n);
    Ok(DVector::from_vec(vec![
        w.targets[0] - qper,
        w.targets[1] - qpar,
    ]))
}

static QPER_QPAR_FUNCS: [ResidualFunction; 1] =
    [ResidualFunction { f: qper_qpar_func, size: 2 }];

/// The qper_qpar engine over a two-circle detector arm, with the surface
/// normal as mode parameters.
pub fn qper_qpar_engine(detector_axes: &'static [&'static str]) -> Engine {
    Engine::new(
        "qper_qpar",
        vec![
            q_pseudo("qper", "momentum transfer along the surface normal"),
            q_pseudo("qpar", "in-plane momentum transfer"),
        ],
        Dependencies::AXES_ENERGY,
        vec![Mode::auto(
            "qper_qpar",
            detector_axes,
            detector_axes,
            &QPER_QPAR_FUNCS,
            super::hkl::surface_parameters_y(),
            qper_qpar_get,
        )],
    )
}
