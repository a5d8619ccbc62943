//! # The hkl engine
//!
//! Pseudo-axes (h, k, l): the Miller indices of the reflection currently
//! in diffraction condition. The core residual shared by every hkl mode is
//!
//! ```text
//! R_sample · U · B · (h, k, l)ᵀ − (kf − ki) = 0
//! ```
//!
//! three equations that each mode closes with zero or one extra scalar
//! constraint (a fixed axis needs none, bissector/psi/emergence add one).
//! The geometry-specific constraints (bissector variants, kappa forms)
//! live next to their factories; this module provides the residual rows
//! and closing equations shared across geometries.

use nalgebra::{DVector, Vector3};

use crate::algebra::any_nan;
use crate::detector::Detector;
use crate::engine::{Dependencies, Engine, GetFn, Mode, ResidualFunction, Workspace};
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;
use crate::parameter::Parameter;
use crate::sample::Sample;
use crate::unit::{Unit, UnitKind};

fn miller_index(name: &'static str, description: &'static str) -> Parameter {
    Parameter::new(name, description, -1.0, 0.0, 1.0, true, Unit::Unitless, Unit::Unitless)
        .expect("the Miller index defaults are admissible")
}

/// Dimensionless mode parameter (reference reflection components,
/// surface normals...).
pub(crate) fn scalar_parameter(
    name: &'static str,
    description: &'static str,
    value: f64,
) -> Parameter {
    Parameter::new(
        name,
        description,
        -1.0,
        value,
        1.0,
        true,
        Unit::Unitless,
        Unit::Unitless,
    )
    .expect("the scalar parameter defaults are admissible")
}

/// Angle mode parameter, radian internally, degree at the boundary.
pub(crate) fn angle_parameter(
    name: &'static str,
    description: &'static str,
    value: f64,
) -> Parameter {
    Parameter::new(
        name,
        description,
        -std::f64::consts::PI,
        value,
        std::f64::consts::PI,
        true,
        Unit::Radian,
        Unit::Degree,
    )
    .expect("the angle parameter defaults are admissible")
}

/// Build the hkl engine over the given mode catalog; the first mode is
/// the default one.
pub fn new_engine(modes: Vec<Mode>) -> Engine {
    Engine::new(
        "hkl",
        vec![
            miller_index("h", "first Miller index"),
            miller_index("k", "second Miller index"),
            miller_index("l", "third Miller index"),
        ],
        Dependencies::ALL,
        modes,
    )
}

/// Forward computation shared by every hkl mode:
/// (h, k, l) = (R_sample · UB)⁻¹ · (kf − ki).
pub fn hkl_get(
    _mode: &Mode,
    geometry: &Geometry,
    detector: &Detector,
    sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    let q = geometry.kf(detector) - geometry.ki();
    let hkl = geometry.project_into_reciprocal(&q, sample)?;
    Ok(vec![hkl.x, hkl.y, hkl.z])
}

pub const HKL_GET: GetFn = hkl_get;

/// The three shared residual rows: (kf − ki) − R·UB·(h, k, l)ᵀ.
///
/// Installs `x` into the write axes as a side effect.
pub fn rubh_minus_q_rows(x: &[f64], w: &mut Workspace) -> Result<Vector3<f64>, GonioError> {
    if any_nan(x) {
        return Err(GonioError::bad_input("hkl", "NaN in the solver vector"));
    }
    w.set_axes(x);

    let hkl = Vector3::new(w.targets[0], w.targets[1], w.targets[2]);
    let modeled = w.geometry.sample_rotation() * (w.sample.ub() * hkl);
    let q = w.geometry.kf(w.detector) - w.geometry.ki();
    Ok(q - modeled)
}

fn rubh_minus_q(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    let rows = rubh_minus_q_rows(x, w)?;
    Ok(DVector::from_vec(vec![rows.x, rows.y, rows.z]))
}

/// Square system for modes with three write axes and no extra constraint.
pub static RUBH_MINUS_Q: [ResidualFunction; 1] = [ResidualFunction {
    f: rubh_minus_q,
    size: 3,
}];

/// Vertical bissector closing equation, for write sets laid out as
/// (omega, _, _, tth): tth − 2·fmod(omega, π) = 0.
fn bissector_vertical(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    let omega = x[0];
    let tth = x[3];
    let rows = rubh_minus_q_rows(x, w)?;
    Ok(DVector::from_vec(vec![
        rows.x,
        rows.y,
        rows.z,
        tth - 2.0 * (omega % std::f64::consts::PI),
    ]))
}

pub static BISSECTOR_VERTICAL: [ResidualFunction; 1] = [ResidualFunction {
    f: bissector_vertical,
    size: 4,
}];

/// Double diffraction: the second reflection (h2, k2, l2) must sit on the
/// Ewald sphere as well: |ki + R·UB·h2| − |ki| = 0.
fn double_diffraction(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    let rows = rubh_minus_q_rows(x, w)?;
    let hkl2 = Vector3::new(w.parameter(0), w.parameter(1), w.parameter(2));
    let kf2 = w.geometry.ki() + w.geometry.sample_rotation() * (w.sample.ub() * hkl2);
    Ok(DVector::from_vec(vec![
        rows.x,
        rows.y,
        rows.z,
        kf2.norm() - w.geometry.ki().norm(),
    ]))
}

pub static DOUBLE_DIFFRACTION: [ResidualFunction; 1] = [ResidualFunction {
    f: double_diffraction,
    size: 4,
}];

pub fn double_diffraction_parameters() -> Vec<Parameter> {
    vec![
        scalar_parameter("h2", "h of the secondary reflection", 1.0),
        scalar_parameter("k2", "k of the secondary reflection", 1.0),
        scalar_parameter("l2", "l of the secondary reflection", 1.0),
    ]
}

/// Fixed azimuth around Q: psi of the reference reflection (h2, k2, l2)
/// must match the `psi` mode parameter.
fn psi_constant(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    let rows = rubh_minus_q_rows(x, w)?;
    let reference = Vector3::new(w.parameter(0), w.parameter(1), w.parameter(2));
    let psi = super::psi::compute_psi(w.geometry, w.detector, w.sample, &reference)?;
    Ok(DVector::from_vec(vec![
        rows.x,
        rows.y,
        rows.z,
        psi - w.parameter(3),
    ]))
}

pub static PSI_CONSTANT: [ResidualFunction; 1] = [ResidualFunction {
    f: psi_constant,
    size: 4,
}];

pub fn psi_constant_parameters() -> Vec<Parameter> {
    vec![
        scalar_parameter("h2", "h of the reference reflection", 1.0),
        scalar_parameter("k2", "k of the reference reflection", 1.0),
        scalar_parameter("l2", "l of the reference reflection", 1.0),
        angle_parameter("psi", "azimuth of the reference reflection around Q", 0.0),
    ]
}

/// Fixed emergence angle of kf above the sample surface.
fn emergence_fixed(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    let rows = rubh_minus_q_rows(x, w)?;
    let n = Vector3::new(w.parameter(0), w.parameter(1), w.parameter(2));
    let emergence = super::readonly::emergence_of(w.geometry, w.detector, &n)?;
    Ok(DVector::from_vec(vec![
        rows.x,
        rows.y,
        rows.z,
        emergence - w.parameter(3),
    ]))
}

pub static EMERGENCE_FIXED: [ResidualFunction; 1] = [ResidualFunction {
    f: emergence_fixed,
    size: 4,
}];

pub fn emergence_fixed_parameters() -> Vec<Parameter> {
    vec![
        scalar_parameter("x", "x component of the surface normal", 0.0),
        scalar_parameter("y", "y component of the surface normal", 1.0),
        scalar_parameter("z", "z component of the surface normal", 0.0),
        angle_parameter("emergence", "fixed emergence angle of kf", 0.0),
    ]
}

/// Surface normal along y (vertical geometries).
pub fn surface_parameters_y() -> Vec<Parameter> {
    vec![
        scalar_parameter("x", "x component of the surface normal", 0.0),
        scalar_parameter("y", "y component of the surface normal", 1.0),
        scalar_parameter("z", "z component of the surface normal", 0.0),
    ]
}

/// Surface normal along z.
pub fn surface_parameters_z() -> Vec<Parameter> {
    vec![
        scalar_parameter("x", "x component of the surface normal", 0.0),
        scalar_parameter("y", "y component of the surface normal", 0.0),
        scalar_parameter("z", "z component of the surface normal", 1.0),
    ]
}

/// Surface normal read from the first three parameters of a mode.
pub(crate) fn surface_normal(parameters: &[Parameter]) -> Vector3<f64> {
    Vector3::new(
        parameters[0].value(UnitKind::Default),
        parameters[1].value(UnitKind::Default),
        parameters[2].value(UnitKind::Default),
    )
}
