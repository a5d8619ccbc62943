//! # Scattering-angle engines: tth, tth2
//!
//! `tth` exposes the signed angle between ki and kf on a single detector
//! circle; `tth2` adds `alpha`, the orientation of kf around the beam, on
//! a two-circle detector arm. The sign convention is the q one (negative
//! when kf_y < 0 or kf_z < 0).

use nalgebra::{DVector, Vector3};

use crate::algebra::{any_nan, project_on_plane, vector_angle};
use crate::detector::Detector;
use crate::engine::{Dependencies, Engine, Mode, ResidualFunction, Workspace};
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;
use crate::sample::Sample;

use super::hkl::angle_parameter;
use super::q::signed_theta;

fn tth_get(
    _mode: &Mode,
    geometry: &Geometry,
    detector: &Detector,
    _sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    Ok(vec![2.0 * signed_theta(geometry, detector)])
}

fn tth_func(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    if any_nan(x) {
        return Err(GonioError::bad_input("tth", "NaN in the solver vector"));
    }
    w.set_axes(x);
    let tth = 2.0 * signed_theta(w.geometry, w.detector);
    Ok(DVector::from_vec(vec![w.targets[0] - tth]))
}

static TTH_FUNCS: [ResidualFunction; 1] = [ResidualFunction { f: tth_func, size: 1 }];

/// The tth engine over a single detector circle.
pub fn tth_engine(tth_axis: &'static [&'static str]) -> Engine {
    Engine::new(
        "tth",
        vec![angle_parameter("tth", "angle between ki and kf", 0.0)],
        Dependencies::AXES_ENERGY,
        vec![Mode::auto("tth", tth_axis, tth_axis, &TTH_FUNCS, vec![], tth_get)],
    )
}

fn tth2_values(geometry: &Geometry, detector: &Detector) -> (f64, f64) {
    let ki = geometry.ki();
    let kf = geometry.kf(detector);
    let tth = vector_angle(&ki, &kf);
    let kf = project_on_plane(&kf, &Vector3::x());
    (tth, f64::atan2(kf.z, kf.y))
}

fn tth2_get(
    _mode: &Mode,
    geometry: &Geometry,
    detector: &Detector,
    _sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    let (tth, alpha) = tth2_values(geometry, detector);
    Ok(vec![tth, alpha])
}

fn tth2_func(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    if any_nan(x) {
        return Err(GonioError::bad_input("tth2", "NaN in the solver vector"));
    }
    w.set_axes(x);
    let (tth, alpha) = tth2_values(w.geometry, w.detector);
    Ok(DVector::from_vec(vec![
        w.targets[0] - tth,
        w.targets[1] - alpha,
    ]))
}

static TTH2_FUNCS: [ResidualFunction; 1] = [ResidualFunction { f: tth2_func, size: 2 }];

/// The tth2 engine over a two-circle detector arm.
pub fn tth2_engine(detector_axes: &'static [&'static str]) -> Engine {
    Engine::new(
        "tth2",
        vec![
            angle_parameter("tth", "angle between ki and kf", 0.0),
            angle_parameter("alpha", "angle of the projection of kf on the yOz plane", 0.0),
        ],
        Dependencies::AXES_ENERGY,
        vec![Mode::auto(
            "tth2",
            detector_axes,
            detector_axes,
            &TTH2_FUNCS,
            vec![],
            tth2_get,
        )],
    )
}
