//! Kappa 4-circle vertical geometry (K4CV).
//!
//! The kappa stage realizes the eulerian circles with a 50°-tilted kappa
//! axis; the hkl closing equations therefore go through the
//! kappa → eulerian map before constraining omega/chi/phi.

use nalgebra::{DVector, Vector3};

use crate::constants::KAPPA_ALPHA;
use crate::engine::eulerians::{eulerians_engine, kappa_to_eulerian};
use crate::engine::hkl::{
    angle_parameter, double_diffraction_parameters, psi_constant_parameters,
    surface_parameters_y, rubh_minus_q_rows, DOUBLE_DIFFRACTION, HKL_GET, PSI_CONSTANT,
};
use crate::engine::{hkl, psi, q, readonly, tth, EngineList, Mode, ResidualFunction, Workspace};
use crate::factory::Factory;
use crate::geometry::{Geometry, GEOMETRY_OPS_DEFAULT};
use crate::gonio_errors::GonioError;
use crate::unit::Unit;

const KOMEGA: &str = "komega";
const KAPPA: &str = "kappa";
const KPHI: &str = "kphi";
const TTH: &str = "tth";

const K4CV_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 3 axes for the sample
  + komega: rotating around the -y direction (0, -1, 0)
  + kappa: rotating around the (0, -cos(50°), -sin(50°)) direction
  + kphi: rotating around the -y direction (0, -1, 0)
+ 1 axis for the detector
  + tth: rotating around the -y direction (0, -1, 0)";

static K4CV_AXES: [&str; 4] = [KOMEGA, KAPPA, KPHI, TTH];
static K4CV_KAPPA_AXES: [&str; 3] = [KOMEGA, KAPPA, KPHI];
static K4CV_TTH: [&str; 1] = [TTH];

fn new_k4cv_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);
    let kappa_axis = Vector3::new(0.0, -KAPPA_ALPHA.cos(), -KAPPA_ALPHA.sin());

    let h = g.add_holder();
    g.add_rotation(h, KOMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, KAPPA, kappa_axis, Unit::Degree);
    g.add_rotation(h, KPHI, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, TTH, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    g.update();
    g
}

/// Bissector closing equation through the kappa → eulerian map, for
/// write sets laid out as (komega, kappa, _, tth).
fn kappa_bissector_rows(
    x: &[f64],
    w: &mut Workspace,
    solution: bool,
) -> Result<DVector<f64>, GonioError> {
    let rows = rubh_minus_q_rows(x, w)?;
    let (omega, ..) = kappa_to_eulerian(x[0], x[1], 0.0, KAPPA_ALPHA, solution);
    let tth = x[3];
    Ok(DVector::from_vec(vec![
        rows.x,
        rows.y,
        rows.z,
        (tth - 2.0 * (omega % std::f64::consts::PI)) % crate::constants::DPI,
    ]))
}

fn bissector_f1(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    kappa_bissector_rows(x, w, false)
}

fn bissector_f2(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    kappa_bissector_rows(x, w, true)
}

pub(crate) static KAPPA_BISSECTOR_VERTICAL: [ResidualFunction; 2] = [
    ResidualFunction { f: bissector_f1, size: 4 },
    ResidualFunction { f: bissector_f2, size: 4 },
];

/// Pin one eulerian angle (selected by `INDEX`) to the mode parameter.
fn kappa_constant_rows<const INDEX: usize>(
    x: &[f64],
    w: &mut Workspace,
) -> Result<DVector<f64>, GonioError> {
    let rows = rubh_minus_q_rows(x, w)?;
    let (omega, chi, phi) = kappa_to_eulerian(x[0], x[1], x[2], KAPPA_ALPHA, false);
    let eulerians = [omega, chi, phi];
    Ok(DVector::from_vec(vec![
        rows.x,
        rows.y,
        rows.z,
        eulerians[INDEX] - w.parameter(0),
    ]))
}

pub(crate) static KAPPA_CONSTANT_OMEGA: [ResidualFunction; 1] = [ResidualFunction {
    f: kappa_constant_rows::<0>,
    size: 4,
}];
pub(crate) static KAPPA_CONSTANT_CHI: [ResidualFunction; 1] = [ResidualFunction {
    f: kappa_constant_rows::<1>,
    size: 4,
}];
pub(crate) static KAPPA_CONSTANT_PHI: [ResidualFunction; 1] = [ResidualFunction {
    f: kappa_constant_rows::<2>,
    size: 4,
}];

pub(crate) fn constant_omega_parameters() -> Vec<crate::parameter::Parameter> {
    vec![angle_parameter("omega", "fixed eulerian omega", 0.0)]
}

pub(crate) fn constant_chi_parameters() -> Vec<crate::parameter::Parameter> {
    vec![angle_parameter("chi", "fixed eulerian chi", 0.0)]
}

pub(crate) fn constant_phi_parameters() -> Vec<crate::parameter::Parameter> {
    vec![angle_parameter("phi", "fixed eulerian phi", 0.0)]
}

fn k4cv_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto("bissector", &K4CV_AXES, &K4CV_AXES, &KAPPA_BISSECTOR_VERTICAL, vec![], HKL_GET),
        Mode::auto(
            "constant_omega",
            &K4CV_AXES,
            &K4CV_AXES,
            &KAPPA_CONSTANT_OMEGA,
            constant_omega_parameters(),
            HKL_GET,
        ),
        Mode::auto(
            "constant_chi",
            &K4CV_AXES,
            &K4CV_AXES,
            &KAPPA_CONSTANT_CHI,
            constant_chi_parameters(),
            HKL_GET,
        ),
        Mode::auto(
            "constant_phi",
            &K4CV_AXES,
            &K4CV_AXES,
            &KAPPA_CONSTANT_PHI,
            constant_phi_parameters(),
            HKL_GET,
        ),
        Mode::auto(
            "double_diffraction",
            &K4CV_AXES,
            &K4CV_AXES,
            &DOUBLE_DIFFRACTION,
            double_diffraction_parameters(),
            HKL_GET,
        ),
        Mode::auto(
            "psi_constant",
            &K4CV_AXES,
            &K4CV_AXES,
            &PSI_CONSTANT,
            psi_constant_parameters(),
            HKL_GET,
        ),
    ]
}

fn new_k4cv_engines() -> EngineList {
    let mut list = EngineList::new();
    list.add_engine(hkl::new_engine(k4cv_hkl_modes()));
    list.add_engine(eulerians_engine(&K4CV_KAPPA_AXES));
    list.add_engine(psi::new_engine(psi::psi_mode(&K4CV_AXES)));
    list.add_engine(q::q_engine(&K4CV_TTH));
    list.add_engine(tth::tth_engine(&K4CV_TTH));
    list.add_engine(readonly::incidence_engine(&K4CV_KAPPA_AXES, surface_parameters_y()));
    list.add_engine(readonly::emergence_engine(&K4CV_AXES, surface_parameters_y()));
    list
}

pub static K4CV: Factory = Factory {
    name: "K4CV",
    description: K4CV_DESCRIPTION,
    axes: &K4CV_AXES,
    geometry: new_k4cv_geometry,
    engines: new_k4cv_engines,
};
