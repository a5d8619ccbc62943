//! SOLEIL SIXS MED geometries: the 2+2, 1+2 and 2+3 arrangements of the
//! médiane surface-diffraction endstation, plus the 2+3 v2 variant whose
//! slit realignment is driven by an engine-list parameter.
//!
//! The 2+3 variants carry an extra detector axis (eta_a) holding the
//! slits; after each solve a 1-D fit rotates it so that the slit normal
//! stays perpendicular to the sample surface.

use nalgebra::{DVector, Vector3};

use crate::constants::EPSILON;
use crate::engine::hkl::{
    emergence_fixed_parameters, rubh_minus_q_rows, surface_parameters_y, surface_parameters_z,
    EMERGENCE_FIXED, HKL_GET, RUBH_MINUS_Q,
};
use crate::engine::{hkl, q, readonly, tth, EngineList, Mode, ResidualFunction, Workspace};
use crate::factory::Factory;
use crate::geometry::list::GeometryList;
use crate::geometry::{Geometry, GEOMETRY_OPS_DEFAULT};
use crate::gonio_errors::GonioError;
use crate::parameter::{Parameter, Transformation};
use crate::rng;
use crate::unit::{Unit, UnitKind};

const PITCH: &str = "pitch";
const BETA: &str = "beta";
const MU: &str = "mu";
const OMEGA: &str = "omega";
const GAMMA: &str = "gamma";
const DELTA: &str = "delta";
const ETA_A: &str = "eta_a";

/***********************/
/* SOLEIL SIXS MED 2+2 */
/***********************/

const MED_2_2_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 3 axes for the sample
  + beta: rotating around the -y direction (0, -1, 0)
  + mu: rotating around the z direction (0, 0, 1)
  + omega: rotating around the -y direction (0, -1, 0)
+ 3 axes for the detector
  + beta: rotating around the -y direction (0, -1, 0)
  + gamma: rotating around the z direction (0, 0, 1)
  + delta: rotating around the -y direction (0, -1, 0)";

static MED_2_2_AXES: [&str; 5] = [BETA, MU, OMEGA, GAMMA, DELTA];
static MED_2_2_SAMPLE_AXES: [&str; 3] = [BETA, MU, OMEGA];
static MED_2_2_DETECTOR_AXES: [&str; 2] = [GAMMA, DELTA];
static MED_2_2_W_MU_FIXED: [&str; 3] = [OMEGA, GAMMA, DELTA];
static MED_2_2_W_FULL: [&str; 4] = [MU, OMEGA, GAMMA, DELTA];

fn new_med_2_2_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);

    let h = g.add_holder();
    g.add_rotation(h, BETA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, MU, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, OMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, BETA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, GAMMA, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, DELTA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    g.update();
    g
}

/// Reflectivity on the 2+2: gamma tracks twice mu, for write sets laid
/// out as (mu, _, gamma, _).
fn reflectivity_func(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    let mu = x[0];
    let gamma = x[2];
    let rows = rubh_minus_q_rows(x, w)?;
    Ok(DVector::from_vec(vec![
        rows.x,
        rows.y,
        rows.z,
        gamma - 2.0 * mu,
    ]))
}

static REFLECTIVITY: [ResidualFunction; 1] = [ResidualFunction {
    f: reflectivity_func,
    size: 4,
}];

fn med_2_2_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto("mu_fixed", &MED_2_2_AXES, &MED_2_2_W_MU_FIXED, &RUBH_MINUS_Q, vec![], HKL_GET),
        Mode::auto("reflectivity", &MED_2_2_AXES, &MED_2_2_W_FULL, &REFLECTIVITY, vec![], HKL_GET),
        Mode::auto(
            "emergence_fixed",
            &MED_2_2_AXES,
            &MED_2_2_W_FULL,
            &EMERGENCE_FIXED,
            emergence_fixed_parameters(),
            HKL_GET,
        ),
    ]
}

fn new_med_2_2_engines() -> EngineList {
    let mut list = EngineList::new();
    list.add_engine(hkl::new_engine(med_2_2_hkl_modes()));
    list.add_engine(q::q2_engine(&MED_2_2_DETECTOR_AXES));
    list.add_engine(q::qper_qpar_engine(&MED_2_2_DETECTOR_AXES));
    list.add_engine(tth::tth2_engine(&MED_2_2_DETECTOR_AXES));
    list.add_engine(readonly::incidence_engine(&MED_2_2_SAMPLE_AXES, surface_parameters_y()));
    list.add_engine(readonly::emergence_engine(&MED_2_2_AXES, surface_parameters_y()));
    list
}

pub static SOLEIL_SIXS_MED_2_2: Factory = Factory {
    name: "SOLEIL SIXS MED2+2",
    description: MED_2_2_DESCRIPTION,
    axes: &MED_2_2_AXES,
    geometry: new_med_2_2_geometry,
    engines: new_med_2_2_engines,
};

/***********************/
/* SOLEIL SIXS MED 1+2 */
/***********************/

const MED_1_2_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 2 axes for the sample
  + pitch: rotating around the -y direction (0, -1, 0)
  + mu: rotating around the z direction (0, 0, 1)
+ 3 axes for the detector
  + pitch: rotating around the -y direction (0, -1, 0)
  + gamma: rotating around the z direction (0, 0, 1)
  + delta: rotating around the -y direction (0, -1, 0)";

static MED_1_2_AXES: [&str; 4] = [PITCH, MU, GAMMA, DELTA];
static MED_1_2_SAMPLE_AXES: [&str; 2] = [PITCH, MU];
static MED_1_2_DETECTOR_AXES: [&str; 2] = [GAMMA, DELTA];
static MED_1_2_W_PITCH_FIXED: [&str; 3] = [MU, GAMMA, DELTA];
static MED_1_2_W_DELTA_FIXED: [&str; 3] = [PITCH, MU, GAMMA];

fn new_med_1_2_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);

    let h = g.add_holder();
    g.add_rotation(h, PITCH, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, MU, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, PITCH, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, GAMMA, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, DELTA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    g.update();
    g
}

fn med_1_2_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto(
            "pitch_fixed",
            &MED_1_2_AXES,
            &MED_1_2_W_PITCH_FIXED,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "delta_fixed",
            &MED_1_2_AXES,
            &MED_1_2_W_DELTA_FIXED,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
    ]
}

fn new_med_1_2_engines() -> EngineList {
    let mut list = EngineList::new();
    list.add_engine(hkl::new_engine(med_1_2_hkl_modes()));
    list.add_engine(q::q2_engine(&MED_1_2_DETECTOR_AXES));
    list.add_engine(q::qper_qpar_engine(&MED_1_2_DETECTOR_AXES));
    list.add_engine(tth::tth2_engine(&MED_1_2_DETECTOR_AXES));
    list.add_engine(readonly::incidence_engine(&MED_1_2_SAMPLE_AXES, surface_parameters_z()));
    list.add_engine(readonly::emergence_engine(&MED_1_2_AXES, surface_parameters_z()));
    list
}

pub static SOLEIL_SIXS_MED_1_2: Factory = Factory {
    name: "SOLEIL SIXS MED1+2",
    description: MED_1_2_DESCRIPTION,
    axes: &MED_1_2_AXES,
    geometry: new_med_1_2_geometry,
    engines: new_med_1_2_engines,
};

/***********************/
/* SOLEIL SIXS MED 2+3 */
/***********************/

const MED_2_3_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 3 axes for the sample
  + beta: rotating around the -y direction (0, -1, 0)
  + mu: rotating around the z direction (0, 0, 1)
  + omega: rotating around the -y direction (0, -1, 0)
+ 4 axes for the detector
  + beta: rotating around the -y direction (0, -1, 0)
  + gamma: rotating around the z direction (0, 0, 1)
  + delta: rotating around the -y direction (0, -1, 0)
  + eta_a: rotating around the -x direction (-1, 0, 0)";

static MED_2_3_AXES: [&str; 6] = [BETA, MU, OMEGA, GAMMA, DELTA, ETA_A];
static MED_2_3_W_GAMMA_FIXED: [&str; 3] = [MU, OMEGA, DELTA];

fn new_med_2_3_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);

    let h = g.add_holder();
    g.add_rotation(h, BETA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, MU, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, OMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, BETA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, GAMMA, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, DELTA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, ETA_A, Vector3::new(-1.0, 0.0, 0.0), Unit::Degree);

    g.update();
    g
}

/// Orientation mismatch between the slit normal and the sample surface
/// for a candidate slit angle.
fn slits_residual(geometry: &mut Geometry, idx: usize, x: f64, surface: &Vector3<f64>) -> f64 {
    geometry.axis_value_set_raw(idx, x);
    geometry.update();
    let n_slits = geometry.detector_rotation() * Vector3::z();
    surface.dot(&n_slits)
}

/// 1-D root solve on the slit axis: Newton steps with random restarts,
/// the same recipe as the main solver.
fn fit_slits_orientation(
    geometry: &mut Geometry,
    idx: usize,
    surface: &Vector3<f64>,
) -> bool {
    let mut x = geometry.axes()[idx].value(UnitKind::Default);

    for iteration in 1..=1000 {
        let f = slits_residual(geometry, idx, x, surface);
        if f.abs() < EPSILON {
            // put the axis in the positive range
            let lifted = crate::algebra::angle_restrict_pos(x);
            geometry.axis_value_set_raw(idx, lifted);
            geometry.update();
            return true;
        }

        let h = 1e-6;
        let df = (slits_residual(geometry, idx, x + h, surface) - f) / h;
        if !df.is_finite() || df.abs() < 1e-12 || iteration % 100 == 0 {
            x = rng::uniform(-std::f64::consts::PI, std::f64::consts::PI);
        } else {
            x -= f / df;
        }
    }
    false
}

/// Per-solution slit realignment: rotate the last detector axis so that
/// the slit normal stays perpendicular to the sample surface (the last
/// sample axis direction, rotated with the sample).
fn multiply_med_2_3(geometry: &mut Geometry) {
    let Some(&slits_idx) = geometry.holders().last().and_then(|h| h.indices().last()) else {
        return;
    };
    let Some(&surface_idx) = geometry.holders().first().and_then(|h| h.indices().last())
    else {
        return;
    };
    let axis_v = match geometry.axes()[surface_idx].transformation() {
        Transformation::Rotation { axis, .. } => *axis,
        _ => return,
    };
    let surface = geometry.sample_rotation() * axis_v;

    let saved = geometry.axes()[slits_idx].value(UnitKind::Default);
    if !fit_slits_orientation(geometry, slits_idx, &surface) {
        geometry.axis_value_set_raw(slits_idx, saved);
        geometry.update();
    }
}

fn med_2_3_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto("mu_fixed", &MED_2_3_AXES, &MED_2_2_W_MU_FIXED, &RUBH_MINUS_Q, vec![], HKL_GET),
        Mode::auto(
            "gamma_fixed",
            &MED_2_3_AXES,
            &MED_2_3_W_GAMMA_FIXED,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "emergence_fixed",
            &MED_2_3_AXES,
            &MED_2_2_W_FULL,
            &EMERGENCE_FIXED,
            emergence_fixed_parameters(),
            HKL_GET,
        ),
    ]
}

fn new_med_2_3_engines() -> EngineList {
    let mut list = EngineList::new();
    list.set_multiply(multiply_med_2_3);
    list.add_engine(hkl::new_engine(med_2_3_hkl_modes()));
    list.add_engine(q::q2_engine(&MED_2_2_DETECTOR_AXES));
    list.add_engine(q::qper_qpar_engine(&MED_2_2_DETECTOR_AXES));
    list.add_engine(tth::tth2_engine(&MED_2_2_DETECTOR_AXES));
    list.add_engine(readonly::incidence_engine(&MED_2_2_SAMPLE_AXES, surface_parameters_y()));
    list.add_engine(readonly::emergence_engine(&MED_2_3_AXES, surface_parameters_y()));
    list
}

pub static SOLEIL_SIXS_MED_2_3: Factory = Factory {
    name: "SOLEIL SIXS MED2+3",
    description: MED_2_3_DESCRIPTION,
    axes: &MED_2_3_AXES,
    geometry: new_med_2_3_geometry,
    engines: new_med_2_3_engines,
};

/**************************/
/* SOLEIL SIXS MED 2+3 v2 */
/**************************/

const MED_2_3_V2_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 2 axes for the sample
  + mu: rotating around the z direction (0, 0, 1)
  + omega: rotating around the -y direction (0, -1, 0)
+ 3 axes for the detector
  + gamma: rotating around the z direction (0, 0, 1)
  + delta: rotating around the -y direction (0, -1, 0)
  + eta_a: rotating around the -x direction (-1, 0, 0)";

static MED_2_3_V2_AXES: [&str; 5] = [MU, OMEGA, GAMMA, DELTA, ETA_A];
static MED_2_3_V2_SAMPLE_AXES: [&str; 2] = [MU, OMEGA];

fn new_med_2_3_v2_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);

    let h = g.add_holder();
    g.add_rotation(h, MU, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, OMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, GAMMA, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, DELTA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, ETA_A, Vector3::new(-1.0, 0.0, 0.0), Unit::Degree);

    g.update();
    g
}

/// Slit realignment gated by the `eta_a_rotation` engine-list parameter.
fn post_engine_set_med_2_3_v2(parameters: &[Parameter], list: &mut GeometryList) {
    let eta_a_rotation = parameters.first().map_or(0.0, |p| p.value(UnitKind::Default));
    if eta_a_rotation == 1.0 {
        list.apply(multiply_med_2_3);
    }
}

fn med_2_3_v2_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto(
            "mu_fixed",
            &MED_2_3_V2_AXES,
            &MED_2_2_W_MU_FIXED,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "gamma_fixed",
            &MED_2_3_V2_AXES,
            &MED_2_3_W_GAMMA_FIXED,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "emergence_fixed",
            &MED_2_3_V2_AXES,
            &MED_2_2_W_FULL,
            &EMERGENCE_FIXED,
            emergence_fixed_parameters(),
            HKL_GET,
        ),
    ]
}

fn new_med_2_3_v2_engines() -> EngineList {
    let mut list = EngineList::new();
    list.set_parameters(vec![Parameter::new(
        "eta_a_rotation",
        "rotation of the detector (zaxis-like)",
        0.0,
        0.0,
        1.0,
        true,
        Unit::Unitless,
        Unit::Unitless,
    )
    .expect("the eta_a_rotation defaults are admissible")]);
    list.set_post_engine_set(post_engine_set_med_2_3_v2);

    list.add_engine(hkl::new_engine(med_2_3_v2_hkl_modes()));
    list.add_engine(q::q2_engine(&MED_2_2_DETECTOR_AXES));
    list.add_engine(q::qper_qpar_engine(&MED_2_2_DETECTOR_AXES));
    list.add_engine(tth::tth2_engine(&MED_2_2_DETECTOR_AXES));
    list.add_engine(readonly::incidence_engine(&MED_2_3_V2_SAMPLE_AXES, surface_parameters_y()));
    list.add_engine(readonly::emergence_engine(&MED_2_3_V2_AXES, surface_parameters_y()));
    list
}

pub static SOLEIL_SIXS_MED_2_3_V2: Factory = Factory {
    name: "SOLEIL SIXS MED2+3 v2",
    description: MED_2_3_V2_DESCRIPTION,
    axes: &MED_2_3_V2_AXES,
    geometry: new_med_2_3_v2_geometry,
    engines: new_med_2_3_v2_engines,
};
