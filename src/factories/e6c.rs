//! Eulerian 6-circle geometry (E6C): four sample circles, two detector
//! circles.

use nalgebra::Vector3;

use crate::engine::hkl::{
    double_diffraction_parameters, psi_constant_parameters, surface_parameters_y,
    BISSECTOR_VERTICAL, DOUBLE_DIFFRACTION, HKL_GET, PSI_CONSTANT, RUBH_MINUS_Q,
};
use crate::engine::{hkl, psi, q, readonly, tth, EngineList, Mode};
use crate::factory::Factory;
use crate::geometry::{Geometry, GEOMETRY_OPS_DEFAULT};
use crate::unit::Unit;

const MU: &str = "mu";
const OMEGA: &str = "omega";
const CHI: &str = "chi";
const PHI: &str = "phi";
const GAMMA: &str = "gamma";
const DELTA: &str = "delta";

const E6C_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 4 axes for the sample
  + mu: rotating around the z direction (0, 0, 1)
  + omega: rotating around the -y direction (0, -1, 0)
  + chi: rotating around the x direction (1, 0, 0)
  + phi: rotating around the -y direction (0, -1, 0)
+ 2 axes for the detector
  + gamma: rotating around the z direction (0, 0, 1)
  + delta: rotating around the -y direction (0, -1, 0)";

static E6C_AXES: [&str; 6] = [MU, OMEGA, CHI, PHI, GAMMA, DELTA];
static E6C_SAMPLE_AXES: [&str; 4] = [MU, OMEGA, CHI, PHI];
static E6C_DETECTOR_AXES: [&str; 2] = [GAMMA, DELTA];
static E6C_W_VERTICAL: [&str; 4] = [OMEGA, CHI, PHI, DELTA];
static E6C_W_CONSTANT_OMEGA: [&str; 3] = [CHI, PHI, DELTA];
static E6C_W_CONSTANT_CHI: [&str; 3] = [OMEGA, PHI, DELTA];
static E6C_W_CONSTANT_PHI: [&str; 3] = [OMEGA, CHI, DELTA];
static E6C_W_LIFTING_PHI: [&str; 3] = [PHI, GAMMA, DELTA];
static E6C_W_LIFTING_OMEGA: [&str; 3] = [OMEGA, GAMMA, DELTA];
static E6C_W_LIFTING_MU: [&str; 3] = [MU, GAMMA, DELTA];

fn new_e6c_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);

    let h = g.add_holder();
    g.add_rotation(h, MU, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, OMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, CHI, Vector3::new(1.0, 0.0, 0.0), Unit::Degree);
    g.add_rotation(h, PHI, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, GAMMA, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, DELTA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    g.update();
    g
}

fn e6c_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto(
            "bissector_vertical",
            &E6C_AXES,
            &E6C_W_VERTICAL,
            &BISSECTOR_VERTICAL,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "constant_omega_vertical",
            &E6C_AXES,
            &E6C_W_CONSTANT_OMEGA,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "constant_chi_vertical",
            &E6C_AXES,
            &E6C_W_CONSTANT_CHI,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "constant_phi_vertical",
            &E6C_AXES,
            &E6C_W_CONSTANT_PHI,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "lifting_detector_phi",
            &E6C_AXES,
            &E6C_W_LIFTING_PHI,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "lifting_detector_omega",
            &E6C_AXES,
            &E6C_W_LIFTING_OMEGA,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "lifting_detector_mu",
            &E6C_AXES,
            &E6C_W_LIFTING_MU,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "double_diffraction_vertical",
            &E6C_AXES,
            &E6C_W_VERTICAL,
            &DOUBLE_DIFFRACTION,
            double_diffraction_parameters(),
            HKL_GET,
        ),
        Mode::auto(
            "psi_constant_vertical",
            &E6C_AXES,
            &E6C_W_VERTICAL,
            &PSI_CONSTANT,
            psi_constant_parameters(),
            HKL_GET,
        ),
    ]
}

fn new_e6c_engines() -> EngineList {
    let mut list = EngineList::new();
    list.add_engine(hkl::new_engine(e6c_hkl_modes()));
    list.add_engine(psi::new_engine(psi::psi_mode(&E6C_W_VERTICAL)));
    list.add_engine(q::q2_engine(&E6C_DETECTOR_AXES));
    list.add_engine(q::qper_qpar_engine(&E6C_DETECTOR_AXES));
    list.add_engine(tth::tth2_engine(&E6C_DETECTOR_AXES));
    list.add_engine(readonly::incidence_engine(&E6C_SAMPLE_AXES, surface_parameters_y()));
    list.add_engine(readonly::emergence_engine(&E6C_AXES, surface_parameters_y()));
    list
}

pub static E6C: Factory = Factory {
    name: "E6C",
    description: E6C_DESCRIPTION,
    axes: &E6C_AXES,
    geometry: new_e6c_geometry,
    engines: new_e6c_engines,
};
