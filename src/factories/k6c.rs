//! Kappa 6-circle geometry (K6C): mu plus the kappa triple on the sample
//! side, gamma/delta on the detector side.

use nalgebra::Vector3;

use crate::constants::KAPPA_ALPHA;
use crate::engine::eulerians::eulerians_engine;
use crate::engine::hkl::{
    double_diffraction_parameters, psi_constant_parameters, surface_parameters_y,
    DOUBLE_DIFFRACTION, HKL_GET, PSI_CONSTANT, RUBH_MINUS_Q,
};
use crate::engine::{hkl, psi, q, readonly, tth, EngineList, Mode};
use crate::factory::Factory;
use crate::geometry::{Geometry, GEOMETRY_OPS_DEFAULT};
use crate::unit::Unit;

use super::k4cv::{constant_phi_parameters, KAPPA_BISSECTOR_VERTICAL, KAPPA_CONSTANT_PHI};

const MU: &str = "mu";
const KOMEGA: &str = "komega";
const KAPPA: &str = "kappa";
const KPHI: &str = "kphi";
const GAMMA: &str = "gamma";
const DELTA: &str = "delta";

const K6C_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 4 axes for the sample
  + mu: rotating around the z direction (0, 0, 1)
  + komega: rotating around the -y direction (0, -1, 0)
  + kappa: rotating around the (0, -cos(50°), -sin(50°)) direction
  + kphi: rotating around the -y direction (0, -1, 0)
+ 2 axes for the detector
  + gamma: rotating around the z direction (0, 0, 1)
  + delta: rotating around the -y direction (0, -1, 0)";

static K6C_AXES: [&str; 6] = [MU, KOMEGA, KAPPA, KPHI, GAMMA, DELTA];
static K6C_SAMPLE_AXES: [&str; 4] = [MU, KOMEGA, KAPPA, KPHI];
static K6C_KAPPA_AXES: [&str; 3] = [KOMEGA, KAPPA, KPHI];
static K6C_DETECTOR_AXES: [&str; 2] = [GAMMA, DELTA];
static K6C_W_VERTICAL: [&str; 4] = [KOMEGA, KAPPA, KPHI, DELTA];
static K6C_W_LIFTING_KPHI: [&str; 3] = [KPHI, GAMMA, DELTA];

fn new_k6c_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);
    let kappa_axis = Vector3::new(0.0, -KAPPA_ALPHA.cos(), -KAPPA_ALPHA.sin());

    let h = g.add_holder();
    g.add_rotation(h, MU, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, KOMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, KAPPA, kappa_axis, Unit::Degree);
    g.add_rotation(h, KPHI, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, GAMMA, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, DELTA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    g.update();
    g
}

fn k6c_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto(
            "bissector_vertical",
            &K6C_AXES,
            &K6C_W_VERTICAL,
            &KAPPA_BISSECTOR_VERTICAL,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "constant_phi_vertical",
            &K6C_AXES,
            &K6C_W_VERTICAL,
            &KAPPA_CONSTANT_PHI,
            constant_phi_parameters(),
            HKL_GET,
        ),
        Mode::auto(
            "lifting_detector_kphi",
            &K6C_AXES,
            &K6C_W_LIFTING_KPHI,
            &RUBH_MINUS_Q,
            vec![],
            HKL_GET,
        ),
        Mode::auto(
            "double_diffraction_vertical",
            &K6C_AXES,
            &K6C_W_VERTICAL,
            &DOUBLE_DIFFRACTION,
            double_diffraction_parameters(),
            HKL_GET,
        ),
        Mode::auto(
            "psi_constant_vertical",
            &K6C_AXES,
            &K6C_W_VERTICAL,
            &PSI_CONSTANT,
            psi_constant_parameters(),
            HKL_GET,
        ),
    ]
}

fn new_k6c_engines() -> EngineList {
    let mut list = EngineList::new();
    list.add_engine(hkl::new_engine(k6c_hkl_modes()));
    list.add_engine(eulerians_engine(&K6C_KAPPA_AXES));
    list.add_engine(psi::new_engine(psi::psi_mode(&K6C_W_VERTICAL)));
    list.add_engine(q::q2_engine(&K6C_DETECTOR_AXES));
    list.add_engine(q::qper_qpar_engine(&K6C_DETECTOR_AXES));
    list.add_engine(tth::tth2_engine(&K6C_DETECTOR_AXES));
    list.add_engine(readonly::incidence_engine(&K6C_SAMPLE_AXES, surface_parameters_y()));
    list.add_engine(readonly::emergence_engine(&K6C_AXES, surface_parameters_y()));
    list
}

pub static K6C: Factory = Factory {
    name: "K6C",
    description: K6C_DESCRIPTION,
    axes: &K6C_AXES,
    geometry: new_k6c_geometry,
    engines: new_k6c_engines,
};
