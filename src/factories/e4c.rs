//! Eulerian 4-circle vertical geometries: E4CV and its gamma-extended
//! test variants E4CVG and E4CVG2.

use nalgebra::Vector3;

use crate::engine::hkl::{
    double_diffraction_parameters, psi_constant_parameters, surface_parameters_y,
    surface_parameters_z, BISSECTOR_VERTICAL, DOUBLE_DIFFRACTION, HKL_GET, PSI_CONSTANT,
    RUBH_MINUS_Q,
};
use crate::engine::{hkl, psi, q, readonly, tth, EngineList, Mode};
use crate::factory::Factory;
use crate::geometry::{Geometry, GEOMETRY_OPS_DEFAULT};
use crate::unit::Unit;

const OMEGA: &str = "omega";
const CHI: &str = "chi";
const PHI: &str = "phi";
const TTH: &str = "tth";
const GAMMA: &str = "gamma";

/********/
/* E4CV */
/********/

const E4CV_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 3 axes for the sample
  + omega: rotating around the -y direction (0, -1, 0)
  + chi: rotating around the x direction (1, 0, 0)
  + phi: rotating around the -y direction (0, -1, 0)
+ 1 axis for the detector
  + tth: rotating around the -y direction (0, -1, 0)";

static E4CV_AXES: [&str; 4] = [OMEGA, CHI, PHI, TTH];
static E4CV_SAMPLE_AXES: [&str; 3] = [OMEGA, CHI, PHI];
static E4CV_TTH: [&str; 1] = [TTH];
static E4CV_W_OMEGA: [&str; 3] = [CHI, PHI, TTH];
static E4CV_W_CHI: [&str; 3] = [OMEGA, PHI, TTH];
static E4CV_W_PHI: [&str; 3] = [OMEGA, CHI, TTH];

fn new_e4cv_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);

    let h = g.add_holder();
    g.add_rotation(h, OMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, CHI, Vector3::new(1.0, 0.0, 0.0), Unit::Degree);
    g.add_rotation(h, PHI, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, TTH, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    g.update();
    g
}

fn e4cv_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto("bissector", &E4CV_AXES, &E4CV_AXES, &BISSECTOR_VERTICAL, vec![], HKL_GET),
        Mode::auto("constant_omega", &E4CV_AXES, &E4CV_W_OMEGA, &RUBH_MINUS_Q, vec![], HKL_GET),
        Mode::auto("constant_chi", &E4CV_AXES, &E4CV_W_CHI, &RUBH_MINUS_Q, vec![], HKL_GET),
        Mode::auto("constant_phi", &E4CV_AXES, &E4CV_W_PHI, &RUBH_MINUS_Q, vec![], HKL_GET),
        Mode::auto(
            "double_diffraction",
            &E4CV_AXES,
            &E4CV_AXES,
            &DOUBLE_DIFFRACTION,
            double_diffraction_parameters(),
            HKL_GET,
        ),
        Mode::auto(
            "psi_constant",
            &E4CV_AXES,
            &E4CV_AXES,
            &PSI_CONSTANT,
            psi_constant_parameters(),
            HKL_GET,
        ),
    ]
}

fn new_e4cv_engines() -> EngineList {
    let mut list = EngineList::new();
    list.add_engine(hkl::new_engine(e4cv_hkl_modes()));
    list.add_engine(psi::new_engine(psi::psi_mode(&E4CV_AXES)));
    list.add_engine(q::q_engine(&E4CV_TTH));
    list.add_engine(tth::tth_engine(&E4CV_TTH));
    list.add_engine(readonly::incidence_engine(&E4CV_SAMPLE_AXES, surface_parameters_y()));
    list.add_engine(readonly::emergence_engine(&E4CV_AXES, surface_parameters_y()));
    list
}

pub static E4CV: Factory = Factory {
    name: "E4CV",
    description: E4CV_DESCRIPTION,
    axes: &E4CV_AXES,
    geometry: new_e4cv_geometry,
    engines: new_e4cv_engines,
};

/*********/
/* E4CVG */
/*********/

const E4CVG_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 3 axes for the sample
  + omega: rotating around the -y direction (0, -1, 0)
  + chi: rotating around the x direction (1, 0, 0)
  + phi: rotating around the -y direction (0, -1, 0)
+ 2 axes for the detector
  + tth: rotating around the -y direction (0, -1, 0)
  + gamma: rotating around the z direction (0, 0, 1)";

static E4CVG_AXES: [&str; 5] = [OMEGA, CHI, PHI, TTH, GAMMA];
static E4CVG_W_VERTICAL: [&str; 4] = [OMEGA, CHI, PHI, TTH];

fn new_e4cvg_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);

    let h = g.add_holder();
    g.add_rotation(h, OMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, CHI, Vector3::new(1.0, 0.0, 0.0), Unit::Degree);
    g.add_rotation(h, PHI, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, TTH, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, GAMMA, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);

    g.update();
    g
}

fn e4cvg_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto(
            "bissector",
            &E4CVG_AXES,
            &E4CVG_W_VERTICAL,
            &BISSECTOR_VERTICAL,
            vec![],
            HKL_GET,
        ),
        Mode::auto("constant_omega", &E4CVG_AXES, &E4CV_W_OMEGA, &RUBH_MINUS_Q, vec![], HKL_GET),
        Mode::auto("constant_chi", &E4CVG_AXES, &E4CV_W_CHI, &RUBH_MINUS_Q, vec![], HKL_GET),
        Mode::auto("constant_phi", &E4CVG_AXES, &E4CV_W_PHI, &RUBH_MINUS_Q, vec![], HKL_GET),
        Mode::auto(
            "double_diffraction",
            &E4CVG_AXES,
            &E4CVG_W_VERTICAL,
            &DOUBLE_DIFFRACTION,
            double_diffraction_parameters(),
            HKL_GET,
        ),
        Mode::auto(
            "psi_constant",
            &E4CVG_AXES,
            &E4CVG_W_VERTICAL,
            &PSI_CONSTANT,
            psi_constant_parameters(),
            HKL_GET,
        ),
    ]
}

fn new_e4cvg_engines() -> EngineList {
    let mut list = EngineList::new();
    list.add_engine(hkl::new_engine(e4cvg_hkl_modes()));
    list.add_engine(psi::new_engine(psi::psi_mode(&E4CVG_W_VERTICAL)));
    list.add_engine(q::q_engine(&E4CV_TTH));
    list.add_engine(readonly::incidence_engine(&E4CV_SAMPLE_AXES, surface_parameters_y()));
    list.add_engine(readonly::emergence_engine(&E4CVG_AXES, surface_parameters_y()));
    list
}

pub static E4CVG: Factory = Factory {
    name: "E4CVG",
    description: E4CVG_DESCRIPTION,
    axes: &E4CVG_AXES,
    geometry: new_e4cvg_geometry,
    engines: new_e4cvg_engines,
};

/**********/
/* E4CVG2 */
/**********/

const E4CVG2_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 4-circle with gamma out-of-plane crystal orientation alignment
+ 3 axes for the sample
  + omega: rotating around the -y direction (0, -1, 0), in milliradian
  + chi: rotating around the x direction (1, 0, 0)
  + phi: rotating around the -y direction (0, -1, 0)
+ 2 axes for the detector
  + tth: rotating around the -y direction (0, -1, 0)
  + gamma: rotating around the z direction (0, 0, 1), in milliradian";

static E4CVG2_AXES: [&str; 5] = [OMEGA, CHI, PHI, TTH, GAMMA];
static E4CVG2_DETECTOR_AXES: [&str; 2] = [TTH, GAMMA];

fn new_e4cvg2_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);

    let h = g.add_holder();
    g.add_rotation(h, OMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::MilliRadian);
    g.add_rotation(h, CHI, Vector3::new(1.0, 0.0, 0.0), Unit::Degree);
    g.add_rotation(h, PHI, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, TTH, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, GAMMA, Vector3::new(0.0, 0.0, 1.0), Unit::MilliRadian);

    g.update();
    g
}

fn new_e4cvg2_engines() -> EngineList {
    let mut list = EngineList::new();
    list.add_engine(hkl::new_engine(vec![Mode::auto(
        "bissector",
        &E4CVG2_AXES,
        &E4CVG_W_VERTICAL,
        &BISSECTOR_VERTICAL,
        vec![],
        HKL_GET,
    )]));
    list.add_engine(q::q2_engine(&E4CVG2_DETECTOR_AXES));
    list.add_engine(q::qper_qpar_engine(&E4CVG2_DETECTOR_AXES));
    list.add_engine(tth::tth2_engine(&E4CVG2_DETECTOR_AXES));
    list.add_engine(readonly::incidence_engine(&E4CV_SAMPLE_AXES, surface_parameters_z()));
    list.add_engine(readonly::emergence_engine(&E4CVG2_AXES, surface_parameters_z()));
    list
}

pub static E4CVG2: Factory = Factory {
    name: "E4CVG2",
    description: E4CVG2_DESCRIPTION,
    axes: &E4CVG2_AXES,
    geometry: new_e4cvg2_geometry,
    engines: new_e4cvg2_engines,
};
