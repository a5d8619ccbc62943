//! Z-axis surface diffraction geometry: mu tilts both chains, omega moves
//! the sample, delta/gamma move the detector.

use nalgebra::{DVector, Vector3};

use crate::engine::hkl::{rubh_minus_q_rows, surface_parameters_y, HKL_GET, RUBH_MINUS_Q};
use crate::engine::{hkl, q, readonly, tth, EngineList, Mode, ResidualFunction, Workspace};
use crate::factory::Factory;
use crate::geometry::{Geometry, GEOMETRY_OPS_DEFAULT};
use crate::gonio_errors::GonioError;
use crate::unit::Unit;

const MU: &str = "mu";
const OMEGA: &str = "omega";
const DELTA: &str = "delta";
const GAMMA: &str = "gamma";

const ZAXIS_DESCRIPTION: &str = "\
+ xrays source fix along the x direction (1, 0, 0)
+ 2 axes for the sample
  + mu: rotating around the z direction (0, 0, 1)
  + omega: rotating around the -y direction (0, -1, 0)
+ 3 axes for the detector
  + mu: rotating around the z direction (0, 0, 1)
  + delta: rotating around the -y direction (0, -1, 0)
  + gamma: rotating around the z direction (0, 0, 1)";

static ZAXIS_AXES: [&str; 4] = [MU, OMEGA, DELTA, GAMMA];
static ZAXIS_SAMPLE_AXES: [&str; 2] = [MU, OMEGA];
static ZAXIS_DETECTOR_AXES: [&str; 2] = [GAMMA, DELTA];
static ZAXIS_W: [&str; 3] = [OMEGA, DELTA, GAMMA];

fn new_zaxis_geometry(factory: &'static Factory) -> Geometry {
    let mut g = Geometry::new(factory, &GEOMETRY_OPS_DEFAULT);

    let h = g.add_holder();
    g.add_rotation(h, MU, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, OMEGA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);

    let h = g.add_holder();
    g.add_rotation(h, MU, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);
    g.add_rotation(h, DELTA, Vector3::new(0.0, -1.0, 0.0), Unit::Degree);
    g.add_rotation(h, GAMMA, Vector3::new(0.0, 0.0, 1.0), Unit::Degree);

    g.update();
    g
}

/// Reflectivity: equal incidence and emergence tilts, mu == omega.
fn reflectivity_func(x: &[f64], w: &mut Workspace) -> Result<DVector<f64>, GonioError> {
    let mu = x[0];
    let omega = x[1];
    let rows = rubh_minus_q_rows(x, w)?;
    Ok(DVector::from_vec(vec![rows.x, rows.y, rows.z, mu - omega]))
}

static REFLECTIVITY: [ResidualFunction; 1] = [ResidualFunction {
    f: reflectivity_func,
    size: 4,
}];

fn zaxis_hkl_modes() -> Vec<Mode> {
    vec![
        Mode::auto("zaxis", &ZAXIS_AXES, &ZAXIS_W, &RUBH_MINUS_Q, vec![], HKL_GET),
        Mode::auto("reflectivity", &ZAXIS_AXES, &ZAXIS_AXES, &REFLECTIVITY, vec![], HKL_GET),
    ]
}

fn new_zaxis_engines() -> EngineList {
    let mut list = EngineList::new();
    list.add_engine(hkl::new_engine(zaxis_hkl_modes()));
    list.add_engine(q::q2_engine(&ZAXIS_DETECTOR_AXES));
    list.add_engine(q::qper_qpar_engine(&ZAXIS_DETECTOR_AXES));
    list.add_engine(tth::tth2_engine(&ZAXIS_DETECTOR_AXES));
    list.add_engine(readonly::incidence_engine(&ZAXIS_SAMPLE_AXES, surface_parameters_y()));
    list.add_engine(readonly::emergence_engine(&ZAXIS_AXES, surface_parameters_y()));
    list
}

pub static ZAXIS: Factory = Factory {
    name: "ZAXIS",
    description: ZAXIS_DESCRIPTION,
    axes: &ZAXIS_AXES,
    geometry: new_zaxis_geometry,
    engines: new_zaxis_engines,
};
