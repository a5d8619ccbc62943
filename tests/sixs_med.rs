//! SIXS MED scenarios: forward values of the surface engines on
//! hand-computed configurations, the hkl solve on the 2+2, and the slit
//! realignment of the 2+3 variants.

mod common;

use common::{check_pseudo, setup, SOLVE_EPS};
use gonio::constants::{DEGTORAD, TAU};
use gonio::UnitKind;

#[test]
fn med_2_2_forward_engines() {
    // beam deflected 30° in the horizontal plane by gamma alone
    let mut engines = setup("SOLEIL SIXS MED2+2", &[0.0, 0.0, 0.0, 30.0, 0.0]);

    let k = TAU / 1.54;
    let q = 2.0 * k * (15.0 * DEGTORAD).sin();
    check_pseudo(&mut engines, "q2", &[q, 0.0], 1e-9).unwrap();
    check_pseudo(&mut engines, "tth2", &[30.0 * DEGTORAD, 0.0], 1e-9).unwrap();

    // q decomposed on the (0, 1, 0) surface normal
    let qper = k * (30.0 * DEGTORAD).sin();
    let qpar = k * (1.0 - (30.0 * DEGTORAD).cos());
    check_pseudo(&mut engines, "qper_qpar", &[qper, qpar], 1e-9).unwrap();
}

#[test]
fn med_2_2_incidence_tracks_mu() {
    // mu rotates the surface normal (0, 1, 0) around z by 20°, tilting
    // the beam projection on the surface
    let mut engines = setup("SOLEIL SIXS MED2+2", &[0.0, 20.0, 0.0, 40.0, 0.0]);
    let incidence = (20.0 * DEGTORAD).sin().asin();
    let values = engines
        .pseudo_axis_values_get("incidence", UnitKind::Default)
        .unwrap();
    assert!((values[0] - incidence).abs() < 1e-9);
}

#[test]
fn med_2_2_hkl_set() {
    gonio::rng::seed(7);
    let mut engines = setup("SOLEIL SIXS MED2+2", &[0.0, 0.0, 10.0, 20.0, 0.0]);
    let target = [1.0, 0.0, 0.0];

    let solutions = engines
        .pseudo_axis_values_set("hkl", &target, UnitKind::Default)
        .unwrap();
    assert!(!solutions.is_empty());
    for item in solutions.items() {
        // mu_fixed keeps the fixed axes untouched
        assert_eq!(item.geometry().axis_get("mu", UnitKind::Default).unwrap(), 0.0);
        assert_eq!(item.geometry().axis_get("beta", UnitKind::Default).unwrap(), 0.0);
        engines.select_solution(item).unwrap();
        check_pseudo(&mut engines, "hkl", &target, SOLVE_EPS).unwrap();
    }
}

#[test]
fn med_2_3_slit_realignment() {
    gonio::rng::seed(8);
    let mut engines = setup("SOLEIL SIXS MED2+3", &[0.0, 0.0, 10.0, 20.0, 0.0, 0.0]);

    // the slit lift into [0, 2π) may push eta_a out of its range, in
    // which case the range cleanup removes the solution; every surviving
    // solution must have the slit normal perpendicular to the sample
    // surface (the omega axis direction, rotated)
    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::Default)
        .unwrap();
    for item in solutions.items() {
        let geometry = item.geometry();
        let surface = geometry.sample_rotation() * nalgebra::Vector3::new(0.0, -1.0, 0.0);
        let slits = geometry.detector_rotation() * nalgebra::Vector3::z();
        assert!(
            surface.dot(&slits).abs() < 1e-4,
            "slit normal not realigned: {}",
            surface.dot(&slits)
        );
    }
}

#[test]
fn med_2_3_v2_post_set_is_gated() {
    gonio::rng::seed(9);
    let mut engines = setup("SOLEIL SIXS MED2+3 v2", &[0.0, 10.0, 20.0, 0.0, 0.0]);

    // with eta_a_rotation = 0 the slits stay where the solver left them
    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::Default)
        .unwrap();
    for item in solutions.items() {
        assert_eq!(
            item.geometry().axis_get("eta_a", UnitKind::Default).unwrap(),
            0.0
        );
    }

    // with eta_a_rotation = 1 the post-set hook realigns them
    engines.parameters_mut()[0]
        .set_value(1.0, UnitKind::Default)
        .unwrap();
    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::Default)
        .unwrap();
    for item in solutions.items() {
        let geometry = item.geometry();
        let surface = geometry.sample_rotation() * nalgebra::Vector3::new(0.0, -1.0, 0.0);
        let slits = geometry.detector_rotation() * nalgebra::Vector3::z();
        assert!(surface.dot(&slits).abs() < 1e-4);
    }
}
