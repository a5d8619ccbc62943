//! 6-circle scenarios: the vertical modes reduce to the 4-circle
//! behavior when mu and gamma stay at zero, and the lifting modes move
//! only their declared axes.

mod common;

use common::{check_pseudo, setup, SOLVE_EPS};
use gonio::UnitKind;

#[test]
fn vertical_get_matches_e4cv() {
    // (mu, omega, chi, phi, gamma, delta)
    let mut engines = setup("E6C", &[0.0, 30.0, 0.0, 90.0, 0.0, 60.0]);
    check_pseudo(&mut engines, "hkl", &[1.0, 0.0, 0.0], SOLVE_EPS).unwrap();
}

#[test]
fn bissector_vertical_set() {
    gonio::rng::seed(10);
    let mut engines = setup("E6C", &[0.0, 30.0, 0.0, 90.0, 0.0, 60.0]);

    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::Default)
        .unwrap();
    assert!(!solutions.is_empty());
    for item in solutions.items() {
        // mu and gamma are read-only in the vertical modes
        assert_eq!(item.geometry().axis_get("mu", UnitKind::Default).unwrap(), 0.0);
        assert_eq!(item.geometry().axis_get("gamma", UnitKind::Default).unwrap(), 0.0);
        engines.select_solution(item).unwrap();
        check_pseudo(&mut engines, "hkl", &[1.0, 0.0, 0.0], SOLVE_EPS).unwrap();
    }
}

#[test]
fn lifting_detector_phi_set() {
    gonio::rng::seed(11);
    let mut engines = setup("E6C", &[0.0, 30.0, 0.0, 90.0, 0.0, 60.0]);
    engines
        .engine_get_mut("hkl")
        .unwrap()
        .current_mode_set("lifting_detector_phi")
        .unwrap();

    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::Default)
        .unwrap();
    for item in solutions.items() {
        // only phi, gamma and delta may move
        let geometry = item.geometry();
        assert_eq!(geometry.axis_get("mu", UnitKind::Default).unwrap(), 0.0);
        assert!(
            (geometry.axis_get("omega", UnitKind::User).unwrap() - 30.0).abs() < 1e-9
        );
        assert_eq!(geometry.axis_get("chi", UnitKind::Default).unwrap(), 0.0);
        engines.select_solution(item).unwrap();
        check_pseudo(&mut engines, "hkl", &[1.0, 0.0, 0.0], SOLVE_EPS).unwrap();
    }
}

#[test]
fn q2_round_trip() {
    gonio::rng::seed(12);
    let mut engines = setup("E6C", &[0.0, 30.0, 0.0, 90.0, 10.0, 40.0]);

    let values = engines
        .pseudo_axis_values_get("q2", UnitKind::Default)
        .unwrap();
    let solutions = engines
        .pseudo_axis_values_set("q2", &values, UnitKind::Default)
        .unwrap();
    assert!(!solutions.is_empty());
    for item in solutions.items() {
        engines.select_solution(item).unwrap();
        check_pseudo(&mut engines, "q2", &values, SOLVE_EPS).unwrap();
    }
}
