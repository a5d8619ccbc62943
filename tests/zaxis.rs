//! Z-axis geometry scenarios: the shared mu axis ties the two chains
//! together, and the reflectivity mode keeps mu equal to omega.

mod common;

use common::{check_pseudo, setup, SOLVE_EPS};
use gonio::UnitKind;

#[test]
fn shared_mu_moves_both_chains() {
    let mut geometry = gonio::make_geometry("ZAXIS").unwrap();
    assert_eq!(geometry.axes().len(), 4);

    // mu belongs to both holders; one write moves both chains
    geometry.axis_set("mu", 90.0, UnitKind::User).unwrap();
    let v = nalgebra::Vector3::x();
    let sample = geometry.sample_rotation() * v;
    let detector = geometry.detector_rotation() * v;
    assert!((sample - detector).norm() < 1e-12);
    assert!((sample - nalgebra::Vector3::y()).norm() < 1e-12);
}

#[test]
fn zaxis_mode_set() {
    gonio::rng::seed(13);
    let mut engines = setup("ZAXIS", &[5.0, 10.0, 20.0, 5.0]);
    let target = [1.0, 0.0, 0.0];

    let solutions = engines
        .pseudo_axis_values_set("hkl", &target, UnitKind::Default)
        .unwrap();
    assert!(!solutions.is_empty());
    for item in solutions.items() {
        // mu is read-only in the zaxis mode
        assert!(
            (item.geometry().axis_get("mu", UnitKind::User).unwrap() - 5.0).abs() < 1e-9
        );
        engines.select_solution(item).unwrap();
        check_pseudo(&mut engines, "hkl", &target, SOLVE_EPS).unwrap();
    }
}

#[test]
fn reflectivity_mode_ties_mu_to_omega() {
    gonio::rng::seed(14);
    let mut engines = setup("ZAXIS", &[5.0, 10.0, 20.0, 5.0]);
    engines
        .engine_get_mut("hkl")
        .unwrap()
        .current_mode_set("reflectivity")
        .unwrap();

    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::Default)
        .unwrap();
    for item in solutions.items() {
        let geometry = item.geometry();
        let mu = geometry.axis_get("mu", UnitKind::Default).unwrap();
        let omega = geometry.axis_get("omega", UnitKind::Default).unwrap();
        assert!(gonio::algebra::angle_distance(mu, omega) < SOLVE_EPS);
        engines.select_solution(item).unwrap();
        check_pseudo(&mut engines, "hkl", &[1.0, 0.0, 0.0], SOLVE_EPS).unwrap();
    }
}
