//! The gamma-extended 4-circle variants degenerate to E4CV behavior when
//! gamma stays at zero.

mod common;

use common::{check_pseudo, setup, SOLVE_EPS};
use gonio::UnitKind;

#[test]
fn e4cvg_gamma_zero_matches_e4cv() {
    let mut engines = setup("E4CVG", &[30.0, 0.0, 90.0, 60.0, 0.0]);
    check_pseudo(&mut engines, "hkl", &[1.0, 0.0, 0.0], SOLVE_EPS).unwrap();
}

#[test]
fn e4cvg_bissector_set_keeps_gamma() {
    gonio::rng::seed(6);
    let mut engines = setup("E4CVG", &[30.0, 0.0, 90.0, 60.0, 0.0]);
    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::Default)
        .unwrap();
    assert!(!solutions.is_empty());

    for item in solutions.items() {
        // gamma is not a write axis of the bissector mode
        assert_eq!(
            item.geometry().axis_get("gamma", UnitKind::Default).unwrap(),
            0.0
        );
        engines.select_solution(item).unwrap();
        check_pseudo(&mut engines, "hkl", &[1.0, 0.0, 0.0], SOLVE_EPS).unwrap();
    }
}

#[test]
fn e4cvg2_gamma_zero_matches_e4cv() {
    let mut geometry = gonio::make_geometry("E4CVG2").unwrap();
    geometry.wavelength_set(1.54, UnitKind::Default).unwrap();
    // omega and gamma are displayed in milliradian on this variant, the
    // default unit stays the radian
    geometry
        .axis_values_set(
            &[
                30.0_f64.to_radians(),
                0.0,
                90.0_f64.to_radians(),
                60.0_f64.to_radians(),
                0.0,
            ],
            UnitKind::Default,
        )
        .unwrap();

    let mut engines = gonio::make_engine_list("E4CVG2").unwrap();
    engines.init(&geometry, &gonio::Detector::zero_d(), &common::cu_sample());
    check_pseudo(&mut engines, "hkl", &[1.0, 0.0, 0.0], SOLVE_EPS).unwrap();
}

#[test]
fn e4cvg2_milliradian_boundary() {
    let mut geometry = gonio::make_geometry("E4CVG2").unwrap();
    geometry.axis_set("omega", 500.0, UnitKind::User).unwrap();
    assert!(
        (geometry.axis_get("omega", UnitKind::Default).unwrap() - 0.5).abs() < 1e-12
    );
    // chi keeps the degree display of the family
    geometry.axis_set("chi", 90.0, UnitKind::User).unwrap();
    assert!(
        (geometry.axis_get("chi", UnitKind::Default).unwrap() - std::f64::consts::FRAC_PI_2)
            .abs()
            < 1e-12
    );
}
