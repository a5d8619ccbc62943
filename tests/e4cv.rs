//! Eulerian 4-circle scenarios: forward/inverse hkl, psi, q and the
//! read-only engines, on the cubic test sample.

mod common;

use common::{check_pseudo, setup, SOLVE_EPS};
use gonio::constants::{DEGTORAD, EPSILON, TAU};
use gonio::UnitKind;

#[test]
fn bissector_get() {
    let mut engines = setup("E4CV", &[30.0, 0.0, 90.0, 60.0]);
    check_pseudo(&mut engines, "hkl", &[1.0, 0.0, 0.0], SOLVE_EPS).unwrap();
}

#[test]
fn bissector_set() {
    gonio::rng::seed(0);
    let mut engines = setup("E4CV", &[30.0, 0.0, 90.0, 60.0]);

    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::Default)
        .unwrap();
    assert!(!solutions.is_empty());

    for item in solutions.items() {
        let geometry = item.geometry();
        // the bissector constraint holds on every solution (modulo one
        // turn, the solver wraps the converged angles)
        let omega = geometry.axis_get("omega", UnitKind::Default).unwrap();
        let tth = geometry.axis_get("tth", UnitKind::Default).unwrap();
        assert!(
            gonio::algebra::angle_distance(tth, 2.0 * (omega % std::f64::consts::PI))
                < SOLVE_EPS,
            "tth = {tth}, omega = {omega}"
        );

        // adopting the solution brings the pseudo-axes back on target
        engines.select_solution(item).unwrap();
        check_pseudo(&mut engines, "hkl", &[1.0, 0.0, 0.0], SOLVE_EPS).unwrap();
    }
}

#[test]
fn all_hkl_modes_round_trip() {
    gonio::rng::seed(1);
    let mut engines = setup("E4CV", &[30.0, 0.0, 90.0, 60.0]);
    let target = [0.0, 1.0, 0.0];

    let modes = engines
        .engine_get("hkl")
        .unwrap()
        .modes_names_get()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    for mode in modes {
        let engine = engines.engine_get_mut("hkl").unwrap();
        engine.current_mode_set(&mode).unwrap();
        let mut params = engine.parameters_values_get(UnitKind::Default);
        if !params.is_empty() {
            params[0] = 1.0;
            engine
                .parameters_values_set(&params, UnitKind::Default)
                .unwrap();
        }

        let solutions = match engines.pseudo_axis_values_set("hkl", &target, UnitKind::Default)
        {
            Ok(solutions) => solutions,
            // an unreachable target in a constrained mode is fine
            Err(_) => continue,
        };
        for item in solutions.items() {
            engines.select_solution(item).unwrap();
            check_pseudo(&mut engines, "hkl", &target, SOLVE_EPS).unwrap();
        }
    }
}

#[test]
fn solutions_are_separated() {
    gonio::rng::seed(2);
    let mut engines = setup("E4CV", &[30.0, 0.0, 90.0, 60.0]);
    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::Default)
        .unwrap();

    let items: Vec<_> = solutions.items().collect();
    for i in 0..items.len() {
        for j in 0..items.len() {
            if i != j {
                assert!(
                    items[i]
                        .geometry()
                        .distance_orthodromic(items[j].geometry())
                        > EPSILON
                );
            }
        }
    }
}

#[test]
fn psi_engine() {
    let mut engines = setup("E4CV", &[30.0, 0.0, 90.0, 60.0]);
    engines.initialized_set("psi", true).unwrap();

    let engine = engines.engine_get_mut("psi").unwrap();
    engine
        .parameters_values_set(&[0.0, 1.0, 0.0], UnitKind::Default)
        .unwrap();

    // the (0, 1, 0) reference sits a quarter turn around Q from the
    // scattering plane
    check_pseudo(&mut engines, "psi", &[90.0 * DEGTORAD], 1e-9).unwrap();
}

#[test]
fn psi_requires_initialization() {
    let mut engines = setup("E4CV", &[30.0, 0.0, 90.0, 60.0]);
    assert!(engines
        .pseudo_axis_values_get("psi", UnitKind::Default)
        .is_err());
    engines.initialized_set("psi", true).unwrap();
    assert!(engines
        .pseudo_axis_values_get("psi", UnitKind::Default)
        .is_ok());
}

#[test]
fn q_engine_forward() {
    let mut engines = setup("E4CV", &[30.0, 0.0, 90.0, 60.0]);
    // q = 2 q_max sin(30°)/... = TAU / 1.54 at tth = 60°
    check_pseudo(&mut engines, "q", &[TAU / 1.54], 1e-9).unwrap();
    check_pseudo(&mut engines, "tth", &[60.0 * DEGTORAD], 1e-9).unwrap();
}

#[test]
fn incidence_and_emergence() {
    let mut engines = setup("E4CV", &[30.0, 30.0, 90.0, 60.0]);

    let expected = 0.25_f64.asin();
    let azimuth = 0.5_f64.atan();
    check_pseudo(&mut engines, "incidence", &[expected, azimuth], 1e-9).unwrap();
    check_pseudo(&mut engines, "emergence", &[expected, azimuth], 1e-9).unwrap();

    // read-only engines reject the inverse direction
    assert!(engines
        .pseudo_axis_values_set("incidence", &[0.1, 0.0], UnitKind::Default)
        .is_err());
}

#[test]
fn get_after_set_round_trip_units() {
    gonio::rng::seed(3);
    let mut engines = setup("E4CV", &[30.0, 0.0, 90.0, 60.0]);
    let solutions = engines
        .pseudo_axis_values_set("hkl", &[1.0, 0.0, 0.0], UnitKind::User)
        .unwrap();
    assert!(!solutions.is_empty());
    engines.select_solution(solutions.first().unwrap()).unwrap();
    let values = engines
        .pseudo_axis_values_get("hkl", UnitKind::User)
        .unwrap();
    assert!((values[0] - 1.0).abs() < SOLVE_EPS);
}
