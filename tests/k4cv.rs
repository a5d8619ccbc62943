//! Kappa 4-circle scenarios: the degenerate eulerian pair, the hkl mode
//! sweep and the q scan of the original acceptance tests.

mod common;

use common::{check_pseudo, setup, SOLVE_EPS};
use gonio::constants::DEGTORAD;
use gonio::UnitKind;

#[test]
fn eulerians_degenerated_pair() {
    let mut engines = setup("K4CV", &[30.0, 0.0, 0.0, 60.0]);

    let engine = engines.engine_get_mut("eulerians").unwrap();
    let mut params = engine.parameters_values_get(UnitKind::Default);
    assert_eq!(params.len(), 1);
    params[0] = 1.0;
    engine
        .parameters_values_set(&params, UnitKind::Default)
        .unwrap();

    let target = [0.0, 90.0 * DEGTORAD, 0.0];
    let solutions = engines
        .pseudo_axis_values_set("eulerians", &target, UnitKind::Default)
        .unwrap();

    // exactly two solutions, in branch order
    assert_eq!(solutions.len(), 2);

    engines.select_solution(solutions.get(0).unwrap()).unwrap();
    check_pseudo(
        &mut engines,
        "eulerians",
        &[-180.0 * DEGTORAD, -90.0 * DEGTORAD, 180.0 * DEGTORAD],
        1e-9,
    )
    .unwrap();

    engines.select_solution(solutions.get(1).unwrap()).unwrap();
    check_pseudo(&mut engines, "eulerians", &target, 1e-9).unwrap();

    assert!(solutions.get(2).is_none());
}

#[test]
fn eulerians_unreachable_chi() {
    let mut engines = setup("K4CV", &[30.0, 0.0, 0.0, 60.0]);
    // the kappa stage reaches |chi| <= 100°
    let solutions = engines
        .pseudo_axis_values_set(
            "eulerians",
            &[0.0, 110.0 * DEGTORAD, 0.0],
            UnitKind::Default,
        )
        .unwrap();
    assert!(solutions.is_empty());
}

#[test]
fn hkl_modes_round_trip() {
    gonio::rng::seed(4);
    let mut engines = setup("K4CV", &[30.0, 0.0, 0.0, 60.0]);
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

        let solutions =
            match engines.pseudo_axis_values_set("hkl", &target, UnitKind::Default) {
                Ok(solutions) => solutions,
                Err(_) => continue,
            };
        for item in solutions.items() {
            engines.select_solution(item).unwrap();
            check_pseudo(&mut engines, "hkl", &target, SOLVE_EPS).unwrap();
        }
    }
}

#[test]
fn q_scan() {
    gonio::rng::seed(5);
    let mut engines = setup("K4CV", &[30.0, 0.0, 0.0, 60.0]);
    engines.initialized_set("q", true).unwrap();

    let mut q = -1.0;
    while q < 1.0 {
        let solutions = engines
            .pseudo_axis_values_set("q", &[q], UnitKind::Default)
            .unwrap();
        assert!(!solutions.is_empty(), "no solution for q = {q}");
        for item in solutions.items() {
            engines.select_solution(item).unwrap();
            check_pseudo(&mut engines, "q", &[q], SOLVE_EPS).unwrap();
        }
        q += 0.1;
    }
}
