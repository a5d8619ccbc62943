//! Shared fixtures for the integration tests: the copper test sample and
//! helpers to bind an engine list to a geometry snapshot.
#![allow(dead_code)]

use gonio::{
    make_engine_list, make_geometry, Detector, EngineList, GonioError, Lattice, Sample, UnitKind,
};

/// Solver-level tolerance used when checking pseudo-axes recovered from a
/// converged solution.
pub const SOLVE_EPS: f64 = 1e-4;

/// Cubic copper-like test sample, a = λ = 1.54.
pub fn cu_sample() -> Sample {
    Sample::new("CU", Lattice::cubic(1.54).unwrap()).unwrap()
}

/// Build an engine list bound to the named geometry with the given axis
/// values (degrees) and the cu sample.
pub fn setup(name: &str, axis_values_deg: &[f64]) -> EngineList {
    let mut geometry = make_geometry(name).unwrap();
    geometry.wavelength_set(1.54, UnitKind::Default).unwrap();
    geometry
        .axis_values_set(axis_values_deg, UnitKind::User)
        .unwrap();

    let mut engines = make_engine_list(name).unwrap();
    engines.init(&geometry, &Detector::zero_d(), &cu_sample());
    engines
}

/// Forward-compute `engine` and check every pseudo-axis against
/// `expected` (default units).
pub fn check_pseudo(
    engines: &mut EngineList,
    engine: &str,
    expected: &[f64],
    epsilon: f64,
) -> Result<(), GonioError> {
    let values = engines.pseudo_axis_values_get(engine, UnitKind::Default)?;
    assert_eq!(values.len(), expected.len());
    for (value, expected) in values.iter().zip(expected) {
        assert!(
            (value - expected).abs() < epsilon,
            "pseudo-axis mismatch: got {value}, expected {expected} (engine {engine})"
        );
    }
    Ok(())
}
