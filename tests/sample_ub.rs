//! Orientation recovery: the Busing–Levy two-reflection closed form and
//! the simplex refinement, on geometry snapshots of the 4-circle.

mod common;

use common::cu_sample;
use gonio::constants::TAU;
use gonio::{make_geometry, Detector, UnitKind};
use nalgebra::Matrix3;

fn snapshot(axis_values_deg: &[f64]) -> gonio::Geometry {
    let mut geometry = make_geometry("E4CV").unwrap();
    geometry.wavelength_set(1.54, UnitKind::Default).unwrap();
    geometry
        .axis_values_set(axis_values_deg, UnitKind::User)
        .unwrap();
    geometry
}

#[test]
fn two_reflections_recover_identity_orientation() {
    let mut sample = cu_sample();
    let detector = Detector::zero_d();

    // (1, 0, 0) and (0, 1, 0) observed where an unrotated cubic crystal
    // diffracts them
    let r1 = sample
        .add_reflection(&snapshot(&[30.0, 0.0, 90.0, 60.0]), &detector, 1.0, 0.0, 0.0)
        .unwrap();
    let r2 = sample
        .add_reflection(&snapshot(&[30.0, 90.0, 0.0, 60.0]), &detector, 0.0, 1.0, 0.0)
        .unwrap();

    sample.compute_ub_from_two_reflections(r1, r2).unwrap();

    let expected = Matrix3::identity() * (TAU / 1.54);
    assert!((sample.ub() - expected).norm() < 1e-6);
    assert!(sample.ux().value(UnitKind::Default).abs() < 1e-9);
    assert!(sample.uy().value(UnitKind::Default).abs() < 1e-9);
    assert!(sample.uz().value(UnitKind::Default).abs() < 1e-9);
}

#[test]
fn collinear_reflections_are_rejected() {
    let mut sample = cu_sample();
    let detector = Detector::zero_d();

    let r1 = sample
        .add_reflection(&snapshot(&[30.0, 0.0, 90.0, 60.0]), &detector, 1.0, 0.0, 0.0)
        .unwrap();
    let r2 = sample
        .add_reflection(&snapshot(&[30.0, 0.0, 90.0, 60.0]), &detector, 2.0, 0.0, 0.0)
        .unwrap();

    assert!(matches!(
        sample.compute_ub_from_two_reflections(r1, r2),
        Err(gonio::GonioError::Degenerate(_))
    ));
}

#[test]
fn affine_refinement_reports_fit_quality() {
    let mut sample = cu_sample();
    let detector = Detector::zero_d();

    let r1 = sample
        .add_reflection(&snapshot(&[30.0, 0.0, 90.0, 60.0]), &detector, 1.0, 0.0, 0.0)
        .unwrap();
    let r2 = sample
        .add_reflection(&snapshot(&[30.0, 90.0, 0.0, 60.0]), &detector, 0.0, 1.0, 0.0)
        .unwrap();
    sample.compute_ub_from_two_reflections(r1, r2).unwrap();

    // nudge the orientation away from the optimum and refine it back
    sample
        .u_angles_set(2.0, -1.5, 1.0, UnitKind::User)
        .unwrap();
    let quality = sample.affine().unwrap();
    assert!(quality < 1e-6, "fit quality: {quality}");
    assert!(sample.ux().value(UnitKind::User).abs() < 0.1);
}

#[test]
fn affine_needs_two_reflections() {
    let mut sample = cu_sample();
    assert!(sample.affine().is_err());
}
