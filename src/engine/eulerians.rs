//! # The eulerians engine (kappa geometries)
//!
//! A kappa stage realizes the eulerian angles (omega, chi, phi) with the
//! tilted axis triple (komega, kappa, kphi). The map has two branches;
//! both are closed-form, so this engine bypasses the numerical solver
//! entirely: `set` emits one candidate per reachable branch, `get` reads
//! the branch selected by the `solutions` mode parameter.
//!
//! A chi is reachable iff |chi| ≤ 2·alpha, alpha being the kappa tilt.

use crate::algebra::angle_restrict_symm;
use crate::constants::KAPPA_ALPHA;
use crate::detector::Detector;
use crate::engine::{Dependencies, Engine, Mode};
use crate::geometry::list::GeometryList;
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;
use crate::parameter::Parameter;
use crate::sample::Sample;
use crate::unit::{Unit, UnitKind};

use super::hkl::angle_parameter;
use std::f64::consts::FRAC_PI_2;

/// Eulerian angles of a kappa configuration, on the requested branch.
pub(crate) fn kappa_to_eulerian(
    komega: f64,
    kappa: f64,
    kphi: f64,
    alpha: f64,
    solution: bool,
) -> (f64, f64, f64) {
    let kappa = angle_restrict_symm(kappa);
    let p = ((kappa / 2.0).tan() * alpha.cos()).atan();

    if solution {
        (
            komega + p - FRAC_PI_2,
            2.0 * ((kappa / 2.0).sin() * alpha.sin()).asin(),
            kphi + p + FRAC_PI_2,
        )
    } else {
        (
            komega + p + FRAC_PI_2,
            -2.0 * ((kappa / 2.0).sin() * alpha.sin()).asin(),
            kphi + p - FRAC_PI_2,
        )
    }
}

/// Kappa configuration realizing the eulerian angles, on the requested
/// branch; `None` when |chi| exceeds the stage reach (2·alpha).
pub(crate) fn eulerian_to_kappa(
    omega: f64,
    chi: f64,
    phi: f64,
    alpha: f64,
    solution: bool,
) -> Option<(f64, f64, f64)> {
    if chi.abs() > 2.0 * alpha {
        return None;
    }
    // at |chi| == 2 alpha both ratios reach 1, clamp away the rounding
    let p = ((chi / 2.0).tan() / alpha.tan()).clamp(-1.0, 1.0).asin();
    let half_kappa = ((chi / 2.0).sin() / alpha.sin()).clamp(-1.0, 1.0).asin();

    Some(if solution {
        (
            omega - p + FRAC_PI_2,
            2.0 * half_kappa,
            phi - p - FRAC_PI_2,
        )
    } else {
        (
            omega + p - FRAC_PI_2,
            -2.0 * half_kappa,
            phi + p + FRAC_PI_2,
        )
    })
}

fn solutions_parameter() -> Vec<Parameter> {
    vec![Parameter::new(
        "solutions",
        "branch of the kappa ↔ eulerian map used by the forward computation",
        0.0,
        1.0,
        1.0,
        true,
        Unit::Unitless,
        Unit::Unitless,
    )
    .expect("the solutions parameter defaults are admissible")]
}

fn eulerians_get(
    mode: &Mode,
    geometry: &Geometry,
    _detector: &Detector,
    _sample: &Sample,
) -> Result<Vec<f64>, GonioError> {
    let solution = mode.parameters()[0].value(UnitKind::Default) != 0.0;
    let names = mode.axes_read();
    let (omega, chi, phi) = kappa_to_eulerian(
        geometry.axis_get(names[0], UnitKind::Default)?,
        geometry.axis_get(names[1], UnitKind::Default)?,
        geometry.axis_get(names[2], UnitKind::Default)?,
        KAPPA_ALPHA,
        solution,
    );
    Ok(vec![omega, chi, phi])
}

fn eulerians_set(
    mode: &Mode,
    targets: &[f64],
    reference: &Geometry,
    _detector: &Detector,
    _sample: &Sample,
    list: &mut GeometryList,
) -> Result<(), GonioError> {
    let names = mode.axes_write();
    for solution in [false, true] {
        if let Some((komega, kappa, kphi)) =
            eulerian_to_kappa(targets[0], targets[1], targets[2], KAPPA_ALPHA, solution)
        {
            let mut working = reference.clone();
            for (name, value) in names.iter().zip([komega, kappa, kphi]) {
                let idx = working.axis_index(name)?;
                working.axis_value_set_raw(idx, value);
            }
            working.update();
            list.add(&working);
        }
    }
    Ok(())
}

/// The eulerians engine over the kappa triple of the geometry.
pub fn eulerians_engine(kappa_axes: &'static [&'static str]) -> Engine {
    Engine::new(
        "eulerians",
        vec![
            angle_parameter("omega", "eulerian omega", 0.0),
            angle_parameter("chi", "eulerian chi", 0.0),
            angle_parameter("phi", "eulerian phi", 0.0),
        ],
        Dependencies::AXES_ENERGY,
        vec![Mode::auto(
            "eulerians",
            kappa_axes,
            kappa_axes,
            &[],
            solutions_parameter(),
            eulerians_get,
        )
        .with_closed_set(eulerians_set)],
    )
}
