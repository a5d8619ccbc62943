use std::f64::consts::PI;

/// Numerical tolerance shared by the solver, the solution de-duplication
/// and the parameter range checks.
pub const EPSILON: f64 = 1e-6;

/// Momentum transfer constant: |Q| = TAU / d for a d-spacing `d`.
///
/// The crate follows the 2π convention everywhere (B matrix, ki/kf norms,
/// q engines).
pub const TAU: f64 = 2.0 * PI;

pub const DPI: f64 = 2.0 * PI;
pub const DEGTORAD: f64 = PI / 180.0; // degree -> radian conversion factor
pub const RADTODEG: f64 = 180.0 / PI; // radian -> degree conversion factor

/// Tilt of the kappa axis with respect to the omega axis on the kappa
/// stages of the catalog (K4CV, K6C).
pub const KAPPA_ALPHA: Radian = 50.0 * DEGTORAD;

// type def
pub type Radian = f64;
pub type Degree = f64;
/// Lengths are stored in nanometer, wavelength included.
pub type NanoMeter = f64;
