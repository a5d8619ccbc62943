//! # Crystal lattice
//!
//! Six bounded parameters (a, b, c in nanometer; α, β, γ in radian) plus a
//! derived volume parameter. The lattice is the producer of the **B
//! matrix** consumed by the pseudo-axis engines: B maps Miller indices to a
//! crystal-frame vector, with the 2π momentum-transfer convention.
//!
//! A lattice is only constructible when the cell is non-degenerate:
//!
//! ```text
//! D = 1 − cos²α − cos²β − cos²γ + 2 cosα cosβ cosγ > 0
//! ```
//!
//! `set` is atomic: when any of the six values is rejected the previous
//! state is fully preserved.

use nalgebra::Matrix3;

use crate::constants::{NanoMeter, Radian, DEGTORAD, TAU};
use crate::gonio_errors::GonioError;
use crate::parameter::Parameter;
use crate::unit::{Unit, UnitKind};

/// Check the cell admissibility and return its volume.
fn check_lattice(
    a: f64,
    b: f64,
    c: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
) -> Result<f64, GonioError> {
    if crate::algebra::any_nan(&[a, b, c, alpha, beta, gamma]) {
        return Err(GonioError::bad_input("lattice", "NaN is not a legal value"));
    }
    let (ca, cb, cg) = (alpha.cos(), beta.cos(), gamma.cos());
    let d = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
    if d <= 0.0 || a <= 0.0 || b <= 0.0 || c <= 0.0 {
        return Err(GonioError::Degenerate(
            "these lattice parameters are not valid, check alpha, beta and gamma".to_string(),
        ));
    }
    Ok(a * b * c * d.sqrt())
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    a: Parameter,
    b: Parameter,
    c: Parameter,
    alpha: Parameter,
    beta: Parameter,
    gamma: Parameter,
    volume: Parameter,
}

impl Lattice {
    /// Build a lattice from the six cell constants (lengths in nm, angles
    /// in radian).
    ///
    /// Return
    /// ------
    /// * The lattice, or [`GonioError::Degenerate`] for an inadmissible
    ///   cell.
    pub fn new(
        a: NanoMeter,
        b: NanoMeter,
        c: NanoMeter,
        alpha: Radian,
        beta: Radian,
        gamma: Radian,
    ) -> Result<Lattice, GonioError> {
        let volume = check_lattice(a, b, c, alpha, beta, gamma)?;

        let length = |name, description, value: f64| {
            Parameter::new(
                name,
                description,
                0.0,
                value,
                value + 10.0,
                true,
                Unit::NanoMeter,
                Unit::NanoMeter,
            )
        };
        let angle = |name, description, value: f64| {
            Parameter::new(
                name,
                description,
                -std::f64::consts::PI,
                value,
                std::f64::consts::PI,
                true,
                Unit::Radian,
                Unit::Degree,
            )
        };

        Ok(Lattice {
            a: length("a", "length of the first lattice vector", a)?,
            b: length("b", "length of the second lattice vector", b)?,
            c: length("c", "length of the third lattice vector", c)?,
            alpha: angle("alpha", "angle between the second and third lattice vectors", alpha)?,
            beta: angle("beta", "angle between the first and third lattice vectors", beta)?,
            gamma: angle("gamma", "angle between the first and second lattice vectors", gamma)?,
            volume: Parameter::new(
                "volume",
                "volume of the unit cell",
                0.0,
                volume,
                a * b * c,
                false,
                Unit::NanoMeter,
                Unit::NanoMeter,
            )?,
        })
    }

    /// Cubic cell of edge `a` (angles at 90°).
    pub fn cubic(a: NanoMeter) -> Result<Lattice, GonioError> {
        let right = 90.0 * DEGTORAD;
        Lattice::new(a, a, a, right, right, right)
    }

    pub fn a(&self) -> &Parameter {
        &self.a
    }

    pub fn b(&self) -> &Parameter {
        &self.b
    }

    pub fn c(&self) -> &Parameter {
        &self.c
    }

    pub fn alpha(&self) -> &Parameter {
        &self.alpha
    }

    pub fn beta(&self) -> &Parameter {
        &self.beta
    }

    pub fn gamma(&self) -> &Parameter {
        &self.gamma
    }

    pub fn volume(&self) -> &Parameter {
        &self.volume
    }

    /// The six cell constants in the requested unit, in (a, b, c, α, β, γ)
    /// order.
    pub fn get(&self, unit_kind: UnitKind) -> (f64, f64, f64, f64, f64, f64) {
        (
            self.a.value(unit_kind),
            self.b.value(unit_kind),
            self.c.value(unit_kind),
            self.alpha.value(unit_kind),
            self.beta.value(unit_kind),
            self.gamma.value(unit_kind),
        )
    }

    /// Replace the six cell constants at once.
    ///
    /// The admissibility check runs on the converted values **before** any
    /// parameter is touched, so a failure leaves the lattice unchanged.
    pub fn set(
        &mut self,
        a: f64,
        b: f64,
        c: f64,
        alpha: f64,
        beta: f64,
        gamma: f64,
        unit_kind: UnitKind,
    ) -> Result<(), GonioError> {
        let angle_factor = match unit_kind {
            UnitKind::Default => 1.0,
            UnitKind::User => DEGTORAD,
        };
        let (alpha, beta, gamma) = (alpha * angle_factor, beta * angle_factor, gamma * angle_factor);
        let volume = check_lattice(a, b, c, alpha, beta, gamma)?;

        // lengths grow their bounds with the value, as at construction
        self.a.set_min_max(0.0, a + 10.0, UnitKind::Default)?;
        self.a.set_value(a, UnitKind::Default)?;
        self.b.set_min_max(0.0, b + 10.0, UnitKind::Default)?;
        self.b.set_value(b, UnitKind::Default)?;
        self.c.set_min_max(0.0, c + 10.0, UnitKind::Default)?;
        self.c.set_value(c, UnitKind::Default)?;
        self.alpha.set_value(alpha, UnitKind::Default)?;
        self.beta.set_value(beta, UnitKind::Default)?;
        self.gamma.set_value(gamma, UnitKind::Default)?;
        self.volume.set_min_max(0.0, a * b * c, UnitKind::Default)?;
        self.volume.set_value(volume, UnitKind::Default)?;
        Ok(())
    }

    /// The B matrix (upper triangular, 2π convention).
    pub fn b_matrix(&self) -> Result<Matrix3<f64>, GonioError> {
        let (a, b, c, alpha, beta, gamma) = self.get(UnitKind::Default);
        let (ca, cb, cg) = (alpha.cos(), beta.cos(), gamma.cos());
        let d = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        if d <= 0.0 {
            return Err(GonioError::Degenerate(
                "the lattice cell volume is not positive".to_string(),
            ));
        }
        let d = d.sqrt();

        let (sa, sb, sg) = (alpha.sin(), beta.sin(), gamma.sin());
        let b11 = TAU / (b * sa);
        let b22 = TAU / c;
        let tmp = b22 / sa;

        Ok(Matrix3::new(
            TAU * sa / (a * d),
            b11 / d * (ca * cb - cg),
            tmp / d * (cg * ca - cb),
            0.0,
            b11,
            tmp / (sb * sg) * (cb * cg - ca),
            0.0,
            0.0,
            b22,
        ))
    }

    /// Inverse of the B matrix, computed from its triangular structure.
    pub fn b_matrix_inv(&self) -> Result<Matrix3<f64>, GonioError> {
        /*
         * B is upper triangular
         * | a b c |
         * | 0 d e |
         * | 0 0 f |
         */
        let m = self.b_matrix()?;
        let (a, b, c) = (m[(0, 0)], m[(0, 1)], m[(0, 2)]);
        let (d, e) = (m[(1, 1)], m[(1, 2)]);
        let f = m[(2, 2)];

        Ok(Matrix3::new(
            1.0 / a,
            -b / a / d,
            (b * e - d * c) / a / d / f,
            0.0,
            1.0 / d,
            -e / d / f,
            0.0,
            0.0,
            1.0 / f,
        ))
    }

    /// The reciprocal lattice.
    pub fn reciprocal(&self) -> Result<Lattice, GonioError> {
        let (a, b, c, alpha, beta, gamma) = self.get(UnitKind::Default);
        let (ca, cb, cg) = (alpha.cos(), beta.cos(), gamma.cos());
        let d = 1.0 - ca * ca - cb * cb - cg * cg + 2.0 * ca * cb * cg;
        if d <= 0.0 {
            return Err(GonioError::Degenerate(
                "the lattice cell volume is not positive".to_string(),
            ));
        }
        let d = d.sqrt();

        let (sa, sb, sg) = (alpha.sin(), beta.sin(), gamma.sin());
        let sbsg = sb * sg;
        let sgsa = sg * sa;
        let sasb = sa * sb;

        let cos_beta1 = (cb * cg - ca) / sbsg;
        let cos_beta2 = (cg * ca - cb) / sgsa;
        let cos_beta3 = (ca * cb - cg) / sasb;

        Lattice::new(
            TAU * sa / (a * d),
            TAU * sb / (b * d),
            TAU * sg / (c * d),
            f64::atan2(d / sbsg, cos_beta1),
            f64::atan2(d / sgsa, cos_beta2),
            f64::atan2(d / sasb, cos_beta3),
        )
    }

    /// Draw new cell constants inside the parameter ranges, redrawing the
    /// angles until the cell is admissible again.
    pub fn randomize(&mut self) {
        self.a.randomize();
        self.b.randomize();
        self.c.randomize();
        loop {
            self.alpha.randomize();
            self.beta.randomize();
            self.gamma.randomize();
            let (a, b, c, alpha, beta, gamma) = self.get(UnitKind::Default);
            if let Ok(volume) = check_lattice(a, b, c, alpha, beta, gamma) {
                let _ = self.volume.set_min_max(0.0, a * b * c, UnitKind::Default);
                let _ = self.volume.set_value(volume, UnitKind::Default);
                break;
            }
        }
    }
}

impl Default for Lattice {
    fn default() -> Self {
        Lattice::cubic(1.54).expect("the default cubic lattice is admissible")
    }
}

#[cfg(test)]
mod lattice_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_degenerate() {
        let flat = 180.0 * DEGTORAD;
        assert!(matches!(
            Lattice::new(1.0, 1.0, 1.0, flat, flat, flat),
            Err(GonioError::Degenerate(_))
        ));
        assert!(Lattice::cubic(1.54).is_ok());
    }

    #[test]
    fn test_cubic_b_matrix() {
        let lattice = Lattice::cubic(1.54).unwrap();
        let b = lattice.b_matrix().unwrap();
        let expected = Matrix3::identity() * (TAU / 1.54);
        assert_relative_eq!(b, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_b_matrix_inverse() {
        let lattice = Lattice::new(
            1.54,
            2.0,
            3.1,
            85.0 * DEGTORAD,
            95.0 * DEGTORAD,
            100.0 * DEGTORAD,
        )
        .unwrap();
        let b = lattice.b_matrix().unwrap();
        let b_inv = lattice.b_matrix_inv().unwrap();
        assert_relative_eq!(b_inv * b, Matrix3::identity(), epsilon = 1e-9);
    }

    #[test]
    fn test_reciprocal_cubic() {
        let lattice = Lattice::cubic(1.54).unwrap();
        let reciprocal = lattice.reciprocal().unwrap();
        let (a, b, c, alpha, beta, gamma) = reciprocal.get(UnitKind::Default);
        assert_relative_eq!(a, TAU / 1.54, epsilon = 1e-9);
        assert_relative_eq!(b, TAU / 1.54, epsilon = 1e-9);
        assert_relative_eq!(c, TAU / 1.54, epsilon = 1e-9);
        assert_relative_eq!(alpha, 90.0 * DEGTORAD, epsilon = 1e-9);
        assert_relative_eq!(beta, 90.0 * DEGTORAD, epsilon = 1e-9);
        assert_relative_eq!(gamma, 90.0 * DEGTORAD, epsilon = 1e-9);
    }

    #[test]
    fn test_set_atomic() {
        let mut lattice = Lattice::cubic(1.54).unwrap();
        let before = lattice.get(UnitKind::Default);

        let flat = 180.0;
        assert!(lattice
            .set(1.0, 1.0, 1.0, flat, flat, flat, UnitKind::User)
            .is_err());
        assert_eq!(lattice.get(UnitKind::Default), before);

        lattice
            .set(2.0, 2.0, 2.0, 90.0, 90.0, 90.0, UnitKind::User)
            .unwrap();
        let (a, _, _, alpha, _, _) = lattice.get(UnitKind::Default);
        assert_relative_eq!(a, 2.0, epsilon = 1e-12);
        assert_relative_eq!(alpha, 90.0 * DEGTORAD, epsilon = 1e-12);
        assert_relative_eq!(
            lattice.volume().value(UnitKind::Default),
            8.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_user_units() {
        let lattice = Lattice::cubic(1.54).unwrap();
        let (.., gamma) = lattice.get(UnitKind::User);
        assert_relative_eq!(gamma, 90.0, epsilon = 1e-12);
    }
}
