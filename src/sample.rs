//! # Sample & orientation
//!
//! A [`Sample`] owns a [`Lattice`] and an orientation **U** expressed as
//! three angles (ux, uy, uz), with the product **UB = U·B** cached. It
//! also keeps the list of measured [`Reflection`]s, each binding a Miller
//! index triple to a geometry snapshot; reflections feed the two-reflection
//! closed-form UB computation (Busing–Levy) and the least-squares
//! refinement of the orientation angles.
//!
//! Orientation convention: `U = Rx(ux) · Ry(uy) · Rz(uz)`.

use nalgebra::{Matrix3, Vector3};

use crate::detector::Detector;
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;
use crate::lattice::Lattice;
use crate::parameter::Parameter;
use crate::unit::{Unit, UnitKind};

/// A measured reflection: Miller indices plus the geometry/detector
/// snapshot where it was observed.
#[derive(Debug, Clone)]
pub struct Reflection {
    hkl: Vector3<f64>,
    geometry: Geometry,
    detector: Detector,
}

impl Reflection {
    pub fn hkl(&self) -> Vector3<f64> {
        self.hkl
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The measured momentum transfer brought back into the sample-carrier
    /// frame: R_sample⁻¹ · (kf − ki).
    pub fn measured_q(&self) -> Vector3<f64> {
        let q = self.geometry.kf(&self.detector) - self.geometry.ki();
        self.geometry.sample_rotation().inverse() * q
    }
}

#[derive(Debug, Clone)]
pub struct Sample {
    name: String,
    lattice: Lattice,
    ux: Parameter,
    uy: Parameter,
    uz: Parameter,
    u: Matrix3<f64>,
    ub: Matrix3<f64>,
    reflections: Vec<Reflection>,
}

fn orientation_angle(name: &'static str, description: &'static str) -> Parameter {
    Parameter::new(
        name,
        description,
        -std::f64::consts::PI,
        0.0,
        std::f64::consts::PI,
        true,
        Unit::Radian,
        Unit::Degree,
    )
    .expect("the orientation angle defaults are admissible")
}

/// U = Rx(ux) · Ry(uy) · Rz(uz).
fn u_from_angles(ux: f64, uy: f64, uz: f64) -> Matrix3<f64> {
    let (sa, ca) = ux.sin_cos();
    let (sb, cb) = uy.sin_cos();
    let (sc, cc) = uz.sin_cos();

    Matrix3::new(
        cb * cc,
        -cb * sc,
        sb,
        ca * sc + sa * sb * cc,
        ca * cc - sa * sb * sc,
        -sa * cb,
        sa * sc - ca * sb * cc,
        sa * cc + ca * sb * sc,
        ca * cb,
    )
}

/// Inverse of [`u_from_angles`]; picks uz = 0 at gimbal lock.
fn angles_from_u(u: &Matrix3<f64>) -> (f64, f64, f64) {
    let sb = u[(0, 2)].clamp(-1.0, 1.0);
    let uy = sb.asin();
    if uy.cos().abs() > 1e-9 {
        let ux = f64::atan2(-u[(1, 2)], u[(2, 2)]);
        let uz = f64::atan2(-u[(0, 1)], u[(0, 0)]);
        (ux, uy, uz)
    } else if sb > 0.0 {
        (f64::atan2(u[(1, 0)], u[(1, 1)]), uy, 0.0)
    } else {
        (f64::atan2(-u[(1, 0)], u[(1, 1)]), uy, 0.0)
    }
}

/// Orthonormal basis (columns) built from two non-collinear vectors, the
/// Busing–Levy construction.
fn busing_levy_basis(v1: &Vector3<f64>, v2: &Vector3<f64>) -> Result<Matrix3<f64>, GonioError> {
    let c1 = v1
        .try_normalize(1e-12)
        .ok_or_else(|| GonioError::Degenerate("null reflection vector".to_string()))?;
    let c3 = v1.cross(v2).try_normalize(1e-12).ok_or_else(|| {
        GonioError::Degenerate("the two reflections are collinear".to_string())
    })?;
    let c2 = c3.cross(&c1);
    Ok(Matrix3::from_columns(&[c1, c2, c3]))
}

impl Sample {
    pub fn new(name: impl Into<String>, lattice: Lattice) -> Result<Sample, GonioError> {
        let b = lattice.b_matrix()?;
        Ok(Sample {
            name: name.into(),
            lattice,
            ux: orientation_angle("ux", "rotation of U around the x axis"),
            uy: orientation_angle("uy", "rotation of U around the y axis"),
            uz: orientation_angle("uz", "rotation of U around the z axis"),
            u: Matrix3::identity(),
            ub: b,
            reflections: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Replace the lattice and refresh UB.
    pub fn lattice_set(&mut self, lattice: Lattice) -> Result<(), GonioError> {
        let b = lattice.b_matrix()?;
        self.lattice = lattice;
        self.ub = self.u * b;
        Ok(())
    }

    pub fn ux(&self) -> &Parameter {
        &self.ux
    }

    pub fn uy(&self) -> &Parameter {
        &self.uy
    }

    pub fn uz(&self) -> &Parameter {
        &self.uz
    }

    /// Set the three orientation angles and refresh U and UB.
    pub fn u_angles_set(
        &mut self,
        ux: f64,
        uy: f64,
        uz: f64,
        unit_kind: UnitKind,
    ) -> Result<(), GonioError> {
        self.ux.set_value(ux, unit_kind)?;
        self.uy.set_value(uy, unit_kind)?;
        self.uz.set_value(uz, unit_kind)?;
        self.refresh_ub()?;
        Ok(())
    }

    fn refresh_ub(&mut self) -> Result<(), GonioError> {
        self.u = u_from_angles(
            self.ux.value(UnitKind::Default),
            self.uy.value(UnitKind::Default),
            self.uz.value(UnitKind::Default),
        );
        self.ub = self.u * self.lattice.b_matrix()?;
        Ok(())
    }

    pub fn u(&self) -> Matrix3<f64> {
        self.u
    }

    pub fn ub(&self) -> Matrix3<f64> {
        self.ub
    }

    /// Install a UB matrix: U is recovered as UB·B⁻¹, projected onto the
    /// (ux, uy, uz) angles, and UB is rebuilt from the projection.
    pub fn ub_set(&mut self, ub: &Matrix3<f64>) -> Result<(), GonioError> {
        let u = ub * self.lattice.b_matrix_inv()?;
        let (ux, uy, uz) = angles_from_u(&u);
        self.u_angles_set(ux, uy, uz, UnitKind::Default)
    }

    /// Record a reflection observed at the given geometry snapshot.
    pub fn add_reflection(
        &mut self,
        geometry: &Geometry,
        detector: &Detector,
        h: f64,
        k: f64,
        l: f64,
    ) -> Result<usize, GonioError> {
        if crate::algebra::any_nan(&[h, k, l]) {
            return Err(GonioError::bad_input("reflection", "NaN is not a legal value"));
        }
        if h == 0.0 && k == 0.0 && l == 0.0 {
            return Err(GonioError::bad_input(
                "reflection",
                "the (0, 0, 0) reflection carries no orientation information",
            ));
        }
        self.reflections.push(Reflection {
            hkl: Vector3::new(h, k, l),
            geometry: geometry.clone(),
            detector: detector.clone(),
        });
        Ok(self.reflections.len() - 1)
    }

    pub fn reflections(&self) -> &[Reflection] {
        &self.reflections
    }

    pub fn reflections_clear(&mut self) {
        self.reflections.clear();
    }

    /// Closed-form UB from two non-collinear reflections (Busing–Levy).
    ///
    /// Solves U such that U·B·hᵢ is parallel to the measured qᵢ of both
    /// reflections, then installs it.
    ///
    /// Return
    /// ------
    /// * `Ok(())`, or [`GonioError::Degenerate`] when the reflections are
    ///   collinear (in index space or in measured space) or the lattice is
    ///   degenerate.
    pub fn compute_ub_from_two_reflections(
        &mut self,
        r1: usize,
        r2: usize,
    ) -> Result<(), GonioError> {
        let b = self.lattice.b_matrix()?;
        let (r1, r2) = (
            self.reflections.get(r1).ok_or_else(|| {
                GonioError::bad_input("reflection", "no reflection at this index")
            })?,
            self.reflections.get(r2).ok_or_else(|| {
                GonioError::bad_input("reflection", "no reflection at this index")
            })?,
        );

        let mc = busing_levy_basis(&(b * r1.hkl), &(b * r2.hkl))?;
        let mu = busing_levy_basis(&r1.measured_q(), &r2.measured_q())?;
        let u = mu * mc.transpose();

        let (ux, uy, uz) = angles_from_u(&u);
        self.u_angles_set(ux, uy, uz, UnitKind::Default)
    }

    /// Sum over reflections of |R·UB·h − (kf − ki)|² for a candidate
    /// orientation.
    fn fitness(&self, ux: f64, uy: f64, uz: f64) -> Result<f64, GonioError> {
        let ub = u_from_angles(ux, uy, uz) * self.lattice.b_matrix()?;
        Ok(self
            .reflections
            .iter()
            .map(|r| {
                let q = r.geometry.kf(&r.detector) - r.geometry.ki();
                let modeled = r.geometry.sample_rotation() * (ub * r.hkl);
                (q - modeled).norm_squared()
            })
            .sum())
    }

    /// Least-squares refinement of (ux, uy, uz) over the recorded
    /// reflections, using a bounded Nelder–Mead simplex seeded at the
    /// current orientation.
    ///
    /// Return
    /// ------
    /// * The final fit quality (the residual sum of squares), after the
    ///   refined angles have been installed.
    pub fn affine(&mut self) -> Result<f64, GonioError> {
        if self.reflections.len() < 2 {
            return Err(GonioError::bad_input(
                "sample",
                "at least two reflections are needed to refine the orientation",
            ));
        }

        let start = [
            self.ux.value(UnitKind::Default),
            self.uy.value(UnitKind::Default),
            self.uz.value(UnitKind::Default),
        ];
        let (angles, quality) = simplex_minimize(
            |x| self.fitness(x[0], x[1], x[2]).unwrap_or(f64::INFINITY),
            start,
            std::f64::consts::PI,
            500,
        );
        self.u_angles_set(angles[0], angles[1], angles[2], UnitKind::Default)?;
        Ok(quality)
    }
}

/// Minimal bounded Nelder–Mead over ℝ³: every vertex is clamped to
/// [-bound, bound] component-wise.
fn simplex_minimize(
    f: impl Fn(&[f64; 3]) -> f64,
    start: [f64; 3],
    bound: f64,
    max_iter: usize,
) -> ([f64; 3], f64) {
    const STEP: f64 = 0.1;
    let clamp = |x: [f64; 3]| x.map(|v| v.clamp(-bound, bound));

    let mut simplex: Vec<([f64; 3], f64)> = (0..4)
        .map(|i| {
            let mut x = start;
            if i > 0 {
                x[i - 1] += STEP;
            }
            let x = clamp(x);
            let fx = f(&x);
            (x, fx)
        })
        .collect();

    for _ in 0..max_iter {
        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let best = simplex[0];
        let worst = simplex[3];
        if (worst.1 - best.1).abs() < 1e-14 {
            break;
        }

        let centroid: [f64; 3] = std::array::from_fn(|k| {
            (simplex[0].0[k] + simplex[1].0[k] + simplex[2].0[k]) / 3.0
        });
        let at = |t: f64| {
            let x = clamp(std::array::from_fn(|k| {
                centroid[k] + t * (centroid[k] - worst.0[k])
            }));
            let fx = f(&x);
            (x, fx)
        };

        let reflected = at(1.0);
        if reflected.1 < best.1 {
            let expanded = at(2.0);
            simplex[3] = if expanded.1 < reflected.1 { expanded } else { reflected };
        } else if reflected.1 < simplex[2].1 {
            simplex[3] = reflected;
        } else {
            let contracted = at(-0.5);
            if contracted.1 < worst.1 {
                simplex[3] = contracted;
            } else {
                // shrink towards the best vertex
                for vertex in simplex.iter_mut().skip(1) {
                    let x = clamp(std::array::from_fn(|k| {
                        best.0[k] + 0.5 * (vertex.0[k] - best.0[k])
                    }));
                    let fx = f(&x);
                    *vertex = (x, fx);
                }
            }
        }
    }

    simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    (simplex[0].0, simplex[0].1)
}

#[cfg(test)]
mod sample_test {
    use super::*;
    use crate::constants::{DEGTORAD, TAU};
    use approx::assert_relative_eq;

    #[test]
    fn test_u_angles_round_trip() {
        for (ux, uy, uz) in [
            (0.0, 0.0, 0.0),
            (0.3, -0.2, 1.1),
            (-1.2, 0.7, -0.4),
        ] {
            let u = u_from_angles(ux, uy, uz);
            let (rx, ry, rz) = angles_from_u(&u);
            assert_relative_eq!(rx, ux, epsilon = 1e-9);
            assert_relative_eq!(ry, uy, epsilon = 1e-9);
            assert_relative_eq!(rz, uz, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_default_ub_is_b() {
        let sample = Sample::new("cu", Lattice::cubic(1.54).unwrap()).unwrap();
        assert_relative_eq!(
            sample.ub(),
            Matrix3::identity() * (TAU / 1.54),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_u_angles_set() {
        let mut sample = Sample::new("cu", Lattice::cubic(1.54).unwrap()).unwrap();
        sample
            .u_angles_set(90.0, 0.0, 0.0, UnitKind::User)
            .unwrap();
        // Rx(90°) sends y to z
        assert_relative_eq!(
            sample.u() * Vector3::y(),
            Vector3::z(),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            sample.ux().value(UnitKind::Default),
            90.0 * DEGTORAD,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_ub_set_round_trip() {
        let mut sample = Sample::new("cu", Lattice::cubic(1.54).unwrap()).unwrap();
        let ub = u_from_angles(0.2, -0.3, 0.4) * (Matrix3::identity() * (TAU / 1.54));
        sample.ub_set(&ub).unwrap();
        assert_relative_eq!(sample.ub(), ub, epsilon = 1e-9);
    }

    #[test]
    fn test_busing_levy_collinear() {
        let v1 = Vector3::new(1.0, 0.0, 0.0);
        let v2 = Vector3::new(2.0, 0.0, 0.0);
        assert!(matches!(
            busing_levy_basis(&v1, &v2),
            Err(GonioError::Degenerate(_))
        ));
    }

    #[test]
    fn test_simplex_quadratic() {
        let (x, fx) = simplex_minimize(
            |x| {
                (x[0] - 0.3).powi(2) + 2.0 * (x[1] + 0.1).powi(2) + 0.5 * (x[2] - 0.7).powi(2)
            },
            [0.0, 0.0, 0.0],
            std::f64::consts::PI,
            500,
        );
        assert!(fx < 1e-10);
        assert_relative_eq!(x[0], 0.3, epsilon = 1e-4);
        assert_relative_eq!(x[1], -0.1, epsilon = 1e-4);
        assert_relative_eq!(x[2], 0.7, epsilon = 1e-4);
    }
}
