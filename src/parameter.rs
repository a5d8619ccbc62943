//! # Named, bounded scalars
//!
//! [`Parameter`] is the single value type shared by every container of the
//! crate: geometry axes, pseudo-axes, mode-local scalars and lattice
//! constants are all parameters. A parameter stores its value in a
//! **default** unit (radian, nanometer) and converts on the fly to a
//! **user** unit for the API boundary.
//!
//! Axes additionally carry a [`Transformation`]: a rotation axis (with an
//! optional origin) or a translation axis. Evaluating the transformation
//! yields a quaternion (rotations) or a displacement applied to a vector.
//!
//! ## Numeric semantics
//!
//! * `NaN` is never a legal value; every setter rejects it.
//! * Rotations accept any value; whether a 2π-lift of the value fits the
//!   range is a separate query ([`Parameter::is_valid`]).
//! * Bounded translations reject out-of-range values at set time.
//!
//! ## See also
//! * [`crate::geometry::Geometry`] – owns the axis parameters.
//! * [`crate::lattice::Lattice`] – owns the cell parameters.

use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};

use crate::algebra::{angle_distance, quaternion_from_axis_angle, rotate_around_axis};
use crate::constants::DPI;
use crate::gonio_errors::GonioError;
use crate::rng;
use crate::unit::{Unit, UnitKind};

/// Geometric effect of a parameter, if any.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformation {
    /// Plain scalar (pseudo-axes, mode parameters, lattice lengths...).
    None,
    /// Rotation of `value` radians around `axis`, about `origin`.
    Rotation {
        axis: Vector3<f64>,
        origin: Vector3<f64>,
    },
    /// Translation of `value` along `axis`.
    Translation { axis: Vector3<f64> },
}

impl Transformation {
    /// Two parameters are compatible iff they have the same kind and
    /// exactly equal axis and origin vectors (no epsilon).
    pub fn compatible(&self, other: &Transformation) -> bool {
        match (self, other) {
            (Transformation::None, Transformation::None) => true,
            (
                Transformation::Rotation { axis: a1, origin: o1 },
                Transformation::Rotation { axis: a2, origin: o2 },
            ) => a1 == a2 && o1 == o2,
            (
                Transformation::Translation { axis: a1 },
                Transformation::Translation { axis: a2 },
            ) => a1 == a2,
            _ => false,
        }
    }
}

/// A named, bounded scalar with an optional geometric transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: &'static str,
    description: &'static str,
    value: f64,
    min: f64,
    max: f64,
    fit: bool,
    changed: bool,
    unit: Unit,
    punit: Unit,
    transformation: Transformation,
}

impl Parameter {
    /// Generic constructor for plain scalar parameters.
    ///
    /// Arguments
    /// ---------
    /// * `min`, `value`, `max`: expressed in the default unit; NaN rejected,
    ///   `min <= value <= max` required.
    /// * `unit`, `punit`: default and user units, same dimension required.
    pub fn new(
        name: &'static str,
        description: &'static str,
        min: f64,
        value: f64,
        max: f64,
        fit: bool,
        unit: Unit,
        punit: Unit,
    ) -> Result<Parameter, GonioError> {
        if value.is_nan() || min.is_nan() || max.is_nan() {
            return Err(GonioError::bad_input(name, "NaN is not a legal value"));
        }
        if min > max || value < min || value > max {
            return Err(GonioError::OutOfRange {
                name: name.to_string(),
                value,
                min,
                max,
            });
        }
        // reject incompatible default/user units right away
        unit.factor(punit)?;
        Ok(Parameter {
            name,
            description,
            value,
            min,
            max,
            fit,
            changed: true,
            unit,
            punit,
            transformation: Transformation::None,
        })
    }

    /// Rotation axis, range [-π, π], initial value 0.
    pub fn rotation(name: &'static str, axis: Vector3<f64>, punit: Unit) -> Parameter {
        Parameter {
            name,
            description: "rotation axis",
            value: 0.0,
            min: -std::f64::consts::PI,
            max: std::f64::consts::PI,
            fit: true,
            changed: true,
            unit: Unit::Radian,
            punit,
            transformation: Transformation::Rotation {
                axis,
                origin: Vector3::zeros(),
            },
        }
    }

    /// Rotation axis about an off-center origin.
    pub fn rotation_with_origin(
        name: &'static str,
        axis: Vector3<f64>,
        origin: Vector3<f64>,
        punit: Unit,
    ) -> Parameter {
        let mut p = Parameter::rotation(name, axis, punit);
        p.transformation = Transformation::Rotation { axis, origin };
        p
    }

    /// Translation axis, unbounded range, initial value 0.
    pub fn translation(name: &'static str, axis: Vector3<f64>, punit: Unit) -> Parameter {
        Parameter {
            name,
            description: "translation axis",
            value: 0.0,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            fit: true,
            changed: true,
            unit: Unit::NanoMeter,
            punit,
            transformation: Transformation::Translation { axis },
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn punit(&self) -> Unit {
        self.punit
    }

    pub fn fit(&self) -> bool {
        self.fit
    }

    pub fn set_fit(&mut self, fit: bool) {
        self.fit = fit;
    }

    pub fn transformation(&self) -> &Transformation {
        &self.transformation
    }

    pub(crate) fn changed(&self) -> bool {
        self.changed
    }

    pub(crate) fn clear_changed(&mut self) {
        self.changed = false;
    }

    fn to_unit(&self, value: f64, unit_kind: UnitKind) -> f64 {
        match unit_kind {
            UnitKind::Default => value,
            // the constructor guaranteed the conversion exists
            UnitKind::User => value * self.unit.factor(self.punit).unwrap_or(1.0),
        }
    }

    fn from_unit(&self, value: f64, unit_kind: UnitKind) -> f64 {
        match unit_kind {
            UnitKind::Default => value,
            UnitKind::User => value * self.punit.factor(self.unit).unwrap_or(1.0),
        }
    }

    /// Current value, expressed in the requested unit.
    pub fn value(&self, unit_kind: UnitKind) -> f64 {
        self.to_unit(self.value, unit_kind)
    }

    /// Set the value.
    ///
    /// NaN is rejected for every kind; a bounded translation also rejects
    /// out-of-range values. Rotations accept any value (validity against
    /// the range is queried with [`Parameter::is_valid`]).
    pub fn set_value(&mut self, value: f64, unit_kind: UnitKind) -> Result<(), GonioError> {
        if value.is_nan() {
            return Err(GonioError::bad_input(self.name, "NaN is not a legal value"));
        }
        let v = self.from_unit(value, unit_kind);
        if matches!(self.transformation, Transformation::Translation { .. })
            && (v < self.min || v > self.max)
        {
            return Err(GonioError::OutOfRange {
                name: self.name.to_string(),
                value: v,
                min: self.min,
                max: self.max,
            });
        }
        self.value = v;
        self.changed = true;
        Ok(())
    }

    /// Raw write used by the solver workspace; only NaN is filtered out by
    /// the residual evaluation, not here.
    pub(crate) fn set_value_raw(&mut self, value: f64) {
        self.value = value;
        self.changed = true;
    }

    /// Range bounds in the requested unit.
    pub fn min_max(&self, unit_kind: UnitKind) -> (f64, f64) {
        (self.to_unit(self.min, unit_kind), self.to_unit(self.max, unit_kind))
    }

    /// Set the range bounds.
    pub fn set_min_max(
        &mut self,
        min: f64,
        max: f64,
        unit_kind: UnitKind,
    ) -> Result<(), GonioError> {
        if min.is_nan() || max.is_nan() {
            return Err(GonioError::bad_input(self.name, "NaN is not a legal bound"));
        }
        let (min, max) = (self.from_unit(min, unit_kind), self.from_unit(max, unit_kind));
        if min > max {
            return Err(GonioError::bad_input(self.name, "min must not exceed max"));
        }
        self.min = min;
        self.max = max;
        Ok(())
    }

    /// Draw a new value uniformly inside the range (fit parameters with a
    /// finite range only), using the shared crate generator.
    pub fn randomize(&mut self) {
        if self.fit && self.min.is_finite() && self.max.is_finite() {
            self.value = rng::uniform(self.min, self.max);
            self.changed = true;
        }
    }

    /// Quaternion of the current rotation; `None` for anything else.
    pub fn quaternion(&self) -> Option<UnitQuaternion<f64>> {
        match &self.transformation {
            Transformation::Rotation { axis, .. } => {
                Some(quaternion_from_axis_angle(axis, self.value))
            }
            _ => None,
        }
    }

    /// Apply the transformation at the current value to a vector.
    pub fn transformation_apply(&self, v: &Vector3<f64>) -> Vector3<f64> {
        match &self.transformation {
            Transformation::None => *v,
            Transformation::Rotation { axis, origin } => {
                rotate_around_axis(v, axis, origin, self.value)
            }
            Transformation::Translation { axis } => v + axis * self.value,
        }
    }

    /// Distance to `value`: shortest arc for rotations, |Δ| otherwise.
    pub fn orthodromic_distance(&self, value: f64) -> f64 {
        match self.transformation {
            Transformation::Rotation { .. } => angle_distance(self.value, value),
            _ => (self.value - value).abs(),
        }
    }

    /// The 2π-equivalent of the current value lifted into [min, min + 2π)
    /// (rotations only; other kinds return the value untouched).
    pub fn smallest_in_range(&self) -> f64 {
        match self.transformation {
            Transformation::Rotation { .. } => {
                self.value - DPI * ((self.value - self.min) / DPI).floor()
            }
            _ => self.value,
        }
    }

    /// Replace the value by [`Parameter::smallest_in_range`].
    pub fn set_smallest_in_range(&mut self) {
        self.value = self.smallest_in_range();
        self.changed = true;
    }

    /// For a rotation, the 2π-equivalent of the current value that lies in
    /// [min, max] and is closest to `reference`; `None` when no equivalent
    /// fits the range. Non-rotations return the current value.
    pub fn value_closest(&self, reference: f64) -> Option<f64> {
        match self.transformation {
            Transformation::Rotation { .. } => {
                let k_min = ((self.min - self.value) / DPI).ceil();
                let k_max = ((self.max - self.value) / DPI).floor();
                if k_min > k_max {
                    return None;
                }
                // |value + k 2π - reference| is convex in k
                let k_best = ((reference - self.value) / DPI).round().clamp(k_min, k_max);
                let pick = |k: f64| self.value + k * DPI;
                let mut best = pick(k_best);
                for k in [k_best - 1.0, k_best + 1.0] {
                    if (k_min..=k_max).contains(&k)
                        && (pick(k) - reference).abs() < (best - reference).abs()
                    {
                        best = pick(k);
                    }
                }
                Some(best)
            }
            _ => Some(self.value),
        }
    }

    /// True when the value (or one of its 2π-equivalents, for rotations)
    /// lies inside the range.
    pub fn is_valid(&self) -> bool {
        match self.transformation {
            Transformation::Rotation { .. } => {
                ((self.min - self.value) / DPI).ceil() <= ((self.max - self.value) / DPI).floor()
            }
            Transformation::Translation { .. } => {
                self.value >= self.min && self.value <= self.max
            }
            Transformation::None => true,
        }
    }

    /// Strict containment of the value itself in [min, max].
    pub fn is_valid_range(&self) -> bool {
        self.value >= self.min - crate::constants::EPSILON
            && self.value <= self.max + crate::constants::EPSILON
    }

    /// True when the write axis may hold several 2π-shifted solutions,
    /// i.e. a rotation whose legal range spans more than one turn.
    pub fn is_permutable(&self) -> bool {
        matches!(self.transformation, Transformation::Rotation { .. })
            && (self.max - self.min) > DPI
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} (min: {}, max: {})",
            self.name,
            self.value(UnitKind::User),
            self.punit.repr(),
            self.to_unit(self.min, UnitKind::User),
            self.to_unit(self.max, UnitKind::User),
        )
    }
}

#[cfg(test)]
mod parameter_test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-12;

    fn rotation_x() -> Parameter {
        Parameter::rotation("rotation", Vector3::x(), Unit::Degree)
    }

    #[test]
    fn test_new() {
        let axis = rotation_x();
        assert_eq!("rotation", axis.name());
        let (min, max) = axis.min_max(UnitKind::Default);
        assert_relative_eq!(min, -PI, epsilon = EPS);
        assert_relative_eq!(max, PI, epsilon = EPS);
        assert_eq!(0.0, axis.value(UnitKind::Default));
        assert!(axis.fit());

        let t = Parameter::translation("translation", Vector3::x(), Unit::MilliMeter);
        assert_eq!("translation", t.name());
        let (min, max) = t.min_max(UnitKind::Default);
        assert_eq!(min, f64::NEG_INFINITY);
        assert_eq!(max, f64::INFINITY);
    }

    #[test]
    fn test_quaternion() {
        let mut axis = rotation_x();
        assert_eq!(axis.quaternion().unwrap(), UnitQuaternion::identity());

        axis.set_value(-FRAC_PI_2, UnitKind::Default).unwrap();
        let q = axis.quaternion().unwrap();
        assert_relative_eq!(q.w, std::f64::consts::FRAC_1_SQRT_2, epsilon = EPS);
        assert_relative_eq!(q.i, -std::f64::consts::FRAC_1_SQRT_2, epsilon = EPS);

        let t = Parameter::translation("translation", Vector3::x(), Unit::MilliMeter);
        assert!(t.quaternion().is_none());
    }

    #[test]
    fn test_set_value_nan() {
        let mut axis = rotation_x();
        assert!(axis.set_value(f64::NAN, UnitKind::User).is_err());
        assert!(axis.set_value(f64::NAN, UnitKind::Default).is_err());
    }

    #[test]
    fn test_is_valid() {
        let mut axis = rotation_x();
        axis.set_value(45.0, UnitKind::User).unwrap();
        assert!(axis.is_valid());

        axis.set_min_max(-270.0, 0.0, UnitKind::User).unwrap();
        assert!(!axis.is_valid());
        axis.set_value(-45.0, UnitKind::User).unwrap();
        assert!(axis.is_valid());

        axis.set_min_max(350.0, 450.0, UnitKind::User).unwrap();
        axis.set_value(45.0, UnitKind::User).unwrap();
        assert!(axis.is_valid());
        axis.set_value(-45.0, UnitKind::User).unwrap();
        assert!(!axis.is_valid());

        axis.set_min_max(-10.0, 90.0, UnitKind::User).unwrap();
        axis.set_value(405.0, UnitKind::User).unwrap();
        assert!(axis.is_valid());
        axis.set_value(-405.0, UnitKind::User).unwrap();
        assert!(!axis.is_valid());
    }

    #[test]
    fn test_translation_range() {
        let mut t = Parameter::translation("translation", Vector3::x(), Unit::MilliMeter);
        t.set_value(45.0, UnitKind::Default).unwrap();
        assert!(t.is_valid());
        t.set_min_max(-270.0, 0.0, UnitKind::Default).unwrap();
        assert!(!t.is_valid());
        // bounded translations reject out-of-range at set time
        assert!(t.set_value(45.0, UnitKind::Default).is_err());
        t.set_value(-45.0, UnitKind::Default).unwrap();
        assert!(t.is_valid());
    }

    #[test]
    fn test_smallest_in_range() {
        let mut axis = rotation_x();
        axis.set_min_max(-190.0, 190.0, UnitKind::User).unwrap();

        for (value, expected) in [
            (185.0, -175.0),
            (545.0, -175.0),
            (-185.0, -185.0),
            (175.0, -185.0),
            (190.0, -170.0),
            (-190.0, -190.0),
        ] {
            axis.set_value(value, UnitKind::User).unwrap();
            axis.set_smallest_in_range();
            assert_relative_eq!(axis.value(UnitKind::User), expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_value_closest() {
        let mut axis = rotation_x();
        axis.set_value(0.0, UnitKind::User).unwrap();
        assert_relative_eq!(axis.value_closest(0.0).unwrap(), 0.0, epsilon = EPS);

        axis.set_min_max(-270.0, 180.0, UnitKind::User).unwrap();
        axis.set_value(100.0, UnitKind::User).unwrap();

        let reference = -75.0 * crate::constants::DEGTORAD;
        assert_relative_eq!(
            axis.value_closest(reference).unwrap(),
            100.0 * crate::constants::DEGTORAD,
            epsilon = 1e-9
        );
        let reference = -85.0 * crate::constants::DEGTORAD;
        assert_relative_eq!(
            axis.value_closest(reference).unwrap(),
            -260.0 * crate::constants::DEGTORAD,
            epsilon = 1e-9
        );

        // no representative inside a narrow far range
        axis.set_min_max(200.0, 210.0, UnitKind::User).unwrap();
        axis.set_value(0.0, UnitKind::User).unwrap();
        assert!(axis.value_closest(0.0).is_none());
    }

    #[test]
    fn test_transformation_cmp() {
        let axis1 = Parameter::rotation("rotation", Vector3::x(), Unit::Degree);
        let axis2 = Parameter::rotation("rotation", Vector3::y(), Unit::Degree);
        let t1 = Parameter::translation("translation", Vector3::x(), Unit::MilliMeter);
        let t2 = Parameter::translation("translation", Vector3::y(), Unit::MilliMeter);

        assert!(axis1.transformation().compatible(axis1.transformation()));
        assert!(!axis1.transformation().compatible(axis2.transformation()));
        assert!(!axis1.transformation().compatible(t1.transformation()));
        assert!(t1.transformation().compatible(t1.transformation()));
        assert!(!t1.transformation().compatible(t2.transformation()));
        assert!(!t2.transformation().compatible(axis1.transformation()));
    }

    #[test]
    fn test_unit_round_trip() {
        let mut axis = rotation_x();
        axis.set_value(123.4, UnitKind::User).unwrap();
        assert_relative_eq!(axis.value(UnitKind::User), 123.4, epsilon = 1e-9);
        assert_relative_eq!(
            axis.value(UnitKind::Default),
            123.4 * crate::constants::DEGTORAD,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_is_permutable() {
        let mut axis = rotation_x();
        assert!(!axis.is_permutable());
        axis.set_min_max(-190.0, 190.0, UnitKind::User).unwrap();
        assert!(axis.is_permutable());
        let t = Parameter::translation("translation", Vector3::x(), Unit::MilliMeter);
        assert!(!t.is_permutable());
    }
}
