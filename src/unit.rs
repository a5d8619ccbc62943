//! Unit descriptors attached to every [`Parameter`](crate::parameter::Parameter).
//!
//! Each parameter carries two units: the **default** unit used for storage
//! and by every internal computation (radian for angles, nanometer for
//! lengths) and the **user** unit used at the API boundary (often degree or
//! millimeter). Conversion between the two is a plain multiplicative
//! factor; mixing dimensions (angle vs length) is a construction error
//! caught by [`Unit::factor`].

use crate::constants::DEGTORAD;
use crate::gonio_errors::GonioError;

/// Discriminates which unit a numeric get/set refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// The internal storage unit (radian, nanometer).
    Default,
    /// The display unit carried by the parameter (degree, millimeter, ...).
    User,
}

/// Physical dimension of a [`Unit`], used for compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Angle,
    Length,
    None,
}

/// The closed set of units used by the diffractometer catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Radian,
    Degree,
    MilliRadian,
    NanoMeter,
    MilliMeter,
    /// Dimensionless quantities (Miller indices, mode switches, ...).
    Unitless,
}

impl Unit {
    fn dimension(self) -> Dimension {
        match self {
            Unit::Radian | Unit::Degree | Unit::MilliRadian => Dimension::Angle,
            Unit::NanoMeter | Unit::MilliMeter => Dimension::Length,
            Unit::Unitless => Dimension::None,
        }
    }

    /// Value of one unit expressed in the dimension base unit (radian, nm).
    fn scale(self) -> f64 {
        match self {
            Unit::Radian => 1.0,
            Unit::Degree => DEGTORAD,
            Unit::MilliRadian => 1e-3,
            Unit::NanoMeter => 1.0,
            Unit::MilliMeter => 1e6,
            Unit::Unitless => 1.0,
        }
    }

    /// Multiplicative factor converting a value expressed in `self` into a
    /// value expressed in `to`.
    ///
    /// Arguments
    /// ---------
    /// * `to`: the target unit, which must share the dimension of `self`.
    ///
    /// Return
    /// ------
    /// * The conversion factor, or [`GonioError::BadInput`] when the two
    ///   units do not measure the same dimension.
    pub fn factor(self, to: Unit) -> Result<f64, GonioError> {
        if self.dimension() != to.dimension() {
            return Err(GonioError::bad_input(
                self.repr(),
                format!("can not convert into \"{}\"", to.repr()),
            ));
        }
        Ok(self.scale() / to.scale())
    }

    /// Short textual representation used by the `Display` impls.
    pub fn repr(self) -> &'static str {
        match self {
            Unit::Radian => "rad",
            Unit::Degree => "deg",
            Unit::MilliRadian => "mrad",
            Unit::NanoMeter => "nm",
            Unit::MilliMeter => "mm",
            Unit::Unitless => "",
        }
    }
}

#[cfg(test)]
mod unit_test {
    use super::*;
    use crate::constants::RADTODEG;
    use approx::assert_relative_eq;

    #[test]
    fn test_factor() {
        assert_relative_eq!(
            Unit::Radian.factor(Unit::Degree).unwrap(),
            RADTODEG,
            max_relative = 1e-14
        );
        assert_eq!(Unit::Degree.factor(Unit::Radian).unwrap(), DEGTORAD);
        assert_eq!(Unit::Radian.factor(Unit::MilliRadian).unwrap(), 1e3);
        assert_eq!(Unit::NanoMeter.factor(Unit::MilliMeter).unwrap(), 1e-6);
        assert_eq!(Unit::Unitless.factor(Unit::Unitless).unwrap(), 1.0);
    }

    #[test]
    fn test_factor_dimension_mismatch() {
        assert!(Unit::Radian.factor(Unit::NanoMeter).is_err());
        assert!(Unit::MilliMeter.factor(Unit::Degree).is_err());
        assert!(Unit::Unitless.factor(Unit::Radian).is_err());
    }

    #[test]
    fn test_round_trip() {
        let x = 12.3456;
        let to_user = Unit::Radian.factor(Unit::Degree).unwrap();
        let to_default = Unit::Degree.factor(Unit::Radian).unwrap();
        assert!((x * to_user * to_default - x).abs() < 1e-12);
    }
}
