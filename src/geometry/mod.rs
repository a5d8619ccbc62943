//! # Geometry & holders
//!
//! A [`Geometry`] is the axis configuration of one diffractometer: an
//! ordered set of [`Parameter`] axes, de-duplicated by name, grouped into
//! two kinematic chains ([`Holder`]). By convention the first holder
//! carries the sample and the last one carries the detector.
//!
//! Holders reference axes by **index** into the owning geometry, never by
//! pointer, and cache the cumulative rotation of their chain as a
//! quaternion. [`Geometry::update`] refreshes the caches whenever an axis
//! value changed.
//!
//! ## Frames & conventions
//!
//! - The x-ray source points along the `ki` direction of the [`Source`]
//!   (x̂ for every geometry of the catalog), with |ki| = 2π/λ.
//! - `kf` is the detector-local beam direction rotated through the
//!   detector holder chain.
//! - All rotations follow the right-hand rule around the axis vector
//!   stated in the factory description.
//!
//! ## See also
//! * [`crate::factory`] – the registry that builds geometries.
//! * [`crate::geometry::list::GeometryList`] – solution container.

pub mod list;

use std::fmt;

use nalgebra::{Matrix3, UnitQuaternion, Vector3};
use smallvec::SmallVec;

use crate::constants::{NanoMeter, TAU};
use crate::detector::Detector;
use crate::factory::Factory;
use crate::gonio_errors::GonioError;
use crate::parameter::Parameter;
use crate::sample::Sample;
use crate::unit::{Unit, UnitKind};

/// The x-ray source: wavelength and incident beam direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    wavelength: NanoMeter,
    direction: Vector3<f64>,
}

impl Source {
    pub fn new(wavelength: NanoMeter, direction: Vector3<f64>) -> Source {
        Source {
            wavelength,
            direction: direction.normalize(),
        }
    }

    pub fn wavelength(&self) -> NanoMeter {
        self.wavelength
    }

    /// The incident wavevector, |ki| = 2π/λ.
    pub fn ki(&self) -> Vector3<f64> {
        self.direction * (TAU / self.wavelength)
    }
}

impl Default for Source {
    fn default() -> Self {
        Source::new(1.54, Vector3::x())
    }
}

/// One kinematic chain: axis indices into the owning geometry plus the
/// cached cumulative quaternion of its rotations.
#[derive(Debug, Clone, PartialEq)]
pub struct Holder {
    indices: SmallVec<[usize; 6]>,
    q: UnitQuaternion<f64>,
}

impl Holder {
    fn new() -> Holder {
        Holder {
            indices: SmallVec::new(),
            q: UnitQuaternion::identity(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Cumulative rotation of the chain, refreshed by
    /// [`Geometry::update`].
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        self.q
    }
}

/// Per-geometry overrides for the derived beam vectors.
///
/// Every geometry of the catalog uses [`GEOMETRY_OPS_DEFAULT`]; the
/// indirection is the seam for geometries whose incident beam crosses
/// additional optics before the sample.
pub struct GeometryOps {
    pub ki: fn(&Geometry) -> Vector3<f64>,
    pub kf: fn(&Geometry, &Detector) -> Vector3<f64>,
}

fn ki_default(geometry: &Geometry) -> Vector3<f64> {
    geometry.source.ki()
}

fn kf_default(geometry: &Geometry, detector: &Detector) -> Vector3<f64> {
    let kf = detector.kf_direction() * (TAU / geometry.source.wavelength());
    geometry.detector_rotation() * kf
}

pub static GEOMETRY_OPS_DEFAULT: GeometryOps = GeometryOps {
    ki: ki_default,
    kf: kf_default,
};

/// The axis configuration of one diffractometer.
#[derive(Clone)]
pub struct Geometry {
    factory: Option<&'static Factory>,
    ops: &'static GeometryOps,
    source: Source,
    axes: Vec<Parameter>,
    holders: Vec<Holder>,
}

impl Geometry {
    /// Geometry bound to a factory descriptor; used by the registry.
    pub(crate) fn new(factory: &'static Factory, ops: &'static GeometryOps) -> Geometry {
        Geometry {
            factory: Some(factory),
            ops,
            source: Source::default(),
            axes: Vec::new(),
            holders: Vec::new(),
        }
    }

    /// Free-standing geometry that a caller customises axis by axis.
    pub fn new_readonly() -> Geometry {
        Geometry {
            factory: None,
            ops: &GEOMETRY_OPS_DEFAULT,
            source: Source::default(),
            axes: Vec::new(),
            holders: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.factory.map_or("readonly", |f| f.name)
    }

    pub fn factory(&self) -> Option<&'static Factory> {
        self.factory
    }

    /// Append an empty holder and return its index.
    pub fn add_holder(&mut self) -> usize {
        self.holders.push(Holder::new());
        self.holders.len() - 1
    }

    /// Add an axis to the geometry, de-duplicated by name.
    ///
    /// Adding an axis whose name already exists returns the existing index
    /// when the transformation matches.
    ///
    /// Panics
    /// ------
    /// When an axis of the same name but an incompatible transformation is
    /// added: the registry entry is malformed and no recovery makes sense.
    fn add_axis(&mut self, axis: Parameter) -> usize {
        if let Some(idx) = self.axes.iter().position(|a| a.name() == axis.name()) {
            if !self.axes[idx].transformation().compatible(axis.transformation()) {
                panic!(
                    "can not add two axes named \"{}\" with incompatible transformations",
                    axis.name()
                );
            }
            return idx;
        }
        self.axes.push(axis);
        self.axes.len() - 1
    }

    fn attach_axis(&mut self, holder: usize, axis: Parameter) -> usize {
        let idx = self.add_axis(axis);
        if !self.holders[holder].indices.contains(&idx) {
            self.holders[holder].indices.push(idx);
        }
        idx
    }

    /// Append a rotation axis to `holder`; returns the axis index.
    pub fn add_rotation(
        &mut self,
        holder: usize,
        name: &'static str,
        axis: Vector3<f64>,
        punit: Unit,
    ) -> usize {
        self.attach_axis(holder, Parameter::rotation(name, axis, punit))
    }

    /// Append a rotation axis about an off-center origin.
    pub fn add_rotation_with_origin(
        &mut self,
        holder: usize,
        name: &'static str,
        axis: Vector3<f64>,
        origin: Vector3<f64>,
        punit: Unit,
    ) -> usize {
        self.attach_axis(
            holder,
            Parameter::rotation_with_origin(name, axis, origin, punit),
        )
    }

    /// Append a translation axis to `holder`.
    pub fn add_translation(
        &mut self,
        holder: usize,
        name: &'static str,
        axis: Vector3<f64>,
        punit: Unit,
    ) -> usize {
        self.attach_axis(holder, Parameter::translation(name, axis, punit))
    }

    pub fn axes(&self) -> &[Parameter] {
        &self.axes
    }

    pub fn holders(&self) -> &[Holder] {
        &self.holders
    }

    pub fn axis_index(&self, name: &str) -> Result<usize, GonioError> {
        self.axes
            .iter()
            .position(|a| a.name() == name)
            .ok_or_else(|| {
                GonioError::bad_input(name, "this geometry does not contain this axis")
            })
    }

    pub fn axis(&self, name: &str) -> Result<&Parameter, GonioError> {
        let idx = self.axis_index(name)?;
        Ok(&self.axes[idx])
    }

    pub fn axis_mut(&mut self, name: &str) -> Result<&mut Parameter, GonioError> {
        let idx = self.axis_index(name)?;
        Ok(&mut self.axes[idx])
    }

    /// Set one axis value by name, then refresh the holder caches.
    pub fn axis_set(
        &mut self,
        name: &str,
        value: f64,
        unit_kind: UnitKind,
    ) -> Result<(), GonioError> {
        self.axis_mut(name)?.set_value(value, unit_kind)?;
        self.update();
        Ok(())
    }

    /// Get one axis value by name.
    pub fn axis_get(&self, name: &str, unit_kind: UnitKind) -> Result<f64, GonioError> {
        Ok(self.axis(name)?.value(unit_kind))
    }

    /// Raw indexed write used by the solver workspace.
    pub(crate) fn axis_value_set_raw(&mut self, idx: usize, value: f64) {
        self.axes[idx].set_value_raw(value);
    }

    /// All axis values in geometry order.
    pub fn axis_values_get(&self, unit_kind: UnitKind) -> Vec<f64> {
        self.axes.iter().map(|a| a.value(unit_kind)).collect()
    }

    /// Set all axis values in geometry order, then update.
    pub fn axis_values_set(
        &mut self,
        values: &[f64],
        unit_kind: UnitKind,
    ) -> Result<(), GonioError> {
        if values.len() != self.axes.len() {
            return Err(GonioError::bad_input(
                self.name(),
                format!(
                    "expected {} axis values, got {}",
                    self.axes.len(),
                    values.len()
                ),
            ));
        }
        for (axis, &value) in self.axes.iter_mut().zip(values) {
            axis.set_value(value, unit_kind)?;
        }
        self.update();
        Ok(())
    }

    pub fn wavelength_get(&self, _unit_kind: UnitKind) -> NanoMeter {
        // wavelength is in nm on both sides of the boundary
        self.source.wavelength
    }

    pub fn wavelength_set(
        &mut self,
        wavelength: NanoMeter,
        _unit_kind: UnitKind,
    ) -> Result<(), GonioError> {
        if wavelength.is_nan() || wavelength <= 0.0 {
            return Err(GonioError::bad_input(
                "wavelength",
                "the wavelength must be a positive number",
            ));
        }
        self.source.wavelength = wavelength;
        Ok(())
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Recompute the holder quaternions if any axis changed, then clear
    /// the changed bits.
    ///
    /// The cumulative product stops at the first non-rotation axis of a
    /// chain; [`Geometry::holder_transformation_apply`] handles the general
    /// case for every transformation kind.
    pub fn update(&mut self) {
        if !self.axes.iter().any(|a| a.changed()) {
            return;
        }
        for holder in &mut self.holders {
            let mut q = UnitQuaternion::identity();
            for &idx in holder.indices.iter() {
                match self.axes[idx].quaternion() {
                    Some(aq) => q *= aq,
                    None => break,
                }
            }
            holder.q = q;
        }
        for axis in &mut self.axes {
            axis.clear_changed();
        }
    }

    /// Apply, from the last axis of the chain to the first, every
    /// transformation of `holder` to a vector.
    pub fn holder_transformation_apply(&self, holder: usize, v: &Vector3<f64>) -> Vector3<f64> {
        self.holders[holder]
            .indices
            .iter()
            .rev()
            .fold(*v, |acc, &idx| self.axes[idx].transformation_apply(&acc))
    }

    /// Sum over axes of |Δvalue| with another geometry.
    pub fn distance(&self, other: &Geometry) -> f64 {
        self.axes
            .iter()
            .zip(other.axes.iter())
            .map(|(a, b)| (a.value(UnitKind::Default) - b.value(UnitKind::Default)).abs())
            .sum()
    }

    /// Sum over axes of the shortest-arc distances (rotations) and linear
    /// distances (translations) with another geometry.
    pub fn distance_orthodromic(&self, other: &Geometry) -> f64 {
        self.axes
            .iter()
            .zip(other.axes.iter())
            .map(|(a, b)| a.orthodromic_distance(b.value(UnitKind::Default)))
            .sum()
    }

    /// Move every axis to its 2π-representative closest to `reference`.
    ///
    /// Fails atomically: when any axis has no representative inside its
    /// range, no axis is mutated.
    pub fn closest_from(&mut self, reference: &Geometry) -> Result<(), GonioError> {
        let mut values = Vec::with_capacity(self.axes.len());
        for (axis, reference_axis) in self.axes.iter().zip(reference.axes.iter()) {
            match axis.value_closest(reference_axis.value(UnitKind::Default)) {
                Some(value) => values.push(value),
                None => {
                    let (min, max) = axis.min_max(UnitKind::Default);
                    return Err(GonioError::OutOfRange {
                        name: axis.name().to_string(),
                        value: axis.value(UnitKind::Default),
                        min,
                        max,
                    });
                }
            }
        }
        for (axis, value) in self.axes.iter_mut().zip(values) {
            axis.set_value_raw(value);
        }
        self.update();
        Ok(())
    }

    /// True when every axis value (or a 2π-lift of it, for rotations) fits
    /// its range.
    pub fn is_valid(&self) -> bool {
        self.axes.iter().all(|a| a.is_valid())
    }

    /// True when every axis value itself fits its range.
    pub fn is_valid_range(&self) -> bool {
        self.axes.iter().all(|a| a.is_valid_range())
    }

    /// Draw every fit axis inside its range (shared crate generator).
    pub fn randomize(&mut self) {
        for axis in &mut self.axes {
            axis.randomize();
        }
        self.update();
    }

    /// Rotation of the sample chain (first holder).
    pub fn sample_rotation(&self) -> UnitQuaternion<f64> {
        self.holders.first().map_or_else(UnitQuaternion::identity, |h| h.q)
    }

    /// Rotation of the detector chain (last holder).
    pub fn detector_rotation(&self) -> UnitQuaternion<f64> {
        self.holders.last().map_or_else(UnitQuaternion::identity, |h| h.q)
    }

    /// The incident wavevector in the laboratory frame.
    pub fn ki(&self) -> Vector3<f64> {
        (self.ops.ki)(self)
    }

    /// The outgoing wavevector in the laboratory frame.
    pub fn kf(&self, detector: &Detector) -> Vector3<f64> {
        (self.ops.kf)(self, detector)
    }

    /// Project a laboratory vector into the sample reciprocal basis:
    /// (R_sample · UB)⁻¹ · v.
    pub fn project_into_reciprocal(
        &self,
        v: &Vector3<f64>,
        sample: &Sample,
    ) -> Result<Vector3<f64>, GonioError> {
        let rub: Matrix3<f64> = self.sample_rotation().to_rotation_matrix().into_inner()
            * sample.ub();
        let rub_inv = rub.try_inverse().ok_or_else(|| {
            GonioError::Degenerate("the R·UB matrix is not invertible".to_string())
        })?;
        Ok(rub_inv * v)
    }

    /// ki expressed in the sample reciprocal basis.
    pub fn ki_abc(&self, sample: &Sample) -> Result<Vector3<f64>, GonioError> {
        self.project_into_reciprocal(&self.ki(), sample)
    }

    /// kf expressed in the sample reciprocal basis.
    pub fn kf_abc(
        &self,
        detector: &Detector,
        sample: &Sample,
    ) -> Result<Vector3<f64>, GonioError> {
        self.project_into_reciprocal(&self.kf(detector), sample)
    }

    /// Copy the source and axis state of a sibling geometry.
    ///
    /// Both geometries must come from the same factory.
    pub fn init_from(&mut self, other: &Geometry) -> Result<(), GonioError> {
        if self.name() != other.name() || self.axes.len() != other.axes.len() {
            return Err(GonioError::bad_input(
                self.name(),
                format!("can not initialize from a \"{}\" geometry", other.name()),
            ));
        }
        self.source = other.source.clone();
        self.axes.clone_from(&other.axes);
        for (holder, other_holder) in self.holders.iter_mut().zip(other.holders.iter()) {
            holder.q = other_holder.q;
        }
        Ok(())
    }
}

impl fmt::Debug for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Geometry")
            .field("name", &self.name())
            .field("wavelength", &self.source.wavelength)
            .field("axes", &self.axes)
            .finish()
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "geometry \"{}\" wavelength: {}",
            self.name(),
            self.source.wavelength
        )?;
        for axis in &self.axes {
            write!(f, " {}", axis)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod geometry_test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn two_circles() -> Geometry {
        let mut g = Geometry::new_readonly();
        let sample = g.add_holder();
        g.add_rotation(sample, "omega", -Vector3::y(), Unit::Degree);
        let detector = g.add_holder();
        g.add_rotation(detector, "tth", -Vector3::y(), Unit::Degree);
        g.update();
        g
    }

    #[test]
    fn test_axis_idempotence() {
        let mut g = Geometry::new_readonly();
        let h0 = g.add_holder();
        let i0 = g.add_rotation(h0, "omega", -Vector3::y(), Unit::Degree);
        let h1 = g.add_holder();
        let i1 = g.add_rotation(h1, "omega", -Vector3::y(), Unit::Degree);
        assert_eq!(i0, i1);
        assert_eq!(g.axes().len(), 1);
        assert_eq!(g.holders()[0].indices(), &[0]);
        assert_eq!(g.holders()[1].indices(), &[0]);
    }

    #[test]
    #[should_panic(expected = "incompatible transformations")]
    fn test_axis_incompatible() {
        let mut g = Geometry::new_readonly();
        let h = g.add_holder();
        g.add_rotation(h, "omega", -Vector3::y(), Unit::Degree);
        g.add_rotation(h, "omega", Vector3::x(), Unit::Degree);
    }

    #[test]
    fn test_update_holder_quaternion() {
        let mut g = two_circles();
        g.axis_set("omega", 90.0, UnitKind::User).unwrap();

        let expected =
            UnitQuaternion::from_axis_angle(&-Vector3::y_axis(), FRAC_PI_2);
        assert_relative_eq!(
            g.sample_rotation().angle(),
            expected.angle(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            (g.sample_rotation() * Vector3::x()),
            Vector3::new(0.0, 0.0, 1.0),
            epsilon = 1e-12
        );
        // the detector chain did not move
        assert_eq!(g.detector_rotation(), UnitQuaternion::identity());
    }

    #[test]
    fn test_holder_stops_at_translation() {
        let mut g = Geometry::new_readonly();
        let h = g.add_holder();
        g.add_rotation(h, "omega", -Vector3::y(), Unit::Degree);
        g.add_translation(h, "ty", Vector3::y(), Unit::MilliMeter);
        g.add_rotation(h, "phi", -Vector3::y(), Unit::Degree);
        g.axis_values_set(&[90.0, 1.0, 90.0], UnitKind::User)
            .unwrap();

        // the cumulative quaternion only sees the axes before the
        // translation
        assert_relative_eq!(
            g.sample_rotation() * Vector3::x(),
            Vector3::new(0.0, 0.0, 1.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_kf() {
        let mut g = two_circles();
        g.axis_values_set(&[30.0, 60.0], UnitKind::User).unwrap();

        let k = TAU / g.wavelength_get(UnitKind::Default);
        let kf = g.kf(&Detector::zero_d());
        assert_relative_eq!(
            kf,
            Vector3::new(k * 0.5, 0.0, k * 3.0_f64.sqrt() / 2.0),
            epsilon = 1e-9
        );
        assert_relative_eq!(g.ki(), Vector3::new(k, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_distances() {
        let mut g1 = two_circles();
        let mut g2 = two_circles();
        g1.axis_values_set(&[10.0, 40.0], UnitKind::User).unwrap();
        g2.axis_values_set(&[-10.0, 80.0], UnitKind::User).unwrap();

        assert_relative_eq!(
            g1.distance(&g2),
            60.0 * crate::constants::DEGTORAD,
            epsilon = 1e-12
        );
        assert_relative_eq!(g1.distance(&g2), g2.distance(&g1), epsilon = 1e-12);

        // orthodromic distance wraps
        g1.axis_values_set(&[179.0, 0.0], UnitKind::User).unwrap();
        g2.axis_values_set(&[-179.0, 0.0], UnitKind::User).unwrap();
        assert_relative_eq!(
            g1.distance_orthodromic(&g2),
            2.0 * crate::constants::DEGTORAD,
            epsilon = 1e-12
        );
        assert_relative_eq!(g1.distance_orthodromic(&g1), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_closest_from_atomic() {
        let mut g = two_circles();
        let mut reference = two_circles();
        g.axis_mut("omega")
            .unwrap()
            .set_min_max(-270.0, 270.0, UnitKind::User)
            .unwrap();
        g.axis_values_set(&[100.0, 0.0], UnitKind::User).unwrap();
        reference
            .axis_values_set(&[-85.0, 0.0], UnitKind::User)
            .unwrap();

        g.closest_from(&reference).unwrap();
        assert_relative_eq!(
            g.axis_get("omega", UnitKind::User).unwrap(),
            -260.0,
            epsilon = 1e-9
        );

        // no representative: nothing mutated
        let mut g = two_circles();
        g.axis_mut("omega")
            .unwrap()
            .set_min_max(200.0, 210.0, UnitKind::User)
            .unwrap();
        g.axis_mut("omega")
            .unwrap()
            .set_value(0.0, UnitKind::User)
            .unwrap();
        let before = g.axis_values_get(UnitKind::Default);
        assert!(g.closest_from(&reference).is_err());
        assert_eq!(g.axis_values_get(UnitKind::Default), before);
    }

    #[test]
    fn test_wavelength() {
        let mut g = two_circles();
        assert!(g.wavelength_set(0.0, UnitKind::Default).is_err());
        assert!(g.wavelength_set(-1.0, UnitKind::Default).is_err());
        assert!(g.wavelength_set(f64::NAN, UnitKind::Default).is_err());
        g.wavelength_set(2.5, UnitKind::Default).unwrap();
        assert_eq!(g.wavelength_get(UnitKind::Default), 2.5);
    }

    #[test]
    fn test_axis_values_len_mismatch() {
        let mut g = two_circles();
        assert!(g.axis_values_set(&[1.0], UnitKind::Default).is_err());
    }
}
