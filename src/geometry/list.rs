//! # Solution lists
//!
//! [`GeometryList`] is the container returned by every inverse solve: deep
//! copies of the working geometry, one per solution. The container
//! maintains the separation invariant (any two items are at orthodromic
//! distance > ε from each other) by filtering at insertion time.
//!
//! On top of plain storage it implements the three expansion/cleanup
//! passes of the solve pipeline:
//!
//! 1. an optional per-geometry **multiply hook** (e.g. the SIXS MED 2+3
//!    slit-orientation fit) that may rewrite axes in place,
//! 2. the **2π multiplicity expansion** over permutable axes,
//! 3. the removal of items whose axes fall outside their ranges.
//!
//! Sorting by distance to a reference geometry is exposed but never
//! applied implicitly, so discovery order is preserved by default.

use itertools::Itertools;
use ordered_float::OrderedFloat;

use crate::constants::{DPI, EPSILON};
use crate::geometry::Geometry;

/// Hook applied to each solution; may rewrite axes in place.
pub type MultiplyFn = fn(&mut Geometry);

/// One solution of an inverse solve.
#[derive(Debug, Clone)]
pub struct GeometryListItem {
    geometry: Geometry,
}

impl GeometryListItem {
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }
}

/// Deep-copied solutions of one inverse solve.
#[derive(Debug, Clone, Default)]
pub struct GeometryList {
    items: Vec<GeometryListItem>,
    multiply: Option<MultiplyFn>,
}

impl GeometryList {
    pub fn new() -> GeometryList {
        GeometryList {
            items: Vec::new(),
            multiply: None,
        }
    }

    pub fn with_multiply(multiply: Option<MultiplyFn>) -> GeometryList {
        GeometryList {
            items: Vec::new(),
            multiply,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &GeometryListItem> {
        self.items.iter()
    }

    pub fn first(&self) -> Option<&GeometryListItem> {
        self.items.first()
    }

    pub fn get(&self, idx: usize) -> Option<&GeometryListItem> {
        self.items.get(idx)
    }

    /// Insert a deep copy of `geometry`, unless an item closer than ε
    /// (orthodromic) is already present.
    pub fn add(&mut self, geometry: &Geometry) {
        if self
            .items
            .iter()
            .any(|item| geometry.distance_orthodromic(&item.geometry) < EPSILON)
        {
            return;
        }
        self.items.push(GeometryListItem {
            geometry: geometry.clone(),
        });
    }

    /// Drop every item.
    pub fn reset(&mut self) {
        self.items.clear();
    }

    /// Apply the multiply hook to each item in place.
    pub fn multiply(&mut self) {
        if let Some(multiply) = self.multiply {
            self.apply(multiply);
        }
    }

    /// Apply a transform to each item in place (used by the engine-list
    /// post-set hooks).
    pub fn apply(&mut self, f: MultiplyFn) {
        for item in &mut self.items {
            f(&mut item.geometry);
        }
    }

    /// Expand each item over the 2π-shifted representatives of its
    /// permutable axes.
    ///
    /// For every item, each permutable write axis (rotation whose range
    /// spans more than one turn) is first lifted to its smallest in-range
    /// representative, then every combination of +2π shifts that still
    /// fits the ranges is emitted, except the combination equal to the
    /// original item.
    pub fn multiply_from_range(&mut self) {
        let initial = self.items.len();
        for i in 0..initial {
            let reference = self.items[i].geometry.clone();
            let mut geometry = reference.clone();

            let mut permutable = Vec::new();
            for (idx, axis) in geometry.axes().iter().enumerate() {
                if axis.is_permutable() {
                    permutable.push(idx);
                }
            }
            if permutable.is_empty() {
                continue;
            }

            // candidate values per permutable axis, starting from the
            // smallest in-range representative
            let candidates: Vec<Vec<f64>> = permutable
                .iter()
                .map(|&idx| {
                    let axis = &geometry.axes()[idx];
                    let (_, max) = axis.min_max(crate::unit::UnitKind::Default);
                    let mut value = axis.smallest_in_range();
                    let mut values = Vec::new();
                    while value <= max + EPSILON {
                        values.push(value);
                        value += DPI;
                    }
                    values
                })
                .collect();

            for combination in candidates.into_iter().multi_cartesian_product() {
                for (&idx, &value) in permutable.iter().zip(combination.iter()) {
                    // the axis is a rotation, a raw write is enough
                    geometry
                        .axis_mut(reference.axes()[idx].name())
                        .expect("permutable index comes from this geometry")
                        .set_value_raw(value);
                }
                geometry.update();
                if geometry.distance(&reference) > EPSILON {
                    self.items.push(GeometryListItem {
                        geometry: geometry.clone(),
                    });
                }
            }
        }
    }

    /// Remove every item with an axis outside its range.
    pub fn remove_invalid(&mut self) {
        self.items.retain(|item| item.geometry.is_valid_range());
    }

    /// Stable sort by Σ|Δaxis| distance to `reference`; distances closer
    /// than ε compare equal so their discovery order is preserved.
    pub fn sort(&mut self, reference: &Geometry) {
        self.items.sort_by_key(|item| {
            let d = reference.distance(&item.geometry);
            OrderedFloat((d / EPSILON).floor())
        });
    }
}

impl std::fmt::Display for GeometryList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} solution(s)", self.items.len())?;
        for (i, item) in self.items.iter().enumerate() {
            writeln!(f, "{i}: {}", item.geometry)?;
        }
        Ok(())
    }
}
