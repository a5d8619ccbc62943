//! # Diffractometer registry
//!
//! Process-wide directory keyed by diffractometer name. Each entry
//! exposes the canonical axis names (in order), a textual description of
//! the geometry (axis order and rotation directions), a geometry
//! constructor and an engine-list constructor. The registry is built once
//! and read-only afterwards, which makes it safely shareable between
//! threads.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use tracing::debug;

use crate::engine::EngineList;
use crate::factories;
use crate::geometry::Geometry;
use crate::gonio_errors::GonioError;

/// One registry entry: descriptor + constructors.
pub struct Factory {
    pub name: &'static str,
    pub description: &'static str,
    /// Canonical axis names, in geometry order.
    pub axes: &'static [&'static str],
    pub(crate) geometry: fn(&'static Factory) -> Geometry,
    pub(crate) engines: fn() -> EngineList,
}

impl Factory {
    /// Build a geometry with the canonical axes of this diffractometer.
    pub fn create_geometry(&'static self) -> Geometry {
        (self.geometry)(self)
    }

    /// Build the engine catalog of this diffractometer.
    pub fn create_engine_list(&self) -> EngineList {
        (self.engines)()
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("name", &self.name)
            .field("axes", &self.axes)
            .finish()
    }
}

static FACTORIES: LazyLock<BTreeMap<&'static str, &'static Factory>> = LazyLock::new(|| {
    let entries: [&'static Factory; 11] = [
        &factories::e4c::E4CV,
        &factories::e4c::E4CVG,
        &factories::e4c::E4CVG2,
        &factories::k4cv::K4CV,
        &factories::e6c::E6C,
        &factories::k6c::K6C,
        &factories::zaxis::ZAXIS,
        &factories::sixs_med::SOLEIL_SIXS_MED_2_2,
        &factories::sixs_med::SOLEIL_SIXS_MED_1_2,
        &factories::sixs_med::SOLEIL_SIXS_MED_2_3,
        &factories::sixs_med::SOLEIL_SIXS_MED_2_3_V2,
    ];
    let mut map = BTreeMap::new();
    for factory in entries {
        map.insert(factory.name, factory);
    }
    debug!(count = map.len(), "diffractometer registry initialized");
    map
});

/// The full registry.
pub fn factories() -> &'static BTreeMap<&'static str, &'static Factory> {
    &FACTORIES
}

/// Lookup by exact name.
pub fn factory(name: &str) -> Result<&'static Factory, GonioError> {
    FACTORIES.get(name).copied().ok_or_else(|| {
        GonioError::bad_input(name, "no diffractometer registered under this name")
    })
}

/// (name, description, axis names) of every registered diffractometer.
pub fn list_diffractometers() -> Vec<(&'static str, &'static str, &'static [&'static str])> {
    FACTORIES
        .values()
        .map(|f| (f.name, f.description, f.axes))
        .collect()
}

/// Build a geometry by diffractometer name.
pub fn make_geometry(name: &str) -> Result<Geometry, GonioError> {
    Ok(factory(name)?.create_geometry())
}

/// Build an engine list by diffractometer name.
pub fn make_engine_list(name: &str) -> Result<EngineList, GonioError> {
    Ok(factory(name)?.create_engine_list())
}

#[cfg(test)]
mod factory_test {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(factory("E4CV").is_ok());
        assert!(factory("e4cv").is_err());
        assert!(factory("NOPE").is_err());
    }

    #[test]
    fn test_listing() {
        let listing = list_diffractometers();
        assert_eq!(listing.len(), 11);
        let e4cv = listing.iter().find(|(name, ..)| *name == "E4CV").unwrap();
        assert_eq!(e4cv.2, &["omega", "chi", "phi", "tth"]);
    }

    #[test]
    fn test_geometry_matches_descriptor() {
        for (name, _, axes) in list_diffractometers() {
            let geometry = make_geometry(name).unwrap();
            let built: Vec<&str> = geometry.axes().iter().map(|a| a.name()).collect();
            assert_eq!(&built, axes, "axis order mismatch for {name}");
        }
    }
}
