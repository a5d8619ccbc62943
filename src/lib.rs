pub mod algebra;
pub mod constants;
pub mod detector;
pub mod engine;
pub mod factories;
pub mod factory;
pub mod geometry;
pub mod gonio_errors;
pub mod lattice;
pub mod parameter;
pub mod rng;
pub mod sample;
pub mod unit;

pub use detector::{Detector, DetectorKind};
pub use engine::{Engine, EngineList, Mode, SolveParams};
pub use factory::{factories as diffractometers, factory, list_diffractometers, make_engine_list, make_geometry};
pub use geometry::list::{GeometryList, GeometryListItem};
pub use geometry::Geometry;
pub use gonio_errors::GonioError;
pub use lattice::Lattice;
pub use parameter::Parameter;
pub use sample::Sample;
pub use unit::UnitKind;
