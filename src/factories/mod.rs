//! Per-diffractometer catalogs: geometry descriptors (axis names,
//! rotation directions, units) and the engines/modes each geometry
//! registers.

pub mod e4c;
pub mod e6c;
pub mod k4cv;
pub mod k6c;
pub mod sixs_med;
pub mod zaxis;
