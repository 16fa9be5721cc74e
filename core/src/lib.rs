//! Array-geometry core for the Rust-based beamforming platform.
//!
//! The modules hold the microphone-array geometry record together with its
//! XML import/export glue, explicit memo caches, and well-defined failure
//! modes.

pub mod geometry;
pub mod identity;
pub mod math;
pub mod prelude;
pub mod telemetry;

pub use prelude::{GeomError, GeomResult, GeometrySummary, MicGeom};
