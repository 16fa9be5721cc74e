pub mod mic_geom;
pub mod summary;
pub mod xml;

pub use mic_geom::MicGeom;
pub use summary::GeometrySummary;
