pub use crate::geometry::{GeometrySummary, MicGeom};

/// Common error type for geometry operations.
#[derive(thiserror::Error, Debug)]
pub enum GeomError {
    #[error("file access failed: {0}")]
    Io(String),
    #[error("malformed geometry file: {0}")]
    Parse(String),
    #[error("bad position attribute: {0}")]
    Attribute(String),
    #[error("invalid channel set: {0}")]
    InvalidChannel(String),
    #[error("invalid position table: {0}")]
    Shape(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type GeomResult<T> = Result<T, GeomError>;
