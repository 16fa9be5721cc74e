use serde::{Deserialize, Serialize};

/// Condensed geometry record shared with downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometrySummary {
    pub num_mics: usize,
    pub center: Option<[f64; 3]>,
    pub aperture: Option<f64>,
    pub digest: String,
    pub excluded: Vec<usize>,
}
