use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Description of an inspection job, loadable from YAML.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InspectConfig {
    pub file: PathBuf,
    #[serde(default)]
    pub exclude: Vec<usize>,
    #[serde(default)]
    pub export: Option<PathBuf>,
}

impl InspectConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading inspection config {}", path_ref.display()))?;
        let config: InspectConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing inspection config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(file: PathBuf, exclude: Vec<usize>, export: Option<PathBuf>) -> Self {
        Self {
            file,
            exclude,
            export,
        }
    }
}
