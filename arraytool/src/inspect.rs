use crate::config::InspectConfig;
use anyhow::Context;
use beamcore::prelude::{GeometrySummary, MicGeom};
use log::info;

/// Run one inspection job: import, apply exclusions, optionally export.
pub fn inspect(config: &InspectConfig) -> anyhow::Result<GeometrySummary> {
    info!("inspecting {}", config.file.display());
    let mut geom = MicGeom::from_file(&config.file)
        .with_context(|| format!("importing geometry {}", config.file.display()))?;
    geom.set_invalid_channels(config.exclude.clone())
        .context("applying channel exclusions")?;
    if let Some(target) = &config.export {
        geom.export_positions(target)
            .with_context(|| format!("exporting valid positions to {}", target.display()))?;
    }
    geom.summary().context("deriving geometry summary")
}

pub fn render_text(summary: &GeometrySummary) -> String {
    let center = match summary.center {
        Some([x, y, z]) => format!("[{:.4}, {:.4}, {:.4}]", x, y, z),
        None => "n/a".to_string(),
    };
    let aperture = match summary.aperture {
        Some(value) => format!("{:.4}", value),
        None => "n/a".to_string(),
    };
    format!(
        "Geometry -> mics {}, center {}, aperture {}, digest {}",
        summary.num_mics,
        center,
        aperture,
        &summary.digest[..12]
    )
}
