use crate::geometry::summary::GeometrySummary;
use crate::geometry::xml;
use crate::identity;
use crate::math::distance::DistanceHelper;
use crate::prelude::{GeomError, GeomResult};
use crate::telemetry::log::LogManager;
use ndarray::{Array2, ArrayView2, Axis};
use std::path::{Path, PathBuf};

/// A derived value together with the state version it was computed for.
struct Cached<T> {
    version: u64,
    value: T,
}

/// Geometric arrangement of the microphones in an array.
///
/// Owns the 3xN position table and the excluded channel indices, and derives
/// the valid-position view, the array center, the aperture and the identity
/// digest from them. Derived values are recomputed only when the defining
/// state has changed since the last access; a version counter bumped on
/// every mutation drives the invalidation. Single-owner, single-threaded use
/// only — callers needing shared access must synchronize externally.
pub struct MicGeom {
    pos_total: Array2<f64>,
    invalid_channels: Vec<usize>,
    source_file: Option<PathBuf>,
    version: u64,
    valid: Option<Cached<Array2<f64>>>,
    center: Option<Cached<Option<[f64; 3]>>>,
    aperture: Option<Cached<Option<f64>>>,
    digest: Option<Cached<String>>,
    logger: LogManager,
}

impl MicGeom {
    /// An empty geometry: a 3x0 table and no exclusions.
    pub fn new() -> Self {
        Self {
            pos_total: Array2::zeros((3, 0)),
            invalid_channels: Vec::new(),
            source_file: None,
            version: 0,
            valid: None,
            center: None,
            aperture: None,
            digest: None,
            logger: LogManager::new(),
        }
    }

    /// Build a geometry directly from an XML file.
    pub fn from_file(path: impl AsRef<Path>) -> GeomResult<Self> {
        let mut geom = Self::new();
        geom.set_source_file(path)?;
        Ok(geom)
    }

    /// Import microphone positions from an XML file.
    ///
    /// The path must name an existing `.xml` document. The document is
    /// parsed completely before anything is committed, so a malformed file
    /// leaves the previous table untouched. On success the table is replaced
    /// wholesale and the source path is recorded.
    pub fn set_source_file(&mut self, path: impl AsRef<Path>) -> GeomResult<()> {
        let path = path.as_ref();
        if !has_xml_extension(path) {
            return Err(GeomError::Io(format!(
                "{} is not an .xml file",
                path.display()
            )));
        }
        let table = xml::read_positions(path)?;
        let count = table.ncols();
        self.pos_total = table;
        self.source_file = Some(path.to_path_buf());
        self.bump();
        self.logger.record(&format!(
            "imported {} microphone positions from {}",
            count,
            path.display()
        ));
        Ok(())
    }

    /// Replace the position table wholesale.
    pub fn set_pos_total(&mut self, pos_total: Array2<f64>) -> GeomResult<()> {
        if pos_total.nrows() != 3 {
            return Err(GeomError::Shape(format!(
                "expected 3 rows, got {}",
                pos_total.nrows()
            )));
        }
        self.pos_total = pos_total;
        self.bump();
        Ok(())
    }

    /// Mark channels as excluded from all derived geometry.
    ///
    /// Indices must be distinct and within the current table; they are
    /// checked again whenever derived values are produced, since a later
    /// import can shrink the table underneath an existing exclusion list.
    pub fn set_invalid_channels(&mut self, channels: Vec<usize>) -> GeomResult<()> {
        validate_channels(&channels, self.pos_total.ncols())?;
        self.invalid_channels = channels;
        self.bump();
        Ok(())
    }

    pub fn pos_total(&self) -> ArrayView2<'_, f64> {
        self.pos_total.view()
    }

    pub fn invalid_channels(&self) -> &[usize] {
        &self.invalid_channels
    }

    pub fn source_file(&self) -> Option<&Path> {
        self.source_file.as_deref()
    }

    /// Positions of the valid microphones only, order preserved.
    pub fn valid_positions(&mut self) -> GeomResult<ArrayView2<'_, f64>> {
        let fresh = self.valid.as_ref().map(|cached| cached.version) == Some(self.version);
        if !fresh {
            let value = compute_valid(&self.pos_total, &self.invalid_channels)?;
            self.valid = Some(Cached {
                version: self.version,
                value,
            });
        }
        match &self.valid {
            Some(cached) => Ok(cached.value.view()),
            None => Err(GeomError::Internal(
                "valid-position cache not populated".into(),
            )),
        }
    }

    /// Number of valid microphones.
    pub fn num_mics(&mut self) -> GeomResult<usize> {
        Ok(self.valid_positions()?.ncols())
    }

    /// Arithmetic mean of the valid positions per axis.
    ///
    /// `None` when there are no valid microphones. Components smaller in
    /// magnitude than 1e-16 are snapped to exactly zero.
    pub fn center(&mut self) -> GeomResult<Option<[f64; 3]>> {
        if let Some(cached) = &self.center {
            if cached.version == self.version {
                return Ok(cached.value);
            }
        }
        let value = compute_center(self.valid_positions()?);
        self.center = Some(Cached {
            version: self.version,
            value,
        });
        Ok(value)
    }

    /// Maximum distance between any two valid microphones.
    ///
    /// `None` when there are no valid microphones, `Some(0.0)` for one.
    pub fn aperture(&mut self) -> GeomResult<Option<f64>> {
        if let Some(cached) = &self.aperture {
            if cached.version == self.version {
                return Ok(cached.value);
            }
        }
        let value = DistanceHelper::max_pairwise(self.valid_positions()?);
        self.aperture = Some(Cached {
            version: self.version,
            value,
        });
        Ok(value)
    }

    /// Stable fingerprint of the defining state, for caching layers.
    pub fn digest(&mut self) -> GeomResult<String> {
        if let Some(cached) = &self.digest {
            if cached.version == self.version {
                return Ok(cached.value.clone());
            }
        }
        self.valid_positions()?;
        let value = identity::fingerprint(self.pos_total.view(), &self.invalid_channels);
        self.digest = Some(Cached {
            version: self.version,
            value: value.clone(),
        });
        Ok(value)
    }

    /// Bundle the derived values into the shared summary record.
    pub fn summary(&mut self) -> GeomResult<GeometrySummary> {
        Ok(GeometrySummary {
            num_mics: self.num_mics()?,
            center: self.center()?,
            aperture: self.aperture()?,
            digest: self.digest()?,
            excluded: self.invalid_channels.clone(),
        })
    }

    /// Export the valid microphone positions to an XML file.
    ///
    /// Writes the fixed `MicArray` format with positions renumbered over the
    /// valid microphones. A target without an `.xml` extension is written
    /// anyway, with an advisory in the log.
    pub fn export_positions(&mut self, path: impl AsRef<Path>) -> GeomResult<()> {
        let path = path.as_ref();
        if !has_xml_extension(path) {
            self.logger.advise(&format!(
                "export target {} does not carry an .xml extension",
                path.display()
            ));
        }
        let count = {
            let positions = self.valid_positions()?;
            xml::write_positions(path, positions)?;
            positions.ncols()
        };
        self.logger.record(&format!(
            "exported {} microphone positions to {}",
            count,
            path.display()
        ));
        Ok(())
    }

    fn bump(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

impl Default for MicGeom {
    fn default() -> Self {
        Self::new()
    }
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("xml"))
        .unwrap_or(false)
}

fn validate_channels(channels: &[usize], total: usize) -> GeomResult<()> {
    for (position, &channel) in channels.iter().enumerate() {
        if channel >= total {
            return Err(GeomError::InvalidChannel(format!(
                "channel {} out of range for {} microphones",
                channel, total
            )));
        }
        if channels[..position].contains(&channel) {
            return Err(GeomError::InvalidChannel(format!(
                "channel {} listed more than once",
                channel
            )));
        }
    }
    Ok(())
}

fn compute_valid(pos_total: &Array2<f64>, invalid: &[usize]) -> GeomResult<Array2<f64>> {
    let total = pos_total.ncols();
    validate_channels(invalid, total)?;
    if invalid.is_empty() {
        return Ok(pos_total.clone());
    }
    let keep: Vec<usize> = (0..total).filter(|index| !invalid.contains(index)).collect();
    Ok(pos_total.select(Axis(1), &keep))
}

fn compute_center(positions: ArrayView2<f64>) -> Option<[f64; 3]> {
    let mean = positions.mean_axis(Axis(1))?;
    let mut center = [mean[0], mean[1], mean[2]];
    for component in &mut center {
        if component.abs() < 1e-16 {
            *component = 0.0;
        }
    }
    Some(center)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::io::Write as _;

    fn xml_fixture(contents: &str) -> tempfile::TempPath {
        let mut file = tempfile::Builder::new()
            .suffix(".xml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.into_temp_path()
    }

    const PAIR: &str = r#"<?xml version="1.1" encoding="utf-8"?>
<MicArray name="pair">
  <pos Name="Point 1" x="0" y="0" z="0"/>
  <pos Name="Point 2" x="1" y="0" z="0"/>
</MicArray>"#;

    #[test]
    fn import_builds_table_in_document_order() {
        let path = xml_fixture(PAIR);
        let mut geom = MicGeom::from_file(&path).unwrap();

        assert_eq!(geom.pos_total(), array![[0.0, 1.0], [0.0, 0.0], [0.0, 0.0]]);
        assert_eq!(geom.num_mics().unwrap(), 2);
        assert_eq!(geom.center().unwrap(), Some([0.5, 0.0, 0.0]));
        assert_eq!(geom.aperture().unwrap(), Some(1.0));
        assert_eq!(geom.source_file(), Some(path.as_ref()));
    }

    #[test]
    fn excluding_a_channel_narrows_every_derived_value() {
        let path = xml_fixture(PAIR);
        let mut geom = MicGeom::from_file(&path).unwrap();
        geom.set_invalid_channels(vec![0]).unwrap();

        assert_eq!(
            geom.valid_positions().unwrap().to_owned(),
            array![[1.0], [0.0], [0.0]]
        );
        assert_eq!(geom.num_mics().unwrap(), 1);
        assert_eq!(geom.center().unwrap(), Some([1.0, 0.0, 0.0]));
        assert_eq!(geom.aperture().unwrap(), Some(0.0));
    }

    #[test]
    fn empty_exclusions_leave_the_table_as_is() {
        let mut geom = MicGeom::new();
        let table = array![[0.0, 1.0, 2.0], [0.0, 0.0, 0.0], [0.0, 0.0, 0.0]];
        geom.set_pos_total(table.clone()).unwrap();

        assert_eq!(geom.valid_positions().unwrap().to_owned(), table);
        assert_eq!(geom.aperture().unwrap(), Some(2.0));
    }

    #[test]
    fn empty_geometry_has_no_center_or_aperture() {
        let mut geom = MicGeom::new();
        assert_eq!(geom.num_mics().unwrap(), 0);
        assert_eq!(geom.center().unwrap(), None);
        assert_eq!(geom.aperture().unwrap(), None);
    }

    #[test]
    fn tiny_center_components_snap_to_zero() {
        let mut geom = MicGeom::new();
        geom.set_pos_total(array![
            [1e-16, 0.0, 0.0],
            [0.0, 0.0, 0.0],
            [1.0, -1.0, 0.0]
        ])
        .unwrap();

        let center = geom.center().unwrap().unwrap();
        assert_eq!(center, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn wrong_row_count_is_rejected() {
        let mut geom = MicGeom::new();
        let flat = Array2::zeros((2, 4));
        assert!(matches!(
            geom.set_pos_total(flat),
            Err(GeomError::Shape(_))
        ));
    }

    #[test]
    fn out_of_range_and_duplicate_channels_are_rejected() {
        let mut geom = MicGeom::new();
        geom.set_pos_total(array![[0.0, 1.0], [0.0, 0.0], [0.0, 0.0]])
            .unwrap();

        assert!(matches!(
            geom.set_invalid_channels(vec![2]),
            Err(GeomError::InvalidChannel(_))
        ));
        assert!(matches!(
            geom.set_invalid_channels(vec![1, 1]),
            Err(GeomError::InvalidChannel(_))
        ));
    }

    #[test]
    fn stale_exclusions_surface_when_the_table_shrinks() {
        let mut geom = MicGeom::new();
        geom.set_pos_total(array![
            [0.0, 1.0, 2.0],
            [0.0, 0.0, 0.0],
            [0.0, 0.0, 0.0]
        ])
        .unwrap();
        geom.set_invalid_channels(vec![2]).unwrap();

        geom.set_pos_total(array![[0.0, 1.0], [0.0, 0.0], [0.0, 0.0]])
            .unwrap();
        assert!(matches!(
            geom.valid_positions(),
            Err(GeomError::InvalidChannel(_))
        ));
    }

    #[test]
    fn failed_import_preserves_the_previous_table() {
        let good = xml_fixture(PAIR);
        let bad = xml_fixture(r#"<MicArray name="broken"><pos x="0" y="0" z="0"/>"#);

        let mut geom = MicGeom::from_file(&good).unwrap();
        assert!(matches!(
            geom.set_source_file(&bad),
            Err(GeomError::Parse(_))
        ));
        assert_eq!(geom.num_mics().unwrap(), 2);
        assert_eq!(geom.source_file(), Some(good.as_ref()));
    }

    #[test]
    fn non_xml_source_path_is_rejected() {
        let mut geom = MicGeom::new();
        assert!(matches!(
            geom.set_source_file("positions.csv"),
            Err(GeomError::Io(_))
        ));
    }

    #[test]
    fn digest_is_stable_until_the_state_changes() {
        let path = xml_fixture(PAIR);
        let mut geom = MicGeom::from_file(&path).unwrap();

        let first = geom.digest().unwrap();
        assert_eq!(geom.digest().unwrap(), first);

        geom.set_invalid_channels(vec![0]).unwrap();
        assert_ne!(geom.digest().unwrap(), first);
    }

    #[test]
    fn export_writes_only_valid_positions_renumbered() {
        let source = xml_fixture(PAIR);
        let target = tempfile::Builder::new()
            .suffix(".xml")
            .tempfile()
            .unwrap()
            .into_temp_path();

        let mut geom = MicGeom::from_file(&source).unwrap();
        geom.set_invalid_channels(vec![0]).unwrap();
        geom.export_positions(&target).unwrap();

        let contents = std::fs::read_to_string(&target).unwrap();
        assert!(contents.contains(r#"Name="Point 1""#));
        assert!(!contents.contains(r#"Name="Point 2""#));

        let mut restored = MicGeom::from_file(&target).unwrap();
        assert_eq!(
            restored.valid_positions().unwrap().to_owned(),
            array![[1.0], [0.0], [0.0]]
        );
    }

    #[test]
    fn export_then_reimport_round_trips_valid_positions() {
        let mut geom = MicGeom::new();
        geom.set_pos_total(array![
            [0.0, 0.25, -1.5],
            [0.1, 0.0, 2.0],
            [0.0, -0.75, 0.5]
        ])
        .unwrap();

        let target = tempfile::Builder::new()
            .suffix(".xml")
            .tempfile()
            .unwrap()
            .into_temp_path();
        geom.export_positions(&target).unwrap();

        let mut restored = MicGeom::from_file(&target).unwrap();
        let original = geom.valid_positions().unwrap().to_owned();
        let reread = restored.valid_positions().unwrap().to_owned();
        for (a, b) in original.iter().zip(reread.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn summary_bundles_the_derived_values() {
        let path = xml_fixture(PAIR);
        let mut geom = MicGeom::from_file(&path).unwrap();
        geom.set_invalid_channels(vec![1]).unwrap();

        let summary = geom.summary().unwrap();
        assert_eq!(summary.num_mics, 1);
        assert_eq!(summary.center, Some([0.0, 0.0, 0.0]));
        assert_eq!(summary.aperture, Some(0.0));
        assert_eq!(summary.excluded, vec![1]);
        assert_eq!(summary.digest, geom.digest().unwrap());
    }
}
