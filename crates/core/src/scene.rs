//! Landsat scene and scene-collection model
//!
//! DSWE v1 is defined for Landsat 5 (TM) and Landsat 7 (ETM+) Collection 1
//! surface-reflectance products. A [`Scene`] bundles the six reflectance
//! bands the algorithm needs with the `pixel_qa` quality band; a
//! [`SceneCollection`] is an ordered set of scenes that can be filtered by
//! bounds and acquisition date before compositing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::raster::Raster;

/// Cloud shadow flag in the Collection 1 `pixel_qa` band (bit 3)
const QA_CLOUD_SHADOW: u16 = 1 << 3;
/// Cloud flag in the Collection 1 `pixel_qa` band (bit 5)
const QA_CLOUD: u16 = 1 << 5;

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

/// Landsat sensors supported by DSWE v1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sensor {
    /// Landsat 5 Thematic Mapper
    Landsat5,
    /// Landsat 7 Enhanced Thematic Mapper Plus
    Landsat7,
}

impl Sensor {
    /// Parse the `SATELLITE` metadata tag of a Landsat product.
    ///
    /// Anything other than Landsat 5 or 7 is rejected: the DSWE v1
    /// thresholds are calibrated for TM/ETM+ reflectance only.
    pub fn from_satellite_tag(tag: &str) -> Result<Self> {
        match tag {
            "LANDSAT_5" => Ok(Sensor::Landsat5),
            "LANDSAT_7" => Ok(Sensor::Landsat7),
            other => Err(Error::UnsupportedSensor(other.to_string())),
        }
    }

    /// The `SATELLITE` metadata tag for this sensor
    pub fn satellite_tag(&self) -> &'static str {
        match self {
            Sensor::Landsat5 => "LANDSAT_5",
            Sensor::Landsat7 => "LANDSAT_7",
        }
    }

    /// Source band name for a spectral band in this sensor's SR product.
    ///
    /// TM and ETM+ happen to share the same numbering; the mapping is
    /// still per-sensor because other Landsat generations differ.
    pub fn source_band_name(&self, band: SpectralBand) -> &'static str {
        match self {
            Sensor::Landsat5 | Sensor::Landsat7 => match band {
                SpectralBand::Blue => "B1",
                SpectralBand::Green => "B2",
                SpectralBand::Red => "B3",
                SpectralBand::Nir => "B4",
                SpectralBand::Swir1 => "B5",
                SpectralBand::Swir2 => "B7",
            },
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.satellite_tag())
    }
}

// ---------------------------------------------------------------------------
// Spectral bands
// ---------------------------------------------------------------------------

/// The reflectance bands DSWE consumes, named by spectral region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpectralBand {
    Blue,
    Green,
    Red,
    /// Near infrared
    Nir,
    /// Shortwave infrared 1 (~1.6 µm)
    Swir1,
    /// Shortwave infrared 2 (~2.2 µm)
    Swir2,
}

impl SpectralBand {
    /// All bands required for a complete DSWE scene
    pub const ALL: [SpectralBand; 6] = [
        SpectralBand::Blue,
        SpectralBand::Green,
        SpectralBand::Red,
        SpectralBand::Nir,
        SpectralBand::Swir1,
        SpectralBand::Swir2,
    ];

    /// Spectral-region name
    pub fn name(&self) -> &'static str {
        match self {
            SpectralBand::Blue => "blue",
            SpectralBand::Green => "green",
            SpectralBand::Red => "red",
            SpectralBand::Nir => "nir",
            SpectralBand::Swir1 => "swir1",
            SpectralBand::Swir2 => "swir2",
        }
    }
}

impl fmt::Display for SpectralBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Axis-aligned geographic bounding box `[min_x, min_y, max_x, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Create a bounding box
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Whether two boxes overlap (touching edges count as overlap)
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

impl From<(f64, f64, f64, f64)> for Bounds {
    fn from(t: (f64, f64, f64, f64)) -> Self {
        Bounds::new(t.0, t.1, t.2, t.3)
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// A single Landsat surface-reflectance scene.
///
/// Reflectance bands are stored as `Raster<f64>` in scaled-DN space
/// (nominal 0..10000); the `pixel_qa` band keeps its native `u16`
/// bitmask. All bands of one scene must share dimensions with the
/// `pixel_qa` band.
#[derive(Debug, Clone)]
pub struct Scene {
    id: String,
    sensor: Sensor,
    acquired: DateTime<Utc>,
    bands: HashMap<SpectralBand, Raster<f64>>,
    pixel_qa: Raster<u16>,
}

impl Scene {
    /// Create a scene with no reflectance bands attached yet.
    ///
    /// The `pixel_qa` band fixes the scene's dimensions and
    /// georeferencing.
    pub fn new(
        id: impl Into<String>,
        sensor: Sensor,
        acquired: DateTime<Utc>,
        pixel_qa: Raster<u16>,
    ) -> Self {
        Self {
            id: id.into(),
            sensor,
            acquired,
            bands: HashMap::new(),
            pixel_qa,
        }
    }

    /// Attach a reflectance band (builder style)
    pub fn with_band(mut self, band: SpectralBand, raster: Raster<f64>) -> Result<Self> {
        self.insert_band(band, raster)?;
        Ok(self)
    }

    /// Attach a reflectance band
    pub fn insert_band(&mut self, band: SpectralBand, raster: Raster<f64>) -> Result<()> {
        self.pixel_qa.check_dimensions(&raster)?;
        self.bands.insert(band, raster);
        Ok(())
    }

    /// Look up a reflectance band.
    ///
    /// A missing band is an error; this is how selecting the wrong
    /// sensor band mapping for a given product surfaces to the caller.
    pub fn band(&self, band: SpectralBand) -> Result<&Raster<f64>> {
        self.bands.get(&band).ok_or_else(|| Error::MissingBand {
            band: self.sensor.source_band_name(band).to_string(),
            sensor: self.sensor.to_string(),
        })
    }

    /// Whether a band is attached
    pub fn has_band(&self, band: SpectralBand) -> bool {
        self.bands.contains_key(&band)
    }

    /// Whether all six DSWE bands are attached
    pub fn is_complete(&self) -> bool {
        SpectralBand::ALL.iter().all(|b| self.has_band(*b))
    }

    /// Scene identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The sensor that acquired this scene
    pub fn sensor(&self) -> Sensor {
        self.sensor
    }

    /// Acquisition timestamp
    pub fn acquired(&self) -> DateTime<Utc> {
        self.acquired
    }

    /// The `pixel_qa` quality band
    pub fn pixel_qa(&self) -> &Raster<u16> {
        &self.pixel_qa
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.pixel_qa.shape()
    }

    /// Geographic bounds of the scene
    pub fn bounds(&self) -> Bounds {
        self.pixel_qa.bounds().into()
    }

    /// Derive the cloud/shadow mask from `pixel_qa`.
    ///
    /// Returns a `u8` grid where 1 marks pixels flagged as cloud or
    /// cloud shadow and 0 marks clear pixels.
    pub fn cloud_shadow_mask(&self) -> Raster<u8> {
        let (rows, cols) = self.shape();
        let mut mask = self.pixel_qa.with_same_meta::<u8>(rows, cols);

        for ((row, col), &qa) in self.pixel_qa.data().indexed_iter() {
            if qa & (QA_CLOUD | QA_CLOUD_SHADOW) != 0 {
                mask.data_mut()[(row, col)] = 1;
            }
        }

        mask
    }

    /// Whether the pixel is fill (no observation).
    ///
    /// Collection 1 `pixel_qa` uses 0 for fill outside the scene footprint.
    pub fn is_fill(&self, row: usize, col: usize) -> Result<bool> {
        Ok(self.pixel_qa.get(row, col)? == 0)
    }
}

// ---------------------------------------------------------------------------
// SceneCollection
// ---------------------------------------------------------------------------

/// An ordered set of Landsat scenes sharing a common provenance.
///
/// Mirrors the usual imagery-collection workflow: merge the Landsat 5
/// and Landsat 7 archives, filter by bounds and date, sort by
/// acquisition time, then map an algorithm over the result.
#[derive(Debug, Clone, Default)]
pub struct SceneCollection {
    scenes: Vec<Scene>,
}

impl SceneCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self { scenes: Vec::new() }
    }

    /// Create a collection from existing scenes
    pub fn from_scenes(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    /// Add a scene
    pub fn push(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }

    /// Number of scenes
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// Whether the collection holds no scenes
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Iterate over scenes
    pub fn iter(&self) -> std::slice::Iter<'_, Scene> {
        self.scenes.iter()
    }

    /// Access the scenes as a slice
    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Merge two collections, consuming both
    pub fn merge(mut self, other: SceneCollection) -> Self {
        self.scenes.extend(other.scenes);
        self
    }

    /// Keep only scenes whose footprint intersects the given bounds
    pub fn filter_bounds(self, bounds: &Bounds) -> Self {
        Self {
            scenes: self
                .scenes
                .into_iter()
                .filter(|s| s.bounds().intersects(bounds))
                .collect(),
        }
    }

    /// Keep only scenes acquired in `[start, end)`
    pub fn filter_date(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            scenes: self
                .scenes
                .into_iter()
                .filter(|s| s.acquired() >= start && s.acquired() < end)
                .collect(),
        }
    }

    /// Keep only scenes matching an arbitrary predicate
    pub fn filter<F>(self, pred: F) -> Self
    where
        F: Fn(&Scene) -> bool,
    {
        Self {
            scenes: self.scenes.into_iter().filter(|s| pred(s)).collect(),
        }
    }

    /// Sort scenes by acquisition time, oldest first
    pub fn sort_by_time(mut self) -> Self {
        self.scenes.sort_by_key(|s| s.acquired());
        self
    }
}

impl IntoIterator for SceneCollection {
    type Item = Scene;
    type IntoIter = std::vec::IntoIter<Scene>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenes.into_iter()
    }
}

impl<'a> IntoIterator for &'a SceneCollection {
    type Item = &'a Scene;
    type IntoIter = std::slice::Iter<'a, Scene>;

    fn into_iter(self) -> Self::IntoIter {
        self.scenes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;
    use chrono::TimeZone;

    fn qa_band(rows: usize, cols: usize, origin_x: f64) -> Raster<u16> {
        // 64 = clear pixel in Collection 1 pixel_qa
        let mut qa = Raster::filled(rows, cols, 64u16);
        qa.set_transform(GeoTransform::new(origin_x, 100.0, 30.0, -30.0));
        qa
    }

    fn scene_at(id: &str, origin_x: f64, year: i32) -> Scene {
        Scene::new(
            id,
            Sensor::Landsat5,
            Utc.with_ymd_and_hms(year, 6, 1, 15, 30, 0).unwrap(),
            qa_band(4, 4, origin_x),
        )
    }

    #[test]
    fn test_sensor_parsing() {
        assert_eq!(
            Sensor::from_satellite_tag("LANDSAT_5").unwrap(),
            Sensor::Landsat5
        );
        assert_eq!(
            Sensor::from_satellite_tag("LANDSAT_7").unwrap(),
            Sensor::Landsat7
        );
        assert!(matches!(
            Sensor::from_satellite_tag("LANDSAT_8"),
            Err(Error::UnsupportedSensor(_))
        ));
    }

    #[test]
    fn test_band_mapping() {
        assert_eq!(
            Sensor::Landsat5.source_band_name(SpectralBand::Swir2),
            "B7"
        );
        assert_eq!(Sensor::Landsat7.source_band_name(SpectralBand::Nir), "B4");
    }

    #[test]
    fn test_missing_band_error() {
        let scene = scene_at("s1", 0.0, 2005);
        let err = scene.band(SpectralBand::Green).unwrap_err();
        assert!(matches!(err, Error::MissingBand { .. }));
    }

    #[test]
    fn test_band_dimension_check() {
        let mut scene = scene_at("s1", 0.0, 2005);
        let wrong = Raster::filled(5, 5, 100.0);
        assert!(scene.insert_band(SpectralBand::Blue, wrong).is_err());

        let right = Raster::filled(4, 4, 100.0);
        assert!(scene.insert_band(SpectralBand::Blue, right).is_ok());
        assert!(scene.has_band(SpectralBand::Blue));
    }

    #[test]
    fn test_cloud_shadow_mask_bits() {
        let mut scene = scene_at("s1", 0.0, 2005);
        let qa = scene.pixel_qa.data_mut();
        qa[(0, 0)] = 64 | (1 << 5); // cloud
        qa[(0, 1)] = 64 | (1 << 3); // shadow
        qa[(0, 2)] = 64 | (1 << 1); // unrelated bit

        let mask = scene.cloud_shadow_mask();
        assert_eq!(mask.get(0, 0).unwrap(), 1);
        assert_eq!(mask.get(0, 1).unwrap(), 1);
        assert_eq!(mask.get(0, 2).unwrap(), 0);
        assert_eq!(mask.get(3, 3).unwrap(), 0);
    }

    #[test]
    fn test_fill_detection() {
        let mut scene = scene_at("s1", 0.0, 2005);
        scene.pixel_qa.set(1, 1, 0).unwrap();
        assert!(scene.is_fill(1, 1).unwrap());
        assert!(!scene.is_fill(0, 0).unwrap());
    }

    #[test]
    fn test_filter_bounds() {
        let collection = SceneCollection::from_scenes(vec![
            scene_at("near", 0.0, 2005),
            scene_at("far", 10000.0, 2005),
        ]);

        // Scene footprint is 4x4 cells of 30m from origin
        let filtered = collection.filter_bounds(&Bounds::new(50.0, 0.0, 60.0, 50.0));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.scenes()[0].id(), "near");
    }

    #[test]
    fn test_filter_date_half_open() {
        let collection = SceneCollection::from_scenes(vec![
            scene_at("a", 0.0, 2004),
            scene_at("b", 0.0, 2005),
            scene_at("c", 0.0, 2006),
        ]);

        let start = Utc.with_ymd_and_hms(2005, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2006, 6, 1, 15, 30, 0).unwrap();
        let filtered = collection.filter_date(start, end);

        // End is exclusive: scene "c" acquired exactly at `end` drops out
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered.scenes()[0].id(), "b");
    }

    #[test]
    fn test_merge_and_sort() {
        let tm = SceneCollection::from_scenes(vec![scene_at("tm", 0.0, 2006)]);
        let etm = SceneCollection::from_scenes(vec![scene_at("etm", 0.0, 2004)]);

        let merged = tm.merge(etm).sort_by_time();
        let ids: Vec<&str> = merged.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["etm", "tm"]);
    }
}
