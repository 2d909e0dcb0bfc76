//! Assemble Landsat scenes from per-band GeoTIFF files
//!
//! Surface-reflectance products ship one GeoTIFF per band. Given a
//! directory and a product prefix, [`read_scene`] loads the six DSWE
//! bands plus `pixel_qa` and bundles them into a [`Scene`].

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::raster::Raster;
use crate::scene::{Scene, Sensor, SpectralBand};

use super::native::read_geotiff;

/// Nodata value used by Landsat surface-reflectance bands
const SR_NODATA: f64 = -9999.0;

/// Locations of the per-band files of one Landsat product.
#[derive(Debug, Clone)]
pub struct SceneFiles {
    dir: PathBuf,
    prefix: String,
}

impl SceneFiles {
    /// Point at a product directory and file prefix.
    ///
    /// Band files are expected as `<dir>/<prefix>_<BAND>.tif` (e.g.
    /// `LT05_L1TP_B1.tif`) plus `<dir>/<prefix>_pixel_qa.tif`.
    pub fn new(dir: impl AsRef<Path>, prefix: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.into(),
        }
    }

    /// Path of a reflectance band file for the given sensor
    pub fn band_path(&self, sensor: Sensor, band: SpectralBand) -> PathBuf {
        self.dir
            .join(format!("{}_{}.tif", self.prefix, sensor.source_band_name(band)))
    }

    /// Path of the `pixel_qa` file
    pub fn qa_path(&self) -> PathBuf {
        self.dir.join(format!("{}_pixel_qa.tif", self.prefix))
    }
}

/// Load a complete DSWE scene from per-band files.
///
/// Missing or unreadable files surface as I/O or TIFF errors; dimension
/// mismatches between bands are rejected when the scene is assembled.
pub fn read_scene(
    files: &SceneFiles,
    id: impl Into<String>,
    sensor: Sensor,
    acquired: DateTime<Utc>,
) -> Result<Scene> {
    let id = id.into();
    log::debug!("loading scene {} ({})", id, sensor);

    let qa: Raster<u16> = read_geotiff(files.qa_path())?;
    let mut scene = Scene::new(id, sensor, acquired, qa);

    for band in SpectralBand::ALL {
        let mut raster: Raster<f64> = read_geotiff(files.band_path(sensor, band))?;
        raster.set_nodata(Some(SR_NODATA));
        scene.insert_band(band, raster)?;
    }

    Ok(scene)
}
