//! Per-scene DSWE classification
//!
//! Chains the full DSWE v1 sequence for one Landsat scene: spectral
//! indices, diagnostic tests, class assignment, and cloud/fill masking.

use crate::decision::{classify_tests, PixelTests, Thresholds, WaterClass, FILL};
use crate::indices::{compute_indices, AweshCoefficients};
use crate::maybe_rayon::*;
use dswe_core::raster::Raster;
use dswe_core::scene::{Scene, SpectralBand};
use dswe_core::{Algorithm, Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Parameters for DSWE classification
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DsweParams {
    /// Diagnostic test thresholds
    pub thresholds: Thresholds,
    /// AWEsh index coefficients
    pub awesh: AweshCoefficients,
}

/// What one pixel of one scene contributed.
///
/// Distinguishes the observation states the composite needs: fill and
/// invalid pixels are non-observations, cloudy pixels are observations
/// that cannot be classified, and unclassified test combinations are
/// valid clear-sky observations without a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Observation {
    /// No usable observation (scene fill or invalid index input)
    Fill,
    /// Obscured by cloud or cloud shadow
    Masked,
    /// Clear-sky observation with a test combination DSWE leaves unclassified
    Unclassified,
    /// Clear-sky observation with an assigned class
    Class(WaterClass),
}

/// Evaluate the DSWE tests for every pixel of a scene.
pub(crate) fn observations(scene: &Scene, params: &DsweParams) -> Result<Array2<Observation>> {
    let indices = compute_indices(scene, params.awesh)?;
    let nir = scene.band(SpectralBand::Nir)?;
    let swir1 = scene.band(SpectralBand::Swir1)?;
    let swir2 = scene.band(SpectralBand::Swir2)?;
    let cloud = scene.cloud_shadow_mask();
    let qa = scene.pixel_qa();

    let (rows, cols) = scene.shape();
    let thresholds = params.thresholds;

    let data: Vec<Observation> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![Observation::Fill; cols];
            for col in 0..cols {
                // pixel_qa == 0 marks fill outside the scene footprint
                if unsafe { qa.get_unchecked(row, col) } == 0 {
                    continue;
                }
                if unsafe { cloud.get_unchecked(row, col) } == 1 {
                    row_data[col] = Observation::Masked;
                    continue;
                }

                let mndwi = unsafe { indices.mndwi.get_unchecked(row, col) };
                let mbsr = unsafe { indices.mbsr.get_unchecked(row, col) };
                let awesh = unsafe { indices.awesh.get_unchecked(row, col) };
                let n = unsafe { nir.get_unchecked(row, col) };
                let s1 = unsafe { swir1.get_unchecked(row, col) };
                let s2 = unsafe { swir2.get_unchecked(row, col) };

                if mndwi.is_nan()
                    || mbsr.is_nan()
                    || awesh.is_nan()
                    || nir.is_nodata(n)
                    || swir1.is_nodata(s1)
                    || swir2.is_nodata(s2)
                {
                    continue;
                }

                let tests = PixelTests::evaluate(&thresholds, mndwi, mbsr, awesh, n, s1, s2);
                row_data[col] = match classify_tests(&tests) {
                    Some(class) => Observation::Class(class),
                    None => Observation::Unclassified,
                };
            }
            row_data
        })
        .collect();

    Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))
}

/// Apply the DSWE v1 algorithm to a single Landsat scene.
///
/// Returns an `i8` classification grid with the published class codes
/// (0 = not water, 1 = high confidence, 2 = moderate confidence,
/// 3 = partial surface water, 9 = cloud/shadow) and −1 as nodata for
/// fill and unclassified pixels.
///
/// The computation is a pure function of the band values: re-running it
/// on the same scene yields an identical grid.
pub fn dswe(scene: &Scene, params: &DsweParams) -> Result<Raster<i8>> {
    log::debug!("classifying scene {} ({})", scene.id(), scene.sensor());

    let obs = observations(scene, params)?;
    let (rows, cols) = scene.shape();

    let mut output = scene.pixel_qa().with_same_meta::<i8>(rows, cols);
    output.set_nodata(Some(FILL));

    for ((row, col), ob) in obs.indexed_iter() {
        let code = match ob {
            Observation::Fill | Observation::Unclassified => FILL,
            Observation::Masked => WaterClass::CloudShadow.code(),
            Observation::Class(class) => class.code(),
        };
        output.data_mut()[(row, col)] = code;
    }

    Ok(output)
}

/// DSWE per-scene classification algorithm
#[derive(Debug, Clone, Default)]
pub struct Dswe;

impl Algorithm for Dswe {
    type Input = Scene;
    type Output = Raster<i8>;
    type Params = DsweParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "DSWE"
    }

    fn description(&self) -> &'static str {
        "Classify surface water extent in a Landsat scene (DSWE v1, Jones 2015)"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        dswe(&input, &params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dswe_core::raster::GeoTransform;
    use dswe_core::scene::Sensor;

    fn clear_qa() -> Raster<u16> {
        let mut qa = Raster::filled(4, 4, 64u16);
        qa.set_transform(GeoTransform::new(300000.0, 4600000.0, 30.0, -30.0));
        qa
    }

    /// Build a uniform 4x4 scene from per-band reflectance values
    /// ordered (blue, green, red, nir, swir1, swir2).
    fn uniform_scene_with_qa(values: [f64; 6], qa: Raster<u16>) -> Scene {
        let transform = *qa.transform();
        let mut scene = Scene::new(
            "LT05_TEST",
            Sensor::Landsat5,
            Utc.with_ymd_and_hms(2005, 6, 1, 15, 30, 0).unwrap(),
            qa,
        );

        for (band, value) in SpectralBand::ALL.into_iter().zip(values) {
            let mut raster = Raster::filled(4, 4, value);
            raster.set_transform(transform);
            scene.insert_band(band, raster).unwrap();
        }
        scene
    }

    fn uniform_scene(values: [f64; 6]) -> Scene {
        uniform_scene_with_qa(values, clear_qa())
    }

    /// Spectra chosen so every pixel is deep open water
    fn water_scene() -> Scene {
        uniform_scene([400.0, 600.0, 400.0, 150.0, 80.0, 60.0])
    }

    /// Spectra chosen so every pixel is vegetated upland
    fn land_scene() -> Scene {
        uniform_scene([300.0, 500.0, 400.0, 3000.0, 1800.0, 1200.0])
    }

    #[test]
    fn test_open_water_high_confidence() {
        let result = dswe(&water_scene(), &DsweParams::default()).unwrap();
        assert_eq!(result.get(2, 2).unwrap(), 1);
    }

    #[test]
    fn test_land_not_water() {
        let result = dswe(&land_scene(), &DsweParams::default()).unwrap();
        assert_eq!(result.get(2, 2).unwrap(), 0);
    }

    #[test]
    fn test_cloud_pixels_get_class_9() {
        let mut qa = clear_qa();
        qa.set(0, 0, 64 | (1 << 5)).unwrap(); // cloud
        qa.set(1, 1, 64 | (1 << 3)).unwrap(); // shadow
        let scene = uniform_scene_with_qa([400.0, 600.0, 400.0, 150.0, 80.0, 60.0], qa);

        let result = dswe(&scene, &DsweParams::default()).unwrap();
        assert_eq!(result.get(0, 0).unwrap(), 9);
        assert_eq!(result.get(1, 1).unwrap(), 9);
        assert_eq!(result.get(3, 3).unwrap(), 1);
    }

    #[test]
    fn test_fill_pixels_are_nodata() {
        let mut qa = clear_qa();
        qa.set(0, 3, 0).unwrap();
        let scene = uniform_scene_with_qa([400.0, 600.0, 400.0, 150.0, 80.0, 60.0], qa);

        let result = dswe(&scene, &DsweParams::default()).unwrap();
        assert_eq!(result.get(0, 3).unwrap(), -1);
        assert!(result.is_nodata(result.get(0, 3).unwrap()));
    }

    #[test]
    fn test_missing_band_propagates() {
        let transform = GeoTransform::new(0.0, 0.0, 30.0, -30.0);
        let mut qa = Raster::filled(4, 4, 64u16);
        qa.set_transform(transform);
        let scene = Scene::new(
            "LE07_PARTIAL",
            Sensor::Landsat7,
            Utc.with_ymd_and_hms(2003, 7, 1, 0, 0, 0).unwrap(),
            qa,
        );

        let err = dswe(&scene, &DsweParams::default()).unwrap_err();
        assert!(matches!(err, Error::MissingBand { .. }));
    }

    #[test]
    fn test_idempotence() {
        let scene = water_scene();
        let params = DsweParams::default();

        let first = dswe(&scene, &params).unwrap();
        let second = dswe(&scene, &params).unwrap();

        assert_eq!(first.data(), second.data());
    }

    #[test]
    fn test_output_confined_to_published_codes() {
        for scene in [water_scene(), land_scene()] {
            let result = dswe(&scene, &DsweParams::default()).unwrap();
            for &code in result.data().iter() {
                assert!(
                    code == -1 || WaterClass::from_code(code).is_some(),
                    "unexpected class code {}",
                    code
                );
            }
        }
    }

    #[test]
    fn test_algorithm_trait() {
        let result = Dswe.execute_default(water_scene()).unwrap();
        assert_eq!(result.get(0, 0).unwrap(), 1);
        assert_eq!(Dswe.name(), "DSWE");
    }
}
