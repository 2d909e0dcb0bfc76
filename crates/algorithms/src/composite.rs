//! Temporal DSWE composite
//!
//! Classifies every scene in a collection and reduces the per-scene
//! results to per-pixel class probabilities over the clear-sky
//! observations, the `cdswe` product of DSWE v1.

use crate::classify::{observations, DsweParams, Observation};
use crate::decision::WaterClass;
use dswe_core::raster::Raster;
use dswe_core::scene::SceneCollection;
use dswe_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Nodata for probability grids: pixels with no clear-sky observation
pub const NO_OBSERVATION: u8 = 255;

/// Parameters for the temporal composite
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CompositeParams {
    /// Per-scene classification parameters
    pub classifier: DsweParams,
}

/// Per-pixel DSWE class probabilities over a scene collection.
///
/// Probabilities are percentages (0..=100) of the clear-sky
/// observations in which the pixel fell into each class; pixels never
/// observed clear hold [`NO_OBSERVATION`].
#[derive(Debug, Clone)]
pub struct DsweComposite {
    /// Probability of class 0 (not water)
    pub p_not_water: Raster<u8>,
    /// Probability of class 1 (water, high confidence)
    pub p_high_confidence: Raster<u8>,
    /// Probability of class 2 (water, moderate confidence)
    pub p_moderate_confidence: Raster<u8>,
    /// Probability of class 3 (partial surface water)
    pub p_partial_surface: Raster<u8>,
    /// Number of clear-sky observations per pixel
    pub clear_observations: Raster<u32>,
}

/// Build a temporal DSWE composite from a scene collection.
///
/// Filter and sort the collection first (`filter_bounds`, `filter_date`,
/// `sort_by_time`); this function classifies what it is given. All
/// scenes must share dimensions. Cloud-masked observations are excluded
/// from the clear-sky count; fill and invalid observations never count.
pub fn cdswe(collection: &SceneCollection, params: &CompositeParams) -> Result<DsweComposite> {
    let first = collection.iter().next().ok_or(Error::EmptyCollection)?;
    let template = first.pixel_qa();
    let (rows, cols) = template.shape();

    log::info!(
        "compositing {} scenes ({}x{} pixels)",
        collection.len(),
        rows,
        cols
    );

    let mut clear = vec![0u32; rows * cols];
    // One counter grid per class 0..=3
    let mut counts = vec![[0u32; 4]; rows * cols];

    for scene in collection {
        template.check_dimensions(scene.pixel_qa())?;
        let obs = observations(scene, &params.classifier)?;

        for ((row, col), ob) in obs.indexed_iter() {
            let i = row * cols + col;
            match ob {
                Observation::Fill | Observation::Masked => {}
                Observation::Unclassified => clear[i] += 1,
                Observation::Class(class) => {
                    clear[i] += 1;
                    match class {
                        WaterClass::NotWater => counts[i][0] += 1,
                        WaterClass::HighConfidence => counts[i][1] += 1,
                        WaterClass::ModerateConfidence => counts[i][2] += 1,
                        WaterClass::PartialSurfaceWater => counts[i][3] += 1,
                        // Never emitted as a clear-sky class
                        WaterClass::CloudShadow => {}
                    }
                }
            }
        }
    }

    let probability = |k: usize| -> Result<Raster<u8>> {
        let data: Vec<u8> = clear
            .iter()
            .zip(counts.iter())
            .map(|(&n, c)| {
                if n == 0 {
                    NO_OBSERVATION
                } else {
                    (100 * c[k] / n) as u8
                }
            })
            .collect();

        let mut raster = Raster::from_vec(data, rows, cols)?;
        raster.set_transform(*template.transform());
        raster.set_crs(template.crs().cloned());
        raster.set_nodata(Some(NO_OBSERVATION));
        Ok(raster)
    };

    let p_not_water = probability(0)?;
    let p_high_confidence = probability(1)?;
    let p_moderate_confidence = probability(2)?;
    let p_partial_surface = probability(3)?;

    let mut clear_observations = Raster::from_vec(clear, rows, cols)?;
    clear_observations.set_transform(*template.transform());
    clear_observations.set_crs(template.crs().cloned());

    Ok(DsweComposite {
        p_not_water,
        p_high_confidence,
        p_moderate_confidence,
        p_partial_surface,
        clear_observations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dswe_core::raster::GeoTransform;
    use dswe_core::scene::{Scene, Sensor, SpectralBand};

    fn uniform_scene(id: &str, day: u32, values: [f64; 6], qa: Option<Raster<u16>>) -> Scene {
        let transform = GeoTransform::new(300000.0, 4600000.0, 30.0, -30.0);
        let qa = qa.unwrap_or_else(|| {
            let mut q = Raster::filled(3, 3, 64u16);
            q.set_transform(transform);
            q
        });

        let mut scene = Scene::new(
            id,
            Sensor::Landsat5,
            Utc.with_ymd_and_hms(2005, 6, day, 15, 30, 0).unwrap(),
            qa,
        );
        for (band, value) in SpectralBand::ALL.into_iter().zip(values) {
            let mut raster = Raster::filled(3, 3, value);
            raster.set_transform(transform);
            scene.insert_band(band, raster).unwrap();
        }
        scene
    }

    const WATER: [f64; 6] = [400.0, 600.0, 400.0, 150.0, 80.0, 60.0];
    const LAND: [f64; 6] = [300.0, 500.0, 400.0, 3000.0, 1800.0, 1200.0];

    #[test]
    fn test_empty_collection() {
        let result = cdswe(&SceneCollection::new(), &CompositeParams::default());
        assert!(matches!(result, Err(Error::EmptyCollection)));
    }

    #[test]
    fn test_uniform_water_probability() {
        let collection = SceneCollection::from_scenes(vec![
            uniform_scene("a", 1, WATER, None),
            uniform_scene("b", 2, WATER, None),
        ]);

        let composite = cdswe(&collection, &CompositeParams::default()).unwrap();
        assert_eq!(composite.p_high_confidence.get(1, 1).unwrap(), 100);
        assert_eq!(composite.p_not_water.get(1, 1).unwrap(), 0);
        assert_eq!(composite.clear_observations.get(1, 1).unwrap(), 2);
    }

    #[test]
    fn test_mixed_observations() {
        // Two water scenes, one land scene: 66% high confidence, 33% not water
        let collection = SceneCollection::from_scenes(vec![
            uniform_scene("a", 1, WATER, None),
            uniform_scene("b", 2, WATER, None),
            uniform_scene("c", 3, LAND, None),
        ]);

        let composite = cdswe(&collection, &CompositeParams::default()).unwrap();
        assert_eq!(composite.p_high_confidence.get(0, 0).unwrap(), 66);
        assert_eq!(composite.p_not_water.get(0, 0).unwrap(), 33);
        assert_eq!(composite.clear_observations.get(0, 0).unwrap(), 3);
    }

    #[test]
    fn test_cloudy_scene_excluded_from_clear_count() {
        let transform = GeoTransform::new(300000.0, 4600000.0, 30.0, -30.0);
        let mut cloudy_qa = Raster::filled(3, 3, 64 | (1 << 5));
        cloudy_qa.set_transform(transform);

        let collection = SceneCollection::from_scenes(vec![
            uniform_scene("clear", 1, WATER, None),
            uniform_scene("cloudy", 2, WATER, Some(cloudy_qa)),
        ]);

        let composite = cdswe(&collection, &CompositeParams::default()).unwrap();
        // Only the clear scene counts, and it is all water
        assert_eq!(composite.clear_observations.get(1, 1).unwrap(), 1);
        assert_eq!(composite.p_high_confidence.get(1, 1).unwrap(), 100);
    }

    #[test]
    fn test_never_observed_pixel_is_nodata() {
        let transform = GeoTransform::new(300000.0, 4600000.0, 30.0, -30.0);
        let mut fill_qa = Raster::filled(3, 3, 0u16);
        fill_qa.set_transform(transform);

        let collection =
            SceneCollection::from_scenes(vec![uniform_scene("fill", 1, WATER, Some(fill_qa))]);

        let composite = cdswe(&collection, &CompositeParams::default()).unwrap();
        assert_eq!(
            composite.p_high_confidence.get(0, 0).unwrap(),
            NO_OBSERVATION
        );
        assert_eq!(composite.clear_observations.get(0, 0).unwrap(), 0);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let transform = GeoTransform::new(300000.0, 4600000.0, 30.0, -30.0);
        let mut big_qa = Raster::filled(4, 4, 64u16);
        big_qa.set_transform(transform);

        let mut big = Scene::new(
            "big",
            Sensor::Landsat5,
            Utc.with_ymd_and_hms(2005, 6, 4, 15, 30, 0).unwrap(),
            big_qa,
        );
        for band in SpectralBand::ALL {
            let mut raster = Raster::filled(4, 4, 100.0);
            raster.set_transform(transform);
            big.insert_band(band, raster).unwrap();
        }

        let collection =
            SceneCollection::from_scenes(vec![uniform_scene("small", 1, WATER, None), big]);

        let result = cdswe(&collection, &CompositeParams::default());
        assert!(matches!(result, Err(Error::SizeMismatch { .. })));
    }

    #[test]
    fn test_probabilities_carry_georeferencing() {
        let collection = SceneCollection::from_scenes(vec![uniform_scene("a", 1, WATER, None)]);
        let composite = cdswe(&collection, &CompositeParams::default()).unwrap();

        assert_eq!(composite.p_high_confidence.transform().origin_x, 300000.0);
        assert_eq!(composite.p_high_confidence.cell_size(), 30.0);
    }
}
