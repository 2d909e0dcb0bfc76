//! Spectral indices feeding the DSWE decision tests
//!
//! All indices operate on surface-reflectance bands in scaled-DN space
//! (nominal 0..10000) and keep that scale: the normalized-difference
//! indices are multiplied by 10000, so the published DSWE thresholds
//! apply directly. Nodata in any input produces NaN in the output.

use crate::maybe_rayon::*;
use dswe_core::raster::Raster;
use dswe_core::scene::{Scene, SpectralBand};
use dswe_core::Result;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Scale factor applied to normalized-difference indices
const ND_SCALE: f64 = 10000.0;

/// Coefficients for the AWEsh index (Feyisa et al., 2014, as fixed by
/// DSWE v1)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AweshCoefficients {
    /// Green weight (default 2.5)
    pub green: f64,
    /// NIR+SWIR1 weight (default 1.5)
    pub nir_swir1: f64,
    /// SWIR2 weight (default 0.25)
    pub swir2: f64,
}

impl Default for AweshCoefficients {
    fn default() -> Self {
        Self {
            green: 2.5,
            nir_swir1: 1.5,
            swir2: 0.25,
        }
    }
}

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in [-1, 1]. Pixels where the denominator vanishes or either
/// input is nodata are NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    band_a.check_dimensions(band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue;
                }

                row_data[col] = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

// ---------------------------------------------------------------------------
// MNDWI
// ---------------------------------------------------------------------------

/// Modified Normalized Difference Water Index (Xu, 2006), scaled by 10000.
///
/// `MNDWI = (Green - SWIR1) / (Green + SWIR1) * 10000`
pub fn mndwi(green: &Raster<f64>, swir1: &Raster<f64>) -> Result<Raster<f64>> {
    scale_nd(normalized_difference(green, swir1)?)
}

// ---------------------------------------------------------------------------
// NDVI
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index, scaled by 10000.
///
/// `NDVI = (NIR - Red) / (NIR + Red) * 10000`
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    scale_nd(normalized_difference(nir, red)?)
}

// ---------------------------------------------------------------------------
// MBSR
// ---------------------------------------------------------------------------

/// Multi-band Spectral Relationship for visible vs infrared.
///
/// `MBSR = (Green + Red) - (NIR + SWIR1)`
///
/// Water reflects more in the visible than the infrared, so positive
/// values indicate water.
pub fn mbsr(
    green: &Raster<f64>,
    red: &Raster<f64>,
    nir: &Raster<f64>,
    swir1: &Raster<f64>,
) -> Result<Raster<f64>> {
    green.check_dimensions(red)?;
    green.check_dimensions(nir)?;
    green.check_dimensions(swir1)?;

    let (rows, cols) = green.shape();
    let nd_g = green.nodata();
    let nd_r = red.nodata();
    let nd_n = nir.nodata();
    let nd_s = swir1.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let g = unsafe { green.get_unchecked(row, col) };
                let r = unsafe { red.get_unchecked(row, col) };
                let n = unsafe { nir.get_unchecked(row, col) };
                let s = unsafe { swir1.get_unchecked(row, col) };

                if is_nodata_f64(g, nd_g)
                    || is_nodata_f64(r, nd_r)
                    || is_nodata_f64(n, nd_n)
                    || is_nodata_f64(s, nd_s)
                {
                    continue;
                }

                row_data[col] = (g + r) - (n + s);
            }
            row_data
        })
        .collect();

    build_output(green, rows, cols, data)
}

// ---------------------------------------------------------------------------
// AWEsh
// ---------------------------------------------------------------------------

/// Automated Water Extent Shadow index.
///
/// `AWEsh = Blue + A*Green - B*(NIR + SWIR1) - C*SWIR2`
///
/// with the DSWE v1 coefficients A=2.5, B=1.5, C=0.25. Designed to
/// suppress shadow pixels that plain water indices misclassify.
pub fn awesh(
    blue: &Raster<f64>,
    green: &Raster<f64>,
    nir: &Raster<f64>,
    swir1: &Raster<f64>,
    swir2: &Raster<f64>,
    coeffs: AweshCoefficients,
) -> Result<Raster<f64>> {
    blue.check_dimensions(green)?;
    blue.check_dimensions(nir)?;
    blue.check_dimensions(swir1)?;
    blue.check_dimensions(swir2)?;

    let (rows, cols) = blue.shape();
    let nd_b = blue.nodata();
    let nd_g = green.nodata();
    let nd_n = nir.nodata();
    let nd_s1 = swir1.nodata();
    let nd_s2 = swir2.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let b = unsafe { blue.get_unchecked(row, col) };
                let g = unsafe { green.get_unchecked(row, col) };
                let n = unsafe { nir.get_unchecked(row, col) };
                let s1 = unsafe { swir1.get_unchecked(row, col) };
                let s2 = unsafe { swir2.get_unchecked(row, col) };

                if is_nodata_f64(b, nd_b)
                    || is_nodata_f64(g, nd_g)
                    || is_nodata_f64(n, nd_n)
                    || is_nodata_f64(s1, nd_s1)
                    || is_nodata_f64(s2, nd_s2)
                {
                    continue;
                }

                row_data[col] =
                    b + coeffs.green * g - coeffs.nir_swir1 * (n + s1) - coeffs.swir2 * s2;
            }
            row_data
        })
        .collect();

    build_output(blue, rows, cols, data)
}

// ---------------------------------------------------------------------------
// Scene-level bundle
// ---------------------------------------------------------------------------

/// The index grids the DSWE decision tests consume, plus NDVI for
/// downstream inspection.
#[derive(Debug, Clone)]
pub struct DsweIndices {
    pub mndwi: Raster<f64>,
    pub mbsr: Raster<f64>,
    pub ndvi: Raster<f64>,
    pub awesh: Raster<f64>,
}

/// Compute all DSWE indices for a scene.
///
/// Fails with `Error::MissingBand` if the scene lacks any of the six
/// reflectance bands.
pub fn compute_indices(scene: &Scene, coeffs: AweshCoefficients) -> Result<DsweIndices> {
    let blue = scene.band(SpectralBand::Blue)?;
    let green = scene.band(SpectralBand::Green)?;
    let red = scene.band(SpectralBand::Red)?;
    let nir = scene.band(SpectralBand::Nir)?;
    let swir1 = scene.band(SpectralBand::Swir1)?;
    let swir2 = scene.band(SpectralBand::Swir2)?;

    Ok(DsweIndices {
        mndwi: mndwi(green, swir1)?,
        mbsr: mbsr(green, red, nir, swir1)?,
        ndvi: ndvi(nir, red)?,
        awesh: awesh(blue, green, nir, swir1, swir2, coeffs)?,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

fn scale_nd(mut raster: Raster<f64>) -> Result<Raster<f64>> {
    raster.data_mut().mapv_inplace(|v| v * ND_SCALE);
    Ok(raster)
}

fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| dswe_core::Error::Other(e.to_string()))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
