//! DSWE v1 diagnostic tests and class assignment
//!
//! Jones (2015) defines five per-pixel diagnostic tests over the index
//! values; the combination of test outcomes selects one of the water
//! confidence classes. Thresholds are in scaled-DN space (reflectance
//! 0..10000, normalized-difference indices ×10000).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Thresholds for the five DSWE diagnostic tests.
///
/// Defaults are the published DSWE v1 values; they are parameters so
/// regional recalibrations can be explored without forking the tree.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    /// Wetness index threshold: test 1 passes when MNDWI exceeds this
    pub wigt: f64,
    /// Test 2 passes when MBSR exceeds this
    pub mbsr_min: f64,
    /// Test 3 passes when AWEsh exceeds this
    pub awesh_min: f64,
    /// Partial-surface-water MNDWI floor (tests 4 and 5)
    pub pswt: f64,
    /// SWIR1 ceiling for test 4
    pub swir1_max: f64,
    /// SWIR2 ceiling for test 5
    pub swir2_max: f64,
    /// NIR ceiling for tests 4 and 5
    pub nir_max: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            wigt: 123.0,
            mbsr_min: 0.0,
            awesh_min: 0.0,
            pswt: -5000.0,
            swir1_max: 1000.0,
            swir2_max: 1000.0,
            nir_max: 2000.0,
        }
    }
}

/// Outcome of the five diagnostic tests for one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelTests {
    /// Test 1: MNDWI above the wetness threshold
    pub mndwi_wet: bool,
    /// Test 2: visible reflectance dominates the infrared
    pub mbsr_positive: bool,
    /// Test 3: AWEsh positive
    pub awesh_positive: bool,
    /// Test 4: partial-surface-water signature against SWIR1
    pub partial_swir1: bool,
    /// Test 5: partial-surface-water signature against SWIR2
    pub partial_swir2: bool,
}

impl PixelTests {
    /// Evaluate the five tests for one pixel's index and band values.
    pub fn evaluate(
        t: &Thresholds,
        mndwi: f64,
        mbsr: f64,
        awesh: f64,
        nir: f64,
        swir1: f64,
        swir2: f64,
    ) -> Self {
        Self {
            mndwi_wet: mndwi > t.wigt,
            mbsr_positive: mbsr > t.mbsr_min,
            awesh_positive: awesh > t.awesh_min,
            partial_swir1: mndwi > t.pswt && swir1 < t.swir1_max && nir < t.nir_max,
            partial_swir2: mndwi > t.pswt && swir2 < t.swir2_max && nir < t.nir_max,
        }
    }
}

/// DSWE water confidence classes.
///
/// The numeric codes are those of the published product; `-1` (fill /
/// unclassified) is represented outside the enum as the raster nodata
/// value [`FILL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i8)]
pub enum WaterClass {
    /// Not water
    NotWater = 0,
    /// Water, high confidence
    HighConfidence = 1,
    /// Water, moderate confidence
    ModerateConfidence = 2,
    /// Potential wetland / partial surface water
    PartialSurfaceWater = 3,
    /// Observation obscured by cloud or cloud shadow
    CloudShadow = 9,
}

/// Fill / unclassified code used as raster nodata
pub const FILL: i8 = -1;

impl WaterClass {
    /// The raster code for this class
    pub fn code(self) -> i8 {
        self as i8
    }

    /// Parse a raster code back into a class
    pub fn from_code(code: i8) -> Option<WaterClass> {
        match code {
            0 => Some(WaterClass::NotWater),
            1 => Some(WaterClass::HighConfidence),
            2 => Some(WaterClass::ModerateConfidence),
            3 => Some(WaterClass::PartialSurfaceWater),
            9 => Some(WaterClass::CloudShadow),
            _ => None,
        }
    }
}

impl fmt::Display for WaterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaterClass::NotWater => "not water",
            WaterClass::HighConfidence => "water (high confidence)",
            WaterClass::ModerateConfidence => "water (moderate confidence)",
            WaterClass::PartialSurfaceWater => "partial surface water",
            WaterClass::CloudShadow => "cloud/shadow",
        };
        write!(f, "{}", name)
    }
}

/// Assign a water class from the five test outcomes.
///
/// The rule table enumerates every combination the DSWE v1 description
/// assigns a class; the arms are written as (test5, test4, test3,
/// test2, test1) so they read like the five-digit test codes in the
/// algorithm description. Three combinations are left without a class
/// upstream and map to `None` (fill).
pub fn classify_tests(t: &PixelTests) -> Option<WaterClass> {
    match (
        t.partial_swir2,
        t.partial_swir1,
        t.awesh_positive,
        t.mbsr_positive,
        t.mndwi_wet,
    ) {
        // 00000, 00001: at most the wetness test fires
        (false, false, false, false, _) => Some(WaterClass::NotWater),

        // 11001..11111, 01111, 10111
        (true, true, false, false, true)
        | (true, true, false, true, false)
        | (true, true, false, true, true)
        | (true, true, true, false, false)
        | (true, true, true, false, true)
        | (true, true, true, true, false)
        | (true, true, true, true, true)
        | (false, true, true, true, true)
        | (true, false, true, true, true) => Some(WaterClass::HighConfidence),

        // 00010..00110, 01001..01101, 10001, 10011..10110
        (false, false, false, true, false)
        | (false, false, false, true, true)
        | (false, false, true, false, false)
        | (false, false, true, false, true)
        | (false, false, true, true, false)
        | (false, true, false, false, true)
        | (false, true, false, true, false)
        | (false, true, false, true, true)
        | (false, true, true, false, false)
        | (false, true, true, false, true)
        | (true, false, false, false, true)
        | (true, false, false, true, true)
        | (true, false, true, false, false)
        | (true, false, true, false, true)
        | (true, false, true, true, false) => Some(WaterClass::ModerateConfidence),

        // 01000, 10000, 11000: only the partial-surface-water tests fire
        (false, true, false, false, false)
        | (true, false, false, false, false)
        | (true, true, false, false, false) => Some(WaterClass::PartialSurfaceWater),

        // 00111, 01110, 10010: no class in DSWE v1
        _ => None,
    }
}
