//! # DSWE Algorithms
//!
//! Dynamic Surface Water Extent (DSWE v1, Jones 2015) classification
//! for Landsat 5/7 surface-reflectance imagery.
//!
//! ## Pipeline
//!
//! - **indices**: MNDWI, MBSR, NDVI and AWEsh index grids
//! - **decision**: the five diagnostic tests and the class rule table
//! - **classify**: per-scene classification ([`dswe`])
//! - **composite**: temporal class probabilities over a collection
//!   ([`cdswe`])
//!
//! ```ignore
//! use dswe_algorithms::prelude::*;
//!
//! let classes = dswe(&scene, &DsweParams::default())?;
//! let composite = cdswe(
//!     &collection.filter_bounds(&bounds).sort_by_time(),
//!     &CompositeParams::default(),
//! )?;
//! ```

pub mod classify;
pub mod composite;
pub mod decision;
pub mod indices;

mod maybe_rayon;

pub use classify::{dswe, Dswe, DsweParams};
pub use composite::{cdswe, CompositeParams, DsweComposite, NO_OBSERVATION};
pub use decision::{classify_tests, PixelTests, Thresholds, WaterClass, FILL};
pub use indices::{
    awesh, compute_indices, mbsr, mndwi, ndvi, normalized_difference, AweshCoefficients,
    DsweIndices,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classify::{dswe, Dswe, DsweParams};
    pub use crate::composite::{cdswe, CompositeParams, DsweComposite};
    pub use crate::decision::{Thresholds, WaterClass, FILL};
    pub use crate::indices::{compute_indices, AweshCoefficients, DsweIndices};
    pub use dswe_core::prelude::*;
}
