//! # DSWE Core
//!
//! Core types and I/O for the DSWE (Dynamic Surface Water Extent) library.
//!
//! This crate provides:
//! - `Raster<T>`: Generic single-band raster grid
//! - `GeoTransform`: Affine transformation for georeferencing
//! - `CRS`: Coordinate Reference System handling
//! - `Scene` / `SceneCollection`: Landsat surface-reflectance scene model
//! - Native GeoTIFF I/O
//!
//! The classification algorithms themselves live in `dswe-algorithms`.

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod scene;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement};
pub use scene::{Bounds, Scene, SceneCollection, Sensor, SpectralBand};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::scene::{Bounds, Scene, SceneCollection, Sensor, SpectralBand};
    pub use crate::Algorithm;
}

/// Core trait for algorithms operating on scenes and rasters.
///
/// Algorithms are pure functions that transform input data according to
/// parameters; re-running one on the same input yields the same output.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
