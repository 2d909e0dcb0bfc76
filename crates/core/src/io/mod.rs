//! I/O for rasters and Landsat scenes

mod landsat;
mod native;

pub use landsat::{read_scene, SceneFiles};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
};
