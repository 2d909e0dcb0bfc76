//! Error types for the DSWE library

use thiserror::Error;

/// Main error type for DSWE operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({expected_rows}, {expected_cols}), got ({actual_rows}, {actual_cols})")]
    SizeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Scene is missing band {band} (sensor {sensor})")]
    MissingBand { band: String, sensor: String },

    #[error("Unsupported sensor: {0} (DSWE v1 is defined for Landsat 5 and 7)")]
    UnsupportedSensor(String),

    #[error("Scene collection is empty")]
    EmptyCollection,

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for DSWE operations
pub type Result<T> = std::result::Result<T, Error>;
