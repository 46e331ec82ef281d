//! Error types for hepstack core.

use thiserror::Error;

/// hepstack core error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// ROOT file could not be read
    #[error("ROOT error: {0}")]
    Root(#[from] hs_root::RootError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// Two histograms cannot be combined bin-by-bin
    #[error("Incompatible binning: {0}")]
    IncompatibleBinning(String),

    /// Requested binning is malformed (unsorted edges, bad rebin factor, ...)
    #[error("Invalid binning: {0}")]
    InvalidBinning(String),

    /// Input file does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Systematic directory missing from a file
    #[error("Directory '{dir}' not found in {file}")]
    DirectoryNotFound {
        /// Directory name
        dir: String,
        /// File path
        file: String,
    },

    /// Histogram missing from a directory
    #[error("Histogram '{hist}' not found in {file}:{dir}")]
    HistogramNotFound {
        /// Histogram name
        hist: String,
        /// Directory name
        dir: String,
        /// File path
        file: String,
    },

    /// Nothing could be loaded
    #[error("No histograms could be loaded: {0}")]
    EmptyInput(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
