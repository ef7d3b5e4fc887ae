//! Error types for the sky map tools.
//!
//! Library code returns these structured errors; the binaries wrap them in
//! `anyhow` with extra context before reporting.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for all skymap_tools operations.
#[derive(Error, Debug)]
pub enum SkymapError {
    /// Map file loading or decoding errors
    #[error("Map error: {0}")]
    Map(#[from] MapError),

    /// Projection and colour scaling errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Directory scanning and list writing errors
    #[error("List error: {0}")]
    List(#[from] ListError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SkymapError {
    /// Short message for display in the viewer status line
    pub fn user_message(&self) -> String {
        match self {
            SkymapError::Map(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// HEALPix map reading, writing and validation errors
#[derive(Error, Debug)]
pub enum MapError {
    #[error("Failed to open map file '{path}': {source}")]
    OpenFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write map file '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Not a FITS file: {reason}")]
    NotFits { reason: String },

    #[error("Missing header keyword '{keyword}'")]
    MissingKeyword { keyword: String },

    #[error("Invalid value for header keyword '{keyword}': '{value}'")]
    InvalidKeyword { keyword: String, value: String },

    #[error("No binary table extension found")]
    NoBinaryTable,

    #[error("Unsupported column format '{tform}' (expected E, D, J, I, K or B)")]
    UnsupportedFormat { tform: String },

    #[error("Truncated data: needed {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    #[error("Partial-sky (explicit index) maps are not supported")]
    PartialSky,

    #[error("Invalid nside {nside} for {ordering} ordering")]
    InvalidNside { nside: u64, ordering: &'static str },

    #[error("Pixel count {npix} does not match any valid nside")]
    InvalidPixelCount { npix: u64 },

    #[error("Map has {actual} pixels but nside {nside} requires {expected}")]
    SizeMismatch {
        nside: u32,
        expected: u64,
        actual: u64,
    },
}

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Logarithmic scale needs a positive minimum, got {min}")]
    NonPositiveLogMin { min: f64 },

    #[error("Invalid image width {width} (must be 16-16384)")]
    InvalidWidth { width: u32 },

    #[error("Invalid graticule spacing {spacing_deg} degrees (must be in (0, 180])")]
    InvalidGraticule { spacing_deg: f64 },

    #[error("Failed to save image to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        source: image::ImageError,
    },
}

/// List builder errors
#[derive(Error, Debug)]
pub enum ListError {
    #[error("Input directory '{path}' does not exist")]
    InputMissing { path: PathBuf },

    #[error("Input path '{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Failed to read directory '{path}': {source}")]
    ReadDirFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write list '{path}': {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid extension filter '{extension}'")]
    InvalidExtension { extension: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config format in '{path}': {source}")]
    InvalidFormat {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Failed to save config to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config serialization failed: {source}")]
    SerializationFailed { source: toml::ser::Error },
}

/// Result type alias for skymap_tools operations
pub type Result<T, E = SkymapError> = std::result::Result<T, E>;

impl MapError {
    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            MapError::OpenFailed { path, .. } => {
                format!("Could not open map file '{}'", path.display())
            }
            MapError::WriteFailed { path, .. } => {
                format!("Could not write map file '{}'", path.display())
            }
            MapError::PartialSky => "Partial-sky maps cannot be displayed".to_string(),
            MapError::UnsupportedFormat { tform } => {
                format!("Map column type '{}' is not supported", tform)
            }
            MapError::InvalidNside { .. }
            | MapError::InvalidPixelCount { .. }
            | MapError::SizeMismatch { .. } => "Map has an inconsistent pixel count".to_string(),
            MapError::NotFits { .. }
            | MapError::MissingKeyword { .. }
            | MapError::InvalidKeyword { .. }
            | MapError::NoBinaryTable
            | MapError::Truncated { .. } => "File is not a valid HEALPix map".to_string(),
        }
    }
}

impl ListError {
    /// Get suggested recovery action
    pub fn recovery_hint(&self) -> Option<&str> {
        match self {
            ListError::InputMissing { .. } | ListError::NotADirectory { .. } => {
                Some("Check the --input path points to an existing directory")
            }
            ListError::WriteFailed { .. } => {
                Some("Check the --output location exists and is writable")
            }
            ListError::InvalidExtension { .. } => Some("Use an extension such as '.root'"),
            ListError::ReadDirFailed { .. } => None,
        }
    }
}
