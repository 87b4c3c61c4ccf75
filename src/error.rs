//! Error Taxonomy
//!
//! Configuration errors stop the run before anything touches disk.
//! Render and write errors abort the batch at the failing identifier.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The level of error correction you specified is invalid!")]
    InvalidErrorCorrection(String),

    #[error("The image quality you selected has to be between 0.1 and 1!")]
    QualityOutOfRange(f64),

    #[error("The resolution has to be a positive number of pixels!")]
    InvalidResolution,

    #[error("The colour {0:?} is not a valid hex colour!")]
    InvalidColor(String),

    #[error("You are missing the required input csv!")]
    MissingInput,

    #[error("It does not look like you gave me a valid file!")]
    InputNotFound(PathBuf),

    #[error("You are missing the required output directory!")]
    MissingOutput,

    #[error("It does not look like you gave me a valid directory!")]
    OutputNotFound(PathBuf),

    #[error("It does not look like you gave me a valid logo to use!")]
    LogoNotFound(Option<PathBuf>),

    #[error("It does not look like a valid file!")]
    LayerNotFound(PathBuf),

    #[error("You are missing the required URL!")]
    MissingUrl,

    #[error("Could not load config file {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Payload {payload:?} does not fit in a QR code: {source}")]
    Encode {
        payload: String,
        #[source]
        source: qrcode::types::QrError,
    },

    #[error("Resolution {resolution}px is too small for a {modules}-module QR code")]
    ResolutionTooSmall { resolution: u32, modules: u32 },

    #[error("Could not read image {path}: {source}")]
    ReadOverlay {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not decode image {path}: {source}")]
    DecodeOverlay {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Could not encode image for {identifier:?}: {source}")]
    EncodeImage {
        identifier: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Error)]
#[error("Could not write {path}: {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    pub fn new(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not build archive entry {filename}: {source}")]
    Entry {
        filename: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Could not finish archive: {0}")]
    Finish(#[source] zip::result::ZipError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Could not read identifier list {path}: {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Could not serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}
