//! Error definitions for the crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP client error: {source}")]
    HttpClient {
        #[from]
        source: reqwest::Error,
    },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Auth error: {message}")]
    Auth { message: String },

    #[error("Object detection failed: {message}")]
    Detection { message: String },

    #[error("Image generation failed: {message}")]
    Generation { message: String },

    #[error("Mask construction failed: {message}")]
    MaskConstruction { message: String },

    #[error("Selection is no longer valid: {message}")]
    Selection { message: String },

    #[error("Style input invalid: {message}")]
    StyleInput { message: String },

    #[error("Style reference invalid: {message}")]
    InvalidReference { message: String },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
