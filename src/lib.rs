//! Room-restyling client over Google Cloud Vision and Vertex AI Imagen.
//!
//! Upload a room photo, pick a detected object (or the whole room),
//! describe a style, and receive the masked region regenerated in that
//! style plus two canned suggestions. The crate covers the object-detection
//! and image-edit boundaries, mask construction from normalized polygon
//! vertices, and pipeline orchestration; rendering and session UI belong to
//! the caller.

pub mod client;
pub mod error;
pub mod imagen;
pub mod mask;
pub mod pipeline;
pub mod style;
pub mod types;
pub mod vision;

#[cfg(test)]
mod test_support;

pub use client::{Client, ClientBuilder, Credentials, HttpOptions};
pub use error::{Error, Result};
pub use pipeline::Pipeline;
pub use types::{
    DetectedObject, EditRegion, RestyleOutcome, RestyleRequest, Selection, StyleInput,
};
