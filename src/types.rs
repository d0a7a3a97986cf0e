//! Shared data model for the detection and generation boundaries.

use serde::{Deserialize, Serialize};

/// Serde adapters for base64-encoded byte fields on the wire.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match bytes {
                Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|encoded| STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom))
                .transpose()
        }
    }
}

/// A 2D point with coordinates in [0,1], relative to image width/height.
///
/// The Vision API omits coordinates that are exactly zero, hence the
/// `default` on both fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct NormalizedVertex {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

impl NormalizedVertex {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Ordered vertex sequence outlining a detected object's extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoundingPoly {
    #[serde(default)]
    pub normalized_vertices: Vec<NormalizedVertex>,
}

/// A single object localized in the uploaded room image.
///
/// Produced once per image by the detection adapter; recomputed only when a
/// new image is set on the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetectedObject {
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
    #[serde(default)]
    pub bounding_poly: BoundingPoly,
}

/// The region of the source image that generation may repaint.
///
/// Whole-scene editing is an explicit variant rather than an empty vertex
/// list: an empty list rasterizes to an all-zero mask, which would silently
/// edit nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum EditRegion {
    /// The full canvas is editable (full-frame polygon).
    WholeScene,
    /// Only the interior of the given polygon is editable.
    Object(Vec<NormalizedVertex>),
}

/// What the user picked to restyle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Restyle the whole room.
    WholeRoom,
    /// Restyle the detected object with this label.
    Object(String),
}

/// How the desired style is described. The three modes are mutually
/// exclusive; reference pixels are advisory only and the accompanying
/// description is what reaches the generation prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleInput {
    /// Free-text style description.
    Text(String),
    /// Uploaded reference image plus a textual description of it.
    Reference {
        image: Vec<u8>,
        description: String,
    },
    /// URL of a reference image plus a textual description of it.
    Link { url: String, description: String },
}

/// Fixed parameter set for a single mask-edit call.
#[derive(Debug, Clone, PartialEq)]
pub struct EditImageParams {
    pub model: String,
    pub number_of_images: i32,
    /// Tuned high to bias toward strict prompt adherence: edits repaint
    /// photographed geometry, so creative latitude is suppressed.
    pub guidance_scale: f32,
}

impl Default for EditImageParams {
    fn default() -> Self {
        Self {
            model: "imagegeneration@006".to_string(),
            number_of_images: 1,
            guidance_scale: 35.0,
        }
    }
}

/// One user-triggered restyling run.
#[derive(Debug, Clone, PartialEq)]
pub struct RestyleRequest {
    pub selection: Selection,
    pub style: StyleInput,
    /// Also generate the two canned style suggestions.
    pub with_suggestions: bool,
}

/// Result slot for one canned style suggestion. A failed slot carries its
/// message and never invalidates the primary result or the sibling slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionSlot {
    pub label: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes::option"
    )]
    pub image: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuggestionSlot {
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.image.is_some()
    }
}

/// Everything a completed run hands to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestyleOutcome {
    /// The composed primary prompt, verbatim as sent.
    pub prompt: String,
    /// PNG bytes of the primary edited image.
    #[serde(with = "base64_bytes")]
    pub primary: Vec<u8>,
    #[serde(default)]
    pub suggestions: Vec<SuggestionSlot>,
}
