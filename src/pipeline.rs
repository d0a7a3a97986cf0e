//! Pipeline orchestration for a single restyling run.
//!
//! Sequencing: style resolution, region resolution, mask construction,
//! primary generation, then the two canned suggestions. Mask construction
//! always precedes any generation call and the primary always precedes the
//! suggestions; the suggestions share only read-only inputs and run
//! concurrently as independent result slots.

use futures_util::future::join;
use tracing::warn;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::mask;
use crate::types::{
    DetectedObject, EditImageParams, EditRegion, RestyleOutcome, RestyleRequest, Selection,
    StyleInput, SuggestionSlot,
};

/// Prompt target used when the whole scene is selected.
pub const WHOLE_ROOM_TARGET: &str = "room/wall";

/// Display label for the whole-room entry in a selection list.
pub const WHOLE_ROOM_OPTION: &str = "Wall (Restyle Whole Room)";

/// The two canned style suggestions generated alongside the primary result.
pub const SUGGESTED_STYLES: [&str; 2] = ["sleek marble texture", "vintage burnt orange velvet"];

/// Compose the primary edit prompt. The instructional framing is
/// load-bearing: it keeps the edit localized to appearance, not shape.
#[must_use]
pub fn compose_prompt(target: &str, style: &str) -> String {
    format!(
        "Replace the {target} with a photorealistic {target} styled as '{style}'. \
         ONLY MODIFY COLOR AND TEXTURE. KEEP ORIGINAL GEOMETRY, LIGHTING, AND BACKGROUND."
    )
}

/// Compose the prompt for one canned style suggestion.
#[must_use]
pub fn suggestion_prompt(target: &str, style: &str) -> String {
    format!(
        "Replace the {target} with a photorealistic {target} that has a '{style}'. \
         Preserve original shape."
    )
}

/// Labels offered for selection: sorted, deduplicated object names with the
/// whole-room entry first. A raw "Wall" detection folds into that entry.
#[must_use]
pub fn display_names(objects: &[DetectedObject]) -> Vec<String> {
    let mut names: Vec<String> = objects
        .iter()
        .map(|object| object.name.clone())
        .filter(|name| name != "Wall")
        .collect();
    names.sort();
    names.dedup();
    names.insert(0, WHOLE_ROOM_OPTION.to_string());
    names
}

/// Session-scoped state: the current room image and its cached detections.
/// Single writer; invalidated explicitly when a new image arrives.
#[derive(Default)]
struct Session {
    image: Option<Vec<u8>>,
    detections: Option<Vec<DetectedObject>>,
    warning: Option<String>,
}

/// Orchestrates detection, mask construction, and generation for one user
/// session.
pub struct Pipeline {
    client: Client,
    session: Session,
}

impl Pipeline {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            session: Session::default(),
        }
    }

    /// Set the current room image, invalidating cached detections.
    pub fn set_image(&mut self, image: Vec<u8>) {
        self.session = Session {
            image: Some(image),
            detections: None,
            warning: None,
        };
    }

    /// Warning produced by a degraded detection run, if any.
    #[must_use]
    pub fn detection_warning(&self) -> Option<&str> {
        self.session.warning.as_deref()
    }

    /// Cached detections for the current image (empty until [`analyze`] has
    /// run).
    ///
    /// [`analyze`]: Pipeline::analyze
    #[must_use]
    pub fn detected_objects(&self) -> &[DetectedObject] {
        self.session.detections.as_deref().unwrap_or(&[])
    }

    /// Detect objects in the current image, caching the result.
    ///
    /// Detection failure degrades instead of aborting: the cache becomes an
    /// empty list, a user-visible warning is recorded, and only whole-room
    /// restyling remains available.
    ///
    /// # Errors
    /// Returns an error only when no image has been set.
    pub async fn analyze(&mut self) -> Result<&[DetectedObject]> {
        let image = self.session.image.as_deref().ok_or_else(|| Error::InvalidConfig {
            message: "no room image set".into(),
        })?;

        if self.session.detections.is_none() {
            match self.client.detection().detect_objects(image).await {
                Ok(objects) => {
                    self.session.detections = Some(objects);
                    self.session.warning = None;
                }
                Err(err) => {
                    warn!(error = %err, "object detection failed; whole-room-only mode");
                    self.session.warning = Some(format!(
                        "Object detection failed: {err}. Only whole-room restyling is available."
                    ));
                    self.session.detections = Some(Vec::new());
                }
            }
        }

        Ok(self.detected_objects())
    }

    /// Run one restyling pipeline: resolve style and region, build the
    /// mask, generate the primary result, then the canned suggestions.
    ///
    /// The primary generation aborts the run on failure; each suggestion is
    /// an independent failure domain whose outcome lands in its own slot.
    ///
    /// # Errors
    /// Returns the first failure of any stage up to and including the
    /// primary generation.
    pub async fn restyle(&self, request: &RestyleRequest) -> Result<RestyleOutcome> {
        let image = self.session.image.as_deref().ok_or_else(|| Error::InvalidConfig {
            message: "no room image set".into(),
        })?;

        // Style resolution runs first: a bad style input must halt the run
        // before any mask work or generation traffic.
        let style = self.client.styles().resolve(&request.style).await?;
        let (target, region) = self.resolve_region(&request.selection)?;
        let mask = mask::build_mask(image, &region)?;

        let params = EditImageParams::default();
        let generation = self.client.generation();
        let prompt = compose_prompt(&target, &style);
        let primary = generation.edit_image(image, &mask, &prompt, &params).await?;

        let mut suggestions = Vec::new();
        if request.with_suggestions {
            let first_prompt = suggestion_prompt(&target, SUGGESTED_STYLES[0]);
            let second_prompt = suggestion_prompt(&target, SUGGESTED_STYLES[1]);
            let first = generation.edit_image(image, &mask, &first_prompt, &params);
            let second = generation.edit_image(image, &mask, &second_prompt, &params);
            let (first, second) = join(first, second).await;
            suggestions.push(into_slot(SUGGESTED_STYLES[0], first));
            suggestions.push(into_slot(SUGGESTED_STYLES[1], second));
        }

        Ok(RestyleOutcome {
            prompt,
            primary,
            suggestions,
        })
    }

    fn resolve_region(&self, selection: &Selection) -> Result<(String, EditRegion)> {
        match selection {
            Selection::WholeRoom => {
                Ok((WHOLE_ROOM_TARGET.to_string(), EditRegion::WholeScene))
            }
            Selection::Object(name) => {
                let found = self
                    .detected_objects()
                    .iter()
                    .find(|object| object.name == *name)
                    .ok_or_else(|| Error::Selection {
                        message: format!("'{name}' is not among the detected objects"),
                    })?;
                Ok((
                    name.clone(),
                    EditRegion::Object(found.bounding_poly.normalized_vertices.clone()),
                ))
            }
        }
    }
}

fn into_slot(label: &str, result: Result<Vec<u8>>) -> SuggestionSlot {
    match result {
        Ok(image) => SuggestionSlot {
            label: label.to_string(),
            image: Some(image),
            error: None,
        },
        Err(err) => {
            warn!(label = %label, error = %err, "style suggestion failed");
            SuggestionSlot {
                label: label.to_string(),
                image: None,
                error: Some(err.to_string()),
            }
        }
    }
}

impl RestyleRequest {
    /// Convenience constructor for a text-described style.
    #[must_use]
    pub fn with_text_style(selection: Selection, style: impl Into<String>) -> Self {
        Self {
            selection,
            style: StyleInput::Text(style.into()),
            with_suggestions: true,
        }
    }
}
