//! Detection adapter over the Cloud Vision object-localization API.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::ClientInner;
use crate::error::{Error, Result};
use crate::types::DetectedObject;

/// Upper bound on localized objects requested per image.
const MAX_RESULTS: u32 = 50;

#[derive(Clone)]
pub struct Detection {
    pub(crate) inner: Arc<ClientInner>,
}

impl Detection {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Localize objects in a room image.
    ///
    /// Issues exactly one `images:annotate` call, no retries. The returned
    /// sequence keeps the upstream order; label deduplication for display is
    /// the caller's concern.
    ///
    /// # Errors
    /// Returns [`Error::Api`] for a non-2xx response and
    /// [`Error::Detection`] when the service reports a per-image error.
    pub async fn detect_objects(&self, image: &[u8]) -> Result<Vec<DetectedObject>> {
        let url = self.inner.annotate_url();
        let body = json!({
            "requests": [{
                "image": {"content": STANDARD.encode(image)},
                "features": [{"type": "OBJECT_LOCALIZATION", "maxResults": MAX_RESULTS}],
            }],
        });

        debug!(url = %url, bytes = image.len(), "annotating room image");
        let request = self.inner.http.post(url).json(&body);
        let response = self.inner.send(request).await?;
        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let value = response.json::<Value>().await?;
        parse_annotate_response(value)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchAnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResponse {
    #[serde(default)]
    localized_object_annotations: Vec<DetectedObject>,
    error: Option<ServiceStatus>,
}

#[derive(Debug, Deserialize)]
struct ServiceStatus {
    #[serde(default)]
    message: String,
}

fn parse_annotate_response(value: Value) -> Result<Vec<DetectedObject>> {
    let batch: BatchAnnotateResponse = serde_json::from_value(value)?;
    let Some(first) = batch.responses.into_iter().next() else {
        return Err(Error::Detection {
            message: "annotate response contained no entries".into(),
        });
    };
    if let Some(status) = first.error {
        return Err(Error::Detection {
            message: status.message,
        });
    }
    Ok(first.localized_object_annotations)
}
