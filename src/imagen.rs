//! Generation adapter over the Vertex AI Imagen mask-edit API.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::client::ClientInner;
use crate::error::{Error, Result};
use crate::types::EditImageParams;

#[derive(Clone)]
pub struct Generation {
    pub(crate) inner: Arc<ClientInner>,
}

impl Generation {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Repaint the masked region of `source` according to `prompt`.
    ///
    /// One `:predict` call per invocation; no batching, no retry, no partial
    /// results. Repeated calls with identical inputs may yield different
    /// pixels; nothing here asserts reproducibility.
    ///
    /// # Errors
    /// Returns [`Error::Api`] for a non-2xx response and
    /// [`Error::Generation`] when the service returns no usable image.
    pub async fn edit_image(
        &self,
        source: &[u8],
        mask: &[u8],
        prompt: &str,
        params: &EditImageParams,
    ) -> Result<Vec<u8>> {
        let body = build_edit_body(source, mask, prompt, params);
        let url = self.inner.predict_url(&params.model);

        debug!(model = %params.model, prompt = %prompt, "requesting masked edit");
        let request = self.inner.http.post(url).json(&body);
        let response = self.inner.send(request).await?;
        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let value = response.json::<Value>().await?;
        parse_edit_response(&value)
    }
}

fn build_edit_body(source: &[u8], mask: &[u8], prompt: &str, params: &EditImageParams) -> Value {
    let mut image = Map::new();
    image.insert(
        "bytesBase64Encoded".to_string(),
        Value::String(STANDARD.encode(source)),
    );

    let mut mask_image = Map::new();
    mask_image.insert(
        "bytesBase64Encoded".to_string(),
        Value::String(STANDARD.encode(mask)),
    );
    let mut mask_object = Map::new();
    mask_object.insert("image".to_string(), Value::Object(mask_image));

    let mut instance = Map::new();
    instance.insert("prompt".to_string(), Value::String(prompt.to_string()));
    instance.insert("image".to_string(), Value::Object(image));
    instance.insert("mask".to_string(), Value::Object(mask_object));

    let mut parameters = Map::new();
    parameters.insert(
        "sampleCount".to_string(),
        Value::Number(Number::from(params.number_of_images)),
    );
    parameters.insert(
        "guidanceScale".to_string(),
        Value::Number(
            Number::from_f64(f64::from(params.guidance_scale)).unwrap_or_else(|| Number::from(0)),
        ),
    );

    let mut root = Map::new();
    root.insert(
        "instances".to_string(),
        Value::Array(vec![Value::Object(instance)]),
    );
    root.insert("parameters".to_string(), Value::Object(parameters));
    Value::Object(root)
}

fn parse_edit_response(value: &Value) -> Result<Vec<u8>> {
    let predictions = value
        .get("predictions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let Some(prediction) = predictions.first() else {
        return Err(Error::Generation {
            message: "service returned no image".into(),
        });
    };

    if let Some(encoded) = prediction
        .get("bytesBase64Encoded")
        .and_then(Value::as_str)
    {
        return STANDARD
            .decode(encoded)
            .map_err(|err| Error::Generation {
                message: format!("malformed image payload: {err}"),
            });
    }

    if let Some(reason) = prediction.get("raiFilteredReason").and_then(Value::as_str) {
        return Err(Error::Generation {
            message: format!("generation was filtered: {reason}"),
        });
    }

    Err(Error::Generation {
        message: "prediction carried no image bytes".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_inner_with_base;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PREDICT_PATH: &str =
        "/v1/projects/proj/locations/loc/publishers/google/models/imagegeneration@006:predict";

    #[test]
    fn test_edit_body_shape() {
        let params = EditImageParams::default();
        let body = build_edit_body(&[1, 2, 3], &[4, 5], "make it blue", &params);
        assert_eq!(body["instances"][0]["prompt"], "make it blue");
        assert_eq!(body["instances"][0]["image"]["bytesBase64Encoded"], "AQID");
        assert_eq!(
            body["instances"][0]["mask"]["image"]["bytesBase64Encoded"],
            "BAU="
        );
        assert_eq!(body["parameters"]["sampleCount"], 1);
        assert_eq!(body["parameters"]["guidanceScale"], 35.0);
    }

    #[tokio::test]
    async fn test_edit_image_decodes_first_prediction() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .and(body_partial_json(json!({
                "parameters": {"sampleCount": 1, "guidanceScale": 35.0}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{"bytesBase64Encoded": "AQID", "mimeType": "image/png"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let generation =
            Generation::new(Arc::new(test_inner_with_base(&server.uri(), &server.uri())));
        let image = generation
            .edit_image(b"src", b"mask", "prompt", &EditImageParams::default())
            .await
            .unwrap();
        assert_eq!(image, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_zero_predictions_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"predictions": []})))
            .mount(&server)
            .await;

        let generation =
            Generation::new(Arc::new(test_inner_with_base(&server.uri(), &server.uri())));
        let err = generation
            .edit_image(b"src", b"mask", "prompt", &EditImageParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation { .. }));
    }

    #[tokio::test]
    async fn test_filtered_prediction_is_generation_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{"raiFilteredReason": "safety"}]
            })))
            .mount(&server)
            .await;

        let generation =
            Generation::new(Arc::new(test_inner_with_base(&server.uri(), &server.uri())));
        let err = generation
            .edit_image(b"src", b"mask", "prompt", &EditImageParams::default())
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Generation { message } if message.contains("safety"))
        );
    }

    #[tokio::test]
    async fn test_quota_status_maps_to_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(PREDICT_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let generation =
            Generation::new(Arc::new(test_inner_with_base(&server.uri(), &server.uri())));
        let err = generation
            .edit_image(b"src", b"mask", "prompt", &EditImageParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 429, .. }));
    }
}
