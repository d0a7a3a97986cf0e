//! Style-input resolution.
//!
//! Three mutually exclusive input modes feed the prompt's style text. A
//! reference image (uploaded or fetched from a URL) is validated as a
//! decodable image but its pixels are advisory only: no visual style
//! transfer is performed, the accompanying description is what reaches the
//! generation prompt.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::client::ClientInner;
use crate::error::{Error, Result};
use crate::types::StyleInput;

#[derive(Clone)]
pub struct Styles {
    pub(crate) inner: Arc<ClientInner>,
}

impl Styles {
    pub(crate) fn new(inner: Arc<ClientInner>) -> Self {
        Self { inner }
    }

    /// Resolve a style input to the text used downstream.
    ///
    /// Link fetches carry their own short timeout, independent of the
    /// client-wide request timeout.
    ///
    /// # Errors
    /// Returns [`Error::StyleInput`] when the resolved description is empty
    /// and [`Error::InvalidReference`] when a reference image cannot be
    /// fetched or decoded.
    pub async fn resolve(&self, input: &StyleInput) -> Result<String> {
        match input {
            StyleInput::Text(text) => non_empty(text),
            StyleInput::Reference { image, description } => {
                image::load_from_memory(image).map_err(|err| Error::InvalidReference {
                    message: format!("uploaded style image could not be decoded: {err}"),
                })?;
                non_empty(description)
            }
            StyleInput::Link { url, description } => {
                self.fetch_reference(url).await?;
                non_empty(description)
            }
        }
    }

    async fn fetch_reference(&self, url: &str) -> Result<()> {
        let url = Url::parse(url).map_err(|err| Error::InvalidReference {
            message: format!("invalid style URL: {err}"),
        })?;

        debug!(url = %url, "fetching style reference");
        let response = self
            .inner
            .http
            .get(url)
            .timeout(self.inner.style_fetch_timeout())
            .send()
            .await
            .map_err(|err| Error::InvalidReference {
                message: format!("style URL could not be fetched: {err}"),
            })?;
        if !response.status().is_success() {
            return Err(Error::InvalidReference {
                message: format!("style URL returned status {}", response.status().as_u16()),
            });
        }

        let body = response.bytes().await.map_err(|err| Error::InvalidReference {
            message: format!("style URL body could not be read: {err}"),
        })?;
        image::load_from_memory(&body).map_err(|err| Error::InvalidReference {
            message: format!("style URL did not resolve to a decodable image: {err}"),
        })?;
        Ok(())
    }
}

fn non_empty(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::StyleInput {
            message: "a style description is required".into(),
        });
    }
    Ok(trimmed.to_string())
}
