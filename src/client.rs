//! Client configuration and transport layer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Client as HttpClient, Proxy};
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use google_cloud_auth::credentials::service_account::{
    AccessSpecifier, Builder as ServiceAccountAuthBuilder,
};
use google_cloud_auth::credentials::{
    Builder as AuthBuilder, CacheableResource, Credentials as GoogleCredentials,
};
use http::Extensions;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub(crate) const DEFAULT_STYLE_FETCH_TIMEOUT_SECS: u64 = 5;

/// Room-restyling client over Cloud Vision and Vertex AI Imagen.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub http: HttpClient,
    pub config: ClientConfig,
    pub endpoints: Endpoints,
    pub(crate) auth_provider: Option<AuthProvider>,
}

/// Immutable process-wide configuration, constructed once and shared by
/// every component. No ambient global state.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Google Cloud project ID.
    pub project: String,
    /// Vertex AI region, e.g. `us-central1`.
    pub location: String,
    /// Credential source.
    pub credentials: Credentials,
    /// HTTP configuration.
    pub http_options: HttpOptions,
    /// OAuth scopes requested for the credentials.
    pub auth_scopes: Vec<String>,
}

/// Credential source.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Explicit service account key file. The path must exist when the
    /// client is built; a missing key is a fatal startup condition.
    ServiceAccountKey(PathBuf),
    /// Application Default Credentials (ADC).
    ApplicationDefault,
}

/// HTTP configuration.
#[derive(Debug, Clone, Default)]
pub struct HttpOptions {
    /// Per-request timeout in seconds for detection and generation calls.
    pub timeout: Option<u64>,
    /// Timeout in seconds for fetching a style-reference URL.
    pub style_fetch_timeout: Option<u64>,
    pub proxy: Option<String>,
    pub headers: HashMap<String, String>,
    /// Override for the Cloud Vision endpoint (tests).
    pub vision_base_url: Option<String>,
    /// Override for the Vertex AI endpoint (tests).
    pub vertex_base_url: Option<String>,
}

impl Client {
    /// Create a client authenticated with a service account key file.
    ///
    /// # Errors
    /// Returns an error when the key file does not exist or the
    /// configuration is invalid.
    pub fn with_key_file(
        project: impl Into<String>,
        location: impl Into<String>,
        key_file: impl AsRef<Path>,
    ) -> Result<Self> {
        Self::builder()
            .project(project)
            .location(location)
            .credentials(Credentials::ServiceAccountKey(
                key_file.as_ref().to_path_buf(),
            ))
            .build()
    }

    /// Create a client using Application Default Credentials.
    ///
    /// # Errors
    /// Returns an error when the configuration is invalid.
    pub fn with_adc(project: impl Into<String>, location: impl Into<String>) -> Result<Self> {
        Self::builder()
            .project(project)
            .location(location)
            .credentials(Credentials::ApplicationDefault)
            .build()
    }

    /// Create a client from environment variables: `INSPACIO_PROJECT`,
    /// `INSPACIO_LOCATION`, `INSPACIO_CREDENTIALS` (key file path; ADC when
    /// unset), plus optional `INSPACIO_VISION_BASE_URL` and
    /// `INSPACIO_VERTEX_BASE_URL` overrides.
    ///
    /// # Errors
    /// Returns an error when required variables are missing or building the
    /// client fails.
    pub fn from_env() -> Result<Self> {
        let project = std::env::var("INSPACIO_PROJECT").map_err(|_| Error::InvalidConfig {
            message: "INSPACIO_PROJECT not found".into(),
        })?;
        let location = std::env::var("INSPACIO_LOCATION").map_err(|_| Error::InvalidConfig {
            message: "INSPACIO_LOCATION not found".into(),
        })?;
        let mut builder = Self::builder().project(project).location(location);
        if let Ok(key_file) = std::env::var("INSPACIO_CREDENTIALS") {
            if !key_file.trim().is_empty() {
                builder =
                    builder.credentials(Credentials::ServiceAccountKey(PathBuf::from(key_file)));
            }
        }
        if let Ok(base_url) = std::env::var("INSPACIO_VISION_BASE_URL") {
            if !base_url.trim().is_empty() {
                builder = builder.vision_base_url(base_url);
            }
        }
        if let Ok(base_url) = std::env::var("INSPACIO_VERTEX_BASE_URL") {
            if !base_url.trim().is_empty() {
                builder = builder.vertex_base_url(base_url);
            }
        }
        builder.build()
    }

    /// Create a Builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Access the object-detection adapter.
    #[must_use]
    pub fn detection(&self) -> crate::vision::Detection {
        crate::vision::Detection::new(self.inner.clone())
    }

    /// Access the image-generation adapter.
    #[must_use]
    pub fn generation(&self) -> crate::imagen::Generation {
        crate::imagen::Generation::new(self.inner.clone())
    }

    /// Access style-input resolution.
    #[must_use]
    pub fn styles(&self) -> crate::style::Styles {
        crate::style::Styles::new(self.inner.clone())
    }
}

/// Client Builder.
#[derive(Default)]
pub struct ClientBuilder {
    project: Option<String>,
    location: Option<String>,
    credentials: Option<Credentials>,
    http_options: HttpOptions,
    auth_scopes: Option<Vec<String>>,
}

impl ClientBuilder {
    /// Set the Google Cloud project ID.
    #[must_use]
    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Set the Vertex AI region.
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the credential source.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the per-request timeout (seconds) for service calls.
    #[must_use]
    pub const fn timeout(mut self, secs: u64) -> Self {
        self.http_options.timeout = Some(secs);
        self
    }

    /// Set the timeout (seconds) for style-reference URL fetches.
    #[must_use]
    pub const fn style_fetch_timeout(mut self, secs: u64) -> Self {
        self.http_options.style_fetch_timeout = Some(secs);
        self
    }

    /// Set a proxy.
    #[must_use]
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.http_options.proxy = Some(url.into());
        self
    }

    /// Add a default HTTP header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.http_options.headers.insert(key.into(), value.into());
        self
    }

    /// Override the Cloud Vision base URL.
    #[must_use]
    pub fn vision_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_options.vision_base_url = Some(base_url.into());
        self
    }

    /// Override the Vertex AI base URL.
    #[must_use]
    pub fn vertex_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.http_options.vertex_base_url = Some(base_url.into());
        self
    }

    /// Set the OAuth scopes.
    #[must_use]
    pub fn auth_scopes(mut self, scopes: Vec<String>) -> Self {
        self.auth_scopes = Some(scopes);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    /// Returns an error when the configuration is incomplete, the service
    /// account key file is missing, or building the HTTP client fails.
    pub fn build(self) -> Result<Client> {
        let Self {
            project,
            location,
            credentials,
            http_options,
            auth_scopes,
        } = self;

        let project = project.ok_or_else(|| Error::InvalidConfig {
            message: "Project is required".into(),
        })?;
        let location = location.ok_or_else(|| Error::InvalidConfig {
            message: "Location is required".into(),
        })?;
        let credentials = credentials.unwrap_or(Credentials::ApplicationDefault);
        Self::validate_credentials(&credentials)?;

        let headers = Self::build_headers(&http_options)?;
        let http = Self::build_http_client(&http_options, headers)?;

        let auth_scopes = auth_scopes.unwrap_or_else(default_auth_scopes);
        let config = ClientConfig {
            project,
            location,
            credentials: credentials.clone(),
            http_options,
            auth_scopes,
        };

        let auth_provider = Some(AuthProvider::new(credentials));
        let endpoints = Endpoints::new(&config);

        Ok(Client {
            inner: Arc::new(ClientInner {
                http,
                config,
                endpoints,
                auth_provider,
            }),
        })
    }

    fn validate_credentials(credentials: &Credentials) -> Result<()> {
        if let Credentials::ServiceAccountKey(path) = credentials {
            if !path.exists() {
                return Err(Error::Auth {
                    message: format!("Service account key not found at: {}", path.display()),
                });
            }
        }
        Ok(())
    }

    fn build_headers(http_options: &HttpOptions) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &http_options.headers {
            let name =
                HeaderName::from_bytes(key.as_bytes()).map_err(|_| Error::InvalidConfig {
                    message: format!("Invalid header name: {key}"),
                })?;
            let value = HeaderValue::from_str(value).map_err(|_| Error::InvalidConfig {
                message: format!("Invalid header value for {key}"),
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }

    fn build_http_client(http_options: &HttpOptions, headers: HeaderMap) -> Result<HttpClient> {
        let mut http_builder = HttpClient::builder().timeout(Duration::from_secs(
            http_options.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
        ));

        if let Some(proxy_url) = &http_options.proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| Error::InvalidConfig {
                message: format!("Invalid proxy: {e}"),
            })?;
            http_builder = http_builder.proxy(proxy);
        }

        if !headers.is_empty() {
            http_builder = http_builder.default_headers(headers);
        }

        Ok(http_builder.build()?)
    }
}

pub(crate) struct AuthProvider {
    credentials: Credentials,
    cell: OnceCell<Arc<GoogleCredentials>>,
}

impl AuthProvider {
    fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            cell: OnceCell::new(),
        }
    }

    async fn headers(&self, scopes: &[&str]) -> Result<HeaderMap> {
        let credentials = self
            .cell
            .get_or_try_init(|| async { build_google_credentials(&self.credentials, scopes) })
            .await?;
        let headers = credentials
            .headers(Extensions::new())
            .await
            .map_err(|err| Error::Auth {
                message: format!("Credential header fetch failed: {err}"),
            })?;
        match headers {
            CacheableResource::New { data, .. } => Ok(data),
            CacheableResource::NotModified => Err(Error::Auth {
                message: "Credential header fetch returned NotModified without cached headers"
                    .into(),
            }),
        }
    }
}

fn build_google_credentials(
    credentials: &Credentials,
    scopes: &[&str],
) -> Result<Arc<GoogleCredentials>> {
    match credentials {
        Credentials::ServiceAccountKey(path) => {
            let data = std::fs::read(path).map_err(|err| Error::Auth {
                message: format!("Failed to read service account key {}: {err}", path.display()),
            })?;
            let json: serde_json::Value =
                serde_json::from_slice(&data).map_err(|err| Error::Auth {
                    message: format!("Invalid service account key JSON: {err}"),
                })?;
            ServiceAccountAuthBuilder::new(json)
                .with_access_specifier(AccessSpecifier::from_scopes(scopes.iter().copied()))
                .build()
                .map(Arc::new)
                .map_err(|err| Error::Auth {
                    message: format!("Service account credential init failed: {err}"),
                })
        }
        Credentials::ApplicationDefault => AuthBuilder::default()
            .with_scopes(scopes.iter().copied())
            .build()
            .map(Arc::new)
            .map_err(|err| Error::Auth {
                message: format!("ADC init failed: {err}"),
            }),
    }
}

impl ClientInner {
    /// Send a request with the auth headers injected.
    ///
    /// # Errors
    /// Returns an error when building the request, fetching auth headers, or
    /// the network call fails.
    pub async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let mut request = request.build()?;
        if let Some(headers) = self.auth_headers().await? {
            for (name, value) in &headers {
                if request.headers().contains_key(name) {
                    continue;
                }
                let mut value = value.clone();
                if name == AUTHORIZATION {
                    value.set_sensitive(true);
                }
                request.headers_mut().insert(name.clone(), value);
            }
        }
        Ok(self.http.execute(request).await?)
    }

    async fn auth_headers(&self) -> Result<Option<HeaderMap>> {
        let Some(provider) = &self.auth_provider else {
            return Ok(None);
        };

        let scopes: Vec<&str> = self.config.auth_scopes.iter().map(String::as_str).collect();
        let headers = provider.headers(&scopes).await?;
        Ok(Some(headers))
    }

    pub(crate) fn annotate_url(&self) -> String {
        format!("{}v1/images:annotate", self.endpoints.vision_base_url)
    }

    pub(crate) fn predict_url(&self, model: &str) -> String {
        format!(
            "{}v1/projects/{}/locations/{}/publishers/google/models/{model}:predict",
            self.endpoints.vertex_base_url, self.config.project, self.config.location
        )
    }

    pub(crate) fn style_fetch_timeout(&self) -> Duration {
        Duration::from_secs(
            self.config
                .http_options
                .style_fetch_timeout
                .unwrap_or(DEFAULT_STYLE_FETCH_TIMEOUT_SECS),
        )
    }
}

fn default_auth_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/cloud-platform".into()]
}

pub(crate) struct Endpoints {
    pub vision_base_url: String,
    pub vertex_base_url: String,
}

impl Endpoints {
    /// Resolve the service base URLs from the configuration.
    pub fn new(config: &ClientConfig) -> Self {
        let vision_base_url = config.http_options.vision_base_url.as_deref().map_or_else(
            || "https://vision.googleapis.com/".to_string(),
            normalize_base_url,
        );
        let vertex_base_url = config.http_options.vertex_base_url.as_deref().map_or_else(
            || {
                format!(
                    "https://{}-aiplatform.googleapis.com/",
                    config.location
                )
            },
            normalize_base_url,
        );
        Self {
            vision_base_url,
            vertex_base_url,
        }
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let mut value = base_url.trim().to_string();
    if !value.ends_with('/') {
        value.push('/');
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::with_env;
    use tempfile::tempdir;

    #[test]
    fn test_client_with_adc() {
        let client = Client::with_adc("my-project", "us-central1").unwrap();
        assert_eq!(client.inner.config.project, "my-project");
        assert_eq!(
            client.inner.endpoints.vertex_base_url,
            "https://us-central1-aiplatform.googleapis.com/"
        );
        assert_eq!(
            client.inner.endpoints.vision_base_url,
            "https://vision.googleapis.com/"
        );
    }

    #[test]
    fn test_missing_key_file_is_fatal() {
        let dir = tempdir().unwrap();
        let key_path = dir.path().join("missing_key.json");
        let err = Client::with_key_file("proj", "loc", &key_path).err().unwrap();
        assert!(matches!(err, Error::Auth { .. }));
    }

    #[test]
    fn test_existing_key_file_builds() {
        let dir = tempdir().unwrap();
        let key_path = dir.path().join("key.json");
        std::fs::write(&key_path, "{}").unwrap();
        let client = Client::with_key_file("proj", "loc", &key_path).unwrap();
        assert!(matches!(
            client.inner.config.credentials,
            Credentials::ServiceAccountKey(_)
        ));
    }

    #[test]
    fn test_project_and_location_required() {
        assert!(Client::builder().location("loc").build().is_err());
        assert!(Client::builder().project("proj").build().is_err());
    }

    #[test]
    fn test_base_url_normalization() {
        let client = Client::builder()
            .project("proj")
            .location("loc")
            .vision_base_url("https://example.com")
            .vertex_base_url("https://vertex.example.com/")
            .build()
            .unwrap();
        assert_eq!(client.inner.endpoints.vision_base_url, "https://example.com/");
        assert_eq!(
            client.inner.endpoints.vertex_base_url,
            "https://vertex.example.com/"
        );
    }

    #[test]
    fn test_predict_url_shape() {
        let client = Client::with_adc("proj", "loc").unwrap();
        assert_eq!(
            client.inner.predict_url("imagegeneration@006"),
            "https://loc-aiplatform.googleapis.com/v1/projects/proj/locations/loc/publishers/google/models/imagegeneration@006:predict"
        );
    }

    #[test]
    fn test_from_env_reads_overrides() {
        with_env(
            &[
                ("INSPACIO_PROJECT", Some("env-proj")),
                ("INSPACIO_LOCATION", Some("env-loc")),
                ("INSPACIO_CREDENTIALS", None),
                ("INSPACIO_VISION_BASE_URL", Some("https://env.example.com")),
                ("INSPACIO_VERTEX_BASE_URL", None),
            ],
            || {
                let client = Client::from_env().unwrap();
                assert_eq!(client.inner.config.project, "env-proj");
                assert_eq!(
                    client.inner.endpoints.vision_base_url,
                    "https://env.example.com/"
                );
                assert_eq!(
                    client.inner.endpoints.vertex_base_url,
                    "https://env-loc-aiplatform.googleapis.com/"
                );
            },
        );
    }

    #[test]
    fn test_from_env_missing_project_errors() {
        with_env(
            &[
                ("INSPACIO_PROJECT", None),
                ("INSPACIO_LOCATION", Some("loc")),
            ],
            || {
                assert!(Client::from_env().is_err());
            },
        );
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let result = Client::builder()
            .project("proj")
            .location("loc")
            .header("bad header", "value")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let result = Client::builder()
            .project("proj")
            .location("loc")
            .proxy("not a url")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_auth_scopes_override_default() {
        let client = Client::builder()
            .project("proj")
            .location("loc")
            .auth_scopes(vec!["scope-1".to_string()])
            .build()
            .unwrap();
        assert_eq!(client.inner.config.auth_scopes, vec!["scope-1".to_string()]);
    }

    #[test]
    fn test_style_fetch_timeout_default() {
        let client = Client::with_adc("proj", "loc").unwrap();
        assert_eq!(
            client.inner.style_fetch_timeout(),
            Duration::from_secs(DEFAULT_STYLE_FETCH_TIMEOUT_SECS)
        );
    }
}
