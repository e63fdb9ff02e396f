use log::trace;
use reqwest::{header, Url};
use thiserror::Error;

use self::project::ProjectClient;

pub mod models;
pub mod project;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_BASE_PATH: &str = "/";
pub const DEFAULT_SCHEMES: [&str; 1] = ["https"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API URL '{}'! Reason: {}", .0, .1)]
    InvalidUrl(String, String),
    #[error("Request failed! Reason: {}", .0)]
    Http(#[from] reqwest::Error),
}

/// Where and how the API is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub host: String,
    pub base_path: String,
    pub schemes: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            base_path: DEFAULT_BASE_PATH.to_owned(),
            schemes: DEFAULT_SCHEMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl TransportConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_schemes(mut self, schemes: Vec<String>) -> Self {
        self.schemes = schemes;
        self
    }

    /// https is preferred whenever it is allowed.
    pub fn scheme(&self) -> &str {
        if self.schemes.is_empty() || self.schemes.iter().any(|s| s == "https") {
            "https"
        } else {
            &self.schemes[0]
        }
    }

    pub fn base_url(&self) -> Result<Url, ApiError> {
        let base_path = self.base_path.trim_matches('/');
        let raw = if base_path.is_empty() {
            format!("{}://{}/", self.scheme(), self.host)
        } else {
            format!("{}://{}/{}/", self.scheme(), self.host, base_path)
        };

        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(raw, e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl Transport {
    /// Appends `segments` to the base URL, escaping each of them.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ApiError::InvalidUrl(self.base_url.to_string(), "cannot be a base".to_owned())
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    pub(crate) async fn get(&self, url: Url) -> Result<(u16, Vec<u8>), ApiError> {
        let mut request = self
            .http
            .get(url)
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        trace!("{}", String::from_utf8_lossy(&body));

        Ok((status, body.to_vec()))
    }
}

/// Aggregate client with one sub-client per resource group.
#[derive(Debug, Clone)]
pub struct KubermaticApi {
    pub project: ProjectClient,
}

impl KubermaticApi {
    pub fn new(config: &TransportConfig) -> Result<Self, ApiError> {
        Self::build(config, None)
    }

    /// Client authenticating every request with `token`.
    pub fn with_bearer_token(
        config: &TransportConfig,
        token: impl Into<String>,
    ) -> Result<Self, ApiError> {
        Self::build(config, Some(token.into()))
    }

    fn build(config: &TransportConfig, bearer_token: Option<String>) -> Result<Self, ApiError> {
        let transport = Transport {
            http: reqwest::Client::builder()
                .user_agent(concat!("kkp-api-client/", env!("CARGO_PKG_VERSION")))
                .build()?,
            base_url: config.base_url()?,
            bearer_token,
        };

        Ok(Self {
            project: ProjectClient::new(transport),
        })
    }
}
