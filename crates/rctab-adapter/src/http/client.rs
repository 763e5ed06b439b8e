/*
[INPUT]:  HTTP configuration (base URL, timeouts, signing key)
[OUTPUT]: Configured reqwest client ready for accounting API calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::auth::ApiAuth;
use crate::http::{RctabError, Result};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for uploads; generous because usage batches can be large
    pub post_timeout: Duration,
    /// Timeout for desired-state queries
    pub query_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            post_timeout: Duration::from_secs(60),
            query_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Main HTTP client for the RCTab accounting API
#[derive(Debug)]
pub struct RctabClient {
    http_client: Client,
    base_url: Url,
    auth: ApiAuth,
    config: ClientConfig,
}

impl RctabClient {
    /// Create a new client with default configuration
    pub fn new(base_url: &str, auth: ApiAuth) -> Result<Self> {
        Self::with_config(base_url, auth, ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(base_url: &str, auth: ApiAuth, config: ClientConfig) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url)?,
            auth,
            config,
        })
    }

    /// The signer used for outgoing requests
    pub fn auth(&self) -> &ApiAuth {
        &self.auth
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build a bearer-authenticated request builder for an API route
    pub(crate) fn api_request(&self, method: Method, route: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(route)?;
        let builder = self
            .http_client
            .request(method, url)
            .header("authorization", self.auth.bearer_value()?);
        Ok(builder)
    }

    /// Send a request and decode a JSON response body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RctabError::api_error(status, text));
        }
        let parsed = response.json::<T>().await?;
        Ok(parsed)
    }
}

/// Ensure the base URL ends with a slash so `Url::join` appends routes
/// instead of replacing the last path segment.
fn normalize_base_url(base_url: &str) -> Result<Url> {
    if base_url.ends_with('/') {
        Ok(Url::parse(base_url)?)
    } else {
        Ok(Url::parse(&format!("{base_url}/"))?)
    }
}
