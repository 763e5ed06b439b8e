/*
[INPUT]:  Azure credentials and management/Graph base URLs
[OUTPUT]: Authenticated management-plane and Graph requests
[POS]:    Azure layer - core client implementation
[UPDATE]: When adding resource endpoints or changing request plumbing
*/

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::azure::token::{AzureCredentials, TokenProvider, TokenScope};
use crate::http::{RctabError, Result};

const LOGIN_BASE_URL: &str = "https://login.microsoftonline.com";
const MANAGEMENT_BASE_URL: &str = "https://management.azure.com";
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com";

/// Client for the narrow slice of the Azure management plane and Microsoft
/// Graph that the collection jobs need.
#[derive(Debug, Clone)]
pub struct AzureClient {
    http_client: Client,
    management_base: Url,
    graph_base: Url,
    tokens: TokenProvider,
}

impl AzureClient {
    /// Create a client against the public Azure endpoints
    pub fn new(credentials: AzureCredentials) -> Result<Self> {
        Self::with_base_urls(
            credentials,
            LOGIN_BASE_URL,
            MANAGEMENT_BASE_URL,
            GRAPH_BASE_URL,
        )
    }

    /// Create a client with explicit endpoints (used by tests)
    pub fn with_base_urls(
        credentials: AzureCredentials,
        login_base: &str,
        management_base: &str,
        graph_base: &str,
    ) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let login_base = Url::parse(&ensure_trailing_slash(login_base))?;

        Ok(Self {
            tokens: TokenProvider::new(credentials, login_base, http_client.clone()),
            http_client,
            management_base: Url::parse(management_base)?,
            graph_base: Url::parse(graph_base)?,
        })
    }

    /// Full URL for a management-plane path (which may be a whole ARM
    /// resource id, starting with '/')
    pub(crate) fn management_url(&self, path: &str) -> String {
        format!(
            "{}{}",
            self.management_base.as_str().trim_end_matches('/'),
            path
        )
    }

    pub(crate) fn graph_url(&self, path: &str) -> String {
        format!("{}{}", self.graph_base.as_str().trim_end_matches('/'), path)
    }

    /// GET an absolute management-plane URL (first page or nextLink)
    pub(crate) async fn get_management<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.tokens.bearer(TokenScope::Management).await?;
        let mut request = self.http_client.get(url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request.send().await?;
        decode_azure_response(response).await
    }

    /// POST a JSON body to an absolute management-plane URL
    pub(crate) async fn post_management<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<T> {
        let token = self.tokens.bearer(TokenScope::Management).await?;
        let response = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .query(query)
            .json(body)
            .send()
            .await?;
        decode_azure_response(response).await
    }

    /// POST with no body and no interesting response payload
    pub(crate) async fn post_management_empty(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<()> {
        let token = self.tokens.bearer(TokenScope::Management).await?;
        let response = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .query(query)
            .header("content-length", "0")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(azure_error(status, &text))
    }

    /// GET an absolute Graph URL
    pub(crate) async fn get_graph<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let token = self.tokens.bearer(TokenScope::Graph).await?;
        let response = self.http_client.get(url).bearer_auth(token).send().await?;
        decode_azure_response(response).await
    }

    /// POST a JSON body to a Graph path
    pub(crate) async fn post_graph<T: DeserializeOwned>(&self, url: &str, body: &Value) -> Result<T> {
        let token = self.tokens.bearer(TokenScope::Graph).await?;
        let response = self
            .http_client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;
        decode_azure_response(response).await
    }
}

async fn decode_azure_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(azure_error(status, &text));
    }
    let parsed = response.json::<T>().await?;
    Ok(parsed)
}

/// Build an Azure error, extracting the nested error message when the body
/// is the standard `{"error": {"code": ..., "message": ...}}` envelope.
pub(crate) fn azure_error(status: StatusCode, body: &str) -> RctabError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string());
    RctabError::azure_error(status, message)
}

fn ensure_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
