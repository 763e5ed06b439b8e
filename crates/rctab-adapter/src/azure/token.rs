/*
[INPUT]:  Service principal credentials (tenant, client id, client secret)
[OUTPUT]: Cached OAuth2 access tokens for the ARM and Graph resources
[POS]:    Azure layer - token lifecycle management
[UPDATE]: When adding scopes or changing caching strategy
*/

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;
use uuid::Uuid;

use crate::http::{RctabError, Result};

/// Tokens are refreshed this long before their reported expiry.
const REFRESH_MARGIN_SECONDS: i64 = 60;

/// Azure AD application credentials.
///
/// Same environment contract as the SDKs' EnvironmentCredential:
/// AZURE_TENANT_ID, AZURE_CLIENT_ID, AZURE_CLIENT_SECRET.
#[derive(Debug, Clone)]
pub struct AzureCredentials {
    pub tenant_id: Uuid,
    pub client_id: String,
    pub client_secret: String,
}

/// Resources the adapter requests tokens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TokenScope {
    Management,
    Graph,
}

impl TokenScope {
    fn scope_value(self) -> &'static str {
        match self {
            TokenScope::Management => "https://management.azure.com/.default",
            TokenScope::Graph => "https://graph.microsoft.com/.default",
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Utc::now() + Duration::seconds(REFRESH_MARGIN_SECONDS) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Acquires tokens via the client-credentials grant and caches them per
/// scope until shortly before expiry.
#[derive(Debug, Clone)]
pub(crate) struct TokenProvider {
    credentials: AzureCredentials,
    login_base: Url,
    http_client: Client,
    cache: Arc<RwLock<HashMap<TokenScope, CachedToken>>>,
}

impl TokenProvider {
    pub(crate) fn new(credentials: AzureCredentials, login_base: Url, http_client: Client) -> Self {
        Self {
            credentials,
            login_base,
            http_client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get a bearer token for the scope, from cache when still fresh.
    pub(crate) async fn bearer(&self, scope: TokenScope) -> Result<String> {
        {
            let cache = self.cache.read().unwrap();
            if let Some(cached) = cache.get(&scope) {
                if cached.is_fresh() {
                    return Ok(cached.token.clone());
                }
            }
        }

        let fetched = self.fetch_token(scope).await?;
        let token = fetched.token.clone();

        let mut cache = self.cache.write().unwrap();
        cache.insert(scope, fetched);
        Ok(token)
    }

    async fn fetch_token(&self, scope: TokenScope) -> Result<CachedToken> {
        let url = self
            .login_base
            .join(&format!("{}/oauth2/v2.0/token", self.credentials.tenant_id))?;

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", scope.scope_value()),
        ];

        let response = self.http_client.post(url).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RctabError::TokenAcquisition {
                message: format!("status {status}: {text}"),
            });
        }

        let parsed: TokenResponse = response.json().await?;
        Ok(CachedToken {
            token: parsed.access_token,
            expires_at: Utc::now() + Duration::seconds(parsed.expires_in),
        })
    }
}
