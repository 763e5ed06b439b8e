/*
[INPUT]:  RSA private key (PEM) and an application subject name
[OUTPUT]: Short-lived RS256 bearer tokens for the accounting API
[POS]:    Auth layer - token minting for outgoing requests
[UPDATE]: When claim contents or token lifetime change
*/

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::http::{RctabError, Result};

/// Five minutes, to allow for POSTing a lot of data or a slow web server.
pub const ACCESS_TOKEN_EXPIRE_MINUTES: i64 = 5;

/// Claims carried by every access token
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub exp: i64,
}

/// Signs bearer tokens with a pre-shared RSA key.
///
/// The accounting API holds the matching public key and identifies the
/// caller by the `sub` claim.
#[derive(Clone)]
pub struct ApiAuth {
    encoding_key: EncodingKey,
    subject: String,
}

impl ApiAuth {
    /// Create a signer from a PEM-encoded RSA private key.
    ///
    /// Accepts PKCS#1 ("BEGIN RSA PRIVATE KEY") and PKCS#8
    /// ("BEGIN PRIVATE KEY") encodings. Keys in OpenSSH format must be
    /// converted first (`ssh-keygen -p -m pem`).
    pub fn new(private_key_pem: &str, subject: impl Into<String>) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| RctabError::Config(format!("invalid RSA private key: {e}")))?;
        Ok(Self {
            encoding_key,
            subject: subject.into(),
        })
    }

    /// The `sub` claim attached to minted tokens
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Create an access token expiring `ACCESS_TOKEN_EXPIRE_MINUTES` from now.
    pub fn create_access_token(&self) -> Result<String> {
        let expire = Utc::now() + Duration::minutes(ACCESS_TOKEN_EXPIRE_MINUTES);
        let claims = TokenClaims {
            sub: self.subject.clone(),
            exp: expire.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Value for the Authorization header of an outgoing request.
    ///
    /// A fresh token is minted per call so long-running jobs never send a
    /// stale one.
    pub fn bearer_value(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.create_access_token()?))
    }
}

impl std::fmt::Debug for ApiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiAuth")
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}
