/*
[INPUT]:  Error sources (HTTP, API, Azure, token, serialization)
[OUTPUT]: Structured error types with context and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the RCTab adapter
#[derive(Error, Debug)]
pub enum RctabError {
    /// HTTP request failed at the transport level
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The accounting API returned an error response
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// An Azure management-plane or Graph call returned an error response
    #[error("Azure error (status {status}): {message}")]
    Azure { status: u16, message: String },

    /// The identity endpoint refused to issue a token
    #[error("Token acquisition failed: {message}")]
    TokenAcquisition { message: String },

    /// An upload was abandoned after exhausting its attempts
    #[error("Could not POST {what} data after {attempts} attempts")]
    Upload { what: &'static str, attempts: u32 },

    /// The cost management query returned more than one page of results
    #[error("Cost management query returned multiple pages of results")]
    CostPagingUnsupported,

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Access-token signing failed
    #[error("Token signing error: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RctabError {
    /// Check if the error is worth retrying after a pause.
    ///
    /// Azure-side and transport failures are transient; accounting API
    /// rejections and exhausted uploads are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RctabError::Http(_)
                | RctabError::Azure { .. }
                | RctabError::TokenAcquisition { .. }
                | RctabError::InvalidResponse(_)
        )
    }

    /// Check if the error indicates an authentication failure
    pub fn is_auth_error(&self) -> bool {
        match self {
            RctabError::TokenAcquisition { .. } | RctabError::TokenSigning(_) => true,
            RctabError::Api { status, .. } | RctabError::Azure { status, .. } => {
                *status == 401 || *status == 403
            }
            _ => false,
        }
    }

    /// Create an accounting API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        RctabError::Api {
            status: status.as_u16(),
            message: message.into(),
        }
    }

    /// Create an Azure error from status code and message
    pub fn azure_error(status: StatusCode, message: impl Into<String>) -> Self {
        RctabError::Azure {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, RctabError>;
