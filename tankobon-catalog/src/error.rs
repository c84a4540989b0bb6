//! Error types for catalog API operations.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Common error type for catalog API operations.
///
/// Distinguishes the cases a view cares about: transport failures,
/// error responses from the service, and responses that could not be
/// interpreted at all.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    /// The request never completed (DNS, connect, TLS, timeout).
    #[error("request failed")]
    Network(#[source] reqwest::Error),
    /// A non-success response with a recognizable error body.
    #[error("{status}: {detail}")]
    ErrorResponse { status: StatusCode, detail: String },
    /// A non-success response without a recognizable error body.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(StatusCode),
    /// A success response whose body did not match the expected shape.
    #[error("failed to parse response")]
    InvalidResponse(#[source] reqwest::Error),
    /// The configured base URL and request path do not combine into a
    /// valid URL.
    #[error("invalid request url")]
    InvalidUrl(#[source] url::ParseError),
    #[error("{0}")]
    Other(String),
}

/// Errors from the session endpoints (login, registration, token refresh).
#[derive(Debug, Error)]
pub enum AuthError {
    /// The service rejected the request. The message comes from the
    /// response body: `error`, `hydra:description`, or the joined
    /// constraint violations.
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Client(#[from] CatalogClientError),
}

/// Error bodies the service produces. Collection and item endpoints
/// report `detail` or `hydra:description`, the login endpoint a plain
/// `error`, and registration a list of constraint `violations`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default, rename = "hydra:description")]
    hydra_description: Option<String>,
    #[serde(default)]
    violations: Vec<RawViolation>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawViolation {
    #[serde(default)]
    message: String,
}

impl RawErrorBody {
    pub(crate) fn message(&self) -> Option<String> {
        if !self.violations.is_empty() {
            let joined = self
                .violations
                .iter()
                .map(|violation| violation.message.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Some(joined);
        }
        self.detail
            .clone()
            .or_else(|| self.error.clone())
            .or_else(|| self.hydra_description.clone())
    }
}

/// Reduce a non-success response to a [CatalogClientError], consuming it.
pub(crate) async fn error_for_response(response: reqwest::Response) -> CatalogClientError {
    let status = response.status();
    match response.json::<RawErrorBody>().await {
        Ok(body) => match body.message() {
            Some(detail) => CatalogClientError::ErrorResponse { status, detail },
            None => CatalogClientError::UnexpectedResponse(status),
        },
        // The body may be an HTML error page from a proxy; don't try to
        // surface it.
        Err(_) => CatalogClientError::UnexpectedResponse(status),
    }
}
