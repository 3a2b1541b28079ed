//! Errors returned by the backend API client.

use reqwest::StatusCode;
use thiserror::Error;
use vitrine_core::ValidationError;

/// Errors that can occur when talking to the storefront backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection-level failure (DNS, refused, reset...).
    #[error("HTTP error: {0}")]
    Network(reqwest::Error),

    /// The backend answered 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend answered with a 5xx status.
    #[error("Server error {status}: {body}")]
    Server { status: StatusCode, body: String },

    /// Any other non-success status.
    #[error("Unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The request was rejected locally and never sent.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A path could not be joined onto the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }
}

impl ApiError {
    /// Classify a non-success response.
    #[must_use]
    pub fn from_status(status: StatusCode, path: &str, body: &str) -> Self {
        let body: String = body.chars().take(200).collect();
        if status == StatusCode::NOT_FOUND {
            Self::NotFound(path.to_string())
        } else if status.is_server_error() {
            Self::Server { status, body }
        } else {
            Self::Status { status, body }
        }
    }

    /// Whether retrying the same request could succeed.
    ///
    /// Not-found and local validation failures are final.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::NotFound(_) | Self::Validation(_) | Self::Url(_)
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Message suitable for showing to a shopper.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Timeout => "Timeout na requisição".to_string(),
            Self::NotFound(_) => "Recurso não encontrado".to_string(),
            Self::Server { .. } => "Erro interno do servidor".to_string(),
            Self::Validation(err) => err.to_string(),
            Self::Network(_) | Self::Status { .. } | Self::Decode(_) | Self::Url(_) => {
                "Ocorreu um erro inesperado.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "/orders/x", "");
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
        assert_eq!(err.to_string(), "Not found: /orders/x");

        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "/orders", "boom");
        assert!(matches!(err, ApiError::Server { .. }));
        assert!(err.is_retryable());

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "/orders", "bad");
        assert!(matches!(err, ApiError::Status { .. }));
    }

    #[test]
    fn test_body_is_truncated() {
        let body = "x".repeat(1000);
        let ApiError::Server { body, .. } =
            ApiError::from_status(StatusCode::BAD_GATEWAY, "/", &body)
        else {
            panic!("expected server error");
        };
        assert_eq!(body.len(), 200);
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(ApiError::Timeout.user_message(), "Timeout na requisição");
        assert_eq!(
            ApiError::NotFound("/orders/x".into()).user_message(),
            "Recurso não encontrado"
        );
        assert_eq!(
            ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "/", "").user_message(),
            "Erro interno do servidor"
        );
        assert_eq!(
            ApiError::Validation(ValidationError::NoItems).user_message(),
            "Pelo menos um item é obrigatório"
        );
    }

    #[test]
    fn test_validation_is_not_retryable() {
        assert!(!ApiError::Validation(ValidationError::InvalidCustomerId).is_retryable());
        assert!(ApiError::Timeout.is_retryable());
    }
}
