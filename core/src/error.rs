//! Error types for the todo API client.
//!
//! # Design
//! Every failure of an API call surfaces as one `ApiError`. Transport problems
//! (`Network`, `Timeout`) are kept apart from server answers (`HttpStatus`) and
//! from bodies we could not understand (`Decode`). `AuthExpired` is the one
//! variant a caller must react to by asking the user to sign in again: the
//! server rejected the access token and the single refresh attempt did not
//! recover the session.

/// Errors returned by `ApiClient` operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server could not be reached (DNS, connect, TLS, reset).
    #[error("network error: {0}")]
    Network(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server answered with a non-2xx status after any retry.
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Decode(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The server returned 401 and the session could not be refreshed.
    #[error("authentication expired")]
    AuthExpired { body: String },
}

impl ApiError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            ApiError::AuthExpired { .. } => Some(401),
            _ => None,
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ApiError::AuthExpired { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display_includes_code_and_body() {
        let err = ApiError::HttpStatus {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn auth_expired_reports_401() {
        let err = ApiError::AuthExpired { body: String::new() };
        assert!(err.is_auth_expired());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn transport_errors_carry_no_status() {
        assert_eq!(ApiError::Timeout.status(), None);
        assert_eq!(ApiError::Network("refused".to_string()).status(), None);
    }
}
