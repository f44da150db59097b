//! Client error types and HTTP response classification.

use thiserror::Error;

pub use trainhub_core::error::{ApiError, ValidationError};

/// Failures of session bookkeeping around the API.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The backend call itself failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The token file could not be read or written.
    #[error("token store {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The token file exists but is not valid JSON.
    #[error("corrupt token store {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Map a reqwest transport error.
pub(crate) fn transport_error(e: reqwest::Error, timeout_secs: u64) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout(timeout_secs)
    } else if e.is_decode() {
        ApiError::Decode(e.to_string())
    } else {
        ApiError::Network(e.to_string())
    }
}

/// Pull a readable message out of an error body.
///
/// FastAPI answers `{"detail": "..."}`, or for request validation a list of
/// `{"loc": [...], "msg": "..."}` objects. Anything else is returned raw.
pub(crate) fn error_detail(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    match value.get("detail") {
        Some(serde_json::Value::String(detail)) => detail.clone(),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
            .collect::<Vec<_>>()
            .join("; "),
        _ => value
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string()),
    }
}

/// Classify a non-success status.
pub(crate) fn status_error(status: u16, body: &str) -> ApiError {
    let message = error_detail(body);
    match status {
        401 => ApiError::Unauthorized(message),
        403 => ApiError::PermissionDenied(message),
        404 => ApiError::NotFound(message),
        _ => ApiError::Api { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fastapi_detail_string() {
        assert_eq!(error_detail(r#"{"detail":"Program not found"}"#), "Program not found");
    }

    #[test]
    fn fastapi_validation_list() {
        let body = r#"{"detail":[{"loc":["body","title"],"msg":"field required"},{"loc":["body","order"],"msg":"value is not a valid integer"}]}"#;
        assert_eq!(
            error_detail(body),
            "field required; value is not a valid integer"
        );
    }

    #[test]
    fn raw_body_fallback() {
        assert_eq!(error_detail("internal error\n"), "internal error");
        assert_eq!(error_detail(r#"{"error":"x"}"#), r#"{"error":"x"}"#);
    }

    #[test]
    fn status_classification() {
        assert!(status_error(401, "").is_auth_failure());
        assert!(matches!(status_error(403, ""), ApiError::PermissionDenied(_)));
        assert!(matches!(status_error(404, "{}"), ApiError::NotFound(_)));
        assert!(matches!(
            status_error(422, r#"{"detail":"bad"}"#),
            ApiError::Api { status: 422, .. }
        ));
    }
}
