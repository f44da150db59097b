//! API error types.
//!
//! Every `TrainingApi` call returns these. Defined in `trainhub-core` so the
//! session, the assessment engine and the progress tracker can classify
//! failures (forced logout, banner text) without string matching.

use thiserror::Error;

/// Errors that can occur when talking to the training backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid credentials or an expired token (HTTP 401).
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// The backend or the local capability check refused the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Form input rejected before any request was sent.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The API returned some other error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A transport-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Returns `true` when the session must be torn down.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    /// Collapse the error into the single string shown in the error banner.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized(_) => "Your session has expired. Please log in again.".into(),
            ApiError::PermissionDenied(_) => {
                "You do not have permission to perform this action.".into()
            }
            ApiError::NotFound(msg) if !msg.is_empty() => msg.clone(),
            ApiError::NotFound(_) => "The requested item could not be found.".into(),
            ApiError::Validation(e) => e.to_string(),
            ApiError::Api { message, .. } if !message.is_empty() => message.clone(),
            ApiError::Api { .. } | ApiError::Decode(_) => {
                "The server could not complete the request. Please try again.".into()
            }
            ApiError::Timeout(_) | ApiError::Network(_) => {
                "Could not reach the server. Check your connection and try again.".into()
            }
        }
    }
}

/// Client-side form validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("option {0} has no text")]
    EmptyOption(usize),

    #[error("multiple choice questions need at least one correct option")]
    NoCorrectOption,

    #[error("true/false questions need a correct answer of \"true\" or \"false\"")]
    InvalidTrueFalseAnswer,

    #[error("{0} questions cannot carry options")]
    UnexpectedOptions(&'static str),

    #[error("{0} questions cannot carry a correct answer")]
    UnexpectedCorrectAnswer(&'static str),

    #[error("question {0} does not exist")]
    UnknownQuestion(String),

    #[error("question {0} is listed more than once")]
    DuplicateQuestion(String),

    #[error("answer does not fit question {question_id}: {reason}")]
    AnswerMismatch {
        question_id: String,
        reason: String,
    },

    #[error("no assessment attempt is in progress")]
    NoActiveAttempt,

    #[error("assessment has no questions")]
    EmptyAssessment,

    #[error("verification code is required")]
    EmptyVerificationCode,
}
