//! Certificate verification.

use crate::error::{ApiError, ValidationError};
use crate::model::{Certificate, VerifyResponse};
use crate::traits::TrainingApi;

const DEFAULT_INVALID_MESSAGE: &str = "No valid certificate matches this verification code.";

/// What the backend said about a verification code.
#[derive(Debug, Clone)]
pub enum VerificationOutcome {
    Valid(Certificate),
    Invalid(String),
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid(_))
    }
}

impl From<VerifyResponse> for VerificationOutcome {
    fn from(response: VerifyResponse) -> Self {
        match response {
            VerifyResponse {
                valid: true,
                certificate: Some(certificate),
                ..
            } if certificate.is_valid => VerificationOutcome::Valid(certificate),
            VerifyResponse { message, .. } => VerificationOutcome::Invalid(
                message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_INVALID_MESSAGE.to_string()),
            ),
        }
    }
}

/// Ask the backend whether `code` identifies a currently valid certificate.
///
/// The code is trimmed and must not be empty. Unknown, revoked and expired
/// codes all come back as `Invalid`; only transport and server failures are
/// errors. Side-effect free, so safe to repeat.
pub async fn verify(api: &dyn TrainingApi, code: &str) -> Result<VerificationOutcome, ApiError> {
    let code = code.trim();
    if code.is_empty() {
        return Err(ValidationError::EmptyVerificationCode.into());
    }

    match api.verify_certificate(code).await {
        Ok(response) => Ok(response.into()),
        Err(ApiError::NotFound(message)) => Ok(VerificationOutcome::Invalid(message)),
        Err(ApiError::Api { status, message }) if (400..500).contains(&status) => {
            Ok(VerificationOutcome::Invalid(message))
        }
        Err(e) => Err(e),
    }
}
