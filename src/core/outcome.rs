use crate::services::{ApiError, StorageError};
use thiserror::Error;
use validator::ValidationErrors;

/// Why a repository operation failed
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("{message}")]
    ServerRejected { message: String, code: u16 },

    #[error("{0}")]
    TransportFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Session storage failed: {0}")]
    Storage(#[from] StorageError),
}

impl RepositoryError {
    /// HTTP status, present only for server rejections
    pub fn code(&self) -> Option<u16> {
        match self {
            RepositoryError::ServerRejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ApiError> for RepositoryError {
    fn from(value: ApiError) -> Self {
        match value {
            ApiError::Rejected { message, status } => RepositoryError::ServerRejected {
                message,
                code: status,
            },
            ApiError::RequestError(e) => RepositoryError::TransportFailure(e.to_string()),
            ApiError::InvalidResponse(m) | ApiError::InvalidUrl(m) => {
                RepositoryError::TransportFailure(m)
            }
        }
    }
}

impl From<ValidationErrors> for RepositoryError {
    fn from(value: ValidationErrors) -> Self {
        RepositoryError::InvalidInput(value.to_string())
    }
}

/// Uniform result of every repository operation
///
/// Nothing past the repository boundary sees a `RepositoryError`; it is
/// collapsed into `Outcome::Error` with the message and optional status.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    Error { message: String, code: Option<u16> },
}

impl<T> Outcome<T> {
    pub fn error(message: impl Into<String>, code: Option<u16>) -> Self {
        Outcome::Error {
            message: message.into(),
            code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(data) => Some(data),
            Outcome::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Error { message, .. } => Some(message),
        }
    }

    pub fn map<U, F>(self, f: F) -> Outcome<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Outcome::Success(data) => Outcome::Success(f(data)),
            Outcome::Error { message, code } => Outcome::Error { message, code },
        }
    }
}

impl<T> From<Result<T, RepositoryError>> for Outcome<T> {
    fn from(value: Result<T, RepositoryError>) -> Self {
        match value {
            Ok(data) => Outcome::Success(data),
            Err(e) => Outcome::Error {
                code: e.code(),
                message: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_authenticated_message() {
        let outcome: Outcome<()> = Err(RepositoryError::NotAuthenticated).into();
        assert_eq!(outcome, Outcome::error("Not authenticated", None));
    }

    #[test]
    fn test_rejection_keeps_code() {
        let err: RepositoryError = ApiError::Rejected {
            message: "Match not found".to_string(),
            status: 404,
        }
        .into();
        let outcome: Outcome<()> = Err(err).into();
        assert_eq!(outcome, Outcome::error("Match not found", Some(404)));
    }

    #[test]
    fn test_malformed_response_is_transport_failure() {
        let err: RepositoryError = ApiError::InvalidResponse("bad json".to_string()).into();
        assert!(matches!(err, RepositoryError::TransportFailure(_)));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_map_and_success() {
        let outcome = Outcome::Success(2).map(|n| n * 10);
        assert!(outcome.is_success());
        assert_eq!(outcome.success(), Some(20));

        let failed: Outcome<i32> = Outcome::error("boom", Some(500));
        assert_eq!(failed.error_message(), Some("boom"));
        assert_eq!(failed.map(|n| n + 1).success(), None);
    }
}
