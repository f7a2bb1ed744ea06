//! API error types and the single mapping to HTTP status codes

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use rule_forge_compiler::CompilerError;
use rule_forge_runtime::RuntimeError;
use rule_forge_storage::StorageError;

/// Failures surfaced by the service facade. Component errors are
/// wrapped with context but keep their root cause chain; nothing is
/// logged-and-swallowed on the way up.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("rule '{0}' not found")]
    RuleNotFound(String),

    #[error(transparent)]
    Compiler(#[from] CompilerError),

    #[error("execution failed: {0}")]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match &err {
            // A missing rule on execute reflects the caller's request.
            ServiceError::RuleNotFound(_) => ApiError::BadRequest(err.to_string()),
            // Validation and compile output belong to the user's code;
            // driver I/O problems do not.
            ServiceError::Compiler(compiler) => match compiler {
                CompilerError::Validation(_)
                | CompilerError::Compile(_)
                | CompilerError::Timeout(_) => ApiError::BadRequest(err.to_string()),
                CompilerError::MissingArtifact | CompilerError::Io(_) => {
                    ApiError::Internal(err.to_string())
                }
            },
            ServiceError::Runtime(_) => ApiError::BadRequest(err.to_string()),
            ServiceError::Storage(StorageError::NotFound(_)) => {
                ApiError::NotFound(err.to_string())
            }
            ServiceError::Storage(StorageError::AlreadyExists(_)) => {
                ApiError::Conflict(err.to_string())
            }
            ServiceError::Storage(_) | ServiceError::Internal(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => ApiError::NotFound(msg),
            StorageError::AlreadyExists(msg) => ApiError::Conflict(msg),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rule_forge_compiler::ValidationError;

    #[test]
    fn validation_failures_are_client_errors() {
        let err = ServiceError::Compiler(CompilerError::Validation(
            ValidationError::MissingTransform,
        ));
        assert!(matches!(ApiError::from(err), ApiError::BadRequest(_)));
    }

    #[test]
    fn driver_io_failures_are_server_errors() {
        let err = ServiceError::Compiler(CompilerError::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "disk gone",
        )));
        assert!(matches!(ApiError::from(err), ApiError::Internal(_)));
    }

    #[test]
    fn missing_rule_on_execute_is_a_bad_request() {
        let err = ServiceError::RuleNotFound("ghost".into());
        assert!(matches!(ApiError::from(err), ApiError::BadRequest(_)));
    }

    #[test]
    fn storage_not_found_maps_to_404() {
        let err = ServiceError::Storage(StorageError::NotFound("rule 'x'".into()));
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));
    }
}
