use axum::http::StatusCode;
use pactum_core::DomainError;
use tracing::error;

/// Maps the domain taxonomy onto HTTP. `Internal` is logged here and the
/// response body carries a fixed message instead of the source chain.
pub fn error_response(err: DomainError) -> (StatusCode, String) {
    match err {
        DomainError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        DomainError::InvalidState(message) => (StatusCode::CONFLICT, message),
        DomainError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
        DomainError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
        DomainError::Conflict(message) => (StatusCode::CONFLICT, message),
        DomainError::Internal(source) => {
            error!("request failed: {source:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    }
}
