use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Failure taxonomy shared by every core operation. The HTTP boundary maps
/// each variant to a status code; `Internal` is the only variant whose
/// message is withheld from callers.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Entity absent, or owned by another tenant. The two cases are
    /// deliberately indistinguishable so callers cannot enumerate tenants.
    #[error("{0}")]
    NotFound(String),
    /// Action not permitted from the entity's current lifecycle state.
    #[error("{0}")]
    InvalidState(String),
    /// OTP, webhook-signature, or caller-context failure.
    #[error("{0}")]
    Unauthorized(String),
    /// Malformed input or an unsupported provider.
    #[error("{0}")]
    BadRequest(String),
    /// Duplicate unique key surfaced by the durable store.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}
