use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad failure category reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    NotFound,
    PermissionDenied,
    ProtocolMismatch,
    /// The entity changed on the server since the client last saw it.
    Conflict,
    Internal,
}

/// Structured error carried by an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?}: {message}")]
pub struct ProtocolError {
    pub code: ErrorCode,
    pub message: String,
    pub detail: Option<String>,
}

impl ProtocolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: None,
        }
    }
}

/// Failure to express entities as a protocol scope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeError {
    /// No entities were given.
    #[error("cannot build a scope from an empty entity set")]
    Empty,
    /// Entity has neither a valid id nor a remote id.
    #[error("invalid {entity} given: no id and no remote id")]
    InvalidEntity { entity: &'static str },
    /// Entities share no common identifier kind.
    #[error("entities cannot be addressed by a common identifier")]
    MixedIdentifiers,
}
