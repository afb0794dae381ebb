use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    #[error("invalid scopes: {0}")]
    InvalidScopes(String),

    #[error("unknown scope \"{scope}\" for definition \"{definition}\"")]
    UnknownScope { scope: String, definition: String },

    #[error("definition \"{0}\" is already declared")]
    DuplicateDefinition(String),

    #[error("definition \"{0}\" not found")]
    NotFound(String),

    #[error("definition \"{name}\" is not of type {expected}")]
    WrongType { name: String, expected: &'static str },

    #[error("circular resolution: {}", .0.join(" -> "))]
    CircularResolution(Vec<String>),

    /// A definition of an inner scope was requested from an outer container
    #[error("definition \"{name}\" lives in scope \"{scope}\" and can not be resolved from scope \"{current}\"")]
    ScopeMismatch { name: String, scope: String, current: String },

    #[error("scope \"{0}\" has no sub-scope")]
    NoSubScope(String),

    #[error("container is closed")]
    Closed,

    #[error("failed to close \"{name}\": {message}")]
    CloseFailed { name: String, message: String },
}
