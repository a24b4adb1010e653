//! Error types
//!
//! Validation failures, API misuse and transport failures are kept apart so
//! callers can tell "bad input data" from "bad use of the library".

use thiserror::Error;

/// Result alias used across the library
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Raised when an instance doesn't match its discovery schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Build the standard "X isn't valid" message
    pub fn invalid(checked_value: impl std::fmt::Display, criteria: impl std::fmt::Display) -> Self {
        Self::new(format!(
            "{checked_value} isn't valid. Expected a value that meets those criteria: {criteria}"
        ))
    }
}

/// Non-fatal findings. Each one is also logged with `tracing::warn!`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// An object carried a key its schema doesn't mention
    UnknownProperty {
        property: String,
        schema_id: Option<String>,
    },
    /// Arguments matched no declared parameter and were sent as query params anyway
    UnusedParameters(Vec<String>),
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownProperty {
                property,
                schema_id,
            } => write!(
                f,
                "Item {} was passed, but not mentioned in schema {}. It will probably be discarded by the API",
                property,
                schema_id.as_deref().unwrap_or("<anonymous>")
            ),
            Self::UnusedParameters(names) => write!(
                f,
                "Parameters {:?} were found and they're probably of no use. Check if they're valid parameters",
                names
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Programmer mistakes: wrong argument types, calling a resource, etc.
    #[error("usage error: {0}")]
    Usage(String),

    #[error(
        "Resource/Method {name} doesn't exist. Available resources are: {resources:?}. Available methods are: {methods:?}"
    )]
    NotFound {
        name: String,
        resources: Vec<String>,
        methods: Vec<String>,
    },

    #[error("malformed discovery document: {0}")]
    Document(String),

    #[error("HTTP {status}: {message}\n\nRequest URL:\n{url}")]
    Http {
        status: u16,
        message: String,
        url: String,
    },

    #[error("authentication failed (HTTP {status}): {message}\n\nRequest URL:\n{url}")]
    Auth {
        status: u16,
        message: String,
        url: String,
    },

    /// Credentials couldn't be loaded or produced no token
    #[error("credentials error: {0}")]
    Credentials(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for 401 responses and credential failures
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. } | Self::Credentials(_))
    }

    /// True for any non-2xx response, including auth failures
    pub fn is_http(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Auth { .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Auth { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
