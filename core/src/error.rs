//! Error types for the tasks API client.
//!
//! # Design
//! Every failure path ends in an `ApiError`: transport failures, timeouts,
//! non-2xx statuses and undecodable bodies alike. `NotFound` gets a dedicated
//! variant because `get_by_id` turns it into an explicit "absent" result
//! instead of failing. Variants carry the `{message, status?, field?}` triple
//! the UI renders.

use serde::Deserialize;

use crate::http::{HttpResponse, TransportError};

const NETWORK_MESSAGE: &str = "network error - please check if the backend is running";
const FALLBACK_MESSAGE: &str = "an unexpected error occurred";

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NetworkUnreachable,
    NotFound,
    ServerError,
    ValidationError,
    UnknownError,
}

/// Errors returned by the tasks client and everything layered on top of it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No response arrived: connection failure or client-side timeout.
    #[error("{message}")]
    NetworkUnreachable { message: String },

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a 5xx status.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The payload was rejected, locally or by the server.
    #[error("{message}")]
    Validation { message: String, field: Option<String> },

    /// Anything else, including undecodable response bodies.
    #[error("{message}")]
    Unknown { status: Option<u16>, message: String },
}

impl ApiError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.to_string()),
        }
    }

    pub fn network(detail: impl std::fmt::Display) -> Self {
        Self::NetworkUnreachable {
            message: format!("{NETWORK_MESSAGE} ({detail})"),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            status: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NetworkUnreachable { .. } => ErrorKind::NetworkUnreachable,
            Self::NotFound => ErrorKind::NotFound,
            Self::Server { .. } => ErrorKind::ServerError,
            Self::Validation { .. } => ErrorKind::ValidationError,
            Self::Unknown { .. } => ErrorKind::UnknownError,
        }
    }

    /// Text for the user. The status is reported separately by [`status`](Self::status).
    pub fn message(&self) -> &str {
        match self {
            Self::NotFound => "resource not found",
            Self::NetworkUnreachable { message }
            | Self::Server { message, .. }
            | Self::Validation { message, .. }
            | Self::Unknown { message, .. } => message,
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::Server { status, .. } => Some(*status),
            Self::Unknown { status, .. } => *status,
            Self::NetworkUnreachable { .. } | Self::Validation { .. } => None,
        }
    }

    /// Name of the offending input field, for validation failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Map a non-2xx response onto the error taxonomy.
    pub fn from_response(response: &HttpResponse) -> Self {
        let status = response.status;
        let body = ErrorBody::parse(&response.body);

        match status {
            404 => Self::NotFound,
            500 => Self::Server {
                status,
                message: "internal server error".to_string(),
            },
            501..=599 => Self::Server {
                status,
                message: body.message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            },
            400..=499 if body.field.is_some() || status == 400 || status == 422 => Self::Validation {
                message: body.message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
                field: body.field,
            },
            _ => Self::Unknown {
                status: Some(status),
                message: body.message.unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            },
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self::network(err)
    }
}

/// Whatever the server put in an error body.
#[derive(Debug, Default)]
struct ErrorBody {
    message: Option<String>,
    field: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawErrorBody {
    Text(String),
    Object {
        message: Option<String>,
        error: Option<String>,
        field: Option<String>,
    },
}

impl ErrorBody {
    fn parse(body: &str) -> Self {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        match serde_json::from_str::<RawErrorBody>(trimmed) {
            Ok(RawErrorBody::Text(message)) => Self {
                message: Some(message),
                field: None,
            },
            Ok(RawErrorBody::Object { message, error, field }) => Self {
                message: message.or(error),
                field,
            },
            // Plain-text bodies pass through as the message.
            Err(_) => Self {
                message: Some(trimmed.to_string()),
                field: None,
            },
        }
    }
}
