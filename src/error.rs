use std::io;

use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum FormatoError {
    /// A `child_id` edit or payload would close a loop in the format chain.
    #[error("Cycle detected in format chain: {0}")]
    Cycle(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    /// A failed request against the format-association store. `status` is
    /// `None` when the request never produced a response (connect error,
    /// body decode failure).
    #[error("Store API error ({status:?}): {message}")]
    Store {
        status: Option<u16>,
        message: String,
    },
    /// A field-level validation failure, reported before any network call.
    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },
}

impl FormatoError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        FormatoError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            FormatoError::Cycle(_) => StatusCode::CONFLICT,
            FormatoError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FormatoError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FormatoError::NotFound(_) => StatusCode::NOT_FOUND,
            FormatoError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            FormatoError::Store { status, .. } => status
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            FormatoError::Validation { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<io::Error> for FormatoError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => FormatoError::NotFound(format!("{x}")),
            _ => FormatoError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<JsonError> for FormatoError {
    fn from(src: JsonError) -> FormatoError {
        FormatoError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<toml::de::Error> for FormatoError {
    fn from(src: toml::de::Error) -> FormatoError {
        FormatoError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for FormatoError {
    fn from(src: toml::ser::Error) -> FormatoError {
        FormatoError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<UrlParseError> for FormatoError {
    fn from(src: UrlParseError) -> FormatoError {
        FormatoError::Serialization(format!("Invalid URL: {src}"))
    }
}

impl From<uuid::Error> for FormatoError {
    fn from(src: uuid::Error) -> FormatoError {
        FormatoError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<reqwest::Error> for FormatoError {
    fn from(src: reqwest::Error) -> FormatoError {
        FormatoError::Store {
            status: src.status().map(|s| s.as_u16()),
            message: format!("{src}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, FormatoError>;
