//! Unified error type for the connwatch handler layer.
//!
//! `AppError` is the single error type returned by every handler in
//! [`crate::commands`]. It serializes as `{ "kind": "...", "message": "..." }`
//! so a consumer can programmatically distinguish error categories. The
//! reconciliation engine itself never returns errors.

use serde::ser::SerializeStruct;

/// Application-level error returned by all handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A snapshot or control line could not be decoded.
    #[error("{0}")]
    Decode(String),

    /// The snapshot ingestor is no longer accepting messages.
    #[error("{0}")]
    Channel(String),

    /// I/O errors from the input stream or output writer.
    #[error("{0}")]
    Io(String),

    /// Invalid or missing user input (including configuration).
    #[error("{0}")]
    InvalidInput(String),
}

impl AppError {
    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Decode(_) => "Decode",
            AppError::Channel(_) => "Channel",
            AppError::Io(_) => "Io",
            AppError::InvalidInput(_) => "InvalidInput",
        }
    }
}

/// Custom Serialize: produces `{ "kind": "Variant", "message": "..." }`.
impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut s = serializer.serialize_struct("AppError", 2)?;
        s.serialize_field("kind", self.kind())?;
        s.serialize_field("message", &self.to_string())?;
        s.end()
    }
}

// ---- From implementations for ergonomic error conversion ----

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Io(format!("{err:#}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}
