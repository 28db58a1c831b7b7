use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Session load error: {0}")]
    SessionLoad(String),

    #[error("Confirmation error: {0}")]
    Confirmation(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Invalid phase: {0}")]
    InvalidPhase(String),

    #[error("Track not found: {0}")]
    TrackNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(String),
}

// Implement From traits for common error types to simplify conversion

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Storage(format!("Serialization error: {}", e))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serializes_as_tagged_message() {
        let err = AppError::Ingest("Playlist is empty".to_string());
        let json = serde_json::to_value(&err).unwrap();

        assert_eq!(json["type"], "Ingest");
        assert_eq!(json["message"], "Playlist is empty");
        assert_eq!(err.to_string(), "Ingest error: Playlist is empty");
    }
}
