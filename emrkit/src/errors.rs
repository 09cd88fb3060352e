// emrkit/src/errors.rs
//
// Error taxonomy shared by the API clients and the view models

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmrError {
    /// The request never produced an HTTP response (connect, DNS, timeout, reset).
    #[error("Network error: {0}")]
    Transport(String),

    /// Non-2xx answer. `message` is the `error` field of a `{error: string}` body.
    #[error("Server returned {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Status { status: u16, message: Option<String> },

    /// Rejected locally before any request was issued.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Malformed response: {0}")]
    MalformedPayload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Preferences error: {0}")]
    Preferences(String),
}

impl EmrError {
    pub fn not_found(message: impl Into<String>) -> Self {
        EmrError::Status {
            status: 404,
            message: Some(message.into()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, EmrError::Status { status: 404, .. })
    }

    /// Text shown to the user for a failed action.
    ///
    /// Server-provided messages win, validation errors speak for themselves,
    /// everything else collapses to the per-action fallback.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            EmrError::Status {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            EmrError::Validation(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for EmrError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            EmrError::MalformedPayload(err.to_string())
        } else {
            EmrError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EmrError {
    fn from(err: serde_json::Error) -> Self {
        EmrError::MalformedPayload(err.to_string())
    }
}

impl From<config::ConfigError> for EmrError {
    fn from(err: config::ConfigError) -> Self {
        EmrError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = EmrError::Status {
            status: 500,
            message: Some("AI service error: quota exceeded".to_string()),
        };
        assert_eq!(err.user_message("Failed to get AI summary."), "AI service error: quota exceeded");
    }

    #[test]
    fn test_user_message_falls_back() {
        let err = EmrError::Status { status: 502, message: None };
        assert_eq!(err.user_message("Failed to add note."), "Failed to add note.");

        let err = EmrError::Transport("connection refused".to_string());
        assert_eq!(err.user_message("Failed to add note."), "Failed to add note.");

        let err = EmrError::MalformedPayload("expected value".to_string());
        assert_eq!(err.user_message("Failed to get predictive analysis."), "Failed to get predictive analysis.");
    }

    #[test]
    fn test_not_found() {
        assert!(EmrError::not_found("Patient not found").is_not_found());
        assert!(!EmrError::Status { status: 400, message: None }.is_not_found());
    }

    #[test]
    fn test_display() {
        let err = EmrError::Status { status: 404, message: Some("Patient not found".into()) };
        assert_eq!(err.to_string(), "Server returned 404: Patient not found");
        let err = EmrError::Status { status: 500, message: None };
        assert_eq!(err.to_string(), "Server returned 500");
    }
}
