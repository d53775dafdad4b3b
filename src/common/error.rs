//! Error types for minireg

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Lookup Errors ===
    #[error("Artifact not found: {group}/{artifact}")]
    ArtifactNotFound { group: String, artifact: String },

    #[error("Version {version} not found for artifact {group}/{artifact}")]
    VersionNotFound {
        group: String,
        artifact: String,
        version: i64,
    },

    #[error("Content not found: {0}")]
    ContentNotFound(String),

    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    #[error("Log configuration not found: {0}")]
    LogConfigNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    // === Conflict Errors ===
    #[error("Artifact already exists: {group}/{artifact}")]
    ArtifactAlreadyExists { group: String, artifact: String },

    #[error("Rule already exists: {0}")]
    RuleAlreadyExists(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    // === Engine Errors ===
    #[error("Response timeout for request {0}")]
    Timeout(String),

    #[error("Journal unavailable: {0}")]
    JournalUnavailable(String),

    #[error("Journal corrupted: {0}")]
    Corrupted(String),

    #[error("Codec error: {0}")]
    Codec(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Is this one of the "entity does not exist" errors?
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::ArtifactNotFound { .. }
                | Error::VersionNotFound { .. }
                | Error::ContentNotFound(_)
                | Error::RuleNotFound(_)
                | Error::LogConfigNotFound(_)
                | Error::GroupNotFound(_)
        )
    }

    /// Is this a retryable error?
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout(_) | Error::JournalUnavailable(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = Error::RuleNotFound("VALIDITY".to_string());
        assert!(err.is_not_found());

        let err = Error::ArtifactAlreadyExists {
            group: "g".to_string(),
            artifact: "a".to_string(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_is_retryable() {
        assert!(Error::Timeout("req".to_string()).is_retryable());
        assert!(!Error::Codec("bad frame".to_string()).is_retryable());
    }
}
