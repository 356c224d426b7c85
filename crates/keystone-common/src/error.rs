//! Centralized error types for Keystone.
//!
//! Only precondition failures surface as a [`KeystoneError`]: a missing server
//! or document, a malformed document, a concurrent run. Failures of individual
//! mutations during a run are tallied in the run report instead.

use keystone_sdk::PlatformError;

#[derive(Debug, thiserror::Error)]
pub enum KeystoneError {
    // === Preconditions ===
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("Structure document {path} is malformed: {message}")]
    MalformedDocument { path: String, message: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Forbidden")]
    Forbidden,

    #[error("A reconciliation run is already in progress for server {server_id}")]
    RunInProgress { server_id: String },

    // === Infrastructure errors ===
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl KeystoneError {
    /// Map a platform failure on a lookup to `NotFound` when the platform says 404.
    pub fn from_lookup(resource: impl Into<String>, err: PlatformError) -> Self {
        if err.is_not_found() {
            Self::NotFound { resource: resource.into() }
        } else if err.is_forbidden() {
            Self::Forbidden
        } else {
            Self::Platform(err)
        }
    }

    /// Short message safe to show to the invoking user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Platform(_) | Self::Io(_) | Self::Json(_) | Self::Config(_) | Self::Internal(_) => {
                tracing::error!("Internal error: {self}");
                "An internal error occurred. Check the bot log.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Convenience type alias for Results using KeystoneError.
pub type KeystoneResult<T> = Result<T, KeystoneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_maps_platform_status() {
        let missing = KeystoneError::from_lookup(
            "Server 42",
            PlatformError::Api { status: 404, message: "Unknown Guild".into() },
        );
        assert_eq!(missing.to_string(), "Server 42 not found");

        let denied = KeystoneError::from_lookup(
            "Server 42",
            PlatformError::Api { status: 403, message: "Missing Access".into() },
        );
        assert!(matches!(denied, KeystoneError::Forbidden));

        let other = KeystoneError::from_lookup("Server 42", PlatformError::NotConnected);
        assert!(matches!(other, KeystoneError::Platform(_)));
    }

    #[test]
    fn internal_details_are_hidden_from_users() {
        let err = KeystoneError::Internal(anyhow::anyhow!("secret path /etc/x"));
        assert!(!err.user_message().contains("secret"));

        let busy = KeystoneError::RunInProgress { server_id: "1".into() };
        assert!(busy.user_message().contains("already in progress"));
    }
}
