//! Error types for backup orchestration.
//!
//! # Design
//!
//! - Every fatal condition is one `BackupError` variant carrying its context.
//! - Remote faults keep the service's structured message so the top-level
//!   failure can prefer it over the local description.
//! - Tolerated faults (poll cycles, per-item deletes) never surface as errors.

use thiserror::Error;

/// Result alias for orchestration operations.
pub type BackupResult<T> = Result<T, BackupError>;

/// Result alias for calls made through a [`crate::BackupService`].
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Fault reported by the backup service client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct ServiceError {
    /// HTTP status when the service answered at all.
    pub status: Option<u16>,
    /// Structured message returned by the service, if any.
    pub message: Option<String>,
    /// Local description of the fault.
    pub detail: String,
}

impl ServiceError {
    /// Fault raised before a response was received.
    #[must_use]
    pub fn transport(detail: impl Into<String>) -> Self {
        Self {
            status: None,
            message: None,
            detail: detail.into(),
        }
    }

    /// Non-success response from the service.
    #[must_use]
    pub fn rejected(status: u16, message: Option<String>, detail: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message,
            detail: detail.into(),
        }
    }

    /// Successful response whose payload could not be used.
    #[must_use]
    pub fn invalid_response(detail: impl Into<String>) -> Self {
        Self::transport(detail)
    }

    /// Whether the service reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.status, Some(404))
    }
}

/// Primary error type for backup orchestration.
#[derive(Debug, Error)]
pub enum BackupError {
    /// A parameter was missing or malformed.
    #[error("{message}")]
    InvalidInput {
        /// Offending input name.
        field: &'static str,
        /// Human-readable reason.
        message: String,
    },
    /// Target environment could not be confirmed.
    #[error("Environment {environment} does not exist")]
    EnvironmentNotFound {
        /// Environment name that was looked up.
        environment: String,
        /// Lookup fault, kept for debugging only.
        #[source]
        source: ServiceError,
    },
    /// Scope holds no backups where at least one was required.
    #[error("No backups found for environment {environment}")]
    NoBackupsFound {
        /// Environment name that was listed.
        environment: String,
    },
    /// The service reported the backup as failed.
    #[error("Backup {backup_id} failed")]
    BackupFailed {
        /// Failed backup identifier.
        backup_id: String,
    },
    /// The backup did not finish within the retry budget.
    #[error("Backup {backup_id} timed out after {attempts} retries (waited {waited_secs} seconds)")]
    BackupTimedOut {
        /// Backup that was being polled.
        backup_id: String,
        /// Retries counted before giving up.
        attempts: u32,
        /// Total sleep time spent between queries.
        waited_secs: u64,
    },
    /// A remote call failed outside the tolerant paths.
    #[error("{operation} failed: {source}")]
    Service {
        /// Capability that was invoked.
        operation: &'static str,
        /// Underlying service fault.
        #[source]
        source: ServiceError,
    },
    /// An output value could not be encoded.
    #[error("failed to encode output '{field}'")]
    OutputEncoding {
        /// Output key being produced.
        field: &'static str,
        /// Serializer error.
        #[source]
        source: serde_json::Error,
    },
}

impl BackupError {
    pub(crate) fn invalid_input(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            message: message.into(),
        }
    }

    pub(crate) const fn service(operation: &'static str, source: ServiceError) -> Self {
        Self::Service { operation, source }
    }

    /// Whether the failure stems from caller input rather than the service.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Single-line failure message, preferring the service's own wording.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Service { source, .. } => source
                .message
                .clone()
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| self.to_string()),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_message_prefers_remote_message() {
        let err = BackupError::service(
            "create_backup",
            ServiceError::rejected(403, Some("Quota exceeded".into()), "status 403"),
        );
        assert_eq!(err.display_message(), "Quota exceeded");
    }

    #[test]
    fn display_message_falls_back_to_description() {
        let err = BackupError::service("list_backups", ServiceError::transport("connection reset"));
        assert_eq!(err.display_message(), "list_backups failed: connection reset");

        let blank = BackupError::service(
            "list_backups",
            ServiceError::rejected(500, Some("  ".into()), "status 500"),
        );
        assert_eq!(blank.display_message(), "list_backups failed: status 500");
    }

    #[test]
    fn environment_not_found_hides_cause() {
        let err = BackupError::EnvironmentNotFound {
            environment: "staging".into(),
            source: ServiceError::rejected(401, Some("Unauthorized".into()), "status 401"),
        };
        assert_eq!(err.display_message(), "Environment staging does not exist");
        assert!(!err.is_invalid_input());
    }

    #[test]
    fn not_found_detects_404_only() {
        assert!(ServiceError::rejected(404, None, "missing").is_not_found());
        assert!(!ServiceError::rejected(500, None, "boom").is_not_found());
        assert!(!ServiceError::transport("offline").is_not_found());
    }
}
