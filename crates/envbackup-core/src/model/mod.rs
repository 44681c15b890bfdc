//! Value types exchanged between the orchestrator and the backup service.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved backup identifier meaning "the most recently created backup".
pub const LATEST_SENTINEL: &str = "latest";

/// Kind of snapshot a backup captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupType {
    /// Database dump.
    Database,
    /// Filesystem archive.
    Filesystem,
}

impl BackupType {
    /// Wire label for the backup type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Filesystem => "filesystem",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "database" => Some(Self::Database),
            "filesystem" => Some(Self::Filesystem),
            _ => None,
        }
    }
}

impl Display for BackupType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Operation requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create a new backup.
    Create,
    /// List existing backups.
    List,
    /// Obtain a download URL for a backup.
    Download,
    /// Delete one backup or every backup older than a cutoff.
    Delete,
}

impl Operation {
    /// Input label for the operation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::List => "list",
            Self::Download => "download",
            Self::Delete => "delete",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "list" => Some(Self::List),
            "download" => Some(Self::Download),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl Display for Operation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Ordering requested from the service when listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

impl SortOrder {
    /// Query label for the order.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Status filter applied server-side when listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    /// Only completed backups.
    Completed,
    /// Only failed backups.
    Failed,
    /// Only running backups.
    Running,
}

impl StatusFilter {
    /// Query label for the filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Running => "running",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "running" => Some(Self::Running),
            _ => None,
        }
    }

    /// Whether a record status passes this filter.
    #[must_use]
    pub const fn matches(self, status: BackupStatus) -> bool {
        matches!(
            (self, status),
            (Self::Completed, BackupStatus::Completed)
                | (Self::Failed, BackupStatus::Failed)
                | (Self::Running, BackupStatus::Running | BackupStatus::InProgress)
        )
    }
}

/// Lifecycle status reported for a backup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    /// Backup job is executing.
    Running,
    /// Backup job accepted but not finished.
    InProgress,
    /// Backup finished successfully.
    Completed,
    /// Backup finished with an error.
    Failed,
    /// Any status this client does not recognise.
    #[default]
    #[serde(other)]
    Unknown,
}

impl BackupStatus {
    /// Label for logs and outputs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }

    /// `completed` and `failed` admit no further transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl Display for BackupStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Snapshot of a backup as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    /// Opaque backup identifier.
    pub id: String,
    /// Human-readable label.
    #[serde(default, alias = "name")]
    pub description: String,
    /// Lifecycle status at the time of the snapshot.
    #[serde(default)]
    pub status: BackupStatus,
    /// Creation timestamp, absent on some freshly created records.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Deployment target a backup belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Owning organization.
    pub organization: String,
    /// Owning application.
    pub application: String,
    /// Environment name.
    pub name: String,
}

/// Address every backup call is made against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupScope {
    /// Organization slug.
    pub organization: String,
    /// Application name.
    pub application: String,
    /// Environment name.
    pub environment: String,
    /// Backup type the call concerns.
    pub backup_type: BackupType,
}

/// Reference to the backup an operation targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupRef {
    /// A concrete backup identifier.
    ById(String),
    /// The most recently created backup in scope.
    Latest,
}

impl BackupRef {
    /// Interpret a raw identifier, mapping the sentinel to [`Self::Latest`].
    #[must_use]
    pub fn from_input(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed == LATEST_SENTINEL {
            Some(Self::Latest)
        } else {
            Some(Self::ById(trimmed.to_string()))
        }
    }
}

impl Display for BackupRef {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ById(id) => formatter.write_str(id),
            Self::Latest => formatter.write_str(LATEST_SENTINEL),
        }
    }
}

/// Optional list parameters forwarded to the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Requested creation-time ordering.
    pub order: Option<SortOrder>,
    /// Requested status filter.
    pub status: Option<StatusFilter>,
}

/// Where a download URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSource {
    /// Issued by the service.
    Issued,
    /// Built locally after the service call failed.
    Constructed,
}

/// Download location for a backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    /// URL the archive can be fetched from.
    pub url: String,
    /// Expiry reported by the service.
    pub expires_at: Option<DateTime<Utc>>,
    /// Provenance of the URL.
    pub source: LinkSource,
}

impl DownloadLink {
    /// Link issued by the service.
    #[must_use]
    pub fn issued(url: impl Into<String>, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            url: url.into(),
            expires_at,
            source: LinkSource::Issued,
        }
    }

    /// Locally constructed fallback link.
    #[must_use]
    pub fn constructed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expires_at: None,
            source: LinkSource::Constructed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backup_ref_maps_sentinel() {
        assert_eq!(BackupRef::from_input("latest"), Some(BackupRef::Latest));
        assert_eq!(BackupRef::from_input(" latest "), Some(BackupRef::Latest));
        assert_eq!(
            BackupRef::from_input("Latest"),
            Some(BackupRef::ById("Latest".into()))
        );
        assert_eq!(
            BackupRef::from_input("bk-1"),
            Some(BackupRef::ById("bk-1".into()))
        );
        assert_eq!(BackupRef::from_input("   "), None);
    }

    #[test]
    fn record_accepts_name_alias_and_unknown_status() {
        let record: BackupRecord = serde_json::from_value(json!({
            "id": "bk-1",
            "name": "nightly",
            "status": "queued",
            "createdAt": "2024-01-15T10:00:00Z"
        }))
        .expect("record should parse");
        assert_eq!(record.description, "nightly");
        assert_eq!(record.status, BackupStatus::Unknown);
        assert!(record.created_at.is_some());
    }

    #[test]
    fn record_tolerates_missing_optional_fields() {
        let record: BackupRecord =
            serde_json::from_value(json!({"id": "bk-2", "status": "in_progress"}))
                .expect("record should parse");
        assert_eq!(record.status, BackupStatus::InProgress);
        assert!(record.description.is_empty());
        assert!(record.created_at.is_none());
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = BackupRecord {
            id: "bk-3".into(),
            description: "weekly".into(),
            status: BackupStatus::Completed,
            created_at: None,
        };
        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["status"], "completed");
        assert!(value.get("createdAt").is_some());
    }

    #[test]
    fn status_filter_treats_in_progress_as_running() {
        assert!(StatusFilter::Running.matches(BackupStatus::InProgress));
        assert!(StatusFilter::Completed.matches(BackupStatus::Completed));
        assert!(!StatusFilter::Failed.matches(BackupStatus::Completed));
    }

    #[test]
    fn terminal_statuses() {
        assert!(BackupStatus::Completed.is_terminal());
        assert!(BackupStatus::Failed.is_terminal());
        assert!(!BackupStatus::InProgress.is_terminal());
        assert!(!BackupStatus::Unknown.is_terminal());
    }
}
