//! Flat output record produced at the end of a run.

use serde::Serialize;

use crate::error::{BackupError, BackupResult};
use crate::model::BackupRecord;
use crate::orchestrator::OperationOutcome;

/// Output keys published by the action.
pub mod keys {
    /// `true` when the run finished without error.
    pub const SUCCESS: &str = "success";
    /// Identifier of a created backup.
    pub const BACKUP_ID: &str = "backup_id";
    /// Last known status of a created backup.
    pub const BACKUP_STATUS: &str = "backup_status";
    /// JSON array of listed backups.
    pub const BACKUP_LIST: &str = "backup_list";
    /// Download location of a backup.
    pub const DOWNLOAD_URL: &str = "download_url";
    /// Id `latest` resolved to.
    pub const RESOLVED_BACKUP_ID: &str = "resolved_backup_id";
    /// Description of the backup `latest` resolved to.
    pub const RESOLVED_BACKUP_NAME: &str = "resolved_backup_name";
    /// Creation time of the backup `latest` resolved to.
    pub const RESOLVED_BACKUP_CREATED_AT: &str = "resolved_backup_created_at";
    /// Number of backups removed.
    pub const DELETED_COUNT: &str = "deleted_count";
    /// JSON array of removed ids.
    pub const DELETED_BACKUPS: &str = "deleted_backups";
    /// JSON object of id to failure message.
    pub const FAILED_BACKUPS: &str = "failed_backups";
}

/// Ordered key/value outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOutputs {
    entries: Vec<(&'static str, String)>,
}

impl ActionOutputs {
    /// Outputs for a failed run.
    #[must_use]
    pub fn failure() -> Self {
        let mut outputs = Self::default();
        outputs.set(keys::SUCCESS, "false");
        outputs
    }

    /// Project an operation outcome into outputs.
    ///
    /// # Errors
    ///
    /// [`BackupError::OutputEncoding`] if a JSON-valued output cannot be encoded.
    pub fn from_outcome(outcome: &OperationOutcome) -> BackupResult<Self> {
        let mut outputs = Self::default();
        outputs.set(keys::SUCCESS, "true");

        match outcome {
            OperationOutcome::Created { backup } => {
                outputs.set(keys::BACKUP_ID, &backup.id);
                outputs.set(keys::BACKUP_STATUS, backup.status.as_str());
            }
            OperationOutcome::Listed { backups } => {
                outputs.set(keys::BACKUP_LIST, encode(keys::BACKUP_LIST, backups)?);
            }
            OperationOutcome::Downloaded { link, resolved } => {
                outputs.set(keys::DOWNLOAD_URL, &link.url);
                outputs.set_resolved(resolved.as_ref());
            }
            OperationOutcome::Deleted { outcome, resolved } => {
                outputs.set(keys::DELETED_COUNT, outcome.deleted_count().to_string());
                outputs.set(
                    keys::DELETED_BACKUPS,
                    encode(keys::DELETED_BACKUPS, &outcome.deleted_ids())?,
                );
                outputs.set(
                    keys::FAILED_BACKUPS,
                    encode(keys::FAILED_BACKUPS, &outcome.failures)?,
                );
                outputs.set_resolved(resolved.as_ref());
            }
        }

        Ok(outputs)
    }

    /// Value for `key`, if set.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn set(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    fn set_resolved(&mut self, resolved: Option<&BackupRecord>) {
        let Some(record) = resolved else {
            return;
        };
        self.set(keys::RESOLVED_BACKUP_ID, &record.id);
        self.set(keys::RESOLVED_BACKUP_NAME, &record.description);
        self.set(
            keys::RESOLVED_BACKUP_CREATED_AT,
            record
                .created_at
                .map(|created| created.to_rfc3339())
                .unwrap_or_default(),
        );
    }
}

fn encode<T: Serialize + ?Sized>(field: &'static str, value: &T) -> BackupResult<String> {
    serde_json::to_string(value).map_err(|source| BackupError::OutputEncoding { field, source })
}
