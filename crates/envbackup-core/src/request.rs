//! Input validation: raw action inputs into a normalized [`BackupRequest`].

use std::time::Duration;

use crate::error::{BackupError, BackupResult};
use crate::model::{BackupRef, BackupScope, BackupType, Operation, SortOrder, StatusFilter};
use crate::poll::PollSettings;

/// Inputs as ingested from flags or the runner environment.
///
/// Empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct RawBackupRequest {
    /// Operation name; defaults to `create`.
    pub operation: Option<String>,
    /// Organization slug.
    pub organization: String,
    /// Application name.
    pub application: String,
    /// Environment name.
    pub environment: String,
    /// Backup type; defaults to `database`.
    pub backup_type: Option<String>,
    /// Backup identifier or `latest`.
    pub backup_id: Option<String>,
    /// Description for newly created backups.
    pub backup_name: Option<String>,
    /// Age threshold for bulk deletion.
    pub older_than_days: Option<u32>,
    /// `asc` or `desc`; defaults to `desc`.
    pub sort_order: Option<String>,
    /// `completed`, `failed` or `running`.
    pub filter_status: Option<String>,
    /// Whether to block until a created backup finishes.
    pub wait: bool,
    /// Seconds between status queries.
    pub wait_interval_secs: u64,
    /// Retries allowed after the first status query.
    pub max_retries: u32,
}

/// Validated request driving one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    /// Operation to perform.
    pub operation: Operation,
    /// Scope every remote call is addressed with.
    pub scope: BackupScope,
    /// Explicit or symbolic backup target.
    pub target: Option<BackupRef>,
    /// Description for a created backup.
    pub description: Option<String>,
    /// Age threshold for bulk deletion.
    pub older_than_days: Option<u32>,
    /// Listing order.
    pub sort_order: SortOrder,
    /// Listing status filter.
    pub status_filter: Option<StatusFilter>,
    /// Poll settings when waiting on a created backup.
    pub wait: Option<PollSettings>,
}

impl RawBackupRequest {
    /// Validate and normalize the inputs.
    ///
    /// Rules are checked in a fixed order and the first violation wins.
    ///
    /// # Errors
    ///
    /// Returns [`BackupError::InvalidInput`] on the first violated rule.
    pub fn validate(self) -> BackupResult<BackupRequest> {
        let backup_type = match present(self.backup_type.as_deref()) {
            None => BackupType::Database,
            Some(value) => BackupType::parse(value).ok_or_else(|| {
                BackupError::invalid_input("type", format!("Invalid type: {value}"))
            })?,
        };

        let operation = match present(self.operation.as_deref()) {
            None => Operation::Create,
            Some(value) => Operation::parse(value).ok_or_else(|| {
                BackupError::invalid_input(
                    "operation",
                    format!(
                        "Invalid operation: {value}. Must be one of: create, list, download, delete"
                    ),
                )
            })?,
        };

        let target = self.backup_id.as_deref().and_then(BackupRef::from_input);

        if operation == Operation::Download && target.is_none() {
            return Err(BackupError::invalid_input(
                "backup_id",
                "backup_id is required for download operation",
            ));
        }

        if operation == Operation::Delete && target.is_none() && self.older_than_days.is_none() {
            return Err(BackupError::invalid_input(
                "backup_id",
                "Either backup_id or older_than_days is required for delete operation",
            ));
        }

        let sort_order = match present(self.sort_order.as_deref()) {
            None => SortOrder::default(),
            Some(value) => SortOrder::parse(value).ok_or_else(|| {
                BackupError::invalid_input(
                    "sort_order",
                    format!("Invalid sort_order: {value}. Must be one of: asc, desc"),
                )
            })?,
        };

        let status_filter = present(self.filter_status.as_deref())
            .map(|value| {
                StatusFilter::parse(value).ok_or_else(|| {
                    BackupError::invalid_input(
                        "filter_status",
                        format!(
                            "Invalid filter_status: {value}. Must be one of: completed, failed, running"
                        ),
                    )
                })
            })
            .transpose()?;

        let scope = BackupScope {
            organization: required("organization", &self.organization)?,
            application: required("app_name", &self.application)?,
            environment: required("environment_name", &self.environment)?,
            backup_type,
        };

        let wait = (operation == Operation::Create && self.wait).then(|| PollSettings {
            interval: Duration::from_secs(self.wait_interval_secs),
            max_retries: self.max_retries,
        });

        Ok(BackupRequest {
            operation,
            scope,
            target,
            description: present(self.backup_name.as_deref()).map(str::to_string),
            older_than_days: self.older_than_days,
            sort_order,
            status_filter,
            wait,
        })
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn required(field: &'static str, value: &str) -> BackupResult<String> {
    present(Some(value))
        .map(str::to_string)
        .ok_or_else(|| BackupError::invalid_input(field, format!("{field} is required")))
}
