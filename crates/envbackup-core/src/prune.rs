//! Backup deletion: a single explicit target, or every backup past a cutoff.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{BackupError, BackupResult};
use crate::model::{BackupRecord, BackupScope, ListOptions, SortOrder};
use crate::service::BackupService;

/// Per-item result of a deletion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteOutcome {
    /// Every id a deletion was attempted for, in attempt order.
    pub attempted_ids: Vec<String>,
    /// Ids whose deletion succeeded.
    pub succeeded_ids: BTreeSet<String>,
    /// Failure message per id.
    pub failures: BTreeMap<String, String>,
}

impl BulkDeleteOutcome {
    /// Number of backups actually removed.
    #[must_use]
    pub fn deleted_count(&self) -> usize {
        self.succeeded_ids.len()
    }

    /// Removed ids in attempt order.
    #[must_use]
    pub fn deleted_ids(&self) -> Vec<&str> {
        self.attempted_ids
            .iter()
            .filter(|id| self.succeeded_ids.contains(*id))
            .map(String::as_str)
            .collect()
    }

    fn record_success(&mut self, id: &str) {
        self.attempted_ids.push(id.to_string());
        self.succeeded_ids.insert(id.to_string());
    }

    fn record_failure(&mut self, id: &str, message: String) {
        self.attempted_ids.push(id.to_string());
        self.failures.insert(id.to_string(), message);
    }
}

/// Delete exactly one backup; any fault fails the operation.
///
/// # Errors
///
/// [`BackupError::Service`] when the service rejects the deletion.
pub async fn delete_one<S>(
    service: &S,
    scope: &BackupScope,
    backup_id: &str,
) -> BackupResult<BulkDeleteOutcome>
where
    S: BackupService + ?Sized,
{
    info!(backup_id, environment = %scope.environment, "deleting backup");
    service
        .delete_backup(scope, backup_id)
        .await
        .map_err(|source| BackupError::service("delete_backup", source))?;

    let mut outcome = BulkDeleteOutcome::default();
    outcome.record_success(backup_id);
    info!(backup_id, "backup deleted");
    Ok(outcome)
}

/// Delete every backup created before `now - older_than_days`.
///
/// Candidates are deleted one at a time; a failed deletion is recorded and the
/// run continues.
///
/// # Errors
///
/// [`BackupError::Service`] when listing fails and
/// [`BackupError::NoBackupsFound`] when the scope holds no backups at all.
pub async fn delete_older_than<S>(
    service: &S,
    scope: &BackupScope,
    older_than_days: u32,
    now: DateTime<Utc>,
) -> BackupResult<BulkDeleteOutcome>
where
    S: BackupService + ?Sized,
{
    let cutoff = cutoff(now, older_than_days);
    info!(
        environment = %scope.environment,
        older_than_days,
        cutoff = %cutoff.to_rfc3339(),
        "deleting backups older than cutoff"
    );

    let options = ListOptions {
        order: Some(SortOrder::Asc),
        status: None,
    };
    let records = service
        .list_backups(scope, options)
        .await
        .map_err(|source| BackupError::service("list_backups", source))?;

    if records.is_empty() {
        return Err(BackupError::NoBackupsFound {
            environment: scope.environment.clone(),
        });
    }

    let candidates = select_expired(records, cutoff);
    info!(candidates = candidates.len(), "found backups past cutoff");

    let mut outcome = BulkDeleteOutcome::default();
    for record in &candidates {
        match service.delete_backup(scope, &record.id).await {
            Ok(()) => {
                info!(backup_id = %record.id, "backup deleted");
                outcome.record_success(&record.id);
            }
            Err(err) => {
                warn!(backup_id = %record.id, error = %err, "failed to delete backup");
                let message = err.message.clone().unwrap_or_else(|| err.to_string());
                outcome.record_failure(&record.id, message);
            }
        }
    }

    info!(
        deleted = outcome.deleted_count(),
        failed = outcome.failures.len(),
        "age-based deletion finished"
    );
    Ok(outcome)
}

/// Day-granularity cutoff, clamped to the earliest representable instant.
#[must_use]
pub fn cutoff(now: DateTime<Utc>, older_than_days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(older_than_days))
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Records created strictly before `cutoff`, oldest first; undated records
/// never qualify. Ties keep their listed order.
#[must_use]
pub fn select_expired(records: Vec<BackupRecord>, cutoff: DateTime<Utc>) -> Vec<BackupRecord> {
    let mut expired: Vec<_> = records
        .into_iter()
        .filter(|record| record.created_at.is_some_and(|created| created < cutoff))
        .collect();
    expired.sort_by_key(|record| record.created_at);
    expired
}
