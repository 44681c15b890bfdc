//! Resolution of the `latest` backup reference.

use tracing::info;

use crate::error::{BackupError, BackupResult};
use crate::model::{BackupRecord, BackupScope, ListOptions, SortOrder};
use crate::service::BackupService;

/// Resolve the most recently created backup in scope.
///
/// Descending order is requested from the service, but the result is
/// re-sorted locally since server-side ordering is not guaranteed.
///
/// # Errors
///
/// [`BackupError::NoBackupsFound`] when the scope is empty, or
/// [`BackupError::Service`] when listing fails.
pub async fn resolve_latest<S>(service: &S, scope: &BackupScope) -> BackupResult<BackupRecord>
where
    S: BackupService + ?Sized,
{
    info!(environment = %scope.environment, "resolving latest backup");

    let options = ListOptions {
        order: Some(SortOrder::Desc),
        status: None,
    };
    let records = service
        .list_backups(scope, options)
        .await
        .map_err(|source| BackupError::service("list_backups", source))?;

    let latest = select_latest(records).ok_or_else(|| BackupError::NoBackupsFound {
        environment: scope.environment.clone(),
    })?;

    info!(
        backup_id = %latest.id,
        description = %latest.description,
        created_at = ?latest.created_at,
        "latest backup resolved"
    );
    Ok(latest)
}

/// Pick the newest record; ties go to the one listed last.
///
/// Records without a timestamp rank below every dated record.
#[must_use]
pub fn select_latest(records: Vec<BackupRecord>) -> Option<BackupRecord> {
    records
        .into_iter()
        .enumerate()
        .max_by(|(left_index, left), (right_index, right)| {
            left.created_at
                .cmp(&right.created_at)
                .then(left_index.cmp(right_index))
        })
        .map(|(_, record)| record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BackupStatus;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2024, 1, 15, hour, 0, 0).single()
    }

    fn record(id: &str, created_at: Option<DateTime<Utc>>) -> BackupRecord {
        BackupRecord {
            id: id.to_string(),
            description: format!("backup {id}"),
            status: BackupStatus::Completed,
            created_at,
        }
    }

    #[test]
    fn picks_newest_regardless_of_order() {
        let records = vec![record("old", at(1)), record("new", at(9)), record("mid", at(5))];
        assert_eq!(select_latest(records).map(|r| r.id), Some("new".into()));
    }

    #[test]
    fn ties_prefer_later_listing() {
        let records = vec![record("first", at(4)), record("second", at(4))];
        assert_eq!(select_latest(records).map(|r| r.id), Some("second".into()));
    }

    #[test]
    fn undated_records_rank_last() {
        let records = vec![record("undated", None), record("dated", at(0))];
        assert_eq!(select_latest(records).map(|r| r.id), Some("dated".into()));
    }

    #[test]
    fn empty_listing_selects_nothing() {
        assert!(select_latest(Vec::new()).is_none());
    }

    #[test]
    fn selection_is_idempotent() {
        let records = vec![record("a", at(3)), record("b", at(3)), record("c", at(2))];
        let first = select_latest(records.clone()).map(|r| r.id);
        let second = select_latest(records).map(|r| r.id);
        assert_eq!(first, second);
    }
}
