//! Record and scope builders.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use envbackup_core::{BackupRecord, BackupScope, BackupStatus, BackupType};

/// Fixed instant used as "now" by suites that inject a clock.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Scope `acme/shop/production` for the given backup type.
#[must_use]
pub fn scope(backup_type: BackupType) -> BackupScope {
    BackupScope {
        organization: "acme".into(),
        application: "shop".into(),
        environment: "production".into(),
        backup_type,
    }
}

/// Completed record created at `created_at`.
#[must_use]
pub fn record_at(id: &str, created_at: DateTime<Utc>) -> BackupRecord {
    BackupRecord {
        id: id.to_string(),
        description: format!("backup {id}"),
        status: BackupStatus::Completed,
        created_at: Some(created_at),
    }
}

/// Completed record created `days` before [`fixed_now`].
#[must_use]
pub fn record_aged(id: &str, days: i64) -> BackupRecord {
    record_at(id, fixed_now() - TimeDelta::days(days))
}

/// Undated record carrying `status`.
#[must_use]
pub fn record_with_status(id: &str, status: BackupStatus) -> BackupRecord {
    BackupRecord {
        id: id.to_string(),
        description: format!("backup {id}"),
        status,
        created_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_aged_offsets_from_fixed_now() {
        let record = record_aged("bk", 3);
        assert_eq!(record.created_at, Some(fixed_now() - TimeDelta::days(3)));
        assert_eq!(record.status, BackupStatus::Completed);
    }
}
