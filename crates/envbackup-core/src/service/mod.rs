//! Capability trait implemented by backup service clients.

use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::model::{BackupRecord, BackupScope, DownloadLink, Environment, ListOptions};

/// Remote operations the orchestrator consumes.
///
/// Implementations own transport and authentication; every method reports
/// faults as [`crate::ServiceError`] and never retries on its own.
#[async_trait]
pub trait BackupService: Send + Sync {
    /// Look up an environment, failing when it cannot be confirmed.
    async fn environment(
        &self,
        organization: &str,
        application: &str,
        environment: &str,
    ) -> ServiceResult<Environment>;

    /// Start a new backup.
    async fn create_backup(
        &self,
        scope: &BackupScope,
        description: &str,
    ) -> ServiceResult<BackupRecord>;

    /// List backups in scope.
    async fn list_backups(
        &self,
        scope: &BackupScope,
        options: ListOptions,
    ) -> ServiceResult<Vec<BackupRecord>>;

    /// Request a download URL for a backup.
    async fn download_backup(
        &self,
        scope: &BackupScope,
        backup_id: &str,
    ) -> ServiceResult<DownloadLink>;

    /// Delete a backup.
    async fn delete_backup(&self, scope: &BackupScope, backup_id: &str) -> ServiceResult<()>;

    /// Locally derived download URL used when [`Self::download_backup`] faults.
    fn fallback_download_url(&self, scope: &BackupScope, backup_id: &str) -> String;
}
