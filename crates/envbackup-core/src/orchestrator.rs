//! Operation dispatch for a single action invocation.
//!
//! # Design
//!
//! - Validation happens before any remote call.
//! - Every operation but `list` is preceded by the environment guard, which
//!   collapses lookup faults into `EnvironmentNotFound`.
//! - The clock is injected so age-based deletion and default descriptions are
//!   deterministic under test.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{BackupError, BackupResult, ServiceResult};
use crate::model::{
    BackupRecord, BackupRef, BackupScope, DownloadLink, Environment, ListOptions, Operation,
};
use crate::outputs::ActionOutputs;
use crate::poll::wait_for_completion;
use crate::prune::{BulkDeleteOutcome, delete_older_than, delete_one};
use crate::request::{BackupRequest, RawBackupRequest};
use crate::resolve::resolve_latest;
use crate::service::BackupService;

/// Result of whichever operation ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    /// A backup was created (and possibly waited on).
    Created {
        /// Record as last observed.
        backup: BackupRecord,
    },
    /// Backups were listed.
    Listed {
        /// Records in service order.
        backups: Vec<BackupRecord>,
    },
    /// A download URL was obtained.
    Downloaded {
        /// URL and its provenance.
        link: DownloadLink,
        /// Record `latest` resolved to, when used.
        resolved: Option<BackupRecord>,
    },
    /// One or more backups were deleted.
    Deleted {
        /// Per-item results.
        outcome: BulkDeleteOutcome,
        /// Record `latest` resolved to, when used.
        resolved: Option<BackupRecord>,
    },
}

/// Drives one request against a [`BackupService`].
pub struct BackupOrchestrator<'a, S: ?Sized> {
    service: &'a S,
    clock: fn() -> DateTime<Utc>,
}

impl<'a, S> BackupOrchestrator<'a, S>
where
    S: BackupService + ?Sized,
{
    /// Orchestrator using the system clock.
    #[must_use]
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            clock: Utc::now,
        }
    }

    /// Replace the clock used for cutoffs and default descriptions.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate, run, and project a raw request into outputs.
    ///
    /// # Errors
    ///
    /// Any fatal [`BackupError`] raised by validation or the operation.
    pub async fn execute(&self, raw: RawBackupRequest) -> BackupResult<ActionOutputs> {
        let request = raw.validate()?;
        let outcome = self.run(&request).await?;
        ActionOutputs::from_outcome(&outcome)
    }

    /// Run a validated request.
    ///
    /// # Errors
    ///
    /// Any fatal [`BackupError`] raised by the operation.
    pub async fn run(&self, request: &BackupRequest) -> BackupResult<OperationOutcome> {
        let scope = &request.scope;
        if request.operation != Operation::List {
            self.ensure_environment(scope).await?;
        }

        match request.operation {
            Operation::Create => self.create(request).await,
            Operation::List => self.list(request).await,
            Operation::Download => self.download(request).await,
            Operation::Delete => self.delete(request).await,
        }
    }

    async fn ensure_environment(&self, scope: &BackupScope) -> BackupResult<Environment> {
        let environment = self
            .service
            .environment(&scope.organization, &scope.application, &scope.environment)
            .await
            .map_err(|source| BackupError::EnvironmentNotFound {
                environment: scope.environment.clone(),
                source,
            })?;
        info!(environment = %environment.name, "environment exists");
        Ok(environment)
    }

    async fn create(&self, request: &BackupRequest) -> BackupResult<OperationOutcome> {
        let scope = &request.scope;
        let description = request.description.clone().unwrap_or_else(|| {
            format!(
                "backup-{}-{}",
                scope.environment,
                (self.clock)().timestamp_millis()
            )
        });

        info!(
            backup_type = %scope.backup_type,
            environment = %scope.environment,
            "creating backup"
        );
        let backup = self
            .service
            .create_backup(scope, &description)
            .await
            .map_err(|source| BackupError::service("create_backup", source))?;
        info!(backup_id = %backup.id, status = %backup.status, "backup created");

        let backup = match request.wait {
            Some(settings) => wait_for_completion(self.service, scope, backup, settings).await?,
            None => backup,
        };

        Ok(OperationOutcome::Created { backup })
    }

    async fn list(&self, request: &BackupRequest) -> BackupResult<OperationOutcome> {
        let scope = &request.scope;
        info!(environment = %scope.environment, "listing backups");

        let options = ListOptions {
            order: Some(request.sort_order),
            status: request.status_filter,
        };
        let backups = self
            .service
            .list_backups(scope, options)
            .await
            .map_err(|source| BackupError::service("list_backups", source))?;

        info!(count = backups.len(), "found backups");
        for (index, backup) in backups.iter().enumerate() {
            info!(
                "  {}. ID: {}, Name: {}, Status: {}, Created: {}",
                index + 1,
                backup.id,
                backup.description,
                backup.status,
                backup
                    .created_at
                    .map_or_else(|| "unknown".to_string(), |created| created.to_rfc3339())
            );
        }

        Ok(OperationOutcome::Listed { backups })
    }

    async fn download(&self, request: &BackupRequest) -> BackupResult<OperationOutcome> {
        let scope = &request.scope;
        let target = request.target.as_ref().ok_or_else(|| {
            BackupError::invalid_input("backup_id", "backup_id is required for download operation")
        })?;
        let (backup_id, resolved) = self.resolve_target(scope, target).await?;

        info!(backup_id = %backup_id, environment = %scope.environment, "downloading backup");
        let link = download_or_fallback(
            self.service.download_backup(scope, &backup_id).await,
            || self.service.fallback_download_url(scope, &backup_id),
        );
        info!(url = %link.url, source = ?link.source, "download URL obtained");

        Ok(OperationOutcome::Downloaded { link, resolved })
    }

    async fn delete(&self, request: &BackupRequest) -> BackupResult<OperationOutcome> {
        let scope = &request.scope;
        match (&request.target, request.older_than_days) {
            (Some(target), older_than_days) => {
                if older_than_days.is_some() {
                    warn!("backup_id supplied; ignoring older_than_days");
                }
                let (backup_id, resolved) = self.resolve_target(scope, target).await?;
                let outcome = delete_one(self.service, scope, &backup_id).await?;
                Ok(OperationOutcome::Deleted { outcome, resolved })
            }
            (None, Some(days)) => {
                let outcome = delete_older_than(self.service, scope, days, (self.clock)()).await?;
                Ok(OperationOutcome::Deleted {
                    outcome,
                    resolved: None,
                })
            }
            (None, None) => Err(BackupError::invalid_input(
                "backup_id",
                "Either backup_id or older_than_days is required for delete operation",
            )),
        }
    }

    async fn resolve_target(
        &self,
        scope: &BackupScope,
        target: &BackupRef,
    ) -> BackupResult<(String, Option<BackupRecord>)> {
        match target {
            BackupRef::ById(id) => Ok((id.clone(), None)),
            BackupRef::Latest => {
                let record = resolve_latest(self.service, scope).await?;
                Ok((record.id.clone(), Some(record)))
            }
        }
    }
}

/// Keep the issued link, or fall back to a constructed one when the call failed.
fn download_or_fallback(
    issued: ServiceResult<DownloadLink>,
    fallback: impl FnOnce() -> String,
) -> DownloadLink {
    match issued {
        Ok(link) => link,
        Err(err) => {
            warn!(error = %err, "download request failed; using constructed download URL");
            DownloadLink::constructed(fallback())
        }
    }
}
