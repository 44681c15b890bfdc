//! Scripted in-memory backup service.

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use envbackup_core::{
    BackupRecord, BackupScope, BackupService, BackupStatus, DownloadLink, Environment,
    ListOptions, ServiceError, ServiceResult,
};
use tokio::sync::Mutex;

/// Base URL the fake derives fallback download URLs from.
pub const FAKE_BASE_URL: &str = "https://api.example.test/v3";

/// Calls made against the fake, per capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// Environment lookups.
    pub environment: usize,
    /// Backup creations.
    pub create: usize,
    /// Listing calls.
    pub list: usize,
    /// Download URL requests.
    pub download: usize,
    /// Deletions, including failed ones.
    pub delete: usize,
}

impl CallCounts {
    /// Total remote calls.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.environment + self.create + self.list + self.download + self.delete
    }
}

#[derive(Default)]
struct State {
    backups: Vec<BackupRecord>,
    list_script: VecDeque<ServiceResult<Vec<BackupRecord>>>,
    delete_failures: BTreeMap<String, ServiceError>,
    download_fault: Option<ServiceError>,
    created: Option<BackupRecord>,
    deleted: Vec<String>,
    list_options: Vec<ListOptions>,
    calls: CallCounts,
}

/// [`BackupService`] fake with scripted listings and injectable faults.
///
/// Listing calls consume the scripted responses first and then fall back to
/// the stored backups.
pub struct ScriptedBackupService {
    environments: Vec<(String, String, String)>,
    base_url: String,
    state: Mutex<State>,
}

impl Default for ScriptedBackupService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBackupService {
    /// Empty service that knows no environments.
    #[must_use]
    pub fn new() -> Self {
        Self {
            environments: Vec::new(),
            base_url: FAKE_BASE_URL.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Register an existing environment.
    #[must_use]
    pub fn with_environment(mut self, organization: &str, application: &str, name: &str) -> Self {
        self.environments.push((
            organization.to_string(),
            application.to_string(),
            name.to_string(),
        ));
        self
    }

    /// Seed stored backups.
    #[must_use]
    pub fn with_backups(mut self, backups: impl IntoIterator<Item = BackupRecord>) -> Self {
        self.state.get_mut().backups.extend(backups);
        self
    }

    /// Record returned by the next creation.
    #[must_use]
    pub fn with_created(mut self, record: BackupRecord) -> Self {
        self.state.get_mut().created = Some(record);
        self
    }

    /// Queue listing responses, consumed one per call.
    #[must_use]
    pub fn script_list(
        mut self,
        responses: impl IntoIterator<Item = ServiceResult<Vec<BackupRecord>>>,
    ) -> Self {
        self.state.get_mut().list_script.extend(responses);
        self
    }

    /// Make deletion of `backup_id` fail with `error`.
    #[must_use]
    pub fn fail_delete(mut self, backup_id: &str, error: ServiceError) -> Self {
        self.state
            .get_mut()
            .delete_failures
            .insert(backup_id.to_string(), error);
        self
    }

    /// Make every download request fail with `error`.
    #[must_use]
    pub fn fail_download(mut self, error: ServiceError) -> Self {
        self.state.get_mut().download_fault = Some(error);
        self
    }

    /// Calls made so far.
    pub async fn calls(&self) -> CallCounts {
        self.state.lock().await.calls
    }

    /// Ids deleted so far, in call order.
    pub async fn deleted_ids(&self) -> Vec<String> {
        self.state.lock().await.deleted.clone()
    }

    /// Options passed to each listing call.
    pub async fn list_options(&self) -> Vec<ListOptions> {
        self.state.lock().await.list_options.clone()
    }

    /// Backups still stored.
    pub async fn backups(&self) -> Vec<BackupRecord> {
        self.state.lock().await.backups.clone()
    }

    fn knows(&self, organization: &str, application: &str, environment: &str) -> bool {
        self.environments.iter().any(|(org, app, env)| {
            org == organization && app == application && env == environment
        })
    }
}

#[async_trait]
impl BackupService for ScriptedBackupService {
    async fn environment(
        &self,
        organization: &str,
        application: &str,
        environment: &str,
    ) -> ServiceResult<Environment> {
        self.state.lock().await.calls.environment += 1;
        if self.knows(organization, application, environment) {
            Ok(Environment {
                organization: organization.to_string(),
                application: application.to_string(),
                name: environment.to_string(),
            })
        } else {
            Err(ServiceError::rejected(
                404,
                Some(format!("Environment {environment} not found")),
                "get_environment returned status 404",
            ))
        }
    }

    async fn create_backup(
        &self,
        _scope: &BackupScope,
        description: &str,
    ) -> ServiceResult<BackupRecord> {
        let mut state = self.state.lock().await;
        state.calls.create += 1;
        let record = state.created.clone().unwrap_or_else(|| BackupRecord {
            id: format!("backup-{}", state.calls.create),
            description: description.to_string(),
            status: BackupStatus::InProgress,
            created_at: None,
        });
        state.backups.push(record.clone());
        Ok(record)
    }

    async fn list_backups(
        &self,
        _scope: &BackupScope,
        options: ListOptions,
    ) -> ServiceResult<Vec<BackupRecord>> {
        let mut state = self.state.lock().await;
        state.calls.list += 1;
        state.list_options.push(options);
        if let Some(response) = state.list_script.pop_front() {
            return response;
        }
        Ok(state
            .backups
            .iter()
            .filter(|record| options.status.is_none_or(|filter| filter.matches(record.status)))
            .cloned()
            .collect())
    }

    async fn download_backup(
        &self,
        _scope: &BackupScope,
        backup_id: &str,
    ) -> ServiceResult<DownloadLink> {
        let mut state = self.state.lock().await;
        state.calls.download += 1;
        if let Some(fault) = &state.download_fault {
            return Err(fault.clone());
        }
        Ok(DownloadLink::issued(
            format!("https://downloads.example.test/{backup_id}"),
            None,
        ))
    }

    async fn delete_backup(&self, _scope: &BackupScope, backup_id: &str) -> ServiceResult<()> {
        let mut state = self.state.lock().await;
        state.calls.delete += 1;
        if let Some(fault) = state.delete_failures.get(backup_id) {
            return Err(fault.clone());
        }
        state.backups.retain(|record| record.id != backup_id);
        state.deleted.push(backup_id.to_string());
        Ok(())
    }

    fn fallback_download_url(&self, scope: &BackupScope, backup_id: &str) -> String {
        format!(
            "{}/organizations/{}/applications/{}/environments/{}/backups/{}/{backup_id}/download",
            self.base_url,
            scope.organization,
            scope.application,
            scope.environment,
            scope.backup_type
        )
    }
}
