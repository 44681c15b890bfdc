//! [`BackupService`] over the dashboard REST API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use envbackup_core::{
    BackupRecord, BackupScope, BackupService, DownloadLink, Environment, ListOptions,
    ServiceError, ServiceResult,
};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::classify_problem;

/// REST client addressing backups under a single API base URL.
pub(crate) struct HttpBackupService {
    client: Client,
    base_url: Url,
}

#[derive(Serialize)]
struct CreateBackupBody<'a> {
    description: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Bare(Vec<BackupRecord>),
    Wrapped { backups: Vec<BackupRecord> },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadBody {
    #[serde(default)]
    download_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
}

impl HttpBackupService {
    pub(crate) const fn new(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, segments: &[&str]) -> ServiceResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                ServiceError::invalid_response(format!(
                    "base URL {} cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn backup_url(&self, scope: &BackupScope, tail: &[&str]) -> ServiceResult<Url> {
        let mut segments = vec![
            "organizations",
            scope.organization.as_str(),
            "applications",
            scope.application.as_str(),
            "environments",
            scope.environment.as_str(),
            "backups",
            scope.backup_type.as_str(),
        ];
        segments.extend_from_slice(tail);
        self.endpoint(&segments)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> ServiceResult<reqwest::Response> {
        let response = request
            .send()
            .await
            .map_err(|err| ServiceError::transport(format!("{operation}: {err}")))?;
        debug!(operation, status = %response.status(), "service responded");
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(classify_problem(operation, response).await)
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> ServiceResult<T> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|err| {
                ServiceError::invalid_response(format!("{operation}: unexpected response body: {err}"))
            })
    }
}

#[async_trait]
impl BackupService for HttpBackupService {
    async fn environment(
        &self,
        organization: &str,
        application: &str,
        environment: &str,
    ) -> ServiceResult<Environment> {
        let url = self.endpoint(&[
            "organizations",
            organization,
            "applications",
            application,
            "environments",
            environment,
        ])?;
        self.send("get_environment", self.client.get(url)).await?;
        Ok(Environment {
            organization: organization.to_string(),
            application: application.to_string(),
            name: environment.to_string(),
        })
    }

    async fn create_backup(
        &self,
        scope: &BackupScope,
        description: &str,
    ) -> ServiceResult<BackupRecord> {
        let url = self.backup_url(scope, &[])?;
        let request = self
            .client
            .post(url)
            .json(&CreateBackupBody { description });
        self.send_json("create_backup", request).await
    }

    async fn list_backups(
        &self,
        scope: &BackupScope,
        options: ListOptions,
    ) -> ServiceResult<Vec<BackupRecord>> {
        let mut url = self.backup_url(scope, &[])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(order) = options.order {
                pairs.append_pair("order", order.as_str());
            }
            if let Some(status) = options.status {
                pairs.append_pair("status", status.as_str());
            }
        }
        let body: ListBody = self.send_json("list_backups", self.client.get(url)).await?;
        Ok(match body {
            ListBody::Bare(backups) | ListBody::Wrapped { backups } => backups,
        })
    }

    async fn download_backup(
        &self,
        scope: &BackupScope,
        backup_id: &str,
    ) -> ServiceResult<DownloadLink> {
        let url = self.backup_url(scope, &[backup_id, "download"])?;
        let body: DownloadBody = self
            .send_json("download_backup", self.client.get(url))
            .await?;
        body.download_url
            .or(body.url)
            .filter(|url| !url.trim().is_empty())
            .map(|url| DownloadLink::issued(url, body.expires_at))
            .ok_or_else(|| {
                ServiceError::invalid_response("download_backup: response carried no download URL")
            })
    }

    async fn delete_backup(&self, scope: &BackupScope, backup_id: &str) -> ServiceResult<()> {
        let url = self.backup_url(scope, &[backup_id])?;
        self.send("delete_backup", self.client.delete(url)).await?;
        Ok(())
    }

    fn fallback_download_url(&self, scope: &BackupScope, backup_id: &str) -> String {
        self.backup_url(scope, &[backup_id, "download"])
            .map_or_else(
                |_| {
                    format!(
                        "{}/organizations/{}/applications/{}/environments/{}/backups/{}/{backup_id}/download",
                        self.base_url.as_str().trim_end_matches('/'),
                        scope.organization,
                        scope.application,
                        scope.environment,
                        scope.backup_type
                    )
                },
                String::from,
            )
    }
}
