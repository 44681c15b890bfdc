//! Argument parsing, logging setup, and dispatch for one action run.
//!
//! The runner exports every declared input, so unset inputs arrive as empty
//! strings. Inputs are therefore taken as raw text and blank values fall back
//! to their defaults before any typed parsing.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use envbackup_core::poll::{DEFAULT_MAX_RETRIES, DEFAULT_WAIT_INTERVAL_SECS};
use envbackup_core::{ActionOutputs, BackupOrchestrator, RawBackupRequest};
use envbackup_telemetry::{
    DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging, run_span,
};
use reqwest::Url;
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::client::{CliError, CliResult, build_client, parse_url};
use crate::http::HttpBackupService;
use crate::output::{OutputSink, error_annotation};

const DEFAULT_BASE_URL: &str = "https://dashboard.quantcdn.io/api/v3";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_OPERATION: &str = "create";

/// Parses inputs, executes the requested operation, and publishes outputs.
/// Returns the process exit code.
pub async fn run() -> i32 {
    let sink = OutputSink::from_env();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if !err.use_stderr() => {
            let _ = err.print();
            return 0;
        }
        Err(err) => {
            let rendered = err.to_string();
            return report_failure(&CliError::validation(rendered.trim()), &sink);
        }
    };

    let format = match cli.log_format() {
        Ok(format) => format.unwrap_or_else(LogFormat::infer),
        Err(err) => return report_failure(&err, &sink),
    };
    let logging = LoggingConfig {
        level: DEFAULT_LOG_LEVEL,
        format,
        build_sha: option_env!("ENVBACKUP_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: {err}");
    }

    execute(cli, &sink).await
}

pub(crate) async fn execute(cli: Cli, sink: &OutputSink) -> i32 {
    let trace_id = Uuid::new_v4().to_string();
    let span = run_span(cli.operation_name(), &trace_id);

    match dispatch(cli, &trace_id).instrument(span).await {
        // Outputs are written once per run; a failed write is only annotated.
        Ok(outputs) => match sink.write(&outputs) {
            Ok(()) => 0,
            Err(err) => annotate_failure(&err),
        },
        Err(err) => report_failure(&err, sink),
    }
}

async fn dispatch(cli: Cli, trace_id: &str) -> CliResult<ActionOutputs> {
    let invocation = cli.into_invocation()?;
    let client = build_client(&invocation.api_key, trace_id, invocation.timeout)?;
    let service = HttpBackupService::new(client, invocation.base_url.clone());
    info!(base_url = %invocation.base_url, "using API endpoint");

    let outputs = BackupOrchestrator::new(&service)
        .execute(invocation.request)
        .await?;
    Ok(outputs)
}

fn report_failure(err: &CliError, sink: &OutputSink) -> i32 {
    if let Err(write_err) = sink.write(&ActionOutputs::failure()) {
        warn!(error = %write_err.display_message(), "failed to record failure outputs");
    }
    annotate_failure(err)
}

fn annotate_failure(err: &CliError) -> i32 {
    let message = err.display_message();
    error!(error = %message, "backup operation failed");
    println!("{}", error_annotation(&message));
    err.exit_code()
}

fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Trimmed input, or `None` when unset or blank.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Parse an input that may be blank; blank means "use the default".
fn parse_optional<T>(field: &str, value: Option<&str>) -> CliResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    present(value)
        .map(|raw| {
            raw.parse::<T>().map_err(|err| {
                CliError::validation(format!("invalid value '{raw}' for {field}: {err}"))
            })
        })
        .transpose()
}

fn resolve_base_url(value: Option<&str>) -> CliResult<Url> {
    parse_url(present(value).unwrap_or(DEFAULT_BASE_URL)).map_err(CliError::validation)
}

/// Inputs as supplied by the runner or the command line. Every value is
/// optional text; see [`Cli::into_invocation`] for defaults.
#[derive(Parser, Debug)]
#[command(
    name = "envbackup",
    version,
    about = "Create, list, download, and delete environment backups"
)]
pub(crate) struct Cli {
    /// API token sent as the bearer credential.
    #[arg(long, env = "INPUT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[arg(long, env = "INPUT_ORGANIZATION")]
    organization: Option<String>,
    #[arg(long, env = "INPUT_APP_NAME")]
    app_name: Option<String>,
    #[arg(long, env = "INPUT_ENVIRONMENT_NAME")]
    environment_name: Option<String>,
    /// One of create, list, download, delete [default: create].
    #[arg(long, env = "INPUT_OPERATION")]
    operation: Option<String>,
    /// Description for a new backup.
    #[arg(long, env = "INPUT_BACKUP_NAME")]
    backup_name: Option<String>,
    /// Backup identifier, or `latest` for the newest backup.
    #[arg(long, env = "INPUT_BACKUP_ID")]
    backup_id: Option<String>,
    /// Delete backups created more than this many days ago.
    #[arg(long, env = "INPUT_OLDER_THAN_DAYS")]
    older_than_days: Option<String>,
    /// asc or desc [default: desc].
    #[arg(long, env = "INPUT_SORT_ORDER")]
    sort_order: Option<String>,
    /// Only list backups with this status (completed, failed, running).
    #[arg(long, env = "INPUT_FILTER_STATUS")]
    filter_status: Option<String>,
    /// Backup type: database or filesystem [default: database].
    #[arg(long = "type", env = "INPUT_TYPE")]
    backup_type: Option<String>,
    /// Wait for a created backup to finish when `true`.
    #[arg(long, env = "INPUT_WAIT")]
    wait: Option<String>,
    /// Seconds between status checks while waiting [default: 10].
    #[arg(long, env = "INPUT_WAIT_INTERVAL")]
    wait_interval: Option<String>,
    /// Status checks allowed after the first one while waiting [default: 30].
    #[arg(long, env = "INPUT_MAX_RETRIES")]
    max_retries: Option<String>,
    /// API base URL [default: https://dashboard.quantcdn.io/api/v3].
    #[arg(long, env = "INPUT_BASE_URL")]
    base_url: Option<String>,
    /// HTTP timeout in seconds [default: 30].
    #[arg(long, env = "INPUT_TIMEOUT")]
    timeout: Option<String>,
    /// Log output format: json, pretty, or compact.
    #[arg(long, env = "INPUT_LOG_FORMAT")]
    log_format: Option<String>,
}

/// Fully parsed inputs for one run.
#[derive(Debug)]
struct Invocation {
    api_key: String,
    base_url: Url,
    timeout: Duration,
    request: RawBackupRequest,
}

impl Cli {
    fn operation_name(&self) -> &str {
        present(self.operation.as_deref()).unwrap_or(DEFAULT_OPERATION)
    }

    fn log_format(&self) -> CliResult<Option<LogFormat>> {
        parse_optional("log_format", self.log_format.as_deref())
    }

    fn into_invocation(self) -> CliResult<Invocation> {
        let older_than_days = parse_optional("older_than_days", self.older_than_days.as_deref())?;
        let wait_interval_secs = parse_optional("wait_interval", self.wait_interval.as_deref())?
            .unwrap_or(DEFAULT_WAIT_INTERVAL_SECS);
        let max_retries = parse_optional("max_retries", self.max_retries.as_deref())?
            .unwrap_or(DEFAULT_MAX_RETRIES);
        let timeout_secs = parse_optional("timeout", self.timeout.as_deref())?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let base_url = resolve_base_url(self.base_url.as_deref())?;
        let api_key = present(self.api_key.as_deref())
            .map(str::to_owned)
            .ok_or_else(|| CliError::validation("api_key is required"))?;

        let request = RawBackupRequest {
            operation: self.operation,
            organization: self.organization.unwrap_or_default(),
            application: self.app_name.unwrap_or_default(),
            environment: self.environment_name.unwrap_or_default(),
            backup_type: self.backup_type,
            backup_id: self.backup_id,
            backup_name: self.backup_name,
            older_than_days,
            sort_order: self.sort_order,
            filter_status: self.filter_status,
            wait: self.wait.as_deref().is_some_and(parse_flag),
            wait_interval_secs,
            max_retries,
        };

        Ok(Invocation {
            api_key,
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::path::Path;

    const ENV_PATH: &str = "/api/v3/organizations/acme/applications/shop/environments/production";

    fn cli_for(server: &MockServer, extra: &[&str]) -> Result<Cli> {
        let base_url = server.url("/api/v3");
        let mut args = vec![
            "envbackup",
            "--api-key",
            "secret-token",
            "--organization",
            "acme",
            "--app-name",
            "shop",
            "--environment-name",
            "production",
            "--base-url",
            base_url.as_str(),
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).map_err(|err| anyhow!(err.to_string()))
    }

    fn sink_in(dir: &Path) -> OutputSink {
        OutputSink::File(dir.join("outputs"))
    }

    fn read_outputs(dir: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(dir.join("outputs"))?)
    }

    fn mock_environment(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(GET)
                .path(ENV_PATH)
                .header("authorization", "Bearer secret-token")
                .header_exists("x-request-id");
            then.status(200).json_body(json!({"name": "production"}));
        })
    }

    fn parse(args: &[&str]) -> Result<Cli> {
        Cli::try_parse_from(args).map_err(|err| anyhow!(err.to_string()))
    }

    fn invocation(args: &[&str]) -> Result<Invocation> {
        parse(args)?
            .into_invocation()
            .map_err(|err| anyhow!(err.display_message()))
    }

    #[test]
    fn defaults_match_action_inputs() -> Result<()> {
        let invocation = invocation(&["envbackup", "--api-key", "secret-token"])?;
        assert_eq!(invocation.api_key, "secret-token");
        assert_eq!(invocation.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(invocation.timeout, Duration::from_secs(30));

        let request = invocation.request;
        assert!(request.operation.is_none());
        assert!(request.older_than_days.is_none());
        assert_eq!(request.wait_interval_secs, 10);
        assert_eq!(request.max_retries, 30);
        assert!(!request.wait);
        assert!(request.organization.is_empty());
        Ok(())
    }

    #[test]
    fn blank_inputs_fall_back_to_defaults() -> Result<()> {
        let invocation = invocation(&[
            "envbackup",
            "--api-key",
            "secret-token",
            "--operation",
            "",
            "--older-than-days",
            "",
            "--sort-order",
            " ",
            "--type",
            "",
            "--wait",
            "",
            "--wait-interval",
            "",
            "--max-retries",
            "",
            "--base-url",
            "",
            "--timeout",
            "",
            "--log-format",
            "",
        ])?;
        assert_eq!(invocation.base_url.as_str(), DEFAULT_BASE_URL);
        assert_eq!(invocation.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(invocation.request.older_than_days, None);
        assert_eq!(invocation.request.wait_interval_secs, DEFAULT_WAIT_INTERVAL_SECS);
        assert_eq!(invocation.request.max_retries, DEFAULT_MAX_RETRIES);
        assert!(!invocation.request.wait);
        Ok(())
    }

    #[test]
    fn blank_operation_and_log_format_use_defaults() -> Result<()> {
        let cli = parse(&["envbackup", "--operation", "", "--log-format", "  "])?;
        assert_eq!(cli.operation_name(), "create");
        assert!(matches!(cli.log_format(), Ok(None)));
        Ok(())
    }

    #[test]
    fn malformed_numeric_input_is_invalid() -> Result<()> {
        let err = parse(&["envbackup", "--api-key", "k", "--wait-interval", "soon"])?
            .into_invocation()
            .expect_err("non-numeric interval");
        assert_eq!(err.exit_code(), 2);
        assert!(err.display_message().contains("wait_interval"));

        let err = parse(&["envbackup", "--api-key", "k", "--older-than-days", "-3"])?
            .into_invocation()
            .expect_err("negative age");
        assert!(err.display_message().contains("older_than_days"));

        let err = parse(&["envbackup", "--api-key", "k", "--base-url", "not a url"])?
            .into_invocation()
            .expect_err("bad base url");
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[test]
    fn wait_flag_accepts_only_true() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" TRUE "));
        assert!(!parse_flag("yes"));
        assert!(!parse_flag("false"));
    }

    #[test]
    fn log_format_input_is_validated() -> Result<()> {
        let cli = parse(&["envbackup", "--log-format", "json"])?;
        assert!(matches!(cli.log_format(), Ok(Some(LogFormat::Json))));

        let cli = parse(&["envbackup", "--log-format", "xml"])?;
        let err = cli.log_format().expect_err("unknown format");
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn list_with_blank_optional_inputs_succeeds() -> Result<()> {
        let server = MockServer::start_async().await;
        let environment = mock_environment(&server);
        let list = server.mock(|when, then| {
            when.method(GET)
                .path(format!("{ENV_PATH}/backups/database"))
                .query_param("order", "desc");
            then.status(200).json_body(json!([
                {"id": "bk-1", "name": "nightly", "status": "completed", "createdAt": "2024-01-15T10:00:00Z"}
            ]));
        });
        let dir = tempfile::tempdir()?;

        let cli = cli_for(
            &server,
            &[
                "--operation",
                "list",
                "--older-than-days",
                "",
                "--sort-order",
                "",
                "--filter-status",
                "",
                "--type",
                "",
                "--wait",
                "",
                "--wait-interval",
                "",
                "--max-retries",
                "",
                "--timeout",
                "",
                "--log-format",
                "",
            ],
        )?;
        let code = execute(cli, &sink_in(dir.path())).await;

        assert_eq!(code, 0);
        let outputs = read_outputs(dir.path())?;
        assert!(outputs.starts_with("success=true\n"));
        assert!(outputs.contains("backup_list=[{\"id\":\"bk-1\""));
        environment.assert();
        list.assert();
        Ok(())
    }

    #[tokio::test]
    async fn unwritable_outputs_are_not_followed_by_failure_record() -> Result<()> {
        let server = MockServer::start_async().await;
        let environment = mock_environment(&server);
        let create = server.mock(|when, then| {
            when.method(POST).path(format!("{ENV_PATH}/backups/database"));
            then.status(201)
                .json_body(json!({"id": "bk-9", "status": "in_progress"}));
        });
        let dir = tempfile::tempdir()?;

        let cli = cli_for(&server, &[])?;
        let code = execute(cli, &OutputSink::File(dir.path().to_path_buf())).await;

        assert_eq!(code, 3);
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
        environment.assert();
        create.assert();
        Ok(())
    }

    #[tokio::test]
    async fn create_publishes_backup_id() -> Result<()> {
        let server = MockServer::start_async().await;
        let environment = mock_environment(&server);
        let create = server.mock(|when, then| {
            when.method(POST)
                .path(format!("{ENV_PATH}/backups/database"))
                .json_body(json!({"description": "nightly"}));
            then.status(201)
                .json_body(json!({"id": "bk-9", "status": "in_progress"}));
        });
        let dir = tempfile::tempdir()?;

        let cli = cli_for(&server, &["--backup-name", "nightly"])?;
        let code = execute(cli, &sink_in(dir.path())).await;

        assert_eq!(code, 0);
        assert_eq!(
            read_outputs(dir.path())?,
            "success=true\nbackup_id=bk-9\nbackup_status=in_progress\n"
        );
        environment.assert();
        create.assert();
        Ok(())
    }

    #[tokio::test]
    async fn download_latest_publishes_resolution() -> Result<()> {
        let server = MockServer::start_async().await;
        let environment = mock_environment(&server);
        let list = server.mock(|when, then| {
            when.method(GET)
                .path(format!("{ENV_PATH}/backups/filesystem"))
                .query_param("order", "desc");
            then.status(200).json_body(json!([
                {"id": "bk-old", "name": "old", "status": "completed", "createdAt": "2024-01-14T10:00:00Z"},
                {"id": "bk-new", "name": "new", "status": "completed", "createdAt": "2024-01-15T10:00:00Z"}
            ]));
        });
        let download = server.mock(|when, then| {
            when.method(GET)
                .path(format!("{ENV_PATH}/backups/filesystem/bk-new/download"));
            then.status(200)
                .json_body(json!({"downloadUrl": "https://files.example/bk-new"}));
        });
        let dir = tempfile::tempdir()?;

        let cli = cli_for(
            &server,
            &["--operation", "download", "--type", "filesystem", "--backup-id", "latest"],
        )?;
        let code = execute(cli, &sink_in(dir.path())).await;

        assert_eq!(code, 0);
        let outputs = read_outputs(dir.path())?;
        assert!(outputs.contains("download_url=https://files.example/bk-new\n"));
        assert!(outputs.contains("resolved_backup_id=bk-new\n"));
        assert!(outputs.contains("resolved_backup_name=new\n"));
        assert!(outputs.contains("resolved_backup_created_at=2024-01-15T10:00:00+00:00\n"));
        environment.assert();
        list.assert();
        download.assert();
        Ok(())
    }

    #[tokio::test]
    async fn invalid_input_fails_without_remote_calls() -> Result<()> {
        let server = MockServer::start_async().await;
        let environment = mock_environment(&server);
        let dir = tempfile::tempdir()?;

        let cli = cli_for(&server, &["--operation", "download"])?;
        let code = execute(cli, &sink_in(dir.path())).await;

        assert_eq!(code, 2);
        assert_eq!(read_outputs(dir.path())?, "success=false\n");
        environment.assert_hits(0);
        Ok(())
    }

    #[tokio::test]
    async fn missing_api_key_is_invalid_input() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let cli = parse(&["envbackup", "--operation", "list", "--api-key", " "])?;

        let code = execute(cli, &sink_in(dir.path())).await;
        assert_eq!(code, 2);
        assert_eq!(read_outputs(dir.path())?, "success=false\n");
        Ok(())
    }

    #[tokio::test]
    async fn missing_environment_fails_operation() -> Result<()> {
        let server = MockServer::start_async().await;
        let environment = server.mock(|when, then| {
            when.method(GET).path(ENV_PATH);
            then.status(404).json_body(json!({"message": "Not found"}));
        });
        let dir = tempfile::tempdir()?;

        let cli = cli_for(&server, &["--operation", "delete", "--older-than-days", "7"])?;
        let code = execute(cli, &sink_in(dir.path())).await;

        assert_eq!(code, 3);
        assert_eq!(read_outputs(dir.path())?, "success=false\n");
        environment.assert();
        Ok(())
    }
}
