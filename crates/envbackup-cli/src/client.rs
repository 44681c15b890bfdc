//! Shared HTTP client construction, error types, and response classification.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use envbackup_core::{BackupError, ServiceError};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::Deserialize;

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => error
                .downcast_ref::<BackupError>()
                .map_or_else(|| format!("{error:#}"), BackupError::display_message),
        }
    }
}

impl From<BackupError> for CliError {
    fn from(err: BackupError) -> Self {
        if err.is_invalid_input() {
            Self::Validation(err.to_string())
        } else {
            Self::Failure(err.into())
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Build the HTTP client shared by every call of one run.
pub(crate) fn build_client(api_key: &str, trace_id: &str, timeout: Duration) -> CliResult<Client> {
    let mut default_headers = HeaderMap::new();

    let mut authorization = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
        .map_err(|_| CliError::validation("api_key contains invalid characters"))?;
    authorization.set_sensitive(true);
    default_headers.insert(AUTHORIZATION, authorization);

    let request_id = HeaderValue::from_str(trace_id)
        .map_err(|_| CliError::failure(anyhow!("trace identifier contains invalid characters")))?;
    default_headers.insert(HEADER_REQUEST_ID, request_id);
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("envbackup/", env!("CARGO_PKG_VERSION")))
        .default_headers(default_headers)
        .build()
        .map_err(|err| CliError::failure(anyhow!("failed to build HTTP client: {err}")))
}

/// Parse the API base URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    let url = input
        .trim()
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))?;
    if url.cannot_be_a_base() {
        return Err(format!("invalid URL '{input}': must be an http(s) base URL"));
    }
    Ok(url)
}

#[derive(Deserialize)]
struct RemoteProblem {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Classify a non-success HTTP response into a service fault.
pub(crate) async fn classify_problem(operation: &str, response: reqwest::Response) -> ServiceError {
    let status = response.status();
    let bytes = response.bytes().await.unwrap_or_default();
    let body_text = String::from_utf8_lossy(&bytes).trim().to_string();

    let message = serde_json::from_slice::<RemoteProblem>(&bytes)
        .ok()
        .and_then(|problem| problem.message.or(problem.error))
        .filter(|message| !message.trim().is_empty());

    let detail = match (&message, body_text.is_empty()) {
        (Some(message), _) => format!("{operation}: {message} (status {status})"),
        (None, false) => format!("{operation}: {body_text} (status {status})"),
        (None, true) => format!("{operation}: request failed with status {status}"),
    };
    ServiceError::rejected(status.as_u16(), message, detail)
}
