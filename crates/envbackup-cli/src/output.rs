//! Action output sink and failure annotations.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::anyhow;
use envbackup_core::ActionOutputs;
use uuid::Uuid;

use crate::client::{CliError, CliResult};

const OUTPUT_FILE_ENV: &str = "GITHUB_OUTPUT";

/// Destination for `key=value` outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OutputSink {
    /// Append to the runner-provided output file.
    File(PathBuf),
    /// Print to stdout when no output file is configured.
    Stdout,
}

impl OutputSink {
    pub(crate) fn from_env() -> Self {
        std::env::var_os(OUTPUT_FILE_ENV)
            .filter(|path| !path.is_empty())
            .map_or(Self::Stdout, |path| Self::File(PathBuf::from(path)))
    }

    pub(crate) fn write(&self, outputs: &ActionOutputs) -> CliResult<()> {
        let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
        let rendered = render(outputs, &delimiter);
        match self {
            Self::File(path) => OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .and_then(|mut file| file.write_all(rendered.as_bytes()))
                .map_err(|err| {
                    CliError::failure(anyhow!(
                        "failed to write outputs to {}: {err}",
                        path.display()
                    ))
                }),
            Self::Stdout => io::stdout()
                .lock()
                .write_all(rendered.as_bytes())
                .map_err(|err| CliError::failure(anyhow!("failed to write outputs: {err}"))),
        }
    }
}

/// Render outputs as runner file commands; multi-line values use heredoc form.
pub(crate) fn render(outputs: &ActionOutputs, delimiter: &str) -> String {
    let mut rendered = String::new();
    for (key, value) in outputs.iter() {
        if value.contains('\n') || value.contains('\r') {
            rendered.push_str(&format!("{key}<<{delimiter}\n{value}\n{delimiter}\n"));
        } else {
            rendered.push_str(&format!("{key}={value}\n"));
        }
    }
    rendered
}

/// Workflow command that marks the run as failed with `message`.
pub(crate) fn error_annotation(message: &str) -> String {
    let escaped = message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A");
    format!("::error::{escaped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use envbackup_core::{BackupRecord, BackupStatus, DownloadLink, OperationOutcome};

    fn created() -> Result<ActionOutputs> {
        Ok(ActionOutputs::from_outcome(&OperationOutcome::Created {
            backup: BackupRecord {
                id: "bk-1".into(),
                description: "nightly".into(),
                status: BackupStatus::InProgress,
                created_at: None,
            },
        })?)
    }

    #[test]
    fn render_single_line_values() -> Result<()> {
        let rendered = render(&created()?, "EOF");
        assert_eq!(
            rendered,
            "success=true\nbackup_id=bk-1\nbackup_status=in_progress\n"
        );
        Ok(())
    }

    #[test]
    fn render_uses_heredoc_for_multiline_values() -> Result<()> {
        let outputs = ActionOutputs::from_outcome(&OperationOutcome::Downloaded {
            link: DownloadLink::issued("https://files.example/bk-1", None),
            resolved: Some(BackupRecord {
                id: "bk-1".into(),
                description: "line one\nline two".into(),
                status: BackupStatus::Completed,
                created_at: None,
            }),
        })?;
        let rendered = render(&outputs, "EOF");
        assert!(rendered.contains("download_url=https://files.example/bk-1\n"));
        assert!(rendered.contains("resolved_backup_name<<EOF\nline one\nline two\nEOF\n"));
        assert!(rendered.contains("resolved_backup_created_at=\n"));
        Ok(())
    }

    #[test]
    fn error_annotation_escapes_control_characters() {
        assert_eq!(
            error_annotation("100% failed\r\nretry"),
            "::error::100%25 failed%0D%0Aretry"
        );
    }

    #[test]
    fn file_sink_appends_outputs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("outputs");
        std::fs::write(&path, "existing=1\n")?;

        let sink = OutputSink::File(path.clone());
        sink.write(&created()?).map_err(|err| anyhow!(err.display_message()))?;
        sink.write(&ActionOutputs::failure())
            .map_err(|err| anyhow!(err.display_message()))?;

        let contents = std::fs::read_to_string(&path)?;
        assert!(contents.starts_with("existing=1\nsuccess=true\nbackup_id=bk-1\n"));
        assert!(contents.ends_with("success=false\n"));
        Ok(())
    }
}
