//! Completion polling for freshly created backups.
//!
//! # Design
//!
//! - `transition` is a pure function over (`PollPhase`, `Observation`); the
//!   driver loop owns sleeping and I/O.
//! - Status is observed by listing the scope and matching on id.
//! - Only a `failed` status or an exhausted retry budget ends the wait with
//!   an error; query faults and missing records just cost an attempt.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{BackupError, BackupResult};
use crate::model::{BackupRecord, BackupScope, BackupStatus, ListOptions, SortOrder};
use crate::service::BackupService;

/// Seconds between status queries unless configured otherwise.
pub const DEFAULT_WAIT_INTERVAL_SECS: u64 = 10;
/// Retries allowed after the first status query unless configured otherwise.
pub const DEFAULT_MAX_RETRIES: u32 = 30;

/// Timing and budget for a wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay between status queries.
    pub interval: Duration,
    /// Retries allowed after the first query.
    pub max_retries: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_WAIT_INTERVAL_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Phase of a completion wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// Backup still executing.
    Running,
    /// Backup not visible in the listing yet; treated like `Running`.
    Unknown,
    /// Backup finished successfully.
    Completed,
    /// Backup reported failure.
    Failed,
    /// Retry budget exhausted.
    TimedOut,
}

impl PollPhase {
    /// Whether the wait is over.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// Result of one status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The record was listed with this status.
    Status(BackupStatus),
    /// The listing did not contain the record.
    Missing,
    /// The listing call itself failed.
    Fault,
}

/// Advance the wait given one observation. Terminal phases are absorbing.
#[must_use]
pub const fn transition(current: PollPhase, observed: Observation) -> PollPhase {
    if current.is_terminal() {
        return current;
    }
    match observed {
        Observation::Status(BackupStatus::Completed) => PollPhase::Completed,
        Observation::Status(BackupStatus::Failed) => PollPhase::Failed,
        Observation::Status(_) => PollPhase::Running,
        Observation::Missing => PollPhase::Unknown,
        Observation::Fault => current,
    }
}

/// Bookkeeping for a single create-and-wait call.
#[derive(Debug, Clone)]
pub struct PollState {
    /// Backup being waited on.
    pub target_backup_id: String,
    /// Non-terminal cycles counted so far.
    pub attempts_made: u32,
    /// Cycles allowed before timing out.
    pub max_attempts: u32,
    /// Delay between cycles.
    pub interval: Duration,
    /// Most recent status seen in a listing.
    pub last_known_status: Option<BackupStatus>,
    phase: PollPhase,
}

impl PollState {
    /// Fresh state in the `Running` phase.
    #[must_use]
    pub fn new(target_backup_id: impl Into<String>, settings: PollSettings) -> Self {
        Self {
            target_backup_id: target_backup_id.into(),
            attempts_made: 0,
            max_attempts: settings.max_retries,
            interval: settings.interval,
            last_known_status: None,
            phase: PollPhase::Running,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Apply an observation and return the new phase.
    pub fn observe(&mut self, observation: Observation) -> PollPhase {
        if let Observation::Status(status) = observation {
            self.last_known_status = Some(status);
        }
        self.phase = transition(self.phase, observation);
        self.phase
    }

    /// Count a non-terminal cycle, moving to `TimedOut` once the budget is spent.
    pub fn record_attempt(&mut self) -> PollPhase {
        self.attempts_made = self.attempts_made.saturating_add(1);
        if !self.phase.is_terminal() && self.attempts_made > self.max_attempts {
            self.phase = PollPhase::TimedOut;
        }
        self.phase
    }

    /// Sleep time implied by the attempts counted so far.
    #[must_use]
    pub fn waited(&self) -> Duration {
        self.interval.saturating_mul(self.attempts_made)
    }
}

/// Block until `initial` reaches a terminal status or the budget runs out.
///
/// Returns the record as last observed by the service.
///
/// # Errors
///
/// [`BackupError::BackupFailed`] when the service reports `failed`, and
/// [`BackupError::BackupTimedOut`] once more than `max_retries` retries were
/// needed.
pub async fn wait_for_completion<S>(
    service: &S,
    scope: &BackupScope,
    initial: BackupRecord,
    settings: PollSettings,
) -> BackupResult<BackupRecord>
where
    S: BackupService + ?Sized,
{
    let mut state = PollState::new(initial.id.clone(), settings);
    let options = ListOptions {
        order: Some(SortOrder::Desc),
        status: None,
    };
    info!(
        backup_id = %state.target_backup_id,
        max_retries = state.max_attempts,
        interval_secs = state.interval.as_secs(),
        "waiting for backup to complete"
    );

    loop {
        let (observation, observed) = match service.list_backups(scope, options).await {
            Ok(records) => records
                .into_iter()
                .find(|record| record.id == state.target_backup_id)
                .map_or((Observation::Missing, None), |record| {
                    (Observation::Status(record.status), Some(record))
                }),
            Err(err) => {
                warn!(
                    backup_id = %state.target_backup_id,
                    error = %err,
                    "failed to check backup status; retrying"
                );
                (Observation::Fault, None)
            }
        };

        match state.observe(observation) {
            PollPhase::Completed => {
                info!(backup_id = %state.target_backup_id, "backup completed");
                return Ok(observed.unwrap_or(initial));
            }
            PollPhase::Failed => {
                return Err(BackupError::BackupFailed {
                    backup_id: state.target_backup_id,
                });
            }
            PollPhase::Unknown => {
                debug!(backup_id = %state.target_backup_id, "backup not listed yet");
            }
            phase => {
                info!(
                    backup_id = %state.target_backup_id,
                    status = state.last_known_status.map_or("unknown", BackupStatus::as_str),
                    phase = ?phase,
                    "backup in progress"
                );
            }
        }

        if state.record_attempt() == PollPhase::TimedOut {
            return Err(BackupError::BackupTimedOut {
                waited_secs: state.waited().as_secs(),
                attempts: state.attempts_made,
                backup_id: state.target_backup_id,
            });
        }

        sleep(state.interval).await;
    }
}
