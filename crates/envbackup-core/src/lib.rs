#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

//! Backup orchestration for deployed application environments.
//!
//! Layout:
//! - `model/`: value types exchanged with the backup service
//! - `request.rs`: raw input validation into a [`BackupRequest`]
//! - `service/`: the [`BackupService`] capability trait
//! - `resolve.rs`: `latest` resolution
//! - `prune.rs`: single and age-based deletion
//! - `poll.rs`: completion polling state machine
//! - `orchestrator.rs`: dispatch across the four operations
//! - `outputs.rs`: flat output record projection

pub mod error;
pub mod model;
pub mod orchestrator;
pub mod outputs;
pub mod poll;
pub mod prune;
pub mod request;
pub mod resolve;
pub mod service;

pub use error::{BackupError, BackupResult, ServiceError, ServiceResult};
pub use model::{
    BackupRecord, BackupRef, BackupScope, BackupStatus, BackupType, DownloadLink, Environment,
    LATEST_SENTINEL, LinkSource, ListOptions, Operation, SortOrder, StatusFilter,
};
pub use orchestrator::{BackupOrchestrator, OperationOutcome};
pub use outputs::ActionOutputs;
pub use poll::{Observation, PollPhase, PollSettings, PollState, transition, wait_for_completion};
pub use prune::{BulkDeleteOutcome, delete_older_than, delete_one};
pub use request::{BackupRequest, RawBackupRequest};
pub use resolve::{resolve_latest, select_latest};
pub use service::BackupService;
