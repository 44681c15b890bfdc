//! Logging setup shared by the envbackup binaries.
//!
//! Layout: `init.rs` (subscriber installation and format selection),
//! `context.rs` (per-run span), `error.rs` (error type).

#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]

pub mod context;
pub mod error;
pub mod init;

pub use context::run_span;
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
