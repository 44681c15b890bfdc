#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(
    missing_docs,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::redundant_pub_crate)]

//! Action entrypoint that drives environment backups against the remote API.
//!
//! Layout:
//! - `cli.rs`: argument parsing, logging setup, and dispatch
//! - `client.rs`: HTTP client construction, errors, and response classification
//! - `http.rs`: `BackupService` implementation over the REST API
//! - `output.rs`: action output sink and failure annotations
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod http;
pub(crate) mod output;

pub use cli::run;
