//! gtfsmerge library crate.
//!
//! Merges GTFS zip archives: the first archive is the reference for entry
//! names and header lines, data lines from every archive are unioned per entry
//! and deduplicated. The `gtfsmerge` binary is a thin wrapper over [`cmd::run`];
//! [`engine::merge_archives`] works on any [`archive::ArchiveSource`] and
//! [`archive::ArchiveSink`], so it can be driven from memory as well.

pub mod archive;
pub mod cmd;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod inputs;
pub mod report;
pub mod seen;
pub mod telemetry;

pub use engine::merge_archives;
pub use error::MergeError;
