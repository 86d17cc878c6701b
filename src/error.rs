//! Error types for a merge run.
//!
//! [`MergeError`] covers only the failures that abort a run. Problems with a
//! single non-reference source (missing entry, header mismatch, unreadable
//! archive) are not errors; they are reported as
//! [`MergeEvent`](crate::diagnostics::MergeEvent)s and the run continues.

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::config::ConfigError;

/// Process exit code for usage and configuration errors.
pub const EXIT_USAGE: u8 = 2;
/// Process exit code for fatal I/O errors.
pub const EXIT_IO: u8 = 3;

/// Errors that abort a merge run.
#[derive(Debug, Error)]
pub enum MergeError {
    /// No input archive remained after glob expansion.
    #[error("no input archives (patterns matched nothing)\n  usage: gtfsmerge <INPUT>... <OUTPUT>")]
    NoInputs,

    /// An input argument is not a valid glob pattern.
    #[error("invalid input pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The argument as given.
        pattern: String,
        /// Parser message.
        reason: String,
    },

    /// The output path is one of the inputs; writing it would destroy an input.
    #[error("output {} is also an input archive", path.display())]
    OutputIsInput {
        /// The offending path.
        path: PathBuf,
    },

    /// The configuration file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The reference archive could not be opened or read.
    #[error("reference archive {archive}: {source}")]
    Reference {
        /// Display name of the reference archive.
        archive: String,
        /// Underlying failure.
        source: ArchiveError,
    },

    /// Writing the output archive failed.
    #[error("cannot write output archive: {source}")]
    Output {
        /// Underlying failure.
        #[from]
        source: ArchiveError,
    },
}

impl MergeError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::NoInputs
            | Self::InvalidPattern { .. }
            | Self::OutputIsInput { .. }
            | Self::Config(_) => EXIT_USAGE,
            Self::Reference { .. } | Self::Output { .. } => EXIT_IO,
        }
    }

    pub(crate) fn reference(archive: impl ToString, source: ArchiveError) -> Self {
        Self::Reference {
            archive: archive.to_string(),
            source,
        }
    }
}
