//! Archive capabilities consumed by the merge engine.
//!
//! The engine never talks to a zip library directly. It needs exactly three
//! things:
//!
//! - enumerate the entry names of a readable archive ([`OpenArchive::entry_names`]),
//! - open a named entry for sequential byte reading ([`OpenArchive::entry`]),
//! - write named entries, one after another, to the output ([`ArchiveSink`]).
//!
//! [`zipfile`] implements these over real zip files on disk; [`memory`]
//! implements them over in-process byte buffers.

pub mod memory;
pub mod zipfile;

use std::fmt;
use std::io::{self, BufRead};
use std::path::PathBuf;

use thiserror::Error;

pub use memory::{MemoryArchive, MemorySink};
pub use zipfile::{ZipSink, ZipSource};

/// Errors raised by archive sources and sinks.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive could not be opened (missing file, permissions, not a zip).
    #[error("cannot open {}: {reason}", path.display())]
    Open {
        /// Location of the archive.
        path: PathBuf,
        /// Why opening failed.
        reason: String,
    },

    /// The archive lists an entry that cannot be found by name.
    #[error("entry `{name}` not found")]
    MissingEntry {
        /// The entry name.
        name: String,
    },

    /// Bytes were written before any entry was started.
    #[error("no entry started in output archive")]
    NoEntry,

    /// The zip layer rejected an operation.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// An I/O error occurred while reading or writing entry bytes.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A readable archive that can be opened any number of times.
///
/// The engine opens a source once to list its entries and once per entry it
/// merges, dropping the handle in between. Nothing is held open for the whole
/// run.
///
/// `Display` is used as the source's name in diagnostics and reports.
pub trait ArchiveSource: fmt::Display {
    /// An opened archive.
    type Handle: OpenArchive;

    /// Open the archive for reading.
    ///
    /// # Errors
    /// Returns [`ArchiveError`] if the archive is missing or unreadable.
    fn open(&self) -> Result<Self::Handle, ArchiveError>;
}

/// An opened, randomly-readable archive.
pub trait OpenArchive {
    /// Entry names in the order they are stored in the archive.
    ///
    /// # Errors
    /// Returns [`ArchiveError`] if the archive directory cannot be read.
    fn entry_names(&mut self) -> Result<Vec<String>, ArchiveError>;

    /// Open entry `name` for sequential reading.
    ///
    /// Returns `Ok(None)` when the archive has no entry with that name.
    ///
    /// # Errors
    /// Returns [`ArchiveError`] if the entry exists but cannot be opened.
    fn entry(&mut self, name: &str) -> Result<Option<Box<dyn BufRead + '_>>, ArchiveError>;
}

/// A write-only output archive.
///
/// Entries are written strictly one after another: [`start_entry`] closes the
/// previous entry (if any) and opens a new one, and [`finish`] closes the last
/// entry and the archive. Entries are never reopened.
///
/// [`start_entry`]: ArchiveSink::start_entry
/// [`finish`]: ArchiveSink::finish
pub trait ArchiveSink {
    /// Begin a new entry called `name`.
    ///
    /// # Errors
    /// Returns [`ArchiveError`] if the entry header cannot be written.
    fn start_entry(&mut self, name: &str) -> Result<(), ArchiveError>;

    /// Append bytes to the current entry.
    ///
    /// # Errors
    /// Returns [`ArchiveError::NoEntry`] if no entry was started, or an I/O
    /// error from the underlying writer.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ArchiveError>;

    /// Close the last entry and the archive.
    ///
    /// # Errors
    /// Returns [`ArchiveError`] if the archive trailer cannot be written.
    fn finish(&mut self) -> Result<(), ArchiveError>;
}
