//! In-memory archives.
//!
//! Used by the library tests and handy for callers that already hold feed
//! contents in memory. Entries keep insertion order, which stands in for the
//! stored order of a zip central directory.

use std::fmt;
use std::io::{self, BufRead, BufReader, Cursor, Read};
use std::path::PathBuf;

use super::{ArchiveError, ArchiveSink, ArchiveSource, OpenArchive};

// ---------------------------------------------------------------------------
// MemoryArchive
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum MemoryEntry {
    Bytes(Vec<u8>),
    /// Yields the prefix, then fails with an I/O error.
    Failing(Vec<u8>),
}

/// A readable archive held in memory.
#[derive(Clone, Debug)]
pub struct MemoryArchive {
    label: String,
    entries: Vec<(String, MemoryEntry)>,
    unreadable: bool,
}

impl MemoryArchive {
    /// An empty archive named `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            entries: Vec::new(),
            unreadable: false,
        }
    }

    /// An archive whose every `open` fails, like a corrupt file on disk.
    pub fn unreadable(label: impl Into<String>) -> Self {
        Self {
            unreadable: true,
            ..Self::new(label)
        }
    }

    /// Append an entry. Builder style.
    #[must_use]
    pub fn with_entry(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.entries
            .push((name.into(), MemoryEntry::Bytes(content.into())));
        self
    }

    /// Append an entry that returns `prefix` and then a read error.
    #[must_use]
    pub fn with_failing_entry(
        mut self,
        name: impl Into<String>,
        prefix: impl Into<Vec<u8>>,
    ) -> Self {
        self.entries
            .push((name.into(), MemoryEntry::Failing(prefix.into())));
        self
    }
}

impl fmt::Display for MemoryArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

impl ArchiveSource for MemoryArchive {
    type Handle = Self;

    fn open(&self) -> Result<Self, ArchiveError> {
        if self.unreadable {
            return Err(ArchiveError::Open {
                path: PathBuf::from(&self.label),
                reason: "invalid Zip archive: could not find central directory end".to_owned(),
            });
        }
        Ok(self.clone())
    }
}

impl OpenArchive for MemoryArchive {
    fn entry_names(&mut self) -> Result<Vec<String>, ArchiveError> {
        Ok(self.entries.iter().map(|(name, _)| name.clone()).collect())
    }

    fn entry(&mut self, name: &str) -> Result<Option<Box<dyn BufRead + '_>>, ArchiveError> {
        let Some((_, entry)) = self.entries.iter().find(|(n, _)| n == name) else {
            return Ok(None);
        };
        let reader: Box<dyn BufRead + '_> = match entry {
            MemoryEntry::Bytes(bytes) => Box::new(Cursor::new(bytes.as_slice())),
            MemoryEntry::Failing(prefix) => {
                Box::new(BufReader::new(prefix.as_slice().chain(FailingReader)))
            }
        };
        Ok(Some(reader))
    }
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "corrupt deflate stream",
        ))
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// An output archive collected in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Vec<(String, Vec<u8>)>,
    finished: bool,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in write order.
    #[must_use]
    pub fn entries(&self) -> &[(String, Vec<u8>)] {
        &self.entries
    }

    /// Names of the written entries, in write order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Content of the first entry called `name`.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, content)| content.as_slice())
    }

    /// Whether [`ArchiveSink::finish`] was called.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }
}

impl ArchiveSink for MemorySink {
    fn start_entry(&mut self, name: &str) -> Result<(), ArchiveError> {
        self.entries.push((name.to_owned(), Vec::new()));
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ArchiveError> {
        let (_, content) = self.entries.last_mut().ok_or(ArchiveError::NoEntry)?;
        content.extend_from_slice(bytes);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ArchiveError> {
        self.finished = true;
        Ok(())
    }
}
