//! Per-entry set of data lines already written to the output.
//!
//! A [`SeenLines`] is created when an entry starts and dropped when it ends;
//! it is never shared between entries. Lines are compared as raw bytes,
//! terminator included, so `"a,b\n"` and `"a,b\r\n"` are different lines.
//!
//! Memory grows with the number of unique data lines of the entry across
//! every input archive. There is no spilling to disk.

use std::collections::HashSet;

/// Exact-bytes set of the data lines emitted for one entry.
#[derive(Debug, Default)]
pub struct SeenLines {
    lines: HashSet<Vec<u8>>,
}

impl SeenLines {
    /// Create an empty set for a new entry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `line` has already been recorded.
    #[must_use]
    pub fn contains(&self, line: &[u8]) -> bool {
        self.lines.contains(line)
    }

    /// Record `line`. Returns `true` if it was not present before.
    ///
    /// The bytes are copied only when the line is new.
    pub fn insert(&mut self, line: &[u8]) -> bool {
        if self.lines.contains(line) {
            return false;
        }
        self.lines.insert(line.to_vec())
    }

    /// Number of distinct lines recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
