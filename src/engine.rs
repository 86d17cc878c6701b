//! The merge engine.
//!
//! Merges an ordered list of archives into one output archive, entry by entry.
//! The first archive is the reference: it decides which entries exist in the
//! output, in which order, and what each entry's header line is.
//!
//! For every reference entry:
//!
//! 1. The reference header is written, then the reference's data lines.
//! 2. Each further source, in order, contributes the data lines of its copy of
//!    the entry, provided its first line is byte-identical to the reference
//!    header.
//! 3. A data line already written for the entry is skipped.
//!
//! # Invariants
//!
//! - **Completeness**: every reference entry name is written exactly once, in
//!   reference order. Names that exist only in later sources are ignored.
//! - **Header fidelity**: each output entry starts with the reference header.
//! - **Uniqueness**: no data line is written twice within one entry. Lines
//!   compare as raw bytes, terminator included.
//! - **Order**: reference lines first, then each source's lines in source
//!   order, sources in argument order.
//! - **Isolation**: a missing entry, header mismatch or unreadable archive in
//!   a non-reference source only drops that source's contribution to that
//!   entry. Reference and output failures abort the run.
//!
//! Entries are processed one at a time and each source is opened only while
//! it is being read. The seen-lines set of an entry is the only state that
//! grows with input size.

use std::collections::HashSet;
use std::io::{self, BufRead};

use crate::archive::{ArchiveError, ArchiveSink, ArchiveSource, OpenArchive};
use crate::diagnostics::{DiagnosticSink, MergeEvent, display_line};
use crate::error::MergeError;
use crate::report::{EntryReport, ExcludedSource, ExclusionReason, MergeReport};
use crate::seen::SeenLines;

/// Merge `sources` into `sink`, reporting to `diagnostics`.
///
/// `sources[0]` is the reference archive. The sink is finished on success.
///
/// # Errors
///
/// - [`MergeError::NoInputs`] if `sources` is empty.
/// - [`MergeError::Reference`] if the reference archive cannot be opened or
///   read.
/// - [`MergeError::Output`] if writing to `sink` fails.
///
/// Problems with other sources are reported through `diagnostics` and in the
/// returned [`MergeReport`], never as errors.
pub fn merge_archives<S, K, D>(
    sources: &[S],
    sink: &mut K,
    diagnostics: &mut D,
) -> Result<MergeReport, MergeError>
where
    S: ArchiveSource,
    K: ArchiveSink + ?Sized,
    D: DiagnosticSink + ?Sized,
{
    let Some((reference, others)) = sources.split_first() else {
        return Err(MergeError::NoInputs);
    };

    let names = reference_entry_names(reference)?;
    let mut report = MergeReport::new(sources.iter().map(ToString::to_string).collect());

    for name in &names {
        let entry = EntryMerge::new(name, &mut *sink, &mut *diagnostics).run(reference, others)?;
        report.entries.push(entry);
    }

    sink.finish()?;
    Ok(report)
}

/// Entry names of the reference archive in stored order.
///
/// A name stored twice is kept once, at its first position.
///
/// # Errors
/// Returns [`MergeError::Reference`] if the archive cannot be opened or its
/// directory read.
pub fn reference_entry_names<S: ArchiveSource>(reference: &S) -> Result<Vec<String>, MergeError> {
    let mut handle = reference
        .open()
        .map_err(|e| MergeError::reference(reference, e))?;
    let names = handle
        .entry_names()
        .map_err(|e| MergeError::reference(reference, e))?;

    let mut unique = HashSet::with_capacity(names.len());
    Ok(names
        .into_iter()
        .filter(|name| unique.insert(name.clone()))
        .collect())
}

// ---------------------------------------------------------------------------
// EntryMerge
// ---------------------------------------------------------------------------

/// Failure while copying lines from one source.
enum CopyError {
    Read(io::Error),
    Write(ArchiveError),
}

/// State for merging one entry. Dropped when the entry is done.
struct EntryMerge<'a, K: ?Sized, D: ?Sized> {
    name: &'a str,
    sink: &'a mut K,
    diagnostics: &'a mut D,
    header: Vec<u8>,
    /// Terminator written between an unterminated line and the next one.
    terminator: &'static [u8],
    /// The last bytes written did not end with `\n`.
    unterminated: bool,
    seen: SeenLines,
    report: EntryReport,
}

impl<'a, K, D> EntryMerge<'a, K, D>
where
    K: ArchiveSink + ?Sized,
    D: DiagnosticSink + ?Sized,
{
    fn new(name: &'a str, sink: &'a mut K, diagnostics: &'a mut D) -> Self {
        Self {
            name,
            sink,
            diagnostics,
            header: Vec::new(),
            terminator: b"\n",
            unterminated: false,
            seen: SeenLines::new(),
            report: EntryReport::new(name),
        }
    }

    fn run<S: ArchiveSource>(mut self, reference: &S, others: &[S]) -> Result<EntryReport, MergeError> {
        self.emit(MergeEvent::EntryStarted {
            entry: self.name.to_owned(),
        });
        self.sink.start_entry(self.name)?;

        self.merge_reference(reference)?;
        for source in others {
            self.merge_source(source)?;
        }
        Ok(self.report)
    }

    fn merge_reference<S: ArchiveSource>(&mut self, reference: &S) -> Result<(), MergeError> {
        let label = reference.to_string();
        self.emit(MergeEvent::SourceStarted {
            entry: self.name.to_owned(),
            source: label.clone(),
            reference: true,
        });

        let mut handle = reference
            .open()
            .map_err(|e| MergeError::reference(&label, e))?;
        let mut reader = handle
            .entry(self.name)
            .map_err(|e| MergeError::reference(&label, e))?
            .ok_or_else(|| {
                MergeError::reference(
                    &label,
                    ArchiveError::MissingEntry {
                        name: self.name.to_owned(),
                    },
                )
            })?;

        let mut header = Vec::new();
        reader
            .read_until(b'\n', &mut header)
            .map_err(|e| MergeError::reference(&label, e.into()))?;
        self.terminator = if header.ends_with(b"\r\n") {
            b"\r\n".as_slice()
        } else {
            b"\n".as_slice()
        };
        self.write(&header)?;
        self.header = header;

        match self.copy_lines(&mut *reader, &label) {
            Ok(()) => Ok(()),
            Err(CopyError::Read(e)) => Err(MergeError::reference(&label, e.into())),
            Err(CopyError::Write(e)) => Err(e.into()),
        }
    }

    fn merge_source<S: ArchiveSource>(&mut self, source: &S) -> Result<(), MergeError> {
        let label = source.to_string();
        self.emit(MergeEvent::SourceStarted {
            entry: self.name.to_owned(),
            source: label.clone(),
            reference: false,
        });

        let mut handle = match source.open() {
            Ok(handle) => handle,
            Err(e) => {
                self.unreadable(label, e.to_string());
                return Ok(());
            }
        };
        let mut reader = match handle.entry(self.name) {
            Ok(Some(reader)) => reader,
            Ok(None) => {
                self.emit(MergeEvent::EntryMissing {
                    entry: self.name.to_owned(),
                    source: label.clone(),
                });
                self.exclude(label, ExclusionReason::MissingEntry);
                return Ok(());
            }
            Err(e) => {
                self.unreadable(label, e.to_string());
                return Ok(());
            }
        };

        let mut first = Vec::new();
        if let Err(e) = reader.read_until(b'\n', &mut first) {
            self.unreadable(label, e.to_string());
            return Ok(());
        }
        if first != self.header {
            self.emit(MergeEvent::HeaderMismatch {
                entry: self.name.to_owned(),
                source: label.clone(),
                expected: display_line(&self.header),
                found: display_line(&first),
            });
            self.exclude(label, ExclusionReason::HeaderMismatch);
            return Ok(());
        }

        match self.copy_lines(&mut *reader, &label) {
            Ok(()) => Ok(()),
            Err(CopyError::Read(e)) => {
                let detail = e.to_string();
                self.emit(MergeEvent::SourceUnreadable {
                    entry: self.name.to_owned(),
                    source: label.clone(),
                    reason: format!("read failed: {detail}"),
                });
                self.exclude(label, ExclusionReason::ReadFailed { detail });
                Ok(())
            }
            Err(CopyError::Write(e)) => Err(e.into()),
        }
    }

    /// Copy the remaining lines of `reader`, skipping lines already seen.
    fn copy_lines(&mut self, reader: &mut dyn BufRead, source: &str) -> Result<(), CopyError> {
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader
                .read_until(b'\n', &mut line)
                .map_err(CopyError::Read)?
                == 0
            {
                return Ok(());
            }
            if self.first_sight(&line) {
                self.write(&line).map_err(CopyError::Write)?;
                self.report.lines_written += 1;
            } else {
                self.report.duplicates_skipped += 1;
                self.emit(MergeEvent::DuplicateLine {
                    entry: self.name.to_owned(),
                    source: source.to_owned(),
                    line: display_line(&line),
                });
            }
        }
    }

    /// Record `line` as written, or return `false` if it already was.
    ///
    /// A line without `\n` is terminated on output as soon as anything
    /// follows it, so it also claims (and is blocked by) its terminated form.
    fn first_sight(&mut self, line: &[u8]) -> bool {
        if line.ends_with(b"\n") {
            return self.seen.insert(line);
        }
        let terminated = [line, self.terminator].concat();
        if self.seen.contains(line) || self.seen.contains(&terminated) {
            return false;
        }
        self.seen.insert(line);
        self.seen.insert(&terminated);
        true
    }

    /// Write one line, first terminating the previous line if it had no `\n`
    /// so rows from different sources never fuse.
    fn write(&mut self, line: &[u8]) -> Result<(), ArchiveError> {
        if line.is_empty() {
            return Ok(());
        }
        if self.unterminated {
            self.sink.write_all(self.terminator)?;
        }
        self.sink.write_all(line)?;
        self.unterminated = !line.ends_with(b"\n");
        Ok(())
    }

    fn unreadable(&mut self, source: String, detail: String) {
        self.emit(MergeEvent::SourceUnreadable {
            entry: self.name.to_owned(),
            source: source.clone(),
            reason: detail.clone(),
        });
        self.exclude(source, ExclusionReason::Unreadable { detail });
    }

    fn exclude(&mut self, source: String, reason: ExclusionReason) {
        self.report.excluded.push(ExcludedSource { source, reason });
    }

    fn emit(&mut self, event: MergeEvent) {
        self.diagnostics.emit(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
