//! Merge diagnostics.
//!
//! The engine reports what it does through a [`DiagnosticSink`] handed to it by
//! the caller instead of logging globally. The binary plugs in
//! [`TracingSink`]; tests plug in a [`RecordingSink`] and assert on the
//! recorded [`MergeEvent`]s.

use std::fmt;

use serde::Serialize;

/// Severity of a [`MergeEvent`], mapped onto tracing levels by [`TracingSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Something the merge engine did or refused to do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MergeEvent {
    /// Processing of an entry began.
    EntryStarted { entry: String },

    /// Processing of one source for the current entry began.
    SourceStarted {
        entry: String,
        source: String,
        /// `true` for the first archive.
        reference: bool,
    },

    /// The source's first line differs from the reference header; none of its
    /// lines were merged for this entry.
    HeaderMismatch {
        entry: String,
        source: String,
        expected: String,
        found: String,
    },

    /// The source has no entry with this name.
    EntryMissing { entry: String, source: String },

    /// The source could not be opened or read. Lines read before a mid-entry
    /// failure stay in the output.
    SourceUnreadable {
        entry: String,
        source: String,
        reason: String,
    },

    /// A data line was already written for this entry and was skipped.
    DuplicateLine {
        entry: String,
        source: String,
        line: String,
    },
}

impl MergeEvent {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::EntryStarted { .. } | Self::SourceStarted { .. } => Severity::Info,
            Self::EntryMissing { .. }
            | Self::SourceUnreadable { .. }
            | Self::DuplicateLine { .. } => Severity::Warning,
            Self::HeaderMismatch { .. } => Severity::Error,
        }
    }

    /// Entry the event belongs to.
    #[must_use]
    pub fn entry(&self) -> &str {
        match self {
            Self::EntryStarted { entry }
            | Self::SourceStarted { entry, .. }
            | Self::HeaderMismatch { entry, .. }
            | Self::EntryMissing { entry, .. }
            | Self::SourceUnreadable { entry, .. }
            | Self::DuplicateLine { entry, .. } => entry,
        }
    }

    /// Source the event belongs to, if any.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        match self {
            Self::EntryStarted { .. } => None,
            Self::SourceStarted { source, .. }
            | Self::HeaderMismatch { source, .. }
            | Self::EntryMissing { source, .. }
            | Self::SourceUnreadable { source, .. }
            | Self::DuplicateLine { source, .. } => Some(source),
        }
    }
}

/// Line text for messages: lossy UTF-8 without the terminator.
pub(crate) fn display_line(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

impl fmt::Display for MergeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EntryStarted { entry } => write!(f, "processing {entry}"),
            Self::SourceStarted {
                entry,
                source,
                reference: true,
            } => write!(f, "{entry}: reading {source} (reference)"),
            Self::SourceStarted { entry, source, .. } => write!(f, "{entry}: reading {source}"),
            Self::HeaderMismatch {
                entry,
                source,
                expected,
                found,
            } => write!(
                f,
                "skipping {entry} from {source}: header `{found}` does not match reference header `{expected}`"
            ),
            Self::EntryMissing { entry, source } => {
                write!(f, "skipping {entry} from {source}: entry not present")
            }
            Self::SourceUnreadable {
                entry,
                source,
                reason,
            } => write!(f, "skipping {entry} from {source}: {reason}"),
            Self::DuplicateLine {
                entry,
                source,
                line,
            } => write!(f, "{entry}: avoiding duplicate line from {source}: {line}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receiver for [`MergeEvent`]s.
pub trait DiagnosticSink {
    fn emit(&mut self, event: MergeEvent);
}

impl<F: FnMut(MergeEvent)> DiagnosticSink for F {
    fn emit(&mut self, event: MergeEvent) {
        self(event);
    }
}

/// Forwards events to `tracing`: INFO for progress, WARN for skipped lines
/// and missing or unreadable sources, ERROR for header mismatches.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, event: MergeEvent) {
        let entry = event.entry();
        let source = event.source().unwrap_or_default();
        match event.severity() {
            Severity::Info => tracing::info!(entry, source, "{event}"),
            Severity::Warning => tracing::warn!(entry, source, "{event}"),
            Severity::Error => tracing::error!(entry, source, "{event}"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    events: Vec<MergeEvent>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> &[MergeEvent] {
        &self.events
    }

    /// Events at `severity` or above.
    pub fn at_least(&self, severity: Severity) -> impl Iterator<Item = &MergeEvent> {
        self.events.iter().filter(move |e| e.severity() >= severity)
    }

    #[must_use]
    pub fn into_events(self) -> Vec<MergeEvent> {
        self.events
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&mut self, event: MergeEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_match_log_levels() {
        let started = MergeEvent::EntryStarted {
            entry: "stops.txt".into(),
        };
        let duplicate = MergeEvent::DuplicateLine {
            entry: "stops.txt".into(),
            source: "b.zip".into(),
            line: "S1,Gare".into(),
        };
        let mismatch = MergeEvent::HeaderMismatch {
            entry: "stops.txt".into(),
            source: "b.zip".into(),
            expected: "stop_id,stop_name".into(),
            found: "id,name".into(),
        };
        assert_eq!(started.severity(), Severity::Info);
        assert_eq!(duplicate.severity(), Severity::Warning);
        assert_eq!(mismatch.severity(), Severity::Error);
    }

    #[test]
    fn display_names_entry_and_source() {
        let event = MergeEvent::HeaderMismatch {
            entry: "stops.txt".into(),
            source: "b.zip".into(),
            expected: "stop_id,stop_name".into(),
            found: "id,name".into(),
        };
        let msg = event.to_string();
        assert!(msg.contains("stops.txt"));
        assert!(msg.contains("b.zip"));
        assert!(msg.contains("id,name"));
    }

    #[test]
    fn display_line_strips_terminators_only() {
        assert_eq!(display_line(b"S1,Gare\r\n"), "S1,Gare");
        assert_eq!(display_line(b"S1,Gare\n"), "S1,Gare");
        assert_eq!(display_line(b" S1 "), " S1 ");
    }

    #[test]
    fn closures_are_sinks() {
        let mut count = 0;
        {
            let mut sink = |_event: MergeEvent| count += 1;
            sink.emit(MergeEvent::EntryStarted {
                entry: "agency.txt".into(),
            });
        }
        assert_eq!(count, 1);
    }

    #[test]
    fn recording_sink_filters_by_severity() {
        let mut sink = RecordingSink::new();
        sink.emit(MergeEvent::EntryStarted {
            entry: "stops.txt".into(),
        });
        sink.emit(MergeEvent::EntryMissing {
            entry: "stops.txt".into(),
            source: "b.zip".into(),
        });
        assert_eq!(sink.events().len(), 2);
        assert_eq!(sink.at_least(Severity::Warning).count(), 1);
        assert_eq!(sink.at_least(Severity::Error).count(), 0);
    }

    #[test]
    fn events_serialize_with_tag() {
        let event = MergeEvent::EntryMissing {
            entry: "routes.txt".into(),
            source: "b.zip".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "entry_missing");
        assert_eq!(json["entry"], "routes.txt");
    }
}
