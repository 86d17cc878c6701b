//! End-of-run summary of a merge.
//!
//! The engine fills one [`EntryReport`] per reference entry. The binary can
//! print the whole [`MergeReport`] as text or JSON (`--report`).

use std::fmt::Write as _;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Summary of one merge run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Input archives in merge order; the first is the reference.
    pub sources: Vec<String>,
    /// One report per reference entry, in output order.
    pub entries: Vec<EntryReport>,
}

impl MergeReport {
    #[must_use]
    pub const fn new(sources: Vec<String>) -> Self {
        Self {
            sources,
            entries: Vec::new(),
        }
    }

    /// Report for entry `name`, if it was merged.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&EntryReport> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Total data lines written across all entries.
    #[must_use]
    pub fn lines_written(&self) -> usize {
        self.entries.iter().map(|e| e.lines_written).sum()
    }

    /// Total duplicate lines skipped across all entries.
    #[must_use]
    pub fn duplicates_skipped(&self) -> usize {
        self.entries.iter().map(|e| e.duplicates_skipped).sum()
    }

    /// Returns `true` if every source contributed to every entry.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.excluded.is_empty())
    }
}

/// Summary for one output entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub name: String,
    /// Data lines written after the header.
    pub lines_written: usize,
    /// Data lines skipped because they were already written.
    pub duplicates_skipped: usize,
    /// Sources whose lines were (partly) left out, in source order.
    pub excluded: Vec<ExcludedSource>,
}

impl EntryReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A source that did not fully contribute to an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExcludedSource {
    pub source: String,
    pub reason: ExclusionReason,
}

/// Why a source did not fully contribute to an entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// First line differs from the reference header. Nothing was merged.
    HeaderMismatch,
    /// The archive has no entry with this name. Nothing was merged.
    MissingEntry,
    /// The archive or entry could not be opened. Nothing was merged.
    Unreadable { detail: String },
    /// Reading failed part-way; lines before the failure were merged.
    ReadFailed { detail: String },
}

impl ExclusionReason {
    fn describe(&self) -> String {
        match self {
            Self::HeaderMismatch => "header mismatch".to_owned(),
            Self::MissingEntry => "entry missing".to_owned(),
            Self::Unreadable { detail } => format!("unreadable: {detail}"),
            Self::ReadFailed { detail } => format!("read failed: {detail}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// How to print a [`MergeReport`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReportFormat {
    /// Do not print a summary.
    #[default]
    None,
    /// Aligned plain text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl ReportFormat {
    /// Render `report`, or `None` for [`ReportFormat::None`].
    ///
    /// # Errors
    /// Returns an error if JSON serialization fails.
    pub fn render(self, report: &MergeReport) -> Result<Option<String>> {
        match self {
            Self::None => Ok(None),
            Self::Text => Ok(Some(render_text(report))),
            Self::Json => serde_json::to_string_pretty(report)
                .map(Some)
                .map_err(|e| anyhow::anyhow!("JSON serialization failed: {e}")),
        }
    }
}

fn render_text(report: &MergeReport) -> String {
    let width = report
        .entries
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(out, "Merged {} archive(s):", report.sources.len());
    for (i, source) in report.sources.iter().enumerate() {
        let tag = if i == 0 { " (reference)" } else { "" };
        let _ = writeln!(out, "  {source}{tag}");
    }
    out.push('\n');
    for entry in &report.entries {
        let _ = writeln!(
            out,
            "  {:<width$}  {:>8} lines  {:>6} duplicates",
            entry.name, entry.lines_written, entry.duplicates_skipped
        );
        for excluded in &entry.excluded {
            let _ = writeln!(
                out,
                "  {:<width$}    excluded {}: {}",
                "",
                excluded.source,
                excluded.reason.describe()
            );
        }
    }
    let _ = writeln!(
        out,
        "\n{} entries, {} lines, {} duplicates skipped",
        report.entries.len(),
        report.lines_written(),
        report.duplicates_skipped()
    );
    out
}
