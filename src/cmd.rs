//! One merge run over zip files on disk.
//!
//! Ties the pieces together: expand input patterns, check the reference and
//! the output path, create the output archive, run the engine, and remove the
//! output again if the run aborts part-way.

use std::path::{Path, PathBuf};

use crate::archive::{ZipSink, ZipSource};
use crate::config::Compression;
use crate::diagnostics::DiagnosticSink;
use crate::engine::{merge_archives, reference_entry_names};
use crate::error::MergeError;
use crate::inputs::{ensure_output_distinct, expand_patterns};
use crate::report::MergeReport;

/// What to merge and where.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOptions {
    /// Input glob patterns in argument order.
    pub patterns: Vec<String>,
    /// Output archive path.
    pub output: PathBuf,
    /// Compression for output entries.
    pub compression: Compression,
}

impl MergeOptions {
    /// Split positional arguments into input patterns and the output path.
    ///
    /// The last argument is always the output.
    ///
    /// # Errors
    /// Returns [`MergeError::NoInputs`] if fewer than two arguments are given.
    pub fn from_positionals(
        paths: &[String],
        compression: Compression,
    ) -> Result<Self, MergeError> {
        match paths.split_last() {
            Some((output, patterns)) if !patterns.is_empty() => Ok(Self {
                patterns: patterns.to_vec(),
                output: PathBuf::from(output),
                compression,
            }),
            _ => Err(MergeError::NoInputs),
        }
    }
}

/// Run a merge as described by `options`.
///
/// Nothing is written if the inputs are unusable: the output file is created
/// only after patterns expanded to at least one path, the output was checked
/// not to be an input, and the reference archive was opened successfully.
///
/// # Errors
/// Any [`MergeError`]. On a fatal error after the output was created, the
/// partial output file is removed.
pub fn run<D>(options: &MergeOptions, diagnostics: &mut D) -> Result<MergeReport, MergeError>
where
    D: DiagnosticSink + ?Sized,
{
    let inputs = expand_patterns(&options.patterns)?;
    if inputs.is_empty() {
        return Err(MergeError::NoInputs);
    }
    ensure_output_distinct(&inputs, &options.output)?;

    let sources: Vec<ZipSource> = inputs.into_iter().map(ZipSource::new).collect();
    reference_entry_names(&sources[0])?;

    tracing::debug!(
        inputs = sources.len(),
        output = %options.output.display(),
        compression = %options.compression,
        "starting merge"
    );

    let mut sink = ZipSink::create(&options.output, options.compression)?;
    match merge_archives(&sources, &mut sink, diagnostics) {
        Ok(report) => {
            if report.is_complete() {
                tracing::info!(entries = report.entries.len(), "merge complete");
            } else {
                let excluded: usize = report.entries.iter().map(|e| e.excluded.len()).sum();
                tracing::warn!(
                    entries = report.entries.len(),
                    excluded,
                    "merge complete, {excluded} source contribution(s) left out"
                );
            }
            Ok(report)
        }
        Err(e) => {
            drop(sink);
            remove_partial_output(&options.output);
            Err(e)
        }
    }
}

fn remove_partial_output(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::warn!(output = %path.display(), "removed partial output"),
        Err(e) => tracing::warn!(output = %path.display(), "could not remove partial output: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveSink;
    use crate::diagnostics::{MergeEvent, RecordingSink};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn last_positional_is_output() {
        let options =
            MergeOptions::from_positionals(&args(&["a.zip", "b*.zip", "out.zip"]), Compression::Stored)
                .unwrap();
        assert_eq!(options.patterns, vec!["a.zip", "b*.zip"]);
        assert_eq!(options.output, PathBuf::from("out.zip"));
        assert_eq!(options.compression, Compression::Stored);
    }

    #[test]
    fn single_positional_has_no_inputs() {
        let err = MergeOptions::from_positionals(&args(&["out.zip"]), Compression::Deflated)
            .unwrap_err();
        assert!(matches!(err, MergeError::NoInputs));
    }

    #[test]
    fn nothing_matched_creates_no_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("out.zip");
        let options = MergeOptions {
            patterns: vec![format!("{}/*.zip", dir.path().display())],
            output: output.clone(),
            compression: Compression::Deflated,
        };
        let mut events = Vec::new();
        let err = run(&options, &mut |e: MergeEvent| events.push(e)).unwrap_err();
        assert!(matches!(err, MergeError::NoInputs));
        assert!(!output.exists());
        assert!(events.is_empty());
    }

    #[test]
    fn excluded_source_leaves_report_incomplete() {
        let dir = tempfile::TempDir::new().unwrap();
        let write = |name: &str, content: &[u8]| {
            let path = dir.path().join(name);
            let mut sink = ZipSink::create(&path, Compression::Stored).unwrap();
            sink.start_entry("stops.txt").unwrap();
            sink.write_all(content).unwrap();
            sink.finish().unwrap();
            path.display().to_string()
        };
        let a = write("a.zip", b"stop_id\nS1\n");
        let b = write("b.zip", b"id\nS2\n");
        let output = dir.path().join("out.zip");
        let options = MergeOptions {
            patterns: vec![a, b],
            output: output.clone(),
            compression: Compression::Stored,
        };

        let report = run(&options, &mut RecordingSink::new()).unwrap();

        assert!(!report.is_complete());
        assert_eq!(report.lines_written(), 1);
        assert!(output.exists());
    }

    #[test]
    fn corrupt_reference_creates_no_output() {
        let dir = tempfile::TempDir::new().unwrap();
        let reference = dir.path().join("a.zip");
        std::fs::write(&reference, b"not a zip").unwrap();
        let output = dir.path().join("out.zip");
        let options = MergeOptions {
            patterns: vec![reference.display().to_string()],
            output: output.clone(),
            compression: Compression::Deflated,
        };
        let err = run(&options, &mut RecordingSink::new()).unwrap_err();
        assert!(matches!(err, MergeError::Reference { .. }));
        assert!(!output.exists());
    }
}
