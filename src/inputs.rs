//! Input path handling: glob expansion and output safety checks.
//!
//! Each input argument is a glob pattern. Patterns expand in argument order,
//! and the matches of one pattern come in the glob crate's order
//! (alphabetical). A pattern that matches nothing contributes nothing; a plain
//! path that does not exist matches nothing too. A directory that cannot be
//! read while matching is skipped with a warning.

use std::io;
use std::path::{Path, PathBuf};

use crate::error::MergeError;

/// Expand `patterns` into an ordered list of input paths.
///
/// The result may be empty; the caller decides whether that is an error.
///
/// # Errors
/// Returns [`MergeError::InvalidPattern`] for a malformed pattern.
pub fn expand_patterns<I, P>(patterns: I) -> Result<Vec<PathBuf>, MergeError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<str>,
{
    let mut paths = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let matches = glob::glob(pattern).map_err(|e| MergeError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: e.msg.to_owned(),
        })?;
        paths.extend(
            matches
                .map(|entry| entry.map_err(|e| (e.path().to_owned(), e.into_error())))
                .filter_map(|entry| readable(pattern, entry)),
        );
    }
    Ok(paths)
}

fn readable(pattern: &str, entry: Result<PathBuf, (PathBuf, io::Error)>) -> Option<PathBuf> {
    match entry {
        Ok(path) => Some(path),
        Err((path, e)) => {
            tracing::warn!(pattern, path = %path.display(), "skipping unreadable path: {e}");
            None
        }
    }
}

/// Refuse to run when `output` is one of `inputs`.
///
/// Creating the output truncates it, which would destroy that input before it
/// is read. An output that does not exist yet cannot be an input, since every
/// input came out of glob matching.
///
/// # Errors
/// Returns [`MergeError::OutputIsInput`] if both resolve to the same file.
pub fn ensure_output_distinct(inputs: &[PathBuf], output: &Path) -> Result<(), MergeError> {
    let Ok(resolved) = output.canonicalize() else {
        return Ok(());
    };
    if inputs
        .iter()
        .any(|input| input.canonicalize().is_ok_and(|p| p == resolved))
    {
        return Err(MergeError::OutputIsInput {
            path: output.to_owned(),
        });
    }
    Ok(())
}
