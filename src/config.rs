//! Optional run configuration (`gtfsmerge.toml`).
//!
//! Every field has a default, so a missing file is the same as an empty one.
//! Command-line flags take precedence over values read here.

use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;
use thiserror::Error;

use crate::report::ReportFormat;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gtfsmerge.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeConfig {
    /// Output archive settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Diagnostic log settings.
    #[serde(default)]
    pub log: LogConfig,

    /// End-of-run summary settings.
    #[serde(default)]
    pub report: ReportConfig,
}

// ---------------------------------------------------------------------------
// OutputConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Compression applied to every entry of the merged archive.
    #[serde(default)]
    pub compression: Compression,
}

/// Compression method for output entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    /// No compression.
    Stored,
    /// Deflate, readable by every zip tool.
    #[default]
    Deflated,
}

impl Compression {
    #[must_use]
    pub const fn method(self) -> zip::CompressionMethod {
        match self {
            Self::Stored => zip::CompressionMethod::Stored,
            Self::Deflated => zip::CompressionMethod::Deflated,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => write!(f, "stored"),
            Self::Deflated => write!(f, "deflated"),
        }
    }
}

// ---------------------------------------------------------------------------
// LogConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Format of the diagnostic stream on stderr.
    #[serde(default)]
    pub format: LogFormat,
}

/// Diagnostic log format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

// ---------------------------------------------------------------------------
// ReportConfig
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// How to print the merge summary on stdout.
    #[serde(default)]
    pub format: ReportFormat,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a configuration file.
#[derive(Debug, Error)]
#[error("{}{message}", path.as_ref().map(|p| format!("{}: ", p.display())).unwrap_or_default())]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl MergeConfig {
    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML or unknown fields.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_all_fields() {
        let cfg = MergeConfig::default();
        assert_eq!(cfg.output.compression, Compression::Deflated);
        assert_eq!(cfg.log.format, LogFormat::Text);
        assert_eq!(cfg.report.format, ReportFormat::None);
    }

    #[test]
    fn parse_empty_string() {
        let cfg = MergeConfig::parse("").unwrap();
        assert_eq!(cfg, MergeConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[output]
compression = "stored"

[log]
format = "json"

[report]
format = "text"
"#;
        let cfg = MergeConfig::parse(toml).unwrap();
        assert_eq!(cfg.output.compression, Compression::Stored);
        assert_eq!(cfg.log.format, LogFormat::Json);
        assert_eq!(cfg.report.format, ReportFormat::Text);
    }

    #[test]
    fn parse_partial_config_keeps_other_defaults() {
        let cfg = MergeConfig::parse("[report]\nformat = \"json\"\n").unwrap();
        assert_eq!(cfg.report.format, ReportFormat::Json);
        assert_eq!(cfg.output.compression, Compression::Deflated);
    }

    #[test]
    fn unknown_field_reports_line() {
        let toml = "[output]\ncompression = \"stored\"\nlevel = 9\n";
        let err = MergeConfig::parse(toml).unwrap_err();
        assert!(err.message.starts_with("line 3:"), "got: {}", err.message);
    }

    #[test]
    fn unknown_compression_is_rejected() {
        let err = MergeConfig::parse("[output]\ncompression = \"bzip2\"\n").unwrap_err();
        assert!(err.message.contains("bzip2") || err.message.contains("unknown variant"));
    }

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg = MergeConfig::load(&dir.path().join(DEFAULT_CONFIG_FILE)).unwrap();
        assert_eq!(cfg, MergeConfig::default());
    }

    #[test]
    fn load_error_carries_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[output\n").unwrap();
        let err = MergeConfig::load(&path).unwrap_err();
        assert_eq!(err.path.as_deref(), Some(path.as_path()));
        assert!(err.to_string().contains(DEFAULT_CONFIG_FILE));
    }
}
