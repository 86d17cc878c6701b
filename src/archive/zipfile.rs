//! Zip archives on disk.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, Write};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use super::{ArchiveError, ArchiveSink, ArchiveSource, OpenArchive};
use crate::config::Compression;

// ---------------------------------------------------------------------------
// ZipSource
// ---------------------------------------------------------------------------

/// A zip file on disk, reopened every time it is read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZipSource {
    path: PathBuf,
}

impl ZipSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl fmt::Display for ZipSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl ArchiveSource for ZipSource {
    type Handle = ZipHandle;

    fn open(&self) -> Result<ZipHandle, ArchiveError> {
        let file = File::open(&self.path).map_err(|e| ArchiveError::Open {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        let archive = ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::Open {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(ZipHandle { archive })
    }
}

/// An opened [`ZipSource`]. Dropping it closes the file.
pub struct ZipHandle {
    archive: ZipArchive<BufReader<File>>,
}

impl OpenArchive for ZipHandle {
    fn entry_names(&mut self) -> Result<Vec<String>, ArchiveError> {
        // `file_names()` iterates a hash map; walk the central directory by
        // index to keep stored order.
        let mut names = Vec::with_capacity(self.archive.len());
        for index in 0..self.archive.len() {
            let file = self.archive.by_index_raw(index)?;
            names.push(file.name().to_owned());
        }
        Ok(names)
    }

    fn entry(&mut self, name: &str) -> Result<Option<Box<dyn BufRead + '_>>, ArchiveError> {
        match self.archive.by_name(name) {
            Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
            Err(ZipError::FileNotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ZipSink
// ---------------------------------------------------------------------------

/// Streaming zip writer for the merged archive.
pub struct ZipSink<W: Write + Seek> {
    writer: ZipWriter<W>,
    options: FileOptions,
    in_entry: bool,
}

impl ZipSink<File> {
    /// Create (or truncate) the zip file at `path`.
    ///
    /// # Errors
    /// Returns [`ArchiveError::Open`] if the file cannot be created.
    pub fn create(path: &Path, compression: Compression) -> Result<Self, ArchiveError> {
        let file = File::create(path).map_err(|e| ArchiveError::Open {
            path: path.to_owned(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(file, compression))
    }
}

impl<W: Write + Seek> ZipSink<W> {
    pub fn new(inner: W, compression: Compression) -> Self {
        let options = FileOptions::default()
            .compression_method(compression.method())
            .unix_permissions(0o644);
        Self {
            writer: ZipWriter::new(inner),
            options,
            in_entry: false,
        }
    }
}

impl<W: Write + Seek> ArchiveSink for ZipSink<W> {
    fn start_entry(&mut self, name: &str) -> Result<(), ArchiveError> {
        self.writer.start_file(name, self.options)?;
        self.in_entry = true;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), ArchiveError> {
        if !self.in_entry {
            return Err(ArchiveError::NoEntry);
        }
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ArchiveError> {
        self.writer.finish()?;
        self.in_entry = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;

    fn write_fixture(path: &Path, entries: &[(&str, &[u8])]) {
        let mut sink = ZipSink::create(path, Compression::Deflated).unwrap();
        for (name, content) in entries {
            sink.start_entry(name).unwrap();
            sink.write_all(content).unwrap();
        }
        sink.finish().unwrap();
    }

    #[test]
    fn entry_names_keep_stored_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("feed.zip");
        write_fixture(
            &path,
            &[
                ("trips.txt", b"trip_id\n"),
                ("agency.txt", b"agency_id\n"),
                ("stops.txt", b"stop_id\n"),
                ("routes.txt", b"route_id\n"),
            ],
        );

        let mut handle = ZipSource::new(&path).open().unwrap();
        assert_eq!(
            handle.entry_names().unwrap(),
            vec!["trips.txt", "agency.txt", "stops.txt", "routes.txt"]
        );
    }

    #[test]
    fn entry_reads_bytes_verbatim() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("feed.zip");
        write_fixture(&path, &[("stops.txt", b"stop_id,stop_name\r\nS1,Gare\r\n")]);

        let mut handle = ZipSource::new(&path).open().unwrap();
        let mut reader = handle.entry("stops.txt").unwrap().unwrap();
        let mut content = Vec::new();
        reader.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"stop_id,stop_name\r\nS1,Gare\r\n");
    }

    #[test]
    fn missing_entry_is_none() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("feed.zip");
        write_fixture(&path, &[("stops.txt", b"stop_id\n")]);

        let mut handle = ZipSource::new(&path).open().unwrap();
        assert!(handle.entry("routes.txt").unwrap().is_none());
    }

    #[test]
    fn open_missing_file_fails_with_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.zip");
        let err = ZipSource::new(&path).open().err().unwrap();
        assert!(matches!(err, ArchiveError::Open { .. }));
        assert!(err.to_string().contains("absent.zip"));
    }

    #[test]
    fn open_non_zip_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("not-a-zip.zip");
        std::fs::write(&path, b"stop_id,stop_name\n").unwrap();
        assert!(matches!(
            ZipSource::new(&path).open(),
            Err(ArchiveError::Open { .. })
        ));
    }

    #[test]
    fn write_before_start_is_rejected() {
        let mut sink = ZipSink::new(Cursor::new(Vec::new()), Compression::Stored);
        assert!(matches!(sink.write_all(b"x"), Err(ArchiveError::NoEntry)));
    }

    #[test]
    fn stored_output_is_readable() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.zip");
        let mut sink = ZipSink::create(&path, Compression::Stored).unwrap();
        sink.start_entry("agency.txt").unwrap();
        sink.write_all(b"agency_id\nA\n").unwrap();
        sink.finish().unwrap();
        drop(sink);

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut content = String::new();
        archive
            .by_name("agency.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "agency_id\nA\n");
    }
}
