//! Shared test helpers for gtfsmerge integration tests.
//!
//! All tests use temp directories. Fixtures are real zip files written with
//! the `zip` crate; the binary is run through `CARGO_BIN_EXE_gtfsmerge`.

#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// A fresh temp directory to hold fixtures and output.
pub fn workdir() -> TempDir {
    TempDir::new().expect("failed to create temp dir")
}

/// Write a zip archive `name` in `dir` with the given entries, in order.
pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    let mut writer = ZipWriter::new(file);
    for (entry, content) in entries {
        writer
            .start_file(*entry, FileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Read every entry of a zip archive, in stored order.
pub fn read_zip(path: &Path) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut file = archive.by_index(i).unwrap();
            let mut content = String::new();
            file.read_to_string(&mut content).unwrap();
            (file.name().to_owned(), content)
        })
        .collect()
}

/// Content of entry `name` in the zip archive at `path`.
pub fn read_entry(path: &Path, name: &str) -> Option<String> {
    read_zip(path)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, content)| content)
}

/// Run gtfsmerge with the given args in the given directory.
///
/// `RUST_LOG` is pinned so diagnostics are always on stderr, and the config
/// lookup is pointed inside `dir` so a stray config on the host is ignored.
pub fn gtfsmerge_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gtfsmerge"))
        .args(args)
        .current_dir(dir)
        .env("RUST_LOG", "info")
        .env("GTFSMERGE_CONFIG", dir.join("gtfsmerge.toml"))
        .output()
        .expect("failed to execute gtfsmerge")
}

/// Run gtfsmerge and assert it succeeds. Returns (stdout, stderr).
pub fn gtfsmerge_ok(dir: &Path, args: &[&str]) -> (String, String) {
    let out = gtfsmerge_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    let stdout = String::from_utf8_lossy(&out.stdout).to_string();
    assert!(
        out.status.success(),
        "gtfsmerge {} failed:\nstdout: {stdout}\nstderr: {stderr}",
        args.join(" "),
    );
    (stdout, stderr)
}

/// Run gtfsmerge and assert it fails with `code`. Returns stderr.
pub fn gtfsmerge_fails(dir: &Path, args: &[&str], code: i32) -> String {
    let out = gtfsmerge_in(dir, args);
    let stderr = String::from_utf8_lossy(&out.stderr).to_string();
    assert_eq!(
        out.status.code(),
        Some(code),
        "Expected gtfsmerge {} to exit with {code}.\nstdout: {}\nstderr: {stderr}",
        args.join(" "),
        String::from_utf8_lossy(&out.stdout),
    );
    stderr
}
