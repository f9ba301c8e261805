//! Splitting fence bodies into logical files.
//!
//! A body either carries explicit `=== FILE: <path> ===` marker lines, each
//! starting a new file, or is a single anonymous file named after the
//! declared fence language.

use phf::phf_map;
use regex::Regex;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::detect::canonical_language;

lazy_static::lazy_static! {
    static ref MARKER_RE: Regex = Regex::new(r"^\s*===\s*FILE:\s*(.+?)\s*===\s*$").unwrap();
    static ref DRIVE_PREFIX_RE: Regex = Regex::new(r"^[A-Za-z]:").unwrap();
}

/// File name used for a single anonymous file, keyed by canonical language.
static FALLBACK_NAMES: phf::Map<&'static str, &'static str> = phf_map! {
    "java" => "Main.java",
    "kotlin" => "Main.kt",
    "python" => "Main.py",
    "go" => "Main.go",
    "php" => "Main.php",
    "ruby" => "Main.rb",
    "csharp" => "Main.cs",
    "rust" => "Main.rs",
    "scala" => "Main.scala",
    "javascript" => "Main.js",
    "typescript" => "Main.ts",
};

/// Name used when the declared language has no entry in the fallback table.
pub const GENERIC_FALLBACK_NAME: &str = "Main.txt";

/// Rejected manifest paths.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("path {0:?} contains a parent-directory segment")]
    Traversal(String),
    #[error("path {0:?} is absolute")]
    Absolute(String),
    #[error("path {0:?} is empty after normalization")]
    Empty(String),
}

/// Mapping from normalized relative path to file content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileManifest {
    files: BTreeMap<String, String>,
    synthesized: bool,
}

impl FileManifest {
    /// Parse a fence body into a manifest.
    ///
    /// Every marker path is validated before the manifest is returned, so a
    /// single absolute or escaping path rejects the whole body. A marker whose
    /// path is blank is skipped together with its block.
    pub fn parse(inner: &str, declared_language: &str) -> Result<Self, ManifestError> {
        let mut files: BTreeMap<String, String> = BTreeMap::new();
        let mut current: Option<String> = None;
        let mut buf: Vec<&str> = Vec::new();
        let mut seen_marker = false;
        let mut preamble_lines = 0usize;

        for line in inner.lines() {
            if let Some(caps) = MARKER_RE.captures(line) {
                match current.take() {
                    Some(path) => insert_file(&mut files, path, &buf),
                    None if !seen_marker => {
                        preamble_lines = buf.iter().filter(|l| !l.trim().is_empty()).count();
                    }
                    None => {}
                }
                seen_marker = true;
                buf.clear();
                current = match normalize_path(&caps[1]) {
                    Ok(path) => Some(path),
                    Err(ManifestError::Empty(raw)) => {
                        warn!(marker = %line.trim(), raw = %raw, "file marker without a path, skipping its block");
                        None
                    }
                    Err(e) => return Err(e),
                };
                continue;
            }
            buf.push(line);
        }

        if let Some(path) = current.take() {
            insert_file(&mut files, path, &buf);
        }

        if !files.is_empty() {
            if preamble_lines > 0 {
                warn!(
                    lines = preamble_lines,
                    "discarding text before the first file marker"
                );
            }
            return Ok(Self {
                files,
                synthesized: false,
            });
        }

        let name = fallback_name(declared_language);
        debug!(name, "no file markers, using single-file fallback");
        files.insert(name.to_string(), inner.to_string());
        Ok(Self {
            files,
            synthesized: true,
        })
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// True if no markers were present and the single entry was synthesized.
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }

    /// Content of one file.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Relative paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// `(path, content)` pairs in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

fn insert_file(files: &mut BTreeMap<String, String>, path: String, lines: &[&str]) {
    let content = lines.join("\n").trim_end().to_string();
    if files.contains_key(&path) {
        warn!(path = %path, "duplicate file marker, keeping the last body");
    }
    files.insert(path, content);
}

/// Pick the single-file name for a declared fence language.
pub fn fallback_name(declared_language: &str) -> &'static str {
    let lang = canonical_language(declared_language);
    FALLBACK_NAMES
        .get(lang.as_str())
        .copied()
        .unwrap_or(GENERIC_FALLBACK_NAME)
}

/// Normalize a marker path to a forward-slash relative path inside the root.
///
/// Backslashes become forward slashes and `.`/empty segments are dropped.
/// Absolute paths and `..` segments are rejected.
pub fn normalize_path(raw: &str) -> Result<String, ManifestError> {
    let unified = raw.trim().replace('\\', "/");

    if unified.starts_with('/') || DRIVE_PREFIX_RE.is_match(&unified) {
        return Err(ManifestError::Absolute(raw.to_string()));
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment.trim() {
            "" | "." => continue,
            ".." => return Err(ManifestError::Traversal(raw.to_string())),
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return Err(ManifestError::Empty(raw.to_string()));
    }

    Ok(segments.join("/"))
}
