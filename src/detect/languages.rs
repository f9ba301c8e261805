//! Language inference from file extensions and the fence tag.

use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Bucket for non-code formats. Contributes no rule packs.
pub const TEXT_LANGUAGE: &str = "text";

/// Lower-case file extension to language.
static EXTENSION_LANGUAGES: phf::Map<&'static str, &'static str> = phf_map! {
    // Web
    "js" => "javascript",
    "jsx" => "javascript",
    "mjs" => "javascript",
    "cjs" => "javascript",
    "ts" => "typescript",
    "tsx" => "typescript",
    "mts" => "typescript",
    "cts" => "typescript",
    "html" => "html",
    "htm" => "html",
    "css" => "css",
    // JVM
    "java" => "java",
    "kt" => "kotlin",
    "kts" => "kotlin",
    "gradle" => "kotlin",
    "groovy" => "groovy",
    "scala" => "scala",
    "sc" => "scala",
    // Scripting and managed
    "py" => "python",
    "pyi" => "python",
    "go" => "go",
    "rb" => "ruby",
    "php" => "php",
    "cs" => "csharp",
    "rs" => "rust",
    "swift" => "swift",
    // Native
    "c" => "c",
    "h" => "c",
    "cpp" => "cpp",
    "cc" => "cpp",
    "cxx" => "cpp",
    "hpp" => "cpp",
    "hh" => "cpp",
    // Data and docs
    "xml" => "text",
    "json" => "text",
    "yml" => "text",
    "yaml" => "text",
    "toml" => "text",
    "ini" => "text",
    "sql" => "text",
    "csv" => "text",
    "properties" => "text",
    "env" => "text",
    "txt" => "text",
    "md" => "text",
};

/// Short forms seen in fence tags, collapsed to their canonical name.
static LANGUAGE_ALIASES: phf::Map<&'static str, &'static str> = phf_map! {
    "js" => "javascript",
    "jsx" => "javascript",
    "node" => "javascript",
    "ts" => "typescript",
    "tsx" => "typescript",
    "py" => "python",
    "python3" => "python",
    "rb" => "ruby",
    "kt" => "kotlin",
    "golang" => "go",
    "rs" => "rust",
    "cs" => "csharp",
    "c++" => "cpp",
    "cxx" => "cpp",
    "json" => "text",
    "xml" => "text",
    "yaml" => "text",
    "yml" => "text",
    "sql" => "text",
    "txt" => "text",
    "plaintext" => "text",
    "markdown" => "text",
    "md" => "text",
};

/// Canonical name for a language identifier or alias.
pub fn canonical_language(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match LANGUAGE_ALIASES.get(lower.as_str()) {
        Some(canonical) => canonical.to_string(),
        None => lower,
    }
}

/// Language for a relative path, by lower-cased extension.
pub fn language_for_path(path: &str) -> Option<&'static str> {
    let ext = Path::new(path).extension()?.to_str()?.to_lowercase();
    EXTENSION_LANGUAGES.get(ext.as_str()).copied()
}

/// A sorted set of canonical language identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageSet(BTreeSet<String>);

impl LanguageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a language, normalizing aliases. Empty names are ignored.
    pub fn insert(&mut self, name: &str) {
        let canonical = canonical_language(name);
        if !canonical.is_empty() {
            self.0.insert(canonical);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Languages in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: AsRef<str>> FromIterator<S> for LanguageSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = LanguageSet::new();
        for name in iter {
            set.insert(name.as_ref());
        }
        set
    }
}

/// Detect the languages of a materialized project.
///
/// The declared fence language seeds the set; every path with a known
/// extension adds its language. Aliases are collapsed after aggregation.
pub fn detect_languages<S: AsRef<str>>(paths: &[S], declared_language: &str) -> LanguageSet {
    let mut raw: BTreeSet<String> = BTreeSet::new();

    let declared = declared_language.trim().to_lowercase();
    if !declared.is_empty() {
        raw.insert(declared);
    }

    for path in paths {
        if let Some(lang) = language_for_path(path.as_ref()) {
            raw.insert(lang.to_string());
        }
    }

    raw.iter().collect()
}
