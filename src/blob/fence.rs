//! Extraction of a single fenced code block from generated output.

use regex::Regex;

lazy_static::lazy_static! {
    /// One fence spanning the whole (trimmed) input: an opening line with an
    /// optional bare language tag, the body, and a closing fence as the last line.
    static ref FENCE_RE: Regex =
        Regex::new(r"(?s)\A```([A-Za-z0-9_+\-]*)[ \t]*\r?\n(.*?)\r?\n```\z").unwrap();
}

/// The result of stripping a code fence from a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceResult {
    /// Lower-cased fence tag. Empty when there was no fence or no tag.
    pub declared_language: String,
    /// The fence body, trimmed. The whole trimmed blob when no fence matched.
    pub inner_text: String,
}

impl FenceResult {
    /// The declared language, or `None` if the fence carried no tag.
    pub fn language(&self) -> Option<&str> {
        if self.declared_language.is_empty() {
            None
        } else {
            Some(&self.declared_language)
        }
    }
}

/// Strip the surrounding code fence from `blob`.
///
/// Output that is not wrapped in exactly one fence is passed through (trimmed)
/// with an empty language, so unfenced model output is still analyzed.
pub fn strip_fence(blob: &str) -> FenceResult {
    let trimmed = blob.trim();

    match FENCE_RE.captures(trimmed) {
        Some(caps) => FenceResult {
            declared_language: caps
                .get(1)
                .map(|m| m.as_str().trim().to_lowercase())
                .unwrap_or_default(),
            inner_text: caps
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default(),
        },
        None => FenceResult {
            declared_language: String::new(),
            inner_text: trimmed.to_string(),
        },
    }
}
