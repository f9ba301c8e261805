//! Minimal prompt sanitizer.

use super::Sanitizer;

/// Strips control characters and caps prompt length.
#[derive(Debug, Clone)]
pub struct BasicSanitizer {
    max_chars: usize,
}

impl BasicSanitizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Default for BasicSanitizer {
    fn default() -> Self {
        Self::new(crate::config::PromptConfig::default().max_chars)
    }
}

impl Sanitizer for BasicSanitizer {
    fn sanitize(&self, raw_prompt: &str) -> String {
        let cleaned: String = raw_prompt
            .chars()
            .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
            .collect();
        cleaned.trim().chars().take(self.max_chars).collect()
    }
}
