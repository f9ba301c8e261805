//! Rule-pack selection for detected languages.

use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::LanguageSet;

/// General-purpose packs, in priority order. Always selected first.
pub const BASELINE_PACKS: &[&str] = &["p/owasp-top-ten", "p/security-audit", "p/secrets"];

/// Language-specific packs.
static LANGUAGE_PACKS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "java" => &["p/java"],
    "kotlin" => &["p/kotlin"],
    "python" => &["p/python"],
    "go" => &["p/go"],
    "javascript" => &["p/javascript"],
    "typescript" => &["p/typescript"],
    "php" => &["p/php"],
    "ruby" => &["p/ruby"],
    "csharp" => &["p/csharp"],
    "scala" => &["p/scala"],
    "rust" => &["p/rust"],
};

/// Packs registered for a language in the built-in table.
pub fn packs_for_language(language: &str) -> &'static [&'static str] {
    LANGUAGE_PACKS.get(language).copied().unwrap_or(&[])
}

/// An ordered list of rule-pack identifiers without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RulePackList(Vec<String>);

impl RulePackList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pack unless it is already present. Returns whether it was added.
    pub fn push(&mut self, pack: &str) -> bool {
        if pack.is_empty() || self.0.iter().any(|p| p == pack) {
            return false;
        }
        self.0.push(pack.to_string());
        true
    }

    pub fn contains(&self, pack: &str) -> bool {
        self.0.iter().any(|p| p == pack)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for RulePackList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = RulePackList::new();
        for pack in iter {
            list.push(pack.as_ref());
        }
        list
    }
}

/// Maps a [`LanguageSet`] to the packs the analysis should run.
#[derive(Debug, Clone)]
pub struct RulePackSelector {
    baseline: Vec<String>,
    extra: BTreeMap<String, Vec<String>>,
}

impl Default for RulePackSelector {
    fn default() -> Self {
        Self {
            baseline: BASELINE_PACKS.iter().map(|p| p.to_string()).collect(),
            extra: BTreeMap::new(),
        }
    }
}

impl RulePackSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the baseline packs.
    pub fn baseline<I, S>(mut self, packs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.baseline = packs.into_iter().map(Into::into).collect();
        self
    }

    /// Add packs for a language, selected after the built-in ones.
    pub fn extra_packs<I, S>(mut self, language: &str, packs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra
            .entry(language.to_lowercase())
            .or_default()
            .extend(packs.into_iter().map(Into::into));
        self
    }

    /// Baseline packs followed by each language's packs, in language order.
    pub fn select(&self, languages: &LanguageSet) -> RulePackList {
        let mut packs: RulePackList = self.baseline.iter().collect();

        for lang in languages.iter() {
            for pack in packs_for_language(lang) {
                packs.push(pack);
            }
            if let Some(extra) = self.extra.get(lang) {
                for pack in extra {
                    packs.push(pack);
                }
            }
        }

        packs
    }
}

/// Select packs with the built-in tables.
pub fn select_packs(languages: &LanguageSet) -> RulePackList {
    RulePackSelector::default().select(languages)
}
