//! Language detection and rule-pack selection.

mod languages;
mod packs;

pub use languages::{
    canonical_language, detect_languages, language_for_path, LanguageSet, TEXT_LANGUAGE,
};
pub use packs::{
    packs_for_language, select_packs, RulePackList, RulePackSelector, BASELINE_PACKS,
};
