//! Text normalization for table and infobox fragments.
//!
//! Display strings (herb names, links) keep their case; comparison keys
//! (effect labels, taxon values) are lower-cased. Both drop bracketed
//! citation markers and trailing footnote digits.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Fixed set of noise fragments, matched exactly before normalization.
#[derive(Debug, Clone, Default)]
pub struct StopList {
    words: HashSet<String>,
}

impl StopList {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            words: words.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `fragment` (surrounding whitespace ignored) is a known noise phrase.
    pub fn contains(&self, fragment: &str) -> bool {
        self.words.contains(fragment.trim())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// A fragment is textual if it has at least one alphabetic character.
pub fn is_textual(fragment: &str) -> bool {
    fragment.chars().any(char::is_alphabetic)
}

/// Strip `[1]`-style citation markers and trailing footnote digits, collapse
/// whitespace, trim. Case is preserved. Digits attached to a word (`B12`,
/// `COVID-19`) are part of the name and stay.
pub fn clean_display(fragment: &str) -> String {
    static CITATION_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\[[^\]]*\]").expect("valid regex"));
    static TRAILING_DIGITS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?:\s+\d+)+\s*$").expect("valid regex"));

    let without_citations = CITATION_RE.replace_all(fragment, " ");
    let without_digits = TRAILING_DIGITS_RE.replace(&without_citations, "");
    collapse_whitespace(&without_digits)
}

/// Comparison key: [`clean_display`] then lower-case.
pub fn normalize_key(fragment: &str) -> String {
    clean_display(fragment).to_lowercase()
}

/// Normalize a hyperlinked effect label from the primary table.
///
/// Stop-listed and non-textual fragments are absent.
pub fn normalize_effect(raw: &str, stop: &StopList) -> Option<String> {
    if stop.contains(raw) || !is_textual(raw) {
        return None;
    }
    let key = normalize_key(raw);
    (!key.is_empty()).then_some(key)
}

/// Normalize one comma-separated phrase from the adverse-effects column.
///
/// Phrases must be textual, not stop-listed, and have fewer than
/// `max_words` words. Non-alphabetic characters are removed.
pub fn normalize_adverse_phrase(raw: &str, stop: &StopList, max_words: usize) -> Option<String> {
    if stop.contains(raw) {
        return None;
    }

    let cleaned = clean_display(raw);
    if stop.contains(&cleaned) || !is_textual(&cleaned) {
        return None;
    }
    if cleaned.split_whitespace().count() >= max_words {
        return None;
    }

    let letters: String = cleaned
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
        .collect();
    let phrase = collapse_whitespace(&letters).to_lowercase();
    (!phrase.is_empty()).then_some(phrase)
}

/// Normalize an infobox cell into a taxon value. Non-textual cells are absent.
pub fn normalize_taxon(raw: &str) -> Option<String> {
    let key = normalize_key(raw);
    is_textual(&key).then_some(key)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop() -> StopList {
        StopList::new(["citation needed", "Rome", "a"])
    }

    #[test]
    fn textual_requires_a_letter() {
        assert!(is_textual("burns"));
        assert!(is_textual("  x1 "));
        assert!(!is_textual("123"));
        assert!(!is_textual("[4]"));
        assert!(!is_textual(""));
    }

    #[test]
    fn clean_display_strips_markers_keeps_case() {
        assert_eq!(clean_display("  Aloe vera[1] "), "Aloe vera");
        assert_eq!(clean_display("Wounds [citation needed]"), "Wounds");
        assert_eq!(clean_display("Burns 12"), "Burns");
        assert_eq!(clean_display("Skin\n  rash"), "Skin rash");
    }

    #[test]
    fn digits_inside_a_name_are_kept() {
        let stop = stop();
        assert_eq!(normalize_effect("vitamin B12", &stop), Some("vitamin b12".into()));
        assert_eq!(normalize_effect("COVID-19", &stop), Some("covid-19".into()));
        assert_eq!(normalize_effect("COVID-19 [4]", &stop), Some("covid-19".into()));
        assert_eq!(clean_display("Type2"), "Type2");
    }

    #[test]
    fn normalize_key_is_idempotent() {
        let samples = [
            "  Aloe Vera[1] ",
            "x [1] 2 3",
            "[[a]] b",
            "a [b",
            "Fever\u{a0}2",
            "  MiXeD   Case  ",
            "",
        ];
        for s in samples {
            let once = normalize_key(s);
            assert_eq!(normalize_key(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn effect_labels_are_lowercased_and_filtered() {
        let stop = stop();
        assert_eq!(normalize_effect("Wounds", &stop), Some("wounds".into()));
        assert_eq!(normalize_effect("Rome", &stop), None);
        assert_eq!(normalize_effect("[3]", &stop), None);
        assert_eq!(normalize_effect("a", &stop), None);
    }

    #[test]
    fn stop_list_is_exact_match() {
        let stop = stop();
        assert!(stop.contains(" citation needed "));
        assert!(!stop.contains("Citation needed"));
        assert!(!stop.contains("rome"));
    }

    #[test]
    fn adverse_phrases_are_short_and_alphabetic() {
        let stop = stop();
        assert_eq!(normalize_adverse_phrase(" nausea", &stop, 3), Some("nausea".into()));
        assert_eq!(
            normalize_adverse_phrase("Liver damage[2]", &stop, 3),
            Some("liver damage".into())
        );
        assert_eq!(normalize_adverse_phrase(" citation needed", &stop, 3), None);
        assert_eq!(
            normalize_adverse_phrase("may cause severe vomiting", &stop, 3),
            None
        );
        assert_eq!(normalize_adverse_phrase(" 42 ", &stop, 3), None);
        assert_eq!(
            normalize_adverse_phrase("high-dose toxicity", &stop, 3),
            Some("highdose toxicity".into())
        );
    }

    #[test]
    fn taxon_values_are_keys() {
        assert_eq!(normalize_taxon(" Plantae "), Some("plantae".into()));
        assert_eq!(normalize_taxon("Aloe[1]"), Some("aloe".into()));
        assert_eq!(normalize_taxon("--"), None);
    }
}
