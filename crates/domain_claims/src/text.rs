//! Lexical helpers shared by the rule engines
//!
//! Everything here is deterministic and allocation-light. Phrase matching is
//! done on word tokens, so "fire" matches "engine fire" but not "fireplace".

use std::collections::BTreeSet;

/// Lowercased alphanumeric tokens, in order. Apostrophes and inner hyphens
/// split words ("rear-ended" -> "rear", "ended").
pub fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .collect()
}

pub fn word_set(text: &str) -> BTreeSet<String> {
    tokens(text).into_iter().collect()
}

/// Jaccard overlap of the two texts' word sets, in `[0, 1]`. Empty on either
/// side yields 0.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let left = word_set(a);
    let right = word_set(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let shared = left.intersection(&right).count() as f64;
    let union = left.union(&right).count() as f64;
    shared / union
}

/// True when `phrase` occurs in `haystack` as a run of whole words.
pub fn contains_phrase(haystack: &[String], phrase: &str) -> bool {
    let needle = tokens(phrase);
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|window| window == needle.as_slice())
}

/// Phrases from `lexicon` that occur in any of `texts`, in lexicon order.
pub fn matching_phrases<'a>(texts: &[&str], lexicon: &'a [String]) -> Vec<&'a str> {
    let token_lists: Vec<Vec<String>> = texts.iter().map(|text| tokens(text)).collect();
    lexicon
        .iter()
        .filter(|phrase| token_lists.iter().any(|toks| contains_phrase(toks, phrase)))
        .map(String::as_str)
        .collect()
}

/// Snake-case tag for a phrase: "witnesses left" -> "witnesses_left".
pub fn tag(phrase: &str) -> String {
    tokens(phrase).join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_split_punctuation() {
        assert_eq!(tokens("Rear-ended, at 5th Ave."), vec!["rear", "ended", "at", "5th", "ave"]);
    }

    #[test]
    fn test_phrase_respects_word_boundaries() {
        let toks = tokens("Smoke from the fireplace");
        assert!(!contains_phrase(&toks, "fire"));
        assert!(contains_phrase(&tokens("Engine fire on the highway"), "fire"));
    }

    #[test]
    fn test_jaccard_bounds() {
        assert_eq!(jaccard("a b c", "a b c"), 1.0);
        assert_eq!(jaccard("a b", "c d"), 0.0);
        assert_eq!(jaccard("", "c d"), 0.0);
        assert!((jaccard("a b c d", "a b") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_tag() {
        assert_eq!(tag("Witnesses left"), "witnesses_left");
        assert_eq!(tag("pre-existing"), "pre_existing");
    }
}
