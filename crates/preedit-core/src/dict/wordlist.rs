use std::collections::BTreeMap;

use lexime_trie::DoubleArray;
use thiserror::Error;

use super::{fold_key, Dictionary};

#[derive(Debug, Error)]
pub enum WordListError {
    #[error("word list source error: {0}")]
    Parse(String),
}

/// A single locale's word list, keyed by accent-folded spelling for
/// prefix/membership lookups, built over `lexime-trie`'s `DoubleArray` the
/// same way `TrieDictionary::predict`/`exact_match` use it — minus the
/// mmap-backed binary container, since these lists are small enough to
/// keep fully in memory (see DESIGN.md).
pub struct WordList {
    da: DoubleArray<u8>,
    /// Original-spelling variants for each folded key, indexed by the
    /// trie's value id. A folded key can map to more than one accented
    /// spelling (e.g. "cafe" folds from both "café" and "cafe").
    spellings: Vec<Vec<String>>,
}

impl WordList {
    /// Build from a flat list of words (one per line, already in the
    /// target script/locale).
    pub fn from_words(words: impl IntoIterator<Item = String>) -> Self {
        let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for word in words {
            grouped.entry(fold_key(&word)).or_default().push(word);
        }
        for variants in grouped.values_mut() {
            variants.sort();
            variants.dedup();
        }

        let keys: Vec<&[u8]> = grouped.keys().map(|k| k.as_bytes()).collect();
        let da = DoubleArray::<u8>::build(&keys);
        let spellings = grouped.into_values().collect();

        WordList { da, spellings }
    }

    pub fn parse_lines(text: &str) -> Result<Self, WordListError> {
        let words = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_string);
        Ok(Self::from_words(words))
    }
}

impl Dictionary for WordList {
    fn lookup(&self, prefix: &str) -> Vec<String> {
        let folded = fold_key(prefix);
        self.da
            .predictive_search(folded.as_bytes())
            .flat_map(|m| self.spellings[m.value_id as usize].clone())
            .collect()
    }

    fn spellcheck(&self, word: &str) -> bool {
        let folded = fold_key(word);
        self.da.exact_match(folded.as_bytes()).is_some()
    }

    fn suggest(&self, word: &str, max_results: usize) -> Vec<String> {
        let folded = fold_key(word);
        let mut scored: Vec<(usize, &str)> = self
            .spellings
            .iter()
            .flatten()
            .map(|s| (edit_distance(&folded, &fold_key(s)), s.as_str()))
            .filter(|(dist, _)| *dist <= 2)
            .collect();
        scored.sort_by_key(|(dist, s)| (*dist, s.to_string()));
        scored.into_iter().take(max_results).map(|(_, s)| s.to_string()).collect()
    }
}

/// Levenshtein distance, used for `suggest`'s small bundled word lists.
/// Not the fuzzy scorer the emoji index uses (that one also rewards
/// prefix/substring matches); spelling suggestions only need distance.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WordList {
        WordList::from_words(["café".to_string(), "cafeteria".to_string(), "dog".to_string()])
    }

    #[test]
    fn lookup_is_accent_insensitive_but_returns_original_spelling() {
        let list = sample();
        let mut results = list.lookup("cafe");
        results.sort();
        assert_eq!(results, vec!["café".to_string(), "cafeteria".to_string()]);
    }

    #[test]
    fn spellcheck_folds_diacritics() {
        let list = sample();
        assert!(list.spellcheck("cafe"));
        assert!(list.spellcheck("café"));
        assert!(!list.spellcheck("caffe"));
    }

    #[test]
    fn suggest_ranks_by_edit_distance() {
        let list = sample();
        let suggestions = list.suggest("dob", 5);
        assert_eq!(suggestions, vec!["dog".to_string()]);
    }

    #[test]
    fn parse_lines_skips_blank_and_comment_lines() {
        let list = WordList::parse_lines("# header\napple\n\nbanana\n").unwrap();
        assert!(list.spellcheck("apple"));
        assert!(list.spellcheck("banana"));
    }
}
