//! Emoji/Unicode symbol index (spec.md §4.6).
//!
//! No teacher module covers this directly — Japanese kana conversion has
//! no emoji component — so this is built in the teacher's idiom
//! (an immutable index built once at startup, small focused scoring
//! functions, doc comments on the public contract only) rather than
//! grounded on a specific teacher file. Tokenization reuses
//! [`crate::unicode::tokenize_keywords`].

use std::collections::HashMap;

use crate::unicode::tokenize_keywords;

/// §3 `EmojiEntry`. Immutable after load.
#[derive(Debug, Clone)]
pub struct EmojiEntry {
    pub code_point_sequence: Vec<u32>,
    pub names_by_language: HashMap<String, String>,
    pub keywords_by_language: HashMap<String, Vec<String>>,
    pub categories: Vec<String>,
    pub unicode_version: String,
    pub fallback_names: Vec<String>,
}

impl EmojiEntry {
    pub fn text(&self) -> String {
        self.code_point_sequence
            .iter()
            .filter_map(|cp| char::from_u32(*cp))
            .collect()
    }

    fn all_keyword_strings(&self) -> impl Iterator<Item = &str> {
        self.names_by_language
            .values()
            .map(|s| s.as_str())
            .chain(self.keywords_by_language.values().flatten().map(|s| s.as_str()))
            .chain(self.fallback_names.iter().map(|s| s.as_str()))
    }
}

/// A scored query hit.
#[derive(Debug, Clone, PartialEq)]
pub struct EmojiMatch {
    pub entry_index: usize,
    pub score: f64,
}

/// In-memory inverted index: normalized keyword token → entries containing
/// it (§4.6). Built once at startup from bundled data; immutable
/// thereafter, matching the read-mostly shared-resource model (§5).
pub struct EmojiIndex {
    entries: Vec<EmojiEntry>,
    inverted: HashMap<String, Vec<usize>>,
    by_codepoint: HashMap<u32, usize>,
}

impl EmojiIndex {
    pub fn build(entries: Vec<EmojiEntry>) -> Self {
        let mut inverted: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_codepoint = HashMap::new();

        for (idx, entry) in entries.iter().enumerate() {
            let mut tokens: Vec<String> = entry
                .all_keyword_strings()
                .flat_map(tokenize_keywords)
                .collect();
            tokens.sort();
            tokens.dedup();
            for token in tokens {
                inverted.entry(token).or_default().push(idx);
            }
            if entry.code_point_sequence.len() == 1 {
                by_codepoint.insert(entry.code_point_sequence[0], idx);
            }
        }

        EmojiIndex { entries, inverted, by_codepoint }
    }

    pub fn entry(&self, index: usize) -> &EmojiEntry {
        &self.entries[index]
    }

    /// §4.6 main query path: tokenize `query`, score each token against
    /// every candidate name/keyword the entry carries, intersect the
    /// candidate sets, sum per-token scores. A bare 4-6 hex digit query
    /// additionally resolves directly by code point.
    pub fn query(&self, query: &str) -> Vec<EmojiMatch> {
        if let Some(entry_idx) = parse_hex_codepoint(query).and_then(|cp| self.by_codepoint.get(&cp)) {
            return vec![EmojiMatch { entry_index: *entry_idx, score: f64::MAX }];
        }

        let tokens = tokenize_keywords(query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut candidate_sets: Vec<Vec<usize>> = Vec::with_capacity(tokens.len());
        for token in &tokens {
            let set = self.candidates_for_token(token);
            if set.is_empty() {
                return Vec::new();
            }
            candidate_sets.push(set);
        }

        let intersection = candidate_sets
            .into_iter()
            .reduce(|a, b| {
                let b_set: std::collections::HashSet<usize> = b.into_iter().collect();
                a.into_iter().filter(|i| b_set.contains(i)).collect()
            })
            .unwrap_or_default();

        let mut scored: Vec<EmojiMatch> = intersection
            .into_iter()
            .map(|idx| EmojiMatch {
                entry_index: idx,
                score: tokens.iter().map(|t| self.best_token_score(t, idx)).sum(),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }

    fn candidates_for_token(&self, token: &str) -> Vec<usize> {
        // Any entry whose keyword set contains, starts with, or is fuzzy
        // close to `token` is a candidate; the inverted index only holds
        // exact tokens, so non-exact matches are found by scanning each
        // entry's own keyword list once scores are computed below. For
        // indexable entries (exact match) we can shortcut through the map.
        if let Some(exact) = self.inverted.get(token) {
            return exact.clone();
        }
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.all_keyword_strings().flat_map(tokenize_keywords).any(|k| fuzzy_score(token, &k) > 0.0))
            .map(|(idx, _)| idx)
            .collect()
    }

    fn best_token_score(&self, token: &str, entry_idx: usize) -> f64 {
        self.entries[entry_idx]
            .all_keyword_strings()
            .flat_map(tokenize_keywords)
            .map(|k| fuzzy_score(token, &k))
            .fold(0.0, f64::max)
    }

    /// §4.6 `related(codepoint_seq)`: emoji sharing >=1 keyword/category,
    /// scored by overlap count.
    pub fn related(&self, code_point_sequence: &[u32]) -> Vec<EmojiMatch> {
        let Some((idx, entry)) = self
            .entries
            .iter()
            .enumerate()
            .find(|(_, e)| e.code_point_sequence == code_point_sequence)
        else {
            return Vec::new();
        };

        let keywords: std::collections::HashSet<String> =
            entry.all_keyword_strings().flat_map(tokenize_keywords).collect();
        let categories: std::collections::HashSet<&str> = entry.categories.iter().map(|s| s.as_str()).collect();

        let mut scored: Vec<EmojiMatch> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != idx)
            .filter_map(|(i, other)| {
                let other_keywords: std::collections::HashSet<String> =
                    other.all_keyword_strings().flat_map(tokenize_keywords).collect();
                let keyword_overlap = keywords.intersection(&other_keywords).count();
                let category_overlap = other.categories.iter().filter(|c| categories.contains(c.as_str())).count();
                let overlap = keyword_overlap + category_overlap;
                if overlap > 0 {
                    Some(EmojiMatch { entry_index: i, score: overlap as f64 })
                } else {
                    None
                }
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored
    }
}

fn parse_hex_codepoint(s: &str) -> Option<u32> {
    let s = s.trim();
    if (4..=6).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit()) {
        u32::from_str_radix(s, 16).ok()
    } else {
        None
    }
}

/// Per-token fuzzy scorer (§4.6): exact > prefix > substring > edit-
/// distance-within-2, score proportional to matched-length/candidate-
/// name-length.
fn fuzzy_score(query_token: &str, candidate_token: &str) -> f64 {
    if candidate_token.is_empty() {
        return 0.0;
    }
    let ratio = |matched_len: usize| matched_len as f64 / candidate_token.chars().count() as f64;

    if query_token == candidate_token {
        return 3.0 * ratio(candidate_token.chars().count());
    }
    if candidate_token.starts_with(query_token) {
        return 2.0 * ratio(query_token.chars().count());
    }
    if candidate_token.contains(query_token) {
        return 1.0 * ratio(query_token.chars().count());
    }
    let dist = bounded_edit_distance(query_token, candidate_token, 2);
    if let Some(dist) = dist {
        let matched = candidate_token.chars().count().saturating_sub(dist);
        return 0.5 * ratio(matched);
    }
    0.0
}

/// Edit distance, short-circuiting (returning `None`) once it's certain to
/// exceed `max`. Full DP is unnecessary for the 2-edit threshold this
/// scorer uses.
fn bounded_edit_distance(a: &str, b: &str, max: usize) -> Option<usize> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.len().abs_diff(b.len()) > max {
        return None;
    }
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
    let dist = prev[b.len()];
    (dist <= max).then_some(dist)
}

/// Whether `query` is solely the configured emoji trigger character
/// (leading or trailing), which forces emoji lookup even when
/// `emojipredictions` is off (§4.6) but by itself yields no candidates
/// (§8 boundary case).
pub fn strip_trigger<'a>(query: &'a str, trigger: &str) -> (bool, &'a str) {
    if !trigger.is_empty() && query.starts_with(trigger) {
        return (true, &query[trigger.len()..]);
    }
    if !trigger.is_empty() && query.ends_with(trigger) {
        return (true, &query[..query.len() - trigger.len()]);
    }
    (false, query)
}
