//! Merge/rank candidates from every source (spec.md §4.7).
//!
//! `Source` is the tagged-variant replacement the design notes (§9) call
//! for in place of dynamic dispatch over candidate-source types, in the
//! same spirit as the teacher's `CandidateStrategy` enum — one variant per
//! kind, a `priority()` method instead of a vtable.

use std::collections::HashMap;

use crate::dict::Dictionary;
use crate::emoji::{strip_trigger, EmojiIndex};
use crate::userdb::UserDb;

/// §3 candidate source set, ordered here by the priority tie-break rule
/// in §4.7 step 6 (`user_db > dictionary > spellcheck > emoji >
/// compose_completion`); `related` is not ranked by that rule, so it is
/// placed just below `emoji` — a dedicated "related emoji" listing is
/// always a distinct request from ordinary candidate production, so the
/// two rarely compete directly (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Source {
    UserDb,
    Dictionary,
    Spellcheck,
    Emoji,
    Related,
    ComposeCompletion,
}

impl Source {
    fn priority(self) -> u8 {
        match self {
            Source::UserDb => 0,
            Source::Dictionary => 1,
            Source::Spellcheck => 2,
            Source::Emoji => 3,
            Source::Related => 4,
            Source::ComposeCompletion => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    CodePoint(u32),
    Language(String),
    SkinToneVariant(String),
}

/// §3 `Candidate`.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub text: String,
    pub source: Source,
    pub score: f64,
    pub annotation: Option<Annotation>,
    pub rank: usize,
}

/// Tier base offsets keeping cross-source ordering stable even when a
/// later step's raw scores would otherwise overlap an earlier step's: each
/// tier occupies its own order of magnitude, so "sort by score desc" does
/// the cross-source ordering from §4.7 step 6 and the explicit
/// `Source::priority` tie-break only matters for literal ties.
mod tiers {
    pub const USER_DB: f64 = 1_000.0;
    pub const DICTIONARY: f64 = 100.0;
    pub const SUGGEST: f64 = 10.0;
    pub const EMOJI: f64 = 1.0;
}

#[derive(Debug, Clone)]
pub struct CandidateOptions {
    pub page_size: usize,
    pub emoji_predictions: bool,
    pub emoji_trigger_characters: String,
    pub inline_completion: bool,
    pub inline_confidence_threshold: f64,
    pub auto_select_candidate: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateList {
    pub candidates: Vec<Candidate>,
    pub inline_suggestion: Option<Candidate>,
    pub selected: Option<usize>,
    /// Count of candidates matched before pagination, so a caller can tell
    /// whether another `page_up`/`page_down` step has anywhere to go.
    pub total: usize,
}

/// §4.7 merge/rank pipeline. `prefix_views` are the canonical + per-method
/// transliterated views of the live preedit (one query per active script).
/// `page` slices the ranked result into `options.page_size`-sized windows
/// (§4.1 `page_up`/`page_down`) rather than discarding everything past the
/// first page.
pub fn generate(
    prefix_views: &[String],
    context1: &str,
    context2: &str,
    user_db: &UserDb,
    dictionaries: &dyn Dictionary,
    emoji_index: Option<&EmojiIndex>,
    options: &CandidateOptions,
    page: usize,
) -> CandidateList {
    let mut merged: HashMap<String, Candidate> = HashMap::new();

    // 1. UserDB, merged by phrase (max score across prefix views).
    for view in prefix_views {
        for (entry, score) in user_db.lookup(view, context1, context2) {
            insert_best(&mut merged, Candidate {
                text: entry.phrase,
                source: Source::UserDb,
                score: tiers::USER_DB + score,
                annotation: None,
                rank: 0,
            });
        }
    }

    let short_threshold = options.page_size * 2;

    // 2. Dictionary completions, lower base score, only if still short.
    if merged.len() < short_threshold {
        for view in prefix_views {
            for (idx, word) in dictionaries.lookup(view).into_iter().enumerate() {
                insert_best(&mut merged, Candidate {
                    text: word,
                    source: Source::Dictionary,
                    score: tiers::DICTIONARY - idx as f64 * 0.001,
                    annotation: None,
                    rank: 0,
                });
            }
        }
    }

    // 3. Spell-corrections, further lowered, only if still short.
    if merged.len() < short_threshold {
        for view in prefix_views {
            for (idx, word) in dictionaries.suggest(view, options.page_size * 2).into_iter().enumerate() {
                insert_best(&mut merged, Candidate {
                    text: word,
                    source: Source::Spellcheck,
                    score: tiers::SUGGEST - idx as f64 * 0.001,
                    annotation: None,
                    rank: 0,
                });
            }
        }
    }

    // 4. Emoji, when enabled or triggered.
    if let Some(index) = emoji_index {
        for view in prefix_views {
            let (triggered, query) = strip_trigger(view, &options.emoji_trigger_characters);
            if options.emoji_predictions || triggered {
                for m in index.query(query) {
                    let entry = index.entry(m.entry_index);
                    insert_best(&mut merged, Candidate {
                        text: entry.text(),
                        source: Source::Emoji,
                        score: tiers::EMOJI + m.score,
                        annotation: entry.code_point_sequence.first().map(|cp| Annotation::CodePoint(*cp)),
                        rank: 0,
                    });
                }
            }
        }
    }

    // 6. Sort by score desc, tie-break by source priority then lexicographic.
    let mut candidates: Vec<Candidate> = merged.into_values().collect();
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source.priority().cmp(&b.source.priority()))
            .then_with(|| a.text.cmp(&b.text))
    });

    // 7. Paginate: slice the full ranked list into one `page_size` window
    // instead of discarding everything past page 0.
    let total = candidates.len();
    let page_size = options.page_size.max(1);
    let start = page.saturating_mul(page_size).min(total);
    let end = (start + page_size).min(total);
    let mut candidates: Vec<Candidate> = candidates[start..end].to_vec();
    for (idx, c) in candidates.iter_mut().enumerate() {
        c.rank = idx;
    }

    let inline_suggestion = inline_candidate(&candidates, prefix_views, options);
    let selected = if options.auto_select_candidate && !candidates.is_empty() { Some(0) } else { None };

    CandidateList { candidates, inline_suggestion, selected, total }
}

/// Merge a duplicate text: keep the higher score, and the higher-priority
/// (numerically lower) source when scores tie or the new one wins.
fn insert_best(merged: &mut HashMap<String, Candidate>, candidate: Candidate) {
    merged
        .entry(candidate.text.clone())
        .and_modify(|existing| {
            if candidate.score > existing.score {
                *existing = candidate.clone();
            }
        })
        .or_insert(candidate);
}

/// §4.7 "Inline mode": the first candidate becomes an inline suggestion
/// when enabled, confident enough, and it strictly extends the canonical
/// prefix.
fn inline_candidate(candidates: &[Candidate], prefix_views: &[String], options: &CandidateOptions) -> Option<Candidate> {
    if !options.inline_completion {
        return None;
    }
    let top = candidates.first()?;
    if top.score < options.inline_confidence_threshold {
        return None;
    }
    let canonical = prefix_views.first()?;
    if top.text.len() > canonical.len() && top.text.starts_with(canonical.as_str()) {
        Some(top.clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::WordList;
    use crate::emoji::{EmojiEntry, EmojiIndex};

    fn opts() -> CandidateOptions {
        CandidateOptions {
            page_size: 6,
            emoji_predictions: true,
            emoji_trigger_characters: "_".to_string(),
            inline_completion: false,
            inline_confidence_threshold: 500.0,
            auto_select_candidate: false,
        }
    }

    fn camel_emoji_index() -> EmojiIndex {
        EmojiIndex::build(vec![EmojiEntry {
            code_point_sequence: vec![0x1F42B],
            names_by_language: [("en".to_string(), "camel".to_string())].into_iter().collect(),
            keywords_by_language: HashMap::new(),
            categories: vec![],
            unicode_version: "6.0".to_string(),
            fallback_names: vec![],
        }])
    }

    #[test]
    fn scenario_camel_emoji_with_empty_userdb() {
        let db = UserDb::new(100);
        let dict = WordList::from_words(["camel".to_string()]);
        let index = camel_emoji_index();
        let list = generate(&["camel".to_string()], "", "", &db, &dict, Some(&index), &opts(), 0);

        let texts: Vec<&str> = list.candidates.iter().map(|c| c.text.as_str()).collect();
        assert!(texts.contains(&"camel"));
        assert!(texts.contains(&"\u{1F42B}"));
        assert_eq!(texts[0], "camel");
    }

    #[test]
    fn no_duplicate_texts_and_scores_non_increasing() {
        let mut db = UserDb::new(100);
        db.record_commit("camel", "", "");
        let dict = WordList::from_words(["camel".to_string(), "camera".to_string()]);
        let list = generate(&["cam".to_string()], "", "", &db, &dict, None, &opts(), 0);

        let mut seen = std::collections::HashSet::new();
        for c in &list.candidates {
            assert!(seen.insert(c.text.clone()), "duplicate text {}", c.text);
        }
        for w in list.candidates.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
    }

    #[test]
    fn pagination_slices_one_page_and_reports_total() {
        let db = UserDb::new(100);
        let words: Vec<String> = (0..20).map(|i| format!("cam{i}")).collect();
        let dict = WordList::from_words(words);
        let mut options = opts();
        options.page_size = 3;
        let list = generate(&["cam".to_string()], "", "", &db, &dict, None, &options, 0);
        assert_eq!(list.candidates.len(), 3);
        assert_eq!(list.total, 20);
    }

    #[test]
    fn pagination_advances_to_next_window() {
        let db = UserDb::new(100);
        let words: Vec<String> = (0..20).map(|i| format!("cam{i}")).collect();
        let dict = WordList::from_words(words);
        let mut options = opts();
        options.page_size = 3;
        let page0 = generate(&["cam".to_string()], "", "", &db, &dict, None, &options, 0);
        let page1 = generate(&["cam".to_string()], "", "", &db, &dict, None, &options, 1);
        assert_eq!(page1.candidates.len(), 3);
        assert_ne!(page0.candidates[0].text, page1.candidates[0].text);
    }

    #[test]
    fn page_past_the_end_yields_empty_list() {
        let db = UserDb::new(100);
        let dict = WordList::from_words(["camel".to_string()]);
        let list = generate(&["cam".to_string()], "", "", &db, &dict, None, &opts(), 50);
        assert!(list.candidates.is_empty());
        assert_eq!(list.total, 1);
    }

    #[test]
    fn auto_select_marks_first_candidate() {
        let mut db = UserDb::new(100);
        db.record_commit("camel", "", "");
        let dict = WordList::from_words(["camel".to_string()]);
        let mut options = opts();
        options.auto_select_candidate = true;
        let list = generate(&["camel".to_string()], "", "", &db, &dict, None, &options, 0);
        assert_eq!(list.selected, Some(0));
    }
}
