//! Dead-key/compose sequence interpretation (spec.md §4.3).
//!
//! The trie lookup shape is grounded directly on the teacher's
//! `RomajiTrie`/`TrieLookupResult` (a `DoubleArray` probe returning
//! exact/prefix/both/none) — renamed to the vocabulary the spec uses
//! (Live/Resolved/Undefined) since a compose trie and a romaji trie are
//! the same data structure playing different roles.

mod file;
mod trie;

pub use file::{parse_compose_file, parse_compose_file_into, parse_compose_files, ComposeFileError, ComposeFileWarning};
pub use trie::ComposeTrie;

use crate::unicode::{compose_with_marks, letter_case};

/// A single key in a compose sequence, as consumed by the engine. Distinct
/// from [`crate::keymap::KeyEvent`]: this is the post-KeyMap keysym string
/// the compose trie is keyed on (e.g. `"dead_macron"`, `"minus"`, `"e"`).
pub type Keysym = String;

/// Whether a keysym names a dead key (`dead_*`) or keypad variant
/// (`KP_*`), used by the two fallback rules.
fn is_dead_key(k: &str) -> bool {
    k.starts_with("dead_")
}

fn keypad_base(k: &str) -> Option<&str> {
    k.strip_prefix("KP_")
}

/// A keysym's combining-mark codepoint, for the dead-key fallback. The
/// compose trie's own dead-key entries are the authoritative source for
/// this mapping (each `dead_X` keysym's 1-key sequence result is itself
/// the combining mark), so this is looked up through the trie rather than
/// hardcoded here.
fn combining_mark_for(trie: &ComposeTrie, dead_keysym: &str) -> Option<char> {
    match trie.lookup(&[dead_keysym.to_string()]) {
        LookupResult::Resolved(s) if s.chars().count() == 1 => s.chars().next(),
        _ => None,
    }
}

/// Outcome of feeding one keysym into the compose engine (§4.3 steps 2-4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step 2: the extended prefix is a leaf. State is cleared.
    Resolved(String),
    /// Step 3: the extended prefix is a reachable interior node.
    Live,
    /// Step 4(a)/(b): resolved via dead-key or keypad fallback.
    Fallback(String),
    /// Step 4(c): the final key is rejected; prefix unchanged minus the
    /// rejected key.
    Error,
}

/// Result of a bare trie lookup (no fallback applied yet).
#[derive(Debug, Clone, PartialEq, Eq)]
enum LookupResult {
    None,
    Live,
    Resolved(String),
    ResolvedAndLive(String),
}

/// Owned compose state: the prefix of keysyms consumed so far. Empty when
/// no sequence is in progress (§3 `ComposeState`).
#[derive(Debug, Clone, Default)]
pub struct ComposeState {
    prefix: Vec<Keysym>,
}

impl ComposeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        !self.prefix.is_empty()
    }

    pub fn prefix(&self) -> &[Keysym] {
        &self.prefix
    }

    pub fn clear(&mut self) {
        self.prefix.clear();
    }
}

/// Stateless step function plus the owned [`ComposeState`] it mutates.
/// Kept as a free function (rather than a method bundling the trie and
/// state together) so `PreeditController` can hold one shared `ComposeTrie`
/// and one `ComposeState` per session without awkward borrow splitting.
pub fn feed(state: &mut ComposeState, trie: &ComposeTrie, key: Keysym) -> StepOutcome {
    let mut candidate_prefix = state.prefix.clone();
    candidate_prefix.push(key.clone());

    match trie.lookup(&candidate_prefix) {
        LookupResult::Resolved(s) | LookupResult::ResolvedAndLive(s) => {
            state.clear();
            StepOutcome::Resolved(s)
        }
        LookupResult::Live => {
            state.prefix = candidate_prefix;
            StepOutcome::Live
        }
        LookupResult::None => {
            if let Some(result) = try_dead_key_fallback(trie, &state.prefix, &key) {
                state.clear();
                return StepOutcome::Fallback(result);
            }
            if let Some(result) = try_keypad_fallback(state, trie, &key) {
                state.clear();
                return StepOutcome::Fallback(result);
            }
            // §4.3(c): discard only the rejected key, keep the valid prefix.
            StepOutcome::Error
        }
    }
}

/// §4.3(a): dead-key fallback. `prefix` must consist exclusively of dead
/// keys, and `key` must be a single letter (Ll/Lu).
fn try_dead_key_fallback(trie: &ComposeTrie, prefix: &[Keysym], key: &str) -> Option<String> {
    if prefix.is_empty() || !prefix.iter().all(|k| is_dead_key(k)) {
        return None;
    }
    let mut chars = key.chars();
    let base = chars.next()?;
    if chars.next().is_some() || letter_case(base).is_none() {
        return None;
    }
    let marks: Vec<char> = prefix
        .iter()
        .rev()
        .map(|dk| combining_mark_for(trie, dk))
        .collect::<Option<Vec<_>>>()?;
    Some(compose_with_marks(base, marks.into_iter()))
}

/// §4.3(b): keypad fallback. Substitutes `KP_X` for its normal-digit
/// equivalent (or the reverse) and re-attempts the whole prefix+key
/// lookup, without mutating `state` until a result is found.
fn try_keypad_fallback(state: &ComposeState, trie: &ComposeTrie, key: &str) -> Option<String> {
    let substituted_last = if let Some(base) = keypad_base(key) {
        base.to_string()
    } else {
        format!("KP_{key}")
    };

    let mut candidate: Vec<Keysym> = state.prefix.clone();
    candidate.push(substituted_last);
    match trie.lookup(&candidate) {
        LookupResult::Resolved(s) | LookupResult::ResolvedAndLive(s) => Some(s),
        _ => None,
    }
}

/// A compose-completion candidate for a live prefix (§4.3 "Completion
/// lookup"), annotated with the remaining keys and result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeCompletion {
    pub remaining_keys: Vec<Keysym>,
    pub result: String,
}

/// Enumerate completions of `state`'s live prefix, filtered to sequences
/// whose remaining keys are all present in `available_keysyms`. Tie-break
/// by result's leading character's Unicode category, then lexicographic
/// (approximated here as: printable-letter results before symbol/other
/// results, then plain string order — matches the teacher's habit of
/// keeping tie-break rules simple and total).
pub fn completions(
    state: &ComposeState,
    trie: &ComposeTrie,
    available_keysyms: &dyn Fn(&str) -> bool,
) -> Vec<ComposeCompletion> {
    let mut out: Vec<ComposeCompletion> = trie
        .enumerate_leaves(&state.prefix)
        .into_iter()
        .filter(|(remaining, _)| remaining.iter().all(|k| available_keysyms(k)))
        .map(|(remaining_keys, result)| ComposeCompletion { remaining_keys, result })
        .collect();

    out.sort_by(|a, b| {
        let a_letter = a.result.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false);
        let b_letter = b.result.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false);
        b_letter.cmp(&a_letter).then_with(|| a.result.cmp(&b.result))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn trie_with(entries: &[(&str, &str)]) -> ComposeTrie {
        let map: HashMap<Vec<Keysym>, String> = entries
            .iter()
            .map(|(seq, result)| {
                (
                    seq.split_whitespace().map(|s| s.to_string()).collect(),
                    result.to_string(),
                )
            })
            .collect();
        ComposeTrie::from_map(map)
    }

    #[test]
    fn resolves_known_sequence() {
        let trie = trie_with(&[("minus minus minus", "\u{2014}")]);
        let mut state = ComposeState::new();
        assert_eq!(feed(&mut state, &trie, "minus".into()), StepOutcome::Live);
        assert_eq!(feed(&mut state, &trie, "minus".into()), StepOutcome::Live);
        assert_eq!(
            feed(&mut state, &trie, "minus".into()),
            StepOutcome::Resolved("\u{2014}".into())
        );
        assert!(!state.is_active());
    }

    #[test]
    fn dead_key_fallback_composes_with_marks() {
        let trie = trie_with(&[
            ("dead_macron", "\u{0304}"),
            ("dead_abovedot", "\u{0307}"),
            ("dead_macron dead_abovedot dead_grave", "defined"),
        ]);
        let mut state = ComposeState::new();
        feed(&mut state, &trie, "dead_macron".into());
        feed(&mut state, &trie, "dead_abovedot".into());
        let outcome = feed(&mut state, &trie, "e".into());
        assert_eq!(outcome, StepOutcome::Fallback("\u{0117}\u{0304}".into()));
    }

    #[test]
    fn rejects_and_preserves_prefix_when_no_fallback_applies() {
        let trie = trie_with(&[("minus minus minus", "\u{2014}")]);
        let mut state = ComposeState::new();
        feed(&mut state, &trie, "minus".into());
        let outcome = feed(&mut state, &trie, "z".into());
        assert_eq!(outcome, StepOutcome::Error);
        assert_eq!(state.prefix(), &["minus".to_string()]);
    }

    #[test]
    fn keypad_fallback_substitutes_digit() {
        let trie = trie_with(&[("KP_5", "5")]);
        let mut state = ComposeState::new();
        let outcome = feed(&mut state, &trie, "5".into());
        assert_eq!(outcome, StepOutcome::Fallback("5".into()));
    }

    #[test]
    fn completions_filter_by_available_keysyms() {
        let trie = trie_with(&[
            ("minus minus minus", "\u{2014}"),
            ("minus greater", "\u{2192}"),
        ]);
        let mut state = ComposeState::new();
        feed(&mut state, &trie, "minus".into());
        let available = |k: &str| k != "greater";
        let out = completions(&state, &trie, &available);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].result, "\u{2014}");
    }
}
