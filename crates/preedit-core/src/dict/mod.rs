//! Per-locale spellchecker/word-list dictionaries (spec.md §4.5).
//!
//! The `Dictionary` trait's shape is grounded directly on the teacher's
//! `dict::Dictionary` (`lookup`/`predict`/`common_prefix_search`), renamed
//! to the spec's vocabulary (`lookup`/`suggest`/`spellcheck`). The backing
//! store drops the teacher's `TrieDictionary` mmap binary format (custom
//! `LXDX` byte layout, owned-vs-mmap value stores) — that complexity earns
//! its keep for multi-gigabyte connection-cost dictionaries, not for the
//! word-list-plus-frequency dictionaries this spec describes; see
//! DESIGN.md. `WordList` instead keeps the double-array trie for prefix
//! search but serializes with plain `bincode`.

mod composite;
mod wordlist;

pub use composite::CompositeDictionary;
pub use wordlist::{WordList, WordListError};

use crate::unicode::fold_diacritics;

/// Per-locale contract (§4.5): `lookup` (prefix completion), `spellcheck`
/// (membership), `suggest` (corrections for an out-of-dictionary word).
pub trait Dictionary: Send + Sync {
    /// Words whose accent-folded form starts with the accent-folded form
    /// of `prefix`. Results carry their original accented spelling.
    fn lookup(&self, prefix: &str) -> Vec<String>;

    fn spellcheck(&self, word: &str) -> bool;

    /// Spell-corrections for `word`, best first. Implementations are free
    /// to use any distance metric; the default here is edit-distance over
    /// the folded form, which is adequate for the small bundled word
    /// lists this engine loads.
    fn suggest(&self, word: &str, max_results: usize) -> Vec<String>;
}

/// Accent-insensitive fold used consistently by every `Dictionary`
/// implementation for both storage keys and query keys (§4.5: "folds
/// diacritics to a canonical form for prefix matching ... when comparing;
/// the original-accented form is returned as the candidate text").
pub fn fold_key(s: &str) -> String {
    fold_diacritics(s)
}
