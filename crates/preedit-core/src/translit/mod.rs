//! Multi-script transliteration (spec.md §4.2).
//!
//! Each configured input method is a small greedy-match automaton over a
//! [`MethodTable`], the same longest-pending-match shape as the teacher's
//! `convert_romaji`/`handle_no_match`: keep draining a pending raw-key
//! buffer against the table, committing the longest match found, until
//! nothing more can be resolved without another keystroke. The
//! Japanese-specific extra heuristics in the teacher (sokuon/hatsuon
//! doubling, latin+kana collapse) are dropped here — they belong to one
//! script's quirks, not to the general `feed/reset/transliterate`
//! contract this component exposes (see DESIGN.md).

mod trie;

pub use trie::{MethodLookup, MethodTable, MethodTableError};

/// One configured input method's live conversion state.
#[derive(Clone)]
pub struct TransliterationMethod {
    name: String,
    table: MethodTable,
    pending: String,
}

impl TransliterationMethod {
    pub fn new(name: impl Into<String>, table: MethodTable) -> Self {
        Self {
            name: name.into(),
            table,
            pending: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// §4.2 `feed(key) -> (committed_chars, pending_context)`. Appends the
    /// raw key to the pending buffer and drains as much as can be resolved
    /// without ambiguity (an `ExactAndPrefix` match is held back in case a
    /// longer sequence is typed next).
    pub fn feed(&mut self, key: &str) -> (String, String) {
        self.pending.push_str(key);
        let mut committed = String::new();

        loop {
            if self.pending.is_empty() {
                break;
            }
            match self.table.lookup(&self.pending) {
                MethodLookup::Exact(s) => {
                    committed.push_str(&s);
                    self.pending.clear();
                }
                MethodLookup::ExactAndPrefix(_) | MethodLookup::Prefix => break,
                MethodLookup::None => {
                    if !drain_longest_subprefix(&self.table, &mut self.pending, &mut committed) {
                        // No sub-prefix resolves either: the oldest pending
                        // char cannot combine with anything, pass it
                        // through unchanged so input is never silently lost.
                        let c = self.pending.remove(0);
                        committed.push(c);
                    }
                }
            }
        }

        (committed, self.pending.clone())
    }

    /// Force-resolve whatever's pending (e.g. on commit or cursor move),
    /// consuming `ExactAndPrefix` matches immediately rather than waiting
    /// for a longer sequence.
    pub fn flush(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        match self.table.lookup(&self.pending) {
            MethodLookup::Exact(s) | MethodLookup::ExactAndPrefix(s) => {
                self.pending.clear();
                s
            }
            _ => std::mem::take(&mut self.pending),
        }
    }

    pub fn reset(&mut self) {
        self.pending.clear();
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// §4.2 `transliterate(token_sequence) -> string`: deterministic
    /// recomputation from scratch. Required after cursor edits so the view
    /// string is a pure function of the token sequence, never dependent on
    /// how we got here (§4.2 invariant).
    pub fn transliterate(&self, raw_tokens: &[String]) -> String {
        let mut scratch = TransliterationMethod::new(self.name.clone(), self.table.clone());
        let mut out = String::new();
        for token in raw_tokens {
            let (committed, _) = scratch.feed(token);
            out.push_str(&committed);
        }
        out.push_str(&scratch.flush());
        out
    }
}

/// Try progressively shorter prefixes of `pending` (longest first); if one
/// resolves, push its result and shrink `pending` to the unconsumed
/// remainder. Returns whether anything was consumed.
fn drain_longest_subprefix(table: &MethodTable, pending: &mut String, committed: &mut String) -> bool {
    let chars: Vec<char> = pending.chars().collect();
    for len in (1..chars.len()).rev() {
        let sub: String = chars[..len].iter().collect();
        if let MethodLookup::Exact(s) | MethodLookup::ExactAndPrefix(s) = table.lookup(&sub) {
            committed.push_str(&s);
            *pending = chars[len..].iter().collect();
            return true;
        }
    }
    false
}

/// Holds up to 10 configured methods (§4.2) plus the identity `NoIME`
/// method that is implicit whenever the configured list is empty. One
/// method is always "current" — the one `next_input_method`/
/// `previous_input_method` (§4.1) rotate and that `canonical()` reads,
/// rather than always taking the first configured method.
pub struct TransliterationSet {
    methods: Vec<TransliterationMethod>,
    current: usize,
}

impl TransliterationSet {
    pub const MAX_METHODS: usize = 10;

    pub fn new(methods: Vec<TransliterationMethod>) -> Self {
        let mut methods = methods;
        methods.truncate(Self::MAX_METHODS);
        if methods.is_empty() {
            methods.push(TransliterationMethod::new("NoIME", MethodTable::identity()));
        }
        TransliterationSet { methods, current: 0 }
    }

    pub fn methods(&self) -> &[TransliterationMethod] {
        &self.methods
    }

    pub fn methods_mut(&mut self) -> &mut [TransliterationMethod] {
        &mut self.methods
    }

    pub fn by_name(&self, name: &str) -> Option<&TransliterationMethod> {
        self.methods.iter().find(|m| m.name() == name)
    }

    /// The method `canonical()` uses and `next`/`previous` rotate.
    pub fn current(&self) -> &TransliterationMethod {
        &self.methods[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn next_method(&mut self) {
        self.current = (self.current + 1) % self.methods.len();
    }

    pub fn previous_method(&mut self) {
        self.current = (self.current + self.methods.len() - 1) % self.methods.len();
    }

    pub fn reset_all(&mut self) {
        for m in &mut self.methods {
            m.reset();
        }
    }
}
