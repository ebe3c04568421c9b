//! The live preedit buffer (spec.md §3 `Preedit`).
//!
//! Each typed token is kept as its raw key so that every active
//! transliteration view can be recomputed from scratch — the teacher's
//! `Composition` keeps a single mutable `kana` string it patches in place;
//! here we keep the token history instead so §4.2's purity invariant
//! ("the resulting string is a pure function of the token sequence") has
//! something to recompute from after a cursor move.

use preedit_core::TransliterationSet;

#[derive(Debug, Clone)]
pub struct Preedit {
    raw_tokens: Vec<String>,
    cursor: usize,
}

impl Preedit {
    pub fn new() -> Self {
        Preedit { raw_tokens: Vec::new(), cursor: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.raw_tokens.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Insert a raw key at the cursor, advancing it.
    pub fn insert(&mut self, raw_key: impl Into<String>) {
        self.raw_tokens.insert(self.cursor, raw_key.into());
        self.cursor += 1;
    }

    /// Remove the token just before the cursor. Returns whether anything
    /// was removed (false at the start of the buffer).
    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.raw_tokens.remove(self.cursor - 1);
        self.cursor -= 1;
        true
    }

    /// Remove the token at the cursor (forward delete). Returns whether
    /// anything was removed (false at the end of the buffer).
    pub fn delete_forward(&mut self) -> bool {
        if self.cursor >= self.raw_tokens.len() {
            return false;
        }
        self.raw_tokens.remove(self.cursor);
        true
    }

    pub fn cursor_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn cursor_right(&mut self) -> bool {
        if self.cursor >= self.raw_tokens.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn clear(&mut self) {
        self.raw_tokens.clear();
        self.cursor = 0;
    }

    pub fn raw_tokens(&self) -> &[String] {
        &self.raw_tokens
    }

    /// Every active view string, §3: "for each active transliteration, a
    /// view string". Each is a from-scratch recomputation (§4.2), so
    /// incremental edits never drift from what a full replay would produce.
    pub fn views(&self, methods: &TransliterationSet) -> Vec<String> {
        methods.methods().iter().map(|m| m.transliterate(&self.raw_tokens)).collect()
    }

    /// §3 "canonical string": the transliteration chosen by priority — the
    /// current configured method (`next_input_method`/`previous_input_method`
    /// rotate it, §4.1), falling back to the raw keys untransliterated if
    /// no method is configured (unreachable in practice since
    /// `TransliterationSet` always carries at least NoIME).
    pub fn canonical(&self, methods: &TransliterationSet) -> String {
        if methods.methods().is_empty() {
            return self.raw_tokens.concat();
        }
        methods.current().transliterate(&self.raw_tokens)
    }
}

impl Default for Preedit {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preedit_core::translit::{MethodTable, TransliterationMethod};

    fn hi_itrans_set() -> TransliterationSet {
        let table = MethodTable::parse_toml(
            r#"
[mappings]
g = "ग"
gu = "गु"
guru = "गुरु"
"#,
        )
        .unwrap();
        TransliterationSet::new(vec![
            TransliterationMethod::new("hi-itrans", table),
            TransliterationMethod::new("NoIME", MethodTable::identity()),
        ])
    }

    #[test]
    fn views_track_every_configured_method() {
        let mut p = Preedit::new();
        for k in ["g", "u", "r", "u"] {
            p.insert(k);
        }
        let set = hi_itrans_set();
        let views = p.views(&set);
        assert_eq!(views, vec!["गुरु".to_string(), "guru".to_string()]);
    }

    #[test]
    fn backspace_then_recompute_matches_fresh_replay() {
        let mut p = Preedit::new();
        for k in ["g", "u", "r", "u"] {
            p.insert(k);
        }
        p.backspace();
        let set = hi_itrans_set();
        let after_backspace = p.canonical(&set);

        let mut fresh = Preedit::new();
        for k in ["g", "u", "r"] {
            fresh.insert(k);
        }
        assert_eq!(after_backspace, fresh.canonical(&set));
    }

    #[test]
    fn delete_forward_removes_token_at_cursor() {
        let mut p = Preedit::new();
        for k in ["c", "a", "m"] {
            p.insert(k);
        }
        p.cursor_left();
        assert!(p.delete_forward());
        assert_eq!(p.raw_tokens(), &["c".to_string(), "a".to_string()]);
        assert!(!p.delete_forward());
    }

    #[test]
    fn cursor_left_at_start_is_noop() {
        let mut p = Preedit::new();
        assert!(!p.cursor_left());
        p.insert("g");
        assert!(p.cursor_left());
        assert!(!p.cursor_left());
    }
}
