//! Character-level Unicode helpers shared by the compose engine, the
//! dictionaries' accent-insensitive matching, and the emoji index.

use unicode_normalization::char::decompose_canonical;
use unicode_normalization::UnicodeNormalization;

/// Unicode general category, narrowed to the two letter-case classes the
/// dead-key fallback cares about (§4.3: "the final key is a letter (Unicode
/// category Ll or Lu)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LetterCase {
    Lower,
    Upper,
}

/// Classify `c` as lowercase/uppercase letter, or `None` if it is neither
/// (matches the Ll/Lu restriction from the compose fallback rule).
pub fn letter_case(c: char) -> Option<LetterCase> {
    if c.is_lowercase() {
        Some(LetterCase::Lower)
    } else if c.is_uppercase() {
        Some(LetterCase::Upper)
    } else {
        None
    }
}

/// NFC-normalize a string. Thin wrapper so call sites don't need to import
/// the normalization crate directly and so the dead-key fallback's call
/// site reads as a named operation.
pub fn nfc(s: &str) -> String {
    s.nfc().collect()
}

/// Compose `base` followed by `marks` (already in the order they should be
/// applied) and return the NFC-normalized result, per §4.3's dead-key
/// fallback: "synthesize the base letter followed by the combining marks
/// ... in reverse order, run Unicode NFC normalization".
pub fn compose_with_marks(base: char, marks: impl Iterator<Item = char>) -> String {
    let mut s = String::new();
    s.push(base);
    for m in marks {
        s.push(m);
    }
    nfc(&s)
}

/// Fold a string to a canonical accent-insensitive form for prefix matching:
/// NFKD, strip combining marks, lowercase (§4.5).
pub fn fold_diacritics(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        decompose_canonical(c, |decomposed| {
            if !is_combining_mark(decomposed) {
                out.push(decomposed);
            }
        });
    }
    out.to_lowercase()
}

/// Whether `c` falls in a Unicode combining-mark block relevant to Latin-
/// script diacritics (Combining Diacritical Marks + Combining Diacritical
/// Marks Supplement/Extended, enough for the fold tables §4.5 describes).
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF)
}

/// Split a query into normalized keyword tokens: lowercase, split on
/// whitespace/underscore, fold diacritics (§4.6 EmojiIndex normalization).
pub fn tokenize_keywords(s: &str) -> Vec<String> {
    fold_diacritics(s)
        .split(|c: char| c.is_whitespace() || c == '_')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_macron_dead_abovedot_e() {
        // Typed order: Dead-macron, Dead-abovedot, e. Marks apply in
        // reverse-typed order, so abovedot (closest to e) comes first,
        // then macron: e + abovedot composes to U+0117, + macron stays
        // combining since no precomposed form exists.
        let result = compose_with_marks('e', ['\u{0307}', '\u{0304}'].into_iter());
        assert_eq!(result, "\u{0117}\u{0304}");
    }

    #[test]
    fn fold_strips_accents_and_lowercases() {
        assert_eq!(fold_diacritics("Café"), "cafe");
        assert_eq!(fold_diacritics("NAÏVE"), "naive");
    }

    #[test]
    fn tokenize_splits_on_space_and_underscore() {
        assert_eq!(
            tokenize_keywords("Grinning_Face with Sweat"),
            vec!["grinning", "face", "with", "sweat"]
        );
    }

    #[test]
    fn letter_case_classifies() {
        assert_eq!(letter_case('a'), Some(LetterCase::Lower));
        assert_eq!(letter_case('A'), Some(LetterCase::Upper));
        assert_eq!(letter_case('5'), None);
    }
}
