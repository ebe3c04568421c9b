use std::collections::HashMap;
use std::sync::Arc;

use lexime_trie::DoubleArray;

use super::{Keysym, LookupResult};

/// Immutable map from key-sequences to result strings (§3 `ComposeTrie`).
/// Sequences are joined with `\u{1}` as a separator before being handed to
/// the byte-oriented `DoubleArray`, mirroring how `RomajiTrie` keys on raw
/// UTF-8 bytes of a single string — here the "string" is a joined sequence
/// of keysym names instead of a kana romanization.
///
/// Reload is atomic: building a new `ComposeTrie` and swapping an `Arc`
/// reference never mutates one in place (§4.3, §5).
#[derive(Clone)]
pub struct ComposeTrie {
    inner: Arc<Inner>,
}

struct Inner {
    da: DoubleArray<u8>,
    values: Vec<String>,
    /// Sorted sequence keys in the same order as `values`, kept alongside
    /// the double array so completion lookup can do a plain prefix scan
    /// without needing a reverse-traversal API from the trie crate.
    sequences: Vec<Vec<Keysym>>,
}

const SEP: char = '\u{1}';

fn join(seq: &[Keysym]) -> String {
    seq.join(&SEP.to_string())
}

impl ComposeTrie {
    /// Build from a finished (key-sequence → result) map, e.g. after
    /// parsing and merging system + user compose files. An empty-string
    /// value removes a sequence (§4.3) and must be filtered out by the
    /// caller before this constructor sees the map.
    pub fn from_map(map: HashMap<Vec<Keysym>, String>) -> Self {
        let mut entries: Vec<(Vec<Keysym>, String)> = map.into_iter().collect();
        entries.sort_by(|a, b| join(&a.0).cmp(&join(&b.0)));

        let joined: Vec<String> = entries.iter().map(|(seq, _)| join(seq)).collect();
        let keys: Vec<&[u8]> = joined.iter().map(|s| s.as_bytes()).collect();
        let da = DoubleArray::<u8>::build(&keys);

        let values = entries.iter().map(|(_, v)| v.clone()).collect();
        let sequences = entries.into_iter().map(|(seq, _)| seq).collect();

        ComposeTrie {
            inner: Arc::new(Inner { da, values, sequences }),
        }
    }

    pub(super) fn lookup(&self, prefix: &[Keysym]) -> LookupResult {
        let joined = join(prefix);
        let pr = self.inner.da.probe(joined.as_bytes());
        match (pr.value, pr.has_children) {
            (None, false) => LookupResult::None,
            (None, true) => LookupResult::Live,
            (Some(id), false) => LookupResult::Resolved(self.inner.values[id as usize].clone()),
            (Some(id), true) => LookupResult::ResolvedAndLive(self.inner.values[id as usize].clone()),
        }
    }

    /// Enumerate every full sequence in the trie extending `prefix`,
    /// returning the *remaining* keys (full sequence minus `prefix`) and
    /// the result string. Implemented as a linear scan over the sorted
    /// sequence list rather than a trie leaf-walk API, since
    /// `lexime-trie`'s `DoubleArray` does not expose one; compose files
    /// are small enough (hundreds to low thousands of sequences) that this
    /// is not a hot path worth a custom traversal.
    pub(super) fn enumerate_leaves(&self, prefix: &[Keysym]) -> Vec<(Vec<Keysym>, String)> {
        self.inner
            .sequences
            .iter()
            .zip(self.inner.values.iter())
            .filter(|(seq, _)| seq.len() > prefix.len() && seq.starts_with(prefix))
            .map(|(seq, value)| (seq[prefix.len()..].to_vec(), value.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_distinguishes_live_resolved_and_both() {
        let mut map = HashMap::new();
        map.insert(vec!["a".to_string()], "A".to_string());
        map.insert(vec!["a".to_string(), "b".to_string()], "AB".to_string());
        let trie = ComposeTrie::from_map(map);

        assert_eq!(trie.lookup(&["a".to_string()]), LookupResult::ResolvedAndLive("A".into()));
        assert_eq!(
            trie.lookup(&["a".to_string(), "b".to_string()]),
            LookupResult::Resolved("AB".into())
        );
        assert_eq!(trie.lookup(&["z".to_string()]), LookupResult::None);
    }

    #[test]
    fn enumerate_leaves_returns_remaining_suffix() {
        let mut map = HashMap::new();
        map.insert(vec!["a".to_string(), "b".to_string()], "AB".to_string());
        map.insert(vec!["a".to_string(), "c".to_string()], "AC".to_string());
        let trie = ComposeTrie::from_map(map);

        let mut leaves = trie.enumerate_leaves(&["a".to_string()]);
        leaves.sort_by(|x, y| x.1.cmp(&y.1));
        assert_eq!(
            leaves,
            vec![
                (vec!["b".to_string()], "AB".to_string()),
                (vec!["c".to_string()], "AC".to_string()),
            ]
        );
    }
}
