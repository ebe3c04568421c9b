use std::sync::Arc;

use super::Dictionary;

/// Merges results across multiple locale dictionaries. Grounded on the
/// teacher's `CompositeDictionary`: layers are searched in order,
/// duplicate words are deduplicated. There is no per-entry cost here (the
/// spec's `Dictionary` contract has no cost field), so "keep the best" is
/// just set union — the teacher's lowest-cost tie-break has no
/// counterpart to preserve.
pub struct CompositeDictionary {
    layers: Vec<Arc<dyn Dictionary>>,
}

impl CompositeDictionary {
    pub fn new(layers: Vec<Arc<dyn Dictionary>>) -> Self {
        Self { layers }
    }
}

fn dedup_preserve_order(words: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    words.into_iter().filter(|w| seen.insert(w.clone())).collect()
}

impl Dictionary for CompositeDictionary {
    fn lookup(&self, prefix: &str) -> Vec<String> {
        let mut all = Vec::new();
        for layer in &self.layers {
            all.extend(layer.lookup(prefix));
        }
        dedup_preserve_order(all)
    }

    fn spellcheck(&self, word: &str) -> bool {
        self.layers.iter().any(|layer| layer.spellcheck(word))
    }

    fn suggest(&self, word: &str, max_results: usize) -> Vec<String> {
        let mut all = Vec::new();
        for layer in &self.layers {
            all.extend(layer.suggest(word, max_results));
        }
        let deduped = dedup_preserve_order(all);
        deduped.into_iter().take(max_results).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dict::WordList;

    fn layer(words: &[&str]) -> Arc<dyn Dictionary> {
        Arc::new(WordList::from_words(words.iter().map(|s| s.to_string())))
    }

    #[test]
    fn lookup_merges_and_deduplicates_across_layers() {
        let dict = CompositeDictionary::new(vec![layer(&["camel", "camera"]), layer(&["camel", "camp"])]);
        let mut results = dict.lookup("cam");
        results.sort();
        assert_eq!(results, vec!["camel".to_string(), "camera".to_string(), "camp".to_string()]);
    }

    #[test]
    fn spellcheck_true_if_any_layer_has_it() {
        let dict = CompositeDictionary::new(vec![layer(&["guru"]), layer(&["the"])]);
        assert!(dict.spellcheck("guru"));
        assert!(dict.spellcheck("the"));
        assert!(!dict.spellcheck("teh"));
    }

    #[test]
    fn empty_layers_return_nothing() {
        let dict = CompositeDictionary::new(vec![]);
        assert!(dict.lookup("a").is_empty());
        assert!(!dict.spellcheck("a"));
        assert!(dict.suggest("a", 5).is_empty());
    }
}
