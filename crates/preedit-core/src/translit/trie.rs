use std::collections::BTreeMap;
use std::sync::Arc;

use lexime_trie::DoubleArray;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MethodTableError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("[mappings] table is empty")]
    Empty,
    #[error("empty value for key: {0}")]
    EmptyValue(String),
}

/// Outcome of probing a raw-key prefix against a method's mapping table.
/// Identical shape to the teacher's `TrieLookupResult`; kept as a separate
/// type (not reused across modules) since compose sequences and
/// transliteration methods are different tries with different lifetimes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodLookup {
    None,
    Prefix,
    Exact(String),
    ExactAndPrefix(String),
}

/// A loaded (raw-key-sequence → target-script string) table for one
/// transliteration method, e.g. `hi-itrans`. Immutable after construction.
#[derive(Clone)]
pub struct MethodTable {
    inner: Arc<Inner>,
}

struct Inner {
    da: DoubleArray<u8>,
    values: Vec<String>,
}

#[derive(serde::Deserialize)]
struct RawTable {
    mappings: BTreeMap<String, String>,
}

impl MethodTable {
    pub fn parse_toml(toml_str: &str) -> Result<Self, MethodTableError> {
        let raw: RawTable = toml::from_str(toml_str).map_err(|e| MethodTableError::Parse(e.to_string()))?;
        if raw.mappings.is_empty() {
            return Err(MethodTableError::Empty);
        }
        for (key, value) in &raw.mappings {
            if value.is_empty() {
                return Err(MethodTableError::EmptyValue(key.clone()));
            }
        }

        let keys: Vec<&[u8]> = raw.mappings.keys().map(|k| k.as_bytes()).collect();
        let da = DoubleArray::<u8>::build(&keys);
        let values = raw.mappings.values().cloned().collect();
        Ok(MethodTable {
            inner: Arc::new(Inner { da, values }),
        })
    }

    /// An identity table with no mappings — used for `NoIME`, which passes
    /// every keystroke through unchanged (spec.md §6: "empty → single
    /// NoIME").
    pub fn identity() -> Self {
        MethodTable {
            inner: Arc::new(Inner {
                da: DoubleArray::<u8>::build(&[]),
                values: Vec::new(),
            }),
        }
    }

    pub fn lookup(&self, raw: &str) -> MethodLookup {
        let pr = self.inner.da.probe(raw.as_bytes());
        match (pr.value, pr.has_children) {
            (None, false) => MethodLookup::None,
            (None, true) => MethodLookup::Prefix,
            (Some(id), false) => MethodLookup::Exact(self.inner.values[id as usize].clone()),
            (Some(id), true) => MethodLookup::ExactAndPrefix(self.inner.values[id as usize].clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> MethodTable {
        MethodTable::parse_toml(
            r#"
[mappings]
a = "अ"
aa = "आ"
k = "क"
"#,
        )
        .unwrap()
    }

    #[test]
    fn exact_and_prefix_both_reported() {
        assert_eq!(table().lookup("a"), MethodLookup::ExactAndPrefix("\u{905}".into()));
        assert_eq!(table().lookup("aa"), MethodLookup::Exact("\u{906}".into()));
    }

    #[test]
    fn unknown_key_is_none() {
        assert_eq!(table().lookup("z"), MethodLookup::None);
    }

    #[test]
    fn identity_table_has_no_matches() {
        assert_eq!(MethodTable::identity().lookup("a"), MethodLookup::None);
    }
}
