//! Persistent learning store (spec.md §4.4).
//!
//! Grounded on the teacher's `UserHistory`: upsert-with-frequency-and-
//! recency entries, an O(n) partial eviction via `select_nth_unstable_by`
//! when over a ceiling, atomic tmp-write-then-rename persistence, and a
//! frame-based WAL (`wal.rs`) so every commit doesn't force a full
//! rewrite. Restructured from the teacher's nested
//! `reading -> surface -> HistoryEntry` / `prev_surface -> (next, ..) ->
//! HistoryEntry` maps into a single table keyed by the spec's
//! `(phrase, context1, context2)` triple, since this spec's context model
//! is symmetric trigram/bigram/unigram rather than Japanese-specific
//! reading/surface pairs.

mod wal;

pub use wal::{open_with_wal, HistoryWal, WalError};

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RecordMode;

const MAGIC: &[u8; 4] = b"PRDB";
const VERSION: u8 = 1;

/// Half-life used by the recency boost (§4.4: "half-life ≈ 30 days").
pub const HALF_LIFE_SECS: f64 = 30.0 * 24.0 * 3600.0;
/// Entries decayed below this `user_freq` and older than 180 days are
/// purged by `decay_pass` (§4.4).
pub const DECAY_EPSILON: f64 = 0.01;
const PURGE_AGE_SECS: u64 = 180 * 24 * 3600;

/// Context-match bonus multipliers, highest for exact trigram match, per
/// §4.4's scoring shape. The open question in spec.md §9 ("the exact
/// scoring formula ... is not fully specified") is resolved here as a
/// single named function ([`score`]) with these constants as its only
/// tunable inputs, so property tests can pin its monotonicity without
/// needing numeric parity with any reference implementation.
mod score_weights {
    pub const TRIGRAM_BONUS: f64 = 2.0;
    pub const BIGRAM_BONUS: f64 = 1.5;
    pub const UNIGRAM_BONUS: f64 = 1.0;
}

#[derive(Debug, Error)]
pub enum UserDbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid header (too short)")]
    InvalidHeader,
    #[error("invalid magic bytes")]
    InvalidMagic,
    #[error("unsupported schema version: {0}")]
    UnsupportedVersion(u8),
    #[error("deserialization error: {0}")]
    Deserialize(String),
}

/// §3 `UserDBEntry`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDBEntry {
    pub phrase: String,
    pub context1: String,
    pub context2: String,
    pub frequency: u32,
    pub timestamp_last_used: u64,
    pub user_freq: f64,
}

type Key = (String, String, String);

pub fn now_epoch() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

/// Keyed by `(phrase, context1, context2)`. A `BTreeMap` (rather than the
/// teacher's nested `HashMap`s) so `lookup`'s prefix scan over `phrase` is
/// a contiguous range rather than a full-table scan.
#[derive(Default)]
pub struct UserDb {
    entries: BTreeMap<Key, UserDBEntry>,
    max_entries: usize,
}

impl UserDb {
    pub fn new(max_entries: usize) -> Self {
        UserDb { entries: BTreeMap::new(), max_entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every stored entry, in key order. For inspection tools (`userdbtool
    /// list`), not used by the engine's own lookup path.
    pub fn entries(&self) -> impl Iterator<Item = &UserDBEntry> {
        self.entries.values()
    }

    /// `record_commit(phrase, context1, context2)` (§4.4): upsert; set
    /// `timestamp=now`; increment `frequency`.
    pub fn record_commit(&mut self, phrase: &str, context1: &str, context2: &str) {
        self.record_commit_at(phrase, context1, context2, now_epoch());
    }

    /// Same as [`Self::record_commit`] with an explicit timestamp, used by
    /// WAL replay to preserve the original commit time rather than
    /// stamping everything with the replay-time `now`.
    pub fn record_commit_at(&mut self, phrase: &str, context1: &str, context2: &str, timestamp: u64) {
        let key = (phrase.to_string(), context1.to_string(), context2.to_string());
        let entry = self.entries.entry(key).or_insert_with(|| UserDBEntry {
            phrase: phrase.to_string(),
            context1: context1.to_string(),
            context2: context2.to_string(),
            frequency: 0,
            timestamp_last_used: timestamp,
            user_freq: 0.0,
        });
        entry.frequency += 1;
        entry.user_freq += 1.0;
        entry.timestamp_last_used = timestamp;
        self.evict();
    }

    /// `lookup(prefix, context1, context2) -> ranked entries` (§4.4). Scans
    /// every stored context variant of every phrase starting with
    /// `prefix`, scores each against the *query* context, and returns the
    /// best-scoring variant per phrase, highest score first.
    pub fn lookup(&self, prefix: &str, context1: &str, context2: &str) -> Vec<(UserDBEntry, f64)> {
        let now = now_epoch();
        let mut best: std::collections::HashMap<&str, (&UserDBEntry, f64)> = std::collections::HashMap::new();

        for entry in self.phrase_prefix_range(prefix) {
            let s = score(entry, context1, context2, now);
            best.entry(entry.phrase.as_str())
                .and_modify(|(e, existing)| {
                    if s > *existing {
                        *e = entry;
                        *existing = s;
                    }
                })
                .or_insert((entry, s));
        }

        let mut ranked: Vec<(UserDBEntry, f64)> = best.into_values().map(|(e, s)| (e.clone(), s)).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    fn phrase_prefix_range(&self, prefix: &str) -> impl Iterator<Item = &UserDBEntry> {
        let start = (prefix.to_string(), String::new(), String::new());
        self.entries
            .range(start..)
            .map(|(_, v)| v)
            .take_while(move |v| v.phrase.starts_with(prefix))
    }

    /// `forget(phrase, context1, context2)` (§4.4): delete the entry.
    pub fn forget(&mut self, phrase: &str, context1: &str, context2: &str) {
        let key = (phrase.to_string(), context1.to_string(), context2.to_string());
        self.entries.remove(&key);
    }

    /// Delete every stored context variant of `phrase`, used by
    /// `userdbtool forget` when the caller has no specific context to
    /// target.
    pub fn forget_all(&mut self, phrase: &str) {
        self.entries.retain(|_, v| v.phrase != phrase);
    }

    /// `decay_pass()` (§4.4): halve `user_freq` for entries older than the
    /// half-life; purge entries below epsilon past the purge age.
    /// Monotone: never increases any entry's `user_freq` (§8 invariant).
    pub fn decay_pass(&mut self) {
        let _span = tracing::debug_span!("decay_pass", entries_before = self.entries.len()).entered();
        let now = now_epoch();
        let half_life_secs = HALF_LIFE_SECS as u64;

        for entry in self.entries.values_mut() {
            let age = now.saturating_sub(entry.timestamp_last_used);
            if age > half_life_secs {
                entry.user_freq *= 0.5;
            }
        }

        self.entries.retain(|_, entry| {
            let age = now.saturating_sub(entry.timestamp_last_used);
            !(entry.user_freq < DECAY_EPSILON && age > PURGE_AGE_SECS)
        });
        tracing::debug!(entries_after = self.entries.len(), "decay pass complete");
    }

    /// §4.4 invariant: evict the lowest-`(user_freq, recency)` entries
    /// once over `max_entries`, same O(n) partial-selection approach as
    /// the teacher's `evict_map`.
    fn evict(&mut self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let now = now_epoch();
        let to_remove = self.entries.len() - self.max_entries;

        let mut scored: Vec<(Key, f64)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.user_freq * recency_boost(v.timestamp_last_used, now)))
            .collect();
        scored.select_nth_unstable_by(to_remove - 1, |a, b| {
            a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)
        });
        for (key, _) in scored[..to_remove].iter() {
            self.entries.remove(key);
        }
    }

    fn to_records(&self) -> Vec<UserDBEntry> {
        self.entries.values().cloned().collect()
    }

    fn from_records(records: Vec<UserDBEntry>, max_entries: usize) -> Self {
        let entries = records
            .into_iter()
            .map(|e| ((e.phrase.clone(), e.context1.clone(), e.context2.clone()), e))
            .collect();
        UserDb { entries, max_entries }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, UserDbError> {
        let body = bincode::serialize(&self.to_records()).map_err(|e| UserDbError::Deserialize(e.to_string()))?;
        let mut buf = Vec::with_capacity(5 + body.len());
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        buf.extend_from_slice(&body);
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8], max_entries: usize) -> Result<Self, UserDbError> {
        if bytes.len() < 5 {
            return Err(UserDbError::InvalidHeader);
        }
        if &bytes[0..4] != MAGIC {
            return Err(UserDbError::InvalidMagic);
        }
        if bytes[4] != VERSION {
            return Err(UserDbError::UnsupportedVersion(bytes[4]));
        }
        let records: Vec<UserDBEntry> =
            bincode::deserialize(&bytes[5..]).map_err(|e| UserDbError::Deserialize(e.to_string()))?;
        Ok(Self::from_records(records, max_entries))
    }

    /// Atomic write: serialize to a `.tmp` sibling, then rename over the
    /// checkpoint file.
    pub fn save(&self, path: &Path) -> Result<(), UserDbError> {
        let bytes = self.to_bytes()?;
        let tmp = path.with_extension("tmp");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Open the checkpoint file, or an empty store if absent. On
    /// corruption (bad magic/version/deserialize failure), per §7
    /// `UserDBCorruption`: the file is quarantined (renamed with a
    /// `.corrupt-<timestamp>` suffix) and a fresh store is returned, the
    /// error value carrying the quarantine path for the one-shot host
    /// notice.
    pub fn open(path: &Path, max_entries: usize) -> Result<(Self, Option<PathBuf>), UserDbError> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Self::new(max_entries), None)),
            Err(e) => return Err(e.into()),
        };

        match Self::from_bytes(&bytes, max_entries) {
            Ok(db) => Ok((db, None)),
            Err(corruption) => {
                let quarantine = path.with_extension(format!("corrupt-{}", now_epoch()));
                tracing::warn!(path = %path.display(), quarantine = %quarantine.display(), error = %corruption, "quarantining corrupt user DB checkpoint");
                fs::rename(path, &quarantine)?;
                Ok((Self::new(max_entries), Some(quarantine)))
            }
        }
    }
}

fn recency_boost(last_used: u64, now: u64) -> f64 {
    let age_secs = now.saturating_sub(last_used) as f64;
    (-age_secs / HALF_LIFE_SECS).exp()
}

/// The single testable scoring function combining `user_freq`, recency,
/// and context level (§4.4, §9 open question).
fn score(entry: &UserDBEntry, query_context1: &str, query_context2: &str, now: u64) -> f64 {
    let bonus = if entry.context1 == query_context1 && entry.context2 == query_context2 {
        score_weights::TRIGRAM_BONUS
    } else if entry.context1 == query_context1 {
        score_weights::BIGRAM_BONUS
    } else {
        score_weights::UNIGRAM_BONUS
    };
    entry.user_freq * recency_boost(entry.timestamp_last_used, now) * bonus
}

/// §4.4 record modes. "Correct" requires the committed phrase to validate
/// against at least one loaded dictionary; "Correct-or-Previously-
/// Recorded" also admits phrases already present in the store.
/// A pure predicate (no `Dictionary`/`UserDb` borrow) so the controller
/// can evaluate it without entangling this module with either type.
pub fn record_mode_permits(mode: RecordMode, is_in_dictionary: bool, is_already_recorded: bool) -> bool {
    match mode {
        RecordMode::Everything => true,
        RecordMode::CorrectOrPreviouslyRecorded => is_in_dictionary || is_already_recorded,
        RecordMode::Correct => is_in_dictionary,
        RecordMode::Nothing => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_commit_then_lookup_round_trip() {
        let mut db = UserDb::new(100);
        db.record_commit("camel", "i", "saw");
        let results = db.lookup("cam", "i", "saw");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.phrase, "camel");
        assert_eq!(results[0].0.frequency, 1);
    }

    #[test]
    fn forget_removes_exact_entry() {
        let mut db = UserDb::new(100);
        db.record_commit("camel", "i", "saw");
        db.forget("camel", "i", "saw");
        assert!(db.lookup("cam", "i", "saw").is_empty());
    }

    #[test]
    fn trigram_context_outranks_mismatched_context() {
        let mut db = UserDb::new(100);
        db.record_commit("the", "i", "saw");
        db.record_commit("them", "x", "y");
        let results = db.lookup("the", "i", "saw");
        assert_eq!(results[0].0.phrase, "the");
    }

    #[test]
    fn decay_pass_never_increases_user_freq() {
        let mut db = UserDb::new(100);
        db.record_commit("guru", "", "");
        let before: f64 = db.lookup("guru", "", "")[0].0.user_freq;
        db.decay_pass();
        let after: f64 = db.lookup("guru", "", "")[0].0.user_freq;
        assert!(after <= before);
    }

    #[test]
    fn eviction_keeps_entries_at_or_under_ceiling() {
        let mut db = UserDb::new(3);
        for i in 0..10 {
            db.record_commit(&format!("word{i}"), "", "");
        }
        assert!(db.len() <= 3);
    }

    #[test]
    fn persistence_round_trips() {
        let mut db = UserDb::new(100);
        db.record_commit("camel", "i", "saw");
        let bytes = db.to_bytes().unwrap();
        let restored = UserDb::from_bytes(&bytes, 100).unwrap();
        assert_eq!(restored.lookup("cam", "i", "saw")[0].0.phrase, "camel");
    }

    #[test]
    fn open_quarantines_corrupt_file_and_returns_fresh_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("userdb.bin");
        std::fs::write(&path, b"not a valid userdb file").unwrap();
        let (db, quarantined) = UserDb::open(&path, 100).unwrap();
        assert!(db.is_empty());
        assert!(quarantined.is_some());
        assert!(quarantined.unwrap().exists());
    }

    #[test]
    fn record_mode_permits_matches_spec_table() {
        assert!(record_mode_permits(RecordMode::Everything, false, false));
        assert!(!record_mode_permits(RecordMode::Correct, false, true));
        assert!(record_mode_permits(RecordMode::Correct, true, false));
        assert!(record_mode_permits(RecordMode::CorrectOrPreviouslyRecorded, false, true));
        assert!(!record_mode_permits(RecordMode::Nothing, true, true));
    }
}
