//! Write-ahead log for `UserDb`, so a commit doesn't force a full-store
//! rewrite. Frame format (length + crc32 + bincode payload) and compaction
//! threshold are grounded directly on the teacher's `HistoryWal`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::UserDb;

const COMPACT_THRESHOLD: usize = 1000;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Serialize, Deserialize)]
struct WalEntry {
    phrase: String,
    context1: String,
    context2: String,
    timestamp: u64,
}

/// WAL state alongside a `UserDb` checkpoint file.
pub struct HistoryWal {
    checkpoint_path: PathBuf,
    wal_path: PathBuf,
    file: Option<File>,
    entry_count: usize,
}

impl HistoryWal {
    pub fn new(checkpoint_path: &Path) -> Self {
        let wal_path = checkpoint_path.with_extension("wal");
        HistoryWal {
            checkpoint_path: checkpoint_path.to_path_buf(),
            wal_path,
            file: None,
            entry_count: 0,
        }
    }

    /// Replay the WAL into `db`, stopping at the first truncated or
    /// corrupt frame (a partial write from a crash mid-append). Returns
    /// the number of entries replayed.
    pub fn replay(&mut self, db: &mut UserDb) -> Result<usize, WalError> {
        let data = match fs::read(&self.wal_path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.entry_count = 0;
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let mut count = 0;
        let mut pos = 0;
        while pos + 8 <= data.len() {
            let length = u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap()) as usize;
            let expected_crc = u32::from_le_bytes(data[pos + 4..pos + 8].try_into().unwrap());

            if length == 0 || pos + 8 + length > data.len() {
                break;
            }

            let payload = &data[pos + 8..pos + 8 + length];
            if crc32fast::hash(payload) != expected_crc {
                break;
            }

            match bincode::deserialize::<WalEntry>(payload) {
                Ok(entry) => {
                    db.record_commit_at(&entry.phrase, &entry.context1, &entry.context2, entry.timestamp);
                    count += 1;
                }
                Err(_) => break,
            }

            pos += 8 + length;
        }

        self.entry_count = count;
        Ok(count)
    }

    pub fn append(&mut self, phrase: &str, context1: &str, context2: &str, timestamp: u64) -> Result<(), WalError> {
        let entry = WalEntry {
            phrase: phrase.to_string(),
            context1: context1.to_string(),
            context2: context2.to_string(),
            timestamp,
        };
        let payload = bincode::serialize(&entry).expect("WalEntry serialization cannot fail");
        let length = payload.len() as u32;
        let crc = crc32fast::hash(&payload);

        let file = self.open_file()?;
        file.write_all(&length.to_le_bytes())?;
        file.write_all(&crc.to_le_bytes())?;
        file.write_all(&payload)?;

        self.entry_count += 1;
        Ok(())
    }

    fn open_file(&mut self) -> Result<&mut File, WalError> {
        if self.file.is_none() {
            if let Some(parent) = self.wal_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let f = OpenOptions::new().create(true).append(true).open(&self.wal_path)?;
            self.file = Some(f);
        }
        Ok(self.file.as_mut().unwrap())
    }

    pub fn needs_compact(&self) -> bool {
        self.entry_count >= COMPACT_THRESHOLD
    }

    /// Call after writing a fresh checkpoint with `UserDb::save`.
    pub fn truncate(&mut self) -> Result<(), WalError> {
        self.file = None;
        File::create(&self.wal_path)?;
        self.entry_count = 0;
        Ok(())
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }
}

/// Convenience: open checkpoint + replay WAL in one call.
pub fn open_with_wal(checkpoint_path: &Path, max_entries: usize) -> Result<(UserDb, HistoryWal, Option<PathBuf>), WalError> {
    let (mut db, quarantined) = UserDb::open(checkpoint_path, max_entries).map_err(|_| {
        WalError::Io(io::Error::new(io::ErrorKind::InvalidData, "user database corrupted"))
    })?;
    let mut wal = HistoryWal::new(checkpoint_path);
    wal.replay(&mut db)?;
    Ok((db, wal, quarantined))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_then_replay_reconstructs_entries() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("userdb.bin");
        let mut wal = HistoryWal::new(&checkpoint);
        wal.append("camel", "i", "saw", 1000).unwrap();
        wal.append("the", "", "", 1001).unwrap();

        let mut db = UserDb::new(100);
        let replayed = wal.replay(&mut db).unwrap();
        assert_eq!(replayed, 2);
        assert_eq!(db.lookup("cam", "i", "saw")[0].0.phrase, "camel");
    }

    #[test]
    fn truncated_trailing_frame_stops_replay_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("userdb.bin");
        let mut wal = HistoryWal::new(&checkpoint);
        wal.append("camel", "i", "saw", 1000).unwrap();

        let mut bytes = fs::read(wal.wal_path()).unwrap();
        bytes.extend_from_slice(&[1, 2, 3]); // partial trailing frame
        fs::write(wal.wal_path(), &bytes).unwrap();

        let mut db = UserDb::new(100);
        let mut wal2 = HistoryWal::new(&checkpoint);
        let replayed = wal2.replay(&mut db).unwrap();
        assert_eq!(replayed, 1);
    }

    #[test]
    fn needs_compact_after_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = dir.path().join("userdb.bin");
        let mut wal = HistoryWal::new(&checkpoint);
        for i in 0..COMPACT_THRESHOLD {
            wal.append(&format!("w{i}"), "", "", i as u64).unwrap();
        }
        assert!(wal.needs_compact());
        wal.truncate().unwrap();
        assert!(!wal.needs_compact());
    }
}
