use std::path::Path;
use std::process;

use preedit_core::userdb::open_with_wal;

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

/// Default learning-store location when `--file` isn't given. Unlike the
/// teacher's IMKit-specific path, this engine is host-agnostic, so the
/// default lives under XDG's user data dir rather than an app bundle's
/// Application Support folder.
pub fn default_userdb_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    format!("{home}/.local/share/preedit/userdb.bin")
}

pub fn list(path: &Path, max_entries: usize, json: bool) {
    let (db, _wal, quarantine) = die!(
        open_with_wal(path, max_entries),
        "Error opening user DB: {}"
    );
    if let Some(q) = quarantine {
        eprintln!("warning: corrupt checkpoint quarantined at {}", q.display());
    }

    if json {
        let entries: Vec<_> = db.entries().collect();
        println!("{}", die!(serde_json::to_string_pretty(&entries), "Error encoding JSON: {}"));
        return;
    }

    if db.is_empty() {
        println!("(empty)");
        return;
    }
    for entry in db.entries() {
        println!(
            "{}\t[{} / {}]\tfreq={}\tuser_freq={:.3}\tlast_used={}",
            entry.phrase, entry.context1, entry.context2, entry.frequency, entry.user_freq, entry.timestamp_last_used
        );
    }
    println!("---");
    println!("{} entries", db.len());
}

pub fn forget(path: &Path, max_entries: usize, phrase: &str, context1: &str, context2: &str) {
    let (mut db, _wal, _quarantine) = die!(
        open_with_wal(path, max_entries),
        "Error opening user DB: {}"
    );
    db.forget(phrase, context1, context2);
    die!(db.save(path), "Error saving user DB: {}");
    println!("Forgot: {phrase} [{context1} / {context2}]");
}

/// Run a decay pass and rewrite the checkpoint, truncating the WAL —
/// the maintenance operation a host would otherwise only run on an
/// in-process timer (§4.4 `decay_pass`).
pub fn compact(path: &Path, max_entries: usize) {
    let (mut db, mut wal, _quarantine) = die!(
        open_with_wal(path, max_entries),
        "Error opening user DB: {}"
    );
    let before = db.len();
    db.decay_pass();
    die!(db.save(path), "Error saving user DB: {}");
    die!(wal.truncate(), "Error truncating WAL: {}");
    println!("Compacted: {before} -> {} entries", db.len());
}

pub fn info(path: &Path, max_entries: usize) {
    let (db, wal, quarantine) = die!(
        open_with_wal(path, max_entries),
        "Error opening user DB: {}"
    );
    if let Some(q) = quarantine {
        println!("checkpoint was corrupt; quarantined at {}", q.display());
    }
    println!("entries: {}", db.len());
    println!("wal entries pending replay: {}", wal.entry_count());
    println!("wal needs compaction: {}", wal.needs_compact());
}
