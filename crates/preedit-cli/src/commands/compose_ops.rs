use std::path::Path;
use std::process;

use preedit_core::compose::{self, parse_compose_files, ComposeState, ComposeTrie};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

/// Parse a compose file (`%L`/`%S`/`%H` expanded against `locale`,
/// `system_dir`, `home_dir`), layering an optional user overlay file on
/// top (§4.3: overlay entries load after the system file, and an
/// empty-result entry removes the system sequence), and report the
/// sequence count plus any per-line warnings (§6 "Parsing errors are
/// reported with file+line").
pub fn validate(file: &str, user_file: Option<&str>, locale: &str, system_dir: &str, home_dir: &str) {
    let (map, warnings) = die!(
        parse_compose_files(Path::new(file), user_file.map(Path::new), locale, system_dir, home_dir),
        "Error parsing compose file: {}"
    );
    for w in &warnings {
        eprintln!("{}:{}: {}", w.file.display(), w.line, w.reason);
    }
    println!("OK: {} sequences, {} warnings", map.len(), warnings.len());
}

/// Parse a compose file plus optional user overlay, feed `prefix` through
/// the trie one key at a time, and list completions of whatever live
/// prefix remains — for checking what the completion popup (§4.3) would
/// show.
pub fn completions(file: &str, user_file: Option<&str>, locale: &str, system_dir: &str, home_dir: &str, prefix: &[String]) {
    let (map, _warnings) = die!(
        parse_compose_files(Path::new(file), user_file.map(Path::new), locale, system_dir, home_dir),
        "Error parsing compose file: {}"
    );
    let trie = ComposeTrie::from_map(map);
    let mut state = ComposeState::new();
    for key in prefix {
        compose::feed(&mut state, &trie, key.clone());
    }
    let hits = compose::completions(&state, &trie, &|_| true);
    if hits.is_empty() {
        println!("(no completions)");
    } else {
        for hit in hits {
            println!("{:?} -> {}", hit.remaining_keys, hit.result);
        }
    }
}
