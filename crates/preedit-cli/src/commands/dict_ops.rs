use std::fs;
use std::process;

use preedit_core::dict::{Dictionary, WordList};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            process::exit(1);
        })
    };
}

/// Parse a word-list source file and report how many distinct spellings
/// it loaded, catching malformed files before they're shipped with a
/// locale bundle.
pub fn validate(file: &str) {
    let text = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let list = die!(WordList::parse_lines(&text), "Error parsing word list: {}");
    println!("OK: {} entries", count_words(&text));
    let _ = list;
}

/// Load a word-list file and run a single prefix lookup against it, for
/// spot-checking a locale bundle without wiring it into a running engine.
pub fn lookup(file: &str, prefix: &str) {
    let text = die!(fs::read_to_string(file), "Error reading {file}: {}");
    let list = die!(WordList::parse_lines(&text), "Error parsing word list: {}");
    let mut results = list.lookup(prefix);
    results.sort();
    if results.is_empty() {
        println!("(no matches)");
    } else {
        for word in results {
            println!("{word}");
        }
    }
}

fn count_words(text: &str) -> usize {
    text.lines().map(str::trim).filter(|l| !l.is_empty() && !l.starts_with('#')).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_words_skips_blank_and_comment_lines() {
        assert_eq!(count_words("# header\napple\n\nbanana\n"), 2);
    }
}
