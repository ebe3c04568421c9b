//! Compose file parsing (spec.md §6 "Compose file format").
//!
//! Grounded on the teacher's `parse_romaji_toml` in spirit (permissive
//! parse, typed errors, a table of fixtures in tests) though the format
//! itself is line-oriented text, not TOML — there is no teacher file for
//! this exact grammar, so the parser structure (line-by-line, collect
//! warnings rather than abort) follows `settings.rs`'s
//! "malformed entry skipped, rest loaded" policy from §7.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::Keysym;

#[derive(Debug, Error)]
pub enum ComposeFileError {
    #[error("failed to read compose file {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("include cycle detected at {path}")]
    IncludeCycle { path: PathBuf },
}

/// A non-fatal parse problem, reported with file+line per §6: "Parsing
/// errors are reported with file+line; the engine continues with
/// remaining lines."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeFileWarning {
    pub file: PathBuf,
    pub line: usize,
    pub reason: String,
}

/// Expand `%L` (locale), `%S` (system compose dir), `%H` (home dir) in an
/// include path.
fn expand_path(raw: &str, locale: &str, system_dir: &str, home_dir: &str) -> String {
    raw.replace("%L", locale).replace("%S", system_dir).replace("%H", home_dir)
}

struct ExpandContext<'a> {
    locale: &'a str,
    system_dir: &'a str,
    home_dir: &'a str,
}

/// Parse a compose file (and any `include`d files, recursively) into a
/// (sequence → result) map plus any warnings encountered. An empty-result
/// sequence line removes that sequence from the map (§4.3), which is why
/// this returns `Option<String>` internally before the caller filters.
pub fn parse_compose_file(
    path: &Path,
    locale: &str,
    system_dir: &str,
    home_dir: &str,
) -> Result<(HashMap<Vec<Keysym>, String>, Vec<ComposeFileWarning>), ComposeFileError> {
    let mut map = HashMap::new();
    let warnings = parse_compose_file_into(path, locale, system_dir, home_dir, &mut map)?;
    Ok((map, warnings))
}

/// Parse `path` into a caller-supplied map rather than a fresh one, so a
/// system compose file and a user overlay file can be layered into one
/// effective trie (§4.3: "the user overlay compose file is loaded after
/// the system file; an empty-result entry removes the sequence from the
/// effective trie") — the empty-result removal in `parse_into` only
/// removes from the map it is populating, so overlay and system entries
/// must share one map for that removal to reach across files.
pub fn parse_compose_file_into(
    path: &Path,
    locale: &str,
    system_dir: &str,
    home_dir: &str,
    map: &mut HashMap<Vec<Keysym>, String>,
) -> Result<Vec<ComposeFileWarning>, ComposeFileError> {
    let mut warnings = Vec::new();
    let mut visiting = Vec::new();
    let ctx = ExpandContext { locale, system_dir, home_dir };
    parse_into(path, &ctx, map, &mut warnings, &mut visiting)?;
    Ok(warnings)
}

/// Load a system compose file, then (if present) a user overlay compose
/// file, into one shared map (§4.3) and build the resulting trie.
pub fn parse_compose_files(
    system_path: &Path,
    user_path: Option<&Path>,
    locale: &str,
    system_dir: &str,
    home_dir: &str,
) -> Result<(HashMap<Vec<Keysym>, String>, Vec<ComposeFileWarning>), ComposeFileError> {
    let mut map = HashMap::new();
    let mut warnings = parse_compose_file_into(system_path, locale, system_dir, home_dir, &mut map)?;
    if let Some(user_path) = user_path {
        warnings.extend(parse_compose_file_into(user_path, locale, system_dir, home_dir, &mut map)?);
    }
    Ok((map, warnings))
}

fn parse_into(
    path: &Path,
    ctx: &ExpandContext,
    map: &mut HashMap<Vec<Keysym>, String>,
    warnings: &mut Vec<ComposeFileWarning>,
    visiting: &mut Vec<PathBuf>,
) -> Result<(), ComposeFileError> {
    let canonical = path.to_path_buf();
    if visiting.contains(&canonical) {
        return Err(ComposeFileError::IncludeCycle { path: canonical });
    }
    visiting.push(canonical.clone());

    let contents = std::fs::read_to_string(path).map_err(|source| ComposeFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    for (idx, raw_line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix("include") {
            match parse_include(rest) {
                Some(include_path) => {
                    let expanded = expand_path(&include_path, ctx.locale, ctx.system_dir, ctx.home_dir);
                    parse_into(Path::new(&expanded), ctx, map, warnings, visiting)?;
                }
                None => warnings.push(ComposeFileWarning {
                    file: path.to_path_buf(),
                    line: line_no,
                    reason: "malformed include directive".to_string(),
                }),
            }
            continue;
        }

        match parse_sequence_line(line) {
            Some((seq, result)) => {
                if result.is_empty() {
                    map.remove(&seq);
                } else {
                    map.insert(seq, result);
                }
            }
            None => warnings.push(ComposeFileWarning {
                file: path.to_path_buf(),
                line: line_no,
                reason: "malformed sequence line".to_string(),
            }),
        }
    }

    visiting.pop();
    Ok(())
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_include(rest: &str) -> Option<String> {
    let rest = rest.trim();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}

/// `<key1> <key2> ... : "result" [symbolic]`
fn parse_sequence_line(line: &str) -> Option<(Vec<Keysym>, String)> {
    let (keys_part, rest) = line.split_once(':')?;
    let keys: Vec<Keysym> = keys_part
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .split("> <")
        .map(|s| s.to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if keys.is_empty() {
        return None;
    }

    let rest = rest.trim();
    let rest = rest.strip_prefix('"')?;
    let end = rest.find('"')?;
    Some((keys, rest[..end].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_basic_sequence() {
        let f = write_temp("<dead_macron> <e> : \"\u{0113}\" emacron\n");
        let (map, warnings) = parse_compose_file(f.path(), "en_US", "/usr/share/compose", "/home/u").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(
            map.get(&vec!["dead_macron".to_string(), "e".to_string()]),
            Some(&"\u{0113}".to_string())
        );
    }

    #[test]
    fn empty_result_removes_sequence() {
        let f = write_temp("<dead_macron> <e> : \"\"\n");
        let (map, _) = parse_compose_file(f.path(), "en_US", "/usr/share/compose", "/home/u").unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn malformed_line_is_warned_and_skipped() {
        let f = write_temp("this is not valid\n<a> : \"A\"\n");
        let (map, warnings) = parse_compose_file(f.path(), "en_US", "/usr/share/compose", "/home/u").unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].line, 1);
        assert_eq!(map.get(&vec!["a".to_string()]), Some(&"A".to_string()));
    }

    #[test]
    fn user_overlay_removes_system_sequence() {
        let system = write_temp("<dead_macron> <e> : \"\u{0113}\" emacron\n<a> : \"A\"\n");
        let user = write_temp("<dead_macron> <e> : \"\"\n");
        let (map, _) = parse_compose_files(system.path(), Some(user.path()), "en_US", "/usr/share/compose", "/home/u").unwrap();
        assert!(!map.contains_key(&vec!["dead_macron".to_string(), "e".to_string()]));
        assert_eq!(map.get(&vec!["a".to_string()]), Some(&"A".to_string()));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let f = write_temp("# a comment\n\n<a> : \"A\" # trailing comment\n");
        let (map, warnings) = parse_compose_file(f.path(), "en_US", "/usr/share/compose", "/home/u").unwrap();
        assert!(warnings.is_empty());
        assert_eq!(map.get(&vec!["a".to_string()]), Some(&"A".to_string()));
    }
}
