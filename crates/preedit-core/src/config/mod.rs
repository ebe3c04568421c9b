//! Engine configuration: parsed from TOML, hot-reloadable, with autosettings
//! matched against the focused client id (spec.md §6).
//!
//! Follows the same `OnceLock`/explicit-reparse pattern the teacher uses for
//! `settings()`/`romaji` config, but config here is genuinely hot-reloaded
//! (§5: "a new version is published; event loop picks it up between
//! events"), so on top of the process-default singleton there is
//! [`ConfigHandle`], a small swap cell the `PreeditController` polls.

pub mod schema;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use regex::Regex;
use serde::Deserialize;

pub const DEFAULT_CONFIG_TOML: &str = include_str!("default_config.toml");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Parse(String),
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("unknown keybinding command: {0}")]
    UnknownCommand(String),
    #[error("invalid regex in autosettings entry {index}: {source}")]
    InvalidRegex { index: usize, source: regex::Error },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineCompletion {
    Off,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSelectCandidate {
    Off,
    On,
}

/// §4.4 record modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordMode {
    Everything,
    CorrectOrPreviouslyRecorded,
    Correct,
    Nothing,
}

/// A single `[option, value, regex]` autosettings triple (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
pub struct AutoSettingRaw {
    pub option: String,
    pub value: String,
    pub regex: String,
}

/// Compiled form of [`AutoSettingRaw`] — the regex is parsed once, at
/// config-load time, never per focus event.
#[derive(Debug, Clone)]
pub struct AutoSetting {
    pub option: String,
    pub value: String,
    pub regex: Regex,
}

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default)]
    inputmethod: Vec<String>,
    #[serde(default)]
    dictionary: Vec<String>,
    #[serde(default)]
    emojipredictions: bool,
    #[serde(default = "default_trigger_chars")]
    emojitriggercharacters: String,
    #[serde(default)]
    unicodedataall: bool,
    #[serde(default = "default_min_char_complete")]
    mincharcomplete: i64,
    #[serde(default = "default_page_size")]
    pagesize: i64,
    #[serde(default)]
    inlinecompletion: InlineCompletion,
    #[serde(default)]
    autoselectcandidate: AutoSelectCandidate,
    #[serde(default)]
    autocommitcharacters: String,
    #[serde(default)]
    tabenable: bool,
    #[serde(default)]
    arrowkeysreopenpreedit: bool,
    #[serde(default)]
    disableinterminals: bool,
    #[serde(default)]
    offtherecord: bool,
    #[serde(default = "default_record_mode")]
    recordmode: RecordMode,
    #[serde(default = "default_true")]
    inputmode: bool,
    #[serde(default = "default_true")]
    rememberinputmode: bool,
    #[serde(default = "default_true")]
    rememberlastusedpreeditime: bool,
    #[serde(default = "default_candidates_delay")]
    candidatesdelaymilliseconds: u32,
    #[serde(default)]
    debuglevel: i64,
    #[serde(default)]
    keybindings: HashMap<String, Vec<String>>,
    #[serde(default)]
    autosettings: Vec<AutoSettingRaw>,
    #[serde(default)]
    appearance: HashMap<String, String>,
}

impl Default for InlineCompletion {
    fn default() -> Self {
        Self::Off
    }
}
impl Default for AutoSelectCandidate {
    fn default() -> Self {
        Self::Off
    }
}
fn default_trigger_chars() -> String {
    "_".to_string()
}
fn default_min_char_complete() -> i64 {
    1
}
fn default_page_size() -> i64 {
    6
}
fn default_record_mode() -> RecordMode {
    RecordMode::CorrectOrPreviouslyRecorded
}
fn default_true() -> bool {
    true
}
fn default_candidates_delay() -> u32 {
    200
}

/// Parsed, validated configuration. Immutable once built; a reload
/// constructs a new `Config` and the controller swaps the shared
/// reference (never mutates one in place).
#[derive(Debug, Clone)]
pub struct Config {
    pub version: u64,
    pub input_methods: Vec<String>,
    pub dictionaries: Vec<String>,
    pub emoji_predictions: bool,
    pub emoji_trigger_characters: String,
    pub unicode_data_all: bool,
    pub min_char_complete: u8,
    pub page_size: u8,
    pub inline_completion: InlineCompletion,
    pub auto_select_candidate: AutoSelectCandidate,
    pub auto_commit_characters: String,
    pub tab_enable: bool,
    pub arrow_keys_reopen_preedit: bool,
    pub disable_in_terminals: bool,
    pub off_the_record: bool,
    pub record_mode: RecordMode,
    pub input_mode: bool,
    pub remember_input_mode: bool,
    pub remember_last_used_preedit_ime: bool,
    pub candidates_delay_ms: u32,
    pub debug_level: u8,
    pub keybindings: HashMap<String, Vec<String>>,
    pub autosettings: Vec<AutoSetting>,
    pub appearance: HashMap<String, String>,
}

impl Config {
    /// Parse and validate TOML text into a `Config` at the given version.
    pub fn parse(toml_str: &str, version: u64) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate(&raw)?;

        let autosettings = raw
            .autosettings
            .into_iter()
            .enumerate()
            .map(|(index, a)| {
                Regex::new(&a.regex)
                    .map(|regex| AutoSetting {
                        option: a.option,
                        value: a.value,
                        regex,
                    })
                    .map_err(|source| ConfigError::InvalidRegex { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config {
            version,
            input_methods: raw.inputmethod,
            dictionaries: raw.dictionary,
            emoji_predictions: raw.emojipredictions,
            emoji_trigger_characters: raw.emojitriggercharacters,
            unicode_data_all: raw.unicodedataall,
            min_char_complete: raw.mincharcomplete as u8,
            page_size: raw.pagesize as u8,
            inline_completion: raw.inlinecompletion,
            auto_select_candidate: raw.autoselectcandidate,
            auto_commit_characters: raw.autocommitcharacters,
            tab_enable: raw.tabenable,
            arrow_keys_reopen_preedit: raw.arrowkeysreopenpreedit,
            disable_in_terminals: raw.disableinterminals,
            off_the_record: raw.offtherecord,
            record_mode: raw.recordmode,
            input_mode: raw.inputmode,
            remember_input_mode: raw.rememberinputmode,
            remember_last_used_preedit_ime: raw.rememberlastusedpreeditime,
            candidates_delay_ms: raw.candidatesdelaymilliseconds,
            debug_level: raw.debuglevel as u8,
            keybindings: raw.keybindings,
            autosettings,
            appearance: raw.appearance,
        })
    }

    /// The default, process-wide configuration (lazily parsed once).
    pub fn default_static() -> &'static Config {
        static INSTANCE: OnceLock<Config> = OnceLock::new();
        INSTANCE.get_or_init(|| {
            Config::parse(DEFAULT_CONFIG_TOML, 0).expect("default config TOML must be valid")
        })
    }

    /// Resolve the effective value of `option` for a focused client id by
    /// scanning `autosettings` in order and returning the last match's
    /// value (later entries override earlier ones), or `None` if nothing
    /// matches.
    pub fn autosetting_for(&self, option: &str, client_id: &str) -> Option<&str> {
        self.autosettings
            .iter()
            .filter(|a| a.option == option && a.regex.is_match(client_id))
            .map(|a| a.value.as_str())
            .last()
    }
}

fn validate(raw: &RawConfig) -> Result<(), ConfigError> {
    if raw.inputmethod.len() > 10 {
        return Err(ConfigError::InvalidValue {
            key: "inputmethod",
            reason: "at most 10 input methods".to_string(),
        });
    }
    if raw.dictionary.len() > 10 {
        return Err(ConfigError::InvalidValue {
            key: "dictionary",
            reason: "at most 10 dictionaries".to_string(),
        });
    }
    if !(1..=9).contains(&raw.mincharcomplete) {
        return Err(ConfigError::InvalidValue {
            key: "mincharcomplete",
            reason: "must be between 1 and 9".to_string(),
        });
    }
    if !(1..=9).contains(&raw.pagesize) {
        return Err(ConfigError::InvalidValue {
            key: "pagesize",
            reason: "must be between 1 and 9".to_string(),
        });
    }
    for cmd in raw.keybindings.keys() {
        if schema::find("keybindings").is_none() {
            unreachable!("keybindings is always in SCHEMA");
        }
        if !KNOWN_COMMANDS.contains(&cmd.as_str()) {
            return Err(ConfigError::UnknownCommand(cmd.clone()));
        }
    }
    Ok(())
}

/// Mirrors `crate::keymap::Command`'s variant names; kept as a flat list
/// here (rather than a dependency on the keymap module) so config parsing
/// never needs to know about key-event types, only command names.
const KNOWN_COMMANDS: &[&str] = &[
    "insert_raw",
    "backspace",
    "delete",
    "cursor_left",
    "cursor_right",
    "commit_preedit",
    "commit_candidate",
    "cancel",
    "select_next",
    "select_previous",
    "page_up",
    "page_down",
    "toggle_emoji",
    "toggle_off_the_record",
    "lookup_related",
    "toggle_input_mode",
    "next_input_method",
    "previous_input_method",
];

/// A hot-reloadable handle: readers call [`ConfigHandle::current`] to get an
/// `Arc` snapshot; a reload publishes a new `Config` without mutating the
/// old one in place, matching §5's version-stamped-struct model.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl ConfigHandle {
    pub fn new(initial: Config) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    pub fn current(&self) -> Arc<Config> {
        // Poisoning here would mean a writer panicked mid-publish; a stale
        // snapshot is a safer degradation than propagating the panic onto
        // the key-event path.
        self.inner
            .read()
            .map(|g| Arc::clone(&g))
            .unwrap_or_else(|e| Arc::clone(&e.into_inner()))
    }

    /// Publish a new version. `next` should already have `version` set to
    /// `current().version + 1` by the caller (the setup tool / host).
    pub fn publish(&self, next: Config) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = Arc::new(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_config() {
        let cfg = Config::parse(DEFAULT_CONFIG_TOML, 0).unwrap();
        assert_eq!(cfg.page_size, 6);
        assert_eq!(cfg.min_char_complete, 1);
        assert_eq!(cfg.emoji_trigger_characters, "_");
        assert_eq!(cfg.record_mode, RecordMode::CorrectOrPreviouslyRecorded);
    }

    #[test]
    fn rejects_too_many_input_methods() {
        let toml = format!(
            "inputmethod = [{}]\n",
            (0..11).map(|i| format!("\"m{i}\"")).collect::<Vec<_>>().join(", ")
        );
        let err = Config::parse(&toml, 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "inputmethod", .. }));
    }

    #[test]
    fn rejects_pagesize_out_of_range() {
        let err = Config::parse("pagesize = 0\n", 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "pagesize", .. }));
        let err = Config::parse("pagesize = 10\n", 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "pagesize", .. }));
    }

    #[test]
    fn rejects_unknown_keybinding_command() {
        let toml = "[keybindings]\nbogus_command = [\"Tab\"]\n";
        let err = Config::parse(toml, 0).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownCommand(_)));
    }

    #[test]
    fn autosettings_last_match_wins() {
        let toml = r#"
[[autosettings]]
option = "offtherecord"
value = "true"
regex = "term.*"

[[autosettings]]
option = "offtherecord"
value = "false"
regex = "terminal-special"
"#;
        let cfg = Config::parse(toml, 0).unwrap();
        assert_eq!(cfg.autosetting_for("offtherecord", "terminal-special"), Some("false"));
        assert_eq!(cfg.autosetting_for("offtherecord", "terminal-1"), Some("true"));
        assert_eq!(cfg.autosetting_for("offtherecord", "firefox"), None);
    }

    #[test]
    fn handle_publishes_new_version() {
        let handle = ConfigHandle::new(Config::parse(DEFAULT_CONFIG_TOML, 0).unwrap());
        assert_eq!(handle.current().version, 0);
        let mut next = (*handle.current()).clone();
        next.version = 1;
        next.page_size = 9;
        handle.publish(next);
        assert_eq!(handle.current().version, 1);
        assert_eq!(handle.current().page_size, 9);
    }
}
