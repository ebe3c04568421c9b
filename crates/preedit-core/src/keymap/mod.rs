//! Translate raw key events into semantic commands (spec.md §4.1).
//!
//! Pure translation, no state: given a [`KeyEvent`] and a [`KeyMap`] built
//! from configuration, return zero or more [`Command`]s. Grounded on the
//! teacher's `keymap_get(key_code, has_shift)` lookup in `settings.rs`,
//! generalized from a single hardcoded table to one built from the
//! `keybindings` configuration map.

use std::collections::HashMap;

use thiserror::Error;

/// A raw key event from the host. Immutable, produced by the host (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: u16,
    pub keyval: String,
    pub modifiers: Modifiers,
    pub is_release: bool,
    pub is_forwarded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        control: false,
        alt: false,
        meta: false,
    };
}

/// Semantic actions a key event can resolve to (§4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    InsertRaw(char),
    Backspace,
    Delete,
    CursorLeft,
    CursorRight,
    CommitPreedit,
    CommitCandidate(usize),
    Cancel,
    SelectNext,
    SelectPrevious,
    PageUp,
    PageDown,
    ToggleEmoji,
    ToggleOffTheRecord,
    LookupRelated,
    ToggleInputMode,
    NextInputMethod,
    PreviousInputMethod,
    /// Emitted by a bare Shift press/release pair with no intervening key
    /// press (§4.1). Not part of the configurable keybinding vocabulary —
    /// shift pairing is detected directly off `Shift_L`/`Shift_R` keysyms,
    /// never bound through `keybindings`.
    ToggleCaseMode,
}

/// Every command the engine recognizes, in binding precedence order for
/// the dual-binding case (Tab: lookup before select_next).
const ALL_COMMANDS: &[&str] = &[
    "commit_preedit",
    "cancel",
    "toggle_emoji",
    "toggle_off_the_record",
    "lookup_related",
    "toggle_input_mode",
    "next_input_method",
    "previous_input_method",
    "page_up",
    "page_down",
    "select_next",
    "select_previous",
    "commit_candidate",
    "backspace",
    "delete",
    "cursor_left",
    "cursor_right",
];

#[derive(Debug, Error)]
pub enum KeyMapError {
    #[error("unknown keysym {keysym:?} bound to command {command}")]
    InvalidBinding { command: String, keysym: String },
}

/// A single parsed key-combo: modifiers plus a keysym string (e.g. "Tab",
/// "Control+space", "F1").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct KeyCombo {
    control: bool,
    alt: bool,
    meta: bool,
    keysym: String,
}

impl KeyCombo {
    fn parse(spec: &str) -> Self {
        let mut control = false;
        let mut alt = false;
        let mut meta = false;
        let mut keysym = spec;
        loop {
            if let Some(rest) = keysym.strip_prefix("Control+") {
                control = true;
                keysym = rest;
            } else if let Some(rest) = keysym.strip_prefix("Alt+") {
                alt = true;
                keysym = rest;
            } else if let Some(rest) = keysym.strip_prefix("Meta+") {
                meta = true;
                keysym = rest;
            } else {
                break;
            }
        }
        KeyCombo {
            control,
            alt,
            meta,
            keysym: keysym.to_string(),
        }
    }

    fn matches(&self, event: &KeyEvent) -> bool {
        self.keysym == event.keyval
            && self.control == event.modifiers.control
            && self.alt == event.modifiers.alt
            && self.meta == event.modifiers.meta
    }
}

/// Whether `keyval` names a Shift modifier key itself (as opposed to a
/// regular key held while Shift is down).
fn is_shift_keysym(keyval: &str) -> bool {
    matches!(keyval, "Shift_L" | "Shift_R")
}

/// Resolved keybinding table: command name → set of key combos. Built once
/// from configuration; immutable thereafter (a config reload builds a new
/// one and the caller swaps it, same as [`crate::config::Config`]).
///
/// Also tracks the one piece of state `resolve` needs across calls: a
/// pending bare Shift press, so a matching release with no intervening
/// press of another key can be recognized as a case-mode toggle (§4.1).
pub struct KeyMap {
    bindings: HashMap<&'static str, Vec<KeyCombo>>,
    pending_shift: Option<String>,
}

impl KeyMap {
    /// Build from the configuration's `keybindings` map. Unknown command
    /// names are not possible here (validated at config-parse time); unknown
    /// keysyms are reported as [`KeyMapError::InvalidBinding`] but otherwise
    /// skipped, per §4.1: "surfaced, not fatal; binding is ignored."
    pub fn build(
        keybindings: &HashMap<String, Vec<String>>,
        known_keysyms: &dyn Fn(&str) -> bool,
    ) -> (Self, Vec<KeyMapError>) {
        let mut bindings: HashMap<&'static str, Vec<KeyCombo>> =
            ALL_COMMANDS.iter().map(|&c| (c, Vec::new())).collect();
        let mut errors = Vec::new();

        for (command, combos) in keybindings {
            let Some(&canonical) = ALL_COMMANDS.iter().find(|c| **c == command.as_str()) else {
                continue;
            };
            for spec in combos {
                let combo = KeyCombo::parse(spec);
                if !known_keysyms(&combo.keysym) {
                    errors.push(KeyMapError::InvalidBinding {
                        command: canonical.to_string(),
                        keysym: combo.keysym,
                    });
                    continue;
                }
                bindings.get_mut(canonical).unwrap().push(combo);
            }
        }

        (KeyMap { bindings, pending_shift: None }, errors)
    }

    fn bound_commands(&self, event: &KeyEvent) -> Vec<&'static str> {
        ALL_COMMANDS
            .iter()
            .copied()
            .filter(|cmd| {
                self.bindings
                    .get(cmd)
                    .map(|combos| combos.iter().any(|c| c.matches(event)))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Resolve `event` into zero or more commands. `candidates_visible` and
    /// `tab_enabled` implement the Tab dual-binding precedence rule
    /// (§4.1); `digit_value` is `Some(n)` when the event is a bare digit
    /// key, used for the commit-shortcut-only-while-visible rule.
    pub fn resolve(
        &mut self,
        event: &KeyEvent,
        candidates_visible: bool,
        digit_value: Option<usize>,
    ) -> Vec<Command> {
        if is_shift_keysym(&event.keyval) {
            return self.resolve_shift(event);
        }

        // Any other key press breaks a pending Shift pairing (§4.1 "no
        // intervening press"); releases of other keys don't count.
        if !event.is_release {
            self.pending_shift = None;
        }

        if event.is_release {
            return Vec::new();
        }

        if let (true, Some(n)) = (candidates_visible, digit_value) {
            return vec![Command::CommitCandidate(n)];
        }

        let bound = self.bound_commands(event);
        if bound.is_empty() {
            if let Some(c) = sole_char(event) {
                return vec![Command::InsertRaw(c)];
            }
            return Vec::new();
        }

        // §4.1 precedence: a key bound to both lookup_related and
        // select_next resolves to lookup_related unless a candidate list
        // is already visible.
        if bound.contains(&"lookup_related") && bound.contains(&"select_next") {
            let cmd = if candidates_visible {
                "select_next"
            } else {
                "lookup_related"
            };
            return vec![to_command(cmd, None)];
        }

        bound.into_iter().map(|c| to_command(c, digit_value)).collect()
    }

    /// §4.1 shift-pairing: a press records the pending keysym; a matching
    /// release completes the toggle unless an intervening press (of this
    /// or another key) already cleared it.
    fn resolve_shift(&mut self, event: &KeyEvent) -> Vec<Command> {
        if event.is_release {
            let completes = self.pending_shift.as_deref() == Some(event.keyval.as_str());
            self.pending_shift = None;
            if completes {
                return vec![Command::ToggleCaseMode];
            }
            Vec::new()
        } else {
            self.pending_shift = Some(event.keyval.clone());
            Vec::new()
        }
    }
}

fn sole_char(event: &KeyEvent) -> Option<char> {
    let mut chars = event.keyval.chars();
    let c = chars.next()?;
    if chars.next().is_none() && !event.modifiers.control && !event.modifiers.meta {
        Some(c)
    } else {
        None
    }
}

fn to_command(name: &str, digit_value: Option<usize>) -> Command {
    match name {
        "commit_preedit" => Command::CommitPreedit,
        "cancel" => Command::Cancel,
        "toggle_emoji" => Command::ToggleEmoji,
        "toggle_off_the_record" => Command::ToggleOffTheRecord,
        "lookup_related" => Command::LookupRelated,
        "toggle_input_mode" => Command::ToggleInputMode,
        "next_input_method" => Command::NextInputMethod,
        "previous_input_method" => Command::PreviousInputMethod,
        "page_up" => Command::PageUp,
        "page_down" => Command::PageDown,
        "select_next" => Command::SelectNext,
        "select_previous" => Command::SelectPrevious,
        "commit_candidate" => Command::CommitCandidate(digit_value.unwrap_or(0)),
        "backspace" => Command::Backspace,
        "delete" => Command::Delete,
        "cursor_left" => Command::CursorLeft,
        "cursor_right" => Command::CursorRight,
        other => unreachable!("unrecognized command name {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(keyval: &str, modifiers: Modifiers) -> KeyEvent {
        KeyEvent {
            code: 0,
            keyval: keyval.to_string(),
            modifiers,
            is_release: false,
            is_forwarded: false,
        }
    }

    fn build(bindings: &[(&str, &str)]) -> KeyMap {
        let mut map = HashMap::new();
        for (cmd, combo) in bindings {
            map.entry(cmd.to_string())
                .or_insert_with(Vec::new)
                .push(combo.to_string());
        }
        KeyMap::build(&map, &|_| true).0
    }

    #[test]
    fn plain_letter_inserts_when_unbound() {
        let mut km = build(&[]);
        let cmds = km.resolve(&press("a", Modifiers::NONE), false, None);
        assert_eq!(cmds, vec![Command::InsertRaw('a')]);
    }

    #[test]
    fn bound_key_does_not_insert() {
        let mut km = build(&[("commit_preedit", "Return")]);
        let cmds = km.resolve(&press("Return", Modifiers::NONE), false, None);
        assert_eq!(cmds, vec![Command::CommitPreedit]);
    }

    #[test]
    fn tab_precedence_prefers_lookup_when_no_candidates() {
        let mut km = build(&[("lookup_related", "Tab"), ("select_next", "Tab")]);
        let cmds = km.resolve(&press("Tab", Modifiers::NONE), false, None);
        assert_eq!(cmds, vec![Command::LookupRelated]);
        let cmds = km.resolve(&press("Tab", Modifiers::NONE), true, None);
        assert_eq!(cmds, vec![Command::SelectNext]);
    }

    #[test]
    fn digit_commits_only_when_candidates_visible() {
        let mut km = build(&[]);
        let cmds = km.resolve(&press("3", Modifiers::NONE), true, Some(3));
        assert_eq!(cmds, vec![Command::CommitCandidate(3)]);
        let cmds = km.resolve(&press("3", Modifiers::NONE), false, Some(3));
        assert_eq!(cmds, vec![Command::InsertRaw('3')]);
    }

    #[test]
    fn unknown_keysym_reports_error_but_keeps_others() {
        let mut map = HashMap::new();
        map.insert(
            "cancel".to_string(),
            vec!["Escape".to_string(), "Bogus_Key".to_string()],
        );
        let (mut km, errors) = KeyMap::build(&map, &|k| k == "Escape");
        assert_eq!(errors.len(), 1);
        let cmds = km.resolve(&press("Escape", Modifiers::NONE), false, None);
        assert_eq!(cmds, vec![Command::Cancel]);
    }

    #[test]
    fn release_events_resolve_to_nothing() {
        let mut km = build(&[("cancel", "Escape")]);
        let mut event = press("Escape", Modifiers::NONE);
        event.is_release = true;
        assert!(km.resolve(&event, false, None).is_empty());
    }

    fn shift_event(keyval: &str, is_release: bool) -> KeyEvent {
        KeyEvent {
            code: 0,
            keyval: keyval.to_string(),
            modifiers: Modifiers::NONE,
            is_release,
            is_forwarded: false,
        }
    }

    #[test]
    fn bare_shift_tap_toggles_case_mode() {
        let mut km = build(&[]);
        assert!(km.resolve(&shift_event("Shift_L", false), false, None).is_empty());
        let cmds = km.resolve(&shift_event("Shift_L", true), false, None);
        assert_eq!(cmds, vec![Command::ToggleCaseMode]);
    }

    #[test]
    fn shift_tap_with_intervening_press_does_not_toggle() {
        let mut km = build(&[]);
        km.resolve(&shift_event("Shift_L", false), false, None);
        km.resolve(&press("a", Modifiers::NONE), false, None);
        let cmds = km.resolve(&shift_event("Shift_L", true), false, None);
        assert!(cmds.is_empty());
    }

    #[test]
    fn mismatched_shift_release_does_not_toggle() {
        let mut km = build(&[]);
        km.resolve(&shift_event("Shift_L", false), false, None);
        let cmds = km.resolve(&shift_event("Shift_R", true), false, None);
        assert!(cmds.is_empty());
    }
}
