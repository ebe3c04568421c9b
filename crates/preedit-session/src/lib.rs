//! Stateful IME session: composes every `preedit-core` component behind
//! one `Engine` (spec.md §9: "a single `Engine` struct composes them").
//! `preedit-core` stays pure/host-agnostic; this crate adds the
//! process-wide shared handles, the key dispatch loop, and the abstract
//! host surface (§6) a real binding (IBus, IMKit, ...) plugs into.

pub mod controller;
pub mod host;
pub mod job;
pub mod preedit;
pub mod response;

pub use controller::{ControllerDeps, ControllerOptions, PreeditController};
pub use host::{Host, RecordingHost, StyleRun};
pub use job::{JobId, JobTracker, WriterMessage, WriterQueue};
pub use preedit::Preedit;
pub use response::{CandidateAction, KeyResponse, MarkedText, RecordCommit, SideEffects};

use std::sync::{Arc, RwLock};

use preedit_core::candidates::CandidateOptions;
use preedit_core::compose::ComposeTrie;
use preedit_core::config::{Config, ConfigHandle, InlineCompletion, AutoSelectCandidate};
use preedit_core::dict::Dictionary;
use preedit_core::emoji::EmojiIndex;
use preedit_core::keymap::{Command, KeyEvent, KeyMap};
use preedit_core::translit::TransliterationSet;
use preedit_core::userdb::UserDb;

/// Resolve a boolean option for `client_id`: an `autosettings` (§6) regex
/// match overrides the global config value; the last matching rule wins
/// (`Config::autosetting_for`'s own tie-break).
fn autosetting_bool(config: &Config, option: &str, client_id: &str, default: bool) -> bool {
    match config.autosetting_for(option, client_id) {
        Some("true") => true,
        Some("false") => false,
        _ => default,
    }
}

fn autosetting_usize(config: &Config, option: &str, client_id: &str, default: usize) -> usize {
    config
        .autosetting_for(option, client_id)
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

/// Derive the narrow `ControllerOptions` the session needs from the full
/// `Config` (§6's option list) plus any per-client `autosettings` override
/// (§6 "per-application overrides... matched against the client
/// identifier"), so the controller doesn't depend on the config module's
/// parsing/validation concerns.
pub fn controller_options_from_config(config: &Config, client_id: &str) -> ControllerOptions {
    let page_size = autosetting_usize(config, "pagesize", client_id, config.page_size as usize);
    let emoji_predictions = autosetting_bool(config, "emojipredictions", client_id, config.emoji_predictions);
    let arrow_keys_reopen_preedit =
        autosetting_bool(config, "arrowkeysreopenpreedit", client_id, config.arrow_keys_reopen_preedit);
    let off_the_record = autosetting_bool(config, "offtherecord", client_id, config.off_the_record);

    ControllerOptions {
        candidate: CandidateOptions {
            page_size,
            emoji_predictions,
            emoji_trigger_characters: config.emoji_trigger_characters.clone(),
            inline_completion: matches!(config.inline_completion, InlineCompletion::On),
            inline_confidence_threshold: 1_000.0,
            auto_select_candidate: matches!(config.auto_select_candidate, AutoSelectCandidate::On),
        },
        auto_commit_characters: config.auto_commit_characters.clone(),
        auto_capitalize: false,
        arrow_keys_reopen_preedit,
        record_mode: config.record_mode,
        min_char_complete: config.min_char_complete as usize,
        off_the_record,
    }
}

/// Top-level composition root (§9 "Mutable global state in the source:
/// re-architect as explicit dependency-injected handles held by the
/// PreeditController; a single Engine struct composes them"). One `Engine`
/// per running instance of the input method; `controller` is the single
/// active focus session.
pub struct Engine<H: Host> {
    pub config: ConfigHandle,
    pub keymap: KeyMap,
    pub deps: ControllerDeps,
    pub controller: PreeditController,
    pub host: H,
    /// Identifier of the currently focused client, consulted against
    /// `autosettings` (§6) when resolving per-client options. Empty until
    /// the first `focus_in`.
    pub client_id: String,
}

impl<H: Host> Engine<H> {
    pub fn new(
        config: ConfigHandle,
        keymap: KeyMap,
        user_db: UserDb,
        dictionaries: Arc<dyn Dictionary>,
        emoji_index: Option<Arc<EmojiIndex>>,
        compose_trie: ComposeTrie,
        translit: TransliterationSet,
        host: H,
    ) -> Self {
        let deps = ControllerDeps {
            user_db: Arc::new(RwLock::new(user_db)),
            dictionaries,
            emoji_index,
            compose_trie: Arc::new(RwLock::new(Arc::new(compose_trie))),
        };
        Engine {
            config,
            keymap,
            deps,
            controller: PreeditController::new(translit),
            host,
            client_id: String::new(),
        }
    }

    /// §4.8/§6: a new client gained input focus. Resets the per-focus
    /// reopen-preedit bookkeeping and records the client id so per-client
    /// `autosettings` apply to it.
    pub fn focus_in(&mut self, client_id: impl Into<String>, is_password_or_terminal: bool) {
        self.client_id = client_id.into();
        self.controller.focus_in(is_password_or_terminal);
    }

    pub fn focus_out(&mut self) {
        self.controller.focus_out();
    }

    /// Translate one host key event through KeyMap → Command →
    /// PreeditController, and apply the result to `host`. Returns whether
    /// the key was consumed (the only signal the host ever needs, per §7's
    /// propagation policy).
    pub fn handle_key_event(&mut self, event: &KeyEvent) -> bool {
        let _span = tracing::debug_span!("handle_key_event", keyval = %event.keyval, is_release = event.is_release).entered();
        // Release events normally carry no command (§4.1), but a release
        // still has to reach `KeyMap::resolve`: it's what completes a bare
        // shift press/release pair into `ToggleCaseMode`.
        let candidates_visible = !self.controller.current_candidates().candidates.is_empty();
        let digit_value = event.keyval.parse::<usize>().ok().filter(|n| (0..10).contains(n));
        let commands = self.keymap.resolve(event, candidates_visible, digit_value);
        if commands.is_empty() {
            return false;
        }

        let config = self.config.current();
        let options = controller_options_from_config(&config, &self.client_id);

        let mut any_consumed = false;
        for command in commands {
            let resp = self.dispatch(&command, &options, event);
            any_consumed |= resp.consumed;
            self.apply_response(resp);
        }
        self.drain_writer_queue();
        any_consumed
    }

    /// Apply pending UserDB writes queued by the controller (§5: the event
    /// loop never blocks the key path on the writer; a real host would hand
    /// this drain to a dedicated worker instead of calling it inline here).
    fn drain_writer_queue(&mut self) {
        for message in self.controller.drain_writer_messages() {
            let mut db = self.deps.user_db.write().unwrap_or_else(|e| e.into_inner());
            match message {
                WriterMessage::RecordCommit { phrase, context1, context2 } => {
                    db.record_commit(&phrase, &context1, &context2);
                }
                WriterMessage::Forget { phrase, context1, context2 } => {
                    db.forget(&phrase, &context1, &context2);
                }
                WriterMessage::DecayPass => db.decay_pass(),
            }
        }
    }

    fn dispatch(&mut self, command: &Command, options: &ControllerOptions, event: &KeyEvent) -> KeyResponse {
        match command {
            Command::InsertRaw(c) => {
                if self.controller.input_mode_enabled() {
                    self.controller.insert_raw(&self.deps, options, &c.to_string())
                } else {
                    self.forward_to_host(event)
                }
            }
            Command::Backspace => self.controller.backspace(&self.deps, options),
            Command::Delete => self.controller.delete(&self.deps, options),
            Command::CommitPreedit => self.controller.commit(&self.deps, options),
            Command::CommitCandidate(n) => self.controller.commit_candidate(&self.deps, options, *n),
            Command::Cancel => self.controller.cancel(),
            Command::SelectNext => self.controller.select_next(),
            Command::SelectPrevious => self.controller.select_previous(),
            Command::CursorLeft => self.controller.cursor_left(&self.deps, options),
            Command::CursorRight => self.controller.cursor_right(&self.deps, options),
            Command::PageUp => self.controller.page_up(&self.deps, options),
            Command::PageDown => self.controller.page_down(&self.deps, options),
            Command::ToggleEmoji => self.controller.toggle_emoji(&self.deps, options),
            Command::ToggleOffTheRecord => self.controller.toggle_off_the_record(),
            Command::LookupRelated => self.controller.lookup_related(&self.deps, options),
            Command::ToggleInputMode => self.controller.toggle_input_mode(&self.deps, options),
            Command::NextInputMethod => self.controller.next_input_method(),
            Command::PreviousInputMethod => self.controller.previous_input_method(),
            Command::ToggleCaseMode => self.controller.toggle_case_mode(),
        }
    }

    fn forward_to_host(&mut self, event: &KeyEvent) -> KeyResponse {
        self.host.forward_key_event(event);
        KeyResponse::not_consumed()
    }

    fn apply_response(&mut self, resp: KeyResponse) {
        if let Some(text) = resp.commit {
            self.host.commit_text(&text);
        }
        if let Some(marked) = resp.marked {
            self.host.update_preedit(&marked.text, marked.cursor, !marked.text.is_empty(), &[]);
        }
        match resp.candidates {
            CandidateAction::Show { candidates, .. } => {
                self.host.update_candidates(&candidates, 0, true);
            }
            CandidateAction::Hide => {
                self.host.update_candidates(&[], 0, false);
            }
            CandidateAction::Keep => {}
        }
        // resp.side_effects.record_commit mirrors the WriterMessage already
        // pushed onto the controller's writer queue (§5); the actual write
        // happens in drain_writer_queue so it never blocks the key path.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use preedit_core::config::Config;
    use preedit_core::dict::WordList;
    use preedit_core::keymap::KeyMap;
    use preedit_core::translit::{MethodTable, TransliterationMethod};

    fn test_engine() -> Engine<RecordingHost> {
        let config = Config::parse(preedit_core::config::DEFAULT_CONFIG_TOML, 1).unwrap();
        let (keymap, _warnings) = KeyMap::build(&config.keybindings, &|_| true);
        let translit = TransliterationSet::new(vec![TransliterationMethod::new("NoIME", MethodTable::identity())]);
        Engine::new(
            ConfigHandle::new(config),
            keymap,
            UserDb::new(100),
            Arc::new(WordList::from_words(["camel".to_string()])),
            None,
            ComposeTrie::from_map(Default::default()),
            translit,
            RecordingHost::default(),
        )
    }

    #[test]
    fn typing_and_commit_reaches_host() {
        let mut engine = test_engine();
        for (code, text) in [(0, "c"), (0, "a"), (0, "m"), (0, "e"), (0, "l")] {
            let event = KeyEvent {
                code,
                keyval: text.to_string(),
                modifiers: preedit_core::keymap::Modifiers::NONE,
                is_release: false,
                is_forwarded: false,
            };
            engine.handle_key_event(&event);
        }
        let enter = KeyEvent {
            code: 36,
            keyval: "Return".to_string(),
            modifiers: preedit_core::keymap::Modifiers::NONE,
            is_release: false,
            is_forwarded: false,
        };
        engine.handle_key_event(&enter);
        assert_eq!(engine.host.committed, vec!["camel".to_string()]);
    }

    fn key(keyval: &str, is_release: bool) -> KeyEvent {
        KeyEvent {
            code: 0,
            keyval: keyval.to_string(),
            modifiers: preedit_core::keymap::Modifiers::NONE,
            is_release,
            is_forwarded: false,
        }
    }

    #[test]
    fn page_down_key_event_reaches_a_different_candidate_page() {
        let config = Config::parse(preedit_core::config::DEFAULT_CONFIG_TOML, 1).unwrap();
        let (keymap, _warnings) = KeyMap::build(&config.keybindings, &|_| true);
        let translit = TransliterationSet::new(vec![TransliterationMethod::new("NoIME", MethodTable::identity())]);
        let words: Vec<String> = (0..20).map(|i| format!("cam{i}")).collect();
        let mut engine = Engine::new(
            ConfigHandle::new(config),
            keymap,
            UserDb::new(100),
            Arc::new(WordList::from_words(words)),
            None,
            ComposeTrie::from_map(Default::default()),
            translit,
            RecordingHost::default(),
        );
        for k in ["c", "a", "m"] {
            engine.handle_key_event(&key(k, false));
        }
        let first_page = engine.host.candidate_updates.last().unwrap().0.clone();
        engine.handle_key_event(&key("Page_Down", false));
        let second_page = engine.host.candidate_updates.last().unwrap().0.clone();
        assert_ne!(first_page, second_page);
    }

    #[test]
    fn bare_shift_tap_toggles_case_mode_through_the_engine() {
        let mut engine = test_engine();
        engine.handle_key_event(&key("Shift_L", false));
        engine.handle_key_event(&key("Shift_L", true));
        let resp = engine.handle_key_event(&key("c", false));
        assert!(resp);
        let (text, ..) = engine.host.preedit_updates.last().unwrap();
        assert_eq!(text, "C");
    }

    #[test]
    fn toggle_input_mode_disables_and_forwards_subsequent_keys() {
        let mut engine = test_engine();
        let control_space = KeyEvent {
            code: 0,
            keyval: "space".to_string(),
            modifiers: preedit_core::keymap::Modifiers { control: true, ..preedit_core::keymap::Modifiers::NONE },
            is_release: false,
            is_forwarded: false,
        };
        engine.handle_key_event(&control_space);
        assert!(!engine.controller.input_mode_enabled());
        engine.handle_key_event(&key("x", false));
        assert_eq!(engine.host.forwarded_keys.len(), 1);
    }
}
