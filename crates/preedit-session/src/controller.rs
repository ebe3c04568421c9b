//! `PreeditController`: the Empty/Editing state machine that owns the live
//! preedit and orchestrates KeyMap → Compose → Transliteration → Candidate
//! (spec.md §4.8). Grounded on the teacher's `InputSession`/`handle_key`
//! family (`key_handlers.rs`, `composing.rs`, `commit.rs`): same shape of
//! "one state enum, one method per command", generalized from the
//! teacher's hardcoded two-submode (Japanese/English) session into the
//! spec's compose-engine + N-configured-transliterations pipeline.

use std::sync::{Arc, RwLock};

use preedit_core::candidates::{self, Annotation, Candidate, CandidateList, CandidateOptions, Source as CandidateSource};
use preedit_core::compose::{self, ComposeState, ComposeTrie};
use preedit_core::dict::Dictionary;
use preedit_core::emoji::EmojiIndex;
use preedit_core::translit::TransliterationSet;
use preedit_core::userdb::{record_mode_permits, UserDb};
use preedit_core::config::RecordMode;

use crate::job::{JobTracker, WriterMessage, WriterQueue};
use crate::preedit::Preedit;
use crate::response::{CandidateAction, KeyResponse, MarkedText, RecordCommit, SideEffects};

/// §3 ownership line: these are process-wide, read-mostly, shared handles;
/// the controller holds clones, never the sole owner.
pub struct ControllerDeps {
    pub user_db: Arc<RwLock<UserDb>>,
    pub dictionaries: Arc<dyn Dictionary>,
    pub emoji_index: Option<Arc<EmojiIndex>>,
    pub compose_trie: Arc<RwLock<Arc<ComposeTrie>>>,
}

impl ControllerDeps {
    fn compose_trie(&self) -> Arc<ComposeTrie> {
        self.compose_trie.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Atomic reload of the compose overlay (§4.3 "Reloading the overlay
    /// is atomic: builds a new trie, swaps the shared reference").
    pub fn reload_compose_trie(&self, new_trie: ComposeTrie) {
        let mut guard = self.compose_trie.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(new_trie);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Empty,
    Editing,
}

/// Behavioral options the controller consults directly (a narrowed view of
/// `Config` so call sites don't thread the whole struct through).
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub candidate: CandidateOptions,
    pub auto_commit_characters: String,
    pub auto_capitalize: bool,
    pub arrow_keys_reopen_preedit: bool,
    pub record_mode: RecordMode,
    pub min_char_complete: usize,
    /// Config-level off-the-record default (§6 `offtherecord`); ORed with
    /// the session toggle (`Command::ToggleOffTheRecord`) so either one
    /// suppresses UserDB writes.
    pub off_the_record: bool,
}

/// §4.8: "focus/surrounding-text bookkeeping" for the reopen-preedit
/// reliability checks. Reset on `focus_in`.
#[derive(Debug, Default)]
struct FocusState {
    commits_this_session: usize,
    last_surrounding_text: Option<String>,
    is_password_or_terminal: bool,
}

pub struct PreeditController {
    state: State,
    preedit: Preedit,
    compose_state: ComposeState,
    translit: TransliterationSet,
    candidates: CandidateList,
    /// Current `page_size`-sized window into the last `regenerate_candidates`
    /// result (§4.1 `page_up`/`page_down`); reset to 0 whenever the preedit
    /// text itself changes.
    page: usize,
    context1: String,
    context2: String,
    off_the_record: bool,
    /// Session override for `emojipredictions` (§4.1 `toggle_emoji`):
    /// ORed with the config value rather than replacing it.
    force_emoji: bool,
    /// §6 `inputmode`: whether typed characters flow through compose/
    /// transliteration/candidates, or are forwarded to the host untouched.
    input_mode_enabled: bool,
    /// §4.1 shift-tap case-mode toggle: when set, the next raw keysym fed
    /// to `insert_raw` is upper-cased before compose/transliteration.
    case_mode_upper: bool,
    focus: FocusState,
    job_tracker: JobTracker,
    writer: WriterQueue,
}

impl PreeditController {
    pub fn new(translit: TransliterationSet) -> Self {
        PreeditController {
            state: State::Empty,
            preedit: Preedit::new(),
            compose_state: ComposeState::new(),
            translit,
            candidates: CandidateList::default(),
            page: 0,
            context1: String::new(),
            context2: String::new(),
            off_the_record: false,
            force_emoji: false,
            input_mode_enabled: true,
            case_mode_upper: false,
            focus: FocusState::default(),
            job_tracker: JobTracker::new(),
            writer: WriterQueue::new(),
        }
    }

    pub fn is_editing(&self) -> bool {
        self.state == State::Editing
    }

    pub fn current_candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub fn drain_writer_messages(&mut self) -> Vec<WriterMessage> {
        self.writer.drain()
    }

    pub fn set_off_the_record(&mut self, enabled: bool) {
        self.off_the_record = enabled;
    }

    pub fn focus_in(&mut self, is_password_or_terminal: bool) {
        self.focus = FocusState { is_password_or_terminal, ..FocusState::default() };
    }

    pub fn focus_out(&mut self) {
        self.reset_to_empty();
    }

    /// §4.8 Empty/Editing → insert_raw.
    pub fn insert_raw(&mut self, deps: &ControllerDeps, options: &ControllerOptions, keysym: &str) -> KeyResponse {
        let _span = tracing::debug_span!("insert_raw", keysym).entered();
        if self.state == State::Empty {
            self.state = State::Editing;
            self.translit.reset_all();
            self.compose_state.clear();
            if options.auto_capitalize && ends_with_sentence_terminator(&self.context1) {
                if let Some(capitalized) = capitalize_first(keysym) {
                    return self.insert_one(deps, options, &capitalized);
                }
            }
        }

        let keysym = if self.case_mode_upper { uppercase_keysym(keysym) } else { keysym.to_string() };
        let trie = deps.compose_trie();
        match compose::feed(&mut self.compose_state, &trie, keysym) {
            compose::StepOutcome::Live => {
                let mut resp = KeyResponse::consumed();
                resp.marked = Some(MarkedText {
                    text: self.display_text(),
                    cursor: self.preedit.cursor(),
                    compose_preview: true,
                });
                resp
            }
            compose::StepOutcome::Resolved(result) | compose::StepOutcome::Fallback(result) => {
                self.insert_one(deps, options, &result)
            }
            compose::StepOutcome::Error => {
                let mut resp = KeyResponse::consumed();
                resp.marked = Some(MarkedText {
                    text: self.display_text(),
                    cursor: self.preedit.cursor(),
                    compose_preview: self.compose_state.is_active(),
                });
                resp
            }
        }
    }

    /// The compose engine didn't want the key (or resolved/fell back to a
    /// literal string): append it as a raw token and run the rest of
    /// §4.8's Editing→insert_raw pipeline (candidate production,
    /// auto-commit characters).
    fn insert_one(&mut self, deps: &ControllerDeps, options: &ControllerOptions, raw: &str) -> KeyResponse {
        self.preedit.insert(raw);

        if let Some(c) = raw.chars().next() {
            if options.auto_commit_characters.contains(c) {
                let mut resp = self.commit_with_suffix(deps, options, Some(format!("{c} ")), true);
                resp.consumed = true;
                return resp;
            }
        }

        self.page = 0;
        let mut resp = KeyResponse::consumed();
        resp.marked = Some(MarkedText {
            text: self.display_text(),
            cursor: self.preedit.cursor(),
            compose_preview: false,
        });
        self.regenerate_candidates(deps, options);
        resp.candidates = self.candidate_action();
        resp
    }

    /// §4.8 Editing → backspace.
    pub fn backspace(&mut self, deps: &ControllerDeps, options: &ControllerOptions) -> KeyResponse {
        let _span = tracing::debug_span!("backspace").entered();
        if self.compose_state.is_active() {
            self.compose_state.clear();
        } else if !self.preedit.backspace() {
            return KeyResponse::not_consumed();
        }

        if self.preedit.is_empty() && !self.compose_state.is_active() {
            self.reset_to_empty();
            let mut resp = KeyResponse::consumed();
            resp.marked = Some(MarkedText { text: String::new(), cursor: 0, compose_preview: false });
            resp.candidates = CandidateAction::Hide;
            return resp;
        }

        self.page = 0;
        let mut resp = KeyResponse::consumed();
        resp.marked = Some(MarkedText {
            text: self.display_text(),
            cursor: self.preedit.cursor(),
            compose_preview: false,
        });
        self.regenerate_candidates(deps, options);
        resp.candidates = self.candidate_action();
        resp
    }

    /// §4.1 `Delete`: forward-delete at the cursor. Mirrors `backspace`'s
    /// shape but never clears an in-progress compose sequence — a
    /// forward-delete with a live compose prefix simply has nothing to do.
    pub fn delete(&mut self, deps: &ControllerDeps, options: &ControllerOptions) -> KeyResponse {
        let _span = tracing::debug_span!("delete").entered();
        if !self.preedit.delete_forward() {
            return KeyResponse::not_consumed();
        }

        if self.preedit.is_empty() && !self.compose_state.is_active() {
            self.reset_to_empty();
            let mut resp = KeyResponse::consumed();
            resp.marked = Some(MarkedText { text: String::new(), cursor: 0, compose_preview: false });
            resp.candidates = CandidateAction::Hide;
            return resp;
        }

        self.page = 0;
        let mut resp = KeyResponse::consumed();
        resp.marked = Some(MarkedText {
            text: self.display_text(),
            cursor: self.preedit.cursor(),
            compose_preview: false,
        });
        self.regenerate_candidates(deps, options);
        resp.candidates = self.candidate_action();
        resp
    }

    /// §4.8 Editing → commit. Commits the selected candidate if one is
    /// selected, else the canonical preedit string.
    pub fn commit(&mut self, deps: &ControllerDeps, options: &ControllerOptions) -> KeyResponse {
        self.commit_with_suffix(deps, options, None, false)
    }

    /// §4.1/§4.8: commit a specific candidate by its position in the
    /// current list (digit-key shortcuts).
    pub fn commit_candidate(&mut self, deps: &ControllerDeps, options: &ControllerOptions, index: usize) -> KeyResponse {
        self.candidates.selected = self.candidates.candidates.get(index).map(|_| index);
        self.commit_with_suffix(deps, options, None, false)
    }

    fn commit_with_suffix(
        &mut self,
        deps: &ControllerDeps,
        options: &ControllerOptions,
        suffix: Option<String>,
        from_auto_commit: bool,
    ) -> KeyResponse {
        let _span = tracing::debug_span!("commit", from_auto_commit).entered();
        if self.state == State::Empty && !from_auto_commit {
            return KeyResponse::not_consumed();
        }

        self.compose_state.clear();
        for m in self.translit.methods_mut() {
            let _ = m.flush();
        }

        let text = self
            .candidates
            .selected
            .and_then(|i| self.candidates.candidates.get(i))
            .map(|c| c.text.clone())
            .unwrap_or_else(|| self.preedit.canonical(&self.translit));

        let is_in_dictionary = deps.dictionaries.spellcheck(&text);
        let is_already_recorded = {
            let db = deps.user_db.read().unwrap_or_else(|e| e.into_inner());
            !db.lookup(&text, &self.context1, &self.context2).is_empty()
        };

        let off_the_record = self.off_the_record || options.off_the_record;
        let mut side_effects = SideEffects::default();
        if !off_the_record && record_mode_permits(options.record_mode, is_in_dictionary, is_already_recorded) {
            side_effects.record_commit = Some(RecordCommit {
                phrase: text.clone(),
                context1: self.context1.clone(),
                context2: self.context2.clone(),
            });
            self.writer.push(WriterMessage::RecordCommit {
                phrase: text.clone(),
                context1: self.context1.clone(),
                context2: self.context2.clone(),
            });
        }

        self.context2 = std::mem::take(&mut self.context1);
        self.context1 = text.clone();
        self.focus.commits_this_session += 1;

        let committed = match suffix {
            Some(s) => format!("{text}{s}"),
            None => text,
        };

        self.reset_to_empty();

        KeyResponse {
            consumed: true,
            commit: Some(committed),
            marked: Some(MarkedText { text: String::new(), cursor: 0, compose_preview: false }),
            candidates: CandidateAction::Hide,
            side_effects,
        }
    }

    /// §4.8 Editing → cancel.
    pub fn cancel(&mut self) -> KeyResponse {
        if self.state == State::Empty {
            return KeyResponse::not_consumed();
        }
        if self.candidates.selected.is_some() {
            self.candidates.selected = None;
            let mut resp = KeyResponse::consumed();
            resp.candidates = self.candidate_action();
            return resp;
        }
        self.reset_to_empty();
        let mut resp = KeyResponse::consumed();
        resp.marked = Some(MarkedText { text: String::new(), cursor: 0, compose_preview: false });
        resp.candidates = CandidateAction::Hide;
        resp
    }

    /// §4.8 Editing → cursor_left/right. Moving past an edge either
    /// auto-commits (if configured) or forwards the key (signaled by
    /// `not_consumed`).
    pub fn cursor_left(&mut self, deps: &ControllerDeps, options: &ControllerOptions) -> KeyResponse {
        if self.preedit.cursor_left() {
            let mut resp = KeyResponse::consumed();
            resp.marked = Some(MarkedText {
                text: self.display_text(),
                cursor: self.preedit.cursor(),
                compose_preview: false,
            });
            resp
        } else if options.arrow_keys_reopen_preedit {
            self.commit(deps, options)
        } else {
            KeyResponse::not_consumed()
        }
    }

    pub fn cursor_right(&mut self, deps: &ControllerDeps, options: &ControllerOptions) -> KeyResponse {
        if self.preedit.cursor_right() {
            let mut resp = KeyResponse::consumed();
            resp.marked = Some(MarkedText {
                text: self.display_text(),
                cursor: self.preedit.cursor(),
                compose_preview: false,
            });
            resp
        } else if options.arrow_keys_reopen_preedit {
            self.commit(deps, options)
        } else {
            KeyResponse::not_consumed()
        }
    }

    pub fn select_next(&mut self) -> KeyResponse {
        self.move_selection(1)
    }

    pub fn select_previous(&mut self) -> KeyResponse {
        self.move_selection(-1)
    }

    fn move_selection(&mut self, delta: i32) -> KeyResponse {
        let count = self.candidates.candidates.len();
        if count == 0 {
            return KeyResponse::not_consumed();
        }
        let current = self.candidates.selected.unwrap_or(0) as i32;
        let next = (current + delta).rem_euclid(count as i32) as usize;
        self.candidates.selected = Some(next);
        let mut resp = KeyResponse::consumed();
        resp.candidates = self.candidate_action();
        resp
    }

    /// §4.8 "Reopen-preedit": only fires when every reliability check
    /// passes; otherwise a silent no-op (§9 "do not guess intent").
    pub fn try_reopen_preedit(
        &mut self,
        surrounding_text: &str,
        cursor: usize,
        word_at_cursor: Option<(String, usize, usize)>,
    ) -> Option<KeyResponse> {
        if self.state != State::Empty {
            return None;
        }
        if self.focus.is_password_or_terminal {
            return None;
        }
        if self.focus.commits_this_session == 0 {
            return None;
        }
        let reliable = self
            .focus
            .last_surrounding_text
            .as_deref()
            .map(|prev| surrounding_text.starts_with(prev) || prev.starts_with(surrounding_text))
            .unwrap_or(true);
        self.focus.last_surrounding_text = Some(surrounding_text.to_string());
        if !reliable {
            return None;
        }
        let (word, start, end) = word_at_cursor?;
        if !(start..=end).contains(&cursor) {
            return None;
        }

        self.state = State::Editing;
        self.translit.reset_all();
        for ch in word.chars() {
            self.preedit.insert(ch.to_string());
        }
        let mut resp = KeyResponse::consumed();
        resp.marked = Some(MarkedText { text: word, cursor: self.preedit.cursor(), compose_preview: false });
        Some(resp)
    }

    fn regenerate_candidates(&mut self, deps: &ControllerDeps, options: &ControllerOptions) {
        let _span = tracing::debug_span!("regenerate_candidates", preedit_len = self.preedit.len()).entered();
        if self.preedit.len() < options.min_char_complete {
            self.candidates = CandidateList::default();
            return;
        }
        let job = self.job_tracker.start_new();
        let views = self.preedit.views(&self.translit);
        let db = deps.user_db.read().unwrap_or_else(|e| e.into_inner());
        let mut candidate_options = options.candidate.clone();
        candidate_options.emoji_predictions = candidate_options.emoji_predictions || self.force_emoji;
        let mut list = candidates::generate(
            &views,
            &self.context1,
            &self.context2,
            &db,
            deps.dictionaries.as_ref(),
            deps.emoji_index.as_deref(),
            &candidate_options,
            self.page,
        );

        // §4.3 "Completion lookup": while a compose sequence is live, fill
        // any remaining page slots with its completions instead of leaving
        // them to ordinary candidate production, which has nothing to say
        // about a prefix that isn't committed text yet.
        if self.compose_state.is_active() {
            let remaining = candidate_options.page_size.saturating_sub(list.candidates.len());
            if remaining > 0 {
                let trie = deps.compose_trie();
                let hits = compose::completions(&self.compose_state, &trie, &|_| true);
                let appended = hits.into_iter().take(remaining).map(|hit| Candidate {
                    text: hit.result,
                    source: CandidateSource::ComposeCompletion,
                    score: 0.0,
                    annotation: None,
                    rank: 0,
                });
                let before = list.candidates.len();
                list.candidates.extend(appended);
                list.total += list.candidates.len() - before;
                for (idx, c) in list.candidates.iter_mut().enumerate() {
                    c.rank = idx;
                }
            }
        }

        if self.job_tracker.is_current(job) {
            tracing::debug!(count = list.candidates.len(), "candidates generated");
            self.candidates = list;
        } else {
            tracing::debug!("discarding stale candidate job");
        }
    }

    /// §4.1 `page_down`/`page_up`: shift the pagination window and
    /// regenerate against it. A no-op (not consumed) at either end.
    pub fn page_down(&mut self, deps: &ControllerDeps, options: &ControllerOptions) -> KeyResponse {
        self.shift_page(deps, options, 1)
    }

    pub fn page_up(&mut self, deps: &ControllerDeps, options: &ControllerOptions) -> KeyResponse {
        self.shift_page(deps, options, -1)
    }

    fn shift_page(&mut self, deps: &ControllerDeps, options: &ControllerOptions, delta: i32) -> KeyResponse {
        if self.state != State::Editing || self.candidates.total == 0 {
            return KeyResponse::not_consumed();
        }
        let page_size = options.candidate.page_size.max(1);
        let last_page = (self.candidates.total - 1) / page_size;
        let next_page = (self.page as i32 + delta).clamp(0, last_page as i32) as usize;
        if next_page == self.page {
            return KeyResponse::not_consumed();
        }
        self.page = next_page;
        self.regenerate_candidates(deps, options);
        let mut resp = KeyResponse::consumed();
        resp.candidates = self.candidate_action();
        resp
    }

    /// §4.1 `toggle_emoji`: session-level override, ORed with
    /// `emojipredictions` rather than replacing it.
    pub fn toggle_emoji(&mut self, deps: &ControllerDeps, options: &ControllerOptions) -> KeyResponse {
        self.force_emoji = !self.force_emoji;
        if self.state != State::Editing {
            return KeyResponse::consumed();
        }
        self.page = 0;
        self.regenerate_candidates(deps, options);
        let mut resp = KeyResponse::consumed();
        resp.candidates = self.candidate_action();
        resp
    }

    /// §4.1 `toggle_off_the_record`: session-level override, ORed at
    /// commit time with the config-level `offtherecord` default.
    pub fn toggle_off_the_record(&mut self) -> KeyResponse {
        self.off_the_record = !self.off_the_record;
        KeyResponse::consumed()
    }

    /// §4.1/§4.6 `lookup_related`: replace the live candidate list with
    /// emoji related to the currently selected candidate's code point.
    /// A no-op when there's no emoji index or no emoji-annotated selection.
    pub fn lookup_related(&mut self, deps: &ControllerDeps, _options: &ControllerOptions) -> KeyResponse {
        let Some(index) = deps.emoji_index.as_deref() else {
            return KeyResponse::not_consumed();
        };
        let code_point = self
            .candidates
            .selected
            .and_then(|i| self.candidates.candidates.get(i))
            .and_then(|c| match c.annotation {
                Some(Annotation::CodePoint(cp)) => Some(cp),
                _ => None,
            });
        let Some(code_point) = code_point else {
            return KeyResponse::not_consumed();
        };

        let matches = index.related(&[code_point]);
        let total = matches.len();
        let candidates: Vec<Candidate> = matches
            .into_iter()
            .enumerate()
            .map(|(rank, m)| {
                let entry = index.entry(m.entry_index);
                Candidate {
                    text: entry.text(),
                    source: CandidateSource::Related,
                    score: m.score,
                    annotation: entry.code_point_sequence.first().map(|cp| Annotation::CodePoint(*cp)),
                    rank,
                }
            })
            .collect();
        self.candidates = CandidateList { candidates, inline_suggestion: None, selected: None, total };
        self.page = 0;
        let mut resp = KeyResponse::consumed();
        resp.candidates = self.candidate_action();
        resp
    }

    /// §6 `inputmode`: toggling off commits whatever is in progress first,
    /// so typed-but-uncommitted text isn't silently dropped.
    pub fn toggle_input_mode(&mut self, deps: &ControllerDeps, options: &ControllerOptions) -> KeyResponse {
        let mut resp = if self.state == State::Editing {
            self.commit(deps, options)
        } else {
            KeyResponse::consumed()
        };
        self.input_mode_enabled = !self.input_mode_enabled;
        resp.consumed = true;
        resp
    }

    pub fn input_mode_enabled(&self) -> bool {
        self.input_mode_enabled
    }

    /// §4.1 `next_input_method`/`previous_input_method`: rotate which
    /// `TransliterationMethod` `Preedit::canonical` reads, and refresh the
    /// displayed preedit if one is in progress.
    pub fn next_input_method(&mut self) -> KeyResponse {
        self.translit.next_method();
        self.refresh_display_after_method_switch()
    }

    pub fn previous_input_method(&mut self) -> KeyResponse {
        self.translit.previous_method();
        self.refresh_display_after_method_switch()
    }

    fn refresh_display_after_method_switch(&mut self) -> KeyResponse {
        if self.state != State::Editing {
            return KeyResponse::consumed();
        }
        let mut resp = KeyResponse::consumed();
        resp.marked = Some(MarkedText {
            text: self.display_text(),
            cursor: self.preedit.cursor(),
            compose_preview: self.compose_state.is_active(),
        });
        resp
    }

    /// §4.1 shift-tap case-mode toggle (keymap-detected press/release
    /// pairing without an intervening press); flips whether subsequently
    /// typed keysyms are upper-cased, Caps-Lock style, until toggled again.
    pub fn toggle_case_mode(&mut self) -> KeyResponse {
        self.case_mode_upper = !self.case_mode_upper;
        KeyResponse::consumed()
    }

    fn candidate_action(&self) -> CandidateAction {
        if self.candidates.candidates.is_empty() {
            CandidateAction::Hide
        } else {
            CandidateAction::Show {
                candidates: self.candidates.candidates.clone(),
                selected: self.candidates.selected,
            }
        }
    }

    fn display_text(&self) -> String {
        let mut s = self.preedit.canonical(&self.translit);
        if self.compose_state.is_active() {
            s.push_str(&self.compose_state.prefix().join(""));
        }
        s
    }

    fn reset_to_empty(&mut self) {
        self.state = State::Empty;
        self.preedit.clear();
        self.compose_state.clear();
        self.translit.reset_all();
        self.candidates = CandidateList::default();
        self.page = 0;
    }
}

/// §4.8 "Auto-capitalize": promote the first character of a new session
/// following a sentence terminator in context.
fn ends_with_sentence_terminator(last_committed: &str) -> bool {
    matches!(last_committed.trim_end().chars().last(), Some('.') | Some('!') | Some('?'))
}

/// Case-mode toggle transform: upper-case single-character keysyms only.
/// Multi-character keysyms (`"dead_macron"`, `"space"`, ...) pass through
/// unchanged — they name a key, not a letter to shift.
fn uppercase_keysym(keysym: &str) -> String {
    if keysym.chars().count() == 1 {
        keysym.to_uppercase()
    } else {
        keysym.to_string()
    }
}

fn capitalize_first(raw: &str) -> Option<String> {
    let mut chars = raw.chars();
    let first = chars.next()?;
    let mut upper = first.to_uppercase().collect::<String>();
    if upper == first.to_string() {
        return None;
    }
    upper.extend(chars);
    Some(upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use preedit_core::config::RecordMode;
    use preedit_core::dict::WordList;
    use preedit_core::translit::MethodTable;
    use preedit_core::translit::TransliterationMethod;
    use preedit_core::userdb::UserDb;

    fn deps() -> ControllerDeps {
        ControllerDeps {
            user_db: Arc::new(RwLock::new(UserDb::new(100))),
            dictionaries: Arc::new(WordList::from_words(["camel".to_string(), "camera".to_string()])),
            emoji_index: None,
            compose_trie: Arc::new(RwLock::new(Arc::new(ComposeTrie::from_map(Default::default())))),
        }
    }

    fn options() -> ControllerOptions {
        ControllerOptions {
            candidate: CandidateOptions {
                page_size: 6,
                emoji_predictions: false,
                emoji_trigger_characters: "_".to_string(),
                inline_completion: false,
                inline_confidence_threshold: 500.0,
                auto_select_candidate: false,
            },
            auto_commit_characters: String::new(),
            auto_capitalize: false,
            arrow_keys_reopen_preedit: false,
            record_mode: RecordMode::Everything,
            min_char_complete: 1,
            off_the_record: false,
        }
    }

    fn no_ime_set() -> TransliterationSet {
        TransliterationSet::new(vec![TransliterationMethod::new("NoIME", MethodTable::identity())])
    }

    #[test]
    fn insert_raw_from_empty_starts_editing() {
        let mut controller = PreeditController::new(no_ime_set());
        let d = deps();
        let o = options();
        let resp = controller.insert_raw(&d, &o, "c");
        assert!(resp.consumed);
        assert!(controller.is_editing());
        assert_eq!(resp.marked.unwrap().text, "c");
    }

    #[test]
    fn backspace_to_empty_hides_candidates() {
        let mut controller = PreeditController::new(no_ime_set());
        let d = deps();
        let o = options();
        controller.insert_raw(&d, &o, "c");
        let resp = controller.backspace(&d, &o);
        assert!(!controller.is_editing());
        assert_eq!(resp.candidates, CandidateAction::Hide);
    }

    #[test]
    fn commit_shifts_context_and_queues_write() {
        let mut controller = PreeditController::new(no_ime_set());
        let d = deps();
        let o = options();
        for k in ["c", "a", "m", "e", "l"] {
            controller.insert_raw(&d, &o, k);
        }
        let resp = controller.commit(&d, &o);
        assert_eq!(resp.commit.as_deref(), Some("camel"));
        assert!(!controller.is_editing());
        let messages = controller.drain_writer_messages();
        assert_eq!(messages.len(), 1);
        assert!(matches!(&messages[0], WriterMessage::RecordCommit { phrase, .. } if phrase == "camel"));
    }

    #[test]
    fn cursor_left_at_token_zero_is_noop_without_reopen() {
        let mut controller = PreeditController::new(no_ime_set());
        let d = deps();
        let o = options();
        controller.insert_raw(&d, &o, "c");
        controller.cursor_left(&d, &o);
        let resp = controller.cursor_left(&d, &o);
        assert!(!resp.consumed);
    }

    #[test]
    fn auto_commit_character_commits_preedit_then_char_and_space() {
        let mut controller = PreeditController::new(no_ime_set());
        let d = deps();
        let mut o = options();
        o.auto_commit_characters = ".,".to_string();
        for k in ["h", "e", "l", "l", "o"] {
            controller.insert_raw(&d, &o, k);
        }
        let resp = controller.insert_raw(&d, &o, ".");
        assert_eq!(resp.commit.as_deref(), Some("hello. "));
    }

    #[test]
    fn off_the_record_suppresses_writer_message() {
        let mut controller = PreeditController::new(no_ime_set());
        controller.set_off_the_record(true);
        let d = deps();
        let o = options();
        for k in ["c", "a", "m"] {
            controller.insert_raw(&d, &o, k);
        }
        controller.commit(&d, &o);
        assert!(controller.drain_writer_messages().is_empty());
    }

    #[test]
    fn config_off_the_record_suppresses_writer_message_without_session_toggle() {
        let mut controller = PreeditController::new(no_ime_set());
        let d = deps();
        let mut o = options();
        o.off_the_record = true;
        for k in ["c", "a", "m"] {
            controller.insert_raw(&d, &o, k);
        }
        controller.commit(&d, &o);
        assert!(controller.drain_writer_messages().is_empty());
    }

    #[test]
    fn toggle_off_the_record_flips_session_override() {
        let mut controller = PreeditController::new(no_ime_set());
        controller.toggle_off_the_record();
        let d = deps();
        let o = options();
        for k in ["c", "a", "m"] {
            controller.insert_raw(&d, &o, k);
        }
        controller.commit(&d, &o);
        assert!(controller.drain_writer_messages().is_empty());
    }

    #[test]
    fn page_down_and_up_navigate_candidate_pages() {
        let mut controller = PreeditController::new(no_ime_set());
        let words: Vec<String> = (0..20).map(|i| format!("cam{i}")).collect();
        let d = ControllerDeps {
            user_db: Arc::new(RwLock::new(UserDb::new(100))),
            dictionaries: Arc::new(WordList::from_words(words)),
            emoji_index: None,
            compose_trie: Arc::new(RwLock::new(Arc::new(ComposeTrie::from_map(Default::default())))),
        };
        let mut o = options();
        o.candidate.page_size = 3;
        for k in ["c", "a", "m"] {
            controller.insert_raw(&d, &o, k);
        }
        let first_page: Vec<String> = controller.current_candidates().candidates.iter().map(|c| c.text.clone()).collect();

        let resp = controller.page_down(&d, &o);
        assert!(resp.consumed);
        let second_page: Vec<String> = controller.current_candidates().candidates.iter().map(|c| c.text.clone()).collect();
        assert_ne!(first_page, second_page);

        controller.page_up(&d, &o);
        let back_to_first: Vec<String> = controller.current_candidates().candidates.iter().map(|c| c.text.clone()).collect();
        assert_eq!(first_page, back_to_first);

        let at_start = controller.page_up(&d, &o);
        assert!(!at_start.consumed);
    }

    #[test]
    fn lookup_related_replaces_candidates_with_related_emoji() {
        use preedit_core::emoji::EmojiEntry;

        let camel = EmojiEntry {
            code_point_sequence: vec![0x1F42B],
            names_by_language: [("en".to_string(), "camel".to_string())].into_iter().collect(),
            keywords_by_language: [("en".to_string(), vec!["desert".to_string()])].into_iter().collect(),
            categories: vec!["animal".to_string()],
            unicode_version: "6.0".to_string(),
            fallback_names: vec![],
        };
        let dromedary = EmojiEntry {
            code_point_sequence: vec![0x1F42A],
            names_by_language: [("en".to_string(), "dromedary".to_string())].into_iter().collect(),
            keywords_by_language: [("en".to_string(), vec!["desert".to_string()])].into_iter().collect(),
            categories: vec!["animal".to_string()],
            unicode_version: "6.0".to_string(),
            fallback_names: vec![],
        };
        let index = Arc::new(EmojiIndex::build(vec![camel, dromedary]));

        let mut controller = PreeditController::new(no_ime_set());
        let d = ControllerDeps {
            user_db: Arc::new(RwLock::new(UserDb::new(100))),
            dictionaries: Arc::new(WordList::from_words(Vec::<String>::new())),
            emoji_index: Some(index),
            compose_trie: Arc::new(RwLock::new(Arc::new(ComposeTrie::from_map(Default::default())))),
        };
        let o = options();
        controller.candidates = CandidateList {
            candidates: vec![Candidate {
                text: "\u{1F42B}".to_string(),
                source: CandidateSource::Emoji,
                score: 1.0,
                annotation: Some(Annotation::CodePoint(0x1F42B)),
                rank: 0,
            }],
            inline_suggestion: None,
            selected: Some(0),
            total: 1,
        };

        let resp = controller.lookup_related(&d, &o);
        assert!(resp.consumed);
        assert_eq!(controller.current_candidates().candidates.len(), 1);
        assert_eq!(controller.current_candidates().candidates[0].text, "\u{1F42A}");
    }

    #[test]
    fn toggle_input_mode_commits_pending_text_then_forwards_raw() {
        let mut controller = PreeditController::new(no_ime_set());
        let d = deps();
        let o = options();
        for k in ["c", "a", "m"] {
            controller.insert_raw(&d, &o, k);
        }
        assert!(controller.input_mode_enabled());
        let resp = controller.toggle_input_mode(&d, &o);
        assert_eq!(resp.commit.as_deref(), Some("cam"));
        assert!(!controller.input_mode_enabled());
    }

    #[test]
    fn next_and_previous_input_method_rotate_display() {
        let set = TransliterationSet::new(vec![
            TransliterationMethod::new("NoIME", MethodTable::identity()),
            TransliterationMethod::new("Upper", MethodTable::identity()),
        ]);
        let mut controller = PreeditController::new(set);
        let d = deps();
        let o = options();
        controller.insert_raw(&d, &o, "c");
        assert_eq!(controller.translit.current_index(), 0);
        controller.next_input_method();
        assert_eq!(controller.translit.current_index(), 1);
        controller.previous_input_method();
        assert_eq!(controller.translit.current_index(), 0);
    }

    #[test]
    fn case_mode_toggle_uppercases_subsequent_letters() {
        let mut controller = PreeditController::new(no_ime_set());
        let d = deps();
        let o = options();
        controller.toggle_case_mode();
        let resp = controller.insert_raw(&d, &o, "c");
        assert_eq!(resp.marked.unwrap().text, "C");
        controller.toggle_case_mode();
        let resp = controller.insert_raw(&d, &o, "a");
        assert_eq!(resp.marked.unwrap().text, "Ca");
    }

    #[test]
    fn delete_forward_removes_char_after_cursor() {
        let mut controller = PreeditController::new(no_ime_set());
        let d = deps();
        let o = options();
        for k in ["c", "a", "m"] {
            controller.insert_raw(&d, &o, k);
        }
        controller.cursor_left(&d, &o);
        controller.cursor_left(&d, &o);
        controller.cursor_left(&d, &o);
        let resp = controller.delete(&d, &o);
        assert_eq!(resp.marked.unwrap().text, "am");
    }
}
