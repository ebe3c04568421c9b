//! Abstract host input-method surface (spec.md §6), replacing the
//! teacher's direct Swift/IMKit FFI boundary with a plain trait any host
//! binding (IBus, IMKit, a test harness) can implement.

use preedit_core::Candidate;

/// A style run over a span of the preedit string, for hosts that render
/// compose previews differently from resolved text (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRun {
    pub start: usize,
    pub len: usize,
    pub is_compose_preview: bool,
}

/// Outbound calls the controller makes on the host (§6 outbound list).
/// Implementations are expected to be cheap/non-blocking for everything
/// except `commit_text`, which per §5 gets a hard timeout with no retry.
pub trait Host {
    fn commit_text(&mut self, text: &str);

    fn update_preedit(&mut self, text: &str, cursor: usize, visible: bool, style_runs: &[StyleRun]);

    fn update_candidates(&mut self, candidates: &[Candidate], cursor: usize, visible: bool);

    fn update_auxiliary(&mut self, text: &str, visible: bool);

    fn forward_key_event(&mut self, raw: &preedit_core::KeyEvent);

    fn delete_surrounding_text(&mut self, offset: i32, n_chars: usize);

    fn register_properties(&mut self, properties: &[&str]);
}

/// In-memory `Host` for tests: records every call instead of talking to a
/// real input-method framework.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub committed: Vec<String>,
    pub preedit_updates: Vec<(String, usize, bool)>,
    pub candidate_updates: Vec<(Vec<String>, usize, bool)>,
    pub auxiliary_updates: Vec<(String, bool)>,
    pub forwarded_keys: Vec<preedit_core::KeyEvent>,
    pub deletions: Vec<(i32, usize)>,
}

impl Host for RecordingHost {
    fn commit_text(&mut self, text: &str) {
        self.committed.push(text.to_string());
    }

    fn update_preedit(&mut self, text: &str, cursor: usize, visible: bool, _style_runs: &[StyleRun]) {
        self.preedit_updates.push((text.to_string(), cursor, visible));
    }

    fn update_candidates(&mut self, candidates: &[Candidate], cursor: usize, visible: bool) {
        let texts = candidates.iter().map(|c| c.text.clone()).collect();
        self.candidate_updates.push((texts, cursor, visible));
    }

    fn update_auxiliary(&mut self, text: &str, visible: bool) {
        self.auxiliary_updates.push((text.to_string(), visible));
    }

    fn forward_key_event(&mut self, raw: &preedit_core::KeyEvent) {
        self.forwarded_keys.push(raw.clone());
    }

    fn delete_surrounding_text(&mut self, offset: i32, n_chars: usize) {
        self.deletions.push((offset, n_chars));
    }

    fn register_properties(&mut self, _properties: &[&str]) {}
}
