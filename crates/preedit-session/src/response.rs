//! Response types returned from key handling, grounded directly on the
//! teacher's `KeyResponse`/`CandidateAction`/`SideEffects` (same shapes,
//! renamed to the spec's outbound surface, §6).

use preedit_core::Candidate;

/// Marked (preedit) text plus the style hint the host should render it
/// with (§6 `update_preedit(str, cursor, visible, style_runs)`).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedText {
    pub text: String,
    pub cursor: usize,
    /// Distinguishes a resolved preedit span from a live compose preview
    /// (§4.3: "the UI renders a distinguishable preview of the partial
    /// sequence").
    pub compose_preview: bool,
}

/// Candidate panel action — exactly one of three states, so "show and
/// hide at once" is unrepresentable (same rationale as the teacher's
/// `CandidateAction`).
#[derive(Debug, Clone, PartialEq)]
pub enum CandidateAction {
    Keep,
    Show { candidates: Vec<Candidate>, selected: Option<usize> },
    Hide,
}

impl Default for CandidateAction {
    fn default() -> Self {
        CandidateAction::Keep
    }
}

/// Side effects accompanying a response that the event loop must act on
/// outside the direct host call (§5: UserDB writes and candidate jobs are
/// message-passed, not awaited inline).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideEffects {
    pub record_commit: Option<RecordCommit>,
    pub request_candidates: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordCommit {
    pub phrase: String,
    pub context1: String,
    pub context2: String,
}

/// Response from `Controller::handle_command`, returned to the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyResponse {
    pub consumed: bool,
    pub commit: Option<String>,
    pub marked: Option<MarkedText>,
    pub candidates: CandidateAction,
    pub side_effects: SideEffects,
}

impl KeyResponse {
    pub fn not_consumed() -> Self {
        KeyResponse::default()
    }

    pub fn consumed() -> Self {
        KeyResponse { consumed: true, ..Default::default() }
    }
}
