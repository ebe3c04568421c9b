//! Candidate-job cancellation and the UserDB writer queue (spec.md §5).
//!
//! The event loop itself stays single-threaded and cooperative; this
//! module only models the *bookkeeping* a real host loop needs to run the
//! two auxiliary workers described in §5 (candidate producer, UserDB
//! writer) without the controller ever blocking on them. It intentionally
//! does not spawn threads — a host binding wires `JobTracker`/`WriterQueue`
//! to its own executor (tokio, a platform run loop, a test harness).

use std::collections::VecDeque;
use std::time::Duration;

/// Default candidate debounce delay (§4.7, §6 `candidatesdelaymilliseconds`).
pub const DEFAULT_CANDIDATE_DELAY: Duration = Duration::from_millis(200);

/// Monotonically increasing candidate-job id. A new key event bumps this,
/// which invalidates any outstanding job without needing to signal its
/// thread (§5: "the job's thread still finishes but its result is
/// dropped").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

/// Tracks the latest issued candidate job id, so results tagged with a
/// stale id can be discarded (§5 cancellation invariant, §8 "the candidate
/// list reflects the K2 state or a later state, never K1's alone").
#[derive(Debug, Default)]
pub struct JobTracker {
    latest: u64,
}

impl JobTracker {
    pub fn new() -> Self {
        JobTracker { latest: 0 }
    }

    /// Start a new job, replacing (not queuing behind) any in-flight one —
    /// §5: "the candidate debounce timer replaces the job id rather than
    /// actually waiting if a new key arrives."
    pub fn start_new(&mut self) -> JobId {
        self.latest += 1;
        JobId(self.latest)
    }

    /// Whether a result tagged `id` is still the most recent job, i.e.
    /// should be applied rather than discarded.
    pub fn is_current(&self, id: JobId) -> bool {
        id.0 == self.latest
    }

    pub fn current(&self) -> JobId {
        JobId(self.latest)
    }
}

/// A pending UserDB write, queued so the event loop never waits on the
/// single writer worker (§5 "Commits push messages into its queue; the
/// event loop does not wait").
#[derive(Debug, Clone, PartialEq)]
pub enum WriterMessage {
    RecordCommit { phrase: String, context1: String, context2: String },
    Forget { phrase: String, context1: String, context2: String },
    DecayPass,
}

/// FIFO queue of pending writer messages. A real host drains this on a
/// dedicated worker thread/task; tests can drain it synchronously.
#[derive(Debug, Default)]
pub struct WriterQueue {
    pending: VecDeque<WriterMessage>,
}

impl WriterQueue {
    pub fn new() -> Self {
        WriterQueue { pending: VecDeque::new() }
    }

    pub fn push(&mut self, message: WriterMessage) {
        self.pending.push_back(message);
    }

    pub fn drain(&mut self) -> Vec<WriterMessage> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
