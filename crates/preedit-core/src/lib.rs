//! Pure text-engine logic for an interactive input method: key-event
//! handling, dead-key/transliteration composition, candidate production,
//! and the persistent learning store. Deliberately has no knowledge of any
//! host input-method framework — `preedit-session` wires this crate's
//! pieces into a stateful per-client engine and exposes the host-facing
//! surface described in spec.md §6.

pub mod candidates;
pub mod compose;
pub mod config;
pub mod dict;
pub mod emoji;
pub mod error;
pub mod keymap;
pub mod translit;
pub mod unicode;
pub mod userdb;

pub use candidates::{Candidate, CandidateList, CandidateOptions, Source as CandidateSource};
pub use compose::{ComposeState, ComposeTrie};
pub use config::Config;
pub use dict::{CompositeDictionary, Dictionary, WordList};
pub use emoji::{EmojiEntry, EmojiIndex};
pub use error::EngineError;
pub use keymap::{Command, KeyEvent, KeyMap, Modifiers};
pub use translit::{TransliterationMethod, TransliterationSet};
pub use userdb::{UserDb, UserDBEntry};
