//! Declarative option schema.
//!
//! Per the redesign note on reflection over configuration keys: rather than
//! a setup tool iterating the `Config` struct via runtime introspection, the
//! recognized options are a `const` table built at compile time. Anything
//! that wants to enumerate/validate options (a setup UI, this crate's own
//! parser, `preedit-cli`) walks `SCHEMA` instead of reflecting on `Config`.

/// The shape of an option's value, for a setup tool to render the right
/// widget and for generic range/enum validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Bool,
    IntRange(i64, i64),
    Str,
    StrList { max_len: usize },
    Enum(&'static [&'static str]),
    Mapping,
}

pub struct OptionSpec {
    pub key: &'static str,
    pub kind: OptionKind,
    pub default: &'static str,
    pub description: &'static str,
}

macro_rules! opt {
    ($key:literal, $kind:expr, $default:literal, $desc:literal) => {
        OptionSpec {
            key: $key,
            kind: $kind,
            default: $default,
            description: $desc,
        }
    };
}

/// Every option recognized by the engine (spec.md §6). Appearance/color/
/// label keys are forwarded to the host opaquely and are not individually
/// schema'd here; they live in `Config::appearance`.
pub const SCHEMA: &[OptionSpec] = &[
    opt!("inputmethod", OptionKind::StrList { max_len: 10 }, "", "transliteration methods, comma-separated, empty means NoIME"),
    opt!("dictionary", OptionKind::StrList { max_len: 10 }, "", "dictionary locales, comma-separated"),
    opt!("emojipredictions", OptionKind::Bool, "false", "include emoji/symbol candidates"),
    opt!("emojitriggercharacters", OptionKind::Str, "_", "characters that force emoji lookup"),
    opt!("unicodedataall", OptionKind::Bool, "false", "include the full Unicode name database, not just emoji"),
    opt!("mincharcomplete", OptionKind::IntRange(1, 9), "1", "minimum prefix length before completions are produced"),
    opt!("pagesize", OptionKind::IntRange(1, 9), "6", "candidates per page"),
    opt!("inlinecompletion", OptionKind::Enum(&["off", "on"]), "off", "show a single inline completion instead of a list"),
    opt!("autoselectcandidate", OptionKind::Enum(&["off", "on"]), "off", "auto-select the first candidate"),
    opt!("autocommitcharacters", OptionKind::Str, "", "characters that auto-commit the preedit"),
    opt!("tabenable", OptionKind::Bool, "false", "enable Tab as a lookup/select trigger"),
    opt!("arrowkeysreopenpreedit", OptionKind::Bool, "false", "allow arrow keys to reopen a committed word"),
    opt!("disableinterminals", OptionKind::Bool, "false", "disable the engine in terminal clients"),
    opt!("offtherecord", OptionKind::Bool, "false", "disable writes to the learning store"),
    opt!("recordmode", OptionKind::Enum(&["everything", "correct_or_previously_recorded", "correct", "nothing"]), "correct_or_previously_recorded", "what gets written to the learning store"),
    opt!("inputmode", OptionKind::Bool, "true", "whether input-method switching is enabled"),
    opt!("rememberinputmode", OptionKind::Bool, "true", "remember the last-used input method across sessions"),
    opt!("rememberlastusedpreeditime", OptionKind::Bool, "true", "remember the last-used transliteration per client"),
    opt!("candidatesdelaymilliseconds", OptionKind::IntRange(0, 5000), "200", "debounce delay before candidate production"),
    opt!("debuglevel", OptionKind::IntRange(0, 9), "0", "debug log verbosity"),
    opt!("keybindings", OptionKind::Mapping, "", "command to key-combination list mapping"),
    opt!("autosettings", OptionKind::Mapping, "", "[option, value, regex] triples matched against the client id"),
];

pub fn find(key: &str) -> Option<&'static OptionSpec> {
    SCHEMA.iter().find(|s| s.key == key)
}
