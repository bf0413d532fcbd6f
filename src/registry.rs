//! Logger definitions, runtime state, and the registry that owns them.

use std::fmt;

/// Maximum length, in bytes, of a logger name.
pub const MAX_NAME_LEN: usize = 31;
/// Maximum length, in bytes, of a destination filename.
pub const MAX_FILENAME_LEN: usize = 63;
/// Maximum length, in bytes, of a format template.
pub const MAX_FORMAT_LEN: usize = 127;
/// Maximum length, in bytes, of a single message body.
pub const MAX_MESSAGE_LEN: usize = 2048;

/// Severity levels, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Trace => "trace",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "trace" => Some(Severity::Trace),
            "debug" => Some(Severity::Debug),
            "info" => Some(Severity::Info),
            "warn" => Some(Severity::Warn),
            _ => None,
        }
    }

    /// Maps the wire-protocol integer encoding (§6) to a severity level.
    /// Returns `None` for any value outside `0..=3`.
    pub fn from_wire(level: i32) -> Option<Self> {
        match level {
            0 => Some(Severity::Trace),
            1 => Some(Severity::Debug),
            2 => Some(Severity::Info),
            3 => Some(Severity::Warn),
            _ => None,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            Severity::Trace => 0,
            Severity::Debug => 1,
            Severity::Info => 2,
            Severity::Warn => 3,
        }
    }
}

/// Where a logger's rendered lines are sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    File,
    Stdout,
    Stderr,
}

impl Destination {
    pub fn as_str(self) -> &'static str {
        match self {
            Destination::File => "file",
            Destination::Stdout => "stdout",
            Destination::Stderr => "stderr",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "file" => Some(Destination::File),
            "stdout" => Some(Destination::Stdout),
            "stderr" => Some(Destination::Stderr),
            _ => None,
        }
    }
}

/// An immutable logger definition, as produced by the config parser.
///
/// Once parsed, a definition never changes; only the associated
/// [`LoggerState`] is mutated by request handlers.
#[derive(Clone, Debug)]
pub struct LoggerDef {
    pub name: String,
    pub destination: Destination,
    pub default_severity: Severity,
    pub filename: Option<String>,
    /// Meaningful only when `destination == File`. Defaults to `false`
    /// when the config omits the option — see SPEC_FULL.md §12.1.
    pub append: bool,
    pub format: String,
}

/// Opaque identifier of a client process in the transport's address space.
///
/// Stands in for the microkernel IPC endpoint identifier; see
/// SPEC_FULL.md §10.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint(pub i32);

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mutable per-logger runtime state.
///
/// `opened_by` is a back-reference to a client identity, not an owning
/// reference: if the client process disappears uncleanly, the logger
/// stays "open" until someone explicitly closes it. This is a known,
/// documented limitation (SPEC_FULL.md §9), not an oversight.
#[derive(Debug)]
pub struct LoggerState {
    pub is_open: bool,
    pub current_severity: Severity,
    pub opened_by: Option<Endpoint>,
    pub fd: Option<std::fs::File>,
}

impl LoggerState {
    fn new(default_severity: Severity) -> Self {
        LoggerState {
            is_open: false,
            current_severity: default_severity,
            opened_by: None,
            fd: None,
        }
    }
}

/// One registered logger: its immutable definition plus its mutable state.
pub struct Entry {
    pub def: LoggerDef,
    pub state: LoggerState,
}

/// The ordered collection of loggers built by the config parser.
///
/// Insertion order matches declaration order in the config file and is
/// preserved for the lifetime of the registry — `clear_all` depends on
/// stable iteration order. Lookups are linear, which is acceptable given
/// the expected cardinality (tens of loggers, not thousands).
#[derive(Default)]
pub struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Registry { entries: Vec::new() }
    }

    /// Builds a registry from parsed definitions. Names must already be
    /// known-unique; duplicate names are a parser-level concern (not
    /// currently rejected here, since the distilled spec does not call
    /// out duplicate-name detection as a parser responsibility beyond
    /// "keyed by name (unique)" — the last definition for a given name
    /// wins if the config ever violates uniqueness).
    pub fn from_defs(defs: Vec<LoggerDef>) -> Self {
        let mut entries = Vec::with_capacity(defs.len());
        for def in defs {
            let state = LoggerState::new(def.default_severity);
            entries.push(Entry { def, state });
        }
        Registry { entries }
    }

    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.def.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.def.name == name)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
