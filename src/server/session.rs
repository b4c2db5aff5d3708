//! Per-connection session state (spec.md §3), following the teacher
//! crate's `server/session.rs` `Session` struct, trimmed to the fields this
//! crate's sequential (one-command-at-a-time, no ABOR) control loop
//! actually needs.

use std::path::PathBuf;

use crate::auth::{ResolvedPath, User};

use super::datachan::Transporter;

/// The FTP transfer type (`TYPE` command). Only binary and ASCII are
/// supported (spec.md §3); `mode` is always Stream and `stru` always File,
/// so neither needs a session field beyond the constants spec.md names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Binary,
    Ascii,
}

/// A MLST/MLSD fact, following spec.md §4.6's selectable set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fact {
    Type,
    Size,
    Modify,
    Perm,
}

impl Fact {
    pub fn all() -> Vec<Fact> {
        vec![Fact::Type, Fact::Size, Fact::Modify, Fact::Perm]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Fact::Type => "Type",
            Fact::Size => "Size",
            Fact::Modify => "Modify",
            Fact::Perm => "Perm",
        }
    }

    /// Parses a single fact name, case-insensitively, ignoring unknown
    /// facts, following `ftpd.py`'s `set_mlst_facts`.
    pub fn parse(name: &str) -> Option<Fact> {
        match name.to_ascii_lowercase().as_str() {
            "type" => Some(Fact::Type),
            "size" => Some(Fact::Size),
            "modify" => Some(Fact::Modify),
            "perm" => Some(Fact::Perm),
            _ => None,
        }
    }
}

/// Per-connection state (spec.md §3). Lives for the lifetime of one
/// control connection and is owned exclusively by that connection's task —
/// this crate processes one command at a time (spec.md §5), so unlike the
/// teacher crate's `Arc<Mutex<Session>>` (shared with a concurrent data
/// task), no interior mutability or cross-task sharing is needed here.
pub struct Session {
    pub user: Option<User>,
    pub username: Option<String>,
    pub directory: String,
    pub context: Option<ResolvedPath>,
    pub transfer_type: TransferType,
    pub rest_offset: Option<u64>,
    pub pending_rename_from: Option<PathBuf>,
    pub mlst_facts: Vec<Fact>,
    /// Tracks `OPTS UTF8 ON|OFF` for protocol compatibility. Both states
    /// decode incoming bytes as UTF-8 (SPEC_FULL.md §6's resolution of the
    /// "non-UTF8 default encoding" Open Question) — this flag only changes
    /// what the session reports, not how it decodes.
    pub utf8_explicit: bool,
    pub transporter: Option<Transporter>,
    pub connection_id: u32,
}

impl Session {
    pub fn new(connection_id: u32) -> Self {
        Session {
            user: None,
            username: None,
            directory: "/".to_string(),
            context: None,
            transfer_type: TransferType::Binary,
            rest_offset: None,
            pending_rename_from: None,
            mlst_facts: Fact::all(),
            utf8_explicit: false,
            transporter: None,
            connection_id,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Resolves `arg` against the current directory through the logged-in
    /// user's rules and caches the result as `context` (spec.md §3/§4.3).
    /// Panics if called before login; callers always gate on
    /// `is_authenticated` first via the dispatcher's pre-login check.
    pub fn resolve(&mut self, arg: &str) -> ResolvedPath {
        let user = self.user.as_ref().expect("resolve called before login");
        let resolved = user.resolve(&self.directory, arg);
        self.context = Some(resolved.clone());
        resolved
    }

    /// Clears per-command carryover state. Called after dispatching any
    /// command other than REST/RNFR whose return value needs to survive to
    /// the next command (spec.md §3: "cleared after each transfer or after
    /// any command other than RETR/STOR", "cleared after RNTO").
    pub fn clear_rest_offset(&mut self) {
        self.rest_offset = None;
    }

    pub fn clear_pending_rename(&mut self) {
        self.pending_rename_from = None;
    }

    /// Discards any previous Transporter (releasing its resources) and
    /// installs a new one, enforcing the "at most one Transporter per
    /// Session" invariant (spec.md §3).
    pub fn set_transporter(&mut self, transporter: Transporter) {
        self.transporter = Some(transporter);
    }
}
