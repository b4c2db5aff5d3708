//! Server-wide configuration.
//!
//! This crate never parses configuration files or environment variables —
//! that belongs to the embedding application. `Config` is a plain struct
//! with sensible defaults plus a small, chainable builder, in the style of
//! the teacher crate's `server/ftpserver/options.rs`.

use std::ops::Range;
use std::time::Duration;

use crate::auth::{DirRuleAttrs, User, UserTable};

pub(crate) const DEFAULT_BUF_SIZE: usize = 0x1000;
pub(crate) const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(120);
pub(crate) const DEFAULT_DATA_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_MAX_CONNECTION: u32 = 200;
pub(crate) const DEFAULT_MAX_USER_CONNECTION: u32 = 1;
pub(crate) const DEFAULT_PASSIVE_PORTS: Range<u16> = 8030..8040;
pub(crate) const DEFAULT_GREETING: &str = "Welcome.";
pub(crate) const DEFAULT_SERVER_NAME: &str = "miniftpd";

/// The feature set advertised by `FEAT` (RFC 2389) and used to seed a new
/// session's `OPTS MLST` fact set, following `slftpd/ftpd.py`'s
/// `get_feat_handlers` — `UTF8` and `REST STREAM` are unconditional, the
/// `MLST` line names every fact this crate can produce (spec.md §4.6).
fn default_features() -> Vec<String> {
    vec!["UTF8".to_string(), "REST STREAM".to_string(), "MLST Type*;Size*;Modify*;Perm*;".to_string()]
}

/// Server-wide tunables and the user table.
///
/// Constructed already-validated by the embedder (spec.md calls this the
/// "configuration collaborator"); `Config` itself performs no file or
/// environment parsing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Size in bytes of the read buffer used when pulling data from a client
    /// (STOR/APPE).
    pub buf_in: usize,
    /// Size in bytes of the chunk used when pushing data to a client
    /// (RETR/LIST/MLSD).
    pub buf_out: usize,
    /// How long a session may sit idle on the control channel before it is
    /// closed with `421`.
    pub control_timeout: Duration,
    /// How long the data channel coordinator waits for an incoming passive
    /// connection, or an active connect, before giving up with `421`.
    pub data_timeout: Duration,
    /// Server-wide ceiling on concurrent control connections.
    pub max_connection: u32,
    /// Server-wide default per-IP connection ceiling, used for admission
    /// decisions made before a session has authenticated.
    pub max_user_connection: u32,
    /// The inclusive-exclusive range of TCP ports available for PASV leases.
    pub passive_ports: Range<u16>,
    /// Default `(permission, max_down, max_up)` seeded into a new user's
    /// implicit root rule when the user is constructed without explicit
    /// attributes.
    pub default_attrs: DirRuleAttrs,
    /// Text sent in the `220` banner on connect.
    pub greeting: String,
    /// The `<server-name>` token in the `SYST` reply
    /// (`215 UNIX <platform> <server-name>`, spec.md §4.7).
    pub server_name: String,
    /// Feature names advertised by `FEAT` (spec.md §4.7), one per line.
    pub features: Vec<String>,
    users: UserTable,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            buf_in: DEFAULT_BUF_SIZE,
            buf_out: DEFAULT_BUF_SIZE,
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
            data_timeout: DEFAULT_DATA_TIMEOUT,
            max_connection: DEFAULT_MAX_CONNECTION,
            max_user_connection: DEFAULT_MAX_USER_CONNECTION,
            passive_ports: DEFAULT_PASSIVE_PORTS,
            default_attrs: DirRuleAttrs::default_root(),
            greeting: DEFAULT_GREETING.to_string(),
            server_name: DEFAULT_SERVER_NAME.to_string(),
            features: default_features(),
            users: UserTable::default(),
        }
    }
}

impl Config {
    /// Registers a user, keyed by the case-folded form of its name.
    pub fn add_user(&mut self, user: User) -> &mut Self {
        self.users.insert(user);
        self
    }

    /// Looks up a registered user by name (case-insensitive).
    pub fn user(&self, name: &str) -> Option<&User> {
        self.users.get(name)
    }

    pub fn with_passive_ports(mut self, ports: Range<u16>) -> Self {
        self.passive_ports = ports;
        self
    }

    pub fn with_max_connection(mut self, max: u32) -> Self {
        self.max_connection = max;
        self
    }

    pub fn with_max_user_connection(mut self, max: u32) -> Self {
        self.max_user_connection = max;
        self
    }

    pub fn with_control_timeout(mut self, timeout: Duration) -> Self {
        self.control_timeout = timeout;
        self
    }

    pub fn with_data_timeout(mut self, timeout: Duration) -> Self {
        self.data_timeout = timeout;
        self
    }

    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.greeting = greeting.into();
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }
}
