use std::collections::HashMap;
use std::path::{Path, PathBuf};

use bitflags::bitflags;

bitflags! {
    /// Per-path permission letters, following `slftpd/ftpd.py`'s
    /// `permission_file = set('rwadf')` and `permission_dir = set('eldfm')`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permission: u8 {
        /// `e` — enter (CWD into) the directory.
        const ENTER    = 0b0000_0001;
        /// `l` — list the directory (LIST/MLSD/NLST).
        const LIST     = 0b0000_0010;
        /// `r` — retrieve (RETR) a file.
        const RETRIEVE = 0b0000_0100;
        /// `w` — store (STOR) a file.
        const WRITE    = 0b0000_1000;
        /// `a` — append (APPE) to a file.
        const APPEND   = 0b0001_0000;
        /// `d` — delete a file or directory (DELE/RMD).
        const DELETE   = 0b0010_0000;
        /// `f` — rename a file or directory (RNFR/RNTO).
        const RENAME   = 0b0100_0000;
        /// `m` — create a directory (MKD).
        const MAKE_DIR = 0b1000_0000;
    }
}

impl Permission {
    /// Parses a permission-letter string such as `"elr"`, ignoring any
    /// character not in the known letter set.
    pub fn parse(letters: &str) -> Self {
        let mut perm = Permission::empty();
        for ch in letters.chars() {
            perm |= match ch {
                'e' => Permission::ENTER,
                'l' => Permission::LIST,
                'r' => Permission::RETRIEVE,
                'w' => Permission::WRITE,
                'a' => Permission::APPEND,
                'd' => Permission::DELETE,
                'f' => Permission::RENAME,
                'm' => Permission::MAKE_DIR,
                _ => Permission::empty(),
            };
        }
        perm
    }
}

/// The resolved, concrete `(permission, max_down, max_up)` triple that
/// applies at a given path, following `slftpd/config.py`'s
/// `Config.default_attrs`.
///
/// `max_down`/`max_up` are bytes-per-second caps; `0` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirRuleAttrs {
    pub permission: Permission,
    pub max_down: u64,
    pub max_up: u64,
}

impl DirRuleAttrs {
    /// The attrs seeded into a new user's implicit root rule
    /// (`'/'` → home) when none are given explicitly: enter, list and
    /// retrieve, no rate caps.
    pub fn default_root() -> Self {
        DirRuleAttrs {
            permission: Permission::ENTER | Permission::LIST | Permission::RETRIEVE,
            max_down: 0,
            max_up: 0,
        }
    }
}

/// Maps a client-visible path prefix onto a real filesystem directory,
/// with an optional permission/rate overlay.
///
/// `src` always ends in `/` and is matched as a literal prefix against the
/// client-visible path (not path-component-aware) — this mirrors
/// `DirRule.__init__` in `slftpd/config.py`, trailing slash included.
#[derive(Debug, Clone)]
pub struct DirRule {
    pub(crate) src: String,
    pub(crate) dest: PathBuf,
    pub(crate) permission: Option<Permission>,
    pub(crate) max_down: Option<u64>,
    pub(crate) max_up: Option<u64>,
}

impl DirRule {
    /// Creates a rule with no attribute overrides of its own; it inherits
    /// whatever an earlier matching rule set.
    pub fn new(src: impl Into<String>, dest: impl Into<PathBuf>) -> Self {
        let mut src = src.into();
        if !src.ends_with('/') {
            src.push('/');
        }
        DirRule {
            src,
            dest: dest.into(),
            permission: None,
            max_down: None,
            max_up: None,
        }
    }

    pub fn with_permission(mut self, letters: &str) -> Self {
        self.permission = Some(Permission::parse(letters));
        self
    }

    pub fn with_max_down(mut self, bytes_per_sec: u64) -> Self {
        self.max_down = Some(bytes_per_sec);
        self
    }

    pub fn with_max_up(mut self, bytes_per_sec: u64) -> Self {
        self.max_up = Some(bytes_per_sec);
        self
    }

    fn matches(&self, path: &str) -> bool {
        path.starts_with(self.src.as_str())
    }
}

/// The outcome of resolving a client-visible path through a user's rule
/// list: the normalized client path, the real filesystem path, and the
/// attrs in effect there.
#[derive(Debug, Clone)]
pub struct ResolvedPath {
    pub path: String,
    pub realpath: PathBuf,
    pub attrs: DirRuleAttrs,
}

/// An FTP account: credentials, home directory, an ordered rule list and a
/// per-user connection ceiling, following `slftpd/config.py`'s `FTPUser`.
#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
    /// `None` means any password (or none) is accepted — used for the
    /// anonymous account, following `ftpd.py`'s `ftp_PASS`.
    pub password: Option<String>,
    pub home: PathBuf,
    pub(crate) rules: Vec<DirRule>,
    pub max_connection: u32,
    /// Extra text appended to the `331` reply on `USER`, following
    /// `config.py`'s `add_anonymous_user` default message.
    pub loginmsg: Option<String>,
}

impl User {
    pub fn new(name: impl Into<String>, home: impl Into<PathBuf>, default_attrs: DirRuleAttrs, max_connection: u32) -> Self {
        let home = home.into();
        let mut root_rule = DirRule::new("/", home.clone());
        root_rule.permission = Some(default_attrs.permission);
        root_rule.max_down = Some(default_attrs.max_down);
        root_rule.max_up = Some(default_attrs.max_up);
        User {
            name: name.into(),
            password: None,
            home,
            rules: vec![root_rule],
            max_connection,
            loginmsg: None,
        }
    }

    /// Convenience constructor for the common anonymous account: blank
    /// password, a greeting matching `ftpd.py`'s default, single
    /// connection.
    pub fn anonymous(home: impl Into<PathBuf>) -> Self {
        let mut user = User::new("anonymous", home, DirRuleAttrs::default_root(), 1);
        user.loginmsg = Some("User ANONYMOUS okay, use email as password.".to_string());
        user
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_max_connection(mut self, max: u32) -> Self {
        self.max_connection = max;
        self
    }

    pub fn with_loginmsg(mut self, msg: impl Into<String>) -> Self {
        self.loginmsg = Some(msg.into());
        self
    }

    /// Appends a rule to the user's ordered list; later rules take
    /// precedence over earlier ones wherever both match.
    pub fn add_rule(&mut self, rule: DirRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// `true` if `given` is an acceptable password for this account. A
    /// `None` account password accepts anything, including no password at
    /// all.
    pub fn check_password(&self, given: Option<&str>) -> bool {
        match &self.password {
            None => true,
            Some(expected) => given == Some(expected.as_str()),
        }
    }

    /// Resolves a client-supplied path argument against the current
    /// session directory into a real filesystem path and the attrs in
    /// effect there.
    ///
    /// `arg` may be relative to `cwd` or absolute (leading `/`). The
    /// result never escapes above the virtual root `/`: every `..`
    /// component is collapsed, and any that would climb above `/` is
    /// simply absorbed, following `ftpd.py`'s `access()`
    /// (`normpath` + stripping leading `../`).
    pub fn resolve(&self, cwd: &str, arg: &str) -> ResolvedPath {
        let joined = if arg.starts_with('/') {
            arg.to_string()
        } else {
            format!("{}/{}", cwd.trim_end_matches('/'), arg)
        };
        let path = normalize(&joined);

        let mut attrs = DirRuleAttrs {
            permission: Permission::empty(),
            max_down: 0,
            max_up: 0,
        };
        let mut realpath = self.home.clone();
        for rule in &self.rules {
            if rule.matches(&path) {
                let relative = path.strip_prefix(rule.src.trim_end_matches('/')).unwrap_or(&path).trim_start_matches('/');
                realpath = if relative.is_empty() { rule.dest.clone() } else { rule.dest.join(relative) };
                if let Some(p) = rule.permission {
                    attrs.permission = p;
                }
                if let Some(d) = rule.max_down {
                    attrs.max_down = d;
                }
                if let Some(u) = rule.max_up {
                    attrs.max_up = u;
                }
            }
        }

        ResolvedPath { path, realpath, attrs }
    }
}

/// Normalizes a `/`-separated absolute path: collapses `.` and empty
/// components, and pops a path segment for every `..`, clamping at the
/// root rather than erroring — the Rust equivalent of `os.path.normpath`
/// plus `while path.startswith('../'): path = path[3:]` in `ftpd.py`.
fn normalize(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    format!("/{}", stack.join("/"))
}

/// A user table keyed by case-folded account name, following `ftpd.py`'s
/// `ftp_USER` lowercasing the supplied username before lookup.
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    users: HashMap<String, User>,
}

impl UserTable {
    pub fn insert(&mut self, user: User) {
        let key = user.name.to_lowercase();
        self.users.insert(key, user);
    }

    pub fn get(&self, name: &str) -> Option<&User> {
        self.users.get(&name.to_lowercase())
    }
}
