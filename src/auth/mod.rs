//! User accounts, directory rules and permission resolution.
//!
//! A [`User`] owns an ordered list of [`DirRule`]s that map client-visible
//! paths onto real filesystem paths and attach a permission/rate overlay to
//! them. [`User::resolve`] is the Path Resolver from the design: it walks
//! the rule list in order and applies every matching rule, later rules
//! overwriting the attributes of earlier ones, following
//! `slftpd/config.py`'s `FTPUser.apply_rules`.

mod user;

pub use user::{DirRule, DirRuleAttrs, Permission, ResolvedPath, User, UserTable};
