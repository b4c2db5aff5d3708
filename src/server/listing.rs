//! The Listing Formatter (spec.md §4.6): Unix-`ls`-style `LIST` lines and
//! RFC 3659 `MLST`/`MLSD` fact lines, following `ftpd.py`'s `list_dir` and
//! `get_mlst_handlers`/`get_info`.

use chrono::{DateTime, Datelike, Utc};

use crate::auth::Permission;
use crate::storage::{DirEntry, Metadata};

use super::session::Fact;

/// What an entry represents in a `MLST`/`MLSD` listing, following spec.md
/// §4.6's `Type` fact values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
    /// The directory being listed itself (MLSD only).
    Cdir,
    /// Its parent (MLSD only, omitted if parent equals the listed path).
    Pdir,
}

impl EntryKind {
    fn type_value(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Dir => "dir",
            EntryKind::Cdir => "cdir",
            EntryKind::Pdir => "pdir",
        }
    }

    fn is_dir(&self) -> bool {
        !matches!(self, EntryKind::File)
    }
}

/// Renders the 10-character `drwxrwxrwx`-style mode string from raw Unix
/// permission bits.
fn mode_string(mode: u32, is_dir: bool) -> String {
    const BITS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    let mut s = String::with_capacity(10);
    s.push(if is_dir { 'd' } else { '-' });
    for (bit, ch) in BITS {
        s.push(if mode & bit != 0 { ch } else { '-' });
    }
    s
}

/// `"%b %d %H:%M"` if `modified`'s year equals `now`'s, else `"%b %d %Y"`,
/// following `ftpd.py`'s `time_string`.
fn time_string(modified: DateTime<Utc>, now: DateTime<Utc>) -> String {
    if modified.year() == now.year() {
        modified.format("%b %d %H:%M").to_string()
    } else {
        modified.format("%b %d %Y").to_string()
    }
}

/// Formats one `LIST` line: `"<mode> 1 user group <size> <time> <name>\n"`.
pub fn format_list_line(name: &str, metadata: &Metadata, now: DateTime<Utc>) -> String {
    let mode = mode_string(metadata.mode, metadata.is_dir);
    let modified: DateTime<Utc> = metadata.modified.into();
    format!(
        "{} 1 user group {:>13} {} {}\n",
        mode,
        metadata.len,
        time_string(modified, now),
        name
    )
}

/// Sorts directory-listing entries so directories sort before regular
/// files, preserving iteration order within each group (spec.md §4.6).
pub fn ordered_for_list(mut entries: Vec<DirEntry>) -> Vec<DirEntry> {
    entries.sort_by_key(|e| !e.metadata.is_dir);
    entries
}

/// Renders the full `LIST` payload for a directory's entries.
pub fn render_list(entries: Vec<DirEntry>, now: DateTime<Utc>) -> Vec<u8> {
    let mut out = String::new();
    for entry in ordered_for_list(entries) {
        out.push_str(&format_list_line(&entry.name, &entry.metadata, now));
    }
    out.into_bytes()
}

/// The letters from `rwadf` (files) or `eldfm` (directories) present in
/// `permission`, following spec.md §4.6's `Perm` fact semantics.
fn perm_letters(permission: Permission, is_dir: bool) -> String {
    let candidates = if is_dir { "eldfm" } else { "rwadf" };
    candidates.chars().filter(|ch| permission.contains(Permission::parse(&ch.to_string()))).collect()
}

/// Formats one MLST/MLSD fact-and-name line:
/// `"fact=value;fact=value;...; name"` (spec.md §4.6; note the space before
/// the name).
pub fn format_mlst_entry(facts: &[Fact], kind: EntryKind, metadata: Option<&Metadata>, permission: Permission, name: &str) -> String {
    let mut out = String::new();
    for fact in facts {
        match fact {
            Fact::Type => out.push_str(&format!("Type={};", kind.type_value())),
            Fact::Size => {
                if kind == EntryKind::File {
                    if let Some(meta) = metadata {
                        out.push_str(&format!("Size={};", meta.len));
                    }
                }
            }
            Fact::Modify => {
                if let Some(meta) = metadata {
                    let modified: DateTime<Utc> = meta.modified.into();
                    out.push_str(&format!("Modify={};", modified.format("%Y%m%d%H%M%S")));
                }
            }
            Fact::Perm => out.push_str(&format!("Perm={};", perm_letters(permission, kind.is_dir()))),
        }
    }
    out.push(' ');
    out.push_str(name);
    out
}

/// Renders the full `MLSD` payload for a directory listing: `cdir`, `pdir`
/// (unless parent equals the listed path), then one line per entry.
pub fn render_mlsd(
    facts: &[Fact],
    entries: Vec<DirEntry>,
    dir_metadata: &Metadata,
    dir_permission: Permission,
    parent_metadata: Option<&Metadata>,
    parent_permission: Permission,
    include_parent: bool,
) -> Vec<u8> {
    let mut out = String::new();
    out.push_str(&format_mlst_entry(facts, EntryKind::Cdir, Some(dir_metadata), dir_permission, "."));
    out.push_str("\r\n");
    if include_parent {
        out.push_str(&format_mlst_entry(facts, EntryKind::Pdir, parent_metadata, parent_permission, ".."));
        out.push_str("\r\n");
    }
    for entry in entries {
        let kind = if entry.metadata.is_dir { EntryKind::Dir } else { EntryKind::File };
        out.push_str(&format_mlst_entry(facts, kind, Some(&entry.metadata), dir_permission, &entry.name));
        out.push_str("\r\n");
    }
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;

    fn meta(is_dir: bool, len: u64, mode: u32) -> Metadata {
        Metadata { len, is_dir, is_file: !is_dir, modified: SystemTime::now(), mode }
    }

    #[test]
    fn list_line_uses_current_year_time_format_for_recent_files() {
        let now: DateTime<Utc> = "2026-07-28T00:00:00Z".parse().unwrap();
        let m = Metadata { modified: now.into(), ..meta(false, 11, 0o644) };
        let line = format_list_line("hello.txt", &m, now);
        assert!(line.starts_with("-rw-r--r-- 1 user group"));
        assert!(line.contains("hello.txt"));
        assert!(line.contains("Jul 28"));
    }

    #[test]
    fn directories_sort_before_files() {
        let entries = vec![
            DirEntry { name: "b.txt".into(), metadata: meta(false, 1, 0o644) },
            DirEntry { name: "a_dir".into(), metadata: meta(true, 0, 0o755) },
        ];
        let ordered = ordered_for_list(entries);
        assert_eq!(ordered[0].name, "a_dir");
        assert_eq!(ordered[1].name, "b.txt");
    }

    #[test]
    fn mlst_entry_joins_facts_with_semicolons_and_a_trailing_space() {
        let m = meta(false, 42, 0o644);
        let perm = Permission::parse("rw");
        let line = format_mlst_entry(&[Fact::Type, Fact::Size, Fact::Perm], EntryKind::File, Some(&m), perm, "a.txt");
        assert_eq!(line, "Type=file;Size=42;Perm=rw; a.txt");
    }

    #[test]
    fn mlst_size_fact_is_omitted_for_directories() {
        let m = meta(true, 4096, 0o755);
        let perm = Permission::parse("elm");
        let line = format_mlst_entry(&[Fact::Type, Fact::Size], EntryKind::Dir, Some(&m), perm, "sub");
        assert_eq!(line, "Type=dir; sub");
    }
}
