//! Flat key namespaces
//!
//! Log and stream media have no directories, only names. A directory tree is
//! inferred from `/`-separated names: every key `a/b/c` implies the
//! directories `a` and `a/b`. These helpers turn a flat key listing into the
//! [`Entry`]/[`Stat`] view the storage contract promises.

use crate::backend::{Entry, Stat};
use std::collections::BTreeSet;

/// Namespace separator for keyed media
pub const SEPARATOR: char = '/';

/// Join segments with `/`, dropping empty segments and stray separators
pub fn join_key(segments: &[&str]) -> String {
    segments
        .iter()
        .flat_map(|s| s.split(SEPARATOR))
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical form of a key: no leading, trailing or doubled separators
pub fn normalize_key(path: &str) -> String {
    join_key(&[path])
}

/// Prefix matching every key strictly inside `dir` (`""` for the root)
pub fn dir_prefix(dir: &str) -> String {
    let dir = normalize_key(dir);
    if dir.is_empty() {
        dir
    } else {
        format!("{}{}", dir, SEPARATOR)
    }
}

/// True if `key` is `path` itself or lies beneath it
pub fn is_at_or_under(key: &str, path: &str) -> bool {
    let path = normalize_key(path);
    if path.is_empty() {
        return true;
    }
    key == path || key.starts_with(&format!("{}{}", path, SEPARATOR))
}

/// Direct children of `dir` among `keys`, directories synthesized.
///
/// A name can be both a file and a directory in a flat namespace (`a` and
/// `a/b`); both entries are returned.
pub fn entries_from_keys<I, S>(dir: &str, keys: I) -> Vec<Entry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let dir = normalize_key(dir);
    let prefix = dir_prefix(&dir);
    let mut seen: BTreeSet<(String, bool)> = BTreeSet::new();

    for key in keys {
        let key = normalize_key(key.as_ref());
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        match rest.split_once(SEPARATOR) {
            Some((first, _)) => seen.insert((first.to_string(), true)),
            None => seen.insert((rest.to_string(), false)),
        };
    }

    seen.into_iter()
        .map(|(id, is_directory)| Entry {
            path: join_key(&[dir.as_str(), id.as_str()]),
            id,
            is_directory,
        })
        .collect()
}

/// Stat `path` against a listing of keys.
///
/// An exact match is a file; otherwise any key beneath `path` makes it a
/// directory. The root is a directory whenever any key exists.
pub fn stat_from_keys<I, S>(path: &str, keys: I) -> Option<Stat>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let path = normalize_key(path);
    let mut is_directory = false;
    for key in keys {
        let key = normalize_key(key.as_ref());
        if !path.is_empty() && key == path {
            return Some(Stat {
                is_directory: false,
            });
        }
        if is_at_or_under(&key, &path) {
            is_directory = true;
        }
    }
    is_directory.then_some(Stat { is_directory: true })
}
