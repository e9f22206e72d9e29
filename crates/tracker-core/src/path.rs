//! Project path normalization.
//!
//! Every store operation keys records by a normalized project path, so that
//! `~/src/app`, ` /home/me/src/app/ ` and `/home/me/src/./lib/../app` all land
//! on the same rows. Normalization is lexical only and never touches the
//! filesystem.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Normalize a raw project path using the current user's home directory.
///
/// Whitespace-only input yields an empty string.
pub fn normalize_project_path(raw: &str) -> String {
    normalize_with_home(raw, dirs::home_dir().as_deref())
}

/// Normalize `raw`, expanding a leading `~` against `home`.
///
/// When `home` is `None` the tilde is left in place and only cleaned.
pub fn normalize_with_home(raw: &str, home: Option<&Path>) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let expanded = expand_tilde(trimmed, home).unwrap_or_else(|| PathBuf::from(trimmed));
    clean(&expanded)
}

fn expand_tilde(path: &str, home: Option<&Path>) -> Option<PathBuf> {
    let home = home?;
    if path == "~" {
        return Some(home.to_path_buf());
    }
    path.strip_prefix("~/").map(|rest| home.join(rest))
}

/// Lexically clean a path: drop `.` segments, resolve `..` against preceding
/// segments, collapse repeated separators and strip any trailing separator.
///
/// `..` above the root of an absolute path is dropped; leading `..` of a
/// relative path is kept. An empty relative result becomes `.`.
pub fn clean(path: &Path) -> String {
    let mut prefix: Option<&OsStr> = None;
    let mut rooted = false;
    let mut parts: Vec<&OsStr> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => prefix = Some(p.as_os_str()),
            Component::RootDir => rooted = true,
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = parts.last().is_some_and(|last| *last != "..");
                if can_pop {
                    parts.pop();
                } else if !rooted {
                    parts.push(OsStr::new(".."));
                }
            }
            Component::Normal(segment) => parts.push(segment),
        }
    }

    let mut cleaned = PathBuf::new();
    if let Some(prefix) = prefix {
        cleaned.push(prefix);
    }
    if rooted {
        cleaned.push(std::path::MAIN_SEPARATOR_STR);
    }
    for part in parts {
        cleaned.push(part);
    }

    if cleaned.as_os_str().is_empty() {
        return ".".to_string();
    }
    cleaned.to_string_lossy().into_owned()
}
