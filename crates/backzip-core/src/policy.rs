//! Inclusion policy for files found under a configured source directory.
//!
//! Directories are never filtered: the walker always descends into them and
//! asks this module about each file individually.

use crate::config::SourceDir;
use std::path::Component;
use std::path::Path;

/// Decides whether a file belongs in the directory's archive.
///
/// A file is left out when the rule excludes hidden files and the file, or
/// any directory between it and the root, starts with `.`. It is also left
/// out when any exclude pattern matches. Everything else is included.
///
/// `path` is the file's full path; it is made relative to the rule's root
/// before matching, so a root such as `/home/tmp_user` is not excluded by a
/// `tmp*` pattern.
///
/// # Examples
///
/// ```
/// use backzip_core::SourceDir;
/// use backzip_core::policy::should_include;
/// use std::path::Path;
///
/// let rule = SourceDir::new("/srv/app").with_exclude(vec!["*.log".to_string()]);
///
/// assert!(should_include(&rule, Path::new("/srv/app/keep.txt")));
/// assert!(!should_include(&rule, Path::new("/srv/app/skip.log")));
/// assert!(should_include(&rule, Path::new("/srv/app/B/inner.txt")));
/// ```
#[must_use]
pub fn should_include(rule: &SourceDir, path: &Path) -> bool {
    let relative = path.strip_prefix(&rule.path).unwrap_or(path);

    if !rule.include_hidden && has_hidden_component(relative) {
        return false;
    }

    !rule
        .exclude
        .iter()
        .any(|pattern| matches_pattern(path, relative, pattern))
}

/// Checks if a path's file name starts with `.`.
///
/// # Examples
///
/// ```
/// use backzip_core::policy::is_hidden;
/// use std::path::Path;
///
/// assert!(is_hidden(Path::new(".env")));
/// assert!(is_hidden(Path::new("conf/.secret")));
/// assert!(!is_hidden(Path::new("conf/app.toml")));
/// ```
#[must_use]
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Matches one exclude pattern against a file.
///
/// Patterns without `/` are tried against every component of the relative
/// path, so `*.log` catches `a/b/c.log` and `node_modules` catches anything
/// below such a directory. Patterns with `/` are tried against the whole
/// relative path and the whole absolute path.
fn has_hidden_component(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('.')),
        _ => false,
    })
}

fn matches_pattern(absolute: &Path, relative: &Path, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }

    if pattern.contains('/') {
        let pattern = pattern.trim_start_matches("./");
        return [relative, absolute]
            .iter()
            .filter_map(|p| p.to_str())
            .any(|s| glob_matches(&s.replace('\\', "/"), pattern));
    }

    relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|component| glob_matches(component, pattern))
}

/// Matches a string against a glob pattern.
///
/// Supports `*` (any run of characters except `/`) and `?` (exactly one
/// character except `/`). Everything else matches literally.
///
/// # Examples
///
/// ```
/// use backzip_core::policy::glob_matches;
///
/// assert!(glob_matches("debug.log", "*.log"));
/// assert!(glob_matches("tmp_cache", "tmp*"));
/// assert!(glob_matches("report-07.csv", "report-??.csv"));
/// assert!(glob_matches("cache/blob.bin", "cache/*.bin"));
/// assert!(!glob_matches("cache/deep/blob.bin", "cache/*.bin"));
/// ```
#[must_use]
pub fn glob_matches(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();

    let (mut t, mut p) = (0, 0);
    // Position of the last `*` seen and the text index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some('?') if text[t] != '/' => {
                t += 1;
                p += 1;
            }
            Some(&c) if c != '?' && c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((star, start)) if text[start] != '/' => {
                    backtrack = Some((star, start + 1));
                    p = star + 1;
                    t = start + 1;
                }
                _ => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
