// This file is part of sesh, an interactive Unix shell.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Pathname (glob) expansion, supporting `*` and `?` as the spec requires.
//!
//! Unlike a full POSIX `fnmatch` (bracket expressions, character classes,
//! collating symbols — see `yash-fnmatch` for that), this only needs to
//! translate `*`/`?` into an anchored regular expression per path
//! component, matching `regex`'s documented approach to "compile a small
//! pattern language to a `Regex`" rather than hand-rolling backtracking.

use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// True if `s` contains an unescaped glob metacharacter. Called on already
/// lexed (quote-stripped) text, so every `*`/`?` present here came from an
/// unquoted span and is live.
pub fn has_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?')
}

fn component_to_regex(component: &str) -> Regex {
    let mut pattern = String::from("^");
    for c in component.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            _ => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    // The pattern is built entirely from `regex::escape` output plus the
    // two fixed substitutions above, so compilation cannot fail.
    Regex::new(&pattern).expect("generated glob regex is always valid")
}

/// Expands `pattern` against the filesystem relative to the current
/// directory. Returns the sorted list of matches, or `None` if there were
/// none (the caller passes the literal pattern through unchanged in that
/// case — GLOB_NOCHECK semantics).
pub fn expand(pattern: &str) -> Option<Vec<String>> {
    let absolute = pattern.starts_with('/');
    let components: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    if components.is_empty() {
        return None;
    }

    let mut bases: Vec<PathBuf> = vec![PathBuf::from(if absolute { "/" } else { "." })];

    for component in &components {
        if !has_glob_chars(component) {
            for base in &mut bases {
                *base = base.join(component);
            }
            continue;
        }
        let re = component_to_regex(component);
        let hidden_pattern = component.starts_with('.');
        let mut next = Vec::new();
        for base in &bases {
            let Ok(entries) = fs::read_dir(base) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with('.') && !hidden_pattern {
                    continue;
                }
                if re.is_match(&name) {
                    next.push(base.join(&*name));
                }
            }
        }
        bases = next;
    }

    if bases.is_empty() {
        return None;
    }

    let mut results: Vec<String> = bases
        .iter()
        .map(|p| display_path(p, absolute))
        .collect();
    results.sort();
    Some(results)
}

fn display_path(p: &Path, absolute: bool) -> String {
    if absolute {
        return p.to_string_lossy().into_owned();
    }
    p.strip_prefix(".")
        .unwrap_or(p)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // `expand` resolves relative to the process-wide current directory, so
    // tests that change it must not run concurrently with each other.
    static CWD_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn matches_sorted_filenames() {
        let _guard = CWD_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        for name in ["b.txt", "a.txt", "c.txt"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = expand("*.txt");
        std::env::set_current_dir(cwd).unwrap();
        assert_eq!(
            result,
            Some(vec!["a.txt".to_string(), "b.txt".to_string(), "c.txt".to_string()])
        );
    }

    #[test]
    fn no_match_returns_none() {
        let _guard = CWD_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = expand("*.txt");
        std::env::set_current_dir(cwd).unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn hidden_files_need_explicit_leading_dot() {
        let _guard = CWD_LOCK.lock().unwrap();
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join(".hidden")).unwrap();
        File::create(dir.path().join("visible")).unwrap();
        let cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let result = expand("*");
        std::env::set_current_dir(cwd).unwrap();
        assert_eq!(result, Some(vec!["visible".to_string()]));
    }
}
