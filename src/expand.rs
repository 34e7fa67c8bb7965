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

//! Word expansion: tilde, then `$NAME`/`${NAME}` parameter expansion, then
//! pathname (glob) expansion, applied in that order per word as the spec
//! requires. Field splitting and command substitution are out of scope, so
//! one input [`Word`] always becomes one or more argv strings, never zero
//! (barring a glob pattern with no match, which passes through literally).

use crate::glob;
use crate::variable::VariableStore;
use crate::word::{Word, WordUnit};

/// Expands a single lexed word into one or more argv strings.
pub fn expand_word(word: &Word, vars: &VariableStore) -> Vec<String> {
    let expanded_units = expand_tilde(&word.units);
    let text: String = expanded_units
        .iter()
        .map(|u| match u {
            WordUnit::Unquoted(t) => expand_params(t, vars),
            WordUnit::DoubleQuoted(t) => expand_params(t, vars),
            WordUnit::Literal(t) => t.clone(),
        })
        .collect();

    if !word.is_quoted() && glob::has_glob_chars(&text) {
        if let Some(matches) = glob::expand(&text) {
            return matches;
        }
    }
    vec![text]
}

/// Tilde expansion only ever applies to the very start of the word (an
/// unquoted leading `~`) or right after a `:` within the same unquoted run
/// — per spec, a `~` that arrived via quoting or escaping is never special.
fn expand_tilde(units: &[WordUnit]) -> Vec<WordUnit> {
    let mut out = Vec::with_capacity(units.len());
    for (i, unit) in units.iter().enumerate() {
        if let WordUnit::Unquoted(text) = unit {
            out.push(WordUnit::Unquoted(expand_tilde_in_unquoted(text, i == 0)));
        } else {
            out.push(unit.clone());
        }
    }
    out
}

fn expand_tilde_in_unquoted(text: &str, is_first_unit: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        let at_word_start = is_first_unit && idx == 0;
        let after_colon = idx > 0 && text[..idx].ends_with(':');
        if c == '~' && (at_word_start || after_colon) {
            let start = idx + 1;
            let end = text[start..]
                .find(|c: char| c == '/' || c == ':')
                .map(|p| start + p)
                .unwrap_or(text.len());
            let name = &text[start..end];
            if let Some(home) = home_dir_for(name) {
                out.push_str(&home);
            } else {
                // Unknown user: pass the whole `~name` through unexpanded.
                out.push('~');
                out.push_str(name);
            }
            for _ in start..end {
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn home_dir_for(name: &str) -> Option<String> {
    if name.is_empty() {
        return std::env::var("HOME").ok();
    }
    nix::unistd::User::from_name(name)
        .ok()
        .flatten()
        .map(|u| u.dir.to_string_lossy().into_owned())
}

/// Replaces `$NAME`, `${NAME}`, and the pseudo-variables `$?`/`$$`/`$!`
/// within `text`. A bare `$` not followed by a valid name is left as-is.
fn expand_params(text: &str, vars: &VariableStore) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match text[idx + 1..].chars().next() {
            Some('{') => {
                let start = idx + 2;
                if let Some(end) = text[start..].find('}') {
                    let name = &text[start..start + end];
                    out.push_str(&vars.get(name).unwrap_or_default());
                    for _ in 0..(end + 2) {
                        chars.next();
                    }
                } else {
                    out.push('$');
                }
            }
            Some(c2) if c2 == '?' || c2 == '$' || c2 == '!' => {
                out.push_str(&vars.get(&c2.to_string()).unwrap_or_default());
                chars.next();
            }
            Some(c2) if c2.is_ascii_alphabetic() || c2 == '_' => {
                let start = idx + 1;
                let end = text[start..]
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .map(|p| start + p)
                    .unwrap_or(text.len());
                let name = &text[start..end];
                out.push_str(&vars.get(name).unwrap_or_default());
                for _ in start..end {
                    chars.next();
                }
            }
            _ => out.push('$'),
        }
    }
    out
}
