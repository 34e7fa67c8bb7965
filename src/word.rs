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

//! The [`Word`] type: a lexed token that remembers which spans of it came
//! from inside quotes.
//!
//! A naive lexer that just strips quote characters loses information the
//! expander needs: `'$x'` and `$x` both become the text `$x` if quoting is
//! discarded too early, but only the second should expand. [`Word`] keeps a
//! sequence of [`WordUnit`]s tagged by their quoting so later stages (tilde,
//! parameter, and pathname expansion in [`crate::expand`]) can tell them
//! apart without re-scanning the original line.

/// One contiguous run of a word that came from a single quoting context.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WordUnit {
    /// Came from outside any quotes. Subject to `$`/`~`/pathname expansion.
    Unquoted(String),
    /// Came from inside `"..."`. Subject to `$` expansion only.
    DoubleQuoted(String),
    /// Came from inside `'...'`, or was escaped with a backslash. Never
    /// expanded in any way.
    Literal(String),
}

/// A lexed token, not yet expanded.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Word {
    pub units: Vec<WordUnit>,
}

impl Word {
    pub fn from_unquoted(s: impl Into<String>) -> Self {
        Word {
            units: vec![WordUnit::Unquoted(s.into())],
        }
    }

    /// True if any part of this word was quoted or escaped. A word with any
    /// quoting at all is never pathname-expanded, matching ordinary shell
    /// behavior (`echo \*` and `echo "*"` print a literal `*`).
    pub fn is_quoted(&self) -> bool {
        self.units
            .iter()
            .any(|u| !matches!(u, WordUnit::Unquoted(_)))
    }

    /// Concatenation of every unit's text, ignoring quoting. Used for
    /// recognizing operator-adjacent words and for the final argv string
    /// once expansion has resolved `$`/`~` inside each unit.
    pub fn raw(&self) -> String {
        let mut s = String::new();
        for unit in &self.units {
            match unit {
                WordUnit::Unquoted(t) | WordUnit::DoubleQuoted(t) | WordUnit::Literal(t) => {
                    s.push_str(t)
                }
            }
        }
        s
    }

    /// If this word looks like `NAME=VALUE` with the name and `=` both
    /// unquoted, returns `(NAME, value word)`. Quoting the name (e.g.
    /// `'FOO'=bar`) or the whole assignment (`"FOO=bar"`) disqualifies it,
    /// matching the expectation that assignment recognition is a purely
    /// lexical, unquoted-prefix affair.
    pub fn as_assignment(&self) -> Option<(&str, Word)> {
        let (first, rest) = self.units.split_first()?;
        let WordUnit::Unquoted(text) = first else {
            return None;
        };
        let eq = text.find('=')?;
        let name = &text[..eq];
        if name.is_empty() || !is_name(name) {
            return None;
        }
        let mut value_units = Vec::new();
        let remainder = &text[eq + 1..];
        if !remainder.is_empty() {
            value_units.push(WordUnit::Unquoted(remainder.to_string()));
        }
        value_units.extend(rest.iter().cloned());
        Some((name, Word { units: value_units }))
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, the grammar for variable and assignment names.
pub fn is_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_word_is_quoted() {
        let w = Word {
            units: vec![WordUnit::Literal("x".into())],
        };
        assert!(w.is_quoted());
        let w = Word::from_unquoted("x");
        assert!(!w.is_quoted());
    }

    #[test]
    fn assignment_recognizes_unquoted_prefix() {
        let w = Word::from_unquoted("FOO=bar");
        let (name, value) = w.as_assignment().expect("should be an assignment");
        assert_eq!(name, "FOO");
        assert_eq!(value.raw(), "bar");
    }

    #[test]
    fn quoted_name_is_not_an_assignment() {
        let w = Word {
            units: vec![WordUnit::Literal("FOO".into()), WordUnit::Unquoted("=bar".into())],
        };
        assert!(w.as_assignment().is_none());
    }

    #[test]
    fn invalid_identifier_is_not_an_assignment() {
        let w = Word::from_unquoted("1FOO=bar");
        assert!(w.as_assignment().is_none());
    }
}
