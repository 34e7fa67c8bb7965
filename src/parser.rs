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

//! Folds lexer [`Token`]s into a [`Pipeline`].
//!
//! ```text
//! pipeline := ['!'] command ('|' command)* ['&']
//! command  := assignment* (word | redirect)*
//! redirect := ('<' | '>' | '>>') word
//! ```
//!
//! Word expansion happens here, not in the executor: by the time a
//! `Pipeline` exists, every argv entry and redirection target is already a
//! plain string.

use crate::ast::{Command, Pipeline, RedirMode, Redirection};
use crate::error::ParseError;
use crate::expand::expand_word;
use crate::lexer::{self, Token};
use crate::variable::VariableStore;

pub fn parse(line: &str, vars: &mut VariableStore) -> Result<Pipeline, ParseError> {
    let tokens = lexer::lex(line)?;
    parse_tokens(tokens, vars)
}

fn parse_tokens(mut tokens: Vec<Token>, vars: &mut VariableStore) -> Result<Pipeline, ParseError> {
    let mut negate = false;
    if matches!(tokens.first(), Some(Token::Bang)) {
        negate = true;
        tokens.remove(0);
    }

    let mut background = false;
    if matches!(tokens.last(), Some(Token::Amp)) {
        background = true;
        tokens.pop();
    }

    // A line with no command at all (only whitespace, or only `&`/`!`)
    // lexes to zero tokens here; distinguish that from an empty segment
    // within a pipeline (`echo a |`, `| echo a`), which is a hard error.
    if tokens.is_empty() {
        return Err(ParseError::EmptyPipeline);
    }

    let mut commands = Vec::new();
    let mut current_tokens: Vec<Token> = Vec::new();
    for tok in tokens {
        if matches!(tok, Token::Pipe) {
            commands.push(parse_command(std::mem::take(&mut current_tokens), vars)?);
        } else {
            current_tokens.push(tok);
        }
    }
    commands.push(parse_command(current_tokens, vars)?);

    if commands.is_empty() || commands[0].is_empty() {
        return Err(ParseError::EmptyPipeline);
    }
    for cmd in &commands[1..] {
        if cmd.is_empty() {
            return Err(ParseError::EmptyPipelineSegment);
        }
    }

    Ok(Pipeline {
        commands,
        negate,
        background,
    })
}

fn parse_command(tokens: Vec<Token>, vars: &mut VariableStore) -> Result<Command, ParseError> {
    if tokens.is_empty() {
        return Err(ParseError::EmptyPipelineSegment);
    }

    let mut command = Command::default();
    let mut accepting_assignments = true;
    let mut iter = tokens.into_iter();

    while let Some(tok) = iter.next() {
        match tok {
            Token::Word(word) => {
                if accepting_assignments {
                    if let Some((name, value_word)) = word.as_assignment() {
                        let value = expand_word(&value_word, vars).join(" ");
                        vars.set(name, value);
                        continue;
                    }
                    accepting_assignments = false;
                }
                command.argv.extend(expand_word(&word, vars));
            }
            Token::Less => {
                let target = take_redirect_word(&mut iter, "<", vars)?;
                accepting_assignments = false;
                command.redirects.push(Redirection {
                    target_fd: 0,
                    path: target,
                    mode: RedirMode::Read,
                });
            }
            Token::Great => {
                let target = take_redirect_word(&mut iter, ">", vars)?;
                accepting_assignments = false;
                command.redirects.push(Redirection {
                    target_fd: 1,
                    path: target,
                    mode: RedirMode::Truncate,
                });
            }
            Token::DGreat => {
                let target = take_redirect_word(&mut iter, ">>", vars)?;
                accepting_assignments = false;
                command.redirects.push(Redirection {
                    target_fd: 1,
                    path: target,
                    mode: RedirMode::Append,
                });
            }
            Token::Pipe => unreachable!("pipes are split out before parse_command runs"),
            Token::Amp => return Err(ParseError::UnexpectedToken("&".to_string())),
            Token::Bang => return Err(ParseError::UnexpectedToken("!".to_string())),
        }
    }

    Ok(command)
}

/// Consumes and expands the word following a redirection operator. A
/// pathname expansion that matches more than one file still yields only
/// one redirect target, so the first (sorted) match wins rather than
/// silently widening the command's redirection list.
fn take_redirect_word(
    iter: &mut std::vec::IntoIter<Token>,
    op: &'static str,
    vars: &mut VariableStore,
) -> Result<String, ParseError> {
    match iter.next() {
        Some(Token::Word(w)) => {
            let mut expanded = expand_word(&w, vars);
            Ok(if expanded.is_empty() {
                String::new()
            } else {
                expanded.remove(0)
            })
        }
        _ => Err(ParseError::MissingRedirectOperand(op)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_command() {
        let mut vars = VariableStore::new();
        let p = parse("echo hello world", &mut vars).unwrap();
        assert_eq!(p.commands.len(), 1);
        assert_eq!(p.commands[0].argv, vec!["echo", "hello", "world"]);
        assert!(!p.negate);
        assert!(!p.background);
    }

    #[test]
    fn pipeline_and_background() {
        let mut vars = VariableStore::new();
        let p = parse("ls | wc -l &", &mut vars).unwrap();
        assert_eq!(p.commands.len(), 2);
        assert!(p.background);
    }

    #[test]
    fn negation() {
        let mut vars = VariableStore::new();
        let p = parse("! grep foo bar", &mut vars).unwrap();
        assert!(p.negate);
        assert_eq!(p.commands[0].argv[0], "grep");
    }

    #[test]
    fn leading_assignment_is_not_argv() {
        let mut vars = VariableStore::new();
        let p = parse("FOO=bar echo $FOO", &mut vars).unwrap();
        assert_eq!(p.commands[0].argv, vec!["echo", "bar"]);
        assert_eq!(vars.get("FOO").as_deref(), Some("bar"));
    }

    #[test]
    fn assignment_only_recognized_before_first_word() {
        let mut vars = VariableStore::new();
        let p = parse("echo FOO=bar", &mut vars).unwrap();
        assert_eq!(p.commands[0].argv, vec!["echo", "FOO=bar"]);
    }

    #[test]
    fn redirections_attach_to_command() {
        let mut vars = VariableStore::new();
        let p = parse("sort < in.txt > out.txt", &mut vars).unwrap();
        assert_eq!(p.commands[0].argv, vec!["sort"]);
        assert_eq!(p.commands[0].redirects.len(), 2);
    }

    #[test]
    fn empty_pipeline_segment_is_an_error() {
        let mut vars = VariableStore::new();
        assert!(matches!(
            parse("echo a |", &mut vars),
            Err(ParseError::EmptyPipelineSegment)
        ));
        assert!(matches!(
            parse("| echo a", &mut vars),
            Err(ParseError::EmptyPipelineSegment)
        ));
    }

    #[test]
    fn missing_redirect_operand_is_an_error() {
        let mut vars = VariableStore::new();
        assert!(matches!(
            parse("echo a >", &mut vars),
            Err(ParseError::MissingRedirectOperand(">"))
        ));
    }

    #[test]
    fn empty_line_is_an_error() {
        let mut vars = VariableStore::new();
        assert!(matches!(parse("   ", &mut vars), Err(ParseError::EmptyPipeline)));
    }
}
