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

//! Error types shared by the lexer, parser, and executor.

use thiserror::Error;

/// Errors raised while splitting a line into tokens.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum LexError {
    /// A `'` was opened but never closed.
    #[error("unterminated single-quoted string")]
    UnclosedSingleQuote,
    /// A `"` was opened but never closed.
    #[error("unterminated double-quoted string")]
    UnclosedDoubleQuote,
    /// A `\` appeared as the last character of the line.
    #[error("unterminated escape sequence")]
    TrailingBackslash,
}

/// Errors raised while folding tokens into a [`crate::ast::Pipeline`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum ParseError {
    /// Propagated from the lexer.
    #[error(transparent)]
    Lex(#[from] LexError),
    /// `|` appeared with no command, or a command, on one side.
    #[error("expected a command before or after '|'")]
    EmptyPipelineSegment,
    /// A redirection operator (`<`, `>`, `>>`) had no following word.
    #[error("expected a filename after '{0}'")]
    MissingRedirectOperand(&'static str),
    /// The line held no command at all (only whitespace, or only `&`/`!`).
    #[error("no command specified")]
    EmptyPipeline,
    /// A token appeared where a command or redirection was expected.
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
}

/// Fatal errors from the executor: resource exhaustion the shell cannot
/// recover from mid-pipeline (POSIX "ForkError"/"PipeError" in spec terms).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShellError {
    #[error("cannot create pipe: {0}")]
    Pipe(#[source] nix::errno::Errno),
    #[error("cannot fork: {0}")]
    Fork(#[source] nix::errno::Errno),
}
