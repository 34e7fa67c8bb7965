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

//! The parsed representation of one input line. `Command`/`Pipeline` values
//! are ephemeral: built by the parser, consumed by the executor, and
//! discarded.

/// How a redirection's target file is opened.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RedirMode {
    Read,
    Truncate,
    Append,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Redirection {
    /// 0 for stdin, 1 for stdout. No other file descriptors are supported.
    pub target_fd: i32,
    pub path: String,
    pub mode: RedirMode,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Command {
    /// `argv[0]` is the program name. May be empty if the command is pure
    /// redirection (e.g. `> out.txt`); the executor applies the
    /// redirections, then reports success without running anything.
    pub argv: Vec<String>,
    pub redirects: Vec<Redirection>,
}

impl Command {
    pub fn is_empty(&self) -> bool {
        self.argv.is_empty() && self.redirects.is_empty()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub negate: bool,
    pub background: bool,
}

impl Pipeline {
    /// Applies the `!` negation rule: any non-zero status becomes 0, and 0
    /// becomes 1 (the same rule as C's `!status`, and incidentally the same
    /// as POSIX's `status == 0 ? 1 : 0`).
    pub fn apply_negation(&self, status: i32) -> i32 {
        if self.negate {
            i32::from(status == 0)
        } else {
            status
        }
    }
}
