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

//! The [`Shell`] context and its read-eval loop: everything else (lexer,
//! parser, executor, job table, signal layer) is stateless or owns only
//! its own data; this module is where it all gets wired together.

use crate::error::ParseError;
use crate::exec;
use crate::job::JobTable;
use crate::parser;
use crate::variable::VariableStore;
use nix::unistd::{self, Pid};
use std::io::{self, BufRead, Write};
use std::os::unix::io::RawFd;

pub struct Shell {
    pub vars: VariableStore,
    pub jobs: JobTable,
    pub interactive: bool,
    pub shell_pgid: Pid,
    self_pipe_read: Option<RawFd>,
}

impl Shell {
    /// Performs shell init (§4.8): if stdin is a terminal, claims its own
    /// process group and the controlling terminal and installs the
    /// interactive signal dispositions; otherwise runs with default
    /// dispositions and no job control, matching a script/pipe invocation.
    pub fn new() -> Self {
        let interactive = unistd::isatty(0).unwrap_or(false);
        let mut shell_pgid = unistd::getpgrp();
        let mut self_pipe_read = None;

        if interactive {
            let pid = unistd::getpid();
            if unistd::setpgid(pid, pid).is_ok() {
                shell_pgid = pid;
            }
            let _ = unistd::tcsetpgrp(0, shell_pgid);
            self_pipe_read = crate::signal::install_shell_dispositions().ok();
        }

        Shell {
            vars: VariableStore::new(),
            jobs: JobTable::new(),
            interactive,
            shell_pgid,
            self_pipe_read,
        }
    }

    /// Parses and runs one input line, updating `$?` and returning the
    /// status (also returned so the caller can special-case EOF/errors).
    pub fn execute_line(&mut self, line: &str) -> i32 {
        let status = match parser::parse(line, &mut self.vars) {
            Ok(pipeline) => match exec::execute(self, &pipeline) {
                Ok(status) => status,
                Err(e) => {
                    // ForkError/PipeError indicate resource exhaustion the
                    // shell cannot recover from mid-pipeline.
                    eprintln!("sesh: {e}");
                    std::process::exit(1);
                }
            },
            Err(ParseError::EmptyPipeline) => return self.vars.last_status,
            Err(e) => {
                eprintln!("sesh: {e}");
                2
            }
        };
        self.vars.last_status = status;
        status
    }

    fn reap_if_signaled(&mut self) {
        if let Some(fd) = self.self_pipe_read {
            if crate::signal::drain_self_pipe(fd) {
                exec::reap_pending(self);
            }
        }
    }

    /// The read-eval loop: prompt (if interactive), read a line, execute
    /// it, drain job-state announcements, repeat until EOF.
    pub fn run(&mut self) -> i32 {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();

        loop {
            self.reap_if_signaled();

            if self.interactive {
                print!("$ ");
                let _ = io::stdout().flush();
            }

            let line = match lines.next() {
                Some(Ok(line)) => line,
                Some(Err(_)) | None => break,
            };

            self.execute_line(&line);
            self.reap_if_signaled();
        }

        self.vars.last_status
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new()
    }
}
