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

//! The executor: turns a [`Pipeline`] into running processes.
//!
//! One pipe per adjacent command pair, one `fork` per command, all children
//! placed in a single process group led by the first child. The group gets
//! the controlling terminal while running in the foreground, and the shell
//! reclaims it afterward.

use crate::ast::{Pipeline, RedirMode};
use crate::builtin;
use crate::error::ShellError;
use crate::job::JobState;
use crate::shell::Shell;
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use itertools::Itertools;
use nix::unistd::{self, ForkResult, Pid};
use std::ffi::CString;
use std::os::unix::io::RawFd;

const STDIN_FD: RawFd = 0;
const STDOUT_FD: RawFd = 1;

/// Runs a validated pipeline to completion (or, if backgrounded, launches
/// it and returns immediately) and reports its exit status.
pub fn execute(shell: &mut Shell, pipeline: &Pipeline) -> Result<i32, ShellError> {
    if pipeline.commands.len() == 1 && !pipeline.background {
        let command = &pipeline.commands[0];
        if let Some(name) = command.argv.first() {
            if builtin::is_builtin(name) {
                let status = run_builtin_with_redirects(shell, command);
                return Ok(pipeline.apply_negation(status));
            }
        }
    }

    let n = pipeline.commands.len();
    let mut pipes = Vec::with_capacity(n.saturating_sub(1));
    for _ in 0..n.saturating_sub(1) {
        pipes.push(unistd::pipe().map_err(ShellError::Pipe)?);
    }

    let mut pgid: Option<Pid> = None;
    let mut child_pids = Vec::with_capacity(n);

    for (i, command) in pipeline.commands.iter().enumerate() {
        let read_end = if i == 0 { None } else { Some(pipes[i - 1].0) };
        let write_end = if i + 1 < n { Some(pipes[i].1) } else { None };

        match unsafe { unistd::fork() }.map_err(ShellError::Fork)? {
            ForkResult::Child => {
                run_child(shell, command, pgid, read_end, write_end, &pipes, pipeline.background);
                unreachable!("run_child always exits the process");
            }
            ForkResult::Parent { child } => {
                if pgid.is_none() {
                    pgid = Some(child);
                }
                let _ = unistd::setpgid(child, pgid.unwrap());
                child_pids.push(child);
            }
        }
    }

    for &(r, w) in &pipes {
        let _ = unistd::close(r);
        let _ = unistd::close(w);
    }

    let pgid = pgid.expect("at least one command in a non-empty pipeline");
    let display = display_pipeline(pipeline);
    shell.vars.last_bg_pid = pgid.as_raw();

    if pipeline.background {
        shell.jobs.add(pgid, display, true);
        return Ok(0);
    }

    if shell.interactive {
        let _ = unistd::tcsetpgrp(STDIN_FD, pgid);
    }

    let status = wait_foreground(shell, pgid, &child_pids, &display);

    if shell.interactive {
        let _ = unistd::tcsetpgrp(STDIN_FD, shell.shell_pgid);
    }

    Ok(pipeline.apply_negation(status))
}

fn wait_foreground(shell: &mut Shell, pgid: Pid, child_pids: &[Pid], display: &str) -> i32 {
    let mut remaining: std::collections::HashSet<Pid> = child_pids.iter().copied().collect();
    let last_pid = *child_pids.last().expect("at least one command in a non-empty pipeline");
    let mut last_status = 0;
    let mut stopped = false;

    while !remaining.is_empty() {
        let result = waitpid(
            Some(Pid::from_raw(-pgid.as_raw())),
            Some(WaitPidFlag::WUNTRACED),
        );
        match result {
            Ok(WaitStatus::Exited(pid, code)) => {
                remaining.remove(&pid);
                if pid == last_pid {
                    last_status = code;
                }
            }
            Ok(WaitStatus::Signaled(pid, sig, _)) => {
                remaining.remove(&pid);
                if pid == last_pid {
                    last_status = 128 + sig as i32;
                }
            }
            Ok(WaitStatus::Stopped(_pid, _)) => {
                stopped = true;
                break;
            }
            Err(nix::errno::Errno::ECHILD) => break,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => break,
            Ok(_) => {}
        }
    }

    if stopped {
        let id = shell.jobs.add(pgid, display.to_string(), false);
        if let Some(job) = shell.jobs.find_by_pgid_mut(pgid) {
            job.state = JobState::Stopped;
        }
        println!("[{id}] Stopped {display}");
        return 0;
    }

    last_status
}

/// Drains every child-state change the kernel is currently reporting for
/// any pid, without blocking, and updates the job table accordingly. Called
/// between prompts after the self-pipe signals at least one SIGCHLD since
/// the last drain.
pub fn reap_pending(shell: &mut Shell) {
    loop {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        match waitpid(Some(Pid::from_raw(-1)), Some(flags)) {
            Ok(WaitStatus::StillAlive) => break,
            Ok(WaitStatus::Exited(pid, _)) | Ok(WaitStatus::Signaled(pid, _, _)) => {
                if let Some(job) = shell.jobs.find_by_pgid(pid) {
                    let display = job.display.clone();
                    let id = job.id;
                    shell.jobs.remove(pid);
                    println!("[{id}] Done {display}");
                }
            }
            Ok(WaitStatus::Stopped(pid, _)) => {
                if let Some(job) = shell.jobs.find_by_pgid_mut(pid) {
                    job.state = JobState::Stopped;
                    println!("[{}] Stopped {}", job.id, job.display);
                }
            }
            Ok(WaitStatus::Continued(pid)) => {
                if let Some(job) = shell.jobs.find_by_pgid_mut(pid) {
                    job.state = JobState::Running;
                }
            }
            Ok(_) => {}
            Err(nix::errno::Errno::ECHILD) => break,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
}

fn display_pipeline(pipeline: &Pipeline) -> String {
    pipeline.commands.iter().map(|c| c.argv.join(" ")).join(" | ")
}

/// Runs in the child process after `fork`. Never returns: always ends in
/// `std::process::exit` or `execvp`'s replacement of the process image.
fn run_child(
    shell: &mut Shell,
    command: &crate::ast::Command,
    pgid: Option<Pid>,
    read_end: Option<RawFd>,
    write_end: Option<RawFd>,
    all_pipes: &[(RawFd, RawFd)],
    background: bool,
) -> ! {
    let _ = crate::signal::reset_child_dispositions();

    let self_pid = unistd::getpid();
    let target_pgid = pgid.unwrap_or(self_pid);
    let _ = unistd::setpgid(self_pid, target_pgid);
    if shell.interactive && !background {
        let _ = unistd::tcsetpgrp(STDIN_FD, target_pgid);
    }

    if let Some(fd) = read_end {
        let _ = unistd::dup2(fd, STDIN_FD);
    }
    if let Some(fd) = write_end {
        let _ = unistd::dup2(fd, STDOUT_FD);
    }
    for &(r, w) in all_pipes {
        let _ = unistd::close(r);
        let _ = unistd::close(w);
    }

    for redirect in &command.redirects {
        if let Err(e) = apply_redirect(redirect) {
            eprintln!("sesh: {}: {e}", redirect.path);
            std::process::exit(1);
        }
    }

    if command.argv.is_empty() {
        std::process::exit(0);
    }

    if let Some(status) = builtin::try_run(shell, &command.argv) {
        std::process::exit(status);
    }

    match exec_argv(&command.argv) {
        Ok(never) => match never {},
        Err(nix::errno::Errno::ENOENT) => {
            eprintln!("sesh: {}: command not found", command.argv[0]);
            std::process::exit(127);
        }
        Err(e) => {
            eprintln!("sesh: {}: {e}", command.argv[0]);
            std::process::exit(1);
        }
    }
}

fn apply_redirect(redirect: &crate::ast::Redirection) -> nix::Result<()> {
    let path = CString::new(redirect.path.as_str()).map_err(|_| nix::errno::Errno::EINVAL)?;
    let (flags, target_fd) = match redirect.mode {
        RedirMode::Read => (OFlag::O_RDONLY, STDIN_FD),
        RedirMode::Truncate => (OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC, STDOUT_FD),
        RedirMode::Append => (OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND, STDOUT_FD),
    };
    let mode = Mode::from_bits_truncate(0o644);
    let fd = open(&path, flags, mode)?;
    unistd::dup2(fd, target_fd)?;
    unistd::close(fd)?;
    Ok(())
}

/// Searches `$PATH` (unless the name already contains a `/`) and execs the
/// first match. Only returns on failure.
fn exec_argv(argv: &[String]) -> Result<std::convert::Infallible, nix::errno::Errno> {
    let args: Vec<CString> = argv.iter().map(|a| CString::new(a.as_str()).unwrap()).collect();

    if argv[0].contains('/') {
        return unistd::execv(&args[0], &args);
    }

    let path_var = std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".to_string());
    let mut last_err = nix::errno::Errno::ENOENT;
    for dir in path_var.split(':') {
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = format!("{dir}/{}", argv[0]);
        let Ok(c_candidate) = CString::new(candidate) else {
            continue;
        };
        match unistd::execv(&c_candidate, &args) {
            Err(nix::errno::Errno::ENOENT) => continue,
            Err(e) => last_err = e,
            Ok(never) => return Ok(never),
        }
    }
    Err(last_err)
}

/// The fast path for a single foreground builtin: save stdin/stdout,
/// install the command's redirections, run the builtin in-process, then
/// restore the saved descriptors.
fn run_builtin_with_redirects(shell: &mut Shell, command: &crate::ast::Command) -> i32 {
    let saved_in = unistd::dup(STDIN_FD).ok();
    let saved_out = unistd::dup(STDOUT_FD).ok();

    let mut failed = false;
    for redirect in &command.redirects {
        if let Err(e) = apply_redirect(redirect) {
            eprintln!("sesh: {}: {e}", redirect.path);
            failed = true;
            break;
        }
    }

    let status = if failed {
        1
    } else {
        builtin::run_in_shell(shell, &command.argv)
    };

    if let Some(fd) = saved_in {
        let _ = unistd::dup2(fd, STDIN_FD);
        let _ = unistd::close(fd);
    }
    if let Some(fd) = saved_out {
        let _ = unistd::dup2(fd, STDOUT_FD);
        let _ = unistd::close(fd);
    }

    status
}
