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

//! The five builtins: `cd`, `export`, `jobs`, `fg`, `bg`.
//!
//! `cd`/`export`/`jobs` run equally well in a forked child (single command
//! in a pipeline, e.g. `cd /tmp | true`) or directly in the shell process
//! (the fast path); the child case mutates its own copy of the shell state,
//! which is discarded when the child exits, matching ordinary shell
//! semantics where a piped builtin cannot affect the parent's variables.
//! `fg`/`bg` only make sense in the shell itself, since they wait on and
//! foreground the shell's own job table entries — the executor only ever
//! reaches them through the single-builtin fast path.

use crate::job::JobState;
use crate::shell::Shell;
use crate::variable::VariableStore;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

const NAMES: [&str; 5] = ["cd", "export", "jobs", "fg", "bg"];

pub fn is_builtin(name: &str) -> bool {
    NAMES.contains(&name)
}

/// Runs a builtin that is safe to execute in a forked child (everything
/// except `fg`/`bg`, which need the shell's live job table and terminal).
/// Returns `None` if `argv[0]` is `fg`/`bg`, or not a builtin at all.
pub fn try_run(shell: &mut Shell, argv: &[String]) -> Option<i32> {
    match argv[0].as_str() {
        "cd" => Some(cd(&mut shell.vars, argv)),
        "export" => Some(export_impl(&mut shell.vars, argv)),
        "jobs" => Some(jobs(shell)),
        _ => None,
    }
}

/// Runs any builtin in the shell process itself; used by the fast path,
/// which is the only place `fg`/`bg` can run.
pub fn run_in_shell(shell: &mut Shell, argv: &[String]) -> i32 {
    match argv[0].as_str() {
        "cd" => cd(&mut shell.vars, argv),
        "export" => export_impl(&mut shell.vars, argv),
        "jobs" => jobs(shell),
        "fg" => fg(shell, argv),
        "bg" => bg(shell, argv),
        _ => unreachable!("run_in_shell called with a non-builtin"),
    }
}

fn cd(vars: &mut VariableStore, argv: &[String]) -> i32 {
    let target = match argv.get(1) {
        Some(dir) => dir.clone(),
        None => match vars.get("HOME") {
            Some(home) => home,
            None => {
                eprintln!("sesh: cd: HOME not set");
                return 1;
            }
        },
    };

    let old_pwd = std::env::current_dir().ok().map(|p| p.display().to_string());

    if let Err(e) = std::env::set_current_dir(&target) {
        eprintln!("sesh: cd: {target}: {e}");
        return 1;
    }

    if let Some(new_pwd) = std::env::current_dir().ok().map(|p| p.display().to_string()) {
        vars.set("PWD", new_pwd);
    }
    if let Some(old) = old_pwd {
        vars.set("OLDPWD", old);
    }
    0
}

fn export_impl(vars: &mut VariableStore, argv: &[String]) -> i32 {
    if argv.len() == 1 {
        let mut entries: Vec<(String, String)> = vars
            .exported()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        entries.sort();
        for (k, v) in entries {
            println!("{k}={v}");
        }
        return 0;
    }

    for arg in &argv[1..] {
        if let Some(eq) = arg.find('=') {
            vars.set_exported(&arg[..eq], arg[eq + 1..].to_string());
        } else {
            vars.export_existing(arg);
        }
    }
    0
}

fn jobs(shell: &Shell) -> i32 {
    for job in shell.jobs.list() {
        let state = match job.state {
            JobState::Running => "Running",
            JobState::Stopped => "Stopped",
            JobState::Done => "Done",
        };
        println!("[{}] {state} {}", job.id, job.display);
    }
    0
}

fn fg(shell: &mut Shell, argv: &[String]) -> i32 {
    let target = match argv.get(1) {
        Some(spec) => shell.jobs.resolve(spec).cloned(),
        None => shell.jobs.most_recent().cloned(),
    };
    let Some(job) = target else {
        eprintln!("sesh: fg: no such job");
        return 1;
    };

    if shell.interactive {
        let _ = nix::unistd::tcsetpgrp(0, job.pgid);
    }
    let _ = crate::signal::kill_group(job.pgid, Signal::SIGCONT);
    if let Some(j) = shell.jobs.find_by_pgid_mut(job.pgid) {
        j.state = JobState::Running;
    }

    let status = wait_one_foreground(shell, job.pgid);

    if shell.interactive {
        let _ = nix::unistd::tcsetpgrp(0, shell.shell_pgid);
    }
    status
}

fn bg(shell: &mut Shell, argv: &[String]) -> i32 {
    let target = match argv.get(1) {
        Some(spec) => shell.jobs.resolve(spec).cloned(),
        None => shell.jobs.most_recent().cloned(),
    };
    let Some(job) = target else {
        eprintln!("sesh: bg: no such job");
        return 1;
    };
    if job.state != JobState::Stopped {
        return 0;
    }
    let _ = crate::signal::kill_group(job.pgid, Signal::SIGCONT);
    if let Some(j) = shell.jobs.find_by_pgid_mut(job.pgid) {
        j.state = JobState::Running;
    }
    println!("[{}] {}", job.id, job.display);
    0
}

fn wait_one_foreground(shell: &mut Shell, pgid: Pid) -> i32 {
    use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
    loop {
        match waitpid(Some(Pid::from_raw(-pgid.as_raw())), Some(WaitPidFlag::WUNTRACED)) {
            Ok(WaitStatus::Exited(pid, code)) => {
                if pid == pgid {
                    shell.jobs.remove(pgid);
                    return code;
                }
            }
            Ok(WaitStatus::Signaled(pid, sig, _)) => {
                if pid == pgid {
                    shell.jobs.remove(pgid);
                    return 128 + sig as i32;
                }
            }
            Ok(WaitStatus::Stopped(_, _)) => {
                if let Some(j) = shell.jobs.find_by_pgid_mut(pgid) {
                    j.state = JobState::Stopped;
                }
                return 0;
            }
            Err(nix::errno::Errno::ECHILD) => return 0,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => return 1,
            Ok(_) => {}
        }
    }
}
