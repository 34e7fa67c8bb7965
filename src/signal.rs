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

//! Signal discipline: the shell's own dispositions, the reset children need
//! after `fork`, and the SIGCHLD handler.
//!
//! The handler only performs async-signal-safe work: it writes one byte to
//! a self-pipe and returns. All interpretation — matching pids to jobs,
//! formatting `[id] Done ...` announcements — happens in ordinary code that
//! drains the pipe between prompts, the same division the original C
//! source lacked (its handler called `printf` directly) and that this
//! implementation corrects.

use nix::errno::Errno;
use nix::sys::signal::{self, SigAction, SigHandler, SigSet, Signal};
use nix::unistd::{self, Pid};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};

/// Signals ignored in the interactive shell process as defense in depth
/// against the fork/setpgid race: the shell is normally not the foreground
/// process group, but a terminal-generated signal could still reach it
/// before a child's `setpgid` completes.
const IGNORED_IN_SHELL: [Signal; 5] = [
    Signal::SIGINT,
    Signal::SIGQUIT,
    Signal::SIGTSTP,
    Signal::SIGTTIN,
    Signal::SIGTTOU,
];

static SELF_PIPE_WRITE: AtomicI32 = AtomicI32::new(-1);

/// Installs the interactive shell's signal dispositions: the five terminal
/// signals above are ignored, and SIGCHLD gets a handler that just pings
/// the self-pipe. Returns the read end of that pipe, which the caller polls
/// between prompts via [`drain_self_pipe`].
pub fn install_shell_dispositions() -> nix::Result<RawFd> {
    for &sig in &IGNORED_IN_SHELL {
        unsafe {
            signal::sigaction(sig, &SigAction::new(SigHandler::SigIgn, signal::SaFlags::empty(), SigSet::empty()))?;
        }
    }

    let (read_fd, write_fd) = unistd::pipe()?;
    set_nonblocking(read_fd)?;
    set_nonblocking(write_fd)?;
    SELF_PIPE_WRITE.store(write_fd, Ordering::SeqCst);

    let flags = signal::SaFlags::SA_RESTART;
    unsafe {
        signal::sigaction(
            Signal::SIGCHLD,
            &SigAction::new(SigHandler::Handler(handle_sigchld), flags, SigSet::empty()),
        )?;
    }

    Ok(read_fd)
}

extern "C" fn handle_sigchld(_signal: nix::libc::c_int) {
    let saved_errno = Errno::last();
    let fd = SELF_PIPE_WRITE.load(Ordering::SeqCst);
    if fd >= 0 {
        // A short write of one byte cannot fail with EINTR in a way that
        // requires a retry loop, and if the pipe is full the handler has
        // already run recently enough that the drain loop will catch up.
        let _ = unistd::write(fd, &[0u8]);
    }
    Errno::set(saved_errno);
}

/// Drains every pending notification byte from the self-pipe without
/// blocking. The return value only tells the caller "at least one SIGCHLD
/// arrived since the last drain"; the actual child-state changes are
/// discovered by the non-blocking `waitpid` loop in [`crate::exec`].
pub fn drain_self_pipe(read_fd: RawFd) -> bool {
    let mut buf = [0u8; 64];
    let mut any = false;
    loop {
        match unistd::read(read_fd, &mut buf) {
            Ok(0) => break,
            Ok(_) => any = true,
            Err(Errno::EAGAIN) => break,
            Err(Errno::EINTR) => continue,
            Err(_) => break,
        }
    }
    any
}

/// Resets every signal a child must see at default disposition before
/// `exec`: the five ignored-in-shell signals plus SIGCHLD itself, since the
/// ignore disposition survives `exec` and would otherwise leave external
/// commands unkillable by Ctrl-C.
pub fn reset_child_dispositions() -> nix::Result<()> {
    for &sig in IGNORED_IN_SHELL.iter().chain(std::iter::once(&Signal::SIGCHLD)) {
        unsafe {
            signal::sigaction(sig, &SigAction::new(SigHandler::SigDfl, signal::SaFlags::empty(), SigSet::empty()))?;
        }
    }
    Ok(())
}

pub fn kill_group(pgid: Pid, sig: Signal) -> nix::Result<()> {
    signal::kill(Pid::from_raw(-pgid.as_raw()), sig)
}

pub fn set_nonblocking(fd: RawFd) -> nix::Result<()> {
    use nix::fcntl::{fcntl, FcntlArg, OFlag};
    let flags = fcntl(fd, FcntlArg::F_GETFL)?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags))?;
    Ok(())
}
