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

//! End-to-end tests: feed a script on stdin to the compiled binary (piped,
//! so it runs non-interactive — no controlling terminal, no job control)
//! and check stdout/stderr/exit status.

use std::io::Write;
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_sesh");

fn run(script: &str) -> Output {
    run_in(script, std::env::temp_dir().to_str().unwrap())
}

fn run_in(script: &str, dir: &str) -> Output {
    let mut child = Command::new(BIN)
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn sesh");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn s1_simple_command() {
    let out = run("echo hello\n");
    assert_eq!(String::from_utf8_lossy(&out.stdout), "hello\n");
    assert!(out.status.success());
}

#[test]
fn s2_pipeline_and_redirect() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a"), "").unwrap();
    std::fs::write(dir.path().join("b"), "").unwrap();
    std::fs::write(dir.path().join("c"), "").unwrap();
    let out = run_in("ls | wc -l > count.txt\n", dir.path().to_str().unwrap());
    assert!(out.status.success());
    let count = std::fs::read_to_string(dir.path().join("count.txt")).unwrap();
    assert_eq!(count.trim(), "3");
}

#[test]
fn s3_negated_pipeline() {
    let out = run("! grep zzz /etc/hostname\n");
    assert!(out.status.success());
}

#[test]
fn s5_assignment_visible_on_next_line() {
    let out = run("FOO=bar\necho $FOO\n");
    assert_eq!(String::from_utf8_lossy(&out.stdout), "bar\n");
}

#[test]
fn s6_redirect_error_reports_and_fails() {
    let out = run("cat < /nonexistent\n");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("/nonexistent"));
}

#[test]
fn property_exit_code_roundtrip() {
    let out = run("true\necho $?\nfalse\necho $?\n");
    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("0"));
    assert_eq!(lines.next(), Some("1"));
}

#[test]
fn property_pipeline_status_is_last_commands() {
    let out = run("false | true\necho $?\ntrue | false\necho $?\n");
    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("0"));
    assert_eq!(lines.next(), Some("1"));
}

#[test]
fn property_negation() {
    let out = run("! true\necho $?\n! false\necho $?\n");
    let stdout = String::from_utf8_lossy(&out.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("1"));
    assert_eq!(lines.next(), Some("0"));
}

#[test]
fn property_glob_sorted_and_nocheck() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.txt", "b.txt", "c.txt"] {
        std::fs::write(dir.path().join(name), "").unwrap();
    }
    let out = run_in("echo *.txt\n", dir.path().to_str().unwrap());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "a.txt b.txt c.txt\n");

    let empty_dir = tempfile::tempdir().unwrap();
    let out = run_in("echo *.txt\n", empty_dir.path().to_str().unwrap());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "*.txt\n");
}

#[test]
fn property_tilde_expansion() {
    let mut child = Command::new(BIN)
        .env("HOME", "/tmp/sesh-test-home")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"echo ~\necho ~/x\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "/tmp/sesh-test-home\n/tmp/sesh-test-home/x\n"
    );
}

#[test]
fn property_redirection_idempotence() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_in(
        "echo hello > f\necho hello > f\n",
        dir.path().to_str().unwrap(),
    );
    assert!(out.status.success());
    assert_eq!(std::fs::read_to_string(dir.path().join("f")).unwrap(), "hello\n");

    let out = run_in("echo x >> g\necho x >> g\n", dir.path().to_str().unwrap());
    assert!(out.status.success());
    assert_eq!(std::fs::read_to_string(dir.path().join("g")).unwrap(), "x\nx\n");
}

#[test]
fn export_with_no_args_lists_exported_vars() {
    let out = run("export FOO=bar\nexport\n");
    assert!(String::from_utf8_lossy(&out.stdout).contains("FOO=bar"));
}

#[test]
fn cd_updates_pwd_variable() {
    let dir = tempfile::tempdir().unwrap();
    let sub = dir.path().join("sub");
    std::fs::create_dir(&sub).unwrap();
    let out = run_in("cd sub\necho $PWD\n", dir.path().to_str().unwrap());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        sub.to_str().unwrap()
    );
}

#[test]
fn parse_error_sets_status_two() {
    let out = run("echo 'unterminated\necho $?\n");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(stdout.trim(), "2");
}
