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

//! The job table: tracks background and stopped pipelines between prompts.
//!
//! Job ids never get reused and never renumber: `remove` just deletes the
//! entry, so `%2` keeps meaning the same job even after `%1` finishes.

use nix::unistd::Pid;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobState {
    Running,
    Stopped,
    Done,
}

#[derive(Clone, Debug)]
pub struct Job {
    pub id: usize,
    pub pgid: Pid,
    pub state: JobState,
    pub display: String,
}

#[derive(Debug, Default)]
pub struct JobTable {
    jobs: Vec<Job>,
    next_id: usize,
    /// Index into `jobs` of the most recently touched job ("current"), and
    /// the one before it ("previous"), for `%+`/`%-` resolution.
    current: Option<usize>,
    previous: Option<usize>,
}

/// The parsed form of a `%`-prefixed job id, mirroring the handful of forms
/// the shell accepts after `fg`/`bg`/`jobs`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobId<'a> {
    Current,
    Previous,
    Number(usize),
    NamePrefix(&'a str),
    NameSubstring(&'a str),
}

pub fn parse_job_id(spec: &str) -> Option<JobId<'_>> {
    let tail = spec.strip_prefix('%')?;
    Some(match tail {
        "" | "%" | "+" => JobId::Current,
        "-" => JobId::Previous,
        _ => match tail.strip_prefix('?') {
            Some(substring) => JobId::NameSubstring(substring),
            None => match tail.parse::<usize>() {
                Ok(n) => JobId::Number(n),
                Err(_) => JobId::NamePrefix(tail),
            },
        },
    })
}

impl JobTable {
    pub fn new() -> Self {
        JobTable::default()
    }

    /// Registers a new job and returns its id. If `background` is true,
    /// prints the conventional `[id] pgid` announcement.
    pub fn add(&mut self, pgid: Pid, display: impl Into<String>, background: bool) -> usize {
        self.next_id += 1;
        let id = self.next_id;
        self.jobs.push(Job {
            id,
            pgid,
            state: JobState::Running,
            display: display.into(),
        });
        self.previous = self.current;
        self.current = Some(self.jobs.len() - 1);
        if background {
            println!("[{id}] {pgid}");
        }
        id
    }

    pub fn find_by_pgid(&self, pgid: Pid) -> Option<&Job> {
        self.jobs.iter().find(|j| j.pgid == pgid)
    }

    pub fn find_by_pgid_mut(&mut self, pgid: Pid) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.pgid == pgid)
    }

    pub fn remove(&mut self, pgid: Pid) {
        if let Some(idx) = self.jobs.iter().position(|j| j.pgid == pgid) {
            self.jobs.remove(idx);
            self.fixup_indices(idx);
        }
    }

    fn fixup_indices(&mut self, removed: usize) {
        let shift = |i: &mut Option<usize>| match *i {
            Some(v) if v == removed => *i = None,
            Some(v) if v > removed => *i = Some(v - 1),
            _ => {}
        };
        shift(&mut self.current);
        shift(&mut self.previous);
    }

    pub fn list(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    fn current_job(&self) -> Option<&Job> {
        self.current.and_then(|i| self.jobs.get(i))
    }

    fn previous_job(&self) -> Option<&Job> {
        self.previous
            .and_then(|i| self.jobs.get(i))
            .or_else(|| self.current_job())
    }

    /// Resolves a `%`-prefixed job id against the table. Ambiguous name
    /// matches (more than one job starts with/contains the given name) are
    /// reported as `None`, same as "not found", since the spec's surface
    /// (`fg`/`bg`) only needs a single target or a diagnostic.
    pub fn resolve(&self, spec: &str) -> Option<&Job> {
        match parse_job_id(spec)? {
            JobId::Current => self.current_job(),
            JobId::Previous => self.previous_job(),
            JobId::Number(n) => self.jobs.iter().find(|j| j.id == n),
            JobId::NamePrefix(prefix) => find_unique(self.jobs.iter(), |j| j.display.starts_with(prefix)),
            JobId::NameSubstring(substring) => {
                find_unique(self.jobs.iter(), |j| j.display.contains(substring))
            }
        }
    }

    /// The default target for a bare `fg`/`bg` with no operand.
    pub fn most_recent(&self) -> Option<&Job> {
        self.current_job()
    }
}

fn find_unique<'a>(
    iter: impl Iterator<Item = &'a Job>,
    mut pred: impl FnMut(&Job) -> bool,
) -> Option<&'a Job> {
    let mut matches = iter.filter(|j| pred(j));
    let first = matches.next()?;
    match matches.next() {
        Some(_) => None,
        None => Some(first),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> Pid {
        Pid::from_raw(n)
    }

    #[test]
    fn ids_do_not_renumber_after_removal() {
        let mut jt = JobTable::new();
        let id1 = jt.add(pid(10), "sleep 1", true);
        let id2 = jt.add(pid(11), "sleep 2", true);
        jt.remove(pid(10));
        assert!(jt.find_by_pgid(pid(10)).is_none());
        assert_eq!(jt.find_by_pgid(pid(11)).unwrap().id, id2);
        assert_ne!(id1, id2);
    }

    #[test]
    fn resolve_current_and_previous() {
        let mut jt = JobTable::new();
        jt.add(pid(10), "first", true);
        jt.add(pid(11), "second", true);
        assert_eq!(jt.resolve("%+").unwrap().pgid, pid(11));
        assert_eq!(jt.resolve("%-").unwrap().pgid, pid(10));
    }

    #[test]
    fn resolve_by_number() {
        let mut jt = JobTable::new();
        jt.add(pid(10), "first", true);
        let id2 = jt.add(pid(11), "second", true);
        assert_eq!(jt.resolve(&format!("%{id2}")).unwrap().pgid, pid(11));
    }

    #[test]
    fn resolve_by_unique_name_prefix() {
        let mut jt = JobTable::new();
        jt.add(pid(10), "make build", true);
        jt.add(pid(11), "sleep 100", true);
        assert_eq!(jt.resolve("%make").unwrap().pgid, pid(10));
    }

    #[test]
    fn ambiguous_name_prefix_resolves_to_none() {
        let mut jt = JobTable::new();
        jt.add(pid(10), "make build", true);
        jt.add(pid(11), "make test", true);
        assert!(jt.resolve("%make").is_none());
    }

    #[test]
    fn resolve_by_name_substring() {
        let mut jt = JobTable::new();
        jt.add(pid(10), "find . -name foo", true);
        assert_eq!(jt.resolve("%?name").unwrap().pgid, pid(10));
    }

    #[test]
    fn parse_job_id_forms() {
        assert_eq!(parse_job_id("%"), Some(JobId::Current));
        assert_eq!(parse_job_id("%%"), Some(JobId::Current));
        assert_eq!(parse_job_id("%+"), Some(JobId::Current));
        assert_eq!(parse_job_id("%-"), Some(JobId::Previous));
        assert_eq!(parse_job_id("%3"), Some(JobId::Number(3)));
        assert_eq!(parse_job_id("%foo"), Some(JobId::NamePrefix("foo")));
        assert_eq!(parse_job_id("%?foo"), Some(JobId::NameSubstring("foo")));
        assert_eq!(parse_job_id("foo"), None);
    }
}
