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

//! The variable store: a flat name→(value, exported) map plus the
//! pseudo-variables `$?`, `$$`, and `$!` that are synthesized on lookup
//! rather than stored.
//!
//! Invariant: whenever a variable's `exported` flag is true, the process
//! environment holds the same value under the same name. `export` and
//! assignment are the only two operations that touch the environment, and
//! both go through [`VariableStore::set`]/[`VariableStore::export`] to keep
//! the invariant.

use nix::unistd::getpid;
use std::collections::HashMap;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variable {
    pub value: String,
    pub exported: bool,
}

#[derive(Debug, Default)]
pub struct VariableStore {
    vars: HashMap<String, Variable>,
    /// Exit status of the last executed pipeline, shown as `$?`.
    pub last_status: i32,
    /// pgid of the most recently launched background pipeline, shown as
    /// `$!`. Zero before any background job has run.
    pub last_bg_pid: i32,
}

impl VariableStore {
    pub fn new() -> Self {
        VariableStore::default()
    }

    /// Assigns `name = value` without exporting it (plain `NAME=VALUE`).
    /// If the variable already exists and is exported, the environment is
    /// kept in sync since the invariant must hold continuously.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        let exported = self.vars.get(name).map(|v| v.exported).unwrap_or(false);
        if exported {
            std::env::set_var(name, &value);
        }
        self.vars.insert(name.to_string(), Variable { value, exported });
    }

    /// Marks an existing variable exported and syncs it to the environment.
    /// Returns `false` if no such variable exists (the caller — `export` —
    /// silently ignores unknown names per spec).
    pub fn export_existing(&mut self, name: &str) -> bool {
        match self.vars.get_mut(name) {
            Some(v) => {
                v.exported = true;
                std::env::set_var(name, &v.value);
                true
            }
            None => false,
        }
    }

    /// Assigns and exports in one step (`export NAME=VALUE`).
    pub fn set_exported(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        std::env::set_var(name, &value);
        self.vars
            .insert(name.to_string(), Variable { value, exported: true });
    }

    /// Looks up a variable's value, consulting (in order) the special
    /// pseudo-variables, the shell's own store, then the process
    /// environment. Returns `None` only when nothing at all is found,
    /// which the expander treats as the empty string.
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "?" => return Some(self.last_status.to_string()),
            "$" => return Some(getpid().to_string()),
            "!" => {
                return Some(if self.last_bg_pid == 0 {
                    String::new()
                } else {
                    self.last_bg_pid.to_string()
                })
            }
            _ => {}
        }
        if let Some(v) = self.vars.get(name) {
            return Some(v.value.clone());
        }
        std::env::var(name).ok()
    }

    pub fn exported(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars
            .iter()
            .filter(|(_, v)| v.exported)
            .map(|(k, v)| (k.as_str(), v.value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_set_does_not_export() {
        let mut vs = VariableStore::new();
        vs.set("FOO", "bar");
        assert_eq!(vs.get("FOO").as_deref(), Some("bar"));
        assert!(std::env::var("FOO_UNEXPORTED_TEST").is_err());
    }

    #[test]
    fn export_existing_syncs_environment() {
        let mut vs = VariableStore::new();
        vs.set("SESH_TEST_EXPORT_EXISTING", "v1");
        assert!(vs.export_existing("SESH_TEST_EXPORT_EXISTING"));
        assert_eq!(
            std::env::var("SESH_TEST_EXPORT_EXISTING").as_deref(),
            Ok("v1")
        );
        std::env::remove_var("SESH_TEST_EXPORT_EXISTING");
    }

    #[test]
    fn export_unknown_name_is_noop() {
        let mut vs = VariableStore::new();
        assert!(!vs.export_existing("SESH_TEST_DOES_NOT_EXIST"));
    }

    #[test]
    fn pseudo_variables_are_synthesized() {
        let mut vs = VariableStore::new();
        vs.last_status = 7;
        assert_eq!(vs.get("?").as_deref(), Some("7"));
        assert_eq!(vs.get("$").as_deref(), Some(getpid().to_string().as_str()));
    }

    #[test]
    fn falls_back_to_process_environment() {
        std::env::set_var("SESH_TEST_ENV_FALLBACK", "from-env");
        let vs = VariableStore::new();
        assert_eq!(vs.get("SESH_TEST_ENV_FALLBACK").as_deref(), Some("from-env"));
        std::env::remove_var("SESH_TEST_ENV_FALLBACK");
    }
}
