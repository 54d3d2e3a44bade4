//! Best-effort bookkeeping of detached node processes.
//!
//! A launched node outlives the handle that spawned it, so termination works
//! from a process-table scan keyed by process name and port rather than by
//! PID. A matching process may already be gone, or an unrelated process may
//! share the name, so termination is not guaranteed to happen exactly once.

use std::sync::{Mutex, PoisonError};

use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};

/// Identity of a node process, as far as a process-table scan can tell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisteredProcess {
    /// Binary name, matched against the process name and its command line.
    pub name: String,
    /// Port the node listens on, matched against the command line when set.
    pub port: Option<u16>,
}

impl RegisteredProcess {
    pub fn new(name: impl Into<String>, port: Option<u16>) -> Self {
        let name = name.into();
        // Keep only the file name so `/usr/local/bin/starknet-devnet` matches `starknet-devnet`.
        let name = std::path::Path::new(&name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(name);
        Self { name, port }
    }

    /// Whether a process with this name and command line is this node.
    pub fn matches(&self, process_name: &str, cmdline: &str) -> bool {
        if self.name.is_empty() {
            return false;
        }

        let name_match = process_name == self.name || cmdline.contains(&self.name);
        let port_match = match self.port {
            Some(port) => cmdline
                .split_whitespace()
                .any(|arg| arg == port.to_string() || arg == format!("--port={port}")),
            None => true,
        };

        name_match && port_match
    }
}

/// Registry of node processes started by this program.
#[derive(Debug, Default)]
pub struct ProcessRegistry {
    entries: Mutex<Vec<RegisteredProcess>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a launched process.
    pub fn register(&self, process: RegisteredProcess) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if !entries.contains(&process) {
            tracing::debug!(name = %process.name, port = ?process.port, "Registered node process");
            entries.push(process);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Signal every process matching a registered entry, then forget the entries.
    ///
    /// Returns the number of processes that accepted the kill signal.
    pub fn terminate_all(&self) -> usize {
        let entries =
            std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner));
        entries.iter().map(terminate_matching).sum()
    }
}

/// Kill every process matching `target`, returning how many were signalled.
pub fn terminate_matching(target: &RegisteredProcess) -> usize {
    let mut system = System::new();
    system.refresh_processes_specifics(
        ProcessesToUpdate::All,
        true,
        ProcessRefreshKind::nothing().with_cmd(UpdateKind::Always),
    );

    let own_pid = sysinfo::get_current_pid().ok();
    let mut killed = 0;

    for (pid, process) in system.processes() {
        if Some(*pid) == own_pid {
            continue;
        }

        let process_name = process.name().to_string_lossy();
        let cmdline = process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        if !target.matches(&process_name, &cmdline) {
            continue;
        }

        if process.kill() {
            tracing::info!(pid = %pid, name = %target.name, "Terminated node process");
            killed += 1;
        } else {
            tracing::warn!(pid = %pid, name = %target.name, "Failed to terminate node process");
        }
    }

    if killed == 0 {
        tracing::debug!(name = %target.name, port = ?target.port, "No matching node process found");
    }

    killed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_by_name_and_port() {
        let target = RegisteredProcess::new("starknet-devnet", Some(5050));

        assert!(target.matches(
            "starknet-devnet",
            "starknet-devnet --host 127.0.0.1 --port 5050 --seed 42"
        ));
        assert!(!target.matches(
            "starknet-devnet",
            "starknet-devnet --host 127.0.0.1 --port 5051"
        ));
        assert!(!target.matches("python3", "python3 -m http.server 5050"));
    }

    #[test]
    fn test_matches_interpreter_hosted_binary() {
        // `pkill -f` semantics: the name may only appear in the command line.
        let target = RegisteredProcess::new("/usr/local/bin/starknet-devnet", None);
        assert_eq!(target.name, "starknet-devnet");
        assert!(target.matches("python3", "python3 /usr/local/bin/starknet-devnet --port 5050"));
    }

    #[test]
    fn test_register_deduplicates_and_terminate_clears() {
        let registry = ProcessRegistry::new();
        assert!(registry.is_empty());

        let target = RegisteredProcess::new("starkup-test-node-that-never-runs", Some(1));
        registry.register(target.clone());
        registry.register(target);
        assert_eq!(registry.entries.lock().unwrap().len(), 1);

        assert_eq!(registry.terminate_all(), 0);
        assert!(registry.is_empty());
    }
}
