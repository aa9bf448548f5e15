//! Process table inspection

use sysinfo::{ProcessRefreshKind, System};

/// Answers whether a process matching a name substring is currently running.
///
/// Implementations must reflect the live process table at call time; the sync
/// loop calls this at the top of every tick for both dependencies.
pub trait ProcessProbe: Send {
    fn is_running(&mut self, name_substring: &str) -> bool;
}

/// Probe backed by the OS process table via sysinfo
pub struct SystemProbe {
    system: System,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SystemProbe {
    fn is_running(&mut self, name_substring: &str) -> bool {
        // Names only; CPU/memory refresh would be wasted work at this rate
        self.system
            .refresh_processes_specifics(ProcessRefreshKind::new());
        self.system
            .processes()
            .values()
            .any(|process| name_matches(process.name(), name_substring))
    }
}

/// Case-insensitive substring match on a process name
fn name_matches(process_name: &str, needle: &str) -> bool {
    process_name
        .to_lowercase()
        .contains(&needle.to_lowercase())
}
