use std::collections::HashMap;

pub mod buildinfo;
mod system;

pub use system::SystemProcessSource;

pub type Pid = u32;

/// One process as seen at snapshot time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRecord {
    pub pid: Pid,
    /// Reported parent, `0` when the process has none
    pub ppid: Pid,
    pub exec_name: String,
    /// Full executable path, empty when it cannot be read
    pub path: String,
    /// Toolchain version the executable was built with, empty when unknown
    pub build_version: String,
    /// Whether the process runs a diagnostic agent
    pub is_agent: bool,
}

/// Enumerates the processes of the host
pub trait ProcessSource {
    fn processes(&self) -> Vec<ProcessRecord>;
}

/// Keep only the processes whose exec name starts with `prefix`, preserving order
pub fn filter_family(processes: Vec<ProcessRecord>, prefix: &str) -> Vec<ProcessRecord> {
    processes
        .into_iter()
        .filter(|p| p.exec_name.starts_with(prefix))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    Unique(Pid),
    Ambiguous,
}

/// Map every exec name to its PID, remembering names carried by several processes
pub fn index_by_name(processes: &[ProcessRecord]) -> HashMap<&str, NameMatch> {
    let mut names = HashMap::new();
    for p in processes {
        names
            .entry(p.exec_name.as_str())
            .and_modify(|m| *m = NameMatch::Ambiguous)
            .or_insert(NameMatch::Unique(p.pid));
    }
    names
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn record(pid: Pid, ppid: Pid, exec_name: &str) -> ProcessRecord {
        ProcessRecord {
            pid,
            ppid,
            exec_name: exec_name.to_string(),
            path: format!("/usr/local/bin/{exec_name}"),
            build_version: "go1.22.1".to_string(),
            is_agent: false,
        }
    }

    pub fn agent(pid: Pid, ppid: Pid, exec_name: &str) -> ProcessRecord {
        ProcessRecord {
            is_agent: true,
            ..record(pid, ppid, exec_name)
        }
    }

    pub struct StaticSource(pub Vec<ProcessRecord>);

    impl ProcessSource for StaticSource {
        fn processes(&self) -> Vec<ProcessRecord> {
            self.0.clone()
        }
    }
}
