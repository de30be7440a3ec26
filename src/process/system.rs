use std::path::{Path, PathBuf};

use super::{ProcessRecord, ProcessSource, buildinfo};
use crate::agent::discovery;
use crate::prelude::*;
use sysinfo::{ProcessRefreshKind, RefreshKind, System, UpdateKind};

/// Process table of the running host, read through sysinfo.
///
/// Executable probing (build version, agent port file) only happens for processes
/// whose name starts with `probe_prefix`, the others keep empty metadata. A probed
/// process without Go build info is not a Go program and is left out.
pub struct SystemProcessSource {
    agent_dir: PathBuf,
    probe_prefix: String,
}

impl SystemProcessSource {
    pub fn new(agent_dir: impl Into<PathBuf>, probe_prefix: impl Into<String>) -> Self {
        Self {
            agent_dir: agent_dir.into(),
            probe_prefix: probe_prefix.into(),
        }
    }

    fn build_version(&self, exe: Option<&Path>) -> Option<String> {
        let exe = exe?;
        buildinfo::read_go_version(exe)
            .map_err(|e| trace!("Skipping {}, no Go build info: {e:#}", exe.display()))
            .ok()
    }
}

impl ProcessSource for SystemProcessSource {
    fn processes(&self) -> Vec<ProcessRecord> {
        let system = System::new_with_specifics(RefreshKind::nothing().with_processes(
            ProcessRefreshKind::nothing().with_exe(UpdateKind::OnlyIfNotSet),
        ));

        let mut records: Vec<ProcessRecord> = system
            .processes()
            .values()
            // On Linux, sysinfo lists threads next to their process
            .filter(|p| p.thread_kind().is_none())
            .filter_map(|p| {
                let pid = p.pid().as_u32();
                let exec_name = p.name().to_string_lossy().into_owned();
                let exe = p.exe();
                let probed = exec_name.starts_with(&self.probe_prefix);
                let build_version = if probed {
                    self.build_version(exe)?
                } else {
                    String::new()
                };

                Some(ProcessRecord {
                    pid,
                    ppid: p.parent().map(|parent| parent.as_u32()).unwrap_or(0),
                    path: exe
                        .map(|path| path.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    build_version,
                    is_agent: probed && discovery::has_agent(&self.agent_dir, pid),
                    exec_name,
                })
            })
            .collect();

        // Same order as `ps`, the process table itself is unordered
        records.sort_by_key(|p| p.pid);
        debug!("Enumerated {} processes", records.len());
        records
    }
}
