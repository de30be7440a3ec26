//! Diagnostics of a single process.

#[cfg(target_os = "linux")]
mod connections;

use std::fmt;
use std::io::Write;
use std::net::SocketAddr;

use crate::prelude::*;
use crate::process::Pid;
use sysinfo::{
    MemoryRefreshKind, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System, UpdateKind,
    Users,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub local: SocketAddr,
    pub remote: SocketAddr,
    pub status: String,
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} <-> {}:{} ({})",
            self.local.ip(),
            self.local.port(),
            self.remote.ip(),
            self.remote.port(),
            self.status
        )
    }
}

/// Per-field queries about one process. Any field may be unavailable.
pub trait ProcessInfo {
    fn parent_pid(&self) -> Result<Pid>;
    fn num_threads(&self) -> Result<u64>;
    fn memory_percent(&self) -> Result<f64>;
    fn cpu_percent(&self) -> Result<f64>;
    fn username(&self) -> Result<String>;
    fn cmdline(&self) -> Result<Vec<String>>;
    fn connections(&self) -> Result<Vec<Connection>>;
}

/// Live process read through sysinfo, with procfs for what sysinfo lacks
pub struct SystemProcessInfo {
    pid: Pid,
    system: System,
    users: Users,
}

impl SystemProcessInfo {
    pub fn new(pid: Pid) -> Result<Self> {
        let sys_pid = sysinfo::Pid::from_u32(pid);
        let mut system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::nothing().with_ram()),
        );
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_user(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );
        ensure!(
            system.process(sys_pid).is_some(),
            "Cannot read process info: process {pid} not found"
        );

        // CPU usage is the delta between two refreshes
        std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[sys_pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu(),
        );

        Ok(Self {
            pid,
            system,
            users: Users::new_with_refreshed_list(),
        })
    }

    fn process(&self) -> Result<&sysinfo::Process> {
        self.system
            .process(sysinfo::Pid::from_u32(self.pid))
            .ok_or_else(|| anyhow!("process {} exited", self.pid))
    }
}

impl ProcessInfo for SystemProcessInfo {
    fn parent_pid(&self) -> Result<Pid> {
        self.process()?
            .parent()
            .map(|parent| parent.as_u32())
            .ok_or_else(|| anyhow!("process {} has no parent", self.pid))
    }

    #[cfg(target_os = "linux")]
    fn num_threads(&self) -> Result<u64> {
        let stat = procfs::process::Process::new(self.pid as i32)?.stat()?;
        Ok(u64::try_from(stat.num_threads)?)
    }

    #[cfg(not(target_os = "linux"))]
    fn num_threads(&self) -> Result<u64> {
        bail!("thread count is only read on Linux")
    }

    fn memory_percent(&self) -> Result<f64> {
        let total = self.system.total_memory();
        ensure!(total > 0, "total memory is unknown");
        Ok(self.process()?.memory() as f64 * 100.0 / total as f64)
    }

    fn cpu_percent(&self) -> Result<f64> {
        Ok(f64::from(self.process()?.cpu_usage()))
    }

    fn username(&self) -> Result<String> {
        let uid = self
            .process()?
            .user_id()
            .ok_or_else(|| anyhow!("owner of process {} is unknown", self.pid))?;
        self.users
            .get_user_by_id(uid)
            .map(|user| user.name().to_string())
            .ok_or_else(|| anyhow!("no user with id {uid:?}"))
    }

    fn cmdline(&self) -> Result<Vec<String>> {
        let cmd = self.process()?.cmd();
        ensure!(!cmd.is_empty(), "command line of process {} is empty", self.pid);
        Ok(cmd
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect())
    }

    #[cfg(target_os = "linux")]
    fn connections(&self) -> Result<Vec<Connection>> {
        connections::process_connections(self.pid)
    }

    #[cfg(not(target_os = "linux"))]
    fn connections(&self) -> Result<Vec<Connection>> {
        bail!("connections are only read on Linux")
    }
}

/// Keep the value, or log why the field is left out
fn field<T>(label: &str, value: Result<T>) -> Option<T> {
    value
        .map_err(|e| debug!("Skipping {label}: {e:#}"))
        .ok()
}

pub fn print_process_info(out: &mut impl Write, info: &dyn ProcessInfo) -> Result<()> {
    if let Some(ppid) = field("parent PID", info.parent_pid()) {
        writeln!(out, "parent PID:\t{ppid}")?;
    }
    if let Some(threads) = field("threads", info.num_threads()) {
        writeln!(out, "threads:\t{threads}")?;
    }
    if let Some(memory) = field("memory usage", info.memory_percent()) {
        writeln!(out, "memory usage:\t{memory:.3}%")?;
    }
    if let Some(cpu) = field("cpu usage", info.cpu_percent()) {
        writeln!(out, "cpu usage:\t{cpu:.3}%")?;
    }
    if let Some(username) = field("username", info.username()) {
        writeln!(out, "username:\t{username}")?;
    }
    if let Some(cmdline) = field("cmd+args", info.cmdline()) {
        writeln!(out, "cmd+args:\t{}", cmdline.join(" "))?;
    }
    for connection in field("connections", info.connections()).unwrap_or_default() {
        writeln!(out, "local/remote:\t{connection}")?;
    }
    Ok(())
}
