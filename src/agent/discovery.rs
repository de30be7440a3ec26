//! Agents advertise their TCP port in a file named after their PID.

use std::fs;
use std::path::{Path, PathBuf};

use crate::prelude::*;
use crate::process::Pid;

pub fn port_file(agent_dir: &Path, pid: Pid) -> PathBuf {
    agent_dir.join(pid.to_string())
}

pub fn has_agent(agent_dir: &Path, pid: Pid) -> bool {
    port_file(agent_dir, pid).is_file()
}

pub fn read_port(agent_dir: &Path, pid: Pid) -> Result<u16> {
    let path = port_file(agent_dir, pid);
    let content = fs::read_to_string(&path)
        .context(format!("No agent port file for process {pid} at {}", path.display()))?;
    content
        .trim()
        .parse()
        .context(format!("Invalid agent port in {}", path.display()))
}
