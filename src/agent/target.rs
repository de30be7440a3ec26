use std::net::{SocketAddr, ToSocketAddrs};
use std::path::Path;

use super::discovery;
use crate::prelude::*;
use crate::process::{self, NameMatch, Pid, ProcessSource};

/// Maps a command line target (address, PID or exec name) to the agent address
pub struct TargetResolver<'a> {
    pub agent_dir: &'a Path,
    pub agent_host: &'a str,
    pub prefix: &'a str,
    pub source: &'a dyn ProcessSource,
}

fn first_addr(addrs: impl ToSocketAddrs, target: &str) -> Result<SocketAddr> {
    addrs
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| anyhow!("no address found for {target}"))
}

impl TargetResolver<'_> {
    pub fn resolve(&self, target: &str) -> Result<SocketAddr> {
        if target.contains(':') {
            return first_addr(target, target);
        }

        let pid = match target.parse::<Pid>() {
            Ok(pid) => pid,
            Err(_) => self.pid_by_name(target)?,
        };
        let port = discovery::read_port(self.agent_dir, pid)?;
        debug!("Agent of process {pid} listens on port {port}");
        first_addr((self.agent_host, port), target)
    }

    fn pid_by_name(&self, name: &str) -> Result<Pid> {
        let family = process::filter_family(self.source.processes(), self.prefix);
        match process::index_by_name(&family).get(name) {
            Some(NameMatch::Unique(pid)) => Ok(*pid),
            Some(NameMatch::Ambiguous) => {
                bail!("several processes are named {name}, use a PID instead")
            }
            None => bail!("no {} process named {name}", self.prefix),
        }
    }
}
