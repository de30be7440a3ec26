//! Sockets owned by a process, matched through procfs socket inodes.

use std::collections::HashSet;

use super::Connection;
use crate::prelude::*;
use crate::process::Pid;
use procfs::net::TcpState;
use procfs::process::{FDTarget, Process};

/// UDP sockets have no connection state
const UDP_STATUS: &str = "NONE";

/// Socket state names as printed by netstat
fn tcp_status(state: &TcpState) -> &'static str {
    match state {
        TcpState::Established => "ESTABLISHED",
        TcpState::SynSent => "SYN_SENT",
        TcpState::SynRecv => "SYN_RECV",
        TcpState::FinWait1 => "FIN_WAIT1",
        TcpState::FinWait2 => "FIN_WAIT2",
        TcpState::TimeWait => "TIME_WAIT",
        TcpState::Close => "CLOSE",
        TcpState::CloseWait => "CLOSE_WAIT",
        TcpState::LastAck => "LAST_ACK",
        TcpState::Listen => "LISTEN",
        TcpState::Closing => "CLOSING",
        TcpState::NewSynRecv => "NEW_SYN_RECV",
    }
}

/// A missing table (IPv6 disabled for instance) only means no sockets of that kind
fn table<T>(name: &str, entries: procfs::ProcResult<Vec<T>>) -> Vec<T> {
    entries.unwrap_or_else(|e| {
        debug!("Cannot read the {name} socket table: {e}");
        Vec::new()
    })
}

pub fn process_connections(pid: Pid) -> Result<Vec<Connection>> {
    let process = Process::new(pid as i32).context(format!("Cannot open process {pid}"))?;
    let inodes: HashSet<u64> = process
        .fd()
        .context("Cannot list file descriptors")?
        .filter_map(|fd| fd.ok())
        .filter_map(|fd| match fd.target {
            FDTarget::Socket(inode) => Some(inode),
            _ => None,
        })
        .collect();

    let tcp = table("tcp", process.tcp())
        .into_iter()
        .chain(table("tcp6", process.tcp6()))
        .filter(|entry| inodes.contains(&entry.inode))
        .map(|entry| Connection {
            local: entry.local_address,
            remote: entry.remote_address,
            status: tcp_status(&entry.state).to_string(),
        });

    let udp = table("udp", process.udp())
        .into_iter()
        .chain(table("udp6", process.udp6()))
        .filter(|entry| inodes.contains(&entry.inode))
        .map(|entry| Connection {
            local: entry.local_address,
            remote: entry.remote_address,
            status: UDP_STATUS.to_string(),
        });

    Ok(tcp.chain(udp).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::net::{TcpListener, UdpSocket};

    #[rstest]
    #[case(TcpState::Established, "ESTABLISHED")]
    #[case(TcpState::SynSent, "SYN_SENT")]
    #[case(TcpState::FinWait1, "FIN_WAIT1")]
    #[case(TcpState::TimeWait, "TIME_WAIT")]
    #[case(TcpState::CloseWait, "CLOSE_WAIT")]
    #[case(TcpState::LastAck, "LAST_ACK")]
    fn test_tcp_status_names(#[case] state: TcpState, #[case] expected: &str) {
        assert_eq!(tcp_status(&state), expected);
    }

    #[test]
    fn test_finds_own_sockets() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let udp = UdpSocket::bind("127.0.0.1:0").unwrap();

        let connections = process_connections(std::process::id()).unwrap();
        assert!(connections.contains(&Connection {
            local: listener.local_addr().unwrap(),
            remote: "0.0.0.0:0".parse().unwrap(),
            status: "LISTEN".to_string(),
        }));
        assert!(
            connections
                .iter()
                .any(|c| c.local == udp.local_addr().unwrap() && c.status == UDP_STATUS)
        );
    }
}
