//! Wire protocol spoken by the diagnostic agent.
//!
//! A request is a single signal byte optionally followed by a payload. The agent
//! writes its answer and closes the connection.

use std::net::SocketAddr;

use crate::prelude::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    StackTrace = 0x1,
    Gc = 0x2,
    MemStats = 0x3,
    Version = 0x4,
    HeapProfile = 0x5,
    CpuProfile = 0x6,
    Stats = 0x7,
    Trace = 0x8,
    BinaryDump = 0x9,
    SetGcPercent = 0x10,
}

/// One round trip to the agent listening on `addr`
pub async fn request(addr: SocketAddr, signal: Signal, payload: &[u8]) -> Result<Vec<u8>> {
    debug!("Sending {signal:?} to agent at {addr}");
    let mut stream = TcpStream::connect(addr)
        .await
        .context(format!("Failed to connect to agent at {addr}"))?;

    let mut message = Vec::with_capacity(1 + payload.len());
    message.push(signal as u8);
    message.extend_from_slice(payload);
    stream
        .write_all(&message)
        .await
        .context("Failed to send the request to the agent")?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .await
        .context("Failed to read the agent response")?;
    debug!("Agent answered with {} bytes", response.len());

    Ok(response)
}

/// Signed varint, zig-zag mapped then LEB128 encoded like Go's `binary.PutVarint`
pub fn encode_varint(value: i64) -> Result<Vec<u8>> {
    let zigzag = ((value << 1) ^ (value >> 63)) as u64;
    let mut buf = Vec::new();
    gimli::leb128::write::unsigned(&mut buf, zigzag)?;
    Ok(buf)
}


#[cfg(test)]
mod tests {
    use super::testing::fake_agent;
    use super::*;

    #[tokio::test]
    async fn test_request_round_trip() {
        let (addr, agent) = fake_agent(1, b"go1.22.1\n".to_vec()).await;

        let response = request(addr, Signal::Version, &[]).await.unwrap();
        assert_eq!(response, b"go1.22.1\n");
        assert_eq!(agent.await.unwrap(), vec![0x4]);
    }

    #[tokio::test]
    async fn test_request_sends_payload_after_signal() {
        let response = b"New GC percent set to 100. Previous value was 50.\n".to_vec();
        let (addr, agent) = fake_agent(3, response).await;

        let payload = encode_varint(100).unwrap();
        request(addr, Signal::SetGcPercent, &payload).await.unwrap();
        assert_eq!(agent.await.unwrap(), vec![0x10, 0xc8, 0x01]);
    }

    #[tokio::test]
    async fn test_request_to_closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = request(addr, Signal::StackTrace, &[]).await.unwrap_err();
        assert_eq!(err.to_string(), format!("Failed to connect to agent at {addr}"));
    }

    #[test]
    fn test_encode_varint_matches_go() {
        assert_eq!(encode_varint(0).unwrap(), vec![0x00]);
        assert_eq!(encode_varint(-1).unwrap(), vec![0x01]);
        assert_eq!(encode_varint(1).unwrap(), vec![0x02]);
        assert_eq!(encode_varint(100).unwrap(), vec![0xc8, 0x01]);
        assert_eq!(encode_varint(-100).unwrap(), vec![0xc7, 0x01]);
    }
}
