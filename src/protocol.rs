//! Wire protocol between coordinator and workers
//!
//! Two channels with fixed formats:
//!
//! - **Discovery (UDP)**: plaintext probe/reply strings on the shared
//!   discovery port.
//! - **Task (TCP)**: fixed-size binary payloads, one request/response pair
//!   per connection.
//!
//! # Message Flow
//!
//! ```text
//! Coordinator                     Worker
//!     |                              |
//!     |-- DISCOVER_SERVERS --------->|   (UDP broadcast)
//!     |<-- SERVER_READY:<port> ------|   (UDP unicast to sender)
//!     |                              |
//!     |-- [start, end, step] ------->|   (TCP, 24 bytes)
//!     |<-- result -------------------|   (TCP, 8 bytes, then close)
//! ```
//!
//! Task payloads are raw native-endian f64 values. Both ends are expected
//! to run on hosts with the same byte order.

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Discovery probe broadcast by the coordinator.
pub const DISCOVERY_PROBE: &str = "DISCOVER_SERVERS";

/// Prefix of a worker's discovery reply. The remainder is the decimal
/// task-channel port.
pub const READY_PREFIX: &str = "SERVER_READY:";

/// Encoded task request size: three f64 values.
pub const TASK_LEN: usize = 24;

/// Encoded task result size: one f64 value.
pub const RESULT_LEN: usize = 8;

/// Build the discovery reply advertising `task_port`.
pub fn ready_reply(task_port: u16) -> String {
    format!("{}{}", READY_PREFIX, task_port)
}

/// Parse a discovery reply, returning the advertised task port.
///
/// Returns `None` for any payload that is not exactly `SERVER_READY:<port>`
/// with a valid decimal port.
pub fn parse_ready_reply(payload: &str) -> Option<u16> {
    payload.strip_prefix(READY_PREFIX)?.parse().ok()
}

/// Encode a task request as [start, end, step] in host byte order.
pub fn encode_task(start: f64, end: f64, step: f64) -> [u8; TASK_LEN] {
    let mut buf = [0u8; TASK_LEN];
    buf[0..8].copy_from_slice(&start.to_ne_bytes());
    buf[8..16].copy_from_slice(&end.to_ne_bytes());
    buf[16..24].copy_from_slice(&step.to_ne_bytes());
    buf
}

/// Decode a task request encoded by [`encode_task`].
pub fn decode_task(buf: &[u8; TASK_LEN]) -> (f64, f64, f64) {
    (f64_at(buf, 0), f64_at(buf, 8), f64_at(buf, 16))
}

fn f64_at(buf: &[u8; TASK_LEN], offset: usize) -> f64 {
    let mut field = [0u8; 8];
    field.copy_from_slice(&buf[offset..offset + 8]);
    f64::from_ne_bytes(field)
}

/// Send a task request over an established task connection.
pub async fn write_task(stream: &mut TcpStream, start: f64, end: f64, step: f64) -> Result<()> {
    stream
        .write_all(&encode_task(start, end, step))
        .await
        .context("Failed to send task payload")?;

    stream.flush().await.context("Failed to flush task payload")?;

    Ok(())
}

/// Read exactly one task request from a task connection.
pub async fn read_task(stream: &mut TcpStream) -> Result<(f64, f64, f64)> {
    let mut buf = [0u8; TASK_LEN];
    stream
        .read_exact(&mut buf)
        .await
        .context("Failed to read task payload")?;

    Ok(decode_task(&buf))
}

/// Send a computed result back over the same connection.
pub async fn write_result(stream: &mut TcpStream, value: f64) -> Result<()> {
    stream
        .write_all(&value.to_ne_bytes())
        .await
        .context("Failed to send result")?;

    stream.flush().await.context("Failed to flush result")?;

    Ok(())
}

/// Read the result of a dispatched task.
///
/// A short read (the peer closed before sending 8 bytes) is an error, which
/// the dispatch loop treats as a transport failure.
pub async fn read_result(stream: &mut TcpStream) -> Result<f64> {
    let mut buf = [0u8; RESULT_LEN];
    stream
        .read_exact(&mut buf)
        .await
        .context("Failed to read result")?;

    Ok(f64::from_ne_bytes(buf))
}
