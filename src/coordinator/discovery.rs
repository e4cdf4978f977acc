//! Worker discovery
//!
//! One broadcast probe, then a bounded collection window. Every valid reply
//! registers its sender; replies arriving after the window closes are
//! ignored. Discovery is the only writer that adds workers; the registry
//! otherwise only shrinks.

use crate::protocol;
use crate::registry::WorkerRegistry;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// Broadcast the probe and collect replies until `window` elapses.
///
/// Each new (address, task port) pair goes into `registry`; duplicates are
/// ignored. Returns the number of workers registered by this call. Socket
/// setup and send errors are fatal to the run.
pub async fn discover(
    registry: &WorkerRegistry,
    probe_addr: SocketAddr,
    window: Duration,
    quiet: bool,
) -> Result<usize> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))
        .await
        .context("Failed to bind discovery socket")?;
    socket
        .set_broadcast(true)
        .context("Failed to enable broadcast")?;

    socket
        .send_to(protocol::DISCOVERY_PROBE.as_bytes(), probe_addr)
        .await
        .with_context(|| format!("Failed to send discovery probe to {}", probe_addr))?;

    if !quiet {
        println!("Discovery probe sent to {}", probe_addr);
    }

    let deadline = Instant::now() + window;
    let mut buf = [0u8; 256];
    let mut registered = 0;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let (len, sender) = match timeout(remaining, socket.recv_from(&mut buf)).await {
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                eprintln!("Warning: discovery receive failed: {}", e);
                continue;
            }
            Err(_) => break, // window closed
        };

        let payload = String::from_utf8_lossy(&buf[..len]);
        let task_port = match protocol::parse_ready_reply(&payload) {
            Some(port) => port,
            None => continue, // not a worker reply
        };

        let endpoint = SocketAddr::new(sender.ip(), task_port);
        if let Some(id) = registry.insert_if_absent(endpoint) {
            registered += 1;
            if !quiet {
                println!("  Discovered worker {} at {}", id, endpoint);
            }
        }
    }

    Ok(registered)
}
