//! Worker service
//!
//! Runs two independent responders for the life of the process:
//!
//! - a **UDP discovery responder** on the shared discovery port, answering
//!   coordinator probes with the advertised task port;
//! - a **TCP task server** accepting one connection at a time, computing
//!   exactly one segment per connection.
//!
//! The two share nothing beyond the port numbers fixed at startup. The task
//! port is drawn pseudo-randomly from a small configured range so workers
//! co-located on one host do not collide.

pub mod compute;

use crate::config::WorkerConfig;
use crate::protocol;
use anyhow::{Context, Result};
use rand::Rng;
use tokio::net::{TcpListener, TcpStream, UdpSocket};

/// Random port draws attempted before giving up on the task range.
const BIND_ATTEMPTS: u32 = 16;

/// Worker service
///
/// Binds its ports, then runs both responders until the process exits.
pub struct WorkerService {
    config: WorkerConfig,
    integrand: compute::Integrand,
}

impl WorkerService {
    /// Create a worker computing the reference integrand f(x) = x².
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config,
            integrand: compute::square,
        }
    }

    /// Run the discovery responder and task server until one of them fails.
    ///
    /// Both loops run forever on a healthy worker; returning means a fatal
    /// setup or accept error in one of them.
    pub async fn run(self) -> Result<()> {
        let listener =
            bind_task_listener(self.config.network.task_port_min, self.config.network.task_port_max)
                .await?;
        let task_port = listener
            .local_addr()
            .context("Failed to read task listener address")?
            .port();

        let discovery_port = self.config.network.discovery_port;
        let discovery_socket = UdpSocket::bind(("0.0.0.0", discovery_port))
            .await
            .with_context(|| format!("Failed to bind discovery port {}", discovery_port))?;

        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown-host".to_string());
        println!(
            "Worker {} ready: task port {}, discovery port {}",
            host, task_port, discovery_port
        );

        let quiet = self.config.quiet;
        let discovery = tokio::spawn(run_discovery_responder(discovery_socket, task_port, quiet));
        let tasks = tokio::spawn(run_task_server(listener, self.integrand, quiet));

        tokio::select! {
            res = discovery => res.context("Discovery responder terminated")??,
            res = tasks => res.context("Task server terminated")??,
        }

        Ok(())
    }
}

/// Bind the task listener on a random port from the configured range.
///
/// Retries with a fresh draw when the port is already taken.
async fn bind_task_listener(port_min: u16, port_max: u16) -> Result<TcpListener> {
    for _ in 0..BIND_ATTEMPTS {
        let port = rand::thread_rng().gen_range(port_min..=port_max);

        match TcpListener::bind(("0.0.0.0", port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to bind task port {}", port));
            }
        }
    }

    anyhow::bail!(
        "No free task port in {}..={} after {} attempts",
        port_min,
        port_max,
        BIND_ATTEMPTS
    )
}

/// Answer discovery probes with the advertised task port, forever.
///
/// Anything other than the exact probe string is ignored. Receive and send
/// errors are logged and skipped; only losing the socket ends the loop.
pub(crate) async fn run_discovery_responder(
    socket: UdpSocket,
    task_port: u16,
    quiet: bool,
) -> Result<()> {
    let reply = protocol::ready_reply(task_port);
    let mut buf = [0u8; 256];

    loop {
        let (len, sender) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                eprintln!("Warning: discovery receive failed: {}", e);
                continue;
            }
        };

        let payload = String::from_utf8_lossy(&buf[..len]);
        if payload != protocol::DISCOVERY_PROBE {
            continue;
        }

        if !quiet {
            println!("Discovery probe from {}, replying {}", sender, reply);
        }

        if let Err(e) = socket.send_to(reply.as_bytes(), sender).await {
            eprintln!("Warning: discovery reply to {} failed: {}", sender, e);
        }
    }
}

/// Accept task connections one at a time, each carrying exactly one segment.
///
/// A failed exchange only loses that connection; the coordinator sees the
/// transport error and reassigns the segment elsewhere.
pub(crate) async fn run_task_server(
    listener: TcpListener,
    integrand: compute::Integrand,
    quiet: bool,
) -> Result<()> {
    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept task connection")?;

        if let Err(e) = serve_task(&mut stream, integrand, quiet).await {
            eprintln!("Warning: task from {} failed: {}", peer, e);
        }
        // The connection closes on drop; the coordinator opens a new one
        // per segment.
    }
}

async fn serve_task(
    stream: &mut TcpStream,
    integrand: compute::Integrand,
    quiet: bool,
) -> Result<()> {
    let (start, end, step) = protocol::read_task(stream).await?;
    let result = compute::integrate(integrand, start, end, step);

    if !quiet {
        println!(
            "Task [{}, {}) step {} -> {}",
            start, end, step, result
        );
    }

    protocol::write_result(stream, result).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_task_server_computes_segment() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_task_server(listener, compute::square, true));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        protocol::write_task(&mut stream, 1.0, 2.0, 1.0).await.unwrap();

        assert_eq!(protocol::read_result(&mut stream).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_task_server_survives_bad_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(run_task_server(listener, compute::square, true));

        // First client connects and leaves without sending a full task.
        let broken = TcpStream::connect(addr).await.unwrap();
        drop(broken);

        // The server still answers the next client.
        let mut stream = TcpStream::connect(addr).await.unwrap();
        protocol::write_task(&mut stream, 0.0, 2.0, 1.0).await.unwrap();

        assert_eq!(protocol::read_result(&mut stream).await.unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_discovery_responder_answers_probe() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let responder_addr = socket.local_addr().unwrap();
        tokio::spawn(run_discovery_responder(socket, 9004, true));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client
            .send_to(protocol::DISCOVERY_PROBE.as_bytes(), responder_addr)
            .await
            .unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), client.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(&buf[..len], b"SERVER_READY:9004");
    }

    #[tokio::test]
    async fn test_discovery_responder_ignores_other_payloads() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let responder_addr = socket.local_addr().unwrap();
        tokio::spawn(run_discovery_responder(socket, 9004, true));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"HELLO", responder_addr).await.unwrap();

        let mut buf = [0u8; 256];
        let reply = tokio::time::timeout(Duration::from_millis(200), client.recv_from(&mut buf)).await;

        assert!(reply.is_err(), "garbage datagram must not draw a reply");
    }

    #[tokio::test]
    async fn test_bind_task_listener_stays_in_range() {
        let listener = bind_task_listener(45702, 45708).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!((45702..=45708).contains(&port));
    }

    #[tokio::test]
    async fn test_bind_task_listener_avoids_taken_port() {
        // Occupy one port of a two-port range; the draw must settle on the
        // other one.
        let taken = TcpListener::bind("0.0.0.0:45712").await.unwrap();
        let listener = bind_task_listener(45712, 45713).await.unwrap();

        assert_eq!(listener.local_addr().unwrap().port(), 45713);
        drop(taken);
    }
}
