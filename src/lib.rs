//! Quadnet - distributed numerical integration
//!
//! Quadnet computes a definite integral by spreading range segments across
//! worker processes discovered dynamically on the local network.
//!
//! # Architecture
//!
//! - **Discovery**: one UDP broadcast probe, bounded reply window
//! - **Registry**: mutex-guarded worker set shared by every activity
//! - **Liveness monitor**: periodic sweep evicting silent workers
//! - **Dispatch**: strictly sequential segment loop with eviction-and-retry
//! - **Worker**: discovery responder plus a one-at-a-time task server

pub mod config;
pub mod coordinator;
pub mod output;
pub mod protocol;
pub mod registry;
pub mod segment;
pub mod worker;

// Re-export commonly used types
pub use coordinator::Coordinator;
pub use registry::{WorkerRecord, WorkerRegistry};
pub use worker::WorkerService;

/// Result type used throughout quadnet
pub type Result<T> = anyhow::Result<T>;
