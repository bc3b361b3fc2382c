// src/injection/mod.rs
//! Outbound packet injection
//!
//! Per-peer facades over the host transport. When direct transport access
//! is unavailable, sends queue on an [`OutboundQueue`] and move to a
//! successor injector atomically when the peer's connection object changes:
//!
//! ```text
//! application ──▶ ConnectionInjector::send
//!                      │
//!                      ├─ direct transport available → Transport::direct_send
//!                      └─ queued peer               → OutboundQueue
//!                                                         │
//!                               transfer_state ──────────▶ successor injector
//! ```

pub mod injector;
pub mod outbound_queue;

// Re-export commonly used types
pub use injector::{
    ConnectionInjector, DirectConnectionInjector, PeerSession, QueuedConnectionInjector,
    Transport,
};
pub use outbound_queue::{OutboundQueue, QueueStats, QueuedPacket};
