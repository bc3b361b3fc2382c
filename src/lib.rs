// src/lib.rs
//! Packetgate Interception Library
//!
//! This library provides a packet-level interception layer that sits
//! between a network peer's packet decoder/encoder and a host application's
//! packet-handling pipeline.
//!
//! # Architecture
//!
//! The crate is structured into a few key modules:
//!
//! - **interception**: override table, per-type interception proxies, and
//!   the notification gateway seam
//! - **injection**: per-peer connection injectors with outbound queueing and
//!   the queued-state transfer protocol
//! - **packet**: packet handles and the capability seam to host packet
//!   objects
//! - **reporting**: structured failure reports and the reporter seam
//! - **utils**: configuration and error types
//!
//! # Example
//!
//! ```
//! use packetgate::{
//!     GateConfig, InterceptionLayer, LogReporter, NotificationGateway,
//!     InboundDecision, PacketContainer, PacketKind,
//! };
//! use std::sync::Arc;
//!
//! struct CancelEverything;
//!
//! impl NotificationGateway for CancelEverything {
//!     fn on_inbound_decode(
//!         &self,
//!         _container: PacketContainer,
//!         _raw: &[u8],
//!     ) -> packetgate::Result<Option<InboundDecision>> {
//!         Ok(Some(InboundDecision::cancel()))
//!     }
//! }
//!
//! let layer = InterceptionLayer::new(
//!     GateConfig::default(),
//!     Arc::new(CancelEverything),
//!     Arc::new(LogReporter),
//! )
//! .unwrap();
//! let _proxy = layer.proxy_for(PacketKind(0x21), true);
//! ```

// Public module exports
pub mod injection;
pub mod interception;
pub mod packet;
pub mod reporting;
pub mod utils;

// Re-export commonly used types
pub use injection::injector::{
    ConnectionInjector, DirectConnectionInjector, PeerSession, QueuedConnectionInjector,
    Transport,
};
pub use injection::outbound_queue::{OutboundQueue, QueueStats, QueuedPacket};
pub use interception::gateway::{InboundDecision, NotificationGateway};
pub use interception::override_table::{OverrideEntry, OverrideTable, TableStats};
pub use interception::proxy::PacketProxy;
pub use interception::InterceptionLayer;
pub use packet::{PacketContainer, PacketHandle, PacketId, PacketKind, PacketOps};
pub use reporting::{ErrorReporter, LogReporter, Report, ReportKind};
pub use utils::config::GateConfig;
pub use utils::errors::{GateError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
