// src/utils/errors.rs
//! Error types for the interception and injection layers
//!
//! A single crate-wide error enum keeps the failure taxonomy in one place:
//!
//! - Host-side packet operations (`PacketOp`, `Io`) propagate unchanged to
//!   the original caller.
//! - Gateway/observer failures (`Notification`) are caught at the proxy and
//!   reported, never propagated.
//! - Capability and construction failures (`Unsupported`, `InvalidPeer`,
//!   `Config`) surface immediately as typed errors.
//! - `TransferFailed` wraps the first failing send during a queued-state
//!   hand-off, identifying the destination injector.

use std::io;
use thiserror::Error;

/// Primary error type for all packetgate operations.
#[derive(Error, Debug)]
pub enum GateError {
    /// The underlying host packet operation failed.
    #[error("packet operation failed: {0}")]
    PacketOp(String),

    /// An observer or gateway invocation failed during inbound decode.
    #[error("inbound notification failed: {0}")]
    Notification(String),

    /// The requested capability does not exist for this peer kind.
    #[error("unsupported capability: {0}")]
    Unsupported(String),

    /// The peer session handle is missing or no longer valid.
    #[error("invalid peer session: {0}")]
    InvalidPeer(String),

    /// A transport-level send failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A queued-state transfer failed partway through.
    ///
    /// Items already sent before the failure remain with the destination.
    #[error("failed to transfer queued packets to {destination}: {source}")]
    TransferFailed {
        destination: String,
        #[source]
        source: Box<GateError>,
    },

    /// Configuration rejected at construction time.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Type alias for Results using GateError
pub type Result<T> = std::result::Result<T, GateError>;
