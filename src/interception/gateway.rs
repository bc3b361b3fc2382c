// src/interception/gateway.rs
//! Notification gateway seam
//!
//! The listener registry that decides what to do with a received packet
//! lives outside this crate; the proxy consults it through
//! [`NotificationGateway`] after every successful inbound decode.

use crate::packet::{PacketContainer, PacketHandle};
use crate::utils::errors::Result;

/// Decision returned by the gateway after observers ran.
#[derive(Debug, Clone, Default)]
pub struct InboundDecision {
    /// Suppress delivery of the packet.
    pub cancelled: bool,

    /// Substitute packet to use for all further operations. Ignored when
    /// `cancelled` is set, and when it refers to the decoded packet itself.
    pub replacement: Option<PacketHandle>,
}

impl InboundDecision {
    /// Let the packet through untouched.
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn cancel() -> Self {
        Self {
            cancelled: true,
            replacement: None,
        }
    }

    pub fn replace(replacement: PacketHandle) -> Self {
        Self {
            cancelled: false,
            replacement: Some(replacement),
        }
    }
}

/// External collaborator consulted on inbound decode.
///
/// Implementations must be callable from any I/O thread. A returned error is
/// reported through the error-reporting collaborator and never propagated to
/// the host decoder.
pub trait NotificationGateway: Send + Sync {
    /// Observe a freshly decoded packet together with the raw input it was
    /// decoded from. `None` means no observer had an opinion.
    fn on_inbound_decode(
        &self,
        container: PacketContainer,
        raw: &[u8],
    ) -> Result<Option<InboundDecision>>;
}
