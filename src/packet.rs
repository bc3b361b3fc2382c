// src/packet.rs
//! Packet handles and the capability seam to host packet objects
//!
//! The host runtime owns its packet objects; this crate never extends their
//! lifetime and never touches them except through the [`PacketOps`]
//! capability trait. A host integration implements `PacketOps` once per
//! supported packet type and wraps each decoded object in a
//! [`PacketHandle`].
//!
//! Identity is a surrogate [`PacketId`] assigned at wrap time: clones of a
//! handle share the id, and two handles are the same packet iff their ids
//! match. Identity never depends on packet contents, so two packets with
//! equal payloads remain distinct for override purposes.

use crate::utils::errors::Result;
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Identifies a packet type on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketKind(pub u32);

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kind#{}", self.0)
    }
}

/// Surrogate identity for one wrapped packet object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketId(u64);

static NEXT_PACKET_ID: AtomicU64 = AtomicU64::new(1);

impl PacketId {
    fn next() -> Self {
        Self(NEXT_PACKET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The operations of a host packet object that can be intercepted.
///
/// Methods take `&self` because the host object is opaque and shared across
/// I/O threads; adapters that mutate on decode use interior mutability.
pub trait PacketOps: Send + Sync {
    /// Packet-type identifier.
    fn kind(&self) -> PacketKind;

    /// Decode packet state from raw input bytes. Void operation; this is the
    /// inbound-decode entry point.
    fn decode(&self, input: &[u8]) -> Result<()>;

    /// Encode packet state into `out`. Void operation.
    fn encode(&self, out: &mut BytesMut) -> Result<()>;

    /// Deliver the packet into the host processing pipeline. Void operation.
    fn apply(&self) -> Result<()>;

    /// Size of the encoded representation in bytes. Value-returning
    /// operation.
    fn encoded_len(&self) -> Result<usize>;
}

/// Handle to one host-owned packet object.
///
/// Cloning is cheap and preserves identity.
#[derive(Clone)]
pub struct PacketHandle {
    id: PacketId,
    ops: Arc<dyn PacketOps>,
}

impl PacketHandle {
    /// Wrap a host packet object, assigning its surrogate identity.
    ///
    /// Wrap each object exactly once; wrapping the same object twice yields
    /// two distinct identities.
    pub fn wrap(ops: Arc<dyn PacketOps>) -> Self {
        Self {
            id: PacketId::next(),
            ops,
        }
    }

    pub fn id(&self) -> PacketId {
        self.id
    }

    pub fn kind(&self) -> PacketKind {
        self.ops.kind()
    }

    /// Access the underlying capability object.
    pub fn ops(&self) -> &Arc<dyn PacketOps> {
        &self.ops
    }

    /// Whether `other` refers to the same packet object.
    pub fn same_instance(&self, other: &PacketHandle) -> bool {
        self.id == other.id
    }

    pub(crate) fn downgrade(&self) -> Weak<dyn PacketOps> {
        Arc::downgrade(&self.ops)
    }
}

impl fmt::Debug for PacketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketHandle")
            .field("id", &self.id)
            .field("kind", &self.ops.kind())
            .finish()
    }
}

/// Packet wrapper handed to the notification gateway on inbound decode.
#[derive(Debug, Clone)]
pub struct PacketContainer {
    kind: PacketKind,
    handle: PacketHandle,
}

impl PacketContainer {
    pub fn new(kind: PacketKind, handle: PacketHandle) -> Self {
        Self { kind, handle }
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn handle(&self) -> &PacketHandle {
        &self.handle
    }
}
