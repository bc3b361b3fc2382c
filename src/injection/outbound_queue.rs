// src/injection/outbound_queue.rs
//! Outbound packet queue
//!
//! FIFO of packets waiting for the host transport, owned by exactly one
//! connection injector at any instant. One mutex guards the sequence;
//! `drain_all` takes the snapshot and clears the queue under a single
//! acquisition, which is what the transfer protocol's atomicity rests on.

use crate::packet::PacketHandle;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::warn;

const DEFAULT_WARN_DEPTH: usize = 1024;

/// One packet waiting to be sent.
#[derive(Debug, Clone)]
pub struct QueuedPacket {
    pub payload: PacketHandle,

    /// Whether the payload should re-enter the interception pipeline when
    /// the host transport eventually flushes it.
    pub filtered: bool,
}

/// Ordered, thread-safe sequence of pending outbound packets.
pub struct OutboundQueue {
    inner: Mutex<VecDeque<QueuedPacket>>,
    warn_depth: usize,
    depth_warned: AtomicBool,
    enqueued_total: AtomicU64,
    drained_total: AtomicU64,
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::with_warn_depth(DEFAULT_WARN_DEPTH)
    }

    pub fn with_warn_depth(warn_depth: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::new()),
            warn_depth: warn_depth.max(1),
            depth_warned: AtomicBool::new(false),
            enqueued_total: AtomicU64::new(0),
            drained_total: AtomicU64::new(0),
        }
    }

    /// Append a packet. Preserves per-queue enqueue order.
    pub fn enqueue(&self, payload: PacketHandle, filtered: bool) {
        let depth = {
            let mut queue = self.inner.lock();
            queue.push_back(QueuedPacket { payload, filtered });
            queue.len()
        };
        self.enqueued_total.fetch_add(1, Ordering::Relaxed);

        if depth > self.warn_depth && !self.depth_warned.swap(true, Ordering::Relaxed) {
            warn!(depth, "outbound queue depth exceeded warning threshold");
        }
    }

    /// Atomically remove and return everything present, in enqueue order.
    ///
    /// Used only by the transfer protocol. An enqueue racing with this call
    /// lands either in the returned snapshot or in the queue afterwards,
    /// never both and never neither.
    pub(crate) fn drain_all(&self) -> Vec<QueuedPacket> {
        let drained: Vec<QueuedPacket> = {
            let mut queue = self.inner.lock();
            queue.drain(..).collect()
        };
        self.drained_total
            .fetch_add(drained.len() as u64, Ordering::Relaxed);
        drained
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Queue statistics (relaxed counters).
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            depth: self.inner.lock().len(),
            enqueued_total: self.enqueued_total.load(Ordering::Relaxed),
            drained_total: self.drained_total.load(Ordering::Relaxed),
        }
    }
}

/// Outbound queue statistics
#[derive(Debug, Clone)]
pub struct QueueStats {
    /// Packets currently waiting
    pub depth: usize,

    /// Total packets enqueued
    pub enqueued_total: u64,

    /// Total packets drained by transfers
    pub drained_total: u64,
}
