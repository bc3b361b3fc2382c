// src/interception/override_table.rs
//! Concurrent override table keyed by packet identity
//!
//! The one process-shared structure in the crate. Observers cancel or
//! replace in-flight packets by installing an [`OverrideEntry`] keyed by the
//! packet's surrogate id; every proxy call consults the table to decide how
//! to route.
//!
//! Entries must never outlive the packet they key, and the table must not
//! grow without bound when thousands of distinct packets pass through per
//! second. Each slot therefore records a `Weak` to the origin packet, and
//! dead slots are reclaimed by an amortized sweep (every
//! `sweep_interval` puts) or by an explicit [`evict_dead`] call.
//!
//! [`evict_dead`]: OverrideTable::evict_dead

use crate::packet::{PacketHandle, PacketId, PacketOps};
use crate::utils::config::GateConfig;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Weak;
use tracing::debug;

/// Override decision for one packet instance.
#[derive(Debug, Clone)]
pub enum OverrideEntry {
    /// Suppress delivery of the packet.
    Cancelled,
    /// Substitute this packet for all further operations.
    Replacement(PacketHandle),
}

impl PartialEq for OverrideEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Cancelled, Self::Cancelled) => true,
            (Self::Replacement(a), Self::Replacement(b)) => a.same_instance(b),
            _ => false,
        }
    }
}

struct Slot {
    /// Liveness of the keyed packet. Never upgraded; the table must not
    /// extend the packet's lifetime.
    origin: Weak<dyn PacketOps>,
    entry: OverrideEntry,
}

/// Concurrent mapping from packet identity to its current override.
pub struct OverrideTable {
    slots: DashMap<PacketId, Slot>,
    sweep_interval: usize,
    puts_since_sweep: AtomicUsize,
    puts_total: AtomicU64,
    evicted_total: AtomicU64,
}

impl Default for OverrideTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::with_config(&GateConfig::default())
    }

    pub fn with_config(config: &GateConfig) -> Self {
        Self {
            slots: DashMap::new(),
            sweep_interval: config.sweep_interval.max(1),
            puts_since_sweep: AtomicUsize::new(0),
            puts_total: AtomicU64::new(0),
            evicted_total: AtomicU64::new(0),
        }
    }

    /// Install or overwrite the override for `packet`.
    ///
    /// Visible to every subsequent lookup from any thread once this returns.
    pub fn put(&self, packet: &PacketHandle, entry: OverrideEntry) {
        self.slots.insert(
            packet.id(),
            Slot {
                origin: packet.downgrade(),
                entry,
            },
        );
        self.puts_total.fetch_add(1, Ordering::Relaxed);

        let since = self.puts_since_sweep.fetch_add(1, Ordering::Relaxed) + 1;
        if since >= self.sweep_interval {
            self.puts_since_sweep.store(0, Ordering::Relaxed);
            self.evict_dead();
        }
    }

    /// Remove the override for `packet`, if any.
    pub fn remove(&self, packet: &PacketHandle) {
        self.slots.remove(&packet.id());
    }

    /// Current override for `packet`. Read-only.
    pub fn lookup(&self, packet: &PacketHandle) -> Option<OverrideEntry> {
        self.slots.get(&packet.id()).map(|slot| slot.entry.clone())
    }

    /// Whether `packet` has been cancelled.
    pub fn is_cancelled(&self, packet: &PacketHandle) -> bool {
        matches!(self.lookup(packet), Some(OverrideEntry::Cancelled))
    }

    /// Reclaim every slot whose origin packet has been dropped.
    ///
    /// Returns the number of slots removed. Runs automatically every
    /// `sweep_interval` puts; tests and shutdown paths may call it directly.
    pub fn evict_dead(&self) -> usize {
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.origin.strong_count() > 0);
        let evicted = before.saturating_sub(self.slots.len());

        if evicted > 0 {
            self.evicted_total.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(evicted, "evicted dead override entries");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Table statistics (relaxed counters).
    pub fn stats(&self) -> TableStats {
        TableStats {
            live_entries: self.slots.len(),
            puts_total: self.puts_total.load(Ordering::Relaxed),
            evicted_total: self.evicted_total.load(Ordering::Relaxed),
        }
    }
}

/// Override table statistics
#[derive(Debug, Clone)]
pub struct TableStats {
    /// Entries currently present (live or awaiting sweep)
    pub live_entries: usize,

    /// Total overrides installed
    pub puts_total: u64,

    /// Total dead entries reclaimed
    pub evicted_total: u64,
}
