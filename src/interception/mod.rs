// src/interception/mod.rs
//! Packet interception layer
//!
//! Sits between a peer's packet decoder/encoder and the host application's
//! packet-handling pipeline, letting observers inspect, replace, or cancel
//! in-flight packets transparently:
//!
//! ```text
//! inbound bytes
//!     │
//!     └─ host decoder → PacketProxy.decode → OverrideTable consulted
//!                            │
//!                            └─ NotificationGateway → cancel / replace
//!                                     │
//!                            OverrideTable updated, result returned to host
//! ```
//!
//! The [`InterceptionLayer`] owns the override table and the external
//! collaborators; everything else receives references from it. There is no
//! ambient global state, and the table's lifecycle is the layer's lifecycle.

pub mod gateway;
pub mod override_table;
pub mod proxy;

// Re-export commonly used types
pub use gateway::{InboundDecision, NotificationGateway};
pub use override_table::{OverrideEntry, OverrideTable, TableStats};
pub use proxy::{PacketProxy, REPORT_CANNOT_HANDLE_INBOUND_PACKET};

use crate::packet::PacketKind;
use crate::reporting::ErrorReporter;
use crate::utils::config::GateConfig;
use crate::utils::errors::Result;
use std::sync::Arc;
use tracing::info;

/// Owner of the interception subsystem's shared state.
pub struct InterceptionLayer {
    config: GateConfig,
    overrides: Arc<OverrideTable>,
    gateway: Arc<dyn NotificationGateway>,
    reporter: Arc<dyn ErrorReporter>,
}

impl InterceptionLayer {
    /// Create the layer, validating configuration up front.
    pub fn new(
        config: GateConfig,
        gateway: Arc<dyn NotificationGateway>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            sweep_interval = config.sweep_interval,
            "initializing interception layer"
        );

        let overrides = Arc::new(OverrideTable::with_config(&config));
        Ok(Self {
            config,
            overrides,
            gateway,
            reporter,
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The shared override table.
    pub fn overrides(&self) -> Arc<OverrideTable> {
        Arc::clone(&self.overrides)
    }

    /// Build the proxy for one packet type. `decode_entry` marks the proxy
    /// that owns the inbound-decode entry point for that type.
    pub fn proxy_for(&self, kind: PacketKind, decode_entry: bool) -> PacketProxy {
        PacketProxy::new(
            kind,
            Arc::clone(&self.overrides),
            Arc::clone(&self.gateway),
            Arc::clone(&self.reporter),
            decode_entry,
        )
        .with_decision_logging(self.config.log_decisions)
    }
}
