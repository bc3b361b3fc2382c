// src/interception/proxy.rs
//! Packet interception proxy
//!
//! One proxy exists per packet *type*, not per instance. Every host call on
//! a wrapped packet routes through the proxy, which consults the override
//! table and either passes the call through, suppresses it, or redirects it
//! to a replacement packet:
//!
//! ```text
//! host decoder ──▶ PacketProxy ──▶ OverrideTable lookup
//!                      │
//!                      ├─ Cancelled + void op    → suppressed, no host call
//!                      ├─ Cancelled + value op   → original packet
//!                      ├─ Replacement(r)         → r
//!                      └─ no entry               → original packet
//!                      │
//!                      └─ decode entry point → NotificationGateway
//! ```
//!
//! Only the gateway-notification step is fault-isolated; a failure in the
//! delegated host operation itself propagates unchanged.

use crate::interception::gateway::{InboundDecision, NotificationGateway};
use crate::interception::override_table::{OverrideEntry, OverrideTable};
use crate::packet::{PacketContainer, PacketHandle, PacketKind, PacketOps};
use crate::reporting::{ErrorReporter, Report, ReportKind};
use crate::utils::errors::Result;
use bytes::BytesMut;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

pub const REPORT_CANNOT_HANDLE_INBOUND_PACKET: ReportKind =
    ReportKind::new("Cannot handle inbound packet.");

/// Bytes of raw input captured as context when reporting a gateway failure.
const INPUT_PREVIEW_BYTES: usize = 32;

/// Interception proxy for one packet type.
pub struct PacketProxy {
    kind: PacketKind,
    overrides: Arc<OverrideTable>,
    gateway: Arc<dyn NotificationGateway>,
    reporter: Arc<dyn ErrorReporter>,
    /// Whether this proxy is the inbound-decode entry point for its type.
    decode_entry: bool,
    log_decisions: bool,
}

impl PacketProxy {
    pub fn new(
        kind: PacketKind,
        overrides: Arc<OverrideTable>,
        gateway: Arc<dyn NotificationGateway>,
        reporter: Arc<dyn ErrorReporter>,
        decode_entry: bool,
    ) -> Self {
        Self {
            kind,
            overrides,
            gateway,
            reporter,
            decode_entry,
            log_decisions: true,
        }
    }

    pub fn with_decision_logging(mut self, enabled: bool) -> Self {
        self.log_decisions = enabled;
        self
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Intercepted decode. On the decode entry point, notifies the gateway
    /// after a successful delegation and applies its decision to the table.
    pub fn decode(&self, target: &PacketHandle, input: &[u8]) -> Result<()> {
        let receiver = match self.route_void(target) {
            Some(receiver) => receiver,
            // Suppressed: no host call, and nothing new to observe.
            None => return Ok(()),
        };

        receiver.decode(input)?;

        if self.decode_entry {
            self.notify_inbound(target, input);
        }
        Ok(())
    }

    /// Intercepted encode.
    pub fn encode(&self, target: &PacketHandle, out: &mut BytesMut) -> Result<()> {
        match self.route_void(target) {
            Some(receiver) => receiver.encode(out),
            None => Ok(()),
        }
    }

    /// Intercepted delivery into the host pipeline.
    pub fn apply(&self, target: &PacketHandle) -> Result<()> {
        match self.route_void(target) {
            Some(receiver) => receiver.apply(),
            None => Ok(()),
        }
    }

    /// Intercepted size query.
    pub fn encoded_len(&self, target: &PacketHandle) -> Result<usize> {
        self.route_value(target).encoded_len()
    }

    /// Receiver for a void operation. `None` means the call is suppressed.
    fn route_void(&self, target: &PacketHandle) -> Option<Arc<dyn PacketOps>> {
        match self.overrides.lookup(target) {
            Some(OverrideEntry::Cancelled) => None,
            Some(OverrideEntry::Replacement(replacement)) => {
                Some(Arc::clone(replacement.ops()))
            }
            None => Some(Arc::clone(target.ops())),
        }
    }

    /// Receiver for a value-returning operation. A cancelled packet still
    /// answers state queries from the original instance.
    fn route_value(&self, target: &PacketHandle) -> Arc<dyn PacketOps> {
        match self.overrides.lookup(target) {
            Some(OverrideEntry::Replacement(replacement)) => {
                Arc::clone(replacement.ops())
            }
            Some(OverrideEntry::Cancelled) | None => Arc::clone(target.ops()),
        }
    }

    fn notify_inbound(&self, target: &PacketHandle, input: &[u8]) {
        let container = PacketContainer::new(self.kind, target.clone());

        match self.gateway.on_inbound_decode(container, input) {
            Ok(Some(decision)) => self.apply_decision(target, decision),
            Ok(None) => {}
            Err(error) => {
                // The host decoder cannot handle observer failures; report
                // and continue as if no observer existed.
                let report = Report::builder(REPORT_CANNOT_HANDLE_INBOUND_PACKET)
                    .context(json!({
                        "kind": self.kind.0,
                        "input_len": input.len(),
                        "input_prefix": input_preview(input),
                    }))
                    .error(&error)
                    .build();
                self.reporter.report_detailed("PacketProxy", report);
            }
        }
    }

    fn apply_decision(&self, target: &PacketHandle, decision: InboundDecision) {
        if decision.cancelled {
            if self.log_decisions {
                debug!(packet = ?target.id(), kind = %self.kind, "packet cancelled by observer");
            }
            self.overrides.put(target, OverrideEntry::Cancelled);
        } else if let Some(replacement) = decision.replacement {
            if !replacement.same_instance(target) {
                if self.log_decisions {
                    debug!(
                        packet = ?target.id(),
                        replacement = ?replacement.id(),
                        kind = %self.kind,
                        "packet replaced by observer"
                    );
                }
                self.overrides
                    .put(target, OverrideEntry::Replacement(replacement));
            }
        }
    }
}

fn input_preview(input: &[u8]) -> String {
    input
        .iter()
        .take(INPUT_PREVIEW_BYTES)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
