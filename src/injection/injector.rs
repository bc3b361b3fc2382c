// src/injection/injector.rs
//! Per-peer connection injectors
//!
//! A connection injector is the per-peer facade over outbound packet
//! delivery: peer identity, the outbound queue, and the transfer protocol
//! used when the peer's connection object is replaced mid-session.
//!
//! Two kinds are provided. [`QueuedConnectionInjector`] covers peers
//! reachable only through a higher-level API: there is no transport handle
//! and every send queues until the queued state is handed to a successor.
//! [`DirectConnectionInjector`] wraps a live host transport and sends pass
//! straight through.
//!
//! # Transfer protocol
//!
//! `transfer_state(old → new)` drains `old`'s queue under its lock (snapshot
//! and clear in one step) and re-sends each drained packet to the
//! destination in order. A dedicated transfer mutex serializes overlapping
//! transfers without blocking producers behind the downstream sends. A
//! concurrent enqueue on `old` is either captured in the snapshot or left
//! queued for a future transfer; it is never lost or duplicated.

use crate::injection::outbound_queue::OutboundQueue;
use crate::packet::PacketHandle;
use crate::utils::config::GateConfig;
use crate::utils::errors::{GateError, Result};
use parking_lot::{Mutex, RwLock};
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Host-owned peer representation.
pub trait PeerSession: Send + Sync {
    fn name(&self) -> String;

    fn address(&self) -> Result<SocketAddr>;

    fn disconnect(&self, reason: &str) -> Result<()>;
}

/// Host transport capable of sending a packet immediately.
pub trait Transport: Send + Sync {
    fn peer_addr(&self) -> Result<SocketAddr>;

    fn direct_send(&self, payload: &PacketHandle) -> Result<()>;
}

/// Per-peer facade over transport send and identity.
pub trait ConnectionInjector: Send + Sync {
    /// Direct transport handle, when one exists for this peer kind.
    fn transport(&self) -> Result<Arc<dyn Transport>>;

    fn address(&self) -> Result<SocketAddr>;

    fn disconnect(&self, reason: &str) -> Result<()>;

    /// Hand a packet to this connection. Queued kinds make no delivery
    /// guarantee beyond ordering; transmission happens when the host
    /// transport flushes. `filtered` marks packets that should re-enter the
    /// interception pipeline at that point.
    fn send(&self, payload: PacketHandle, filtered: bool) -> Result<()>;

    /// Current peer identity. Re-fetch rather than cache; identity may
    /// change across a login or handshake boundary.
    fn peer(&self) -> Arc<dyn PeerSession>;

    fn updated_peer(&self) -> Arc<dyn PeerSession>;

    fn set_updated_peer(&self, peer: Arc<dyn PeerSession>);

    /// Hand all queued state to `destination`, in original enqueue order.
    ///
    /// On a partial failure the call aborts with
    /// [`GateError::TransferFailed`]; packets already sent stay with the
    /// destination and are not re-queued here.
    fn transfer_state(&self, destination: &dyn ConnectionInjector) -> Result<()>;

    /// Human-readable identification, used when a transfer fails.
    fn describe(&self) -> String {
        let peer = self.peer();
        format!("injector for peer {}", peer.name())
    }
}

/// Injector for peers with no direct transport access.
///
/// Every send queues. The queue's contents move to a successor injector via
/// [`ConnectionInjector::transfer_state`] when the peer's connection object
/// is replaced.
pub struct QueuedConnectionInjector {
    peer: RwLock<Arc<dyn PeerSession>>,
    queue: OutboundQueue,
    transfer_lock: Mutex<()>,
}

impl QueuedConnectionInjector {
    pub fn new(peer: Arc<dyn PeerSession>) -> Self {
        Self {
            peer: RwLock::new(peer),
            queue: OutboundQueue::new(),
            transfer_lock: Mutex::new(()),
        }
    }

    pub fn with_config(peer: Arc<dyn PeerSession>, config: &GateConfig) -> Self {
        Self {
            peer: RwLock::new(peer),
            queue: OutboundQueue::with_warn_depth(config.queue_warn_depth),
            transfer_lock: Mutex::new(()),
        }
    }

    /// Construct from a session handle that may already be gone.
    ///
    /// A dead handle is rejected here rather than at the first send; an
    /// injector without a peer identity is never allowed to exist.
    pub fn from_session(session: Weak<dyn PeerSession>) -> Result<Self> {
        match session.upgrade() {
            Some(peer) => Ok(Self::new(peer)),
            None => Err(GateError::InvalidPeer(
                "peer session handle is no longer valid".to_string(),
            )),
        }
    }

    /// Number of packets waiting for transfer.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }
}

impl ConnectionInjector for QueuedConnectionInjector {
    fn transport(&self) -> Result<Arc<dyn Transport>> {
        Err(GateError::Unsupported(
            "no direct transport handle for a queued peer connection".to_string(),
        ))
    }

    fn address(&self) -> Result<SocketAddr> {
        self.peer.read().address()
    }

    fn disconnect(&self, reason: &str) -> Result<()> {
        self.peer.read().disconnect(reason)
    }

    fn send(&self, payload: PacketHandle, filtered: bool) -> Result<()> {
        self.queue.enqueue(payload, filtered);
        Ok(())
    }

    fn peer(&self) -> Arc<dyn PeerSession> {
        Arc::clone(&self.peer.read())
    }

    fn updated_peer(&self) -> Arc<dyn PeerSession> {
        Arc::clone(&self.peer.read())
    }

    fn set_updated_peer(&self, peer: Arc<dyn PeerSession>) {
        *self.peer.write() = peer;
    }

    fn transfer_state(&self, destination: &dyn ConnectionInjector) -> Result<()> {
        let _transfers_serialized = self.transfer_lock.lock();

        let drained = self.queue.drain_all();
        if drained.is_empty() {
            return Ok(());
        }
        debug!(
            count = drained.len(),
            destination = %destination.describe(),
            "transferring queued packets"
        );

        for item in drained {
            destination
                .send(item.payload, item.filtered)
                .map_err(|source| GateError::TransferFailed {
                    destination: destination.describe(),
                    source: Box::new(source),
                })?;
        }
        Ok(())
    }
}

/// Injector backed by a live host transport.
pub struct DirectConnectionInjector {
    peer: RwLock<Arc<dyn PeerSession>>,
    transport: Arc<dyn Transport>,
}

impl DirectConnectionInjector {
    pub fn new(peer: Arc<dyn PeerSession>, transport: Arc<dyn Transport>) -> Self {
        Self {
            peer: RwLock::new(peer),
            transport,
        }
    }
}

impl ConnectionInjector for DirectConnectionInjector {
    fn transport(&self) -> Result<Arc<dyn Transport>> {
        Ok(Arc::clone(&self.transport))
    }

    fn address(&self) -> Result<SocketAddr> {
        self.transport.peer_addr()
    }

    fn disconnect(&self, reason: &str) -> Result<()> {
        self.peer.read().disconnect(reason)
    }

    fn send(&self, payload: PacketHandle, _filtered: bool) -> Result<()> {
        // Delivery is immediate; outbound filtering is the host flush
        // path's concern and does not apply to a direct send.
        self.transport.direct_send(&payload)
    }

    fn peer(&self) -> Arc<dyn PeerSession> {
        Arc::clone(&self.peer.read())
    }

    fn updated_peer(&self) -> Arc<dyn PeerSession> {
        Arc::clone(&self.peer.read())
    }

    fn set_updated_peer(&self, peer: Arc<dyn PeerSession>) {
        *self.peer.write() = peer;
    }

    fn transfer_state(&self, _destination: &dyn ConnectionInjector) -> Result<()> {
        // Direct sends are never deferred, so there is no queued state.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{PacketId, PacketKind, PacketOps};
    use bytes::BytesMut;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    struct StubPacket;

    impl PacketOps for StubPacket {
        fn kind(&self) -> PacketKind {
            PacketKind(9)
        }

        fn decode(&self, _input: &[u8]) -> Result<()> {
            Ok(())
        }

        fn encode(&self, _out: &mut BytesMut) -> Result<()> {
            Ok(())
        }

        fn apply(&self) -> Result<()> {
            Ok(())
        }

        fn encoded_len(&self) -> Result<usize> {
            Ok(0)
        }
    }

    fn wrap_stub() -> PacketHandle {
        PacketHandle::wrap(Arc::new(StubPacket))
    }

    struct StubPeer {
        name: String,
        addr: SocketAddr,
        disconnects: Mutex<Vec<String>>,
    }

    impl StubPeer {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                addr: "127.0.0.1:25565".parse().unwrap(),
                disconnects: Mutex::new(Vec::new()),
            })
        }
    }

    impl PeerSession for StubPeer {
        fn name(&self) -> String {
            self.name.clone()
        }

        fn address(&self) -> Result<SocketAddr> {
            Ok(self.addr)
        }

        fn disconnect(&self, reason: &str) -> Result<()> {
            self.disconnects.lock().push(reason.to_string());
            Ok(())
        }
    }

    /// Destination that accepts a fixed number of sends, then fails.
    struct FlakyInjector {
        peer: Arc<StubPeer>,
        accept: usize,
        received: Mutex<Vec<PacketHandle>>,
    }

    impl FlakyInjector {
        fn new(accept: usize) -> Self {
            Self {
                peer: StubPeer::new("replacement"),
                accept,
                received: Mutex::new(Vec::new()),
            }
        }
    }

    impl ConnectionInjector for FlakyInjector {
        fn transport(&self) -> Result<Arc<dyn Transport>> {
            Err(GateError::Unsupported("test injector".to_string()))
        }

        fn address(&self) -> Result<SocketAddr> {
            self.peer.address()
        }

        fn disconnect(&self, reason: &str) -> Result<()> {
            self.peer.disconnect(reason)
        }

        fn send(&self, payload: PacketHandle, _filtered: bool) -> Result<()> {
            let mut received = self.received.lock();
            if received.len() >= self.accept {
                return Err(GateError::Transport("send window closed".to_string()));
            }
            received.push(payload);
            Ok(())
        }

        fn peer(&self) -> Arc<dyn PeerSession> {
            self.peer.clone() as Arc<dyn PeerSession>
        }

        fn updated_peer(&self) -> Arc<dyn PeerSession> {
            self.peer()
        }

        fn set_updated_peer(&self, _peer: Arc<dyn PeerSession>) {}

        fn transfer_state(&self, _destination: &dyn ConnectionInjector) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_transport_handle_is_typed_unsupported() {
        let injector = QueuedConnectionInjector::new(StubPeer::new("steve"));
        assert!(matches!(
            injector.transport(),
            Err(GateError::Unsupported(_))
        ));
    }

    #[test]
    fn test_send_queues_in_order_with_flags() {
        let injector = QueuedConnectionInjector::new(StubPeer::new("steve"));
        let first = wrap_stub();
        let second = wrap_stub();

        injector.send(first.clone(), true).unwrap();
        injector.send(second.clone(), false).unwrap();
        assert_eq!(injector.queued_len(), 2);

        let drained = injector.queue.drain_all();
        assert!(drained[0].payload.same_instance(&first));
        assert!(drained[0].filtered);
        assert!(drained[1].payload.same_instance(&second));
        assert!(!drained[1].filtered);
    }

    #[test]
    fn test_transfer_moves_everything_in_order() {
        let old = QueuedConnectionInjector::new(StubPeer::new("steve"));
        let new = QueuedConnectionInjector::new(StubPeer::new("steve"));
        let packets: Vec<PacketHandle> = (0..3).map(|_| wrap_stub()).collect();
        for (i, packet) in packets.iter().enumerate() {
            old.send(packet.clone(), i % 2 == 0).unwrap();
        }

        old.transfer_state(&new).unwrap();

        assert!(old.queue.is_empty());
        let received = new.queue.drain_all();
        assert_eq!(received.len(), 3);
        for (i, item) in received.iter().enumerate() {
            assert!(item.payload.same_instance(&packets[i]));
            assert_eq!(item.filtered, i % 2 == 0);
        }
    }

    #[test]
    fn test_transfer_of_empty_queue_is_a_noop() {
        let old = QueuedConnectionInjector::new(StubPeer::new("steve"));
        let new = QueuedConnectionInjector::new(StubPeer::new("steve"));
        old.transfer_state(&new).unwrap();
        assert!(new.queue.is_empty());
    }

    #[test]
    fn test_transfer_failure_identifies_destination() {
        let old = QueuedConnectionInjector::new(StubPeer::new("steve"));
        for _ in 0..3 {
            old.send(wrap_stub(), false).unwrap();
        }
        let destination = FlakyInjector::new(2);

        let err = old.transfer_state(&destination).unwrap_err();

        match err {
            GateError::TransferFailed { destination: desc, .. } => {
                assert!(desc.contains("replacement"));
            }
            other => panic!("expected TransferFailed, got {:?}", other),
        }
        // Partial failure loses nothing silently: two packets made it to
        // the destination, the failed one is gone with an error raised.
        assert_eq!(destination.received.lock().len(), 2);
        assert!(old.queue.is_empty());
    }

    #[test]
    fn test_transfer_with_concurrent_enqueue_delivers_exactly_once() {
        let old = Arc::new(QueuedConnectionInjector::new(StubPeer::new("steve")));
        let new = Arc::new(QueuedConnectionInjector::new(StubPeer::new("steve")));

        let queued: Vec<PacketId> = (0..3)
            .map(|_| {
                let packet = wrap_stub();
                let id = packet.id();
                old.send(packet, false).unwrap();
                id
            })
            .collect();
        let racer = wrap_stub();
        let racer_id = racer.id();

        let barrier = Arc::new(Barrier::new(2));
        let producer = {
            let old = Arc::clone(&old);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                old.send(racer, true).unwrap();
            })
        };

        barrier.wait();
        old.transfer_state(new.as_ref()).unwrap();
        producer.join().unwrap();

        let transferred: Vec<PacketId> =
            new.queue.drain_all().iter().map(|q| q.payload.id()).collect();
        let left_behind: Vec<PacketId> =
            old.queue.drain_all().iter().map(|q| q.payload.id()).collect();

        // The original three always arrive at the destination, in order.
        assert_eq!(&transferred[..3], &queued[..]);

        // The racer appears exactly once: either after them at the
        // destination, or still queued on the old injector.
        let mut tail: Vec<PacketId> = transferred[3..].to_vec();
        tail.extend(&left_behind);
        assert_eq!(tail, vec![racer_id]);
    }

    #[test]
    fn test_updated_peer_is_refetched_not_cached() {
        let injector = QueuedConnectionInjector::new(StubPeer::new("anonymous"));
        assert_eq!(injector.peer().name(), "anonymous");

        injector.set_updated_peer(StubPeer::new("steve"));
        assert_eq!(injector.peer().name(), "steve");
        assert_eq!(injector.updated_peer().name(), "steve");
    }

    #[test]
    fn test_from_session_rejects_dead_handle() {
        let peer = StubPeer::new("steve") as Arc<dyn PeerSession>;
        let session = Arc::downgrade(&peer);

        assert!(QueuedConnectionInjector::from_session(session.clone()).is_ok());

        drop(peer);
        assert!(matches!(
            QueuedConnectionInjector::from_session(session),
            Err(GateError::InvalidPeer(_))
        ));
    }

    #[test]
    fn test_disconnect_delegates_to_peer() {
        let peer = StubPeer::new("steve");
        let injector = QueuedConnectionInjector::new(peer.clone());

        injector.disconnect("kicked for testing").unwrap();

        assert_eq!(
            peer.disconnects.lock().as_slice(),
            &["kicked for testing".to_string()]
        );
    }

    struct CountingTransport {
        addr: SocketAddr,
        sent: AtomicUsize,
    }

    impl Transport for CountingTransport {
        fn peer_addr(&self) -> Result<SocketAddr> {
            Ok(self.addr)
        }

        fn direct_send(&self, _payload: &PacketHandle) -> Result<()> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_direct_injector_passes_sends_through() {
        let transport = Arc::new(CountingTransport {
            addr: "10.0.0.1:7777".parse().unwrap(),
            sent: AtomicUsize::new(0),
        });
        let injector =
            DirectConnectionInjector::new(StubPeer::new("steve"), transport.clone());

        assert!(injector.transport().is_ok());
        assert_eq!(injector.address().unwrap(), transport.addr);

        injector.send(wrap_stub(), true).unwrap();
        injector.send(wrap_stub(), false).unwrap();
        assert_eq!(transport.sent.load(Ordering::SeqCst), 2);

        // Nothing queued, so a transfer carries nothing.
        let successor = QueuedConnectionInjector::new(StubPeer::new("steve"));
        injector.transfer_state(&successor).unwrap();
        assert!(successor.queue.is_empty());
    }
}
