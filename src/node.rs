//! Node event loop
//!
//! Single task owning the socket, the virtual clock, the peer registry and
//! the election engine. Each iteration blocks on the socket with a timeout
//! computed from the nearest pending deadline (heartbeat broadcast, or the
//! engine's election/master-wait phase), then fires every timer that expired
//! and dispatches whatever datagram arrived. Nothing here needs locking:
//! all mutable state is owned by this one task.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::clock::{TimeVal, VirtualClock};
use crate::election::{ElectionEngine, Role};
use crate::registry::PeerRegistry;
use crate::settings::Settings;
use crate::transport::Transport;
use crate::wire::{Message, Packet};

/// Snapshot of the node's protocol position, published after every loop
/// iteration for observers (and the integration tests).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeStatus {
    pub role: Role,
    pub master_id: u16,
    pub known_peers: usize,
}

pub struct Node {
    settings: Settings,
    clock: VirtualClock,
    registry: PeerRegistry,
    engine: ElectionEngine,
    transport: Arc<dyn Transport>,
    /// Virtual time of the next HELLO broadcast and registry sweep
    heartbeat_deadline: TimeVal,
    status_tx: watch::Sender<NodeStatus>,
}

impl Node {
    pub fn new(settings: Settings, transport: Arc<dyn Transport>) -> Self {
        let clock = match (settings.clock_offset_us, settings.clock_drift_pct) {
            (Some(offset), Some(drift)) => VirtualClock::configure(offset, drift),
            (Some(offset), None) => {
                VirtualClock::configure(offset, crate::clock::NOMINAL_DRIFT_PCT)
            }
            (None, Some(drift)) => VirtualClock::configure(0, drift),
            (None, None) => VirtualClock::init(),
        };
        let engine = ElectionEngine::new(
            settings.node_id,
            settings.election_timeout_us(),
            settings.master_wait_timeout_us(),
        );
        let (status_tx, _) = watch::channel(NodeStatus {
            role: engine.role(),
            master_id: engine.master_id(),
            known_peers: 0,
        });
        let heartbeat_deadline = clock.now() + settings.heartbeat_interval_us();
        Self {
            settings,
            clock,
            registry: PeerRegistry::new(),
            engine,
            transport,
            heartbeat_deadline,
            status_tx,
        }
    }

    /// Observe role/master/peer-count changes without touching the loop.
    pub fn status(&self) -> watch::Receiver<NodeStatus> {
        self.status_tx.subscribe()
    }

    /// Runs the protocol forever. Only startup failures escape; everything
    /// at runtime is logged and retried by the next timer firing.
    pub async fn run(&mut self) -> crate::error::Result<()> {
        info!(
            node_id = self.settings.node_id,
            name = %self.settings.node_name,
            "announcing to the broadcast domain"
        );
        let now = self.clock.now();
        self.heartbeat_deadline = now + self.settings.heartbeat_interval_us();
        self.broadcast(Message::Hello).await;
        // a cold-started cluster only converges if somebody opens a round
        let opening = self.engine.start_election(now);
        self.broadcast_all(opening).await;
        self.publish_status();

        loop {
            let wait_ms = self.clock.poll_timeout(self.next_deadline());
            match timeout(Duration::from_millis(wait_ms), self.transport.recv()).await {
                Ok(Ok((data, source))) => self.on_datagram(&data, source).await,
                Ok(Err(e)) => warn!(error = %e, "datagram receive failed"),
                // deadline reached with no datagram
                Err(_elapsed) => {}
            }
            self.fire_timers().await;
            self.publish_status();
        }
    }

    fn next_deadline(&self) -> TimeVal {
        match self.engine.deadline() {
            Some(phase) => phase.min(self.heartbeat_deadline),
            None => self.heartbeat_deadline,
        }
    }

    /// Fires every timer whose deadline has passed; several can expire in one
    /// iteration when datagram handling ran long.
    async fn fire_timers(&mut self) {
        let now = self.clock.now();
        if now >= self.heartbeat_deadline {
            self.broadcast(Message::Hello).await;
            let expired = self
                .registry
                .sweep_expired(now, self.settings.peer_expiry_us());
            self.heartbeat_deadline = now + self.settings.heartbeat_interval_us();
            if !expired.is_empty() {
                for id in &expired {
                    info!(peer = id, "missing HELLOs, removed from registry");
                }
                let out = self.engine.start_election(now);
                self.broadcast_all(out).await;
            }
        }
        let out = self.engine.poll_timers(now);
        self.broadcast_all(out).await;
    }

    async fn on_datagram(&mut self, data: &[u8], source: SocketAddr) {
        let packet = match Packet::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(error = %e, %source, "dropping undecodable datagram");
                return;
            }
        };
        let now = self.clock.now();
        debug!(
            sender = packet.sender_id,
            kind = packet.message.kind_name(),
            %source,
            "datagram received"
        );

        if packet.sender_id == self.settings.node_id {
            // our own broadcast looping back; only START_ELECTION carries
            // meaning (the local transition into candidacy)
            if packet.message == Message::StartElection {
                let out = self
                    .engine
                    .handle(packet.sender_id, &packet.message, now);
                self.broadcast_all(out).await;
            } else {
                debug!("discarded datagram sent by myself");
            }
            return;
        }

        match &packet.message {
            Message::Hello | Message::GetId { .. } | Message::GetName { .. }
            | Message::NameId { .. } => {
                self.on_identity(&packet, source, now).await;
            }
            Message::StartElection | Message::Election | Message::Master => {
                let out = self
                    .engine
                    .handle(packet.sender_id, &packet.message, now);
                self.broadcast_all(out).await;
            }
            Message::StartSync | Message::Sync { .. } => {
                debug!("reserved sync message, ignoring");
            }
        }
    }

    /// Identity and name-resolution traffic: every contact refreshes the
    /// sender's heartbeat, and an unresolved sender gets a GET_NAME nudge.
    async fn on_identity(&mut self, packet: &Packet, source: SocketAddr, now: TimeVal) {
        let sender = packet.sender_id;
        match &packet.message {
            Message::Hello => self.registry.upsert_heartbeat(sender, now),
            Message::NameId { name } => {
                info!(peer = sender, name = %name, "name resolved");
                self.registry.upsert_name(sender, name.clone(), now);
            }
            Message::GetName { id } => {
                self.registry.upsert_heartbeat(sender, now);
                if *id == self.settings.node_id {
                    let reply = Message::NameId {
                        name: self.settings.node_name.clone(),
                    };
                    self.send_unicast(source, reply).await;
                }
            }
            Message::GetId { name } => {
                // legacy name-based addressing: exact match only
                self.registry.upsert_heartbeat(sender, now);
                if *name == self.settings.node_name {
                    let reply = Message::NameId {
                        name: self.settings.node_name.clone(),
                    };
                    self.send_unicast(source, reply).await;
                }
            }
            _ => unreachable!("only identity messages are routed here"),
        }

        let needs_name = self
            .registry
            .get(sender)
            .map(|peer| !peer.is_resolved())
            .unwrap_or(false);
        if needs_name {
            self.send_unicast(source, Message::GetName { id: sender }).await;
        }
    }

    async fn broadcast_all(&self, messages: Vec<Message>) {
        for message in messages {
            self.broadcast(message).await;
        }
    }

    /// A failed send is logged and abandoned for this cycle; the next timer
    /// firing retries naturally.
    async fn broadcast(&self, message: Message) {
        debug!(kind = message.kind_name(), "broadcasting");
        let packet = Packet::new(self.settings.node_id, message);
        if let Err(e) = self.transport.broadcast(&packet.encode()).await {
            warn!(error = %e, "broadcast failed");
        }
    }

    async fn send_unicast(&self, target: SocketAddr, message: Message) {
        debug!(kind = message.kind_name(), %target, "sending");
        let packet = Packet::new(self.settings.node_id, message);
        if let Err(e) = self.transport.send_to(target, &packet.encode()).await {
            warn!(error = %e, %target, "send failed");
        }
    }

    fn publish_status(&self) {
        self.status_tx.send_replace(NodeStatus {
            role: self.engine.role(),
            master_id: self.engine.master_id(),
            known_peers: self.registry.len(),
        });
    }
}
