//! Peer registry
//!
//! Keyed store of every peer the node has heard from, with the liveness
//! bookkeeping behind failure detection: each entry remembers the virtual
//! time of its most recent HELLO, and a sweep on every heartbeat tick evicts
//! peers that have gone silent. Every eviction is a liveness-loss signal the
//! caller must answer with a re-election.
use std::collections::HashMap;

use crate::clock::TimeVal;
use crate::wire::PeerName;

/// One known peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    pub id: u16,
    /// None until a NAME_ID from this peer resolves it
    pub name: Option<PeerName>,
    /// Virtual time of the most recent liveness evidence; never moves backward
    pub last_heartbeat: TimeVal,
}

impl Peer {
    pub fn is_resolved(&self) -> bool {
        matches!(&self.name, Some(name) if !name.is_empty())
    }
}

#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<u16, Peer>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records liveness evidence for `id`. Inserts an unresolved entry on
    /// first contact; otherwise only advances the heartbeat timestamp.
    pub fn upsert_heartbeat(&mut self, id: u16, now: TimeVal) {
        self.peers
            .entry(id)
            .and_modify(|peer| peer.last_heartbeat = peer.last_heartbeat.max(now))
            .or_insert(Peer {
                id,
                name: None,
                last_heartbeat: now,
            });
    }

    /// Stores a resolved name for `id`. Last writer wins on conflicting
    /// claims; this protocol has no identity verification.
    pub fn upsert_name(&mut self, id: u16, name: PeerName, now: TimeVal) {
        let peer = self.peers.entry(id).or_insert(Peer {
            id,
            name: None,
            last_heartbeat: now,
        });
        peer.name = Some(name);
        peer.last_heartbeat = peer.last_heartbeat.max(now);
    }

    /// Removes and returns every peer whose last heartbeat is older than
    /// `timeout` microseconds. Called once per heartbeat-timer firing.
    pub fn sweep_expired(&mut self, now: TimeVal, timeout: TimeVal) -> Vec<u16> {
        let expired: Vec<u16> = self
            .peers
            .values()
            .filter(|peer| now - peer.last_heartbeat > timeout)
            .map(|peer| peer.id)
            .collect();
        for id in &expired {
            self.peers.remove(id);
        }
        expired
    }

    pub fn is_known(&self, id: u16) -> bool {
        self.peers.contains_key(&id)
    }

    pub fn get(&self, id: u16) -> Option<&Peer> {
        self.peers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }
}
