//! Election engine
//!
//! Bully-style leader election: the numerically highest live id always wins.
//! A node defers to any competing claim from a strictly higher id and asserts
//! itself against any strictly lower id; every phase is bounded by a timeout
//! that re-triggers the same broadcast, so lost datagrams only delay
//! convergence.
//!
//! The engine is a pure state machine. Inputs are inbound election messages
//! and timer polls, both stamped with the current virtual time; outputs are
//! the messages to broadcast. The caller owns the socket and the clock.
use tracing::{debug, info};

use crate::clock::TimeVal;
use crate::wire::Message;

/// The local node's position in the election protocol.
///
/// At most one of Candidate/WaitingForMaster/Master is ever active, and
/// `master_id` is meaningful only outside Candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Normal operation, believes a master exists
    Idle,
    /// Broadcast an election round, awaiting competing claims
    Candidate,
    /// Lost to a higher id, awaiting its MASTER claim
    WaitingForMaster,
    /// This node is the leader
    Master,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Idle => write!(f, "idle"),
            Role::Candidate => write!(f, "candidate"),
            Role::WaitingForMaster => write!(f, "waiting-for-master"),
            Role::Master => write!(f, "master"),
        }
    }
}

#[derive(Debug)]
pub struct ElectionEngine {
    self_id: u16,
    role: Role,
    master_id: u16,
    /// Virtual time at which the current election/master-wait phase times out
    deadline: Option<TimeVal>,
    election_timeout_us: TimeVal,
    master_wait_timeout_us: TimeVal,
}

impl ElectionEngine {
    /// A fresh node starts as its own master until the protocol says
    /// otherwise.
    pub fn new(self_id: u16, election_timeout_us: TimeVal, master_wait_timeout_us: TimeVal) -> Self {
        Self {
            self_id,
            role: Role::Master,
            master_id: self_id,
            deadline: None,
            election_timeout_us,
            master_wait_timeout_us,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// The currently believed leader. Stale while a round is in flight.
    pub fn master_id(&self) -> u16 {
        self.master_id
    }

    /// Deadline of the active phase, if one is armed.
    pub fn deadline(&self) -> Option<TimeVal> {
        self.deadline
    }

    /// Opens a new election round: used at startup and whenever the registry
    /// sweep evicts a peer.
    pub fn start_election(&mut self, now: TimeVal) -> Vec<Message> {
        info!(self_id = self.self_id, "starting election round");
        self.become_candidate(now);
        vec![Message::StartElection]
    }

    /// Applies one inbound election-related message to the state table.
    /// Messages that do not match any transition guard are no-ops, which is
    /// what makes duplicate delivery harmless.
    pub fn handle(&mut self, sender: u16, message: &Message, now: TimeVal) -> Vec<Message> {
        match message {
            Message::StartElection => self.on_start_election(sender, now),
            Message::Election => self.on_election(sender, now),
            Message::Master => self.on_master(sender, now),
            other => {
                debug!(kind = other.kind_name(), "not an election message, ignoring");
                Vec::new()
            }
        }
    }

    /// Fires the phase timeout if its deadline has passed. A candidate that
    /// saw no higher claim self-proclaims, even with zero known peers, so a
    /// lone node never stalls; a deferring node that never heard the winner
    /// reopens the election.
    pub fn poll_timers(&mut self, now: TimeVal) -> Vec<Message> {
        match self.deadline {
            Some(deadline) if now >= deadline => {}
            _ => return Vec::new(),
        }
        self.deadline = None;
        match self.role {
            Role::Candidate => {
                info!(self_id = self.self_id, "election window closed, claiming mastership");
                self.role = Role::Master;
                self.master_id = self.self_id;
                vec![Message::Master]
            }
            Role::WaitingForMaster => {
                info!(self_id = self.self_id, "no MASTER claim arrived, reopening election");
                self.become_candidate(now);
                vec![Message::StartElection]
            }
            // Idle/Master never arm a phase deadline
            _ => Vec::new(),
        }
    }

    fn on_start_election(&mut self, sender: u16, now: TimeVal) -> Vec<Message> {
        if sender > self.self_id {
            // a higher id is running; wait for it to claim mastership
            debug!(sender, "deferring to higher-id election opener");
            self.become_waiting(now);
            Vec::new()
        } else if sender == self.self_id {
            // our own broadcast looping back: the local transition into
            // candidacy, not a discard case
            self.become_candidate(now);
            Vec::new()
        } else {
            debug!(sender, "contesting election opened by lower id");
            self.become_candidate(now);
            vec![Message::Election]
        }
    }

    fn on_election(&mut self, sender: u16, now: TimeVal) -> Vec<Message> {
        if self.role == Role::Candidate && sender > self.self_id {
            debug!(sender, "outbid by higher-id candidate");
            self.become_waiting(now);
        }
        Vec::new()
    }

    fn on_master(&mut self, sender: u16, now: TimeVal) -> Vec<Message> {
        match self.role {
            Role::Master if sender < self.self_id => {
                // a lower id claims the title we hold: defend it by forcing a
                // round everyone can observe
                info!(sender, "lower id claimed mastership, defending");
                self.become_candidate(now);
                return vec![Message::StartElection];
            }
            Role::Candidate if sender <= self.self_id => {
                // we outrank the claimant; our own claim follows on timeout
                return Vec::new();
            }
            Role::Master if sender == self.self_id => return Vec::new(),
            _ => {}
        }
        info!(master = sender, "accepting master");
        self.master_id = sender;
        self.role = Role::Idle;
        self.deadline = None;
        Vec::new()
    }

    fn become_candidate(&mut self, now: TimeVal) {
        self.role = Role::Candidate;
        self.deadline = Some(now + self.election_timeout_us);
    }

    fn become_waiting(&mut self, now: TimeVal) {
        self.role = Role::WaitingForMaster;
        self.deadline = Some(now + self.master_wait_timeout_us);
    }
}
