//! Shrike: peer discovery and bully-style leader election on a LAN.
//!
//! Every process broadcasts HELLO heartbeats on a shared UDP port, learns
//! peer identities over a tiny fixed-layout packet protocol, evicts peers
//! that go silent, and converges on the highest live node id as leader.
//! Timestamps come from an adjustable virtual clock so a test network can
//! simulate drifting, offset hardware clocks.
pub mod cli;
pub mod clock;
pub mod election;
pub mod error;
pub mod node;
pub mod registry;
pub mod settings;
pub mod transport;
pub mod wire;
