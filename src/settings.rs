//! Shrike application settings
use crate::clock::TimeVal;
use crate::wire::PeerName;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Well-known UDP port the whole broadcast domain shares.
pub const STANDARD_PORT: u16 = 57539;
pub const DEFAULT_PORT: &str = "57539";

/// Period between HELLO liveness broadcasts.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 10_000;

/// How long a candidate waits for competing claims before self-proclaiming.
pub const ELECTION_TIMEOUT_MS: u64 = 300;

/// How long a deferring node waits for the winner's MASTER claim.
pub const MASTER_WAIT_TIMEOUT_MS: u64 = 600;

/// Fallback display name when none is configured.
pub const DEFAULT_NODE_NAME: &str = "anonymous";

#[derive(Clone, Debug)]
pub struct Settings {
    /// Node identifier; the highest id in the broadcast domain wins elections
    pub node_id: u16,

    /// Display name, resolved by peers via GET_NAME/NAME_ID
    pub node_name: PeerName,

    /// UDP port to bind and broadcast on
    pub listen_port: u16,

    /// HELLO broadcast period
    pub heartbeat_interval_ms: u64,

    /// Virtual clock offset; None means randomize at startup
    pub clock_offset_us: Option<TimeVal>,

    /// Virtual clock drift percentage; None means randomize at startup
    pub clock_drift_pct: Option<i64>,
}

impl Settings {
    /// A peer missing this many microseconds of HELLOs is declared dead.
    pub fn peer_expiry_us(&self) -> TimeVal {
        2 * self.heartbeat_interval_us()
    }

    pub fn heartbeat_interval_us(&self) -> TimeVal {
        self.heartbeat_interval_ms as TimeVal * 1000
    }

    pub fn election_timeout_us(&self) -> TimeVal {
        ELECTION_TIMEOUT_MS as TimeVal * 1000
    }

    pub fn master_wait_timeout_us(&self) -> TimeVal {
        MASTER_WAIT_TIMEOUT_MS as TimeVal * 1000
    }
}

/// Default node id: the low 16 bits of the OS process id, so unconfigured
/// processes on one host still get distinct-ish ids.
pub fn default_node_id() -> u16 {
    std::process::id() as u16
}
