//! CLI for this application
//!
use crate::clock::TimeVal;
use crate::error::{Result, ShrikeError};
use crate::settings;
use crate::wire::PeerName;

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone, Debug, clap::Parser)]
#[clap(name = APP_NAME, version = APP_VERSION)]
pub struct Cli {
    // Node identifier: the highest live id wins elections
    #[clap(
        long,
        env("SHRIKE_NODE_ID"),
        help = "Node id between 0 and 65535 (default: derived from the process id)"
    )]
    pub node_id: Option<u16>,

    // Display name resolved by peers over GET_NAME/NAME_ID
    #[clap(
        long,
        default_value = settings::DEFAULT_NODE_NAME,
        env("SHRIKE_NODE_NAME"),
        help = "Display name, at most 11 printable ASCII characters"
    )]
    pub node_name: String,

    // UDP port shared by the whole broadcast domain
    #[clap(
        long,
        default_value = settings::DEFAULT_PORT,
        env("SHRIKE_LISTEN_PORT"),
        help = "UDP port to bind and broadcast on"
    )]
    pub listen_port: u16,

    // HELLO broadcast period
    #[clap(
        long,
        default_value = "10000",
        env("SHRIKE_HEARTBEAT_INTERVAL_MS"),
        help = "Milliseconds between HELLO broadcasts"
    )]
    pub heartbeat_interval_ms: u64,

    // Virtual clock simulation: constant shift
    #[clap(
        long,
        env("SHRIKE_CLOCK_OFFSET_US"),
        help = "Virtual clock offset in microseconds (default: randomized)"
    )]
    pub clock_offset_us: Option<TimeVal>,

    // Virtual clock simulation: rate scaling
    #[clap(
        long,
        env("SHRIKE_CLOCK_DRIFT_PCT"),
        help = "Virtual clock drift rate in percent, 100 = real time (default: randomized)"
    )]
    pub clock_drift_pct: Option<i64>,
}

impl Cli {
    pub fn into_settings(self) -> Result<settings::Settings> {
        let node_name = PeerName::new(&self.node_name)
            .map_err(|e| ShrikeError::Config(format!("Invalid NAME provided: {}", e)))?;
        Ok(settings::Settings {
            node_id: self.node_id.unwrap_or_else(settings::default_node_id),
            node_name,
            listen_port: self.listen_port,
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            clock_offset_us: self.clock_offset_us,
            clock_drift_pct: self.clock_drift_pct,
        })
    }
}
