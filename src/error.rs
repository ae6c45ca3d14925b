use std::fmt;

/// Main error type for the shrike discovery/election service
#[derive(Debug)]
pub enum ShrikeError {
    /// Configuration or CLI argument errors
    Config(String),

    /// Socket setup and send/receive errors
    Transport(String),

    /// Wire-format errors on inbound datagrams
    Wire(WireError),

    /// System I/O errors
    Io(std::io::Error),
}

/// Rejections produced while decoding a datagram.
///
/// Every variant is non-fatal: the dispatcher logs the datagram and drops it.
#[derive(Debug)]
pub enum WireError {
    /// Datagram length did not match the fixed packet size
    Truncated { expected: usize, actual: usize },

    /// The type field held a value outside the known message kinds
    UnknownType(u16),

    /// Name payload was not printable ASCII or exceeded the name bound
    BadName(String),
}

impl fmt::Display for ShrikeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShrikeError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ShrikeError::Transport(msg) => write!(f, "Transport error: {}", msg),
            ShrikeError::Wire(err) => write!(f, "Wire error: {}", err),
            ShrikeError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Truncated { expected, actual } => {
                write!(f, "Datagram of {} bytes, expected {}", actual, expected)
            }
            WireError::UnknownType(value) => write!(f, "Unknown packet type: {}", value),
            WireError::BadName(msg) => write!(f, "Bad name payload: {}", msg),
        }
    }
}

impl std::error::Error for ShrikeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShrikeError::Io(err) => Some(err),
            ShrikeError::Wire(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for WireError {}

// Convenient type alias for Results using our error type
pub type Result<T> = std::result::Result<T, ShrikeError>;

// Conversions from common error types
impl From<std::io::Error> for ShrikeError {
    fn from(err: std::io::Error) -> Self {
        ShrikeError::Io(err)
    }
}

impl From<WireError> for ShrikeError {
    fn from(err: WireError) -> Self {
        ShrikeError::Wire(err)
    }
}

impl From<String> for ShrikeError {
    fn from(err: String) -> Self {
        ShrikeError::Config(err)
    }
}
