//! Wire codec
//!
//! Fixed-layout 16-byte datagrams, all multi-byte integers big-endian:
//!
//! ```text
//! offset 0: u16 sender_id
//! offset 2: u16 type
//! offset 4: 12-byte payload, interpretation keyed by type
//! ```
//!
//! The payload is modeled as a tagged enum rather than a raw union so an
//! invalid access is impossible by construction. This module is the single
//! chokepoint for byte-order handling; everything else works with decoded,
//! host-order values.
use crate::clock::{self, TimeVal, TIME_WIRE_SIZE};
use crate::error::WireError;

/// Total size of every datagram on the wire.
pub const PACKET_SIZE: usize = 16;

/// Size of the payload area.
pub const PAYLOAD_SIZE: usize = 12;

/// Longest allowed display name. The 12th payload byte is always zero and
/// never written, so bounded reads can stop there.
pub const MAX_NAME_LEN: usize = 11;

/// A display name: at most [`MAX_NAME_LEN`] printable ASCII characters.
///
/// May be empty, which the registry treats as "pending name resolution."
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerName(String);

impl PeerName {
    pub fn new(name: &str) -> Result<Self, WireError> {
        if name.len() > MAX_NAME_LEN {
            return Err(WireError::BadName(format!(
                "'{}' is {} bytes, max is {}",
                name,
                name.len(),
                MAX_NAME_LEN
            )));
        }
        if !name.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
            return Err(WireError::BadName(format!(
                "'{}' contains non-printable or non-ASCII bytes",
                name.escape_default()
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Zero-padded payload field. Name bytes are raw ASCII; padding is zero.
    fn to_field(&self) -> [u8; PAYLOAD_SIZE] {
        let mut field = [0u8; PAYLOAD_SIZE];
        field[..self.0.len()].copy_from_slice(self.0.as_bytes());
        field
    }

    /// Bounded read: stops at the first zero byte, never past byte 11.
    fn from_field(field: &[u8; PAYLOAD_SIZE]) -> Result<Self, WireError> {
        let len = field[..MAX_NAME_LEN]
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(MAX_NAME_LEN);
        let name = std::str::from_utf8(&field[..len])
            .map_err(|e| WireError::BadName(e.to_string()))?;
        Self::new(name)
    }
}

impl std::fmt::Display for PeerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded datagram payload, keyed by the wire type field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Liveness broadcast (type 1, empty payload)
    Hello,
    /// Name-addressed identity lookup, legacy path (type 2)
    GetId { name: PeerName },
    /// Id-addressed name request (type 3)
    GetName { id: u16 },
    /// Identity reply carrying the sender's name (type 4)
    NameId { name: PeerName },
    /// Open a new election round (type 5)
    StartElection,
    /// Competing claim within an election round (type 6)
    Election,
    /// Leadership claim (type 7)
    Master,
    /// Reserved for a future clock-synchronization phase (type 8)
    StartSync,
    /// Reserved: timestamp sample for clock synchronization (type 9)
    Sync { time: TimeVal },
}

impl Message {
    pub fn kind(&self) -> u16 {
        match self {
            Message::Hello => 1,
            Message::GetId { .. } => 2,
            Message::GetName { .. } => 3,
            Message::NameId { .. } => 4,
            Message::StartElection => 5,
            Message::Election => 6,
            Message::Master => 7,
            Message::StartSync => 8,
            Message::Sync { .. } => 9,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Message::Hello => "HELLO",
            Message::GetId { .. } => "GET_ID",
            Message::GetName { .. } => "GET_NAME",
            Message::NameId { .. } => "NAME_ID",
            Message::StartElection => "START_ELECTION",
            Message::Election => "ELECTION",
            Message::Master => "MASTER",
            Message::StartSync => "START_SYNC",
            Message::Sync { .. } => "SYNC",
        }
    }
}

/// One datagram: the originating node and its decoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub sender_id: u16,
    pub message: Message,
}

impl Packet {
    pub fn new(sender_id: u16, message: Message) -> Self {
        Self { sender_id, message }
    }

    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut buf = [0u8; PACKET_SIZE];
        buf[0..2].copy_from_slice(&self.sender_id.to_be_bytes());
        buf[2..4].copy_from_slice(&self.message.kind().to_be_bytes());
        match &self.message {
            Message::Hello | Message::StartElection | Message::Election | Message::Master
            | Message::StartSync => {}
            Message::GetName { id } => buf[4..6].copy_from_slice(&id.to_be_bytes()),
            Message::GetId { name } | Message::NameId { name } => {
                buf[4..4 + PAYLOAD_SIZE].copy_from_slice(&name.to_field())
            }
            Message::Sync { time } => {
                buf[4..4 + TIME_WIRE_SIZE].copy_from_slice(&clock::time_to_net(*time))
            }
        }
        buf
    }

    pub fn decode(data: &[u8]) -> Result<Self, WireError> {
        if data.len() != PACKET_SIZE {
            return Err(WireError::Truncated {
                expected: PACKET_SIZE,
                actual: data.len(),
            });
        }
        let sender_id = u16::from_be_bytes([data[0], data[1]]);
        let kind = u16::from_be_bytes([data[2], data[3]]);
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&data[4..4 + PAYLOAD_SIZE]);

        let message = match kind {
            1 => Message::Hello,
            2 => Message::GetId {
                name: PeerName::from_field(&payload)?,
            },
            3 => Message::GetName {
                id: u16::from_be_bytes([payload[0], payload[1]]),
            },
            4 => Message::NameId {
                name: PeerName::from_field(&payload)?,
            },
            5 => Message::StartElection,
            6 => Message::Election,
            7 => Message::Master,
            8 => Message::StartSync,
            9 => {
                let mut time = [0u8; TIME_WIRE_SIZE];
                time.copy_from_slice(&payload[..TIME_WIRE_SIZE]);
                Message::Sync {
                    time: clock::net_to_time(time),
                }
            }
            other => return Err(WireError::UnknownType(other)),
        };
        Ok(Self { sender_id, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_kind() {
        let name = PeerName::new("Sascha").expect("Should accept a short name");
        let packets = vec![
            Packet::new(7, Message::Hello),
            Packet::new(512, Message::GetId { name: name.clone() }),
            Packet::new(65535, Message::GetName { id: 300 }),
            Packet::new(0, Message::NameId { name }),
            Packet::new(1, Message::StartElection),
            Packet::new(2, Message::Election),
            Packet::new(3, Message::Master),
            Packet::new(4, Message::StartSync),
            Packet::new(5, Message::Sync { time: -123_456 }),
        ];
        for packet in packets {
            let decoded =
                Packet::decode(&packet.encode()).expect("Should decode an encoded packet");
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn test_layout_is_big_endian() {
        let encoded = Packet::new(0x0102, Message::GetName { id: 0x0304 }).encode();
        assert_eq!(&encoded[..6], &[0x01, 0x02, 0x00, 0x03, 0x03, 0x04]);
        assert!(encoded[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_name_payload_is_zero_padded() {
        let name = PeerName::new("ab").unwrap();
        let encoded = Packet::new(1, Message::NameId { name }).encode();
        assert_eq!(&encoded[4..6], b"ab");
        assert!(encoded[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_max_length_name_leaves_terminator_byte() {
        let name = PeerName::new("elevenchars").unwrap();
        assert_eq!(name.as_str().len(), MAX_NAME_LEN);
        let encoded = Packet::new(1, Message::NameId { name: name.clone() }).encode();
        // byte 12 of the payload stays zero even at the max name length
        assert_eq!(encoded[15], 0);
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded.message, Message::NameId { name });
    }

    #[test]
    fn test_wrong_length_is_rejected() {
        let encoded = Packet::new(1, Message::Hello).encode();
        assert!(matches!(
            Packet::decode(&encoded[..15]),
            Err(WireError::Truncated { actual: 15, .. })
        ));
        let mut long = encoded.to_vec();
        long.push(0);
        assert!(matches!(
            Packet::decode(&long),
            Err(WireError::Truncated { actual: 17, .. })
        ));
        assert!(matches!(
            Packet::decode(&[]),
            Err(WireError::Truncated { actual: 0, .. })
        ));
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mut encoded = Packet::new(1, Message::Hello).encode();
        encoded[2..4].copy_from_slice(&99u16.to_be_bytes());
        assert!(matches!(
            Packet::decode(&encoded),
            Err(WireError::UnknownType(99))
        ));
    }

    #[test]
    fn test_name_bounds() {
        assert!(PeerName::new("").unwrap().is_empty());
        assert!(PeerName::new("elevenchars").is_ok());
        assert!(matches!(
            PeerName::new("twelve chars"),
            Err(WireError::BadName(_))
        ));
        assert!(matches!(PeerName::new("tab\there"), Err(WireError::BadName(_))));
        assert!(matches!(PeerName::new("ümlaut"), Err(WireError::BadName(_))));
    }

    #[test]
    fn test_name_decode_stops_at_first_zero() {
        let mut encoded = Packet::new(1, Message::Hello).encode();
        encoded[2..4].copy_from_slice(&4u16.to_be_bytes());
        encoded[4..7].copy_from_slice(b"abc");
        // garbage after the terminator must not leak into the name
        encoded[9] = b'x';
        let decoded = Packet::decode(&encoded).unwrap();
        match decoded.message {
            Message::NameId { name } => assert_eq!(name.as_str(), "abc"),
            other => panic!("expected NAME_ID, got {:?}", other),
        }
    }
}
