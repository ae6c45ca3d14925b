//! Datagram transport
//!
//! The one socket the node owns, behind a small trait so the event loop can
//! run against an in-process fake in tests. Production is a single UDP
//! socket with broadcast permission: HELLO and election traffic fan out to
//! the limited-broadcast address, name-resolution replies go back unicast to
//! the observed source address.
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::error::{Result, ShrikeError};

/// Largest datagram we will accept; anything longer than the fixed packet
/// size is rejected by the codec, not truncated silently.
const RECV_BUFFER_SIZE: usize = 1500;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send to every node in the broadcast domain, including ourselves.
    async fn broadcast(&self, data: &[u8]) -> Result<()>;

    /// Send to one peer's observed source address.
    async fn send_to(&self, target: SocketAddr, data: &[u8]) -> Result<()>;

    /// Wait for the next datagram. Callers bound this with a timeout.
    async fn recv(&self) -> Result<(Vec<u8>, SocketAddr)>;
}

/// Production transport: one UDP socket bound to the well-known port with
/// `SO_BROADCAST` set.
pub struct UdpTransport {
    socket: UdpSocket,
    broadcast_addr: SocketAddr,
}

impl UdpTransport {
    pub async fn bind(port: u16) -> Result<Self> {
        let bind_addr = SocketAddr::from((IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| ShrikeError::Transport(format!("bind {} failed: {}", bind_addr, e)))?;
        socket
            .set_broadcast(true)
            .map_err(|e| ShrikeError::Transport(format!("set_broadcast failed: {}", e)))?;
        Ok(Self {
            socket,
            broadcast_addr: SocketAddr::from((IpAddr::V4(Ipv4Addr::BROADCAST), port)),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| ShrikeError::Transport(format!("local_addr failed: {}", e)))
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn broadcast(&self, data: &[u8]) -> Result<()> {
        self.socket.send_to(data, self.broadcast_addr).await?;
        Ok(())
    }

    async fn send_to(&self, target: SocketAddr, data: &[u8]) -> Result<()> {
        self.socket.send_to(data, target).await?;
        Ok(())
    }

    async fn recv(&self) -> Result<(Vec<u8>, SocketAddr)> {
        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let (len, addr) = self.socket.recv_from(&mut buf).await?;
        Ok((buf[..len].to_vec(), addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_bind_ephemeral_and_local_addr() {
        let transport = UdpTransport::bind(0).await.expect("Should bind port 0");
        let addr = transport.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[tokio::test]
    async fn test_unicast_round_trip() {
        let a = UdpTransport::bind(0).await.unwrap();
        let b = UdpTransport::bind(0).await.unwrap();

        let b_addr = SocketAddr::from(([127, 0, 0, 1], b.local_addr().unwrap().port()));
        a.send_to(b_addr, b"sixteen bytes!!!").await.unwrap();

        let (data, from) = timeout(Duration::from_secs(2), b.recv())
            .await
            .expect("Should receive within the timeout")
            .unwrap();
        assert_eq!(data, b"sixteen bytes!!!");
        assert_eq!(from.port(), a.local_addr().unwrap().port());
    }
}
