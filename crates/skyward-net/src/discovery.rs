//! LAN discovery: the authority broadcasts its game port, clients listen.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;

use crate::error::NetError;
use crate::messages::{Discovery, Message, encode};
use crate::udp::Endpoint;

/// Default port discovery announcements are sent to.
pub const DEFAULT_DISCOVERY_PORT: u16 = 37020;

/// Default port the authority serves the game on.
pub const DEFAULT_GAME_PORT: u16 = 50007;

/// Binds a broadcast-capable UDP socket with `SO_REUSEADDR`, so several
/// clients on one host can listen on the discovery port at once.
///
/// Must be called from within a Tokio runtime.
pub fn bind_reusable(addr: SocketAddr) -> io::Result<UdpSocket> {
    let socket = socket2::Socket::new(
        socket2::Domain::for_address(addr),
        socket2::Type::DGRAM,
        Some(socket2::Protocol::UDP),
    )?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket)
}

/// The limited-broadcast address on `port`.
pub fn broadcast_target(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), port)
}

/// Sends the authority's discovery announcement.
pub struct Announcer {
    endpoint: Endpoint,
    target: SocketAddr,
    payload: Vec<u8>,
}

impl Announcer {
    /// Announces `game_port` to the broadcast address on `discovery_port`.
    pub fn bind(game_port: u16, discovery_port: u16) -> Result<Self, NetError> {
        let any = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
        let endpoint = Endpoint::from_socket(bind_reusable(any)?);
        Self::with_endpoint(endpoint, game_port, broadcast_target(discovery_port))
    }

    /// Announces `game_port` to an explicit `target` through `endpoint`.
    pub fn with_endpoint(
        endpoint: Endpoint,
        game_port: u16,
        target: SocketAddr,
    ) -> Result<Self, NetError> {
        let payload = encode(&Message::Discovery(Discovery { port: game_port }))?;
        Ok(Self {
            endpoint,
            target,
            payload,
        })
    }

    /// Sends one announcement.
    pub async fn announce(&self) -> Result<(), NetError> {
        self.endpoint.send_raw(&self.payload, self.target).await?;
        Ok(())
    }
}

/// Listens for discovery announcements.
pub struct DiscoveryListener {
    endpoint: Endpoint,
}

impl DiscoveryListener {
    pub fn bind(addr: SocketAddr) -> Result<Self, NetError> {
        Ok(Self {
            endpoint: Endpoint::from_socket(bind_reusable(addr)?),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.endpoint.local_addr()
    }

    /// Returns the game address of the first authority heard within `wait`.
    ///
    /// Anything other than a discovery announcement is ignored.
    pub async fn wait_for_server(&self, wait: Duration) -> Result<SocketAddr, NetError> {
        let mut inbox = self.endpoint.receiver();
        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(NetError::DiscoveryTimeout(wait));
            }
            let Some(datagram) = inbox.recv(remaining).await? else {
                return Err(NetError::DiscoveryTimeout(wait));
            };
            match datagram.message {
                Ok(Message::Discovery(Discovery { port })) => {
                    let server = SocketAddr::new(datagram.from.ip(), port);
                    tracing::info!("Discovered server at {server}");
                    return Ok(server);
                }
                other => tracing::debug!("Ignoring non-discovery datagram: {other:?}"),
            }
        }
    }
}

/// Listens on every interface for up to `wait` and returns the first
/// authority found.
pub async fn discover(discovery_port: u16, wait: Duration) -> Result<SocketAddr, NetError> {
    let any = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), discovery_port);
    DiscoveryListener::bind(any)?.wait_for_server(wait).await
}
