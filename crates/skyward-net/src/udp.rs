//! Datagram endpoint with bounded-wait receives.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;

use crate::error::NetError;
use crate::messages::{CodecError, Message, decode, encode};

/// Largest datagram the endpoint will read.
pub const DEFAULT_MAX_DATAGRAM: usize = 65536;

/// One received datagram. Decoding failures are handed to the caller so it
/// can tell an unknown message type from garbage.
#[derive(Debug)]
pub struct Datagram {
    pub from: SocketAddr,
    pub message: Result<Message, CodecError>,
}

/// A UDP socket speaking the JSON message protocol.
///
/// Cheap to clone; clones share the socket, so one task can receive while
/// others send.
#[derive(Clone)]
pub struct Endpoint {
    socket: Arc<UdpSocket>,
    max_datagram: usize,
}

impl Endpoint {
    /// Binds a new endpoint at `addr`.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        Ok(Self::from_socket(UdpSocket::bind(addr).await?))
    }

    /// Wraps an already bound socket.
    pub fn from_socket(socket: UdpSocket) -> Self {
        Self {
            socket: Arc::new(socket),
            max_datagram: DEFAULT_MAX_DATAGRAM,
        }
    }

    pub fn with_max_datagram(mut self, max_datagram: usize) -> Self {
        self.max_datagram = max_datagram;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Encodes and sends one message. Delivery is not confirmed.
    pub async fn send(&self, msg: &Message, to: SocketAddr) -> Result<(), NetError> {
        let bytes = encode(msg)?;
        self.send_raw(&bytes, to).await?;
        Ok(())
    }

    /// Sends an already encoded payload.
    pub async fn send_raw(&self, bytes: &[u8], to: SocketAddr) -> io::Result<()> {
        self.socket.send_to(bytes, to).await?;
        Ok(())
    }

    /// A receiver with its own buffer, sized once to the datagram limit.
    pub fn receiver(&self) -> Receiver {
        Receiver {
            endpoint: self.clone(),
            buf: vec![0u8; self.max_datagram],
        }
    }
}

/// Receiving half of an [`Endpoint`]. Reuses one buffer across receives;
/// hold it for the lifetime of a receive loop.
pub struct Receiver {
    endpoint: Endpoint,
    buf: Vec<u8>,
}

impl Receiver {
    /// Waits at most `wait` for one datagram. `Ok(None)` means nothing
    /// arrived in time.
    pub async fn recv(&mut self, wait: Duration) -> Result<Option<Datagram>, NetError> {
        let received = self.endpoint.socket.recv_from(&mut self.buf);
        match tokio::time::timeout(wait, received).await {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(e.into()),
            Ok(Ok((len, from))) => Ok(Some(Datagram {
                from,
                message: decode(&self.buf[..len]),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::UserRef;

    async fn loopback() -> Endpoint {
        Endpoint::bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let a = loopback().await;
        let b = loopback().await;
        let msg = Message::Respawn(UserRef {
            username: "ann".into(),
        });
        a.send(&msg, b.local_addr().unwrap()).await.unwrap();

        let datagram = b.receiver().recv(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(datagram.from, a.local_addr().unwrap());
        assert_eq!(datagram.message.unwrap(), msg);
    }

    #[tokio::test]
    async fn test_recv_times_out_without_data() {
        let a = loopback().await;
        let result = a.receiver().recv(Duration::from_millis(20)).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_garbage_surfaces_as_codec_error() {
        let a = loopback().await;
        let b = loopback().await;
        a.send_raw(b"not json", b.local_addr().unwrap()).await.unwrap();

        let datagram = b.receiver().recv(Duration::from_secs(1)).await.unwrap().unwrap();
        assert!(matches!(datagram.message, Err(CodecError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_receiver_reuses_buffer_across_datagrams() {
        let a = loopback().await;
        let b = loopback().await;
        let mut inbox = b.receiver();
        let to = b.local_addr().unwrap();

        let long = Message::Respawn(UserRef {
            username: "a".repeat(200),
        });
        let short = Message::Respawn(UserRef {
            username: "bo".into(),
        });
        a.send(&long, to).await.unwrap();
        a.send(&short, to).await.unwrap();

        let first = inbox.recv(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(first.message.unwrap(), long);
        // Leftover bytes of the longer datagram must not leak into the next.
        let second = inbox.recv(Duration::from_secs(1)).await.unwrap().unwrap();
        assert_eq!(second.message.unwrap(), short);
        assert_eq!(inbox.buf.len(), DEFAULT_MAX_DATAGRAM);
    }
}
