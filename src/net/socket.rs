//! Transport socket wrappers
//!
//! Two roles: [`ConnSocket`] is a connected TCP stream; [`RendezvousSocket`]
//! is either a UDP datagram endpoint or a TCP listener, fixed at
//! construction. Calling an operation that does not belong to the socket's
//! role fails with `NotSupported` instead of doing something surprising.
//!
//! Every wrapper owns its OS handle exclusively; the handle is released
//! exactly once when the wrapper drops.

use crate::error::{Error, Result};
use crate::net::addr;
use socket2::{Domain, Protocol, Socket, Type};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::time::Duration;

/// Receive buffer size when the caller has no better bound
pub const DEFAULT_RECV_LEN: usize = 512;

/// Transport semantics of a rendezvous socket, fixed at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// UDP endpoint: send_to / receive_from
    Datagram,
    /// TCP listener: accept
    Stream,
}

/// A connected TCP socket
pub struct ConnSocket {
    stream: TcpStream,
    peer: SocketAddr,
}

impl ConnSocket {
    /// Connect to a remote endpoint; no retry on failure
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).map_err(|e| Error::Connect { addr, source: e })?;
        let peer = stream.peer_addr()?;
        Ok(Self { stream, peer })
    }

    /// Wrap an accepted stream together with its discovered peer address
    pub fn from_stream(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }

    /// Address of the remote end
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send the whole buffer
    pub fn send(&mut self, bytes: &[u8]) -> Result<usize> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(bytes.len())
    }

    /// Receive up to `max` bytes; may return fewer
    pub fn receive(&mut self, max: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; max];
        let n = self.stream.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Receive exactly `n` bytes, blocking across short reads
    ///
    /// A peer that closes the stream mid-message surfaces as
    /// `ConnectionClosed`; a partial buffer is never returned as success.
    pub fn receive_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.stream.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::ConnectionClosed
            } else {
                Error::Io(e)
            }
        })?;
        Ok(buf)
    }
}

enum Endpoint {
    Datagram(UdpSocket),
    Listener(TcpListener),
}

/// A bound local socket: UDP endpoint or TCP listener
pub struct RendezvousSocket {
    endpoint: Endpoint,
    local: SocketAddr,
}

impl RendezvousSocket {
    /// Bind to the wildcard address on `port` with address reuse enabled
    ///
    /// Port 0 binds an ephemeral port; check [`local_addr`](Self::local_addr)
    /// for the assignment.
    pub fn bind(port: u16, kind: SocketKind) -> Result<Self> {
        let bind_addr = addr::wildcard(port);
        let (ty, proto) = match kind {
            SocketKind::Datagram => (Type::DGRAM, Protocol::UDP),
            SocketKind::Stream => (Type::STREAM, Protocol::TCP),
        };

        let raw = Socket::new(Domain::IPV4, ty, Some(proto)).map_err(|e| Error::Bind {
            addr: bind_addr,
            source: e,
        })?;
        raw.set_reuse_address(true).map_err(|e| Error::Bind {
            addr: bind_addr,
            source: e,
        })?;
        raw.bind(&bind_addr.into()).map_err(|e| Error::Bind {
            addr: bind_addr,
            source: e,
        })?;

        match kind {
            SocketKind::Datagram => {
                let udp: UdpSocket = raw.into();
                let local = udp.local_addr()?;
                Ok(Self {
                    endpoint: Endpoint::Datagram(udp),
                    local,
                })
            }
            SocketKind::Stream => {
                raw.listen(8).map_err(|e| Error::Bind {
                    addr: bind_addr,
                    source: e,
                })?;
                let listener: TcpListener = raw.into();
                let local = listener.local_addr()?;
                Ok(Self {
                    endpoint: Endpoint::Listener(listener),
                    local,
                })
            }
        }
    }

    /// Address this socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Allow sends to broadcast addresses; datagram sockets only
    pub fn enable_broadcast(&self) -> Result<()> {
        match &self.endpoint {
            Endpoint::Datagram(udp) => {
                udp.set_broadcast(true)?;
                Ok(())
            }
            Endpoint::Listener(_) => Err(Error::NotSupported("broadcast on a stream listener")),
        }
    }

    /// Read timeout for datagram receives
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.endpoint {
            Endpoint::Datagram(udp) => {
                udp.set_read_timeout(timeout)?;
                Ok(())
            }
            Endpoint::Listener(_) => Err(Error::NotSupported("read timeout on a stream listener")),
        }
    }

    /// Non-blocking mode; a listener in this mode returns `WouldBlock` from
    /// accept so the caller's loop can observe its shutdown flag
    pub fn set_nonblocking(&self, nonblocking: bool) -> Result<()> {
        match &self.endpoint {
            Endpoint::Datagram(udp) => udp.set_nonblocking(nonblocking)?,
            Endpoint::Listener(listener) => listener.set_nonblocking(nonblocking)?,
        }
        Ok(())
    }

    /// Wait for one client connection; stream listeners only
    pub fn accept(&self) -> Result<ConnSocket> {
        match &self.endpoint {
            Endpoint::Listener(listener) => {
                let (stream, peer) = listener.accept()?;
                Ok(ConnSocket::from_stream(stream, peer))
            }
            Endpoint::Datagram(_) => Err(Error::NotSupported("accept on a datagram socket")),
        }
    }

    /// Send a datagram to `dest`; datagram sockets only
    pub fn send_to(&self, bytes: &[u8], dest: SocketAddr) -> Result<usize> {
        match &self.endpoint {
            Endpoint::Datagram(udp) => Ok(udp.send_to(bytes, dest)?),
            Endpoint::Listener(_) => Err(Error::NotSupported("send_to on a stream listener")),
        }
    }

    /// Receive one datagram of up to `max` bytes with its sender address
    pub fn receive_from(&self, max: usize) -> Result<(Vec<u8>, SocketAddr)> {
        match &self.endpoint {
            Endpoint::Datagram(udp) => {
                let mut buf = vec![0u8; max];
                let (n, from) = udp.recv_from(&mut buf)?;
                buf.truncate(n);
                Ok((buf, from))
            }
            Endpoint::Listener(_) => Err(Error::NotSupported("receive_from on a stream listener")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_bind_ephemeral_datagram() {
        let sock = RendezvousSocket::bind(0, SocketKind::Datagram).unwrap();
        assert_ne!(sock.local_addr().port(), 0);
        sock.enable_broadcast().unwrap();
    }

    #[test]
    fn test_bind_ephemeral_listener() {
        let sock = RendezvousSocket::bind(0, SocketKind::Stream).unwrap();
        assert_ne!(sock.local_addr().port(), 0);
    }

    #[test]
    fn test_role_mismatch_is_rejected() {
        let udp = RendezvousSocket::bind(0, SocketKind::Datagram).unwrap();
        assert!(matches!(udp.accept(), Err(Error::NotSupported(_))));

        let tcp = RendezvousSocket::bind(0, SocketKind::Stream).unwrap();
        assert!(matches!(
            tcp.send_to(b"x", udp.local_addr()),
            Err(Error::NotSupported(_))
        ));
        assert!(matches!(
            tcp.enable_broadcast(),
            Err(Error::NotSupported(_))
        ));
    }

    #[test]
    fn test_datagram_send_receive_captures_sender() {
        let rx = RendezvousSocket::bind(0, SocketKind::Datagram).unwrap();
        let tx = RendezvousSocket::bind(0, SocketKind::Datagram).unwrap();

        let dest = addr::with_port("127.0.0.1:0".parse().unwrap(), rx.local_addr().port());
        tx.send_to(b"ping", dest).unwrap();

        rx.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let (buf, from) = rx.receive_from(DEFAULT_RECV_LEN).unwrap();
        assert_eq!(buf, b"ping");
        assert_eq!(from.port(), tx.local_addr().port());
    }

    #[test]
    fn test_receive_exact_surfaces_short_read() {
        let listener = RendezvousSocket::bind(0, SocketKind::Stream).unwrap();
        let port = listener.local_addr().port();

        let client = thread::spawn(move || {
            let mut conn =
                ConnSocket::connect(format!("127.0.0.1:{}", port).parse().unwrap()).unwrap();
            conn.send(b"abc").unwrap();
            // Drop closes the stream with only 3 of the expected 8 bytes sent
        });

        let mut server_side = listener.accept().unwrap();
        let result = server_side.receive_exact(8);
        assert!(matches!(result, Err(Error::ConnectionClosed)));
        client.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to find a port with nothing listening
        let probe = RendezvousSocket::bind(0, SocketKind::Stream).unwrap();
        let dead = probe.local_addr();
        drop(probe);

        assert!(matches!(
            ConnSocket::connect(dead),
            Err(Error::Connect { .. })
        ));
    }
}
