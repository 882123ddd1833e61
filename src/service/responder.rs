//! Discovery responder
//!
//! Listens on the discovery UDP port and answers every valid `Discover`
//! with our own identity, sent straight back to the datagram's source
//! address. Everything else arriving on this socket (malformed datagrams,
//! unknown types, even well-formed report requests) is dropped without a
//! reply: a peer probing with the wrong message gets silence, never an
//! error packet.

use crate::error::{Error, Result};
use crate::net::socket::DEFAULT_RECV_LEN;
use crate::net::{RendezvousSocket, SocketKind};
use crate::protocol::{is_valid_header, Origin, Payload};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct Responder {
    socket: RendezvousSocket,
    origin: Origin,
    running: Arc<AtomicBool>,
}

impl Responder {
    /// Bind the discovery port; failure is fatal at startup
    pub fn new(
        discovery_port: u16,
        read_timeout: Duration,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let socket = RendezvousSocket::bind(discovery_port, SocketKind::Datagram)?;
        socket.set_read_timeout(Some(read_timeout))?;

        Ok(Self {
            socket,
            origin: Origin::Jetson,
            running,
        })
    }

    /// Bound address, useful when the port was ephemeral
    pub fn local_addr(&self) -> SocketAddr {
        self.socket.local_addr()
    }

    pub fn run(self) {
        log::info!("discovery responder listening on {}", self.local_addr());

        while self.running.load(Ordering::Relaxed) {
            let (buf, from) = match self.socket.receive_from(DEFAULT_RECV_LEN) {
                Ok(datagram) => datagram,
                Err(Error::Io(e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    log::error!("discovery receive failed: {}", e);
                    continue;
                }
            };

            self.handle_datagram(&buf, from);
        }

        log::info!("discovery responder stopped");
    }

    fn handle_datagram(&self, buf: &[u8], from: SocketAddr) {
        if !is_valid_header(buf) {
            log::trace!("dropping malformed datagram from {}", from);
            return;
        }

        match Payload::decode(buf) {
            Ok(Payload::Discover { origin }) => {
                log::info!("discover from {}, {}", from, origin);

                let reply = Payload::Discover {
                    origin: self.origin,
                }
                .encode();
                if let Err(e) = self.socket.send_to(&reply, from) {
                    log::warn!("discovery reply to {} failed: {}", from, e);
                }
            }
            // Report requests run over TCP; other types have no business on
            // this socket
            Ok(other) => {
                log::trace!("ignoring type {} datagram from {}", other.tag(), from);
            }
            Err(e) => {
                log::trace!("dropping undecodable datagram from {}: {}", from, e);
            }
        }
    }
}
