//! Periodic discovery announcer
//!
//! Fire-and-forget: every interval one `Discover` packet goes to the local
//! subnet's broadcast address on the discovery port. Peers that care reply
//! to the responder; nothing here waits for an answer.

use crate::error::Result;
use crate::net::{addr, RendezvousSocket, SocketKind};
use crate::protocol::{Origin, Payload};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How often the announce loop rechecks the shutdown flag while sleeping
const SLEEP_SLICE: Duration = Duration::from_millis(100);

pub struct Announcer {
    socket: RendezvousSocket,
    dest: SocketAddr,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl Announcer {
    /// Bind an ephemeral broadcast-capable socket and resolve the
    /// destination; both failures are fatal at startup
    pub fn new(
        discovery_port: u16,
        interval: Duration,
        running: Arc<AtomicBool>,
    ) -> Result<Self> {
        let socket = RendezvousSocket::bind(0, SocketKind::Datagram)?;
        socket.enable_broadcast()?;
        let dest = addr::with_port(addr::broadcast_address()?, discovery_port);

        Ok(Self {
            socket,
            dest,
            interval,
            running,
        })
    }

    pub fn run(self) {
        log::info!(
            "announcing to {} every {} ms",
            self.dest,
            self.interval.as_millis()
        );

        let packet = Payload::Discover {
            origin: Origin::Jetson,
        }
        .encode();

        while self.running.load(Ordering::Relaxed) {
            if let Err(e) = self.socket.send_to(&packet, self.dest) {
                // Transient: the cable may be out; keep announcing
                log::warn!("announce to {} failed: {}", self.dest, e);
            }

            let deadline = Instant::now() + self.interval;
            while self.running.load(Ordering::Relaxed) && Instant::now() < deadline {
                std::thread::sleep(SLEEP_SLICE.min(deadline - Instant::now()));
            }
        }

        log::info!("announcer stopped");
    }
}
