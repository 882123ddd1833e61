//! TCP vision-report service
//!
//! The listener accepts one connection per client and hands each to its own
//! thread for the life of the connection. Handler threads are reaped as
//! they finish, and a configurable cap bounds how many run at once. Each
//! request is served from a snapshot of the shared observation; the lock is
//! released before any bytes move.

use crate::error::{Error, Result};
use crate::net::{ConnSocket, RendezvousSocket, SocketKind};
use crate::protocol::{is_valid_header, GoalReport, Payload, HEADER_LEN};
use crate::vision::{Observation, SharedObservation};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Pause between accept polls when no connection is pending
const ACCEPT_POLL: Duration = Duration::from_millis(10);

pub struct ReportServer {
    listener: RendezvousSocket,
    shared: SharedObservation,
    running: Arc<AtomicBool>,
    read_timeout: Duration,
    max_clients: usize,
}

impl ReportServer {
    /// Bind the report port; failure is fatal at startup
    pub fn new(
        report_port: u16,
        shared: SharedObservation,
        running: Arc<AtomicBool>,
        read_timeout: Duration,
        max_clients: usize,
    ) -> Result<Self> {
        let listener = RendezvousSocket::bind(report_port, SocketKind::Stream)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            listener,
            shared,
            running,
            read_timeout,
            max_clients,
        })
    }

    /// Bound address, useful when the port was ephemeral
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn run(self) {
        log::info!("report service listening on {}", self.local_addr());

        let mut handlers: Vec<JoinHandle<()>> = Vec::new();

        while self.running.load(Ordering::Relaxed) {
            reap_finished(&mut handlers);

            let conn = match self.listener.accept() {
                Ok(conn) => conn,
                Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                    continue;
                }
                Err(e) => {
                    log::error!("accept failed: {}", e);
                    continue;
                }
            };

            let peer = conn.peer_addr();
            if handlers.len() >= self.max_clients {
                log::warn!(
                    "refusing connection from {}: client limit {} reached",
                    peer,
                    self.max_clients
                );
                drop(conn);
                continue;
            }

            log::info!("connection from {}", peer);
            let handler = ConnectionHandler {
                conn,
                shared: self.shared.clone(),
                running: Arc::clone(&self.running),
                read_timeout: self.read_timeout,
            };

            match thread::Builder::new()
                .name("report-conn".to_string())
                .spawn(move || handler.run())
            {
                Ok(handle) => handlers.push(handle),
                Err(e) => log::error!("failed to spawn handler for {}: {}", peer, e),
            }
        }

        // Handlers observe the running flag through their read timeouts
        for handle in handlers {
            let _ = handle.join();
        }

        log::info!("report service stopped");
    }
}

/// Join and drop every handler thread that has already exited
fn reap_finished(handlers: &mut Vec<JoinHandle<()>>) {
    let mut i = 0;
    while i < handlers.len() {
        if handlers[i].is_finished() {
            let _ = handlers.swap_remove(i).join();
        } else {
            i += 1;
        }
    }
}

/// Build the wire report from an observation snapshot
///
/// A single-estimate pipeline fills both goal edges with the same values.
fn report_from(obs: Observation) -> GoalReport {
    GoalReport {
        found: obs.found,
        score: obs.score,
        distance_left: obs.distance,
        angle_left: obs.angle,
        distance_right: obs.distance,
        angle_right: obs.angle,
    }
}

struct ConnectionHandler {
    conn: ConnSocket,
    shared: SharedObservation,
    running: Arc<AtomicBool>,
    read_timeout: Duration,
}

impl ConnectionHandler {
    fn run(mut self) {
        let peer = self.conn.peer_addr();
        match self.serve() {
            Ok(()) => log::info!("closing connection to {}", peer),
            Err(Error::ConnectionClosed) => log::info!("client {} disconnected", peer),
            Err(e) => log::warn!("connection to {} ended: {}", peer, e),
        }
        // Dropping self.conn releases the socket
    }

    fn serve(&mut self) -> Result<()> {
        self.conn.set_read_timeout(Some(self.read_timeout))?;

        loop {
            if !self.running.load(Ordering::Relaxed) {
                return Ok(());
            }

            let header = match self.conn.receive_exact(HEADER_LEN) {
                Ok(header) => header,
                Err(Error::Io(e))
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => return Err(e),
            };

            if !is_valid_header(&header) {
                // A desynchronized byte stream cannot be reframed; drop the
                // connection. The client sees silence, not an error packet.
                return Err(Error::InvalidPacket("bad header from client".to_string()));
            }

            let len = u16::from_be_bytes([header[5], header[6]]) as usize;
            let mut packet = header;
            if len > 0 {
                packet.extend(self.conn.receive_exact(len)?);
            }

            match Payload::decode(&packet) {
                Ok(Payload::GetGoalDistance) => self.send_report()?,
                Ok(other) => {
                    log::debug!("ignoring type {} request", other.tag());
                }
                Err(e) => {
                    log::debug!("dropping undecodable request: {}", e);
                }
            }
        }
    }

    fn send_report(&mut self) -> Result<()> {
        let snapshot = self.shared.snapshot();
        let packet = Payload::GoalDistance(report_from(snapshot)).encode();
        self.conn.send(&packet)?;
        Ok(())
    }
}
