//! Probe for a running DrishtiLink daemon, playing the robot-controller side
//!
//! Discovers a daemon via UDP broadcast (or connects straight to a given
//! host), then polls one goal report over TCP and prints it. Usage:
//!
//! ```text
//! link-probe                    # discover on the local subnet
//! link-probe 10.50.2.17         # skip discovery, connect directly
//! ```

use drishti_link::config::AppConfig;
use drishti_link::error::{Error, Result};
use drishti_link::net::socket::DEFAULT_RECV_LEN;
use drishti_link::net::{addr, ConnSocket, RendezvousSocket, SocketKind};
use drishti_link::protocol::{is_valid_header, Origin, Payload, HEADER_LEN};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

const DISCOVER_TIMEOUT: Duration = Duration::from_secs(2);

/// Broadcast a `Discover` and wait for the first daemon that answers
fn discover_daemon(discovery_port: u16) -> Result<IpAddr> {
    let socket = RendezvousSocket::bind(0, SocketKind::Datagram)?;
    socket.enable_broadcast()?;
    socket.set_read_timeout(Some(DISCOVER_TIMEOUT))?;

    let dest = addr::with_port(addr::broadcast_address()?, discovery_port);
    log::info!("probing {} for a vision coprocessor", dest);

    let probe = Payload::Discover {
        origin: Origin::RoboRio,
    }
    .encode();
    socket.send_to(&probe, dest)?;

    loop {
        let (buf, from) = socket.receive_from(DEFAULT_RECV_LEN)?;
        if !is_valid_header(&buf) {
            continue;
        }
        if let Ok(Payload::Discover { origin }) = Payload::decode(&buf) {
            log::info!("reply from {}, {}", from, origin);
            return Ok(from.ip());
        }
    }
}

/// Request one goal report over an established connection
fn request_report(conn: &mut ConnSocket) -> Result<Payload> {
    conn.send(&Payload::GetGoalDistance.encode())?;

    let header = conn.receive_exact(HEADER_LEN)?;
    if !is_valid_header(&header) {
        return Err(Error::InvalidPacket("bad header in reply".to_string()));
    }
    let len = u16::from_be_bytes([header[5], header[6]]) as usize;
    let mut packet = header;
    if len > 0 {
        packet.extend(conn.receive_exact(len)?);
    }
    Payload::decode(&packet)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let network = AppConfig::default().network;
    let host = std::env::args().nth(1);

    let daemon_ip: IpAddr = match host {
        Some(host) => host
            .parse()
            .or_else(|_| addr::resolve(&host, 0, addr::FamilyHint::V4).map(|a| a.ip()))?,
        None => discover_daemon(network.discovery_port)?,
    };

    let report_addr = SocketAddr::new(daemon_ip, network.report_port);
    log::info!("requesting goal report from {}", report_addr);

    let mut conn = ConnSocket::connect(report_addr)?;
    conn.set_read_timeout(Some(Duration::from_secs(5)))?;

    match request_report(&mut conn)? {
        Payload::GoalDistance(report) => {
            if report.found {
                println!(
                    "goal found: score {:.1}, left {:.3} m @ {:.2} deg, right {:.3} m @ {:.2} deg",
                    report.score,
                    report.distance_left,
                    report.angle_left,
                    report.distance_right,
                    report.angle_right
                );
            } else {
                println!("no goal in sight");
            }
        }
        other => {
            println!("unexpected reply type {}", other.tag());
        }
    }

    Ok(())
}
