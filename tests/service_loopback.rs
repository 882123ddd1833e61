//! Socket-level tests for the discovery and report services on loopback
//!
//! Every service binds an ephemeral port so tests can run in parallel and
//! on machines where the well-known ports are taken.

use drishti_link::net::socket::DEFAULT_RECV_LEN;
use drishti_link::net::{addr, ConnSocket, RendezvousSocket, SocketKind};
use drishti_link::protocol::{
    is_valid_header, GoalReport, MessageType, Origin, Payload, HEADER_LEN, MAGIC,
};
use drishti_link::service::{ReportServer, Responder};
use drishti_link::vision::{Observation, SharedObservation};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn loopback(port: u16) -> SocketAddr {
    addr::with_port("127.0.0.1:0".parse().unwrap(), port)
}

/// Read one complete packet off a connection: header, then declared payload
fn read_packet(conn: &mut ConnSocket) -> Vec<u8> {
    let header = conn.receive_exact(HEADER_LEN).unwrap();
    assert!(is_valid_header(&header));
    let len = u16::from_be_bytes([header[5], header[6]]) as usize;
    let mut packet = header;
    if len > 0 {
        packet.extend(conn.receive_exact(len).unwrap());
    }
    packet
}

#[test]
fn discovery_handshake_identifies_the_jetson() {
    let running = Arc::new(AtomicBool::new(true));
    let responder = Responder::new(0, Duration::from_millis(50), Arc::clone(&running)).unwrap();
    let responder_port = responder.local_addr().port();
    let worker = thread::spawn(move || responder.run());

    let client = RendezvousSocket::bind(0, SocketKind::Datagram).unwrap();
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    let probe = Payload::Discover {
        origin: Origin::RoboRio,
    }
    .encode();
    client.send_to(&probe, loopback(responder_port)).unwrap();

    let (reply, from) = client.receive_from(DEFAULT_RECV_LEN).unwrap();
    assert_eq!(from.port(), responder_port);
    assert_eq!(
        Payload::decode(&reply).unwrap(),
        Payload::Discover {
            origin: Origin::Jetson
        }
    );

    running.store(false, Ordering::Relaxed);
    worker.join().unwrap();
}

#[test]
fn responder_ignores_unknown_and_malformed_datagrams() {
    let running = Arc::new(AtomicBool::new(true));
    let responder = Responder::new(0, Duration::from_millis(50), Arc::clone(&running)).unwrap();
    let responder_port = responder.local_addr().port();
    let worker = thread::spawn(move || responder.run());

    let client = RendezvousSocket::bind(0, SocketKind::Datagram).unwrap();
    client
        .set_read_timeout(Some(Duration::from_millis(300)))
        .unwrap();
    let dest = loopback(responder_port);

    // A well-formed packet of a type the responder does not serve
    let mut status_packet = Vec::from(MAGIC);
    status_packet.push(MessageType::Status as u8);
    status_packet.extend_from_slice(&[0, 0]);
    client.send_to(&status_packet, dest).unwrap();

    // A report request, which is TCP-only
    client
        .send_to(&Payload::GetGoalDistance.encode(), dest)
        .unwrap();

    // Garbage that fails the header check
    client.send_to(b"garbage", dest).unwrap();

    // None of the three may produce a reply
    assert!(client.receive_from(DEFAULT_RECV_LEN).is_err());

    // The responder is still alive and answers a real discover afterwards
    client
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    client
        .send_to(
            &Payload::Discover {
                origin: Origin::DriverStation,
            }
            .encode(),
            dest,
        )
        .unwrap();
    let (reply, _) = client.receive_from(DEFAULT_RECV_LEN).unwrap();
    assert!(matches!(
        Payload::decode(&reply).unwrap(),
        Payload::Discover {
            origin: Origin::Jetson
        }
    ));

    running.store(false, Ordering::Relaxed);
    worker.join().unwrap();
}

#[test]
fn report_request_returns_the_latest_observation() {
    let running = Arc::new(AtomicBool::new(true));
    let shared = SharedObservation::new();

    let server = ReportServer::new(
        0,
        shared.clone(),
        Arc::clone(&running),
        Duration::from_millis(50),
        4,
    )
    .unwrap();
    let report_port = server.local_addr().port();
    let worker = thread::spawn(move || server.run());

    // Inject an observation as the scoring worker would
    shared.store(Observation {
        found: true,
        score: 87.5,
        distance: 120.25,
        angle: -3.1,
    });

    let mut conn = ConnSocket::connect(loopback(report_port)).unwrap();
    conn.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    conn.send(&Payload::GetGoalDistance.encode()).unwrap();
    let reply = Payload::decode(&read_packet(&mut conn)).unwrap();

    assert_eq!(
        reply,
        Payload::GoalDistance(GoalReport {
            found: true,
            score: 87.5,
            distance_left: 120.25,
            angle_left: -3.1,
            distance_right: 120.25,
            angle_right: -3.1,
        })
    );

    // A fresh write must be visible to the next request on the same
    // connection
    shared.store(Observation::default());
    conn.send(&Payload::GetGoalDistance.encode()).unwrap();
    match Payload::decode(&read_packet(&mut conn)).unwrap() {
        Payload::GoalDistance(report) => assert!(!report.found),
        other => panic!("unexpected reply: {:?}", other),
    }

    running.store(false, Ordering::Relaxed);
    worker.join().unwrap();
}

#[test]
fn report_handler_ignores_non_request_types() {
    let running = Arc::new(AtomicBool::new(true));
    let shared = SharedObservation::new();
    shared.store(Observation {
        found: true,
        score: 50.0,
        distance: 1.0,
        angle: 0.0,
    });

    let server = ReportServer::new(
        0,
        shared.clone(),
        Arc::clone(&running),
        Duration::from_millis(50),
        4,
    )
    .unwrap();
    let report_port = server.local_addr().port();
    let worker = thread::spawn(move || server.run());

    let mut conn = ConnSocket::connect(loopback(report_port)).unwrap();
    conn.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    // A reserved status request gets no reply; the next real request is
    // still served on the same connection
    let mut status_packet = Vec::from(MAGIC);
    status_packet.push(MessageType::GetStatus as u8);
    status_packet.extend_from_slice(&[0, 0]);
    conn.send(&status_packet).unwrap();

    conn.send(&Payload::GetGoalDistance.encode()).unwrap();
    match Payload::decode(&read_packet(&mut conn)).unwrap() {
        Payload::GoalDistance(report) => {
            assert!(report.found);
            assert_eq!(report.score, 50.0);
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    running.store(false, Ordering::Relaxed);
    worker.join().unwrap();
}

#[test]
fn report_server_drops_desynchronized_clients() {
    let running = Arc::new(AtomicBool::new(true));
    let shared = SharedObservation::new();

    let server = ReportServer::new(
        0,
        shared,
        Arc::clone(&running),
        Duration::from_millis(50),
        4,
    )
    .unwrap();
    let report_port = server.local_addr().port();
    let worker = thread::spawn(move || server.run());

    let mut conn = ConnSocket::connect(loopback(report_port)).unwrap();
    conn.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    // Seven bytes of junk: enough for a header, fails the magic check
    conn.send(b"zzzzzzz").unwrap();

    // The server closes the stream; the client sees EOF, not an error packet
    let mut got_eof = false;
    for _ in 0..50 {
        match conn.receive(64) {
            Ok(buf) if buf.is_empty() => {
                got_eof = true;
                break;
            }
            Ok(_) => panic!("server replied to a malformed packet"),
            Err(_) => {
                thread::sleep(Duration::from_millis(20));
            }
        }
    }
    assert!(got_eof, "connection was not closed");

    running.store(false, Ordering::Relaxed);
    worker.join().unwrap();
}
