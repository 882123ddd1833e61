//! Socket address helpers: resolution, bind addresses, broadcast lookup
//!
//! Discovery needs the broadcast address of a real interface, not a
//! hardcoded 255.255.255.255: a subnet-directed broadcast survives routers
//! that drop the limited-broadcast address. The lookup scans the interface
//! table and takes the first interface that is up, running, broadcast
//! capable, and not loopback.

use crate::error::{Error, Result};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};

/// Address family preference for name resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FamilyHint {
    #[default]
    Any,
    V4,
    V6,
}

impl FamilyHint {
    fn matches(&self, addr: &SocketAddr) -> bool {
        match self {
            FamilyHint::Any => true,
            FamilyHint::V4 => addr.is_ipv4(),
            FamilyHint::V6 => addr.is_ipv6(),
        }
    }
}

/// Resolve a hostname to a socket address for the given family
pub fn resolve(host: &str, port: u16, hint: FamilyHint) -> Result<SocketAddr> {
    let candidates = (host, port).to_socket_addrs().map_err(|e| Error::Resolution {
        host: host.to_string(),
        source: e,
    })?;

    candidates
        .into_iter()
        .find(|a| hint.matches(a))
        .ok_or_else(|| Error::Resolution {
            host: host.to_string(),
            source: io::Error::new(
                io::ErrorKind::NotFound,
                "no address for the requested family",
            ),
        })
}

/// Wildcard local address for binding a listening or receiving socket
pub fn wildcard(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// Copy of `addr` with the port overwritten
pub fn with_port(addr: SocketAddr, port: u16) -> SocketAddr {
    let mut out = addr;
    out.set_port(port);
    out
}

/// The fields of one interface the broadcast lookup cares about
#[derive(Debug, Clone)]
pub(crate) struct IfaceSnapshot {
    pub name: String,
    pub flags: u32,
    /// (address, netmask) pairs
    pub ipv4: Vec<(Ipv4Addr, Ipv4Addr)>,
}

/// Pick the broadcast address from an interface snapshot
///
/// First interface in table order that is up, running, broadcast capable,
/// and not loopback wins; no further ranking.
pub(crate) fn select_broadcast(ifaces: &[IfaceSnapshot]) -> Option<(String, Ipv4Addr)> {
    let required =
        (libc::IFF_UP as u32) | (libc::IFF_BROADCAST as u32) | (libc::IFF_RUNNING as u32);
    let excluded = libc::IFF_LOOPBACK as u32;

    for iface in ifaces {
        if iface.flags & required != required || iface.flags & excluded != 0 {
            continue;
        }
        if let Some((addr, netmask)) = iface.ipv4.first() {
            let bcast = Ipv4Addr::from(u32::from(*addr) | !u32::from(*netmask));
            return Some((iface.name.clone(), bcast));
        }
    }
    None
}

/// Broadcast address of the first qualifying local interface, port 0
///
/// Callers set the destination port with [`with_port`]. Fails with
/// `NoBroadcastInterface` when no interface qualifies, which is fatal at
/// daemon startup.
pub fn broadcast_address() -> Result<SocketAddr> {
    let snapshot: Vec<IfaceSnapshot> = default_net::get_interfaces()
        .into_iter()
        .map(|iface| IfaceSnapshot {
            name: iface.name,
            flags: iface.flags,
            ipv4: iface.ipv4.iter().map(|net| (net.addr, net.netmask)).collect(),
        })
        .collect();

    match select_broadcast(&snapshot) {
        Some((name, addr)) => {
            log::debug!("broadcast address {} via interface {}", addr, name);
            Ok(SocketAddr::from((addr, 0)))
        }
        None => Err(Error::NoBroadcastInterface),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(up: bool, bcast: bool, running: bool, loopback: bool) -> u32 {
        let mut f = 0u32;
        if up {
            f |= libc::IFF_UP as u32;
        }
        if bcast {
            f |= libc::IFF_BROADCAST as u32;
        }
        if running {
            f |= libc::IFF_RUNNING as u32;
        }
        if loopback {
            f |= libc::IFF_LOOPBACK as u32;
        }
        f
    }

    fn iface(name: &str, f: u32, addr: [u8; 4], mask: [u8; 4]) -> IfaceSnapshot {
        IfaceSnapshot {
            name: name.to_string(),
            flags: f,
            ipv4: vec![(Ipv4Addr::from(addr), Ipv4Addr::from(mask))],
        }
    }

    #[test]
    fn test_select_broadcast_first_qualifying_wins() {
        let table = vec![
            iface("lo", flags(true, false, true, true), [127, 0, 0, 1], [255, 0, 0, 0]),
            iface(
                "eth0",
                flags(true, true, true, false),
                [10, 50, 2, 17],
                [255, 255, 255, 0],
            ),
            iface(
                "wlan0",
                flags(true, true, true, false),
                [192, 168, 1, 5],
                [255, 255, 255, 0],
            ),
        ];

        let (name, addr) = select_broadcast(&table).unwrap();
        assert_eq!(name, "eth0");
        assert_eq!(addr, Ipv4Addr::new(10, 50, 2, 255));
    }

    #[test]
    fn test_select_broadcast_is_deterministic() {
        let table = vec![
            iface(
                "eth0",
                flags(true, true, true, false),
                [10, 50, 2, 17],
                [255, 255, 255, 0],
            ),
            iface(
                "eth1",
                flags(true, true, true, false),
                [10, 60, 0, 4],
                [255, 255, 0, 0],
            ),
        ];

        let first = select_broadcast(&table).unwrap();
        for _ in 0..10 {
            assert_eq!(select_broadcast(&table).unwrap(), first);
        }
    }

    #[test]
    fn test_select_broadcast_skips_down_and_loopback() {
        let table = vec![
            iface("lo", flags(true, true, true, true), [127, 0, 0, 1], [255, 0, 0, 0]),
            iface(
                "eth0",
                flags(false, true, true, false),
                [10, 0, 0, 2],
                [255, 255, 255, 0],
            ),
            iface(
                "eth1",
                flags(true, true, false, false),
                [10, 0, 1, 2],
                [255, 255, 255, 0],
            ),
        ];
        assert!(select_broadcast(&table).is_none());
    }

    #[test]
    fn test_select_broadcast_wide_netmask() {
        let table = vec![iface(
            "eth0",
            flags(true, true, true, false),
            [172, 16, 4, 9],
            [255, 255, 0, 0],
        )];
        let (_, addr) = select_broadcast(&table).unwrap();
        assert_eq!(addr, Ipv4Addr::new(172, 16, 255, 255));
    }

    #[test]
    fn test_wildcard_and_with_port() {
        let bind = wildcard(5800);
        assert_eq!(bind.port(), 5800);
        assert!(bind.ip().is_unspecified());

        let dest = with_port("10.0.0.255:0".parse().unwrap(), 5800);
        assert_eq!(dest.port(), 5800);
        assert_eq!(dest.ip().to_string(), "10.0.0.255");
    }

    #[test]
    fn test_resolve_localhost() {
        let addr = resolve("localhost", 5801, FamilyHint::V4).unwrap();
        assert!(addr.is_ipv4());
        assert_eq!(addr.port(), 5801);
    }

    #[test]
    fn test_resolve_failure() {
        let err = resolve("no-such-host.invalid", 80, FamilyHint::Any);
        assert!(matches!(err, Err(Error::Resolution { .. })));
    }
}
