//! Member identity: local address, process id and generated instance ids

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::Lazy;

static LOCAL_IPV4: Lazy<u32> = Lazy::new(|| u32::from(discover_local_ipv4()));

static INSTANCE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Address of the interface that routes outbound traffic
///
/// Connecting a UDP socket sends nothing; it only asks the OS to pick a
/// route. Falls back to loopback on hosts without a usable interface.
fn discover_local_ipv4() -> Ipv4Addr {
    let probe = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).map(|_| socket))
        .and_then(|socket| socket.local_addr());

    match probe {
        Ok(addr) => match addr.ip() {
            IpAddr::V4(ip) if !ip.is_unspecified() => ip,
            _ => Ipv4Addr::LOCALHOST,
        },
        Err(e) => {
            log::debug!("Local address discovery failed, using loopback: {}", e);
            Ipv4Addr::LOCALHOST
        }
    }
}

/// Local IPv4 address as a host-order integer
pub fn local_ip() -> u32 {
    *LOCAL_IPV4
}

pub fn local_pid() -> u32 {
    std::process::id()
}

/// Default instance id `<group>.<ip hex>.<pid hex>.<seq>`
///
/// The sequence number keeps ids unique between members of one process.
pub fn generate_instance_id(group_name: &str) -> String {
    let seq = INSTANCE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}.{:x}.{:x}.{}", group_name, local_ip(), local_pid(), seq)
}
