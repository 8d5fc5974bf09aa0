// transport.rs - one-shot UDP transmission
//
// Grounded on examples/jpsilvashy-radius-ng/src/server.rs's socket2 tuning
// pattern and examples/original_source/libradi/radius.py::RadiusMessage.send
// (which sets multicast TTL=20 on both the IPv4 and IPv6 socket regardless
// of whether the destination is actually multicast - a historical quirk
// preserved here rather than "fixed", since it has no effect on ordinary
// unicast accounting traffic and SPEC_FULL.md does not ask for it to change).

use std::net::UdpSocket;

use socket2::Socket;
use tracing::info;

use crate::error::{Error, Result};

const MULTICAST_TTL: u32 = 20;

/// Send one already-encoded packet to `dest`:`port` over UDP and return.
///
/// No retry, no response wait - this system's Non-goals explicitly exclude
/// retransmission and response parsing.
pub fn send(dest: &str, port: u16, packet: &[u8]) -> Result<()> {
    let is_ipv6 = dest.contains(':') && !dest.contains('.');
    let bind_addr = if is_ipv6 { "[::]:0" } else { "0.0.0.0:0" };

    let socket = UdpSocket::bind(bind_addr).map_err(|source| Error::SendError {
        dest: dest.to_string(),
        source,
    })?;

    let socket2 = Socket::from(
        socket
            .try_clone()
            .map_err(|source| Error::SendError {
                dest: dest.to_string(),
                source,
            })?,
    );
    if is_ipv6 {
        let _ = socket2.set_multicast_loop_v6(true);
        let _ = socket2.set_multicast_hops_v6(MULTICAST_TTL);
    } else {
        let _ = socket2.set_multicast_loop_v4(true);
        let _ = socket2.set_multicast_ttl_v4(MULTICAST_TTL);
    }

    let target = format!("{dest}:{port}");
    socket
        .send_to(packet, &target)
        .map_err(|source| Error::SendError {
            dest: target.clone(),
            source,
        })?;

    info!(dest = %target, bytes = packet.len(), "packet sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_to_loopback_succeeds() {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        send("127.0.0.1", port, b"hello").unwrap();
        let mut buf = [0u8; 16];
        let (n, _) = listener.recv_from(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn send_to_unreachable_high_port_still_succeeds_udp_is_connectionless() {
        // UDP send doesn't fail just because nothing is listening.
        send("127.0.0.1", 1, b"x").unwrap();
    }
}
