use crate::dnstap_message::DnstapMessageType;
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Transport protocol the DNS message travelled over.
///
/// Supplied by the caller alongside the socket address; it cannot be derived
/// from the address itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketProtocol {
    Udp,
    Tcp,
}

impl SocketProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketProtocol::Udp => "UDP",
            SocketProtocol::Tcp => "TCP",
        }
    }
}

/// Raw address bytes, tagged by family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerIp {
    Inet([u8; 4]),
    Inet6([u8; 16]),
}

impl PeerIp {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PeerIp::Inet(octets) => octets,
            PeerIp::Inet6(octets) => octets,
        }
    }

    pub fn is_inet6(&self) -> bool {
        matches!(self, PeerIp::Inet6(_))
    }
}

/// Address and port of the remote end of a DNS transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerAddress {
    pub ip: PeerIp,
    pub port: u16,
}

impl PeerAddress {
    /// Extract family, raw address bytes and port.
    ///
    /// `SocketAddr` only represents IPv4 and IPv6, so every value the
    /// resolver's socket layer hands over is a valid dnstap address family.
    /// IPv4-mapped IPv6 addresses are kept as 16-byte IPv6 addresses, matching
    /// what the socket reported.
    pub fn from_socket_addr(addr: &SocketAddr) -> Self {
        let ip = match addr {
            SocketAddr::V4(v4) => PeerIp::Inet(v4.ip().octets()),
            SocketAddr::V6(v6) => PeerIp::Inet6(v6.ip().octets()),
        };
        Self {
            ip,
            port: addr.port(),
        }
    }
}

impl From<SocketAddr> for PeerAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::from_socket_addr(&addr)
    }
}

/// Wall-clock timestamp with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DnstapTime {
    pub secs: u64,
    pub nanos: u32,
}

impl DnstapTime {
    /// Current wall-clock time.
    ///
    /// Events are stamped when they are built, not when the packet hit the
    /// socket. The difference is usually a few microseconds.
    #[inline]
    pub fn now() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            secs: since_epoch.as_secs(),
            nanos: since_epoch.subsec_nanos(),
        }
    }
}

/// A single dnstap event, built on the logging call's stack and encoded
/// before the call returns.
///
/// The DNS message, zone, identity and version are borrowed; nothing here
/// outlives the call that created it.
#[derive(Debug, Clone, Copy)]
pub struct DnstapEvent<'a> {
    pub message_type: DnstapMessageType,
    /// When the event was built. Query time for query events, response time
    /// for response events.
    pub timestamp: DnstapTime,
    /// Time the original query was sent. Only set on resolver and forwarder
    /// responses.
    pub query_time: Option<DnstapTime>,
    pub peer: PeerAddress,
    pub protocol: SocketProtocol,
    /// Bailiwick of an outgoing query, in DNS wire format.
    pub zone: Option<&'a [u8]>,
    pub message: &'a [u8],
    pub identity: Option<&'a str>,
    pub version: Option<&'a str>,
}
