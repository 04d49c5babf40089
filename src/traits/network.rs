//! Network abstraction traits for the WiThrottle session.
//!
//! This module defines the seams between the protocol core and the
//! platform network stack: a line-oriented TCP [`Transport`], mDNS
//! [`ServiceDiscovery`], and the [`WifiLink`] association surface.
//!
//! # Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`Transport`] | Non-blocking, line-oriented TCP to the server |
//! | [`ServiceDiscovery`] | mDNS query for `_withrottle._tcp` / `_dccex._tcp` |
//! | [`WifiLink`] | Association state, SSID scan, join |
//!
//! All methods are non-blocking or bounded; the session polls them from
//! the cooperative loop and never waits. Hardware ports wrap their
//! platform's socket and mDNS APIs; desktop tests use the mocks in
//! [`crate::hal::mock`].

use core::net::{Ipv4Addr, SocketAddrV4};

use heapless::{String as HString, Vec};

/// Maximum number of discovered WiThrottle servers kept per scan.
pub const MAX_SERVERS: usize = 5;

/// Maximum number of scanned SSIDs kept per scan.
pub const MAX_SSIDS: usize = 8;

/// Maximum length of a received protocol line.
pub const MAX_LINE: usize = 256;

/// A received protocol line, without its terminator.
pub type InboundLine = HString<MAX_LINE>;

/// A WiThrottle server found via discovery or manual entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server IPv4 address.
    pub ip: Ipv4Addr,
    /// Server TCP port.
    pub port: u16,
    /// Advertised hostname, empty for manual entries.
    pub name: HString<32>,
    /// Service type the server was discovered under.
    pub service: ServiceKind,
}

impl ServerInfo {
    /// Socket address for connecting.
    pub fn socket_addr(&self) -> SocketAddrV4 {
        SocketAddrV4::new(self.ip, self.port)
    }
}

/// Which mDNS service type a server was found under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceKind {
    /// `_withrottle._tcp` (JMRI and compatible).
    WiThrottle,
    /// `_dccex._tcp` (DCC-EX command stations).
    DccEx,
    /// Manually entered IP and port.
    Manual,
}

/// A WiFi network found by a scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SsidInfo {
    /// Network name.
    pub ssid: HString<32>,
    /// Signal strength in dBm.
    pub rssi: i32,
    /// True if the network is open (no password required).
    pub open: bool,
}

/// Line-oriented TCP transport to a WiThrottle server.
///
/// The session owns one transport for its lifetime and drives it through
/// connect / send / poll / close. Implementations terminate outbound
/// lines with `\n` themselves; `send_line` receives the bare command.
///
/// # Implementation Notes
///
/// - `connect` starts a connection attempt; it may complete immediately
///   or leave `is_connected()` false until the handshake finishes. The
///   session enforces its own 30 s timeout either way.
/// - `poll_line` must be non-blocking: buffer partial lines internally
///   and return a line only once its terminator arrived. Both `\n` and
///   `\r\n` terminators must be accepted.
pub trait Transport {
    /// Error type for transport operations.
    type Error;

    /// Begin connecting to the given address.
    fn connect(&mut self, addr: SocketAddrV4) -> Result<(), Self::Error>;

    /// True while the socket is connected.
    fn is_connected(&self) -> bool;

    /// Send one protocol line (terminator added by the transport).
    fn send_line(&mut self, line: &str) -> Result<(), Self::Error>;

    /// Return the next complete received line, if any.
    fn poll_line(&mut self) -> Result<Option<InboundLine>, Self::Error>;

    /// Close the connection. Safe to call when already closed.
    fn close(&mut self);
}

/// mDNS service discovery.
///
/// One bounded query per call; the session issues one query per service
/// kind and merges the results, deduplicating by name.
pub trait ServiceDiscovery {
    /// Error type for discovery operations.
    type Error;

    /// Query for servers of the given service kind.
    ///
    /// Returns at most [`MAX_SERVERS`] results. The query must be
    /// bounded in time (a few seconds), not open-ended.
    fn query(&mut self, kind: ServiceKind)
        -> Result<Vec<ServerInfo, MAX_SERVERS>, Self::Error>;
}

/// WiFi association surface.
///
/// Association itself (scanning channels, WPA handshakes, DHCP) is the
/// platform's business; the core only needs to know whether the link is
/// up, what networks exist, and how to ask for a join.
pub trait WifiLink {
    /// Error type for WiFi operations.
    type Error;

    /// True once associated with an IP address.
    fn is_associated(&self) -> bool;

    /// Scan for networks, deduplicated by SSID.
    ///
    /// Must be bounded (the reference hardware caps the scan at 10 s and
    /// polls); returns at most [`MAX_SSIDS`] entries sorted by signal.
    fn scan(&mut self) -> Result<Vec<SsidInfo, MAX_SSIDS>, Self::Error>;

    /// Begin joining the given network.
    fn join(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error>;
}
