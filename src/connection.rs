//! Connection state machine and WiThrottle session.
//!
//! The [`Session`] owns the transport and discovery handles and drives
//! the connection lifecycle:
//!
//! ```text
//! Disconnected → Scanning → SelectionRequired → Connecting → Connected
//!                    ↘ EntryRequired (zero results)
//! ```
//!
//! Auto-connect skips the selection step and connects to the first
//! discovered server. Failures are surfaced as [`SessionEvent`]s and the
//! machine falls back to `Disconnected`; while a server is remembered, a
//! reconnect attempt starts after five seconds. Nothing in here blocks:
//! the controller calls [`Session::tick`] from its cooperative loop and
//! all timing uses the caller-supplied millisecond clock with wrapping
//! subtraction.
//!
//! Outbound commands pass through a bounded FIFO queue drained at most
//! one line per minimum-gap interval. When the queue is full, new
//! commands are rejected with [`SessionError::QueueFull`] rather than
//! displacing queued ones.

use heapless::{Deque, String as HString, Vec};
use log::{debug, info, warn};

use crate::protocol::{parse_line, Command, CommandLine, ServerMessage};
use crate::traits::network::{
    InboundLine, ServerInfo, ServiceDiscovery, ServiceKind, Transport, MAX_SERVERS,
};

/// Give up on a connection attempt after this long.
pub const CONNECT_TIMEOUT_MS: u64 = 30_000;

/// Send a heartbeat after this much outbound silence.
pub const HEARTBEAT_INTERVAL_MS: u64 = 10_000;

/// Wait this long after losing a connection before retrying.
pub const RECONNECT_DELAY_MS: u64 = 5_000;

/// Outbound queue depth.
pub const OUTBOUND_QUEUE_DEPTH: usize = 16;

/// Maximum configured startup commands.
pub const MAX_STARTUP_COMMANDS: usize = 4;

/// Default minimum gap between outbound lines.
pub const DEFAULT_SEND_GAP_MS: u64 = 50;

/// Where the session is in the connection lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    /// No link; may be waiting out the reconnect delay.
    #[default]
    Disconnected,
    /// mDNS discovery in progress.
    Scanning,
    /// Discovery found servers; waiting for the user to pick one.
    SelectionRequired,
    /// Discovery found nothing; waiting for a manual address.
    EntryRequired,
    /// TCP connect in flight.
    Connecting,
    /// Link up; commands flow.
    Connected,
}

/// Session-level failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionError<TE, DE> {
    /// Transport error.
    Transport(TE),
    /// Discovery error.
    Discovery(DE),
    /// Outbound queue full; command rejected.
    QueueFull,
    /// Selection index out of range.
    NoSuchServer,
    /// Manual entry incomplete or invalid.
    BadEntry,
}

/// State-change notifications for the status line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Discovery finished with this many servers.
    ServersFound(usize),
    /// Discovery found nothing; manual entry needed.
    EntryRequired,
    /// Link established.
    Connected,
    /// Connect attempt timed out.
    ConnectTimeout,
    /// Established link dropped.
    ConnectionLost,
    /// Reconnect attempt starting.
    Reconnecting,
}

/// The WiThrottle client session.
///
/// Owns the transport and discovery handles for its lifetime. The
/// controller enqueues [`Command`]s and polls [`ServerMessage`]s; the
/// session handles queuing, pacing, heartbeats, and reconnects.
pub struct Session<T: Transport, D: ServiceDiscovery> {
    transport: T,
    discovery: D,
    state: ConnectionState,
    servers: Vec<ServerInfo, MAX_SERVERS>,
    selected: Option<ServerInfo>,
    preferred: Option<(core::net::Ipv4Addr, u16)>,
    queue: Deque<CommandLine, OUTBOUND_QUEUE_DEPTH>,
    startup_commands: Vec<CommandLine, MAX_STARTUP_COMMANDS>,
    auto_connect: bool,
    heartbeat_enabled: bool,
    leading_crlf: bool,
    send_gap_ms: u64,
    connect_started_ms: u64,
    disconnected_at_ms: u64,
    last_send_ms: u64,
    reconnect_armed: bool,
}

impl<T: Transport, D: ServiceDiscovery> Session<T, D> {
    /// Create a session over the given transport and discovery handles.
    pub fn new(transport: T, discovery: D) -> Self {
        Self {
            transport,
            discovery,
            state: ConnectionState::Disconnected,
            servers: Vec::new(),
            selected: None,
            preferred: None,
            queue: Deque::new(),
            startup_commands: Vec::new(),
            auto_connect: false,
            heartbeat_enabled: true,
            leading_crlf: false,
            send_gap_ms: DEFAULT_SEND_GAP_MS,
            connect_started_ms: 0,
            disconnected_at_ms: 0,
            last_send_ms: 0,
            reconnect_armed: false,
        }
    }

    /// Connect to the first discovered server without asking.
    pub fn set_auto_connect(&mut self, on: bool) {
        self.auto_connect = on;
    }

    /// Remembered server from a previous run. Auto-connect picks it
    /// over the first discovered server, and discovery finding nothing
    /// falls back to it before asking for a manual address.
    pub fn set_preferred_server(&mut self, ip: core::net::Ipv4Addr, port: u16) {
        self.preferred = Some((ip, port));
    }

    /// Enable or disable the idle heartbeat.
    pub fn set_heartbeat_enabled(&mut self, on: bool) {
        self.heartbeat_enabled = on;
    }

    /// Prefix every outbound line with CR LF (some command stations
    /// need it to flush a stale parser state).
    pub fn set_leading_crlf(&mut self, on: bool) {
        self.leading_crlf = on;
    }

    /// Minimum gap between outbound lines.
    pub fn set_send_gap_ms(&mut self, gap: u64) {
        self.send_gap_ms = gap;
    }

    /// Add a raw command sent right after every connect (at most 4).
    pub fn add_startup_command(&mut self, line: &str) {
        let mut cmd = CommandLine::new();
        let _ = cmd.push_str(line);
        let _ = self.startup_commands.push(cmd);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Discovered servers from the last scan.
    pub fn servers(&self) -> &[ServerInfo] {
        &self.servers
    }

    /// The server we are connected or connecting to.
    pub fn selected_server(&self) -> Option<&ServerInfo> {
        self.selected.as_ref()
    }

    /// Queued outbound lines.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Borrow the transport (mock inspection in tests).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport (scripting mocks in tests).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Enter the scanning state; discovery runs on the next tick.
    pub fn start_discovery(&mut self) {
        self.servers.clear();
        self.state = ConnectionState::Scanning;
        debug!("session: scanning");
    }

    /// Connect to a discovered server by list index.
    pub fn select_server(
        &mut self,
        index: usize,
        now_ms: u64,
    ) -> Result<(), SessionError<T::Error, D::Error>> {
        let server = self
            .servers
            .get(index)
            .cloned()
            .ok_or(SessionError::NoSuchServer)?;
        self.connect_to(server, now_ms)
    }

    /// Connect to a manually entered or remembered server.
    pub fn connect_to(
        &mut self,
        server: ServerInfo,
        now_ms: u64,
    ) -> Result<(), SessionError<T::Error, D::Error>> {
        info!(
            "session: connecting to {}:{}",
            server.ip, server.port
        );
        self.transport
            .connect(server.socket_addr())
            .map_err(SessionError::Transport)?;
        self.selected = Some(server);
        self.connect_started_ms = now_ms;
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    /// Drop the connection and forget the server. No reconnect follows.
    pub fn disconnect(&mut self) {
        self.transport.close();
        self.selected = None;
        self.reconnect_armed = false;
        self.queue.clear();
        self.state = ConnectionState::Disconnected;
        info!("session: disconnected by user");
    }

    /// Queue a command for sending.
    ///
    /// Rejected with [`SessionError::QueueFull`] when 16 lines are
    /// already waiting; queued commands are never displaced.
    pub fn enqueue(&mut self, command: Command) -> Result<(), SessionError<T::Error, D::Error>> {
        self.queue
            .push_back(command.encode())
            .map_err(|_| SessionError::QueueFull)
    }

    /// Poll for the next decoded server message.
    ///
    /// Malformed lines are logged and dropped, never returned.
    pub fn poll_message(&mut self) -> Result<Option<ServerMessage>, SessionError<T::Error, D::Error>> {
        loop {
            let line: Option<InboundLine> =
                self.transport.poll_line().map_err(SessionError::Transport)?;
            let Some(line) = line else {
                return Ok(None);
            };
            match parse_line(&line) {
                Ok(message) => return Ok(Some(message)),
                Err(err) => {
                    warn!("session: dropping malformed line {:?}: {:?}", line, err);
                }
            }
        }
    }

    /// Advance the state machine; call once per loop iteration.
    pub fn tick(
        &mut self,
        now_ms: u64,
    ) -> Result<Option<SessionEvent>, SessionError<T::Error, D::Error>> {
        match self.state {
            ConnectionState::Scanning => self.tick_scanning(now_ms),
            ConnectionState::Connecting => self.tick_connecting(now_ms),
            ConnectionState::Connected => self.tick_connected(now_ms),
            ConnectionState::Disconnected => Ok(self.tick_disconnected(now_ms)),
            ConnectionState::SelectionRequired | ConnectionState::EntryRequired => Ok(None),
        }
    }

    fn tick_scanning(
        &mut self,
        now_ms: u64,
    ) -> Result<Option<SessionEvent>, SessionError<T::Error, D::Error>> {
        // Both service types, merged and deduplicated by name.
        for kind in [ServiceKind::WiThrottle, ServiceKind::DccEx] {
            let found = self.discovery.query(kind).map_err(SessionError::Discovery)?;
            for server in found {
                let duplicate = self
                    .servers
                    .iter()
                    .any(|s| s.name == server.name && s.ip == server.ip);
                if !duplicate {
                    let _ = self.servers.push(server);
                }
            }
        }
        self.servers.sort_unstable_by(|a, b| a.name.cmp(&b.name));

        if self.servers.is_empty() {
            if let Some((ip, port)) = self.preferred {
                info!("session: nothing discovered, trying remembered {}:{}", ip, port);
                let server = ServerInfo {
                    ip,
                    port,
                    name: HString::new(),
                    service: ServiceKind::Manual,
                };
                self.connect_to(server, now_ms)?;
                return Ok(Some(SessionEvent::Reconnecting));
            }
            info!("session: no servers found");
            self.state = ConnectionState::EntryRequired;
            return Ok(Some(SessionEvent::EntryRequired));
        }

        let count = self.servers.len();
        info!("session: {} server(s) found", count);
        if self.auto_connect {
            // The remembered server wins over the first by name.
            let pick = self
                .preferred
                .and_then(|(ip, port)| {
                    self.servers.iter().find(|s| s.ip == ip && s.port == port)
                })
                .unwrap_or(&self.servers[0])
                .clone();
            self.connect_to(pick, now_ms)?;
        } else {
            self.state = ConnectionState::SelectionRequired;
        }
        Ok(Some(SessionEvent::ServersFound(count)))
    }

    fn tick_connecting(
        &mut self,
        now_ms: u64,
    ) -> Result<Option<SessionEvent>, SessionError<T::Error, D::Error>> {
        if self.transport.is_connected() {
            info!("session: connected");
            self.state = ConnectionState::Connected;
            self.last_send_ms = now_ms;
            self.queue_connect_handshake();
            return Ok(Some(SessionEvent::Connected));
        }
        if now_ms.wrapping_sub(self.connect_started_ms) >= CONNECT_TIMEOUT_MS {
            warn!("session: connect timed out");
            self.transport.close();
            self.enter_disconnected(now_ms);
            return Ok(Some(SessionEvent::ConnectTimeout));
        }
        Ok(None)
    }

    fn tick_connected(
        &mut self,
        now_ms: u64,
    ) -> Result<Option<SessionEvent>, SessionError<T::Error, D::Error>> {
        if !self.transport.is_connected() {
            warn!("session: connection lost");
            self.transport.close();
            self.enter_disconnected(now_ms);
            return Ok(Some(SessionEvent::ConnectionLost));
        }

        let idle = now_ms.wrapping_sub(self.last_send_ms);
        if !self.queue.is_empty() {
            if idle >= self.send_gap_ms {
                if let Some(line) = self.queue.pop_front() {
                    self.send_raw(&line, now_ms)?;
                }
            }
        } else if self.heartbeat_enabled && idle >= HEARTBEAT_INTERVAL_MS {
            debug!("session: heartbeat");
            let line = Command::Heartbeat.encode();
            self.send_raw(&line, now_ms)?;
        }
        Ok(None)
    }

    fn tick_disconnected(&mut self, now_ms: u64) -> Option<SessionEvent> {
        if !self.reconnect_armed {
            return None;
        }
        if now_ms.wrapping_sub(self.disconnected_at_ms) < RECONNECT_DELAY_MS {
            return None;
        }
        let server = self.selected.clone()?;
        info!("session: reconnecting to {}:{}", server.ip, server.port);
        self.reconnect_armed = false;
        match self.connect_to(server, now_ms) {
            Ok(()) => Some(SessionEvent::Reconnecting),
            Err(_) => {
                // Retry again after another delay.
                self.enter_disconnected(now_ms);
                None
            }
        }
    }

    fn enter_disconnected(&mut self, now_ms: u64) {
        self.state = ConnectionState::Disconnected;
        self.queue.clear();
        self.disconnected_at_ms = now_ms;
        self.reconnect_armed = self.selected.is_some();
    }

    fn queue_connect_handshake(&mut self) {
        for cmd in self.startup_commands.clone() {
            let _ = self.queue.push_back(cmd);
        }
        for cmd in [
            Command::RequestRoster,
            Command::RequestTurnouts,
            Command::RequestRoutes,
        ] {
            let _ = self.queue.push_back(cmd.encode());
        }
    }

    fn send_raw(
        &mut self,
        line: &str,
        now_ms: u64,
    ) -> Result<(), SessionError<T::Error, D::Error>> {
        if self.leading_crlf {
            let mut prefixed: HString<{ 64 + 2 }> = HString::new();
            let _ = prefixed.push_str("\r\n");
            let _ = prefixed.push_str(line);
            self.transport
                .send_line(&prefixed)
                .map_err(SessionError::Transport)?;
        } else {
            self.transport
                .send_line(line)
                .map_err(SessionError::Transport)?;
        }
        self.last_send_ms = now_ms;
        Ok(())
    }
}

// ============================================================================
// Manual server entry
// ============================================================================

/// Digits of a manual server address, rendered against the
/// `###.###.###.###:#####` template as the user types.
///
/// Twelve digits form the four zero-padded octets, five more the port.
/// `commit` validates octet range and a non-zero port.
#[derive(Clone, Debug, Default)]
pub struct ServerEntry {
    digits: Vec<u8, 17>,
}

/// Rendered entry template, e.g. `192.168.001.0##:#####`.
pub type EntryTemplate = HString<21>;

impl ServerEntry {
    /// Start with an empty template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one digit; ignored once all 17 positions are filled.
    pub fn push_digit(&mut self, digit: u8) {
        if digit <= 9 {
            let _ = self.digits.push(digit);
        }
    }

    /// Remove the last typed digit.
    pub fn delete_digit(&mut self) {
        self.digits.pop();
    }

    /// Discard all typed digits.
    pub fn clear(&mut self) {
        self.digits.clear();
    }

    /// True once all 17 digits are present.
    pub fn is_complete(&self) -> bool {
        self.digits.len() == 17
    }

    /// Render the template with typed digits filled in.
    pub fn render(&self) -> EntryTemplate {
        let mut out = EntryTemplate::new();
        for pos in 0..17 {
            if pos > 0 && pos % 3 == 0 && pos < 12 {
                let _ = out.push('.');
            } else if pos == 12 {
                let _ = out.push(':');
            }
            match self.digits.get(pos) {
                Some(d) => {
                    let _ = out.push((b'0' + d) as char);
                }
                None => {
                    let _ = out.push('#');
                }
            }
        }
        out
    }

    /// Validate and produce the entered server.
    ///
    /// Fails unless all 17 digits are typed, every octet is ≤255, and
    /// the port is non-zero.
    pub fn commit(&self) -> Option<ServerInfo> {
        if !self.is_complete() {
            return None;
        }
        let mut octets = [0u8; 4];
        for (i, octet) in octets.iter_mut().enumerate() {
            let base = i * 3;
            let value = self.digits[base] as u16 * 100
                + self.digits[base + 1] as u16 * 10
                + self.digits[base + 2] as u16;
            if value > 255 {
                return None;
            }
            *octet = value as u8;
        }
        let port = self.digits[12..17]
            .iter()
            .fold(0u32, |acc, d| acc * 10 + *d as u32);
        if port == 0 || port > u16::MAX as u32 {
            return None;
        }
        Some(ServerInfo {
            ip: core::net::Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]),
            port: port as u16,
            name: HString::new(),
            service: ServiceKind::Manual,
        })
    }
}
