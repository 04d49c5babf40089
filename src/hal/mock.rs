//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware and network traits,
//! enabling development and testing on desktop without a handheld.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockKeypad`] | [`KeypadInput`] | Queued key events |
//! | [`MockEncoder`] | [`EncoderInput`] | Queued delta values and button state |
//! | [`MockBattery`] | [`BatteryMonitor`] | Settable charge level |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockDisplay`] | [`TextDisplay`] | Captures rendered lines |
//! | [`MockTransport`] | [`Transport`] | Scripted inbound lines, captured outbound |
//! | [`MockDiscovery`] | [`ServiceDiscovery`] | Preloaded server list |
//! | [`MockWifi`] | [`WifiLink`] | Scripted scan results and join calls |
//! | [`MockStorage`] | [`Storage`] | In-memory preference store |
//!
//! # Example
//!
//! ```rust
//! use wit_throttle::hal::mock::MockTransport;
//! use wit_throttle::traits::Transport;
//!
//! let mut transport = MockTransport::new();
//! transport.push_incoming("PPA1");
//! transport.connect("192.168.1.10:12090".parse().unwrap()).unwrap();
//!
//! assert!(transport.is_connected());
//! assert_eq!(transport.poll_line().unwrap().unwrap().as_str(), "PPA1");
//! ```
//!
//! [`KeypadInput`]: crate::traits::KeypadInput
//! [`EncoderInput`]: crate::traits::EncoderInput
//! [`BatteryMonitor`]: crate::traits::BatteryMonitor
//! [`Clock`]: crate::traits::Clock
//! [`TextDisplay`]: crate::traits::TextDisplay
//! [`Transport`]: crate::traits::Transport
//! [`ServiceDiscovery`]: crate::traits::ServiceDiscovery
//! [`WifiLink`]: crate::traits::WifiLink
//! [`Storage`]: crate::traits::Storage

use core::net::SocketAddrV4;

use crate::traits::{
    BatteryMonitor, Clock, EncoderInput, InboundLine, KeyEvent, KeypadInput, ServerInfo,
    ServiceDiscovery, ServiceKind, SsidInfo, Storage, StoredString, TextDisplay, Transport,
    WifiLink, MAX_SERVERS, MAX_SSIDS,
};

extern crate alloc;
use alloc::string::String;
use alloc::vec::Vec;

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock keypad for testing.
///
/// Queue key events; they come back from `poll_event` in FIFO order.
///
/// # Example
///
/// ```rust
/// use wit_throttle::hal::mock::MockKeypad;
/// use wit_throttle::traits::{Key, KeypadInput};
///
/// let mut keypad = MockKeypad::new();
/// keypad.press(Key::Star);
/// keypad.press(Key::Digit(1));
///
/// assert_eq!(keypad.poll_event().unwrap().key, Key::Star);
/// assert_eq!(keypad.poll_event().unwrap().key, Key::Digit(1));
/// assert!(keypad.poll_event().is_none());
/// ```
#[derive(Debug, Default)]
pub struct MockKeypad {
    events: Vec<KeyEvent>,
}

impl MockKeypad {
    /// Creates a new mock keypad with no pending events.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a press event for the given key.
    pub fn press(&mut self, key: crate::traits::Key) {
        self.events.push(KeyEvent::press(key));
    }

    /// Queue an arbitrary event.
    pub fn push_event(&mut self, event: KeyEvent) {
        self.events.push(event);
    }

    /// Queue press events for each keypad character in `keys`.
    ///
    /// Characters that are not keypad keys are ignored.
    pub fn type_keys(&mut self, keys: &str) {
        for c in keys.chars() {
            if let Some(key) = crate::traits::Key::from_char(c) {
                self.press(key);
            }
        }
    }
}

impl KeypadInput for MockKeypad {
    fn poll_event(&mut self) -> Option<KeyEvent> {
        if self.events.is_empty() {
            None
        } else {
            Some(self.events.remove(0))
        }
    }
}

/// Mock encoder for testing.
///
/// Simulates a rotary encoder with push button. Queue delta values
/// to simulate rotation, and control button state directly.
///
/// # Example
///
/// ```rust
/// use wit_throttle::hal::mock::MockEncoder;
/// use wit_throttle::traits::EncoderInput;
///
/// let mut encoder = MockEncoder::new();
/// encoder.queue_delta(5);
///
/// assert_eq!(encoder.read_delta(), 5);
/// assert_eq!(encoder.read_delta(), 0); // Empty
///
/// encoder.press_button();
/// assert!(encoder.button_just_pressed()); // Once
/// assert!(!encoder.button_just_pressed()); // Consumed
/// ```
#[derive(Debug, Default)]
pub struct MockEncoder {
    delta_queue: Vec<i32>,
    button_state: bool,
    button_just_pressed_state: bool,
}

impl MockEncoder {
    /// Creates a new mock encoder with no pending deltas.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an encoder delta to be returned (FIFO).
    pub fn queue_delta(&mut self, delta: i32) {
        self.delta_queue.push(delta);
    }

    /// Set the button state.
    pub fn set_button(&mut self, pressed: bool) {
        self.button_state = pressed;
    }

    /// Simulate a button press (just_pressed will be true once).
    pub fn press_button(&mut self) {
        self.button_state = true;
        self.button_just_pressed_state = true;
    }
}

impl EncoderInput for MockEncoder {
    fn read_delta(&mut self) -> i32 {
        if self.delta_queue.is_empty() {
            0
        } else {
            self.delta_queue.remove(0)
        }
    }

    fn button_pressed(&self) -> bool {
        self.button_state
    }

    fn button_just_pressed(&mut self) -> bool {
        let was_pressed = self.button_just_pressed_state;
        self.button_just_pressed_state = false;
        was_pressed
    }
}

/// Mock battery monitor with a settable charge level.
#[derive(Debug)]
pub struct MockBattery {
    /// Reported charge percentage.
    pub percent: u8,
}

impl MockBattery {
    /// Creates a mock battery at full charge.
    pub fn new() -> Self {
        Self { percent: 100 }
    }

    /// Set the reported charge percentage.
    pub fn set_percent(&mut self, percent: u8) {
        self.percent = percent.min(100);
    }
}

impl Default for MockBattery {
    fn default() -> Self {
        Self::new()
    }
}

impl BatteryMonitor for MockBattery {
    fn percentage(&self) -> u8 {
        self.percent
    }

    fn is_low(&self) -> bool {
        self.percent <= 15
    }

    fn is_critical(&self) -> bool {
        self.percent <= 5
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use wit_throttle::hal::mock::MockClock;
/// use wit_throttle::traits::Clock;
///
/// let mut clock = MockClock::new();
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 500);
/// ```
#[derive(Debug)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self { current_ms: 0 }
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock line transport for testing.
///
/// Captures sent lines and replays scripted inbound lines. By default a
/// `connect` call succeeds immediately; use `set_accept_connections` to
/// simulate an unreachable server and `drop_connection` to simulate a
/// lost link.
#[derive(Debug)]
pub struct MockTransport {
    connected: bool,
    accept_connections: bool,
    incoming: Vec<InboundLine>,
    sent: Vec<String>,
    /// Addresses passed to `connect`, in call order.
    pub connect_calls: Vec<SocketAddrV4>,
}

impl MockTransport {
    /// Creates a mock transport that accepts connections.
    pub fn new() -> Self {
        Self {
            connected: false,
            accept_connections: true,
            incoming: Vec::new(),
            sent: Vec::new(),
            connect_calls: Vec::new(),
        }
    }

    /// Control whether `connect` succeeds.
    pub fn set_accept_connections(&mut self, accept: bool) {
        self.accept_connections = accept;
    }

    /// Simulate the link dropping.
    pub fn drop_connection(&mut self) {
        self.connected = false;
    }

    /// Script one inbound line.
    pub fn push_incoming(&mut self, line: &str) {
        let mut l = InboundLine::new();
        let _ = l.push_str(line);
        self.incoming.push(l);
    }

    /// Every line sent so far, in order.
    pub fn sent_lines(&self) -> &[String] {
        &self.sent
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MockTransport {
    type Error = ();

    fn connect(&mut self, addr: SocketAddrV4) -> Result<(), ()> {
        self.connect_calls.push(addr);
        self.connected = self.accept_connections;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send_line(&mut self, line: &str) -> Result<(), ()> {
        self.sent.push(line.into());
        Ok(())
    }

    fn poll_line(&mut self) -> Result<Option<InboundLine>, ()> {
        if self.incoming.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.incoming.remove(0)))
        }
    }

    fn close(&mut self) {
        self.connected = false;
    }
}

/// Mock mDNS discovery with a preloaded server list.
///
/// `query` returns the preloaded servers matching the requested service
/// kind, capped at [`MAX_SERVERS`].
#[derive(Debug, Default)]
pub struct MockDiscovery {
    servers: Vec<ServerInfo>,
    /// Number of queries issued.
    pub query_count: usize,
}

impl MockDiscovery {
    /// Creates an empty mock discovery.
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a server to be returned by matching queries.
    pub fn add_server(&mut self, server: ServerInfo) {
        self.servers.push(server);
    }
}

impl ServiceDiscovery for MockDiscovery {
    type Error = ();

    fn query(
        &mut self,
        kind: ServiceKind,
    ) -> Result<heapless::Vec<ServerInfo, MAX_SERVERS>, ()> {
        self.query_count += 1;
        let mut out = heapless::Vec::new();
        for server in self.servers.iter().filter(|s| s.service == kind) {
            if out.push(server.clone()).is_err() {
                break;
            }
        }
        Ok(out)
    }
}

/// Mock WiFi link with scripted scan results.
#[derive(Debug, Default)]
pub struct MockWifi {
    associated: bool,
    networks: Vec<SsidInfo>,
    /// `(ssid, password)` pairs passed to `join`, in call order.
    pub join_calls: Vec<(String, String)>,
}

impl MockWifi {
    /// Creates a mock WiFi link, not associated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the association state.
    pub fn set_associated(&mut self, associated: bool) {
        self.associated = associated;
    }

    /// Add a network to the scripted scan results.
    pub fn add_network(&mut self, ssid: &str, rssi: i32, open: bool) {
        let mut name = heapless::String::new();
        let _ = name.push_str(ssid);
        self.networks.push(SsidInfo {
            ssid: name,
            rssi,
            open,
        });
    }
}

impl WifiLink for MockWifi {
    type Error = ();

    fn is_associated(&self) -> bool {
        self.associated
    }

    fn scan(&mut self) -> Result<heapless::Vec<SsidInfo, MAX_SSIDS>, ()> {
        let mut out: heapless::Vec<SsidInfo, MAX_SSIDS> = heapless::Vec::new();
        for network in &self.networks {
            if out.push(network.clone()).is_err() {
                break;
            }
        }
        out.sort_unstable_by(|a, b| b.rssi.cmp(&a.rssi));
        Ok(out)
    }

    fn join(&mut self, ssid: &str, password: &str) -> Result<(), ()> {
        self.join_calls.push((ssid.into(), password.into()));
        self.associated = true;
        Ok(())
    }
}

// ============================================================================
// Display Mock
// ============================================================================

/// Mock display capturing rendered text lines.
///
/// # Example
///
/// ```rust
/// use wit_throttle::hal::mock::MockDisplay;
/// use wit_throttle::traits::TextDisplay;
///
/// let mut display = MockDisplay::new();
/// display.render_lines(&["Loco 3", "SPD 64"], &[false, false], false, false).unwrap();
///
/// assert_eq!(display.render_count, 1);
/// assert_eq!(display.last_lines[1], "SPD 64");
/// ```
#[derive(Debug, Default)]
pub struct MockDisplay {
    /// Lines from the last render call.
    pub last_lines: Vec<String>,
    /// Inversion flags from the last render call.
    pub last_invert: Vec<bool>,
    /// Whether the last render was in password mode.
    pub last_password_mode: bool,
    /// Whether the last render drew the separator rule.
    pub last_separator: bool,
    /// Number of times `render_lines` was called.
    pub render_count: usize,
    /// Number of times `clear` was called.
    pub clear_count: usize,
    /// Current power-save state.
    pub power_saving: bool,
}

impl MockDisplay {
    /// Creates a new mock display.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any rendered line contains `needle`.
    pub fn shows(&self, needle: &str) -> bool {
        self.last_lines.iter().any(|l| l.contains(needle))
    }
}

impl TextDisplay for MockDisplay {
    type Error = ();

    fn render_lines(
        &mut self,
        lines: &[&str],
        invert: &[bool],
        password_mode: bool,
        draw_separator: bool,
    ) -> Result<(), ()> {
        self.last_lines = lines.iter().map(|l| String::from(*l)).collect();
        self.last_invert = invert.to_vec();
        self.last_password_mode = password_mode;
        self.last_separator = draw_separator;
        self.render_count += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ()> {
        self.last_lines.clear();
        self.clear_count += 1;
        Ok(())
    }

    fn power_save(&mut self, on: bool) -> Result<(), ()> {
        self.power_saving = on;
        Ok(())
    }
}

// ============================================================================
// Storage Mock
// ============================================================================

/// In-memory preference store.
#[derive(Clone, Debug, Default)]
pub struct MockStorage {
    strings: Vec<(String, String)>,
    ints: Vec<(String, i32)>,
    bools: Vec<(String, bool)>,
}

impl MockStorage {
    /// Creates an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MockStorage {
    fn get_str(&self, key: &str, default: &str) -> StoredString {
        let value = self
            .strings
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or(default);
        let mut out = StoredString::new();
        let _ = out.push_str(value);
        out
    }

    fn put_str(&mut self, key: &str, value: &str) {
        if let Some(slot) = self.strings.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value.into();
        } else {
            self.strings.push((key.into(), value.into()));
        }
    }

    fn get_i32(&self, key: &str, default: i32) -> i32 {
        self.ints
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
            .unwrap_or(default)
    }

    fn put_i32(&mut self, key: &str, value: i32) {
        if let Some(slot) = self.ints.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.ints.push((key.into(), value));
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.bools
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
            .unwrap_or(default)
    }

    fn put_bool(&mut self, key: &str, value: bool) {
        if let Some(slot) = self.bools.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.bools.push((key.into(), value));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
