//! # wit-throttle
//!
//! The portable core of a handheld WiThrottle controller: a WiFi DCC
//! throttle that drives locomotives through a JMRI, DCC-EX, or
//! compatible WiThrottle server.
//!
//! ## Features
//!
//! - **WiThrottle client session**: command encoding, inbound decoding,
//!   heartbeat, bounded outbound queue, auto-reconnect
//! - **Roster/throttle model**: six throttle slots with consists, lead
//!   promotion, turnouts, and routes, all in bounded `heapless` storage
//! - **Keypad/encoder dispatcher**: direct-action digit keys, `*`/`#`
//!   menu commands, selection and entry modes
//! - **Hardware abstraction**: traits for keypad, encoder, battery,
//!   display, transport, mDNS discovery, WiFi, and preference storage
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Hardware, network, display, and storage abstractions
//! - `protocol` - WiThrottle wire encoding and decoding
//! - `roster` - Locomotive, turnout, route, and slot state
//! - `connection` - Connection state machine and session
//! - `input` - Keypad/encoder event dispatch
//! - `screen` - Screen state and status-line decay
//! - `controller` - Top-level context tying everything together
//! - `hal` - Mock implementations for testing
//!
//! ## Example
//!
//! ```rust
//! use wit_throttle::{
//!     config::{Config, ServerConfig},
//!     controller::WitController,
//!     hal::mock::*,
//! };
//!
//! let config = Config::default()
//!     .with_server(ServerConfig::default().with_auto_connect(true));
//!
//! let mut controller = WitController::new(
//!     config,
//!     MockTransport::new(),
//!     MockDiscovery::new(),
//!     MockWifi::new(),
//!     MockKeypad::new(),
//!     MockEncoder::new(),
//!     MockBattery::new(),
//!     MockStorage::new(),
//!     MockDisplay::new(),
//! );
//!
//! // Main loop: feed the millisecond clock
//! controller.start(0);
//! for t in 0..10 {
//!     controller.tick(t * 20);
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

/// Shared configuration system for desktop and hardware builds.
pub mod config;
/// Connection state machine and WiThrottle session.
pub mod connection;
/// Top-level controller owning every subsystem.
pub mod controller;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Keypad and encoder input dispatcher.
pub mod input;
/// Typed persisted preferences.
pub mod prefs;
/// WiThrottle wire protocol: command encoding and line decoding.
pub mod protocol;
/// Roster, turnout, route, and throttle-slot state.
pub mod roster;
/// Screen state and status-line decay.
pub mod screen;
/// Core traits for hardware, network, display, and storage seams.
pub mod traits;

pub use config::{
    BatteryShowMode, Config, DisplayConfig, KeypadConfig, ServerConfig, ThrottleConfig, WifiConfig,
};
pub use connection::{ConnectionState, ServerEntry, Session, SessionError, SessionEvent};
pub use controller::WitController;
pub use input::{Action, Dispatcher, InputEvent, KeypadMode};
pub use prefs::Preferences;
pub use protocol::{
    parse_line, Command, Direction, LengthClass, ProtocolError, RouteState, ServerMessage,
    TrackPower, TurnoutState,
};
pub use roster::{ModelError, Roster, RosterEntry, RouteEntry, ThrottleSlot, TurnoutEntry};
pub use screen::{Screen, ScreenState};
pub use traits::{
    BatteryMonitor, Clock, EncoderInput, Key, KeyEvent, KeyPhase, KeypadInput, ServerInfo,
    ServiceDiscovery, ServiceKind, Storage, TextDisplay, Transport, WifiLink,
};
