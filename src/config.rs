//! Shared configuration system for desktop and hardware builds.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use wit_throttle::config::{Config, ServerConfig, WifiConfig};
//!
//! // Use defaults
//! let config = Config::default();
//!
//! // Or customize
//! let config = Config::default()
//!     .with_wifi(WifiConfig::default().with_ssid("layout-net"))
//!     .with_server(ServerConfig::default().with_auto_connect(true));
//! ```

use heapless::{String as HString, Vec};

use crate::input::Action;

/// Maximum length for short config strings (SSIDs, prefixes, commands)
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Maximum configured startup commands.
pub const MAX_STARTUP: usize = 4;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    // Take only what fits
    let take = s.len().min(MAX_SHORT_STRING);
    // Find valid UTF-8 boundary
    let valid_end = s
        .char_indices()
        .take_while(|(i, _)| *i < take)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// WiThrottle server configuration
    pub server: ServerConfig,
    /// Throttle behavior configuration
    pub throttle: ThrottleConfig,
    /// Keypad direct-action configuration
    pub keypad: KeypadConfig,
    /// Display configuration
    pub display: DisplayConfig,
}

impl Config {
    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set server configuration
    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    /// Set throttle configuration
    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    /// Set keypad configuration
    pub fn with_keypad(mut self, keypad: KeypadConfig) -> Self {
        self.keypad = keypad;
        self
    }

    /// Set display configuration
    pub fn with_display(mut self, display: DisplayConfig) -> Self {
        self.display = display;
        self
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiConfig {
    /// Preferred network SSID (empty = scan and ask)
    pub ssid: ShortString,
    /// Password for the preferred network
    pub password: ShortString,
    /// Whether to rejoin the last network on startup
    pub rejoin_last: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            rejoin_last: true,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Set whether to rejoin the last network on startup
    pub fn with_rejoin_last(mut self, rejoin: bool) -> Self {
        self.rejoin_last = rejoin;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// WiThrottle server configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerConfig {
    /// Connect to the first discovered server without asking
    pub auto_connect: bool,
    /// Send a keep-alive `*` after 10 s of outbound silence
    pub heartbeat_enabled: bool,
    /// Prefix outbound commands with CR LF (some stations need it)
    pub leading_crlf: bool,
    /// Raw commands sent right after every connect
    pub startup_commands: Vec<ShortString, MAX_STARTUP>,
    /// Accessory prefix for turnout commands
    pub turnout_prefix: ShortString,
    /// Accessory prefix for route commands
    pub route_prefix: ShortString,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            auto_connect: false,
            heartbeat_enabled: true,
            leading_crlf: false,
            startup_commands: Vec::new(),
            turnout_prefix: ShortString::new(),
            route_prefix: ShortString::new(),
        }
    }
}

impl ServerConfig {
    /// Set auto-connect
    pub fn with_auto_connect(mut self, on: bool) -> Self {
        self.auto_connect = on;
        self
    }

    /// Set heartbeat
    pub fn with_heartbeat(mut self, on: bool) -> Self {
        self.heartbeat_enabled = on;
        self
    }

    /// Set the leading CR LF flag
    pub fn with_leading_crlf(mut self, on: bool) -> Self {
        self.leading_crlf = on;
        self
    }

    /// Add a startup command (at most 4 are kept)
    pub fn with_startup_command(mut self, command: &str) -> Self {
        let _ = self.startup_commands.push(short_string(command));
        self
    }

    /// Set the accessory prefixes
    pub fn with_prefixes(mut self, turnout: &str, route: &str) -> Self {
        self.turnout_prefix = short_string(turnout);
        self.route_prefix = short_string(route);
        self
    }
}

// ============================================================================
// Throttle Config
// ============================================================================

/// Throttle behavior configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ThrottleConfig {
    /// How many slots the next-throttle key cycles through (1 to 6)
    pub max_throttles: u8,
    /// Initial encoder speed step multiplier (1 or 2)
    pub speed_multiplier: u8,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_throttles: 2,
            speed_multiplier: 1,
        }
    }
}

impl ThrottleConfig {
    /// Set the slot count, clamped to 1 to 6
    pub fn with_max_throttles(mut self, max: u8) -> Self {
        self.max_throttles = max.clamp(1, 6);
        self
    }

    /// Set the initial speed step multiplier, clamped to 1 or 2
    pub fn with_speed_multiplier(mut self, multiplier: u8) -> Self {
        self.speed_multiplier = multiplier.clamp(1, 2);
        self
    }
}

// ============================================================================
// Keypad Config
// ============================================================================

/// Keypad direct-action configuration.
///
/// In operation mode (outside a `*` menu command) each digit key fires
/// one [`Action`] from this table directly.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeypadConfig {
    /// Action fired by each digit key 0 to 9
    pub direct_actions: [Action; 10],
}

impl Default for KeypadConfig {
    fn default() -> Self {
        // The reference hardware layout: F0-F4 on the top rows, then
        // throttle cycling, step multiplier, direction, and e-stop.
        Self {
            direct_actions: [
                Action::ToggleFunction(0),
                Action::ToggleFunction(1),
                Action::ToggleFunction(2),
                Action::ToggleFunction(3),
                Action::ToggleFunction(4),
                Action::NextThrottle,
                Action::ToggleSpeedMultiplier,
                Action::DirectionReverse,
                Action::EmergencyStop,
                Action::DirectionForward,
            ],
        }
    }
}

impl KeypadConfig {
    /// Replace the action for one digit key
    pub fn with_action(mut self, digit: u8, action: Action) -> Self {
        if let Some(slot) = self.direct_actions.get_mut(digit as usize) {
            *slot = action;
        }
        self
    }

    /// The action bound to a digit key
    pub fn action_for(&self, digit: u8) -> Action {
        self.direct_actions
            .get(digit as usize)
            .copied()
            .unwrap_or(Action::None)
    }
}

// ============================================================================
// Display Config
// ============================================================================

/// How the battery level is shown on the operation screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BatteryShowMode {
    /// Not shown.
    None,
    /// Icon only.
    #[default]
    Icon,
    /// Icon plus percentage.
    IconAndPercent,
}

impl BatteryShowMode {
    /// Map a stored preference value; out-of-range values mean `None`.
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => BatteryShowMode::Icon,
            2 => BatteryShowMode::IconAndPercent,
            _ => BatteryShowMode::None,
        }
    }

    /// Preference value for this mode.
    pub const fn as_i32(&self) -> i32 {
        match self {
            BatteryShowMode::None => 0,
            BatteryShowMode::Icon => 1,
            BatteryShowMode::IconAndPercent => 2,
        }
    }
}

/// Display configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DisplayConfig {
    /// Battery indicator mode
    pub battery_mode: BatteryShowMode,
    /// How long a status line stays up before decaying (milliseconds)
    pub status_decay_ms: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            battery_mode: BatteryShowMode::Icon,
            status_decay_ms: 3_000,
        }
    }
}

impl DisplayConfig {
    /// Set the battery indicator mode
    pub fn with_battery_mode(mut self, mode: BatteryShowMode) -> Self {
        self.battery_mode = mode;
        self
    }

    /// Set the status decay time
    pub fn with_status_decay_ms(mut self, ms: u32) -> Self {
        self.status_decay_ms = ms;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(!config.server.auto_connect);
        assert!(config.server.heartbeat_enabled);
        assert_eq!(config.throttle.max_throttles, 2);
        assert_eq!(config.display.battery_mode, BatteryShowMode::Icon);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::default()
            .with_wifi(WifiConfig::default().with_ssid("layout-net"))
            .with_server(
                ServerConfig::default()
                    .with_auto_connect(true)
                    .with_prefixes("LT", "IR"),
            )
            .with_throttle(ThrottleConfig::default().with_max_throttles(4));

        assert_eq!(config.wifi.ssid.as_str(), "layout-net");
        assert!(config.server.auto_connect);
        assert_eq!(config.server.turnout_prefix.as_str(), "LT");
        assert_eq!(config.throttle.max_throttles, 4);
    }

    #[test]
    fn wifi_config_is_configured() {
        assert!(!WifiConfig::default().is_configured());
        assert!(WifiConfig::default().with_ssid("net").is_configured());
    }

    #[test]
    fn startup_commands_capped_at_four() {
        let server = ServerConfig::default()
            .with_startup_command("a")
            .with_startup_command("b")
            .with_startup_command("c")
            .with_startup_command("d")
            .with_startup_command("e");
        assert_eq!(server.startup_commands.len(), MAX_STARTUP);
    }

    #[test]
    fn throttle_clamps() {
        assert_eq!(
            ThrottleConfig::default().with_max_throttles(9).max_throttles,
            6
        );
        assert_eq!(
            ThrottleConfig::default().with_max_throttles(0).max_throttles,
            1
        );
        assert_eq!(
            ThrottleConfig::default()
                .with_speed_multiplier(7)
                .speed_multiplier,
            2
        );
    }

    #[test]
    fn keypad_default_table() {
        let keypad = KeypadConfig::default();
        assert_eq!(keypad.action_for(0), Action::ToggleFunction(0));
        assert_eq!(keypad.action_for(8), Action::EmergencyStop);
        assert_eq!(keypad.action_for(42), Action::None);
    }

    #[test]
    fn keypad_rebinding() {
        let keypad = KeypadConfig::default().with_action(8, Action::TrackPowerToggle);
        assert_eq!(keypad.action_for(8), Action::TrackPowerToggle);
    }

    #[test]
    fn battery_mode_roundtrip() {
        for mode in [
            BatteryShowMode::None,
            BatteryShowMode::Icon,
            BatteryShowMode::IconAndPercent,
        ] {
            assert_eq!(BatteryShowMode::from_i32(mode.as_i32()), mode);
        }
        assert_eq!(BatteryShowMode::from_i32(99), BatteryShowMode::None);
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert!(s.len() <= MAX_SHORT_STRING);
    }

    #[test]
    fn short_string_utf8_boundary() {
        // Multi-byte characters near the cap must not split
        let input = "ü".repeat(40);
        let s = short_string(&input);
        assert!(s.len() <= MAX_SHORT_STRING);
        assert!(core::str::from_utf8(s.as_bytes()).is_ok());
    }
}
