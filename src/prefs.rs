//! Typed persisted preferences over the [`Storage`] trait.
//!
//! One namespaced key per setting, matching the NVS layout the handheld
//! hardware uses. Reads fall back to the configured defaults; writes go
//! straight through (the store itself decides when to flush).
//!
//! # Example
//!
//! ```rust
//! use wit_throttle::hal::mock::MockStorage;
//! use wit_throttle::prefs::Preferences;
//!
//! let mut prefs = Preferences::new(MockStorage::new());
//! prefs.set_last_ssid("layout-net");
//! assert_eq!(prefs.last_ssid().as_str(), "layout-net");
//! assert_eq!(prefs.max_throttles(2), 2); // nothing stored yet
//! ```

use core::net::Ipv4Addr;

use crate::config::BatteryShowMode;
use crate::traits::storage::{Storage, StoredString};

mod keys {
    pub const LAST_SSID: &str = "lastSSID";
    pub const SSID_PASSWORD_PREFIX: &str = "pw_";
    pub const LAST_SERVER_IP: &str = "lastServerIP";
    pub const LAST_SERVER_PORT: &str = "lastServerPort";
    pub const SPEED_MULT: &str = "speedMult";
    pub const HEARTBEAT: &str = "heartbeat";
    pub const MAX_THROTTLES: &str = "maxThrottles";
    pub const BATTERY_SHOW: &str = "batteryShow";
    pub const AUTO_CONNECT: &str = "autoConnect";
    pub const DEBUG_LEVEL: &str = "debugLevel";
}

/// Typed preference accessors over any [`Storage`] back-end.
pub struct Preferences<S: Storage> {
    store: S,
}

impl<S: Storage> Preferences<S> {
    /// Wrap a storage back-end.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The SSID of the last joined network, empty if none.
    pub fn last_ssid(&self) -> StoredString {
        self.store.get_str(keys::LAST_SSID, "")
    }

    /// Remember the last joined network.
    pub fn set_last_ssid(&mut self, ssid: &str) {
        self.store.put_str(keys::LAST_SSID, ssid);
    }

    /// The stored password for a network, empty if none was saved.
    pub fn wifi_password(&self, ssid: &str) -> StoredString {
        self.store.get_str(&ssid_password_key(ssid), "")
    }

    /// Remember the password a network was joined with.
    pub fn set_wifi_password(&mut self, ssid: &str, password: &str) {
        self.store.put_str(&ssid_password_key(ssid), password);
    }

    /// The last connected server, if one was remembered and parses.
    pub fn last_server(&self) -> Option<(Ipv4Addr, u16)> {
        let ip_str = self.store.get_str(keys::LAST_SERVER_IP, "");
        if ip_str.is_empty() {
            return None;
        }
        let ip: Ipv4Addr = ip_str.as_str().parse().ok()?;
        let port = self.store.get_i32(keys::LAST_SERVER_PORT, 0);
        let port = u16::try_from(port).ok().filter(|p| *p != 0)?;
        Some((ip, port))
    }

    /// Remember the last connected server.
    pub fn set_last_server(&mut self, ip: Ipv4Addr, port: u16) {
        let mut text = StoredString::new();
        let _ = core::fmt::Write::write_fmt(&mut text, format_args!("{}", ip));
        self.store.put_str(keys::LAST_SERVER_IP, &text);
        self.store.put_i32(keys::LAST_SERVER_PORT, port as i32);
    }

    /// Encoder step multiplier, clamped to 1 or 2.
    pub fn speed_multiplier(&self, default: u8) -> u8 {
        self.store
            .get_i32(keys::SPEED_MULT, default as i32)
            .clamp(1, 2) as u8
    }

    /// Persist the step multiplier.
    pub fn set_speed_multiplier(&mut self, multiplier: u8) {
        self.store
            .put_i32(keys::SPEED_MULT, multiplier.clamp(1, 2) as i32);
    }

    /// Whether the idle heartbeat is enabled (default on).
    pub fn heartbeat_enabled(&self) -> bool {
        self.store.get_bool(keys::HEARTBEAT, true)
    }

    /// Persist the heartbeat flag.
    pub fn set_heartbeat_enabled(&mut self, on: bool) {
        self.store.put_bool(keys::HEARTBEAT, on);
    }

    /// How many slots the next-throttle key cycles through (1 to 6).
    pub fn max_throttles(&self, default: u8) -> u8 {
        self.store
            .get_i32(keys::MAX_THROTTLES, default as i32)
            .clamp(1, 6) as u8
    }

    /// Persist the slot count.
    pub fn set_max_throttles(&mut self, max: u8) {
        self.store
            .put_i32(keys::MAX_THROTTLES, max.clamp(1, 6) as i32);
    }

    /// The battery indicator mode.
    pub fn battery_show_mode(&self, default: BatteryShowMode) -> BatteryShowMode {
        BatteryShowMode::from_i32(self.store.get_i32(keys::BATTERY_SHOW, default.as_i32()))
    }

    /// Persist the battery indicator mode.
    pub fn set_battery_show_mode(&mut self, mode: BatteryShowMode) {
        self.store.put_i32(keys::BATTERY_SHOW, mode.as_i32());
    }

    /// Whether to connect to the first discovered server without asking.
    pub fn auto_connect(&self) -> bool {
        self.store.get_bool(keys::AUTO_CONNECT, false)
    }

    /// Persist the auto-connect flag.
    pub fn set_auto_connect(&mut self, on: bool) {
        self.store.put_bool(keys::AUTO_CONNECT, on);
    }

    /// Log verbosity level, 0 to 2.
    pub fn debug_level(&self) -> u8 {
        self.store.get_i32(keys::DEBUG_LEVEL, 0).clamp(0, 2) as u8
    }

    /// Persist the log verbosity level.
    pub fn set_debug_level(&mut self, level: u8) {
        self.store.put_i32(keys::DEBUG_LEVEL, level.min(2) as i32);
    }

    /// Borrow the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Borrow the underlying store (for keys the core does not type).
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }
}

/// One password key per SSID, prefixed to keep the flat key space tidy.
fn ssid_password_key(ssid: &str) -> heapless::String<40> {
    let mut key = heapless::String::new();
    let _ = key.push_str(keys::SSID_PASSWORD_PREFIX);
    let _ = key.push_str(ssid);
    key
}
