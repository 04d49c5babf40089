//! Persistent key-value storage abstraction.
//!
//! Wraps the platform's namespaced NVS-style preference store. The core
//! persists a handful of scalars (last SSID, last server, speed
//! multiplier, battery display mode); see [`crate::prefs`] for the typed
//! layer with the key names.

use heapless::String as HString;

/// Maximum length of a stored string value.
pub const MAX_VALUE: usize = 64;

/// A stored string value.
pub type StoredString = HString<MAX_VALUE>;

/// Namespaced scalar key-value store.
///
/// Reads return the supplied default when the key is absent; writes are
/// best-effort (NVS wear or a full partition must never take the
/// controller down, so there is no error channel on this seam).
pub trait Storage {
    /// Read a string, falling back to `default` when absent.
    fn get_str(&self, key: &str, default: &str) -> StoredString;

    /// Store a string.
    fn put_str(&mut self, key: &str, value: &str);

    /// Read an integer, falling back to `default` when absent.
    fn get_i32(&self, key: &str, default: i32) -> i32;

    /// Store an integer.
    fn put_i32(&mut self, key: &str, value: i32);

    /// Read a boolean, falling back to `default` when absent.
    fn get_bool(&self, key: &str, default: bool) -> bool;

    /// Store a boolean.
    fn put_bool(&mut self, key: &str, value: bool);
}
