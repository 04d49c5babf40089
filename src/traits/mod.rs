//! Trait definitions for hardware, network, display, and storage seams.
//!
//! This module defines the abstractions that let the controller core:
//! - Run on different hardware (ESP32, desktop mock)
//! - Talk to the server through any line-oriented transport
//! - Render to any text-line display back-end
//!
//! # Submodules
//!
//! - `hardware`: keypad, encoder, battery monitor, clock
//! - `network`: transport, service discovery, WiFi link
//! - `display`: text-line display contract
//! - `storage`: persisted preference store
//!
//! The core never touches pins, sockets, or draw calls directly; every
//! platform-facing effect crosses one of these traits, and every trait
//! has a mock in [`crate::hal::mock`].

pub mod display;
pub mod hardware;
pub mod network;
pub mod storage;

pub use display::*;
pub use hardware::*;
pub use network::*;
pub use storage::*;
