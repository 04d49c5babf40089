//! Hardware Abstraction Layer implementations.
//!
//! This module contains concrete implementations of the traits
//! defined in [`crate::traits`].
//!
//! # Available Implementations
//!
//! - `mock`: Test implementations for desktop development
//!
//! Hardware ports live out of tree; they implement the same traits over
//! their platform's keypad, encoder, socket, and display libraries.

pub mod mock;

pub use mock::*;
