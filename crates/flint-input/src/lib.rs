//! Keyboard press/release tracking for the frame loop.

pub mod keys;

pub use keys::{KeyAction, PressedKeys};
