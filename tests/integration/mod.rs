//! Integration test suite for tickpilot.
//!
//! These tests drive the control loops end to end against a simulated
//! world and check how each motion finishes, including interruption,
//! timeouts and composition through behavior trees.
//!
//! # Test Categories
//!
//! - `walk`: Axis moves and jumps on flat ground
//! - `ladder`: Vertical climbs
//! - `flight`: Take-off and booster ascent
//! - `cruise`: Level glides with re-anchoring
//! - `land`: Hover descent and free fall
//! - `tasks`: Interruption, timeouts and motion locking
//! - `behavior`: Behavior trees over real motions
//!
//! # Determinism
//!
//! The simulated world only steps when a loop waits for a tick, so tick
//! counts asserted here are exact.

mod fixtures;

mod behavior;
mod cruise;
