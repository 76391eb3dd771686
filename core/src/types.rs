//! Shared primitive types used across the entire engine.

use serde::{Deserialize, Serialize};

/// A simulation tick. One tick = one fixed step of simulated time.
pub type Tick = u64;

/// Position of a peer in the session roster. Identical on every peer.
pub type PeerIndex = u16;

/// A sampled input value, exactly as carried on the wire.
pub type CommandValue = u16;

/// Wall-clock or simulated time in milliseconds.
pub type Millis = f64;

/// Stable identifier for a peer (assigned at pairing time).
pub type PeerId = String;

/// 2D vector used for body kinematics and display positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
