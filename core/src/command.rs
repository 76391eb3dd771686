//! Input command messages exchanged between peers.
//!
//! Wire format: four little-endian u16 fields, 8 bytes total.
//!
//!   [kind, origin_peer, value, target_tick]
//!
//! Kinds are append only — never renumber.

use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    types::{CommandValue, PeerIndex, Tick},
};

pub const WIRE_LEN: usize = 8;

const TICK_SPACE: u64 = 1 << 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum MessageKind {
    Input = 0,
    // Add new kinds here — append only.
}

impl MessageKind {
    fn from_wire(kind: u16) -> SimResult<Self> {
        match kind {
            0 => Ok(Self::Input),
            other => Err(SimError::UnknownMessageKind { kind: other }),
        }
    }
}

/// One peer's input for one tick, exactly as carried on the wire.
///
/// `target_tick` keeps only the low 16 bits of the tick; it is widened
/// back to a full tick against the receiver's history with [`widen_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub kind:        MessageKind,
    pub origin_peer: PeerIndex,
    pub value:       CommandValue,
    pub target_tick: u16,
}

impl CommandMessage {
    pub fn input(origin_peer: PeerIndex, value: CommandValue, target_tick: Tick) -> Self {
        Self {
            kind: MessageKind::Input,
            origin_peer,
            value,
            target_tick: (target_tick % TICK_SPACE) as u16,
        }
    }

    pub fn encode(&self) -> [u8; WIRE_LEN] {
        let mut out = [0u8; WIRE_LEN];
        let fields = [self.kind as u16, self.origin_peer, self.value, self.target_tick];
        for (chunk, field) in out.chunks_exact_mut(2).zip(fields) {
            chunk.copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> SimResult<Self> {
        if bytes.len() != WIRE_LEN {
            return Err(SimError::MalformedMessage { expected: WIRE_LEN, actual: bytes.len() });
        }
        let field = |i: usize| u16::from_le_bytes([bytes[2 * i], bytes[2 * i + 1]]);
        Ok(Self {
            kind:        MessageKind::from_wire(field(0))?,
            origin_peer: field(1),
            value:       field(2),
            target_tick: field(3),
        })
    }
}

/// Recover the full tick a 16-bit wire tick refers to: the newest tick
/// congruent to `wire` (mod 2^16) that is at most `horizon` ticks past
/// `newest`. Anything older than the retained window therefore widens to
/// a tick below it instead of wrapping into the future.
pub fn widen_tick(wire: u16, newest: Tick, horizon: u64) -> Tick {
    let limit = newest.saturating_add(horizon);
    let wire = wire as u64;
    if limit < wire {
        return wire;
    }
    limit - (limit - wire) % TICK_SPACE
}
