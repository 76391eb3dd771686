//! One entry of history: the world at a tick plus the inputs that will
//! produce the next tick.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::types::{CommandValue, Millis, PeerIndex, Tick};

/// Committed commands of one tick, one slot per peer.
///
/// Iteration is always in ascending peer index, which is the order the
/// step function applies them in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSlots {
    slots: Vec<Option<CommandValue>>,
}

impl CommandSlots {
    pub fn empty(peers: usize) -> Self {
        Self { slots: vec![None; peers] }
    }

    pub fn peers(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, peer: PeerIndex) -> Option<CommandValue> {
        self.slots.get(peer as usize).copied().flatten()
    }

    /// Store `value` for `peer`. Returns true if the slot changed.
    /// Out-of-range peers are ignored.
    pub fn set(&mut self, peer: PeerIndex, value: CommandValue) -> bool {
        match self.slots.get_mut(peer as usize) {
            Some(slot) if *slot != Some(value) => {
                *slot = Some(value);
                true
            }
            _ => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (PeerIndex, CommandValue)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|v| (i as PeerIndex, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState<P> {
    pub tick:            Tick,
    pub simulated_time:  Millis,
    pub payload:         P,
    pub commands:        CommandSlots,
    /// Next unconsumed position of the shared sequence after this tick.
    pub sequence_cursor: u64,
}

impl<P> SimulationState<P> {
    /// One-line dump of everything but the payload.
    pub fn describe(&self) -> String {
        let mut out = format!("state {} t={:.0}ms cursor={} commands:", self.tick, self.simulated_time, self.sequence_cursor);
        for (peer, value) in self.commands.iter() {
            let _ = write!(out, " {peer}:{value}");
        }
        out
    }
}
