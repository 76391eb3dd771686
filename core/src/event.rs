//! Engine events — what happened during one advance.
//!
//! Every advance returns the events it produced, in order. They are
//! diagnostics: nothing in the engine reads them back.

use serde::{Deserialize, Serialize};

use crate::types::{CommandValue, Millis, PeerIndex, Tick};

/// Variants are append only — never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    SessionStarted {
        epoch_ms: Millis,
    },
    GapFilled {
        last_known_tick: Tick,
        synthesized:     u64,
    },
    CommandsDrained {
        applied:    u64,
        duplicates: u64,
        stale:      u64,
        deferred:   u64,
    },
    HistoryRewritten {
        from_tick:   Tick,
        to_tick:     Tick,
        resimulated: u64,
        clamped:     bool,
    },
    LocalCommandSent {
        tick:  Tick,
        value: CommandValue,
    },
    TickAppended {
        tick: Tick,
    },
    PeerDisconnected {
        peer: PeerIndex,
    },
}

/// Running totals over the life of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub messages_sent:     u64,
    pub messages_received: u64,
    pub ticks_appended:    u64,
    pub gaps:              u64,
    pub synthesized_ticks: u64,
    pub rollbacks:         u64,
    pub resimulated_ticks: u64,
    pub commands_applied:  u64,
    pub duplicates:        u64,
    pub stale_dropped:     u64,
    pub rejected:          u64,
}
