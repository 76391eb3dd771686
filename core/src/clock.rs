//! Session clock — maps wall-clock time onto ticks.
//!
//! Every peer shares the same epoch (agreed during pairing), so
//! `now - epoch` names the same tick everywhere, modulo clock-sync error.

use crate::{
    config::SessionConfig,
    types::{Millis, Tick},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionClock {
    pub epoch_ms: Millis,
    pub tick_ms:  Millis,
    pub running:  bool,
}

impl SessionClock {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            epoch_ms: config.time_to_start_ms,
            tick_ms:  config.tick_ms,
            running:  false,
        }
    }

    /// Flip to running once `now` reaches the epoch.
    /// Returns true only on the call that starts the session.
    pub fn start_if_due(&mut self, now: Millis) -> bool {
        if !self.running && now >= self.epoch_ms {
            self.running = true;
            return true;
        }
        false
    }

    /// Simulated timestamp of a tick.
    pub fn time_of(&self, tick: Tick) -> Millis {
        self.epoch_ms + tick as f64 * self.tick_ms
    }

    /// Tick duration in seconds, as handed to the simulation step.
    pub fn tick_seconds(&self) -> f64 {
        self.tick_ms / 1000.0
    }

    /// Wall-clock instant at which the tick after `newest` is due.
    pub fn next_due(&self, newest: Tick) -> Millis {
        self.time_of(newest + 1)
    }

    /// How many ticks after `newest` are due at `now`.
    ///
    /// 0 means nothing to do; 1 is the normal case; anything above 1 is a
    /// gap that must be filled speculatively.
    pub fn ticks_due(&self, now: Millis, newest: Tick) -> u64 {
        let due = self.next_due(newest);
        if now < due {
            return 0;
        }
        ((now - due) / self.tick_ms).floor() as u64 + 1
    }
}
