//! Rollback: recompute every tick after a corrected one.
//!
//! Each successor is re-derived from its (already corrected) predecessor,
//! in tick order. Only the successor's payload and cursor are replaced;
//! commands already committed to the successor stay, because a later tick
//! may hold a correct input that arrived independently.

use serde::{Deserialize, Serialize};

use crate::{
    history::History,
    rng::DeterministicSequence,
    simulation::Simulation,
    step::step,
    types::Tick,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackReport {
    /// The corrected tick everything after was recomputed from.
    pub from_tick:   Tick,
    /// Newest tick recomputed.
    pub to_tick:     Tick,
    pub resimulated: u64,
    /// The requested tick had already left the window.
    pub clamped:     bool,
}

/// Recompute `(from, newest]`.
///
/// A `from` older than the window is clamped to the oldest retained tick
/// (the oldest state becomes the authority). A `from` at or past the
/// newest tick has nothing after it; returns None. `dt` is the tick
/// duration in seconds.
pub fn resimulate_from<S: Simulation + ?Sized>(
    sim: &S,
    history: &mut History<S::Payload>,
    sequence: &mut DeterministicSequence,
    from: Tick,
    dt: f64,
) -> Option<RollbackReport> {
    let first = history.first_tick();
    let newest = history.newest_tick();
    let clamped = from < first;
    let from = if clamped {
        log::warn!("rollback from tick {from} predates history (first tick {first}); clamping");
        first
    } else {
        from
    };
    if from >= newest {
        return None;
    }

    log::debug!("rewriting history from tick {from} to {newest}");
    for tick in from..newest {
        let out = {
            let prev = history.get(tick)?;
            step(sim, &prev.payload, &prev.commands, prev.sequence_cursor, sequence, dt)
        };
        let next = history.get_mut(tick + 1)?;
        next.payload = out.payload;
        next.sequence_cursor = out.cursor;
        log::trace!("rewrote {}", next.describe());
    }

    Some(RollbackReport {
        from_tick: from,
        to_tick: newest,
        resimulated: newest - from,
        clamped,
    })
}
