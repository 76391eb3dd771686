//! The step function: one predecessor state in, one successor out.

use crate::{
    clock::SessionClock,
    rng::DeterministicSequence,
    simulation::Simulation,
    state::{CommandSlots, SimulationState},
};

#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput<P> {
    pub payload: P,
    /// Next unconsumed sequence position after this step.
    pub cursor:  u64,
}

/// Compute the successor payload of (`payload`, `commands`, `cursor`).
///
/// The input payload is cloned first and left untouched, so the same
/// predecessor can be stepped again after its commands are corrected.
pub fn step<S: Simulation + ?Sized>(
    sim: &S,
    payload: &S::Payload,
    commands: &CommandSlots,
    cursor: u64,
    sequence: &mut DeterministicSequence,
    dt: f64,
) -> StepOutput<S::Payload> {
    let mut next = sim.clone_snapshot(payload);
    let mut rng = sequence.cursor_at(cursor);
    for (peer, value) in commands.iter() {
        sim.apply_command(&mut next, peer, value, &mut rng);
    }
    sim.step_fixed(&mut next, dt, &mut rng);
    StepOutput { cursor: rng.position(), payload: next }
}

/// Build the state for `prev.tick + 1` with no commands committed yet.
pub fn next_state<S: Simulation + ?Sized>(
    sim: &S,
    prev: &SimulationState<S::Payload>,
    sequence: &mut DeterministicSequence,
    clock: &SessionClock,
) -> SimulationState<S::Payload> {
    let out = step(sim, &prev.payload, &prev.commands, prev.sequence_cursor, sequence, clock.tick_seconds());
    SimulationState {
        tick:            prev.tick + 1,
        simulated_time:  clock.time_of(prev.tick + 1),
        payload:         out.payload,
        commands:        CommandSlots::empty(prev.commands.peers()),
        sequence_cursor: out.cursor,
    }
}
