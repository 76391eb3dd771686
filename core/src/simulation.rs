//! The contract an embedding simulation fulfils.
//!
//! RULE: the engine owns history and time; the simulation owns meaning.
//! The engine never looks inside a payload: it clones it, hands it to
//! the step hooks below and reads body kinematics back for rendering.
//!
//! Step hooks take `&self` and receive the world they operate on as a
//! parameter. They must be pure functions of (payload, command, sequence
//! values): no wall clock, no arrival order, no hidden state.

use crate::{
    interpolate::{BodyView, RenderFrame},
    peer::PeerRoster,
    rng::SequenceCursor,
    types::{CommandValue, PeerIndex},
};

pub trait Simulation {
    /// Everything that makes up the world at one tick.
    type Payload: Clone;

    /// Stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Build the tick-0 world. Random draws start at position 0.
    fn create_initial(&mut self, roster: &PeerRoster, rng: &mut SequenceCursor<'_>) -> Self::Payload;

    /// Deep copy that shares nothing with `payload`.
    fn clone_snapshot(&self, payload: &Self::Payload) -> Self::Payload {
        payload.clone()
    }

    /// Apply one peer's committed command. Called in ascending peer order.
    fn apply_command(
        &self,
        world: &mut Self::Payload,
        peer: PeerIndex,
        command: CommandValue,
        rng: &mut SequenceCursor<'_>,
    );

    /// Advance the world by exactly `dt` seconds.
    fn step_fixed(&self, world: &mut Self::Payload, dt: f64, rng: &mut SequenceCursor<'_>);

    /// Kinematic view of every body, in a stable order across ticks.
    fn bodies(&self, world: &Self::Payload) -> Vec<BodyView>;

    /// Sample the local input device. Called once per frame.
    fn read_command(&mut self) -> CommandValue;

    /// Called once when the session clock reaches the agreed epoch.
    fn ready_to_start(&mut self) {}

    /// Present one frame. Default: nothing to draw.
    fn render(&mut self, _frame: &RenderFrame<'_, Self::Payload>) {}
}
