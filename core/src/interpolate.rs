//! Render interpolation behind the simulation.
//!
//! Rendering runs `render_delay` ticks behind the newest tick so that two
//! real snapshots are (almost) always available around the displayed
//! instant. Per axis:
//!
//!   - velocity sign unchanged between the snapshots: lerp positions
//!   - sign changed (a bounce happened in between): a lerp would cut the
//!     corner, so extrapolate from the snapshot closer in time using its
//!     own position and velocity

use serde::{Deserialize, Serialize};

use crate::{
    config::SessionConfig,
    history::History,
    peer::PeerRoster,
    simulation::Simulation,
    state::SimulationState,
    types::{Millis, Vec2},
};

/// What the interpolator needs to know about one body.
/// Velocity is in units per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyView {
    pub position:    Vec2,
    pub velocity:    Vec2,
    pub interpolate: bool,
    pub enabled:     bool,
}

/// How a display coordinate was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisMode {
    /// Raw position of the render snapshot.
    Snapshot,
    Linear,
    Extrapolated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayBody {
    /// Index into `Simulation::bodies`.
    pub index:    usize,
    pub position: Vec2,
    pub x_mode:   AxisMode,
    pub y_mode:   AxisMode,
}

/// Everything a simulation needs to draw one frame.
pub struct RenderFrame<'a, P> {
    pub state:       &'a SimulationState<P>,
    pub bodies:      Vec<DisplayBody>,
    pub roster:      &'a PeerRoster,
    pub virtual_now: Millis,
}

#[derive(Debug, Clone)]
pub struct Interpolator {
    tick_ms:      Millis,
    render_delay: usize,
    enabled:      bool,
}

impl Interpolator {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            tick_ms:      config.tick_ms,
            render_delay: config.render_delay,
            enabled:      config.interpolate,
        }
    }

    /// The instant being displayed.
    pub fn virtual_now(&self, real_now: Millis) -> Millis {
        real_now - self.render_delay as f64 * self.tick_ms
    }

    /// One coordinate at `now`, given the two snapshots around it.
    #[allow(clippy::too_many_arguments)]
    pub fn axis(
        &self,
        now: Millis,
        t0: Millis,
        p0: f64,
        v0: f64,
        t1: Millis,
        p1: f64,
        v1: f64,
    ) -> (f64, AxisMode) {
        let since0 = now - t0;
        let since1 = now - t1;
        if sign(v0) == sign(v1) {
            return (p0 + since0 * (p1 - p0) / self.tick_ms, AxisMode::Linear);
        }
        let pos = if since0 < -since1 {
            p0 + v0 * since0 / 1000.0
        } else {
            p1 + v1 * since1 / 1000.0
        };
        (pos, AxisMode::Extrapolated)
    }

    /// Display positions of every enabled body of the state at
    /// `render_index`.
    pub fn display<S: Simulation + ?Sized>(
        &self,
        sim: &S,
        history: &History<S::Payload>,
        render_index: usize,
        real_now: Millis,
    ) -> Vec<DisplayBody> {
        let Some(current) = history.at(render_index) else {
            return Vec::new();
        };
        let next = if self.enabled { history.at(render_index + 1) } else { None };
        let now = self.virtual_now(real_now);

        let bodies = sim.bodies(&current.payload);
        let next_bodies = next.map(|s| sim.bodies(&s.payload)).unwrap_or_default();

        bodies
            .iter()
            .enumerate()
            .filter(|(_, body)| body.enabled)
            .map(|(index, body)| match (next, next_bodies.get(index)) {
                (Some(next), Some(b1)) if body.interpolate => {
                    let (x, x_mode) = self.axis(
                        now,
                        current.simulated_time,
                        body.position.x,
                        body.velocity.x,
                        next.simulated_time,
                        b1.position.x,
                        b1.velocity.x,
                    );
                    let (y, y_mode) = self.axis(
                        now,
                        current.simulated_time,
                        body.position.y,
                        body.velocity.y,
                        next.simulated_time,
                        b1.position.y,
                        b1.velocity.y,
                    );
                    DisplayBody { index, position: Vec2::new(x, y), x_mode, y_mode }
                }
                _ => DisplayBody {
                    index,
                    position: body.position,
                    x_mode: AxisMode::Snapshot,
                    y_mode: AxisMode::Snapshot,
                },
            })
            .collect()
    }
}

/// -1, 0 or 1. Zero velocity has its own sign, so stopping counts as a
/// direction change.
fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}
