//! Bounded, tick-contiguous window of simulation states.
//!
//! INVARIANT: `states[i].tick == states[0].tick + i`, always.
//! States only leave from the front (FIFO cap); states in the middle are
//! replaced in place by rollback.

use std::collections::VecDeque;

use crate::{
    error::{SimError, SimResult},
    state::SimulationState,
    types::Tick,
};

pub struct History<P> {
    states: VecDeque<SimulationState<P>>,
    cap:    usize,
}

impl<P> History<P> {
    /// A window holding only `initial`. `cap` must be at least 1.
    pub fn new(initial: SimulationState<P>, cap: usize) -> SimResult<Self> {
        if cap == 0 {
            return Err(SimError::InvalidConfig { reason: "history cap must be at least 1".into() });
        }
        let mut states = VecDeque::with_capacity(cap.min(4096) + 1);
        states.push_back(initial);
        Ok(Self { states, cap })
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn first_tick(&self) -> Tick {
        self.states[0].tick
    }

    pub fn newest_tick(&self) -> Tick {
        self.first_tick() + self.states.len() as u64 - 1
    }

    /// Whether `tick` is inside the retained window.
    pub fn contains(&self, tick: Tick) -> bool {
        tick >= self.first_tick() && tick <= self.newest_tick()
    }

    pub fn newest(&self) -> &SimulationState<P> {
        &self.states[self.states.len() - 1]
    }

    pub fn newest_mut(&mut self) -> &mut SimulationState<P> {
        let last = self.states.len() - 1;
        &mut self.states[last]
    }

    pub fn get(&self, tick: Tick) -> Option<&SimulationState<P>> {
        if !self.contains(tick) {
            return None;
        }
        self.states.get((tick - self.first_tick()) as usize)
    }

    pub fn get_mut(&mut self, tick: Tick) -> Option<&mut SimulationState<P>> {
        if !self.contains(tick) {
            return None;
        }
        let index = (tick - self.first_tick()) as usize;
        self.states.get_mut(index)
    }

    /// State at a window position (0 = oldest retained).
    pub fn at(&self, index: usize) -> Option<&SimulationState<P>> {
        self.states.get(index)
    }

    /// Append the state for `newest_tick() + 1`.
    pub fn push(&mut self, state: SimulationState<P>) -> SimResult<()> {
        let expected = self.newest_tick() + 1;
        if state.tick != expected {
            return Err(SimError::TickMismatch { expected, actual: state.tick });
        }
        self.states.push_back(state);
        Ok(())
    }

    /// Drop the oldest states until the cap holds. Returns how many went.
    pub fn evict_to_cap(&mut self) -> usize {
        let mut evicted = 0;
        while self.states.len() > self.cap {
            self.states.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimulationState<P>> {
        self.states.iter()
    }
}
