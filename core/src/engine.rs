//! The lockstep engine — fixed-timestep scheduler over a rollback history.
//!
//! ADVANCE ORDER (fixed, documented, never reordered):
//!   1. Fill wall-clock gaps with speculative, command-less ticks
//!   2. Drain pending remote commands into the history window
//!   3. Widen the rollback point to cover speculative ticks
//!   4. Resimulate everything after the earliest corrected tick
//!   5. Commit (and broadcast) the local command, step one new tick
//!   6. Evict from the front down to the history cap
//!   7. Recompute the render index
//!
//! RULES:
//!   - advance() never waits on the network; it always produces a tick
//!     from the best information available and lets rollback fix it.
//!   - Only this module mutates history.
//!   - All randomness flows through the DeterministicSequence.

use crate::{
    channel::CommandChannel,
    clock::SessionClock,
    command::CommandMessage,
    config::SessionConfig,
    error::SimResult,
    event::{EngineEvent, EngineStats},
    history::History,
    interpolate::{DisplayBody, Interpolator, RenderFrame},
    pending::{CommandInbox, PendingCommands},
    peer::PeerRoster,
    rng::DeterministicSequence,
    rollback,
    simulation::Simulation,
    state::{CommandSlots, SimulationState},
    step,
    types::{CommandValue, Millis, Tick},
};

pub struct LockstepEngine<S: Simulation, C: CommandChannel> {
    pub clock:     SessionClock,
    config:        SessionConfig,
    roster:        PeerRoster,
    simulation:    S,
    channel:       C,
    sequence:      DeterministicSequence,
    history:       History<S::Payload>,
    pending:       PendingCommands,
    interpolator:  Interpolator,
    render_index:  usize,
    local_command: Option<CommandValue>,
    last_sent:     Option<CommandValue>,
    stats:         EngineStats,
}

impl<S: Simulation, C: CommandChannel> LockstepEngine<S, C> {
    /// Build the engine and its tick-0 state.
    pub fn new(config: SessionConfig, roster: PeerRoster, mut simulation: S, channel: C) -> SimResult<Self> {
        config.validate()?;
        let clock = SessionClock::new(&config);
        let mut sequence = DeterministicSequence::new(config.seed);

        let (payload, cursor) = {
            let mut rng = sequence.cursor_at(0);
            let payload = simulation.create_initial(&roster, &mut rng);
            (payload, rng.position())
        };
        let initial = SimulationState {
            tick:            0,
            simulated_time:  clock.time_of(0),
            payload,
            commands:        CommandSlots::empty(roster.len()),
            sequence_cursor: cursor,
        };
        log::debug!(
            "{}: session for {} peers, local index {}, seed {}",
            simulation.name(),
            roster.len(),
            roster.my_index(),
            sequence.seed()
        );

        Ok(Self {
            clock,
            history: History::new(initial, config.history_cap)?,
            interpolator: Interpolator::new(&config),
            pending: PendingCommands::new(),
            render_index: 0,
            local_command: None,
            last_sent: None,
            stats: EngineStats::default(),
            config,
            roster,
            simulation,
            channel,
            sequence,
        })
    }

    /// One frame: start gate, sample input, advance, render.
    pub fn update(&mut self, now: Millis) -> SimResult<Vec<EngineEvent>> {
        let mut events = Vec::new();
        if self.clock.start_if_due(now) {
            log::debug!("{}: running", self.simulation.name());
            self.simulation.ready_to_start();
            events.push(EngineEvent::SessionStarted { epoch_ms: self.clock.epoch_ms });
        }
        if !self.clock.running {
            return Ok(events);
        }

        self.local_command = Some(self.simulation.read_command());
        events.extend(self.advance(now)?);
        self.render(now);
        Ok(events)
    }

    /// Produce the next tick if it is due at `now`. No-op otherwise.
    pub fn advance(&mut self, now: Millis) -> SimResult<Vec<EngineEvent>> {
        let last_known = self.history.newest_tick();
        let due = self.clock.ticks_due(now, last_known);
        if due == 0 {
            return Ok(Vec::new());
        }
        let mut events = Vec::new();

        let gap = due > 1;
        if gap {
            let synthesized = due - 1;
            log::warn!(
                "There are {synthesized} gaps in history. Latest known tick: {last_known}"
            );
            self.fill_gap(synthesized)?;
            self.stats.gaps += 1;
            self.stats.synthesized_ticks += synthesized;
            events.push(EngineEvent::GapFilled { last_known_tick: last_known, synthesized });
        }

        self.stats.messages_received += self.pending.collect() as u64;
        let report = self.pending.drain_into(&mut self.history);
        self.stats.commands_applied += report.applied;
        self.stats.duplicates += report.duplicates;
        self.stats.stale_dropped += report.stale;
        self.stats.rejected += report.rejected;
        if !report.is_quiet() {
            events.push(EngineEvent::CommandsDrained {
                applied:    report.applied,
                duplicates: report.duplicates,
                stale:      report.stale,
                deferred:   report.deferred,
            });
        }

        // Speculative ticks must be redone once anything at or after the
        // last real tick is known.
        let mut rewrite_from = report.invalidated_from;
        if gap && rewrite_from.map_or(true, |t| t >= last_known) {
            rewrite_from = Some(last_known);
        }
        if let Some(from) = rewrite_from {
            if let Some(r) = rollback::resimulate_from(
                &self.simulation,
                &mut self.history,
                &mut self.sequence,
                from,
                self.clock.tick_seconds(),
            ) {
                self.stats.rollbacks += 1;
                self.stats.resimulated_ticks += r.resimulated;
                events.push(EngineEvent::HistoryRewritten {
                    from_tick:   r.from_tick,
                    to_tick:     r.to_tick,
                    resimulated: r.resimulated,
                    clamped:     r.clamped,
                });
            }
        }

        if let Some(sent) = self.commit_local_command() {
            events.push(sent);
        }

        let next = step::next_state(
            &self.simulation,
            self.history.newest(),
            &mut self.sequence,
            &self.clock,
        );
        let tick = next.tick;
        self.history.push(next)?;
        log::trace!("appended {}", self.history.newest().describe());
        self.stats.ticks_appended += 1;
        events.push(EngineEvent::TickAppended { tick });

        self.history.evict_to_cap();
        self.render_index = self.history.len().saturating_sub(self.config.render_delay + 1);

        Ok(events)
    }

    /// Clone the newest payload forward `count` times with no commands.
    fn fill_gap(&mut self, count: u64) -> SimResult<()> {
        for _ in 0..count {
            let prev = self.history.newest();
            let state = SimulationState {
                tick:            prev.tick + 1,
                simulated_time:  self.clock.time_of(prev.tick + 1),
                payload:         self.simulation.clone_snapshot(&prev.payload),
                commands:        CommandSlots::empty(self.roster.len()),
                sequence_cursor: prev.sequence_cursor,
            };
            self.history.push(state)?;
        }
        Ok(())
    }

    /// Record the sampled local command on the newest tick and tell the
    /// other peers, only when it differs from what they last heard.
    fn commit_local_command(&mut self) -> Option<EngineEvent> {
        let value = self.local_command?;
        if self.last_sent == Some(value) {
            return None;
        }
        let me = self.roster.my_index();
        let tick = self.history.newest_tick();
        self.history.newest_mut().commands.set(me, value);

        let msg = CommandMessage::input(me, value, tick);
        if let Err(e) = self.channel.broadcast(&msg.encode()) {
            log::warn!("broadcast of command {value} for tick {tick} failed: {e}");
        }
        self.last_sent = Some(value);
        self.stats.messages_sent += 1;
        log::trace!("send command: {value}, tick={tick}. total={}", self.stats.messages_sent);
        Some(EngineEvent::LocalCommandSent { tick, value })
    }

    /// Interpolated display positions for the render state.
    pub fn display_bodies(&self, now: Millis) -> Vec<DisplayBody> {
        self.interpolator.display(&self.simulation, &self.history, self.render_index, now)
    }

    fn render(&mut self, now: Millis) {
        let bodies = self.interpolator.display(&self.simulation, &self.history, self.render_index, now);
        let Some(state) = self.history.at(self.render_index) else {
            return;
        };
        let frame = RenderFrame {
            state,
            bodies,
            roster: &self.roster,
            virtual_now: self.interpolator.virtual_now(now),
        };
        self.simulation.render(&frame);
    }

    /// Transport reported that a peer went away. Simulation carries on;
    /// that peer's last commands simply stop changing.
    pub fn note_disconnected(&mut self, uuid: &str) -> Option<EngineEvent> {
        let peer = self.roster.mark_disconnected(uuid)?;
        log::info!("peer {} disconnected", self.roster.label(peer));
        Some(EngineEvent::PeerDisconnected { peer })
    }

    /// Override the sampled local command (normally read in `update`).
    pub fn set_local_command(&mut self, value: CommandValue) {
        self.local_command = Some(value);
    }

    pub fn inbox(&self) -> CommandInbox {
        self.pending.inbox()
    }

    /// Buffered remote commands still waiting for their tick.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn history(&self) -> &History<S::Payload> {
        &self.history
    }

    pub fn state_at(&self, tick: Tick) -> Option<&SimulationState<S::Payload>> {
        self.history.get(tick)
    }

    pub fn newest_tick(&self) -> Tick {
        self.history.newest_tick()
    }

    pub fn render_index(&self) -> usize {
        self.render_index
    }

    pub fn roster(&self) -> &PeerRoster {
        &self.roster
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn sequence(&self) -> &DeterministicSequence {
        &self.sequence
    }

    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut S {
        &mut self.simulation
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}
