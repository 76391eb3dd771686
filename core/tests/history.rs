use lockstep_core::{
    bounce_world::BounceWorld,
    channel::RecordingChannel,
    command::CommandMessage,
    config::SessionConfig,
    engine::LockstepEngine,
    error::SimError,
    event::EngineEvent,
    history::History,
    peer::{PeerRecord, PeerRoster},
    pending::PendingCommands,
    state::{CommandSlots, SimulationState},
};

fn state(tick: u64) -> SimulationState<u32> {
    SimulationState {
        tick,
        simulated_time:  tick as f64 * 100.0,
        payload:         tick as u32,
        commands:        CommandSlots::empty(2),
        sequence_cursor: 0,
    }
}

/// Window holding ticks `first..=last`.
fn window(first: u64, last: u64, cap: usize) -> History<u32> {
    let mut history = History::new(state(first), cap).expect("history");
    for tick in first + 1..=last {
        history.push(state(tick)).expect("contiguous push");
    }
    history
}

fn engine(config: SessionConfig) -> LockstepEngine<BounceWorld, RecordingChannel> {
    let peers = vec![PeerRecord::new("a", "alice"), PeerRecord::new("b", "bob")];
    let roster = PeerRoster::new(peers, "a").expect("roster");
    LockstepEngine::new(config, roster, BounceWorld::new(), RecordingChannel::new()).expect("engine")
}

#[test]
fn history_stays_within_cap_and_contiguous() {
    let config = SessionConfig { history_cap: 10, ..SessionConfig::default_test() };
    let mut e = engine(config);
    for tick in 1..=50u64 {
        e.advance(tick as f64 * 100.0).expect("advance");
        assert!(e.history().len() <= 10);
    }

    assert_eq!(e.history().len(), 10);
    assert_eq!(e.history().first_tick(), 41);
    assert_eq!(e.newest_tick(), 50);
    for (i, s) in e.history().iter().enumerate() {
        assert_eq!(s.tick, 41 + i as u64, "gap in history at index {i}");
    }
    assert_eq!(e.render_index(), 7);
}

#[test]
fn render_index_is_zero_while_history_is_short() {
    let mut e = engine(SessionConfig::default_test());
    e.advance(100.0).expect("advance");
    assert_eq!(e.history().len(), 2);
    assert_eq!(e.render_index(), 0);

    e.advance(200.0).expect("advance");
    e.advance(300.0).expect("advance");
    assert_eq!(e.render_index(), 1);
}

#[test]
fn push_rejects_non_contiguous_tick() {
    let mut history = window(0, 3, 10);
    let err = history.push(state(5)).unwrap_err();
    assert!(matches!(err, SimError::TickMismatch { expected: 4, actual: 5 }));
    assert_eq!(history.newest_tick(), 3);
}

#[test]
fn command_older_than_window_is_dropped() {
    let mut history = window(500, 1499, 1000);
    let before: Vec<_> = history.iter().cloned().collect();

    let mut pending = PendingCommands::new();
    pending.inbox().deliver(CommandMessage::input(1, 7, 100));
    assert_eq!(pending.collect(), 1);
    let report = pending.drain_into(&mut history);

    assert_eq!(report.stale, 1);
    assert_eq!(report.invalidated_from, None);
    assert!(pending.is_empty(), "stale command must not be retried");
    let after: Vec<_> = history.iter().cloned().collect();
    assert_eq!(before, after);
}

#[test]
fn long_gone_command_is_stale_not_future() {
    let mut history = window(39_001, 40_000, 1_000);
    let mut pending = PendingCommands::new();
    pending.inbox().deliver(CommandMessage::input(1, 7, 100));
    pending.collect();

    let report = pending.drain_into(&mut history);
    assert_eq!(report.stale, 1);
    assert_eq!(report.deferred, 0);
    assert!(pending.is_empty());

    // Walk past the wire-tick wrap; nothing may land on tick 65_636.
    for tick in 40_001..=65_636 {
        history.push(state(tick)).expect("push");
        history.evict_to_cap();
    }
    let report = pending.drain_into(&mut history);
    assert_eq!(report.applied, 0);
    assert_eq!(history.get(65_636).and_then(|s| s.commands.get(1)), None);
}

#[test]
fn zero_cap_is_rejected() {
    let err = History::new(state(0), 0).err();
    assert!(matches!(err, Some(SimError::InvalidConfig { .. })));
}

#[test]
fn simulated_time_does_not_drift() {
    let config = SessionConfig { tick_ms: 1000.0 / 60.0, history_cap: 2_000, ..SessionConfig::default_test() };
    let mut e = engine(config);
    for _ in 0..1_200 {
        let due = e.clock.next_due(e.newest_tick());
        e.advance(due).expect("advance");
    }
    // Jump ahead to exercise synthesized ticks as well.
    e.advance(e.clock.time_of(1_210)).expect("advance");

    for s in e.history().iter() {
        assert_eq!(s.simulated_time, e.clock.time_of(s.tick), "tick {} drifted", s.tick);
    }
}

#[test]
fn future_command_waits_for_its_tick() {
    let mut history = window(0, 10, 100);
    let mut pending = PendingCommands::new();
    pending.inbox().deliver(CommandMessage::input(1, 20, 12));
    pending.collect();

    let report = pending.drain_into(&mut history);
    assert_eq!(report.deferred, 1);
    assert_eq!(pending.len(), 1);

    history.push(state(11)).expect("push");
    history.push(state(12)).expect("push");
    let report = pending.drain_into(&mut history);
    assert_eq!(report.applied, 1);
    // Landing on the newest tick needs no rollback.
    assert_eq!(report.invalidated_from, None);
    assert_eq!(history.get(12).and_then(|s| s.commands.get(1)), Some(20));
    assert!(pending.is_empty());
}

#[test]
fn earliest_changed_tick_is_the_rollback_point() {
    let mut history = window(0, 20, 100);
    let mut pending = PendingCommands::new();
    let inbox = pending.inbox();
    inbox.deliver(CommandMessage::input(1, 10, 15));
    inbox.deliver(CommandMessage::input(0, 12, 9));
    inbox.deliver(CommandMessage::input(1, 10, 15));
    pending.collect();

    let report = pending.drain_into(&mut history);
    assert_eq!(report.applied, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.invalidated_from, Some(9));
}

#[test]
fn command_from_unknown_peer_is_rejected() {
    let mut history = window(0, 5, 100);
    let mut pending = PendingCommands::new();
    pending.inbox().deliver(CommandMessage::input(7, 10, 3));
    pending.collect();

    let report = pending.drain_into(&mut history);
    assert_eq!(report.rejected, 1);
    assert!(history.iter().all(|s| s.commands.is_empty()));
}

#[test]
fn malformed_bytes_never_reach_the_buffer() {
    let mut pending = PendingCommands::new();
    let inbox = pending.inbox();
    assert!(inbox.on_message("b", &[0, 0, 1]).is_err());
    assert!(inbox.on_message("b", &[9, 0, 1, 0, 10, 0, 3, 0]).is_err());
    assert_eq!(pending.collect(), 0);
}

#[test]
fn gap_is_filled_then_recomputed() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut stalled = engine(SessionConfig::default_test());
    let mut steady = engine(SessionConfig::default_test());

    stalled.advance(100.0).expect("advance");
    let events = stalled.advance(550.0).expect("advance");
    assert!(events.contains(&EngineEvent::GapFilled { last_known_tick: 1, synthesized: 3 }));
    assert!(events.contains(&EngineEvent::HistoryRewritten {
        from_tick:   1,
        to_tick:     4,
        resimulated: 3,
        clamped:     false,
    }));
    assert_eq!(stalled.newest_tick(), 5);

    for tick in 1..=5u64 {
        steady.advance(tick as f64 * 100.0).expect("advance");
    }
    for tick in 0..=5 {
        assert_eq!(
            stalled.state_at(tick).map(|s| (&s.payload, s.sequence_cursor, s.simulated_time)),
            steady.state_at(tick).map(|s| (&s.payload, s.sequence_cursor, s.simulated_time)),
            "tick {tick} differs after gap recovery"
        );
    }
}

#[test]
fn nothing_happens_before_the_next_tick_is_due() {
    let mut e = engine(SessionConfig::default_test());
    assert!(e.advance(99.9).expect("advance").is_empty());
    assert_eq!(e.newest_tick(), 0);
}
