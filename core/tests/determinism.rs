//! THE MOST IMPORTANT TEST IN THE PROJECT.
//!
//! Peers that see the same inputs must hold byte-identical history,
//! no matter when those inputs arrived. Any divergence is a blocker.

use lockstep_core::{
    bounce_world::{Arena, BounceWorld, CMD_JUMP, CMD_LEFT, CMD_RIGHT},
    channel::RecordingChannel,
    config::SessionConfig,
    engine::LockstepEngine,
    event::EngineEvent,
    peer::{PeerRecord, PeerRoster},
    rng::DeterministicSequence,
    state::CommandSlots,
    step::step,
};

type Engine = LockstepEngine<BounceWorld, RecordingChannel>;

fn roster_for(me: usize) -> PeerRoster {
    let peers = vec![PeerRecord::new("peer-a", "alice"), PeerRecord::new("peer-b", "bob")];
    let uuid = peers[me].uuid.clone();
    PeerRoster::new(peers, &uuid).expect("roster")
}

fn build_engine(me: usize, seed: u64) -> Engine {
    let config = SessionConfig { seed, ..SessionConfig::default_test() };
    LockstepEngine::new(config, roster_for(me), BounceWorld::new(), RecordingChannel::new())
        .expect("engine")
}

/// Advance until `tick` is the newest, one tick per call.
fn run_to(engine: &mut Engine, tick: u64) {
    while engine.newest_tick() < tick {
        let due = engine.clock.next_due(engine.newest_tick());
        engine.advance(due).expect("advance");
    }
}

fn payload_log(engine: &Engine) -> Vec<String> {
    engine
        .history()
        .iter()
        .map(|s| serde_json::to_string(&s.payload).expect("serialize"))
        .collect()
}

#[test]
fn late_command_is_rolled_into_history() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut a = build_engine(0, 42);
    let mut b = build_engine(1, 42);

    // A presses right at tick 5; B has already predicted up to tick 8.
    run_to(&mut a, 5);
    a.set_local_command(CMD_RIGHT);
    run_to(&mut a, 9);
    run_to(&mut b, 8);

    let predicted: Arena = b.state_at(6).expect("tick 6").payload.clone();

    let sent = a.channel_mut().take();
    assert_eq!(sent.len(), 1, "only one change of input was made");
    let inbox = b.inbox();
    for bytes in &sent {
        inbox.on_message("peer-a", bytes).expect("valid message");
    }

    let events = b.advance(b.clock.next_due(8)).expect("advance");
    assert!(
        events.contains(&EngineEvent::HistoryRewritten {
            from_tick:   5,
            to_tick:     8,
            resimulated: 3,
            clamped:     false,
        }),
        "expected a rewrite of ticks 6..=8, got {events:?}"
    );
    assert_eq!(b.newest_tick(), 9);
    assert_eq!(b.state_at(5).and_then(|s| s.commands.get(0)), Some(CMD_RIGHT));
    assert_ne!(b.state_at(6).expect("tick 6").payload, predicted, "rollback changed nothing");

    for tick in 0..=9 {
        assert_eq!(
            a.state_at(tick).map(|s| &s.payload),
            b.state_at(tick).map(|s| &s.payload),
            "peers diverged at tick {tick}"
        );
    }
    assert_eq!(b.stats().rollbacks, 1);
}

#[test]
fn same_seed_produces_identical_histories() {
    const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;
    let script = [(3, CMD_RIGHT), (20, CMD_RIGHT + CMD_JUMP), (45, CMD_LEFT), (90, CMD_JUMP)];

    let mut a = build_engine(0, SEED);
    let mut b = build_engine(0, SEED);
    for engine in [&mut a, &mut b] {
        for &(tick, command) in &script {
            run_to(engine, tick);
            engine.set_local_command(command);
        }
        run_to(engine, 300);
    }

    let log_a = payload_log(&a);
    let log_b = payload_log(&b);
    assert_eq!(log_a.len(), log_b.len());
    for (i, (x, y)) in log_a.iter().zip(log_b.iter()).enumerate() {
        assert_eq!(x, y, "history diverged at entry {i}");
    }
}

#[test]
fn different_seeds_produce_different_histories() {
    let mut a = build_engine(0, 42);
    let mut b = build_engine(0, 99);
    run_to(&mut a, 60);
    run_to(&mut b, 60);

    let any_different = payload_log(&a).iter().zip(payload_log(&b).iter()).any(|(x, y)| x != y);
    assert!(any_different, "different seeds produced identical histories; seed is not being used");
}

#[test]
fn stepping_twice_gives_the_same_successor() {
    let mut engine = build_engine(0, 7);
    run_to(&mut engine, 30);
    let prev = engine.state_at(30).expect("tick 30").clone();

    let mut commands = CommandSlots::empty(2);
    commands.set(0, CMD_RIGHT + CMD_JUMP);
    commands.set(1, CMD_LEFT);

    let mut sequence = DeterministicSequence::new(7);
    let sim = BounceWorld::new();
    let first = step(&sim, &prev.payload, &commands, prev.sequence_cursor, &mut sequence, 0.1);
    let second = step(&sim, &prev.payload, &commands, prev.sequence_cursor, &mut sequence, 0.1);

    assert_eq!(first, second);
    assert_eq!(&prev, engine.state_at(30).expect("tick 30"), "step mutated its input");
}

#[test]
fn every_peer_commits_the_local_command_on_the_newest_tick() {
    let mut a = build_engine(0, 11);
    run_to(&mut a, 4);
    a.set_local_command(CMD_LEFT);
    let events = a.advance(a.clock.next_due(4)).expect("advance");

    assert!(events.contains(&EngineEvent::LocalCommandSent { tick: 4, value: CMD_LEFT }));
    assert_eq!(a.state_at(4).and_then(|s| s.commands.get(0)), Some(CMD_LEFT));
    let sent = a.channel_mut().messages();
    assert_eq!(sent.len(), 1);
    assert_eq!((sent[0].origin_peer, sent[0].value, sent[0].target_tick), (0, CMD_LEFT, 4));

    // Unchanged input is not sent again.
    run_to(&mut a, 10);
    assert_eq!(a.stats().messages_sent, 1);
}
