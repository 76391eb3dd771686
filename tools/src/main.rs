//! sim-runner: headless multi-peer lockstep session.
//!
//! Runs N engines over an in-memory mesh with scripted inputs, then
//! checks that every peer ended up with identical history.
//!
//! Usage:
//!   sim-runner --seed 42 --peers 3 --seconds 30 --latency-ms 80 --jitter-ms 60
//!   sim-runner --config session.json --stall-ms 700 --json

use anyhow::Result;
use lockstep_core::{
    bounce_world::{BounceWorld, CMD_IDLE, CMD_JUMP, CMD_LEFT, CMD_RIGHT},
    config::{MeshConfig, SessionConfig},
    engine::LockstepEngine,
    event::EngineEvent,
    mesh::{LocalMesh, MeshLink},
    peer::{PeerRecord, PeerRoster},
    rng::DeterministicSequence,
    types::{Millis, Tick},
};
use std::env;

type Engine = LockstepEngine<BounceWorld, MeshLink>;

const INPUTS: [u16; 6] = [
    CMD_IDLE,
    CMD_JUMP,
    CMD_RIGHT,
    CMD_RIGHT + CMD_JUMP,
    CMD_LEFT,
    CMD_LEFT + CMD_JUMP,
];

#[derive(serde::Serialize)]
struct EventLine<'a> {
    at_ms: Millis,
    peer:  usize,
    event: &'a EngineEvent,
}

struct Peer {
    record: PeerRecord,
    engine: Engine,
    script: DeterministicSequence,
    cursor: u64,
    active: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match find_arg(&args, "--config") {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(seed) = find_arg(&args, "--seed").and_then(|s| s.parse().ok()) {
        config.seed = seed;
    }
    let peers = parse_arg(&args, "--peers", 2usize).max(1);
    let seconds = parse_arg(&args, "--seconds", 20.0f64);
    let frame_ms = parse_arg(&args, "--frame-ms", 16.0f64).max(1.0);
    let stall_ms = parse_arg(&args, "--stall-ms", 0.0f64);
    let disconnect_at = parse_arg(&args, "--disconnect-at-ms", -1.0f64);
    let json = args.iter().any(|a| a == "--json");
    let mesh_config = MeshConfig {
        latency_ms: parse_arg(&args, "--latency-ms", 60.0),
        jitter_ms:  parse_arg(&args, "--jitter-ms", 40.0),
        loss:       parse_arg(&args, "--loss", 0.0),
        duplicate:  parse_arg(&args, "--duplicate", 0.05),
        seed:       config.seed ^ 0x5eed,
    };

    if !json {
        println!("lockstep sim-runner");
        println!("  seed:      {}", config.seed);
        println!("  peers:     {peers}");
        println!("  duration:  {seconds}s (frame {frame_ms}ms, tick {}ms)", config.tick_ms);
        println!("  mesh:      latency {}ms, jitter {}ms, loss {}, dup {}",
            mesh_config.latency_ms, mesh_config.jitter_ms, mesh_config.loss, mesh_config.duplicate);
        println!();
    }

    let mut mesh = LocalMesh::new(mesh_config.clone());
    let records: Vec<PeerRecord> = (0..peers).map(|i| PeerRecord::generate(format!("player{i}"))).collect();
    let mut session: Vec<Peer> = Vec::with_capacity(peers);
    for (i, record) in records.iter().enumerate() {
        let roster = PeerRoster::new(records.clone(), &record.uuid)?;
        let link = mesh.link(&record.uuid);
        let engine = LockstepEngine::new(config.clone(), roster, BounceWorld::new(), link)?;
        mesh.attach(engine.roster().my_uuid(), engine.inbox());
        session.push(Peer {
            record: record.clone(),
            engine,
            script: DeterministicSequence::new(config.seed.wrapping_add(i as u64 + 1)),
            cursor: 0,
            active: true,
        });
    }

    let duration = seconds * 1000.0;
    let stall_start = duration / 3.0;
    // Long enough for the slowest message to land and be drained.
    let settle = mesh_config.latency_ms + mesh_config.jitter_ms + 4.0 * config.tick_ms;
    let mut now = config.time_to_start_ms;
    let end = config.time_to_start_ms + duration + settle;

    while now <= end {
        mesh.pump(now);

        if disconnect_at >= 0.0 && now >= disconnect_at && peers > 1 && session[peers - 1].active {
            let gone = session[peers - 1].record.uuid.clone();
            log::info!("cutting {} off the mesh at {now}ms", session[peers - 1].record.username);
            mesh.disconnect(&gone);
            session[peers - 1].active = false;
            for (i, peer) in session.iter_mut().enumerate().take(peers - 1) {
                if let Some(event) = peer.engine.note_disconnected(&gone) {
                    emit(json, now, i, &[event])?;
                }
            }
        }

        let scripting = now < config.time_to_start_ms + duration;
        for (i, peer) in session.iter_mut().enumerate() {
            if !peer.active {
                continue;
            }
            if i == 1 && stall_ms > 0.0 && now >= stall_start && now < stall_start + stall_ms {
                continue;
            }
            if scripting {
                script_input(peer);
            }
            let events = peer.engine.update(now)?;
            emit(json, now, i, &events)?;
        }
        now += frame_ms;
    }

    let verdict = verify(&session);
    if !json {
        print_summary(&session, &mesh, &verdict);
    }
    match verdict {
        Verdict::Converged { .. } | Verdict::NothingToCompare => Ok(()),
        Verdict::Diverged { tick, .. } => anyhow::bail!("peers diverged at tick {tick}"),
    }
}

/// Change the held input every now and then, deterministically per peer.
fn script_input(peer: &mut Peer) {
    let mut rng = peer.script.cursor_at(peer.cursor);
    if rng.chance(0.05) {
        let input = INPUTS[rng.next_u64_below(INPUTS.len() as u64) as usize];
        peer.engine.simulation_mut().set_input(input);
    }
    peer.cursor = rng.position();
}

fn emit(json: bool, at_ms: Millis, peer: usize, events: &[EngineEvent]) -> Result<()> {
    if !json {
        return Ok(());
    }
    for event in events {
        println!("{}", serde_json::to_string(&EventLine { at_ms, peer, event })?);
    }
    Ok(())
}

enum Verdict {
    Converged { from: Tick, to: Tick },
    Diverged { tick: Tick, peer: usize },
    NothingToCompare,
}

/// Compare every tick all active peers still hold.
fn verify(session: &[Peer]) -> Verdict {
    let active: Vec<(usize, &Peer)> = session.iter().enumerate().filter(|(_, p)| p.active).collect();
    let Some(from) = active.iter().map(|(_, p)| p.engine.history().first_tick()).max() else {
        return Verdict::NothingToCompare;
    };
    let Some(to) = active.iter().map(|(_, p)| p.engine.newest_tick()).min() else {
        return Verdict::NothingToCompare;
    };
    if active.len() < 2 || from > to {
        return Verdict::NothingToCompare;
    }
    let (_, reference) = active[0];
    for tick in from..=to {
        let expected = reference.engine.state_at(tick).map(|s| &s.payload);
        for &(i, peer) in &active[1..] {
            if peer.engine.state_at(tick).map(|s| &s.payload) != expected {
                return Verdict::Diverged { tick, peer: i };
            }
        }
    }
    Verdict::Converged { from, to }
}

fn print_summary(session: &[Peer], mesh: &LocalMesh, verdict: &Verdict) {
    println!("=== RUN SUMMARY ===");
    for (i, peer) in session.iter().enumerate() {
        let stats = peer.engine.stats();
        println!(
            "  peer {i} {}: tick {} | sent {} recv {} | rollbacks {} ({} ticks) | gaps {} ({} ticks) | stale {} dup {}{}",
            peer.record.username,
            peer.engine.newest_tick(),
            stats.messages_sent,
            stats.messages_received,
            stats.rollbacks,
            stats.resimulated_ticks,
            stats.gaps,
            stats.synthesized_ticks,
            stats.stale_dropped,
            stats.duplicates,
            if peer.active { "" } else { " (disconnected)" },
        );
    }
    let m = mesh.stats();
    println!("  mesh: sent {} delivered {} lost {} duplicated {}", m.sent, m.delivered, m.lost, m.duplicated);

    println!();
    println!("=== SCOREBOARD (peer 0 view) ===");
    if let Some(first) = session.first() {
        for line in first.engine.simulation().scoreboard() {
            println!("  {line}");
        }
    }

    println!();
    match verdict {
        Verdict::Converged { from, to } => println!("  converged on ticks {from}..={to}"),
        Verdict::Diverged { tick, peer } => println!("  DIVERGED: peer {peer} differs at tick {tick}"),
        Verdict::NothingToCompare => println!("  (nothing to compare)"),
    }
}

fn find_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
