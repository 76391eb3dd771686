//! In-memory mesh connecting several engines in one process.
//!
//! Stands in for the real peer-to-peer transport in the runner and in
//! tests: every broadcast is fanned out to the other peers after a
//! seeded latency + jitter, and may be dropped or duplicated. Given the
//! same MeshConfig and the same sends, deliveries are identical.

use crossbeam_channel::{Receiver, Sender};
use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use crate::{
    channel::CommandChannel,
    config::MeshConfig,
    error::SimResult,
    pending::CommandInbox,
    types::{Millis, PeerId},
};

struct Outbound {
    from:  usize,
    bytes: Vec<u8>,
}

struct InFlight {
    deliver_at: Millis,
    from:       usize,
    to:         usize,
    bytes:      Vec<u8>,
}

struct MeshPeer {
    uuid:      PeerId,
    inbox:     Option<CommandInbox>,
    connected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub sent:       u64,
    pub delivered:  u64,
    pub lost:       u64,
    pub duplicated: u64,
}

/// Outbound end owned by one engine.
pub struct MeshLink {
    from: usize,
    tx:   Sender<Outbound>,
}

impl CommandChannel for MeshLink {
    fn broadcast(&mut self, bytes: &[u8]) -> SimResult<()> {
        self.tx
            .send(Outbound { from: self.from, bytes: bytes.to_vec() })
            .map_err(|e| anyhow::anyhow!("mesh is gone: {e}"))?;
        Ok(())
    }
}

pub struct LocalMesh {
    config:    MeshConfig,
    rng:       Pcg64Mcg,
    peers:     Vec<MeshPeer>,
    tx:        Sender<Outbound>,
    rx:        Receiver<Outbound>,
    in_flight: Vec<InFlight>,
    stats:     MeshStats,
}

impl LocalMesh {
    pub fn new(config: MeshConfig) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            rng: Pcg64Mcg::seed_from_u64(config.seed),
            config,
            peers: Vec::new(),
            tx,
            rx,
            in_flight: Vec::new(),
            stats: MeshStats::default(),
        }
    }

    /// Register a peer and return its outbound link.
    pub fn link(&mut self, uuid: &str) -> MeshLink {
        let from = self.peers.len();
        self.peers.push(MeshPeer { uuid: uuid.to_string(), inbox: None, connected: true });
        MeshLink { from, tx: self.tx.clone() }
    }

    /// Point deliveries for `uuid` at an engine's inbox.
    pub fn attach(&mut self, uuid: &str, inbox: CommandInbox) {
        if let Some(peer) = self.peers.iter_mut().find(|p| p.uuid == uuid) {
            peer.inbox = Some(inbox);
        } else {
            log::warn!("attach for unknown mesh peer {uuid}");
        }
    }

    /// Cut a peer off in both directions. Messages it already sent are
    /// still delivered. Returns false if unknown or already gone.
    pub fn disconnect(&mut self, uuid: &str) -> bool {
        match self.peers.iter_mut().find(|p| p.uuid == uuid) {
            Some(peer) if peer.connected => {
                peer.connected = false;
                true
            }
            _ => false,
        }
    }

    pub fn stats(&self) -> &MeshStats {
        &self.stats
    }

    /// Messages scheduled but not delivered yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Schedule fresh broadcasts and deliver everything due by `now`.
    pub fn pump(&mut self, now: Millis) {
        while let Ok(out) = self.rx.try_recv() {
            self.schedule(out, now);
        }

        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.in_flight.drain(..).partition(|m| m.deliver_at <= now);
        self.in_flight = rest;
        due.sort_by(|a, b| a.deliver_at.total_cmp(&b.deliver_at));

        for msg in due {
            let from_uuid = self.peers[msg.from].uuid.clone();
            let to = &self.peers[msg.to];
            if !to.connected {
                continue;
            }
            if let Some(inbox) = &to.inbox {
                if inbox.on_message(&from_uuid, &msg.bytes).is_ok() {
                    self.stats.delivered += 1;
                }
            }
        }
    }

    fn schedule(&mut self, out: Outbound, now: Millis) {
        if !self.peers[out.from].connected {
            return;
        }
        self.stats.sent += 1;
        for to in 0..self.peers.len() {
            if to == out.from || !self.peers[to].connected {
                continue;
            }
            if self.roll() < self.config.loss {
                self.stats.lost += 1;
                continue;
            }
            let copies = if self.roll() < self.config.duplicate { 2 } else { 1 };
            if copies == 2 {
                self.stats.duplicated += 1;
            }
            for _ in 0..copies {
                let delay = self.config.latency_ms + self.config.jitter_ms * self.roll();
                self.in_flight.push(InFlight {
                    deliver_at: now + delay,
                    from: out.from,
                    to,
                    bytes: out.bytes.clone(),
                });
            }
        }
    }

    /// Uniform float in [0.0, 1.0).
    fn roll(&mut self) -> f64 {
        let bits = self.rng.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}
