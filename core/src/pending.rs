//! Pending command buffer — remote inputs not yet reconciled into history.
//!
//! RULE: the transport side only ever enqueues. It holds a CommandInbox,
//! which decodes bytes and pushes them down a channel; history is touched
//! exclusively by `drain_into`, on the scheduler's thread.

use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::{
    command::{widen_tick, CommandMessage, MessageKind},
    error::{SimError, SimResult},
    history::History,
    types::Tick,
};

/// Receive side handed to the transport. Cheap to clone, `Send`.
#[derive(Clone)]
pub struct CommandInbox {
    tx: Sender<CommandMessage>,
}

impl CommandInbox {
    /// Transport callback: `bytes` arrived from peer `peer_id`.
    ///
    /// Malformed bytes are reported back to the caller and never reach
    /// the buffer.
    pub fn on_message(&self, peer_id: &str, bytes: &[u8]) -> SimResult<()> {
        let msg = CommandMessage::decode(bytes).inspect_err(|e| {
            log::warn!("dropping message from {peer_id}: {e}");
        })?;
        match msg.kind {
            MessageKind::Input => {
                log::trace!(
                    "message from {peer_id}: command {} for tick {}",
                    msg.value,
                    msg.target_tick
                );
                self.deliver(msg);
            }
        }
        Ok(())
    }

    /// Enqueue an already decoded message.
    pub fn deliver(&self, msg: CommandMessage) {
        // The buffer lives as long as the engine; a send after the engine
        // is gone has nobody to tell.
        let _ = self.tx.send(msg);
    }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Earliest non-newest tick whose commands changed.
    pub invalidated_from: Option<Tick>,
    pub applied:          u64,
    pub duplicates:       u64,
    pub stale:            u64,
    pub deferred:         u64,
    pub rejected:         u64,
}

impl DrainReport {
    pub fn is_quiet(&self) -> bool {
        self.applied == 0 && self.duplicates == 0 && self.stale == 0 && self.rejected == 0
    }
}

pub struct PendingCommands {
    buffer: Vec<CommandMessage>,
    tx:     Sender<CommandMessage>,
    rx:     Receiver<CommandMessage>,
}

impl Default for PendingCommands {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingCommands {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { buffer: Vec::new(), tx, rx }
    }

    pub fn inbox(&self) -> CommandInbox {
        CommandInbox { tx: self.tx.clone() }
    }

    /// Messages waiting in the buffer (not counting undelivered inbox items).
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn messages(&self) -> &[CommandMessage] {
        &self.buffer
    }

    /// Move what the inbox holds right now into the buffer.
    /// Items arriving while this runs wait for the next call.
    pub fn collect(&mut self) -> usize {
        let available = self.rx.len();
        let mut taken = 0;
        while taken < available {
            match self.rx.try_recv() {
                Ok(msg) => {
                    self.buffer.push(msg);
                    taken += 1;
                }
                Err(_) => break,
            }
        }
        taken
    }

    /// Reconcile buffered messages against the history window.
    ///
    /// - target before the window: dropped for good (stale)
    /// - target past the newest tick: kept for a later drain
    /// - otherwise: written into the target's slot; a change to any tick
    ///   but the newest marks it for rollback
    pub fn drain_into<P>(&mut self, history: &mut History<P>) -> DrainReport {
        let mut report = DrainReport::default();
        let first = history.first_tick();
        let newest = history.newest_tick();
        // A peer can run at most one window ahead of us.
        let horizon = history.cap() as u64;
        let mut kept = Vec::new();

        for msg in self.buffer.drain(..) {
            let target = widen_tick(msg.target_tick, newest, horizon);
            if target < first {
                log::trace!("stale command {} from peer {} for tick {target}", msg.value, msg.origin_peer);
                report.stale += 1;
                continue;
            }
            if target > newest {
                report.deferred += 1;
                kept.push(msg);
                continue;
            }
            let Some(state) = history.get_mut(target) else {
                continue;
            };
            if msg.origin_peer as usize >= state.commands.peers() {
                let err = SimError::PeerOutOfRange { index: msg.origin_peer, peers: state.commands.peers() };
                log::warn!("command ignored: {err}");
                report.rejected += 1;
                continue;
            }
            if state.commands.set(msg.origin_peer, msg.value) {
                report.applied += 1;
                if target < newest {
                    report.invalidated_from = Some(match report.invalidated_from {
                        Some(t) => t.min(target),
                        None => target,
                    });
                }
            } else {
                report.duplicates += 1;
            }
        }

        self.buffer = kept;
        report
    }
}
