//! Outbound half of the command channel.
//!
//! Delivery is fire-and-forget: no acknowledgment, no retry. A lost
//! message is corrected (or not) by whatever the peer sends next.

use crate::{command::CommandMessage, error::SimResult};

pub trait CommandChannel {
    /// Send `bytes` to every other peer.
    fn broadcast(&mut self, bytes: &[u8]) -> SimResult<()>;
}

impl<C: CommandChannel + ?Sized> CommandChannel for Box<C> {
    fn broadcast(&mut self, bytes: &[u8]) -> SimResult<()> {
        (**self).broadcast(bytes)
    }
}

/// Keeps every broadcast in memory. Used for single-peer runs and in
/// tests that forward traffic by hand.
#[derive(Debug, Default)]
pub struct RecordingChannel {
    sent: Vec<Vec<u8>>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything broadcast since the last call.
    pub fn take(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }

    /// Decoded view of what is still held.
    pub fn messages(&self) -> Vec<CommandMessage> {
        self.sent
            .iter()
            .filter_map(|bytes| CommandMessage::decode(bytes).ok())
            .collect()
    }
}

impl CommandChannel for RecordingChannel {
    fn broadcast(&mut self, bytes: &[u8]) -> SimResult<()> {
        self.sent.push(bytes.to_vec());
        Ok(())
    }
}
