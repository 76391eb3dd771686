//! Session roster — who is playing, who we are, who dropped.

use serde::{Deserialize, Serialize};

use crate::{
    error::{SimError, SimResult},
    types::{PeerId, PeerIndex},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub uuid:     PeerId,
    pub username: String,
}

impl PeerRecord {
    pub fn new(uuid: impl Into<PeerId>, username: impl Into<String>) -> Self {
        Self { uuid: uuid.into(), username: username.into() }
    }

    /// A record with a fresh random uuid.
    pub fn generate(username: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), username)
    }
}

/// The ordered peer list. Index order is identical on every peer and is
/// the canonical order in which commands are applied.
#[derive(Debug, Clone)]
pub struct PeerRoster {
    peers:        Vec<PeerRecord>,
    my_index:     PeerIndex,
    disconnected: Vec<bool>,
}

impl PeerRoster {
    pub fn new(peers: Vec<PeerRecord>, my_uuid: &str) -> SimResult<Self> {
        let my_index = peers
            .iter()
            .position(|p| p.uuid == my_uuid)
            .ok_or_else(|| anyhow::anyhow!("local peer {my_uuid} is not in the roster"))?;
        if peers.len() > PeerIndex::MAX as usize {
            return Err(SimError::InvalidConfig {
                reason: format!("{} peers exceed the wire peer index range", peers.len()),
            });
        }
        let disconnected = vec![false; peers.len()];
        Ok(Self { peers, my_index: my_index as PeerIndex, disconnected })
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn my_index(&self) -> PeerIndex {
        self.my_index
    }

    pub fn my_uuid(&self) -> &str {
        &self.peers[self.my_index as usize].uuid
    }

    pub fn peers(&self) -> &[PeerRecord] {
        &self.peers
    }

    pub fn get(&self, index: PeerIndex) -> Option<&PeerRecord> {
        self.peers.get(index as usize)
    }

    pub fn index_of(&self, uuid: &str) -> Option<PeerIndex> {
        self.peers.iter().position(|p| p.uuid == uuid).map(|i| i as PeerIndex)
    }

    /// Flag a peer as disconnected. Returns its index the first time only.
    pub fn mark_disconnected(&mut self, uuid: &str) -> Option<PeerIndex> {
        let index = self.index_of(uuid)?;
        let flag = &mut self.disconnected[index as usize];
        if *flag {
            return None;
        }
        *flag = true;
        Some(index)
    }

    pub fn is_disconnected(&self, index: PeerIndex) -> bool {
        self.disconnected.get(index as usize).copied().unwrap_or(false)
    }

    /// Display label, e.g. "alice (disconnected)".
    pub fn label(&self, index: PeerIndex) -> String {
        match self.get(index) {
            Some(peer) if self.is_disconnected(index) => format!("{} (disconnected)", peer.username),
            Some(peer) => peer.username.clone(),
            None => format!("peer#{index}"),
        }
    }
}
