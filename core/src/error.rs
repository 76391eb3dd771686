use thiserror::Error;

use crate::types::{PeerIndex, Tick};

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed command message: expected {expected} bytes, got {actual}")]
    MalformedMessage { expected: usize, actual: usize },

    #[error("Unknown message kind {kind}")]
    UnknownMessageKind { kind: u16 },

    #[error("Peer index {index} out of range (session has {peers} peers)")]
    PeerOutOfRange { index: PeerIndex, peers: usize },

    #[error("Invalid tick: expected {expected}, got {actual}")]
    TickMismatch { expected: Tick, actual: Tick },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
