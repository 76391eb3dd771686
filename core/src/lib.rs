//! Deterministic lockstep simulation with rollback.
//!
//! Peers run the same simulation from the same seed. Each predicts
//! forward from its own inputs and rewrites history when a remote input
//! for an older tick turns up, so every peer converges on identical
//! state without ever waiting on the network.

pub mod bounce_world;
pub mod channel;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod history;
pub mod interpolate;
pub mod mesh;
pub mod peer;
pub mod pending;
pub mod rng;
pub mod rollback;
pub mod simulation;
pub mod state;
pub mod step;
pub mod types;
