//! Deterministic random sequence shared by every peer.
//!
//! RULE: Nothing in the simulation may call any platform RNG.
//! All randomness flows through a SequenceCursor reading from the
//! session's DeterministicSequence, seeded once at session start with
//! the same value on every peer.
//!
//! Values are addressed by position, not drawn from a stream. Rollback
//! re-runs old ticks and re-requests old positions; a memoized position
//! always returns what it returned the first time, no matter how many
//! other positions were requested in between.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Position-addressable pseudorandom sequence.
///
/// The underlying generator only ever moves forward. Requesting a
/// position beyond the cache fills every intermediate position in order,
/// so position `p` holds the `p`-th output of the generator regardless
/// of request order.
pub struct DeterministicSequence {
    seed:   u64,
    inner:  Pcg64Mcg,
    values: Vec<u64>,
}

impl DeterministicSequence {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            inner: Pcg64Mcg::seed_from_u64(seed),
            values: Vec::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Raw value at `position`, computing and caching it on first request.
    pub fn value_at(&mut self, position: u64) -> u64 {
        let index = position as usize;
        while self.values.len() <= index {
            let next = self.inner.next_u64();
            self.values.push(next);
        }
        self.values[index]
    }

    /// Number of positions materialised so far.
    pub fn computed(&self) -> u64 {
        self.values.len() as u64
    }

    /// A cursor that consumes positions starting at `position`.
    pub fn cursor_at(&mut self, position: u64) -> SequenceCursor<'_> {
        SequenceCursor { sequence: self, position }
    }
}

/// Reads consecutive positions from a DeterministicSequence.
///
/// A simulation step gets a cursor starting at its predecessor's
/// baseline; the final `position()` becomes the new state's baseline.
pub struct SequenceCursor<'a> {
    sequence: &'a mut DeterministicSequence,
    position: u64,
}

impl SequenceCursor<'_> {
    /// Next unconsumed position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        let value = self.sequence.value_at(self.position);
        self.position += 1;
        value
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.next_u64() % n
    }

    /// Roll an integer in [min, max] inclusive.
    pub fn between(&mut self, min: i64, max: i64) -> i64 {
        assert!(min <= max, "min must be <= max");
        let span = (max - min) as u64 + 1;
        min + self.next_u64_below(span) as i64
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}
