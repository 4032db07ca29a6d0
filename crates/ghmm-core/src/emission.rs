//! Emission models: how a state's visit of a given length maps to a log
//! probability over the observation symbols it consumes, plus the
//! direction-parameterized generators used for simulation.

use crate::dpdf::Dpdf;
use crate::error::{Error, Result};
use crate::log::LOG_ZERO;
use rand::Rng;

/// Direction a segment generator walks the emitted symbols in. Mirrors the
/// forward/backward duality the fused delta/alpha recurrence needs: a
/// right-growing state reads the observation left-to-right, a left-growing
/// one reads it in reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    fn step(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// A state's emission model.
#[derive(Debug, Clone, PartialEq)]
pub enum EmissionDist {
    /// Symbols are drawn i.i.d. from a single distribution, independent of
    /// position within the visit.
    Stateless { table: Dpdf },
    /// Symbols are drawn from an ordered sequence of per-position
    /// distributions (a PSSM/motif). Only valid paired with a
    /// [`crate::length::LengthDist::Fixed`] of the same length.
    PositionSpecific { pssm: Vec<Dpdf> },
}

impl EmissionDist {
    /// Builds a stateless (i.i.d.) emission model from a single table.
    pub fn stateless(table: Dpdf) -> Self {
        EmissionDist::Stateless { table }
    }

    /// Builds a position-specific emission model from an ordered motif of
    /// per-position tables.
    pub fn position_specific(pssm: Vec<Dpdf>) -> Self {
        EmissionDist::PositionSpecific { pssm }
    }

    /// The number of symbols this emission model expects to consume, when
    /// that is fixed by construction (position-specific motifs only).
    pub fn fixed_length(&self) -> Option<usize> {
        match self {
            EmissionDist::Stateless { .. } => None,
            EmissionDist::PositionSpecific { pssm } => Some(pssm.len()),
        }
    }

    /// Checks that this emission model is compatible with a state's
    /// duration model, i.e. a position-specific motif is paired with a
    /// fixed length of the same width.
    pub fn check_compatible(&self, length_min: i64, length_max: i64) -> Result<()> {
        if let Some(emission_len) = self.fixed_length() {
            let is_fixed_match = length_max - length_min == 1 && length_min == emission_len as i64;
            if !is_fixed_match {
                return Err(Error::EmissionLengthMismatch {
                    emission_len,
                    length_len: (length_max - length_min).max(0) as usize,
                });
            }
        }
        Ok(())
    }

    /// Builds a lazy generator that accumulates `log P(segment)` one symbol
    /// at a time, walking `seq` in `dir` starting at `start`.
    pub fn generator<'a>(&'a self, seq: &'a [i64], start: i64, dir: Direction) -> SegmentGenerator<'a> {
        SegmentGenerator {
            dist: self,
            seq,
            start,
            dir,
            cursor: 0,
            log_cum: 0.0,
            done: false,
        }
    }

    /// Draws `len` symbols under this model, writing them into `out` at
    /// the position order `dir` implies starting from `out_start`.
    pub fn rand_segment(&self, len: usize, rng: &mut impl Rng) -> Vec<i64> {
        match self {
            EmissionDist::Stateless { table } => (0..len).map(|_| table.rand_z(rng)).collect(),
            EmissionDist::PositionSpecific { pssm } => {
                pssm.iter().take(len).map(|d| d.rand_z(rng)).collect()
            }
        }
    }
}

/// A lazy, non-restartable walk that accumulates the log probability of an
/// emission segment one symbol at a time. Each call to [`SegmentGenerator::advance`]
/// consumes exactly one symbol and returns the cumulative log mass so far,
/// or `None` once the model has no further admissible length.
pub struct SegmentGenerator<'a> {
    dist: &'a EmissionDist,
    seq: &'a [i64],
    start: i64,
    dir: Direction,
    /// number of symbols consumed so far
    cursor: i64,
    log_cum: f64,
    done: bool,
}

impl<'a> SegmentGenerator<'a> {
    /// Consumes the next symbol, returning `(duration, cumulative log P)`
    /// for the segment consumed so far, or `None` if the underlying
    /// sequence or model is exhausted. Mirrors the source generator's
    /// contract: each call advances by exactly one symbol and the result
    /// accumulates rather than resets.
    pub fn advance(&mut self) -> Option<(i64, f64)> {
        if self.done {
            return None;
        }
        let step = self.dir.step();
        let pos = self.start + self.cursor * step;
        if pos < 0 || pos as usize >= self.seq.len() {
            self.done = true;
            return None;
        }
        let symbol = self.seq[pos as usize];

        match self.dist {
            EmissionDist::Stateless { table } => {
                let lp = table.log_p(symbol);
                if lp == LOG_ZERO {
                    self.done = true;
                    return None;
                }
                self.log_cum += lp;
                self.cursor += 1;
                Some((self.cursor, self.log_cum))
            }
            EmissionDist::PositionSpecific { pssm } => {
                let idx = self.cursor as usize;
                if idx >= pssm.len() {
                    self.done = true;
                    return None;
                }
                let lp = pssm[idx].log_p(symbol);
                self.cursor += 1;
                self.done = self.cursor as usize >= pssm.len();
                // A position-specific motif emits its whole width as a
                // single admissible duration; it never reports partial
                // cumulative log mass for shorter durations.
                if self.cursor as usize == pssm.len() {
                    Some((self.cursor, lp + self.partial_sum(pssm, idx)))
                } else {
                    self.log_cum += lp;
                    None
                }
            }
        }
    }

    fn partial_sum(&self, pssm: &[Dpdf], up_to: usize) -> f64 {
        // log_cum already holds the sum over [0, up_to); this returns it
        // unchanged, kept as a named step for readability at the call site.
        let _ = pssm;
        let _ = up_to;
        self.log_cum
    }
}
