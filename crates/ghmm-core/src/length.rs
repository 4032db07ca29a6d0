//! Duration distributions governing how many observation symbols a state
//! consumes on a single visit.

use crate::dpdf::Dpdf;
use crate::error::{Error, Result};
use crate::log::LOG_ZERO;
use rand::Rng;

/// A state's duration model: how long a single visit to the state lasts,
/// measured in emitted symbols.
#[derive(Debug, Clone, PartialEq)]
pub enum LengthDist {
    /// Continuous-uniform duration over `[min_len, max_len)`, discretised at
    /// construction time onto the integer cells `[k, k+1)` the continuous
    /// range spans: a cell wholly inside the range gets mass `1/(max_len -
    /// min_len)`, and a cell the range's edge cuts through gets the
    /// fraction of its width the range actually covers.
    Uniform { min_len: i64, max_len: i64, table: Dpdf },
    /// Self-loop duration: every visit draws exactly one extra symbol with
    /// probability `p_self`, i.e. a geometric distribution realised as a
    /// transition weight rather than an explicit table. `min_len` is always
    /// `1`, and `max_len` is the sentinel `2` (see [`LengthDist::max_len`]).
    Geometric { p_self: f64 },
    /// An arbitrary discrete duration table.
    Discrete { table: Dpdf },
    /// A single fixed duration; used by position-specific (PSSM) emissions,
    /// whose length must match the motif width exactly.
    Fixed { length: i64 },
}

impl LengthDist {
    /// Builds a discretised uniform duration over the continuous range
    /// `[min_len, max_len)`. The range is binned onto the integer cells
    /// `floor(min_len)..ceil(max_len)`; a cell's mass is the fraction of its
    /// unit width that the continuous range actually covers, so a boundary
    /// cell the range only partly overlaps gets a partial mass rather than
    /// being rounded up to a full one. `Uniform(9.5, 25.5)`, for instance,
    /// discretises to `[9, 26)` with interior cells at `1/16` and half-mass
    /// `1/32` at the two boundary cells `9` and `25`.
    pub fn uniform(min_len: f64, max_len: f64) -> Result<Self> {
        if max_len <= min_len {
            return Err(Error::InvalidRange {
                min: min_len.floor() as i64,
                max: max_len.ceil() as i64,
            });
        }
        let span = max_len - min_len;
        let int_min = min_len.floor() as i64;
        let int_max = max_len.ceil() as i64;
        let freqs: Vec<f64> = (int_min..int_max)
            .map(|k| {
                let cell_lo = (k as f64).max(min_len);
                let cell_hi = ((k + 1) as f64).min(max_len);
                (cell_hi - cell_lo).max(0.0) / span
            })
            .collect();
        let table = Dpdf::from_linear(int_min, int_max, &freqs)?;
        Ok(LengthDist::Uniform { min_len: int_min, max_len: int_max, table })
    }

    /// Builds a geometric (self-loop) duration with the given mean visit
    /// length. `p_self = mean / (1 + mean)`, matching the closed form for a
    /// geometric distribution supported on `{1, 2, 3, ...}`.
    pub fn geometric(mean: f64) -> Self {
        let p_self = mean / (1.0 + mean);
        LengthDist::Geometric { p_self }
    }

    /// Builds a geometric duration directly from the self-loop probability,
    /// bypassing the mean-to-probability conversion.
    pub fn geometric_from_p(p_self: f64) -> Self {
        LengthDist::Geometric { p_self }
    }

    /// Builds an arbitrary discrete duration table over `[min, max)`.
    pub fn discrete(min_len: i64, max_len: i64, freqs: &[f64]) -> Result<Self> {
        let table = Dpdf::from_linear(min_len, max_len, freqs)?;
        Ok(LengthDist::Discrete { table })
    }

    /// Builds a fixed-length duration.
    pub fn fixed(length: i64) -> Self {
        LengthDist::Fixed { length }
    }

    /// Shortest admissible visit length.
    pub fn min_len(&self) -> i64 {
        match self {
            LengthDist::Uniform { min_len, .. } => *min_len,
            LengthDist::Geometric { .. } => 1,
            LengthDist::Discrete { table } => table.min(),
            LengthDist::Fixed { length } => *length,
        }
    }

    /// Exclusive upper bound on visit length.
    ///
    /// For [`LengthDist::Geometric`] this is the sentinel value `2`: the
    /// self-loop's actual per-symbol probability is folded into the
    /// transition matrix at compile time (see [`crate::model::ModelBuilder::compile`]),
    /// so the duration model itself only ever needs to answer for a visit
    /// of length exactly `1`.
    pub fn max_len(&self) -> i64 {
        match self {
            LengthDist::Uniform { max_len, .. } => *max_len,
            LengthDist::Geometric { .. } => 2,
            LengthDist::Discrete { table } => table.max(),
            LengthDist::Fixed { length } => *length + 1,
        }
    }

    /// `log P(visit lasts exactly `len` symbols)`.
    pub fn log_p(&self, len: i64) -> f64 {
        match self {
            LengthDist::Uniform { table, .. } => table.log_p(len),
            LengthDist::Geometric { p_self } => {
                if len == 1 {
                    p_self.ln()
                } else {
                    LOG_ZERO
                }
            }
            LengthDist::Discrete { table } => table.log_p(len),
            LengthDist::Fixed { length } => {
                if len == *length {
                    0.0
                } else {
                    LOG_ZERO
                }
            }
        }
    }

    /// Draws a visit length under this distribution.
    pub fn rand_len(&self, rng: &mut impl Rng) -> i64 {
        match self {
            LengthDist::Uniform { table, .. } => table.rand_z(rng),
            LengthDist::Geometric { .. } => 1,
            LengthDist::Discrete { table } => table.rand_z(rng),
            LengthDist::Fixed { length } => *length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn fixed_length_only_admits_exact_match() {
        let d = LengthDist::fixed(5);
        assert_eq!(d.min_len(), 5);
        assert_eq!(d.max_len(), 6);
        assert_eq!(d.log_p(5), 0.0);
        assert_eq!(d.log_p(4), LOG_ZERO);
        assert_eq!(d.log_p(6), LOG_ZERO);
    }

    #[test]
    fn geometric_mean_to_p_self() {
        // mean = 4 => p_self = 4/5 = 0.8, matching the self-loop scaling
        // scenario used for model compilation.
        let d = LengthDist::geometric(4.0);
        match d {
            LengthDist::Geometric { p_self } => assert!((p_self - 0.8).abs() < 1e-12),
            _ => panic!("expected Geometric"),
        }
        assert_eq!(d.min_len(), 1);
        assert_eq!(d.max_len(), 2);
        assert!((d.log_p(1).exp() - 0.8).abs() < 1e-12);
        assert_eq!(d.log_p(2), LOG_ZERO);
    }

    #[test]
    fn geometric_rand_len_always_one() {
        let d = LengthDist::geometric(10.0);
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        for _ in 0..50 {
            assert_eq!(d.rand_len(&mut rng), 1);
        }
    }

    #[test]
    fn uniform_discretisation_sums_to_one() {
        let d = LengthDist::uniform(1.0, 5.0).unwrap();
        let total: f64 = (1..5).map(|k| d.log_p(k).exp()).sum();
        assert!((total - 1.0).abs() < 1e-9);
        // integer-aligned continuous range => symmetric discretised mass
        assert!((d.log_p(1) - d.log_p(4)).abs() < 1e-12);
        assert!((d.log_p(2) - d.log_p(3)).abs() < 1e-12);
    }

    #[test]
    fn uniform_discretisation_with_fractional_bounds_splits_boundary_mass() {
        // Uniform(9.5, 25.5): discretises to [9, 26) with 1/16 interior mass
        // and half that (1/32) at the two boundary cells the range cuts
        // through.
        let d = LengthDist::uniform(9.5, 25.5).unwrap();
        assert_eq!(d.min_len(), 9);
        assert_eq!(d.max_len(), 26);

        let total: f64 = (9..26).map(|k| d.log_p(k).exp()).sum();
        assert!((total - 1.0).abs() < 1e-9);

        for k in 10..25 {
            assert!((d.log_p(k).exp() - 1.0 / 16.0).abs() < 1e-9, "k={k}");
        }
        assert!((d.log_p(9).exp() - 1.0 / 32.0).abs() < 1e-9);
        assert!((d.log_p(25).exp() - 1.0 / 32.0).abs() < 1e-9);
    }

    #[test]
    fn discrete_out_of_support_is_log_zero() {
        let d = LengthDist::discrete(2, 5, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(d.log_p(0), LOG_ZERO);
        assert_eq!(d.log_p(10), LOG_ZERO);
    }
}
