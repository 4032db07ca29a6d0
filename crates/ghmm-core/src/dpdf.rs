//! Discrete probability distribution function over a contiguous integer range.
//!
//! A [`Dpdf`] keeps two parallel tables, linear `p` and log `log_p`, over
//! `[min, max)`; every mutator keeps them coherent so callers never observe
//! `log_p[i] != log_clip(p[i])`.

use crate::error::{Error, Result};
use crate::log::{log_add, log_clip, LOG_ZERO};
use rand::Rng;

/// A distribution over `[min, max)`, stored as aligned linear and log tables.
#[derive(Debug, Clone, PartialEq)]
pub struct Dpdf {
    min: i64,
    max: i64,
    p: Vec<f64>,
    log_p: Vec<f64>,
}

impl Dpdf {
    /// An empty distribution over `[0, 0)`. Every query returns zero mass
    /// until one of the `set_*` constructors below is used.
    pub fn empty() -> Self {
        Dpdf {
            min: 0,
            max: 0,
            p: Vec::new(),
            log_p: Vec::new(),
        }
    }

    /// Builds a normalised distribution from linear frequencies over
    /// `[min, max)`. `freqs.len()` must equal `max - min`.
    pub fn from_linear(min: i64, max: i64, freqs: &[f64]) -> Result<Self> {
        let mut d = Dpdf::empty();
        d.set_distrib(min, max, freqs, true)?;
        Ok(d)
    }

    /// Builds a distribution from un-normalised linear frequencies, without
    /// rescaling them to sum to one.
    pub fn from_linear_unnormalised(min: i64, max: i64, freqs: &[f64]) -> Result<Self> {
        let mut d = Dpdf::empty();
        d.set_distrib(min, max, freqs, false)?;
        Ok(d)
    }

    /// Builds a distribution from log-space frequencies over `[min, max)`.
    pub fn from_log(min: i64, max: i64, log_freqs: &[f64]) -> Result<Self> {
        let mut d = Dpdf::empty();
        d.set_log_distrib(min, max, log_freqs)?;
        Ok(d)
    }

    /// A constant (uniform, un-normalised) value over `[min, max)`.
    pub fn constant(min: i64, max: i64, value: f64) -> Result<Self> {
        let mut d = Dpdf::empty();
        d.set_constant_distrib(min, max, value)?;
        Ok(d)
    }

    /// Sets the linear distribution over `[min, max)`, optionally
    /// normalising it so the entries sum to one.
    pub fn set_distrib(&mut self, min: i64, max: i64, freqs: &[f64], normalise: bool) -> Result<()> {
        if max <= min {
            return Err(Error::InvalidRange { min, max });
        }
        self.min = min;
        self.max = max;
        self.p = freqs.to_vec();
        if normalise {
            self.normalise()?;
        } else {
            self.update_log_from_linear();
        }
        Ok(())
    }

    /// Sets the log-space distribution over `[min, max)`, back-filling the
    /// linear table by exponentiating.
    pub fn set_log_distrib(&mut self, min: i64, max: i64, log_freqs: &[f64]) -> Result<()> {
        if max <= min {
            return Err(Error::InvalidRange { min, max });
        }
        self.min = min;
        self.max = max;
        self.log_p = log_freqs.to_vec();
        self.update_linear_from_log();
        Ok(())
    }

    /// Sets a constant value over every entry of `[min, max)`.
    pub fn set_constant_distrib(&mut self, min: i64, max: i64, value: f64) -> Result<()> {
        if max <= min {
            return Err(Error::InvalidRange { min, max });
        }
        self.min = min;
        self.max = max;
        self.p = vec![value; (max - min) as usize];
        self.update_log_from_linear();
        Ok(())
    }

    /// Rescales the linear table so it sums to one, then refreshes `log_p`.
    /// Errors if the table sums to zero or less (nothing to normalise).
    pub fn normalise(&mut self) -> Result<()> {
        let sum: f64 = self.p.iter().sum();
        if sum <= 0.0 {
            return Err(Error::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        for v in &mut self.p {
            *v /= sum;
        }
        self.update_log_from_linear();
        Ok(())
    }

    fn update_log_from_linear(&mut self) {
        self.log_p = self.p.iter().map(|&v| log_clip(v)).collect();
    }

    fn update_linear_from_log(&mut self) {
        self.p = self.log_p.iter().map(|&v| v.exp()).collect();
    }

    /// Lower (inclusive) bound of the support.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Upper (exclusive) bound of the support.
    pub fn max(&self) -> i64 {
        self.max
    }

    /// `p(x)`, `0.0` for `x` outside `[min, max)`.
    pub fn p(&self, x: i64) -> f64 {
        if x < self.min || x >= self.max {
            0.0
        } else {
            self.p[(x - self.min) as usize]
        }
    }

    /// `log_p(x)`, `LOG_ZERO` for `x` outside `[min, max)`.
    pub fn log_p(&self, x: i64) -> f64 {
        if x < self.min || x >= self.max {
            LOG_ZERO
        } else {
            self.log_p[(x - self.min) as usize]
        }
    }

    /// Overwrites a single entry's linear probability, keeping `log_p` in
    /// sync. Errors if `x` is outside `[min, max)`.
    pub fn set_p(&mut self, x: i64, value: f64) -> Result<()> {
        if x < self.min || x >= self.max {
            return Err(Error::IndexOutOfRange {
                index: x,
                min: self.min,
                max: self.max,
            });
        }
        let i = (x - self.min) as usize;
        self.p[i] = value;
        self.log_p[i] = log_clip(value);
        Ok(())
    }

    /// Draws an index by sampling `r ~ Uniform[0, 1)` and returning the
    /// first entry whose cumulative mass crosses `r`. Clamps to the last
    /// in-range index to tolerate floating-point underrun of the total.
    pub fn rand_z(&self, rng: &mut impl Rng) -> i64 {
        let mut r: f64 = rng.random();
        for (i, &p) in self.p.iter().enumerate() {
            r -= p;
            if r <= 0.0 {
                return self.min + i as i64;
            }
        }
        self.max - 1
    }

    /// `log(sum of all masses)`, via repeated [`log_add`] over `log_p`.
    /// Used by tests to check normalisation in log-space.
    pub fn log_total(&self) -> f64 {
        self.log_p.iter().fold(LOG_ZERO, |acc, &lp| log_add(acc, lp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn set_distrib_normalises() {
        let d = Dpdf::from_linear(0, 4, &[2.0, 2.0, 2.0, 2.0]).unwrap();
        for i in 0..4 {
            assert!((d.p(i) - 0.25).abs() < 1e-12);
        }
        assert_eq!(d.p(4), 0.0);
        assert_eq!(d.p(-1), 0.0);
    }

    #[test]
    fn log_p_matches_exp_round_trip() {
        let d = Dpdf::from_linear(0, 4, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        for i in 0..4 {
            assert!((d.log_p(i).exp() - d.p(i)).abs() < 1e-10);
        }
    }

    #[test]
    fn out_of_range_queries_are_zero() {
        let d = Dpdf::from_linear(2, 5, &[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(d.p(0), 0.0);
        assert_eq!(d.p(5), 0.0);
        assert_eq!(d.log_p(0), LOG_ZERO);
    }

    #[test]
    fn invalid_range_is_rejected() {
        assert!(matches!(
            Dpdf::from_linear(4, 4, &[]),
            Err(Error::InvalidRange { min: 4, max: 4 })
        ));
        assert!(matches!(
            Dpdf::from_linear(4, 2, &[1.0, 1.0]),
            Err(Error::InvalidRange { .. })
        ));
    }

    #[test]
    fn set_p_out_of_range_errors() {
        let mut d = Dpdf::from_linear(0, 2, &[0.5, 0.5]).unwrap();
        assert!(matches!(
            d.set_p(5, 1.0),
            Err(Error::IndexOutOfRange { index: 5, .. })
        ));
    }

    #[test]
    fn rand_z_is_deterministic_under_seed() {
        let d = Dpdf::from_linear(0, 2, &[0.9, 0.1]).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let draws: Vec<i64> = (0..20).map(|_| d.rand_z(&mut rng)).collect();

        let mut rng2 = rand::rngs::StdRng::seed_from_u64(42);
        let draws2: Vec<i64> = (0..20).map(|_| d.rand_z(&mut rng2)).collect();
        assert_eq!(draws, draws2);
    }

    #[test]
    fn rand_z_clamps_to_last_index_on_underrun() {
        // A table that doesn't quite sum to 1 due to float error still
        // must never return an out-of-range index.
        let mut d = Dpdf::empty();
        d.set_distrib(0, 3, &[0.333, 0.333, 0.333], false).unwrap();
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let z = d.rand_z(&mut rng);
            assert!(z >= 0 && z < 3);
        }
    }
}
