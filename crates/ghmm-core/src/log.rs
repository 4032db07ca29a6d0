//! Log-domain arithmetic shared by every probability table in the crate.
//!
//! `f64::NEG_INFINITY` stands in for the source's `LOG_ZERO` sentinel, and
//! `f64::INFINITY` for `LOG_INF`; both compare and propagate the way the
//! originals did (`log_add(LOG_ZERO, x) == x`, etc).

/// Log-probability of an impossible event.
pub const LOG_ZERO: f64 = f64::NEG_INFINITY;

/// Log-probability ceiling; never produced by [`log_clip`] for finite input
/// above 1.0, but kept distinct from `LOG_ZERO` for the clamp below.
pub const LOG_INF: f64 = f64::INFINITY;

/// Numerically stable `log(e^x + e^y)`.
///
/// Returns `LOG_ZERO` iff both `x` and `y` are `LOG_ZERO`.
pub fn log_add(x: f64, y: f64) -> f64 {
    if x == LOG_ZERO && y == LOG_ZERO {
        return LOG_ZERO;
    }
    if x < y {
        y + (x - y).exp().ln_1p()
    } else {
        x + (y - x).exp().ln_1p()
    }
}

/// `clamp(log(x), LOG_ZERO, LOG_INF)`. `x <= 0.0` clips to `LOG_ZERO`.
pub fn log_clip(x: f64) -> f64 {
    if x <= 0.0 {
        return LOG_ZERO;
    }
    x.ln().clamp(LOG_ZERO, LOG_INF)
}
