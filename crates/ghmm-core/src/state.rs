//! A single model state: its duration model, its emission model, and the
//! fused delta/alpha recurrence the parse engine drives per lattice cell.

use crate::emission::{Direction, EmissionDist};
use crate::error::Result;
use crate::length::LengthDist;
use crate::log::{log_add, LOG_ZERO};
use rand::Rng;

/// A model state: composes a duration model with an emission model. Unlike
/// the source's `State<Distrib, Emitter>` template (which dispatched both
/// through virtual calls), duration and emission are each a sum type here,
/// so the hot recurrence loop below dispatches through a `match` instead of
/// a vtable.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub name: String,
    pub length: LengthDist,
    pub emission: EmissionDist,
}

impl State {
    /// Builds a state, checking that a position-specific emission is
    /// paired with a fixed length of matching width.
    pub fn new(name: impl Into<String>, length: LengthDist, emission: EmissionDist) -> Result<Self> {
        emission.check_compatible(length.min_len(), length.max_len())?;
        Ok(State { name: name.into(), length, emission })
    }

    /// Shortcut for a fixed-length, position-specific motif state: builds
    /// the matching [`LengthDist::Fixed`] from `pssm.len()` itself, so
    /// callers never have to keep a separate length argument in sync with
    /// the motif width.
    pub fn motif(name: impl Into<String>, pssm: Vec<crate::dpdf::Dpdf>) -> Self {
        let length = LengthDist::fixed(pssm.len() as i64);
        let emission = EmissionDist::position_specific(pssm);
        State::new(name, length, emission)
            .expect("a Fixed length built from the motif's own width always matches it")
    }

    /// Shortest admissible visit length.
    pub fn min_len(&self) -> i64 {
        self.length.min_len()
    }

    /// Exclusive upper bound on visit length.
    pub fn max_len(&self) -> i64 {
        self.length.max_len()
    }

    /// Evaluates the fused delta (Viterbi) / alpha (Forward) recurrence for
    /// this state at lattice position `pos`.
    ///
    /// `preds` lists predecessor state indices in the model's canonical
    /// order; `log_trans[i]` is `log P(preds[i] -> self)`. `delta_prev` and
    /// `alpha_prev` read previously computed lattice cells
    /// `(pred_state, earlier_pos)`.
    ///
    /// Predecessors are scanned from last to first, and a Viterbi update
    /// uses a non-strict `>=` comparison, so among transitions tied for the
    /// best path score the one listed *earliest* in `preds` wins — it is
    /// evaluated last in the loop and `>=` lets it overwrite the running
    /// best. This matches the reference engine's traversal order and must
    /// not be changed without re-deriving every tie-sensitive test.
    pub fn eval_fused(
        &self,
        seq: &[i64],
        pos: i64,
        preds: &[usize],
        log_trans: &[f64],
        delta_prev: impl Fn(usize, i64) -> f64,
        alpha_prev: impl Fn(usize, i64) -> f64,
    ) -> FusedResult {
        let mut best_delta = LOG_ZERO;
        let mut best_pred = None;
        let mut best_len = 0;
        let mut alpha = LOG_ZERO;

        let min_len = self.min_len();
        let max_len = self.max_len();
        if min_len > pos {
            return FusedResult { delta: best_delta, best_pred, best_len, alpha };
        }

        // A single generator walks backward from `pos`, advancing by exactly
        // one symbol per duration step; this is the only generator built for
        // this (state, position) call, matching the cost model's O(D) bound
        // rather than replaying the walk from scratch for every candidate
        // duration.
        let mut gen = self.emission.generator(seq, pos - 1, Direction::Backward);
        let mut emit = None;
        for _ in 0..min_len {
            emit = gen.advance();
        }

        for len in min_len..max_len {
            if len > pos {
                break;
            }
            if len == 0 {
                continue;
            }
            if len > min_len {
                emit = gen.advance();
            }
            let emit_lp = match emit {
                Some((_, lp)) if lp != LOG_ZERO => lp,
                Some(_) => continue,
                // Generator genuinely exhausted (sequence boundary or a
                // zero-probability symbol): no longer duration can succeed
                // either, so stop scanning.
                None => break,
            };
            let len_lp = self.length.log_p(len);
            if len_lp == LOG_ZERO {
                continue;
            }
            let seg_lp = emit_lp + len_lp;

            let prev_pos = pos - len;
            for i in (0..preds.len()).rev() {
                let pred_idx = preds[i];
                let trans_lp = log_trans[i];
                if trans_lp == LOG_ZERO {
                    continue;
                }

                let d_prev = delta_prev(pred_idx, prev_pos);
                if d_prev != LOG_ZERO {
                    let dp = d_prev + trans_lp + seg_lp;
                    if dp >= best_delta {
                        best_delta = dp;
                        best_pred = Some(pred_idx);
                        best_len = len;
                    }
                }

                let a_prev = alpha_prev(pred_idx, prev_pos);
                if a_prev != LOG_ZERO {
                    alpha = log_add(alpha, a_prev + trans_lp + seg_lp);
                }
            }
        }

        FusedResult {
            delta: best_delta,
            best_pred,
            best_len,
            alpha,
        }
    }

    /// Evaluates the backward recurrence for this state at position `pos`:
    /// `beta[pos] = sum over succ, len of trans * emission(succ, len
    /// starting at pos) * beta_next[succ, pos + len]`.
    ///
    /// Reserved for a future bidirectional (posterior-decoding) mode; the
    /// parse engine never calls this today, so it is exercised only by its
    /// own unit tests.
    pub fn eval_beta(
        seq: &[i64],
        pos: i64,
        succs: &[(usize, &State)],
        log_trans: &[f64],
        beta_next: impl Fn(usize, i64) -> f64,
    ) -> f64 {
        let mut beta = LOG_ZERO;
        for (i, (succ_idx, succ_state)) in succs.iter().enumerate() {
            let trans_lp = log_trans[i];
            if trans_lp == LOG_ZERO {
                continue;
            }
            for len in succ_state.min_len()..succ_state.max_len() {
                let next_pos = pos + len;
                let mut gen = succ_state.emission.generator(seq, pos, Direction::Forward);
                let mut emit_lp = None;
                for _ in 0..len {
                    emit_lp = gen.advance();
                }
                let emit_lp = match emit_lp {
                    Some((_, lp)) if lp != LOG_ZERO => lp,
                    _ => continue,
                };
                let len_lp = succ_state.length.log_p(len);
                if len_lp == LOG_ZERO {
                    continue;
                }
                let b_next = beta_next(*succ_idx, next_pos);
                if b_next == LOG_ZERO {
                    continue;
                }
                beta = log_add(beta, trans_lp + emit_lp + len_lp + b_next);
            }
        }
        beta
    }

    /// Draws a `(visit length, emitted symbols)` pair from this state's
    /// duration and emission models.
    pub fn generate(&self, rng: &mut impl Rng) -> (i64, Vec<i64>) {
        let len = self.length.rand_len(rng);
        let segment = self.emission.rand_segment(len as usize, rng);
        (len, segment)
    }
}

/// Result of [`State::eval_fused`]: the best Viterbi score into this lattice
/// cell plus the predecessor/duration that achieved it, alongside the
/// Forward total mass for the same cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusedResult {
    pub delta: f64,
    pub best_pred: Option<usize>,
    pub best_len: i64,
    pub alpha: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpdf::Dpdf;

    fn biased_coin_state(name: &str, heads_p: f64) -> State {
        let table = Dpdf::from_linear(0, 2, &[1.0 - heads_p, heads_p]).unwrap();
        State::new(name, LengthDist::fixed(1), EmissionDist::stateless(table)).unwrap()
    }

    #[test]
    fn motif_shortcut_derives_fixed_length_from_pssm_width() {
        let pssm: Vec<Dpdf> = (0..4)
            .map(|_| Dpdf::from_linear(0, 4, &[1.0, 1.0, 1.0, 1.0]).unwrap())
            .collect();
        let state = State::motif("motif", pssm);
        assert_eq!(state.min_len(), 4);
        assert_eq!(state.max_len(), 5);
    }

    #[test]
    fn position_specific_rejects_non_matching_length() {
        let pssm: Vec<Dpdf> = (0..3)
            .map(|_| Dpdf::from_linear(0, 4, &[1.0, 1.0, 1.0, 1.0]).unwrap())
            .collect();
        let err = State::new("motif", LengthDist::fixed(5), EmissionDist::position_specific(pssm));
        assert!(err.is_err());
    }

    #[test]
    fn eval_fused_single_predecessor_accumulates_score() {
        let state = biased_coin_state("fair", 0.5);
        let seq = [0i64, 1, 0, 1];
        // single predecessor (BEGIN, idx 0) with certain transition
        let delta_table = [0.0_f64, LOG_ZERO, LOG_ZERO, LOG_ZERO, LOG_ZERO];
        let alpha_table = delta_table;
        let result = state.eval_fused(
            &seq,
            1,
            &[0],
            &[0.0],
            |_pred, pos| delta_table[pos as usize],
            |_pred, pos| alpha_table[pos as usize],
        );
        assert_eq!(result.best_pred, Some(0));
        assert_eq!(result.best_len, 1);
        assert!((result.delta - 0.5_f64.ln()).abs() < 1e-12);
        assert!((result.alpha - result.delta).abs() < 1e-12);
    }

    #[test]
    fn viterbi_tie_break_prefers_last_pred() {
        // "last pred" means the predecessor listed earliest in `preds`:
        // the eval loop scans from `preds.len() - 1` down to `0`, and a
        // non-strict `>=` update means whichever candidate is scored last
        // (index 0) wins a tie.
        let state = biased_coin_state("fair", 0.5);
        let seq = [0i64];
        // two predecessors with identical incoming delta and transition
        // weight: the earliest-listed one (index 0 in `preds`) must win.
        let preds = [7usize, 3usize];
        let log_trans = [0.0_f64, 0.0_f64];
        let result = state.eval_fused(
            &seq,
            1,
            &preds,
            &log_trans,
            |_pred, _pos| 0.0,
            |_pred, _pos| LOG_ZERO,
        );
        assert_eq!(result.best_pred, Some(7));
    }

    #[test]
    fn eval_fused_skips_predecessors_with_log_zero_transition() {
        let state = biased_coin_state("fair", 0.5);
        let seq = [0i64];
        let preds = [1usize, 2usize];
        let log_trans = [LOG_ZERO, 0.0];
        let result = state.eval_fused(
            &seq,
            1,
            &preds,
            &log_trans,
            |_pred, _pos| 0.0,
            |_pred, _pos| LOG_ZERO,
        );
        assert_eq!(result.best_pred, Some(2));
    }

    #[test]
    fn generate_fixed_length_state_produces_one_symbol() {
        use rand::SeedableRng;
        let state = biased_coin_state("fair", 0.9);
        let mut rng = rand::rngs::StdRng::seed_from_u64(0);
        let (len, seg) = state.generate(&mut rng);
        assert_eq!(len, 1);
        assert_eq!(seg.len(), 1);
    }
}
