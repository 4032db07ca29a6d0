//! The decoding engine: drives the fused delta/alpha recurrence over a
//! sliding window of lattice positions and reconstructs the Viterbi path
//! via a reference-counted traceback chain.

use crate::log::{log_add, LOG_ZERO};
use crate::model::Model;
use std::rc::Rc;

/// One segment of a reconstructed path: the emitting state visited and how
/// many symbols it consumed on that visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub state: usize,
    pub length: i64,
}

/// A node in the Viterbi traceback chain. Chains grow from the end of the
/// sequence backward (`prev` points at the segment before this one);
/// `Rc` sharing lets multiple in-flight lattice cells reference a common
/// prefix without copying it. Single-threaded by design — the parse engine
/// never crosses a thread boundary, so `Rc` rather than `Arc` is the right
/// call here, matching the source's unsynchronised reference counting.
#[derive(Debug)]
struct TracebackNode {
    segment: Segment,
    prev: Option<Rc<TracebackNode>>,
}

/// Extends a traceback chain by one visit of `state` lasting `len` symbols.
///
/// Three cases, matching the reference engine's `linkState`:
/// - `prev` is `None`: this is the first segment of the path, so start a
///   fresh root node.
/// - `prev`'s last segment is the same state: merge into it rather than
///   chaining a new node, so a state visited across several consecutive
///   single-symbol steps (e.g. a geometric self-loop) collapses into one
///   segment of the correct total length.
/// - otherwise: link a new node pointing back at `prev`.
fn link(prev: Option<Rc<TracebackNode>>, state: usize, len: i64) -> Rc<TracebackNode> {
    match prev {
        None => Rc::new(TracebackNode { segment: Segment { state, length: len }, prev: None }),
        Some(node) if node.segment.state == state => Rc::new(TracebackNode {
            segment: Segment { state, length: node.segment.length + len },
            prev: node.prev.clone(),
        }),
        Some(node) => Rc::new(TracebackNode { segment: Segment { state, length: len }, prev: Some(node) }),
    }
}

fn collect_path(node: Option<Rc<TracebackNode>>) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cur = node;
    while let Some(n) = cur {
        segments.push(n.segment);
        cur = n.prev.clone();
    }
    segments.reverse();
    segments
}

/// Outcome of [`Parse::decode`]: the most likely state path and its log
/// probability, alongside the total forward log probability of the
/// observation sequence under the model (summed over every path).
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeResult {
    pub viterbi_log_prob: f64,
    pub forward_log_prob: f64,
    pub path: Vec<Segment>,
}

/// The DP lattice for one observation sequence against one compiled model.
///
/// `alpha`/`delta`/`trace` are addressed `state * window + (pos % window)`:
/// since no recurrence ever looks back further than the longest admissible
/// state visit, only `window = max_duration + 1` columns need to be live at
/// once, and each state's row recycles its slots as `pos` advances. This
/// mirrors the source engine's sliding-window-addressed lattices rather
/// than materialising a dense `(L+1) x N` table.
pub struct Parse<'m> {
    model: &'m Model,
    seq: Vec<i64>,
    window: usize,
    alpha: Vec<f64>,
    delta: Vec<f64>,
    trace: Vec<Option<Rc<TracebackNode>>>,
}

impl<'m> Parse<'m> {
    /// Builds a fresh lattice for `seq` against `model`.
    pub fn new(model: &'m Model, seq: Vec<i64>) -> Self {
        let n = model.n_states();
        let back = (1..n.saturating_sub(1))
            .filter_map(|s| model.state(s).map(|st| st.max_len() - 1))
            .max()
            .unwrap_or(0)
            .max(0);
        let window = back as usize + 1;

        Parse {
            model,
            seq,
            window,
            alpha: vec![LOG_ZERO; n * window],
            delta: vec![LOG_ZERO; n * window],
            trace: vec![None; n * window],
        }
    }

    fn idx(&self, state: usize, pos: i64) -> usize {
        let slot = pos.rem_euclid(self.window as i64) as usize;
        state * self.window + slot
    }

    fn delta_at(&self, state: usize, pos: i64) -> f64 {
        if pos < 0 {
            return LOG_ZERO;
        }
        self.delta[self.idx(state, pos)]
    }

    fn alpha_at(&self, state: usize, pos: i64) -> f64 {
        if pos < 0 {
            return LOG_ZERO;
        }
        self.alpha[self.idx(state, pos)]
    }

    fn trace_at(&self, state: usize, pos: i64) -> Option<Rc<TracebackNode>> {
        if pos < 0 {
            return None;
        }
        self.trace[self.idx(state, pos)].clone()
    }

    /// Forward (total) log-probability for `state` at `rel_pos` symbols back
    /// from the end of the decoded sequence; `rel_pos == 0` is the final
    /// position, matching the source's "offset" addressing convention
    /// (0 = current, negative = earlier). Only positions within the last
    /// `window` columns are retained; anything further back than that
    /// returns `LOG_ZERO` rather than stale data, since [`Parse::decode`]
    /// only keeps the sliding window alive.
    pub fn alpha(&self, state: usize, rel_pos: i64) -> f64 {
        let l = self.seq.len() as i64;
        let pos = l + rel_pos;
        if pos < 0 || l - pos >= self.window as i64 {
            return LOG_ZERO;
        }
        self.alpha_at(state, pos)
    }

    /// Viterbi log-probability for `state` at `rel_pos` symbols back from
    /// the end of the decoded sequence. See [`Parse::alpha`] for the
    /// addressing convention and window caveat.
    pub fn delta(&self, state: usize, rel_pos: i64) -> f64 {
        let l = self.seq.len() as i64;
        let pos = l + rel_pos;
        if pos < 0 || l - pos >= self.window as i64 {
            return LOG_ZERO;
        }
        self.delta_at(state, pos)
    }

    /// Walks the Viterbi traceback chain rooted at `state`'s final lattice
    /// cell back to `BEGIN`, returning `(state_name, segment_length)` pairs
    /// in source order. Lets a caller pick a different terminal state than
    /// the one [`Parse::decode`] resolved against `END` (e.g. to inspect a
    /// runner-up path) without redoing the DP pass.
    pub fn traceback_from(&self, state: usize) -> Vec<(String, i64)> {
        let l = self.seq.len() as i64;
        collect_path(self.trace_at(state, l))
            .into_iter()
            .map(|seg| (self.model.state_name(seg.state).to_string(), seg.length))
            .collect()
    }

    /// Runs the fused delta/alpha recurrence for every emitting state over
    /// every lattice position, then resolves the terminal transition into
    /// `END`. Returns the Viterbi path and both log probabilities.
    #[tracing::instrument(level = "debug", skip(self), fields(length = self.seq.len(), window = self.window))]
    pub fn decode(&mut self) -> DecodeResult {
        let l = self.seq.len() as i64;
        let begin = self.model.begin_index();
        let end = self.model.end_index();
        let n = self.model.n_states();

        let i0 = self.idx(begin, 0);
        self.delta[i0] = 0.0;
        self.alpha[i0] = 0.0;
        self.trace[i0] = None;

        for pos in 1..=l {
            tracing::trace!(pos, "evaluating lattice column");
            for s in 1..n - 1 {
                let state = match self.model.state(s) {
                    Some(state) => state,
                    None => continue,
                };
                let preds = self.model.pred(s);
                let log_trans = self.model.log_trans_from_preds(s);

                let result = state.eval_fused(
                    &self.seq,
                    pos,
                    preds,
                    &log_trans,
                    |pred, prev_pos| self.delta_at(pred, prev_pos),
                    |pred, prev_pos| self.alpha_at(pred, prev_pos),
                );

                let i = self.idx(s, pos);
                self.delta[i] = result.delta;
                self.alpha[i] = result.alpha;

                if let Some(pred) = result.best_pred {
                    let prev_trace = self.trace_at(pred, pos - result.best_len);
                    self.trace[i] = Some(link(prev_trace, s, result.best_len));
                } else {
                    self.trace[i] = None;
                }
            }
        }

        let mut best_delta = LOG_ZERO;
        let mut best_pred = None;
        let mut forward_total = LOG_ZERO;
        for &p in self.model.pred(end) {
            let trans_lp = self.model.log_p(p, end);
            if trans_lp == LOG_ZERO {
                continue;
            }
            let d = self.delta_at(p, l);
            if d != LOG_ZERO {
                let score = d + trans_lp;
                if score >= best_delta {
                    best_delta = score;
                    best_pred = Some(p);
                }
            }
            let a = self.alpha_at(p, l);
            if a != LOG_ZERO {
                forward_total = log_add(forward_total, a + trans_lp);
            }
        }

        let path = match best_pred {
            Some(p) => collect_path(self.trace_at(p, l)),
            None => Vec::new(),
        };

        tracing::debug!(
            viterbi_log_prob = best_delta,
            forward_log_prob = forward_total,
            segments = path.len(),
            "decode finished"
        );
        DecodeResult { viterbi_log_prob: best_delta, forward_log_prob: forward_total, path }
    }
}
