//! Compiled model graph: states wired together by a transition matrix, plus
//! the builder that turns a loosely specified graph into one.

use crate::error::{Error, Result};
use crate::length::LengthDist;
use crate::log::log_clip;
use crate::state::State;
use rand::Rng;

const BEGIN_NAME: &str = "__BEGIN__";
const END_NAME: &str = "__END__";

/// A compiled, ready-to-decode model: BEGIN is always index `0`, END is
/// always the last index, and every row of the transition matrix (save
/// END's, which has none) sums to one.
#[derive(Debug, Clone)]
pub struct Model {
    state_names: Vec<String>,
    states: Vec<Option<State>>,
    pred: Vec<Vec<usize>>,
    succ: Vec<Vec<usize>>,
    trans: Vec<f64>,
    log_trans: Vec<f64>,
    n: usize,
}

impl Model {
    /// Number of states, including the reserved `BEGIN`/`END` nodes.
    pub fn n_states(&self) -> usize {
        self.n
    }

    pub fn begin_index(&self) -> usize {
        0
    }

    pub fn end_index(&self) -> usize {
        self.n - 1
    }

    /// Looks up a state's compiled index by name, including `"__BEGIN__"`/`"__END__"`.
    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.state_names.iter().position(|n| n == name)
    }

    pub fn state_name(&self, idx: usize) -> &str {
        &self.state_names[idx]
    }

    /// The emitting state at `idx`, or `None` for `BEGIN`/`END`.
    pub fn state(&self, idx: usize) -> Option<&State> {
        self.states[idx].as_ref()
    }

    pub fn pred(&self, idx: usize) -> &[usize] {
        &self.pred[idx]
    }

    pub fn succ(&self, idx: usize) -> &[usize] {
        &self.succ[idx]
    }

    /// `P(s -> t)`.
    pub fn p(&self, s: usize, t: usize) -> f64 {
        self.trans[s * self.n + t]
    }

    /// `log P(s -> t)`.
    pub fn log_p(&self, s: usize, t: usize) -> f64 {
        self.log_trans[s * self.n + t]
    }

    /// Gathers `log P(pred -> s)` for every predecessor of `s`, in the same
    /// order as [`Model::pred`]. Convenience for callers feeding
    /// [`crate::state::State::eval_fused`].
    pub fn log_trans_from_preds(&self, s: usize) -> Vec<f64> {
        self.pred[s].iter().map(|&p| self.log_p(p, s)).collect()
    }

    fn sample_row(&self, s: usize, rng: &mut impl Rng) -> usize {
        let mut r: f64 = rng.random();
        let row = &self.trans[s * self.n..(s + 1) * self.n];
        for (t, &p) in row.iter().enumerate() {
            r -= p;
            if r <= 0.0 {
                return t;
            }
        }
        self.n - 1
    }

    /// Simulates a full path from `BEGIN` to `END`, returning the sequence
    /// of visited emitting-state indices and the concatenated observation
    /// sequence they produced.
    pub fn generate(&self, rng: &mut impl Rng) -> (Vec<usize>, Vec<i64>) {
        let mut path = Vec::new();
        let mut seq = Vec::new();
        let mut cur = self.begin_index();
        loop {
            cur = self.sample_row(cur, rng);
            if cur == self.end_index() {
                break;
            }
            path.push(cur);
            if let Some(state) = &self.states[cur] {
                let (_, segment) = state.generate(rng);
                seq.extend(segment);
            }
        }
        (path, seq)
    }
}

/// Builds a [`Model`] from named states and weighted transitions, then
/// compiles it: prunes unreachable states, canonicalises indices, row-
/// normalises, and folds geometric self-loops into the transition matrix.
pub struct ModelBuilder {
    names: Vec<String>,
    states: Vec<State>,
    edges: Vec<(String, String, f64)>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        ModelBuilder { names: Vec::new(), states: Vec::new(), edges: Vec::new() }
    }

    /// Adds a named emitting state. `"__BEGIN__"`/`"__END__"` are reserved.
    pub fn add_state(&mut self, name: impl Into<String>, state: State) -> Result<()> {
        let name = name.into();
        if name == BEGIN_NAME || name == END_NAME {
            return Err(Error::ReservedName(name));
        }
        self.names.push(name);
        self.states.push(state);
        Ok(())
    }

    /// Removes a previously added state and every transition touching it.
    pub fn remove_state(&mut self, name: &str) -> Result<()> {
        let idx = self
            .names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| Error::UnknownState(name.to_string()))?;
        self.names.remove(idx);
        self.states.remove(idx);
        self.edges.retain(|(from, to, _)| from != name && to != name);
        Ok(())
    }

    /// Adds a weighted transition. `from`/`to` may be `"__BEGIN__"`/`"__END__"` in
    /// addition to any previously added state name. Weights accumulate if
    /// the same pair is added more than once.
    pub fn add_transition(&mut self, from: &str, to: &str, weight: f64) -> Result<()> {
        if from != BEGIN_NAME && !self.names.iter().any(|n| n == from) {
            return Err(Error::UnknownState(from.to_string()));
        }
        if to != END_NAME && !self.names.iter().any(|n| n == to) {
            return Err(Error::UnknownState(to.to_string()));
        }
        self.edges.push((from.to_string(), to.to_string(), weight));
        Ok(())
    }

    /// Runs the compilation pipeline: reachability pruning, index
    /// canonicalisation, row normalisation, geometric self-loop insertion,
    /// and derivation of `pred`/`succ`/`log_trans`.
    #[tracing::instrument(level = "debug", skip(self), fields(declared_states = self.names.len()))]
    pub fn compile(self) -> Result<Model> {
        let m = self.names.len() + 2;
        let begin_idx = 0;
        let end_idx = m - 1;
        let index_of = |name: &str, names: &[String]| -> usize {
            if name == BEGIN_NAME {
                0
            } else if name == END_NAME {
                m - 1
            } else {
                1 + names.iter().position(|n| n == name).unwrap()
            }
        };

        let mut weight = vec![0.0_f64; m * m];
        let mut adj = vec![false; m * m];
        for (from, to, w) in &self.edges {
            if *w <= 0.0 {
                continue;
            }
            let i = index_of(from, &self.names);
            let j = index_of(to, &self.names);
            weight[i * m + j] += w;
            adj[i * m + j] = true;
        }

        // Warshall transitive closure: reach[i*m+j] iff a path i -> j exists.
        let mut reach = adj.clone();
        for s in 0..m {
            reach[s * m + s] = true;
        }
        for k in 0..m {
            for i in 0..m {
                if reach[i * m + k] {
                    for j in 0..m {
                        if reach[k * m + j] {
                            reach[i * m + j] = true;
                        }
                    }
                }
            }
        }

        let keep: Vec<bool> = (0..m)
            .map(|s| {
                s == begin_idx
                    || s == end_idx
                    || (reach[begin_idx * m + s] && reach[s * m + end_idx])
            })
            .collect();
        let pruned = keep.iter().filter(|&&k| !k).count();
        if pruned > 0 {
            tracing::debug!(pruned, "dropping states with no BEGIN..END path");
        }

        let mut new_index = vec![None; m];
        new_index[begin_idx] = Some(0);
        let mut next = 1;
        for s in 1..end_idx {
            if keep[s] {
                new_index[s] = Some(next);
                next += 1;
            }
        }
        let n = next + 1;
        new_index[end_idx] = Some(next);

        let mut state_names = vec![BEGIN_NAME.to_string()];
        let mut states: Vec<Option<State>> = vec![None];
        for (old_s, state) in self.states.into_iter().enumerate() {
            let old_idx = old_s + 1;
            if new_index[old_idx].is_some() {
                state_names.push(self.names[old_s].clone());
                states.push(Some(state));
            }
        }
        state_names.push(END_NAME.to_string());
        states.push(None);

        let mut trans = vec![0.0_f64; n * n];
        for i in 0..m {
            let Some(ni) = new_index[i] else { continue };
            for j in 0..m {
                let Some(nj) = new_index[j] else { continue };
                let w = weight[i * m + j];
                if w > 0.0 {
                    trans[ni * n + nj] += w;
                }
            }
        }

        // Row-normalise every row except END's, which has no outgoing mass.
        for s in 0..n - 1 {
            let row = &mut trans[s * n..(s + 1) * n];
            let sum: f64 = row.iter().sum();
            if sum <= 0.0 {
                tracing::debug!(state = %state_names[s], "zero-sum transition row");
                return Err(Error::ZeroSumRow(state_names[s].clone()));
            }
            tracing::trace!(state = %state_names[s], row_sum = sum, "normalised transition row");
            for v in row.iter_mut() {
                *v /= sum;
            }
        }

        // Fold geometric self-loops: scale every non-self outgoing edge by
        // (1 - p_self), then set the diagonal to p_self. The row must not
        // already carry a self-edge, since the geometric term stands in
        // for exactly that mass.
        for s in 1..n - 1 {
            if let Some(State { length: LengthDist::Geometric { p_self }, .. }) = &states[s] {
                let p_self = *p_self;
                let not_p_self = 1.0 - p_self;
                for t in 0..n {
                    if t != s {
                        trans[s * n + t] *= not_p_self;
                    }
                }
                trans[s * n + s] = p_self;
            }
        }

        let log_trans: Vec<f64> = trans.iter().map(|&p| log_clip(p)).collect();

        let mut pred = vec![Vec::new(); n];
        let mut succ = vec![Vec::new(); n];
        for s in 0..n {
            for t in 0..n {
                if trans[s * n + t] > 0.0 {
                    succ[s].push(t);
                    pred[t].push(s);
                }
            }
        }

        tracing::debug!(retained_states = n, pruned, "model compiled");
        Ok(Model { state_names, states, pred, succ, trans, log_trans, n })
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
