//! The worked-example "biased coin" model used by `ghmm generate` and
//! `ghmm decode` when no model configuration file is supplied: a low-GC
//! background state and a high-GC region state, each a simple geometric
//! self-loop, standing in for a minimal two-state composition landscape.

use ghmm_core::dpdf::Dpdf;
use ghmm_core::emission::EmissionDist;
use ghmm_core::length::LengthDist;
use ghmm_core::model::{Model, ModelBuilder};
use ghmm_core::state::State;
use ghmm_core::Result;

fn gc_state(name: &str, gc_fraction: f64, mean_length: f64) -> Result<State> {
    let at = (1.0 - gc_fraction) / 2.0;
    let gc = gc_fraction / 2.0;
    // symbol order: A, C, G, T
    let table = Dpdf::from_linear(0, 4, &[at, gc, gc, at])?;
    State::new(name, LengthDist::geometric(mean_length), EmissionDist::stateless(table))
}

/// Builds the two-state background/region model: `background` (GC 40%,
/// mean visit length 50) and `region` (GC 70%, mean visit length 20),
/// each reachable from BEGIN and each able to reach END directly or via
/// the other state.
pub fn build() -> Result<Model> {
    let mut b = ModelBuilder::new();
    b.add_state("background", gc_state("background", 0.4, 50.0)?)?;
    b.add_state("region", gc_state("region", 0.7, 20.0)?)?;

    b.add_transition("__BEGIN__", "background", 1.0)?;
    b.add_transition("background", "region", 0.02)?;
    b.add_transition("background", "__END__", 0.001)?;
    b.add_transition("region", "background", 0.05)?;
    b.add_transition("region", "__END__", 0.001)?;

    b.compile()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_model_compiles() {
        let model = build().unwrap();
        assert!(model.state_index("background").is_some());
        assert!(model.state_index("region").is_some());
    }
}
