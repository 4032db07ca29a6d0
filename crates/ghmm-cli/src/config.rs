//! JSON model configuration files: an alternative to [`crate::demo_model`]
//! for `generate`/`decode`, letting a caller describe states, distributions
//! and transitions without recompiling. Mirrors how `whisper.rs` on the
//! reference side loads a model's hyperparameters with `serde_json` rather
//! than hardcoding them.

use anyhow::{Context, Result};
use ghmm_core::dpdf::Dpdf;
use ghmm_core::emission::EmissionDist;
use ghmm_core::length::LengthDist;
use ghmm_core::model::{Model, ModelBuilder};
use ghmm_core::state::State;
use ghmm_core::{build_dpdf_from_text, Alphabet};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct ModelConfig {
    alphabet: Vec<String>,
    states: Vec<StateConfig>,
    transitions: Vec<TransitionConfig>,
}

#[derive(Debug, Deserialize)]
struct StateConfig {
    name: String,
    length: LengthConfig,
    emission: EmissionConfig,
}

/// `freqs`/`columns` entries are `TOKEN:freq` text, parsed the same way as
/// [`ghmm_core::build_dpdf_from_text`] anywhere else it's used.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum LengthConfig {
    Uniform { min: f64, max: f64 },
    Geometric { mean: f64 },
    Discrete { min: i64, max: i64, freqs: Vec<f64> },
    Fixed { len: i64 },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EmissionConfig {
    Stateless { freqs: String },
    PositionSpecific { columns: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct TransitionConfig {
    from: String,
    to: String,
    weight: f64,
}

impl LengthConfig {
    fn build(&self) -> Result<LengthDist> {
        match self {
            LengthConfig::Uniform { min, max } => {
                LengthDist::uniform(*min, *max).context("building uniform length")
            }
            LengthConfig::Geometric { mean } => Ok(LengthDist::geometric(*mean)),
            LengthConfig::Discrete { min, max, freqs } => {
                LengthDist::discrete(*min, *max, freqs).context("building discrete length")
            }
            LengthConfig::Fixed { len } => Ok(LengthDist::fixed(*len)),
        }
    }
}

impl EmissionConfig {
    fn build(&self, alphabet: &Alphabet) -> Result<EmissionDist> {
        match self {
            EmissionConfig::Stateless { freqs } => {
                let table = build_dpdf_from_text(alphabet, freqs)
                    .context("parsing stateless emission frequencies")?;
                Ok(EmissionDist::stateless(table))
            }
            EmissionConfig::PositionSpecific { columns } => {
                let pssm: Vec<Dpdf> = columns
                    .iter()
                    .map(|col| build_dpdf_from_text(alphabet, col))
                    .collect::<ghmm_core::Result<Vec<_>>>()
                    .context("parsing position-specific motif columns")?;
                Ok(EmissionDist::position_specific(pssm))
            }
        }
    }
}

/// Loads a model definition from a JSON file and compiles it, returning the
/// model alongside the token alphabet its emission frequencies were parsed
/// against (needed by the caller to encode/decode observation sequences).
pub fn load(path: &Path) -> Result<(Model, Alphabet)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading model config {}", path.display()))?;
    let config: ModelConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing model config {}", path.display()))?;

    let alphabet = Alphabet::new(config.alphabet);

    let mut builder = ModelBuilder::new();
    for state in &config.states {
        let length = state.length.build()?;
        let emission = state.emission.build(&alphabet)?;
        let built = State::new(state.name.clone(), length, emission)
            .with_context(|| format!("building state {:?}", state.name))?;
        builder
            .add_state(state.name.clone(), built)
            .with_context(|| format!("adding state {:?}", state.name))?;
    }
    for t in &config.transitions {
        builder
            .add_transition(&t.from, &t.to, t.weight)
            .with_context(|| format!("adding transition {} -> {}", t.from, t.to))?;
    }

    let model = builder.compile().context("compiling configured model")?;
    Ok((model, alphabet))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_a_minimal_two_state_model() {
        let dir = std::env::temp_dir();
        let path = dir.join("ghmm-cli-config-test-minimal.json");
        std::fs::write(
            &path,
            r#"{
                "alphabet": ["A", "B"],
                "states": [
                    {
                        "name": "fair",
                        "length": {"kind": "fixed", "len": 1},
                        "emission": {"kind": "stateless", "freqs": "A:1 B:1"}
                    }
                ],
                "transitions": [
                    {"from": "__BEGIN__", "to": "fair", "weight": 1.0},
                    {"from": "fair", "to": "fair", "weight": 0.9},
                    {"from": "fair", "to": "__END__", "weight": 0.1}
                ]
            }"#,
        )
        .unwrap();

        let (model, alphabet) = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(alphabet.len(), 2);
        assert!(model.state_index("fair").is_some());
    }

    #[test]
    fn loads_a_position_specific_motif_state() {
        let dir = std::env::temp_dir();
        let path = dir.join("ghmm-cli-config-test-motif.json");
        std::fs::write(
            &path,
            r#"{
                "alphabet": ["A", "C", "G", "T"],
                "states": [
                    {
                        "name": "motif",
                        "length": {"kind": "fixed", "len": 2},
                        "emission": {
                            "kind": "position_specific",
                            "columns": ["A:10 C:1 G:1 T:1", "A:1 C:1 G:1 T:10"]
                        }
                    }
                ],
                "transitions": [
                    {"from": "__BEGIN__", "to": "motif", "weight": 1.0},
                    {"from": "motif", "to": "__END__", "weight": 1.0}
                ]
            }"#,
        )
        .unwrap();

        let (model, _alphabet) = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(model.state_index("motif").is_some());
    }

    #[test]
    fn unknown_transition_endpoint_reports_context() {
        let dir = std::env::temp_dir();
        let path = dir.join("ghmm-cli-config-test-bad-transition.json");
        std::fs::write(
            &path,
            r#"{
                "alphabet": ["A", "B"],
                "states": [],
                "transitions": [
                    {"from": "__BEGIN__", "to": "ghost", "weight": 1.0}
                ]
            }"#,
        )
        .unwrap();

        let err = load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(format!("{err:#}").contains("ghost"));
    }
}
