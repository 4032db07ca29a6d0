//! Generalised Hidden Markov Model inference: duration-aware Viterbi and
//! Forward decoding over states that each emit a variable-length block of
//! observation symbols per visit.
//!
//! Build a model with [`model::ModelBuilder`], compile it with
//! [`model::ModelBuilder::compile`], then decode an observation sequence
//! with [`parse::Parse::decode`].

pub mod dpdf;
pub mod emission;
pub mod error;
pub mod length;
pub mod log;
pub mod model;
pub mod parse;
pub mod state;
pub mod text;

pub use dpdf::Dpdf;
pub use emission::{Direction, EmissionDist, SegmentGenerator};
pub use error::{Error, Result};
pub use length::LengthDist;
pub use log::{log_add, log_clip, LOG_INF, LOG_ZERO};
pub use model::{Model, ModelBuilder};
pub use parse::{DecodeResult, Parse, Segment};
pub use state::{FusedResult, State};
pub use text::{build_dpdf_from_text, Alphabet};

#[cfg(test)]
mod tests {
    use super::*;

    /// Type-checks every re-export's public signature, so a rename that
    /// forgets to update `pub use` here fails to compile rather than
    /// silently dropping an item from the crate's surface.
    #[test]
    fn reexports_compile() {
        fn _model_builder() -> ModelBuilder {
            ModelBuilder::new()
        }
        fn _dpdf(min: i64, max: i64, freqs: &[f64]) -> Result<Dpdf> {
            Dpdf::from_linear(min, max, freqs)
        }
        fn _length() -> LengthDist {
            LengthDist::fixed(1)
        }
        fn _log_helpers(x: f64, y: f64) -> (f64, f64, f64, f64) {
            (LOG_ZERO, LOG_INF, log_add(x, y), log_clip(x))
        }
        fn _error_alias(e: Error) -> Result<()> {
            Err(e)
        }
        fn _alphabet() -> Alphabet {
            Alphabet::new(["a", "b"])
        }
        let _ = _model_builder;
        let _ = _dpdf;
        let _ = _length;
        let _ = _log_helpers;
        let _ = _error_alias;
        let _ = _alphabet;
    }
}
