//! Small text-format helpers for building distributions from configuration
//! files: a named token alphabet, and a `TOKEN:freq` frequency-table parser
//! over it.

use crate::dpdf::Dpdf;
use crate::error::{Error, Result};

/// A fixed, ordered mapping from token names (e.g. `"A"`, `"heads"`) to the
/// integer symbol indices `ghmm-core`'s distributions operate on. Built once
/// by a caller (typically from a config file's token list) and shared by
/// every [`build_dpdf_from_text`] call that parses that caller's
/// distribution lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    tokens: Vec<String>,
}

impl Alphabet {
    /// Builds an alphabet from an ordered list of token names; token `i`
    /// maps to symbol index `i`.
    pub fn new(tokens: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Alphabet {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of symbols, i.e. `|Σ|`.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Looks up a token's symbol index, case-sensitively.
    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.tokens.iter().position(|t| t == token)
    }

    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }
}

/// Parses a whitespace-separated line of `TOKEN:freq` entries into a
/// normalised [`Dpdf`] over `[0, alphabet.len())`. Tokens not present in
/// `alphabet` are ignored, matching the permissive `strip`/`split` handling
/// model configuration files rely on; symbols with no entry in `text`
/// default to zero frequency.
pub fn build_dpdf_from_text(alphabet: &Alphabet, text: &str) -> Result<Dpdf> {
    if alphabet.is_empty() {
        return Err(Error::InvalidRange { min: 0, max: 0 });
    }
    let mut freqs = vec![0.0_f64; alphabet.len()];
    for entry in text.split_whitespace() {
        let Some((tok, freq_str)) = entry.split_once(':') else {
            continue;
        };
        let Some(idx) = alphabet.index_of(tok) else {
            continue;
        };
        let Ok(freq) = freq_str.parse::<f64>() else {
            continue;
        };
        freqs[idx] += freq;
    }
    Dpdf::from_linear(0, alphabet.len() as i64, &freqs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acgt() -> Alphabet {
        Alphabet::new(["A", "C", "G", "T"])
    }

    #[test]
    fn parses_and_normalises_token_freq_entries() {
        let d = build_dpdf_from_text(&acgt(), "A:1 C:1 G:1 T:1").unwrap();
        for i in 0..4 {
            assert!((d.p(i) - 0.25).abs() < 1e-12);
        }
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let d = build_dpdf_from_text(&acgt(), "A:2 C:2 bogus:1000 N:50").unwrap();
        assert!((d.p(0) - 0.5).abs() < 1e-12);
        assert!((d.p(1) - 0.5).abs() < 1e-12);
        assert_eq!(d.p(2), 0.0);
        assert_eq!(d.p(3), 0.0);
    }

    #[test]
    fn ignores_extra_whitespace() {
        let d = build_dpdf_from_text(&acgt(), "  A:2.0   C:2.0  ").unwrap();
        assert!((d.p(0) - 0.5).abs() < 1e-12);
        assert!((d.p(1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn all_zero_after_filtering_is_an_error() {
        assert!(build_dpdf_from_text(&acgt(), "bogus:1 other:1").is_err());
    }

    #[test]
    fn empty_alphabet_is_an_error() {
        let empty = Alphabet::new(Vec::<String>::new());
        assert!(build_dpdf_from_text(&empty, "A:1").is_err());
    }
}
