//! Nucleotide alphabet: maps FASTA characters to the integer symbols
//! `ghmm-core`'s distributions operate on, via `ghmm_core::Alphabet`. The
//! default `ACGT` alphabet backs the built-in demo model; a model loaded
//! from a [`crate::config`] file carries its own alphabet instead.

use anyhow::Result;
use ghmm_core::Alphabet;

pub fn nucleotides() -> Alphabet {
    Alphabet::new(["A", "C", "G", "T"])
}

/// Encodes a sequence, case-insensitively, into `ghmm-core` symbol indices
/// under `alphabet`. Errors on any character `alphabet` doesn't contain.
pub fn encode(alphabet: &Alphabet, seq: &str) -> Result<Vec<i64>> {
    seq.chars()
        .map(|c| {
            let upper = c.to_ascii_uppercase();
            alphabet
                .index_of(&upper.to_string())
                .map(|i| i as i64)
                .ok_or_else(|| anyhow::anyhow!("unrecognised symbol '{c}' in input sequence"))
        })
        .collect()
}

/// Inverse of [`encode`], for printing generated sequences back out.
pub fn decode(alphabet: &Alphabet, symbols: &[i64]) -> Result<String> {
    symbols
        .iter()
        .map(|&s| {
            alphabet
                .token(s as usize)
                .map(|t| t.to_string())
                .ok_or_else(|| anyhow::anyhow!("symbol {s} outside the model's alphabet"))
        })
        .collect()
}
