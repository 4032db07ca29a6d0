//! Usage:
//!   ghmm generate --length 200 --seed 42
//!   ghmm decode --input reads.fa
//!   ghmm decode --input reads.fa --model custom.json --rle-threshold 3
//!   cat reads.fa | ghmm decode
//!
//! `generate` simulates a sequence from a model and prints it as FASTA;
//! `decode` reads FASTA from `--input` (or stdin, if omitted) and reports,
//! for each record, a tab-separated `name / class / log_odds / segmentation`
//! line: `class` is the state that covers the largest share of the record,
//! `log_odds` is the Viterbi path's log-odds against the total Forward mass,
//! and `segmentation` is the `[state:substring]` decomposition of the record
//! in source order. `--rle-threshold` drops segments shorter than the given
//! run length from that decomposition; `--kld-threshold` suppresses whole
//! records whose `log_odds` falls below the given cutoff. Both subcommands
//! default to the built-in demo model, or load one from a `--model` JSON
//! config file (see [`config`]).

mod alphabet;
mod config;
mod demo_model;
mod fasta;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ghmm_core::model::Model;
use ghmm_core::parse::Parse;
use ghmm_core::Alphabet;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ghmm")]
#[command(about = "Generalised Hidden Markov Model decoder", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate a sequence from a model.
    Generate {
        /// Minimum number of symbols to emit before stopping at END.
        #[arg(long, default_value_t = 200)]
        length: usize,
        /// RNG seed, for reproducible output.
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Path to a JSON model config; defaults to the built-in demo model.
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Decode FASTA records against a model.
    Decode {
        /// Path to a FASTA file; reads stdin if omitted.
        #[arg(long)]
        input: Option<PathBuf>,
        /// Path to a JSON model config; defaults to the built-in demo model.
        #[arg(long)]
        model: Option<PathBuf>,
        /// Minimum run length for a segment to appear in the segmentation
        /// column; shorter segments are dropped from the display.
        #[arg(long = "rle-threshold", default_value_t = 0)]
        rle_threshold: i64,
        /// Minimum log-odds for a record to be printed at all.
        #[arg(long = "kld-threshold", default_value_t = f64::NEG_INFINITY)]
        kld_threshold: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate { length, seed, model } => run_generate(length, seed, model.as_deref()),
        Command::Decode { input, model, rle_threshold, kld_threshold } => {
            run_decode(input.as_deref(), model.as_deref(), rle_threshold, kld_threshold)
        }
    }
}

/// Loads the requested model and the alphabet its symbols were encoded
/// against, falling back to the built-in demo model and its `ACGT`
/// alphabet when no `--model` path is given.
fn load_model(path: Option<&std::path::Path>) -> Result<(Model, Alphabet)> {
    match path {
        Some(path) => config::load(path).with_context(|| format!("loading model {}", path.display())),
        None => demo_model::build()
            .context("building demo model")
            .map(|model| (model, alphabet::nucleotides())),
    }
}

fn run_generate(min_length: usize, seed: u64, model_path: Option<&std::path::Path>) -> Result<()> {
    let (model, alphabet) = load_model(model_path)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut symbols = Vec::new();
    while symbols.len() < min_length {
        let (_, seq) = model.generate(&mut rng);
        symbols.extend(seq);
    }

    let sequence = alphabet::decode(&alphabet, &symbols).context("decoding generated symbols")?;
    println!(">generated seed={seed} length={}", sequence.len());
    for chunk in sequence.as_bytes().chunks(70) {
        println!("{}", std::str::from_utf8(chunk).unwrap());
    }
    Ok(())
}

fn run_decode(
    input_path: Option<&std::path::Path>,
    model_path: Option<&std::path::Path>,
    rle_threshold: i64,
    kld_threshold: f64,
) -> Result<()> {
    let (model, alphabet) = load_model(model_path)?;
    let input = match input_path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => std::io::read_to_string(std::io::stdin()).context("reading FASTA from stdin")?,
    };
    let records = fasta::parse(&input);
    if records.is_empty() {
        tracing::warn!("no FASTA records found in input");
    }

    for (name, seq) in records {
        let symbols = match alphabet::encode(&alphabet, &seq) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(%name, error = %e, "skipping record with unrecognised symbols");
                continue;
            }
        };
        let mut parse = Parse::new(&model, symbols);
        let result = parse.decode();
        let log_odds = result.viterbi_log_prob - result.forward_log_prob;
        if log_odds < kld_threshold {
            continue;
        }

        let class = result
            .path
            .iter()
            .fold(std::collections::HashMap::<usize, i64>::new(), |mut acc, seg| {
                *acc.entry(seg.state).or_insert(0) += seg.length;
                acc
            })
            .into_iter()
            .max_by_key(|&(_, total)| total)
            .map(|(state, _)| model.state_name(state).to_string())
            .unwrap_or_default();

        let mut offset = 0usize;
        let mut segmentation = String::new();
        for seg in &result.path {
            let substring = &seq[offset..offset + seg.length as usize];
            offset += seg.length as usize;
            if seg.length < rle_threshold {
                continue;
            }
            segmentation.push_str(&format!("[{}:{}]", model.state_name(seg.state), substring));
        }

        println!("{name}\t{class}\t{log_odds:.4}\t{segmentation}");
    }
    Ok(())
}
