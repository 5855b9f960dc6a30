//! Deterministic deal loop exercising the combination, partition and
//! probability engines, with per-hand rows and an aggregate summary.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::{Level, event};

use tichu_core::model::deck::Deck;
use tichu_core::model::hand::Hand;
use tichu_core::prob::engine::{ProbError, ProbabilityEngine};
use tichu_core::prob::pool::{PoolError, UnseenPool};
use tichu_core::prob::provider::CachedTableProvider;
use tichu_core::{enumerate_combinations, enumerate_partitions, partition_quality};

use crate::config::{BenchConfig, ResolvedOutputs};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed deal: {0}")]
    Pool(#[from] PoolError),
    #[error("probability query failed: {0}")]
    Prob(#[from] ProbError),
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("hand construction failed: {0}")]
    Hand(#[from] tichu_core::model::hand::HandError),
}

/// One line of `hands.jsonl`.
#[derive(Debug, Serialize)]
struct HandRow {
    hand_index: usize,
    seed: u64,
    cards: Vec<String>,
    combination_counts: BTreeMap<String, usize>,
    partitions_found: usize,
    exhaustive: bool,
    best_quality: Option<f64>,
    mean_hi_opponent: Option<f64>,
}

#[derive(Debug, Serialize)]
struct SummaryReport {
    run_id: String,
    hands: usize,
    hand_size: usize,
    partition_limit: usize,
    combinations_total: usize,
    partitions_total: usize,
    exhaustive_rate: f64,
    quality_mean: Option<f64>,
    quality_std_dev: Option<f64>,
    hi_opponent_mean: Option<f64>,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunSummary {
    pub hands: usize,
    pub rows_path: PathBuf,
    pub summary_path: PathBuf,
    pub quality_mean: Option<f64>,
}

pub struct AnalysisRunner {
    config: BenchConfig,
    outputs: ResolvedOutputs,
    engine: ProbabilityEngine<CachedTableProvider>,
}

impl AnalysisRunner {
    pub fn new(config: BenchConfig, outputs: ResolvedOutputs) -> Self {
        Self {
            config,
            outputs,
            engine: ProbabilityEngine::new(CachedTableProvider::new()),
        }
    }

    pub fn run(&self) -> Result<RunSummary, AnalysisError> {
        fs::create_dir_all(&self.outputs.directory).map_err(|source| AnalysisError::Io {
            context: "creating output directory",
            source,
        })?;
        let rows_file =
            File::create(&self.outputs.rows_jsonl).map_err(|source| AnalysisError::Io {
                context: "creating hands.jsonl",
                source,
            })?;
        let mut rows = BufWriter::new(rows_file);

        let hand_size = self.config.deals.hand_size;
        let mut seed_rng = StdRng::seed_from_u64(self.config.deals.seed);
        let mut combinations_total = 0usize;
        let mut partitions_total = 0usize;
        let mut exhaustive_hands = 0usize;
        let mut best_qualities = Vec::new();
        let mut hi_means = Vec::new();

        for hand_index in 0..self.config.deals.hands {
            let seed = seed_rng.next_u64();
            let deck = Deck::shuffled_with_seed(seed);
            let hand = Hand::try_from_cards(deck.cards()[..hand_size].to_vec())?;

            let combinations = enumerate_combinations(&hand);
            let search = enumerate_partitions(&hand, &combinations, self.config.partitions.limit);
            let pool = UnseenPool::excluding(hand.cards())?;
            let stats = self.engine.combination_stats(
                &combinations,
                &pool,
                [hand_size, hand_size],
                hand_size,
            )?;

            let best_quality = search
                .partitions
                .iter()
                .map(|partition| partition_quality(partition, &combinations, &stats))
                .max_by(f64::total_cmp);
            let hi_values: Vec<f64> = combinations
                .iter()
                .filter_map(|combination| stats.get(&combination.card_mask()))
                .map(|entry| entry.hi_opponent)
                .collect();
            let mean_hi = if hi_values.is_empty() {
                None
            } else {
                Some(hi_values.iter().copied().mean())
            };

            combinations_total += combinations.len();
            partitions_total += search.partitions.len();
            exhaustive_hands += search.exhaustive as usize;
            if let Some(quality) = best_quality {
                best_qualities.push(quality);
            }
            if let Some(hi) = mean_hi {
                hi_means.push(hi);
            }

            let mut combination_counts = BTreeMap::new();
            for combination in &combinations {
                *combination_counts
                    .entry(format!("{:?}", combination.figure.kind))
                    .or_insert(0) += 1;
            }

            let row = HandRow {
                hand_index,
                seed,
                cards: hand.iter().map(|card| card.to_string()).collect(),
                combination_counts,
                partitions_found: search.partitions.len(),
                exhaustive: search.exhaustive,
                best_quality,
                mean_hi_opponent: mean_hi,
            };
            serde_json::to_writer(&mut rows, &row)?;
            rows.write_all(b"\n").map_err(|source| AnalysisError::Io {
                context: "writing hands.jsonl",
                source,
            })?;

            event!(
                Level::INFO,
                hand_index,
                combinations = combinations.len(),
                partitions = search.partitions.len(),
                exhaustive = search.exhaustive,
                "hand analyzed"
            );
        }
        rows.flush().map_err(|source| AnalysisError::Io {
            context: "flushing hands.jsonl",
            source,
        })?;

        let report = SummaryReport {
            run_id: self.config.run_id.clone(),
            hands: self.config.deals.hands,
            hand_size,
            partition_limit: self.config.partitions.limit,
            combinations_total,
            partitions_total,
            exhaustive_rate: exhaustive_hands as f64 / self.config.deals.hands as f64,
            quality_mean: mean_of(&best_qualities),
            quality_std_dev: std_dev_of(&best_qualities),
            hi_opponent_mean: mean_of(&hi_means),
        };
        let summary_file =
            File::create(&self.outputs.summary_json).map_err(|source| AnalysisError::Io {
                context: "creating summary.json",
                source,
            })?;
        serde_json::to_writer_pretty(BufWriter::new(summary_file), &report)?;

        Ok(RunSummary {
            hands: self.config.deals.hands,
            rows_path: self.outputs.rows_jsonl.clone(),
            summary_path: self.outputs.summary_json.clone(),
            quality_mean: report.quality_mean,
        })
    }
}

fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().copied().mean())
    }
}

fn std_dev_of(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        None
    } else {
        Some(values.iter().copied().std_dev())
    }
}

#[cfg(test)]
mod tests {
    use super::{mean_of, std_dev_of};

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean_of(&[]), None);
        assert_eq!(mean_of(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn std_dev_needs_two_samples() {
        assert_eq!(std_dev_of(&[1.0]), None);
        assert!(std_dev_of(&[1.0, 3.0]).unwrap() > 0.0);
    }
}
