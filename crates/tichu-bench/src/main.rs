use std::path::PathBuf;

use clap::Parser;

use tichu_bench::analysis::AnalysisRunner;
use tichu_bench::config::BenchConfig;
use tichu_bench::logging::init_logging;

/// Deterministic analysis harness for the Tichu combination and probability
/// engines.
#[derive(Debug, Parser)]
#[command(
    name = "tichu-bench",
    author,
    version,
    about = "Deterministic Tichu hand-analysis harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of hands to analyze.
    #[arg(long, value_name = "HANDS")]
    hands: Option<usize>,

    /// Override the RNG seed for deal generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override the observer hand size.
    #[arg(long, value_name = "CARDS")]
    hand_size: Option<usize>,

    /// Override the partition search limit.
    #[arg(long, value_name = "COUNT")]
    partition_limit: Option<usize>,

    /// Exit after validating the configuration (no analysis is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(hands) = cli.hands {
        config.deals.hands = hands;
    }

    if let Some(seed) = cli.seed {
        config.deals.seed = seed;
    }

    if let Some(hand_size) = cli.hand_size {
        config.deals.hand_size = hand_size;
    }

    if let Some(limit) = cli.partition_limit {
        config.partitions.limit = limit;
    }

    config.validate()?;

    let outputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let hands = config.deals.hands;
    println!("Loaded configuration '{run_id}' ({hands} hands)");

    if cli.validate_only {
        return Ok(());
    }

    let _logging = init_logging(&config.logging, &outputs)?;

    let runner = AnalysisRunner::new(config, outputs);
    let summary = runner.run()?;

    println!(
        "Analyzed {} hands; rows at {}, summary at {}",
        summary.hands,
        summary.rows_path.display(),
        summary.summary_path.display()
    );
    if let Some(quality) = summary.quality_mean {
        println!("Mean best partition quality: {quality:.4}");
    }
    Ok(())
}
