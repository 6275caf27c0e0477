use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;

use graph_rank_sampler::config::Config;
use graph_rank_sampler::graph::{GraphStore, MmapGraphStore};
use graph_rank_sampler::rounds::RoundScheduler;
use graph_rank_sampler::sampling::Strategy;
use graph_rank_sampler::storage;
use graph_rank_sampler::topn::TopNSelector;

#[derive(Parser, Debug)]
#[clap(
    name = "graph-rank-sampler",
    about = "Out-of-core parallel graph sampling for approximate node importance"
)]
struct Cli {
    /// Path to the graph store file
    store: PathBuf,

    /// Checkpoint file to resume from
    checkpoint: Option<PathBuf>,

    /// Sampling time budget per round, in seconds
    #[clap(long, default_value = "100")]
    time_budget: u64,

    /// Sampling strategy
    #[clap(long, value_enum, default_value = "random-walk")]
    strategy: Strategy,

    /// Maximum path depth for the path-count strategy
    #[clap(long, default_value = "10")]
    max_depth: usize,

    /// How many top nodes to report
    #[clap(long, default_value = "10")]
    top: usize,

    /// Number of sampling worker threads (0 = twice the available cores)
    #[clap(long, default_value = "0")]
    threads: usize,

    /// Directory to write checkpoints to
    #[clap(long, default_value = ".")]
    checkpoint_dir: PathBuf,

    /// Output directory for the run summary
    #[clap(long, default_value = "rank_results")]
    output_dir: PathBuf,

    /// Base RNG seed (worker w samples with seed + w)
    #[clap(long, default_value = "0")]
    seed: u64,

    /// Verbose logging
    #[clap(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let mut config = Config {
        time_budget: Duration::from_secs(args.time_budget),
        max_depth: args.max_depth,
        strategy: args.strategy,
        top_n: args.top,
        checkpoint_dir: args.checkpoint_dir,
        seed: args.seed,
        ..Config::default()
    };
    if args.threads > 0 {
        config.sampling_workers = args.threads;
    }

    log::info!("using {} sampling workers", config.sampling_workers);

    let store: Arc<dyn GraphStore> = Arc::new(MmapGraphStore::open(&args.store)?);
    log::info!(
        "opened store {} with highest node id {}",
        args.store.display(),
        store.highest_node_id()
    );

    let started = Instant::now();
    let scheduler =
        RoundScheduler::initialize(Arc::clone(&store), config.clone(), args.checkpoint.as_deref())?;
    let (counters, stats) = scheduler.run_rounds()?;

    let counts = counters.snapshot();
    let top = TopNSelector::new(&counts).select(config.top_n);
    for &(id, count) in &top {
        println!("Node {} Count {}", id, count);
    }

    storage::save_summary(
        &args.output_dir,
        &top,
        store.highest_node_id(),
        stats,
        started.elapsed().as_millis(),
    )?;

    log::info!(
        "analysis complete in {} ms, summary in {}",
        started.elapsed().as_millis(),
        args.output_dir.display()
    );

    Ok(())
}
