//! CLI for the GENEX similarity-search engine.
//!
//! Subcommands:
//!  - `build` : load a dataset file, group it into a `GlobalIndex`, persist it.
//!  - `query` : restore a persisted index and run a best-match or k-best query.
//!  - `bench` : report per-length cluster counts for a persisted index.
//!  - `shell` : a minimal interactive REPL wrapping `query`.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use genex_core::{config::EngineConfig, persist, retrieval, GlobalIndex, SampleBlock, SequenceView};
use serde_json::json;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use genex_cli::loader;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Parser)]
#[command(name = "genex", about = "GENEX similarity-search engine CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a dataset file, build a global index, and persist it.
    Build(BuildArgs),
    /// Restore a persisted index and run a best-match or k-best query.
    Query(QueryArgs),
    /// Report per-length cluster counts for a persisted index.
    Bench(BenchArgs),
    /// Minimal interactive shell wrapping `query`.
    Shell(ShellArgs),
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Path to the textual dataset file.
    #[arg(long)]
    dataset: PathBuf,
    /// Path to write the persisted binary index to.
    #[arg(long)]
    out: PathBuf,
    /// Distance family name (e.g. "euclidean", "cosine_dtw").
    #[arg(long, default_value = "euclidean")]
    distance: String,
    /// Covering-radius threshold τ for the leader clustering.
    #[arg(long, default_value_t = 1.0)]
    threshold: f64,
    /// Sakoe-Chiba warping band ratio, in (0, 1].
    #[arg(long, default_value_t = genex_core::config::DEFAULT_WARPING_BAND_RATIO)]
    warping_band_ratio: f64,
    /// Worker-pool size; 1 builds serially.
    #[arg(long, default_value_t = 1)]
    threads: usize,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Path to the original dataset file (the index stores no samples).
    #[arg(long)]
    dataset: PathBuf,
    /// Path to the persisted binary index.
    #[arg(long)]
    index: PathBuf,
    /// Row of the query subsequence.
    #[arg(long)]
    row: usize,
    /// Start offset (inclusive) of the query subsequence.
    #[arg(long)]
    start: usize,
    /// End offset (exclusive) of the query subsequence.
    #[arg(long)]
    end: usize,
    /// Number of results to return. `1` (the default) runs best-match.
    #[arg(long, default_value_t = 1)]
    k: usize,
    /// Number of candidate items to examine before the final exact
    /// recomputation. Defaults to `k`; must be `>= k`.
    #[arg(long)]
    h: Option<usize>,
    /// Print results as JSON instead of plain text.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct BenchArgs {
    /// Path to the original dataset file.
    #[arg(long)]
    dataset: PathBuf,
    /// Path to the persisted binary index.
    #[arg(long)]
    index: PathBuf,
    /// Print results as JSON instead of plain text.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct ShellArgs {
    /// Path to the original dataset file.
    #[arg(long)]
    dataset: PathBuf,
    /// Path to the persisted binary index.
    #[arg(long)]
    index: PathBuf,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Query(args) => run_query(args),
        Commands::Bench(args) => run_bench(args),
        Commands::Shell(args) => run_shell(args),
    }
}

fn load_block(dataset: &PathBuf) -> Result<SampleBlock> {
    loader::load_dataset_file(dataset).with_context(|| format!("loading dataset {}", dataset.display()))
}

fn run_build(args: BuildArgs) -> Result<()> {
    let block = load_block(&args.dataset)?;
    let config = EngineConfig {
        warping_band_ratio: args.warping_band_ratio,
        distance_name: args.distance,
        threshold: args.threshold,
        num_threads: args.threads,
    };

    let index = if config.num_threads > 1 {
        GlobalIndex::build_parallel(&block, &config).context("building global index in parallel")?
    } else {
        GlobalIndex::build(&block, &config).context("building global index")?
    };

    let file = std::fs::File::create(&args.out).with_context(|| format!("creating index file {}", args.out.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    persist::save(&index, block.item_count(), &mut writer).context("persisting global index")?;
    writer.flush()?;

    println!("built index over {} rows, {} total groups, written to {}", block.item_count(), index.total_groups(), args.out.display());
    Ok(())
}

fn restore_index(dataset: &PathBuf, index_path: &PathBuf) -> Result<(SampleBlock, GlobalIndex)> {
    let block = load_block(dataset)?;
    let file = std::fs::File::open(index_path).with_context(|| format!("opening index file {}", index_path.display()))?;
    let index = persist::load(&block, std::io::BufReader::new(file)).context("restoring global index")?;
    Ok((block, index))
}

fn run_query(args: QueryArgs) -> Result<()> {
    let (block, index) = restore_index(&args.dataset, &args.index)?;
    let config = EngineConfig {
        distance_name: index.distance_name().to_string(),
        threshold: index.threshold(),
        warping_band_ratio: index.warping_band_ratio(),
        ..Default::default()
    };
    let query = SequenceView::borrowed(&block, args.row, args.start, args.end).context("building query view")?;

    if args.k <= 1 {
        let result = retrieval::best_match(&index, &block, &query, &config).context("running best-match query")?;
        if args.json {
            println!("{}", json!({"row": result.row, "start": result.start, "length": result.length, "dist": result.dist}));
        } else {
            println!("best match: row={} start={} length={} dist={}", result.row, result.start, result.length, result.dist);
        }
    } else {
        let h = args.h.unwrap_or(args.k);
        let results = retrieval::k_best_match(&index, &block, &query, args.k, h, &config).context("running k-best query")?;
        if args.json {
            let entries: Vec<_> = results
                .iter()
                .map(|m| json!({"row": m.row, "start": m.start, "length": m.length, "dist": m.dist}))
                .collect();
            println!("{}", json!({"results": entries}));
        } else {
            for (rank, m) in results.iter().enumerate() {
                println!("#{:<3} row={} start={} length={} dist={}", rank + 1, m.row, m.start, m.length, m.dist);
            }
        }
    }
    Ok(())
}

fn run_bench(args: BenchArgs) -> Result<()> {
    let (_, index) = restore_index(&args.dataset, &args.index)?;
    if args.json {
        let spaces: Vec<_> = (2..=index.max_len())
            .filter_map(|length| index.space(length).map(|s| json!({"length": length, "clusters": s.num_clusters()})))
            .collect();
        println!(
            "{}",
            json!({"max_len": index.max_len(), "distance": index.distance_name(), "threshold": index.threshold(), "spaces": spaces})
        );
        return Ok(());
    }
    println!("max_len={} distance={} threshold={}", index.max_len(), index.distance_name(), index.threshold());
    for length in 2..=index.max_len() {
        if let Some(space) = index.space(length) {
            println!("  length={:<4} clusters={}", length, space.num_clusters());
        }
    }
    Ok(())
}

/// A small REPL: each line is either `best <row> <start> <end>` or
/// `kbest <row> <start> <end> <k> [h]`, or `quit`.
fn run_shell(args: ShellArgs) -> Result<()> {
    let (block, index) = restore_index(&args.dataset, &args.index)?;
    let config = EngineConfig {
        distance_name: index.distance_name().to_string(),
        threshold: index.threshold(),
        warping_band_ratio: index.warping_band_ratio(),
        ..Default::default()
    };

    println!("genex shell — commands: best <row> <start> <end> | kbest <row> <start> <end> <k> [h] | quit");
    let stdin = std::io::stdin();
    let mut out = std::io::stdout();
    loop {
        print!("genex> ");
        out.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        if let Err(e) = handle_shell_command(line, &block, &index, &config) {
            eprintln!("error: {e:#}");
        }
    }
    Ok(())
}

fn handle_shell_command(line: &str, block: &SampleBlock, index: &GlobalIndex, config: &EngineConfig) -> Result<()> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["best", row, start, end] => {
            let query = SequenceView::borrowed(block, row.parse()?, start.parse()?, end.parse()?)?;
            let result = retrieval::best_match(index, block, &query, config)?;
            println!("row={} start={} length={} dist={}", result.row, result.start, result.length, result.dist);
        }
        ["kbest", row, start, end, k] => {
            let query = SequenceView::borrowed(block, row.parse()?, start.parse()?, end.parse()?)?;
            let k: usize = k.parse()?;
            let results = retrieval::k_best_match(index, block, &query, k, k, config)?;
            for (rank, m) in results.iter().enumerate() {
                println!("#{:<3} row={} start={} length={} dist={}", rank + 1, m.row, m.start, m.length, m.dist);
            }
        }
        ["kbest", row, start, end, k, h] => {
            let query = SequenceView::borrowed(block, row.parse()?, start.parse()?, end.parse()?)?;
            let results = retrieval::k_best_match(index, block, &query, k.parse()?, h.parse()?, config)?;
            for (rank, m) in results.iter().enumerate() {
                println!("#{:<3} row={} start={} length={} dist={}", rank + 1, m.row, m.start, m.length, m.dist);
            }
        }
        _ => anyhow::bail!("unrecognized command {line:?}"),
    }
    Ok(())
}
