//! chainhash CLI
//!
//! # Commands
//!
//! - `algorithms` - List the built-in chains and their primitives
//! - `permutation` - Show the stage order selected for a timestamp
//! - `hash` - Hash one 80-byte header
//! - `scan` - Search the nonce space of a header
//! - `benchmark` - Measure chain throughput

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use chainhash::algorithm::{
    Algorithm, Chain, ChainSpec, PermutationSelector, PrimitiveRegistry, Strategy,
    TIMETRAVEL_BASE_TIMESTAMP, header, target_from_compact,
};
use chainhash::config::{ChainConfig, default_config_dir, resolve_config_path};
use chainhash::scan::{Acceptance, Scanner};

#[derive(Parser)]
#[command(name = "chainhash")]
#[command(author = "Cyberia")]
#[command(version = "0.1.0")]
#[command(about = "Timestamp-permuted proof-of-work hash chains")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory searched for chain configurations given by name
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ChainArgs {
    /// Built-in algorithm name
    #[arg(long)]
    algo: Option<String>,

    /// Chain configuration file, or a name under the config directory
    #[arg(long)]
    config: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Table,
    Generative,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Table => Strategy::Table,
            StrategyArg::Generative => Strategy::Generative,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in algorithms
    Algorithms,

    /// Show the stage order selected for a timestamp
    Permutation {
        /// Number of permuted stages
        #[arg(short, long, default_value = "10")]
        stages: usize,

        /// Base timestamp of the schedule
        #[arg(short, long, default_value_t = TIMETRAVEL_BASE_TIMESTAMP)]
        base: u32,

        /// Header timestamp
        #[arg(short, long)]
        timestamp: u32,

        #[arg(long, value_enum, default_value = "generative")]
        strategy: StrategyArg,
    },

    /// Hash an 80-byte header
    Hash {
        #[command(flatten)]
        chain: ChainArgs,

        /// Header as 160 hex characters
        #[arg(long)]
        header: String,
    },

    /// Search for a nonce whose digest meets the difficulty
    Scan {
        #[command(flatten)]
        chain: ChainArgs,

        /// Header as 160 hex characters
        #[arg(long)]
        header: String,

        /// Target difficulty: zero bits at the top of the little-endian digest,
        /// counted from its last byte
        #[arg(short, long, default_value = "16", conflicts_with = "header_bits")]
        difficulty: u32,

        /// Use the compact target stored in the header instead of --difficulty
        #[arg(long)]
        header_bits: bool,

        /// Number of threads to use (default: number of CPU cores)
        #[arg(short, long)]
        threads: Option<usize>,

        /// First nonce to try
        #[arg(long, default_value = "0")]
        start: u32,

        /// Number of nonces to try
        #[arg(long, default_value_t = 1u64 << 32)]
        count: u64,
    },

    /// Run performance benchmark
    Benchmark {
        #[command(flatten)]
        chain: ChainArgs,

        /// Number of hashes to compute
        #[arg(short, long, default_value = "1000")]
        count: u32,
    },
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let config_dir = cli.config_dir.unwrap_or_else(default_config_dir);

    let result = match cli.command {
        Commands::Algorithms => cmd_algorithms(),
        Commands::Permutation {
            stages,
            base,
            timestamp,
            strategy,
        } => cmd_permutation(stages, base, timestamp, strategy.into()),
        Commands::Hash { chain, header } => cmd_hash(&chain, &config_dir, &header),
        Commands::Scan {
            chain,
            header,
            difficulty,
            header_bits,
            threads,
            start,
            count,
        } => cmd_scan(
            &chain,
            &config_dir,
            &header,
            difficulty,
            header_bits,
            threads,
            start,
            count,
        ),
        Commands::Benchmark { chain, count } => cmd_benchmark(&chain, &config_dir, count),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_spec(args: &ChainArgs, config_dir: &Path) -> anyhow::Result<ChainSpec> {
    match (&args.algo, &args.config) {
        (Some(name), _) => Ok(name.parse::<Algorithm>()?.spec()),
        (None, Some(reference)) => {
            let path = resolve_config_path(reference, config_dir);
            let config = ChainConfig::load_from_file(&path)
                .with_context(|| format!("loading {}", path.display()))?;
            Ok(config.to_spec()?)
        }
        (None, None) => anyhow::bail!("pass --algo or --config"),
    }
}

fn build_chain(args: &ChainArgs, config_dir: &Path) -> anyhow::Result<Chain> {
    let spec = load_spec(args, config_dir)?;
    let name = spec.name.clone();
    Chain::new(spec, &PrimitiveRegistry::with_builtin())
        .with_context(|| format!("building chain '{name}'"))
}

fn parse_header(hex_header: &str) -> anyhow::Result<header::Header> {
    let bytes = hex::decode(hex_header.trim()).context("header is not valid hex")?;
    let len = bytes.len();
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("header must be 80 bytes, got {len}"))
}

fn cmd_algorithms() -> anyhow::Result<()> {
    let registry = PrimitiveRegistry::with_builtin();

    for algorithm in Algorithm::ALL {
        let spec = algorithm.spec();
        let stages: Vec<_> = spec.primitives().map(|id| id.name()).collect();
        let missing = algorithm.missing(&registry);

        println!("{}", algorithm);
        match &spec.permuted {
            Some(section) => println!(
                "  {} stages, {} permuted ({:?}, base {}{})",
                spec.stage_count(),
                section.pool.len(),
                section.strategy,
                section.base_timestamp,
                if section.midstate { ", midstate" } else { "" }
            ),
            None => println!("  {} stages, fixed order", spec.stage_count()),
        }
        println!("  Primitives: {}", stages.join(", "));
        if missing.is_empty() {
            println!("  Available");
        } else {
            let names: Vec<_> = missing.iter().map(|id| id.name()).collect();
            println!("  Needs external primitives: {}", names.join(", "));
        }
    }

    Ok(())
}

fn cmd_permutation(stages: usize, base: u32, timestamp: u32, strategy: Strategy) -> anyhow::Result<()> {
    let selector = strategy.selector(base, stages)?;
    let permutation = selector.select(timestamp);

    println!("Index: {}", selector.index(timestamp));
    println!("Order: {:?}", permutation.as_slice());

    Ok(())
}

fn cmd_hash(args: &ChainArgs, config_dir: &Path, hex_header: &str) -> anyhow::Result<()> {
    let chain = build_chain(args, config_dir)?;
    let header = parse_header(hex_header)?;

    let timestamp = header::timestamp(&header);
    if let Some(permutation) = chain.permutation(timestamp) {
        println!("Order: {:?}", permutation.as_slice());
    }
    println!("{}", hex::encode(chain.hash(&header)));

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_scan(
    args: &ChainArgs,
    config_dir: &Path,
    hex_header: &str,
    difficulty: u32,
    header_bits: bool,
    threads: Option<usize>,
    start: u32,
    count: u64,
) -> anyhow::Result<()> {
    let chain = build_chain(args, config_dir)?;
    let header = parse_header(hex_header)?;

    let acceptance = if header_bits {
        let bits = header::bits(&header);
        let target = target_from_compact(bits)
            .ok_or_else(|| anyhow::anyhow!("header bits {bits:#010x} are not a valid target"))?;
        Acceptance::Target(target)
    } else {
        Acceptance::LeadingZeros(difficulty)
    };

    let num_threads = threads.unwrap_or_else(num_cpus::get);
    println!("Chain: {}", chain.name());
    println!("Threads: {}", num_threads);
    match acceptance {
        Acceptance::LeadingZeros(bits) => println!("Difficulty: {} bits", bits),
        Acceptance::Target(target) => println!("Target: {}", hex::encode(target)),
    }

    let outcome = Scanner::new(num_threads, acceptance).scan(&chain, &header, start, count);

    match outcome.solution {
        Some(solution) => {
            println!("\nFound valid hash!");
            println!("Hash: {}", hex::encode(solution.digest));
            println!("Nonce: {}", solution.nonce);
        }
        None => println!("\nNo solution in {} nonces", count),
    }
    println!("Hashes computed: {}", outcome.hashes);
    println!("Hashrate: {:.2} H/s", outcome.hashrate());

    Ok(())
}

fn cmd_benchmark(args: &ChainArgs, config_dir: &Path, count: u32) -> anyhow::Result<()> {
    let chain = build_chain(args, config_dir)?;
    println!("Running benchmark of '{}' with {} hashes...", chain.name(), count);

    let mut header = [0u8; 80];
    header::set_timestamp(&mut header, TIMETRAVEL_BASE_TIMESTAMP);

    let start = Instant::now();
    for nonce in 0..count {
        header::set_nonce(&mut header, nonce);
        let _ = chain.hash(&header);
    }
    let single = start.elapsed();

    let prepared = chain.prepare(&header);
    let start = Instant::now();
    for nonce in 0..count {
        let _ = prepared.hash_nonce(nonce);
    }
    let reused = start.elapsed();

    println!("\nResults:");
    println!("  Total hashes: {}", count);
    println!(
        "  Fresh header: {:.2}s ({:.2} H/s)",
        single.as_secs_f64(),
        count as f64 / single.as_secs_f64()
    );
    println!(
        "  Prepared header: {:.2}s ({:.2} H/s)",
        reused.as_secs_f64(),
        count as f64 / reused.as_secs_f64()
    );

    println!("\nChain parameters:");
    println!("  Stages: {}", chain.stage_count());
    println!("  Permuted stages: {}", chain.permuted_stages());

    Ok(())
}
