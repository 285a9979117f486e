//! lanepack command-line front end.
//!
//! Reads a JSON packing request, runs the packer and writes a JSON response.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use lanepack::{
    Config, OverflowPolicy, Packer, PackingRequest, PackingResponse, PositionConvention, Strategy,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lanepack")]
#[command(about = "Group-aware 3D bin packing")]
#[command(version)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a request file
    Pack {
        /// Path to the JSON request
        request: PathBuf,

        /// Output file for the response (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Placement strategy (overrides the request)
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Overflow policy (overrides the request)
        #[arg(long, value_enum)]
        overflow_policy: Option<OverflowArg>,

        /// Reported position convention (overrides the request)
        #[arg(long, value_enum)]
        position: Option<PositionArg>,

        /// Optimizer seed
        #[arg(long)]
        seed: Option<u64>,

        /// Optimizer iteration budget
        #[arg(short, long)]
        iterations: Option<u64>,

        /// Parallel optimizer restarts per lane
        #[arg(short, long, default_value = "1")]
        restarts: usize,
    },

    /// Check a request file without packing it
    Validate {
        /// Path to the JSON request
        request: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    /// BLF searched by simulated annealing
    BlfAnnealing,
    /// Single BLF pass
    Blf,
    /// Uniform slot lattice
    GridStack,
    /// Greedy rows and layers
    RowFill,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::BlfAnnealing => Strategy::BlfAnnealing,
            StrategyArg::Blf => Strategy::Blf,
            StrategyArg::GridStack => Strategy::GridStack,
            StrategyArg::RowFill => Strategy::RowFill,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OverflowArg {
    /// Borrow from a neighbor, then spill
    BorrowFirst,
    /// Spill, then borrow from a neighbor
    SpillFirst,
    /// Leave failed items unplaced
    Disabled,
}

impl From<OverflowArg> for OverflowPolicy {
    fn from(arg: OverflowArg) -> Self {
        match arg {
            OverflowArg::BorrowFirst => OverflowPolicy::BorrowFirst,
            OverflowArg::SpillFirst => OverflowPolicy::SpillFirst,
            OverflowArg::Disabled => OverflowPolicy::Disabled,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum PositionArg {
    /// Min corner of each box
    MinCorner,
    /// Center of each box
    Center,
}

impl From<PositionArg> for PositionConvention {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::MinCorner => PositionConvention::MinCorner,
            PositionArg::Center => PositionConvention::Center,
        }
    }
}

fn read_request(path: &Path) -> Result<PackingRequest> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read request: {}", path.display()))?;
    PackingRequest::from_json(&json)
        .with_context(|| format!("Failed to parse request: {}", path.display()))
}

fn write_response(response: &PackingResponse, output: Option<&Path>) -> Result<()> {
    let json = response.to_json()?;
    match output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("Failed to write response: {}", path.display()))?;
            println!("Response saved to: {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Pack {
            request,
            output,
            strategy,
            overflow_policy,
            position,
            seed,
            iterations,
            restarts,
        } => {
            let mut packing_request = read_request(&request)?;
            if let Some(strategy) = strategy {
                packing_request.strategy = Some(strategy.into());
            }
            if let Some(policy) = overflow_policy {
                packing_request.overflow_policy = Some(policy.into());
            }
            if let Some(position) = position {
                packing_request.position_convention = Some(position.into());
            }
            if seed.is_some() {
                packing_request.seed = seed;
            }
            if iterations.is_some() {
                packing_request.max_iterations = iterations;
            }

            let packer = Packer::new(Config::default().with_restarts(restarts));
            let convention = packing_request
                .apply_overrides(packer.config().clone())
                .position_convention;

            match packer.pack(&packing_request) {
                Ok(result) => {
                    log::info!("{}", result.summary());
                    let response = PackingResponse::from_result(&result, convention);
                    write_response(&response, output.as_deref())?;
                }
                Err(err) => {
                    write_response(&PackingResponse::error(&err), output.as_deref())?;
                    anyhow::bail!("Request rejected ({}): {}", err.code(), err);
                }
            }
        }

        Commands::Validate { request } => {
            let packing_request = read_request(&request)?;
            match packing_request.validate() {
                Ok(()) => println!(
                    "{}: {} items, {} groups, {} zones",
                    request.display(),
                    packing_request.items.len(),
                    packing_request.groups.len(),
                    packing_request.zones.len()
                ),
                Err(err) => anyhow::bail!("Invalid request ({}): {}", err.code(), err),
            }
        }
    }

    Ok(())
}
