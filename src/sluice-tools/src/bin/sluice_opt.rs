//! sluice-opt - optimize a wire-format DAG
//!
//! # Usage
//!
//! ```bash
//! sluice-opt --input plan.json --output optimized.json -O 2 --explain
//! ```
//!
//! Without `--input` the DAG is read from stdin; without `--output` the
//! optimized DAG is written to stdout. `--explain` prints the DAG before and
//! after optimization, plus the rule trace, to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use common_error::SluiceResult;
use sluice_tools::{explain_report, load_config, optimize, read_dag, write_text};

/// sluice-opt CLI.
#[derive(Parser, Debug)]
#[command(name = "sluice-opt")]
#[command(about = "Optimize a Sluice operator DAG")]
#[command(version)]
struct Args {
    /// Input DAG (wire format); stdin if omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file; stdout if omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Optimization level, overrides the configuration file
    #[arg(short = 'O', long = "optimization-level")]
    optimization_level: Option<u32>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the DAG before and after optimization to stderr
    #[arg(long)]
    explain: bool,
}

fn run(args: &Args) -> SluiceResult<()> {
    let mut config = load_config(args.config.as_deref(), args.optimization_level)?;
    if args.explain {
        config.optimizer.enable_trace = true;
    }

    let dag = read_dag(args.input.as_deref())?;
    let optimized = optimize(&dag, &config)?;
    log::info!(
        "{} iteration(s), {} rule application(s)",
        optimized.iterations,
        optimized.rules_applied
    );
    if args.explain {
        eprintln!("{}", explain_report(&dag, &optimized));
    }
    write_text(args.output.as_deref(), &optimized.dag.to_json()?)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sluice-opt: {e}");
            ExitCode::FAILURE
        }
    }
}
