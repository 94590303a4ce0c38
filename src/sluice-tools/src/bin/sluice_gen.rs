//! sluice-gen - generate the C++ execution plan for a wire-format DAG
//!
//! # Usage
//!
//! ```bash
//! sluice-gen --input plan.json --output-dir build/plan -O 1
//! ```
//!
//! The DAG is optimized first, then `execute.cpp` and `execute.h` (or the
//! names the configuration file gives) are written to the output directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use common_error::SluiceResult;
use sluice_tools::{generate_into, load_config, read_dag};

/// sluice-gen CLI.
#[derive(Parser, Debug)]
#[command(name = "sluice-gen")]
#[command(about = "Generate a fused C++ execution plan from a Sluice operator DAG")]
#[command(version)]
struct Args {
    /// Input DAG (wire format); stdin if omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory receiving the generated source and header
    #[arg(long)]
    output_dir: PathBuf,

    /// Optimization level, overrides the configuration file
    #[arg(short = 'O', long = "optimization-level")]
    optimization_level: Option<u32>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

fn run(args: &Args) -> SluiceResult<()> {
    let config = load_config(args.config.as_deref(), args.optimization_level)?;
    let dag = read_dag(args.input.as_deref())?;
    let (source, header) = generate_into(&dag, &config, &args.output_dir)?;
    println!("{}", source.display());
    println!("{}", header.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("sluice-gen: {e}");
            ExitCode::FAILURE
        }
    }
}
