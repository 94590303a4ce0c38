//! Sluice command-line tools.
//!
//! # Available Binaries
//!
//! - **`sluice-opt`**: read a wire-format DAG, optimize it and write it back
//! - **`sluice-gen`**: read a wire-format DAG, optimize it and write
//!   `execute.cpp` / `execute.h`
//!
//! # Usage
//!
//! ```bash
//! cargo run --package sluice-tools --bin sluice-opt -- -i plan.json -O 2 --explain
//! cargo run --package sluice-tools --bin sluice-gen -- -i plan.json --output-dir out/
//! ```
//!
//! Both tools read `--config` first and let command-line flags override it.
//! Set `RUST_LOG=debug` to see pass applications.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use common_config::SluiceConfig;
use common_error::SluiceResult;
use sluice_codegen::CodeGenerator;
use sluice_dag::{Dag, explain};
use sluice_optimizer::{OptimizedDag, Optimizer};

/// Load the configuration file if one is given, then apply the
/// optimization level override.
pub fn load_config(path: Option<&Path>, level: Option<u32>) -> SluiceResult<SluiceConfig> {
    let config = match path {
        Some(path) => SluiceConfig::from_file(path)?,
        None => SluiceConfig::default(),
    };
    Ok(match level {
        Some(level) => config.with_optimization_level(level),
        None => config,
    })
}

/// Read a wire-format DAG from `input`, or from stdin.
pub fn read_dag(input: Option<&Path>) -> SluiceResult<Dag> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    Dag::from_json(&text)
}

/// Write `text` to `output`, or to stdout.
pub fn write_text(output: Option<&Path>, text: &str) -> SluiceResult<()> {
    match output {
        Some(path) => {
            std::fs::write(path, text)?;
            log::info!("wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Optimize `dag` with the passes of the configured level.
pub fn optimize(dag: &Dag, config: &SluiceConfig) -> SluiceResult<OptimizedDag> {
    let optimizer = Optimizer::from_settings(&config.optimizer);
    log::debug!(
        "optimizing at level {} with {:?}",
        config.optimizer.level,
        optimizer.rule_names()
    );
    optimizer.optimize(dag)
}

/// Before/after explain text plus the rule trace, if one was recorded.
pub fn explain_report(before: &Dag, optimized: &OptimizedDag) -> String {
    let mut report = format!(
        "Input DAG:\n{}\nOptimized DAG:\n{}\n",
        explain(before),
        explain(&optimized.dag)
    );
    if !optimized.trace.is_empty() {
        report.push('\n');
        report.push_str(&optimized.format_trace());
    }
    report
}

/// Optimize `dag` and write the generated source and header into `out_dir`.
pub fn generate_into(dag: &Dag, config: &SluiceConfig, out_dir: &Path) -> SluiceResult<(PathBuf, PathBuf)> {
    let optimized = optimize(dag, config)?;
    let code = CodeGenerator::new(config.codegen.clone()).generate(&optimized.dag)?;
    code.write_to(out_dir)
}
