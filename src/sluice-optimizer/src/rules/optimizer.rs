//! The optimizer that applies rules to operator DAGs.
//!
//! The optimizer applies rules in a fixed-point iteration until no more
//! changes occur or a maximum number of iterations is reached. Every rule
//! application is transactional.

use common_config::OptimizerSettings;
use common_error::{SluiceError, SluiceResult};
use log::debug;
use sluice_dag::{Dag, annotate, explain};

use super::rule::{OptimizationRule, OptimizedDag, RuleTrace};
use super::{PredicatePushdown, ProjectionFusion};

/// Configuration for the optimizer.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Maximum number of iterations before stopping.
    pub max_iterations: usize,
    /// Whether to record explain text around every applied rule.
    pub enable_trace: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            enable_trace: false,
        }
    }
}

impl OptimizerConfig {
    /// Create a new config with the given max iterations.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// Enable or disable tracing.
    pub fn with_trace(mut self, enable: bool) -> Self {
        self.enable_trace = enable;
        self
    }
}

impl From<&OptimizerSettings> for OptimizerConfig {
    fn from(settings: &OptimizerSettings) -> Self {
        Self {
            max_iterations: settings.max_iterations,
            enable_trace: settings.enable_trace,
        }
    }
}

/// Rules run at an optimization level, in order.
///
/// Level 0 runs nothing, level 1 pushes predicates down and level 2 and above
/// also fuse projections.
pub fn rules_for_level(level: u32) -> Vec<Box<dyn OptimizationRule>> {
    let mut rules: Vec<Box<dyn OptimizationRule>> = Vec::new();
    if level >= 1 {
        rules.push(Box::new(PredicatePushdown));
    }
    if level >= 2 {
        rules.push(Box::new(ProjectionFusion));
    }
    rules
}

/// The main optimizer that applies rules to operator DAGs.
pub struct Optimizer {
    /// The rules to apply (in order).
    rules: Vec<Box<dyn OptimizationRule>>,
    /// Configuration.
    config: OptimizerConfig,
}

impl Optimizer {
    /// Create a new optimizer with the given rules.
    pub fn new(rules: Vec<Box<dyn OptimizationRule>>) -> Self {
        Self {
            rules,
            config: OptimizerConfig::default(),
        }
    }

    /// Create a new optimizer with custom config.
    pub fn with_config(rules: Vec<Box<dyn OptimizationRule>>, config: OptimizerConfig) -> Self {
        Self { rules, config }
    }

    /// The rules of optimization level `level`.
    pub fn for_level(level: u32) -> Self {
        Self::new(rules_for_level(level))
    }

    /// Optimizer described by the `optimizer` section of the configuration.
    pub fn from_settings(settings: &OptimizerSettings) -> Self {
        Self::with_config(rules_for_level(settings.level), settings.into())
    }

    /// Add a rule to the optimizer.
    pub fn add_rule<R: OptimizationRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Optimize a DAG.
    ///
    /// The input is validated and never modified; the result is a validated,
    /// annotated copy. Rules are applied in fixed-point iteration until no
    /// rule changes the DAG.
    pub fn optimize(&self, dag: &Dag) -> SluiceResult<OptimizedDag> {
        let mut current = dag.clone();
        current.validate()?;
        annotate(&mut current)?;

        let mut iterations = 0;
        let mut total_rules_applied = 0;
        let mut trace = Vec::new();

        loop {
            if iterations >= self.config.max_iterations {
                debug!(
                    "Optimizer reached max iterations ({}), stopping",
                    self.config.max_iterations
                );
                break;
            }

            iterations += 1;
            let mut changed_this_iteration = false;

            for rule in &self.rules {
                let before = self.config.enable_trace.then(|| explain(&current));

                if apply_rule(rule.as_ref(), &mut current)? {
                    changed_this_iteration = true;
                    total_rules_applied += 1;

                    debug!("Rule '{}' applied in iteration {}", rule.name(), iterations);

                    if let Some(before) = before {
                        trace.push(RuleTrace::new(rule.name(), before, explain(&current)));
                    }
                }
            }

            if !changed_this_iteration {
                debug!("No changes in iteration {}, reached fixpoint", iterations);
                break;
            }
        }

        Ok(OptimizedDag {
            dag: current,
            iterations,
            rules_applied: total_rules_applied,
            trace,
        })
    }
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::for_level(1)
    }
}

/// Apply one rule transactionally.
///
/// The rule runs on a copy of `dag`; the copy replaces `dag` only if it
/// validates and annotates. Returns whether the DAG changed. When the rewrite
/// breaks an invariant the result is `InvalidRewrite` and `dag` is untouched.
pub fn apply_rule(rule: &dyn OptimizationRule, dag: &mut Dag) -> SluiceResult<bool> {
    let mut candidate = dag.clone();
    if !rule.apply(&mut candidate)?.changed {
        return Ok(false);
    }
    candidate
        .validate()
        .and_then(|()| annotate(&mut candidate))
        .map_err(|e| SluiceError::invalid_rewrite(rule.name(), e.to_string()))?;
    *dag = candidate;
    Ok(true)
}
