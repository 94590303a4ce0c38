//! Optimization rule trait and framework.
//!
//! This module defines the core abstraction for optimization rules and the
//! result types the optimizer reports.

use common_error::SluiceResult;
use sluice_dag::Dag;

/// A single rewrite over an operator DAG.
///
/// A rule mutates the DAG it is given. The optimizer always hands it a
/// validated, annotated working copy and only keeps the result if the copy
/// still validates afterwards, so a rule never has to undo partial work.
pub trait OptimizationRule: Send + Sync {
    /// Get the name of this rule.
    fn name(&self) -> &'static str;

    /// Get a description of what this rule does.
    fn description(&self) -> &'static str {
        "No description available"
    }

    /// Apply this rule, reporting whether the DAG changed.
    fn apply(&self, dag: &mut Dag) -> SluiceResult<Transformed>;
}

/// Whether applying a rule changed the DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transformed {
    pub changed: bool,
}

impl Transformed {
    pub const fn yes() -> Self {
        Self { changed: true }
    }

    pub const fn no() -> Self {
        Self { changed: false }
    }
}

impl From<bool> for Transformed {
    fn from(changed: bool) -> Self {
        Self { changed }
    }
}

/// A trace entry for a single rule application.
#[derive(Debug, Clone)]
pub struct RuleTrace {
    /// The name of the rule that was applied.
    pub rule_name: String,
    /// The DAG before the rule was applied (as explain string).
    pub before: String,
    /// The DAG after the rule was applied (as explain string).
    pub after: String,
}

impl RuleTrace {
    pub fn new(
        rule_name: impl Into<String>,
        before: impl Into<String>,
        after: impl Into<String>,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            before: before.into(),
            after: after.into(),
        }
    }
}

/// The result of optimization with optional trace information.
#[derive(Debug, Clone)]
pub struct OptimizedDag {
    /// The final, validated and annotated DAG.
    pub dag: Dag,
    /// Number of optimization iterations performed.
    pub iterations: usize,
    /// Number of rule applications that changed the DAG.
    pub rules_applied: usize,
    /// Rule applications, recorded only when tracing is enabled.
    pub trace: Vec<RuleTrace>,
}

impl OptimizedDag {
    pub fn new(dag: Dag) -> Self {
        Self {
            dag,
            iterations: 0,
            rules_applied: 0,
            trace: Vec::new(),
        }
    }

    /// Format the trace as a human-readable string.
    pub fn format_trace(&self) -> String {
        let mut output = format!(
            "Optimization completed in {} iterations, {} rules applied\n",
            self.iterations, self.rules_applied
        );

        if self.trace.is_empty() {
            output.push_str("  (no trace available)\n");
        } else {
            for (i, entry) in self.trace.iter().enumerate() {
                output.push_str(&format!(
                    "\n--- Rule {} applied: {} ---\n",
                    i + 1,
                    entry.rule_name
                ));
                output.push_str("Before:\n");
                output.push_str(&common_display::indent(&entry.before, "  "));
                output.push_str("\nAfter:\n");
                output.push_str(&common_display::indent(&entry.after, "  "));
                output.push('\n');
            }
        }

        output
    }
}
