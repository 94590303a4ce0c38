//! Human-readable DAG rendering.

use std::collections::BTreeSet;

use common_display::{DisplayTree, TreeNode, format_set};

use crate::dag::{Dag, OperatorId};

/// One rendered operator and its producers.
struct ExplainNode {
    name: String,
    details: Option<String>,
    annotations: Vec<String>,
    children: Vec<ExplainNode>,
}

impl TreeNode for ExplainNode {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn children(&self) -> Vec<&dyn TreeNode> {
        self.children.iter().map(|c| c as &dyn TreeNode).collect()
    }

    fn details(&self) -> Option<String> {
        self.details.clone()
    }

    fn annotations(&self) -> Vec<String> {
        self.annotations.clone()
    }
}

/// Render `dag` as a tree rooted at its sink.
///
/// Each node shows the operator configuration and, once the DAG is
/// annotated, its columns and read/write/dead sets. An operator feeding
/// several consumers is expanded once and referenced afterwards. Pipelines
/// list their inner DAG as an extra child.
pub fn explain(dag: &Dag) -> String {
    let root = explain_level(dag, "dag");
    DisplayTree::new(&root).to_string()
}

fn explain_level(dag: &Dag, label: &str) -> ExplainNode {
    let mut expanded = BTreeSet::new();
    let roots: Vec<OperatorId> = match dag.sink() {
        Some(sink) => vec![sink],
        None => dag
            .operator_ids()
            .into_iter()
            .filter(|id| dag.successors(*id).is_empty())
            .collect(),
    };
    let mut children: Vec<ExplainNode> = roots
        .into_iter()
        .map(|id| explain_operator(dag, id, &mut expanded))
        .collect();

    if children.len() == 1 && label == "dag" {
        return children.remove(0);
    }
    ExplainNode {
        name: label.to_string(),
        details: None,
        annotations: Vec::new(),
        children,
    }
}

fn explain_operator(dag: &Dag, id: OperatorId, expanded: &mut BTreeSet<OperatorId>) -> ExplainNode {
    let Some(op) = dag.operator(id) else {
        return ExplainNode {
            name: format!("<missing {id}>"),
            details: None,
            annotations: Vec::new(),
            children: Vec::new(),
        };
    };
    if !expanded.insert(id) {
        return ExplainNode {
            name: op.name(),
            details: Some("shared".to_string()),
            annotations: Vec::new(),
            children: Vec::new(),
        };
    }

    let mut annotations = Vec::new();
    if !op.fields.is_empty() {
        let columns = op.fields.iter().map(|f| match f.column_id() {
            Some(column) => format!("{}={column}: {}", f.name, f.field_type),
            None => format!("{}: {}", f.name, f.field_type),
        });
        annotations.push(format!("columns: [{}]", columns.collect::<Vec<_>>().join(", ")));
    }
    for (label, set) in [
        ("reads", &op.read_set),
        ("writes", &op.write_set),
        ("dead", &op.dead_set),
    ] {
        if !set.is_empty() {
            annotations.push(format!("{label}: {}", format_set(set)));
        }
    }

    let mut children: Vec<ExplainNode> = dag
        .predecessors(id)
        .into_iter()
        .map(|p| explain_operator(dag, p, expanded))
        .collect();
    if let Some(inner) = op.kind.inner_dag() {
        children.push(explain_level(inner, "inner"));
    }

    ExplainNode {
        name: op.name(),
        details: Some(op.kind.to_string()),
        annotations,
        children,
    }
}
