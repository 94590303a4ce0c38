//! JSON wire format.
//!
//! A document is `{"dag": [record, ...], "sink": id}`. A DAG without a sink
//! is written with `"sink": null`; a document that omits the key entirely
//! gets the single operator without consumers as its sink. Each record carries
//! `id`, `op` (the registry tag), `predecessors` and the kind's configuration
//! fields. Predecessor `i` feeds input port `i`. Records are written in
//! topological order.

use std::collections::BTreeSet;

use serde_json::{Map, Value as Json, json};

use common_error::{SluiceError, SluiceResult, parse_err};

use crate::dag::{Dag, OperatorId};
use crate::ops::OperatorKind;
use crate::registry::OperatorRegistry;
use crate::traversal::topological_order;

const RESERVED_KEYS: [&str; 3] = ["id", "op", "predecessors"];

impl Dag {
    /// Serialize to a pretty-printed JSON document.
    pub fn to_json(&self) -> SluiceResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_json_value()?)?)
    }

    pub fn to_json_value(&self) -> SluiceResult<Json> {
        let mut records = Vec::with_capacity(self.len());
        for id in topological_order(self)? {
            let op = self.get(id)?;
            let mut record = Map::new();
            record.insert("id".into(), json!(id));
            record.insert("op".into(), json!(op.kind.tag()));
            record.insert("predecessors".into(), json!(self.predecessors(id)));
            record.extend(kind_config(&op.kind)?);
            records.push(Json::Object(record));
        }

        let mut doc = Map::new();
        doc.insert("dag".into(), Json::Array(records));
        doc.insert("sink".into(), json!(self.sink()));
        Ok(Json::Object(doc))
    }

    /// Parse a document using the built-in operators.
    pub fn from_json(text: &str) -> SluiceResult<Dag> {
        Self::from_json_with_registry(text, &OperatorRegistry::default())
    }

    pub fn from_json_with_registry(text: &str, registry: &OperatorRegistry) -> SluiceResult<Dag> {
        let doc: Json = serde_json::from_str(text)
            .map_err(|e| SluiceError::parse(format!("malformed DAG document: {e}")))?;
        Self::from_json_value_with_registry(&doc, registry)
    }

    /// Parse an already decoded document. Nothing is returned unless the
    /// whole document parses.
    pub fn from_json_value_with_registry(doc: &Json, registry: &OperatorRegistry) -> SluiceResult<Dag> {
        let Some(records) = doc.get("dag").and_then(Json::as_array) else {
            parse_err!("DAG document needs a 'dag' array");
        };

        let mut dag = Dag::new();
        let mut wiring = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let Some(record) = record.as_object() else {
                parse_err!("record {index} is not an object");
            };
            let id = match record.get("id") {
                None => index,
                Some(value) => as_id(value, "id")?,
            };
            if dag.contains(id) {
                parse_err!("duplicate operator id {id}");
            }
            let Some(tag) = record.get("op").and_then(Json::as_str) else {
                parse_err!("record {index} needs a string 'op'");
            };
            let predecessors = match record.get("predecessors") {
                None => Vec::new(),
                Some(Json::Array(items)) => items
                    .iter()
                    .map(|p| as_id(p, "predecessor"))
                    .collect::<SluiceResult<Vec<_>>>()?,
                Some(_) => parse_err!("'predecessors' of operator {id} is not an array"),
            };
            let config: Map<String, Json> = record
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();

            let kind = registry.build(tag, &config)?;
            dag.add_operator_with_id(id, kind)?;
            wiring.push((id, predecessors));
        }

        for (id, predecessors) in wiring {
            if let Some(unknown) = predecessors.iter().find(|p| !dag.contains(**p)) {
                parse_err!("operator {id} names unknown predecessor {unknown}");
            }
            let op = dag.get(id)?;
            if predecessors.len() != op.num_in_ports() {
                return Err(SluiceError::invalid_port(format!(
                    "{} has {} input port(s) but {} predecessor(s)",
                    op.name(),
                    op.num_in_ports(),
                    predecessors.len()
                )));
            }
            for (port, source) in predecessors.into_iter().enumerate() {
                dag.add_edge(source, 0, id, port)?;
            }
        }

        let sink = match doc.get("sink") {
            Some(Json::Null) => None,
            Some(value) => {
                let sink = as_id(value, "sink")?;
                if !dag.contains(sink) {
                    parse_err!("sink {sink} is not an operator of the DAG");
                }
                Some(sink)
            }
            None => Some(implicit_sink(&dag)?),
        };
        if let Some(sink) = sink {
            dag.set_sink(sink)?;
        }
        log::debug!("parsed DAG with {} operators, sink {sink:?}", dag.len());
        Ok(dag)
    }
}

fn as_id(value: &Json, what: &str) -> SluiceResult<OperatorId> {
    value
        .as_u64()
        .and_then(|id| OperatorId::try_from(id).ok())
        .ok_or_else(|| SluiceError::parse(format!("{what} must be a non-negative integer, got {value}")))
}

fn implicit_sink(dag: &Dag) -> SluiceResult<OperatorId> {
    let producers: BTreeSet<OperatorId> = dag.edges().iter().map(|e| e.source).collect();
    let candidates: Vec<OperatorId> = dag
        .operator_ids()
        .into_iter()
        .filter(|id| !producers.contains(id))
        .collect();
    match candidates.as_slice() {
        [sink] => Ok(*sink),
        [] => parse_err!("DAG has no operator without consumers"),
        _ => parse_err!(
            "DAG has {} operators without consumers and no explicit 'sink'",
            candidates.len()
        ),
    }
}

/// Configuration fields of a kind, as written into its record.
fn kind_config(kind: &OperatorKind) -> SluiceResult<Map<String, Json>> {
    let value = match kind {
        OperatorKind::Range(op) => serde_json::to_value(op)?,
        OperatorKind::ConstantTuple(op) => serde_json::to_value(op)?,
        OperatorKind::ParameterLookup(op) => serde_json::to_value(op)?,
        OperatorKind::RowScan(op) => serde_json::to_value(op)?,
        OperatorKind::Filter(op) => serde_json::to_value(op)?,
        OperatorKind::Map(op) => serde_json::to_value(op)?,
        OperatorKind::Projection(op) => serde_json::to_value(op)?,
        OperatorKind::Reduce(op) => serde_json::to_value(op)?,
        OperatorKind::ReduceByKey(op) => serde_json::to_value(op)?,
        OperatorKind::GroupBy(op) => serde_json::to_value(op)?,
        OperatorKind::Join(op) => serde_json::to_value(op)?,
        OperatorKind::Cartesian(op) => serde_json::to_value(op)?,
        OperatorKind::Partition(op) => serde_json::to_value(op)?,
        OperatorKind::MaterializeRowVector(op) => serde_json::to_value(op)?,
        OperatorKind::EnsureSingleTuple(op) => serde_json::to_value(op)?,
        OperatorKind::Pipeline(op) => json!({
            "num_inputs": op.num_inputs,
            "inner_dag": op.inner_dag.to_json_value()?,
        }),
    };
    match value {
        Json::Object(map) => Ok(map),
        other => Err(SluiceError::internal(format!(
            "{} configuration serialized to {other}",
            kind.tag()
        ))),
    }
}
