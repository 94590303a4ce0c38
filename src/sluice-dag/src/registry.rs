//! Operator registry consulted by the wire-format parser.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};

use common_error::{SluiceError, SluiceResult};

use crate::dag::Dag;
use crate::ops::OperatorKind;

/// Builds an operator kind from the configuration fields of a record.
///
/// The registry is passed along so that operators with inner DAGs can parse
/// them with the same set of tags.
pub type OperatorFactory = fn(&Map<String, Json>, &OperatorRegistry) -> SluiceResult<OperatorKind>;

/// Maps wire tags to operator factories.
#[derive(Clone)]
pub struct OperatorRegistry {
    factories: IndexMap<String, OperatorFactory>,
}

impl OperatorRegistry {
    /// A registry without any operators.
    pub fn empty() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Register `factory` under `tag`, returning the factory it replaces.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        factory: OperatorFactory,
    ) -> Option<OperatorFactory> {
        self.factories.insert(tag.into(), factory)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build and validate the operator registered under `tag`.
    pub fn build(&self, tag: &str, config: &Map<String, Json>) -> SluiceResult<OperatorKind> {
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| SluiceError::unknown_operator(tag))?;
        let kind = factory(config, self).map_err(|e| match e {
            SluiceError::Parse(msg) => SluiceError::parse(format!("'{tag}': {msg}")),
            other => other,
        })?;
        kind.validate_config()?;
        Ok(kind)
    }
}

impl Default for OperatorRegistry {
    /// All built-in operators, plus `range_source` as an alias of `range`.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("range", |c, _| config(c).map(OperatorKind::Range));
        registry.register("range_source", |c, _| config(c).map(OperatorKind::Range));
        registry.register("constant_tuple", |c, _| {
            config(c).map(OperatorKind::ConstantTuple)
        });
        registry.register("parameter_lookup", |c, _| {
            config(c).map(OperatorKind::ParameterLookup)
        });
        registry.register("row_scan", |c, _| config(c).map(OperatorKind::RowScan));
        registry.register("filter", |c, _| config(c).map(OperatorKind::Filter));
        registry.register("map", |c, _| config(c).map(OperatorKind::Map));
        registry.register("projection", |c, _| config(c).map(OperatorKind::Projection));
        registry.register("reduce", |c, _| config(c).map(OperatorKind::Reduce));
        registry.register("reduce_by_key", |c, _| {
            config(c).map(OperatorKind::ReduceByKey)
        });
        registry.register("group_by", |c, _| config(c).map(OperatorKind::GroupBy));
        registry.register("join", |c, _| config(c).map(OperatorKind::Join));
        registry.register("cartesian", |c, _| config(c).map(OperatorKind::Cartesian));
        registry.register("partition", |c, _| config(c).map(OperatorKind::Partition));
        registry.register("materialize_row_vector", |c, _| {
            config(c).map(OperatorKind::MaterializeRowVector)
        });
        registry.register("ensure_single_tuple", |c, _| {
            config(c).map(OperatorKind::EnsureSingleTuple)
        });
        registry.register("pipeline", pipeline);
        registry
    }
}

impl std::fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("tags", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Deserialize an operator configuration struct from record fields.
pub fn config<T: DeserializeOwned>(fields: &Map<String, Json>) -> SluiceResult<T> {
    serde_json::from_value(Json::Object(fields.clone()))
        .map_err(|e| SluiceError::parse(format!("invalid configuration: {e}")))
}

fn pipeline(fields: &Map<String, Json>, registry: &OperatorRegistry) -> SluiceResult<OperatorKind> {
    let num_inputs = fields
        .get("num_inputs")
        .and_then(Json::as_u64)
        .ok_or_else(|| SluiceError::parse("pipeline needs an integer 'num_inputs'"))?;
    let inner = fields
        .get("inner_dag")
        .ok_or_else(|| SluiceError::parse("pipeline needs an 'inner_dag'"))?;
    let num_inputs = usize::try_from(num_inputs)
        .map_err(|_| SluiceError::parse(format!("num_inputs {num_inputs} is too large")))?;
    let inner_dag = Dag::from_json_value_with_registry(inner, registry)?;
    Ok(OperatorKind::pipeline(num_inputs, inner_dag))
}
