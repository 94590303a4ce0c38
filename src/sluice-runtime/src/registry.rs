//! Thread-safe, append-only plan registry.

use std::sync::Arc;

use common_config::RuntimeSettings;
use common_error::{SluiceError, SluiceResult};
use parking_lot::RwLock;
use serde_json::Value as Json;
use sluice_core::{Tuple, TupleType, Value};
use sluice_dag::Dag;

use crate::evaluate::EvaluatedPlan;
use crate::plan::{Plan, PlanId};

/// Registered plans, indexed by [`PlanId`].
///
/// Registration takes the write lock; lookups hold the read lock only long
/// enough to clone the plan's `Arc`, so executions never block each other or
/// a concurrent registration.
#[derive(Default)]
pub struct PlanRegistry {
    plans: RwLock<Vec<Arc<dyn Plan>>>,
    max_plans: Option<usize>,
}

impl PlanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &RuntimeSettings) -> Self {
        Self {
            plans: RwLock::new(Vec::new()),
            max_plans: settings.max_plans,
        }
    }

    /// Register a plan, returning its id.
    pub fn register<P: Plan + 'static>(&self, plan: P) -> SluiceResult<PlanId> {
        self.register_arc(Arc::new(plan))
    }

    pub fn register_arc(&self, plan: Arc<dyn Plan>) -> SluiceResult<PlanId> {
        let mut plans = self.plans.write();
        if let Some(max) = self.max_plans {
            if plans.len() >= max {
                return Err(SluiceError::invalid_parameter(format!(
                    "plan registry is full ({max} plans)"
                )));
            }
        }
        let id = plans.len();
        plans.push(plan);
        log::debug!("registered plan {id}");
        Ok(id)
    }

    pub fn get(&self, id: PlanId) -> SluiceResult<Arc<dyn Plan>> {
        self.plans
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SluiceError::invalid_parameter(format!("unknown plan {id}")))
    }

    pub fn len(&self) -> usize {
        self.plans.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.read().is_empty()
    }

    /// Execute plan `id` on JSON inputs.
    ///
    /// `inputs_json` is an array with one tuple per plan input, each a JSON
    /// array of field values. The result is a JSON array of the result
    /// elements, each an array of its fields.
    pub fn execute(&self, id: PlanId, inputs_json: &str) -> SluiceResult<String> {
        let plan = self.get(id)?;
        let inputs = parse_inputs(inputs_json, plan.input_types())?;
        let result = plan.execute(&inputs)?;
        log::debug!("plan {id} returned {} element(s)", result.len());
        Ok(Json::Array(result.iter().map(Value::to_json).collect()).to_string())
    }
}

impl std::fmt::Debug for PlanRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanRegistry")
            .field("plans", &self.len())
            .field("max_plans", &self.max_plans)
            .finish()
    }
}

fn parse_inputs(inputs_json: &str, types: &[TupleType]) -> SluiceResult<Vec<Tuple>> {
    let json: Json = serde_json::from_str(inputs_json)
        .map_err(|e| SluiceError::parse(format!("invalid plan inputs: {e}")))?;
    let items = json
        .as_array()
        .ok_or_else(|| SluiceError::parse("plan inputs must be a JSON array"))?;
    if items.len() != types.len() {
        return Err(SluiceError::invalid_parameter(format!(
            "plan expects {} input(s), got {}",
            types.len(),
            items.len()
        )));
    }
    items
        .iter()
        .zip(types)
        .map(|(item, t)| Tuple::from_json(item, t))
        .collect()
}

/// Register `dag` as an evaluated plan.
pub fn register_plan(registry: &PlanRegistry, dag: Dag) -> SluiceResult<PlanId> {
    registry.register(EvaluatedPlan::new(dag)?)
}

/// Execute a registered plan on JSON inputs.
pub fn execute_plan(registry: &PlanRegistry, id: PlanId, inputs_json: &str) -> SluiceResult<String> {
    registry.execute(id, inputs_json)
}
