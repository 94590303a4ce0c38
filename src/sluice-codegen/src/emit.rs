//! Per-operator code emission.
//!
//! [`Emitter`] is a [`DagVisitor`] driven in topological order, so every
//! operator's predecessors already have a generated variable when the
//! operator is visited. Each operator appends one statement declaring its
//! variable in terms of those predecessors.

use std::collections::HashMap;

use common_error::{SluiceError, SluiceResult};
use sluice_core::{AtomicKind, FieldType, TupleType};
use sluice_dag::ops::{AggregateFunc, GroupByOp};
use sluice_dag::{Dag, DagOperator, DagTypes, DagVisitor, Expr, Literal, OperatorId, OperatorKind};

use crate::unit::{CodeUnit, Statement};

/// What later operators need to know about a generated operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorDesc {
    pub var_name: String,
    pub output_type: TupleType,
    /// Name of the declaration for `output_type`.
    pub type_name: String,
}

/// One DAG level being generated.
struct Scope<'a> {
    /// Prefix of variable names, `op_` for the outer DAG and `op_<P>_` inside
    /// pipeline `P`.
    prefix: String,
    types: &'a DagTypes,
    /// Variables bound to the pipeline's inputs, empty for the outer DAG.
    inputs: Vec<String>,
    descs: HashMap<OperatorId, OperatorDesc>,
}

impl<'a> Scope<'a> {
    fn new(prefix: String, types: &'a DagTypes, inputs: Vec<String>) -> Self {
        Self {
            prefix,
            types,
            inputs,
            descs: HashMap::new(),
        }
    }

    fn var_name(&self, id: OperatorId) -> String {
        format!("{}{id}", self.prefix)
    }

    fn is_outer(&self) -> bool {
        self.prefix == "op_"
    }
}

/// Generates a [`CodeUnit`] from a traversal of a DAG.
pub struct Emitter<'a> {
    unit: CodeUnit,
    scopes: Vec<Scope<'a>>,
}

impl<'a> Emitter<'a> {
    pub fn new(types: &'a DagTypes, emit_comments: bool) -> Self {
        Self {
            unit: CodeUnit::new(emit_comments),
            scopes: vec![Scope::new("op_".to_string(), types, Vec::new())],
        }
    }

    /// The descriptor of outer operator `id`, once it has been generated.
    pub fn desc(&self, id: OperatorId) -> Option<&OperatorDesc> {
        self.scopes.first().and_then(|scope| scope.descs.get(&id))
    }

    /// Append the driver pulling the result of `sink` and return the
    /// finished unit.
    pub fn finish(mut self, sink: OperatorId) -> SluiceResult<CodeUnit> {
        let mut result = self
            .desc(sink)
            .cloned()
            .ok_or(SluiceError::UnboundVariable { id: sink })?;

        if row_vector_element(&result.output_type).is_none() {
            // The driver reads `v0.data`, so wrap other shapes in a row vector.
            let output_type = TupleType::positional([FieldType::array(FieldType::Tuple(
                result.output_type.clone(),
            ))]);
            let type_name = self.unit.declarations.declare(&output_type);
            self.unit.include("\"operators/materialize_row_vector.hpp\"");
            self.unit.push(Statement::Comment("materialize the result".into()));
            self.unit.push(Statement::Declare {
                var: "op_result".into(),
                expr: format!(
                    "makeMaterializeRowVectorOperator<{type_name}>(&{})",
                    result.var_name
                ),
            });
            result = OperatorDesc {
                var_name: "op_result".into(),
                output_type,
                type_name,
            };
        }

        let element = row_vector_element(&result.output_type)
            .cloned()
            .ok_or_else(|| SluiceError::internal("result is not a row vector"))?;
        let mut roots = Vec::new();
        let declarations = &mut self.unit.declarations;
        let element_type = element.c_type(&mut |t| {
            let name = declarations.declare(t);
            roots.push(name.clone());
            name
        });
        self.unit.element_type = element_type;
        self.unit.element_roots = roots;

        let var = &result.var_name;
        self.unit.push(Statement::Comment("collecting the result".into()));
        for line in [
            format!("{var}.open();"),
            format!("const auto result = {var}.next().value;"),
            "auto ret = (result_type *)malloc(sizeof(result_type));".to_string(),
            "ret->data = result.v0.data;".to_string(),
            "ret->size = result.v0.shape[0];".to_string(),
            format!("{var}.close();"),
            "return ret;".to_string(),
        ] {
            self.unit.push(Statement::Line(line));
        }
        log::debug!(
            "generated {} statements, {} declarations",
            self.unit.body.len(),
            self.unit.declarations.len()
        );
        Ok(self.unit)
    }

    fn scope(&self) -> SluiceResult<&Scope<'a>> {
        self.scopes
            .last()
            .ok_or_else(|| SluiceError::internal("no generation scope"))
    }

    fn scope_mut(&mut self) -> SluiceResult<&mut Scope<'a>> {
        self.scopes
            .last_mut()
            .ok_or_else(|| SluiceError::internal("no generation scope"))
    }

    /// Descriptors of the operators feeding `id`, in port order.
    fn inputs(&self, dag: &Dag, id: OperatorId) -> SluiceResult<Vec<OperatorDesc>> {
        let scope = self.scope()?;
        dag.in_flows(id)
            .into_iter()
            .map(|flow| {
                scope
                    .descs
                    .get(&flow.operator)
                    .cloned()
                    .ok_or(SluiceError::UnboundVariable { id: flow.operator })
            })
            .collect()
    }

    fn declare(&mut self, tuple_type: &TupleType) -> String {
        self.unit.declarations.declare(tuple_type)
    }

    /// Render `expr` over `args`, declaring the tuple types it constructs.
    fn cpp(&mut self, expr: &Expr, args: &[TupleType]) -> SluiceResult<String> {
        self.include_for_literals(expr.literals());
        let declarations = &mut self.unit.declarations;
        expr.to_cpp(args, &mut |t| declarations.declare(t))
    }

    fn include_for_literals<'l>(&mut self, literals: impl IntoIterator<Item = &'l Literal>) {
        if literals.into_iter().any(Literal::needs_limits) {
            self.unit.include("<limits>");
        }
    }

    /// Render a function result as a value of `out`, wrapping bare values.
    fn construct(&mut self, func: &Expr, args: &[TupleType], out: &str) -> SluiceResult<String> {
        let code = self.cpp(func, args)?;
        Ok(match func.infer_type(args)? {
            FieldType::Tuple(_) => code,
            _ => format!("{out}{{{code}}}"),
        })
    }

    fn emit(&mut self, op: &DagOperator, dag: &Dag) -> SluiceResult<()> {
        let inputs = self.inputs(dag, op.id)?;
        let output_type = self.scope()?.types.output(op.id)?.clone();
        let type_name = self.declare(&output_type);
        let var = self.scope()?.var_name(op.id);
        let statement = match &op.kind {
            OperatorKind::Range(range) => {
                let int = AtomicKind::Int64;
                Statement::Declare {
                    var: var.clone(),
                    expr: format!(
                        "makeRangeOperator<{type_name}>({}, {}, {})",
                        int.render_literal(&range.from.to_string()),
                        int.render_literal(&range.to.to_string()),
                        int.render_literal(&range.step.to_string())
                    ),
                }
            }
            OperatorKind::ConstantTuple(constant) => {
                self.include_for_literals(&constant.values);
                let values: Vec<String> = constant.values.iter().map(|v| v.to_cpp()).collect();
                Statement::Declare {
                    var: var.clone(),
                    expr: format!(
                        "makeConstantTupleOperator<{type_name}>({type_name}{{{}}})",
                        values.join(", ")
                    ),
                }
            }
            OperatorKind::ParameterLookup(lookup) => {
                let n = lookup.parameter_num;
                if self.scope()?.is_outer() {
                    self.unit.parameters.insert(n);
                    Statement::Declare {
                        var: var.clone(),
                        expr: format!(
                            "makeParameterLookupOperator<{type_name}>(input_{n}, input_{n}_size)"
                        ),
                    }
                } else {
                    let target = self.scope()?.inputs.get(n).cloned().ok_or_else(|| {
                        SluiceError::invalid_parameter(format!(
                            "{} reads pipeline input {n}, which is not bound",
                            op.name()
                        ))
                    })?;
                    Statement::Alias {
                        var: var.clone(),
                        target,
                    }
                }
            }
            OperatorKind::RowScan(scan) => {
                let index = if scan.add_index { ", true" } else { "" };
                Statement::Declare {
                    var: var.clone(),
                    expr: format!(
                        "makeRowScanOperator<{type_name}{index}>(&{})",
                        input_desc(&inputs, op, 0)?.var_name
                    ),
                }
            }
            OperatorKind::Filter(filter) => {
                let input = input_desc(&inputs, op, 0)?;
                let predicate = self.cpp(&filter.predicate, &[input.output_type.clone()])?;
                Statement::Declare {
                    var: var.clone(),
                    expr: format!(
                        "makeFilterOperator<{type_name}>(&{}, [](const {} &a0) {{ return {predicate}; }})",
                        input.var_name, input.type_name
                    ),
                }
            }
            OperatorKind::Map(map) => {
                let input = input_desc(&inputs, op, 0)?;
                let result = self.construct(&map.func, &[input.output_type.clone()], &type_name)?;
                Statement::Declare {
                    var: var.clone(),
                    expr: format!(
                        "makeMapOperator<{type_name}>(&{}, [](const {} &a0) {{ return {result}; }})",
                        input.var_name, input.type_name
                    ),
                }
            }
            OperatorKind::Projection(projection) => {
                let input = input_desc(&inputs, op, 0)?;
                let fields = Expr::Tuple(projection.positions.iter().map(|&p| Expr::field(p)).collect());
                let result = self.cpp(&fields, &[input.output_type.clone()])?;
                Statement::Declare {
                    var: var.clone(),
                    expr: format!(
                        "makeProjectionOperator<{type_name}>(&{}, [](const {} &a0) {{ return {result}; }})",
                        input.var_name, input.type_name
                    ),
                }
            }
            OperatorKind::Reduce(reduce) => {
                let input = input_desc(&inputs, op, 0)?;
                let args = [input.output_type.clone(), input.output_type.clone()];
                let result = self.construct(&reduce.func, &args, &type_name)?;
                Statement::Declare {
                    var: var.clone(),
                    expr: format!(
                        "makeReduceOperator<{type_name}>(&{}, [](const {t} &a0, const {t} &a1) {{ return {result}; }})",
                        input.var_name,
                        t = input.type_name
                    ),
                }
            }
            OperatorKind::ReduceByKey(reduce) => {
                let input = input_desc(&inputs, op, 0)?;
                let values =
                    TupleType::positional(input.output_type.field_types().skip(1).cloned());
                let values_name = self.declare(&values);
                let args = [values.clone(), values];
                let result = self.construct(&reduce.func, &args, &values_name)?;
                Statement::Declare {
                    var: var.clone(),
                    expr: format!(
                        "makeReduceByKeyOperator<{type_name}, {values_name}>(&{}, [](const {values_name} &a0, const {values_name} &a1) {{ return {result}; }})",
                        input.var_name
                    ),
                }
            }
            OperatorKind::GroupBy(group_by) => Statement::Declare {
                var: var.clone(),
                expr: format!(
                    "makeGroupByOperator<{type_name}>(&{}, {})",
                    input_desc(&inputs, op, 0)?.var_name,
                    group_by_arguments(group_by)
                ),
            },
            OperatorKind::Join(join) => Statement::Declare {
                var: var.clone(),
                expr: format!(
                    "makeJoinOperator<{type_name}, {}>(&{}, &{})",
                    join.num_keys,
                    input_desc(&inputs, op, 0)?.var_name,
                    input_desc(&inputs, op, 1)?.var_name
                ),
            },
            OperatorKind::Cartesian(_) => Statement::Declare {
                var: var.clone(),
                expr: format!(
                    "makeCartesianOperator<{type_name}>(&{}, &{})",
                    input_desc(&inputs, op, 0)?.var_name,
                    input_desc(&inputs, op, 1)?.var_name
                ),
            },
            OperatorKind::MaterializeRowVector(_) => Statement::Declare {
                var: var.clone(),
                expr: format!(
                    "makeMaterializeRowVectorOperator<{type_name}>(&{})",
                    input_desc(&inputs, op, 0)?.var_name
                ),
            },
            OperatorKind::EnsureSingleTuple(_) => Statement::Declare {
                var: var.clone(),
                expr: format!(
                    "makeEnsureSingleTupleOperator<{type_name}>(&{})",
                    input_desc(&inputs, op, 0)?.var_name
                ),
            },
            OperatorKind::Partition(_) | OperatorKind::Pipeline(_) => {
                return Err(SluiceError::unsupported_operator(op.id, op.kind.tag()));
            }
        };

        let outer_lookup = matches!(op.kind, OperatorKind::ParameterLookup(_))
            && self.scope()?.is_outer();
        if !matches!(op.kind, OperatorKind::ParameterLookup(_)) || outer_lookup {
            self.unit
                .include(format!("\"operators/{}.hpp\"", op.kind.tag()));
        }
        self.unit.push(Statement::Comment(op.name()));
        self.unit.push(statement);
        self.bind(op.id, var, output_type, type_name)
    }

    fn bind(
        &mut self,
        id: OperatorId,
        var_name: String,
        output_type: TupleType,
        type_name: String,
    ) -> SluiceResult<()> {
        self.scope_mut()?.descs.insert(
            id,
            OperatorDesc {
                var_name,
                output_type,
                type_name,
            },
        );
        Ok(())
    }

    fn enter_pipeline(&mut self, op: &DagOperator, dag: &Dag) -> SluiceResult<()> {
        let inputs = self
            .inputs(dag, op.id)?
            .into_iter()
            .map(|desc| desc.var_name)
            .collect();
        let scope = self.scope()?;
        let prefix = format!("{}_", scope.var_name(op.id));
        let types = scope.types.inner(op.id).ok_or_else(|| {
            SluiceError::internal(format!("no inferred types for the inner DAG of {}", op.name()))
        })?;
        self.unit
            .push(Statement::Comment(format!("enter {}", op.name())));
        self.scopes.push(Scope::new(prefix, types, inputs));
        Ok(())
    }

    fn exit_pipeline(&mut self, op: &DagOperator) -> SluiceResult<()> {
        let inner = self
            .scopes
            .pop()
            .ok_or_else(|| SluiceError::internal("no generation scope"))?;
        let sink = op
            .kind
            .inner_dag()
            .and_then(Dag::sink)
            .ok_or_else(|| SluiceError::schema(format!("inner DAG of {} has no sink", op.name())))?;
        let result = inner
            .descs
            .get(&sink)
            .cloned()
            .ok_or(SluiceError::UnboundVariable { id: sink })?;

        let var = self.scope()?.var_name(op.id);
        self.unit
            .push(Statement::Comment(format!("exit {}", op.name())));
        self.unit.push(Statement::Alias {
            var: var.clone(),
            target: result.var_name,
        });
        self.bind(op.id, var, result.output_type, result.type_name)
    }
}

impl DagVisitor for Emitter<'_> {
    fn on_entry(&mut self, op: &DagOperator, dag: &Dag) -> SluiceResult<()> {
        match op.kind {
            OperatorKind::Pipeline(_) => self.enter_pipeline(op, dag),
            _ => self.emit(op, dag),
        }
    }

    fn on_exit(&mut self, op: &DagOperator, _dag: &Dag) -> SluiceResult<()> {
        match op.kind {
            OperatorKind::Pipeline(_) => self.exit_pipeline(op),
            _ => Ok(()),
        }
    }
}

/// Input `port` of `op`.
fn input_desc<'d>(
    inputs: &'d [OperatorDesc],
    op: &DagOperator,
    port: usize,
) -> SluiceResult<&'d OperatorDesc> {
    inputs
        .get(port)
        .ok_or_else(|| SluiceError::internal(format!("{} has no input {port}", op.name())))
}

/// Element type of a `{v0: Array<T>}` tuple.
fn row_vector_element(tuple_type: &TupleType) -> Option<&FieldType> {
    if tuple_type.len() != 1 {
        return None;
    }
    tuple_type.field(0)?.field_type.as_array_element()
}

fn group_by_arguments(op: &GroupByOp) -> String {
    let keys: Vec<String> = op.keys.iter().map(|k| format!("Key<{k}>{{}}")).collect();
    let aggregates: Vec<String> = op
        .aggregates
        .iter()
        .map(|agg| match (agg.func, agg.field) {
            (AggregateFunc::Count, _) | (_, None) => "Count{}".to_string(),
            (AggregateFunc::Sum, Some(f)) => format!("Sum<{f}>{{}}"),
            (AggregateFunc::Min, Some(f)) => format!("Min<{f}>{{}}"),
            (AggregateFunc::Max, Some(f)) => format!("Max<{f}>{{}}"),
        })
        .collect();
    format!(
        "std::make_tuple({}), std::make_tuple({})",
        keys.join(", "),
        aggregates.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_dag::ops::AggregateExpr;

    #[test]
    fn test_group_by_arguments() {
        let op = GroupByOp::new([0, 2])
            .with_aggregate(AggregateExpr::count())
            .with_aggregate(AggregateExpr::sum(1))
            .with_aggregate(AggregateExpr::max(3));
        assert_eq!(
            group_by_arguments(&op),
            "std::make_tuple(Key<0>{}, Key<2>{}), std::make_tuple(Count{}, Sum<1>{}, Max<3>{})"
        );
    }

    #[test]
    fn test_row_vector_element() {
        let int = FieldType::atomic(AtomicKind::Int64);
        assert_eq!(
            row_vector_element(&TupleType::positional([FieldType::array(int.clone())])),
            Some(&int)
        );
        assert_eq!(row_vector_element(&TupleType::positional([int])), None);
    }
}
