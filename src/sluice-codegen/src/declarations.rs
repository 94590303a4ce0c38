//! Deduplicated C struct declarations for tuple types.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use sluice_core::TupleType;

/// One emitted `typedef struct`.
#[derive(Debug, Clone)]
struct Declaration {
    name: String,
    /// Names of the declarations this body references.
    dependencies: Vec<String>,
}

/// The struct declarations of one translation unit.
///
/// Types are declared by their [`TupleType::compute_definition`] body, so two
/// types with byte-identical bodies share one declaration. Nested tuple types
/// are declared before the types that contain them and names are handed out
/// as `tuple_0`, `tuple_1`, ... in that completion order.
#[derive(Debug, Default)]
pub struct TypeDeclarations {
    names: HashMap<TupleType, String>,
    bodies: IndexMap<String, Declaration>,
}

impl TypeDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the declaration for `tuple_type`, declaring it if needed.
    pub fn declare(&mut self, tuple_type: &TupleType) -> String {
        if let Some(name) = self.names.get(tuple_type) {
            return name.clone();
        }

        let mut dependencies = Vec::new();
        let body = tuple_type.compute_definition(&mut |nested| {
            let name = self.declare(nested);
            dependencies.push(name.clone());
            name
        });

        let name = match self.bodies.get(&body) {
            Some(existing) => existing.name.clone(),
            None => {
                let name = format!("tuple_{}", self.bodies.len());
                self.bodies.insert(
                    body,
                    Declaration {
                        name: name.clone(),
                        dependencies,
                    },
                );
                name
            }
        };
        self.names.insert(tuple_type.clone(), name.clone());
        name
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// All declarations, in declaration order.
    pub fn render(&self) -> String {
        self.render_filtered(|_| true)
    }

    /// The declarations `roots` need, transitively, in declaration order.
    pub fn render_closure(&self, roots: &[String]) -> String {
        let by_name: HashMap<&str, &Declaration> = self
            .bodies
            .values()
            .map(|decl| (decl.name.as_str(), decl))
            .collect();

        let mut needed = BTreeSet::new();
        let mut stack: Vec<&str> = roots.iter().map(String::as_str).collect();
        while let Some(name) = stack.pop() {
            if needed.insert(name.to_string()) {
                if let Some(decl) = by_name.get(name) {
                    stack.extend(decl.dependencies.iter().map(String::as_str));
                }
            }
        }
        self.render_filtered(|decl| needed.contains(&decl.name))
    }

    fn render_filtered(&self, keep: impl Fn(&Declaration) -> bool) -> String {
        let mut out = String::new();
        for (body, decl) in &self.bodies {
            if keep(decl) {
                out.push_str(&format!("typedef struct {body} {};\n", decl.name));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_core::{AtomicKind, FieldType, NamedFieldType};

    fn int_pair() -> TupleType {
        TupleType::positional([
            FieldType::atomic(AtomicKind::Int64),
            FieldType::atomic(AtomicKind::Int64),
        ])
    }

    #[test]
    fn test_identical_types_share_declaration() {
        let mut decls = TypeDeclarations::new();
        let a = decls.declare(&int_pair());
        let b = decls.declare(&int_pair());
        assert_eq!(a, "tuple_0");
        assert_eq!(a, b);
        assert_eq!(decls.len(), 1);
        assert_eq!(
            decls.render(),
            "typedef struct { int64_t v0; int64_t v1; } tuple_0;\n"
        );
    }

    #[test]
    fn test_field_names_are_part_of_the_body() {
        let named = TupleType::new(vec![
            NamedFieldType::new("v0", FieldType::atomic(AtomicKind::Int64)),
            NamedFieldType::new("v1", FieldType::atomic(AtomicKind::Int64)),
        ])
        .unwrap();
        let mut decls = TypeDeclarations::new();
        assert_eq!(decls.declare(&named), decls.declare(&int_pair()));

        let renamed = TupleType::new(vec![
            NamedFieldType::new("key", FieldType::atomic(AtomicKind::Int64)),
            NamedFieldType::new("v1", FieldType::atomic(AtomicKind::Int64)),
        ])
        .unwrap();
        assert_eq!(decls.declare(&renamed), "tuple_1");
    }

    #[test]
    fn test_nested_declared_first() {
        let nested = TupleType::positional([FieldType::array(FieldType::Tuple(int_pair()))]);
        let mut decls = TypeDeclarations::new();
        assert_eq!(decls.declare(&nested), "tuple_1");
        assert_eq!(
            decls.render(),
            "typedef struct { int64_t v0; int64_t v1; } tuple_0;\n\
             typedef struct { Array<tuple_0> v0; } tuple_1;\n"
        );
    }

    #[test]
    fn test_render_closure() {
        let mut decls = TypeDeclarations::new();
        decls.declare(&TupleType::scalar(AtomicKind::Bool));
        let inner = decls.declare(&int_pair());
        let outer = decls.declare(&TupleType::positional([
            FieldType::atomic(AtomicKind::Float64),
            FieldType::Tuple(int_pair()),
        ]));
        assert_eq!(inner, "tuple_1");
        assert_eq!(
            decls.render_closure(&[outer]),
            "typedef struct { int64_t v0; int64_t v1; } tuple_1;\n\
             typedef struct { double v0; tuple_1 v1; } tuple_2;\n"
        );
        assert_eq!(decls.render_closure(&[]), "");
    }
}
