//! Structured translation unit and its rendering.
//!
//! Emission only appends to a [`CodeUnit`]; text is produced once, after the
//! whole DAG has been visited, by [`CodeUnit::render_source`] and
//! [`CodeUnit::render_header`].

use std::collections::BTreeSet;

use indexmap::IndexSet;

use crate::declarations::TypeDeclarations;

const INDENT: &str = "    ";

/// Runtime header defining the `Array<T>` template of array fields.
pub const ARRAY_HEADER: &str = "\"runtime/array.hpp\"";

/// One statement of the `execute` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `/* text */`, dropped when comments are disabled.
    Comment(String),
    /// `auto var = expr;`
    Declare { var: String, expr: String },
    /// `auto &var = target;`
    Alias { var: String, target: String },
    /// A complete statement, rendered as is.
    Line(String),
}

impl Statement {
    fn render(&self, emit_comments: bool) -> Option<String> {
        match self {
            Self::Comment(text) if emit_comments => Some(format!("/* {text} */")),
            Self::Comment(_) => None,
            Self::Declare { var, expr } => Some(format!("auto {var} = {expr};")),
            Self::Alias { var, target } => Some(format!("auto &{var} = {target};")),
            Self::Line(line) => Some(line.clone()),
        }
    }
}

/// Everything the generated source and header are rendered from.
#[derive(Debug)]
pub struct CodeUnit {
    /// Include targets in first-use order, e.g. `<cstdlib>` or
    /// `"operators/filter.hpp"`.
    pub includes: IndexSet<String>,
    pub declarations: TypeDeclarations,
    pub body: Vec<Statement>,
    /// `parameter_num`s of the outer parameter lookups.
    pub parameters: BTreeSet<usize>,
    /// C type of one result element.
    pub element_type: String,
    /// Declarations the element type needs.
    pub element_roots: Vec<String>,
    pub emit_comments: bool,
}

impl CodeUnit {
    pub fn new(emit_comments: bool) -> Self {
        let mut includes = IndexSet::new();
        includes.insert("<cstdlib>".to_string());
        Self {
            includes,
            declarations: TypeDeclarations::new(),
            body: Vec::new(),
            parameters: BTreeSet::new(),
            element_type: String::new(),
            element_roots: Vec::new(),
            emit_comments,
        }
    }

    pub fn include(&mut self, target: impl Into<String>) {
        self.includes.insert(target.into());
    }

    pub fn push(&mut self, statement: Statement) {
        self.body.push(statement);
    }

    /// Parameter list of `execute`.
    pub fn signature_parameters(&self) -> String {
        if self.parameters.is_empty() {
            return "void".to_string();
        }
        self.parameters
            .iter()
            .map(|n| format!("void *input_{n}, unsigned long input_{n}_size"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn result_type(&self) -> String {
        format!(
            "typedef struct {{\n{INDENT}unsigned long size;\n{INDENT}{} *data;\n}} result_type;\n",
            self.element_type
        )
    }

    /// The `execute.cpp` translation unit.
    pub fn render_source(&self) -> String {
        let mut out = String::from("/**\n * Auto-generated execution plan\n */\n");
        for include in &self.includes {
            out.push_str(&format!("#include {include}\n"));
        }
        out.push('\n');
        out.push_str(&self.declarations.render());
        out.push('\n');
        out.push_str(&self.result_type());
        out.push_str("\nextern \"C\" {\n\n");

        out.push_str(&format!(
            "result_type *execute({}) {{\n",
            self.signature_parameters()
        ));
        for statement in &self.body {
            if let Some(line) = statement.render(self.emit_comments) {
                out.push_str(INDENT);
                out.push_str(&line);
                out.push('\n');
            }
        }
        out.push_str("}\n\n");

        out.push_str(FREE_RESULT);
        out.push_str("\n} // extern \"C\"\n");
        out
    }

    /// The `execute.h` header: element type, `result_type` and prototypes.
    ///
    /// An element type with array fields names `Array<T>`, so the header
    /// then includes the runtime's array definition.
    pub fn render_header(&self) -> String {
        let declarations = self.declarations.render_closure(&self.element_roots);
        let mut out = String::from("#ifndef SLUICE_EXECUTE_H\n#define SLUICE_EXECUTE_H\n\n");
        out.push_str("#include <stdbool.h>\n#include <stdint.h>\n");
        if declarations.contains("Array<") {
            out.push_str(&format!("#include {ARRAY_HEADER}\n"));
        }
        out.push('\n');
        out.push_str(&declarations);
        out.push('\n');
        out.push_str(&self.result_type());
        out.push_str("\n#ifdef __cplusplus\nextern \"C\" {\n#endif\n\n");
        out.push_str(&format!(
            "result_type *execute({});\n",
            self.signature_parameters()
        ));
        out.push_str("void free_result(result_type *ptr);\n");
        out.push_str("\n#ifdef __cplusplus\n}\n#endif\n\n#endif // SLUICE_EXECUTE_H\n");
        out
    }
}

const FREE_RESULT: &str = "\
void free_result(result_type *ptr) {
    if (ptr != nullptr && ptr->data != nullptr) {
        free(ptr->data);
        ptr->data = nullptr;
    }
    if (ptr != nullptr) {
        free(ptr);
    }
}
";
