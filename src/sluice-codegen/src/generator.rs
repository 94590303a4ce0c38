//! Code generation entry points and file output.

use std::io::Write;
use std::path::{Path, PathBuf};

use common_config::CodegenSettings;
use common_error::{SluiceError, SluiceResult};
use sluice_dag::{Dag, Direction, infer_types, traverse};
use tempfile::NamedTempFile;

use crate::emit::Emitter;

/// Generated translation unit and header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    pub source: String,
    pub header: String,
    /// File name `source` is written to.
    pub source_file: PathBuf,
    /// File name `header` is written to.
    pub header_file: PathBuf,
}

impl GeneratedCode {
    /// Write both files into `dir`, creating it if needed.
    ///
    /// Both files are staged as temporary files in `dir` and renamed into
    /// place only once both are fully written, so a failure never leaves a
    /// partial file behind.
    pub fn write_to(&self, dir: impl AsRef<Path>) -> SluiceResult<(PathBuf, PathBuf)> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let source = stage(dir, &self.source)?;
        let header = stage(dir, &self.header)?;

        let source_path = dir.join(&self.source_file);
        let header_path = dir.join(&self.header_file);
        source.persist(&source_path).map_err(|e| e.error)?;
        header.persist(&header_path).map_err(|e| e.error)?;

        log::info!(
            "wrote {} and {}",
            source_path.display(),
            header_path.display()
        );
        Ok((source_path, header_path))
    }
}

fn stage(dir: &Path, text: &str) -> SluiceResult<NamedTempFile> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Generates a fused `execute` function for a DAG.
#[derive(Debug, Clone, Default)]
pub struct CodeGenerator {
    settings: CodegenSettings,
}

impl CodeGenerator {
    pub fn new(settings: CodegenSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CodegenSettings {
        &self.settings
    }

    /// Generate code for `dag`.
    ///
    /// The DAG is validated and typed first; operators are then emitted
    /// producers first, entering pipeline inner DAGs. Nothing is rendered
    /// unless every operator was emitted.
    pub fn generate(&self, dag: &Dag) -> SluiceResult<GeneratedCode> {
        dag.validate()?;
        let types = infer_types(dag)?;
        let sink = dag
            .sink()
            .ok_or_else(|| SluiceError::invalid_parameter("DAG has no sink"))?;

        let mut emitter = Emitter::new(&types, self.settings.emit_comments);
        traverse(dag, Direction::Topological, true, &mut emitter)?;
        let unit = emitter.finish(sink)?;

        log::debug!(
            "generated plan over {} operator(s), {} include(s)",
            dag.len(),
            unit.includes.len()
        );
        Ok(GeneratedCode {
            source: unit.render_source(),
            header: unit.render_header(),
            source_file: self.settings.source_file.clone(),
            header_file: self.settings.header_file.clone(),
        })
    }
}

/// Generate code for `dag` with the default settings.
pub fn generate(dag: &Dag) -> SluiceResult<GeneratedCode> {
    CodeGenerator::default().generate(dag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_dag::{Expr, OperatorKind};

    fn scenario() -> Dag {
        let mut dag = Dag::new();
        let r = dag.add_operator(OperatorKind::range(0, 5, 1).unwrap());
        let f = dag.add_operator(OperatorKind::filter(Expr::field(0).gt(Expr::int(2))));
        dag.add_edge(r, 0, f, 0).unwrap();
        dag.set_sink(f).unwrap();
        dag
    }

    #[test]
    fn test_implicit_materialize() {
        let code = generate(&scenario()).unwrap();
        assert!(code.source.contains(
            "auto op_result = makeMaterializeRowVectorOperator<tuple_1>(&op_1);"
        ));
        assert!(code.source.contains("    op_result.open();\n"));
        assert!(code.source.contains("#include \"operators/materialize_row_vector.hpp\"\n"));
    }

    #[test]
    fn test_comments_toggle() {
        let settings = CodegenSettings {
            emit_comments: false,
            ..CodegenSettings::default()
        };
        let code = CodeGenerator::new(settings).generate(&scenario()).unwrap();
        assert!(!code.source.contains("/* range_0 */"));
        assert!(generate(&scenario()).unwrap().source.contains("/* range_0 */"));
    }

    #[test]
    fn test_invalid_dag_generates_nothing() {
        let mut dag = scenario();
        dag.remove_edge(1, 0);
        assert!(generate(&dag).is_err());
    }

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let code = generate(&scenario()).unwrap();
        let out = dir.path().join("gen");
        let (source, header) = code.write_to(&out).unwrap();
        assert_eq!(source, out.join("execute.cpp"));
        assert_eq!(std::fs::read_to_string(&source).unwrap(), code.source);
        assert_eq!(std::fs::read_to_string(&header).unwrap(), code.header);
        // Only the two outputs remain, no staging files.
        assert_eq!(std::fs::read_dir(&out).unwrap().count(), 2);
    }
}
