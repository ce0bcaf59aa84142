//! Module compiler (spec §4.9): recursively invokes the full pipeline
//! on imported user modules, producing either a standalone linkable
//! compilation unit (top-level `import foo`) or an inlined struct of
//! functions appended to the root IR (module-scoped access like
//! `mymath.add`).

use crate::class_registry::ClassRegistry;
use crate::codegen;
use crate::error::{CompileError, CompileResult, ErrorKind, ResultExt};
use crate::module_registry::ModuleRegistry;
use crate::parser::Parser;
use crate::resolver::{self, ResolvedImport};
use crate::symbol_table::SymbolTable;
use crate::import_strategy::ImportStrategy;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub enum CompiledUnit {
    /// A top-level `import foo` site: its own compilation unit, linked
    /// separately from the root module's IR.
    Standalone { module_name: String, ir: String },
    /// A `from pkg import sub`-reachable module folded into the root
    /// IR as a nested struct of functions.
    Inlined { module_name: String, ir: String },
}

pub struct ModuleCompiler<'a> {
    modules: &'a ModuleRegistry,
    compiled: HashMap<String, CompiledUnit>,
}

impl<'a> ModuleCompiler<'a> {
    pub fn new(modules: &'a ModuleRegistry) -> Self {
        Self {
            modules,
            compiled: HashMap::new(),
        }
    }

    /// Compiles the root module's source, then recursively compiles
    /// every `CompilePython` import it discovers. A module already in
    /// `compiled` is returned from cache rather than recompiled —
    /// a diamond-shaped import graph is compiled once per module name.
    pub fn compile_root(
        &mut self,
        source: &str,
        source_dir: &Path,
    ) -> CompileResult<(String, Vec<CompiledUnit>)> {
        let root_ir = self.compile_module(source, source_dir, true)?;
        let mut units: Vec<CompiledUnit> = self.compiled.values().cloned().collect();
        units.sort_by_key(|u| match u {
            CompiledUnit::Standalone { module_name, .. }
            | CompiledUnit::Inlined { module_name, .. } => module_name.clone(),
        });
        Ok((root_ir, units))
    }

    fn compile_module(
        &mut self,
        source: &str,
        source_dir: &Path,
        is_root: bool,
    ) -> CompileResult<String> {
        let ast = Parser::parse(source).ctx("parsing module source")?;
        let graph = resolver::resolve_imports(&ast, source_dir, self.modules)
            .ctx("resolving import graph")?;

        for import in &graph.imports {
            self.compile_dependency(import, source_dir)?;
        }

        let classes = ClassRegistry::from_module(&ast).ctx("building class registry")?;
        let symbols = SymbolTable::new();
        let ir = codegen::generate(&ast, &classes, self.modules, &symbols)
            .ctx("generating IR for module")?;

        if is_root {
            return Ok(ir);
        }
        Ok(ir)
    }

    fn compile_dependency(
        &mut self,
        import: &ResolvedImport,
        importer_dir: &Path,
    ) -> CompileResult<()> {
        if self.compiled.contains_key(&import.module_name) {
            return Ok(());
        }
        let ImportStrategy::CompilePython(_) = &import.strategy else {
            return Ok(());
        };
        let Some(path) = &import.source_path else {
            return Err(CompileError::new(ErrorKind::ImportError(format!(
                "'{}' resolved to CompilePython with no source path",
                import.module_name
            ))));
        };
        let source = std::fs::read_to_string(path)
            .map_err(|e| CompileError::new(ErrorKind::IoError(e.to_string())))
            .ctx(format!("reading module '{}'", import.module_name))?;
        let dir = path.parent().unwrap_or(importer_dir);
        let ir = self.compile_module(&source, dir, false)?;

        let is_package_submodule = import.module_name.contains('.');
        let unit = if is_package_submodule {
            CompiledUnit::Inlined {
                module_name: import.module_name.clone(),
                ir,
            }
        } else {
            CompiledUnit::Standalone {
                module_name: import.module_name.clone(),
                ir,
            }
        };
        self.compiled.insert(import.module_name.clone(), unit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn compiles_root_module_with_no_imports() {
        let modules = ModuleRegistry::with_stdlib();
        let mut compiler = ModuleCompiler::new(&modules);
        let (ir, units) = compiler
            .compile_root("def f():\n    pass\n", Path::new("."))
            .unwrap();
        assert!(ir.contains("fn f"));
        assert!(units.is_empty());
    }

    #[test]
    fn recursively_compiles_a_user_module_import() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("helpers.py"),
            "def double(x):\n    return x * 2\n",
        )
        .unwrap();
        let modules = ModuleRegistry::with_stdlib();
        let mut compiler = ModuleCompiler::new(&modules);
        let (_, units) = compiler
            .compile_root("import helpers\n", dir.path())
            .unwrap();
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn diamond_import_compiles_dependency_once() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "import shared\n").unwrap();
        fs::write(dir.path().join("shared.py"), "def f():\n    pass\n").unwrap();
        let modules = ModuleRegistry::with_stdlib();
        let mut compiler = ModuleCompiler::new(&modules);
        let (_, units) = compiler
            .compile_root("import a\nimport shared\n", dir.path())
            .unwrap();
        let shared_count = units
            .iter()
            .filter(|u| matches!(u, CompiledUnit::Standalone { module_name, .. } if module_name == "shared"))
            .count();
        assert_eq!(shared_count, 1);
    }
}
