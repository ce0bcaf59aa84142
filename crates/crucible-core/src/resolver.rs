//! Import scanner / resolver (spec §4.3): walks the root module's AST,
//! finds every `import`/`from … import`, resolves each to an
//! [`ImportStrategy`], and assembles the dependency DAG the module
//! compiler (§4.9) later walks.

use crate::ast::{Module, StmtKind};
use crate::error::CompileError;
use crate::import_strategy::ImportStrategy;
use crate::module_registry::ModuleRegistry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ResolvedImport {
    pub module_name: String,
    pub strategy: ImportStrategy,
    /// Populated only for `CompilePython` strategies: the file the
    /// module compiler should recurse into next.
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct DependencyGraph {
    pub imports: Vec<ResolvedImport>,
    /// Names imported from a module that resolved to `Skip`, kept so
    /// later passes emit a targeted diagnostic on first use rather than
    /// an opaque "name not found".
    pub skipped_names: HashMap<String, Vec<String>>,
}

/// Search order for a same-project user module, per spec §4.3:
/// (1) the importer's own directory, (2) the current working
/// directory, (3) a conventional `examples/`/project-root location.
pub fn resolve_imports(
    module: &Module,
    importer_dir: &Path,
    registry: &ModuleRegistry,
) -> Result<DependencyGraph, CompileError> {
    let mut graph = DependencyGraph::default();
    for stmt in &module.body {
        match &stmt.kind {
            StmtKind::Import { names } => {
                for alias in names {
                    let resolved = resolve_one(&alias.name, importer_dir, registry);
                    graph.imports.push(resolved);
                }
            }
            StmtKind::ImportFrom {
                module: Some(name),
                names,
                ..
            } => {
                let resolved = resolve_one(name, importer_dir, registry);
                if resolved.strategy.is_skip() {
                    let entry = graph.skipped_names.entry(name.clone()).or_default();
                    for alias in names {
                        entry.push(alias.alias.clone().unwrap_or_else(|| alias.name.clone()));
                    }
                }
                graph.imports.push(resolved);
            }
            StmtKind::ImportFrom { module: None, .. } => {
                // Relative import with no named package (`from . import x`);
                // resolved against the importer's own package directory.
                graph.imports.push(ResolvedImport {
                    module_name: ".".to_string(),
                    strategy: ImportStrategy::CompilePython(".".to_string()),
                    source_path: Some(importer_dir.to_path_buf()),
                });
            }
            _ => {}
        }
    }
    Ok(graph)
}

fn resolve_one(name: &str, importer_dir: &Path, registry: &ModuleRegistry) -> ResolvedImport {
    if let Some(entry) = registry.lookup(name) {
        return ResolvedImport {
            module_name: name.to_string(),
            strategy: entry.strategy.clone(),
            source_path: None,
        };
    }

    let relative = name.replace('.', "/");
    let candidates = [
        importer_dir.join(format!("{relative}.py")),
        importer_dir.join(&relative).join("__init__.py"),
        Path::new(".").join(format!("{relative}.py")),
        Path::new("examples").join(format!("{relative}.py")),
    ];
    for candidate in &candidates {
        if candidate.exists() {
            return ResolvedImport {
                module_name: name.to_string(),
                strategy: ImportStrategy::CompilePython(name.to_string()),
                source_path: Some(candidate.clone()),
            };
        }
    }

    ResolvedImport {
        module_name: name.to_string(),
        strategy: ImportStrategy::Skip(name.to_string()),
        source_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn resolves_stdlib_module_without_touching_the_filesystem() {
        let module = Parser::parse("import math\n").unwrap();
        let registry = ModuleRegistry::with_stdlib();
        let graph = resolve_imports(&module, Path::new("."), &registry).unwrap();
        assert_eq!(graph.imports.len(), 1);
        assert!(matches!(
            graph.imports[0].strategy,
            ImportStrategy::NativeRuntime(_)
        ));
    }

    #[test]
    fn resolves_sibling_user_module_to_compile_python() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("helpers.py"), "def f():\n    pass\n").unwrap();
        let module = Parser::parse("import helpers\n").unwrap();
        let registry = ModuleRegistry::with_stdlib();
        let graph = resolve_imports(&module, dir.path(), &registry).unwrap();
        assert!(matches!(
            graph.imports[0].strategy,
            ImportStrategy::CompilePython(_)
        ));
        assert!(graph.imports[0].source_path.is_some());
    }

    #[test]
    fn missing_module_resolves_to_skip_and_remembers_names() {
        let module = Parser::parse("from totally_missing import frobnicate\n").unwrap();
        let registry = ModuleRegistry::with_stdlib();
        let graph = resolve_imports(&module, Path::new("."), &registry).unwrap();
        assert!(graph.imports[0].strategy.is_skip());
        assert_eq!(
            graph.skipped_names.get("totally_missing").unwrap(),
            &vec!["frobnicate".to_string()]
        );
    }

    #[test]
    fn asyncio_is_a_recognized_skip_not_a_missing_module() {
        let module = Parser::parse("import asyncio\n").unwrap();
        let registry = ModuleRegistry::with_stdlib();
        let graph = resolve_imports(&module, Path::new("."), &registry).unwrap();
        assert!(graph.imports[0].strategy.is_skip());
    }
}
