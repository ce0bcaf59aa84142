//! Core compilation engine: lexer, parser, import resolver,
//! semantic/mutation analysis hooks, compile-time evaluator, and code
//! generator for the Crucible Python subset (spec §2, §4).
//!
//! [`Compiler::compile_source`] runs the full pipeline over a single
//! in-memory module; [`Compiler::compile_file`] additionally drives the
//! recursive module compiler over the file's import graph.

pub mod ast;
pub mod bytecode;
pub mod class_registry;
pub mod codegen;
pub mod comptime;
pub mod error;
pub mod import_strategy;
pub mod lexer;
pub mod module_compiler;
pub mod module_registry;
pub mod native_type;
pub mod parser;
pub mod resolver;
pub mod span;
pub mod symbol_table;
pub mod token;

use class_registry::ClassRegistry;
use error::{CompileResult, ResultExt};
use module_compiler::{CompiledUnit, ModuleCompiler};
use module_registry::ModuleRegistry;
use parser::Parser;
use std::path::{Path, PathBuf};
use symbol_table::SymbolTable;

/// Tunables a caller can set before compiling; defaults mirror what the
/// CLI driver in `crates/crucible` passes through from its flags.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Bypasses the external build-artifact cache oracle (`--force`).
    pub force: bool,
    /// Emits the bytecode-program form for embedded `eval`/`exec`
    /// literals rather than backend IR (`--emit-bytecode`).
    pub emit_bytecode: bool,
    /// Selects the WebAssembly backend target (`--wasm`); purely a hint
    /// carried through to the IR header since backend selection itself
    /// is out of scope for this crate.
    pub wasm_target: bool,
}

/// Output of a successful compilation: the root module's IR plus every
/// recursively-compiled dependency unit, in module-name order.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    pub root_ir: String,
    pub units: Vec<CompiledUnit>,
}

pub struct Compiler {
    modules: ModuleRegistry,
    options: CompileOptions,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl Compiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            modules: ModuleRegistry::with_stdlib(),
            options,
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles a single module's source with no import resolution —
    /// useful for unit-testing individual language constructs without a
    /// filesystem round trip.
    pub fn compile_source(&self, source: &str) -> CompileResult<String> {
        let ast = Parser::parse(source).ctx("parsing source")?;
        let classes = ClassRegistry::from_module(&ast).ctx("building class registry")?;
        let symbols = SymbolTable::new();
        codegen::generate(&ast, &classes, &self.modules, &symbols).ctx("generating IR")
    }

    /// Compiles `path` and recursively compiles every user module it
    /// imports, per the module compiler's search order (spec §4.3).
    pub fn compile_file(&self, path: &Path) -> CompileResult<CompileOutput> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| error::CompileError::new(error::ErrorKind::IoError(e.to_string())))
            .ctx(format!("reading {}", path.display()))?;
        let dir: PathBuf = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut module_compiler = ModuleCompiler::new(&self.modules);
        let (root_ir, units) = module_compiler.compile_root(&source, &dir)?;
        Ok(CompileOutput { root_ir, units })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_trivial_function() {
        let compiler = Compiler::default();
        let ir = compiler
            .compile_source("def add(a, b):\n    return a + b\n")
            .unwrap();
        assert!(ir.contains("fn add"));
    }

    #[test]
    fn compile_source_surfaces_parse_errors_with_context() {
        let compiler = Compiler::default();
        let err = compiler.compile_source("def f(:\n    pass\n").unwrap_err();
        assert!(!err.context.is_empty());
    }

    #[test]
    fn compile_file_reads_and_compiles_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prog.py");
        std::fs::write(&path, "def f():\n    return 1\n").unwrap();
        let compiler = Compiler::default();
        let output = compiler.compile_file(&path).unwrap();
        assert!(output.root_ir.contains("fn f"));
        assert!(output.units.is_empty());
    }
}
