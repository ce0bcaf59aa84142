//! Import resolution strategy (spec §4.3/§6): each import site is
//! classified into exactly one strategy by consulting the module
//! registry before semantic analysis runs, so later passes never have
//! to ask "how is this name satisfied" again.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImportStrategy {
    /// Backed by a native runtime shim shipped with the compiler itself
    /// (e.g. `math`, `collections`).
    NativeRuntime(String),
    /// Backed by an external system library the generated code links
    /// against (e.g. `sqlite3`).
    CLibrary(String),
    /// The imported module is itself source the compiler can pull in
    /// and compile as part of the same program.
    CompilePython(String),
    /// Small enough surface that the call sites are lowered inline
    /// rather than routed through a module boundary at all.
    Inline(String),
    /// Recognized but deliberately unsupported; using any name from it
    /// is an `ImportError`, not a silent no-op.
    Skip(String),
}

impl ImportStrategy {
    pub fn module_name(&self) -> &str {
        match self {
            ImportStrategy::NativeRuntime(m)
            | ImportStrategy::CLibrary(m)
            | ImportStrategy::CompilePython(m)
            | ImportStrategy::Inline(m)
            | ImportStrategy::Skip(m) => m,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, ImportStrategy::Skip(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_name_is_available_for_every_variant() {
        let strategies = vec![
            ImportStrategy::NativeRuntime("math".into()),
            ImportStrategy::CLibrary("sqlite3".into()),
            ImportStrategy::CompilePython("mypkg.util".into()),
            ImportStrategy::Inline("itertools".into()),
            ImportStrategy::Skip("asyncio".into()),
        ];
        for s in strategies {
            assert!(!s.module_name().is_empty());
        }
    }
}
