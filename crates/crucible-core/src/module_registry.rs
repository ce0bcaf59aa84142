//! Declarative module registry (spec §4.3/§4.8): maps a Python module
//! name to the [`ImportStrategy`] the import resolver assigns to it,
//! plus the per-function emitter table the code generator's module
//! function registry consults (§4.8, second of the three dispatch
//! tables).

use crate::import_strategy::ImportStrategy;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub strategy: ImportStrategy,
    /// Function name -> native return type name, used by the type
    /// inferrer when it sees `module.function(...)` (§4.5).
    pub functions: HashMap<String, String>,
}

/// Read-only after construction; the dispatch registries are shared
/// across parallel compiler instances per spec §5.
pub struct ModuleRegistry {
    modules: HashMap<String, ModuleEntry>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::with_stdlib()
    }
}

impl ModuleRegistry {
    pub fn empty() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// The fixed set of modules this implementation ships runtime
    /// support for. Anything not listed here is `Skip`, unless the
    /// import resolver finds it as a same-directory user module first.
    pub fn with_stdlib() -> Self {
        let mut modules = HashMap::new();

        modules.insert(
            "math".to_string(),
            ModuleEntry {
                strategy: ImportStrategy::NativeRuntime("math".into()),
                functions: HashMap::from([
                    ("sqrt".to_string(), "float".to_string()),
                    ("floor".to_string(), "int".to_string()),
                    ("ceil".to_string(), "int".to_string()),
                    ("pow".to_string(), "float".to_string()),
                    ("log".to_string(), "float".to_string()),
                    ("gcd".to_string(), "int".to_string()),
                ]),
            },
        );

        modules.insert(
            "collections".to_string(),
            ModuleEntry {
                strategy: ImportStrategy::NativeRuntime("collections".into()),
                functions: HashMap::from([
                    ("Counter".to_string(), "counter".to_string()),
                    ("deque".to_string(), "deque".to_string()),
                ]),
            },
        );

        modules.insert(
            "itertools".to_string(),
            ModuleEntry {
                strategy: ImportStrategy::Inline("itertools".into()),
                functions: HashMap::from([
                    ("chain".to_string(), "unknown".to_string()),
                    ("product".to_string(), "unknown".to_string()),
                    ("count".to_string(), "unknown".to_string()),
                ]),
            },
        );

        modules.insert(
            "sqlite3".to_string(),
            ModuleEntry {
                strategy: ImportStrategy::CLibrary("sqlite3".into()),
                functions: HashMap::from([(
                    "connect".to_string(),
                    "sqlite_connection".to_string(),
                )]),
            },
        );

        modules.insert(
            "io".to_string(),
            ModuleEntry {
                strategy: ImportStrategy::NativeRuntime("io".into()),
                functions: HashMap::from([
                    ("StringIO".to_string(), "stringio".to_string()),
                    ("BytesIO".to_string(), "bytesio".to_string()),
                ]),
            },
        );

        modules.insert(
            "hashlib".to_string(),
            ModuleEntry {
                strategy: ImportStrategy::NativeRuntime("hashlib".into()),
                functions: HashMap::from([
                    ("sha256".to_string(), "hash_object".to_string()),
                    ("md5".to_string(), "hash_object".to_string()),
                ]),
            },
        );

        modules.insert(
            "json".to_string(),
            ModuleEntry {
                strategy: ImportStrategy::NativeRuntime("json".into()),
                functions: HashMap::from([
                    ("dumps".to_string(), "string".to_string()),
                    ("loads".to_string(), "unknown".to_string()),
                ]),
            },
        );

        // Explicitly unsupported: recognized by name so references get a
        // targeted diagnostic instead of "module not found".
        for unsupported in ["asyncio", "threading", "multiprocessing"] {
            modules.insert(
                unsupported.to_string(),
                ModuleEntry {
                    strategy: ImportStrategy::Skip(unsupported.to_string()),
                    functions: HashMap::new(),
                },
            );
        }

        Self { modules }
    }

    pub fn lookup(&self, module: &str) -> Option<&ModuleEntry> {
        self.modules.get(module)
    }

    pub fn register(&mut self, name: impl Into<String>, entry: ModuleEntry) {
        self.modules.insert(name.into(), entry);
    }

    pub fn function_return_type(&self, module: &str, function: &str) -> Option<&str> {
        self.modules
            .get(module)?
            .functions
            .get(function)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_module_resolves_to_native_runtime() {
        let reg = ModuleRegistry::with_stdlib();
        assert!(matches!(
            reg.lookup("math").unwrap().strategy,
            ImportStrategy::NativeRuntime(_)
        ));
    }

    #[test]
    fn unsupported_module_resolves_to_skip() {
        let reg = ModuleRegistry::with_stdlib();
        assert!(reg.lookup("asyncio").unwrap().strategy.is_skip());
    }

    #[test]
    fn unknown_module_is_absent_not_skip() {
        let reg = ModuleRegistry::with_stdlib();
        assert!(reg.lookup("totally_made_up_module").is_none());
    }

    #[test]
    fn function_return_type_lookup_succeeds_for_known_function() {
        let reg = ModuleRegistry::with_stdlib();
        assert_eq!(reg.function_return_type("math", "sqrt"), Some("float"));
    }
}
