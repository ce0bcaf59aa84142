//! Three static string-keyed dispatch tables (spec §4.8): built-ins,
//! module functions (outer map keyed by module, inner by function),
//! and methods (one inner table per receiver category). Built once at
//! startup, read-only afterward, O(1) lookup, shareable across
//! parallel compiler instances (spec §5 "Shared state").

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverCategory {
    String,
    List,
    Dict,
    Set,
    Deque,
    Counter,
    File,
    Stream,
    HashObject,
    SqliteCursor,
    SqliteConnection,
    UnittestSelf,
    AsyncQueue,
    SuperCall,
}

pub struct DispatchRegistries {
    builtins: HashMap<&'static str, ()>,
    modules: HashMap<&'static str, HashMap<&'static str, ()>>,
    methods: HashMap<ReceiverCategory, HashMap<&'static str, ()>>,
}

/// The handler payload is `()` because every emitter here is a pure
/// function of (codegen context, call-site arguments) dispatched by
/// name from `expr.rs`; the table's job is answering "does this name
/// exist in this category", not holding a function pointer that would
/// need a lifetime tied to the codegen borrow.
impl DispatchRegistries {
    pub fn new() -> Self {
        let mut builtins = HashMap::new();
        for name in BUILTIN_NAMES {
            builtins.insert(*name, ());
        }

        let mut modules = HashMap::new();
        for (module, funcs) in MODULE_FUNCTIONS {
            let mut inner = HashMap::new();
            for f in *funcs {
                inner.insert(*f, ());
            }
            modules.insert(*module, inner);
        }

        let mut methods = HashMap::new();
        for (category, names) in METHOD_TABLES {
            let mut inner = HashMap::new();
            for n in *names {
                inner.insert(*n, ());
            }
            methods.insert(*category, inner);
        }

        Self {
            builtins,
            modules,
            methods,
        }
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    pub fn is_module_function(&self, module: &str, function: &str) -> bool {
        self.modules
            .get(module)
            .is_some_and(|inner| inner.contains_key(function))
    }

    pub fn is_method(&self, category: ReceiverCategory, name: &str) -> bool {
        self.methods
            .get(&category)
            .is_some_and(|inner| inner.contains_key(name))
    }
}

impl Default for DispatchRegistries {
    fn default() -> Self {
        Self::new()
    }
}

const BUILTIN_NAMES: &[&str] = &[
    "len", "str", "int", "float", "bool", "abs", "min", "max", "sum", "sorted", "reversed",
    "hash", "type", "isinstance", "open", "eval", "exec", "eval_bytecode", "exec_bytecode",
    "__import__", "list", "dict", "set", "tuple", "range", "enumerate", "zip", "map", "filter",
    "print", "repr", "round", "all", "any", "input",
];

const MODULE_FUNCTIONS: &[(&str, &[&str])] = &[
    ("math", &["sqrt", "floor", "ceil", "pow", "log", "gcd"]),
    ("collections", &["Counter", "deque"]),
    ("itertools", &["chain", "product", "count"]),
    ("sqlite3", &["connect"]),
    ("io", &["StringIO", "BytesIO"]),
    ("hashlib", &["sha256", "md5"]),
    ("json", &["dumps", "loads"]),
];

const METHOD_TABLES: &[(ReceiverCategory, &[&str])] = &[
    (
        ReceiverCategory::String,
        &[
            "upper",
            "lower",
            "strip",
            "replace",
            "split",
            "startswith",
            "endswith",
            "join",
            "format",
            "find",
            "encode",
        ],
    ),
    (
        ReceiverCategory::List,
        &[
            "append", "pop", "sort", "extend", "insert", "remove", "index", "count", "reverse",
            "clear",
        ],
    ),
    (
        ReceiverCategory::Dict,
        &["keys", "values", "items", "get", "pop", "update", "setdefault"],
    ),
    (ReceiverCategory::Set, &["add", "remove", "union", "intersection", "discard"]),
    (ReceiverCategory::Deque, &["append", "appendleft", "pop", "popleft"]),
    (ReceiverCategory::Counter, &["most_common", "update"]),
    (ReceiverCategory::File, &["read", "write", "close", "readline", "readlines"]),
    (ReceiverCategory::Stream, &["getvalue", "write", "read"]),
    (ReceiverCategory::HashObject, &["update", "hexdigest", "digest"]),
    (ReceiverCategory::SqliteCursor, &["execute", "fetchone", "fetchall", "executemany"]),
    (ReceiverCategory::SqliteConnection, &["cursor", "commit", "close"]),
    (ReceiverCategory::UnittestSelf, &["assertEqual", "assertTrue", "assertFalse", "assertRaises"]),
    (ReceiverCategory::AsyncQueue, &["put", "get"]),
    (ReceiverCategory::SuperCall, &[]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_every_listed_builtin() {
        let registries = DispatchRegistries::new();
        for name in BUILTIN_NAMES {
            assert!(registries.is_builtin(name));
        }
    }

    #[test]
    fn rejects_unknown_builtin() {
        let registries = DispatchRegistries::new();
        assert!(!registries.is_builtin("not_a_builtin"));
    }

    #[test]
    fn finds_module_function() {
        let registries = DispatchRegistries::new();
        assert!(registries.is_module_function("math", "sqrt"));
        assert!(!registries.is_module_function("math", "frobnicate"));
    }

    #[test]
    fn finds_method_by_receiver_category() {
        let registries = DispatchRegistries::new();
        assert!(registries.is_method(ReceiverCategory::List, "append"));
        assert!(!registries.is_method(ReceiverCategory::Dict, "append"));
    }
}
