//! Scope stack for name resolution (spec §4.4/§4.5).
//!
//! Mirrors Python's LEGB lookup order but closed over a fixed scope
//! stack rather than dynamic frames: a `global` statement redirects a
//! binding to the module scope, `nonlocal` to the nearest enclosing
//! function scope, anything else binds in the current scope.

use crate::native_type::NativeType;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Class,
    Comprehension,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub ty: NativeType,
    pub mutated: bool,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bindings: HashMap<String, Binding>,
    globals: Vec<String>,
    nonlocals: Vec<String>,
}

/// A stack of lexical scopes, innermost last.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Module,
                bindings: HashMap::new(),
                globals: Vec::new(),
                nonlocals: Vec::new(),
            }],
        }
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            bindings: HashMap::new(),
            globals: Vec::new(),
            nonlocals: Vec::new(),
        });
    }

    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the module scope");
        self.scopes.pop();
    }

    pub fn declare_global(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("at least one scope")
            .globals
            .push(name.to_string());
    }

    pub fn declare_nonlocal(&mut self, name: &str) {
        self.scopes
            .last_mut()
            .expect("at least one scope")
            .nonlocals
            .push(name.to_string());
    }

    /// Binds `name` in the scope redirected to by a prior `global`/`nonlocal`
    /// declaration, or in the current scope otherwise.
    pub fn bind(&mut self, name: &str, ty: NativeType) {
        let target = self.target_scope_index(name);
        let binding = Binding {
            ty,
            mutated: false,
        };
        self.scopes[target]
            .bindings
            .entry(name.to_string())
            .and_modify(|b| b.ty = binding.ty.clone())
            .or_insert(binding);
    }

    pub fn mark_mutated(&mut self, name: &str) {
        let target = self.target_scope_index(name);
        if let Some(b) = self.scopes[target].bindings.get_mut(name) {
            b.mutated = true;
        }
    }

    fn target_scope_index(&self, name: &str) -> usize {
        let current = self.scopes.last().expect("at least one scope");
        if current.globals.iter().any(|g| g == name) {
            return 0;
        }
        if current.nonlocals.iter().any(|n| n == name) {
            for idx in (0..self.scopes.len() - 1).rev() {
                if self.scopes[idx].kind == ScopeKind::Function {
                    return idx;
                }
            }
        }
        self.scopes.len() - 1
    }

    /// LEGB lookup, skipping class scopes the way Python does when
    /// resolving names from inside a method body.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        for (idx, scope) in self.scopes.iter().enumerate().rev() {
            if scope.kind == ScopeKind::Class && idx != self.scopes.len() - 1 {
                continue;
            }
            if let Some(binding) = scope.bindings.get(name) {
                return Some(binding);
            }
        }
        None
    }

    pub fn is_bound_locally(&self, name: &str) -> bool {
        self.scopes
            .last()
            .expect("at least one scope")
            .bindings
            .contains_key(name)
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes.last().expect("at least one scope").kind
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_and_looks_up_in_current_scope() {
        let mut table = SymbolTable::new();
        table.bind("x", NativeType::Int);
        assert_eq!(table.lookup("x").unwrap().ty, NativeType::Int);
    }

    #[test]
    fn inner_scope_sees_outer_binding() {
        let mut table = SymbolTable::new();
        table.bind("x", NativeType::Int);
        table.push_scope(ScopeKind::Function);
        assert_eq!(table.lookup("x").unwrap().ty, NativeType::Int);
    }

    #[test]
    fn global_declaration_binds_in_module_scope() {
        let mut table = SymbolTable::new();
        table.push_scope(ScopeKind::Function);
        table.declare_global("counter");
        table.bind("counter", NativeType::Int);
        table.pop_scope();
        assert!(table.lookup("counter").is_some());
    }

    #[test]
    fn class_scope_is_invisible_to_nested_function_lookup() {
        let mut table = SymbolTable::new();
        table.push_scope(ScopeKind::Class);
        table.bind("attr", NativeType::Int);
        table.push_scope(ScopeKind::Function);
        assert!(table.lookup("attr").is_none());
    }

    #[test]
    fn mark_mutated_flags_the_binding() {
        let mut table = SymbolTable::new();
        table.bind("items", NativeType::List(Box::new(NativeType::Int)));
        table.mark_mutated("items");
        assert!(table.lookup("items").unwrap().mutated);
    }

    #[test]
    fn prop_balanced_push_pop_returns_to_the_starting_depth() {
        fn prop(push_count: u8) -> bool {
            let mut table = SymbolTable::new();
            let n = push_count as usize % 32;
            for _ in 0..n {
                table.push_scope(ScopeKind::Function);
            }
            for _ in 0..n {
                table.pop_scope();
            }
            table.depth() == 1
        }
        quickcheck::quickcheck(prop as fn(u8) -> bool);
    }

    #[test]
    #[should_panic(expected = "cannot pop the module scope")]
    fn pop_scope_never_goes_below_the_module_scope() {
        let mut table = SymbolTable::new();
        table.pop_scope();
    }
}
