//! Class registry: single-parent inheritance flattened to composition
//! (spec §4.4/§4.7). `super()` calls are resolved here at compile time
//! rather than carried into the generated code as a runtime lookup.

use crate::ast::{Expr, ExprKind, Module, Stmt, StmtKind};
use crate::error::{CompileError, ErrorKind};
use crate::span::Span;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ClassMethod {
    pub name: String,
    pub owner: String,
}

#[derive(Debug, Clone, Default)]
pub struct ClassInfo {
    pub name: String,
    pub parent: Option<String>,
    pub methods: Vec<String>,
    pub fields: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassInfo>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from a parsed module's top-level `class` blocks.
    /// Relies on the source-order invariant already enforced by
    /// `register`: a base class must be defined lexically before its
    /// subclass, same as a legal Python program requires at import time.
    /// Single inheritance only — `parse_classdef` already rejects
    /// multiple bases, so at most the first listed base is consulted.
    pub fn from_module(module: &Module) -> Result<ClassRegistry, CompileError> {
        let mut registry = ClassRegistry::new();
        for stmt in &module.body {
            if let StmtKind::ClassDef { name, bases, body, .. } = &stmt.kind {
                let parent = bases.first().and_then(|b| match &b.kind {
                    ExprKind::Name(n) => Some(n.clone()),
                    _ => None,
                });
                let mut methods = Vec::new();
                let mut fields = Vec::new();
                for member in body {
                    if let StmtKind::FunctionDef {
                        name: method_name,
                        body: method_body,
                        ..
                    } = &member.kind
                    {
                        methods.push(method_name.clone());
                        collect_self_fields(method_body, &mut fields);
                    }
                }
                registry.register(name, parent.as_deref(), methods, fields, stmt.span)?;
            }
        }
        Ok(registry)
    }

    /// Registers a class. Rejects a parent that would close a cycle
    /// (spec's cycle-detection invariant for single inheritance) and a
    /// parent that hasn't been registered yet — classes must be declared
    /// in dependency order, same as the source file's lexical order for
    /// any legal Python program.
    pub fn register(
        &mut self,
        name: &str,
        parent: Option<&str>,
        methods: Vec<String>,
        fields: Vec<String>,
        span: Span,
    ) -> Result<(), CompileError> {
        if let Some(parent_name) = parent {
            if parent_name == name {
                return Err(CompileError::at(
                    ErrorKind::SemanticError(format!("class '{name}' inherits from itself")),
                    span,
                ));
            }
            if !self.classes.contains_key(parent_name) {
                return Err(CompileError::at(
                    ErrorKind::SemanticError(format!(
                        "base class '{parent_name}' of '{name}' is not defined"
                    )),
                    span,
                ));
            }
            self.assert_acyclic(name, parent_name, span)?;
        }
        self.classes.insert(
            name.to_string(),
            ClassInfo {
                name: name.to_string(),
                parent: parent.map(str::to_string),
                methods,
                fields,
            },
        );
        Ok(())
    }

    fn assert_acyclic(&self, name: &str, parent: &str, span: Span) -> Result<(), CompileError> {
        let mut current = Some(parent.to_string());
        let mut seen = vec![name.to_string()];
        while let Some(c) = current {
            if seen.contains(&c) {
                return Err(CompileError::at(
                    ErrorKind::SemanticError(format!(
                        "inheritance cycle detected at class '{c}'"
                    )),
                    span,
                ));
            }
            seen.push(c.clone());
            current = self.classes.get(&c).and_then(|info| info.parent.clone());
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.classes.get(name).and_then(|c| c.parent.as_deref())
    }

    /// Resolves `self.<method>()` through the MRO (child, then its
    /// ancestor chain) and returns the class that owns the first match.
    pub fn find_method(&self, class_name: &str, method: &str) -> Option<ClassMethod> {
        let mut current = Some(class_name.to_string());
        while let Some(name) = current {
            let info = self.classes.get(&name)?;
            if info.methods.iter().any(|m| m == method) {
                return Some(ClassMethod {
                    name: method.to_string(),
                    owner: name,
                });
            }
            current = info.parent.clone();
        }
        None
    }

    /// Resolves `super().<method>()` called from within `class_name`:
    /// skips `class_name` itself and starts the search at its parent.
    pub fn find_super_method(&self, class_name: &str, method: &str) -> Option<ClassMethod> {
        let parent = self.parent_of(class_name)?.to_string();
        self.find_method(&parent, method)
    }

    pub fn has_method(&self, class_name: &str, method: &str) -> bool {
        self.find_method(class_name, method).is_some()
    }

    /// All fields in MRO order, root ancestor first, so the flattened
    /// struct the code generator emits lays out base fields before the
    /// derived class's own.
    pub fn flattened_fields(&self, class_name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = Some(class_name.to_string());
        while let Some(name) = current {
            let Some(info) = self.classes.get(&name) else {
                break;
            };
            chain.push(info);
            current = info.parent.clone();
        }
        chain.reverse();
        let mut fields = Vec::new();
        for info in chain {
            for f in &info.fields {
                if !fields.contains(f) {
                    fields.push(f.clone());
                }
            }
        }
        fields
    }
}

/// Walks a method body for `self.<attr> = ...` assignments, the only
/// form that introduces an instance field (spec's "attribute list").
fn collect_self_fields(body: &[Stmt], fields: &mut Vec<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for t in targets {
                    record_self_target(t, fields);
                }
            }
            StmtKind::AnnAssign { target, .. } => record_self_target(target, fields),
            StmtKind::AugAssign { target, .. } => record_self_target(target, fields),
            StmtKind::If { body, orelse, .. } => {
                collect_self_fields(body, fields);
                collect_self_fields(orelse, fields);
            }
            StmtKind::While { body, orelse, .. } => {
                collect_self_fields(body, fields);
                collect_self_fields(orelse, fields);
            }
            StmtKind::For { body, orelse, .. } => {
                collect_self_fields(body, fields);
                collect_self_fields(orelse, fields);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finally_body,
            } => {
                collect_self_fields(body, fields);
                for h in handlers {
                    collect_self_fields(&h.body, fields);
                }
                collect_self_fields(orelse, fields);
                collect_self_fields(finally_body, fields);
            }
            StmtKind::With { body, .. } => collect_self_fields(body, fields),
            _ => {}
        }
    }
}

fn record_self_target(target: &Expr, fields: &mut Vec<String>) {
    if let ExprKind::Attribute { value, attr } = &target.kind {
        if matches!(&value.kind, ExprKind::Name(n) if n == "self") && !fields.contains(attr) {
            fields.push(attr.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span() -> Span {
        Span::new(0, 0)
    }

    #[test]
    fn registers_independent_classes() {
        let mut reg = ClassRegistry::new();
        reg.register("Animal", None, vec!["speak".into()], vec![], span())
            .unwrap();
        assert!(reg.get("Animal").is_some());
    }

    #[test]
    fn rejects_self_inheritance() {
        let mut reg = ClassRegistry::new();
        let err = reg
            .register("A", Some("A"), vec![], vec![], span())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::SemanticError(_)));
    }

    #[test]
    fn rejects_undefined_parent() {
        let mut reg = ClassRegistry::new();
        let err = reg
            .register("Dog", Some("Animal"), vec![], vec![], span())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::SemanticError(_)));
    }

    #[test]
    fn rejects_inheritance_cycle() {
        let mut reg = ClassRegistry::new();
        reg.register("A", None, vec![], vec![], span()).unwrap();
        reg.register("B", Some("A"), vec![], vec![], span())
            .unwrap();
        // Forge a cycle by hand: B's info.parent becomes A, now try to
        // register A again with B as its parent.
        let err = reg
            .register("A", Some("B"), vec![], vec![], span())
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::SemanticError(_)));
    }

    #[test]
    fn find_method_walks_up_the_chain() {
        let mut reg = ClassRegistry::new();
        reg.register("Animal", None, vec!["speak".into()], vec![], span())
            .unwrap();
        reg.register("Dog", Some("Animal"), vec!["fetch".into()], vec![], span())
            .unwrap();
        let found = reg.find_method("Dog", "speak").unwrap();
        assert_eq!(found.owner, "Animal");
    }

    #[test]
    fn super_method_skips_the_calling_class() {
        let mut reg = ClassRegistry::new();
        reg.register("Animal", None, vec!["speak".into()], vec![], span())
            .unwrap();
        reg.register("Dog", Some("Animal"), vec!["speak".into()], vec![], span())
            .unwrap();
        let found = reg.find_super_method("Dog", "speak").unwrap();
        assert_eq!(found.owner, "Animal");
    }

    #[test]
    fn flattened_fields_put_base_first() {
        let mut reg = ClassRegistry::new();
        reg.register("Animal", None, vec![], vec!["name".into()], span())
            .unwrap();
        reg.register(
            "Dog",
            Some("Animal"),
            vec![],
            vec!["breed".into()],
            span(),
        )
        .unwrap();
        assert_eq!(reg.flattened_fields("Dog"), vec!["name", "breed"]);
    }

    #[test]
    fn from_module_scans_methods_and_self_fields() {
        let module = crate::parser::Parser::parse(
            "class Animal:\n    def __init__(self, name):\n        self.name = name\n    def speak(self):\n        return self.name\n\nclass Dog(Animal):\n    def fetch(self):\n        return 1\n",
        )
        .unwrap();
        let reg = ClassRegistry::from_module(&module).unwrap();
        assert_eq!(reg.parent_of("Dog"), Some("Animal"));
        assert!(reg.has_method("Dog", "speak"));
        assert_eq!(reg.flattened_fields("Animal"), vec!["name"]);
    }
}
