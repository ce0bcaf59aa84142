//! Class emission (spec §4.7 "Classes"): a class becomes a record type
//! with one field per attribute plus its methods. Inheritance is
//! flattened via composition — a child record holds its parent as a
//! field and forwards calls via explicit delegation built from the
//! class registry. `super().m(args)` lowers to `Parent_m(parent_field, args)`.

use super::{Codegen, ScopeState};
use crate::ast::{Stmt, StmtKind};
use crate::error::CompileResult;

pub fn emit_class(cg: &mut Codegen, name: &str, bases: &[crate::ast::Expr], body: &[Stmt]) -> CompileResult<()> {
    let parent = bases.first().and_then(|b| match &b.kind {
        crate::ast::ExprKind::Name(n) => Some(n.clone()),
        _ => None,
    });

    cg.writeln(&format!("record {name} {{"));
    cg.indent();
    if let Some(parent_name) = &parent {
        cg.writeln(&format!("parent: {parent_name},"));
    }
    for field in cg.classes.get(name).map(|c| c.fields.clone()).unwrap_or_default() {
        cg.writeln(&format!("{field}: unknown,"));
    }
    cg.dedent();
    cg.writeln("}");

    cg.push_scope(ScopeState::ClassBody);
    cg.push_class_name(name);
    for stmt in body {
        if let StmtKind::FunctionDef {
            name: method_name,
            params,
            body: method_body,
            ..
        } = &stmt.kind
        {
            emit_method(cg, name, parent.as_deref(), method_name, params, method_body)?;
        }
    }
    cg.pop_class_name();
    cg.pop_scope();
    Ok(())
}

fn emit_method(
    cg: &mut Codegen,
    class_name: &str,
    parent: Option<&str>,
    method_name: &str,
    params: &[crate::ast::Param],
    body: &[Stmt],
) -> CompileResult<()> {
    cg.push_scope(ScopeState::Method);
    let receiver = cg.self_ident();
    let param_list = params
        .iter()
        .skip(1) // skip `self`
        .map(|p| p.name.clone())
        .collect::<Vec<_>>()
        .join(", ");
    let needs_allocator = cg.needs_allocator.get(method_name).copied().unwrap_or(false);
    let alloc_param = if needs_allocator { ", alloc" } else { "" };
    cg.writeln(&format!(
        "fn {class_name}_{method_name}({receiver}: &mut {class_name}, {param_list}{alloc_param}) {{"
    ));
    cg.indent();

    // If this class overrides a method that also exists on the parent
    // and the body never calls `super()`, the parent's implementation is
    // simply unreachable through this record — still emitted, for the
    // case another subclass's `super()` targets it directly.
    if let Some(parent_name) = parent {
        if cg.classes.has_method(parent_name, method_name) {
            cg.writeln(&format!(
                "// overrides {parent_name}::{method_name}"
            ));
        }
    }

    super::stmt::emit_stmts(cg, body)?;
    cg.dedent();
    cg.writeln("}");
    cg.pop_scope();
    Ok(())
}

/// Resolves `super().method(args)` against the class registry and
/// writes the delegating call directly — there is no runtime vtable,
/// the owner is decided once at compile time.
pub fn emit_super_call(
    cg: &mut Codegen,
    current_class: &str,
    method: &str,
    args_rendered: &str,
) -> CompileResult<String> {
    match cg.classes.find_super_method(current_class, method) {
        Some(resolved) => Ok(format!(
            "{}_{}(&mut {}.parent{}{})",
            resolved.owner,
            method,
            cg.self_ident(),
            if args_rendered.is_empty() { "" } else { ", " },
            args_rendered
        )),
        None => Err(crate::error::CompileError::new(
            crate::error::ErrorKind::SemanticError(format!(
                "class '{current_class}' has no base class defining '{method}'"
            )),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_registry::ClassRegistry;
    use crate::module_registry::ModuleRegistry;
    use crate::symbol_table::SymbolTable;

    #[test]
    fn super_call_resolves_to_parent_owner() {
        let mut classes = ClassRegistry::new();
        classes
            .register("Animal", None, vec!["speak".into()], vec![], crate::span::Span::new(0, 0))
            .unwrap();
        classes
            .register(
                "Dog",
                Some("Animal"),
                vec!["speak".into()],
                vec![],
                crate::span::Span::new(0, 0),
            )
            .unwrap();
        let modules = ModuleRegistry::with_stdlib();
        let symbols = SymbolTable::new();
        let mut cg = Codegen::new(&classes, &modules, &symbols);
        let rendered = emit_super_call(&mut cg, "Dog", "speak", "").unwrap();
        assert!(rendered.starts_with("Animal_speak"));
    }

    #[test]
    fn super_call_without_base_method_is_semantic_error() {
        let mut classes = ClassRegistry::new();
        classes
            .register("Standalone", None, vec![], vec![], crate::span::Span::new(0, 0))
            .unwrap();
        let modules = ModuleRegistry::with_stdlib();
        let symbols = SymbolTable::new();
        let mut cg = Codegen::new(&classes, &modules, &symbols);
        assert!(emit_super_call(&mut cg, "Standalone", "speak", "").is_err());
    }
}
