//! Container element type refinement from usage patterns. A bare
//! `list`/`dict`/`set` annotation (or an empty literal) infers as
//! `List(Unknown)` from [`crate::infer`] alone; this pass tightens the
//! element type by watching how the container is actually used — a
//! `for` loop target compared against an int, an `append` call with a
//! known-typed argument, and so on.

use crucible_core::ast::{ExprKind, Literal, Stmt, StmtKind};
use crucible_core::native_type::NativeType;

pub fn has_unknown_inner_type(ty: &NativeType) -> bool {
    match ty {
        NativeType::List(elem) | NativeType::Set(elem) => matches!(elem.as_ref(), NativeType::Unknown),
        NativeType::Dict(_, val) => matches!(val.as_ref(), NativeType::Unknown),
        _ => false,
    }
}

pub fn infer_container_element_type(
    container_name: &str,
    container_type: &NativeType,
    body: &[Stmt],
) -> Option<NativeType> {
    match container_type {
        NativeType::List(elem) if matches!(elem.as_ref(), NativeType::Unknown) => {
            infer_element_type(container_name, body).map(|e| NativeType::List(Box::new(e)))
        }
        NativeType::Set(elem) if matches!(elem.as_ref(), NativeType::Unknown) => {
            infer_element_type(container_name, body).map(|e| NativeType::Set(Box::new(e)))
        }
        NativeType::Dict(key, val) if matches!(val.as_ref(), NativeType::Unknown) => {
            let key_ty = if matches!(key.as_ref(), NativeType::Unknown) {
                NativeType::String
            } else {
                key.as_ref().clone()
            };
            infer_value_type(container_name, body)
                .map(|v| NativeType::Dict(Box::new(key_ty), Box::new(v)))
        }
        _ => None,
    }
}

fn infer_element_type(container_name: &str, body: &[Stmt]) -> Option<NativeType> {
    infer_from_for_loop(container_name, body).or_else(|| infer_from_append(container_name, body))
}

fn infer_from_for_loop(container_name: &str, body: &[Stmt]) -> Option<NativeType> {
    for stmt in body {
        if let StmtKind::For { target, iter, body: loop_body, .. } = &stmt.kind {
            if matches!(&iter.kind, ExprKind::Name(n) if n == container_name) {
                if let ExprKind::Name(loop_var) = &target.kind {
                    if let Some(ty) = type_from_loop_var_usage(loop_var, loop_body) {
                        return Some(ty);
                    }
                }
            }
        }
        if let Some(ty) = recurse(stmt, |b| infer_from_for_loop(container_name, b)) {
            return Some(ty);
        }
    }
    None
}

fn type_from_loop_var_usage(loop_var: &str, body: &[Stmt]) -> Option<NativeType> {
    for stmt in body {
        if let StmtKind::If { test, .. } = &stmt.kind {
            if let ExprKind::Compare { left, comparators, .. } = &test.kind {
                if matches!(&left.kind, ExprKind::Name(n) if n == loop_var) {
                    if let Some(c) = comparators.first() {
                        if let ExprKind::Constant(lit) = &c.kind {
                            return Some(literal_type(lit));
                        }
                    }
                }
            }
        }
        if let StmtKind::ExprStmt(e) = &stmt.kind {
            if let ExprKind::Call { func, args, .. } = &e.kind {
                if matches!(&func.kind, ExprKind::Name(n) if n == "print") {
                    if args.iter().any(|a| matches!(&a.kind, ExprKind::Name(n) if n == loop_var)) {
                        return Some(NativeType::String);
                    }
                }
            }
        }
    }
    None
}

fn infer_from_append(container_name: &str, body: &[Stmt]) -> Option<NativeType> {
    for stmt in body {
        if let StmtKind::ExprStmt(e) = &stmt.kind {
            if let ExprKind::Call { func, args, .. } = &e.kind {
                if let ExprKind::Attribute { value, attr } = &func.kind {
                    if attr == "append" && matches!(&value.kind, ExprKind::Name(n) if n == container_name) {
                        if let Some(arg) = args.first() {
                            if let ExprKind::Constant(lit) = &arg.kind {
                                return Some(literal_type(lit));
                            }
                        }
                    }
                }
            }
        }
        if let Some(ty) = recurse(stmt, |b| infer_from_append(container_name, b)) {
            return Some(ty);
        }
    }
    None
}

fn infer_value_type(container_name: &str, body: &[Stmt]) -> Option<NativeType> {
    for stmt in body {
        if let StmtKind::Assign { targets, value } = &stmt.kind {
            for t in targets {
                if let ExprKind::Subscript { value: base, .. } = &t.kind {
                    if matches!(&base.kind, ExprKind::Name(n) if n == container_name) {
                        if let ExprKind::Constant(lit) = &value.kind {
                            return Some(literal_type(lit));
                        }
                    }
                }
            }
        }
        if let Some(ty) = recurse(stmt, |b| infer_value_type(container_name, b)) {
            return Some(ty);
        }
    }
    None
}

fn literal_type(lit: &Literal) -> NativeType {
    match lit {
        Literal::Int(_) => NativeType::Int,
        Literal::Float(_) => NativeType::Float,
        Literal::Str(_) | Literal::FString(_) => NativeType::String,
        Literal::Bool(_) => NativeType::Bool,
        Literal::None => NativeType::None,
    }
}

fn recurse(stmt: &Stmt, f: impl Fn(&[Stmt]) -> Option<NativeType> + Copy) -> Option<NativeType> {
    match &stmt.kind {
        StmtKind::If { body, orelse, .. } => f(body).or_else(|| f(orelse)),
        StmtKind::While { body, orelse, .. } => f(body).or_else(|| f(orelse)),
        StmtKind::For { body, orelse, .. } => f(body).or_else(|| f(orelse)),
        StmtKind::With { body, .. } => f(body),
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finally_body,
        } => f(body)
            .or_else(|| handlers.iter().find_map(|h| f(&h.body)))
            .or_else(|| f(orelse))
            .or_else(|| f(finally_body)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::parser::Parser;

    #[test]
    fn refines_list_element_from_append_literal() {
        let module = Parser::parse("def f():\n    xs = []\n    xs.append(1)\n").unwrap();
        let StmtKind::FunctionDef { body, .. } = &module.body[0].kind else { panic!() };
        let refined = infer_container_element_type(
            "xs",
            &NativeType::List(Box::new(NativeType::Unknown)),
            body,
        );
        assert_eq!(refined, Some(NativeType::List(Box::new(NativeType::Int))));
    }

    #[test]
    fn refines_dict_value_from_subscript_assignment() {
        let module = Parser::parse("def f():\n    d = {}\n    d['k'] = 1\n").unwrap();
        let StmtKind::FunctionDef { body, .. } = &module.body[0].kind else { panic!() };
        let refined = infer_container_element_type(
            "d",
            &NativeType::Dict(Box::new(NativeType::Unknown), Box::new(NativeType::Unknown)),
            body,
        );
        assert_eq!(
            refined,
            Some(NativeType::Dict(Box::new(NativeType::String), Box::new(NativeType::Int)))
        );
    }

    #[test]
    fn no_refinement_when_no_usage_signal() {
        let module = Parser::parse("def f():\n    xs = []\n    return xs\n").unwrap();
        let StmtKind::FunctionDef { body, .. } = &module.body[0].kind else { panic!() };
        let refined = infer_container_element_type(
            "xs",
            &NativeType::List(Box::new(NativeType::Unknown)),
            body,
        );
        assert_eq!(refined, None);
    }
}
