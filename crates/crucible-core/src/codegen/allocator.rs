//! Allocator propagation analysis (spec §4.7 "Allocator propagation"):
//! a function is marked "needs allocator" iff its body transitively
//! performs an operation that requires dynamic allocation — string
//! formatting, container growth, closure capture by shared handle.
//! Runs before emission so every declaration site agrees with every
//! call site on whether the extra allocator parameter is present.

use crate::ast::{Expr, ExprKind, Module, Stmt, StmtKind};
use std::collections::{HashMap, HashSet};

pub type AllocatorAnalysis = HashMap<String, bool>;

const ALLOCATING_STRING_METHODS: &[&str] = &["format", "join", "replace", "split", "upper", "lower"];
const ALLOCATING_CONTAINER_METHODS: &[&str] =
    &["append", "extend", "insert", "update", "add", "appendleft"];

/// Fixpoint over the call graph: a function that calls another
/// allocator-needing function also needs one, so this iterates until no
/// function's flag changes, same shape as a classic reaching-definitions
/// dataflow pass.
pub fn analyze(module: &Module) -> AllocatorAnalysis {
    let mut direct_calls: HashMap<String, HashSet<String>> = HashMap::new();
    let mut needs = AllocatorAnalysis::new();

    for stmt in &module.body {
        if let StmtKind::FunctionDef { name, body, .. } = &stmt.kind {
            let mut calls = HashSet::new();
            let allocates = body_allocates(body, &mut calls);
            needs.insert(name.clone(), allocates);
            direct_calls.insert(name.clone(), calls);
        }
    }

    loop {
        let mut changed = false;
        let names: Vec<String> = needs.keys().cloned().collect();
        for name in names {
            if needs[&name] {
                continue;
            }
            let calls_allocator = direct_calls
                .get(&name)
                .into_iter()
                .flatten()
                .any(|callee| needs.get(callee).copied().unwrap_or(false));
            if calls_allocator {
                needs.insert(name.clone(), true);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    needs
}

fn body_allocates(body: &[Stmt], calls: &mut HashSet<String>) -> bool {
    let mut allocates = false;
    for stmt in body {
        allocates |= stmt_allocates(stmt, calls);
    }
    allocates
}

fn stmt_allocates(stmt: &Stmt, calls: &mut HashSet<String>) -> bool {
    match &stmt.kind {
        StmtKind::Assign { value, .. }
        | StmtKind::Return(Some(value))
        | StmtKind::ExprStmt(value) => expr_allocates(value, calls),
        StmtKind::AugAssign { value, .. } => expr_allocates(value, calls),
        StmtKind::If { test, body, orelse } => {
            expr_allocates(test, calls) | body_allocates(body, calls) | body_allocates(orelse, calls)
        }
        StmtKind::While { test, body, orelse } => {
            expr_allocates(test, calls) | body_allocates(body, calls) | body_allocates(orelse, calls)
        }
        StmtKind::For {
            iter, body, orelse, ..
        } => expr_allocates(iter, calls) | body_allocates(body, calls) | body_allocates(orelse, calls),
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finally_body,
        } => {
            let mut acc = body_allocates(body, calls);
            for h in handlers {
                acc |= body_allocates(&h.body, calls);
            }
            acc |= body_allocates(orelse, calls);
            acc |= body_allocates(finally_body, calls);
            acc
        }
        StmtKind::With { items, body, .. } => {
            let mut acc = body_allocates(body, calls);
            for (ctx, _) in items {
                acc |= expr_allocates(ctx, calls);
            }
            acc
        }
        StmtKind::FunctionDef { .. } => {
            // Any nested function with a free-variable capture needs an
            // allocator for its closure struct; closures.rs decides the
            // capture mode, this pass conservatively assumes yes.
            true
        }
        _ => false,
    }
}

fn expr_allocates(expr: &Expr, calls: &mut HashSet<String>) -> bool {
    match &expr.kind {
        ExprKind::Call { func, args, keywords } => {
            let mut acc = false;
            if let ExprKind::Name(name) = &func.kind {
                calls.insert(name.clone());
            }
            if let ExprKind::Attribute { attr, value } = &func.kind {
                if ALLOCATING_STRING_METHODS.contains(&attr.as_str())
                    || ALLOCATING_CONTAINER_METHODS.contains(&attr.as_str())
                {
                    acc = true;
                }
                acc |= expr_allocates(value, calls);
            } else {
                acc |= expr_allocates(func, calls);
            }
            for a in args {
                acc |= expr_allocates(a, calls);
            }
            for (_, v) in keywords {
                acc |= expr_allocates(v, calls);
            }
            acc
        }
        ExprKind::Constant(crate::ast::Literal::FString(_)) => true,
        ExprKind::BinOp { left, right, .. } => expr_allocates(left, calls) | expr_allocates(right, calls),
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
            !items.is_empty() || items.iter().any(|i| expr_allocates(i, calls))
        }
        ExprKind::Dict(pairs) => !pairs.is_empty(),
        ExprKind::ListComp { .. } | ExprKind::DictComp { .. } | ExprKind::GenExp { .. } => true,
        ExprKind::Lambda { .. } => true,
        ExprKind::IfExpr { test, body, orelse } => {
            expr_allocates(test, calls) | expr_allocates(body, calls) | expr_allocates(orelse, calls)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    #[test]
    fn function_building_a_list_needs_allocator() {
        let m = Parser::parse("def f():\n    return [1, 2, 3]\n").unwrap();
        let analysis = analyze(&m);
        assert!(analysis["f"]);
    }

    #[test]
    fn pure_arithmetic_function_does_not_need_allocator() {
        let m = Parser::parse("def add(a, b):\n    return a + b\n").unwrap();
        let analysis = analyze(&m);
        assert!(!analysis["add"]);
    }

    #[test]
    fn allocator_need_propagates_through_call_graph() {
        let m = Parser::parse(
            "def leaf():\n    return [1]\ndef caller():\n    return leaf()\n",
        )
        .unwrap();
        let analysis = analyze(&m);
        assert!(analysis["leaf"]);
        assert!(analysis["caller"]);
    }

    #[test]
    fn fstring_literal_marks_allocator_need() {
        let m = Parser::parse("def f(x):\n    return f\"{x}\"\n").unwrap();
        let analysis = analyze(&m);
        assert!(analysis["f"]);
    }
}
