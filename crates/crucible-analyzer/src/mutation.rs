//! Mutation detection (spec §4.4): for each container-typed local,
//! whether it is mutated through a known mutating method or subscript
//! assignment. Names come from a fixed table (resolved open question,
//! see DESIGN.md): `append, extend, insert, remove, pop, clear, sort,
//! reverse, update, setdefault, popitem, add, discard, __setitem__`.

use crucible_core::ast::{Expr, ExprKind, Stmt, StmtKind};
use std::collections::HashSet;

pub const MUTATING_METHODS: &[&str] = &[
    "append",
    "extend",
    "insert",
    "remove",
    "pop",
    "clear",
    "sort",
    "reverse",
    "update",
    "setdefault",
    "popitem",
    "add",
    "discard",
];

#[derive(Debug, Default)]
pub struct MutationReport {
    pub mutated: HashSet<String>,
}

pub fn analyze_mutations(body: &[Stmt]) -> MutationReport {
    let mut report = MutationReport::default();
    for stmt in body {
        scan_stmt(stmt, &mut report);
    }
    report
}

fn scan_stmt(stmt: &Stmt, report: &mut MutationReport) {
    match &stmt.kind {
        StmtKind::ExprStmt(e) => scan_expr(e, report),
        StmtKind::Assign { targets, value } => {
            scan_expr(value, report);
            for t in targets {
                // `x[i] = v` is the `__setitem__` mutating form.
                if let ExprKind::Subscript { value, .. } = &t.kind {
                    if let ExprKind::Name(name) = &value.kind {
                        report.mutated.insert(name.clone());
                    }
                }
            }
        }
        StmtKind::AugAssign { target, .. } => {
            if let ExprKind::Name(name) = &target.kind {
                report.mutated.insert(name.clone());
            }
        }
        StmtKind::If { test, body, orelse } => {
            scan_expr(test, report);
            for s in body.iter().chain(orelse) {
                scan_stmt(s, report);
            }
        }
        StmtKind::While { test, body, orelse } => {
            scan_expr(test, report);
            for s in body.iter().chain(orelse) {
                scan_stmt(s, report);
            }
        }
        StmtKind::For {
            iter, body, orelse, ..
        } => {
            scan_expr(iter, report);
            for s in body.iter().chain(orelse) {
                scan_stmt(s, report);
            }
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finally_body,
        } => {
            for s in body {
                scan_stmt(s, report);
            }
            for h in handlers {
                for s in &h.body {
                    scan_stmt(s, report);
                }
            }
            for s in orelse.iter().chain(finally_body) {
                scan_stmt(s, report);
            }
        }
        StmtKind::With { body, .. } => {
            for s in body {
                scan_stmt(s, report);
            }
        }
        StmtKind::Return(Some(e)) => scan_expr(e, report),
        _ => {}
    }
}

fn scan_expr(expr: &Expr, report: &mut MutationReport) {
    if let ExprKind::Call { func, args, .. } = &expr.kind {
        if let ExprKind::Attribute { value, attr } = &func.kind {
            if MUTATING_METHODS.contains(&attr.as_str()) {
                if let ExprKind::Name(name) = &value.kind {
                    report.mutated.insert(name.clone());
                }
            }
        }
        for a in args {
            scan_expr(a, report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::parser::Parser;

    fn body_of(src: &str) -> Vec<Stmt> {
        match &Parser::parse(src).unwrap().body[0].kind {
            StmtKind::FunctionDef { body, .. } => body.clone(),
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn append_call_flags_the_receiver_as_mutated() {
        let body = body_of("def f():\n    items = []\n    items.append(1)\n");
        let report = analyze_mutations(&body);
        assert!(report.mutated.contains("items"));
    }

    #[test]
    fn subscript_assignment_flags_mutation() {
        let body = body_of("def f():\n    d = {}\n    d['k'] = 1\n");
        let report = analyze_mutations(&body);
        assert!(report.mutated.contains("d"));
    }

    #[test]
    fn read_only_method_does_not_flag_mutation() {
        let body = body_of("def f():\n    s = 'hi'\n    s.upper()\n");
        let report = analyze_mutations(&body);
        assert!(!report.mutated.contains("s"));
    }

    #[test]
    fn aug_assign_flags_mutation() {
        let body = body_of("def f():\n    total = 0\n    total += 1\n");
        let report = analyze_mutations(&body);
        assert!(report.mutated.contains("total"));
    }
}
