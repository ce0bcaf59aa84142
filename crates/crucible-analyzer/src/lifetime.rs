//! Symbol lifetime tracking (spec §4.4): first-assignment site,
//! reassignment count, and read count per local. An identifier
//! appearing on the left of `=` in a function body is local to that
//! function unless declared `global`; a `global` declaration hoists the
//! name to module scope before first use.

use crucible_core::ast::{Expr, ExprKind, Stmt, StmtKind};
use crucible_core::span::Span;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct LifetimeInfo {
    pub first_assignment: Option<Span>,
    pub reassignment_count: u32,
    pub read_count: u32,
    pub is_global: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LifetimeReport {
    pub locals: HashMap<String, LifetimeInfo>,
}

pub fn analyze_lifetimes(body: &[Stmt]) -> LifetimeReport {
    let mut report = LifetimeReport::default();
    let mut globals = std::collections::HashSet::new();
    collect_globals(body, &mut globals);
    for name in &globals {
        report
            .locals
            .entry(name.clone())
            .or_default()
            .is_global = true;
    }
    for stmt in body {
        scan_stmt(stmt, &mut report);
    }
    report
}

fn collect_globals(body: &[Stmt], globals: &mut std::collections::HashSet<String>) {
    for stmt in body {
        if let StmtKind::Global(names) = &stmt.kind {
            for n in names {
                globals.insert(n.clone());
            }
        }
    }
}

fn scan_stmt(stmt: &Stmt, report: &mut LifetimeReport) {
    match &stmt.kind {
        StmtKind::Assign { targets, value } => {
            scan_expr_read(value, report);
            for t in targets {
                record_assignment(t, stmt.span, report);
            }
        }
        StmtKind::AnnAssign { target, value, .. } => {
            if let Some(v) = value {
                scan_expr_read(v, report);
            }
            record_assignment(target, stmt.span, report);
        }
        StmtKind::AugAssign { target, value, .. } => {
            scan_expr_read(target, report);
            scan_expr_read(value, report);
            record_assignment(target, stmt.span, report);
        }
        StmtKind::ExprStmt(e) | StmtKind::Return(Some(e)) => scan_expr_read(e, report),
        StmtKind::If { test, body, orelse } => {
            scan_expr_read(test, report);
            for s in body.iter().chain(orelse) {
                scan_stmt(s, report);
            }
        }
        StmtKind::While { test, body, orelse } => {
            scan_expr_read(test, report);
            for s in body.iter().chain(orelse) {
                scan_stmt(s, report);
            }
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
            ..
        } => {
            scan_expr_read(iter, report);
            record_assignment(target, stmt.span, report);
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
        StmtKind::With { items, body, .. } => {
            for (ctx, target) in items {
                scan_expr_read(ctx, report);
                if let Some(t) = target {
                    record_assignment(t, stmt.span, report);
                }
            }
            for s in body {
                scan_stmt(s, report);
            }
        }
        _ => {}
    }
}

fn record_assignment(target: &Expr, span: Span, report: &mut LifetimeReport) {
    match &target.kind {
        ExprKind::Name(name) => {
            let info = report.locals.entry(name.clone()).or_default();
            if info.first_assignment.is_none() {
                info.first_assignment = Some(span);
            } else {
                info.reassignment_count += 1;
            }
        }
        ExprKind::Tuple(items) | ExprKind::List(items) => {
            for item in items {
                record_assignment(item, span, report);
            }
        }
        _ => {}
    }
}

fn scan_expr_read(expr: &Expr, report: &mut LifetimeReport) {
    match &expr.kind {
        ExprKind::Name(name) => {
            report.locals.entry(name.clone()).or_default().read_count += 1;
        }
        ExprKind::Attribute { value, .. } | ExprKind::Starred(value) | ExprKind::Await(value) => {
            scan_expr_read(value, report)
        }
        ExprKind::Subscript { value, index } => {
            scan_expr_read(value, report);
            scan_expr_read(index, report);
        }
        ExprKind::Call { func, args, keywords } => {
            scan_expr_read(func, report);
            for a in args {
                scan_expr_read(a, report);
            }
            for (_, v) in keywords {
                scan_expr_read(v, report);
            }
        }
        ExprKind::BinOp { left, right, .. } => {
            scan_expr_read(left, report);
            scan_expr_read(right, report);
        }
        ExprKind::UnaryOp { operand, .. } => scan_expr_read(operand, report),
        ExprKind::BoolOp { values, .. } => {
            for v in values {
                scan_expr_read(v, report);
            }
        }
        ExprKind::Compare {
            left, comparators, ..
        } => {
            scan_expr_read(left, report);
            for c in comparators {
                scan_expr_read(c, report);
            }
        }
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
            for i in items {
                scan_expr_read(i, report);
            }
        }
        ExprKind::Dict(pairs) => {
            for (k, v) in pairs {
                scan_expr_read(k, report);
                scan_expr_read(v, report);
            }
        }
        ExprKind::IfExpr { test, body, orelse } => {
            scan_expr_read(test, report);
            scan_expr_read(body, report);
            scan_expr_read(orelse, report);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::ast::StmtKind;
    use crucible_core::parser::Parser;

    fn body_of(src: &str) -> Vec<Stmt> {
        match &Parser::parse(src).unwrap().body[0].kind {
            StmtKind::FunctionDef { body, .. } => body.clone(),
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn first_assignment_is_recorded_once() {
        let body = body_of("def f():\n    x = 1\n    x = 2\n    return x\n");
        let report = analyze_lifetimes(&body);
        let x = &report.locals["x"];
        assert!(x.first_assignment.is_some());
        assert_eq!(x.reassignment_count, 1);
        assert_eq!(x.read_count, 1);
    }

    #[test]
    fn global_declaration_is_tracked() {
        let body = body_of("def f():\n    global counter\n    counter = 1\n");
        let report = analyze_lifetimes(&body);
        assert!(report.locals["counter"].is_global);
    }

    #[test]
    fn for_loop_target_counts_as_assignment() {
        let body = body_of("def f():\n    for i in range(3):\n        print(i)\n");
        let report = analyze_lifetimes(&body);
        assert!(report.locals["i"].first_assignment.is_some());
    }
}
