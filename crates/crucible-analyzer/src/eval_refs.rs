//! `eval`/`exec` free-identifier tracking (spec §4.4): for each
//! `eval`/`exec` string literal, the set of free identifiers referenced
//! inside so codegen can keep those bindings alive across the call even
//! though nothing in the surrounding scope visibly reads them.

use crucible_core::ast::{Expr, ExprKind, Literal, Stmt, StmtKind};
use crucible_core::parser::Parser;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct EvalSite {
    pub literal: String,
    pub free_identifiers: Vec<String>,
}

pub fn find_eval_sites(body: &[Stmt]) -> Vec<EvalSite> {
    let mut sites = Vec::new();
    for stmt in body {
        scan_stmt(stmt, &mut sites);
    }
    sites
}

fn scan_stmt(stmt: &Stmt, sites: &mut Vec<EvalSite>) {
    match &stmt.kind {
        StmtKind::ExprStmt(e) | StmtKind::Return(Some(e)) => scan_expr(e, sites),
        StmtKind::Assign { value, .. } => scan_expr(value, sites),
        StmtKind::If { test, body, orelse } => {
            scan_expr(test, sites);
            for s in body.iter().chain(orelse) {
                scan_stmt(s, sites);
            }
        }
        StmtKind::While { test, body, orelse } => {
            scan_expr(test, sites);
            for s in body.iter().chain(orelse) {
                scan_stmt(s, sites);
            }
        }
        StmtKind::For { body, orelse, .. } => {
            for s in body.iter().chain(orelse) {
                scan_stmt(s, sites);
            }
        }
        _ => {}
    }
}

fn scan_expr(expr: &Expr, sites: &mut Vec<EvalSite>) {
    if let ExprKind::Call { func, args, .. } = &expr.kind {
        if let ExprKind::Name(name) = &func.kind {
            if (name == "eval" || name == "exec") && args.len() == 1 {
                if let ExprKind::Constant(Literal::Str(literal)) = &args[0].kind {
                    sites.push(EvalSite {
                        literal: literal.clone(),
                        free_identifiers: free_identifiers_in(literal),
                    });
                }
            }
        }
        for a in args {
            scan_expr(a, sites);
        }
    }
}

/// Parses the literal as an expression-or-module and collects every
/// `Name` it reads. A literal that doesn't parse as valid source yields
/// an empty set rather than failing the whole analysis — the embedded
/// runtime VM surfaces its own diagnostic at execution time.
fn free_identifiers_in(literal: &str) -> Vec<String> {
    let Ok(module) = Parser::parse(&format!("{literal}\n")) else {
        return Vec::new();
    };
    let mut names = HashSet::new();
    for stmt in &module.body {
        collect_names_in_stmt(stmt, &mut names);
    }
    let mut out: Vec<String> = names.into_iter().collect();
    out.sort();
    out
}

fn collect_names_in_stmt(stmt: &Stmt, names: &mut HashSet<String>) {
    match &stmt.kind {
        StmtKind::ExprStmt(e) | StmtKind::Return(Some(e)) => collect_names_in_expr(e, names),
        StmtKind::Assign { value, .. } => collect_names_in_expr(value, names),
        _ => {}
    }
}

fn collect_names_in_expr(expr: &Expr, names: &mut HashSet<String>) {
    match &expr.kind {
        ExprKind::Name(n) => {
            names.insert(n.clone());
        }
        ExprKind::BinOp { left, right, .. } => {
            collect_names_in_expr(left, names);
            collect_names_in_expr(right, names);
        }
        ExprKind::Call { func, args, .. } => {
            collect_names_in_expr(func, names);
            for a in args {
                collect_names_in_expr(a, names);
            }
        }
        ExprKind::Attribute { value, .. } => collect_names_in_expr(value, names),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::ast::StmtKind;

    fn body_of(src: &str) -> Vec<Stmt> {
        match &Parser::parse(src).unwrap().body[0].kind {
            StmtKind::FunctionDef { body, .. } => body.clone(),
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn finds_free_identifiers_inside_eval_literal() {
        let body = body_of("def f():\n    return eval('x + y')\n");
        let sites = find_eval_sites(&body);
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].free_identifiers, vec!["x", "y"]);
    }

    #[test]
    fn exec_literal_is_also_tracked() {
        let body = body_of("def f():\n    exec('z = 1')\n");
        let sites = find_eval_sites(&body);
        assert_eq!(sites.len(), 1);
    }

    #[test]
    fn non_literal_eval_argument_is_not_tracked() {
        let body = body_of("def f(code):\n    return eval(code)\n");
        let sites = find_eval_sites(&body);
        assert!(sites.is_empty());
    }
}
