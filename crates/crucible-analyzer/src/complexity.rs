//! Cyclomatic/cognitive complexity metrics, carried over from the
//! teacher's quality-metrics module as ambient diagnostics: not part of
//! the semantic analyzer's mandated contract, but useful context the
//! CLI driver can surface alongside it.

use crucible_core::ast::{BoolOp, ExprKind, Stmt, StmtKind};

pub fn calculate_cyclomatic(body: &[Stmt]) -> u32 {
    1 + cyclomatic_body(body)
}

fn cyclomatic_body(body: &[Stmt]) -> u32 {
    body.iter().map(cyclomatic_stmt).sum()
}

fn cyclomatic_stmt(stmt: &Stmt) -> u32 {
    match &stmt.kind {
        StmtKind::If { body, orelse, .. } => 1 + cyclomatic_body(body) + cyclomatic_body(orelse),
        StmtKind::While { body, orelse, .. } => 1 + cyclomatic_body(body) + cyclomatic_body(orelse),
        StmtKind::For { body, orelse, .. } => 1 + cyclomatic_body(body) + cyclomatic_body(orelse),
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finally_body,
        } => {
            let mut c = cyclomatic_body(body) + handlers.len() as u32;
            for h in handlers {
                c += cyclomatic_body(&h.body);
            }
            c + cyclomatic_body(orelse) + cyclomatic_body(finally_body)
        }
        StmtKind::ExprStmt(e) | StmtKind::Return(Some(e)) => cyclomatic_expr(e),
        _ => 0,
    }
}

fn cyclomatic_expr(expr: &crucible_core::ast::Expr) -> u32 {
    match &expr.kind {
        ExprKind::BoolOp { op: BoolOp::And | BoolOp::Or, values } => {
            (values.len().saturating_sub(1)) as u32 + values.iter().map(cyclomatic_expr).sum::<u32>()
        }
        ExprKind::IfExpr { test, body, orelse } => {
            1 + cyclomatic_expr(test) + cyclomatic_expr(body) + cyclomatic_expr(orelse)
        }
        _ => 0,
    }
}

pub fn calculate_cognitive(body: &[Stmt]) -> u32 {
    cognitive_body(body, 0).0
}

fn cognitive_body(body: &[Stmt], nesting: u32) -> (u32, u32) {
    let mut total = 0;
    let mut max_nesting = nesting;
    for stmt in body {
        let (c, n) = cognitive_stmt(stmt, nesting);
        total += c;
        max_nesting = max_nesting.max(n);
    }
    (total, max_nesting)
}

fn cognitive_stmt(stmt: &Stmt, nesting: u32) -> (u32, u32) {
    match &stmt.kind {
        StmtKind::If { body, orelse, .. } => {
            let (c1, n1) = cognitive_body(body, nesting + 1);
            let (c2, n2) = cognitive_body(orelse, nesting + 1);
            (1 + nesting + c1 + c2, n1.max(n2))
        }
        StmtKind::While { body, .. } | StmtKind::For { body, .. } => {
            let (c, n) = cognitive_body(body, nesting + 1);
            (1 + nesting + c, n)
        }
        _ => (0, nesting),
    }
}

pub fn calculate_max_nesting(body: &[Stmt]) -> usize {
    cognitive_body(body, 0).1 as usize
}

pub fn count_statements(body: &[Stmt]) -> usize {
    body.iter()
        .map(|s| {
            1 + match &s.kind {
                StmtKind::If { body, orelse, .. } => count_statements(body) + count_statements(orelse),
                StmtKind::While { body, orelse, .. } => count_statements(body) + count_statements(orelse),
                StmtKind::For { body, orelse, .. } => count_statements(body) + count_statements(orelse),
                StmtKind::FunctionDef { body, .. } => count_statements(body),
                _ => 0,
            }
        })
        .sum()
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
    fn straight_line_function_has_complexity_one() {
        let body = body_of("def f():\n    return 1\n");
        assert_eq!(calculate_cyclomatic(&body), 1);
    }

    #[test]
    fn if_adds_one_to_cyclomatic_complexity() {
        let body = body_of("def f(x):\n    if x:\n        return 1\n    return 2\n");
        assert_eq!(calculate_cyclomatic(&body), 2);
    }

    #[test]
    fn nested_while_increases_cognitive_complexity_by_nesting() {
        let body = body_of(
            "def f(x):\n    while x:\n        while x:\n            pass\n",
        );
        assert!(calculate_cognitive(&body) >= 3);
        assert_eq!(calculate_max_nesting(&body), 2);
    }
}
