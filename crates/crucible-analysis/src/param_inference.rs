//! Parameter type inference from usage patterns in a function body,
//! used when a parameter carries no annotation (spec §4.5: unannotated
//! parameters default to `unknown`, but a usage pattern is a stronger
//! signal than the lattice's top element when one is available).

use crucible_core::ast::{BinOp, Expr, ExprKind, Literal, Stmt, StmtKind};
use crucible_core::native_type::NativeType;

pub fn infer_param_type_from_body(param_name: &str, body: &[Stmt]) -> Option<NativeType> {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { value, .. } => {
                if let Some(ty) = infer_from_expr_usage(param_name, value) {
                    return Some(ty);
                }
            }
            StmtKind::ExprStmt(e) | StmtKind::Return(Some(e)) => {
                if let Some(ty) = infer_from_expr_usage(param_name, e) {
                    return Some(ty);
                }
            }
            StmtKind::If { test, body, orelse } => {
                if let Some(ty) = infer_from_expr_usage(param_name, test) {
                    return Some(ty);
                }
                if let Some(ty) = infer_param_type_from_body(param_name, body) {
                    return Some(ty);
                }
                if let Some(ty) = infer_param_type_from_body(param_name, orelse) {
                    return Some(ty);
                }
            }
            StmtKind::While { test, body, .. } => {
                if let Some(ty) = infer_from_expr_usage(param_name, test) {
                    return Some(ty);
                }
                if let Some(ty) = infer_param_type_from_body(param_name, body) {
                    return Some(ty);
                }
            }
            StmtKind::For { iter, body, .. } => {
                if let Some(ty) = infer_from_expr_usage(param_name, iter) {
                    return Some(ty);
                }
                if let Some(ty) = infer_param_type_from_body(param_name, body) {
                    return Some(ty);
                }
            }
            StmtKind::With { items, body, .. } => {
                for (ctx, _) in items {
                    if let Some(ty) = infer_from_expr_usage(param_name, ctx) {
                        return Some(ty);
                    }
                }
                if let Some(ty) = infer_param_type_from_body(param_name, body) {
                    return Some(ty);
                }
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finally_body,
            } => {
                if let Some(ty) = infer_param_type_from_body(param_name, body) {
                    return Some(ty);
                }
                for h in handlers {
                    if let Some(ty) = infer_param_type_from_body(param_name, &h.body) {
                        return Some(ty);
                    }
                }
                if let Some(ty) = infer_param_type_from_body(param_name, orelse) {
                    return Some(ty);
                }
                if let Some(ty) = infer_param_type_from_body(param_name, finally_body) {
                    return Some(ty);
                }
            }
            _ => {}
        }
    }
    None
}

fn infer_from_expr_usage(param_name: &str, expr: &Expr) -> Option<NativeType> {
    match &expr.kind {
        ExprKind::Call { func, args, keywords } => infer_from_call(param_name, func, args, keywords),
        ExprKind::Attribute { value, attr } => infer_from_bare_attribute(param_name, value, attr),
        ExprKind::Subscript { value, index } => infer_from_index(param_name, value, index),
        ExprKind::BinOp { left, op, right } => infer_from_binop(param_name, *op, left, right),
        ExprKind::Compare { left, comparators, .. } => {
            if is_param(param_name, left) {
                if comparators
                    .iter()
                    .any(|c| matches!(&c.kind, ExprKind::Constant(Literal::Str(_))))
                {
                    return Some(NativeType::String);
                }
            }
            None
        }
        ExprKind::BoolOp { values, .. } => {
            values.iter().find_map(|v| infer_from_expr_usage(param_name, v))
        }
        ExprKind::UnaryOp { operand, .. } => infer_from_expr_usage(param_name, operand),
        ExprKind::ListComp { element, iter, .. } | ExprKind::GenExp { element, iter, .. } => {
            if is_param(param_name, iter) {
                return Some(NativeType::List(Box::new(NativeType::Unknown)));
            }
            infer_from_expr_usage(param_name, element)
        }
        _ => None,
    }
}

fn is_param(param_name: &str, expr: &Expr) -> bool {
    matches!(&expr.kind, ExprKind::Name(n) if n == param_name)
}

fn infer_from_call(
    param_name: &str,
    func: &Expr,
    args: &[Expr],
    keywords: &[(Option<String>, Expr)],
) -> Option<NativeType> {
    if let ExprKind::Name(name) = &func.kind {
        if (name == "print" || name == "str" || name == "len") && args.iter().any(|a| is_param(param_name, a)) {
            return Some(if name == "len" {
                NativeType::Unknown
            } else {
                NativeType::String
            });
        }
        if name == "int" && args.iter().any(|a| is_param(param_name, a)) {
            return Some(NativeType::String);
        }
    }
    for a in args {
        if let Some(ty) = infer_from_expr_usage(param_name, a) {
            return Some(ty);
        }
    }
    for (_, v) in keywords {
        if let Some(ty) = infer_from_expr_usage(param_name, v) {
            return Some(ty);
        }
    }
    infer_from_expr_usage(param_name, func)
}

const STRING_METHODS: &[&str] = &[
    "strip", "lstrip", "rstrip", "startswith", "endswith", "split", "splitlines", "join",
    "upper", "lower", "title", "capitalize", "replace", "find", "rfind", "index", "rindex",
    "count", "isalpha", "isdigit", "isalnum", "isspace", "encode", "format",
];

const DICT_METHODS: &[&str] = &[
    "get", "items", "keys", "values", "setdefault", "popitem", "update",
];

fn infer_from_bare_attribute(param_name: &str, value: &Expr, attr: &str) -> Option<NativeType> {
    if !is_param(param_name, value) {
        return infer_from_expr_usage(param_name, value);
    }
    if STRING_METHODS.contains(&attr) {
        return Some(NativeType::String);
    }
    if DICT_METHODS.contains(&attr) {
        return Some(NativeType::Dict(
            Box::new(NativeType::String),
            Box::new(NativeType::Unknown),
        ));
    }
    if matches!(attr, "append" | "extend" | "insert" | "sort" | "reverse") {
        return Some(NativeType::List(Box::new(NativeType::Unknown)));
    }
    None
}

fn infer_from_index(param_name: &str, value: &Expr, index: &Expr) -> Option<NativeType> {
    if is_param(param_name, value) {
        if matches!(&index.kind, ExprKind::Constant(Literal::Str(_))) {
            return Some(NativeType::Dict(
                Box::new(NativeType::String),
                Box::new(NativeType::Unknown),
            ));
        }
        return Some(NativeType::List(Box::new(NativeType::Unknown)));
    }
    infer_from_expr_usage(param_name, value)
}

fn infer_from_binop(param_name: &str, op: BinOp, left: &Expr, right: &Expr) -> Option<NativeType> {
    let operand_is_param = is_param(param_name, left) || is_param(param_name, right);
    if operand_is_param {
        match op {
            BinOp::Add
            | BinOp::Sub
            | BinOp::Mul
            | BinOp::Div
            | BinOp::FloorDiv
            | BinOp::Mod
            | BinOp::Pow => return Some(NativeType::Int),
            _ => {}
        }
    }
    infer_from_expr_usage(param_name, left).or_else(|| infer_from_expr_usage(param_name, right))
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
    fn infers_string_from_method_call() {
        let body = body_of("def f(name):\n    return name.upper()\n");
        assert_eq!(infer_param_type_from_body("name", &body), Some(NativeType::String));
    }

    #[test]
    fn infers_int_from_arithmetic() {
        let body = body_of("def f(x):\n    return x + 1\n");
        assert_eq!(infer_param_type_from_body("x", &body), Some(NativeType::Int));
    }

    #[test]
    fn no_usage_pattern_returns_none() {
        let body = body_of("def f(x):\n    return 1\n");
        assert_eq!(infer_param_type_from_body("x", &body), None);
    }
}
