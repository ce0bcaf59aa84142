//! Compile-time evaluator (spec §4.6): folds constant expressions into a
//! literal value the code generator can emit directly, and drives
//! conditional-import resolution (`if sys.version_info >= ...`-style
//! branches the spec requires to be decided at compile time).

use crate::ast::{BinOp, BoolOp, CompareOp, Expr, ExprKind, Literal, UnaryOp};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum ComptimeValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    None,
    Tuple(Vec<ComptimeValue>),
    List(Vec<ComptimeValue>),
}

impl ComptimeValue {
    pub fn is_truthy(&self) -> bool {
        match self {
            ComptimeValue::Int(n) => *n != 0,
            ComptimeValue::Float(n) => *n != 0.0,
            ComptimeValue::Bool(b) => *b,
            ComptimeValue::Str(s) => !s.is_empty(),
            ComptimeValue::None => false,
            ComptimeValue::Tuple(items) | ComptimeValue::List(items) => !items.is_empty(),
        }
    }
}

/// Environment of names whose value is known at compile time (module
/// constants, loop-invariant literals the analyzer proved constant).
#[derive(Debug, Default)]
pub struct ComptimeEnv {
    values: HashMap<String, ComptimeValue>,
}

impl ComptimeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, value: ComptimeValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ComptimeValue> {
        self.values.get(name)
    }
}

/// Attempts to fold `expr` to a value. Returns `None` — not an error —
/// when part of the expression depends on a runtime value; callers treat
/// that as "leave this node for codegen to lower normally".
pub fn try_eval(expr: &Expr, env: &ComptimeEnv) -> Option<ComptimeValue> {
    match &expr.kind {
        ExprKind::Constant(lit) => Some(literal_to_value(lit)),
        ExprKind::Name(name) => env.get(name).cloned(),
        ExprKind::UnaryOp { op, operand } => {
            let v = try_eval(operand, env)?;
            eval_unary(*op, v)
        }
        ExprKind::BinOp { left, op, right } => {
            let l = try_eval(left, env)?;
            let r = try_eval(right, env)?;
            eval_binop(*op, l, r)
        }
        ExprKind::BoolOp { op, values } => match op {
            BoolOp::And => evaluated_and(values, env),
            BoolOp::Or => evaluated_or(values, env),
        },
        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => eval_compare(left, ops, comparators, env),
        ExprKind::Tuple(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(try_eval(item, env)?);
            }
            Some(ComptimeValue::Tuple(out))
        }
        ExprKind::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(try_eval(item, env)?);
            }
            Some(ComptimeValue::List(out))
        }
        ExprKind::IfExpr { test, body, orelse } => {
            let t = try_eval(test, env)?;
            if t.is_truthy() {
                try_eval(body, env)
            } else {
                try_eval(orelse, env)
            }
        }
        _ => None,
    }
}

fn evaluated_and(values: &[Expr], env: &ComptimeEnv) -> Option<ComptimeValue> {
    let mut last = ComptimeValue::Bool(true);
    for v in values {
        let val = try_eval(v, env)?;
        if !val.is_truthy() {
            return Some(val);
        }
        last = val;
    }
    Some(last)
}

fn evaluated_or(values: &[Expr], env: &ComptimeEnv) -> Option<ComptimeValue> {
    let mut last = ComptimeValue::Bool(false);
    for v in values {
        let val = try_eval(v, env)?;
        if val.is_truthy() {
            return Some(val);
        }
        last = val;
    }
    Some(last)
}

fn literal_to_value(lit: &Literal) -> ComptimeValue {
    match lit {
        Literal::Int(n) => ComptimeValue::Int(*n),
        Literal::Float(n) => ComptimeValue::Float(*n),
        Literal::Str(s) | Literal::FString(s) => ComptimeValue::Str(s.clone()),
        Literal::Bool(b) => ComptimeValue::Bool(*b),
        Literal::None => ComptimeValue::None,
    }
}

fn eval_unary(op: UnaryOp, v: ComptimeValue) -> Option<ComptimeValue> {
    match (op, v) {
        (UnaryOp::Not, v) => Some(ComptimeValue::Bool(!v.is_truthy())),
        (UnaryOp::Neg, ComptimeValue::Int(n)) => Some(ComptimeValue::Int(-n)),
        (UnaryOp::Neg, ComptimeValue::Float(n)) => Some(ComptimeValue::Float(-n)),
        (UnaryOp::Pos, v @ (ComptimeValue::Int(_) | ComptimeValue::Float(_))) => Some(v),
        (UnaryOp::Invert, ComptimeValue::Int(n)) => Some(ComptimeValue::Int(!n)),
        _ => None,
    }
}

fn eval_binop(op: BinOp, l: ComptimeValue, r: ComptimeValue) -> Option<ComptimeValue> {
    use ComptimeValue::*;
    match (l, r) {
        (Int(a), Int(b)) => eval_int_binop(op, a, b),
        (Float(a), Float(b)) => eval_float_binop(op, a, b),
        (Int(a), Float(b)) => eval_float_binop(op, a as f64, b),
        (Float(a), Int(b)) => eval_float_binop(op, a, b as f64),
        (Str(a), Str(b)) if op == BinOp::Add => Some(Str(a + &b)),
        (Str(a), Int(b)) if op == BinOp::Mul => Some(Str(a.repeat(b.max(0) as usize))),
        _ => None,
    }
}

/// Integer arithmetic promotes to bigint semantics on overflow per the
/// resolved numeric-promotion rule: we can't represent a promoted
/// bigint as a plain literal here, so an overflowing fold bails out to
/// `None` and lets codegen emit the runtime bigint path instead.
fn eval_int_binop(op: BinOp, a: i64, b: i64) -> Option<ComptimeValue> {
    use ComptimeValue::Int;
    match op {
        BinOp::Add => a.checked_add(b).map(Int),
        BinOp::Sub => a.checked_sub(b).map(Int),
        BinOp::Mul => a.checked_mul(b).map(Int),
        BinOp::Div => {
            if b == 0 {
                None
            } else {
                Some(ComptimeValue::Float(a as f64 / b as f64))
            }
        }
        BinOp::FloorDiv => (b != 0).then(|| Int(a.div_euclid(b))),
        BinOp::Mod => (b != 0).then(|| Int(a.rem_euclid(b))),
        BinOp::Pow => {
            if b >= 0 && b <= u32::MAX as i64 {
                a.checked_pow(b as u32).map(Int)
            } else {
                None
            }
        }
        BinOp::BitAnd => Some(Int(a & b)),
        BinOp::BitOr => Some(Int(a | b)),
        BinOp::BitXor => Some(Int(a ^ b)),
        BinOp::LShift => (0..64).contains(&b).then(|| Int(a << b)),
        BinOp::RShift => (0..64).contains(&b).then(|| Int(a >> b)),
    }
}

fn eval_float_binop(op: BinOp, a: f64, b: f64) -> Option<ComptimeValue> {
    use ComptimeValue::Float;
    match op {
        BinOp::Add => Some(Float(a + b)),
        BinOp::Sub => Some(Float(a - b)),
        BinOp::Mul => Some(Float(a * b)),
        BinOp::Div => (b != 0.0).then(|| Float(a / b)),
        BinOp::FloorDiv => (b != 0.0).then(|| Float((a / b).floor())),
        BinOp::Mod => (b != 0.0).then(|| Float(a.rem_euclid(b))),
        BinOp::Pow => Some(Float(a.powf(b))),
        _ => None,
    }
}

fn eval_compare(
    left: &Expr,
    ops: &[CompareOp],
    comparators: &[Expr],
    env: &ComptimeEnv,
) -> Option<ComptimeValue> {
    let mut prev = try_eval(left, env)?;
    for (op, comp) in ops.iter().zip(comparators) {
        let curr = try_eval(comp, env)?;
        let ok = compare_values(*op, &prev, &curr)?;
        if !ok {
            return Some(ComptimeValue::Bool(false));
        }
        prev = curr;
    }
    Some(ComptimeValue::Bool(true))
}

fn compare_values(op: CompareOp, a: &ComptimeValue, b: &ComptimeValue) -> Option<bool> {
    use ComptimeValue::*;
    let ord = match (a, b) {
        (Int(x), Int(y)) => x.partial_cmp(y),
        (Float(x), Float(y)) => x.partial_cmp(y),
        (Int(x), Float(y)) => (*x as f64).partial_cmp(y),
        (Float(x), Int(y)) => x.partial_cmp(&(*y as f64)),
        (Str(x), Str(y)) => x.partial_cmp(y),
        (Bool(x), Bool(y)) => x.partial_cmp(y),
        _ => None,
    };
    match op {
        CompareOp::Eq => Some(a == b),
        CompareOp::NotEq => Some(a != b),
        CompareOp::Lt => ord.map(|o| o.is_lt()),
        CompareOp::LtEq => ord.map(|o| o.is_le()),
        CompareOp::Gt => ord.map(|o| o.is_gt()),
        CompareOp::GtEq => ord.map(|o| o.is_ge()),
        CompareOp::Is | CompareOp::IsNot | CompareOp::In | CompareOp::NotIn => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn int(n: i64) -> Expr {
        Expr {
            kind: ExprKind::Constant(Literal::Int(n)),
            span: Span::new(0, 0),
        }
    }

    fn binop(l: Expr, op: BinOp, r: Expr) -> Expr {
        Expr {
            kind: ExprKind::BinOp {
                left: Box::new(l),
                op,
                right: Box::new(r),
            },
            span: Span::new(0, 0),
        }
    }

    #[test]
    fn folds_integer_arithmetic() {
        let env = ComptimeEnv::new();
        let expr = binop(int(2), BinOp::Add, int(3));
        assert_eq!(try_eval(&expr, &env), Some(ComptimeValue::Int(5)));
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        let env = ComptimeEnv::new();
        let expr = binop(int(1), BinOp::FloorDiv, int(0));
        assert_eq!(try_eval(&expr, &env), None);
    }

    #[test]
    fn overflow_falls_back_to_runtime_bigint_path() {
        let env = ComptimeEnv::new();
        let expr = binop(int(i64::MAX), BinOp::Add, int(1));
        assert_eq!(try_eval(&expr, &env), None);
    }

    #[test]
    fn resolves_known_name_from_env() {
        let mut env = ComptimeEnv::new();
        env.define("N", ComptimeValue::Int(7));
        let expr = Expr {
            kind: ExprKind::Name("N".to_string()),
            span: Span::new(0, 0),
        };
        assert_eq!(try_eval(&expr, &env), Some(ComptimeValue::Int(7)));
    }

    #[test]
    fn unknown_name_does_not_fold() {
        let env = ComptimeEnv::new();
        let expr = Expr {
            kind: ExprKind::Name("x".to_string()),
            span: Span::new(0, 0),
        };
        assert_eq!(try_eval(&expr, &env), None);
    }
}
