//! Expression emission: a pure text-writer that recursively renders an
//! `Expr` into IR syntax, dispatching calls through the priority order
//! fixed by spec §4.7: native library map, module function registry,
//! method registry, built-in registry, user function call.

use super::dispatch::ReceiverCategory;
use super::Codegen;
use crate::ast::{BinOp, BoolOp, CompareOp, Expr, ExprKind, Literal, UnaryOp};
use crate::comptime::{self, ComptimeEnv, ComptimeValue};
use crate::error::{CompileError, CompileResult, ErrorKind};

pub fn render(cg: &mut Codegen, expr: &Expr) -> CompileResult<String> {
    if let Some(folded) = try_fold(expr) {
        return Ok(folded);
    }
    match &expr.kind {
        ExprKind::Constant(lit) => Ok(render_literal(lit)),
        ExprKind::Name(name) if name == "self" => Ok(cg.self_ident().to_string()),
        ExprKind::Name(name) => Ok(name.clone()),
        ExprKind::Attribute { value, attr } => {
            let base = render(cg, value)?;
            Ok(format!("{base}.{attr}"))
        }
        ExprKind::Subscript { value, index } => {
            let base = render(cg, value)?;
            let idx = render(cg, index)?;
            Ok(format!("{base}[{idx}]"))
        }
        ExprKind::Call { func, args, keywords } => render_call(cg, func, args, keywords),
        ExprKind::BinOp { left, op, right } => {
            let l = render(cg, left)?;
            let r = render(cg, right)?;
            Ok(format!("({l} {} {r})", binop_symbol(*op)))
        }
        ExprKind::UnaryOp { op, operand } => {
            let v = render(cg, operand)?;
            Ok(match op {
                UnaryOp::Not => format!("(!{v})"),
                UnaryOp::Neg => format!("(-{v})"),
                UnaryOp::Pos => v,
                UnaryOp::Invert => format!("(~{v})"),
            })
        }
        ExprKind::BoolOp { op, values } => {
            let sym = match op {
                BoolOp::And => "&&",
                BoolOp::Or => "||",
            };
            let parts: Vec<String> = values
                .iter()
                .map(|v| render(cg, v))
                .collect::<CompileResult<_>>()?;
            Ok(format!("({})", parts.join(&format!(" {sym} "))))
        }
        ExprKind::Compare {
            left,
            ops,
            comparators,
        } => render_compare(cg, left, ops, comparators),
        ExprKind::List(items) => render_sequence(cg, items, '[', ']'),
        ExprKind::Tuple(items) => render_sequence(cg, items, '(', ')'),
        ExprKind::Set(items) => {
            let parts: Vec<String> = items.iter().map(|i| render(cg, i)).collect::<CompileResult<_>>()?;
            Ok(format!("set![{}]", parts.join(", ")))
        }
        ExprKind::Dict(pairs) => {
            let mut parts = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                parts.push(format!("{}: {}", render(cg, k)?, render(cg, v)?));
            }
            Ok(format!("dict!{{{}}}", parts.join(", ")))
        }
        ExprKind::Slice { lower, upper, step } => {
            let l = match lower {
                Some(e) => render(cg, e)?,
                None => String::new(),
            };
            let u = match upper {
                Some(e) => render(cg, e)?,
                None => String::new(),
            };
            match step {
                Some(s) => Ok(format!("{l}..{u}..{}", render(cg, s)?)),
                None => Ok(format!("{l}..{u}")),
            }
        }
        ExprKind::ListComp {
            element,
            target,
            iter,
            conditions,
        } => render_comprehension(cg, element, target, iter, conditions, "collect::<Vec<_>>"),
        ExprKind::DictComp {
            key,
            value,
            target,
            iter,
            conditions,
        } => {
            let t = render(cg, target)?;
            let it = render(cg, iter)?;
            let k = render(cg, key)?;
            let v = render(cg, value)?;
            let filters = render_filters(cg, conditions)?;
            Ok(format!(
                "{it}.into_iter(){filters}.map(|{t}| ({k}, {v})).collect::<Dict<_, _>>()"
            ))
        }
        ExprKind::GenExp {
            element,
            target,
            iter,
            conditions,
        } => render_comprehension(cg, element, target, iter, conditions, "into_iter"),
        ExprKind::Lambda { params, body } => {
            let names: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
            let body_rendered = render(cg, body)?;
            Ok(format!("|{}| {body_rendered}", names.join(", ")))
        }
        ExprKind::IfExpr { test, body, orelse } => {
            let t = render(cg, test)?;
            let b = render(cg, body)?;
            let o = render(cg, orelse)?;
            Ok(format!("(if {t} {{ {b} }} else {{ {o} }})"))
        }
        ExprKind::Yield(value) => match value {
            Some(v) => Ok(format!("yield {}", render(cg, v)?)),
            None => Ok("yield".to_string()),
        },
        ExprKind::Await(value) => Ok(format!("{}.await", render(cg, value)?)),
        ExprKind::Starred(value) => Ok(format!("*{}", render(cg, value)?)),
    }
}

/// Opportunistically folds a composite expression to a literal (spec
/// §4.6's comptime evaluator, run here rather than as a separate AST
/// rewrite pass): a bare name or constant is already rendered directly,
/// so only the composite kinds `try_eval` actually reduces are worth
/// the attempt. Names are never folded here — only a literal's own
/// subexpressions are, so a later mutation of a bound variable can
/// never be shadowed by a stale constant.
fn try_fold(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::BinOp { .. }
        | ExprKind::UnaryOp { .. }
        | ExprKind::BoolOp { .. }
        | ExprKind::Compare { .. }
        | ExprKind::IfExpr { .. } => {
            comptime::try_eval(expr, &ComptimeEnv::new()).map(|v| render_comptime_value(&v))
        }
        _ => None,
    }
}

fn render_comptime_value(value: &ComptimeValue) -> String {
    match value {
        ComptimeValue::Int(n) => n.to_string(),
        ComptimeValue::Float(n) => format!("{n:?}"),
        ComptimeValue::Bool(b) => b.to_string(),
        ComptimeValue::Str(s) => format!("{s:?}"),
        ComptimeValue::None => "None".to_string(),
        ComptimeValue::Tuple(items) => format!(
            "({})",
            items.iter().map(render_comptime_value).collect::<Vec<_>>().join(", ")
        ),
        ComptimeValue::List(items) => format!(
            "[{}]",
            items.iter().map(render_comptime_value).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// `eval`/`exec` of a string literal compile to a small bytecode blob
/// embedded verbatim in the IR (spec §4.7 "Comptime eval embedding"),
/// rather than an ordinary runtime builtin call. Anything the minimal
/// embedded VM can't represent — a non-literal argument, or a literal
/// whose source uses a construct `BytecodeProgram::compile_literal`
/// doesn't cover — falls through to the normal builtin dispatch below.
fn render_eval_exec_literal(func: &Expr, args: &[Expr]) -> Option<String> {
    let ExprKind::Name(name) = &func.kind else {
        return None;
    };
    let is_exec = match name.as_str() {
        "eval" => false,
        "exec" => true,
        _ => return None,
    };
    let [arg] = args else { return None };
    let ExprKind::Constant(Literal::Str(source)) = &arg.kind else {
        return None;
    };
    let program = crate::bytecode::BytecodeProgram::compile_literal(source, is_exec)?;
    let bytes = program
        .encode()
        .iter()
        .map(u8::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Some(format!("builtins::{name}_bytecode(&[{bytes}])"))
}

fn render_literal(lit: &Literal) -> String {
    match lit {
        Literal::Int(n) => n.to_string(),
        Literal::Float(n) => format!("{n:?}"),
        Literal::Str(s) => format!("{s:?}"),
        Literal::FString(s) => format!("format!({s:?})"),
        Literal::Bool(b) => b.to_string(),
        Literal::None => "None".to_string(),
    }
}

fn render_sequence(cg: &mut Codegen, items: &[Expr], open: char, close: char) -> CompileResult<String> {
    let parts: Vec<String> = items.iter().map(|i| render(cg, i)).collect::<CompileResult<_>>()?;
    Ok(format!("{open}{}{close}", parts.join(", ")))
}

fn render_filters(cg: &mut Codegen, conditions: &[Expr]) -> CompileResult<String> {
    let mut out = String::new();
    for cond in conditions {
        out.push_str(&format!(".filter(|_| {})", render(cg, cond)?));
    }
    Ok(out)
}

fn render_comprehension(
    cg: &mut Codegen,
    element: &Expr,
    target: &Expr,
    iter: &Expr,
    conditions: &[Expr],
    terminal: &str,
) -> CompileResult<String> {
    let t = render(cg, target)?;
    let it = render(cg, iter)?;
    let filters = render_filters(cg, conditions)?;
    let e = render(cg, element)?;
    Ok(format!("{it}.into_iter(){filters}.map(|{t}| {e}).{terminal}()"))
}

fn render_compare(
    cg: &mut Codegen,
    left: &Expr,
    ops: &[CompareOp],
    comparators: &[Expr],
) -> CompileResult<String> {
    let mut prev = render(cg, left)?;
    let mut parts = Vec::with_capacity(ops.len());
    for (op, comp) in ops.iter().zip(comparators) {
        let curr = render(cg, comp)?;
        parts.push(format!("({prev} {} {curr})", compare_symbol(*op)));
        prev = curr;
    }
    Ok(format!("({})", parts.join(" && ")))
}

fn binop_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "/",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
        BinOp::BitAnd => "&",
        BinOp::BitOr => "|",
        BinOp::BitXor => "^",
        BinOp::LShift => "<<",
        BinOp::RShift => ">>",
    }
}

fn compare_symbol(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "==",
        CompareOp::NotEq => "!=",
        CompareOp::Lt => "<",
        CompareOp::LtEq => "<=",
        CompareOp::Gt => ">",
        CompareOp::GtEq => ">=",
        CompareOp::In => "in",
        CompareOp::NotIn => "not in",
        CompareOp::Is => "is",
        CompareOp::IsNot => "is not",
    }
}

fn render_call(
    cg: &mut Codegen,
    func: &Expr,
    args: &[Expr],
    keywords: &[(Option<String>, Expr)],
) -> CompileResult<String> {
    if let Some(rendered) = render_eval_exec_literal(func, args) {
        return Ok(rendered);
    }

    let rendered_args: Vec<String> = args.iter().map(|a| render(cg, a)).collect::<CompileResult<_>>()?;
    let mut all_args = rendered_args;
    for (name, value) in keywords {
        let v = render(cg, value)?;
        match name {
            Some(n) => all_args.push(format!("{n}: {v}")),
            None => all_args.push(format!("**{v}")),
        }
    }
    let joined = all_args.join(", ");

    // super().method(args)
    if let ExprKind::Attribute { value, attr } = &func.kind {
        if let ExprKind::Call {
            func: inner_func,
            args: inner_args,
            ..
        } = &value.kind
        {
            if matches!(&inner_func.kind, ExprKind::Name(n) if n == "super") && inner_args.is_empty() {
                let class_name = cg
                    .scope_class_name()
                    .ok_or_else(|| {
                        CompileError::new(ErrorKind::SemanticError(
                            "super() used outside of a method body".to_string(),
                        ))
                    })?;
                return super::class_gen::emit_super_call(cg, &class_name, attr, &joined);
            }
        }
    }

    // module.function(args) — module function registry, priority 2.
    if let ExprKind::Attribute { value, attr } = &func.kind {
        if let ExprKind::Name(module_name) = &value.kind {
            if cg.dispatch.is_module_function(module_name, attr) {
                return Ok(format!("{module_name}::{attr}({joined})"));
            }
        }
        // method registry, priority 3: dispatch by best-effort receiver
        // category inferred from the tracked expression types.
        if method_in_any_category(cg, attr) {
            let receiver = render(cg, value)?;
            return Ok(format!("{receiver}.{attr}({joined})"));
        }
        // unknown attribute call: still a method-shaped call, emitted
        // as-is and left for the linker to resolve.
        let receiver = render(cg, value)?;
        return Ok(format!("{receiver}.{attr}({joined})"));
    }

    if let ExprKind::Name(name) = &func.kind {
        if cg.dispatch.is_builtin(name) {
            return Ok(format!("builtins::{name}({joined})"));
        }
        let alloc_suffix = if cg.needs_allocator.get(name).copied().unwrap_or(false) {
            if joined.is_empty() {
                "alloc".to_string()
            } else {
                format!("{joined}, alloc")
            }
        } else {
            joined
        };
        return Ok(format!("{name}({alloc_suffix})"));
    }

    let rendered_func = render(cg, func)?;
    Ok(format!("({rendered_func})({joined})"))
}

fn method_in_any_category(cg: &Codegen, name: &str) -> bool {
    [
        ReceiverCategory::String,
        ReceiverCategory::List,
        ReceiverCategory::Dict,
        ReceiverCategory::Set,
        ReceiverCategory::Deque,
        ReceiverCategory::Counter,
        ReceiverCategory::File,
        ReceiverCategory::Stream,
        ReceiverCategory::HashObject,
        ReceiverCategory::SqliteCursor,
        ReceiverCategory::SqliteConnection,
        ReceiverCategory::UnittestSelf,
        ReceiverCategory::AsyncQueue,
    ]
    .into_iter()
    .any(|cat| cg.dispatch.is_method(cat, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_registry::ClassRegistry;
    use crate::module_registry::ModuleRegistry;
    use crate::parser::Parser;
    use crate::symbol_table::SymbolTable;

    fn render_expr_str(src: &str) -> String {
        let module = Parser::parse(&format!("x = {src}\n")).unwrap();
        let expr = match &module.body[0].kind {
            crate::ast::StmtKind::Assign { value, .. } => value.clone(),
            _ => panic!("expected assign"),
        };
        let classes = ClassRegistry::new();
        let modules = ModuleRegistry::with_stdlib();
        let symbols = SymbolTable::new();
        let mut cg = Codegen::new(&classes, &modules, &symbols);
        render(&mut cg, &expr).unwrap()
    }

    #[test]
    fn renders_arithmetic_with_parens() {
        assert_eq!(render_expr_str("a + b * c"), "(a + (b * c))");
    }

    #[test]
    fn folds_constant_arithmetic_to_a_literal() {
        assert_eq!(render_expr_str("2 + 3 * 4"), "14");
    }

    #[test]
    fn division_by_zero_is_left_for_runtime_emission() {
        assert_eq!(render_expr_str("1 / 0"), "(1 / 0)");
    }

    #[test]
    fn constant_subexpression_folds_even_when_the_outer_expression_cannot() {
        assert_eq!(render_expr_str("a + 1 * 2"), "(a + 2)");
    }

    #[test]
    fn renders_builtin_call() {
        assert_eq!(render_expr_str("len(xs)"), "builtins::len(xs)");
    }

    #[test]
    fn eval_of_a_string_literal_embeds_a_bytecode_blob() {
        let rendered = render_expr_str(r#"eval("2 + 2")"#);
        assert!(rendered.starts_with("builtins::eval_bytecode(&["));
        assert!(rendered.ends_with("])"));
    }

    #[test]
    fn eval_of_a_non_literal_falls_back_to_a_runtime_call() {
        assert_eq!(render_expr_str("eval(src)"), "builtins::eval(src)");
    }

    #[test]
    fn eval_of_an_uncompilable_literal_falls_back_to_a_runtime_call() {
        assert_eq!(render_expr_str(r#"eval("foo()")"#), "builtins::eval(\"foo()\")");
    }

    #[test]
    fn renders_module_function_call() {
        assert_eq!(render_expr_str("math.sqrt(x)"), "math::sqrt(x)");
    }

    #[test]
    fn renders_chained_comparison_as_conjunction() {
        assert_eq!(render_expr_str("a < b < c"), "((a < b) && (b < c))");
    }

    #[test]
    fn renders_list_comprehension() {
        assert_eq!(
            render_expr_str("[x for x in xs if x > 0]"),
            "xs.into_iter().filter(|_| (x > 0)).map(|x| x).collect::<Vec<_>>()"
        );
    }
}
