//! Type Inferrer (spec §4.5): one bottom-up traversal over the AST plus
//! a bounded fixpoint pass over function return types so two mutually
//! recursive functions converge on each other's signatures.
//!
//! Policy for ambiguity: when two branches disagree, the join is
//! `unknown`. Mixed int/float arithmetic widens to float. `/` always
//! yields float (Python 3 semantics); `//` on two ints stays int.
//! `string + string`, `string * int`, and `int * string` all yield
//! string.
//!
//! **Numeric promotion (resolved open question, see DESIGN.md).** A
//! literal-literal int operation that the compile-time evaluator could
//! not fold because it overflows `i64` promotes the static type to
//! `bigint`; every other int-int arithmetic op stays statically `int`
//! and is checked at runtime.

use crate::container_inference::infer_container_element_type;
use crate::param_inference::infer_param_type_from_body;
use crucible_core::ast::{BinOp, Expr, ExprKind, Literal, Module, Param, Stmt, StmtKind, UnaryOp};
use crucible_core::class_registry::ClassRegistry;
use crucible_core::module_registry::ModuleRegistry;
use crucible_core::native_type::NativeType;
use crucible_core::symbol_table::{ScopeKind, SymbolTable};
use std::collections::HashMap;

const MAX_FIXPOINT_ROUNDS: usize = 4;

#[derive(Debug, Default)]
pub struct InferenceResult {
    pub symbols: SymbolTable,
    pub function_returns: HashMap<String, NativeType>,
    pub expr_types: HashMap<usize, NativeType>,
}

pub struct TypeInferrer<'a> {
    classes: &'a ClassRegistry,
    modules: &'a ModuleRegistry,
}

impl<'a> TypeInferrer<'a> {
    pub fn new(classes: &'a ClassRegistry, modules: &'a ModuleRegistry) -> Self {
        Self { classes, modules }
    }

    pub fn infer_module(&self, module: &Module) -> InferenceResult {
        let mut function_returns: HashMap<String, NativeType> = HashMap::new();
        for stmt in &module.body {
            if let StmtKind::FunctionDef { name, .. } = &stmt.kind {
                function_returns.insert(name.clone(), NativeType::Unknown);
            }
        }

        for _ in 0..MAX_FIXPOINT_ROUNDS {
            let mut changed = false;
            for stmt in &module.body {
                if let StmtKind::FunctionDef { name, params, body, .. } = &stmt.kind {
                    let mut scratch = SymbolTable::new();
                    let mut expr_types = HashMap::new();
                    let ret = self.infer_function(
                        params,
                        body,
                        None,
                        &mut scratch,
                        &function_returns,
                        &mut expr_types,
                    );
                    if function_returns.get(name) != Some(&ret) {
                        changed = true;
                    }
                    function_returns.insert(name.clone(), ret);
                }
            }
            if !changed {
                break;
            }
        }

        let mut symbols = SymbolTable::new();
        let mut expr_types = HashMap::new();
        for stmt in &module.body {
            self.infer_stmt(stmt, &mut symbols, &function_returns, &mut expr_types);
        }

        InferenceResult {
            symbols,
            function_returns,
            expr_types,
        }
    }

    fn infer_function(
        &self,
        params: &[Param],
        body: &[Stmt],
        owning_class: Option<&str>,
        symbols: &mut SymbolTable,
        function_returns: &HashMap<String, NativeType>,
        expr_types: &mut HashMap<usize, NativeType>,
    ) -> NativeType {
        symbols.push_scope(ScopeKind::Function);
        for (idx, p) in params.iter().enumerate() {
            let ty = if idx == 0 && p.name == "self" {
                owning_class
                    .map(|c| NativeType::ClassInstance(c.to_string()))
                    .unwrap_or(NativeType::Unknown)
            } else {
                p.annotation
                    .as_ref()
                    .and_then(annotation_to_native_type)
                    .or_else(|| infer_param_type_from_body(&p.name, body))
                    .unwrap_or(NativeType::Unknown)
            };
            symbols.bind(&p.name, ty);
        }
        for stmt in body {
            self.infer_stmt(stmt, symbols, function_returns, expr_types);
        }
        // Refine any container parameter whose element type is still
        // unknown using usage patterns now that the whole body has run.
        for p in params {
            if let Some(binding) = symbols.lookup(&p.name) {
                let is_container = matches!(
                    binding.ty,
                    NativeType::List(_) | NativeType::Set(_) | NativeType::Dict(_, _)
                );
                if is_container {
                    if let Some(refined) = infer_container_element_type(&p.name, &binding.ty, body) {
                        symbols.bind(&p.name, refined);
                    }
                }
            }
        }
        let ret = collect_return_type(body, symbols, self, function_returns, expr_types);
        symbols.pop_scope();
        ret
    }

    fn infer_stmt(
        &self,
        stmt: &Stmt,
        symbols: &mut SymbolTable,
        function_returns: &HashMap<String, NativeType>,
        expr_types: &mut HashMap<usize, NativeType>,
    ) {
        match &stmt.kind {
            StmtKind::FunctionDef { params, body, .. } => {
                self.infer_function(params, body, None, symbols, function_returns, expr_types);
            }
            StmtKind::ClassDef { name, body, .. } => {
                symbols.push_scope(ScopeKind::Class);
                for member in body {
                    if let StmtKind::FunctionDef { params, body: mbody, .. } = &member.kind {
                        self.infer_function(
                            params,
                            mbody,
                            Some(name),
                            symbols,
                            function_returns,
                            expr_types,
                        );
                    } else {
                        self.infer_stmt(member, symbols, function_returns, expr_types);
                    }
                }
                symbols.pop_scope();
            }
            StmtKind::Assign { targets, value } => {
                let ty = self.infer_expr(value, symbols, function_returns, expr_types);
                for t in targets {
                    self.bind_target(t, &ty, symbols);
                }
            }
            StmtKind::AnnAssign { target, annotation, value } => {
                let declared = annotation_to_native_type(annotation).unwrap_or(NativeType::Unknown);
                let ty = match value {
                    Some(v) => {
                        let vt = self.infer_expr(v, symbols, function_returns, expr_types);
                        if declared.is_unknown() { vt } else { declared }
                    }
                    None => declared,
                };
                self.bind_target(target, &ty, symbols);
            }
            StmtKind::AugAssign { target, value, .. } => {
                self.infer_expr(value, symbols, function_returns, expr_types);
                if let ExprKind::Name(n) = &target.kind {
                    symbols.mark_mutated(n);
                }
            }
            StmtKind::If { test, body, orelse } => {
                self.infer_expr(test, symbols, function_returns, expr_types);
                for s in body.iter().chain(orelse) {
                    self.infer_stmt(s, symbols, function_returns, expr_types);
                }
            }
            StmtKind::While { test, body, orelse } => {
                self.infer_expr(test, symbols, function_returns, expr_types);
                for s in body.iter().chain(orelse) {
                    self.infer_stmt(s, symbols, function_returns, expr_types);
                }
            }
            StmtKind::For { target, iter, body, orelse, .. } => {
                let iter_ty = self.infer_expr(iter, symbols, function_returns, expr_types);
                let elem_ty = element_type_of(&iter_ty);
                self.bind_target(target, &elem_ty, symbols);
                for s in body.iter().chain(orelse) {
                    self.infer_stmt(s, symbols, function_returns, expr_types);
                }
            }
            StmtKind::Try { body, handlers, orelse, finally_body } => {
                for s in body {
                    self.infer_stmt(s, symbols, function_returns, expr_types);
                }
                for h in handlers {
                    if let Some(n) = &h.name {
                        symbols.bind(n, NativeType::Unknown);
                    }
                    for s in &h.body {
                        self.infer_stmt(s, symbols, function_returns, expr_types);
                    }
                }
                for s in orelse.iter().chain(finally_body) {
                    self.infer_stmt(s, symbols, function_returns, expr_types);
                }
            }
            StmtKind::With { items, body, .. } => {
                for (ctx, target) in items {
                    let ty = self.infer_expr(ctx, symbols, function_returns, expr_types);
                    if let Some(t) = target {
                        self.bind_target(t, &ty, symbols);
                    }
                }
                for s in body {
                    self.infer_stmt(s, symbols, function_returns, expr_types);
                }
            }
            StmtKind::Return(Some(e)) | StmtKind::ExprStmt(e) => {
                self.infer_expr(e, symbols, function_returns, expr_types);
            }
            StmtKind::Assert { test, .. } => {
                self.infer_expr(test, symbols, function_returns, expr_types);
            }
            StmtKind::Raise { exc, .. } => {
                if let Some(e) = exc {
                    self.infer_expr(e, symbols, function_returns, expr_types);
                }
            }
            _ => {}
        }
    }

    fn bind_target(&self, target: &Expr, ty: &NativeType, symbols: &mut SymbolTable) {
        match &target.kind {
            ExprKind::Name(n) => {
                let widened = match symbols.lookup(n) {
                    Some(existing) if existing.ty != *ty => existing.ty.join(ty),
                    _ => ty.clone(),
                };
                symbols.bind(n, widened);
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let elem = element_type_of(ty);
                for item in items {
                    self.bind_target(item, &elem, symbols);
                }
            }
            ExprKind::Attribute { .. } | ExprKind::Subscript { .. } => {}
            _ => {}
        }
    }

    fn infer_expr(
        &self,
        expr: &Expr,
        symbols: &mut SymbolTable,
        function_returns: &HashMap<String, NativeType>,
        expr_types: &mut HashMap<usize, NativeType>,
    ) -> NativeType {
        let ty = self.infer_expr_inner(expr, symbols, function_returns, expr_types);
        expr_types.insert(expr.span.start as usize, ty.clone());
        ty
    }

    fn infer_expr_inner(
        &self,
        expr: &Expr,
        symbols: &mut SymbolTable,
        function_returns: &HashMap<String, NativeType>,
        expr_types: &mut HashMap<usize, NativeType>,
    ) -> NativeType {
        match &expr.kind {
            ExprKind::Constant(lit) => literal_type(lit),
            ExprKind::Name(n) => symbols
                .lookup(n)
                .map(|b| b.ty.clone())
                .unwrap_or(NativeType::Unknown),
            ExprKind::Attribute { value, .. } => {
                self.infer_expr(value, symbols, function_returns, expr_types);
                NativeType::Unknown
            }
            ExprKind::Subscript { value, index } => {
                let base = self.infer_expr(value, symbols, function_returns, expr_types);
                self.infer_expr(index, symbols, function_returns, expr_types);
                match &base {
                    NativeType::List(elem) | NativeType::Deque(elem) | NativeType::Counter(elem) => {
                        (**elem).clone()
                    }
                    NativeType::Dict(_, val) => (**val).clone(),
                    NativeType::Tuple(elems) => {
                        if let ExprKind::Constant(Literal::Int(i)) = &index.kind {
                            elems.get(*i as usize).cloned().unwrap_or(NativeType::Unknown)
                        } else {
                            elems
                                .iter()
                                .fold(NativeType::Unknown, |acc, t| acc.join(t))
                        }
                    }
                    NativeType::String => NativeType::String,
                    _ => NativeType::Unknown,
                }
            }
            ExprKind::Call { func, args, keywords } => {
                for a in args {
                    self.infer_expr(a, symbols, function_returns, expr_types);
                }
                for (_, v) in keywords {
                    self.infer_expr(v, symbols, function_returns, expr_types);
                }
                self.infer_call(func, args, symbols, function_returns, expr_types)
            }
            ExprKind::BinOp { left, op, right } => {
                let lt = self.infer_expr(left, symbols, function_returns, expr_types);
                let rt = self.infer_expr(right, symbols, function_returns, expr_types);
                binop_type(*op, &lt, &rt, left, right)
            }
            ExprKind::UnaryOp { op, operand } => {
                let t = self.infer_expr(operand, symbols, function_returns, expr_types);
                match op {
                    UnaryOp::Not => NativeType::Bool,
                    _ => t,
                }
            }
            ExprKind::BoolOp { values, .. } => values
                .iter()
                .map(|v| self.infer_expr(v, symbols, function_returns, expr_types))
                .fold(NativeType::Unknown, |acc, t| if acc.is_unknown() { t } else { acc.join(&t) }),
            ExprKind::Compare { left, comparators, .. } => {
                self.infer_expr(left, symbols, function_returns, expr_types);
                for c in comparators {
                    self.infer_expr(c, symbols, function_returns, expr_types);
                }
                NativeType::Bool
            }
            ExprKind::List(items) => {
                let elem = items
                    .iter()
                    .map(|i| self.infer_expr(i, symbols, function_returns, expr_types))
                    .fold(NativeType::Unknown, |acc, t| if acc.is_unknown() { t } else { acc.join(&t) });
                NativeType::List(Box::new(elem))
            }
            ExprKind::Set(items) => {
                let elem = items
                    .iter()
                    .map(|i| self.infer_expr(i, symbols, function_returns, expr_types))
                    .fold(NativeType::Unknown, |acc, t| if acc.is_unknown() { t } else { acc.join(&t) });
                NativeType::Set(Box::new(elem))
            }
            ExprKind::Tuple(items) => NativeType::Tuple(
                items
                    .iter()
                    .map(|i| self.infer_expr(i, symbols, function_returns, expr_types))
                    .collect(),
            ),
            ExprKind::Dict(pairs) => {
                let mut key_ty = NativeType::Unknown;
                let mut val_ty = NativeType::Unknown;
                for (k, v) in pairs {
                    let kt = self.infer_expr(k, symbols, function_returns, expr_types);
                    let vt = self.infer_expr(v, symbols, function_returns, expr_types);
                    key_ty = if key_ty.is_unknown() { kt } else { key_ty.join(&kt) };
                    val_ty = if val_ty.is_unknown() { vt } else { val_ty.join(&vt) };
                }
                NativeType::Dict(Box::new(key_ty), Box::new(val_ty))
            }
            ExprKind::Slice { lower, upper, step } => {
                for e in [lower, upper, step].into_iter().flatten() {
                    self.infer_expr(e, symbols, function_returns, expr_types);
                }
                NativeType::Unknown
            }
            ExprKind::ListComp { element, target, iter, conditions } => {
                symbols.push_scope(ScopeKind::Comprehension);
                let iter_ty = self.infer_expr(iter, symbols, function_returns, expr_types);
                let elem_ty = element_type_of(&iter_ty);
                self.bind_target(target, &elem_ty, symbols);
                for c in conditions {
                    self.infer_expr(c, symbols, function_returns, expr_types);
                }
                let result_elem = self.infer_expr(element, symbols, function_returns, expr_types);
                symbols.pop_scope();
                NativeType::List(Box::new(result_elem))
            }
            ExprKind::GenExp { element, target, iter, conditions } => {
                symbols.push_scope(ScopeKind::Comprehension);
                let iter_ty = self.infer_expr(iter, symbols, function_returns, expr_types);
                let elem_ty = element_type_of(&iter_ty);
                self.bind_target(target, &elem_ty, symbols);
                for c in conditions {
                    self.infer_expr(c, symbols, function_returns, expr_types);
                }
                let result_elem = self.infer_expr(element, symbols, function_returns, expr_types);
                symbols.pop_scope();
                NativeType::List(Box::new(result_elem))
            }
            ExprKind::DictComp { key, value, target, iter, conditions } => {
                symbols.push_scope(ScopeKind::Comprehension);
                let iter_ty = self.infer_expr(iter, symbols, function_returns, expr_types);
                let elem_ty = element_type_of(&iter_ty);
                self.bind_target(target, &elem_ty, symbols);
                for c in conditions {
                    self.infer_expr(c, symbols, function_returns, expr_types);
                }
                let key_ty = self.infer_expr(key, symbols, function_returns, expr_types);
                let val_ty = self.infer_expr(value, symbols, function_returns, expr_types);
                symbols.pop_scope();
                NativeType::Dict(Box::new(key_ty), Box::new(val_ty))
            }
            ExprKind::Lambda { .. } => NativeType::Function,
            ExprKind::IfExpr { test, body, orelse } => {
                self.infer_expr(test, symbols, function_returns, expr_types);
                let bt = self.infer_expr(body, symbols, function_returns, expr_types);
                let ot = self.infer_expr(orelse, symbols, function_returns, expr_types);
                bt.join(&ot)
            }
            ExprKind::Yield(inner) => {
                if let Some(e) = inner {
                    self.infer_expr(e, symbols, function_returns, expr_types);
                }
                NativeType::Unknown
            }
            ExprKind::Await(inner) | ExprKind::Starred(inner) => {
                self.infer_expr(inner, symbols, function_returns, expr_types)
            }
        }
    }

    fn infer_call(
        &self,
        func: &Expr,
        args: &[Expr],
        symbols: &mut SymbolTable,
        function_returns: &HashMap<String, NativeType>,
        expr_types: &mut HashMap<usize, NativeType>,
    ) -> NativeType {
        match &func.kind {
            ExprKind::Name(name) => {
                if self.classes.get(name).is_some() {
                    return NativeType::ClassInstance(name.clone());
                }
                if let Some(ret) = function_returns.get(name) {
                    return ret.clone();
                }
                builtin_return_type(name, args)
            }
            ExprKind::Attribute { value, attr } => {
                if let ExprKind::Name(module_name) = &value.kind {
                    if let Some(name) = self.modules.function_return_type(module_name, attr) {
                        return type_name_to_native(name);
                    }
                }
                let receiver = self.infer_expr(value, symbols, function_returns, expr_types);
                method_return_type(&receiver, attr)
            }
            _ => {
                self.infer_expr(func, symbols, function_returns, expr_types);
                NativeType::Unknown
            }
        }
    }
}

fn collect_return_type(
    body: &[Stmt],
    symbols: &mut SymbolTable,
    inferrer: &TypeInferrer,
    function_returns: &HashMap<String, NativeType>,
    expr_types: &mut HashMap<usize, NativeType>,
) -> NativeType {
    let mut result = NativeType::Unknown;
    let mut saw_return = false;
    collect_returns_in(body, symbols, inferrer, function_returns, expr_types, &mut result, &mut saw_return);
    if !saw_return {
        return NativeType::None;
    }
    result
}

fn collect_returns_in(
    body: &[Stmt],
    symbols: &mut SymbolTable,
    inferrer: &TypeInferrer,
    function_returns: &HashMap<String, NativeType>,
    expr_types: &mut HashMap<usize, NativeType>,
    acc: &mut NativeType,
    saw_return: &mut bool,
) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Return(value) => {
                *saw_return = true;
                let ty = match value {
                    Some(e) => inferrer.infer_expr(e, symbols, function_returns, expr_types),
                    None => NativeType::None,
                };
                // A recursive call not yet resolved this fixpoint round
                // reports `unknown`; treat that as "no signal yet" rather
                // than a genuine third branch type, or the very first
                // round would permanently poison the join to `unknown`.
                *acc = widen_return(acc.clone(), ty);
            }
            StmtKind::If { body, orelse, .. } => {
                collect_returns_in(body, symbols, inferrer, function_returns, expr_types, acc, saw_return);
                collect_returns_in(orelse, symbols, inferrer, function_returns, expr_types, acc, saw_return);
            }
            StmtKind::While { body, orelse, .. } => {
                collect_returns_in(body, symbols, inferrer, function_returns, expr_types, acc, saw_return);
                collect_returns_in(orelse, symbols, inferrer, function_returns, expr_types, acc, saw_return);
            }
            StmtKind::For { body, orelse, .. } => {
                collect_returns_in(body, symbols, inferrer, function_returns, expr_types, acc, saw_return);
                collect_returns_in(orelse, symbols, inferrer, function_returns, expr_types, acc, saw_return);
            }
            StmtKind::Try { body, handlers, orelse, finally_body } => {
                collect_returns_in(body, symbols, inferrer, function_returns, expr_types, acc, saw_return);
                for h in handlers {
                    collect_returns_in(&h.body, symbols, inferrer, function_returns, expr_types, acc, saw_return);
                }
                collect_returns_in(orelse, symbols, inferrer, function_returns, expr_types, acc, saw_return);
                collect_returns_in(finally_body, symbols, inferrer, function_returns, expr_types, acc, saw_return);
            }
            StmtKind::With { body, .. } => {
                collect_returns_in(body, symbols, inferrer, function_returns, expr_types, acc, saw_return);
            }
            _ => {}
        }
    }
}

fn widen_return(acc: NativeType, ty: NativeType) -> NativeType {
    if acc.is_unknown() {
        ty
    } else if ty.is_unknown() {
        acc
    } else {
        acc.join(&ty)
    }
}

fn element_type_of(ty: &NativeType) -> NativeType {
    match ty {
        NativeType::List(e) | NativeType::Set(e) | NativeType::Deque(e) | NativeType::Counter(e) => {
            (**e).clone()
        }
        NativeType::Dict(k, _) => (**k).clone(),
        NativeType::String => NativeType::String,
        _ => NativeType::Unknown,
    }
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

fn literal_int(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Constant(Literal::Int(i)) => Some(*i),
        _ => None,
    }
}

fn binop_type(op: BinOp, lt: &NativeType, rt: &NativeType, left: &Expr, right: &Expr) -> NativeType {
    use NativeType::*;
    match (lt, rt) {
        (String, String) if matches!(op, BinOp::Add) => String,
        (String, Int) | (Int, String) if matches!(op, BinOp::Mul) => String,
        (Int, Int) => match op {
            BinOp::Div => Float,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Pow => {
                match (literal_int(left), literal_int(right)) {
                    (Some(l), Some(r)) if foldable_overflows(op, l, r) => Bigint,
                    _ => Int,
                }
            }
            _ => Int,
        },
        (Bool, Bool) => {
            if matches!(op, BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor) {
                Bool
            } else {
                Int
            }
        }
        (Int, Float) | (Float, Int) | (Float, Float) => Float,
        (Bigint, Int) | (Int, Bigint) | (Bigint, Bigint) => Bigint,
        (Unknown, _) | (_, Unknown) => Unknown,
        _ => lt.join(rt),
    }
}

fn foldable_overflows(op: BinOp, l: i64, r: i64) -> bool {
    match op {
        BinOp::Add => l.checked_add(r).is_none(),
        BinOp::Sub => l.checked_sub(r).is_none(),
        BinOp::Mul => l.checked_mul(r).is_none(),
        BinOp::Pow => r < 0 || r > u32::MAX as i64 || l.checked_pow(r as u32).is_none(),
        _ => false,
    }
}

fn annotation_to_native_type(expr: &Expr) -> Option<NativeType> {
    match &expr.kind {
        ExprKind::Constant(Literal::None) => Some(NativeType::None),
        ExprKind::Name(n) => name_to_native_type(n),
        ExprKind::Attribute { attr, .. } => name_to_native_type(attr),
        ExprKind::Subscript { value, index } => {
            let base = annotation_to_native_type(value)?;
            match base {
                NativeType::List(_) => Some(NativeType::List(Box::new(
                    annotation_to_native_type(index).unwrap_or(NativeType::Unknown),
                ))),
                NativeType::Set(_) => Some(NativeType::Set(Box::new(
                    annotation_to_native_type(index).unwrap_or(NativeType::Unknown),
                ))),
                NativeType::Dict(_, _) => {
                    if let ExprKind::Tuple(items) = &index.kind {
                        if items.len() == 2 {
                            return Some(NativeType::Dict(
                                Box::new(annotation_to_native_type(&items[0]).unwrap_or(NativeType::Unknown)),
                                Box::new(annotation_to_native_type(&items[1]).unwrap_or(NativeType::Unknown)),
                            ));
                        }
                    }
                    Some(base)
                }
                other => Some(other),
            }
        }
        _ => None,
    }
}

/// Maps a module registry function-return-type name (§4.8's per-module
/// static table) to the lattice type it denotes.
fn type_name_to_native(name: &str) -> NativeType {
    match name {
        "int" => NativeType::Int,
        "float" => NativeType::Float,
        "bool" => NativeType::Bool,
        "string" => NativeType::String,
        "bigint" => NativeType::Bigint,
        "counter" => NativeType::Counter(Box::new(NativeType::Unknown)),
        "deque" => NativeType::Deque(Box::new(NativeType::Unknown)),
        "stringio" => NativeType::StringIo,
        "bytesio" => NativeType::BytesIo,
        "file" => NativeType::File,
        "hash_object" => NativeType::HashObject,
        "sqlite_connection" => NativeType::SqliteConnection,
        "sqlite_cursor" => NativeType::SqliteCursor,
        _ => NativeType::Unknown,
    }
}

fn name_to_native_type(n: &str) -> Option<NativeType> {
    match n {
        "int" => Some(NativeType::Int),
        "float" => Some(NativeType::Float),
        "bool" => Some(NativeType::Bool),
        "str" | "bytes" => Some(NativeType::String),
        "list" | "List" => Some(NativeType::List(Box::new(NativeType::Unknown))),
        "dict" | "Dict" => Some(NativeType::Dict(
            Box::new(NativeType::Unknown),
            Box::new(NativeType::Unknown),
        )),
        "set" | "Set" => Some(NativeType::Set(Box::new(NativeType::Unknown))),
        "tuple" | "Tuple" => Some(NativeType::Tuple(vec![])),
        "None" => Some(NativeType::None),
        _ => None,
    }
}

const STRING_METHODS: &[&str] = &[
    "strip", "lstrip", "rstrip", "upper", "lower", "title", "capitalize", "replace", "join",
    "format", "center", "ljust", "rjust", "zfill", "swapcase", "casefold",
];
const STRING_BOOL_METHODS: &[&str] = &[
    "startswith", "endswith", "isalpha", "isdigit", "isalnum", "isspace", "isupper", "islower",
];
const STRING_LIST_METHODS: &[&str] = &["split", "splitlines"];
const STRING_INT_METHODS: &[&str] = &["find", "rfind", "index", "rindex", "count"];
const DICT_LIST_METHODS: &[&str] = &["keys", "values", "items"];

fn method_return_type(receiver: &NativeType, method: &str) -> NativeType {
    match receiver {
        NativeType::String => {
            if STRING_METHODS.contains(&method) {
                NativeType::String
            } else if STRING_BOOL_METHODS.contains(&method) {
                NativeType::Bool
            } else if STRING_LIST_METHODS.contains(&method) {
                NativeType::List(Box::new(NativeType::String))
            } else if STRING_INT_METHODS.contains(&method) {
                NativeType::Int
            } else {
                NativeType::Unknown
            }
        }
        NativeType::Dict(k, v) => {
            if DICT_LIST_METHODS.contains(&method) {
                NativeType::List(Box::new((**k).clone()))
            } else if method == "get" || method == "pop" {
                (**v).clone()
            } else {
                NativeType::Unknown
            }
        }
        NativeType::List(e) | NativeType::Deque(e) => {
            if method == "pop" {
                (**e).clone()
            } else {
                NativeType::Unknown
            }
        }
        _ => NativeType::Unknown,
    }
}

fn builtin_return_type(name: &str, args: &[Expr]) -> NativeType {
    match name {
        "len" | "hash" | "ord" | "id" => NativeType::Int,
        "str" | "repr" | "chr" | "input" => NativeType::String,
        "int" => NativeType::Int,
        "float" => NativeType::Float,
        "bool" | "isinstance" | "hasattr" | "callable" => NativeType::Bool,
        "list" | "sorted" => NativeType::List(Box::new(NativeType::Unknown)),
        "set" => NativeType::Set(Box::new(NativeType::Unknown)),
        "dict" => NativeType::Dict(Box::new(NativeType::Unknown), Box::new(NativeType::Unknown)),
        "tuple" => NativeType::Tuple(vec![]),
        "reversed" | "range" | "enumerate" | "zip" | "map" | "filter" => {
            NativeType::List(Box::new(NativeType::Unknown))
        }
        "open" => NativeType::File,
        "sum" | "abs" | "min" | "max" | "round" => {
            if args.len() == 1 {
                NativeType::Unknown
            } else {
                NativeType::Int
            }
        }
        "type" => NativeType::Unknown,
        "eval" | "exec" | "__import__" => NativeType::Unknown,
        _ => NativeType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crucible_core::parser::Parser;

    fn infer(src: &str) -> (InferenceResult, Module) {
        let module = Parser::parse(src).unwrap();
        let classes = ClassRegistry::from_module(&module).unwrap();
        let modules = ModuleRegistry::with_stdlib();
        let inferrer = TypeInferrer::new(&classes, &modules);
        let result = inferrer.infer_module(&module);
        (result, module)
    }

    #[test]
    fn infers_literal_assignment_type() {
        let (result, _) = infer("x = 1\n");
        assert_eq!(result.symbols.lookup("x").unwrap().ty, NativeType::Int);
    }

    #[test]
    fn int_division_widens_to_float() {
        let (result, _) = infer("x = 1 / 2\n");
        assert_eq!(result.symbols.lookup("x").unwrap().ty, NativeType::Float);
    }

    #[test]
    fn reassignment_to_different_type_widens_to_unknown() {
        let (result, _) = infer("x = 1\nx = 'hi'\n");
        assert_eq!(result.symbols.lookup("x").unwrap().ty, NativeType::Unknown);
    }

    #[test]
    fn infers_function_return_type_from_return_statement() {
        let (result, _) = infer("def f():\n    return 1\n");
        assert_eq!(result.function_returns["f"], NativeType::Int);
    }

    #[test]
    fn overflowing_literal_arithmetic_promotes_to_bigint() {
        let (result, _) = infer("x = 9223372036854775807 + 1\n");
        assert_eq!(result.symbols.lookup("x").unwrap().ty, NativeType::Bigint);
    }

    #[test]
    fn mutually_recursive_functions_converge_on_return_types() {
        let (result, _) = infer(
            "def is_even(n):\n    if n == 0:\n        return True\n    return is_odd(n - 1)\ndef is_odd(n):\n    if n == 0:\n        return False\n    return is_even(n - 1)\n",
        );
        assert_eq!(result.function_returns["is_even"], NativeType::Bool);
        assert_eq!(result.function_returns["is_odd"], NativeType::Bool);
    }
}
