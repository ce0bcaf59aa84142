//! `parse(tokens) -> Node::Module` (spec §4.2).
//!
//! Recursive-descent statement parser over a Pratt expression parser.
//! `**` is right-associative; every other binary operator is
//! left-associative. Chained comparisons (`a < b < c`) produce a single
//! `Compare` node with parallel operator/operand lists. Constructs outside
//! the supported subset (e.g. `yield from`, multiple inheritance, walrus
//! in a place we don't lower) are rejected with `UnsupportedError`.

use crate::ast::*;
use crate::error::{CompileError, ErrorKind};
use crate::span::Span;
use crate::token::{Keyword, Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, CompileError>;

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(source: &str) -> PResult<Module> {
        let tokens = crate::lexer::Lexer::tokenize(source)?;
        let mut parser = Parser::new(tokens);
        parser.parse_module()
    }

    // ---- token stream helpers -------------------------------------------------

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_span(&self) -> Span {
        self.tokens[self.pos.min(self.tokens.len() - 1)].span
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn check_op(&self, op: &str) -> bool {
        matches!(self.peek(), TokenKind::Op(o) if *o == op)
    }

    fn check_kw(&self, kw: Keyword) -> bool {
        matches!(self.peek(), TokenKind::Keyword(k) if *k == kw)
    }

    fn check_delim(&self, c: char) -> bool {
        matches!(self.peek(), TokenKind::Delim(d) if *d == c)
    }

    fn eat_op(&mut self, op: &str) -> PResult<Span> {
        if self.check_op(op) {
            Ok(self.advance().span)
        } else {
            self.err_expected(&format!("'{op}'"))
        }
    }

    fn eat_kw(&mut self, kw: Keyword) -> PResult<Span> {
        if self.check_kw(kw) {
            Ok(self.advance().span)
        } else {
            self.err_expected(&format!("'{kw:?}'"))
        }
    }

    fn eat_delim(&mut self, c: char) -> PResult<Span> {
        if self.check_delim(c) {
            Ok(self.advance().span)
        } else {
            self.err_expected(&format!("'{c}'"))
        }
    }

    fn eat_ident(&mut self) -> PResult<Symbol> {
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => self.err_expected("identifier"),
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), TokenKind::Newline) {
            self.advance();
        }
    }

    fn err_expected<T>(&self, what: &str) -> PResult<T> {
        Err(CompileError::at(
            ErrorKind::ParseError(format!("expected {what}, found {:?}", self.peek())),
            self.peek_span(),
        ))
    }

    fn unsupported<T>(&self, what: &str) -> PResult<T> {
        Err(CompileError::at(
            ErrorKind::UnsupportedError(what.to_string()),
            self.peek_span(),
        ))
    }

    // ---- module / blocks --------------------------------------------------

    fn parse_module(&mut self) -> PResult<Module> {
        let mut body = Vec::new();
        self.skip_newlines();
        while !matches!(self.peek(), TokenKind::Eof) {
            body.push(self.parse_stmt()?);
            self.skip_newlines();
        }
        Ok(Module { body })
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.eat_op(":")?;
        if matches!(self.peek(), TokenKind::Newline) {
            self.skip_newlines();
            if !matches!(self.peek(), TokenKind::Indent) {
                return self.err_expected("an indented block");
            }
            self.advance();
            let mut stmts = Vec::new();
            self.skip_newlines();
            while !matches!(self.peek(), TokenKind::Dedent | TokenKind::Eof) {
                stmts.push(self.parse_stmt()?);
                self.skip_newlines();
            }
            if matches!(self.peek(), TokenKind::Dedent) {
                self.advance();
            }
            Ok(stmts)
        } else {
            // Simple statement(s) on the same line: `if x: y = 1`.
            let mut stmts = vec![self.parse_simple_stmt()?];
            while self.check_op(";") {
                self.advance();
                if matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
                    break;
                }
                stmts.push(self.parse_simple_stmt()?);
            }
            Ok(stmts)
        }
    }

    // ---- statements --------------------------------------------------------

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let decorators = self.parse_decorators()?;
        let start = self.peek_span();
        let kind = match self.peek().clone() {
            TokenKind::Keyword(Keyword::Def) => self.parse_funcdef(decorators, false)?,
            TokenKind::Keyword(Keyword::Async) => {
                self.advance();
                if self.check_kw(Keyword::Def) {
                    self.parse_funcdef(decorators, true)?
                } else if self.check_kw(Keyword::For) {
                    self.parse_for(true)?
                } else if self.check_kw(Keyword::With) {
                    self.parse_with(true)?
                } else {
                    return self.unsupported("async construct");
                }
            }
            TokenKind::Keyword(Keyword::Class) => self.parse_classdef(decorators)?,
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for(false)?,
            TokenKind::Keyword(Keyword::Try) => self.parse_try()?,
            TokenKind::Keyword(Keyword::With) => self.parse_with(false)?,
            _ => {
                let stmt = self.parse_simple_stmt()?;
                return Ok(stmt);
            }
        };
        Ok(Stmt {
            kind,
            span: start.merge(self.tokens[self.pos.saturating_sub(1)].span),
        })
    }

    fn parse_decorators(&mut self) -> PResult<Vec<Expr>> {
        let mut decorators = Vec::new();
        while self.check_op("@") {
            self.advance();
            decorators.push(self.parse_expr()?);
            self.skip_newlines();
        }
        Ok(decorators)
    }

    fn parse_simple_stmt(&mut self) -> PResult<Stmt> {
        let start = self.peek_span();
        let kind = match self.peek().clone() {
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                if matches!(self.peek(), TokenKind::Newline | TokenKind::Eof)
                    || self.check_op(";")
                {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expr_list_as_tuple()?))
                }
            }
            TokenKind::Keyword(Keyword::Pass) => {
                self.advance();
                StmtKind::Pass
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Keyword(Keyword::Raise) => {
                self.advance();
                if matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
                    StmtKind::Raise {
                        exc: None,
                        cause: None,
                    }
                } else {
                    let exc = self.parse_expr()?;
                    let cause = if self.check_kw(Keyword::From) {
                        self.advance();
                        Some(self.parse_expr()?)
                    } else {
                        None
                    };
                    StmtKind::Raise {
                        exc: Some(exc),
                        cause,
                    }
                }
            }
            TokenKind::Keyword(Keyword::Assert) => {
                self.advance();
                let test = self.parse_expr()?;
                let msg = if self.check_op(",") {
                    self.advance();
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                StmtKind::Assert { test, msg }
            }
            TokenKind::Keyword(Keyword::Import) => self.parse_import()?,
            TokenKind::Keyword(Keyword::From) => self.parse_import_from()?,
            TokenKind::Keyword(Keyword::Global) => {
                self.advance();
                StmtKind::Global(self.parse_ident_list()?)
            }
            TokenKind::Keyword(Keyword::Nonlocal) => {
                self.advance();
                StmtKind::Nonlocal(self.parse_ident_list()?)
            }
            TokenKind::Keyword(Keyword::Del) => {
                self.advance();
                let mut targets = vec![self.parse_expr()?];
                while self.check_op(",") {
                    self.advance();
                    targets.push(self.parse_expr()?);
                }
                StmtKind::Del(targets)
            }
            TokenKind::Keyword(Keyword::Yield) => {
                self.advance();
                if matches!(self.peek(), TokenKind::Newline | TokenKind::Eof) {
                    StmtKind::YieldStmt(None)
                } else {
                    StmtKind::YieldStmt(Some(self.parse_expr()?))
                }
            }
            _ => self.parse_assign_or_expr()?,
        };
        Ok(Stmt {
            kind,
            span: start.merge(self.tokens[self.pos.saturating_sub(1)].span),
        })
    }

    fn parse_ident_list(&mut self) -> PResult<Vec<Symbol>> {
        let mut names = vec![self.eat_ident()?];
        while self.check_op(",") {
            self.advance();
            names.push(self.eat_ident()?);
        }
        Ok(names)
    }

    fn parse_import(&mut self) -> PResult<StmtKind> {
        self.advance(); // `import`
        let mut names = Vec::new();
        loop {
            let mut name = self.eat_ident()?;
            while self.check_op(".") {
                self.advance();
                name.push('.');
                name.push_str(&self.eat_ident()?);
            }
            let alias = if self.check_kw(Keyword::As) {
                self.advance();
                Some(self.eat_ident()?)
            } else {
                None
            };
            names.push(ImportAlias { name, alias });
            if self.check_op(",") {
                self.advance();
            } else {
                break;
            }
        }
        Ok(StmtKind::Import { names })
    }

    fn parse_import_from(&mut self) -> PResult<StmtKind> {
        self.advance(); // `from`
        let mut level = 0u32;
        while self.check_op(".") {
            level += 1;
            self.advance();
        }
        let module = if self.check_kw(Keyword::Import) {
            None
        } else {
            let mut name = self.eat_ident()?;
            while self.check_op(".") {
                self.advance();
                name.push('.');
                name.push_str(&self.eat_ident()?);
            }
            Some(name)
        };
        self.eat_kw(Keyword::Import)?;
        let names = if self.check_op("*") {
            self.advance();
            vec![ImportAlias {
                name: "*".to_string(),
                alias: None,
            }]
        } else {
            let parenthesized = self.check_delim('(');
            if parenthesized {
                self.advance();
            }
            let mut names = Vec::new();
            loop {
                let name = self.eat_ident()?;
                let alias = if self.check_kw(Keyword::As) {
                    self.advance();
                    Some(self.eat_ident()?)
                } else {
                    None
                };
                names.push(ImportAlias { name, alias });
                if self.check_op(",") {
                    self.advance();
                } else {
                    break;
                }
            }
            if parenthesized {
                self.eat_delim(')')?;
            }
            names
        };
        Ok(StmtKind::ImportFrom {
            module,
            names,
            level,
        })
    }

    fn parse_assign_or_expr(&mut self) -> PResult<StmtKind> {
        let first = self.parse_expr_list_as_tuple()?;
        if self.check_op(":") {
            self.advance();
            let annotation = self.parse_expr()?;
            let value = if self.check_op("=") {
                self.advance();
                Some(self.parse_expr_list_as_tuple()?)
            } else {
                None
            };
            return Ok(StmtKind::AnnAssign {
                target: first,
                annotation,
                value,
            });
        }
        if let Some(op) = self.peek_aug_assign_op() {
            self.advance();
            let value = self.parse_expr_list_as_tuple()?;
            return Ok(StmtKind::AugAssign {
                target: first,
                op,
                value,
            });
        }
        if self.check_op("=") {
            let mut targets = vec![first];
            let mut value = None;
            while self.check_op("=") {
                self.advance();
                let next = self.parse_expr_list_as_tuple()?;
                if self.check_op("=") {
                    targets.push(next);
                } else {
                    value = Some(next);
                }
            }
            let value = value.ok_or_else(|| {
                CompileError::at(
                    ErrorKind::ParseError("assignment missing a value".into()),
                    self.peek_span(),
                )
            })?;
            return Ok(StmtKind::Assign { targets, value });
        }
        Ok(StmtKind::ExprStmt(first))
    }

    fn peek_aug_assign_op(&self) -> Option<BinOp> {
        match self.peek() {
            TokenKind::Op("+=") => Some(BinOp::Add),
            TokenKind::Op("-=") => Some(BinOp::Sub),
            TokenKind::Op("*=") => Some(BinOp::Mul),
            TokenKind::Op("/=") => Some(BinOp::Div),
            TokenKind::Op("//=") => Some(BinOp::FloorDiv),
            TokenKind::Op("%=") => Some(BinOp::Mod),
            TokenKind::Op("**=") => Some(BinOp::Pow),
            TokenKind::Op("&=") => Some(BinOp::BitAnd),
            TokenKind::Op("|=") => Some(BinOp::BitOr),
            TokenKind::Op("^=") => Some(BinOp::BitXor),
            TokenKind::Op("<<=") => Some(BinOp::LShift),
            TokenKind::Op(">>=") => Some(BinOp::RShift),
            _ => None,
        }
    }

    fn parse_funcdef(&mut self, decorators: Vec<Expr>, is_async: bool) -> PResult<StmtKind> {
        self.eat_kw(Keyword::Def)?;
        let name = self.eat_ident()?;
        self.eat_delim('(')?;
        let params = self.parse_params()?;
        self.eat_delim(')')?;
        let returns = if self.check_op("->") {
            self.advance();
            Some(self.parse_expr()?)
        } else {
            None
        };
        let body = self.parse_block()?;
        Ok(StmtKind::FunctionDef {
            name,
            params,
            returns,
            body,
            decorators,
            is_async,
        })
    }

    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        while !self.check_delim(')') {
            let is_star = self.check_op("*");
            if is_star {
                self.advance();
            }
            let is_double_star = self.check_op("**");
            if is_double_star {
                self.advance();
            }
            if is_star && self.check_delim(')') {
                break; // bare `*` marker (keyword-only separator); ignored
            }
            let name = self.eat_ident()?;
            let annotation = if self.check_op(":") {
                self.advance();
                Some(self.parse_expr()?)
            } else {
                None
            };
            let default = if self.check_op("=") {
                self.advance();
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Param {
                name,
                annotation,
                default,
                is_star,
                is_double_star,
            });
            if self.check_op(",") {
                self.advance();
            } else {
                break;
            }
        }
        Ok(params)
    }

    fn parse_classdef(&mut self, decorators: Vec<Expr>) -> PResult<StmtKind> {
        self.eat_kw(Keyword::Class)?;
        let name = self.eat_ident()?;
        let mut bases = Vec::new();
        if self.check_delim('(') {
            self.advance();
            while !self.check_delim(')') {
                bases.push(self.parse_expr()?);
                if self.check_op(",") {
                    self.advance();
                } else {
                    break;
                }
            }
            self.eat_delim(')')?;
        }
        if bases.len() > 1 {
            return self.unsupported("multiple inheritance");
        }
        let body = self.parse_block()?;
        Ok(StmtKind::ClassDef {
            name,
            bases,
            body,
            decorators,
        })
    }

    fn parse_if(&mut self) -> PResult<StmtKind> {
        self.eat_kw(Keyword::If)?;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        let orelse = if self.check_kw(Keyword::Elif) {
            vec![Stmt {
                span: self.peek_span(),
                kind: self.parse_elif()?,
            }]
        } else if self.check_kw(Keyword::Else) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(StmtKind::If { test, body, orelse })
    }

    fn parse_elif(&mut self) -> PResult<StmtKind> {
        self.eat_kw(Keyword::Elif)?;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        let orelse = if self.check_kw(Keyword::Elif) {
            vec![Stmt {
                span: self.peek_span(),
                kind: self.parse_elif()?,
            }]
        } else if self.check_kw(Keyword::Else) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(StmtKind::If { test, body, orelse })
    }

    fn parse_while(&mut self) -> PResult<StmtKind> {
        self.eat_kw(Keyword::While)?;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        let orelse = if self.check_kw(Keyword::Else) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(StmtKind::While { test, body, orelse })
    }

    fn parse_for(&mut self, is_async: bool) -> PResult<StmtKind> {
        self.eat_kw(Keyword::For)?;
        let target = self.parse_target_list()?;
        self.eat_kw(Keyword::In)?;
        let iter = self.parse_expr_list_as_tuple()?;
        let body = self.parse_block()?;
        let orelse = if self.check_kw(Keyword::Else) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(StmtKind::For {
            target,
            iter,
            body,
            orelse,
            is_async,
        })
    }

    fn parse_target_list(&mut self) -> PResult<Expr> {
        let start = self.peek_span();
        let first = self.parse_or_test()?;
        if self.check_op(",") {
            let mut items = vec![first];
            while self.check_op(",") {
                self.advance();
                if self.check_kw(Keyword::In) {
                    break;
                }
                items.push(self.parse_or_test()?);
            }
            Ok(Expr {
                span: start,
                kind: ExprKind::Tuple(items),
            })
        } else {
            Ok(first)
        }
    }

    fn parse_try(&mut self) -> PResult<StmtKind> {
        self.eat_kw(Keyword::Try)?;
        let body = self.parse_block()?;
        let mut handlers = Vec::new();
        while self.check_kw(Keyword::Except) {
            self.advance();
            let (exc_type, name) = if self.check_op(":") {
                (None, None)
            } else {
                let ty = self.parse_expr()?;
                let name = if self.check_kw(Keyword::As) {
                    self.advance();
                    Some(self.eat_ident()?)
                } else {
                    None
                };
                (Some(ty), name)
            };
            let handler_body = self.parse_block()?;
            handlers.push(ExceptHandler {
                exc_type,
                name,
                body: handler_body,
            });
        }
        let orelse = if self.check_kw(Keyword::Else) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        let finally_body = if self.check_kw(Keyword::Finally) {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(StmtKind::Try {
            body,
            handlers,
            orelse,
            finally_body,
        })
    }

    fn parse_with(&mut self, is_async: bool) -> PResult<StmtKind> {
        self.eat_kw(Keyword::With)?;
        let mut items = Vec::new();
        loop {
            let ctx = self.parse_expr()?;
            let target = if self.check_kw(Keyword::As) {
                self.advance();
                Some(self.parse_or_test()?)
            } else {
                None
            };
            items.push((ctx, target));
            if self.check_op(",") {
                self.advance();
            } else {
                break;
            }
        }
        let body = self.parse_block()?;
        Ok(StmtKind::With {
            items,
            body,
            is_async,
        })
    }

    // ---- expressions: precedence climbing ---------------------------------

    fn parse_expr_list_as_tuple(&mut self) -> PResult<Expr> {
        let start = self.peek_span();
        let first = self.parse_expr()?;
        if self.check_op(",") {
            let mut items = vec![first];
            while self.check_op(",") {
                self.advance();
                if self.at_expr_terminator() {
                    break;
                }
                items.push(self.parse_expr()?);
            }
            Ok(Expr {
                span: start,
                kind: ExprKind::Tuple(items),
            })
        } else {
            Ok(first)
        }
    }

    fn at_expr_terminator(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Newline
                | TokenKind::Eof
                | TokenKind::Op(":")
                | TokenKind::Op("=")
                | TokenKind::Delim(')')
                | TokenKind::Delim(']')
                | TokenKind::Delim('}')
        )
    }

    pub fn parse_expr(&mut self) -> PResult<Expr> {
        if self.check_kw(Keyword::Lambda) {
            return self.parse_lambda();
        }
        let body = self.parse_or_test()?;
        if self.check_kw(Keyword::If) {
            self.advance();
            let test = self.parse_or_test()?;
            self.eat_kw(Keyword::Else)?;
            let orelse = self.parse_expr()?;
            let span = body.span.merge(orelse.span);
            return Ok(Expr {
                span,
                kind: ExprKind::IfExpr {
                    test: Box::new(test),
                    body: Box::new(body),
                    orelse: Box::new(orelse),
                },
            });
        }
        Ok(body)
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        let start = self.peek_span();
        self.advance(); // lambda
        let mut params = Vec::new();
        while !self.check_op(":") {
            let is_star = self.check_op("*");
            if is_star {
                self.advance();
            }
            let name = self.eat_ident()?;
            let default = if self.check_op("=") {
                self.advance();
                Some(self.parse_or_test()?)
            } else {
                None
            };
            params.push(Param {
                name,
                annotation: None,
                default,
                is_star,
                is_double_star: false,
            });
            if self.check_op(",") {
                self.advance();
            } else {
                break;
            }
        }
        self.eat_op(":")?;
        let body = self.parse_expr()?;
        let span = start.merge(body.span);
        Ok(Expr {
            span,
            kind: ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
        })
    }

    fn parse_or_test(&mut self) -> PResult<Expr> {
        let mut left = self.parse_and_test()?;
        if self.check_kw(Keyword::Or) {
            let mut values = vec![left];
            while self.check_kw(Keyword::Or) {
                self.advance();
                values.push(self.parse_and_test()?);
            }
            let span = values[0].span.merge(values[values.len() - 1].span);
            left = Expr {
                span,
                kind: ExprKind::BoolOp {
                    op: BoolOp::Or,
                    values,
                },
            };
        }
        Ok(left)
    }

    fn parse_and_test(&mut self) -> PResult<Expr> {
        let mut left = self.parse_not_test()?;
        if self.check_kw(Keyword::And) {
            let mut values = vec![left];
            while self.check_kw(Keyword::And) {
                self.advance();
                values.push(self.parse_not_test()?);
            }
            let span = values[0].span.merge(values[values.len() - 1].span);
            left = Expr {
                span,
                kind: ExprKind::BoolOp {
                    op: BoolOp::And,
                    values,
                },
            };
        }
        Ok(left)
    }

    fn parse_not_test(&mut self) -> PResult<Expr> {
        if self.check_kw(Keyword::Not) {
            let start = self.advance().span;
            let operand = self.parse_not_test()?;
            let span = start.merge(operand.span);
            return Ok(Expr {
                span,
                kind: ExprKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let left = self.parse_bitor()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        loop {
            let op = match self.peek() {
                TokenKind::Op("==") => CompareOp::Eq,
                TokenKind::Op("!=") => CompareOp::NotEq,
                TokenKind::Op("<") => CompareOp::Lt,
                TokenKind::Op("<=") => CompareOp::LtEq,
                TokenKind::Op(">") => CompareOp::Gt,
                TokenKind::Op(">=") => CompareOp::GtEq,
                TokenKind::Keyword(Keyword::In) => CompareOp::In,
                TokenKind::Keyword(Keyword::Not) => {
                    // `not in`
                    let save = self.pos;
                    self.advance();
                    if self.check_kw(Keyword::In) {
                        self.advance();
                        comparators.push(self.parse_bitor()?);
                        ops.push(CompareOp::NotIn);
                        continue;
                    }
                    self.pos = save;
                    break;
                }
                _ => break,
            };
            self.advance();
            ops.push(op);
            comparators.push(self.parse_bitor()?);
        }
        if ops.is_empty() {
            Ok(left)
        } else {
            let span = left.span.merge(comparators[comparators.len() - 1].span);
            Ok(Expr {
                span,
                kind: ExprKind::Compare {
                    left: Box::new(left),
                    ops,
                    comparators,
                },
            })
        }
    }

    fn parse_bitor(&mut self) -> PResult<Expr> {
        self.parse_left_binop(&[("|", BinOp::BitOr)], Self::parse_bitxor)
    }

    fn parse_bitxor(&mut self) -> PResult<Expr> {
        self.parse_left_binop(&[("^", BinOp::BitXor)], Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> PResult<Expr> {
        self.parse_left_binop(&[("&", BinOp::BitAnd)], Self::parse_shift)
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        self.parse_left_binop(
            &[("<<", BinOp::LShift), (">>", BinOp::RShift)],
            Self::parse_arith,
        )
    }

    fn parse_arith(&mut self) -> PResult<Expr> {
        self.parse_left_binop(&[("+", BinOp::Add), ("-", BinOp::Sub)], Self::parse_term)
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        self.parse_left_binop(
            &[
                ("*", BinOp::Mul),
                ("/", BinOp::Div),
                ("//", BinOp::FloorDiv),
                ("%", BinOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    fn parse_left_binop(
        &mut self,
        ops: &[(&'static str, BinOp)],
        next: fn(&mut Self) -> PResult<Expr>,
    ) -> PResult<Expr> {
        let mut left = next(self)?;
        loop {
            let mut matched = None;
            for (lexeme, op) in ops {
                if self.check_op(lexeme) {
                    matched = Some(*op);
                    break;
                }
            }
            let Some(op) = matched else { break };
            self.advance();
            let right = next(self)?;
            let span = left.span.merge(right.span);
            left = Expr {
                span,
                kind: ExprKind::BinOp {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let op = match self.peek() {
            TokenKind::Op("-") => Some(UnaryOp::Neg),
            TokenKind::Op("+") => Some(UnaryOp::Pos),
            TokenKind::Op("~") => Some(UnaryOp::Invert),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.advance().span;
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Ok(Expr {
                span,
                kind: ExprKind::UnaryOp {
                    op,
                    operand: Box::new(operand),
                },
            });
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> PResult<Expr> {
        let base = self.parse_postfix()?;
        if self.check_op("**") {
            self.advance();
            // right-associative
            let exponent = self.parse_unary()?;
            let span = base.span.merge(exponent.span);
            return Ok(Expr {
                span,
                kind: ExprKind::BinOp {
                    left: Box::new(base),
                    op: BinOp::Pow,
                    right: Box::new(exponent),
                },
            });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.check_op(".") {
                self.advance();
                let attr = self.eat_ident()?;
                let span = expr.span.merge(self.peek_span());
                expr = Expr {
                    span,
                    kind: ExprKind::Attribute {
                        value: Box::new(expr),
                        attr,
                    },
                };
            } else if self.check_delim('(') {
                let (args, keywords, end) = self.parse_call_args()?;
                let span = expr.span.merge(end);
                expr = Expr {
                    span,
                    kind: ExprKind::Call {
                        func: Box::new(expr),
                        args,
                        keywords,
                    },
                };
            } else if self.check_delim('[') {
                self.advance();
                let index = self.parse_subscript_body()?;
                let end = self.eat_delim(']')?;
                let span = expr.span.merge(end);
                expr = Expr {
                    span,
                    kind: ExprKind::Subscript {
                        value: Box::new(expr),
                        index: Box::new(index),
                    },
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_subscript_body(&mut self) -> PResult<Expr> {
        let start = self.peek_span();
        let lower = if self.check_op(":") || self.check_delim(']') {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        if !self.check_op(":") {
            return Ok(*lower.expect("checked above"));
        }
        self.advance();
        let upper = if self.check_op(":") || self.check_delim(']') {
            None
        } else {
            Some(Box::new(self.parse_expr()?))
        };
        let step = if self.check_op(":") {
            self.advance();
            if self.check_delim(']') {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            }
        } else {
            None
        };
        Ok(Expr {
            span: start,
            kind: ExprKind::Slice { lower, upper, step },
        })
    }

    fn parse_call_args(&mut self) -> PResult<(Vec<Expr>, Vec<(Option<Symbol>, Expr)>, Span)> {
        self.advance(); // `(`
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.check_delim(')') {
            if self.check_op("**") {
                self.advance();
                let value = self.parse_expr()?;
                keywords.push((None, value));
            } else if self.check_op("*") {
                self.advance();
                let value = self.parse_expr()?;
                let span = value.span;
                args.push(Expr {
                    span,
                    kind: ExprKind::Starred(Box::new(value)),
                });
            } else if matches!(self.peek(), TokenKind::Ident(_)) && self.peek_is_kwarg() {
                let name = self.eat_ident()?;
                self.eat_op("=")?;
                let value = self.parse_expr()?;
                keywords.push((Some(name), value));
            } else {
                args.push(self.parse_expr()?);
            }
            if self.check_op(",") {
                self.advance();
            } else {
                break;
            }
        }
        let end = self.eat_delim(')')?;
        Ok((args, keywords, end))
    }

    fn peek_is_kwarg(&self) -> bool {
        matches!(self.tokens.get(self.pos + 1).map(|t| &t.kind), Some(TokenKind::Op("=")))
    }

    fn parse_atom(&mut self) -> PResult<Expr> {
        let start = self.peek_span();
        let kind = match self.peek().clone() {
            TokenKind::Int(n) => {
                self.advance();
                ExprKind::Constant(Literal::Int(n))
            }
            TokenKind::Float(n) => {
                self.advance();
                ExprKind::Constant(Literal::Float(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                let mut combined = s;
                // adjacent string literal concatenation
                while let TokenKind::Str(more) = self.peek().clone() {
                    self.advance();
                    combined.push_str(&more);
                }
                ExprKind::Constant(Literal::Str(combined))
            }
            TokenKind::FString(s) => {
                self.advance();
                ExprKind::Constant(Literal::FString(s))
            }
            TokenKind::Bool(b) => {
                self.advance();
                ExprKind::Constant(Literal::Bool(b))
            }
            TokenKind::None => {
                self.advance();
                ExprKind::Constant(Literal::None)
            }
            TokenKind::Ident(name) => {
                self.advance();
                ExprKind::Name(name)
            }
            TokenKind::Keyword(Keyword::Await) => {
                self.advance();
                let operand = self.parse_unary()?;
                ExprKind::Await(Box::new(operand))
            }
            TokenKind::Keyword(Keyword::Yield) => {
                self.advance();
                if self.at_expr_terminator() || self.check_op(",") {
                    ExprKind::Yield(None)
                } else if self.check_kw(Keyword::From) {
                    return self.unsupported("yield from");
                } else {
                    ExprKind::Yield(Some(Box::new(self.parse_expr()?)))
                }
            }
            TokenKind::Delim('(') => return self.parse_paren_or_tuple_or_genexp(),
            TokenKind::Delim('[') => return self.parse_list_or_listcomp(),
            TokenKind::Delim('{') => return self.parse_dict_or_set_or_comp(),
            other => {
                return Err(CompileError::at(
                    ErrorKind::ParseError(format!("unexpected token {other:?}")),
                    start,
                ))
            }
        };
        Ok(Expr { span: start, kind })
    }

    fn parse_paren_or_tuple_or_genexp(&mut self) -> PResult<Expr> {
        let start = self.advance().span; // `(`
        if self.check_delim(')') {
            let end = self.advance().span;
            return Ok(Expr {
                span: start.merge(end),
                kind: ExprKind::Tuple(vec![]),
            });
        }
        let first = self.parse_expr()?;
        if self.check_kw(Keyword::For) {
            let (target, iter, conditions) = self.parse_comprehension_clause()?;
            let end = self.eat_delim(')')?;
            return Ok(Expr {
                span: start.merge(end),
                kind: ExprKind::GenExp {
                    element: Box::new(first),
                    target: Box::new(target),
                    iter: Box::new(iter),
                    conditions,
                },
            });
        }
        if self.check_op(",") {
            let mut items = vec![first];
            while self.check_op(",") {
                self.advance();
                if self.check_delim(')') {
                    break;
                }
                items.push(self.parse_expr()?);
            }
            let end = self.eat_delim(')')?;
            return Ok(Expr {
                span: start.merge(end),
                kind: ExprKind::Tuple(items),
            });
        }
        let end = self.eat_delim(')')?;
        Ok(Expr {
            span: start.merge(end),
            kind: first.kind,
        })
    }

    fn parse_list_or_listcomp(&mut self) -> PResult<Expr> {
        let start = self.advance().span; // `[`
        if self.check_delim(']') {
            let end = self.advance().span;
            return Ok(Expr {
                span: start.merge(end),
                kind: ExprKind::List(vec![]),
            });
        }
        let first = self.parse_expr()?;
        if self.check_kw(Keyword::For) {
            let (target, iter, conditions) = self.parse_comprehension_clause()?;
            let end = self.eat_delim(']')?;
            return Ok(Expr {
                span: start.merge(end),
                kind: ExprKind::ListComp {
                    element: Box::new(first),
                    target: Box::new(target),
                    iter: Box::new(iter),
                    conditions,
                },
            });
        }
        let mut items = vec![first];
        while self.check_op(",") {
            self.advance();
            if self.check_delim(']') {
                break;
            }
            items.push(self.parse_expr()?);
        }
        let end = self.eat_delim(']')?;
        Ok(Expr {
            span: start.merge(end),
            kind: ExprKind::List(items),
        })
    }

    fn parse_dict_or_set_or_comp(&mut self) -> PResult<Expr> {
        let start = self.advance().span; // `{`
        if self.check_delim('}') {
            let end = self.advance().span;
            return Ok(Expr {
                span: start.merge(end),
                kind: ExprKind::Dict(vec![]),
            });
        }
        let first = self.parse_expr()?;
        if self.check_op(":") {
            self.advance();
            let value = self.parse_expr()?;
            if self.check_kw(Keyword::For) {
                let (target, iter, conditions) = self.parse_comprehension_clause()?;
                let end = self.eat_delim('}')?;
                return Ok(Expr {
                    span: start.merge(end),
                    kind: ExprKind::DictComp {
                        key: Box::new(first),
                        value: Box::new(value),
                        target: Box::new(target),
                        iter: Box::new(iter),
                        conditions,
                    },
                });
            }
            let mut pairs = vec![(first, value)];
            while self.check_op(",") {
                self.advance();
                if self.check_delim('}') {
                    break;
                }
                let k = self.parse_expr()?;
                self.eat_op(":")?;
                let v = self.parse_expr()?;
                pairs.push((k, v));
            }
            let end = self.eat_delim('}')?;
            return Ok(Expr {
                span: start.merge(end),
                kind: ExprKind::Dict(pairs),
            });
        }
        // set literal or set comprehension
        if self.check_kw(Keyword::For) {
            let (target, iter, conditions) = self.parse_comprehension_clause()?;
            let end = self.eat_delim('}')?;
            // A set comprehension lowers to the same shape as a list
            // comprehension; the type inferrer distinguishes by context.
            return Ok(Expr {
                span: start.merge(end),
                kind: ExprKind::ListComp {
                    element: Box::new(first),
                    target: Box::new(target),
                    iter: Box::new(iter),
                    conditions,
                },
            });
        }
        let mut items = vec![first];
        while self.check_op(",") {
            self.advance();
            if self.check_delim('}') {
                break;
            }
            items.push(self.parse_expr()?);
        }
        let end = self.eat_delim('}')?;
        Ok(Expr {
            span: start.merge(end),
            kind: ExprKind::Set(items),
        })
    }

    /// `for <target> in <iter> (if <cond>)*`
    fn parse_comprehension_clause(&mut self) -> PResult<(Expr, Expr, Vec<Expr>)> {
        self.eat_kw(Keyword::For)?;
        let target = self.parse_target_list()?;
        self.eat_kw(Keyword::In)?;
        let iter = self.parse_or_test()?;
        let mut conditions = Vec::new();
        while self.check_kw(Keyword::If) {
            self.advance();
            conditions.push(self.parse_or_test()?);
        }
        if self.check_kw(Keyword::For) {
            return self.unsupported("nested comprehension clauses");
        }
        Ok((target, iter, conditions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Module {
        Parser::parse(src).unwrap_or_else(|e| panic!("parse failed: {e}"))
    }

    #[test]
    fn parses_recursive_function() {
        let m = parse_ok("def f(n: int) -> int:\n    return 1 if n <= 1 else f(n-1)+f(n-2)\n");
        assert_eq!(m.body.len(), 1);
        assert!(matches!(m.body[0].kind, StmtKind::FunctionDef { .. }));
    }

    #[test]
    fn parses_listcomp_with_filter() {
        let m = parse_ok("nums=[1,2,3,4,5]\nfiltered=[x for x in nums if x>2]\n");
        assert_eq!(m.body.len(), 2);
        if let StmtKind::Assign { value, .. } = &m.body[1].kind {
            assert!(matches!(value.kind, ExprKind::ListComp { .. }));
        } else {
            panic!("expected assign");
        }
    }

    #[test]
    fn chained_comparison_is_one_node() {
        let m = parse_ok("x = a < b < c\n");
        if let StmtKind::Assign { value, .. } = &m.body[0].kind {
            if let ExprKind::Compare { ops, comparators, .. } = &value.kind {
                assert_eq!(ops.len(), 2);
                assert_eq!(comparators.len(), 2);
            } else {
                panic!("expected compare node");
            }
        }
    }

    #[test]
    fn pow_is_right_associative() {
        let m = parse_ok("x = 2 ** 3 ** 2\n");
        if let StmtKind::Assign { value, .. } = &m.body[0].kind {
            if let ExprKind::BinOp { right, .. } = &value.kind {
                assert!(matches!(right.kind, ExprKind::BinOp { op: BinOp::Pow, .. }));
            } else {
                panic!("expected binop");
            }
        }
    }

    #[test]
    fn rejects_yield_from() {
        let err = Parser::parse("def g():\n    yield from range(3)\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedError(_)));
    }

    #[test]
    fn rejects_multiple_inheritance() {
        let err = Parser::parse("class C(A, B):\n    pass\n").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::UnsupportedError(_)));
    }

    #[test]
    fn parses_class_with_super_call() {
        let m = parse_ok(
            "class A:\n    def g(self):\n        return 1\nclass B(A):\n    def g(self):\n        return super().g()+1\n",
        );
        assert_eq!(m.body.len(), 2);
    }

    #[test]
    fn parses_try_except_finally() {
        let m = parse_ok(
            "try:\n    x = 1\nexcept ValueError as e:\n    x = 2\nfinally:\n    y = 3\n",
        );
        assert!(matches!(m.body[0].kind, StmtKind::Try { .. }));
    }

    #[test]
    fn parses_decorators_and_star_params() {
        let m = parse_ok("@staticmethod\ndef f(*args, **kwargs):\n    pass\n");
        if let StmtKind::FunctionDef { decorators, params, .. } = &m.body[0].kind {
            assert_eq!(decorators.len(), 1);
            assert_eq!(params.len(), 2);
        } else {
            panic!("expected function def");
        }
    }
}
