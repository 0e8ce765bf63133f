//! Recursive-descent parser (spec.md §4.2).
//!
//! Operator precedence (highest to lowest), matching the table in spec.md
//! exactly: unary `+ - not ~`; `**` (right-assoc); `* / // %`; `+ -`;
//! `<< >>`; `&`; `^`; `|`; comparisons; `and`; `or`; conditional
//! `x if C else y`. Each precedence level is its own method, the classic
//! shape for a hand-written expression parser; there is no operator-table
//! indirection because the grammar is small and fixed.

use ruff_text_size::TextRange;

use crate::{
    ast::*,
    error::ParseError,
    token::{Token, TokenKind},
};

pub fn parse(tokens: Vec<Token>) -> Result<Module, ParseError> {
    Parser { tokens, pos: 0 }.parse_module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_span(&self) -> TextRange {
        self.tokens[self.pos].span
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::UnexpectedToken {
                found: self.peek().describe(),
                span: self.peek_span(),
            })
        }
    }

    fn expect_ident(&mut self) -> Result<(Box<str>, TextRange), ParseError> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, span))
            }
            _ => Err(ParseError::UnexpectedToken {
                found: self.peek().describe(),
                span,
            }),
        }
    }

    /// Swallows any number of stray `NEWLINE` tokens (blank statement
    /// separators between top-level or block statements).
    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    // ---- statements -----------------------------------------------------

    fn parse_module(&mut self) -> Result<Module, ParseError> {
        let mut body = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::Eof) {
            body.push(self.parse_statement()?);
            self.skip_newlines();
        }
        Ok(Module { body })
    }

    /// A colon-then-block suite: either a single `NEWLINE INDENT stmt+
    /// DEDENT`. (The supported subset never needs the single-line
    /// `if x: y` form in the examples, so only the block form is parsed.)
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::Colon)?;
        self.expect(&TokenKind::Newline)?;
        self.expect(&TokenKind::Indent)?;
        let mut body = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::Dedent) {
            body.push(self.parse_statement()?);
            self.skip_newlines();
        }
        self.expect(&TokenKind::Dedent)?;
        Ok(body)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().clone() {
            TokenKind::Def => self.parse_function_def(false).map(Stmt::FunctionDef),
            TokenKind::Async => {
                self.advance();
                self.expect(&TokenKind::Def)?;
                self.parse_function_def(true).map(Stmt::FunctionDef)
            }
            TokenKind::Class => self.parse_class_def().map(Stmt::ClassDef),
            TokenKind::If => self.parse_if().map(Stmt::If),
            TokenKind::While => self.parse_while().map(Stmt::While),
            TokenKind::For => self.parse_for().map(Stmt::For),
            TokenKind::Return => self.parse_return().map(Stmt::Return),
            TokenKind::Import => self.parse_import().map(Stmt::Import),
            TokenKind::From => self.parse_import_from().map(Stmt::ImportFrom),
            TokenKind::Pass => {
                let span = self.advance().span;
                self.expect(&TokenKind::Newline)?;
                Ok(Stmt::Pass(span))
            }
            _ => self.parse_assign_or_expr_stmt(),
        }
    }

    fn parse_function_def(&mut self, is_async: bool) -> Result<FunctionDef, ParseError> {
        let start = self.expect(&TokenKind::Def)?.span;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let (pname, pspan) = self.expect_ident()?;
            let hint = if self.eat(&TokenKind::Colon) {
                Some(self.parse_hint_expr()?)
            } else {
                None
            };
            // Default values are parsed and discarded: the supported subset
            // does not track default-value semantics (spec.md's parameter
            // inference only looks at usage in the body).
            if self.eat(&TokenKind::Eq) {
                self.parse_expr()?;
            }
            params.push(Param { name: pname, hint, span: pspan });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        let return_hint = if self.eat(&TokenKind::Arrow) { Some(self.parse_hint_expr()?) } else { None };
        let body = self.parse_block()?;
        let end = body.last().map_or(start, Stmt::span);
        Ok(FunctionDef {
            name,
            params,
            return_hint,
            body,
            is_async,
            span: TextRange::new(start.start(), end.end()),
        })
    }

    /// Type hints are parsed as plain identifier expressions and stored as
    /// hint strings (spec.md §4.2): the analyzer may use or ignore them, so
    /// there is no dedicated hint-expression grammar beyond dotted names.
    fn parse_hint_expr(&mut self) -> Result<Box<str>, ParseError> {
        let (mut text, _) = self.expect_ident()?;
        while self.eat(&TokenKind::Dot) {
            let (attr, _) = self.expect_ident()?;
            text = format!("{text}.{attr}").into_boxed_str();
        }
        if self.eat(&TokenKind::LBracket) {
            // Generic hints like `list[int]`: skip the subscript, we only
            // keep the base name.
            let mut depth = 1;
            while depth > 0 {
                match self.peek() {
                    TokenKind::LBracket => depth += 1,
                    TokenKind::RBracket => depth -= 1,
                    TokenKind::Eof => break,
                    _ => {}
                }
                self.advance();
            }
        }
        Ok(text)
    }

    fn parse_class_def(&mut self) -> Result<ClassDef, ParseError> {
        let start = self.expect(&TokenKind::Class)?.span;
        let (name, _) = self.expect_ident()?;
        self.expect(&TokenKind::Colon)?;
        self.expect(&TokenKind::Newline)?;
        self.expect(&TokenKind::Indent)?;
        let mut methods = Vec::new();
        self.skip_newlines();
        while !self.check(&TokenKind::Dedent) {
            match self.peek().clone() {
                TokenKind::Def => methods.push(self.parse_function_def(false)?),
                TokenKind::Async => {
                    self.advance();
                    self.expect(&TokenKind::Def)?;
                    methods.push(self.parse_function_def(true)?);
                }
                TokenKind::Str(_) => {
                    // Bare docstring: parse and drop.
                    let span = self.peek_span();
                    self.parse_expr()?;
                    self.expect(&TokenKind::Newline)?;
                    let _ = span;
                }
                _ => {
                    return Err(ParseError::UnsupportedClassMember { span: self.peek_span() });
                }
            }
            self.skip_newlines();
        }
        let end = self.expect(&TokenKind::Dedent)?.span;
        Ok(ClassDef { name, methods, span: TextRange::new(start.start(), end.end()) })
    }

    fn parse_if(&mut self) -> Result<If, ParseError> {
        let start = self.expect(&TokenKind::If)?.span;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        let orelse = self.parse_else_chain()?;
        let end_span = orelse.last().or(body.last()).map_or(start, Stmt::span);
        Ok(If { test, body, orelse, span: TextRange::new(start.start(), end_span.end()) })
    }

    /// `elif` desugars to a nested single-statement `else` block, the
    /// standard flattening recursive-descent parsers use for `if/elif*/else`
    /// chains.
    fn parse_else_chain(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.check(&TokenKind::Elif) {
            let elif_start = self.peek_span();
            self.advance();
            let test = self.parse_expr()?;
            let body = self.parse_block()?;
            let orelse = self.parse_else_chain()?;
            let end = orelse.last().or(body.last()).map_or(elif_start, Stmt::span);
            return Ok(vec![Stmt::If(If {
                test,
                body,
                orelse,
                span: TextRange::new(elif_start.start(), end.end()),
            })]);
        }
        if self.eat(&TokenKind::Else) {
            return self.parse_block();
        }
        Ok(Vec::new())
    }

    fn parse_while(&mut self) -> Result<While, ParseError> {
        let start = self.expect(&TokenKind::While)?.span;
        let test = self.parse_expr()?;
        let body = self.parse_block()?;
        let end = body.last().map_or(start, Stmt::span);
        Ok(While { test, body, span: TextRange::new(start.start(), end.end()) })
    }

    fn parse_for(&mut self) -> Result<For, ParseError> {
        let start = self.expect(&TokenKind::For)?.span;
        let target = self.parse_for_target()?;
        self.expect(&TokenKind::In)?;
        let iter = self.parse_expr()?;
        let body = self.parse_block()?;
        let end = body.last().map_or(start, Stmt::span);
        Ok(For { target, iter, body, span: TextRange::new(start.start(), end.end()) })
    }

    /// A single name, or a parenthesis-less comma-separated list of names
    /// (spec.md §3's `For` target, §4.2's parser decision).
    fn parse_for_target(&mut self) -> Result<ForTarget, ParseError> {
        let (first, span) = self.expect_ident()?;
        if self.check(&TokenKind::Comma) {
            let mut names = vec![first];
            while self.eat(&TokenKind::Comma) {
                if self.check(&TokenKind::In) {
                    break;
                }
                let (name, _) = self.expect_ident()?;
                names.push(name);
            }
            return Ok(ForTarget::Tuple(names));
        }
        let _ = span;
        Ok(ForTarget::Name(first))
    }

    fn parse_return(&mut self) -> Result<Return, ParseError> {
        let start = self.expect(&TokenKind::Return)?.span;
        let value = if self.check(&TokenKind::Newline) { None } else { Some(self.parse_expr()?) };
        let end = self.expect(&TokenKind::Newline)?.span;
        Ok(Return { value, span: TextRange::new(start.start(), end.end()) })
    }

    fn parse_import(&mut self) -> Result<Import, ParseError> {
        let start = self.expect(&TokenKind::Import)?.span;
        let (mut module, _) = self.expect_ident()?;
        while self.eat(&TokenKind::Dot) {
            let (part, _) = self.expect_ident()?;
            module = format!("{module}.{part}").into_boxed_str();
        }
        let alias = if self.eat(&TokenKind::As) { Some(self.expect_ident()?.0) } else { None };
        let end = self.expect(&TokenKind::Newline)?.span;
        Ok(Import { module, alias, span: TextRange::new(start.start(), end.end()) })
    }

    fn parse_import_from(&mut self) -> Result<ImportFrom, ParseError> {
        let start = self.expect(&TokenKind::From)?.span;
        let (module, _) = self.expect_ident()?;
        self.expect(&TokenKind::Import)?;
        let mut names = Vec::new();
        loop {
            let (name, _) = self.expect_ident()?;
            let alias = if self.eat(&TokenKind::As) { Some(self.expect_ident()?.0) } else { None };
            names.push((name, alias));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::Newline)?.span;
        Ok(ImportFrom { module, names, span: TextRange::new(start.start(), end.end()) })
    }

    fn parse_assign_or_expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek_span();
        let first = self.parse_expr()?;
        if self.eat(&TokenKind::Eq) {
            let mut targets = vec![Self::expr_to_target(first)?];
            let mut value = self.parse_expr()?;
            while self.eat(&TokenKind::Eq) {
                targets.push(Self::expr_to_target(value)?);
                value = self.parse_expr()?;
            }
            let end = self.expect(&TokenKind::Newline)?.span;
            return Ok(Stmt::Assign(Assign { targets, value, span: TextRange::new(start.start(), end.end()) }));
        }
        if let Some(op) = Self::augmented_op(self.peek()) {
            self.advance();
            let rhs = self.parse_expr()?;
            let target = Self::expr_to_target(first.clone())?;
            let span = first.span();
            let value = Expr::BinOp { op, left: Box::new(first), right: Box::new(rhs), span };
            let end = self.expect(&TokenKind::Newline)?.span;
            return Ok(Stmt::Assign(Assign { targets: vec![target], value, span: TextRange::new(start.start(), end.end()) }));
        }
        let end = self.expect(&TokenKind::Newline)?.span;
        // A bare string literal at statement position is a docstring: it is
        // parsed but has no runtime effect, matching `ExprStmt`'s note in
        // spec.md §3 ("docstring-shaped bare strings are dropped"); we keep
        // it as a normal `ExprStmt` here and let the emitter skip it.
        Ok(Stmt::ExprStmt(ExprStmt { value: first, span: TextRange::new(start.start(), end.end()) }))
    }

    fn augmented_op(kind: &TokenKind) -> Option<Operator> {
        Some(match kind {
            TokenKind::PlusEq => Operator::Add,
            TokenKind::MinusEq => Operator::Sub,
            TokenKind::StarEq => Operator::Mul,
            TokenKind::SlashEq => Operator::Div,
            TokenKind::DoubleSlashEq => Operator::FloorDiv,
            TokenKind::PercentEq => Operator::Mod,
            TokenKind::DoubleStarEq => Operator::Pow,
            TokenKind::AmpEq => Operator::BitAnd,
            TokenKind::PipeEq => Operator::BitOr,
            TokenKind::CaretEq => Operator::BitXor,
            _ => return None,
        })
    }

    fn expr_to_target(expr: Expr) -> Result<AssignTarget, ParseError> {
        match expr {
            Expr::Name(name, span) => Ok(AssignTarget::Name(name, span)),
            Expr::Attribute { value, attr, span } => Ok(AssignTarget::Attribute { value, attr, span }),
            Expr::Tuple(items, span) => {
                let targets = items.into_iter().map(Self::expr_to_target).collect::<Result<_, _>>()?;
                Ok(AssignTarget::Tuple(targets, span))
            }
            other => Err(ParseError::UnsupportedTarget { span: other.span() }),
        }
    }

    // ---- expressions ------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let body = self.parse_or()?;
        if self.eat(&TokenKind::If) {
            let test = self.parse_or()?;
            self.expect(&TokenKind::Else)?;
            let orelse = self.parse_expr()?;
            let span = TextRange::new(body.span().start(), orelse.span().end());
            return Ok(Expr::IfExp { test: Box::new(test), body: Box::new(body), orelse: Box::new(orelse), span });
        }
        Ok(body)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        if self.check(&TokenKind::Or) {
            let mut values = vec![left];
            while self.eat(&TokenKind::Or) {
                values.push(self.parse_and()?);
            }
            let span = TextRange::new(values[0].span().start(), values.last().unwrap().span().end());
            left = Expr::BoolOp { op: BoolOperator::Or, values, span };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        if self.check(&TokenKind::And) {
            let mut values = vec![left];
            while self.eat(&TokenKind::And) {
                values.push(self.parse_not()?);
            }
            let span = TextRange::new(values[0].span().start(), values.last().unwrap().span().end());
            left = Expr::BoolOp { op: BoolOperator::And, values, span };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check(&TokenKind::Not) {
            let start = self.advance().span;
            let operand = self.parse_not()?;
            let span = TextRange::new(start.start(), operand.span().end());
            return Ok(Expr::UnaryOp { op: UnaryOperator::Not, operand: Box::new(operand), span });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_bitor()?;
        let op = match self.peek() {
            TokenKind::Lt => CmpOperator::Lt,
            TokenKind::LtEq => CmpOperator::LtEq,
            TokenKind::Gt => CmpOperator::Gt,
            TokenKind::GtEq => CmpOperator::GtEq,
            TokenKind::EqEq => CmpOperator::Eq,
            TokenKind::NotEq => CmpOperator::NotEq,
            TokenKind::In => CmpOperator::In,
            TokenKind::Is => CmpOperator::Is,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_bitor()?;
        let span = TextRange::new(left.span().start(), right.span().end());
        Ok(Expr::Compare { left: Box::new(left), op, right: Box::new(right), span })
    }

    fn parse_bitor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitxor()?;
        while self.check(&TokenKind::Pipe) {
            self.advance();
            let right = self.parse_bitxor()?;
            let span = TextRange::new(left.span().start(), right.span().end());
            left = Expr::BinOp { op: Operator::BitOr, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_bitxor(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_bitand()?;
        while self.check(&TokenKind::Caret) {
            self.advance();
            let right = self.parse_bitand()?;
            let span = TextRange::new(left.span().start(), right.span().end());
            left = Expr::BinOp { op: Operator::BitXor, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_shift()?;
        while self.check(&TokenKind::Amp) {
            self.advance();
            let right = self.parse_shift()?;
            let span = TextRange::new(left.span().start(), right.span().end());
            left = Expr::BinOp { op: Operator::BitAnd, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_arith()?;
        loop {
            let op = match self.peek() {
                TokenKind::LShift => Operator::LShift,
                TokenKind::RShift => Operator::RShift,
                _ => break,
            };
            self.advance();
            let right = self.parse_arith()?;
            let span = TextRange::new(left.span().start(), right.span().end());
            left = Expr::BinOp { op, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_arith(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => Operator::Add,
                TokenKind::Minus => Operator::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            let span = TextRange::new(left.span().start(), right.span().end());
            left = Expr::BinOp { op, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => Operator::Mul,
                TokenKind::Slash => Operator::Div,
                TokenKind::DoubleSlash => Operator::FloorDiv,
                TokenKind::Percent => Operator::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let span = TextRange::new(left.span().start(), right.span().end());
            left = Expr::BinOp { op, left: Box::new(left), right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Minus => UnaryOperator::Minus,
            TokenKind::Tilde => UnaryOperator::Invert,
            _ => return self.parse_power(),
        };
        let start = self.advance().span;
        let operand = self.parse_unary()?;
        let span = TextRange::new(start.start(), operand.span().end());
        Ok(Expr::UnaryOp { op, operand: Box::new(operand), span })
    }

    /// `**` is right-associative: `2 ** 3 ** 2 == 2 ** (3 ** 2)`.
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;
        if self.eat(&TokenKind::DoubleStar) {
            let exponent = self.parse_unary()?;
            let span = TextRange::new(base.span().start(), exponent.span().end());
            return Ok(Expr::BinOp { op: Operator::Pow, left: Box::new(base), right: Box::new(exponent), span });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let (attr, attr_span) = self.expect_ident()?;
                    let span = TextRange::new(expr.span().start(), attr_span.end());
                    expr = Expr::Attribute { value: Box::new(expr), attr, span };
                }
                TokenKind::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    while !self.check(&TokenKind::RParen) {
                        args.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    let end = self.expect(&TokenKind::RParen)?.span;
                    let span = TextRange::new(expr.span().start(), end.end());
                    expr = Expr::Call { func: Box::new(expr), args, span };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let end = self.expect(&TokenKind::RBracket)?.span;
                    let span = TextRange::new(expr.span().start(), end.end());
                    expr = Expr::Subscript { value: Box::new(expr), index: Box::new(index), span };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let span = self.peek_span();
        match self.peek().clone() {
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Constant(Constant::Int(value), span))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::Constant(Constant::Float(value), span))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(Expr::Constant(Constant::Str(value), span))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Constant(Constant::Bool(true), span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Constant(Constant::Bool(false), span))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::Constant(Constant::None, span))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Name(name, span))
            }
            TokenKind::LParen => {
                self.advance();
                if self.eat(&TokenKind::RParen) {
                    return Ok(Expr::Tuple(Vec::new(), span));
                }
                let first = self.parse_expr()?;
                if self.eat(&TokenKind::Comma) {
                    let mut items = vec![first];
                    while !self.check(&TokenKind::RParen) {
                        items.push(self.parse_expr()?);
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                    let end = self.expect(&TokenKind::RParen)?.span;
                    return Ok(Expr::Tuple(items, TextRange::new(span.start(), end.end())));
                }
                self.expect(&TokenKind::RParen)?;
                Ok(first)
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    items.push(self.parse_expr()?);
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(&TokenKind::RBracket)?.span;
                Ok(Expr::List(items, TextRange::new(span.start(), end.end())))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut items = Vec::new();
                while !self.check(&TokenKind::RBrace) {
                    let key = self.parse_expr()?;
                    self.expect(&TokenKind::Colon)?;
                    let value = self.parse_expr()?;
                    items.push((key, value));
                    if !self.eat(&TokenKind::Comma) {
                        break;
                    }
                }
                let end = self.expect(&TokenKind::RBrace)?.span;
                Ok(Expr::Dict(items, TextRange::new(span.start(), end.end())))
            }
            _ => Err(ParseError::ExpectedExpression { span }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_src(src: &str) -> Module {
        parse(tokenize(src).unwrap()).unwrap()
    }

    #[test]
    fn function_with_return() {
        let module = parse_src("def f(n):\n    return n\n");
        assert_eq!(module.body.len(), 1);
        assert!(matches!(module.body[0], Stmt::FunctionDef(_)));
    }

    #[test]
    fn if_elif_else_desugars() {
        let module = parse_src("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");
        let Stmt::If(outer) = &module.body[0] else { panic!("expected if") };
        assert_eq!(outer.orelse.len(), 1);
        assert!(matches!(outer.orelse[0], Stmt::If(_)));
    }

    #[test]
    fn power_is_right_associative() {
        let module = parse_src("x = 2 ** 3 ** 2\n");
        let Stmt::Assign(assign) = &module.body[0] else { panic!("expected assign") };
        let Expr::BinOp { right, .. } = &assign.value else { panic!("expected binop") };
        assert!(right.is_add() == false);
        assert!(matches!(**right, Expr::BinOp { op: Operator::Pow, .. }));
    }

    #[test]
    fn class_rejects_non_method_non_docstring() {
        let result = parse(tokenize("class C:\n    x = 1\n").unwrap());
        assert!(matches!(result, Err(ParseError::UnsupportedClassMember { .. })));
    }

    #[test]
    fn for_tuple_target() {
        let module = parse_src("for i, v in pairs:\n    pass\n");
        let Stmt::For(for_stmt) = &module.body[0] else { panic!("expected for") };
        assert!(matches!(for_stmt.target, ForTarget::Tuple(_)));
    }

    #[test]
    fn augmented_assign_desugars_to_binop() {
        let module = parse_src("x += 1\n");
        let Stmt::Assign(assign) = &module.body[0] else { panic!("expected assign") };
        assert!(matches!(assign.value, Expr::BinOp { op: Operator::Add, .. }));
    }
}
