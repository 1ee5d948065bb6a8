//! Parsing (tokens to AST)
//!
//! The parser converts a stream of tokens into an Abstract Syntax Tree.
//! Uses Pratt parsing for expressions and recursive descent for statements.
//! Arrow functions are disambiguated from parenthesized expressions by a
//! bounded token lookahead (scan to the matching `)` and check for `=>`).

use crate::ast::*;
use crate::diagnostic::{error_codes, Diagnostic};
use crate::span::Span;
use crate::token::{Token, TokenKind};

/// Parser state for building an AST from tokens
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// Function body nesting depth; `return` is only legal when nonzero
    fn_depth: usize,
    diagnostics: Vec<Diagnostic>,
}

/// Operator precedence levels for Pratt parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Or,         // ||
    And,        // &&
    Equality,   // == === != !==
    Comparison, // < <= > >=
    Term,       // + -
    Factor,     // * / %
}

impl Precedence {
    fn of(kind: TokenKind) -> Option<Precedence> {
        match kind {
            TokenKind::PipePipe => Some(Precedence::Or),
            TokenKind::AmpAmp => Some(Precedence::And),
            TokenKind::EqualEqual
            | TokenKind::EqualEqualEqual
            | TokenKind::BangEqual
            | TokenKind::BangEqualEqual => Some(Precedence::Equality),
            TokenKind::Less | TokenKind::LessEqual | TokenKind::Greater | TokenKind::GreaterEqual => {
                Some(Precedence::Comparison)
            }
            TokenKind::Plus | TokenKind::Minus => Some(Precedence::Term),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some(Precedence::Factor),
            _ => None,
        }
    }
}

impl Parser {
    /// Create a new parser for the given tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            current: 0,
            fn_depth: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parse tokens into an AST
    pub fn parse(&mut self) -> (Program, Vec<Diagnostic>) {
        let mut body = Vec::new();

        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => body.push(stmt),
                Err(_) => self.synchronize(),
            }
        }

        (Program { body }, std::mem::take(&mut self.diagnostics))
    }

    // === Statement parsing ===

    /// Parse a statement
    fn parse_statement(&mut self) -> Result<Stmt, ()> {
        match self.peek().kind {
            TokenKind::Let | TokenKind::Const | TokenKind::Var => self.parse_var_decl(),
            TokenKind::Function => self.parse_function_decl(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Throw => self.parse_throw_stmt(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            _ => self.parse_expr_stmt(),
        }
    }

    /// Parse a variable declaration: `let name = init;`
    fn parse_var_decl(&mut self) -> Result<Stmt, ()> {
        let kw = self.advance().clone();
        let kind = match kw.kind {
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            TokenKind::Var => DeclKind::Var,
            _ => unreachable!(),
        };

        let name_token = self.consume_identifier("a variable name")?;
        let name = Identifier {
            name: name_token.lexeme.clone(),
            span: name_token.span,
        };

        let init = if self.match_token(TokenKind::Equal) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let end = init.as_ref().map(|e| e.span()).unwrap_or(name.span);
        self.consume_statement_end()?;

        Ok(Stmt::VarDecl(VarDecl {
            kind,
            name,
            init,
            span: kw.span.merge(end),
        }))
    }

    /// Parse a function declaration: `function name(params) { ... }`
    fn parse_function_decl(&mut self) -> Result<Stmt, ()> {
        let fn_span = self.consume(TokenKind::Function, "Expected 'function'")?.span;

        let name_token = self.consume_identifier("a function name")?;
        let name = Identifier {
            name: name_token.lexeme.clone(),
            span: name_token.span,
        };

        self.consume(TokenKind::LeftParen, "Expected '(' after function name")?;
        let params = self.parse_params()?;
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;

        let body = self.parse_function_body_block()?;
        let span = fn_span.merge(body.span);

        Ok(Stmt::FunctionDecl(FunctionDecl {
            name,
            function: FunctionExpr {
                params,
                body: FunctionBody::Block(body),
                span,
            },
            span,
        }))
    }

    /// Parse a return statement; only legal inside a function body
    fn parse_return_stmt(&mut self) -> Result<Stmt, ()> {
        let kw_span = self.advance().span;

        if self.fn_depth == 0 {
            self.error_at(kw_span, "Illegal return statement");
            return Err(());
        }

        let value = if self.check(TokenKind::Semicolon)
            || self.check(TokenKind::RightBrace)
            || self.is_at_end()
        {
            None
        } else {
            Some(self.parse_expression()?)
        };

        let end = value.as_ref().map(|e| e.span()).unwrap_or(kw_span);
        self.consume_statement_end()?;

        Ok(Stmt::Return(ReturnStmt {
            value,
            span: kw_span.merge(end),
        }))
    }

    /// Parse a throw statement
    fn parse_throw_stmt(&mut self) -> Result<Stmt, ()> {
        let kw_span = self.advance().span;
        let value = self.parse_expression()?;
        let span = kw_span.merge(value.span());
        self.consume_statement_end()?;

        Ok(Stmt::Throw(ThrowStmt { value, span }))
    }

    /// Parse an if statement with optional else branch
    fn parse_if_stmt(&mut self) -> Result<Stmt, ()> {
        let kw_span = self.advance().span;

        self.consume(TokenKind::LeftParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;

        let then_branch = Box::new(self.parse_statement()?);
        let mut span = kw_span.merge(then_branch.span());

        let else_branch = if self.match_token(TokenKind::Else) {
            let stmt = Box::new(self.parse_statement()?);
            span = span.merge(stmt.span());
            Some(stmt)
        } else {
            None
        };

        Ok(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    /// Parse a braced block as a function body, tracking nesting depth
    /// so `return` legality can be checked.
    fn parse_function_body_block(&mut self) -> Result<Block, ()> {
        self.fn_depth += 1;
        let body = self.parse_block();
        self.fn_depth -= 1;
        body
    }

    /// Parse a braced block
    fn parse_block(&mut self) -> Result<Block, ()> {
        let open = self.consume(TokenKind::LeftBrace, "Expected '{'")?.span;

        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        let close = self.consume(TokenKind::RightBrace, "Expected '}'")?.span;

        Ok(Block {
            statements,
            span: open.merge(close),
        })
    }

    /// Parse an expression statement
    fn parse_expr_stmt(&mut self) -> Result<Stmt, ()> {
        let expr = self.parse_expression()?;
        let span = expr.span();
        self.consume_statement_end()?;

        Ok(Stmt::Expr(ExprStmt { expr, span }))
    }

    // === Expression parsing ===

    /// Parse an expression (entry point; handles assignment)
    fn parse_expression(&mut self) -> Result<Expr, ()> {
        let expr = self.parse_precedence(Precedence::Lowest)?;

        // Assignment is right-associative and only valid with a name target
        if self.check(TokenKind::Equal) {
            let eq_span = self.advance().span;
            let value = self.parse_expression()?;

            if let Expr::Identifier(target) = expr {
                let span = target.span.merge(value.span());
                return Ok(Expr::Assign(Box::new(AssignExpr {
                    target,
                    value,
                    span,
                })));
            }

            self.error_at(eq_span, "Invalid assignment target");
            return Err(());
        }

        Ok(expr)
    }

    /// Pratt parse at a minimum precedence
    fn parse_precedence(&mut self, min: Precedence) -> Result<Expr, ()> {
        let mut left = self.parse_unary()?;

        while let Some(prec) = Precedence::of(self.peek().kind) {
            if prec <= min {
                break;
            }

            let op_token = self.advance().clone();
            let op = Self::binary_op(op_token.kind);
            let right = self.parse_precedence(prec)?;
            let span = left.span().merge(right.span());

            left = Expr::Binary(Box::new(BinaryExpr {
                op,
                left,
                right,
                span,
            }));
        }

        Ok(left)
    }

    fn binary_op(kind: TokenKind) -> BinaryOp {
        match kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::EqualEqual => BinaryOp::Eq,
            TokenKind::EqualEqualEqual => BinaryOp::StrictEq,
            TokenKind::BangEqual => BinaryOp::Ne,
            TokenKind::BangEqualEqual => BinaryOp::StrictNe,
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::LessEqual => BinaryOp::Le,
            TokenKind::Greater => BinaryOp::Gt,
            TokenKind::GreaterEqual => BinaryOp::Ge,
            TokenKind::AmpAmp => BinaryOp::And,
            TokenKind::PipePipe => BinaryOp::Or,
            _ => unreachable!("not a binary operator"),
        }
    }

    /// Parse a unary expression
    fn parse_unary(&mut self) -> Result<Expr, ()> {
        if self.check(TokenKind::Bang) || self.check(TokenKind::Minus) {
            let op_token = self.advance().clone();
            let op = if op_token.kind == TokenKind::Bang {
                UnaryOp::Not
            } else {
                UnaryOp::Neg
            };
            let operand = self.parse_unary()?;
            let span = op_token.span.merge(operand.span());
            return Ok(Expr::Unary(Box::new(UnaryExpr { op, operand, span })));
        }

        self.parse_postfix()
    }

    /// Parse call and member postfix chains
    fn parse_postfix(&mut self) -> Result<Expr, ()> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(TokenKind::Dot) {
                let name_token = self.consume_identifier("a property name")?;
                let property = Identifier {
                    name: name_token.lexeme.clone(),
                    span: name_token.span,
                };
                let span = expr.span().merge(property.span);
                expr = Expr::Member(Box::new(MemberExpr {
                    object: expr,
                    property,
                    span,
                }));
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse the argument list of a call
    fn finish_call(&mut self, callee: Expr) -> Result<Expr, ()> {
        self.consume(TokenKind::LeftParen, "Expected '('")?;
        let args = self.parse_args()?;
        let close = self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;
        let span = callee.span().merge(close.span);

        Ok(Expr::Call(Box::new(CallExpr { callee, args, span })))
    }

    /// Parse a primary expression
    fn parse_primary(&mut self) -> Result<Expr, ()> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Number => {
                self.advance();
                let value: f64 = token.lexeme.parse().map_err(|_| {
                    self.error_at(token.span, "Invalid number literal");
                })?;
                Ok(Expr::Literal(Literal::Number(value), token.span))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr::Literal(
                    Literal::String(token.lexeme.clone()),
                    token.span,
                ))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(true), token.span))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Literal::Bool(false), token.span))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Literal::Null, token.span))
            }
            TokenKind::Undefined => {
                self.advance();
                Ok(Expr::Literal(Literal::Undefined, token.span))
            }
            TokenKind::Identifier => {
                // `x => expr`: single-parameter arrow without parentheses
                if self.peek_ahead(1).kind == TokenKind::Arrow {
                    return self.parse_arrow_function();
                }
                self.advance();
                Ok(Expr::Identifier(Identifier {
                    name: token.lexeme.clone(),
                    span: token.span,
                }))
            }
            TokenKind::New => self.parse_new(),
            TokenKind::Function => self.parse_function_expr(),
            TokenKind::LeftParen => {
                if self.is_arrow_ahead() {
                    self.parse_arrow_function()
                } else {
                    self.advance();
                    let expr = self.parse_expression()?;
                    self.consume(TokenKind::RightParen, "Expected ')' after expression")?;
                    Ok(expr)
                }
            }
            _ => {
                self.error_at(
                    token.span,
                    &format!("Unexpected token '{}'", token.kind.as_str()),
                );
                Err(())
            }
        }
    }

    /// Parse `new Callee(args)`
    fn parse_new(&mut self) -> Result<Expr, ()> {
        let kw_span = self.advance().span;

        let name_token = self.consume_identifier("a constructor name")?;
        let callee = Expr::Identifier(Identifier {
            name: name_token.lexeme.clone(),
            span: name_token.span,
        });

        self.consume(TokenKind::LeftParen, "Expected '(' after constructor name")?;
        let args = self.parse_args()?;
        let close = self.consume(TokenKind::RightParen, "Expected ')' after arguments")?;

        Ok(Expr::New(Box::new(NewExpr {
            callee,
            args,
            span: kw_span.merge(close.span),
        })))
    }

    /// Parse an anonymous `function (params) { ... }` expression
    fn parse_function_expr(&mut self) -> Result<Expr, ()> {
        let fn_span = self.advance().span;

        self.consume(TokenKind::LeftParen, "Expected '(' after 'function'")?;
        let params = self.parse_params()?;
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;

        let body = self.parse_function_body_block()?;
        let span = fn_span.merge(body.span);

        Ok(Expr::Function(Box::new(FunctionExpr {
            params,
            body: FunctionBody::Block(body),
            span,
        })))
    }

    /// Parse an arrow function: `(a, b) => body` or `a => body`
    fn parse_arrow_function(&mut self) -> Result<Expr, ()> {
        let start = self.peek().span;

        let params = if self.match_token(TokenKind::LeftParen) {
            let params = self.parse_params()?;
            self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;
            params
        } else {
            let name_token = self.consume_identifier("a parameter name")?;
            vec![Identifier {
                name: name_token.lexeme.clone(),
                span: name_token.span,
            }]
        };

        self.consume(TokenKind::Arrow, "Expected '=>'")?;

        let (body, end) = if self.check(TokenKind::LeftBrace) {
            let block = self.parse_function_body_block()?;
            let span = block.span;
            (FunctionBody::Block(block), span)
        } else {
            let expr = self.parse_expression()?;
            let span = expr.span();
            (FunctionBody::Expr(Box::new(expr)), span)
        };

        Ok(Expr::Function(Box::new(FunctionExpr {
            params,
            body,
            span: start.merge(end),
        })))
    }

    /// Parse a comma-separated parameter list (cursor inside parens)
    fn parse_params(&mut self) -> Result<Vec<Identifier>, ()> {
        let mut params = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                let token = self.consume_identifier("a parameter name")?;
                params.push(Identifier {
                    name: token.lexeme.clone(),
                    span: token.span,
                });

                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(params)
    }

    /// Parse a comma-separated argument list (cursor inside parens)
    fn parse_args(&mut self) -> Result<Vec<Expr>, ()> {
        let mut args = Vec::new();

        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(args)
    }

    /// Look ahead from a `(` to decide whether this is an arrow parameter
    /// list: scan to the matching `)` and check for a following `=>`.
    fn is_arrow_ahead(&self) -> bool {
        debug_assert_eq!(self.peek().kind, TokenKind::LeftParen);

        let mut depth = 0usize;
        let mut i = self.current;
        while i < self.tokens.len() {
            match self.tokens[i].kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self
                            .tokens
                            .get(i + 1)
                            .map(|t| t.kind == TokenKind::Arrow)
                            .unwrap_or(false);
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
        false
    }

    // === Token navigation ===

    /// Peek at the current token
    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    /// Peek `n` tokens ahead (clamped to EOF)
    fn peek_ahead(&self, n: usize) -> &Token {
        let idx = (self.current + n).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    /// Advance and return the consumed token
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    /// Check the current token kind without advancing
    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume the current token if it matches
    fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of the expected kind or record an error
    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, ()> {
        if self.check(kind) {
            Ok(self.advance().clone())
        } else {
            let span = self.peek().span;
            self.error_at(span, message);
            Err(())
        }
    }

    /// Consume an identifier token or record an error
    fn consume_identifier(&mut self, what: &str) -> Result<Token, ()> {
        if self.check(TokenKind::Identifier) {
            Ok(self.advance().clone())
        } else {
            let span = self.peek().span;
            self.error_at(span, &format!("Expected {}", what));
            Err(())
        }
    }

    /// Consume the end of a statement: a `;`, or tolerate `}`/EOF
    fn consume_statement_end(&mut self) -> Result<(), ()> {
        if self.match_token(TokenKind::Semicolon) {
            return Ok(());
        }
        if self.check(TokenKind::RightBrace) || self.is_at_end() {
            return Ok(());
        }
        let span = self.peek().span;
        self.error_at(span, "Expected ';' after statement");
        Err(())
    }

    /// Check if we've reached the end of the token stream
    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    /// Record a parse error diagnostic
    fn error_at(&mut self, span: Span, message: &str) {
        self.diagnostics
            .push(Diagnostic::error_with_code(error_codes::PARSE, message, span));
    }

    /// Skip tokens until a likely statement boundary
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            if self.advance().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::Function
                | TokenKind::Return
                | TokenKind::Throw
                | TokenKind::If => return,
                _ => {}
            }
        }
    }
}
