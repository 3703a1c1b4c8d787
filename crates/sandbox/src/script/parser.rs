//! Recursive-descent parser producing [`ast`](super::ast) nodes

use std::rc::Rc;

use super::ast::*;
use super::lexer::{Lexer, TemplateChunk, Token, TokenKind};
use super::SyntaxError;

type PResult<T> = Result<T, SyntaxError>;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "default", "delete", "do", "else",
    "export", "finally", "for", "function", "if", "import", "in", "instanceof", "let", "new",
    "return", "switch", "throw", "try", "typeof", "var", "void", "while", "yield",
];

enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Parse a whole script
pub fn parse_program(source: &str) -> PResult<Vec<Stmt>> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser::new(tokens).program()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn program(&mut self) -> PResult<Vec<Stmt>> {
        let mut body = Vec::new();
        while !self.at_eof() {
            body.push(self.statement()?);
        }
        Ok(body)
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn kind_at(&self, offset: usize) -> &TokenKind {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn is_punct(&self, p: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Punct(q) if *q == p)
    }

    fn is_word(&self, w: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Word(x) if x == w)
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.is_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, w: &str) -> bool {
        if self.is_word(w) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> PResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            let found = describe(&self.peek().kind);
            Err(self.error(format!("Expected '{}' but found {}", p, found)))
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let token = self.peek();
        SyntaxError {
            line: token.line,
            column: token.column,
            message: message.into(),
        }
    }

    fn unexpected(&self) -> SyntaxError {
        match &self.peek().kind {
            TokenKind::Eof => self.error("Unexpected end of input"),
            kind => self.error(format!("Unexpected token {}", describe(kind))),
        }
    }

    fn identifier(&mut self) -> PResult<String> {
        match &self.peek().kind {
            TokenKind::Word(w) if !RESERVED.contains(&w.as_str()) => {
                let name = w.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Any word, keywords included, as used after `.` and as object keys
    fn property_name(&mut self) -> PResult<String> {
        match &self.peek().kind {
            TokenKind::Word(w) => {
                let name = w.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn consume_semicolon(&mut self) -> PResult<()> {
        if self.eat_punct(";") || self.is_punct("}") || self.at_eof() || self.peek().newline_before {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn statement(&mut self) -> PResult<Stmt> {
        if self.is_punct("{") {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.eat_punct(";") {
            return Ok(Stmt::Empty);
        }
        let word = match &self.peek().kind {
            TokenKind::Word(w) => w.clone(),
            _ => return self.expression_statement(),
        };
        match word.as_str() {
            "export" => {
                self.advance();
                if self.eat_word("default") {
                    return self.expression_statement();
                }
                self.statement()
            }
            "import" => {
                self.skip_import();
                Ok(Stmt::Empty)
            }
            "const" | "let" | "var" => {
                let stmt = self.declaration()?;
                self.consume_semicolon()?;
                Ok(stmt)
            }
            "function" => {
                self.advance();
                Ok(Stmt::Function(self.function_rest(false, true)?))
            }
            "async" if matches!(self.kind_at(1), TokenKind::Word(w) if w == "function") => {
                self.advance();
                self.advance();
                Ok(Stmt::Function(self.function_rest(true, true)?))
            }
            "return" => {
                self.advance();
                let value = if self.is_punct(";") || self.is_punct("}") || self.at_eof() || self.peek().newline_before {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.consume_semicolon()?;
                Ok(Stmt::Return(value))
            }
            "if" => self.if_statement(),
            "for" => self.for_statement(),
            "while" => {
                self.advance();
                self.expect_punct("(")?;
                let test = self.expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                Ok(Stmt::While { test, body })
            }
            "break" => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Stmt::Break)
            }
            "continue" => {
                self.advance();
                self.consume_semicolon()?;
                Ok(Stmt::Continue)
            }
            "throw" => {
                self.advance();
                let value = self.expression()?;
                self.consume_semicolon()?;
                Ok(Stmt::Throw(value))
            }
            "try" => self.try_statement(),
            "class" | "switch" | "do" => Err(self.error(format!("'{}' statements are not supported", word))),
            _ => self.expression_statement(),
        }
    }

    /// Leftover import the textual pass did not strip
    fn skip_import(&mut self) {
        self.advance();
        while !self.at_eof() && !self.peek().newline_before {
            if self.eat_punct(";") {
                return;
            }
            self.advance();
        }
    }

    fn expression_statement(&mut self) -> PResult<Stmt> {
        let expr = self.expression()?;
        self.consume_semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    fn block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(self.error("Expected '}' but found end of input"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(body)
    }

    fn decl_kind(&mut self) -> Option<DeclKind> {
        let kind = match &self.peek().kind {
            TokenKind::Word(w) if w == "const" => DeclKind::Const,
            TokenKind::Word(w) if w == "let" => DeclKind::Let,
            TokenKind::Word(w) if w == "var" => DeclKind::Var,
            _ => return None,
        };
        self.advance();
        Some(kind)
    }

    fn declaration(&mut self) -> PResult<Stmt> {
        let kind = self.decl_kind().ok_or_else(|| self.unexpected())?;
        let mut declarations = Vec::new();
        loop {
            let pattern = self.binding_pattern()?;
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            declarations.push((pattern, init));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(Stmt::Declare { kind, declarations })
    }

    fn if_statement(&mut self) -> PResult<Stmt> {
        self.advance();
        self.expect_punct("(")?;
        let test = self.expression()?;
        self.expect_punct(")")?;
        let consequent = Box::new(self.statement()?);
        let alternate = if self.eat_word("else") {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
        })
    }

    fn for_statement(&mut self) -> PResult<Stmt> {
        self.advance();
        self.eat_word("await");
        self.expect_punct("(")?;

        let init = if self.is_punct(";") {
            None
        } else if let Some(kind) = self.decl_kind() {
            let pattern = self.binding_pattern()?;
            if self.eat_word("of") {
                let iterable = self.assignment()?;
                self.expect_punct(")")?;
                let body = Box::new(self.statement()?);
                return Ok(Stmt::ForOf {
                    kind,
                    pattern,
                    iterable,
                    body,
                });
            }
            if self.is_word("in") {
                return Err(self.error("for...in loops are not supported"));
            }
            let mut declarations = Vec::new();
            let mut pattern = pattern;
            loop {
                let init = if self.eat_punct("=") {
                    Some(self.assignment()?)
                } else {
                    None
                };
                declarations.push((pattern, init));
                if !self.eat_punct(",") {
                    break;
                }
                pattern = self.binding_pattern()?;
            }
            Some(Box::new(Stmt::Declare { kind, declarations }))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect_punct(";")?;

        let test = if self.is_punct(";") { None } else { Some(self.expression()?) };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") { None } else { Some(self.expression()?) };
        self.expect_punct(")")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn try_statement(&mut self) -> PResult<Stmt> {
        self.advance();
        let block = self.block()?;
        let mut param = None;
        let mut handler = None;
        if self.eat_word("catch") {
            if self.eat_punct("(") {
                param = Some(self.binding_pattern()?);
                self.expect_punct(")")?;
            }
            handler = Some(self.block()?);
        }
        let finalizer = if self.eat_word("finally") {
            Some(self.block()?)
        } else {
            None
        };
        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(Stmt::Try {
            block,
            param,
            handler,
            finalizer,
        })
    }

    // ------------------------------------------------------------------
    // Patterns and functions
    // ------------------------------------------------------------------

    fn binding_pattern(&mut self) -> PResult<Pattern> {
        if self.eat_punct("{") {
            let mut properties = Vec::new();
            let mut rest = None;
            while !self.eat_punct("}") {
                if self.eat_punct("...") {
                    rest = Some(self.identifier()?);
                } else {
                    let key = match &self.peek().kind {
                        TokenKind::Str(s) => {
                            let key = s.clone();
                            self.advance();
                            key
                        }
                        _ => self.property_name()?,
                    };
                    let target = if self.eat_punct(":") {
                        self.binding_pattern()?
                    } else {
                        Pattern::Ident(key.clone())
                    };
                    let default = if self.eat_punct("=") {
                        Some(self.assignment()?)
                    } else {
                        None
                    };
                    properties.push(PatternProperty { key, target, default });
                }
                if !self.eat_punct(",") {
                    self.expect_punct("}")?;
                    break;
                }
            }
            return Ok(Pattern::Object { properties, rest });
        }

        if self.eat_punct("[") {
            let mut elements = Vec::new();
            while !self.eat_punct("]") {
                if self.eat_punct(",") {
                    elements.push(None);
                    continue;
                }
                elements.push(Some(self.param()?));
                if !self.eat_punct(",") {
                    self.expect_punct("]")?;
                    break;
                }
            }
            return Ok(Pattern::Array(elements));
        }

        Ok(Pattern::Ident(self.identifier()?))
    }

    fn param(&mut self) -> PResult<Param> {
        let rest = self.eat_punct("...");
        let pattern = self.binding_pattern()?;
        let default = if self.eat_punct("=") {
            Some(self.assignment()?)
        } else {
            None
        };
        Ok(Param { pattern, default, rest })
    }

    fn params(&mut self) -> PResult<Vec<Param>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.eat_punct(")") {
            params.push(self.param()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(params)
    }

    /// Everything after the `function` keyword
    fn function_rest(&mut self, is_async: bool, require_name: bool) -> PResult<Rc<FunctionDef>> {
        let name = if matches!(self.peek().kind, TokenKind::Word(_)) {
            Some(self.identifier()?)
        } else if require_name {
            return Err(self.error("Function statements require a name"));
        } else {
            None
        };
        let params = self.params()?;
        let body = FunctionBody::Block(self.block()?);
        Ok(Rc::new(FunctionDef {
            name,
            params,
            body,
            is_arrow: false,
            is_async,
        }))
    }

    /// Index of the `)` matching the `(` at `self.pos + offset`
    fn matching_paren(&self, offset: usize) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = self.pos + offset;
        while i < self.tokens.len() {
            match &self.tokens[i].kind {
                TokenKind::Punct("(") => depth += 1,
                TokenKind::Punct(")") => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                TokenKind::Eof => return None,
                _ => {}
            }
            i += 1;
        }
        None
    }

    fn is_arrow_at(&self, offset: usize) -> bool {
        match self.kind_at(offset) {
            TokenKind::Word(w) => {
                !RESERVED.contains(&w.as_str()) && matches!(self.kind_at(offset + 1), TokenKind::Punct("=>"))
            }
            TokenKind::Punct("(") => self
                .matching_paren(offset)
                .and_then(|close| self.tokens.get(close + 1))
                .map_or(false, |t| matches!(t.kind, TokenKind::Punct("=>"))),
            _ => false,
        }
    }

    fn try_arrow(&mut self) -> PResult<Option<Expr>> {
        let is_async = self.is_word("async")
            && !matches!(self.kind_at(1), TokenKind::Punct("=>"))
            && !self.tokens.get(self.pos + 1).map_or(true, |t| t.newline_before)
            && self.is_arrow_at(1);
        if !is_async && !self.is_arrow_at(0) {
            return Ok(None);
        }
        if is_async {
            self.advance();
        }

        let params = if self.is_punct("(") {
            self.params()?
        } else {
            vec![Param {
                pattern: Pattern::Ident(self.identifier()?),
                default: None,
                rest: false,
            }]
        };
        self.expect_punct("=>")?;
        let body = if self.is_punct("{") {
            FunctionBody::Block(self.block()?)
        } else {
            FunctionBody::Expr(self.assignment()?)
        };
        Ok(Some(Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            body,
            is_arrow: true,
            is_async,
        }))))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub fn expression(&mut self) -> PResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> PResult<Expr> {
        if let Some(arrow) = self.try_arrow()? {
            return Ok(arrow);
        }
        let target = self.conditional()?;
        let op = match &self.peek().kind {
            TokenKind::Punct("=") => AssignOp::Assign,
            TokenKind::Punct("+=") => AssignOp::Add,
            TokenKind::Punct("-=") => AssignOp::Sub,
            TokenKind::Punct("*=") => AssignOp::Mul,
            TokenKind::Punct("/=") => AssignOp::Div,
            _ => return Ok(target),
        };
        if !matches!(target, Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }) {
            return Err(self.error("Invalid left-hand side in assignment"));
        }
        self.advance();
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    fn conditional(&mut self) -> PResult<Expr> {
        let test = self.binary(1)?;
        if !self.eat_punct("?") {
            return Ok(test);
        }
        let consequent = self.assignment()?;
        self.expect_punct(":")?;
        let alternate = self.assignment()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        })
    }

    fn operator(&self) -> Option<(u8, Operator)> {
        let op = match &self.peek().kind {
            TokenKind::Punct(p) => match *p {
                "??" => (1, Operator::Logical(LogicalOp::Nullish)),
                "||" => (2, Operator::Logical(LogicalOp::Or)),
                "&&" => (3, Operator::Logical(LogicalOp::And)),
                "==" => (6, Operator::Binary(BinaryOp::Eq)),
                "!=" => (6, Operator::Binary(BinaryOp::NotEq)),
                "===" => (6, Operator::Binary(BinaryOp::StrictEq)),
                "!==" => (6, Operator::Binary(BinaryOp::StrictNotEq)),
                "<" => (7, Operator::Binary(BinaryOp::Lt)),
                ">" => (7, Operator::Binary(BinaryOp::Gt)),
                "<=" => (7, Operator::Binary(BinaryOp::LtEq)),
                ">=" => (7, Operator::Binary(BinaryOp::GtEq)),
                "+" => (9, Operator::Binary(BinaryOp::Add)),
                "-" => (9, Operator::Binary(BinaryOp::Sub)),
                "*" => (10, Operator::Binary(BinaryOp::Mul)),
                "/" => (10, Operator::Binary(BinaryOp::Div)),
                "%" => (10, Operator::Binary(BinaryOp::Rem)),
                "**" => (11, Operator::Binary(BinaryOp::Pow)),
                _ => return None,
            },
            TokenKind::Word(w) if w == "instanceof" => (7, Operator::Binary(BinaryOp::InstanceOf)),
            TokenKind::Word(w) if w == "in" => (7, Operator::Binary(BinaryOp::In)),
            _ => return None,
        };
        Some(op)
    }

    fn binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut left = self.unary()?;
        while let Some((prec, op)) = self.operator() {
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = match op {
                Operator::Binary(BinaryOp::Pow) => self.binary(prec)?,
                _ => self.binary(prec + 1)?,
            };
            left = match op {
                Operator::Binary(op) => Expr::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                Operator::Logical(op) => Expr::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> PResult<Expr> {
        let op = match &self.peek().kind {
            TokenKind::Punct("!") => Some(UnaryOp::Not),
            TokenKind::Punct("-") => Some(UnaryOp::Neg),
            TokenKind::Punct("+") => Some(UnaryOp::Plus),
            TokenKind::Word(w) if w == "typeof" => Some(UnaryOp::Typeof),
            TokenKind::Word(w) if w == "void" => Some(UnaryOp::Void),
            TokenKind::Word(w) if w == "delete" => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        if self.eat_word("await") {
            return Ok(Expr::Await(Box::new(self.unary()?)));
        }
        if self.is_punct("++") || self.is_punct("--") {
            let increment = self.is_punct("++");
            self.advance();
            let target = self.unary()?;
            return Ok(Expr::Update {
                increment,
                prefix: true,
                target: Box::new(target),
            });
        }

        let expr = self.call_member()?;
        if (self.is_punct("++") || self.is_punct("--")) && !self.peek().newline_before {
            let increment = self.is_punct("++");
            self.advance();
            return Ok(Expr::Update {
                increment,
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn arguments(&mut self) -> PResult<Vec<Element>> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            if self.eat_punct("...") {
                args.push(Element::Spread(self.assignment()?));
            } else {
                args.push(Element::Item(self.assignment()?));
            }
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn call_member(&mut self) -> PResult<Expr> {
        let mut expr = if self.is_word("new") {
            self.new_expression()?
        } else {
            self.primary()?
        };
        loop {
            if self.eat_punct(".") {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                };
            } else if self.eat_punct("?.") {
                if self.is_punct("(") {
                    let args = self.arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: true,
                    };
                } else if self.eat_punct("[") {
                    let index = self.expression()?;
                    self.expect_punct("]")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: true,
                    };
                } else {
                    let property = self.property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: true,
                    };
                }
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional: false,
                };
            } else if self.is_punct("(") {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    optional: false,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn new_expression(&mut self) -> PResult<Expr> {
        self.advance();
        let mut callee = self.primary()?;
        loop {
            if self.eat_punct(".") {
                let property = self.property_name()?;
                callee = Expr::Member {
                    object: Box::new(callee),
                    property,
                    optional: false,
                };
            } else if self.eat_punct("[") {
                let index = self.expression()?;
                self.expect_punct("]")?;
                callee = Expr::Index {
                    object: Box::new(callee),
                    index: Box::new(index),
                    optional: false,
                };
            } else {
                break;
            }
        }
        let args = if self.is_punct("(") { self.arguments()? } else { Vec::new() };
        Ok(Expr::New {
            callee: Box::new(callee),
            args,
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expr::Number(n))
            }
            TokenKind::Str(s) => {
                self.advance();
                Ok(Expr::Str(s))
            }
            TokenKind::Template(chunks) => {
                self.advance();
                let mut parts = Vec::with_capacity(chunks.len());
                for chunk in chunks {
                    match chunk {
                        TemplateChunk::Text(text) => parts.push(TemplatePart::Text(text)),
                        TemplateChunk::Expr { source, line, column } => {
                            let tokens = Lexer::at(&source, line, column).tokenize()?;
                            let mut inner = Parser::new(tokens);
                            let expr = inner.expression()?;
                            if !inner.at_eof() {
                                return Err(inner.unexpected());
                            }
                            parts.push(TemplatePart::Expr(expr));
                        }
                    }
                }
                Ok(Expr::Template(parts))
            }
            TokenKind::Punct("(") => {
                self.advance();
                let expr = self.expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            TokenKind::Punct("[") => self.array_literal(),
            TokenKind::Punct("{") => self.object_literal(),
            TokenKind::Word(ref w) => match w.as_str() {
                "true" => {
                    self.advance();
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.advance();
                    Ok(Expr::Bool(false))
                }
                "null" => {
                    self.advance();
                    Ok(Expr::Null)
                }
                "undefined" => {
                    self.advance();
                    Ok(Expr::Undefined)
                }
                "function" => {
                    self.advance();
                    Ok(Expr::Function(self.function_rest(false, false)?))
                }
                "async" if matches!(self.kind_at(1), TokenKind::Word(w) if w == "function") => {
                    self.advance();
                    self.advance();
                    Ok(Expr::Function(self.function_rest(true, false)?))
                }
                "class" => Err(self.error("Classes are not supported")),
                _ => Ok(Expr::Ident(self.identifier()?)),
            },
            _ => Err(self.unexpected()),
        }
    }

    fn array_literal(&mut self) -> PResult<Expr> {
        self.expect_punct("[")?;
        let mut elements = Vec::new();
        while !self.eat_punct("]") {
            if self.is_punct(",") {
                self.advance();
                elements.push(Element::Item(Expr::Undefined));
                continue;
            }
            if self.eat_punct("...") {
                elements.push(Element::Spread(self.assignment()?));
            } else {
                elements.push(Element::Item(self.assignment()?));
            }
            if !self.eat_punct(",") {
                self.expect_punct("]")?;
                break;
            }
        }
        Ok(Expr::Array(elements))
    }

    fn object_literal(&mut self) -> PResult<Expr> {
        self.expect_punct("{")?;
        let mut properties = Vec::new();
        while !self.eat_punct("}") {
            if self.eat_punct("...") {
                properties.push(ObjectProperty::Spread(self.assignment()?));
            } else {
                properties.push(self.object_property()?);
            }
            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                break;
            }
        }
        Ok(Expr::Object(properties))
    }

    fn object_property(&mut self) -> PResult<ObjectProperty> {
        // `async name() {}`
        let is_async = self.is_word("async")
            && !matches!(self.kind_at(1), TokenKind::Punct(":") | TokenKind::Punct(",") | TokenKind::Punct("}") | TokenKind::Punct("("));
        if is_async {
            self.advance();
        }

        let token = self.peek().clone();
        let (key, shorthand) = match token.kind {
            TokenKind::Word(w) => {
                self.advance();
                (PropertyKey::Static(w.clone()), Some(w))
            }
            TokenKind::Str(s) => {
                self.advance();
                (PropertyKey::Static(s), None)
            }
            TokenKind::Number(n) => {
                self.advance();
                (PropertyKey::Static(format_number_key(n)), None)
            }
            TokenKind::Punct("[") => {
                self.advance();
                let expr = self.assignment()?;
                self.expect_punct("]")?;
                (PropertyKey::Computed(expr), None)
            }
            _ => return Err(self.unexpected()),
        };

        if self.eat_punct(":") {
            return Ok(ObjectProperty::KeyValue(key, self.assignment()?));
        }
        if self.is_punct("(") {
            let params = self.params()?;
            let body = FunctionBody::Block(self.block()?);
            let name = match &key {
                PropertyKey::Static(name) => Some(name.clone()),
                PropertyKey::Computed(_) => None,
            };
            let def = FunctionDef {
                name,
                params,
                body,
                is_arrow: false,
                is_async,
            };
            return Ok(ObjectProperty::KeyValue(key, Expr::Function(Rc::new(def))));
        }
        match shorthand {
            Some(name) if !RESERVED.contains(&name.as_str()) => {
                Ok(ObjectProperty::KeyValue(key, Expr::Ident(name)))
            }
            _ => Err(self.unexpected()),
        }
    }
}

fn format_number_key(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number {}", n),
        TokenKind::Str(_) => "string".to_string(),
        TokenKind::Template(_) => "template literal".to_string(),
        TokenKind::Word(w) => format!("'{}'", w),
        TokenKind::Punct(p) => format!("'{}'", p),
        TokenKind::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_wrapped_test() {
        let program = parse_program(
            "test('login', async ({ page }) => {\n  await page.goto('/x');\n  await page.getByLabel('Username').fill('u')\n});",
        )
        .unwrap();
        assert_eq!(program.len(), 1);
        match &program[0] {
            Stmt::Expr(Expr::Call { args, .. }) => {
                assert_eq!(args.len(), 2);
                match &args[1] {
                    Element::Item(Expr::Function(def)) => {
                        assert!(def.is_async && def.is_arrow);
                        assert!(matches!(def.params[0].pattern, Pattern::Object { .. }));
                    }
                    other => panic!("unexpected argument {:?}", other),
                }
            }
            other => panic!("unexpected statement {:?}", other),
        }
    }

    #[test]
    fn test_semicolons_are_optional() {
        let program = parse_program("const a = 1\nlet b = a + 2\nb").unwrap();
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn test_single_param_arrow_and_method_chain() {
        let program = parse_program(
            "await page.route('**/api/data', route => route.fulfill({ status: 500, body: JSON.stringify({ error: 'x' }) }));",
        )
        .unwrap();
        assert!(matches!(&program[0], Stmt::Expr(Expr::Await(_))));
    }

    #[test]
    fn test_export_and_control_flow() {
        let source = r#"
export const setup = () => { cy.intercept('GET', '**/a', { body: {} }).as('a'); };
export default defineConfig({ use: { trace: 'on' } });
for (const item of [1, 2]) { if (item > 1) break; else continue; }
try { throw new Error('x') } catch (e) { e.message } finally { done = true }
"#;
        let program = parse_program(source).unwrap();
        assert_eq!(program.len(), 4);
    }

    #[test]
    fn test_conditional_vs_optional_chain() {
        let program = parse_program("const v = a?.b ?? (c ? 1 : 2)").unwrap();
        assert_eq!(program.len(), 1);
    }

    #[test]
    fn test_reports_line_and_column() {
        let err = parse_program("const a = 1;\nconst b = ;").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 11);
        assert!(err.message.contains("';'"));
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse_program("test('x', () => {\n  cy.visit('/')\n").unwrap_err();
        assert!(err.message.contains("end of input"));
    }
}
