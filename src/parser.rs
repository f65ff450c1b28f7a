//! Recursive-descent parser.
//!
//! Grammar (right-associative where noted):
//!
//! ```text
//! program    → declaration* EOF
//! declaration → classDecl | funDecl | varDecl | statement
//! classDecl  → "class" IDENT ( "<" IDENT )? "{" function* "}"
//! funDecl    → "fun" function
//! function   → IDENT "(" parameters? ")" block
//! varDecl    → "var" IDENT ( "=" expression )? ";"
//! statement  → exprStmt | printStmt | block | ifStmt | whileStmt
//!            | forStmt | returnStmt | breakStmt
//! expression → assignment
//! assignment → ( call "." )? IDENT "=" assignment | logicOr
//! logicOr    → logicAnd ( "or" logicAnd )*
//! logicAnd   → equality ( "and" equality )*
//! equality   → comparison (( "!=" | "==" ) comparison)*
//! comparison → term (( ">" | ">=" | "<" | "<=" ) term)*
//! term       → factor (( "-" | "+" ) factor)*
//! factor     → unary (( "/" | "*" ) unary)*
//! unary      → ( "!" | "-" ) unary | call
//! call       → primary ( "(" arguments? ")" | "." IDENT )*
//! primary    → NUMBER | STRING | "true" | "false" | "nil"
//!            | "(" expression ")" | IDENT | "this" | "super" "." IDENT
//! ```
//!
//! `for` loops are desugared here into an equivalent `while` form, so the
//! resolver and the evaluator never see a for-loop node.

use std::rc::Rc;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId, Literal};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};

/// Hard cap on call arguments and function parameters.
const MAX_ARGUMENTS: usize = 255;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: ExprId,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            current: 0,
            next_id: 0,
        }
    }

    /// Parse the whole token stream into a flat list of top-level statements.
    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        info!("Parsing {} token(s)", self.tokens.len());

        let mut statements = Vec::new();
        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        debug!("Parsed {} top-level statement(s)", statements.len());
        Ok(statements)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Declarations
    // ─────────────────────────────────────────────────────────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        if self.match_tokens(&[TokenType::VAR]) {
            return self.var_declaration();
        }
        if self.match_tokens(&[TokenType::FUN]) {
            return Ok(Stmt::Function(Rc::new(self.function("function")?)));
        }
        if self.match_tokens(&[TokenType::CLASS]) {
            return self.class_declaration();
        }
        self.statement()
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenType::IDENTIFIER, "expected variable name")?;

        let initializer = if self.match_tokens(&[TokenType::EQUAL]) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            &TokenType::SEMICOLON,
            "expected ';' after variable declaration",
        )?;

        Ok(Stmt::Var { name, initializer })
    }

    fn function(&mut self, kind: &str) -> Result<FunctionDecl> {
        let name = self.consume(&TokenType::IDENTIFIER, &format!("expected {kind} name"))?;

        self.consume(
            &TokenType::LEFT_PAREN,
            &format!("expected '(' after {kind} name"),
        )?;

        let mut params = Vec::new();
        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    return Err(self.error(&format!(
                        "{kind} cannot have more than {MAX_ARGUMENTS} parameters"
                    )));
                }
                params.push(self.consume(&TokenType::IDENTIFIER, "expected parameter name")?);
                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }
        self.consume(&TokenType::RIGHT_PAREN, "expected ')' after parameters")?;

        self.consume(
            &TokenType::LEFT_BRACE,
            &format!("expected '{{' before {kind} body"),
        )?;
        let body = self.block_statements()?;

        Ok(FunctionDecl { name, params, body })
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = self.consume(&TokenType::IDENTIFIER, "expected class name")?;

        // The superclass name is wrapped in a variable expression so the
        // resolver and evaluator treat it like any other reference.
        let superclass = if self.match_tokens(&[TokenType::LESS]) {
            let super_name = self.consume(&TokenType::IDENTIFIER, "expected superclass name")?;
            Some(Expr::Variable {
                name: super_name,
                id: self.fresh_id(),
            })
        } else {
            None
        };

        self.consume(&TokenType::LEFT_BRACE, "expected '{' before class body")?;

        let mut methods = Vec::new();
        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            methods.push(Rc::new(self.function("method")?));
        }

        self.consume(&TokenType::RIGHT_BRACE, "expected '}' after class body")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_tokens(&[TokenType::PRINT]) {
            return self.print_statement();
        }
        if self.match_tokens(&[TokenType::LEFT_BRACE]) {
            return Ok(Stmt::Block(self.block_statements()?));
        }
        if self.match_tokens(&[TokenType::IF]) {
            return self.if_statement();
        }
        if self.match_tokens(&[TokenType::WHILE]) {
            return self.while_statement();
        }
        if self.match_tokens(&[TokenType::FOR]) {
            return self.for_statement();
        }
        if self.match_tokens(&[TokenType::RETURN]) {
            return self.return_statement();
        }
        if self.match_tokens(&[TokenType::BREAK]) {
            return self.break_statement();
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let value = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "expected ';' after value")?;
        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.consume(&TokenType::SEMICOLON, "expected ';' after expression")?;
        Ok(Stmt::Expression(expr))
    }

    /// Parses the statements of a block whose opening `{` is already consumed.
    fn block_statements(&mut self) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(&TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        self.consume(&TokenType::RIGHT_BRACE, "expected '}' after block")?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "expected ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);

        // An `else` always binds to the nearest unmatched `if`.
        let else_branch = if self.match_tokens(&[TokenType::ELSE]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(&TokenType::RIGHT_PAREN, "expected ')' after while condition")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    /// A for loop is syntactic sugar:
    ///
    /// ```text
    /// for (init; cond; inc) body  →  { init; while (cond) { body; inc; } }
    /// ```
    ///
    /// An omitted condition becomes the literal `true`; with no initializer
    /// the outer block is not emitted.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.consume(&TokenType::LEFT_PAREN, "expected '(' after 'for'")?;

        let initializer = if self.match_tokens(&[TokenType::SEMICOLON]) {
            None
        } else if self.match_tokens(&[TokenType::VAR]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::SEMICOLON, "expected ';' after loop condition")?;

        let increment = if !self.check(&TokenType::RIGHT_PAREN) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(&TokenType::RIGHT_PAREN, "expected ')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or(Expr::Literal(Literal::Bool(true)));
        let while_stmt = Stmt::While {
            condition,
            body: Box::new(body),
        };

        Ok(match initializer {
            Some(initializer) => Stmt::Block(vec![initializer, while_stmt]),
            None => while_stmt,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();

        let value = if !self.check(&TokenType::SEMICOLON) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(&TokenType::SEMICOLON, "expected ';' after return")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword = self.previous().clone();
        self.consume(&TokenType::SEMICOLON, "expected ';' after 'break'")?;
        Ok(Stmt::Break { keyword })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    /// The left-hand side is parsed as an ordinary expression first; if an
    /// `=` follows it must turn out to be a variable or a property access,
    /// anything else is an invalid assignment target.
    fn assignment(&mut self) -> Result<Expr> {
        let expr = self.logic_or()?;

        if self.match_tokens(&[TokenType::EQUAL]) {
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr::Variable { name, .. } => Ok(Expr::Assign {
                    name,
                    value,
                    id: self.fresh_id(),
                }),
                Expr::Get { object, name } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                }),
                _ => Err(self.error("invalid assignment target")),
            };
        }

        Ok(expr)
    }

    fn logic_or(&mut self) -> Result<Expr> {
        let mut expr = self.logic_and()?;

        while self.match_tokens(&[TokenType::OR]) {
            let operator = self.previous().clone();
            let right = self.logic_and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn logic_and(&mut self) -> Result<Expr> {
        let mut expr = self.equality()?;

        while self.match_tokens(&[TokenType::AND]) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expr = self.comparison()?;

        while self.match_tokens(&[TokenType::BANG_EQUAL, TokenType::EQUAL_EQUAL]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expr = self.term()?;

        while self.match_tokens(&[
            TokenType::GREATER,
            TokenType::GREATER_EQUAL,
            TokenType::LESS,
            TokenType::LESS_EQUAL,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expr = self.factor()?;

        while self.match_tokens(&[TokenType::MINUS, TokenType::PLUS]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expr = self.unary()?;

        while self.match_tokens(&[TokenType::SLASH, TokenType::STAR]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::BANG, TokenType::MINUS]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                operator,
                right: Box::new(right),
            });
        }

        self.call()
    }

    /// Left-fold over `(args)` and `.name` suffixes so chains like
    /// `a.b(c).d` parse naturally.
    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_tokens(&[TokenType::LEFT_PAREN]) {
                expr = self.finish_call(expr)?;
            } else if self.match_tokens(&[TokenType::DOT]) {
                let name =
                    self.consume(&TokenType::IDENTIFIER, "expected property name after '.'")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut arguments = Vec::new();

        if !self.check(&TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(self.error(&format!(
                        "call cannot have more than {MAX_ARGUMENTS} arguments"
                    )));
                }
                arguments.push(self.expression()?);
                if !self.match_tokens(&[TokenType::COMMA]) {
                    break;
                }
            }
        }

        let paren = self.consume(&TokenType::RIGHT_PAREN, "expected ')' after arguments")?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.match_tokens(&[TokenType::FALSE]) {
            return Ok(Expr::Literal(Literal::Bool(false)));
        }
        if self.match_tokens(&[TokenType::TRUE]) {
            return Ok(Expr::Literal(Literal::Bool(true)));
        }
        if self.match_tokens(&[TokenType::NIL]) {
            return Ok(Expr::Literal(Literal::Nil));
        }

        if self.match_tokens(&[TokenType::NUMBER(0.0)]) {
            if let TokenType::NUMBER(n) = &self.previous().token_type {
                return Ok(Expr::Literal(Literal::Number(*n)));
            }
        }
        if self.match_tokens(&[TokenType::STRING(String::new())]) {
            if let TokenType::STRING(s) = &self.previous().token_type {
                return Ok(Expr::Literal(Literal::String(s.clone())));
            }
        }

        if self.match_tokens(&[TokenType::LEFT_PAREN]) {
            let expr = self.expression()?;
            self.consume(&TokenType::RIGHT_PAREN, "expected ')' after expression")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        if self.match_tokens(&[TokenType::IDENTIFIER]) {
            return Ok(Expr::Variable {
                name: self.previous().clone(),
                id: self.fresh_id(),
            });
        }

        if self.match_tokens(&[TokenType::THIS]) {
            return Ok(Expr::This {
                keyword: self.previous().clone(),
                id: self.fresh_id(),
            });
        }

        if self.match_tokens(&[TokenType::SUPER]) {
            let keyword = self.previous().clone();
            self.consume(&TokenType::DOT, "expected '.' after 'super'")?;
            let method =
                self.consume(&TokenType::IDENTIFIER, "expected superclass method name")?;
            return Ok(Expr::Super {
                keyword,
                method,
                id: self.fresh_id(),
            });
        }

        Err(self.error("expected expression"))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Token machinery
    // ─────────────────────────────────────────────────────────────────────

    fn match_tokens(&mut self, types: &[TokenType]) -> bool {
        for token_type in types {
            if self.check(token_type) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, token_type: &TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }
        &self.peek().token_type == token_type
    }

    fn consume(&mut self, token_type: &TokenType, message: &str) -> Result<Token> {
        if self.check(token_type) {
            self.advance();
            return Ok(self.previous().clone());
        }
        Err(self.error(message))
    }

    fn advance(&mut self) {
        if self.current < self.tokens.len() {
            self.current += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        // The scanner guarantees a trailing EOF, so clamp onto it.
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn fresh_id(&mut self) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Build a parse error showing a window of surrounding token lexemes
    /// with a caret line marking the offending token.
    fn error(&self, reason: &str) -> LoxError {
        let at = self.current.min(self.tokens.len().saturating_sub(1));
        let line = self.tokens.get(at).map_or(1, |t| t.line);

        let lo = at.saturating_sub(10);
        let hi = (at + 5).min(self.tokens.len().saturating_sub(1));

        let mut context = String::new();
        let mut marker = String::new();
        for (i, token) in self.tokens[lo..=hi].iter().enumerate() {
            let lexeme = &token.lexeme;
            context.push_str(lexeme);
            context.push(' ');
            for j in 0..lexeme.len() {
                if lo + i == at && j <= lexeme.len() / 2 {
                    marker.push('^');
                } else {
                    marker.push(' ');
                }
            }
            marker.push(' ');
        }

        LoxError::parse(line, format!("{reason}\n{context}\n{marker}"))
    }
}
