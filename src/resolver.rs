//! Static resolution pass.
//!
//! A single AST walk that:
//! 1. **Builds lexical scopes**: a stack of `HashMap<String, bool>` tracking
//!    declared (`false`) and fully defined (`true`) names per block or
//!    function.
//! 2. **Enforces static rules**: redeclaration in the same scope, reading a
//!    variable in its own initializer, `return` outside functions, valued
//!    `return` in initializers, `this`/`super` outside their contexts,
//!    `break` outside loops, and self-inheritance.
//! 3. **Records binding distances**: for every resolvable expression node it
//!    calls back into the interpreter with the number of environment hops to
//!    the binding. Names found in no scope are globals and get no entry.
//!
//! Runs after parsing, before interpretation:
//! ```ignore
//! let mut resolver = Resolver::new(&mut interpreter);
//! resolver.resolve(&statements)?;
//! ```

use std::collections::HashMap;

use log::{debug, info};

use crate::error::{LoxError, Result};
use crate::expr::{Expr, ExprId};
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

/// What kind of function body we are inside. Validates `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

/// What kind of class body we are inside. Validates `this` and `super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Resolver<'interp> {
    interpreter: &'interp mut Interpreter,
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
}

impl<'interp> Resolver<'interp> {
    pub fn new(interpreter: &'interp mut Interpreter) -> Self {
        info!("Resolver instantiated");
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
        }
    }

    /// Walk all top-level statements, halting on the first static error.
    pub fn resolve(&mut self, statements: &[Stmt]) -> Result<()> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );
        for stmt in statements {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                for s in statements {
                    self.resolve_stmt(s)?;
                }
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // Declared before the initializer resolves so a
                // self-reference inside it is caught.
                self.declare(name)?;
                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // Declared and defined up front so the function can recurse.
                self.declare(&declaration.name)?;
                self.define(&declaration.name);
                self.resolve_function(FunctionType::Function, declaration)?;
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.resolve_class(name, superclass.as_ref(), methods)?;
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.loop_depth += 1;
                let result = self.resolve_stmt(body);
                self.loop_depth -= 1;
                result?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "'return' used outside of a function",
                    ));
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        return Err(LoxError::resolve(
                            keyword.line,
                            "cannot return a value from an initializer",
                        ));
                    }
                    self.resolve_expr(expr)?;
                }
            }

            Stmt::Break { keyword } => {
                if self.loop_depth == 0 {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "'break' used outside of a loop",
                    ));
                }
            }
        }

        Ok(())
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<FunctionDecl>],
    ) -> Result<()> {
        if let Some(Expr::Variable {
            name: super_name, ..
        }) = superclass
        {
            if super_name.lexeme == name.lexeme {
                return Err(LoxError::resolve(
                    super_name.line,
                    "a class cannot inherit from itself",
                ));
            }
        }

        self.declare(name)?;
        self.define(name);

        let enclosing_class = self.current_class;
        self.current_class = if superclass.is_some() {
            ClassType::Subclass
        } else {
            ClassType::Class
        };

        // A subclass gets a scope holding `super`, mirroring the shared
        // environment the evaluator wraps around its method closures.
        if let Some(expr) = superclass {
            self.resolve_expr(expr)?;
            self.begin_scope();
            self.define_name("super");
        }

        // All methods see `this` one scope out from their own frame.
        self.begin_scope();
        self.define_name("this");

        for method in methods {
            let kind = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            self.resolve_function(kind, method)?;
        }

        self.end_scope();
        if superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) -> Result<()> {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner)?;
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right)?;
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left)?;
                self.resolve_expr(right)?;
            }

            Expr::Variable { name, id } => {
                // Declared-but-undefined in the innermost scope means the
                // initializer is reading the variable it defines.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme) == Some(&false) {
                        return Err(LoxError::resolve(
                            name.line,
                            "variable referencing itself in its own initializer",
                        ));
                    }
                }
                self.resolve_local(*id, name);
            }

            Expr::Assign { name, value, id } => {
                self.resolve_expr(value)?;
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;
                for argument in arguments {
                    self.resolve_expr(argument)?;
                }
            }

            Expr::Get { object, .. } => {
                self.resolve_expr(object)?;
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object)?;
                self.resolve_expr(value)?;
            }

            Expr::This { keyword, id } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "cannot use 'this' outside of a class",
                    ));
                }
                self.resolve_local(*id, keyword);
            }

            Expr::Super { keyword, id, .. } => {
                if self.current_class == ClassType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "cannot use 'super' outside of a class",
                    ));
                }
                if self.current_class != ClassType::Subclass {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "cannot use 'super' in a class with no superclass",
                    ));
                }
                self.resolve_local(*id, keyword);
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────

    /// One fresh scope covers a function's parameters and body, matching the
    /// single environment a call frame gets at runtime.
    fn resolve_function(&mut self, kind: FunctionType, declaration: &FunctionDecl) -> Result<()> {
        let enclosing = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param)?;
            self.define(param);
        }

        // A loop in an enclosing function does not license `break` here.
        let enclosing_loop_depth = std::mem::replace(&mut self.loop_depth, 0);

        let mut result = Ok(());
        for stmt in &declaration.body {
            result = self.resolve_stmt(stmt);
            if result.is_err() {
                break;
            }
        }

        self.loop_depth = enclosing_loop_depth;
        self.end_scope();
        self.current_function = enclosing;

        result
    }

    // ─────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) -> Result<()> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                return Err(LoxError::resolve(
                    name.line,
                    format!("'{}' is already declared in this scope", name.lexeme),
                ));
            }
            scope.insert(name.lexeme.clone(), false);
        }
        Ok(())
    }

    fn define(&mut self, name: &Token) {
        self.define_name(&name.lexeme);
    }

    fn define_name(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at its hop distance, or leave it
    /// unrecorded (a global) when no scope holds the name.
    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.interpreter.resolve(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
