//! Tree-walking evaluator.
//!
//! Executes the statement list against the environment chain, consulting the
//! resolver's scope-distance table for every variable, `this`, and `super`
//! reference. The table is the only bridge between static scope and runtime
//! lookup: a reference with a recorded distance is read exactly that many
//! parent hops up; a reference with no entry is a global.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};

use crate::callable::{LoxClass, LoxFunction, LoxInstance};
use crate::environment::Environment;
use crate::error::{LoxError, RuntimeError};
use crate::expr::{Expr, ExprId, Literal};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Non-local exits threaded through the evaluation recursion. `Return` and
/// `Break` are ordinary control flow and must be caught at a call frame or
/// loop boundary; only `Failure` is a genuine error and may escape.
#[derive(Debug)]
pub enum Unwind {
    Return(Value),
    Break,
    Failure(LoxError),
}

impl From<LoxError> for Unwind {
    fn from(error: LoxError) -> Self {
        Unwind::Failure(error)
    }
}

impl From<RuntimeError> for Unwind {
    fn from(error: RuntimeError) -> Self {
        Unwind::Failure(LoxError::Runtime(error))
    }
}

impl From<io::Error> for Unwind {
    fn from(error: io::Error) -> Self {
        Unwind::Failure(LoxError::Io(error))
    }
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Scope-distance side-table, filled by the resolver before execution
    /// and read-only afterwards.
    locals: HashMap<ExprId, usize>,
    output: Rc<RefCell<dyn Write>>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Rc::new(RefCell::new(io::stdout())))
    }

    /// Interpreter writing `print` output to the given sink. Tests hand in
    /// a `Vec<u8>` to capture what a program printed.
    pub fn with_output(output: Rc<RefCell<dyn Write>>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        Interpreter {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            output,
        }
    }

    /// Record that the expression node `id` resolves `depth` environment
    /// hops away. Called by the resolver; nodes it never calls this for are
    /// globals.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local binding: id={}, depth={}", id, depth);
        self.locals.insert(id, depth);
    }

    /// Execute the program, halting at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        info!("Interpreting {} top-level statement(s)", statements.len());

        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}
                Err(Unwind::Failure(error)) => return Err(error),
                // The resolver rejects top-level `return` and stray `break`,
                // so an unwind reaching here means the caller skipped it.
                Err(Unwind::Return(_)) | Err(Unwind::Break) => {
                    return Err(LoxError::Runtime(RuntimeError::UnexpectedUnwind));
                }
            }
        }

        Ok(())
    }

    /// Run `statements` with `env` as the current environment, restoring the
    /// previous environment on every exit path, unwinds included.
    pub(crate) fn execute_in_env(
        &mut self,
        env: Rc<RefCell<Environment>>,
        statements: &[Stmt],
    ) -> Result<(), Unwind> {
        let previous = std::mem::replace(&mut self.environment, env);

        let mut result = Ok(());
        for statement in statements {
            result = self.execute(statement);
            if result.is_err() {
                break;
            }
        }

        self.environment = previous;
        result
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Unwind> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                writeln!(self.output.borrow_mut(), "{}", value)?;
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                self.define_or_fail(name, value)?;
            }

            Stmt::Function(declaration) => {
                let function = LoxFunction {
                    declaration: Rc::clone(declaration),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                };
                self.define_or_fail(&declaration.name, Value::Function(Rc::new(function)))?;
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                self.execute_class_decl(name, superclass.as_ref(), methods)?;
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body) {
                        Ok(()) => {}
                        Err(Unwind::Break) => break,
                        Err(other) => return Err(other),
                    }
                }
            }

            Stmt::Block(statements) => {
                let child = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));
                self.execute_in_env(child, statements)?;
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                return Err(Unwind::Return(value));
            }

            Stmt::Break { .. } => return Err(Unwind::Break),
        }

        Ok(())
    }

    fn execute_class_decl(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<(), Unwind> {
        let superclass = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    return Err(RuntimeError::SuperclassNotClass { line: name.line }.into());
                }
            },
            None => None,
        };

        // `super` is resolved by class identity, not per instance, so it is
        // bound once here in a shared environment wrapping every method
        // closure of a subclass.
        let method_closure = match &superclass {
            Some(parent) => {
                let env = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(parent)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let mut method_map = HashMap::new();
        for method in methods {
            let function = LoxFunction {
                declaration: Rc::clone(method),
                closure: Rc::clone(&method_closure),
                is_initializer: method.name.lexeme == "init",
            };
            method_map.insert(method.name.lexeme.clone(), Rc::new(function));
        }

        let class = LoxClass {
            name: name.lexeme.clone(),
            superclass,
            methods: method_map,
        };

        self.define_or_fail(name, Value::Class(Rc::new(class)))
    }

    fn define_or_fail(&mut self, name: &Token, value: Value) -> Result<(), Unwind> {
        if !self.environment.borrow_mut().define(&name.lexeme, value) {
            return Err(RuntimeError::AlreadyDeclared {
                name: name.lexeme.clone(),
                line: name.line,
            }
            .into());
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, Unwind> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::String(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => self.evaluate_logical(left, operator, right),

            Expr::Variable { name, id } => self.look_up(name, *id),

            Expr::Assign { name, value, id } => {
                let value = self.evaluate(value)?;

                let assigned = match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                    ),
                    None => self.globals.borrow_mut().assign(&name.lexeme, value.clone()),
                };

                if !assigned {
                    return Err(RuntimeError::UndefinedVariable {
                        name: name.lexeme.clone(),
                        line: name.line,
                    }
                    .into());
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => {
                let object = self.evaluate(object)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::NotAnInstance { line: name.line }.into());
                };

                LoxInstance::get(&instance, &name.lexeme).ok_or_else(|| {
                    RuntimeError::UndefinedProperty {
                        name: name.lexeme.clone(),
                        line: name.line,
                    }
                    .into()
                })
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;
                let Value::Instance(instance) = object else {
                    return Err(RuntimeError::NotAnInstance { line: name.line }.into());
                };

                let value = self.evaluate(value)?;
                instance.borrow_mut().set(&name.lexeme, value.clone());
                Ok(value)
            }

            Expr::This { keyword, id } => self.look_up(keyword, *id),

            Expr::Super {
                keyword,
                method,
                id,
            } => self.evaluate_super(keyword, method, *id),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value, Unwind> {
        let value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(RuntimeError::NumberOperand {
                    operator: operator.lexeme.clone(),
                    line: operator.line,
                }
                .into()),
            },

            TokenType::BANG => Ok(Value::Bool(!value.is_truthy())),

            // The parser only builds unary nodes for the two above.
            _ => Err(RuntimeError::NumberOperand {
                operator: operator.lexeme.clone(),
                line: operator.line,
            }
            .into()),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, Unwind> {
        // Strict left-to-right operand evaluation.
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        let number_operands = || RuntimeError::NumberOperands {
            operator: operator.lexeme.clone(),
            line: operator.line,
        };

        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(RuntimeError::AddOperands {
                    line: operator.line,
                }
                .into()),
            },

            TokenType::MINUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),
                _ => Err(number_operands().into()),
            },

            TokenType::STAR => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),
                _ => Err(number_operands().into()),
            },

            // Division by zero follows IEEE-754 (yields ±inf or NaN).
            TokenType::SLASH => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a / b)),
                _ => Err(number_operands().into()),
            },

            TokenType::GREATER => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),
                _ => Err(number_operands().into()),
            },

            TokenType::GREATER_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),
                _ => Err(number_operands().into()),
            },

            TokenType::LESS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),
                _ => Err(number_operands().into()),
            },

            TokenType::LESS_EQUAL => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),
                _ => Err(number_operands().into()),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left.equals(&right))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!left.equals(&right))),

            _ => Err(number_operands().into()),
        }
    }

    fn evaluate_logical(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, Unwind> {
        let left = self.evaluate(left)?;

        match operator.token_type {
            TokenType::AND => {
                if !left.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                self.evaluate(right)
            }

            // `or` preserves the left value when it is truthy.
            _ => {
                if left.is_truthy() {
                    return Ok(left);
                }
                self.evaluate(right)
            }
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> Result<Value, Unwind> {
        let callee = self.evaluate(callee)?;

        // Callability and arity are checked against the syntactic argument
        // list; a failing call evaluates none of its arguments.
        let arity = match &callee {
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            _ => {
                return Err(RuntimeError::NotCallable { line: paren.line }.into());
            }
        };

        if arity != arguments.len() {
            return Err(RuntimeError::ArityMismatch {
                expected: arity,
                got: arguments.len(),
                line: paren.line,
            }
            .into());
        }

        let mut argument_values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            argument_values.push(self.evaluate(argument)?);
        }

        match callee {
            Value::Function(function) => function.call(self, argument_values),
            Value::Class(class) => LoxClass::call(&class, self, argument_values),
            _ => Err(RuntimeError::NotCallable { line: paren.line }.into()),
        }
    }

    fn evaluate_super(
        &mut self,
        keyword: &Token,
        method: &Token,
        id: ExprId,
    ) -> Result<Value, Unwind> {
        let undefined = |name: &str, line: usize| RuntimeError::UndefinedVariable {
            name: name.to_string(),
            line,
        };

        let distance = *self
            .locals
            .get(&id)
            .ok_or_else(|| undefined("super", keyword.line))?;

        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Some(Value::Class(class)) => class,
            _ => return Err(undefined("super", keyword.line).into()),
        };

        // The resolver lays `this` out one scope nearer than `super`.
        let object = match Environment::get_at(&self.environment, distance - 1, "this") {
            Some(Value::Instance(instance)) => instance,
            _ => return Err(undefined("this", keyword.line).into()),
        };

        let resolved = superclass.find_method(&method.lexeme).ok_or_else(|| {
            RuntimeError::UndefinedProperty {
                name: method.lexeme.clone(),
                line: method.line,
            }
        })?;

        Ok(Value::Function(Rc::new(resolved.bind(&object))))
    }

    /// Variable lookup: walk the recorded distance, or fall back to globals
    /// when the resolver recorded nothing for this node.
    fn look_up(&self, name: &Token, id: ExprId) -> Result<Value, Unwind> {
        let found = match self.locals.get(&id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, &name.lexeme),
            None => self.globals.borrow().get(&name.lexeme),
        };

        found.ok_or_else(|| {
            RuntimeError::UndefinedVariable {
                name: name.lexeme.clone(),
                line: name.line,
            }
            .into()
        })
    }
}
