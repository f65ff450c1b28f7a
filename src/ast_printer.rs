//! Parenthesized AST dump, used by the `parse` CLI phase and by parser
//! tests to assert on tree shapes (desugaring included).

use crate::expr::{Expr, Literal};
use crate::stmt::{FunctionDecl, Stmt};

pub struct AstPrinter;

impl AstPrinter {
    pub fn print_program(&self, statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(|stmt| self.print_stmt(stmt))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print_stmt(&self, stmt: &Stmt) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("(; {})", self.print_expr(expr)),

            Stmt::Print(expr) => format!("(print {})", self.print_expr(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => format!("(var {} {})", name.lexeme, self.print_expr(expr)),
                None => format!("(var {})", name.lexeme),
            },

            Stmt::Function(declaration) => self.print_function("fun", declaration),

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut out = format!("(class {}", name.lexeme);
                if let Some(superclass) = superclass {
                    out.push_str(&format!(" (< {})", self.print_expr(superclass)));
                }
                for method in methods {
                    out.push(' ');
                    out.push_str(&self.print_function("method", method));
                }
                out.push(')');
                out
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print_expr(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print_expr(condition),
                    self.print_stmt(then_branch)
                ),
            },

            Stmt::While { condition, body } => format!(
                "(while {} {})",
                self.print_expr(condition),
                self.print_stmt(body)
            ),

            Stmt::Block(statements) => {
                let mut out = String::from("(block");
                for statement in statements {
                    out.push(' ');
                    out.push_str(&self.print_stmt(statement));
                }
                out.push(')');
                out
            }

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("(return {})", self.print_expr(expr)),
                None => "(return)".to_string(),
            },

            Stmt::Break { .. } => "(break)".to_string(),
        }
    }

    pub fn print_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(Literal::Number(n)) => format!("{}", n),
            Expr::Literal(Literal::String(s)) => s.clone(),
            Expr::Literal(Literal::Bool(b)) => format!("{}", b),
            Expr::Literal(Literal::Nil) => "nil".to_string(),

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "({} {} {})",
                operator.lexeme,
                self.print_expr(left),
                self.print_expr(right)
            ),

            Expr::Unary { operator, right } => {
                format!("({} {})", operator.lexeme, self.print_expr(right))
            }

            Expr::Grouping(inner) => format!("(group {})", self.print_expr(inner)),

            Expr::Variable { name, .. } => name.lexeme.clone(),

            Expr::Assign { name, value, .. } => {
                format!("(= {} {})", name.lexeme, self.print_expr(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let mut out = format!("(call {}", self.print_expr(callee));
                for argument in arguments {
                    out.push(' ');
                    out.push_str(&self.print_expr(argument));
                }
                out.push(')');
                out
            }

            Expr::Get { object, name } => {
                format!("(. {} {})", self.print_expr(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(=. {} {} {})",
                self.print_expr(object),
                name.lexeme,
                self.print_expr(value)
            ),

            Expr::This { .. } => "this".to_string(),

            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }

    fn print_function(&self, kind: &str, declaration: &FunctionDecl) -> String {
        let params = declaration
            .params
            .iter()
            .map(|param| param.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let mut out = format!("({} {} ({})", kind, declaration.name.lexeme, params);
        for stmt in &declaration.body {
            out.push(' ');
            out.push_str(&self.print_stmt(stmt));
        }
        out.push(')');
        out
    }
}
