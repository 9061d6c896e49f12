//! Static resolver pass.
//!
//! One pre-order walk over the statement/expression tree does three things:
//! 1. Build lexical scopes (a stack of `HashMap<&str, bool>` tracking
//!    declared vs. defined names).
//! 2. Report static errors (redeclaration, reading a local in its own
//!    initializer, `return` outside a function, `this`/`super` outside a
//!    class).
//! 3. Record, for every variable occurrence that lands in a local scope,
//!    how many environments the interpreter must hop at runtime.  A
//!    reference not found in any scope is left unrecorded and resolves
//!    against globals.
//!
//! The distances are what keep closures honest: once a reference is bound
//! here, a later shadowing declaration can no longer change what it means.

use crate::ast::{Expr, Stmt};
use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;
use std::io::Write;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances by calling back into the interpreter.
pub struct Resolver<'s, 'i, W: Write> {
    interpreter: &'i mut Interpreter<'s, W>,
    scopes: Vec<HashMap<&'s str, bool>>, // false=declared, true=defined
    current_function: FunctionType,
}

impl<'s, 'i, W: Write> Resolver<'s, 'i, W> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'i mut Interpreter<'s, W>) -> Self {
        info!("Resolver instantiated");

        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
        }
    }

    /// Walk all top-level statements, collecting one diagnostic per failed
    /// statement so independent mistakes all surface in a single pass.
    pub fn resolve(&mut self, statements: &'s [Stmt<'s>]) -> Result<(), Vec<LoxError>> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        let mut errors: Vec<LoxError> = Vec::new();

        for statement in statements {
            if let Err(e) = self.resolve_stmt(statement) {
                debug!("Resolve error: {}", e);

                errors.push(e);

                // scopes may be unbalanced after an error; reset before the
                // next top-level statement
                self.scopes.clear();
                self.current_function = FunctionType::None;
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &'s Stmt<'s>) -> Result<(), LoxError> {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s)?;
                }

                self.end_scope();
            }

            // var declaration: declare, resolve initializer, then define,
            // so the initializer cannot read the name it is initializing
            Stmt::Var { name, initializer } => {
                self.declare(name)?;

                if let Some(expr) = initializer {
                    self.resolve_expr(expr)?;
                }

                self.define(name);
            }

            // a function's name is visible inside its own body (recursion)
            Stmt::Function { name, params, body } => {
                self.declare(name)?;
                self.define(name);

                self.resolve_function(params, body)?;
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

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb)?;
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition)?;
                self.resolve_stmt(body)?;
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    return Err(LoxError::resolve(
                        keyword.line,
                        "Can't return from top-level code.",
                    ));
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr)?;
                }
            }

            // extension point: the name binds and methods resolve like
            // functions, so completing classes later only touches binding
            // of 'this'/'super'
            Stmt::Class { name, methods } => {
                self.declare(name)?;
                self.define(name);

                for method in methods {
                    if let Stmt::Function { params, body, .. } = method {
                        self.resolve_function(params, body)?;
                    }
                }
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &'s Expr<'s>) -> Result<(), LoxError> {
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

            Expr::Variable(name) => {
                if let Some(scope) = self.scopes.last() {
                    if scope.get(name.lexeme) == Some(&false) {
                        return Err(LoxError::resolve(
                            name.line,
                            "Can't read local variable in its own initializer.",
                        ));
                    }
                }

                self.resolve_local(expr, name);
            }

            Expr::Assign { name, value } => {
                // resolve the RHS first, then bind the LHS occurrence
                self.resolve_expr(value)?;
                self.resolve_local(expr, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee)?;

                for argument in arguments {
                    self.resolve_expr(argument)?;
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object)?,

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_expr(object)?;
            }

            // no enclosing-class tracking exists yet, so any use is outside
            // a class
            Expr::This(keyword) => {
                return Err(LoxError::resolve(
                    keyword.line,
                    "Can't use 'this' outside of a class.",
                ));
            }

            Expr::Super { keyword, .. } => {
                return Err(LoxError::resolve(
                    keyword.line,
                    "Can't use 'super' outside of a class.",
                ));
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope seeded with the parameter names, then resolve the
    /// body inside it.  Shadowing an outer name with a parameter is legal.
    fn resolve_function(
        &mut self,
        params: &'s [&'s Token<'s>],
        body: &'s [Stmt<'s>],
    ) -> Result<(), LoxError> {
        let enclosing = self.current_function;
        self.current_function = FunctionType::Function;

        self.begin_scope();

        for param in params {
            self.declare(param)?;
            self.define(param);
        }

        for stmt in body {
            self.resolve_stmt(stmt)?;
        }

        self.end_scope();

        self.current_function = enclosing;

        Ok(())
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

    /// Add `name` to the innermost scope, marked not-yet-ready.  Globals
    /// (empty scope stack) may be redeclared freely.
    fn declare(&mut self, name: &'s Token<'s>) -> Result<(), LoxError> {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(name.lexeme) {
                return Err(LoxError::resolve(
                    name.line,
                    "Already a variable with this name in this scope.",
                ));
            }

            scope.insert(name.lexeme, false);
        }

        Ok(())
    }

    /// Mark `name` ready for use.
    fn define(&mut self, name: &'s Token<'s>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme, true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at the depth of the innermost scope
    /// containing `name`, or leave it for global lookup when no scope does.
    fn resolve_local(&mut self, expr: &'s Expr<'s>, name: &Token<'s>) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.resolve(expr, depth);

                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }
}
