//! Tree-walking evaluator.
//!
//! `interpret` executes top-level statements in order against a globals
//! scope pre-seeded with the `clock` native.  Two distinct unwind categories
//! flow through execution as the `Err` side of [`IResult`]:
//!
//! - [`InterpretError::Return`] carries a function result up to the nearest
//!   call frame (caught in [`Callable::call`]) and skips the remaining
//!   statements of every intervening block on the way;
//! - [`InterpretError::Runtime`] propagates to the top of `interpret`, where
//!   it is converted into a [`LoxError`] diagnostic for the driver.  The
//!   host process never crashes on a script error, and output produced
//!   before the failure stays visible.
//!
//! Variable access consults the resolver's distance table (keyed on
//! expression-node identity); references with no entry fall back to the
//! globals scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

use crate::ast::{Expr, LiteralValue, Stmt};
use crate::callable::{self, Callable, LoxFunction};
use crate::environment::Environment;
use crate::error::LoxError;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Control-flow unwinding inside the evaluator.
#[derive(Debug, Error)]
pub enum InterpretError<'s> {
    /// Runtime failure; fatal for the current script.
    #[error("[line {line}] {message}")]
    Runtime { message: String, line: usize },

    /// Non-local `return`, caught only at call-frame boundaries.
    #[error("return {0}")]
    Return(Value<'s>),
}

impl<'s> InterpretError<'s> {
    fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        InterpretError::Runtime {
            message: msg.into(),
            line,
        }
    }
}

/// Convenient alias for evaluator results.
pub type IResult<'s, T> = Result<T, InterpretError<'s>>;

pub struct Interpreter<'s, W: Write = io::Stdout> {
    globals: Rc<RefCell<Environment<'s>>>,
    environment: Rc<RefCell<Environment<'s>>>,

    /// Resolver side table: expression-node identity to environment-hop
    /// distance.  Absence means global lookup.
    locals: HashMap<usize, usize>,

    /// Program output sink (stdout outside of tests).
    out: W,
}

impl<'s> Interpreter<'s> {
    /// Creates a new Interpreter printing to stdout, with native functions
    /// such as `clock` defined.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl<'s> Default for Interpreter<'s> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s, W: Write> Interpreter<'s, W> {
    /// Creates an Interpreter writing program output to `out`.
    pub fn with_output(out: W) -> Self {
        info!("Initializing Interpreter");

        let globals = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::Callable(Callable::Native {
                name: "clock",
                arity: 0,
                func: callable::clock,
            }),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
        }
    }

    /// Record that `expr` resolves to a local binding `depth` scopes up the
    /// chain.  Called back by the resolver during its pass.
    pub fn resolve(&mut self, expr: &Expr<'s>, depth: usize) {
        self.locals.insert(Self::expr_key(expr), depth);
    }

    pub(crate) fn resolved_depth(&self, expr: &Expr<'s>) -> Option<usize> {
        self.locals.get(&Self::expr_key(expr)).copied()
    }

    /// Node identity for the side table.  Valid because the program AST is
    /// never moved or mutated between resolution and interpretation.
    fn expr_key(expr: &Expr<'s>) -> usize {
        expr as *const Expr<'s> as usize
    }

    /// Interprets a list of statements (a "program").  The first runtime
    /// failure aborts the remaining statements and is returned as a
    /// diagnostic; it must be interpreted against the same AST storage that
    /// was resolved.
    pub fn interpret(&mut self, statements: &'s [Stmt<'s>]) -> Result<(), LoxError> {
        info!("Interpreting {} statements", statements.len());

        for statement in statements {
            match self.execute(statement) {
                Ok(()) => {}

                // The resolver rejects top-level `return`; a stray unwind
                // here simply ends the script.
                Err(InterpretError::Return(_)) => return Ok(()),

                Err(InterpretError::Runtime { message, line }) => {
                    debug!("Runtime error: [line {}] {}", line, message);

                    return Err(LoxError::runtime(line, message));
                }
            }
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    /// Executes a single statement.
    fn execute(&mut self, stmt: &'s Stmt<'s>) -> IResult<'s, ()> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                // println! semantics: an unwritable sink is unrecoverable
                writeln!(self.out, "{}", value).expect("failed to write program output");

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                debug!("Defining variable '{}'", name.lexeme);

                self.environment.borrow_mut().define(name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let scope = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &self.environment,
                ))));

                self.execute_block(statements, scope)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if is_truthy(&self.evaluate(condition)?) {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(())
                }
            }

            Stmt::While { condition, body } => {
                while is_truthy(&self.evaluate(condition)?) {
                    self.execute(body)?;
                }

                Ok(())
            }

            Stmt::Function { name, params, body } => {
                debug!("Defining function '{}'", name.lexeme);

                // The closure is the environment at *declaration* time.
                let function = LoxFunction {
                    name: name.lexeme,
                    params: params.as_slice(),
                    body: body.as_slice(),
                    closure: Rc::clone(&self.environment),
                };

                self.environment.borrow_mut().define(
                    name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Err(InterpretError::Return(value))
            }

            Stmt::Class { name, .. } => Err(InterpretError::runtime(
                name.line,
                "Classes are not supported yet.",
            )),
        }
    }

    /// Executes `statements` against `environment`, restoring the previous
    /// environment on every exit path: normal completion, return unwind, or
    /// runtime error.
    pub fn execute_block(
        &mut self,
        statements: &'s [Stmt<'s>],
        environment: Rc<RefCell<Environment<'s>>>,
    ) -> IResult<'s, ()> {
        let previous = std::mem::replace(&mut self.environment, environment);

        let result = statements
            .iter()
            .try_for_each(|statement| self.execute(statement));

        self.environment = previous;

        result
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &'s Expr<'s>) -> IResult<'s, Value<'s>> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

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

            Expr::Variable(name) => self.look_up_variable(name, expr),

            Expr::Assign { name, value } => {
                let value = self.evaluate(value)?;

                self.assign_variable(name, expr, value.clone())?;

                // an assignment is an expression; it yields the value
                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            // ── class extension point: no instances exist yet ────────────
            Expr::Get { object, name } => {
                self.evaluate(object)?;

                Err(InterpretError::runtime(
                    name.line,
                    "Only instances have properties.",
                ))
            }

            Expr::Set { object, name, .. } => {
                self.evaluate(object)?;

                Err(InterpretError::runtime(
                    name.line,
                    "Only instances have fields.",
                ))
            }

            Expr::This(keyword) => Err(InterpretError::runtime(
                keyword.line,
                "Can't use 'this' outside of a class.",
            )),

            Expr::Super { keyword, .. } => Err(InterpretError::runtime(
                keyword.line,
                "Can't use 'super' outside of a class.",
            )),
        }
    }

    /// Distance-aware variable read: a resolved local jumps the chain, an
    /// unresolved reference falls back to the globals scope.
    fn look_up_variable(&self, name: &'s Token<'s>, expr: &'s Expr<'s>) -> IResult<'s, Value<'s>> {
        match self.resolved_depth(expr) {
            Some(distance) => Ok(Environment::get_at(&self.environment, distance, name.lexeme)),

            None => self
                .globals
                .borrow()
                .get(name.lexeme)
                .map_err(|message| InterpretError::Runtime {
                    message,
                    line: name.line,
                }),
        }
    }

    /// Distance-aware variable write; same fallback as `look_up_variable`.
    fn assign_variable(
        &mut self,
        name: &'s Token<'s>,
        expr: &'s Expr<'s>,
        value: Value<'s>,
    ) -> IResult<'s, ()> {
        match self.resolved_depth(expr) {
            Some(distance) => {
                Environment::assign_at(&self.environment, distance, name.lexeme, value);

                Ok(())
            }

            None => self
                .globals
                .borrow_mut()
                .assign(name.lexeme, value)
                .map_err(|message| InterpretError::Runtime {
                    message,
                    line: name.line,
                }),
        }
    }

    fn evaluate_unary(
        &mut self,
        operator: &'s Token<'s>,
        right: &'s Expr<'s>,
    ) -> IResult<'s, Value<'s>> {
        let right = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => {
                let n = number_operand(operator, &right)?;

                Ok(Value::Number(-n))
            }

            TokenType::BANG => Ok(Value::Bool(!is_truthy(&right))),

            _ => Err(InterpretError::runtime(
                operator.line,
                "Invalid unary operator.",
            )),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &'s Expr<'s>,
        operator: &'s Token<'s>,
        right: &'s Expr<'s>,
    ) -> IResult<'s, Value<'s>> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;

        match operator.token_type {
            // '+' is overloaded: numeric addition or string concatenation
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),

                _ => Err(InterpretError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            },

            TokenType::MINUS => {
                let (a, b) = number_operands(operator, &left, &right)?;

                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = number_operands(operator, &left, &right)?;

                Ok(Value::Number(a * b))
            }

            // IEEE-754 semantics: division by zero yields ±inf or NaN, not
            // a language-level error
            TokenType::SLASH => {
                let (a, b) = number_operands(operator, &left, &right)?;

                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = number_operands(operator, &left, &right)?;

                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;

                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = number_operands(operator, &left, &right)?;

                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = number_operands(operator, &left, &right)?;

                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(is_equal(&left, &right))),

            TokenType::BANG_EQUAL => Ok(Value::Bool(!is_equal(&left, &right))),

            _ => Err(InterpretError::runtime(
                operator.line,
                "Invalid binary operator.",
            )),
        }
    }

    fn evaluate_logical(
        &mut self,
        left: &'s Expr<'s>,
        operator: &'s Token<'s>,
        right: &'s Expr<'s>,
    ) -> IResult<'s, Value<'s>> {
        let left = self.evaluate(left)?;

        // Short circuit hands back the operand itself, not a coerced bool.
        let short_circuits = match operator.token_type {
            TokenType::OR => is_truthy(&left),
            _ => !is_truthy(&left),
        };

        if short_circuits {
            Ok(left)
        } else {
            self.evaluate(right)
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &'s Expr<'s>,
        paren: &'s Token<'s>,
        arguments: &'s [Expr<'s>],
    ) -> IResult<'s, Value<'s>> {
        let callee = self.evaluate(callee)?;

        // arguments evaluate left to right, before the callee is checked
        let mut args: Vec<Value<'s>> = Vec::with_capacity(arguments.len());

        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        let Value::Callable(callable) = callee else {
            return Err(InterpretError::runtime(
                paren.line,
                "Can only call functions and classes.",
            ));
        };

        if args.len() != callable.arity() {
            return Err(InterpretError::runtime(
                paren.line,
                format!(
                    "Expected {} arguments but got {}.",
                    callable.arity(),
                    args.len()
                ),
            ));
        }

        callable.call(self, args, paren)
    }
}

fn literal_value<'s>(literal: &LiteralValue) -> Value<'s> {
    match literal {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::String(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

/// Nil and false are falsy; every other value is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Nil => false,
        Value::Bool(b) => *b,
        _ => true,
    }
}

/// Value equality on primitives; nil equals only nil; never raises.
fn is_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Nil, Value::Nil) => true,
        _ => false,
    }
}

/// Unary '-' requires a numeric operand; the *operator* token is reported.
fn number_operand<'s>(operator: &Token<'s>, operand: &Value<'s>) -> IResult<'s, f64> {
    match operand {
        Value::Number(n) => Ok(*n),

        _ => Err(InterpretError::runtime(
            operator.line,
            "Operand must be a number.",
        )),
    }
}

/// Numeric binary operators require two numbers; the *operator* token is
/// reported.
fn number_operands<'s>(
    operator: &Token<'s>,
    left: &Value<'s>,
    right: &Value<'s>,
) -> IResult<'s, (f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),

        _ => Err(InterpretError::runtime(
            operator.line,
            "Operands must be numbers.",
        )),
    }
}
