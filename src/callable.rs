//! The callable capability shared by user-defined and native functions.
//!
//! The two variants form a closed set behind one enum: the interpreter only
//! ever asks for `arity()` and `call(...)`.  User functions own a reference
//! to their declaration AST plus the environment captured at declaration
//! time; natives are plain function pointers registered during interpreter
//! bootstrap.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::ast::Stmt;
use crate::environment::Environment;
use crate::interpreter::{IResult, InterpretError, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// Host-provided function signature.
pub type NativeFn<'s> = fn(&[Value<'s>]) -> Result<Value<'s>, String>;

/// A user-defined function bundled with the environment that was active at
/// its declaration.
pub struct LoxFunction<'s> {
    pub name: &'s str,
    pub params: &'s [&'s Token<'s>],
    pub body: &'s [Stmt<'s>],
    pub closure: Rc<RefCell<Environment<'s>>>,
}

#[derive(Clone)]
pub enum Callable<'s> {
    /// User function: declaration AST plus closure environment.
    Function(Rc<LoxFunction<'s>>),

    /// Host-provided function (the `clock` builtin).
    Native {
        name: &'static str,
        arity: usize,
        func: NativeFn<'s>,
    },
}

impl<'s> Callable<'s> {
    pub fn arity(&self) -> usize {
        match self {
            Callable::Function(function) => function.params.len(),
            Callable::Native { arity, .. } => *arity,
        }
    }

    /// Invoke with already-evaluated arguments.  The caller has checked the
    /// arity; `paren` locates failures raised by natives.
    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<'s, W>,
        arguments: Vec<Value<'s>>,
        paren: &Token<'s>,
    ) -> IResult<'s, Value<'s>> {
        match self {
            Callable::Native { name, func, .. } => {
                debug!("Calling native function '{}'", name);

                func(&arguments).map_err(|message| InterpretError::Runtime {
                    message,
                    line: paren.line,
                })
            }

            Callable::Function(function) => {
                debug!("Calling user function '{}'", function.name);

                // A fresh call-frame scope chained to the *closure*, not to
                // the caller's environment.
                let environment = Rc::new(RefCell::new(Environment::with_enclosing(Rc::clone(
                    &function.closure,
                ))));

                for (param, argument) in function.params.iter().zip(arguments) {
                    environment.borrow_mut().define(param.lexeme, argument);
                }

                match interpreter.execute_block(function.body, environment) {
                    // The return unwind stops at this call frame and becomes
                    // the call's result.
                    Err(InterpretError::Return(value)) => Ok(value),

                    Err(other) => Err(other),

                    // Falling off the end of the body yields nil.
                    Ok(()) => Ok(Value::Nil),
                }
            }
        }
    }
}

impl fmt::Display for Callable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) => write!(f, "<fn {}>", function.name),
            Callable::Native { .. } => write!(f, "<native fn>"),
        }
    }
}

impl fmt::Debug for Callable<'_> {
    // closure environments can point back at this value; never recurse
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Function(function) => write!(f, "Function(<fn {}>)", function.name),
            Callable::Native { name, .. } => write!(f, "Native({})", name),
        }
    }
}

/// The single builtin: seconds since the Unix epoch as a Number.
pub fn clock<'s>(_arguments: &[Value<'s>]) -> Result<Value<'s>, String> {
    let seconds: f64 = Utc::now().timestamp_micros() as f64 / 1_000_000.0;

    Ok(Value::Number(seconds))
}
