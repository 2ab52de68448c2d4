// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! A direct evaluator for expressions and abstract code, used to check
//! that rendered code computes what its source did.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;

use crate::ast::{AssignOp, BinaryOp, BoolOp, Expr, Statement, UnaryOp};
use crate::builtins::default_functions;
use crate::common::{Error, ErrorCode, Result};
use crate::functions::AbstractCode;
use crate::parser::{parse, parse_code};
use crate::syntax_err;
use crate::token::LexerType;

const MAX_CALL_DEPTH: usize = 256;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Float(f64),
}

impl Value {
    /// booleans count as 0 and 1 in arithmetic
    pub fn as_f64(&self) -> f64 {
        match self {
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Float(n) => *n,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Float(n) => *n != 0.0,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Float(n) => write!(f, "{n}"),
        }
    }
}

pub type Scope = HashMap<String, Value>;

#[derive(Clone, Debug)]
enum Callable {
    Native {
        arity: Option<usize>,
        f: fn(&[f64]) -> f64,
    },
    Predicate {
        arity: usize,
        f: fn(&[f64]) -> bool,
    },
    Code(AbstractCode),
}

fn binary(op: BinaryOp, l: Value, r: Value) -> Value {
    let (l, r) = (l.as_f64(), r.as_f64());
    let n = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div => l / r,
        BinaryOp::Mod => l % r,
        BinaryOp::Pow => l.powf(r),
    };
    Value::Float(n)
}

fn bad_arg_count(func: &str, expected: usize, expr: &Expr, actual: usize) -> Error {
    Error::syntax(ErrorCode::BadArgCount, expr.get_loc()).with_details(format!(
        "'{func}' takes {expected} arguments, got {actual}"
    ))
}

/// Interpreter evaluates parsed expressions against a [`Scope`] of
/// variable values.
#[derive(Clone, Debug)]
pub struct Interpreter {
    functions: HashMap<String, Callable>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// an interpreter that knows the builtin functions and the helpers the
    /// array and C++ renderers emit.
    pub fn new() -> Self {
        let mut functions: HashMap<String, Callable> = default_functions()
            .into_iter()
            .filter_map(|(name, func)| {
                let f = func.implementation?;
                Some((
                    name,
                    Callable::Native {
                        arity: func.arity,
                        f,
                    },
                ))
            })
            .collect();

        functions.insert(
            "pow".to_owned(),
            Callable::Native {
                arity: Some(2),
                f: |a| a[0].powf(a[1]),
            },
        );
        functions.insert(
            "fmod".to_owned(),
            Callable::Native {
                arity: Some(2),
                f: |a| a[0] % a[1],
            },
        );
        functions.insert(
            "logical_not".to_owned(),
            Callable::Predicate {
                arity: 1,
                f: |a| a[0] == 0.0,
            },
        );

        Interpreter { functions }
    }

    /// make each function callable by name.  A later definition replaces
    /// an earlier one, builtins included.
    pub fn with_abstract_code<'a>(mut self, funcs: impl IntoIterator<Item = &'a AbstractCode>) -> Self {
        for ac in funcs {
            self.functions
                .insert(ac.name.clone(), Callable::Code(ac.clone()));
        }
        self
    }

    pub fn eval(&self, expr: &Expr, scope: &Scope) -> Result<Value> {
        self.eval_at(expr, scope, 0)
    }

    /// Run statements in order, updating `scope`.
    pub fn exec(&self, stmts: &[Statement], scope: &mut Scope) -> Result<()> {
        self.exec_at(stmts, scope, 0)
    }

    pub fn exec_code(&self, code: &str, scope: &mut Scope) -> Result<()> {
        let stmts = parse_code(code)?;
        self.exec(&stmts, scope)
    }

    pub fn eval_str(&self, expr: &str, scope: &Scope) -> Result<Value> {
        let expr = parse(expr, LexerType::Equation)?;
        self.eval(&expr, scope)
    }

    /// evaluate the output of one of the renderers, which may use `&&`,
    /// `&`, `!` and friends.
    pub fn eval_rendered(&self, expr: &str, scope: &Scope) -> Result<Value> {
        let expr = parse(expr, LexerType::Rendered)?;
        self.eval(&expr, scope)
    }

    fn exec_at(&self, stmts: &[Statement], scope: &mut Scope, depth: usize) -> Result<()> {
        for stmt in stmts.iter() {
            let value = self.eval_at(&stmt.value, scope, depth)?;
            let value = match stmt.op {
                AssignOp::Assign => value,
                AssignOp::Augmented(op) => match scope.get(&stmt.target) {
                    Some(old) => binary(op, *old, value),
                    None => {
                        return syntax_err!(
                            UnknownIdentifier,
                            format!("'{}' is updated before it is assigned", stmt.target)
                        );
                    }
                },
            };
            trace!(var = stmt.target.as_str(), %value, "assigned");
            scope.insert(stmt.target.clone(), value);
        }
        Ok(())
    }

    fn eval_at(&self, expr: &Expr, scope: &Scope, depth: usize) -> Result<Value> {
        let value = match expr {
            Expr::Const(_, n, _) => Value::Float(*n),
            Expr::Bool(b, _) => Value::Bool(*b),
            Expr::Var(id, loc) => match scope.get(id) {
                Some(value) => *value,
                None => {
                    return syntax_err!(UnknownIdentifier, *loc, format!("'{id}' has no value"));
                }
            },
            Expr::App(func, args, _) => {
                let args = args
                    .iter()
                    .map(|arg| self.eval_at(arg, scope, depth))
                    .collect::<Result<Vec<_>>>()?;
                self.call(func, expr, &args, scope, depth)?
            }
            Expr::Op1(op, r, _) => {
                let r = self.eval_at(r, scope, depth)?;
                match op {
                    UnaryOp::Positive => Value::Float(r.as_f64()),
                    UnaryOp::Negative => Value::Float(-r.as_f64()),
                    UnaryOp::Not => Value::Bool(!r.is_truthy()),
                }
            }
            Expr::Op2(op, l, r, _) => {
                let l = self.eval_at(l, scope, depth)?;
                let r = self.eval_at(r, scope, depth)?;
                binary(*op, l, r)
            }
            Expr::Compare(first, rest, _) => {
                let mut l = self.eval_at(first, scope, depth)?.as_f64();
                for (op, r) in rest.iter() {
                    let r = self.eval_at(r, scope, depth)?.as_f64();
                    if !op.apply(l, r) {
                        return Ok(Value::Bool(false));
                    }
                    l = r;
                }
                Value::Bool(true)
            }
            Expr::Logical(op, operands, _) => {
                let mut value = Value::Bool(matches!(op, BoolOp::And));
                for operand in operands.iter() {
                    value = self.eval_at(operand, scope, depth)?;
                    let decided = match op {
                        BoolOp::And => !value.is_truthy(),
                        BoolOp::Or => value.is_truthy(),
                    };
                    if decided {
                        break;
                    }
                }
                value
            }
        };
        Ok(value)
    }

    fn call(
        &self,
        func: &str,
        expr: &Expr,
        args: &[Value],
        scope: &Scope,
        depth: usize,
    ) -> Result<Value> {
        let Some(callable) = self.functions.get(func) else {
            return Err(Error::syntax(ErrorCode::UnknownFunction, expr.get_loc())
                .with_details(format!("unknown function '{func}'")));
        };
        let nums: Vec<f64> = args.iter().map(Value::as_f64).collect();

        match callable {
            Callable::Native { arity, f } => {
                if let Some(arity) = arity {
                    if *arity != args.len() {
                        return Err(bad_arg_count(func, *arity, expr, args.len()));
                    }
                }
                Ok(Value::Float(f(&nums)))
            }
            Callable::Predicate { arity, f } => {
                if *arity != args.len() {
                    return Err(bad_arg_count(func, *arity, expr, args.len()));
                }
                Ok(Value::Bool(f(&nums)))
            }
            Callable::Code(ac) => {
                if ac.args.len() != args.len() {
                    return Err(bad_arg_count(func, ac.args.len(), expr, args.len()));
                }
                if depth >= MAX_CALL_DEPTH {
                    return syntax_err!(
                        RecursiveInline,
                        expr.get_loc(),
                        format!("calls of '{func}' nest too deeply")
                    );
                }
                let Some(ref return_expr) = ac.return_expr else {
                    return syntax_err!(
                        NoReturnValue,
                        expr.get_loc(),
                        format!("'{func}' doesn't return a value")
                    );
                };

                // the body sees the caller's variables, but its own
                // assignments stay local
                let mut locals = scope.clone();
                for (param, arg) in ac.args.iter().zip(args.iter()) {
                    locals.insert(param.clone(), *arg);
                }
                self.exec_at(&ac.code, &mut locals, depth + 1)?;
                self.eval_at(return_expr, &locals, depth + 1)
            }
        }
    }
}
