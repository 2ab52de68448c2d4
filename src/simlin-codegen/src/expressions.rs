// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Static analyses of a single expression against an [`Environment`]:
//! its physical unit, whether it is boolean, and its value when it only
//! refers to constants.

use crate::ast::{BinaryOp, Expr, UnaryOp, Visitor};
use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::parser::parse_expr;
use crate::units::Dimension;
use crate::variable::Environment;
use crate::{syntax_err, unit_err};

fn unknown_identifier(id: &str, expr: &Expr) -> Error {
    Error::syntax(ErrorCode::UnknownIdentifier, expr.get_loc())
        .with_details(format!("unknown identifier '{id}'"))
}

fn unknown_function(func: &str, expr: &Expr) -> Error {
    Error::syntax(ErrorCode::UnknownFunction, expr.get_loc())
        .with_details(format!("unknown function '{func}'"))
}

struct UnitEvaluator<'a> {
    env: &'a Environment,
}

impl UnitEvaluator<'_> {
    fn exponent(&mut self, base: Dimension, exp: &Expr) -> Result<Dimension> {
        let exp_unit = self.walk(exp)?;
        if base.is_dimensionless() && exp_unit.is_dimensionless() {
            return Ok(Dimension::DIMENSIONLESS);
        }
        if !exp_unit.is_dimensionless() {
            return syntax_err!(
                DimensionedExponent,
                exp.get_loc(),
                format!("exponent has unit {exp_unit}")
            );
        }
        let value = value_from_expression(exp, self.env).map_err(|err| {
            let code = match err.code {
                ErrorCode::NotConstant => ErrorCode::NonConstantExponent,
                ErrorCode::NotScalar => ErrorCode::NonScalarExponent,
                code => code,
            };
            let details = format!(
                "the exponent of a dimensioned base must be a constant: {}",
                err.get_details().unwrap_or_default()
            );
            Error::new(ErrorKind::Syntax, code, Some(details)).with_loc(exp.get_loc())
        })?;
        Ok(base.powf(value))
    }
}

impl Visitor<Result<Dimension>> for UnitEvaluator<'_> {
    fn walk(&mut self, expr: &Expr) -> Result<Dimension> {
        match expr {
            Expr::Const(_, _, _) | Expr::Bool(_, _) => Ok(Dimension::DIMENSIONLESS),
            Expr::Var(id, _) => match self.env.get_variable(id) {
                Some(var) => Ok(var.unit),
                None => Err(unknown_identifier(id, expr)),
            },
            Expr::App(func, args, loc) => {
                let env = self.env;
                let Some(f) = env.get_function(func) else {
                    return Err(unknown_function(func, expr));
                };
                if let Some(arity) = f.arity {
                    if arity != args.len() {
                        return syntax_err!(
                            BadArgCount,
                            *loc,
                            format!("'{}' takes {} arguments, got {}", func, arity, args.len())
                        );
                    }
                }
                let arg_units = args
                    .iter()
                    .map(|arg| self.walk(arg))
                    .collect::<Result<Vec<_>>>()?;
                if f.returns_bool {
                    return Ok(Dimension::DIMENSIONLESS);
                }
                f.unit_transform
                    .apply(func, &arg_units)
                    .map_err(|err| err.with_loc(*loc))
            }
            Expr::Op1(op, r, _) => {
                let unit = self.walk(r)?;
                match op {
                    UnaryOp::Positive | UnaryOp::Negative => Ok(unit),
                    UnaryOp::Not => Ok(Dimension::DIMENSIONLESS),
                }
            }
            Expr::Op2(op, l, r, loc) => {
                let lunit = self.walk(l)?;
                match op {
                    BinaryOp::Add | BinaryOp::Sub => {
                        let runit = self.walk(r)?;
                        if lunit != runit {
                            return unit_err!(
                                UnitMismatch,
                                *loc,
                                format!("'{expr}': {lunit} and {runit} differ")
                            );
                        }
                        Ok(lunit)
                    }
                    BinaryOp::Mul => Ok(lunit * self.walk(r)?),
                    BinaryOp::Div => Ok(lunit / self.walk(r)?),
                    // the right operand is checked, but its unit doesn't
                    // constrain the result
                    BinaryOp::Mod => {
                        self.walk(r)?;
                        Ok(lunit)
                    }
                    BinaryOp::Pow => self.exponent(lunit, r),
                }
            }
            Expr::Compare(first, rest, loc) => {
                let mut prev = self.walk(first)?;
                for (op, r) in rest.iter() {
                    let unit = self.walk(r)?;
                    if prev != unit {
                        return unit_err!(
                            UnitMismatch,
                            *loc,
                            format!("'{}': {} {} {} compares different units", expr, prev, op.as_str(), unit)
                        );
                    }
                    prev = unit;
                }
                Ok(Dimension::DIMENSIONLESS)
            }
            Expr::Logical(_, operands, _) => {
                for operand in operands.iter() {
                    self.walk(operand)?;
                }
                Ok(Dimension::DIMENSIONLESS)
            }
        }
    }
}

/// The unit of an already-parsed expression.
pub fn expression_unit(expr: &Expr, env: &Environment) -> Result<Dimension> {
    UnitEvaluator { env }.walk(expr)
}

/// Parse `expr` and compute its unit.  Operands of `+`, `-` and
/// comparisons must agree, function arguments must fit the function's
/// unit transform and exponents of dimensioned bases must be constant.
pub fn parse_expression_unit(expr: &str, env: &Environment) -> Result<Dimension> {
    let ast = parse_expr(expr)?;
    expression_unit(&ast, env)
}

struct ValueEvaluator<'a> {
    env: &'a Environment,
}

impl Visitor<Result<f64>> for ValueEvaluator<'_> {
    fn walk(&mut self, expr: &Expr) -> Result<f64> {
        match expr {
            Expr::Const(_, n, _) => Ok(*n),
            Expr::Bool(b, _) => Ok(if *b { 1.0 } else { 0.0 }),
            Expr::Var(id, loc) => {
                let Some(var) = self.env.get_variable(id) else {
                    return Err(unknown_identifier(id, expr));
                };
                if !var.constant {
                    return syntax_err!(NotConstant, *loc, format!("'{id}' is not a constant"));
                }
                if !var.scalar {
                    return syntax_err!(NotScalar, *loc, format!("'{id}' is not a scalar"));
                }
                match var.value {
                    Some(value) => Ok(value),
                    None => syntax_err!(NoValue, *loc, format!("'{id}' has no value")),
                }
            }
            Expr::Op1(UnaryOp::Negative, r, _) => Ok(-self.walk(r)?),
            Expr::Op1(UnaryOp::Positive, r, _) => self.walk(r),
            Expr::Op2(op, l, r, _) => {
                let l = self.walk(l)?;
                let r = self.walk(r)?;
                let value = match op {
                    BinaryOp::Add => l + r,
                    BinaryOp::Sub => l - r,
                    BinaryOp::Mul => l * r,
                    BinaryOp::Div => l / r,
                    BinaryOp::Mod => l % r,
                    BinaryOp::Pow => l.powf(r),
                };
                Ok(value)
            }
            Expr::Op1(UnaryOp::Not, _, loc)
            | Expr::App(_, _, loc)
            | Expr::Compare(_, _, loc)
            | Expr::Logical(_, _, loc) => syntax_err!(
                UnsupportedSyntax,
                *loc,
                format!("can't compute a constant value for '{expr}'")
            ),
        }
    }
}

/// The value of an already-parsed constant expression.
pub fn value_from_expression(expr: &Expr, env: &Environment) -> Result<f64> {
    ValueEvaluator { env }.walk(expr)
}

/// Parse `expr` and evaluate it, provided it only refers to constant
/// scalars with known values.
pub fn get_value_from_expression(expr: &str, env: &Environment) -> Result<f64> {
    let ast = parse_expr(expr)?;
    value_from_expression(&ast, env)
}

struct BooleanClassifier<'a> {
    env: &'a Environment,
}

impl Visitor<Result<bool>> for BooleanClassifier<'_> {
    fn walk(&mut self, expr: &Expr) -> Result<bool> {
        match expr {
            Expr::Const(_, _, _) => Ok(false),
            Expr::Bool(_, _) => Ok(true),
            Expr::Var(id, _) => Ok(self.env.get_variable(id).is_some_and(|v| v.is_bool)),
            Expr::App(func, _, _) => match self.env.get_function(func) {
                Some(f) => Ok(f.returns_bool),
                None => Err(unknown_function(func, expr)),
            },
            Expr::Compare(_, _, _) => Ok(true),
            Expr::Logical(_, operands, loc) => {
                for operand in operands.iter() {
                    if !self.walk(operand)? {
                        return syntax_err!(
                            MixedBoolean,
                            *loc,
                            format!("'{operand}' in '{expr}' is not a boolean expression")
                        );
                    }
                }
                Ok(true)
            }
            Expr::Op1(UnaryOp::Not, r, loc) => {
                if !self.walk(r)? {
                    return syntax_err!(
                        NotBoolean,
                        *loc,
                        format!("'not' applied to the non-boolean '{r}'")
                    );
                }
                Ok(true)
            }
            Expr::Op1(_, _, _) | Expr::Op2(_, _, _, _) => Ok(false),
        }
    }
}

/// Whether an already-parsed expression is guaranteed to be boolean.
pub fn expression_is_boolean(expr: &Expr, env: &Environment) -> Result<bool> {
    BooleanClassifier { env }.walk(expr)
}

/// Parse `expr` and decide whether it evaluates to a boolean.  Mixing
/// boolean and non-boolean operands of `and`/`or`/`not` is an error.
pub fn is_boolean_expression(expr: &str, env: &Environment) -> Result<bool> {
    let ast = parse_expr(expr)?;
    expression_is_boolean(&ast, env)
}
