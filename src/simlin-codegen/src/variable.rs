// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::builtins::default_functions;
use crate::common::Result;
use crate::units::Dimension;
use crate::unit_err;

/// Variable describes an identifier the caller knows about.  Constants
/// carry their value; everything else is an opaque symbol described only
/// by its metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Variable {
    pub unit: Dimension,
    pub is_bool: bool,
    /// the value can't change over the course of a run
    pub constant: bool,
    /// a single value, rather than one per element
    pub scalar: bool,
    pub value: Option<f64>,
}

impl Variable {
    /// a non-constant, per-element quantity with the given unit.
    pub fn new(unit: Dimension) -> Self {
        Variable {
            unit,
            is_bool: false,
            constant: false,
            scalar: false,
            value: None,
        }
    }

    /// a scalar constant with a known value.
    pub fn constant(unit: Dimension, value: f64) -> Self {
        Variable {
            unit,
            is_bool: false,
            constant: true,
            scalar: true,
            value: Some(value),
        }
    }

    /// a boolean constant, which is dimensionless.
    pub fn bool_constant(value: bool) -> Self {
        Variable {
            is_bool: true,
            ..Variable::constant(Dimension::DIMENSIONLESS, if value { 1.0 } else { 0.0 })
        }
    }

    /// a non-constant boolean flag.
    pub fn boolean() -> Self {
        Variable {
            is_bool: true,
            ..Variable::new(Dimension::DIMENSIONLESS)
        }
    }

    pub fn with_scalar(mut self, scalar: bool) -> Self {
        self.scalar = scalar;
        self
    }

    pub fn with_constant(mut self, constant: bool) -> Self {
        self.constant = constant;
        self
    }
}

pub type UnitFn = Arc<dyn Fn(&[Dimension]) -> Result<Dimension> + Send + Sync>;

/// How a function's result unit follows from its argument units.
#[derive(Clone)]
pub enum UnitTransform {
    /// every argument must be dimensionless, and so is the result
    Dimensionless,
    /// one argument, whose unit is the unit of the result
    Preserve,
    /// one argument, raised to a fixed power (`sqrt` is 0.5)
    Power(f64),
    /// all arguments share one unit, which is the unit of the result
    SameAsArgs,
    /// fixed argument and result units
    Fixed {
        args: Vec<Dimension>,
        result: Dimension,
    },
    Custom(UnitFn),
}

impl fmt::Debug for UnitTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitTransform::Dimensionless => write!(f, "Dimensionless"),
            UnitTransform::Preserve => write!(f, "Preserve"),
            UnitTransform::Power(exp) => write!(f, "Power({exp})"),
            UnitTransform::SameAsArgs => write!(f, "SameAsArgs"),
            UnitTransform::Fixed { args, result } => {
                write!(f, "Fixed {{ args: {args:?}, result: {result:?} }}")
            }
            UnitTransform::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

fn check_arg(func: &str, i: usize, actual: Dimension, expected: Dimension) -> Result<()> {
    if actual != expected {
        return unit_err!(
            UnitMismatch,
            format!("argument {} of '{}' has unit {}, expected {}", i + 1, func, actual, expected)
        );
    }
    Ok(())
}

impl UnitTransform {
    /// the result unit of calling `func` with arguments in these units.
    pub fn apply(&self, func: &str, args: &[Dimension]) -> Result<Dimension> {
        match self {
            UnitTransform::Dimensionless => {
                for (i, arg) in args.iter().enumerate() {
                    check_arg(func, i, *arg, Dimension::DIMENSIONLESS)?;
                }
                Ok(Dimension::DIMENSIONLESS)
            }
            UnitTransform::Preserve => Ok(args.first().copied().unwrap_or_default()),
            UnitTransform::Power(exp) => Ok(args.first().copied().unwrap_or_default().powf(*exp)),
            UnitTransform::SameAsArgs => {
                let first = args.first().copied().unwrap_or_default();
                for (i, arg) in args.iter().enumerate().skip(1) {
                    check_arg(func, i, *arg, first)?;
                }
                Ok(first)
            }
            UnitTransform::Fixed {
                args: expected,
                result,
            } => {
                for (i, (arg, expected)) in args.iter().zip(expected.iter()).enumerate() {
                    check_arg(func, i, *arg, *expected)?;
                }
                Ok(*result)
            }
            UnitTransform::Custom(f) => f(args),
        }
    }
}

/// Function describes a callable the caller provides.
#[derive(Clone, Debug)]
pub struct Function {
    pub returns_bool: bool,
    pub unit_transform: UnitTransform,
    /// expected argument count, if fixed
    pub arity: Option<usize>,
    /// numeric implementation, used by the interpreter
    pub implementation: Option<fn(&[f64]) -> f64>,
}

impl Function {
    pub fn new(unit_transform: UnitTransform) -> Self {
        Function {
            returns_bool: false,
            unit_transform,
            arity: None,
            implementation: None,
        }
    }

    pub fn returning_bool(mut self) -> Self {
        self.returns_bool = true;
        self
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = Some(arity);
        self
    }

    pub fn with_implementation(mut self, implementation: fn(&[f64]) -> f64) -> Self {
        self.implementation = Some(implementation);
        self
    }
}

/// Environment is the set of identifiers and functions an expression is
/// checked against.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    pub variables: HashMap<String, Variable>,
    pub functions: HashMap<String, Function>,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    /// an environment that knows the builtin functions (`sqrt`, `exp`,
    /// `rand`, ...).
    pub fn with_default_functions() -> Self {
        Environment {
            variables: HashMap::new(),
            functions: default_functions(),
        }
    }

    pub fn variable(mut self, name: &str, var: Variable) -> Self {
        self.variables.insert(name.to_owned(), var);
        self
    }

    pub fn function(mut self, name: &str, func: Function) -> Self {
        self.functions.insert(name.to_owned(), func);
        self
    }

    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_constructors() {
        let v = Variable::bool_constant(true);
        assert!(v.is_bool && v.constant && v.scalar);
        assert_eq!(Some(1.0), v.value);
        assert!(v.unit.is_dimensionless());

        let v = Variable::new(Dimension::CURRENT).with_scalar(true);
        assert!(!v.constant && v.scalar && v.value.is_none());
    }

    #[test]
    fn test_unit_transforms() {
        let dmnl = Dimension::DIMENSIONLESS;
        let amp = Dimension::CURRENT;

        assert_eq!(dmnl, UnitTransform::Dimensionless.apply("sin", &[dmnl]).unwrap());
        let err = UnitTransform::Dimensionless.apply("sin", &[amp]).unwrap_err();
        assert!(err.is_dimension_mismatch());

        assert_eq!(amp, UnitTransform::Preserve.apply("abs", &[amp]).unwrap());
        assert_eq!(amp.powf(0.5), UnitTransform::Power(0.5).apply("sqrt", &[amp]).unwrap());
        assert!(UnitTransform::SameAsArgs.apply("clip", &[amp, amp, dmnl]).is_err());

        let fixed = UnitTransform::Fixed {
            args: vec![amp],
            result: dmnl,
        };
        assert_eq!(dmnl, fixed.apply("f", &[amp]).unwrap());
        assert!(fixed.apply("f", &[dmnl]).is_err());

        let custom = UnitTransform::Custom(Arc::new(|args: &[Dimension]| Ok(args[0] * args[1])));
        assert_eq!(amp.powf(2.0), custom.apply("g", &[amp, amp]).unwrap());
    }

    #[test]
    fn test_environment_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Environment>();

        let env = Environment::with_default_functions()
            .variable("v", Variable::new(Dimension::CURRENT))
            .function("f", Function::new(UnitTransform::Preserve).returning_bool());
        assert!(env.get_function("sqrt").is_some());
        assert!(env.get_function("f").unwrap().returns_bool);
        assert!(env.get_variable("v").is_some());
        assert!(env.get_variable("w").is_none());
    }
}
