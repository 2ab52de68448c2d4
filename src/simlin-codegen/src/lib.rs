// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod ast;
pub mod common;
pub mod parser;
pub mod render;
pub mod token;

mod builtins;
pub mod dependencies;
pub mod expressions;
pub mod functions;
pub mod interpreter;
pub mod symbolic;
pub mod units;
pub mod variable;

pub use self::ast::{Expr, Statement};
pub use self::builtins::default_functions;
pub use self::common::{Error, ErrorCode, ErrorKind, Result};
pub use self::dependencies::{DependencyResult, abstract_code_dependencies};
pub use self::expressions::{
    get_value_from_expression, is_boolean_expression, parse_expression_unit,
};
pub use self::functions::{
    AbstractCode, abstract_code_from_function, extract_abstract_code_functions,
    substitute_abstract_code_functions,
};
pub use self::interpreter::{Interpreter, Scope, Value};
pub use self::parser::{parse_code, parse_expr};
pub use self::render::{NodeRenderer, RendererKind, render_expr};
pub use self::symbolic::{SymExpr, symbolic_to_string, to_symbolic};
pub use self::units::{Dimension, parse_units};
pub use self::variable::{Environment, Function, UnitTransform, Variable};
