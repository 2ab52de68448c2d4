// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Renderers turn a parsed expression back into text for one of several
//! backends.  Every renderer shares the traversal in
//! [`NodeRenderer::render_node`] and overrides the hooks for the nodes
//! its target spells differently.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::ast::{AssignOp, BinaryOp, BoolOp, CmpOp, Expr, Statement, UnaryOp};
use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::parser::{parse_code, parse_expr};

mod cpp;
mod numpy;
mod sympy;

pub use self::cpp::CppRenderer;
pub use self::numpy::NumpyRenderer;
pub use self::sympy::SympyRenderer;

/// whether `child`, rendered under `parent`, has to be wrapped in
/// parentheses to keep the tree's shape when it is read back in.
pub(crate) fn child_needs_parens(parent: &Expr, child: &Expr, is_right: bool) -> bool {
    let child_prec = child.precedence();
    match parent {
        // no children so doesn't matter
        Expr::Const(_, _, _) | Expr::Bool(_, _) | Expr::Var(_, _) => false,
        // children are comma separated, so no ambiguity possible
        Expr::App(_, _, _) => false,
        Expr::Op1(_, _, _) => child_prec < parent.precedence(),
        Expr::Op2(BinaryOp::Pow, _, _, _) => {
            if is_right {
                // `a ** -b` is fine, `a ** (b * c)` isn't
                child_prec < 7
            } else {
                // `(-a) ** b` and `(a ** b) ** c`
                child_prec <= BinaryOp::Pow.precedence()
            }
        }
        Expr::Op2(op, _, _, _) => {
            if is_right {
                child_prec <= op.precedence()
            } else {
                child_prec < op.precedence()
            }
        }
        // comparisons don't nest without changing meaning, and and/or
        // chains are kept as written
        Expr::Compare(_, _, _) | Expr::Logical(_, _, _) => child_prec <= parent.precedence(),
    }
}

pub(crate) fn paren_if_necessary(parent: &Expr, child: &Expr, is_right: bool, eqn: String) -> String {
    if child_needs_parens(parent, child, is_right) {
        format!("({eqn})")
    } else {
        eqn
    }
}

/// NodeRenderer renders expressions, statements and code blocks.  The
/// default hooks produce the plain source syntax.
pub trait NodeRenderer {
    fn render_node(&self, expr: &Expr) -> String {
        match expr {
            Expr::Const(s, n, _) => self.render_number(s, *n),
            Expr::Bool(b, _) => self.render_bool(*b),
            Expr::Var(id, _) => self.render_name(id),
            Expr::App(func, args, _) => self.render_call(func, args),
            Expr::Op1(op, r, _) => self.render_unary(expr, *op, r),
            Expr::Op2(op, l, r, _) => self.render_binary(expr, *op, l, r),
            Expr::Compare(l, rest, _) => self.render_compare(expr, l, rest),
            Expr::Logical(op, operands, _) => self.render_logical(expr, *op, operands),
        }
    }

    fn render_number(&self, literal: &str, _value: f64) -> String {
        literal.to_owned()
    }

    fn render_bool(&self, value: bool) -> String {
        if value { "True" } else { "False" }.to_owned()
    }

    fn render_name(&self, id: &str) -> String {
        id.to_owned()
    }

    fn render_call(&self, func: &str, args: &[Expr]) -> String {
        let args: Vec<String> = args.iter().map(|e| self.render_node(e)).collect();
        format!("{}({})", func, args.join(", "))
    }

    fn render_unary(&self, parent: &Expr, op: UnaryOp, operand: &Expr) -> String {
        let r = paren_if_necessary(parent, operand, true, self.render_node(operand));
        match op {
            UnaryOp::Positive => format!("+{r}"),
            UnaryOp::Negative => format!("-{r}"),
            UnaryOp::Not => format!("not {r}"),
        }
    }

    fn render_binary(&self, parent: &Expr, op: BinaryOp, l: &Expr, r: &Expr) -> String {
        let l = paren_if_necessary(parent, l, false, self.render_node(l));
        let r = paren_if_necessary(parent, r, true, self.render_node(r));
        format!("{} {} {}", l, op.as_str(), r)
    }

    fn render_compare(&self, parent: &Expr, first: &Expr, rest: &[(CmpOp, Expr)]) -> String {
        let mut eqn = paren_if_necessary(parent, first, false, self.render_node(first));
        for (op, r) in rest.iter() {
            let r = paren_if_necessary(parent, r, true, self.render_node(r));
            eqn = format!("{} {} {}", eqn, op.as_str(), r);
        }
        eqn
    }

    fn render_logical(&self, parent: &Expr, op: BoolOp, operands: &[Expr]) -> String {
        let sep = match op {
            BoolOp::And => " and ",
            BoolOp::Or => " or ",
        };
        let operands: Vec<String> = operands
            .iter()
            .enumerate()
            .map(|(i, e)| paren_if_necessary(parent, e, i > 0, self.render_node(e)))
            .collect();
        operands.join(sep)
    }

    fn render_statement(&self, stmt: &Statement) -> String {
        format!(
            "{} {} {}",
            stmt.target,
            stmt.op.as_str(),
            self.render_node(&stmt.value)
        )
    }

    fn render_code(&self, stmts: &[Statement]) -> String {
        debug!(statements = stmts.len(), "rendering code block");
        let lines: Vec<String> = stmts.iter().map(|s| self.render_statement(s)).collect();
        lines.join("\n")
    }
}

/// The source syntax, normalized: spaces around binary operators,
/// literals as written and only the parentheses the tree needs.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainRenderer;

impl NodeRenderer for PlainRenderer {}

/// Expand an augmented assignment whose operator the target can't write
/// in place into `v = op(v, value)` form.
pub(crate) fn expand_augmented(stmt: &Statement) -> Statement {
    match stmt.op {
        AssignOp::Assign => stmt.clone(),
        AssignOp::Augmented(op) => {
            let loc = stmt.value.get_loc();
            let target = Expr::Var(stmt.target.clone(), loc);
            Statement {
                target: stmt.target.clone(),
                op: AssignOp::Assign,
                value: Expr::Op2(op, Box::new(target), Box::new(stmt.value.clone()), loc),
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RendererKind {
    Plain,
    Numpy,
    Cpp,
    Sympy,
}

impl RendererKind {
    pub const ALL: [RendererKind; 4] = [
        RendererKind::Plain,
        RendererKind::Numpy,
        RendererKind::Cpp,
        RendererKind::Sympy,
    ];

    pub fn renderer(&self) -> Box<dyn NodeRenderer + Send + Sync> {
        match self {
            RendererKind::Plain => Box::new(PlainRenderer),
            RendererKind::Numpy => Box::new(NumpyRenderer),
            RendererKind::Cpp => Box::new(CppRenderer),
            RendererKind::Sympy => Box::new(SympyRenderer),
        }
    }
}

impl fmt::Display for RendererKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RendererKind::Plain => "plain",
            RendererKind::Numpy => "numpy",
            RendererKind::Cpp => "cpp",
            RendererKind::Sympy => "sympy",
        };
        write!(f, "{name}")
    }
}

impl FromStr for RendererKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "python" => Ok(RendererKind::Plain),
            "numpy" | "array" => Ok(RendererKind::Numpy),
            "cpp" | "c++" => Ok(RendererKind::Cpp),
            "sympy" | "symbolic" => Ok(RendererKind::Sympy),
            _ => Err(Error::new(
                ErrorKind::Syntax,
                ErrorCode::UnsupportedSyntax,
                Some(format!("unknown renderer '{s}'")),
            )),
        }
    }
}

/// Parse `expr` and render it for the given backend.
pub fn render_expr(kind: RendererKind, expr: &str) -> Result<String> {
    let ast = parse_expr(expr)?;
    Ok(kind.renderer().render_node(&ast))
}

/// Parse a block of abstract code and render every statement.
pub fn render_code(kind: RendererKind, code: &str) -> Result<String> {
    let stmts = parse_code(code)?;
    Ok(kind.renderer().render_code(&stmts))
}
