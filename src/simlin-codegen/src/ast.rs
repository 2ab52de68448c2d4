// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeSet;
use std::fmt;

pub use crate::common::Loc;
use crate::render::{NodeRenderer, PlainRenderer};

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    /// higher binds tighter
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 6,
            BinaryOp::Pow => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum CmpOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
    Neq,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
            CmpOp::Eq => "==",
            CmpOp::Neq => "!=",
        }
    }

    pub fn negate(&self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Gte,
            CmpOp::Lte => CmpOp::Gt,
            CmpOp::Gt => CmpOp::Lte,
            CmpOp::Gte => CmpOp::Lt,
            CmpOp::Eq => CmpOp::Neq,
            CmpOp::Neq => CmpOp::Eq,
        }
    }

    pub fn apply(&self, l: f64, r: f64) -> bool {
        match self {
            CmpOp::Lt => l < r,
            CmpOp::Lte => l <= r,
            CmpOp::Gt => l > r,
            CmpOp::Gte => l >= r,
            CmpOp::Eq => l == r,
            CmpOp::Neq => l != r,
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum BoolOp {
    And,
    Or,
}

/// Expr is a parsed expression.  Trees are immutable once built and are
/// meant to be parsed once and then rendered or analyzed many times.
#[derive(PartialEq, Clone, Debug)]
pub enum Expr {
    /// the literal as written, and its value
    Const(String, f64, Loc),
    Bool(bool, Loc),
    Var(String, Loc),
    /// a call of a named function with positional arguments
    App(String, Vec<Expr>, Loc),
    Op1(UnaryOp, Box<Expr>, Loc),
    Op2(BinaryOp, Box<Expr>, Box<Expr>, Loc),
    /// `a < b <= c` is one Compare with the left-most operand and a
    /// list of (operator, right operand) pairs
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>, Loc),
    /// `a and b and c` is one Logical node with three operands
    Logical(BoolOp, Vec<Expr>, Loc),
}

impl Expr {
    pub fn get_loc(&self) -> Loc {
        match self {
            Expr::Const(_, _, loc) => *loc,
            Expr::Bool(_, loc) => *loc,
            Expr::Var(_, loc) => *loc,
            Expr::App(_, _, loc) => *loc,
            Expr::Op1(_, _, loc) => *loc,
            Expr::Op2(_, _, _, loc) => *loc,
            Expr::Compare(_, _, loc) => *loc,
            Expr::Logical(_, _, loc) => *loc,
        }
    }

    /// precedence in the source grammar; higher binds tighter.
    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Expr::Logical(BoolOp::Or, _, _) => 1,
            Expr::Logical(BoolOp::And, _, _) => 2,
            Expr::Op1(UnaryOp::Not, _, _) => 3,
            Expr::Compare(_, _, _) => 4,
            Expr::Op2(op, _, _, _) => op.precedence(),
            Expr::Op1(_, _, _) => 7,
            Expr::Const(_, _, _) | Expr::Bool(_, _) | Expr::Var(_, _) | Expr::App(_, _, _) => 9,
        }
    }

    /// identifiers returns the names read by this expression, not
    /// including the names of called functions.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        let mut funcs = BTreeSet::new();
        self.collect_identifiers(&mut vars, &mut funcs);
        vars
    }

    /// functions returns the names of every function called in this
    /// expression, including calls nested in arguments.
    pub fn functions(&self) -> BTreeSet<String> {
        let mut vars = BTreeSet::new();
        let mut funcs = BTreeSet::new();
        self.collect_identifiers(&mut vars, &mut funcs);
        funcs
    }

    pub(crate) fn collect_identifiers(
        &self,
        vars: &mut BTreeSet<String>,
        funcs: &mut BTreeSet<String>,
    ) {
        match self {
            Expr::Const(_, _, _) | Expr::Bool(_, _) => {}
            Expr::Var(id, _) => {
                vars.insert(id.clone());
            }
            Expr::App(func, args, _) => {
                funcs.insert(func.clone());
                for arg in args.iter() {
                    arg.collect_identifiers(vars, funcs);
                }
            }
            Expr::Op1(_, r, _) => r.collect_identifiers(vars, funcs),
            Expr::Op2(_, l, r, _) => {
                l.collect_identifiers(vars, funcs);
                r.collect_identifiers(vars, funcs);
            }
            Expr::Compare(l, rest, _) => {
                l.collect_identifiers(vars, funcs);
                for (_, r) in rest.iter() {
                    r.collect_identifiers(vars, funcs);
                }
            }
            Expr::Logical(_, operands, _) => {
                for operand in operands.iter() {
                    operand.collect_identifiers(vars, funcs);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn strip_loc(self) -> Self {
        let loc = Loc::default();
        match self {
            Expr::Const(s, n, _loc) => Expr::Const(s, n, loc),
            Expr::Bool(b, _loc) => Expr::Bool(b, loc),
            Expr::Var(v, _loc) => Expr::Var(v, loc),
            Expr::App(func, args, _loc) => Expr::App(
                func,
                args.into_iter().map(|arg| arg.strip_loc()).collect(),
                loc,
            ),
            Expr::Op1(op, r, _loc) => Expr::Op1(op, Box::new(r.strip_loc()), loc),
            Expr::Op2(op, l, r, _loc) => {
                Expr::Op2(op, Box::new(l.strip_loc()), Box::new(r.strip_loc()), loc)
            }
            Expr::Compare(l, rest, _loc) => Expr::Compare(
                Box::new(l.strip_loc()),
                rest.into_iter().map(|(op, r)| (op, r.strip_loc())).collect(),
                loc,
            ),
            Expr::Logical(op, operands, _loc) => Expr::Logical(
                op,
                operands.into_iter().map(|e| e.strip_loc()).collect(),
                loc,
            ),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", PlainRenderer.render_node(self))
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum AssignOp {
    Assign,
    /// `x += 1` and friends
    Augmented(BinaryOp),
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::Augmented(BinaryOp::Add) => "+=",
            AssignOp::Augmented(BinaryOp::Sub) => "-=",
            AssignOp::Augmented(BinaryOp::Mul) => "*=",
            AssignOp::Augmented(BinaryOp::Div) => "/=",
            AssignOp::Augmented(BinaryOp::Mod) => "%=",
            AssignOp::Augmented(BinaryOp::Pow) => "**=",
        }
    }
}

/// Statement is a single line of abstract code: `target = value`.
#[derive(PartialEq, Clone, Debug)]
pub struct Statement {
    pub target: String,
    pub op: AssignOp,
    pub value: Expr,
}

impl Statement {
    pub fn new(target: &str, value: Expr) -> Self {
        Statement {
            target: target.to_owned(),
            op: AssignOp::Assign,
            value,
        }
    }

    /// the names this statement reads.  An augmented assignment reads
    /// its own target.
    pub fn reads(&self) -> BTreeSet<String> {
        let mut reads = self.value.identifiers();
        if matches!(self.op, AssignOp::Augmented(_)) {
            reads.insert(self.target.clone());
        }
        reads
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", PlainRenderer.render_statement(self))
    }
}

/// Visitors walk Expr ASTs.
pub trait Visitor<T> {
    fn walk(&mut self, e: &Expr) -> T;
}
