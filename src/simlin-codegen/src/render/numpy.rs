// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::{AssignOp, BinaryOp, BoolOp, CmpOp, Expr, Statement, UnaryOp};
use crate::render::{NodeRenderer, expand_augmented, paren_if_necessary};

/// Element-wise array code.  Boolean operators become the bitwise
/// `&`/`|` with fully parenthesized operands, since those bind tighter
/// than comparisons.
#[derive(Clone, Copy, Debug, Default)]
pub struct NumpyRenderer;

impl NodeRenderer for NumpyRenderer {
    fn render_unary(&self, parent: &Expr, op: UnaryOp, operand: &Expr) -> String {
        match op {
            UnaryOp::Not => format!("logical_not({})", self.render_node(operand)),
            UnaryOp::Positive => {
                let r = paren_if_necessary(parent, operand, true, self.render_node(operand));
                format!("+{r}")
            }
            UnaryOp::Negative => {
                let r = paren_if_necessary(parent, operand, true, self.render_node(operand));
                format!("-{r}")
            }
        }
    }

    fn render_binary(&self, parent: &Expr, op: BinaryOp, l: &Expr, r: &Expr) -> String {
        if op == BinaryOp::Mod {
            return format!("fmod({}, {})", self.render_node(l), self.render_node(r));
        }
        let l = paren_if_necessary(parent, l, false, self.render_node(l));
        let r = paren_if_necessary(parent, r, true, self.render_node(r));
        format!("{} {} {}", l, op.as_str(), r)
    }

    fn render_compare(&self, parent: &Expr, first: &Expr, rest: &[(CmpOp, Expr)]) -> String {
        let mut pairs = vec![];
        let mut l = paren_if_necessary(parent, first, false, self.render_node(first));
        for (op, r) in rest.iter() {
            let r = paren_if_necessary(parent, r, true, self.render_node(r));
            pairs.push(format!("{} {} {}", l, op.as_str(), r));
            l = r;
        }
        if pairs.len() == 1 {
            return pairs.remove(0);
        }
        let pairs: Vec<String> = pairs.into_iter().map(|p| format!("({p})")).collect();
        pairs.join(" & ")
    }

    fn render_logical(&self, _parent: &Expr, op: BoolOp, operands: &[Expr]) -> String {
        let sep = match op {
            BoolOp::And => " & ",
            BoolOp::Or => " | ",
        };
        let operands: Vec<String> = operands
            .iter()
            .map(|e| format!("({})", self.render_node(e)))
            .collect();
        operands.join(sep)
    }

    fn render_statement(&self, stmt: &Statement) -> String {
        if stmt.op == AssignOp::Augmented(BinaryOp::Mod) {
            return self.render_statement(&expand_augmented(stmt));
        }
        format!(
            "{} {} {}",
            stmt.target,
            stmt.op.as_str(),
            self.render_node(&stmt.value)
        )
    }
}
