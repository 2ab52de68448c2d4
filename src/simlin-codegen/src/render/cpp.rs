// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::{AssignOp, BinaryOp, BoolOp, CmpOp, Expr, Statement, UnaryOp};
use crate::render::{NodeRenderer, expand_augmented, paren_if_necessary};

/// Scalar C++ code.  Power and modulo have no operator in the target and
/// are emitted as calls; integer literals are written as doubles so that
/// division never truncates.
#[derive(Clone, Copy, Debug, Default)]
pub struct CppRenderer;

impl NodeRenderer for CppRenderer {
    fn render_number(&self, literal: &str, _value: f64) -> String {
        if literal.bytes().all(|b| b.is_ascii_digit()) {
            format!("{literal}.0")
        } else {
            literal.to_owned()
        }
    }

    fn render_bool(&self, value: bool) -> String {
        if value { "true" } else { "false" }.to_owned()
    }

    fn render_unary(&self, parent: &Expr, op: UnaryOp, operand: &Expr) -> String {
        let r = self.render_node(operand);
        match op {
            UnaryOp::Not => format!("!({r})"),
            // `--a` would be a decrement
            _ if matches!(operand, Expr::Op1(_, _, _)) => {
                let sign = if op == UnaryOp::Negative { "-" } else { "+" };
                format!("{sign}({r})")
            }
            UnaryOp::Positive => format!("+{}", paren_if_necessary(parent, operand, true, r)),
            UnaryOp::Negative => format!("-{}", paren_if_necessary(parent, operand, true, r)),
        }
    }

    fn render_binary(&self, parent: &Expr, op: BinaryOp, l: &Expr, r: &Expr) -> String {
        match op {
            BinaryOp::Pow => format!("pow({}, {})", self.render_node(l), self.render_node(r)),
            BinaryOp::Mod => format!("fmod({}, {})", self.render_node(l), self.render_node(r)),
            _ => {
                let l = paren_if_necessary(parent, l, false, self.render_node(l));
                let r = paren_if_necessary(parent, r, true, self.render_node(r));
                format!("{} {} {}", l, op.as_str(), r)
            }
        }
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
        pairs.join(" && ")
    }

    fn render_logical(&self, _parent: &Expr, op: BoolOp, operands: &[Expr]) -> String {
        let sep = match op {
            BoolOp::And => " && ",
            BoolOp::Or => " || ",
        };
        let operands: Vec<String> = operands
            .iter()
            .map(|e| format!("({})", self.render_node(e)))
            .collect();
        operands.join(sep)
    }

    fn render_statement(&self, stmt: &Statement) -> String {
        match stmt.op {
            AssignOp::Augmented(BinaryOp::Pow) | AssignOp::Augmented(BinaryOp::Mod) => {
                self.render_statement(&expand_augmented(stmt))
            }
            _ => format!(
                "{} {} {};",
                stmt.target,
                stmt.op.as_str(),
                self.render_node(&stmt.value)
            ),
        }
    }
}
