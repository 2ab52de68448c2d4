// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use crate::ast::Expr;
use crate::render::NodeRenderer;
use crate::symbolic::SymExpr;

/// Renders the constructor form of the expression's symbolic tree.
/// Rendering goes through the canonicalizing constructors, so the output
/// is already simplified.
#[derive(Clone, Copy, Debug, Default)]
pub struct SympyRenderer;

impl SympyRenderer {
    pub fn to_symbolic(&self, expr: &Expr) -> SymExpr {
        SymExpr::from(expr)
    }
}

impl NodeRenderer for SympyRenderer {
    fn render_node(&self, expr: &Expr) -> String {
        self.to_symbolic(expr).srepr()
    }
}
