// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Functions written in abstract code, and inlining their calls into a
//! block of statements.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use tracing::debug;

use crate::ast::{Expr, Statement};
use crate::common::{Loc, Result};
use crate::parser::{BodyLine, FunctionDef, parse_code, parse_function_defs};
use crate::render::{NodeRenderer, PlainRenderer};
use crate::syntax_err;

/// AbstractCode is a function whose body is a list of assignments and an
/// optional return expression.
#[derive(Clone, Debug, PartialEq)]
pub struct AbstractCode {
    pub name: String,
    pub args: Vec<String>,
    pub code: Vec<Statement>,
    pub return_expr: Option<Expr>,
}

impl AbstractCode {
    fn from_def(def: FunctionDef) -> Result<Self> {
        let FunctionDef { name, params, body } = def;
        if body.is_empty() {
            return syntax_err!(BadFunctionDef, format!("'{name}' has an empty body"));
        }

        let mut code = vec![];
        let mut return_expr = None;
        let mut returned = false;
        for line in body {
            if returned {
                return syntax_err!(
                    BadFunctionDef,
                    format!("'{name}' has statements after its return")
                );
            }
            match line {
                BodyLine::Statement(stmt) => code.push(stmt),
                BodyLine::Return(expr) => {
                    returned = true;
                    return_expr = expr;
                }
            }
        }

        Ok(AbstractCode {
            name,
            args: params,
            code,
            return_expr,
        })
    }

    /// the body statements, one per line
    pub fn code_string(&self) -> String {
        PlainRenderer.render_code(&self.code)
    }

    pub fn return_string(&self) -> Option<String> {
        self.return_expr.as_ref().map(|e| PlainRenderer.render_node(e))
    }

    /// names assigned to in the body
    pub fn locals(&self) -> BTreeSet<String> {
        self.code.iter().map(|s| s.target.clone()).collect()
    }

    /// names of the functions this function calls
    pub fn calls(&self) -> BTreeSet<String> {
        let mut calls = BTreeSet::new();
        for stmt in self.code.iter() {
            calls.extend(stmt.value.functions());
        }
        if let Some(ref e) = self.return_expr {
            calls.extend(e.functions());
        }
        calls
    }
}

impl fmt::Display for AbstractCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "def {}({}):", self.name, self.args.join(", "))?;
        for stmt in self.code.iter() {
            writeln!(f, "    {stmt}")?;
        }
        match self.return_expr {
            Some(ref e) => write!(f, "    return {e}"),
            None if self.code.is_empty() => write!(f, "    return"),
            None => Ok(()),
        }
    }
}

/// Build abstract code from the source of a single function definition.
pub fn abstract_code_from_function(source: &str) -> Result<AbstractCode> {
    let mut defs = parse_function_defs(source)?;
    if defs.len() != 1 {
        return syntax_err!(
            BadFunctionDef,
            format!("expected one function definition, found {}", defs.len())
        );
    }
    AbstractCode::from_def(defs.remove(0))
}

/// Find every function defined in `source`, ignoring other top-level
/// statements.
pub fn extract_abstract_code_functions(source: &str) -> Result<BTreeMap<String, AbstractCode>> {
    let mut funcs = BTreeMap::new();
    for def in parse_function_defs(source)? {
        let ac = AbstractCode::from_def(def)?;
        funcs.insert(ac.name.clone(), ac);
    }
    Ok(funcs)
}

fn rename(expr: &Expr, names: &HashMap<String, String>) -> Expr {
    match expr {
        Expr::Var(id, loc) => match names.get(id) {
            Some(renamed) => Expr::Var(renamed.clone(), *loc),
            None => expr.clone(),
        },
        Expr::Const(_, _, _) | Expr::Bool(_, _) => expr.clone(),
        Expr::App(func, args, loc) => Expr::App(
            func.clone(),
            args.iter().map(|a| rename(a, names)).collect(),
            *loc,
        ),
        Expr::Op1(op, r, loc) => Expr::Op1(*op, Box::new(rename(r, names)), *loc),
        Expr::Op2(op, l, r, loc) => Expr::Op2(
            *op,
            Box::new(rename(l, names)),
            Box::new(rename(r, names)),
            *loc,
        ),
        Expr::Compare(first, rest, loc) => Expr::Compare(
            Box::new(rename(first, names)),
            rest.iter().map(|(op, r)| (*op, rename(r, names))).collect(),
            *loc,
        ),
        Expr::Logical(op, operands, loc) => Expr::Logical(
            *op,
            operands.iter().map(|e| rename(e, names)).collect(),
            *loc,
        ),
    }
}

/// the `n` of every `_inline_<func>_<n>_` name already in use
fn used_inline_index(id: &str, func: &str) -> Option<usize> {
    let rest = id.strip_prefix(&format!("_inline_{func}_"))?;
    let (n, _) = rest.split_once('_')?;
    n.parse().ok()
}

struct Inliner<'a> {
    funcs: HashMap<&'a str, &'a AbstractCode>,
    counters: HashMap<&'a str, usize>,
}

impl<'a> Inliner<'a> {
    fn new(funcs: &'a [AbstractCode], stmts: &[Statement]) -> Self {
        let funcs: HashMap<&str, &AbstractCode> =
            funcs.iter().map(|f| (f.name.as_str(), f)).collect();

        let mut names = BTreeSet::new();
        for stmt in stmts.iter() {
            names.extend(stmt.reads());
            names.insert(stmt.target.clone());
        }
        let mut counters = HashMap::new();
        for func in funcs.keys() {
            let next = names
                .iter()
                .filter_map(|id| used_inline_index(id, func))
                .map(|n| n + 1)
                .max()
                .unwrap_or(0);
            counters.insert(*func, next);
        }

        Inliner { funcs, counters }
    }

    fn next_prefix(&mut self, func: &'a str) -> String {
        let counter = self.counters.entry(func).or_insert(0);
        let prefix = format!("_inline_{func}_{counter}_");
        *counter += 1;
        prefix
    }

    fn calls_known(&self, stmt: &Statement) -> bool {
        stmt.value
            .functions()
            .iter()
            .any(|f| self.funcs.contains_key(f.as_str()))
    }

    /// a function that reaches itself through its calls can't be inlined
    fn check_recursion(&self) -> Result<()> {
        fn visit<'a>(
            func: &'a str,
            funcs: &HashMap<&'a str, &'a AbstractCode>,
            stack: &mut Vec<&'a str>,
            done: &mut BTreeSet<&'a str>,
        ) -> Result<()> {
            if done.contains(func) {
                return Ok(());
            }
            if stack.contains(&func) {
                stack.push(func);
                return syntax_err!(
                    RecursiveInline,
                    format!("recursive function calls can't be inlined: {}", stack.join(" -> "))
                );
            }
            let Some(ac) = funcs.get(func) else {
                return Ok(());
            };
            stack.push(func);
            for callee in ac.calls() {
                if let Some((name, _)) = funcs.get_key_value(callee.as_str()) {
                    visit(*name, funcs, stack, done)?;
                }
            }
            stack.pop();
            done.insert(func);
            Ok(())
        }

        let mut done = BTreeSet::new();
        for func in self.funcs.keys() {
            visit(*func, &self.funcs, &mut vec![], &mut done)?;
        }
        Ok(())
    }

    /// inline every call of a known function in `expr`, arguments first,
    /// pushing the statements each inlining needs onto `pre`.
    fn inline_expr(&mut self, expr: &Expr, pre: &mut Vec<Statement>) -> Result<Expr> {
        let inlined = match expr {
            Expr::Const(_, _, _) | Expr::Bool(_, _) | Expr::Var(_, _) => expr.clone(),
            Expr::App(func, args, loc) => {
                let args = args
                    .iter()
                    .map(|a| self.inline_expr(a, pre))
                    .collect::<Result<Vec<_>>>()?;
                match self.funcs.get(func.as_str()).copied() {
                    Some(ac) => self.inline_call(ac, args, *loc, pre)?,
                    None => Expr::App(func.clone(), args, *loc),
                }
            }
            Expr::Op1(op, r, loc) => Expr::Op1(*op, Box::new(self.inline_expr(r, pre)?), *loc),
            Expr::Op2(op, l, r, loc) => {
                let l = self.inline_expr(l, pre)?;
                let r = self.inline_expr(r, pre)?;
                Expr::Op2(*op, Box::new(l), Box::new(r), *loc)
            }
            Expr::Compare(first, rest, loc) => {
                let first = self.inline_expr(first, pre)?;
                let rest = rest
                    .iter()
                    .map(|(op, r)| Ok((*op, self.inline_expr(r, pre)?)))
                    .collect::<Result<Vec<_>>>()?;
                Expr::Compare(Box::new(first), rest, *loc)
            }
            Expr::Logical(op, operands, loc) => {
                let operands = operands
                    .iter()
                    .map(|e| self.inline_expr(e, pre))
                    .collect::<Result<Vec<_>>>()?;
                Expr::Logical(*op, operands, *loc)
            }
        };
        Ok(inlined)
    }

    fn inline_call(
        &mut self,
        ac: &'a AbstractCode,
        args: Vec<Expr>,
        loc: Loc,
        pre: &mut Vec<Statement>,
    ) -> Result<Expr> {
        if args.len() != ac.args.len() {
            return syntax_err!(
                BadArgCount,
                loc,
                format!("'{}' takes {} arguments, got {}", ac.name, ac.args.len(), args.len())
            );
        }
        let Some(ref return_expr) = ac.return_expr else {
            return syntax_err!(
                NoReturnValue,
                loc,
                format!("'{}' doesn't return a value", ac.name)
            );
        };

        let prefix = self.next_prefix(ac.name.as_str());
        let names: HashMap<String, String> = ac
            .args
            .iter()
            .cloned()
            .chain(ac.locals())
            .map(|id| {
                let renamed = format!("{prefix}{id}");
                (id, renamed)
            })
            .collect();

        for (param, arg) in ac.args.iter().zip(args) {
            pre.push(Statement::new(&names[param], arg));
        }
        for stmt in ac.code.iter() {
            pre.push(Statement {
                target: names[&stmt.target].clone(),
                op: stmt.op,
                value: rename(&stmt.value, &names),
            });
        }

        Ok(rename(return_expr, &names))
    }

    fn pass(&mut self, stmts: Vec<Statement>) -> Result<Vec<Statement>> {
        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            if !self.calls_known(&stmt) {
                out.push(stmt);
                continue;
            }
            let mut pre = vec![];
            let value = self.inline_expr(&stmt.value, &mut pre)?;
            out.extend(pre);
            out.push(Statement { value, ..stmt });
        }
        Ok(out)
    }
}

/// Inline every call of one of `funcs` in the statements, repeating until
/// no calls of them remain.
pub fn substitute_functions(stmts: Vec<Statement>, funcs: &[AbstractCode]) -> Result<Vec<Statement>> {
    let mut inliner = Inliner::new(funcs, &stmts);
    inliner.check_recursion()?;

    let mut stmts = stmts;
    let mut pass = 0;
    while stmts.iter().any(|s| inliner.calls_known(s)) {
        stmts = inliner.pass(stmts)?;
        pass += 1;
        debug!(pass, statements = stmts.len(), "inlined function calls");
    }
    Ok(stmts)
}

/// Parse a block of abstract code, inline calls of `funcs` and render the
/// result.
pub fn substitute_abstract_code_functions(code: &str, funcs: &[AbstractCode]) -> Result<String> {
    let stmts = parse_code(code)?;
    let stmts = substitute_functions(stmts, funcs)?;
    Ok(PlainRenderer.render_code(&stmts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;

    #[test]
    fn test_abstract_code_from_function() {
        let ac = abstract_code_from_function(
            "
            def f(x):
                y = x+1
                return y*y
            ",
        )
        .unwrap();
        assert_eq!("f", ac.name);
        assert_eq!(vec!["x".to_owned()], ac.args);
        assert_eq!("y = x + 1", ac.code_string());
        assert_eq!(Some("y * y".to_owned()), ac.return_string());
        assert_eq!("def f(x):\n    y = x + 1\n    return y * y", format!("{ac}"));
    }

    #[test]
    fn test_bad_functions() {
        let cases = [
            ("def f(x):\n    return x[:]", ErrorCode::UnsupportedSyntax),
            ("def f(x, **kwarg):\n    return x", ErrorCode::BadFunctionDef),
            ("def f(x, *args):\n    return x", ErrorCode::BadFunctionDef),
            ("def f(x):\n    return x\n    y = 1", ErrorCode::BadFunctionDef),
            ("def f(x):\n    return x\n    return 1", ErrorCode::BadFunctionDef),
            ("def f(x):\n    for i in x:\n        y = i", ErrorCode::BadFunctionDef),
            ("def f(x):", ErrorCode::BadFunctionDef),
            ("def f(x):\n    return x\ndef g(x):\n    return x", ErrorCode::BadFunctionDef),
            ("x = 1", ErrorCode::BadFunctionDef),
        ];
        for (source, code) in cases {
            let err = abstract_code_from_function(source).unwrap_err();
            assert_eq!(code, err.code, "{source}");
            assert!(err.is_syntax());
        }
    }

    #[test]
    fn test_inline_naming() {
        let f = abstract_code_from_function("def f(x):\n    y = x*x\n    return y + k").unwrap();
        let code = substitute_abstract_code_functions("z = f(a)", &[f.clone()]).unwrap();
        let expected = "_inline_f_0_x = a\n_inline_f_0_y = _inline_f_0_x * _inline_f_0_x\nz = _inline_f_0_y + k";
        assert_eq!(expected, code);

        // numbering continues after names already in the block
        let code = substitute_abstract_code_functions("q = _inline_f_3_y\nz = f(a)", &[f]).unwrap();
        assert!(code.contains("_inline_f_4_x = a"));
        assert!(!code.contains("_inline_f_0_"));
    }

    #[test]
    fn test_inline_errors() {
        let f = abstract_code_from_function("def f(x):\n    return f(x) + 1").unwrap();
        let err = substitute_abstract_code_functions("z = f(a)", &[f]).unwrap_err();
        assert_eq!(ErrorCode::RecursiveInline, err.code);

        let g = abstract_code_from_function("def g(v):\n    v += 1").unwrap();
        let err = substitute_abstract_code_functions("z = g(a)", &[g]).unwrap_err();
        assert_eq!(ErrorCode::NoReturnValue, err.code);

        let h = abstract_code_from_function("def h(a, b):\n    return a * b").unwrap();
        let err = substitute_abstract_code_functions("z = h(a)", &[h]).unwrap_err();
        assert_eq!(ErrorCode::BadArgCount, err.code);
        assert!(err.is_syntax());
    }

    #[test]
    fn test_unknown_calls_are_kept() {
        let f = abstract_code_from_function("def f(x):\n    return 2 * x").unwrap();
        let code = substitute_abstract_code_functions("z = sin(f(a))", &[f]).unwrap();
        assert_eq!("_inline_f_0_x = a\nz = sin(2 * _inline_f_0_x)", code);
    }
}
