// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::ast::Statement;
use crate::common::Result;
use crate::parser::parse_code;

type Names = BTreeSet<String>;

/// The identifiers a block of abstract code touches, split by how they
/// are used and by whether the caller already knew about them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DependencyResult {
    pub all: Names,
    pub read: Names,
    pub write: Names,
    pub funcs: Names,
    pub known_all: Names,
    pub known_read: Names,
    pub known_write: Names,
    pub known_funcs: Names,
    pub unknown_read: Names,
    pub unknown_write: Names,
    pub unknown_funcs: Names,
    /// read before anything (the caller or an earlier statement) defined it
    pub undefined_read: Names,
    /// written by the block, and not known or read beforehand
    pub newly_defined: Names,
}

fn intersect(a: &Names, b: &Names) -> Names {
    a.intersection(b).cloned().collect()
}

fn difference(a: &Names, b: &Names) -> Names {
    a.difference(b).cloned().collect()
}

/// Analyze already-parsed statements.
pub fn statement_dependencies(
    stmts: &[Statement],
    known_vars: &Names,
    known_funcs: &Names,
) -> DependencyResult {
    let mut defined = known_vars.clone();
    let mut read = Names::new();
    let mut write = Names::new();
    let mut funcs = Names::new();
    let mut undefined_read = Names::new();

    for stmt in stmts.iter() {
        let mut vars = stmt.reads();
        stmt.value.collect_identifiers(&mut vars, &mut funcs);
        for var in vars.iter() {
            if !defined.contains(var) {
                undefined_read.insert(var.clone());
            }
        }
        read.extend(vars);
        write.insert(stmt.target.clone());
        defined.insert(stmt.target.clone());
    }

    let mut all = read.clone();
    all.extend(write.iter().cloned());
    all.extend(funcs.iter().cloned());

    let mut known = known_vars.clone();
    known.extend(known_funcs.iter().cloned());

    let newly_defined = difference(&difference(&write, known_vars), &undefined_read);

    debug!(
        statements = stmts.len(),
        undefined = undefined_read.len(),
        newly_defined = newly_defined.len(),
        "analyzed dependencies"
    );

    DependencyResult {
        known_all: intersect(&all, &known),
        known_read: intersect(&read, known_vars),
        known_write: intersect(&write, known_vars),
        known_funcs: intersect(&funcs, known_funcs),
        unknown_read: difference(&read, known_vars),
        unknown_write: difference(&write, known_vars),
        unknown_funcs: difference(&funcs, known_funcs),
        all,
        read,
        write,
        funcs,
        undefined_read,
        newly_defined,
    }
}

/// Parse a block of abstract code and report which identifiers it reads,
/// writes and calls.
pub fn abstract_code_dependencies(
    code: &str,
    known_vars: &Names,
    known_funcs: &Names,
) -> Result<DependencyResult> {
    let stmts = parse_code(code)?;
    Ok(statement_dependencies(&stmts, known_vars, known_funcs))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ids: &[&str]) -> Names {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_augmented_assignment_reads_target() {
        let res = abstract_code_dependencies("v += 1", &names(&[]), &names(&[])).unwrap();
        assert_eq!(names(&["v"]), res.read);
        assert_eq!(names(&["v"]), res.write);
        assert_eq!(names(&["v"]), res.undefined_read);
        // read before it was written, so not newly defined
        assert!(res.newly_defined.is_empty());
    }

    #[test]
    fn test_invariants() {
        let code = "
            a = f(b, g(c))
            d = a * e
            e = 1
        ";
        let res = abstract_code_dependencies(code, &names(&["b"]), &names(&["f"])).unwrap();

        let mut union = res.read.clone();
        union.extend(res.write.iter().cloned());
        union.extend(res.funcs.iter().cloned());
        assert_eq!(res.all, union);
        assert!(res.newly_defined.is_subset(&res.write));
        assert!(res.undefined_read.is_subset(&res.unknown_read));

        assert_eq!(names(&["f", "g"]), res.funcs);
        assert_eq!(names(&["g"]), res.unknown_funcs);
        assert_eq!(names(&["c", "e"]), res.undefined_read);
        assert_eq!(names(&["a", "d"]), res.newly_defined);
    }

    #[test]
    fn test_order_independence() {
        let known = names(&["x"]);
        let a = abstract_code_dependencies("y = x\nz = y", &known, &names(&[])).unwrap();
        let b = abstract_code_dependencies("z = y\ny = x", &known, &names(&[])).unwrap();
        assert_eq!(a.read, b.read);
        assert_eq!(a.write, b.write);
        assert_eq!(a.all, b.all);
        assert_ne!(a.undefined_read, b.undefined_read);
    }

    #[test]
    fn test_syntax_errors_propagate() {
        let err = abstract_code_dependencies("a = b[0]", &names(&[]), &names(&[])).unwrap_err();
        assert!(err.is_syntax());
    }
}
