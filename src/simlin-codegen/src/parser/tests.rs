// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use super::*;
use crate::ast::{AssignOp, BinaryOp, BoolOp, CmpOp, Expr, UnaryOp};
use crate::common::ErrorCode;

fn parse_eq(input: &str) -> Result<Expr> {
    parse(input, LexerType::Equation)
}

fn parse_rendered(input: &str) -> Result<Expr> {
    parse(input, LexerType::Rendered)
}

fn err_code(input: &str) -> ErrorCode {
    parse_eq(input).unwrap_err().code
}

fn var(id: &str) -> Expr {
    Expr::Var(id.to_owned(), Loc::default())
}

fn num(s: &str) -> Expr {
    Expr::Const(s.to_owned(), s.parse().unwrap(), Loc::default())
}

fn op2(op: BinaryOp, l: Expr, r: Expr) -> Expr {
    Expr::Op2(op, Box::new(l), Box::new(r), Loc::default())
}

fn op1(op: UnaryOp, r: Expr) -> Expr {
    Expr::Op1(op, Box::new(r), Loc::default())
}

// ============================================================================
// Atom parsing tests
// ============================================================================

#[test]
fn test_parse_number() {
    let ast = parse_eq("42").unwrap();
    assert!(matches!(ast, Expr::Const(s, n, _) if s == "42" && n == 42.0));

    let ast = parse_eq("1.5e-3").unwrap();
    assert!(matches!(ast, Expr::Const(s, n, _) if s == "1.5e-3" && (n - 0.0015).abs() < 1e-12));

    let ast = parse_eq("3.").unwrap();
    assert!(matches!(ast, Expr::Const(s, n, _) if s == "3." && n == 3.0));
}

#[test]
fn test_parse_bools() {
    assert_eq!(Expr::Bool(true, Loc::new(0, 4)), parse_eq("True").unwrap());
    assert_eq!(Expr::Bool(false, Loc::new(0, 5)), parse_eq("False").unwrap());
    // lowercase booleans are plain identifiers in the source grammar
    assert_eq!(var("true"), parse_eq("true").unwrap().strip_loc());
}

#[test]
fn test_parse_app() {
    let ast = parse_eq("f(x, g(y), 3)").unwrap();
    assert_eq!(Loc::new(0, 13), ast.get_loc());
    let expected = Expr::App(
        "f".to_owned(),
        vec![
            var("x"),
            Expr::App("g".to_owned(), vec![var("y")], Loc::default()),
            num("3"),
        ],
        Loc::default(),
    );
    assert_eq!(expected, ast.strip_loc());

    let ast = parse_eq("rand()").unwrap().strip_loc();
    assert_eq!(Expr::App("rand".to_owned(), vec![], Loc::default()), ast);
}

// ============================================================================
// Precedence tests
// ============================================================================

#[test]
fn test_arithmetic_precedence() {
    let cases = [
        (
            "a + b * c",
            op2(BinaryOp::Add, var("a"), op2(BinaryOp::Mul, var("b"), var("c"))),
        ),
        (
            "a - b - c",
            op2(BinaryOp::Sub, op2(BinaryOp::Sub, var("a"), var("b")), var("c")),
        ),
        (
            "a / b % c",
            op2(BinaryOp::Mod, op2(BinaryOp::Div, var("a"), var("b")), var("c")),
        ),
        (
            "a ** b ** c",
            op2(BinaryOp::Pow, var("a"), op2(BinaryOp::Pow, var("b"), var("c"))),
        ),
        (
            "-a ** b",
            op1(UnaryOp::Negative, op2(BinaryOp::Pow, var("a"), var("b"))),
        ),
        (
            "a ** -b",
            op2(BinaryOp::Pow, var("a"), op1(UnaryOp::Negative, var("b"))),
        ),
        (
            "-a * b",
            op2(BinaryOp::Mul, op1(UnaryOp::Negative, var("a")), var("b")),
        ),
        (
            "(a + b) * c",
            op2(BinaryOp::Mul, op2(BinaryOp::Add, var("a"), var("b")), var("c")),
        ),
        ("--a", op1(UnaryOp::Negative, op1(UnaryOp::Negative, var("a")))),
        ("+a", op1(UnaryOp::Positive, var("a"))),
    ];

    for (input, expected) in cases {
        assert_eq!(expected, parse_eq(input).unwrap().strip_loc(), "{input}");
    }
}

#[test]
fn test_logical_precedence() {
    let ast = parse_eq("a or b and not c").unwrap().strip_loc();
    let expected = Expr::Logical(
        BoolOp::Or,
        vec![
            var("a"),
            Expr::Logical(
                BoolOp::And,
                vec![var("b"), op1(UnaryOp::Not, var("c"))],
                Loc::default(),
            ),
        ],
        Loc::default(),
    );
    assert_eq!(expected, ast);

    // chains of one operator are a single node
    let ast = parse_eq("a and b and c").unwrap().strip_loc();
    assert_eq!(
        Expr::Logical(BoolOp::And, vec![var("a"), var("b"), var("c")], Loc::default()),
        ast
    );

    // but explicit grouping is preserved
    let ast = parse_eq("(a and b) and c").unwrap().strip_loc();
    assert_eq!(
        Expr::Logical(
            BoolOp::And,
            vec![
                Expr::Logical(BoolOp::And, vec![var("a"), var("b")], Loc::default()),
                var("c")
            ],
            Loc::default()
        ),
        ast
    );

    // not binds looser than comparisons
    let ast = parse_eq("not a < b").unwrap().strip_loc();
    let expected = op1(
        UnaryOp::Not,
        Expr::Compare(Box::new(var("a")), vec![(CmpOp::Lt, var("b"))], Loc::default()),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_chained_comparison() {
    let ast = parse_eq("a < b <= c + 1").unwrap();
    assert_eq!(Loc::new(0, 14), ast.get_loc());
    let expected = Expr::Compare(
        Box::new(var("a")),
        vec![
            (CmpOp::Lt, var("b")),
            (CmpOp::Lte, op2(BinaryOp::Add, var("c"), num("1"))),
        ],
        Loc::default(),
    );
    assert_eq!(expected, ast.strip_loc());
}

#[test]
fn test_rendered_dialect() {
    let ast = parse_rendered("!(a) && (b) || c").unwrap().strip_loc();
    let expected = Expr::Logical(
        BoolOp::Or,
        vec![
            Expr::Logical(
                BoolOp::And,
                vec![op1(UnaryOp::Not, var("a")), var("b")],
                Loc::default(),
            ),
            var("c"),
        ],
        Loc::default(),
    );
    assert_eq!(expected, ast);

    let ast = parse_rendered("(a < b) & (b < c)").unwrap().strip_loc();
    let expected = Expr::Logical(
        BoolOp::And,
        vec![
            Expr::Compare(Box::new(var("a")), vec![(CmpOp::Lt, var("b"))], Loc::default()),
            Expr::Compare(Box::new(var("b")), vec![(CmpOp::Lt, var("c"))], Loc::default()),
        ],
        Loc::default(),
    );
    assert_eq!(expected, ast);

    assert_eq!(Expr::Bool(true, Loc::default()), parse_rendered("true").unwrap().strip_loc());
}

// ============================================================================
// Error tests
// ============================================================================

#[test]
fn test_parse_errors() {
    let cases = [
        ("", ErrorCode::EmptyEquation),
        ("a +", ErrorCode::UnrecognizedEof),
        ("a b", ErrorCode::ExtraToken),
        ("(a", ErrorCode::UnrecognizedEof),
        ("a)", ErrorCode::ExtraToken),
        ("a $ b", ErrorCode::InvalidToken),
        ("a && b", ErrorCode::InvalidToken),
        ("x[0]", ErrorCode::UnsupportedSyntax),
        ("x.y", ErrorCode::UnsupportedSyntax),
        ("f(x)[1]", ErrorCode::UnsupportedSyntax),
        ("lambda x: x", ErrorCode::UnsupportedSyntax),
        ("f(x=1)", ErrorCode::UnsupportedSyntax),
        ("f(*x)", ErrorCode::UnsupportedSyntax),
        ("(a, b)", ErrorCode::UnsupportedSyntax),
        ("[a, b]", ErrorCode::UnsupportedSyntax),
        ("a if b else c", ErrorCode::ExtraToken),
        ("a in b", ErrorCode::UnsupportedSyntax),
        ("a +\n b", ErrorCode::UnsupportedSyntax),
        ("(a +\n b)", ErrorCode::UnsupportedSyntax),
    ];

    for (input, expected) in cases {
        assert_eq!(expected, err_code(input), "{input}");
    }

    let err = parse_eq("a b").unwrap_err();
    assert!(err.is_syntax());
    assert_eq!(Some(Loc::new(2, 3)), err.loc);
}

// ============================================================================
// Statement and code tests
// ============================================================================

#[test]
fn test_parse_statement() {
    let stmt = parse_statement("v = a + 1").unwrap();
    assert_eq!("v", stmt.target);
    assert_eq!(AssignOp::Assign, stmt.op);
    assert_eq!(op2(BinaryOp::Add, var("a"), num("1")), stmt.value.strip_loc());

    let stmt = parse_statement("v **= 2").unwrap();
    assert_eq!(AssignOp::Augmented(BinaryOp::Pow), stmt.op);

    for bad in ["v == 1", "v[0] = 1", "v.x = 1", "1 = v", "v = ", "a = b = c", "v"] {
        assert!(parse_statement(bad).is_err(), "{bad}");
    }
}

#[test]
fn test_parse_code() {
    let code = "
        # a comment
        v = a + b

        w += v  # trailing
    ";
    let stmts = parse_code(code).unwrap();
    assert_eq!(2, stmts.len());
    assert_eq!("v", stmts[0].target);
    assert_eq!("w", stmts[1].target);
    assert_eq!(AssignOp::Augmented(BinaryOp::Add), stmts[1].op);

    let err = parse_code("a = 1\nb = +\n").unwrap_err();
    assert!(err.get_details().unwrap().starts_with("line 2"));
}

#[test]
fn test_deindent() {
    assert_eq!("a = 1\n  b = 2\n\nc", deindent("    a = 1\n      b = 2\n\n    c"));
    assert_eq!("x", deindent("x"));
    assert_eq!("\u{a0}a = 1\nb = 2", deindent(" \u{a0}a = 1\n b = 2"));
    assert_eq!("\u{3000}a = 1\n b = 2", deindent("\u{3000}a = 1\n b = 2"));
}

#[test]
fn test_parse_code_with_unicode_indentation() {
    let stmts = parse_code("\u{a0}a = 1\n b = 2").unwrap();
    assert_eq!(2, stmts.len());
    assert_eq!("a", stmts[0].target);
    assert_eq!("b", stmts[1].target);

    let stmts = parse_code("  \u{3000}x = y\n    z = x").unwrap();
    assert_eq!(vec!["x", "z"], stmts.iter().map(|s| s.target.as_str()).collect::<Vec<_>>());
}

// ============================================================================
// Function definition tests
// ============================================================================

#[test]
fn test_parse_function_defs() {
    let source = "
        def f(x, y):
            z = x + y
            return z * 2
        irrelevant_code_here()
        def g(): return 1
        def h(v):
            v += 1
    ";
    let defs = parse_function_defs(source).unwrap();
    assert_eq!(3, defs.len());

    assert_eq!("f", defs[0].name);
    assert_eq!(vec!["x".to_owned(), "y".to_owned()], defs[0].params);
    assert_eq!(2, defs[0].body.len());
    assert!(matches!(defs[0].body[0], BodyLine::Statement(_)));
    assert!(matches!(defs[0].body[1], BodyLine::Return(Some(_))));

    assert_eq!("g", defs[1].name);
    assert!(defs[1].params.is_empty());
    assert!(matches!(defs[1].body[0], BodyLine::Return(Some(Expr::Const(_, n, _))) if n == 1.0));

    assert_eq!("h", defs[2].name);
    assert_eq!(1, defs[2].body.len());
}

#[test]
fn test_bad_function_defs() {
    let cases = [
        ("def f(x, y=2):\n    return x", ErrorCode::BadFunctionDef),
        ("def f(*args):\n    return 1", ErrorCode::BadFunctionDef),
        ("def f(**kwds):\n    return 1", ErrorCode::BadFunctionDef),
        ("def f(x, x):\n    return x", ErrorCode::DuplicateArgument),
        ("def f(x):\n    if x:\n        return 1", ErrorCode::BadFunctionDef),
        ("def f(x):\n    def g(y):\n        return y", ErrorCode::BadFunctionDef),
        ("def f(x)\n    return x", ErrorCode::UnrecognizedEof),
    ];

    for (source, expected) in cases {
        let err = parse_function_defs(source).unwrap_err();
        assert_eq!(expected, err.code, "{source}");
        assert!(err.is_syntax());
    }
}
