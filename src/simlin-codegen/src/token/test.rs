// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use super::Token::*;
use super::{Lexer, LexerType, Token};
use crate::common::{Error, ErrorCode, Loc};

fn test(input: &str, expected: Vec<(&str, Token)>) {
    test_inner(input, expected, LexerType::Equation)
}

// straight from LALRPOP
fn test_inner(input: &str, expected: Vec<(&str, Token)>, lexer_type: LexerType) {
    let tokenizer = Lexer::new(input, lexer_type);
    let len = expected.len();
    for (token, (expected_span, expected_tok)) in tokenizer.zip(expected.into_iter()) {
        let expected_start = expected_span.find('~').unwrap();
        let expected_end = expected_span.rfind('~').unwrap() + 1;
        assert_eq!(Ok((expected_start, expected_tok, expected_end)), token);
    }

    let tokenizer = Lexer::new(input, lexer_type);
    assert_eq!(None, tokenizer.skip(len).next());
}

fn test_err(input: &str, expected: (&str, ErrorCode)) {
    let tokenizer = Lexer::new(input, LexerType::Equation);
    let token = tokenizer.into_iter().find(|tok| tok.is_err()).unwrap();
    let (expected_span, expected_code) = expected;
    let expected_start = expected_span.find('~').unwrap();
    let expected_end = expected_span.rfind('~').unwrap() + 1;
    let expected_err = Error::syntax(expected_code, Loc::new(expected_start, expected_end));
    assert_eq!(Err(expected_err), token);
}

#[test]
fn comparisons() {
    test(
        "a<=b != c",
        vec![
            ("~        ", Ident("a")),
            (" ~~      ", Lte),
            ("   ~     ", Ident("b")),
            ("     ~~  ", Neq),
            ("        ~", Ident("c")),
        ],
    );
    test("a == b", vec![("~     ", Ident("a")), ("  ~~  ", EqEq), ("     ~", Ident("b"))]);
}

#[test]
fn power_and_mul() {
    test(
        "a**b*c",
        vec![
            ("~     ", Ident("a")),
            (" ~~   ", Exp),
            ("   ~  ", Ident("b")),
            ("    ~ ", Mul),
            ("     ~", Ident("c")),
        ],
    );
}

#[test]
fn augmented_assignment() {
    test(
        "v += 1",
        vec![("~     ", Ident("v")), ("  ~~  ", PlusAssign), ("     ~", Num("1"))],
    );
    test(
        "v **= 2",
        vec![("~      ", Ident("v")), ("  ~~~  ", ExpAssign), ("      ~", Num("2"))],
    );
    test("v *= 2", vec![("~     ", Ident("v")), ("  ~~  ", MulAssign), ("     ~", Num("2"))]);
}

#[test]
fn numbers() {
    test("1.5e-3", vec![("~~~~~~", Num("1.5e-3"))]);
    test(".5", vec![("~~", Num(".5"))]);
    test("3.", vec![("~~", Num("3."))]);
    test("-3", vec![("~ ", Minus), (" ~", Num("3"))]);
}

#[test]
fn keywords() {
    test(
        "not a and True or False",
        vec![
            ("~~~                    ", Not),
            ("    ~                  ", Ident("a")),
            ("      ~~~              ", And),
            ("          ~~~~         ", True),
            ("               ~~      ", Or),
            ("                  ~~~~~", False),
        ],
    );
    test("lambda", vec![("~~~~~~", Reserved("lambda"))]);
    // only the rendered dialect knows lowercase booleans
    test("true", vec![("~~~~", Ident("true"))]);
}

#[test]
fn attribute_access_is_tokenized() {
    test(
        "a.b",
        vec![("~  ", Ident("a")), (" ~ ", Dot), ("  ~", Ident("b"))],
    );
}

#[test]
fn comments() {
    test("a # a comment", vec![("~            ", Ident("a"))]);
}

#[test]
fn rendered_dialect() {
    test_inner(
        "!(a) && b || c & d | true",
        vec![
            ("~                        ", Bang),
            (" ~                       ", LParen),
            ("  ~                      ", Ident("a")),
            ("   ~                     ", RParen),
            ("     ~~                  ", AndAnd),
            ("        ~                ", Ident("b")),
            ("          ~~             ", OrOr),
            ("             ~           ", Ident("c")),
            ("               ~         ", Amp),
            ("                 ~       ", Ident("d")),
            ("                   ~     ", Pipe),
            ("                     ~~~~", True),
        ],
        LexerType::Rendered,
    );
}

#[test]
fn errors() {
    test_err("a ! b", ("  ~  ", ErrorCode::UnrecognizedToken));
    test_err("a && b", ("  ~  ", ErrorCode::InvalidToken));
    test_err("a $", ("  ~", ErrorCode::InvalidToken));
    test_err("a +\n b", ("   ~   ", ErrorCode::UnsupportedSyntax));
    test_err("a\r", (" ~", ErrorCode::UnsupportedSyntax));
}
