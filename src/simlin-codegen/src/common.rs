// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::{error, fmt, result};

/// Loc describes a location in a line of source by the starting point and
/// ending point.  Statements are short and single-line, so u16 is plenty.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Hash)]
pub struct Loc {
    pub start: u16,
    pub end: u16,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl Loc {
    pub fn new(start: usize, end: usize) -> Self {
        Loc {
            start: start as u16,
            end: end as u16,
        }
    }

    /// union takes a second Loc and returns the inclusive range from the
    /// start of the earlier token to the end of the later token.
    pub fn union(&self, rhs: &Self) -> Self {
        Loc {
            start: self.start.min(rhs.start),
            end: self.end.max(rhs.end),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidToken,
    UnrecognizedEof,
    UnrecognizedToken,
    ExtraToken,
    ExpectedNumber,
    EmptyEquation,
    UnsupportedSyntax,
    UnknownIdentifier,
    UnknownFunction,
    BadArgCount,
    NotBoolean,
    MixedBoolean,
    NonConstantExponent,
    NonScalarExponent,
    DimensionedExponent,
    NotConstant,
    NotScalar,
    NoValue,
    UnitMismatch,
    BadFunctionDef,
    DuplicateArgument,
    NoReturnValue,
    RecursiveInline,
    NoConstInUnits,
    NoAppInUnits,
    NoUnaryOpInUnits,
    BadBinaryOpInUnits,
    UnknownUnit,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            InvalidToken => "invalid_token",
            UnrecognizedEof => "unrecognized_eof",
            UnrecognizedToken => "unrecognized_token",
            ExtraToken => "extra_token",
            ExpectedNumber => "expected_number",
            EmptyEquation => "empty_equation",
            UnsupportedSyntax => "unsupported_syntax",
            UnknownIdentifier => "unknown_identifier",
            UnknownFunction => "unknown_function",
            BadArgCount => "bad_arg_count",
            NotBoolean => "not_boolean",
            MixedBoolean => "mixed_boolean",
            NonConstantExponent => "non_constant_exponent",
            NonScalarExponent => "non_scalar_exponent",
            DimensionedExponent => "dimensioned_exponent",
            NotConstant => "not_constant",
            NotScalar => "not_scalar",
            NoValue => "no_value",
            UnitMismatch => "unit_mismatch",
            BadFunctionDef => "bad_function_def",
            DuplicateArgument => "duplicate_argument",
            NoReturnValue => "no_return_value",
            RecursiveInline => "recursive_inline",
            NoConstInUnits => "no_const_in_units",
            NoAppInUnits => "no_app_in_units",
            NoUnaryOpInUnits => "no_unary_op_in_units",
            BadBinaryOpInUnits => "bad_binary_op_in_units",
            UnknownUnit => "unknown_unit",
        };

        write!(f, "{name}")
    }
}

/// The two ways an expression or block can be rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or disallowed source constructs.
    Syntax,
    /// An operator applied to operands with incompatible physical units.
    DimensionMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub loc: Option<Loc>,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            loc: None,
            details,
        }
    }

    pub fn syntax(code: ErrorCode, loc: Loc) -> Self {
        Error {
            kind: ErrorKind::Syntax,
            code,
            loc: Some(loc),
            details: None,
        }
    }

    pub fn with_loc(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }

    pub fn with_details(mut self, details: String) -> Self {
        self.details = Some(details);
        self
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }

    pub fn is_syntax(&self) -> bool {
        self.kind == ErrorKind::Syntax
    }

    pub fn is_dimension_mismatch(&self) -> bool {
        self.kind == ErrorKind::DimensionMismatch
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::DimensionMismatch => "DimensionMismatchError",
        };
        write!(f, "{}{{{}", kind, self.code)?;
        if let Some(loc) = self.loc {
            write!(f, "@{loc}")?;
        }
        match self.details {
            Some(ref details) => write!(f, ": {details}}}"),
            None => write!(f, "}}"),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

#[macro_export]
macro_rules! syntax_err {
    ($code:tt, $loc:expr, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Syntax, ErrorCode::$code, Some($str)).with_loc($loc))
    }};
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Syntax, ErrorCode::$code, Some($str)))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Syntax, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! unit_err {
    ($code:tt, $loc:expr, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::DimensionMismatch, ErrorCode::$code, Some($str)).with_loc($loc))
    }};
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::DimensionMismatch,
            ErrorCode::$code,
            Some($str),
        ))
    }};
}

#[test]
fn test_loc_basics() {
    let a = Loc { start: 3, end: 7 };
    assert_eq!(a, Loc::new(3, 7));

    let b = Loc { start: 4, end: 11 };
    assert_eq!(Loc::new(3, 11), a.union(&b));

    let c = Loc { start: 1, end: 5 };
    assert_eq!(Loc::new(1, 7), a.union(&c));
}

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::DimensionMismatch,
        ErrorCode::UnitMismatch,
        Some("a + b".to_owned()),
    );
    assert_eq!("DimensionMismatchError{unit_mismatch: a + b}", format!("{err}"));

    let err = Error::syntax(ErrorCode::ExtraToken, Loc::new(2, 4));
    assert_eq!("SyntaxError{extra_token@2:4}", format!("{err}"));
    assert!(err.is_syntax());
    assert!(!err.is_dimension_mismatch());
}
