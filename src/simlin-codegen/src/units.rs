// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Div, Mul};

use float_cmp::approx_eq;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::common::{Error, ErrorCode, Result};
use crate::parser::parse_expr;

const BASE_SYMBOLS: [&str; 7] = ["m", "kg", "s", "A", "K", "mol", "cd"];

/// Dimension is the vector of exponents of the seven SI base units
/// (length, mass, time, current, temperature, amount, luminosity).
/// Exponents are floats so that `sqrt` of a unit is representable.
#[derive(Clone, Copy, Debug, Default)]
pub struct Dimension {
    dims: [f64; 7],
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension { dims: [0.0; 7] };
    pub const LENGTH: Dimension = Dimension::base(0);
    pub const MASS: Dimension = Dimension::base(1);
    pub const TIME: Dimension = Dimension::base(2);
    pub const CURRENT: Dimension = Dimension::base(3);
    pub const TEMPERATURE: Dimension = Dimension::base(4);
    pub const AMOUNT: Dimension = Dimension::base(5);
    pub const LUMINOSITY: Dimension = Dimension::base(6);

    const fn base(i: usize) -> Dimension {
        let mut dims = [0.0; 7];
        dims[i] = 1.0;
        Dimension { dims }
    }

    pub fn new(dims: [f64; 7]) -> Self {
        Dimension { dims }
    }

    pub fn exponents(&self) -> [f64; 7] {
        self.dims
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Dimension::DIMENSIONLESS
    }

    pub fn powf(&self, exp: f64) -> Dimension {
        let mut dims = self.dims;
        for d in dims.iter_mut() {
            *d *= exp;
        }
        Dimension { dims }
    }

    pub fn reciprocal(&self) -> Dimension {
        self.powf(-1.0)
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.dims
            .iter()
            .zip(other.dims.iter())
            .all(|(a, b)| approx_eq!(f64, *a, *b, epsilon = 1e-9, ulps = 4))
    }
}

impl Mul for Dimension {
    type Output = Dimension;

    fn mul(self, rhs: Dimension) -> Dimension {
        let mut dims = self.dims;
        for (d, r) in dims.iter_mut().zip(rhs.dims.iter()) {
            *d += r;
        }
        Dimension { dims }
    }
}

impl Div for Dimension {
    type Output = Dimension;

    fn div(self, rhs: Dimension) -> Dimension {
        self * rhs.reciprocal()
    }
}

fn format_exp(exp: f64) -> String {
    if approx_eq!(f64, exp, exp.round(), epsilon = 1e-9) {
        format!("{}", exp.round() as i64)
    } else {
        format!("{exp}")
    }
}

fn is_zero(exp: f64) -> bool {
    approx_eq!(f64, exp, 0.0, epsilon = 1e-9)
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dmnl");
        }

        let mut written = false;
        for (unit, exp) in BASE_SYMBOLS
            .iter()
            .zip(self.dims.iter())
            .filter(|(_, exp)| !is_zero(**exp) && **exp > 0.0)
        {
            if written {
                write!(f, "*")?;
            }
            write!(f, "{unit}")?;
            if !approx_eq!(f64, *exp, 1.0, epsilon = 1e-9) {
                write!(f, "^{}", format_exp(*exp))?;
            }
            written = true;
        }

        for (unit, exp) in BASE_SYMBOLS
            .iter()
            .zip(self.dims.iter())
            .filter(|(_, exp)| !is_zero(**exp) && **exp < 0.0)
        {
            if !written {
                write!(f, "1")?;
                written = true;
            }
            write!(f, "/{unit}")?;
            if !approx_eq!(f64, *exp, -1.0, epsilon = 1e-9) {
                write!(f, "^{}", format_exp(-*exp))?;
            }
        }

        Ok(())
    }
}

// (long form, short form); the SI prefixes are dimensionless scale
// factors, so only the base unit matters when checking consistency.
const PREFIXES: &[(&str, &str)] = &[
    ("yotta", "Y"),
    ("zetta", "Z"),
    ("exa", "E"),
    ("peta", "P"),
    ("tera", "T"),
    ("giga", "G"),
    ("mega", "M"),
    ("kilo", "k"),
    ("hecto", "h"),
    ("deka", "da"),
    ("deci", "d"),
    ("centi", "c"),
    ("milli", "m"),
    ("micro", "u"),
    ("nano", "n"),
    ("pico", "p"),
    ("femto", "f"),
    ("atto", "a"),
    ("zepto", "z"),
    ("yocto", "y"),
];

/// Context maps unit names to dimensions.
#[derive(Clone, Debug)]
pub struct Context {
    units: HashMap<String, Dimension>,
}

impl Default for Context {
    fn default() -> Self {
        Context::with_si_units()
    }
}

impl Context {
    /// an empty context; only `1` and the dimensionless names parse.
    pub fn new() -> Self {
        Context {
            units: HashMap::new(),
        }
    }

    /// SI base and derived units, by name and by symbol.
    pub fn with_si_units() -> Self {
        use Dimension as D;

        let volt = D::MASS * D::LENGTH.powf(2.0) / D::TIME.powf(3.0) / D::CURRENT;
        let newton = D::MASS * D::LENGTH / D::TIME.powf(2.0);
        let joule = newton * D::LENGTH;
        let watt = joule / D::TIME;
        let coulomb = D::CURRENT * D::TIME;
        let ohm = volt / D::CURRENT;
        let siemens = ohm.reciprocal();
        let farad = coulomb / volt;
        let weber = volt * D::TIME;

        let builtin: &[(&[&str], Dimension)] = &[
            (&["metre", "meter", "m"], D::LENGTH),
            (&["kilogram", "kg"], D::MASS),
            (&["gram", "g"], D::MASS),
            (&["second", "s"], D::TIME),
            (&["amp", "ampere", "A"], D::CURRENT),
            (&["kelvin", "K"], D::TEMPERATURE),
            (&["mole", "mol"], D::AMOUNT),
            (&["candle", "candela", "cd"], D::LUMINOSITY),
            (&["volt", "V"], volt),
            (&["newton", "N"], newton),
            (&["joule", "J"], joule),
            (&["watt", "W"], watt),
            (&["coulomb", "C"], coulomb),
            (&["ohm"], ohm),
            (&["siemens", "S"], siemens),
            (&["farad", "F"], farad),
            (&["hertz", "Hz"], D::TIME.reciprocal()),
            (&["pascal", "Pa"], newton / D::LENGTH.powf(2.0)),
            (&["weber", "Wb"], weber),
            (&["tesla", "T"], weber / D::LENGTH.powf(2.0)),
            (&["henry", "H"], weber / D::CURRENT),
            (&["liter", "litre", "l"], D::LENGTH.powf(3.0)),
            (&["molar", "M"], D::AMOUNT / D::LENGTH.powf(3.0)),
            (&["radian", "rad"], D::DIMENSIONLESS),
        ];

        let mut ctx = Context::new();
        for (names, dim) in builtin.iter() {
            for name in names.iter() {
                ctx.define(name, *dim);
            }
        }
        ctx
    }

    pub fn define(&mut self, name: &str, dim: Dimension) {
        self.units.insert(name.to_owned(), dim);
    }

    /// lookup a unit by exact name first, and then as an SI-prefixed
    /// unit (`mV`, `millivolt`, `nS`).
    pub fn lookup(&self, name: &str) -> Option<Dimension> {
        if matches!(name, "dmnl" | "dimensionless" | "1") {
            return Some(Dimension::DIMENSIONLESS);
        }
        if let Some(dim) = self.units.get(name) {
            return Some(*dim);
        }
        PREFIXES.iter().find_map(|(long, short)| {
            let rest = name
                .strip_prefix(long)
                .or_else(|| name.strip_prefix(short))?;
            if rest.is_empty() {
                return None;
            }
            self.units.get(rest).copied()
        })
    }
}

/// evaluate a constant exponent such as `2`, `-1` or `1/2`
fn const_eval(ast: &Expr) -> Result<f64> {
    match ast {
        Expr::Const(_, n, _) => Ok(*n),
        Expr::Op1(UnaryOp::Negative, r, _) => Ok(-const_eval(r)?),
        Expr::Op1(UnaryOp::Positive, r, _) => const_eval(r),
        Expr::Op2(BinaryOp::Div, l, r, _) => Ok(const_eval(l)? / const_eval(r)?),
        _ => Err(Error::syntax(ErrorCode::ExpectedNumber, ast.get_loc())
            .with_details("unit exponents must be numbers".to_owned())),
    }
}

fn build_unit_components(ctx: &Context, ast: &Expr) -> Result<Dimension> {
    let dim = match ast {
        Expr::Const(_, n, loc) => {
            // dimensionless is special
            if *n == 1.0 {
                Dimension::DIMENSIONLESS
            } else {
                return Err(Error::syntax(ErrorCode::NoConstInUnits, *loc));
            }
        }
        Expr::Bool(_, loc) => {
            return Err(Error::syntax(ErrorCode::NoConstInUnits, *loc));
        }
        Expr::Var(id, loc) => match ctx.lookup(id) {
            Some(dim) => dim,
            None => {
                return Err(Error::syntax(ErrorCode::UnknownUnit, *loc)
                    .with_details(format!("unknown unit '{id}'")));
            }
        },
        Expr::App(_, _, loc) => {
            return Err(Error::syntax(ErrorCode::NoAppInUnits, *loc));
        }
        Expr::Op1(_, _, loc) => {
            return Err(Error::syntax(ErrorCode::NoUnaryOpInUnits, *loc));
        }
        Expr::Op2(op, l, r, loc) => match op {
            BinaryOp::Pow => build_unit_components(ctx, l)?.powf(const_eval(r)?),
            BinaryOp::Mul => build_unit_components(ctx, l)? * build_unit_components(ctx, r)?,
            BinaryOp::Div => build_unit_components(ctx, l)? / build_unit_components(ctx, r)?,
            _ => {
                return Err(Error::syntax(ErrorCode::BadBinaryOpInUnits, *loc));
            }
        },
        Expr::Compare(_, _, loc) | Expr::Logical(_, _, loc) => {
            return Err(Error::syntax(ErrorCode::BadBinaryOpInUnits, *loc));
        }
    };

    Ok(dim)
}

/// Parse a unit expression like `volt*amp/second**2` into its dimension.
pub fn parse_units(ctx: &Context, unit_eqn: &str) -> Result<Dimension> {
    let ast = parse_expr(unit_eqn)?;
    build_unit_components(ctx, &ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponents() {
        let ctx = Context::default();
        let volt = parse_units(&ctx, "volt").unwrap();
        assert_eq!([2.0, 1.0, -3.0, -1.0, 0.0, 0.0, 0.0], volt.exponents());
        assert_eq!(volt, Dimension::new(volt.exponents()));

        let speed = Dimension::new([1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(Dimension::LENGTH / Dimension::TIME, speed);
        assert_eq!([-1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0], speed.reciprocal().exponents());
        assert!(Dimension::new([0.0; 7]).is_dimensionless());
    }

    #[test]
    fn test_pretty_print_unit() {
        let ctx = Context::default();

        let positive_cases: &[(&str, &str)] = &[
            ("m**2/s", "m^2/s"),
            ("metre * meter * m", "m^3"),
            ("m**2/meter", "m"),
            ("volt", "m^2*kg/s^3/A"),
            ("volt*amp", "m^2*kg/s^3"),
            ("1", "dmnl"),
            ("1/dmnl", "dmnl"),
            ("1/s", "1/s"),
            ("1/s/m", "1/m/s"),
            ("volt**0.5", "m*kg^0.5/s^1.5/A^0.5"),
            ("m**(1/2)", "m^0.5"),
            ("mV/ms", "m^2*kg/s^4/A"),
            ("nS*mV", "A"),
            ("pF", "s^4*A^2/m^2/kg"),
            ("Hz", "1/s"),
            ("radian", "dmnl"),
        ];

        for (input, output) in positive_cases {
            let result = parse_units(&ctx, input).unwrap();
            assert_eq!(*output, format!("{result}"), "{input}");
        }
    }

    #[test]
    fn test_unit_errors() {
        let ctx = Context::default();

        let cases: &[(&str, ErrorCode)] = &[
            ("2*volt", ErrorCode::NoConstInUnits),
            ("sqrt(volt)", ErrorCode::NoAppInUnits),
            ("-volt", ErrorCode::NoUnaryOpInUnits),
            ("volt + amp", ErrorCode::BadBinaryOpInUnits),
            ("volt < amp", ErrorCode::BadBinaryOpInUnits),
            ("furlong", ErrorCode::UnknownUnit),
            ("m**x", ErrorCode::ExpectedNumber),
        ];

        for (input, code) in cases {
            let err = parse_units(&ctx, input).unwrap_err();
            assert_eq!(*code, err.code, "{input}");
            assert!(err.is_syntax());
        }
    }

    #[test]
    fn test_dimension_arithmetic() {
        let volt = parse_units(&Context::default(), "volt").unwrap();
        assert_eq!(volt, volt.powf(0.5).powf(2.0));
        assert_eq!(Dimension::DIMENSIONLESS, volt / volt);
        assert!(volt.powf(1.0 / 3.0).powf(3.0) == volt);
        assert_ne!(volt, Dimension::CURRENT);
        assert!((volt / volt).is_dimensionless());
    }

    #[test]
    fn test_custom_context() {
        let mut ctx = Context::new();
        assert!(ctx.lookup("volt").is_none());
        ctx.define("widget", Dimension::AMOUNT);
        assert_eq!(Some(Dimension::AMOUNT), ctx.lookup("widget"));
        assert_eq!(Some(Dimension::AMOUNT), ctx.lookup("kwidget"));
        assert_eq!(Some(Dimension::DIMENSIONLESS), ctx.lookup("dmnl"));
    }
}
