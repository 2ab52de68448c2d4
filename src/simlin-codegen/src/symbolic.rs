// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! A small computer-algebra tree.  Nodes are only ever built through the
//! canonicalizing constructors ([`SymExpr::add`], [`SymExpr::mul`],
//! [`SymExpr::pow`], ...), which flatten, fold constants and collect like
//! terms, so two equal expressions usually end up as equal trees.

use std::fmt;

use tracing::trace;

use crate::ast::{BinaryOp, BoolOp, CmpOp, Expr, UnaryOp};
use crate::common::Result;
use crate::parser::parse_expr;

#[derive(PartialEq, Clone, Debug)]
pub enum SymExpr {
    Num(f64),
    Bool(bool),
    Symbol(String),
    Add(Vec<SymExpr>),
    Mul(Vec<SymExpr>),
    Pow(Box<SymExpr>, Box<SymExpr>),
    Mod(Box<SymExpr>, Box<SymExpr>),
    Func(String, Vec<SymExpr>),
    Rel(CmpOp, Box<SymExpr>, Box<SymExpr>),
    Not(Box<SymExpr>),
    And(Vec<SymExpr>),
    Or(Vec<SymExpr>),
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15
}

impl SymExpr {
    pub fn symbol(name: &str) -> Self {
        SymExpr::Symbol(name.to_owned())
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            SymExpr::Num(n) => Some(*n),
            _ => None,
        }
    }

    fn is_num(&self, n: f64) -> bool {
        self.as_num() == Some(n)
    }

    pub fn add(terms: Vec<SymExpr>) -> SymExpr {
        let mut constant = 0.0;
        // (term without its coefficient, summed coefficient)
        let mut collected: Vec<(SymExpr, f64)> = vec![];

        let mut queue = terms;
        while let Some(term) = queue.pop() {
            match term {
                SymExpr::Num(n) => constant += n,
                SymExpr::Add(inner) => queue.extend(inner),
                term => {
                    let (coeff, rest) = term.split_coefficient();
                    match collected.iter_mut().find(|(t, _)| *t == rest) {
                        Some((_, c)) => *c += coeff,
                        None => collected.push((rest, coeff)),
                    }
                }
            }
        }

        let mut terms: Vec<SymExpr> = collected
            .into_iter()
            .filter(|(_, coeff)| *coeff != 0.0)
            .map(|(rest, coeff)| {
                if coeff == 1.0 {
                    rest
                } else {
                    SymExpr::mul(vec![SymExpr::Num(coeff), rest])
                }
            })
            .collect();
        if constant != 0.0 || terms.is_empty() {
            terms.push(SymExpr::Num(constant));
        }

        if terms.len() == 1 {
            return terms.remove(0);
        }
        terms.sort_by_key(|t| t.sort_key());
        SymExpr::Add(terms)
    }

    pub fn mul(factors: Vec<SymExpr>) -> SymExpr {
        let mut coeff = 1.0;
        // (base, exponents to be summed)
        let mut bases: Vec<(SymExpr, Vec<SymExpr>)> = vec![];

        let mut queue = factors;
        while let Some(factor) = queue.pop() {
            let (base, exp) = match factor {
                SymExpr::Num(n) => {
                    coeff *= n;
                    continue;
                }
                SymExpr::Mul(inner) => {
                    queue.extend(inner);
                    continue;
                }
                SymExpr::Pow(base, exp) => (*base, *exp),
                other => (other, SymExpr::Num(1.0)),
            };
            match bases.iter_mut().find(|(b, _)| *b == base) {
                Some((_, exps)) => exps.push(exp),
                None => bases.push((base, vec![exp])),
            }
        }

        if coeff == 0.0 {
            return SymExpr::Num(0.0);
        }

        let mut factors = vec![];
        let mut needs_regroup = false;
        for (base, exps) in bases {
            match SymExpr::pow(base, SymExpr::add(exps)) {
                SymExpr::Num(n) => coeff *= n,
                product @ SymExpr::Mul(_) => {
                    needs_regroup = true;
                    factors.push(product);
                }
                factor => factors.push(factor),
            }
        }

        if needs_regroup {
            factors.push(SymExpr::Num(coeff));
            return SymExpr::mul(factors);
        }

        if factors.is_empty() {
            return SymExpr::Num(coeff);
        }
        // a numeric coefficient distributes over a lone sum: -(a - b) is b - a
        if coeff != 1.0 && factors.len() == 1 && matches!(factors[0], SymExpr::Add(_)) {
            if let Some(SymExpr::Add(terms)) = factors.pop() {
                return SymExpr::add(
                    terms
                        .into_iter()
                        .map(|t| SymExpr::mul(vec![SymExpr::Num(coeff), t]))
                        .collect(),
                );
            }
        }
        factors.sort_by_key(|f| f.sort_key());
        if coeff != 1.0 {
            factors.insert(0, SymExpr::Num(coeff));
        }
        if factors.len() == 1 {
            return factors.remove(0);
        }
        SymExpr::Mul(factors)
    }

    pub fn pow(base: SymExpr, exp: SymExpr) -> SymExpr {
        if exp.is_num(0.0) {
            return SymExpr::Num(1.0);
        }
        if exp.is_num(1.0) {
            return base;
        }
        if base.is_num(1.0) {
            return SymExpr::Num(1.0);
        }

        if let (Some(b), Some(e)) = (base.as_num(), exp.as_num()) {
            let n = b.powf(e);
            // 0**-1 and (-1)**0.5 stay symbolic
            if n.is_finite() {
                return SymExpr::Num(n);
            }
            return SymExpr::Pow(Box::new(base), Box::new(exp));
        }

        let integral_exp = exp.as_num().is_some_and(is_integral);
        match base {
            SymExpr::Pow(inner_base, inner_exp) if integral_exp => {
                SymExpr::pow(*inner_base, SymExpr::mul(vec![*inner_exp, exp]))
            }
            SymExpr::Mul(factors) if integral_exp => SymExpr::mul(
                factors
                    .into_iter()
                    .map(|f| SymExpr::pow(f, exp.clone()))
                    .collect(),
            ),
            base => SymExpr::Pow(Box::new(base), Box::new(exp)),
        }
    }

    pub fn neg(x: SymExpr) -> SymExpr {
        SymExpr::mul(vec![SymExpr::Num(-1.0), x])
    }

    pub fn sub(l: SymExpr, r: SymExpr) -> SymExpr {
        SymExpr::add(vec![l, SymExpr::neg(r)])
    }

    pub fn div(l: SymExpr, r: SymExpr) -> SymExpr {
        SymExpr::mul(vec![l, SymExpr::pow(r, SymExpr::Num(-1.0))])
    }

    /// the remainder takes the sign of the dividend, as C's fmod does
    pub fn modulo(l: SymExpr, r: SymExpr) -> SymExpr {
        if let (Some(a), Some(b)) = (l.as_num(), r.as_num()) {
            let n = a % b;
            if n.is_finite() {
                return SymExpr::Num(n);
            }
        }
        SymExpr::Mod(Box::new(l), Box::new(r))
    }

    pub fn func(name: &str, args: Vec<SymExpr>) -> SymExpr {
        if name == "sqrt" && args.len() == 1 {
            let mut args = args;
            return SymExpr::pow(args.remove(0), SymExpr::Num(0.5));
        }
        SymExpr::Func(name.to_owned(), args)
    }

    pub fn rel(op: CmpOp, l: SymExpr, r: SymExpr) -> SymExpr {
        if let (Some(a), Some(b)) = (l.as_num(), r.as_num()) {
            return SymExpr::Bool(op.apply(a, b));
        }
        SymExpr::Rel(op, Box::new(l), Box::new(r))
    }

    pub fn not(x: SymExpr) -> SymExpr {
        match x {
            SymExpr::Bool(b) => SymExpr::Bool(!b),
            SymExpr::Rel(op, l, r) => SymExpr::Rel(op.negate(), l, r),
            SymExpr::Not(inner) if inner.is_boolean() => *inner,
            x => SymExpr::Not(Box::new(x)),
        }
    }

    pub fn and(operands: Vec<SymExpr>) -> SymExpr {
        SymExpr::logical(BoolOp::And, operands)
    }

    pub fn or(operands: Vec<SymExpr>) -> SymExpr {
        SymExpr::logical(BoolOp::Or, operands)
    }

    fn logical(op: BoolOp, operands: Vec<SymExpr>) -> SymExpr {
        // the identity of `and` is True, and False absorbs everything
        let identity = op == BoolOp::And;
        let mut flat: Vec<SymExpr> = vec![];
        for operand in operands {
            match (op, operand) {
                (BoolOp::And, SymExpr::And(inner)) | (BoolOp::Or, SymExpr::Or(inner)) => {
                    flat.extend(inner)
                }
                (_, operand) => flat.push(operand),
            }
        }

        // `and`/`or` return an operand, so with a non-boolean operand only
        // leading constants can be folded without changing the value.
        let mut folded: Vec<SymExpr> = if flat.iter().all(SymExpr::is_boolean) {
            let mut folded: Vec<SymExpr> = vec![];
            for x in flat {
                match x {
                    SymExpr::Bool(b) if b == identity => {}
                    SymExpr::Bool(_) => return SymExpr::Bool(!identity),
                    x if folded.contains(&x) => {}
                    x => folded.push(x),
                }
            }
            folded
        } else {
            let mut rest = flat.into_iter().peekable();
            while let Some(SymExpr::Bool(b)) = rest.peek() {
                if *b != identity {
                    return SymExpr::Bool(!identity);
                }
                rest.next();
            }
            rest.collect()
        };

        match folded.len() {
            0 => SymExpr::Bool(identity),
            1 => folded.remove(0),
            _ if op == BoolOp::And => SymExpr::And(folded),
            _ => SymExpr::Or(folded),
        }
    }

    /// does this always evaluate to True or False?
    fn is_boolean(&self) -> bool {
        match self {
            SymExpr::Bool(_) | SymExpr::Rel(_, _, _) | SymExpr::Not(_) => true,
            SymExpr::And(xs) | SymExpr::Or(xs) => xs.iter().all(SymExpr::is_boolean),
            _ => false,
        }
    }

    /// splits `3*a*b` into (3, a*b)
    fn split_coefficient(self) -> (f64, SymExpr) {
        match self {
            SymExpr::Mul(mut factors) => match factors[0].as_num() {
                Some(coeff) => {
                    factors.remove(0);
                    if factors.len() == 1 {
                        (coeff, factors.remove(0))
                    } else {
                        (coeff, SymExpr::Mul(factors))
                    }
                }
                None => (1.0, SymExpr::Mul(factors)),
            },
            other => (1.0, other),
        }
    }

    fn sort_key(&self) -> (u8, String) {
        let rank = match self {
            SymExpr::Num(_) => 0,
            SymExpr::Bool(_) => 1,
            SymExpr::Symbol(_) => 2,
            SymExpr::Func(_, _) => 3,
            SymExpr::Pow(_, _) => 4,
            SymExpr::Mul(_) => 5,
            SymExpr::Add(_) => 6,
            SymExpr::Mod(_, _) => 7,
            SymExpr::Rel(_, _, _) => 8,
            SymExpr::Not(_) => 9,
            SymExpr::And(_) => 10,
            SymExpr::Or(_) => 11,
        };
        (rank, self.srepr())
    }

    /// The constructor form of this tree, e.g. `Add(Symbol('a'), Integer(1))`.
    pub fn srepr(&self) -> String {
        let list = |xs: &[SymExpr]| xs.iter().map(|x| x.srepr()).collect::<Vec<_>>().join(", ");
        match self {
            SymExpr::Num(n) if is_integral(*n) => format!("Integer({})", *n as i64),
            SymExpr::Num(n) => format!("Float('{n}', precision=53)"),
            SymExpr::Bool(b) => if *b { "true" } else { "false" }.to_owned(),
            SymExpr::Symbol(id) => format!("Symbol('{id}')"),
            SymExpr::Add(terms) => format!("Add({})", list(terms)),
            SymExpr::Mul(factors) => format!("Mul({})", list(factors)),
            SymExpr::Pow(b, e) => format!("Pow({}, {})", b.srepr(), e.srepr()),
            SymExpr::Mod(l, r) => format!("Mod({}, {})", l.srepr(), r.srepr()),
            SymExpr::Func(name, args) => format!("Function('{}')({})", name, list(args)),
            SymExpr::Rel(op, l, r) => {
                let name = match op {
                    CmpOp::Lt => "StrictLessThan",
                    CmpOp::Lte => "LessThan",
                    CmpOp::Gt => "StrictGreaterThan",
                    CmpOp::Gte => "GreaterThan",
                    CmpOp::Eq => "Equality",
                    CmpOp::Neq => "Unequality",
                };
                format!("{}({}, {})", name, l.srepr(), r.srepr())
            }
            SymExpr::Not(x) => format!("Not({})", x.srepr()),
            SymExpr::And(xs) => format!("And({})", list(xs)),
            SymExpr::Or(xs) => format!("Or({})", list(xs)),
        }
    }

    /// precedence of the printed form; higher binds tighter.
    fn precedence(&self) -> u8 {
        match self {
            SymExpr::Or(_) => 1,
            SymExpr::And(_) => 2,
            SymExpr::Not(_) => 3,
            SymExpr::Rel(_, _, _) => 4,
            SymExpr::Add(_) => 5,
            SymExpr::Mul(_) | SymExpr::Mod(_, _) => 6,
            // printed as `1/x`
            SymExpr::Pow(_, e) if e.as_num().is_some_and(|n| n < 0.0) => 6,
            SymExpr::Num(n) if *n < 0.0 => 7,
            SymExpr::Pow(_, e) if e.is_num(0.5) => 9,
            SymExpr::Pow(_, _) => 8,
            SymExpr::Num(_) | SymExpr::Bool(_) | SymExpr::Symbol(_) | SymExpr::Func(_, _) => 9,
        }
    }
}

fn format_num(n: f64) -> String {
    if is_integral(n) {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn wrap(x: &SymExpr, parens: bool) -> String {
    if parens {
        format!("({x})")
    } else {
        format!("{x}")
    }
}

/// is this term printed with a leading minus sign?
fn is_negative_term(x: &SymExpr) -> bool {
    match x {
        SymExpr::Num(n) => *n < 0.0,
        SymExpr::Mul(factors) => factors[0].as_num().is_some_and(|n| n < 0.0),
        _ => false,
    }
}

fn fmt_product(f: &mut fmt::Formatter<'_>, factors: &[SymExpr]) -> fmt::Result {
    let (coeff, rest) = match factors.first().and_then(|x| x.as_num()) {
        Some(coeff) => (coeff, &factors[1..]),
        None => (1.0, factors),
    };

    let mut numer: Vec<String> = vec![];
    let mut denom: Vec<SymExpr> = vec![];
    for factor in rest {
        match factor {
            SymExpr::Pow(b, e) if e.as_num().is_some_and(|n| n < 0.0) => {
                let n = e.as_num().unwrap_or(-1.0);
                denom.push(SymExpr::pow((**b).clone(), SymExpr::Num(-n)));
            }
            _ => {
                // `%` binds like `*`, so it is always wrapped inside a product
                let parens = factor.precedence() <= 6;
                numer.push(wrap(factor, parens));
            }
        }
    }

    if coeff < 0.0 {
        write!(f, "-")?;
    }
    let abs = coeff.abs();
    if abs != 1.0 || numer.is_empty() {
        numer.insert(0, format_num(abs));
    }
    write!(f, "{}", numer.join("*"))?;

    match denom.len() {
        0 => Ok(()),
        1 => write!(f, "/{}", wrap(&denom[0], denom[0].precedence() <= 6)),
        _ => {
            let denom: Vec<String> = denom
                .iter()
                .map(|x| wrap(x, x.precedence() <= 6))
                .collect();
            write!(f, "/({})", denom.join("*"))
        }
    }
}

/// Display prints the source grammar, so the result can be parsed again.
impl fmt::Display for SymExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymExpr::Num(n) => write!(f, "{}", format_num(*n)),
            SymExpr::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            SymExpr::Symbol(id) => write!(f, "{id}"),
            SymExpr::Add(terms) => {
                // constants go last: `a + 1`
                let mut ordered: Vec<&SymExpr> = terms.iter().filter(|t| t.as_num().is_none()).collect();
                ordered.extend(terms.iter().filter(|t| t.as_num().is_some()));
                for (i, term) in ordered.into_iter().enumerate() {
                    if i == 0 {
                        write!(f, "{term}")?;
                    } else if is_negative_term(term) {
                        let negated = SymExpr::neg(term.clone());
                        write!(f, " - {}", wrap(&negated, negated.precedence() <= 5))?;
                    } else {
                        write!(f, " + {}", wrap(term, term.precedence() <= 5))?;
                    }
                }
                Ok(())
            }
            SymExpr::Mul(factors) => fmt_product(f, factors),
            SymExpr::Pow(b, e) => {
                if e.is_num(0.5) {
                    return write!(f, "sqrt({b})");
                }
                if e.as_num().is_some_and(|n| n < 0.0) {
                    return fmt_product(f, std::slice::from_ref(self));
                }
                write!(
                    f,
                    "{}**{}",
                    wrap(b, b.precedence() <= 8),
                    wrap(e, e.precedence() < 7)
                )
            }
            SymExpr::Mod(l, r) => write!(
                f,
                "{} % {}",
                wrap(l, l.precedence() < 6),
                wrap(r, r.precedence() <= 6)
            ),
            SymExpr::Func(name, args) => {
                let args: Vec<String> = args.iter().map(|a| format!("{a}")).collect();
                write!(f, "{}({})", name, args.join(", "))
            }
            SymExpr::Rel(op, l, r) => write!(
                f,
                "{} {} {}",
                wrap(l, l.precedence() <= 4),
                op.as_str(),
                wrap(r, r.precedence() <= 4)
            ),
            SymExpr::Not(x) => write!(f, "not {}", wrap(x, x.precedence() < 3)),
            SymExpr::And(xs) | SymExpr::Or(xs) => {
                let (sep, prec) = if matches!(self, SymExpr::And(_)) {
                    (" and ", 2)
                } else {
                    (" or ", 1)
                };
                let xs: Vec<String> = xs.iter().map(|x| wrap(x, x.precedence() <= prec)).collect();
                write!(f, "{}", xs.join(sep))
            }
        }
    }
}

impl From<&Expr> for SymExpr {
    fn from(expr: &Expr) -> Self {
        match expr {
            Expr::Const(_, n, _) => SymExpr::Num(*n),
            Expr::Bool(b, _) => SymExpr::Bool(*b),
            Expr::Var(id, _) => SymExpr::symbol(id),
            Expr::App(func, args, _) => {
                SymExpr::func(func, args.iter().map(SymExpr::from).collect())
            }
            Expr::Op1(op, r, _) => {
                let r = SymExpr::from(r.as_ref());
                match op {
                    UnaryOp::Positive => r,
                    UnaryOp::Negative => SymExpr::neg(r),
                    UnaryOp::Not => SymExpr::not(r),
                }
            }
            Expr::Op2(op, l, r, _) => {
                let l = SymExpr::from(l.as_ref());
                let r = SymExpr::from(r.as_ref());
                match op {
                    BinaryOp::Add => SymExpr::add(vec![l, r]),
                    BinaryOp::Sub => SymExpr::sub(l, r),
                    BinaryOp::Mul => SymExpr::mul(vec![l, r]),
                    BinaryOp::Div => SymExpr::div(l, r),
                    BinaryOp::Mod => SymExpr::modulo(l, r),
                    BinaryOp::Pow => SymExpr::pow(l, r),
                }
            }
            Expr::Compare(first, rest, _) => {
                let mut rels = vec![];
                let mut l = SymExpr::from(first.as_ref());
                for (op, r) in rest.iter() {
                    let r = SymExpr::from(r);
                    rels.push(SymExpr::rel(*op, l, r.clone()));
                    l = r;
                }
                SymExpr::and(rels)
            }
            Expr::Logical(op, operands, _) => {
                let operands = operands.iter().map(SymExpr::from).collect();
                match op {
                    BoolOp::And => SymExpr::and(operands),
                    BoolOp::Or => SymExpr::or(operands),
                }
            }
        }
    }
}

/// Parse an expression string into its symbolic form.
pub fn to_symbolic(expr: &str) -> Result<SymExpr> {
    let ast = parse_expr(expr)?;
    Ok(SymExpr::from(&ast))
}

/// Print a symbolic expression in the source grammar.
pub fn symbolic_to_string(expr: &SymExpr) -> String {
    format!("{expr}")
}

/// Round-trip an expression through the symbolic form, returning the
/// simplified text.
pub fn simplify(expr: &str) -> Result<String> {
    let sym = to_symbolic(expr)?;
    let simplified = symbolic_to_string(&sym);
    trace!(input = expr, output = %simplified, "simplified expression");
    Ok(simplified)
}
