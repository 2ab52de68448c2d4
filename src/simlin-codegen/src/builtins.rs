// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::HashMap;
use std::f64::consts::PI;

use crate::variable::{Function, UnitTransform};

fn arg(args: &[f64], i: usize) -> f64 {
    args.get(i).copied().unwrap_or(f64::NAN)
}

fn clip(args: &[f64]) -> f64 {
    let (x, low, high) = (arg(args, 0), arg(args, 1), arg(args, 2));
    x.max(low).min(high)
}

fn uniform(_args: &[f64]) -> f64 {
    rand::random::<f64>()
}

// Box-Muller
fn normal(_args: &[f64]) -> f64 {
    let u1 = 1.0 - rand::random::<f64>();
    let u2 = rand::random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

fn unary(f: fn(&[f64]) -> f64, transform: UnitTransform) -> Function {
    Function::new(transform).with_arity(1).with_implementation(f)
}

/// The functions every expression may call, keyed by name.
pub fn default_functions() -> HashMap<String, Function> {
    use UnitTransform::{Dimensionless, Power, Preserve, SameAsArgs};

    let dimensionless: &[(&str, fn(&[f64]) -> f64)] = &[
        ("exp", |a| arg(a, 0).exp()),
        ("log", |a| arg(a, 0).ln()),
        ("log10", |a| arg(a, 0).log10()),
        ("sin", |a| arg(a, 0).sin()),
        ("cos", |a| arg(a, 0).cos()),
        ("tan", |a| arg(a, 0).tan()),
        ("sinh", |a| arg(a, 0).sinh()),
        ("cosh", |a| arg(a, 0).cosh()),
        ("tanh", |a| arg(a, 0).tanh()),
        ("arcsin", |a| arg(a, 0).asin()),
        ("arccos", |a| arg(a, 0).acos()),
        ("arctan", |a| arg(a, 0).atan()),
        ("int", |a| arg(a, 0).trunc()),
    ];
    let preserving: &[(&str, fn(&[f64]) -> f64)] = &[
        ("abs", |a| arg(a, 0).abs()),
        ("ceil", |a| arg(a, 0).ceil()),
        ("floor", |a| arg(a, 0).floor()),
    ];

    let mut functions = HashMap::new();
    for (name, f) in dimensionless.iter() {
        functions.insert(name.to_string(), unary(*f, Dimensionless));
    }
    for (name, f) in preserving.iter() {
        functions.insert(name.to_string(), unary(*f, Preserve));
    }
    functions.insert("sqrt".to_owned(), unary(|a| arg(a, 0).sqrt(), Power(0.5)));
    functions.insert(
        "clip".to_owned(),
        Function::new(SameAsArgs).with_arity(3).with_implementation(clip),
    );
    functions.insert(
        "rand".to_owned(),
        Function::new(Dimensionless).with_arity(0).with_implementation(uniform),
    );
    functions.insert(
        "randn".to_owned(),
        Function::new(Dimensionless).with_arity(0).with_implementation(normal),
    );

    functions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Dimension;

    fn call(name: &str, args: &[f64]) -> f64 {
        let functions = default_functions();
        let f = functions[name].implementation.unwrap();
        f(args)
    }

    #[test]
    fn test_implementations() {
        assert_eq!(3.0, call("sqrt", &[9.0]));
        assert_eq!(2.0, call("clip", &[5.0, 0.0, 2.0]));
        assert_eq!(0.0, call("clip", &[-5.0, 0.0, 2.0]));
        assert_eq!(-2.0, call("int", &[-2.7]));
        assert_eq!(3.0, call("ceil", &[2.1]));
        assert_eq!(0.0, call("arcsin", &[0.0]));
        for _ in 0..100 {
            let r = call("rand", &[]);
            assert!((0.0..1.0).contains(&r));
            assert!(call("randn", &[]).is_finite());
        }
    }

    #[test]
    fn test_unit_behavior() {
        let functions = default_functions();
        let volt = Dimension::MASS * Dimension::LENGTH.powf(2.0)
            / Dimension::TIME.powf(3.0)
            / Dimension::CURRENT;

        let sqrt = &functions["sqrt"].unit_transform;
        assert_eq!(volt.powf(0.5), sqrt.apply("sqrt", &[volt]).unwrap());
        let ceil = &functions["ceil"].unit_transform;
        assert_eq!(volt, ceil.apply("ceil", &[volt]).unwrap());
        let sin = &functions["sin"].unit_transform;
        assert!(sin.apply("sin", &[volt]).unwrap_err().is_dimension_mismatch());
        assert!(functions.values().all(|f| !f.returns_bool));
    }
}
