// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;

use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use simlin_codegen::render::render_code;
use simlin_codegen::symbolic::simplify;
use simlin_codegen::units::{Context, parse_units};
use simlin_codegen::{
    Environment, RendererKind, Variable, abstract_code_dependencies,
    extract_abstract_code_functions, get_value_from_expression, is_boolean_expression,
    parse_expression_unit, render_expr, substitute_abstract_code_functions,
};

const EXIT_FAILURE: i32 = 1;

type CliResult<T> = StdResult<T, Box<dyn std::error::Error>>;

macro_rules! die(
    ($($arg:tt)*) => { {
        eprintln!($($arg)*);
        std::process::exit(EXIT_FAILURE)
    } }
);

#[derive(Parser, Debug)]
#[command(name = "simlin-codegen", version)]
#[command(about = "Parse, analyze and render abstract code")]
struct Args {
    /// log pipeline stages at debug level (RUST_LOG overrides this)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an expression, or a file of statements, for a backend
    Render {
        /// plain, numpy, cpp or sympy
        #[arg(short, long, default_value = "plain")]
        target: String,
        /// treat INPUT as a file of abstract code
        #[arg(long)]
        code: bool,
        input: String,
    },
    /// Print the canonical symbolic form of an expression
    Simplify { expr: String },
    /// Report the dependencies of a file of abstract code as JSON
    Deps {
        path: PathBuf,
        #[arg(long, value_delimiter = ',')]
        known_vars: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        known_funcs: Vec<String>,
    },
    /// Print the unit of an expression
    Units {
        expr: String,
        /// JSON file describing the variables
        #[arg(long)]
        vars: Option<PathBuf>,
    },
    /// Print whether an expression is boolean
    IsBool {
        expr: String,
        #[arg(long)]
        vars: Option<PathBuf>,
    },
    /// Print the value of an expression over constants
    Value {
        expr: String,
        #[arg(long)]
        vars: Option<PathBuf>,
    },
    /// Inline calls of the functions defined in one file into the code in another
    Inline {
        path: PathBuf,
        #[arg(long)]
        functions: PathBuf,
    },
}

/// a variable as described in the --vars file
#[derive(Deserialize, Debug)]
struct VarSpec {
    #[serde(default = "dimensionless")]
    unit: String,
    #[serde(default)]
    is_bool: bool,
    #[serde(default)]
    constant: bool,
    #[serde(default)]
    scalar: bool,
    #[serde(default)]
    value: Option<f64>,
}

fn dimensionless() -> String {
    "1".to_owned()
}

fn read(path: &Path) -> CliResult<String> {
    fs::read_to_string(path).map_err(|err| format!("reading {}: {}", path.display(), err).into())
}

fn load_environment(vars: Option<&Path>) -> CliResult<Environment> {
    let mut env = Environment::with_default_functions();
    let Some(path) = vars else {
        return Ok(env);
    };

    let specs: HashMap<String, VarSpec> = serde_json::from_str(&read(path)?)?;
    let ctx = Context::default();
    for (name, spec) in specs {
        let unit = parse_units(&ctx, &spec.unit)
            .map_err(|err| format!("unit of '{}': {}", name, err))?;
        let var = Variable {
            unit,
            is_bool: spec.is_bool,
            constant: spec.constant,
            scalar: spec.scalar,
            value: spec.value,
        };
        debug!(var = name.as_str(), %unit, "loaded variable");
        env.variables.insert(name, var);
    }
    Ok(env)
}

fn run(args: Args) -> CliResult<()> {
    match args.command {
        Command::Render {
            target,
            code,
            input,
        } => {
            let kind: RendererKind = target.parse()?;
            let output = if code {
                render_code(kind, &read(Path::new(&input))?)?
            } else {
                render_expr(kind, &input)?
            };
            println!("{output}");
        }
        Command::Simplify { expr } => {
            println!("{}", simplify(&expr)?);
        }
        Command::Deps {
            path,
            known_vars,
            known_funcs,
        } => {
            let known_vars: BTreeSet<String> = known_vars.into_iter().collect();
            let known_funcs: BTreeSet<String> = known_funcs.into_iter().collect();
            let deps = abstract_code_dependencies(&read(&path)?, &known_vars, &known_funcs)?;
            println!("{}", serde_json::to_string_pretty(&deps)?);
        }
        Command::Units { expr, vars } => {
            let env = load_environment(vars.as_deref())?;
            println!("{}", parse_expression_unit(&expr, &env)?);
        }
        Command::IsBool { expr, vars } => {
            let env = load_environment(vars.as_deref())?;
            println!("{}", is_boolean_expression(&expr, &env)?);
        }
        Command::Value { expr, vars } => {
            let env = load_environment(vars.as_deref())?;
            println!("{}", get_value_from_expression(&expr, &env)?);
        }
        Command::Inline { path, functions } => {
            let funcs = extract_abstract_code_functions(&read(&functions)?)?;
            let funcs: Vec<_> = funcs.into_values().collect();
            println!("{}", substitute_abstract_code_functions(&read(&path)?, &funcs)?);
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(args) {
        die!("error: {}", err);
    }
}
