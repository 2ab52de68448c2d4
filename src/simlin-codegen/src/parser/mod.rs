// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Hand-written recursive descent parser for abstract code.
//!
//! Expressions follow the precedence of the host syntax:
//! `or` < `and` < `not` < comparisons < `+ -` < `* / %` < unary `+ -` < `**`.
//! Statements are `target = expr` or an augmented assignment, one per line.
//! Function definitions are restricted to positional parameters and a body
//! of assignments followed by at most one `return`.

use crate::ast::{AssignOp, BinaryOp, BoolOp, CmpOp, Expr, Loc, Statement, UnaryOp};
use crate::common::{Error, ErrorCode, Result};
use crate::token::{Lexer, LexerType, Spanned, Token};

#[cfg(test)]
mod tests;

/// Parser state holding tokenized input
struct Parser<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
    is_rendered: bool,
}

impl<'input> Parser<'input> {
    /// Create a new parser from a lexer, collecting all tokens up front.
    /// Returns an error if the lexer produces any errors.
    fn new(lexer: Lexer<'input>, lexer_type: LexerType) -> Result<Self> {
        let tokens = lexer.collect::<Result<Vec<_>>>()?;
        Ok(Parser {
            tokens,
            pos: 0,
            is_rendered: lexer_type == LexerType::Rendered,
        })
    }

    /// Peek at the current token without consuming it
    fn peek(&self) -> Option<Token<'input>> {
        self.tokens.get(self.pos).map(|(_, tok, _)| *tok)
    }

    fn peek_nth(&self, n: usize) -> Option<Token<'input>> {
        self.tokens.get(self.pos + n).map(|(_, tok, _)| *tok)
    }

    /// Advance to the next token and return the consumed token
    fn advance(&mut self) -> Option<Spanned<Token<'input>>> {
        let tok = self.tokens.get(self.pos).copied();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Get the position for EOF errors
    fn eof_position(&self) -> usize {
        if let Some((_, _, end)) = self.tokens.last() {
            *end
        } else {
            0
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// the error for whatever token (or lack of token) is at the cursor
    fn unexpected(&self) -> Error {
        match self.tokens.get(self.pos) {
            Some((start, _, end)) => Error::syntax(ErrorCode::UnrecognizedToken, Loc::new(*start, *end)),
            None => {
                let pos = self.eof_position();
                Error::syntax(ErrorCode::UnrecognizedEof, Loc::new(pos, pos + 1))
            }
        }
    }

    fn unsupported(&self, what: &str) -> Error {
        let mut err = self.unexpected();
        err.code = ErrorCode::UnsupportedSyntax;
        err.with_details(format!("{what} not supported"))
    }

    /// Expect the current token to match, returning an error if not
    fn expect(&mut self, expected: Token<'static>) -> Result<Spanned<Token<'input>>> {
        if self.peek() == Some(expected) {
            self.advance().ok_or_else(|| self.unexpected())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<&'input str>> {
        match self.tokens.get(self.pos) {
            Some(&(l, Token::Ident(id), r)) => {
                self.pos += 1;
                Ok((l, id, r))
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Check for extra tokens after a complete construct
    fn expect_end(&self) -> Result<()> {
        if let Some((start, tok, end)) = self.tokens.get(self.pos) {
            let loc = Loc::new(*start, *end);
            let err = match tok {
                Token::LBracket => Error::syntax(ErrorCode::UnsupportedSyntax, loc)
                    .with_details("subscripts and slices not supported".to_owned()),
                Token::Dot => Error::syntax(ErrorCode::UnsupportedSyntax, loc)
                    .with_details("attribute access not supported".to_owned()),
                _ => Error::syntax(ErrorCode::ExtraToken, loc),
            };
            return Err(err);
        }
        Ok(())
    }

    fn parse_equation(&mut self) -> Result<Expr> {
        if self.is_at_end() {
            return Err(Error::syntax(ErrorCode::EmptyEquation, Loc::default()));
        }
        let expr = self.parse_expr()?;
        self.expect_end()?;
        Ok(expr)
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        let (_, target, _) = self.expect_ident()?;
        let op = match self.peek() {
            Some(Token::Assign) => AssignOp::Assign,
            Some(Token::PlusAssign) => AssignOp::Augmented(BinaryOp::Add),
            Some(Token::MinusAssign) => AssignOp::Augmented(BinaryOp::Sub),
            Some(Token::MulAssign) => AssignOp::Augmented(BinaryOp::Mul),
            Some(Token::DivAssign) => AssignOp::Augmented(BinaryOp::Div),
            Some(Token::ModAssign) => AssignOp::Augmented(BinaryOp::Mod),
            Some(Token::ExpAssign) => AssignOp::Augmented(BinaryOp::Pow),
            Some(Token::LBracket) => return Err(self.unsupported("assignment to a subscript")),
            Some(Token::Dot) => return Err(self.unsupported("assignment to an attribute")),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        let value = self.parse_equation()?;
        Ok(Statement {
            target: target.to_owned(),
            op,
            value,
        })
    }

    /// Parse a top-level expression
    fn parse_expr(&mut self) -> Result<Expr> {
        if let Some(Token::Reserved("lambda")) = self.peek() {
            return Err(self.unsupported("lambda"));
        }
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.parse_logical(BoolOp::Or, Token::Or, Token::OrOr, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.parse_logical(BoolOp::And, Token::And, Token::AndAnd, Self::parse_not)
    }

    /// a chain of `op`-joined operands becomes a single Logical node
    fn parse_logical(
        &mut self,
        op: BoolOp,
        word: Token<'static>,
        symbol: Token<'static>,
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let first = next(self)?;
        let mut operands = vec![];
        loop {
            match self.peek() {
                Some(tok) if tok == word || (self.is_rendered && tok == symbol) => {
                    self.advance();
                    operands.push(next(self)?);
                }
                _ => break,
            }
        }

        if operands.is_empty() {
            return Ok(first);
        }
        operands.insert(0, first);
        let loc = operands[0].get_loc().union(&operands[operands.len() - 1].get_loc());
        Ok(Expr::Logical(op, operands, loc))
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.peek() == Some(Token::Not) {
            let (lpos, _, _) = self.advance().ok_or_else(|| self.unexpected())?;
            let operand = self.parse_not()?;
            let rpos = operand.get_loc().end as usize;
            return Ok(Expr::Op1(UnaryOp::Not, Box::new(operand), Loc::new(lpos, rpos)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_bitor()?;
        let mut rest = vec![];

        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CmpOp::Lt,
                Some(Token::Lte) => CmpOp::Lte,
                Some(Token::Gt) => CmpOp::Gt,
                Some(Token::Gte) => CmpOp::Gte,
                Some(Token::EqEq) => CmpOp::Eq,
                Some(Token::Neq) => CmpOp::Neq,
                Some(Token::Reserved("in")) | Some(Token::Reserved("is")) => {
                    return Err(self.unsupported("membership and identity tests"));
                }
                _ => break,
            };
            self.advance();
            rest.push((op, self.parse_bitor()?));
        }

        if rest.is_empty() {
            return Ok(left);
        }
        let loc = left.get_loc().union(&rest[rest.len() - 1].1.get_loc());
        Ok(Expr::Compare(Box::new(left), rest, loc))
    }

    // the array renderer's `|` and `&` bind tighter than comparisons, and
    // only exist in the rendered dialect.
    fn parse_bitor(&mut self) -> Result<Expr> {
        if !self.is_rendered {
            return self.parse_additive();
        }
        self.parse_logical(BoolOp::Or, Token::Pipe, Token::Pipe, Self::parse_bitand)
    }

    fn parse_bitand(&mut self) -> Result<Expr> {
        self.parse_logical(BoolOp::And, Token::Amp, Token::Amp, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            let loc = left.get_loc().union(&right.get_loc());
            left = Expr::Op2(op, Box::new(left), Box::new(right), loc);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::Mul) => BinaryOp::Mul,
                Some(Token::Div) => BinaryOp::Div,
                Some(Token::Mod) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let loc = left.get_loc().union(&right.get_loc());
            left = Expr::Op2(op, Box::new(left), Box::new(right), loc);
        }

        Ok(left)
    }

    /// Parse unary operators (+, -, and `!` when reading rendered code)
    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Plus) => UnaryOp::Positive,
            Some(Token::Minus) => UnaryOp::Negative,
            Some(Token::Bang) if self.is_rendered => UnaryOp::Not,
            _ => return self.parse_power(),
        };
        let (lpos, _, _) = self.advance().ok_or_else(|| self.unexpected())?;
        let operand = self.parse_unary()?;
        let rpos = operand.get_loc().end as usize;
        Ok(Expr::Op1(op, Box::new(operand), Loc::new(lpos, rpos)))
    }

    /// Parse the right-associative power operator; the exponent may
    /// itself carry a unary sign (`a**-b`).
    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_app()?;

        if self.peek() == Some(Token::Exp) {
            self.advance();
            let exp = self.parse_unary()?;
            let loc = base.get_loc().union(&exp.get_loc());
            return Ok(Expr::Op2(BinaryOp::Pow, Box::new(base), Box::new(exp), loc));
        }

        Ok(base)
    }

    /// Parse function application: id(args)
    fn parse_app(&mut self) -> Result<Expr> {
        let expr = if matches!(self.peek(), Some(Token::Ident(_)))
            && self.peek_nth(1) == Some(Token::LParen)
        {
            let (lpos, name, _) = self.expect_ident()?;
            self.advance(); // consume '('
            let args = self.parse_args()?;
            let (_, _, rpos) = self.expect(Token::RParen)?;
            Expr::App(name.to_owned(), args, Loc::new(lpos, rpos))
        } else {
            self.parse_atom()?
        };

        match self.peek() {
            Some(Token::LBracket) => Err(self.unsupported("subscripts and slices")),
            Some(Token::Dot) => Err(self.unsupported("attribute access")),
            Some(Token::LParen) => Err(self.unsupported("calling the result of an expression")),
            _ => Ok(expr),
        }
    }

    /// Parse an atomic expression (number, identifier, parenthesized expression)
    fn parse_atom(&mut self) -> Result<Expr> {
        let Some((lpos, tok, rpos)) = self.advance() else {
            return Err(self.unexpected());
        };
        match tok {
            Token::Num(s) => match s.parse::<f64>() {
                Ok(n) => Ok(Expr::Const(s.to_string(), n, Loc::new(lpos, rpos))),
                Err(_) => Err(Error::syntax(ErrorCode::ExpectedNumber, Loc::new(lpos, rpos))),
            },
            Token::Ident(s) => Ok(Expr::Var(s.to_owned(), Loc::new(lpos, rpos))),
            Token::True => Ok(Expr::Bool(true, Loc::new(lpos, rpos))),
            Token::False => Ok(Expr::Bool(false, Loc::new(lpos, rpos))),
            Token::LParen => {
                if self.peek() == Some(Token::RParen) {
                    self.pos -= 1;
                    return Err(self.unsupported("tuples"));
                }
                let expr = self.parse_expr()?;
                match self.peek() {
                    Some(Token::RParen) => {
                        self.advance();
                        Ok(expr)
                    }
                    Some(Token::Comma) => Err(self.unsupported("tuples")),
                    Some(Token::Reserved("for")) => Err(self.unsupported("comprehensions")),
                    _ => Err(self.unexpected()),
                }
            }
            Token::LBracket | Token::LBrace => {
                self.pos -= 1;
                Err(self.unsupported("lists, sets and dictionaries"))
            }
            _ => {
                self.pos -= 1;
                Err(self.unexpected())
            }
        }
    }

    /// Parse comma-separated positional arguments
    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();

        while self.peek() != Some(Token::RParen) {
            match (self.peek(), self.peek_nth(1)) {
                (Some(Token::Mul), _) | (Some(Token::Exp), _) => {
                    return Err(self.unsupported("starred arguments"));
                }
                (Some(Token::Ident(_)), Some(Token::Assign)) => {
                    return Err(self.unsupported("keyword arguments"));
                }
                _ => {}
            }
            args.push(self.parse_expr()?);

            match self.peek() {
                Some(Token::Comma) => {
                    self.advance();
                }
                Some(Token::Reserved("for")) => return Err(self.unsupported("comprehensions")),
                _ => break,
            }
        }

        Ok(args)
    }

    /// Parse a `def name(a, b):` header, returning the function name, its
    /// parameters and the byte offset just past the colon.
    fn parse_def_header(&mut self) -> Result<(String, Vec<String>, usize)> {
        self.expect(Token::Def)?;
        let (_, name, _) = self.expect_ident()?;
        self.expect(Token::LParen)?;

        let mut params: Vec<String> = vec![];
        while self.peek() != Some(Token::RParen) {
            match self.peek() {
                Some(Token::Mul) => {
                    return Err(self.bad_def("variable number of arguments"));
                }
                Some(Token::Exp) => {
                    return Err(self.bad_def("arbitrary keyword arguments"));
                }
                _ => {}
            }
            let (l, param, r) = self.expect_ident()?;
            match self.peek() {
                Some(Token::Assign) => return Err(self.bad_def("default values")),
                Some(Token::Colon) => return Err(self.bad_def("annotations")),
                _ => {}
            }
            if params.iter().any(|p| p == param) {
                return Err(Error::syntax(ErrorCode::DuplicateArgument, Loc::new(l, r))
                    .with_details(format!("duplicate argument '{param}' in '{name}'")));
            }
            params.push(param.to_owned());

            if self.peek() == Some(Token::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(Token::RParen)?;
        if self.peek() == Some(Token::Minus) {
            return Err(self.bad_def("return annotations"));
        }
        let (_, _, colon_end) = self.expect(Token::Colon)?;

        Ok((name.to_owned(), params, colon_end))
    }

    fn bad_def(&self, what: &str) -> Error {
        let mut err = self.unexpected();
        err.code = ErrorCode::BadFunctionDef;
        err.with_details(format!("no support for {what} in function definitions"))
    }
}

/// Parse an expression string into an AST.
pub fn parse(input: &str, lexer_type: LexerType) -> Result<Expr> {
    let lexer = Lexer::new(input, lexer_type);
    let mut parser = Parser::new(lexer, lexer_type)?;
    parser.parse_equation()
}

/// Parse an expression in the restricted source grammar.
pub fn parse_expr(input: &str) -> Result<Expr> {
    parse(input, LexerType::Equation)
}

/// Parse a single `target = expr` (or augmented assignment) line.
pub fn parse_statement(line: &str) -> Result<Statement> {
    let lexer = Lexer::new(line, LexerType::Equation);
    let mut parser = Parser::new(lexer, LexerType::Equation)?;
    parser.parse_statement()
}

/// Parse a block of abstract code, one statement per line.  Common
/// indentation is removed and blank lines and comments are skipped.
pub fn parse_code(code: &str) -> Result<Vec<Statement>> {
    let code = deindent(code);
    code.lines()
        .enumerate()
        .filter(|(_, line)| !is_blank(line))
        .map(|(i, line)| parse_statement(line).map_err(|err| with_line(err, i, line)))
        .collect()
}

fn with_line(err: Error, i: usize, line: &str) -> Error {
    let details = match err.details {
        Some(ref details) => format!("line {}: '{}': {}", i + 1, line.trim(), details),
        None => format!("line {}: '{}'", i + 1, line.trim()),
    };
    err.with_details(details)
}

fn is_blank(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

/// indentation is measured in ASCII spaces and tabs, so it is always a
/// valid byte offset into the line.  Other leading whitespace is left for
/// the lexer to skip.
fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches([' ', '\t']).len()
}

/// deindent removes the whitespace shared by the start of every
/// non-blank line.
pub fn deindent(code: &str) -> String {
    let common = code
        .lines()
        .filter(|line| !is_blank(line))
        .map(indentation)
        .min()
        .unwrap_or(0);

    code.lines()
        .map(|line| if is_blank(line) { "" } else { &line[common..] })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A line in the body of a function definition.
#[derive(PartialEq, Clone, Debug)]
pub(crate) enum BodyLine {
    Statement(Statement),
    Return(Option<Expr>),
}

/// The parsed form of a `def` block, before it is validated into
/// abstract code.
#[derive(PartialEq, Clone, Debug)]
pub(crate) struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<BodyLine>,
}

fn parse_body_line(line: &str) -> Result<BodyLine> {
    let lexer = Lexer::new(line, LexerType::Equation);
    let mut parser = Parser::new(lexer, LexerType::Equation)?;
    match parser.peek() {
        Some(Token::Return) => {
            parser.advance();
            if parser.is_at_end() {
                Ok(BodyLine::Return(None))
            } else {
                Ok(BodyLine::Return(Some(parser.parse_equation()?)))
            }
        }
        Some(Token::Def) => Err(parser.bad_def("nested functions")),
        Some(Token::Reserved(word)) => Err(parser.bad_def(&format!("'{word}' statements"))),
        Some(Token::Ident(_)) => Ok(BodyLine::Statement(parser.parse_statement()?)),
        _ => Err(parser.unexpected()),
    }
}

/// Parse a source block into the function definitions it contains.
/// Top-level lines that aren't part of a `def` are skipped.
pub(crate) fn parse_function_defs(source: &str) -> Result<Vec<FunctionDef>> {
    let source = deindent(source);
    let lines: Vec<&str> = source.lines().collect();
    let mut defs = vec![];

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if is_blank(line) || indentation(line) > 0 || !starts_with_def(line) {
            i += 1;
            continue;
        }

        let (name, params, colon_end) =
            parse_def_header(line).map_err(|err| with_line(err, i, line))?;

        let mut body = vec![];
        // `def f(x): return x` keeps its body on the header line
        let rest = &line[colon_end..];
        if !is_blank(rest) {
            body.push(parse_body_line(rest).map_err(|err| with_line(err, i, line))?);
        }
        i += 1;
        while i < lines.len() && (is_blank(lines[i]) || indentation(lines[i]) > 0) {
            if !is_blank(lines[i]) {
                body.push(parse_body_line(lines[i]).map_err(|err| with_line(err, i, lines[i]))?);
            }
            i += 1;
        }

        defs.push(FunctionDef { name, params, body });
    }

    Ok(defs)
}

fn parse_def_header(line: &str) -> Result<(String, Vec<String>, usize)> {
    let lexer = Lexer::new(line, LexerType::Equation);
    let mut parser = Parser::new(lexer, LexerType::Equation)?;
    parser.parse_def_header()
}

fn starts_with_def(line: &str) -> bool {
    line.strip_prefix("def")
        .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}
