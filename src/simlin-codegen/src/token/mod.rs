// Copyright 2025 The Simlin Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

// derived from both the LALRPOP whitespace tokenizer, and LALRPOP's
// internal tokenizer

use std::str::CharIndices;

use lazy_static::lazy_static;
use unicode_xid::UnicodeXID;

use self::Token::*;
use crate::common::ErrorCode::*;
use crate::common::{Error, ErrorCode, Loc};

#[cfg(test)]
mod test;

/// LexerType selects the surface syntax being tokenized.  `Equation` is
/// the restricted source grammar users write; `Rendered` additionally
/// accepts the operators our array and C++ renderers emit so that their
/// output can be read back in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LexerType {
    Equation,
    Rendered,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'input> {
    Def,
    Return,
    And,
    Or,
    Not,
    True,
    False,
    Reserved(&'input str),
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Exp,
    Lt,
    Lte,
    Gt,
    Gte,
    EqEq,
    Neq,
    Assign,
    PlusAssign,
    MinusAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    ExpAssign,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Ident(&'input str),
    Num(&'input str),
}

fn error<T>(code: ErrorCode, start: usize, end: usize) -> Result<T, Error> {
    Err(Error::syntax(code, Loc::new(start, end)))
}

pub type Spanned<T> = (usize, T, usize);

pub struct Lexer<'input> {
    text: &'input str,
    chars: CharIndices<'input>,
    lookahead: Option<(usize, char)>,
    is_rendered: bool,
}

const KEYWORDS: &[(&str, Token<'static>)] = &[
    ("def", Def),
    ("return", Return),
    ("and", And),
    ("or", Or),
    ("not", Not),
    ("True", True),
    ("False", False),
];

// words with a meaning in the host syntax that our grammar doesn't
// accept; lexing them as keywords keeps `lambda x: x` from being read
// as an identifier followed by junk.
const RESERVED: &[&str] = &[
    "lambda", "if", "else", "elif", "for", "while", "in", "is", "None", "import", "from",
    "class", "pass", "yield", "with", "as", "del", "global", "nonlocal", "assert", "break",
    "continue", "try", "except", "finally", "raise", "async", "await",
];

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str, lexer_type: LexerType) -> Self {
        let mut t = Lexer {
            text: input,
            chars: input.char_indices(),
            lookahead: None,
            is_rendered: matches!(lexer_type, LexerType::Rendered),
        };
        t.bump();
        t
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.bump_n(1)
    }

    fn bump_n(&mut self, n: usize) -> Option<(usize, char)> {
        assert!(n > 0);
        self.lookahead = self.chars.nth(n - 1);
        self.lookahead
    }

    fn word(&mut self, idx0: usize) -> Spanned<&'input str> {
        match self.take_while(is_identifier_continue) {
            Some(end) => (idx0, &self.text[idx0..end], end),
            None => (idx0, &self.text[idx0..], self.text.len()),
        }
    }

    fn take_while<F>(&mut self, mut keep_going: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        self.take_until(|c| !keep_going(c))
    }

    fn take_until<F>(&mut self, mut terminate: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        loop {
            match self.lookahead {
                None => {
                    return None;
                }
                Some((idx1, c)) => {
                    if terminate(c) {
                        return Some(idx1);
                    } else {
                        self.bump();
                    }
                }
            }
        }
    }

    fn identifierish(&mut self, idx0: usize) -> Spanned<Token<'input>> {
        let (start, word, end) = self.word(idx0);

        let tok = KEYWORDS
            .iter()
            .filter(|&&(w, _)| w == word)
            .map(|(_, t)| *t)
            .next()
            .unwrap_or_else(|| {
                if self.is_rendered && word == "true" {
                    True
                } else if self.is_rendered && word == "false" {
                    False
                } else if RESERVED.contains(&word) {
                    Reserved(word)
                } else {
                    Ident(word)
                }
            });

        (start, tok, end)
    }

    fn number(&mut self, idx0: usize) -> Spanned<Token<'input>> {
        use regex::Regex;

        lazy_static! {
            static ref NUMBER_RE: Regex =
                Regex::new(r"^(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?").unwrap();
        }

        // is_number_start guarantees at least one digit is matched
        let len = NUMBER_RE
            .find(&self.text[idx0..])
            .map(|m| m.end())
            .unwrap_or(1);

        self.bump_n(len);

        let end = idx0 + len;
        (idx0, Num(&self.text[idx0..end]), end)
    }

    fn is_number_start(&self, i: usize, c: char) -> bool {
        c.is_ascii_digit()
            || (c == '.'
                && self.text[i + 1..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit()))
    }

    #[allow(clippy::unnecessary_wraps)]
    fn consume(
        &mut self,
        i: usize,
        tok: Token<'input>,
        len: usize,
    ) -> Option<Result<Spanned<Token<'input>>, Error>> {
        self.bump();
        Some(Ok((i, tok, i + len)))
    }

    /// an operator that may be followed by `=` to form an augmented
    /// assignment (`+=`).  The first character has been peeked but not
    /// consumed.
    fn maybe_assign(
        &mut self,
        i: usize,
        tok: Token<'input>,
        assign: Token<'input>,
    ) -> Option<Result<Spanned<Token<'input>>, Error>> {
        match self.bump() {
            Some((_, '=')) => self.consume(i, assign, 2),
            // we've already bumped, don't consume
            _ => Some(Ok((i, tok, i + 1))),
        }
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Result<Spanned<Token<'input>>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.lookahead {
                Some((i, '+')) => self.maybe_assign(i, Plus, PlusAssign),
                Some((i, '-')) => self.maybe_assign(i, Minus, MinusAssign),
                Some((i, '/')) => self.maybe_assign(i, Div, DivAssign),
                Some((i, '%')) => self.maybe_assign(i, Mod, ModAssign),
                Some((i, '*')) => match self.bump() {
                    Some((_, '*')) => self.maybe_assign(i, Exp, ExpAssign).map(|r| {
                        // maybe_assign measured from the second '*'
                        r.map(|(start, tok, end)| (start, tok, end + 1))
                    }),
                    Some((_, '=')) => self.consume(i, MulAssign, 2),
                    _ => Some(Ok((i, Mul, i + 1))),
                },
                Some((i, '=')) => match self.bump() {
                    Some((_, '=')) => self.consume(i, EqEq, 2),
                    _ => Some(Ok((i, Assign, i + 1))),
                },
                Some((i, '<')) => match self.bump() {
                    Some((_, '=')) => self.consume(i, Lte, 2),
                    _ => Some(Ok((i, Lt, i + 1))),
                },
                Some((i, '>')) => match self.bump() {
                    Some((_, '=')) => self.consume(i, Gte, 2),
                    _ => Some(Ok((i, Gt, i + 1))),
                },
                Some((i, '!')) => match self.bump() {
                    Some((_, '=')) => self.consume(i, Neq, 2),
                    _ if self.is_rendered => Some(Ok((i, Bang, i + 1))),
                    _ => Some(error(UnrecognizedToken, i, i + 1)),
                },
                Some((i, '&')) if self.is_rendered => match self.bump() {
                    Some((_, '&')) => self.consume(i, AndAnd, 2),
                    _ => Some(Ok((i, Amp, i + 1))),
                },
                Some((i, '|')) if self.is_rendered => match self.bump() {
                    Some((_, '|')) => self.consume(i, OrOr, 2),
                    _ => Some(Ok((i, Pipe, i + 1))),
                },
                Some((i, '(')) => self.consume(i, LParen, 1),
                Some((i, ')')) => self.consume(i, RParen, 1),
                Some((i, '[')) => self.consume(i, LBracket, 1),
                Some((i, ']')) => self.consume(i, RBracket, 1),
                Some((i, '{')) => self.consume(i, LBrace, 1),
                Some((i, '}')) => self.consume(i, RBrace, 1),
                Some((i, ',')) => self.consume(i, Comma, 1),
                Some((i, ':')) => self.consume(i, Colon, 1),
                Some((_, '#')) => {
                    // comments run to the end of the line
                    self.take_until(|c| c == '\n');
                    continue;
                }
                Some((i, c)) if self.is_number_start(i, c) => Some(Ok(self.number(i))),
                Some((i, '.')) => self.consume(i, Dot, 1),
                Some((i, c)) if is_identifier_start(c) => Some(Ok(self.identifierish(i))),
                Some((i, '\n' | '\r')) => {
                    // expressions and statements are a single line
                    self.bump();
                    Some(error(UnsupportedSyntax, i, i + 1))
                }
                Some((_, c)) if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                Some((i, _)) => {
                    self.bump(); // eat whatever is killing us
                    let end = match self.lookahead {
                        Some((end, _)) => end,
                        None => self.text.len(),
                    };
                    Some(error(InvalidToken, i, end))
                }
                None => None,
            };
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    UnicodeXID::is_xid_start(c) || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    UnicodeXID::is_xid_continue(c)
}
