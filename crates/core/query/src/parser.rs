//! qastle text parser.
//!
//! The grammar is the one [`Expr`]'s `Display` emits: atoms (names, numbers, `True`/`False`,
//! single-quoted strings) and parenthesised forms whose head names the node kind. A `chumsky`
//! lexer and s-expression grammar produce a tree of forms, which is then checked form by form
//! into an [`Expr`].

use std::{fmt, ops::Range};

use chumsky::{Stream, prelude::*};

use crate::ast::{BinOp, Expr, UnaryOp};

/// Deepest form nesting accepted.
///
/// Parsing recurses once per level, so unbounded nesting would exhaust the stack.
pub const MAX_DEPTH: usize = 64;

type Span = Range<usize>;

/// Parses a complete qastle expression.
///
/// Leading and trailing whitespace is ignored; anything else after the first expression is an
/// error.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let tokens = lexer().parse(input).map_err(lex_error)?;
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }
    check_tokens(&tokens)?;

    let eoi = input.len()..input.len();
    let (sexp, trailing) = sexp_parser()
        .parse(Stream::from_iter(eoi, tokens.into_iter()))
        .map_err(syntax_error)?;
    if let Some(&offset) = trailing.first() {
        return Err(ParseError::TrailingInput { offset });
    }
    sexp.into_expr()
}

/// Errors produced while parsing qastle text.
///
/// Offsets are byte offsets into the parsed input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Input contains no expression at all
    #[error("query is empty")]
    Empty,

    /// Input ended inside a form
    #[error("unexpected end of query, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// A token that cannot appear at this position
    #[error("unexpected '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        offset: usize,
        found: String,
        expected: &'static str,
    },

    /// String literal missing its closing quote
    #[error("unterminated string literal starting at offset {offset}")]
    UnterminatedString { offset: usize },

    /// Forms nested deeper than [`MAX_DEPTH`]
    #[error("form at offset {offset} is nested deeper than {limit} levels")]
    TooDeep { offset: usize, limit: usize },

    /// Form head that is not a known node kind
    #[error("unknown form '{head}' at offset {offset}")]
    UnknownForm { offset: usize, head: String },

    /// Form with the wrong number of operands
    #[error("'{form}' at offset {offset} takes {expected} operand(s), found {found}")]
    Arity {
        offset: usize,
        form: String,
        expected: &'static str,
        found: usize,
    },

    /// Extra input after a complete expression
    #[error("unexpected input after the query at offset {offset}")]
    TrailingInput { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Open,
    Close,
    Str(String),
    /// A string literal that runs to the end of the input
    Unterminated,
    Atom(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Open => f.write_str("("),
            Token::Close => f.write_str(")"),
            Token::Str(value) => write!(f, "{}", Expr::Str(value.clone())),
            Token::Unterminated => f.write_str("'"),
            Token::Atom(atom) => f.write_str(atom),
        }
    }
}

fn lexer() -> impl Parser<char, Vec<(Token, Span)>, Error = Simple<char>> {
    let escaped = just('\\').ignore_then(any());
    let string = just('\'')
        .ignore_then(
            escaped
                .or(filter(|c: &char| !matches!(*c, '\'' | '\\')))
                .repeated()
                .collect::<String>(),
        )
        .then(just('\'').or_not())
        .map(|(value, close)| match close {
            Some(_) => Token::Str(value),
            None => Token::Unterminated,
        });

    let atom = filter(|c: &char| !c.is_whitespace() && !matches!(*c, '(' | ')' | '\''))
        .repeated()
        .at_least(1)
        .collect::<String>()
        .map(Token::Atom);

    choice::<_, Simple<char>>((
        just('(').to(Token::Open),
        just(')').to(Token::Close),
        string,
        atom,
    ))
    .map_with_span(|token, span| (token, span))
    .padded()
    .repeated()
    .then_ignore(end())
}

/// Rejects unterminated strings and over-deep nesting before the recursive grammar runs.
fn check_tokens(tokens: &[(Token, Span)]) -> Result<(), ParseError> {
    let mut depth = 0usize;
    for (token, span) in tokens {
        match token {
            Token::Open => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return Err(ParseError::TooDeep {
                        offset: span.start,
                        limit: MAX_DEPTH,
                    });
                }
            }
            Token::Close => depth = depth.saturating_sub(1),
            Token::Unterminated => {
                return Err(ParseError::UnterminatedString { offset: span.start });
            }
            Token::Str(_) | Token::Atom(_) => {}
        }
    }
    Ok(())
}

/// An s-expression before its forms are checked.
#[derive(Debug, Clone)]
enum Sexp {
    Atom(String),
    Str(String),
    Form { items: Vec<Sexp>, offset: usize },
}

/// One expression, followed by the offsets of any tokens after it.
fn sexp_parser() -> impl Parser<Token, (Sexp, Vec<usize>), Error = Simple<Token>> {
    let sexp = recursive(|sexp| {
        let atom = select! { Token::Atom(text) => Sexp::Atom(text) };
        let string = select! { Token::Str(value) => Sexp::Str(value) };
        let form = sexp
            .repeated()
            .delimited_by(just(Token::Open), just(Token::Close))
            .map_with_span(|items, span: Span| Sexp::Form {
                items,
                offset: span.start,
            });
        choice::<_, Simple<Token>>((atom, string, form))
    });

    let trailing = any().map_with_span(|_, span: Span| span.start).repeated();
    sexp.then(trailing).then_ignore(end())
}

fn lex_error(errors: Vec<Simple<char>>) -> ParseError {
    // Every character starts some token, so this only reports what chumsky rejected first.
    match errors.into_iter().next() {
        Some(err) => ParseError::UnexpectedToken {
            offset: err.span().start,
            found: err.found().map(char::to_string).unwrap_or_default(),
            expected: "a token",
        },
        None => ParseError::Empty,
    }
}

fn syntax_error(errors: Vec<Simple<Token>>) -> ParseError {
    match errors.into_iter().next() {
        // Input can only run out inside an open form.
        Some(err) if err.found().is_none() => ParseError::UnexpectedEnd { expected: "')'" },
        Some(err) => ParseError::UnexpectedToken {
            offset: err.span().start,
            found: err.found().map(Token::to_string).unwrap_or_default(),
            expected: "an expression",
        },
        None => ParseError::UnexpectedEnd {
            expected: "an expression",
        },
    }
}

impl Sexp {
    fn into_expr(self) -> Result<Expr, ParseError> {
        match self {
            Sexp::Atom(atom) => Ok(atom_expr(atom)),
            Sexp::Str(value) => Ok(Expr::Str(value)),
            Sexp::Form { items, offset } => form_expr(items, offset),
        }
    }
}

impl fmt::Display for Sexp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexp::Atom(atom) => f.write_str(atom),
            Sexp::Str(value) => write!(f, "{}", Expr::Str(value.clone())),
            Sexp::Form { items, .. } => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
        }
    }
}

fn form_expr(items: Vec<Sexp>, offset: usize) -> Result<Expr, ParseError> {
    let mut items = items.into_iter();
    let head = match items.next() {
        Some(Sexp::Atom(atom)) => atom,
        Some(other) => {
            return Err(ParseError::UnexpectedToken {
                offset,
                found: other.to_string(),
                expected: "a form name",
            });
        }
        None => {
            return Err(ParseError::UnexpectedToken {
                offset,
                found: ")".to_string(),
                expected: "a form name",
            });
        }
    };

    let arity = |expected: &'static str, found: usize| ParseError::Arity {
        offset,
        form: head.clone(),
        expected,
        found,
    };

    let mut operands = items
        .map(Sexp::into_expr)
        .collect::<Result<Vec<_>, _>>()?;
    let expr = match head.as_str() {
        "list" => Expr::List(operands),
        "call" => {
            if operands.is_empty() {
                return Err(arity("at least 1", 0));
            }
            let func = operands.remove(0);
            Expr::Call {
                func: Box::new(func),
                args: operands,
            }
        }
        "attr" => {
            let [target, name] = exactly::<2>(operands).map_err(|n| arity("2", n))?;
            let Expr::Str(name) = name else {
                return Err(ParseError::UnexpectedToken {
                    offset,
                    found: name.to_string(),
                    expected: "a quoted attribute name",
                });
            };
            Expr::Attr {
                target: Box::new(target),
                name,
            }
        }
        "lambda" => {
            let [params, body] = exactly::<2>(operands).map_err(|n| arity("2", n))?;
            Expr::Lambda {
                params: lambda_params(params, offset)?,
                body: Box::new(body),
            }
        }
        "subscript" => {
            let [target, index] = exactly::<2>(operands).map_err(|n| arity("2", n))?;
            Expr::Subscript {
                target: Box::new(target),
                index: Box::new(index),
            }
        }
        "if" => {
            let [test, body, orelse] = exactly::<3>(operands).map_err(|n| arity("3", n))?;
            Expr::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            }
        }
        "not" => {
            let [operand] = exactly::<1>(operands).map_err(|n| arity("1", n))?;
            Expr::UnaryOp {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            }
        }
        // `-` is negation with one operand and subtraction with two.
        "-" if operands.len() == 1 => Expr::UnaryOp {
            op: UnaryOp::Neg,
            operand: Box::new(operands.remove(0)),
        },
        symbol => match BinOp::from_symbol(symbol) {
            Some(op) => {
                let [lhs, rhs] = exactly::<2>(operands).map_err(|n| arity("2", n))?;
                Expr::BinOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                }
            }
            None => {
                return Err(ParseError::UnknownForm {
                    offset,
                    head: head.clone(),
                });
            }
        },
    };
    Ok(expr)
}

/// Converts the operand list into an array, or returns the operand count on mismatch.
fn exactly<const N: usize>(operands: Vec<Expr>) -> Result<[Expr; N], usize> {
    let found = operands.len();
    operands.try_into().map_err(|_| found)
}

fn lambda_params(params: Expr, offset: usize) -> Result<Vec<String>, ParseError> {
    let Expr::List(items) = params else {
        return Err(ParseError::UnexpectedToken {
            offset,
            found: params.to_string(),
            expected: "a (list ...) of lambda parameters",
        });
    };

    items
        .into_iter()
        .map(|item| match item {
            Expr::Name(name) => Ok(name),
            other => Err(ParseError::UnexpectedToken {
                offset,
                found: other.to_string(),
                expected: "a lambda parameter name",
            }),
        })
        .collect()
}

fn atom_expr(atom: String) -> Expr {
    match atom.as_str() {
        "True" => return Expr::Bool(true),
        "False" => return Expr::Bool(false),
        "inf" | "+inf" => return Expr::Float(f64::INFINITY),
        "-inf" => return Expr::Float(f64::NEG_INFINITY),
        "nan" | "NaN" => return Expr::Float(f64::NAN),
        _ => {}
    }

    // Only atoms that start like a number are numbers.
    let digits = atom.strip_prefix(['-', '+']).unwrap_or(&atom);
    if digits.starts_with(|c: char| c.is_ascii_digit()) {
        if let Ok(value) = atom.parse::<i64>() {
            return Expr::Int(value);
        }
        if let Ok(value) = atom.parse::<f64>() {
            return Expr::Float(value);
        }
    }

    Expr::Name(atom)
}
