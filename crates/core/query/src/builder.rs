//! Fluent query builder.
//!
//! Mirrors the `func_adl` style of writing ServiceX queries: start from an [`EventDataset`],
//! chain `select`/`select_many`/`where_` steps, and finish with a result operator. Every step
//! wraps the query built so far in a `(call <Operator> <query> <args>...)` node, so the output is
//! exactly the qastle a hand-written query would contain.

use std::{
    fmt,
    ops::{Add, Div, Mul, Neg, Not, Sub},
};

use crate::{
    ast::{BinOp, Expr, UnaryOp},
    parser::{ParseError, parse},
};

/// A bare name, e.g. a lambda parameter.
pub fn name(id: impl Into<String>) -> Expr {
    Expr::Name(id.into())
}

/// A lambda taking `params` and evaluating `body`.
pub fn lambda<I>(params: I, body: Expr) -> Expr
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    Expr::Lambda {
        params: params.into_iter().map(Into::into).collect(),
        body: Box::new(body),
    }
}

/// A `(list ...)` node, qastle's encoding of tuples and sequences.
pub fn list(items: impl IntoIterator<Item = Expr>) -> Expr {
    Expr::List(items.into_iter().collect())
}

impl Expr {
    /// Attribute access, `target.name`.
    pub fn attr(self, name: impl Into<String>) -> Expr {
        Expr::Attr {
            target: Box::new(self),
            name: name.into(),
        }
    }

    /// Call `self` with `args`.
    pub fn call(self, args: Vec<Expr>) -> Expr {
        Expr::Call {
            func: Box::new(self),
            args,
        }
    }

    /// Method call, `target.name(args...)`.
    pub fn method(self, name: impl Into<String>, args: Vec<Expr>) -> Expr {
        self.attr(name).call(args)
    }

    /// Indexing, `target[index]`.
    pub fn index(self, index: impl Into<Expr>) -> Expr {
        Expr::Subscript {
            target: Box::new(self),
            index: Box::new(index.into()),
        }
    }

    pub fn binop(self, op: BinOp, rhs: impl Into<Expr>) -> Expr {
        Expr::BinOp {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs.into()),
        }
    }

    pub fn equals(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinOp::Eq, rhs)
    }

    pub fn gt(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinOp::Gt, rhs)
    }

    pub fn ge(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinOp::GtE, rhs)
    }

    pub fn lt(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinOp::Lt, rhs)
    }

    pub fn le(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinOp::LtE, rhs)
    }

    pub fn and(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinOp::And, rhs)
    }

    pub fn or(self, rhs: impl Into<Expr>) -> Expr {
        self.binop(BinOp::Or, rhs)
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;

            fn $method(self, rhs: R) -> Expr {
                self.binop($op, rhs)
            }
        }
    };
}

impl_binop!(Add, add, BinOp::Add);
impl_binop!(Sub, sub, BinOp::Sub);
impl_binop!(Mul, mul, BinOp::Mul);
impl_binop!(Div, div, BinOp::Div);

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOp::Neg,
            operand: Box::new(self),
        }
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::UnaryOp {
            op: UnaryOp::Not,
            operand: Box::new(self),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Float(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Int(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Int(value.into())
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Bool(value)
    }
}

/// String conversions produce string *literals*; use [`name`] for identifiers.
impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::Str(value.to_string())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Expr::Str(value)
    }
}

/// Entry point of a fluent query.
pub struct EventDataset;

impl EventDataset {
    /// Starts a query over the events of the given dataset URLs.
    ///
    /// Renders as `(call EventDataset (list 'url'...))`.
    #[expect(clippy::new_ret_no_self)]
    pub fn new<I>(urls: I) -> ObjectStream
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let urls = urls.into_iter().map(|url| Expr::Str(url.into()));
        ObjectStream {
            expr: name("EventDataset").call(vec![list(urls)]),
        }
    }
}

/// A query that still yields a stream of objects and can be extended.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectStream {
    expr: Expr,
}

impl ObjectStream {
    /// Maps every element through `func`.
    pub fn select(self, func: Expr) -> Self {
        self.operator("Select", vec![func])
    }

    /// Maps every element to a sequence and flattens the result.
    pub fn select_many(self, func: Expr) -> Self {
        self.operator("SelectMany", vec![func])
    }

    /// Keeps the elements for which `predicate` is true.
    pub fn where_(self, predicate: Expr) -> Self {
        self.operator("Where", vec![predicate])
    }

    /// Writes the named columns to a ROOT `TTree`.
    pub fn as_root_tree<I>(self, columns: I, tree: &str, file: &str) -> Query
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let stream = self.operator(
            "ResultTTree",
            vec![column_list(columns), Expr::from(tree), Expr::from(file)],
        );
        Query { expr: stream.expr }
    }

    /// Writes the named columns to Parquet files.
    pub fn as_parquet_files<I>(self, file: &str, columns: I) -> Query
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let stream = self.operator("ResultParquet", vec![column_list(columns), Expr::from(file)]);
        Query { expr: stream.expr }
    }

    /// Returns the named columns as an awkward array.
    pub fn as_awkward_array<I>(self, columns: I) -> Query
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let stream = self.operator("ResultAwkwardArray", vec![column_list(columns)]);
        Query { expr: stream.expr }
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    fn operator(self, operator: &str, mut args: Vec<Expr>) -> Self {
        args.insert(0, self.expr);
        Self {
            expr: name(operator).call(args),
        }
    }
}

fn column_list<I>(columns: I) -> Expr
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    list(columns.into_iter().map(|column| Expr::Str(column.into())))
}

/// A complete query, ready to be submitted as a transformation selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    expr: Expr,
}

impl Query {
    /// Parses raw qastle text into a query.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parse(text).map(|expr| Self { expr })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }
}

impl From<Expr> for Query {
    fn from(expr: Expr) -> Self {
        Self { expr }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.expr.fmt(f)
    }
}
