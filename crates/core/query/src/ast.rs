//! Query IR tree and its canonical qastle rendering.

use std::fmt;

/// A node of the query IR.
///
/// The `Display` impl renders canonical qastle, which [`crate::parse`] reads back into an
/// equal tree as long as every `Name` passes [`is_identifier`]. Floats always keep a decimal
/// point or exponent (`1000.0`, `1e-7`), so they never come back as integers; non-finite
/// floats render as `inf`, `-inf` and `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Bare identifier: a lambda parameter or a well-known callable such as `Select`.
    ///
    /// Text that [`is_identifier`] rejects renders as some other atom.
    Name(String),
    /// String literal, rendered single-quoted.
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Sequence or tuple, `(list a b ...)`.
    List(Vec<Expr>),
    /// Attribute access, `(attr target 'name')`.
    Attr { target: Box<Expr>, name: String },
    /// Function or method call, `(call func args...)`.
    Call { func: Box<Expr>, args: Vec<Expr> },
    /// Anonymous function, `(lambda (list params...) body)`.
    Lambda { params: Vec<String>, body: Box<Expr> },
    /// Indexing, `(subscript target index)`.
    Subscript { target: Box<Expr>, index: Box<Expr> },
    BinOp {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    UnaryOp { op: UnaryOp, operand: Box<Expr> },
    /// Conditional expression, `(if test body orelse)`.
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
}

/// Atoms the parser reads as literals rather than names.
pub(crate) const LITERAL_ATOMS: &[&str] = &["True", "False", "inf", "+inf", "-inf", "nan", "NaN"];

/// Whether `text` parses back as a [`Expr::Name`].
///
/// Identifiers are non-empty, start with a letter or `_`, continue with letters, digits, `_`
/// or `.`, and are not one of the literal atoms (`True`, `False`, `inf`, `nan`, `NaN`).
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
        && !LITERAL_ATOMS.contains(&text)
}

/// Binary operators, including comparisons and boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    And,
    Or,
}

impl BinOp {
    pub const ALL: [BinOp; 15] = [
        BinOp::Add,
        BinOp::Sub,
        BinOp::Mul,
        BinOp::Div,
        BinOp::FloorDiv,
        BinOp::Mod,
        BinOp::Pow,
        BinOp::Eq,
        BinOp::NotEq,
        BinOp::Lt,
        BinOp::LtE,
        BinOp::Gt,
        BinOp::GtE,
        BinOp::And,
        BinOp::Or,
    ];

    /// The qastle head symbol of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::FloorDiv => "//",
            BinOp::Mod => "%",
            BinOp::Pow => "**",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::LtE => "<=",
            BinOp::Gt => ">",
            BinOp::GtE => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<BinOp> {
        BinOp::ALL.into_iter().find(|op| op.symbol() == symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Neg => "-",
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name(name) => f.write_str(name),
            Expr::Str(value) => write_quoted(f, value),
            Expr::Int(value) => write!(f, "{value}"),
            // `{:?}` keeps the fractional part: 1000.0 rather than 1000. It also renders
            // non-finite values as `inf`, `-inf` and `NaN`, which the parser reads as floats.
            Expr::Float(value) => write!(f, "{value:?}"),
            Expr::Bool(true) => f.write_str("True"),
            Expr::Bool(false) => f.write_str("False"),
            Expr::List(items) => {
                f.write_str("(list")?;
                for item in items {
                    write!(f, " {item}")?;
                }
                f.write_str(")")
            }
            Expr::Attr { target, name } => {
                write!(f, "(attr {target} ")?;
                write_quoted(f, name)?;
                f.write_str(")")
            }
            Expr::Call { func, args } => {
                write!(f, "(call {func}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                f.write_str(")")
            }
            Expr::Lambda { params, body } => {
                f.write_str("(lambda (list")?;
                for param in params {
                    write!(f, " {param}")?;
                }
                write!(f, ") {body})")
            }
            Expr::Subscript { target, index } => write!(f, "(subscript {target} {index})"),
            Expr::BinOp { op, lhs, rhs } => write!(f, "({} {lhs} {rhs})", op.symbol()),
            Expr::UnaryOp { op, operand } => write!(f, "({} {operand})", op.symbol()),
            Expr::IfExp { test, body, orelse } => write!(f, "(if {test} {body} {orelse})"),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in value.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("'")
}
