//! Query IR for ServiceX transformation requests.
//!
//! ServiceX accepts queries as *qastle* text: an s-expression encoding of a
//! `Select`/`SelectMany` pipeline over an event dataset. This crate is the
//! harness's single source of that text:
//!
//! - [`Expr`] is the IR tree, rendered to canonical qastle by its `Display` impl.
//! - [`parse`] reads qastle back into an [`Expr`], so raw query strings are validated before
//!   they are submitted.
//! - [`EventDataset`] is a fluent builder that compiles down to the same IR. A query written
//!   with the builder and the equivalent raw string produce byte-identical selections.
//!
//! ```
//! use servicex_query::{EventDataset, lambda, name};
//!
//! let query = EventDataset::new(["localds:bogus"])
//!     .select_many(lambda(["e"], name("e").method("Jets", vec!["AntiKt4EMTopoJets".into()])))
//!     .select(lambda(["j"], name("j").method("pt", vec![]) / 1000.0))
//!     .as_root_tree(["JetPt"], "analysis", "junk.root");
//!
//! assert_eq!(
//!     query.to_string(),
//!     "(call ResultTTree (call Select (call SelectMany (call EventDataset (list 'localds:bogus')) \
//!      (lambda (list e) (call (attr e 'Jets') 'AntiKt4EMTopoJets'))) \
//!      (lambda (list j) (/ (call (attr j 'pt')) 1000.0))) (list 'JetPt') 'analysis' 'junk.root')"
//! );
//! ```

mod ast;
mod builder;
mod parser;

pub use self::{
    ast::{BinOp, Expr, UnaryOp, is_identifier},
    builder::{EventDataset, ObjectStream, Query, lambda, list, name},
    parser::{ParseError, parse},
};
