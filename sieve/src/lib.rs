//! # Sieve
//!
//! A CSS selector parser with jQuery's leniency rules, producing a plain,
//! serializable syntax tree.
//!
//! ## Grammar
//!
//! A selector is a comma-separated list of chains. A chain is a sequence of
//! compound selectors joined by combinators (whitespace, `>`, `+`, `~`). A
//! compound selector is an optional tag name or `*` followed by any number
//! of `#id`, `.class`, `[attr]`, `[attr op value]` and `:pseudo(...)`
//! fragments, all constraining the same element.
//!
//! ## Leniency
//!
//! - Empty or whitespace-only input parses to an empty list (matches nothing).
//! - A bare `.` or `#` is a [`SelectorError::DanglingSigil`], but a dangling
//!   sigil after another constraint (`p.`) is dropped.
//! - Unclosed `[`, `(` or quotes are errors.
//! - Anything else the parser does not understand (stray punctuation,
//!   unknown pseudo-classes, malformed attribute bodies) turns the compound
//!   into [`SimpleSelector::Unmatchable`].
//!
//! ## Usage
//!
//! ```rust
//! use sieve::{SimpleSelector, parse};
//!
//! let list = parse(".item.active").unwrap();
//! assert_eq!(list.len(), 1);
//! assert_eq!(
//!     list.chains[0].head.parts,
//!     vec![
//!         SimpleSelector::Class("item".into()),
//!         SimpleSelector::Class("active".into()),
//!     ]
//! );
//! ```

mod tracing_macros;
#[allow(unused_imports)]
pub(crate) use tracing_macros::{debug, trace};

/// Selector syntax tree
pub mod ast;
mod error;
mod parser;

pub use ast::{
    AttributeOperator, AttributeSelector, ChainStep, Combinator, CompoundSelector, NthExpr,
    PseudoClass, SelectorChain, SelectorList, SimpleSelector,
};
pub use error::SelectorError;
pub use parser::parse;
