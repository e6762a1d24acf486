//! Server-side HTML DOM with jQuery-style queries, based on html5ever,
//! indextree and the `sieve` selector parser.
//!
//! ladle provides:
//! - **Node model**: an arena of elements, text and comments with O(1)
//!   parent and sibling links
//! - **Parsing**: HTML fragments through html5ever's tree builder
//! - **Matching**: CSS selectors (compounds, attributes, combinators,
//!   structural pseudo-classes) resolved in document order
//! - **Collections**: chained traversal, filtering and mutation in the style
//!   of jQuery
//! - **Serialization**: HTML5-correct output with proper escaping
//!
//! # Example
//!
//! ```rust
//! use ladle::Dom;
//!
//! let dom = Dom::new();
//! let list = dom.parse(r#"<ul><li class="item active">A</li><li class="item">B</li></ul>"#);
//!
//! let active = list.find(".item.active").unwrap();
//! assert_eq!(active.text(), "A");
//!
//! active.next(None).unwrap().add_class("seen");
//! list.append("<li>C</li>");
//! assert_eq!(
//!     list.outer_html(),
//!     r#"<ul><li class="item active">A</li><li class="item seen">B</li><li>C</li></ul>"#
//! );
//! ```
//!
//! The free function [`query`] mirrors `$(...)`: markup is parsed into the
//! current thread's default document, anything else is a selector against
//! it.

mod tracing_macros;
#[allow(unused_imports)]
pub(crate) use tracing_macros::{debug, trace};

pub mod collection;
pub mod dom;
pub mod matcher;
mod parser;
pub mod registry;
pub mod serialize;

pub use collection::{Collection, Content, Dom, Target, Verdict};
pub use dom::{Document, DomError, ElementData, Namespace, NodeData, NodeKind, NodeRef, PropValue};
pub use indextree::NodeId;
pub use matcher::Scope;
pub use serialize::SerializeOptions;
pub use sieve::{SelectorError, SelectorList};

/// `$(input)`: HTML when the trimmed input starts with `<` and ends with
/// `>`, otherwise a selector over the default document's roots.
pub fn query(input: &str) -> Result<Collection, SelectorError> {
    let trimmed = input.trim();
    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        Ok(Collection::parse(trimmed))
    } else {
        Collection::select(input)
    }
}
