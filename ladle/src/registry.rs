//! The per-thread default document.
//!
//! [`Collection::parse`](crate::Collection::parse) and
//! [`Collection::select`](crate::Collection::select) work against a default
//! [`Dom`] owned by the current thread. Parsed forests register their
//! top-level nodes there as roots; a bare selector searches the roots that
//! are still top-level. Nothing is ever reset implicitly.

use indextree::NodeId;
use std::cell::RefCell;

use crate::collection::Dom;
#[allow(unused_imports)]
use crate::debug;

thread_local! {
    static CURRENT: RefCell<Option<Dom>> = const { RefCell::new(None) };
}

/// The current thread's default document, created on first use.
pub fn current() -> Dom {
    CURRENT.with(|current| current.borrow_mut().get_or_insert_with(Dom::new).clone())
}

/// Register nodes of the default document as roots.
pub fn register(nodes: &[NodeId]) {
    current().borrow_mut().register_roots(nodes);
}

/// Every registered root of the default document.
pub fn roots() -> Vec<NodeId> {
    current().borrow().roots().to_vec()
}

/// Start over with a fresh default document. Collections created before
/// keep their own document alive.
pub fn reset() {
    CURRENT.with(|current| *current.borrow_mut() = Some(Dom::new()));
    debug!("registry reset");
}
