//! Argument types for collection methods.

use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;
use sieve::{SelectorError, SelectorList};

use super::{Collection, Dom};
use crate::debug;
use crate::dom::Document;
use crate::matcher::matches_list;

/// Something to insert: markup, nodes of the receiving document, or a
/// collection (imported if it belongs to another document).
#[derive(Debug, Clone)]
pub enum Content {
    Html(String),
    Node(NodeId),
    Nodes(Vec<NodeId>),
    Collection(Collection),
}

impl From<&str> for Content {
    fn from(html: &str) -> Self {
        Content::Html(html.to_string())
    }
}

impl From<String> for Content {
    fn from(html: String) -> Self {
        Content::Html(html)
    }
}

impl From<NodeId> for Content {
    fn from(node: NodeId) -> Self {
        Content::Node(node)
    }
}

impl From<Vec<NodeId>> for Content {
    fn from(nodes: Vec<NodeId>) -> Self {
        Content::Nodes(nodes)
    }
}

impl From<&[NodeId]> for Content {
    fn from(nodes: &[NodeId]) -> Self {
        Content::Nodes(nodes.to_vec())
    }
}

impl From<Collection> for Content {
    fn from(collection: Collection) -> Self {
        Content::Collection(collection)
    }
}

impl From<&Collection> for Content {
    fn from(collection: &Collection) -> Self {
        Content::Collection(collection.clone())
    }
}

impl Content {
    /// Whether the content is markup, which is parsed into fresh nodes that
    /// nothing else refers to.
    pub(crate) fn is_markup(&self) -> bool {
        matches!(self, Content::Html(_))
    }

    /// Materialize the content as nodes of `dom`: markup is parsed (once),
    /// foreign collections are deep-copied in.
    pub(crate) fn into_nodes(self, dom: &Dom) -> Vec<NodeId> {
        match self {
            Content::Html(html) => dom.borrow_mut().parse_fragment(&html),
            Content::Node(node) => vec![node],
            Content::Nodes(nodes) => nodes,
            Content::Collection(collection) if collection.dom.ptr_eq(dom) => collection.nodes,
            Content::Collection(collection) => {
                let source = collection.dom.borrow();
                let mut doc = dom.borrow_mut();
                collection
                    .nodes
                    .iter()
                    .map(|&node| doc.import_node(&source, node))
                    .collect()
            }
        }
    }
}

/// Something to point at: a selector, nodes, or a collection.
#[derive(Debug, Clone)]
pub enum Target {
    Selector(String),
    Node(NodeId),
    Nodes(Vec<NodeId>),
    Collection(Collection),
}

impl From<&str> for Target {
    fn from(selector: &str) -> Self {
        Target::Selector(selector.to_string())
    }
}

impl From<String> for Target {
    fn from(selector: String) -> Self {
        Target::Selector(selector)
    }
}

impl From<NodeId> for Target {
    fn from(node: NodeId) -> Self {
        Target::Node(node)
    }
}

impl From<Vec<NodeId>> for Target {
    fn from(nodes: Vec<NodeId>) -> Self {
        Target::Nodes(nodes)
    }
}

impl From<&[NodeId]> for Target {
    fn from(nodes: &[NodeId]) -> Self {
        Target::Nodes(nodes.to_vec())
    }
}

impl From<Collection> for Target {
    fn from(collection: Collection) -> Self {
        Target::Collection(collection)
    }
}

impl From<&Collection> for Target {
    fn from(collection: &Collection) -> Self {
        Target::Collection(collection.clone())
    }
}

impl Target {
    /// The document and nodes this target points at. Selectors are resolved
    /// against the roots of `dom`.
    pub(crate) fn resolve(self, dom: &Dom) -> Result<(Dom, Vec<NodeId>), SelectorError> {
        Ok(match self {
            Target::Selector(selector) => (dom.clone(), dom.select(&selector)?.nodes),
            Target::Node(node) => (dom.clone(), vec![node]),
            Target::Nodes(nodes) => (dom.clone(), nodes),
            Target::Collection(collection) => (collection.dom.clone(), collection.nodes),
        })
    }

    /// A membership test for nodes of `dom`.
    pub(crate) fn matcher(&self, dom: &Dom) -> Result<TargetMatcher, SelectorError> {
        Ok(match self {
            Target::Selector(selector) => TargetMatcher::Selector(sieve::parse(selector)?),
            Target::Node(node) => TargetMatcher::Nodes([*node].into_iter().collect()),
            Target::Nodes(nodes) => TargetMatcher::Nodes(nodes.iter().copied().collect()),
            Target::Collection(collection) if collection.dom.ptr_eq(dom) => {
                TargetMatcher::Nodes(collection.iter().collect())
            }
            // node ids of another arena say nothing about this one
            Target::Collection(_) => TargetMatcher::Nodes(HashSet::default()),
        })
    }
}

pub(crate) enum TargetMatcher {
    Selector(SelectorList),
    Nodes(HashSet<NodeId>),
}

impl TargetMatcher {
    pub(crate) fn matches(&self, doc: &Document, node: NodeId) -> bool {
        match self {
            TargetMatcher::Selector(list) => matches_list(doc, node, list),
            TargetMatcher::Nodes(nodes) => nodes.contains(&node),
        }
    }
}

/// The outcome of a user predicate. Anything other than a definite `true`
/// counts as a non-match.
pub trait Verdict {
    fn verdict(self) -> bool;
}

impl Verdict for bool {
    fn verdict(self) -> bool {
        self
    }
}

impl Verdict for Option<bool> {
    fn verdict(self) -> bool {
        self.unwrap_or(false)
    }
}

impl<E: std::fmt::Display> Verdict for Result<bool, E> {
    fn verdict(self) -> bool {
        match self {
            Ok(verdict) => verdict,
            Err(_err) => {
                debug!(error = %_err, "predicate failed, treating as no match");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdicts() {
        assert!(true.verdict());
        assert!(!Some(false).verdict());
        assert!(!None::<bool>.verdict());
        assert!(Ok::<_, String>(true).verdict());
        assert!(!Err::<bool, _>("boom").verdict());
    }

    #[test]
    fn test_foreign_collection_target_matches_nothing() {
        let here = Dom::new();
        let there = Dom::new();
        let ours = here.parse("<p></p>");
        let theirs = there.parse("<p></p>");
        let matcher = Target::from(&theirs).matcher(&here).unwrap();
        let doc = here.borrow();
        assert!(!matcher.matches(&doc, ours.nodes()[0]));
    }

    #[test]
    fn test_foreign_content_is_imported() {
        let here = Dom::new();
        let there = Dom::new();
        let theirs = there.parse("<b>x</b>");
        let nodes = Content::from(&theirs).into_nodes(&here);
        assert_eq!(here.borrow().outer_html(nodes[0]), "<b>x</b>");
        assert_eq!(there.borrow().parent_element(theirs.nodes()[0]), None);
    }
}
