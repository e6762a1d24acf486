//! Selector matching against arena nodes.
//!
//! Chains are matched right to left: the subject compound is tested against
//! the candidate, then each combinator walks to parents or earlier siblings,
//! backtracking through every ancestor (for descendant steps) or every
//! earlier sibling (for `~` steps) until the whole chain fits.

use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;
use sieve::{
    AttributeOperator, AttributeSelector, Combinator, CompoundSelector, PseudoClass,
    SelectorChain, SelectorList, SimpleSelector,
};

#[allow(unused_imports)]
use crate::trace;
use crate::dom::{Document, NodeKind, eq_ignore_case};

/// Which nodes of a scope root take part in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The root and everything below it. Combinators may walk past the root,
    /// so a root is matched the way it would be in a whole document.
    Inclusive,
    /// Strict descendants of the root only. Ancestor walks stop at the root,
    /// so `div p` needs the `div` inside the root too.
    Descendants,
}

/// Whether an element satisfies every part of a compound selector.
/// Non-elements never match.
pub fn matches(doc: &Document, node: NodeId, compound: &CompoundSelector) -> bool {
    let Some(elem) = doc.element(node) else {
        return false;
    };
    compound.parts.iter().all(|part| match part {
        SimpleSelector::Universal => true,
        SimpleSelector::Tag(name) => eq_ignore_case(&elem.tag, name),
        SimpleSelector::Id(id) => elem.attrs.get("id").is_some_and(|v| v.as_ref() == id),
        SimpleSelector::Class(class) => doc.has_class(node, class),
        SimpleSelector::Attribute(attr) => {
            matches_attribute(elem.attrs.get(attr.name.as_str()).map(|v| v.as_ref()), attr)
        }
        SimpleSelector::Pseudo(pseudo) => matches_pseudo(doc, node, pseudo),
        SimpleSelector::Unmatchable(_) => false,
    })
}

fn matches_attribute(actual: Option<&str>, attr: &AttributeSelector) -> bool {
    let Some(actual) = actual else {
        return false;
    };
    let expected = attr.value.as_str();
    match attr.operator {
        AttributeOperator::Exists => true,
        AttributeOperator::Equals => actual == expected,
        AttributeOperator::Contains => !expected.is_empty() && actual.contains(expected),
        AttributeOperator::StartsWith => !expected.is_empty() && actual.starts_with(expected),
        AttributeOperator::EndsWith => !expected.is_empty() && actual.ends_with(expected),
        AttributeOperator::ContainsWord => {
            !expected.is_empty()
                && !expected.contains(char::is_whitespace)
                && actual.split_ascii_whitespace().any(|w| w == expected)
        }
        AttributeOperator::DashMatch => {
            actual == expected
                || actual
                    .strip_prefix(expected)
                    .is_some_and(|rest| rest.starts_with('-'))
        }
    }
}

/// Text of the descendant text nodes only; comments do not count.
fn own_text(doc: &Document, node: NodeId) -> String {
    doc.descendants(node)
        .filter_map(|n| match doc.kind(n) {
            NodeKind::Text(text) => Some(&**text),
            _ => None,
        })
        .collect()
}

fn same_tag(doc: &Document, a: NodeId, b: NodeId) -> bool {
    match (doc.tag_name(a), doc.tag_name(b)) {
        (Some(a), Some(b)) => eq_ignore_case(a, b),
        _ => false,
    }
}

fn matches_pseudo(doc: &Document, node: NodeId, pseudo: &PseudoClass) -> bool {
    let before = || doc.preceding_siblings(node).filter(|&s| doc.is_element(s));
    let after = || doc.following_siblings(node).filter(|&s| doc.is_element(s));
    let before_of_type = || before().filter(|&s| same_tag(doc, s, node));
    let after_of_type = || after().filter(|&s| same_tag(doc, s, node));

    match pseudo {
        PseudoClass::FirstChild => before().next().is_none(),
        PseudoClass::LastChild => after().next().is_none(),
        PseudoClass::OnlyChild => before().next().is_none() && after().next().is_none(),
        PseudoClass::NthChild(nth) => nth.matches(before().count() + 1),
        PseudoClass::NthLastChild(nth) => nth.matches(after().count() + 1),
        PseudoClass::FirstOfType => before_of_type().next().is_none(),
        PseudoClass::LastOfType => after_of_type().next().is_none(),
        PseudoClass::OnlyOfType => {
            before_of_type().next().is_none() && after_of_type().next().is_none()
        }
        PseudoClass::NthOfType(nth) => nth.matches(before_of_type().count() + 1),
        PseudoClass::NthLastOfType(nth) => nth.matches(after_of_type().count() + 1),
        PseudoClass::Empty => doc.children(node).all(|child| match doc.kind(child) {
            NodeKind::Text(text) => text.trim().is_empty(),
            NodeKind::Comment(_) => true,
            NodeKind::Element(_) | NodeKind::Fragment => false,
        }),
        PseudoClass::Root => doc.parent_element(node).is_none(),
        PseudoClass::Contains(text) => own_text(doc, node).contains(text.as_str()),
        PseudoClass::Not(list) => !matches_list(doc, node, list),
    }
}

/// Whether `node` is the subject of `chain`, with no scope restriction.
pub fn matches_chain(doc: &Document, node: NodeId, chain: &SelectorChain) -> bool {
    matches_chain_within(doc, node, chain, None)
}

/// Whether `node` matches any chain of `list`.
pub fn matches_list(doc: &Document, node: NodeId, list: &SelectorList) -> bool {
    list.iter().any(|chain| matches_chain(doc, node, chain))
}

/// Like [`matches_chain`], but ancestor walks stop before `stop`.
fn matches_chain_within(
    doc: &Document,
    node: NodeId,
    chain: &SelectorChain,
    stop: Option<NodeId>,
) -> bool {
    if chain.is_unmatchable() {
        return false;
    }
    ChainMatcher { doc, chain, stop }.matches_at(node, chain.steps.len())
}

struct ChainMatcher<'a> {
    doc: &'a Document,
    chain: &'a SelectorChain,
    stop: Option<NodeId>,
}

impl ChainMatcher<'_> {
    fn compound(&self, index: usize) -> &CompoundSelector {
        match index {
            0 => &self.chain.head,
            i => &self.chain.steps[i - 1].compound,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.doc
            .parent_element(node)
            .filter(|&p| Some(p) != self.stop)
    }

    /// Match compound `index` against `node`, then everything to its left.
    fn matches_at(&self, node: NodeId, index: usize) -> bool {
        if !matches(self.doc, node, self.compound(index)) {
            return false;
        }
        if index == 0 {
            return true;
        }
        let left = index - 1;
        match self.chain.steps[left].combinator {
            Combinator::Child => self
                .parent(node)
                .is_some_and(|parent| self.matches_at(parent, left)),
            Combinator::Descendant => {
                let mut current = self.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(ancestor, left) {
                        return true;
                    }
                    current = self.parent(ancestor);
                }
                false
            }
            Combinator::NextSibling => self
                .doc
                .prev_element_sibling(node)
                .is_some_and(|sibling| self.matches_at(sibling, left)),
            Combinator::SubsequentSibling => self
                .doc
                .preceding_siblings(node)
                .filter(|&s| self.doc.is_element(s))
                .any(|sibling| self.matches_at(sibling, left)),
        }
    }
}

/// Every element under `roots` matching `list`, in document order and
/// without duplicates.
pub fn query_all(
    doc: &Document,
    roots: &[NodeId],
    list: &SelectorList,
    scope: Scope,
) -> Vec<NodeId> {
    if list.is_empty() || roots.is_empty() {
        return Vec::new();
    }

    if let [root] = roots {
        let found = query_root(doc, *root, list, scope);
        trace!(found = found.len(), "query on one root");
        return found;
    }

    let mut matched: HashSet<NodeId> = HashSet::default();
    for &root in roots {
        matched.extend(query_root(doc, root, list, scope));
    }

    // Walk the outermost roots in document order so overlapping scopes still
    // produce a single ordered sequence.
    let mut out = Vec::with_capacity(matched.len());
    for root in outermost_roots(doc, roots) {
        for node in candidates(doc, root, scope) {
            if matched.remove(&node) {
                out.push(node);
            }
        }
    }
    trace!(roots = roots.len(), found = out.len(), "query on many roots");
    out
}

fn candidates(doc: &Document, root: NodeId, scope: Scope) -> impl Iterator<Item = NodeId> + '_ {
    let skip = match scope {
        Scope::Inclusive => 0,
        Scope::Descendants => 1,
    };
    root.descendants(&doc.arena).skip(skip)
}

fn query_root(doc: &Document, root: NodeId, list: &SelectorList, scope: Scope) -> Vec<NodeId> {
    let stop = match scope {
        Scope::Inclusive => None,
        Scope::Descendants => Some(root),
    };
    candidates(doc, root, scope)
        .filter(|&node| {
            list.iter()
                .any(|chain| matches_chain_within(doc, node, chain, stop))
        })
        .collect()
}

/// Roots not contained in another root, deduplicated and in document order.
fn outermost_roots(doc: &Document, roots: &[NodeId]) -> Vec<NodeId> {
    let all: HashSet<NodeId> = roots.iter().copied().collect();
    let mut seen: HashSet<NodeId> = HashSet::default();
    let mut outer: Vec<NodeId> = roots
        .iter()
        .copied()
        .filter(|&root| seen.insert(root))
        .filter(|&root| !doc.ancestors(root).any(|a| all.contains(&a)))
        .collect();
    doc.sort_by_document_order(&mut outer);
    outer
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(html: &str) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let nodes = doc.parse_fragment(html);
        (doc, nodes)
    }

    fn select(doc: &Document, roots: &[NodeId], selector: &str, scope: Scope) -> Vec<String> {
        let list = sieve::parse(selector).unwrap();
        query_all(doc, roots, &list, scope)
            .into_iter()
            .map(|n| doc.outer_html(n))
            .collect()
    }

    #[test]
    fn test_compound_classes_in_any_order() {
        let (doc, roots) =
            setup(r#"<div class="item active">A</div><div class="item">B</div>"#);
        for selector in [".item.active", ".active.item", "div.active.item"] {
            assert_eq!(
                select(&doc, &roots, selector, Scope::Inclusive),
                vec![r#"<div class="item active">A</div>"#]
            );
        }
    }

    #[test]
    fn test_tags_and_classes_ignore_case() {
        let (doc, roots) = setup(r#"<p class="Lead">x</p>"#);
        assert_eq!(select(&doc, &roots, "P.lead", Scope::Inclusive).len(), 1);
    }

    #[test]
    fn test_ids_are_case_sensitive() {
        let (doc, roots) = setup(r#"<p id="Main"></p>"#);
        assert_eq!(select(&doc, &roots, "#Main", Scope::Inclusive).len(), 1);
        assert!(select(&doc, &roots, "#main", Scope::Inclusive).is_empty());
    }

    #[test]
    fn test_attribute_operators() {
        let (doc, roots) = setup(
            r#"<a href="https://x.io/doc.pdf" lang="en-US" rel="nofollow noopener" title=""></a>"#,
        );
        let hit = |s: &str| select(&doc, &roots, s, Scope::Inclusive).len() == 1;
        assert!(hit("[href]"));
        assert!(hit("[href^='https://']"));
        assert!(hit("[href$=.pdf]"));
        assert!(hit("[href*=\"x.io\"]"));
        assert!(hit("[rel~=noopener]"));
        assert!(hit("[lang|=en]"));
        assert!(hit("[title]"));
        assert!(hit("[title='']"));
        assert!(!hit("[rel~=noop]"));
        assert!(!hit("[lang|=e]"));
        assert!(!hit("[href^='']"));
        assert!(!hit("[title*='']"));
        assert!(!hit("[missing]"));
    }

    #[test]
    fn test_descendant_and_child() {
        let (doc, roots) = setup("<div><section><p>a</p></section><p>b</p></div>");
        assert_eq!(select(&doc, &roots, "div p", Scope::Inclusive).len(), 2);
        assert_eq!(
            select(&doc, &roots, "div > p", Scope::Inclusive),
            vec!["<p>b</p>"]
        );
        assert_eq!(
            select(&doc, &roots, "section > p", Scope::Inclusive),
            vec!["<p>a</p>"]
        );
    }

    #[test]
    fn test_sibling_combinators() {
        let (doc, roots) = setup("<ul><li>1</li><li class=x>2</li><li>3</li><li>4</li></ul>");
        assert_eq!(
            select(&doc, &roots, ".x + li", Scope::Inclusive),
            vec!["<li>3</li>"]
        );
        assert_eq!(
            select(&doc, &roots, ".x ~ li", Scope::Inclusive),
            vec!["<li>3</li>", "<li>4</li>"]
        );
    }

    #[test]
    fn test_descendants_scope_stops_at_root() {
        let (doc, roots) = setup("<div><section><p>a</p></section></div>");
        let section = doc.first_child(roots[0]).unwrap();
        assert!(select(&doc, &[section], "div p", Scope::Descendants).is_empty());
        assert_eq!(select(&doc, &[section], "p", Scope::Descendants).len(), 1);
        assert!(select(&doc, &[section], "section", Scope::Descendants).is_empty());
        assert_eq!(
            select(&doc, &[section], "section", Scope::Inclusive).len(),
            1
        );
    }

    #[test]
    fn test_overlapping_roots_are_ordered_and_unique() {
        let (doc, roots) = setup("<div><p>1</p><div><p>2</p></div><p>3</p></div>");
        let outer = roots[0];
        let inner = doc.element_children(outer).nth(1).unwrap();
        assert_eq!(
            select(&doc, &[inner, outer, inner], "p", Scope::Descendants),
            vec!["<p>1</p>", "<p>2</p>", "<p>3</p>"]
        );
    }

    #[test]
    fn test_structural_pseudo_classes() {
        let (doc, roots) =
            setup("<ul><li>1</li><li>2</li><li>3</li><li>4</li><li>5</li></ul><p><!--x--></p>");
        let texts = |s: &str| -> Vec<String> {
            let list = sieve::parse(s).unwrap();
            query_all(&doc, &roots, &list, Scope::Inclusive)
                .into_iter()
                .map(|n| doc.text_content(n))
                .collect()
        };
        assert_eq!(texts("li:first-child"), vec!["1"]);
        assert_eq!(texts("li:last-child"), vec!["5"]);
        assert_eq!(texts("li:nth-child(odd)"), vec!["1", "3", "5"]);
        assert_eq!(texts("li:nth-child(2n)"), vec!["2", "4"]);
        assert_eq!(texts("li:nth-last-child(-n+2)"), vec!["4", "5"]);
        assert_eq!(texts("li:not(:nth-child(3))").len(), 4);
        assert_eq!(texts("li:contains(4)"), vec!["4"]);
        assert!(texts("p:contains(x)").is_empty());
        assert_eq!(texts("p:empty").len(), 1);
        assert_eq!(texts(":root").len(), 2);
    }

    #[test]
    fn test_of_type_pseudo_classes() {
        let (doc, roots) = setup("<div><h1>t</h1><p>a</p><span>s</span><p>b</p></div>");
        let texts = |s: &str| -> Vec<String> {
            let list = sieve::parse(s).unwrap();
            query_all(&doc, &roots, &list, Scope::Inclusive)
                .into_iter()
                .map(|n| doc.text_content(n))
                .collect()
        };
        assert_eq!(texts("p:first-of-type"), vec!["a"]);
        assert_eq!(texts("p:last-of-type"), vec!["b"]);
        assert_eq!(texts("span:only-of-type"), vec!["s"]);
        assert_eq!(texts("p:nth-of-type(2)"), vec!["b"]);
    }

    #[test]
    fn test_unmatchable_selectors_match_nothing() {
        let (doc, roots) = setup("<div><p>x</p></div>");
        for selector in ["p!", "> p", "p >", ":first", "[=x]", ""] {
            assert!(
                select(&doc, &roots, selector, Scope::Inclusive).is_empty(),
                "{selector}"
            );
        }
    }

    #[test]
    fn test_dangling_sigil_after_tag_matches_tag() {
        let (doc, roots) = setup("<p>a</p><p>b</p>");
        assert_eq!(select(&doc, &roots, "p.", Scope::Inclusive).len(), 2);
    }
}
