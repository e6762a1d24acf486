//! End-to-end behavior of collections over the default document.

use facet_testhelpers::test;
use ladle::{Collection, Dom, DomError, NodeKind, SelectorError, query, registry};

fn texts(c: &Collection) -> Vec<String> {
    c.map(|_, node| Some(node.text()))
}

#[test]
fn test_compound_class_selector() {
    registry::reset();
    query(r#"<div class="item active">A</div><div class="item">B</div>"#).unwrap();

    let active = query(".item.active").unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active.text(), "A");
}

#[test]
fn test_class_order_does_not_matter() {
    registry::reset();
    query(r#"<i class="a b c">1</i><i class="c a">2</i><i class="b c a x">3</i>"#).unwrap();

    let expected = query(".a.b.c").unwrap();
    assert_eq!(texts(&expected), vec!["1", "3"]);
    for selector in [".b.a.c", ".c.b.a"] {
        assert_eq!(query(selector).unwrap().nodes(), expected.nodes(), "{selector}");
    }
}

#[test]
fn test_prev_until_walks_backwards() {
    registry::reset();
    query(
        r#"<ul>
            <li class="stop">stop</li>
            <li>x</li>
            <li>y</li>
            <li class="stop2">stop2</li>
            <li>target</li>
        </ul>"#,
    )
    .unwrap();

    let fourth = query("li").unwrap().eq(3);
    assert_eq!(fourth.text(), "stop2");
    assert_eq!(texts(&fourth.prev_until(".stop", None).unwrap()), vec!["y", "x"]);

    let target = query("li").unwrap().last();
    assert_eq!(
        texts(&target.prev_until(".stop", Some(":not(.stop2)")).unwrap()),
        vec!["y", "x"]
    );
}

#[test]
fn test_insert_after_three_targets() {
    registry::reset();
    query("<section><p>1</p><p>2</p><p>3</p></section>").unwrap();
    let span = query("<span>X</span>").unwrap();
    let original = span.get(0).unwrap();

    let inserted = span.insert_after("p").unwrap();
    assert_eq!(inserted.len(), 3);
    assert_eq!(inserted.iter().filter(|&n| n == original).count(), 1);

    let spans = query("section span").unwrap();
    assert_eq!(spans.len(), 3);
    assert_eq!(spans.nodes(), inserted.nodes());
}

#[test]
fn test_bare_dot_is_an_error_but_trailing_dot_is_not() {
    registry::reset();
    query("<tag>a</tag><p><tag>b</tag></p>").unwrap();

    let err = query(".").unwrap_err();
    assert!(matches!(err, SelectorError::DanglingSigil { .. }));
    assert!(matches!(query("#"), Err(SelectorError::DanglingSigil { .. })));

    assert_eq!(texts(&query("tag.").unwrap()), vec!["a", "b"]);
}

#[test]
fn test_syntax_errors_propagate_from_every_entry_point() {
    registry::reset();
    let root = query("<div><p>x</p></div>").unwrap();
    assert!(root.find("a[href").is_err());
    assert!(root.filter("p:not(.x").is_err());
    assert!(root.children(Some("[title='x]")).is_err());
    assert!(root.is(".").is_err());
    assert!(root.closest("#").is_err());
}

#[test]
fn test_junk_selectors_match_nothing() {
    registry::reset();
    query("<div><p>x</p></div>").unwrap();
    for selector in ["p!", "div @p", "> p", "p ~", "li:first", "[=x]", "   "] {
        assert!(query(selector).unwrap().is_empty(), "{selector}");
    }
}

#[test]
fn test_find_is_ordered_and_unique_with_overlapping_roots() {
    let dom = Dom::new();
    let root = dom.parse("<div><p>1</p><div><p>2</p><p>3</p></div><p>4</p></div>");
    let both = root.find("div").unwrap().add(&root).unwrap();
    assert_eq!(both.len(), 2);

    let found = both.find("p").unwrap();
    assert_eq!(texts(&found), vec!["1", "2", "3", "4"]);

    let reversed = Collection::new(&dom, both.iter().rev());
    assert_eq!(texts(&reversed.find("p").unwrap()), vec!["1", "2", "3", "4"]);
}

#[test]
fn test_append_child_detaches_first() {
    let dom = Dom::new();
    let root = dom.parse("<ul id=a><li>1</li></ul><ol id=b></ol>");
    let mut doc = dom.borrow_mut();
    let (ul, ol) = (root.get(0).unwrap(), root.get(1).unwrap());
    let li = doc.first_child(ul).unwrap();

    doc.append_child(ol, li).unwrap();
    assert_eq!(doc.parent(li), Some(ol));
    assert_eq!(doc.children(ul).count(), 0);
    assert_eq!(doc.children(ol).collect::<Vec<_>>(), vec![li]);
}

#[test]
fn test_deep_clone_is_independent() {
    let dom = Dom::new();
    let root = dom.parse(r#"<div class="box"><p>text</p></div>"#);
    let copy = root.clone_nodes();

    copy.find("p").unwrap().set_text("changed").add_class("new");
    copy.set_attr("id", "copy");

    assert_eq!(root.outer_html(), r#"<div class="box"><p>text</p></div>"#);
    assert_eq!(
        copy.outer_html(),
        r#"<div class="box" id="copy"><p class="new">changed</p></div>"#
    );
    assert!(copy.parent(None).unwrap().is_empty());
}

#[test]
fn test_remove_child_of_foreign_node_is_not_found() {
    let dom = Dom::new();
    let root = dom.parse("<div><p>1</p></div><span></span>");
    let (div, span) = (root.get(0).unwrap(), root.get(1).unwrap());
    let before = root.outer_html();

    let mut doc = dom.borrow_mut();
    let detached = doc.create_element("p");
    assert_eq!(doc.remove_child(div, detached), Err(DomError::NotFound));
    assert_eq!(doc.remove_child(div, span), Err(DomError::NotFound));
    let p = doc.first_child(div).unwrap();
    let em = doc.create_element("em");
    assert_eq!(doc.replace_child(span, em, p), Err(DomError::NotFound));
    drop(doc);

    assert_eq!(root.outer_html(), before);
}

#[test]
fn test_class_round_trip() {
    let dom = Dom::new();
    let item = dom.parse(r#"<p class="one two">x</p>"#);
    let before = item.outer_html();

    item.add_class("three");
    assert!(item.has_class("three"));
    item.remove_class("three");
    assert!(!item.has_class("three"));
    assert_eq!(item.outer_html(), before);
}

#[test]
fn test_query_chains_through_end() {
    registry::reset();
    query(
        r#"<nav><a href="/a" class="ext">A</a><a href="/b">B</a></nav><footer><a href="/c">C</a></footer>"#,
    )
    .unwrap();

    let nav = query("nav").unwrap();
    let tagged = nav
        .find("a")
        .unwrap()
        .filter(".ext")
        .unwrap()
        .set_attr("rel", "nofollow")
        .end()
        .not(".ext")
        .unwrap();
    assert_eq!(texts(&tagged), vec!["B"]);
    assert_eq!(query("[rel=nofollow]").unwrap().text(), "A");
    assert_eq!(tagged.end().end().nodes(), nav.nodes());
}

#[test]
fn test_contents_include_text_and_comments() {
    registry::reset();
    let p = query("<p>a<!--b--><i>c</i></p>").unwrap();
    let contents = p.contents();
    let kinds: Vec<&str> = contents.map(|_, node| {
        Some(match node.kind() {
            NodeKind::Text(_) => "text",
            NodeKind::Comment(_) => "comment",
            NodeKind::Element(_) => "element",
            NodeKind::Fragment => "fragment",
        })
    });
    assert_eq!(kinds, vec!["text", "comment", "element"]);
    assert_eq!(p.text(), "abc");
}

#[test]
fn test_unterminated_markup_is_an_empty_collection() {
    registry::reset();
    let nothing = query("<div").unwrap();
    assert!(nothing.is_empty());
    assert!(registry::roots().is_empty());
}

#[test]
fn test_index_helpers() {
    registry::reset();
    query("<ul><li>a</li><li class=x>b</li><li>c</li></ul>").unwrap();
    let items = query("li").unwrap();
    assert_eq!(query(".x").unwrap().index(), 1);
    assert_eq!(items.index_of(".x").unwrap(), 1);
    assert_eq!(items.index_of(&query("li:last-child").unwrap()).unwrap(), 2);
    assert_eq!(query("table").unwrap().index(), -1);
}
