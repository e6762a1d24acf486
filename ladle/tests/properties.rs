use ladle::{Collection, Dom};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::TestCaseResult;

fn class_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("a"),
        Just("b"),
        Just("item"),
        Just("active"),
        Just("x-1"),
        Just("_tmp"),
        Just("é"),
    ]
    .prop_map(str::to_string)
    .boxed()
}

fn tag_strategy() -> BoxedStrategy<&'static str> {
    prop_oneof![Just("div"), Just("p"), Just("span"), Just("li"), Just("em")].boxed()
}

/// A small random tree: (tag, classes, children)
#[derive(Debug, Clone)]
struct Tree {
    tag: &'static str,
    classes: Vec<String>,
    children: Vec<Tree>,
}

fn tree_strategy() -> BoxedStrategy<Tree> {
    let leaf = (tag_strategy(), vec(class_strategy(), 0..3))
        .prop_map(|(tag, classes)| Tree {
            tag,
            classes,
            children: Vec::new(),
        })
        .boxed();

    leaf.prop_recursive(4, 48, 4, |inner| {
        (tag_strategy(), vec(class_strategy(), 0..3), vec(inner, 0..4))
            .prop_map(|(tag, classes, children)| Tree {
                tag,
                classes,
                children,
            })
            .boxed()
    })
    .boxed()
}

fn render(tree: &Tree, out: &mut String) {
    out.push('<');
    out.push_str(tree.tag);
    if !tree.classes.is_empty() {
        out.push_str(" class=\"");
        out.push_str(&tree.classes.join(" "));
        out.push('"');
    }
    out.push('>');
    for child in &tree.children {
        render(child, out);
    }
    out.push_str("</");
    out.push_str(tree.tag);
    out.push('>');
}

fn markup(trees: &[Tree]) -> String {
    let mut out = String::new();
    for tree in trees {
        out.push_str("<section>");
        render(tree, &mut out);
        out.push_str("</section>");
    }
    out
}

fn assert_class_round_trip(existing: &[String], token: &str) -> TestCaseResult {
    let dom = Dom::new();
    let html = format!(r#"<p class="{}">x</p>"#, existing.join(" "));
    let item = dom.parse(&html);
    let before = item.has_class(token);

    item.add_class(token);
    prop_assert!(item.has_class(token));
    item.remove_class(token);
    prop_assert_eq!(item.has_class(token), before);
    Ok(())
}

fn assert_find_is_ordered(trees: &[Tree], pick: &[usize]) -> TestCaseResult {
    let dom = Dom::new();
    let top = dom.parse(&markup(trees));
    let all = top.find("*").unwrap();

    let doc_order: Vec<_> = all.iter().collect();
    let scopes = Collection::new(
        &dom,
        pick.iter()
            .filter_map(|&i| all.get(i % all.len().max(1)))
            .chain(top.iter()),
    );

    let found = scopes.find("*").unwrap();
    let found_nodes: Vec<_> = found.iter().collect();

    let mut unique = found_nodes.clone();
    unique.sort();
    unique.dedup();
    prop_assert_eq!(unique.len(), found_nodes.len(), "duplicates in find result");

    let positions: Vec<usize> = found_nodes
        .iter()
        .map(|n| doc_order.iter().position(|d| d == n).unwrap())
        .collect();
    prop_assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "find result out of document order: {positions:?}"
    );
    Ok(())
}

fn assert_compound_order_irrelevant(trees: &[Tree], classes: &[String]) -> TestCaseResult {
    let dom = Dom::new();
    let top = dom.parse(&markup(trees));

    let forward = format!(".{}", classes.join("."));
    let mut reversed_classes = classes.to_vec();
    reversed_classes.reverse();
    let backward = format!(".{}", reversed_classes.join("."));

    let a = top.find(&forward).unwrap();
    let b = top.find(&backward).unwrap();
    prop_assert_eq!(a.nodes(), b.nodes());
    Ok(())
}

fn assert_clone_independent(trees: &[Tree]) -> TestCaseResult {
    let dom = Dom::new();
    let top = dom.parse(&markup(trees));
    let before = top.outer_html();

    let copy = top.clone_nodes();
    prop_assert_eq!(copy.outer_html(), before.clone());

    copy.find("*").unwrap().add_class("mutated").set_attr("data-copy", "1");
    copy.append("<b>extra</b>");
    prop_assert_eq!(top.outer_html(), before);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn add_then_remove_class_restores_membership(
        existing in vec(class_strategy(), 0..4),
        token in prop_oneof![Just("fresh".to_string()), Just("new-one".to_string())],
    ) {
        assert_class_round_trip(&existing, &token)?;
    }

    #[test]
    fn find_is_ordered_and_unique(
        trees in vec(tree_strategy(), 1..4),
        pick in vec(any::<usize>(), 0..4),
    ) {
        assert_find_is_ordered(&trees, &pick)?;
    }

    #[test]
    fn compound_class_order_is_irrelevant(
        trees in vec(tree_strategy(), 1..4),
        classes in vec(class_strategy(), 1..4),
    ) {
        assert_compound_order_irrelevant(&trees, &classes)?;
    }

    #[test]
    fn deep_clone_is_independent(trees in vec(tree_strategy(), 1..3)) {
        assert_clone_independent(&trees)?;
    }
}
