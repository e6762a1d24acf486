//! Tests for the public parsing surface.

use facet_testhelpers::test;
use sieve::{Combinator, SelectorError, SelectorList, SimpleSelector, parse};

#[test]
fn test_ast_survives_json() {
    let list = parse("ul > li.item:not(.done), a[href^='https://'] ~ span").expect("parse");

    let json = facet_json::to_string(&list).expect("serialization should work");
    let roundtrip: SelectorList = facet_json::from_str(&json).expect("deserialization should work");
    assert_eq!(list, roundtrip);
}

#[test]
fn test_from_str() {
    let list: SelectorList = "div p".parse().expect("parse");
    assert_eq!(list.chains[0].steps[0].combinator, Combinator::Descendant);
}

#[test]
fn test_class_order_does_not_change_the_set() {
    let sets: Vec<Vec<SimpleSelector>> = [".a.b.c", ".b.a.c", ".c.b.a"]
        .into_iter()
        .map(|s| {
            let mut parts = parse(s).expect("parse").chains[0].head.parts.clone();
            parts.sort_by_key(|p| p.to_string());
            parts
        })
        .collect();
    assert_eq!(sets[0], sets[1]);
    assert_eq!(sets[1], sets[2]);
}

#[test]
fn test_error_messages_name_the_selector() {
    let err = parse("#").unwrap_err();
    assert!(matches!(err, SelectorError::DanglingSigil { .. }));
    assert!(err.to_string().contains('#'), "got {err}");

    let err = parse("a[href").unwrap_err();
    assert!(err.to_string().contains("a[href"), "got {err}");
}

#[test]
fn test_display_escapes_identifiers() {
    let list = parse(".a\\:b").expect("parse");
    assert_eq!(list.to_string(), ".a\\:b");
    assert!(!list.chains[0].is_unmatchable());
}

#[test]
fn test_display_reparses_to_the_same_tree() {
    for input in [
        "div#main.a > p + span ~ em",
        "a[title=\"say \\\"hi\\\"\"]",
        "li:nth-last-of-type(-n+3):not(.x)",
        "*",
        ".a\\:b",
        "#x\\.y.c\\ d",
        "p:contains(\"say \\\"hi\\\"\")",
    ] {
        let list = parse(input).expect("parse");
        let again = parse(&list.to_string()).expect("reparse");
        assert_eq!(list, again, "{input} -> {list}");
    }
}
