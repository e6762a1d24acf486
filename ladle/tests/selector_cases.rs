//! Data-driven selector tests using datatest-stable.
//!
//! Each test case is a file in `tests/selector-cases/` with format:
//! ```text
//! <HTML fragment>
//! ===
//! <selector>
//! ===
//! <expected outer HTML of each match, one per line>
//! ```
//!
//! An empty expectation section means the selector matches nothing.

use ladle::Dom;
use std::path::Path;

fn run_selector_case(path: &Path) -> datatest_stable::Result<()> {
    facet_testhelpers::setup();

    let content = std::fs::read_to_string(path)?;
    let parts: Vec<&str> = content.split("\n===\n").collect();

    if parts.len() != 3 {
        return Err(format!(
            "Test file must have exactly two '===' separators, found {} parts",
            parts.len()
        )
        .into());
    }

    let html = parts[0].trim();
    let selector = parts[1].trim();
    let expected: Vec<&str> = parts[2]
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let dom = Dom::new();
    dom.parse(html);
    let found = dom
        .select(selector)
        .map_err(|e| format!("selector {selector:?} failed to parse: {e}"))?;
    let actual = found.map(|_, node| Some(node.outer_html()));

    if actual != expected {
        return Err(format!(
            "Selector mismatch!\nSelector: {selector}\nHTML: {html}\nResult: {actual:#?}\nExpected: {expected:#?}"
        )
        .into());
    }

    Ok(())
}

datatest_stable::harness! {
    { test = run_selector_case, root = "tests/selector-cases", pattern = r".*\.html$" },
}
