//! Attribute, class and property helpers.

use indextree::NodeId;

use super::Collection;
use crate::dom::{Document, PropValue, class_list_contains};

/// Apply `edit` to the class list of every element in `nodes`.
fn edit_classes(doc: &mut Document, nodes: &[NodeId], mut edit: impl FnMut(&mut Vec<String>)) {
    for &node in nodes {
        let Ok(elem) = doc.element_mut(node) else {
            continue;
        };
        let before: Vec<String> = elem
            .attrs
            .get("class")
            .map(|list| tokens(list).map(str::to_string).collect())
            .unwrap_or_default();
        let mut classes = before.clone();
        edit(&mut classes);
        if classes != before {
            elem.attrs
                .insert("class".to_string(), classes.join(" ").into());
        }
    }
}

fn tokens(classes: &str) -> impl Iterator<Item = &str> {
    classes.split_ascii_whitespace()
}

impl Collection {
    /// Whether any element carries `class` (compared case-insensitively).
    pub fn has_class(&self, class: &str) -> bool {
        let doc = self.dom.borrow();
        self.iter()
            .any(|n| doc.attr(n, "class").is_some_and(|l| class_list_contains(l, class)))
    }

    /// Add each whitespace-separated class not already present.
    pub fn add_class(&self, classes: &str) -> &Self {
        edit_classes(&mut self.dom.borrow_mut(), &self.nodes, |list| {
            for class in tokens(classes) {
                if !list.iter().any(|c| c == class) {
                    list.push(class.to_string());
                }
            }
        });
        self
    }

    /// Remove every occurrence of each whitespace-separated class.
    pub fn remove_class(&self, classes: &str) -> &Self {
        edit_classes(&mut self.dom.borrow_mut(), &self.nodes, |list| {
            list.retain(|c| tokens(classes).all(|class| c != class));
        });
        self
    }

    /// Flip each class, or force it on (`Some(true)`) or off
    /// (`Some(false)`).
    pub fn toggle_class(&self, classes: &str, state: Option<bool>) -> &Self {
        edit_classes(&mut self.dom.borrow_mut(), &self.nodes, |list| {
            for class in tokens(classes) {
                let present = list.iter().any(|c| c == class);
                match state.unwrap_or(!present) {
                    true if !present => list.push(class.to_string()),
                    false => list.retain(|c| c != class),
                    _ => {}
                }
            }
        });
        self
    }

    /// The attribute value of the first node.
    pub fn attr(&self, name: &str) -> Option<String> {
        let first = self.get(0)?;
        self.dom.borrow().attr(first, name).map(str::to_string)
    }

    /// Set an attribute on every element.
    pub fn set_attr(&self, name: &str, value: &str) -> &Self {
        let mut doc = self.dom.borrow_mut();
        for &node in &self.nodes {
            // non-elements are skipped
            let _ = doc.set_attr(node, name, value);
        }
        self
    }

    /// Remove an attribute from every element.
    pub fn remove_attr(&self, name: &str) -> &Self {
        let mut doc = self.dom.borrow_mut();
        for &node in &self.nodes {
            let _ = doc.remove_attr(node, name);
        }
        self
    }

    /// The property value of the first node.
    pub fn prop(&self, name: &str) -> Option<PropValue> {
        let first = self.get(0)?;
        self.dom.borrow().prop(first, name).cloned()
    }

    /// Set a property on every element.
    pub fn set_prop(&self, name: &str, value: impl Into<PropValue>) -> &Self {
        let value = value.into();
        let mut doc = self.dom.borrow_mut();
        for &node in &self.nodes {
            let _ = doc.set_prop(node, name, value.clone());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::collection::Dom;
    use crate::dom::PropValue;

    #[test]
    fn test_class_helpers() {
        let dom = Dom::new();
        let items = dom.parse(r#"<i class="a  b"></i><i></i>"#);
        items.add_class("c a");
        assert_eq!(items.outer_html(), r#"<i class="a b c"></i><i class="c a"></i>"#);

        items.remove_class("a");
        assert!(!items.has_class("a"));
        assert!(items.has_class("C"));

        items.toggle_class("b", None);
        assert_eq!(items.outer_html(), r#"<i class="c"></i><i class="c b"></i>"#);
        items.toggle_class("c", Some(true));
        assert_eq!(items.outer_html(), r#"<i class="c"></i><i class="c b"></i>"#);
        items.toggle_class("c", Some(false));
        assert_eq!(items.outer_html(), r#"<i class=""></i><i class="b"></i>"#);
    }

    #[test]
    fn test_attr_and_prop() {
        let dom = Dom::new();
        let items = dom.parse(r#"<input name="q"><input>"#);
        assert_eq!(items.attr("name").as_deref(), Some("q"));
        items.set_attr("type", "text");
        assert_eq!(items.eq(1).attr("type").as_deref(), Some("text"));
        items.remove_attr("name");
        assert_eq!(items.attr("name"), None);

        items.set_prop("checked", true);
        assert_eq!(items.prop("checked"), Some(PropValue::Bool(true)));
        assert!(!items.outer_html().contains("checked"));
    }
}
