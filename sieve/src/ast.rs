//! Selector syntax tree.
//!
//! The tree is plain data: it carries no references into any document and
//! can be serialized with any facet format crate. Matching lives elsewhere.

use std::fmt;

use facet::Facet;

use crate::parser::is_ident_char;

/// A comma-separated list of alternative chains.
///
/// A node matches the list if it matches any chain. An empty list matches
/// nothing.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectorList {
    /// Alternatives, in source order.
    pub chains: Vec<SelectorChain>,
}

impl SelectorList {
    /// Parse a selector string. See [`crate::parse`].
    pub fn parse(input: &str) -> Result<Self, crate::SelectorError> {
        crate::parse(input)
    }

    /// Returns true if the list has no chains (it can never match).
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Number of alternative chains.
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// Iterate over the chains.
    pub fn iter(&self) -> std::slice::Iter<'_, SelectorChain> {
        self.chains.iter()
    }
}

impl std::str::FromStr for SelectorList {
    type Err = crate::SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse(s)
    }
}

impl<'a> IntoIterator for &'a SelectorList {
    type Item = &'a SelectorChain;
    type IntoIter = std::slice::Iter<'a, SelectorChain>;

    fn into_iter(self) -> Self::IntoIter {
        self.chains.iter()
    }
}

/// Compound selectors joined by combinators, read left to right.
///
/// `div > p.note a` is `head = div`, then `(Child, p.note)`, then
/// `(Descendant, a)`. The last compound is the subject: the node the chain
/// selects.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct SelectorChain {
    /// Leftmost compound.
    pub head: CompoundSelector,
    /// Each following compound with the combinator that links it to the
    /// compound on its left.
    pub steps: Vec<ChainStep>,
}

impl SelectorChain {
    /// A chain with a single compound.
    pub fn single(head: CompoundSelector) -> Self {
        Self {
            head,
            steps: Vec::new(),
        }
    }

    /// A chain that never matches, keeping the offending text around for
    /// diagnostics.
    pub fn unmatchable(text: impl Into<String>) -> Self {
        Self::single(CompoundSelector {
            parts: vec![SimpleSelector::Unmatchable(text.into())],
        })
    }

    /// The rightmost compound.
    pub fn subject(&self) -> &CompoundSelector {
        self.steps.last().map(|s| &s.compound).unwrap_or(&self.head)
    }

    /// Compounds in source order.
    pub fn compounds(&self) -> impl DoubleEndedIterator<Item = &CompoundSelector> {
        std::iter::once(&self.head).chain(self.steps.iter().map(|s| &s.compound))
    }

    /// Returns true if some compound can never match.
    pub fn is_unmatchable(&self) -> bool {
        self.compounds().any(CompoundSelector::is_unmatchable)
    }
}

/// One `(combinator, compound)` link of a chain.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub combinator: Combinator,
    pub compound: CompoundSelector,
}

/// Relationship between two compounds.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Combinator {
    /// Whitespace: any ancestor.
    Descendant,
    /// `>`: the parent.
    Child,
    /// `+`: the immediately preceding element sibling.
    NextSibling,
    /// `~`: any preceding element sibling.
    SubsequentSibling,
}

/// Simple selectors that must all match the same node.
#[derive(Facet, Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub parts: Vec<SimpleSelector>,
}

impl CompoundSelector {
    /// Returns true if one of the parts can never match.
    pub fn is_unmatchable(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, SimpleSelector::Unmatchable(_)))
    }
}

/// The atoms of a compound selector.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum SimpleSelector {
    /// `*`
    Universal,
    /// Tag name, compared ASCII case-insensitively.
    Tag(String),
    /// `#id`, compared case-sensitively.
    Id(String),
    /// `.class`, compared case-insensitively.
    Class(String),
    /// `[name op value]`
    Attribute(AttributeSelector),
    /// `:name` or `:name(args)`
    Pseudo(PseudoClass),
    /// Input that could not be understood. Never matches.
    Unmatchable(String),
}

/// An attribute test.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    /// Attribute name, matched case-sensitively.
    pub name: String,
    pub operator: AttributeOperator,
    /// Expected value with quotes removed. Empty for [`AttributeOperator::Exists`].
    pub value: String,
}

/// How an attribute value is compared.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttributeOperator {
    /// `[name]`
    Exists,
    /// `[name=value]`
    Equals,
    /// `[name*=value]`: substring.
    Contains,
    /// `[name^=value]`: prefix.
    StartsWith,
    /// `[name$=value]`: suffix.
    EndsWith,
    /// `[name~=value]`: whitespace-separated token.
    ContainsWord,
    /// `[name|=value]`: exactly `value` or starting with `value-`.
    DashMatch,
}

impl AttributeOperator {
    /// The operator as written in a selector (empty for `Exists`).
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeOperator::Exists => "",
            AttributeOperator::Equals => "=",
            AttributeOperator::Contains => "*=",
            AttributeOperator::StartsWith => "^=",
            AttributeOperator::EndsWith => "$=",
            AttributeOperator::ContainsWord => "~=",
            AttributeOperator::DashMatch => "|=",
        }
    }

    pub(crate) fn from_token(op: &str) -> Option<Self> {
        Some(match op {
            "=" => AttributeOperator::Equals,
            "*=" => AttributeOperator::Contains,
            "^=" => AttributeOperator::StartsWith,
            "$=" => AttributeOperator::EndsWith,
            "~=" => AttributeOperator::ContainsWord,
            "|=" => AttributeOperator::DashMatch,
            _ => return None,
        })
    }
}

/// Structural and content pseudo-classes.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PseudoClass {
    FirstChild,
    LastChild,
    OnlyChild,
    NthChild(NthExpr),
    NthLastChild(NthExpr),
    FirstOfType,
    LastOfType,
    OnlyOfType,
    NthOfType(NthExpr),
    NthLastOfType(NthExpr),
    /// No element children and no non-whitespace text.
    Empty,
    /// No element parent.
    Root,
    /// Text content contains the given string.
    Contains(String),
    /// Matches none of the inner chains.
    Not(SelectorList),
}

/// An `An+B` position formula, 1-based like CSS.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NthExpr {
    pub a: i32,
    pub b: i32,
}

impl NthExpr {
    /// `2n`
    pub const EVEN: NthExpr = NthExpr { a: 2, b: 0 };
    /// `2n+1`
    pub const ODD: NthExpr = NthExpr { a: 2, b: 1 };

    /// Parse `even`, `odd`, an integer, or an `An+B` formula.
    ///
    /// Whitespace is ignored and the input is case-insensitive.
    pub fn parse(input: &str) -> Option<Self> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        match compact.as_str() {
            "" => return None,
            "even" => return Some(Self::EVEN),
            "odd" => return Some(Self::ODD),
            _ => {}
        }

        let Some(n_pos) = compact.find('n') else {
            return compact.parse().ok().map(|b| NthExpr { a: 0, b });
        };

        let (a_part, b_part) = (&compact[..n_pos], &compact[n_pos + 1..]);
        let a = match a_part {
            "" | "+" => 1,
            "-" => -1,
            _ => a_part.parse().ok()?,
        };
        let b = match b_part {
            "" => 0,
            _ if b_part.starts_with('+') || b_part.starts_with('-') => b_part.parse().ok()?,
            _ => return None,
        };
        Some(NthExpr { a, b })
    }

    /// Whether the 1-based `position` satisfies `a*n + b` for some `n >= 0`.
    pub fn matches(&self, position: usize) -> bool {
        let Ok(position) = i64::try_from(position) else {
            return false;
        };
        let (a, b) = (i64::from(self.a), i64::from(self.b));
        if a == 0 {
            return position == b;
        }
        let diff = position - b;
        diff % a == 0 && diff / a >= 0
    }
}

// =============================================================================
// Display: canonical selector text
// =============================================================================

/// Write an identifier, backslash-escaping what would not scan as one.
fn write_ident(f: &mut fmt::Formatter<'_>, ident: &str, leading_digit_ok: bool) -> fmt::Result {
    for (i, c) in ident.chars().enumerate() {
        let plain = is_ident_char(c) && (leading_digit_ok || i > 0 || !c.is_ascii_digit());
        if !plain {
            f.write_str("\\")?;
        }
        write!(f, "{c}")?;
    }
    Ok(())
}

/// Write a double-quoted string with `\` and `"` escaped.
fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    write!(f, "\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chain) in self.chains.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{chain}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.head)?;
        for step in &self.steps {
            write!(f, "{}{}", step.combinator, step.compound)?;
        }
        Ok(())
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Combinator::Descendant => " ",
            Combinator::Child => " > ",
            Combinator::NextSibling => " + ",
            Combinator::SubsequentSibling => " ~ ",
        })
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in &self.parts {
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

impl fmt::Display for SimpleSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimpleSelector::Universal => f.write_str("*"),
            SimpleSelector::Tag(name) => write_ident(f, name, false),
            SimpleSelector::Id(id) => {
                f.write_str("#")?;
                write_ident(f, id, true)
            }
            SimpleSelector::Class(class) => {
                f.write_str(".")?;
                write_ident(f, class, true)
            }
            SimpleSelector::Attribute(attr) => write!(f, "{attr}"),
            SimpleSelector::Pseudo(pseudo) => write!(f, ":{pseudo}"),
            SimpleSelector::Unmatchable(text) => f.write_str(text),
        }
    }
}

impl fmt::Display for AttributeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        write_ident(f, &self.name, true)?;
        if self.operator != AttributeOperator::Exists {
            f.write_str(self.operator.as_str())?;
            write_quoted(f, &self.value)?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for PseudoClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PseudoClass::FirstChild => f.write_str("first-child"),
            PseudoClass::LastChild => f.write_str("last-child"),
            PseudoClass::OnlyChild => f.write_str("only-child"),
            PseudoClass::NthChild(expr) => write!(f, "nth-child({expr})"),
            PseudoClass::NthLastChild(expr) => write!(f, "nth-last-child({expr})"),
            PseudoClass::FirstOfType => f.write_str("first-of-type"),
            PseudoClass::LastOfType => f.write_str("last-of-type"),
            PseudoClass::OnlyOfType => f.write_str("only-of-type"),
            PseudoClass::NthOfType(expr) => write!(f, "nth-of-type({expr})"),
            PseudoClass::NthLastOfType(expr) => write!(f, "nth-last-of-type({expr})"),
            PseudoClass::Empty => f.write_str("empty"),
            PseudoClass::Root => f.write_str("root"),
            PseudoClass::Contains(text) => {
                f.write_str("contains(")?;
                write_quoted(f, text)?;
                f.write_str(")")
            }
            PseudoClass::Not(list) => write!(f, "not({list})"),
        }
    }
}

impl fmt::Display for NthExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.a, self.b) {
            (0, b) => write!(f, "{b}"),
            (a, 0) => write!(f, "{a}n"),
            (a, b) if b > 0 => write!(f, "{a}n+{b}"),
            (a, b) => write!(f, "{a}n{b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nth_keywords() {
        assert_eq!(NthExpr::parse("even"), Some(NthExpr::EVEN));
        assert_eq!(NthExpr::parse(" ODD "), Some(NthExpr::ODD));
        assert_eq!(NthExpr::parse("3"), Some(NthExpr { a: 0, b: 3 }));
    }

    #[test]
    fn nth_formulas() {
        assert_eq!(NthExpr::parse("n"), Some(NthExpr { a: 1, b: 0 }));
        assert_eq!(NthExpr::parse("-n+3"), Some(NthExpr { a: -1, b: 3 }));
        assert_eq!(NthExpr::parse("2n + 1"), Some(NthExpr { a: 2, b: 1 }));
        assert_eq!(NthExpr::parse("3n-2"), Some(NthExpr { a: 3, b: -2 }));
        assert_eq!(NthExpr::parse("+n"), Some(NthExpr { a: 1, b: 0 }));
    }

    #[test]
    fn nth_rejects_garbage() {
        assert_eq!(NthExpr::parse(""), None);
        assert_eq!(NthExpr::parse("foo"), None);
        assert_eq!(NthExpr::parse("2n3"), None);
        assert_eq!(NthExpr::parse("xn+1"), None);
    }

    #[test]
    fn nth_matching() {
        let odd: Vec<usize> = (1..=6).filter(|&p| NthExpr::ODD.matches(p)).collect();
        assert_eq!(odd, vec![1, 3, 5]);

        let even: Vec<usize> = (1..=6).filter(|&p| NthExpr::EVEN.matches(p)).collect();
        assert_eq!(even, vec![2, 4, 6]);

        let first_three = NthExpr { a: -1, b: 3 };
        let hits: Vec<usize> = (1..=6).filter(|&p| first_three.matches(p)).collect();
        assert_eq!(hits, vec![1, 2, 3]);

        assert!(NthExpr { a: 0, b: 4 }.matches(4));
        assert!(!NthExpr { a: 0, b: 4 }.matches(5));
    }

    #[test]
    fn display_is_canonical() {
        let chain = SelectorChain {
            head: CompoundSelector {
                parts: vec![
                    SimpleSelector::Tag("div".into()),
                    SimpleSelector::Class("a".into()),
                ],
            },
            steps: vec![ChainStep {
                combinator: Combinator::Child,
                compound: CompoundSelector {
                    parts: vec![SimpleSelector::Attribute(AttributeSelector {
                        name: "href".into(),
                        operator: AttributeOperator::StartsWith,
                        value: "http".into(),
                    })],
                },
            }],
        };
        assert_eq!(chain.to_string(), "div.a > [href^=\"http\"]");
    }
}
