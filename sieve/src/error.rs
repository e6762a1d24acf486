use facet::Facet;

/// Errors raised while parsing a selector string.
///
/// Only structurally broken input is an error. Selectors that are merely
/// odd (unknown punctuation, unknown pseudo-classes, malformed attribute
/// bodies) parse into compounds that never match.
#[derive(Facet, Debug, Clone, PartialEq, Eq)]
#[facet(derive(Error))]
#[repr(u8)]
pub enum SelectorError {
    /// selector "{selector}" has a bare . or # with nothing to qualify
    DanglingSigil { selector: String },
    /// selector "{selector}" has an unclosed attribute selector
    UnclosedAttribute { selector: String },
    /// selector "{selector}" has an unterminated quoted string
    UnterminatedString { selector: String },
    /// selector "{selector}" has an unclosed parenthesis
    UnclosedParenthesis { selector: String },
}

impl SelectorError {
    /// The full selector string that failed to parse.
    pub fn selector(&self) -> &str {
        match self {
            SelectorError::DanglingSigil { selector }
            | SelectorError::UnclosedAttribute { selector }
            | SelectorError::UnterminatedString { selector }
            | SelectorError::UnclosedParenthesis { selector } => selector,
        }
    }
}
