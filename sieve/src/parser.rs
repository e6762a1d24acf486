//! Hand-rolled selector scanner.
//!
//! The input is first split on top-level commas, then every part is scanned
//! left to right into a [`SelectorChain`]. Only unbalanced delimiters and a
//! bare `.`/`#` are errors; anything else the scanner does not understand
//! becomes [`SimpleSelector::Unmatchable`] so that the selector quietly
//! matches nothing.

use smallvec::SmallVec;

use crate::ast::*;
use crate::error::SelectorError;
#[allow(unused_imports)]
use crate::trace;

/// Parse a selector string into a [`SelectorList`].
///
/// Empty and whitespace-only input yields an empty list.
///
/// ```
/// let list = sieve::parse("div.note > a[href^=http], #main").unwrap();
/// assert_eq!(list.len(), 2);
/// assert_eq!(list.to_string(), "div.note > a[href^=\"http\"], #main");
/// ```
pub fn parse(input: &str) -> Result<SelectorList, SelectorError> {
    parse_with_source(input, input)
}

/// Parse `input`, reporting errors against `source` (the outermost selector
/// when parsing the argument of `:not(...)`).
fn parse_with_source(input: &str, source: &str) -> Result<SelectorList, SelectorError> {
    let mut chains = Vec::new();
    for part in split_top_level(input) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let mut parser = ChainParser {
            source,
            input: part,
            pos: 0,
        };
        chains.push(parser.parse_chain()?);
    }
    trace!(selector = input, chains = chains.len(), "parsed selector");
    Ok(SelectorList { chains })
}

/// Split on commas that are not escaped, quoted, or nested in `[]`/`()`.
///
/// Unbalanced input is returned as-is; the chain scanner reports it.
fn split_top_level(input: &str) -> SmallVec<[&str; 4]> {
    let mut parts = SmallVec::new();
    let mut open: SmallVec<[char; 8]> = SmallVec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (_, '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') if !open.is_empty() => quote = Some(c),
            (None, '[') if open.last() != Some(&'[') => open.push('['),
            (None, '(') if open.last() != Some(&'[') => open.push('('),
            (None, ']') if open.last() == Some(&'[') => {
                open.pop();
            }
            (None, ')') if open.last() == Some(&'(') => {
                open.pop();
            }
            (None, ',') if open.is_empty() => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn explicit_combinator(c: char) -> Option<Combinator> {
    match c {
        '>' => Some(Combinator::Child),
        '+' => Some(Combinator::NextSibling),
        '~' => Some(Combinator::SubsequentSibling),
        _ => None,
    }
}

pub(crate) fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || (!c.is_ascii() && !c.is_whitespace())
}

fn is_tag_start(c: char) -> bool {
    (is_ident_char(c) && !c.is_ascii_digit()) || c == '\\'
}

fn ends_compound(c: char) -> bool {
    c.is_whitespace() || c == ',' || explicit_combinator(c).is_some()
}

struct ChainParser<'a> {
    /// The whole selector, quoted in errors.
    source: &'a str,
    /// The chain being scanned.
    input: &'a str,
    pos: usize,
}

impl<'a> ChainParser<'a> {
    fn parse_chain(&mut self) -> Result<SelectorChain, SelectorError> {
        let mut head: Option<CompoundSelector> = None;
        let mut steps = Vec::new();
        let mut pending: Option<Combinator> = None;
        let mut broken = false;

        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else { break };

            if let Some(combinator) = explicit_combinator(c) {
                self.advance();
                // `> a`, `a > > b`
                if head.is_none() || pending.is_some() {
                    broken = true;
                }
                pending = Some(combinator);
                continue;
            }

            let compound = self.parse_compound()?;
            match head {
                None => head = Some(compound),
                Some(_) => steps.push(ChainStep {
                    combinator: pending.take().unwrap_or(Combinator::Descendant),
                    compound,
                }),
            }
            pending = None;
        }

        match head {
            Some(head) if !broken && pending.is_none() => Ok(SelectorChain { head, steps }),
            _ => {
                trace!(chain = self.input, "dangling combinator, chain never matches");
                Ok(SelectorChain::unmatchable(self.input))
            }
        }
    }

    fn parse_compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut parts = Vec::new();
        let mut dangling = false;

        while let Some(c) = self.peek() {
            match c {
                c if ends_compound(c) => break,
                '*' => {
                    self.advance();
                    parts.push(SimpleSelector::Universal);
                }
                '.' | '#' => {
                    self.advance();
                    let name = self.parse_identifier();
                    if name.is_empty() {
                        dangling = true;
                    } else if c == '.' {
                        parts.push(SimpleSelector::Class(name));
                    } else {
                        parts.push(SimpleSelector::Id(name));
                    }
                }
                '[' => parts.push(self.parse_attribute()?),
                ':' => parts.push(self.parse_pseudo()?),
                c if is_tag_start(c) && parts.is_empty() && !dangling => {
                    parts.push(SimpleSelector::Tag(self.parse_identifier()));
                }
                _ => parts.push(SimpleSelector::Unmatchable(self.skip_junk())),
            }
        }

        if parts.is_empty() && dangling {
            return Err(SelectorError::DanglingSigil {
                selector: self.source.to_string(),
            });
        }
        Ok(CompoundSelector { parts })
    }

    fn parse_identifier(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c == '\\' {
                self.advance();
                if let Some(escaped) = self.peek() {
                    out.push(escaped);
                    self.advance();
                }
            } else if is_ident_char(c) {
                out.push(c);
                self.advance();
            } else {
                break;
            }
        }
        out
    }

    /// Consume unrecognized input up to the next compound boundary.
    fn skip_junk(&mut self) -> String {
        let start = self.pos;
        self.advance();
        while let Some(c) = self.peek() {
            if ends_compound(c) || c == '[' {
                break;
            }
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> Result<SimpleSelector, SelectorError> {
        self.advance();
        let start = self.pos;
        let mut quote: Option<char> = None;

        loop {
            let Some(c) = self.peek() else {
                let selector = self.source.to_string();
                return Err(match quote {
                    Some(_) => SelectorError::UnterminatedString { selector },
                    None => SelectorError::UnclosedAttribute { selector },
                });
            };
            self.advance();
            match (quote, c) {
                (_, '\\') => self.advance(),
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, ']') => break,
                (None, _) => {}
            }
        }

        let body = &self.input[start..self.pos - 1];
        Ok(match parse_attribute_body(body) {
            Some(attr) => SimpleSelector::Attribute(attr),
            None => SimpleSelector::Unmatchable(format!("[{body}]")),
        })
    }

    fn parse_pseudo(&mut self) -> Result<SimpleSelector, SelectorError> {
        let start = self.pos;
        self.advance();
        let is_element = self.peek() == Some(':');
        if is_element {
            self.advance();
        }
        let name = self.parse_identifier().to_ascii_lowercase();
        let args = match self.peek() {
            Some('(') => Some(self.parse_parenthesized()?),
            _ => None,
        };
        let text = &self.input[start..self.pos];
        if is_element || name.is_empty() {
            return Ok(SimpleSelector::Unmatchable(text.to_string()));
        }

        let pseudo = match (name.as_str(), args) {
            ("first-child", None) => Some(PseudoClass::FirstChild),
            ("last-child", None) => Some(PseudoClass::LastChild),
            ("only-child", None) => Some(PseudoClass::OnlyChild),
            ("first-of-type", None) => Some(PseudoClass::FirstOfType),
            ("last-of-type", None) => Some(PseudoClass::LastOfType),
            ("only-of-type", None) => Some(PseudoClass::OnlyOfType),
            ("empty", None) => Some(PseudoClass::Empty),
            ("root", None) => Some(PseudoClass::Root),
            ("nth-child", Some(args)) => NthExpr::parse(args).map(PseudoClass::NthChild),
            ("nth-last-child", Some(args)) => NthExpr::parse(args).map(PseudoClass::NthLastChild),
            ("nth-of-type", Some(args)) => NthExpr::parse(args).map(PseudoClass::NthOfType),
            ("nth-last-of-type", Some(args)) => {
                NthExpr::parse(args).map(PseudoClass::NthLastOfType)
            }
            ("contains", Some(args)) => Some(PseudoClass::Contains(
                unquote(args.trim()).unwrap_or_else(|| unescape(args.trim())),
            )),
            ("not", Some(args)) => {
                let inner = parse_with_source(args, self.source)?;
                (!inner.is_empty()).then_some(PseudoClass::Not(inner))
            }
            _ => None,
        };

        Ok(match pseudo {
            Some(pseudo) => SimpleSelector::Pseudo(pseudo),
            None => SimpleSelector::Unmatchable(text.to_string()),
        })
    }

    /// Consume `( ... )` and return what is inside, honoring nesting and quotes.
    fn parse_parenthesized(&mut self) -> Result<&'a str, SelectorError> {
        let input = self.input;
        self.advance();
        let start = self.pos;
        let mut depth = 1usize;
        let mut quote: Option<char> = None;

        loop {
            let Some(c) = self.peek() else {
                let selector = self.source.to_string();
                return Err(match quote {
                    Some(_) => SelectorError::UnterminatedString { selector },
                    None => SelectorError::UnclosedParenthesis { selector },
                });
            };
            self.advance();
            match (quote, c) {
                (_, '\\') => self.advance(),
                (Some(q), c) if c == q => quote = None,
                (Some(_), _) => {}
                (None, '"' | '\'') => quote = Some(c),
                (None, '(') => depth += 1,
                (None, ')') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                (None, _) => {}
            }
        }

        Ok(&input[start..self.pos - 1])
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }
}

/// Parse the inside of `[...]`. `None` means the body is malformed.
fn parse_attribute_body(body: &str) -> Option<AttributeSelector> {
    let body = body.trim();
    let name_end = body
        .find(|c: char| matches!(c, '=' | '~' | '|' | '^' | '$' | '*' | '!') || c.is_whitespace())
        .unwrap_or(body.len());
    let name = unescape(&body[..name_end]);
    if name.is_empty() {
        return None;
    }

    let rest = body[name_end..].trim_start();
    if rest.is_empty() {
        return Some(AttributeSelector {
            name,
            operator: AttributeOperator::Exists,
            value: String::new(),
        });
    }

    let op_len = if rest.starts_with('=') { 1 } else { 2 };
    let operator = AttributeOperator::from_token(rest.get(..op_len)?)?;
    let raw = rest[op_len..].trim();
    let value = match unquote(raw) {
        Some(value) => value,
        None if raw.is_empty() || raw.contains(char::is_whitespace) => return None,
        None if raw.contains(['"', '\'']) => return None,
        None => unescape(raw),
    };

    Some(AttributeSelector {
        name,
        operator,
        value,
    })
}

/// Strip matching surrounding quotes and resolve escapes. `None` if `raw` is
/// not a quoted string.
fn unquote(raw: &str) -> Option<String> {
    let quote = raw.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let inner = raw.strip_prefix(quote)?.strip_suffix(quote)?;
    Some(unescape(inner))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}
