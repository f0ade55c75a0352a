//! Selectors
//!
//! Compound selectors joined by descendant and child combinators.

use crate::error::{DomError, DomResult, ErrorKind};
use crate::realm::Realm;
use crate::value::ObjectId;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Simple {
    Universal,
    Type(String),
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Vec<Simple>>,
    /// `combinators[i]` sits between `compounds[i]` and `compounds[i + 1]`
    combinators: Vec<Combinator>,
}

/// Parsed selector group (`a, b c`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self) -> DomError {
        DomError::new(ErrorKind::Syntax, format!("invalid selector '{}'", self.input))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Skip whitespace; true when any was skipped
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn ident(&mut self) -> DomResult<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' || c == '-' || !c.is_ascii() => {}
            _ => return Err(self.error()),
        }
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-' || !c.is_ascii())
        {
            self.pos += 1;
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn quoted(&mut self, quote: char) -> DomResult<String> {
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(out),
                Some('\\') => match self.bump() {
                    Some(c) => out.push(c),
                    None => return Err(self.error()),
                },
                Some(c) => out.push(c),
                None => return Err(self.error()),
            }
        }
    }

    fn attribute(&mut self) -> DomResult<Simple> {
        self.skip_ws();
        let name = self.ident()?;
        self.skip_ws();
        let value = match self.bump() {
            Some(']') => return Ok(Simple::Attr { name, value: None }),
            Some('=') => {
                self.skip_ws();
                match self.peek() {
                    Some(q @ ('"' | '\'')) => {
                        self.pos += 1;
                        self.quoted(q)?
                    }
                    _ => self.ident()?,
                }
            }
            _ => return Err(self.error()),
        };
        self.skip_ws();
        if self.bump() != Some(']') {
            return Err(self.error());
        }
        Ok(Simple::Attr {
            name,
            value: Some(value),
        })
    }

    fn compound(&mut self) -> DomResult<Vec<Simple>> {
        let mut parts = Vec::new();
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                parts.push(Simple::Universal);
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                parts.push(Simple::Type(self.ident()?.to_ascii_lowercase()));
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    parts.push(Simple::Id(self.ident()?));
                }
                Some('.') => {
                    self.pos += 1;
                    parts.push(Simple::Class(self.ident()?));
                }
                Some('[') => {
                    self.pos += 1;
                    parts.push(self.attribute()?);
                }
                // pseudo-classes are not supported
                Some(':') => return Err(self.error()),
                _ => break,
            }
        }
        if parts.is_empty() {
            return Err(self.error());
        }
        Ok(parts)
    }

    fn complex(&mut self) -> DomResult<Complex> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();
        loop {
            let spaced = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    combinators.push(Combinator::Child);
                }
                _ if spaced => combinators.push(Combinator::Descendant),
                _ => return Err(self.error()),
            }
            compounds.push(self.compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }
}

impl SelectorList {
    /// Parse a selector group; malformed input is a `Syntax` error
    pub fn parse(input: &str) -> DomResult<Self> {
        let mut p = Parser::new(input);
        let mut selectors = Vec::new();
        loop {
            p.skip_ws();
            selectors.push(p.complex()?);
            p.skip_ws();
            if p.at_end() {
                break;
            }
            if p.bump() != Some(',') {
                return Err(p.error());
            }
        }
        Ok(Self { selectors })
    }

    pub fn matches(&self, realm: &Realm, el: ObjectId) -> bool {
        self.selectors
            .iter()
            .any(|s| !s.compounds.is_empty() && match_from(realm, el, s, s.compounds.len() - 1))
    }

    /// Matching descendants of `root` in document order
    pub fn select_all(&self, realm: &Realm, root: ObjectId) -> Vec<ObjectId> {
        realm
            .descendant_elements(root)
            .into_iter()
            .filter(|el| self.matches(realm, *el))
            .collect()
    }

    pub fn select_first(&self, realm: &Realm, root: ObjectId) -> Option<ObjectId> {
        realm
            .descendant_elements(root)
            .into_iter()
            .find(|el| self.matches(realm, *el))
    }
}

fn parent_element(realm: &Realm, el: ObjectId) -> Option<ObjectId> {
    realm.parent_node(el).filter(|p| realm.is_element(*p))
}

fn match_from(realm: &Realm, el: ObjectId, sel: &Complex, i: usize) -> bool {
    if !sel.compounds[i].iter().all(|s| matches_simple(realm, el, s)) {
        return false;
    }
    if i == 0 {
        return true;
    }
    match sel.combinators[i - 1] {
        Combinator::Child => parent_element(realm, el).is_some_and(|p| match_from(realm, p, sel, i - 1)),
        Combinator::Descendant => {
            let mut cur = parent_element(realm, el);
            while let Some(p) = cur {
                if match_from(realm, p, sel, i - 1) {
                    return true;
                }
                cur = parent_element(realm, p);
            }
            false
        }
    }
}

fn matches_simple(realm: &Realm, el: ObjectId, simple: &Simple) -> bool {
    match simple {
        Simple::Universal => true,
        Simple::Type(tag) => realm.tag_name(el).is_some_and(|t| t.eq_ignore_ascii_case(tag)),
        Simple::Id(id) => realm.attribute_text(el, "id").is_some_and(|v| v == *id),
        Simple::Class(class) => realm
            .attribute_text(el, "class")
            .is_some_and(|v| v.split_ascii_whitespace().any(|c| c == class)),
        Simple::Attr { name, value: None } => realm.attribute_text(el, name).is_some(),
        Simple::Attr {
            name,
            value: Some(expected),
        } => realm.attribute_text(el, name).is_some_and(|v| v == *expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DocumentMode;
    use crate::value::Value;

    #[test]
    fn test_invalid_selectors() {
        for input in ["[s!='']", "*,:x", "*,##", ":x", "##", "*,", ",", "", "div >", "a..b"] {
            let err = SelectorList::parse(input).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Syntax, "{input}");
        }
    }

    #[test]
    fn test_valid_selectors() {
        for input in ["*", "div", "#id", ".a.b", "div [title]", "a[href='x y']", "body > div, p", " span "] {
            assert!(SelectorList::parse(input).is_ok(), "{input}");
        }
    }

    #[test]
    fn test_matching() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        let div = realm.create_element("div").unwrap();
        let span = realm.create_element("span").unwrap();
        realm.append_child(body, div).unwrap();
        realm.append_child(div, span).unwrap();
        realm.set_attribute(div, "class", Value::string("one two")).unwrap();
        realm.set_attribute(span, "id", Value::string("s1")).unwrap();
        realm.set_attribute(span, "title", Value::string("t")).unwrap();

        let check = |sel: &str, el: ObjectId| SelectorList::parse(sel).unwrap().matches(&realm, el);
        assert!(check("span", span));
        assert!(check("SPAN", span));
        assert!(check("#s1", span));
        assert!(check(".two span", span));
        assert!(check("body > div > span", span));
        assert!(!check("body > span", span));
        assert!(check("[title=t]", span));
        assert!(!check("[title=x]", span));
        assert!(check("p, .one", div));

        let all = SelectorList::parse("*").unwrap().select_all(&realm, body);
        assert_eq!(all, vec![div, span]);
    }
}
