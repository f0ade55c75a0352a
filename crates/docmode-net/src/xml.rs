//! XML response documents
//!
//! Just enough parsing to find the root element of a response body.

use crate::error::XhrError;

/// A parsed XML response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: String,
    source: String,
}

impl XmlDocument {
    /// Parse `source`, skipping the prolog, comments and doctype
    pub fn parse(source: &str) -> Result<Self, XhrError> {
        let mut rest = source.trim_start_matches('\u{feff}').trim_start();
        loop {
            if let Some(after) = rest.strip_prefix("<?") {
                rest = skip_past(after, "?>")?;
            } else if let Some(after) = rest.strip_prefix("<!--") {
                rest = skip_past(after, "-->")?;
            } else if let Some(after) = rest.strip_prefix("<!") {
                rest = skip_past(after, ">")?;
            } else {
                break;
            }
            rest = rest.trim_start();
        }

        let body = rest
            .strip_prefix('<')
            .ok_or_else(|| XhrError::Parse("no root element".to_string()))?;
        let end = body
            .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
            .unwrap_or(body.len());
        let root = &body[..end];
        if root.is_empty() {
            return Err(XhrError::Parse("empty element name".to_string()));
        }

        let open_end = body
            .find('>')
            .ok_or_else(|| XhrError::Parse(format!("unterminated <{root}>")))?;
        let self_closing = body[..open_end].ends_with('/');
        if !self_closing && !body.contains(&format!("</{root}")) {
            return Err(XhrError::Parse(format!("missing </{root}>")));
        }

        Ok(Self {
            root: root.to_string(),
            source: source.to_string(),
        })
    }

    /// Name of the document element
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// XML documents never have HTML anchors
    pub fn anchor_count(&self) -> usize {
        0
    }
}

fn skip_past<'a>(text: &'a str, terminator: &str) -> Result<&'a str, XhrError> {
    text.find(terminator)
        .map(|i| &text[i + terminator.len()..])
        .ok_or_else(|| XhrError::Parse(format!("unterminated markup, expected {terminator}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prolog_is_skipped() {
        let doc = XmlDocument::parse("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a name=\"test\">wine</a>").unwrap();
        assert_eq!(doc.root(), "a");
        assert_eq!(doc.anchor_count(), 0);
    }

    #[test]
    fn test_comment_doctype_and_self_closing() {
        let doc = XmlDocument::parse("<!-- c --><!DOCTYPE r><r:root xmlns:r=\"urn:x\"/>").unwrap();
        assert_eq!(doc.root(), "r:root");
    }

    #[test]
    fn test_malformed() {
        assert!(XmlDocument::parse("plain text").is_err());
        assert!(XmlDocument::parse("<a>unclosed").is_err());
        assert!(XmlDocument::parse("<?xml version=\"1.0\"").is_err());
    }
}
