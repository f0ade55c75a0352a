//! Markup
//!
//! Fragment parsing behind `innerHTML` and inline `createElement` tags.

use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, ParseOpts, QualName, parse_fragment};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::error::DomResult;
use crate::node::NodeKind;
use crate::realm::Realm;
use crate::value::{ObjectId, Value};

const HTML_NS: &str = "http://www.w3.org/1999/xhtml";

/// Elements that never have children
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track",
    "wbr",
];

/// Name and attributes of a parsed start tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartTag {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;").replace('"', "&quot;")
}

/// Parse `markup` as the children of a `context` element; returns the
/// fragment root whose children are the parsed nodes
fn parse_in_context(markup: &str, context: &str) -> Option<Handle> {
    let name = QualName::new(None, Namespace::from(HTML_NS), LocalName::from(context));
    let dom = parse_fragment(RcDom::default(), ParseOpts::default(), name, Vec::new(), false).one(markup);
    dom.document.children.borrow().first().cloned()
}

fn start_tag(handle: &Handle) -> Option<StartTag> {
    let NodeData::Element { name, attrs, .. } = &handle.data else {
        return None;
    };
    let attrs = attrs
        .borrow()
        .iter()
        .map(|a| {
            let local = a.name.local.to_string();
            let qualified = match &a.name.prefix {
                Some(prefix) => format!("{prefix}:{local}"),
                None => local,
            };
            (qualified, a.value.to_string())
        })
        .collect();
    Some(StartTag {
        name: name.local.to_string(),
        attrs,
    })
}

/// Parse `<tag attr=...>` as accepted by legacy `createElement`; `None`
/// when no element survives parsing
pub(crate) fn parse_inline_tag(markup: &str) -> Option<StartTag> {
    let markup = markup.trim();
    if !markup.starts_with('<') {
        return None;
    }
    let root = parse_in_context(markup, "body")?;
    let first = root.children.borrow().first().cloned()?;
    start_tag(&first)
}

/// Evaluate `[if lte IE 7]`-style conditions; `None` when `comment` is not
/// a downlevel-hidden conditional comment
pub(crate) fn conditional_comment(comment: &str, version: u8) -> Option<(bool, &str)> {
    let rest = comment.strip_prefix("[if ")?;
    let (cond, body) = rest.split_once("]>")?;
    let body = body.strip_suffix("<![endif]")?;
    let mut words = cond.split_whitespace();
    let (op, ie) = match words.next()? {
        "IE" => ("eq", "IE"),
        op => (op, words.next()?),
    };
    if ie != "IE" {
        return None;
    }
    let v = match words.next() {
        Some(n) => n.split('.').next()?.parse::<u8>().ok()?,
        None => return Some((op == "eq", body)),
    };
    let ok = match op {
        "eq" => version == v,
        "lt" => version < v,
        "lte" => version <= v,
        "gt" => version > v,
        "gte" => version >= v,
        "!" => version != v,
        _ => return None,
    };
    Some((ok, body))
}

impl Realm {
    /// Replace the children of `el` with parsed `markup`
    pub fn set_inner_html(&mut self, el: ObjectId, markup: &str) -> DomResult<()> {
        for child in self.children(el) {
            self.remove_child(el, child)?;
        }
        self.append_markup(el, markup)
    }

    fn append_markup(&mut self, parent: ObjectId, markup: &str) -> DomResult<()> {
        let context = self.tag_name(parent).unwrap_or("body").to_string();
        let Some(root) = parse_in_context(markup, &context) else {
            return Ok(());
        };
        tracing::trace!(context = %context, "markup parsed");
        let children = root.children.borrow().clone();
        for child in &children {
            self.convert_node(child, parent)?;
        }
        Ok(())
    }

    fn convert_node(&mut self, handle: &Handle, parent: ObjectId) -> DomResult<()> {
        match &handle.data {
            NodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                let node = self.create_node("Text", NodeKind::Text(text))?;
                self.append_child(parent, node)?;
            }
            NodeData::Comment { contents } => {
                // conditional comments are plain comments from mode 10
                let version = self.mode_version();
                if version < 10 {
                    if let Some((active, body)) = conditional_comment(contents, version) {
                        if active {
                            self.append_markup(parent, body)?;
                        }
                        return Ok(());
                    }
                }
                let node = self.create_node("Comment", NodeKind::Comment(contents.to_string()))?;
                self.append_child(parent, node)?;
            }
            NodeData::Element { .. } => {
                let Some(tag) = start_tag(handle) else {
                    return Ok(());
                };
                let el = self.alloc_element(&tag.name);
                for (name, value) in tag.attrs {
                    self.set_attribute(el, &name, Value::String(value))?;
                }
                self.append_child(parent, el)?;
                let children = handle.children.borrow().clone();
                for child in &children {
                    self.convert_node(child, el)?;
                }
            }
            NodeData::Document | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {}
        }
        Ok(())
    }

    /// Serialize the children of `el`
    pub fn inner_html(&self, el: ObjectId) -> String {
        let mut out = String::new();
        for child in self.children(el) {
            self.serialize_node(child, &mut out);
        }
        out
    }

    fn serialize_node(&self, id: ObjectId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Element(e) => {
                let tag = if self.mode().is_legacy() {
                    e.tag.to_ascii_uppercase()
                } else {
                    e.tag.clone()
                };
                out.push('<');
                out.push_str(&tag);
                for attr in e.attributes.iter() {
                    if let Some(v) = attr.value.primitive_to_string() {
                        out.push_str(&format!(" {}=\"{}\"", attr.qualified_name(), escape_attr(&v)));
                    }
                }
                out.push('>');
                if VOID_TAGS.contains(&e.tag.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(id));
                out.push_str(&format!("</{tag}>"));
            }
            NodeKind::Text(s) => out.push_str(&escape_text(s)),
            NodeKind::Comment(s) => out.push_str(&format!("<!--{s}-->")),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DocumentMode;

    #[test]
    fn test_inline_tag() {
        let tag = parse_inline_tag("<div test='a\"' abcd=\"&quot;b&#34;\">").unwrap();
        assert_eq!(tag.name, "div");
        assert_eq!(
            tag.attrs,
            vec![
                ("test".to_string(), "a\"".to_string()),
                ("abcd".to_string(), "\"b\"".to_string())
            ]
        );
        assert!(parse_inline_tag("<div >").is_some());
        assert_eq!(parse_inline_tag("<DIV/>").unwrap().name, "div");
        assert!(parse_inline_tag("<div").is_none());
        assert!(parse_inline_tag("<div test=1").is_none());
        assert!(parse_inline_tag("div").is_none());
    }

    #[test]
    fn test_conditional_comment() {
        assert_eq!(conditional_comment("[if lte IE 7]>true<![endif]", 7), Some((true, "true")));
        assert_eq!(conditional_comment("[if lt IE 7]>true<![endif]", 7), Some((false, "true")));
        assert_eq!(conditional_comment("[if gte IE 5]>x<![endif]", 8), Some((true, "x")));
        assert_eq!(conditional_comment("[if IE]>x<![endif]", 8), Some((true, "x")));
        assert_eq!(conditional_comment("plain", 8), None);
    }

    #[test]
    fn test_inner_html_roundtrip_tree() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        realm.set_inner_html(body, "<div id=\"a\">test<br>x</div>").unwrap();
        let div = realm.children(body)[0];
        assert_eq!(realm.tag_name(div), Some("div"));
        assert_eq!(realm.children(div).len(), 3);
        assert_eq!(realm.inner_html(body), "<div id=\"a\">test<br>x</div>");
    }

    #[test]
    fn test_inner_html_follows_tree_construction() {
        let mut realm = Realm::new(DocumentMode::IE11);
        let div = realm.create_element("div").unwrap();
        realm
            .set_inner_html(div, "<p>one<p>two &amp; <b>three</p><!--c-->")
            .unwrap();
        let children = realm.children(div);
        assert_eq!(children.len(), 3);
        assert_eq!(realm.tag_name(children[0]), Some("p"));
        assert_eq!(realm.tag_name(children[1]), Some("p"));
        assert_eq!(realm.text_content(children[1]).as_deref(), Some("two & three"));
        assert_eq!(realm.inner_html(div), "<p>one</p><p>two &amp; <b>three</b></p><!--c-->");
    }

    #[test]
    fn test_conditional_comments_by_mode() {
        for (mode, expected) in [(DocumentMode::IE7, "true"), (DocumentMode::IE10, "")] {
            let mut realm = Realm::new(mode);
            let div = realm.create_element("div").unwrap();
            realm.set_inner_html(div, "<!--[if gte IE 5]>true<![endif]-->").unwrap();
            assert_eq!(realm.text_content(div).as_deref(), Some(expected), "{mode}");
        }
    }
}
