//! Elements
//!
//! Element creation and the natives of `Element`, `HTMLElement` and friends.

use crate::error::{DomError, DomResult, ErrorKind};
use crate::markup;
use crate::object::{HostData, ObjectData};
use crate::realm::{arg, Realm};
use crate::selector::SelectorList;
use crate::value::{ObjectId, Value};
use std::any::Any;

/// Inline style declarations of one style object
#[derive(Debug, Default)]
pub struct StyleData {
    declarations: Vec<(String, String)>,
}

impl StyleData {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a declaration; an empty value removes it
    pub fn set(&mut self, name: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.remove(name);
            return;
        }
        match self.declarations.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, v)) => *v = value.to_string(),
            None => self
                .declarations
                .push((name.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let i = self
            .declarations
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.declarations.remove(i).1)
    }

    pub fn css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|(n, v)| format!("{n}: {v};"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn set_css_text(&mut self, text: &str) {
        self.declarations.clear();
        for decl in text.split(';') {
            if let Some((name, value)) = decl.split_once(':') {
                self.set(name.trim(), value);
            }
        }
    }
}

impl HostData for StyleData {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// `classList` of an element
#[derive(Debug)]
pub struct TokenListData {
    pub element: ObjectId,
}

impl HostData for TokenListData {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn valid_tag_name(tag: &str) -> bool {
    let mut chars = tag.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

impl Realm {
    /// `document.createElement(tag)`; legacy modes also take an inline
    /// start tag such as `<div id=x>`
    pub fn create_element(&mut self, tag: &str) -> DomResult<ObjectId> {
        if self.mode().is_legacy() && tag.starts_with('<') {
            let Some(parsed) = markup::parse_inline_tag(tag) else {
                return Err(DomError::new(ErrorKind::Unspecified, tag));
            };
            let el = self.alloc_element(&parsed.name);
            for (name, value) in parsed.attrs {
                self.set_attribute(el, &name, Value::String(value))?;
            }
            return Ok(el);
        }
        if !valid_tag_name(tag) {
            return Err(DomError::new(ErrorKind::InvalidCharacter, tag));
        }
        let el = self.alloc_element(tag);
        tracing::trace!(tag, class = self.graph().name(self.obj(el).class), "element created");
        Ok(el)
    }

    /// Element children of `id`
    pub fn element_children(&self, id: ObjectId) -> Vec<ObjectId> {
        self.children(id)
            .into_iter()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    /// Descendants of `root` with tag `name` (`*` for all)
    pub fn elements_by_tag_name(&self, root: ObjectId, name: &str) -> Vec<ObjectId> {
        self.descendant_elements(root)
            .into_iter()
            .filter(|el| name == "*" || self.tag_name(*el).is_some_and(|t| t.eq_ignore_ascii_case(name)))
            .collect()
    }

    /// Descendants of `root` carrying every class in `names`
    pub fn elements_by_class_name(&self, root: ObjectId, names: &str) -> Vec<ObjectId> {
        let wanted: Vec<&str> = names.split_ascii_whitespace().collect();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.descendant_elements(root)
            .into_iter()
            .filter(|el| {
                let classes = self.attribute_text(*el, "class").unwrap_or_default();
                wanted
                    .iter()
                    .all(|w| classes.split_ascii_whitespace().any(|c| c == *w))
            })
            .collect()
    }

    fn class_tokens(&self, el: ObjectId) -> Vec<String> {
        self.attribute_text(el, "class")
            .unwrap_or_default()
            .split_ascii_whitespace()
            .map(str::to_string)
            .collect()
    }

    fn set_class_tokens(&mut self, el: ObjectId, tokens: &[String]) -> DomResult<()> {
        self.set_attribute(el, "class", Value::String(tokens.join(" ")))
    }

    /// Host object cached in `fields[slot]` of `owner`
    pub(crate) fn cached_host(
        &mut self,
        owner: ObjectId,
        slot: &'static str,
        iface: &str,
        data: impl FnOnce() -> ObjectData,
    ) -> DomResult<Value> {
        if let Some(v @ Value::Object(_)) = self.obj(owner).fields.get(slot) {
            return Ok(v.clone());
        }
        let obj = self.create_host(iface, data())?;
        self.obj_mut(owner).fields.insert(slot, Value::Object(obj));
        Ok(Value::Object(obj))
    }

    /// Fresh style declaration object
    pub fn create_style_declaration(&mut self, iface: &str) -> DomResult<ObjectId> {
        self.create_host(iface, ObjectData::Host(Box::new(StyleData::default())))
    }

    fn client_rect(&mut self) -> DomResult<ObjectId> {
        let rect = self.create_object();
        let mut names = vec!["left", "top", "right", "bottom"];
        if self.mode_version() >= 9 {
            names.extend(["width", "height"]);
        }
        for name in names {
            self.set(rect, name, Value::from(0))?;
        }
        Ok(rect)
    }
}

fn this_element(realm: &Realm, this: &Value) -> DomResult<ObjectId> {
    this.as_object()
        .filter(|id| realm.is_element(*id))
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

fn this_node(realm: &Realm, this: &Value) -> DomResult<ObjectId> {
    this.as_object()
        .filter(|id| realm.node(*id).is_some())
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

fn this_style(realm: &Realm, this: &Value) -> DomResult<ObjectId> {
    this.as_object()
        .filter(|id| realm.obj(*id).host_data::<StyleData>().is_some())
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

fn token_owner(realm: &Realm, this: &Value) -> DomResult<ObjectId> {
    this.as_object()
        .and_then(|id| realm.obj(id).host_data::<TokenListData>())
        .map(|t| t.element)
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

fn token_arg(realm: &mut Realm, v: &Value) -> DomResult<String> {
    let token = realm.to_string(v)?;
    if token.is_empty() {
        return Err(DomError::new(ErrorKind::Syntax, "empty token"));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(DomError::new(ErrorKind::InvalidCharacter, token));
    }
    Ok(token)
}

fn string_arg(realm: &mut Realm, args: &[Value], i: usize) -> DomResult<String> {
    realm.to_string(&arg(args, i))
}

fn selector_arg(realm: &mut Realm, args: &[Value]) -> DomResult<SelectorList> {
    let text = string_arg(realm, args, 0)?;
    SelectorList::parse(&text)
}

fn style_value(realm: &Realm, style: ObjectId, name: &str) -> Value {
    let text = realm
        .obj(style)
        .host_data::<StyleData>()
        .and_then(|s| s.get(name))
        .unwrap_or_default();
    Value::string(text)
}

fn set_style_value(realm: &mut Realm, style: ObjectId, name: &str, value: &str) {
    if let Some(s) = realm.obj_mut(style).host_data_mut::<StyleData>() {
        s.set(name, value);
    }
}

/// Element, style and token list natives
pub(crate) fn install(realm: &mut Realm) {
    let natives = realm.natives_mut();

    // attributes
    natives.method("Element", "getAttribute", |realm, this, args| {
        let el = this_element(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        realm.get_attribute(el, &name)
    });
    natives.method("Element", "setAttribute", |realm, this, args| {
        let el = this_element(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        realm.set_attribute(el, &name, arg(args, 1))?;
        Ok(Value::Undefined)
    });
    natives.method("Element", "removeAttribute", |realm, this, args| {
        let el = this_element(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        realm.remove_attribute(el, &name)
    });
    natives.method("Element", "hasAttribute", |realm, this, args| {
        let el = this_element(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        Ok(Value::Bool(realm.has_attribute(el, &name)))
    });
    natives.method("Element", "getAttributeNS", |realm, this, args| {
        let el = this_element(realm, this)?;
        let local = string_arg(realm, args, 1)?;
        realm.get_attribute_ns(el, &arg(args, 0), &local)
    });
    natives.method("Element", "setAttributeNS", |realm, this, args| {
        let el = this_element(realm, this)?;
        let qualified = string_arg(realm, args, 1)?;
        realm.set_attribute_ns(el, &arg(args, 0), &qualified, &arg(args, 2))?;
        Ok(Value::Undefined)
    });
    natives.method("Element", "removeAttributeNS", |realm, this, args| {
        let el = this_element(realm, this)?;
        let local = string_arg(realm, args, 1)?;
        realm.remove_attribute_ns(el, &arg(args, 0), &local)?;
        Ok(Value::Undefined)
    });
    natives.method("Element", "hasAttributeNS", |realm, this, args| {
        let el = this_element(realm, this)?;
        let local = string_arg(realm, args, 1)?;
        realm.has_attribute_ns(el, &arg(args, 0), &local).map(Value::Bool)
    });

    // lookups shared with documents
    for iface in ["Element", "Document", "XMLDOMDocument"] {
        natives.method(iface, "getElementsByTagName", |realm, this, args| {
            let root = this_node(realm, this)?;
            let name = string_arg(realm, args, 0)?;
            let items = realm.elements_by_tag_name(root, &name);
            realm.create_list("HTMLCollection", items).map(Value::Object)
        });
        natives.method(iface, "getElementsByClassName", |realm, this, args| {
            let root = this_node(realm, this)?;
            let names = string_arg(realm, args, 0)?;
            let items = realm.elements_by_class_name(root, &names);
            realm.create_list("HTMLCollection", items).map(Value::Object)
        });
    }
    for iface in ["Element", "Document", "DocumentFragment"] {
        natives.method(iface, "querySelector", |realm, this, args| {
            let root = this_node(realm, this)?;
            let selector = selector_arg(realm, args)?;
            Ok(selector.select_first(realm, root).into())
        });
        natives.method(iface, "querySelectorAll", |realm, this, args| {
            let root = this_node(realm, this)?;
            let selector = selector_arg(realm, args)?;
            let items = selector.select_all(realm, root);
            realm.create_list("NodeList", items).map(Value::Object)
        });
    }
    natives.method("Element", "msMatchesSelector", |realm, this, args| {
        let el = this_element(realm, this)?;
        let selector = selector_arg(realm, args)?;
        Ok(Value::Bool(selector.matches(realm, el)))
    });

    // geometry
    natives.method("Element", "getBoundingClientRect", |realm, this, _| {
        this_element(realm, this)?;
        realm.client_rect().map(Value::Object)
    });
    natives.method("Element", "getClientRects", |realm, this, _| {
        this_element(realm, this)?;
        let rect = realm.client_rect()?;
        Ok(Value::Object(realm.create_array(vec![Value::Object(rect)])))
    });
    for name in ["clientTop", "clientLeft", "clientWidth", "clientHeight"] {
        natives.getter("Element", name, |realm, this, _| {
            this_element(realm, this)?;
            Ok(Value::from(0))
        });
    }
    for name in ["offsetTop", "offsetLeft"] {
        natives.getter("HTMLElement", name, |realm, this, _| {
            this_element(realm, this)?;
            Ok(Value::from(0))
        });
    }

    // tree
    natives.getter("Element", "tagName", |realm, this, _| {
        let el = this_element(realm, this)?;
        Ok(Value::String(realm.node_name(el)))
    });
    natives.getter("Element", "firstElementChild", |realm, this, _| {
        let el = this_element(realm, this)?;
        Ok(realm.element_children(el).first().copied().into())
    });
    natives.getter("Element", "lastElementChild", |realm, this, _| {
        let el = this_element(realm, this)?;
        Ok(realm.element_children(el).last().copied().into())
    });
    natives.getter("Element", "childElementCount", |realm, this, _| {
        let el = this_element(realm, this)?;
        Ok(Value::Number(realm.element_children(el).len() as f64))
    });

    // HTMLElement
    natives.method("HTMLElement", "click", |realm, this, _| {
        let el = this_element(realm, this)?;
        realm.fire_event(el, "MouseEvent", "click", true, vec![("button", Value::from(0))])?;
        Ok(Value::Undefined)
    });
    for name in ["focus", "blur", "doScroll"] {
        natives.method("HTMLElement", name, |realm, this, _| {
            this_element(realm, this)?;
            Ok(Value::Undefined)
        });
    }
    natives.method("HTMLElement", "contains", |realm, this, args| {
        let el = this_element(realm, this)?;
        let other = arg(args, 0).as_object().filter(|o| realm.node(*o).is_some());
        Ok(Value::Bool(other.is_some_and(|o| realm.is_inclusive_ancestor(el, o))))
    });
    natives.method("HTMLElement", "toString", |realm, this, _| {
        this_element(realm, this)?;
        Ok(Value::string("[object]"))
    });
    for iface in ["HTMLAnchorElement", "HTMLAreaElement"] {
        natives.method(iface, "toString", |realm, this, _| {
            let el = this_element(realm, this)?;
            let href = realm.get(el, "href")?;
            if href.is_nullish() {
                return Ok(Value::string(""));
            }
            realm.to_string(&href).map(Value::String)
        });
    }
    natives.getter("HTMLElement", "readyState", |realm, this, _| {
        this_element(realm, this)?;
        Ok(Value::string("complete"))
    });
    natives.getter("HTMLElement", "innerText", |realm, this, _| {
        let el = this_element(realm, this)?;
        Ok(Value::String(realm.text_content(el).unwrap_or_default()))
    });
    natives.setter("HTMLElement", "innerText", |realm, this, args| {
        let el = this_element(realm, this)?;
        let text = string_arg(realm, args, 0)?;
        realm.set_text_content(el, &text)?;
        Ok(Value::Undefined)
    });
    natives.getter("HTMLElement", "innerHTML", |realm, this, _| {
        let el = this_element(realm, this)?;
        Ok(Value::String(realm.inner_html(el)))
    });
    natives.setter("HTMLElement", "innerHTML", |realm, this, args| {
        let el = this_element(realm, this)?;
        let markup = string_arg(realm, args, 0)?;
        realm.set_inner_html(el, &markup)?;
        Ok(Value::Undefined)
    });
    natives.getter("HTMLElement", "style", |realm, this, _| {
        let el = this_element(realm, this)?;
        realm.cached_host(el, "style", "MSStyleCSSProperties", || {
            ObjectData::Host(Box::new(StyleData::default()))
        })
    });
    natives.getter("HTMLElement", "currentStyle", |realm, this, _| {
        let el = this_element(realm, this)?;
        realm.cached_host(el, "currentStyle", "CSSStyleDeclaration", || {
            ObjectData::Host(Box::new(StyleData::default()))
        })
    });
    natives.getter("HTMLElement", "classList", |realm, this, _| {
        let el = this_element(realm, this)?;
        realm.cached_host(el, "classList", "DOMTokenList", || {
            ObjectData::Host(Box::new(TokenListData { element: el }))
        })
    });

    // element specific
    natives.getter("HTMLImageElement", "complete", |realm, this, _| {
        this_element(realm, this)?;
        Ok(Value::Bool(true))
    });
    for dim in ["width", "height"] {
        natives.getter("HTMLImageElement", dim, move |realm, this, _| {
            let el = this_element(realm, this)?;
            Ok(realm.obj(el).fields.get(dim).cloned().unwrap_or(Value::from(0)))
        });
        natives.setter("HTMLImageElement", dim, move |realm, this, args| {
            let el = this_element(realm, this)?;
            let n = realm.to_number(&arg(args, 0))?;
            let n = if n.is_finite() { n.trunc() } else { 0.0 };
            realm.obj_mut(el).fields.insert(dim, Value::Number(n));
            Ok(Value::Undefined)
        });
    }
    for iface in ["HTMLOptionElement", "HTMLScriptElement"] {
        natives.getter(iface, "text", |realm, this, _| {
            let el = this_element(realm, this)?;
            Ok(Value::String(realm.text_content(el).unwrap_or_default()))
        });
        natives.setter(iface, "text", |realm, this, args| {
            let el = this_element(realm, this)?;
            let text = string_arg(realm, args, 0)?;
            realm.set_text_content(el, &text)?;
            Ok(Value::Undefined)
        });
    }

    // style declarations
    natives.getter("CSSStyleDeclaration", "cssText", |realm, this, _| {
        let style = this_style(realm, this)?;
        let text = realm
            .obj(style)
            .host_data::<StyleData>()
            .map(StyleData::css_text)
            .unwrap_or_default();
        Ok(Value::String(text))
    });
    natives.setter("CSSStyleDeclaration", "cssText", |realm, this, args| {
        let style = this_style(realm, this)?;
        let text = string_arg(realm, args, 0)?;
        if let Some(s) = realm.obj_mut(style).host_data_mut::<StyleData>() {
            s.set_css_text(&text);
        }
        Ok(Value::Undefined)
    });
    for name in ["border", "opacity", "color"] {
        natives.getter("CSSStyleDeclaration", name, move |realm, this, _| {
            let style = this_style(realm, this)?;
            Ok(style_value(realm, style, name))
        });
        natives.setter("CSSStyleDeclaration", name, move |realm, this, args| {
            let style = this_style(realm, this)?;
            let value = string_arg(realm, args, 0)?;
            set_style_value(realm, style, name, &value);
            Ok(Value::Undefined)
        });
    }
    natives.method("CSSStyleDeclaration", "getPropertyValue", |realm, this, args| {
        let style = this_style(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        Ok(style_value(realm, style, &name))
    });
    natives.method("CSSStyleDeclaration", "setProperty", |realm, this, args| {
        let style = this_style(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        let value = match arg(args, 1) {
            Value::Null => String::new(),
            v => realm.to_string(&v)?,
        };
        set_style_value(realm, style, &name, &value);
        Ok(Value::Undefined)
    });
    natives.method("CSSStyleDeclaration", "removeProperty", |realm, this, args| {
        let style = this_style(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        let old = realm
            .obj_mut(style)
            .host_data_mut::<StyleData>()
            .and_then(|s| s.remove(&name))
            .unwrap_or_default();
        Ok(Value::String(old))
    });

    // classList
    natives.getter("DOMTokenList", "length", |realm, this, _| {
        let el = token_owner(realm, this)?;
        Ok(Value::Number(realm.class_tokens(el).len() as f64))
    });
    natives.method("DOMTokenList", "item", |realm, this, args| {
        let el = token_owner(realm, this)?;
        let index = realm.to_number(&arg(args, 0))?;
        let tokens = realm.class_tokens(el);
        let item = (index >= 0.0)
            .then(|| tokens.get(index as usize).cloned())
            .flatten();
        Ok(item.into())
    });
    natives.method("DOMTokenList", "contains", |realm, this, args| {
        let el = token_owner(realm, this)?;
        let token = token_arg(realm, &arg(args, 0))?;
        Ok(Value::Bool(realm.class_tokens(el).contains(&token)))
    });
    natives.method("DOMTokenList", "add", |realm, this, args| {
        let el = token_owner(realm, this)?;
        let mut tokens = realm.class_tokens(el);
        for v in args {
            let token = token_arg(realm, v)?;
            if !tokens.contains(&token) {
                tokens.push(token);
            }
        }
        realm.set_class_tokens(el, &tokens)?;
        Ok(Value::Undefined)
    });
    natives.method("DOMTokenList", "remove", |realm, this, args| {
        let el = token_owner(realm, this)?;
        let mut tokens = realm.class_tokens(el);
        for v in args {
            let token = token_arg(realm, v)?;
            tokens.retain(|t| *t != token);
        }
        realm.set_class_tokens(el, &tokens)?;
        Ok(Value::Undefined)
    });
    natives.method("DOMTokenList", "toggle", |realm, this, args| {
        let el = token_owner(realm, this)?;
        let token = token_arg(realm, &arg(args, 0))?;
        let mut tokens = realm.class_tokens(el);
        let present = tokens.contains(&token);
        let force = args.get(1).map(Value::truthy);
        let keep = force.unwrap_or(!present);
        if keep && !present {
            tokens.push(token);
        } else if !keep && present {
            tokens.retain(|t| *t != token);
        } else {
            return Ok(Value::Bool(keep));
        }
        realm.set_class_tokens(el, &tokens)?;
        Ok(Value::Bool(keep))
    });
    natives.method("DOMTokenList", "toString", |realm, this, _| {
        let el = token_owner(realm, this)?;
        Ok(Value::String(realm.attribute_text(el, "class").unwrap_or_default()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DocumentMode;

    #[test]
    fn test_inline_create_element_legacy() {
        for mode in [DocumentMode::IE7, DocumentMode::IE8] {
            let mut realm = Realm::new(mode);
            for markup in ["<div>", "<div >", "<div/>"] {
                let el = realm.create_element(markup).unwrap();
                assert_eq!(realm.node_name(el), "DIV");
            }
            let el = realm
                .create_element("<div test='a\"' abcd=\"&quot;b&#34;\">")
                .unwrap();
            assert_eq!(realm.get(el, "test").unwrap(), Value::string("a\""));
            assert_eq!(realm.get(el, "abcd").unwrap(), Value::string("\"b\""));

            for bad in ["<div", "<div test=1"] {
                let err = realm.create_element(bad).unwrap_err();
                assert_eq!(err.to_exception(mode).unsigned_number(), 0x80004005);
            }
        }
    }

    #[test]
    fn test_inline_create_element_rejected_from_9() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let err = realm.create_element("<div>").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCharacter);
        assert_eq!(err.to_exception(DocumentMode::IE9).name, Some("InvalidCharacterError"));
    }

    #[test]
    fn test_unknown_tag() {
        let mut realm = Realm::new(DocumentMode::IE11);
        let el = realm.create_element("winetest").unwrap();
        assert_eq!(realm.object_to_string(&Value::Object(el)), "[object HTMLUnknownElement]");
    }

    #[test]
    fn test_element_to_string_by_mode() {
        let mut legacy = Realm::new(DocumentMode::IE8);
        let div = legacy.create_element("div").unwrap();
        assert_eq!(legacy.to_string(&Value::Object(div)).unwrap(), "[object]");
        let a = legacy.create_element("a").unwrap();
        assert_eq!(legacy.to_string(&Value::Object(a)).unwrap(), "");

        let mut modern = Realm::new(DocumentMode::IE9);
        let div = modern.create_element("div").unwrap();
        assert_eq!(modern.to_string(&Value::Object(div)).unwrap(), "[object HTMLDivElement]");
    }

    #[test]
    fn test_class_list() {
        let mut realm = Realm::new(DocumentMode::IE10);
        let el = realm.create_element("div").unwrap();
        realm
            .set_attribute(el, "class", Value::string("testclass    another "))
            .unwrap();
        let list = realm.get(el, "classList").unwrap();
        assert_eq!(realm.object_to_string(&list), "[object DOMTokenList]");
        assert_eq!(realm.to_string(&list).unwrap(), "testclass    another ");
        assert_eq!(realm.get_value(&list, "length").unwrap(), Value::from(2));

        realm.call_method(&list, "add", &[Value::string("third")]).unwrap();
        assert_eq!(
            realm.attribute_text(el, "class").as_deref(),
            Some("testclass another third")
        );
        let on = realm.call_method(&list, "toggle", &[Value::string("another")]).unwrap();
        assert_eq!(on, Value::Bool(false));
        let err = realm.call_method(&list, "add", &[Value::string("a b")]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidCharacter);
        assert_eq!(realm.get(el, "classList").unwrap(), list);
    }

    #[test]
    fn test_style_object() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        let style = realm.get(body, "style").unwrap();
        assert_eq!(realm.object_to_string(&style), "[object MSStyleCSSProperties]");
        realm.set_value(&style, "color", Value::string("red")).unwrap();
        realm
            .call_method(&style, "setProperty", &[Value::string("opacity"), Value::string("0.5")])
            .unwrap();
        assert_eq!(realm.get_value(&style, "cssText").unwrap(), Value::string("color: red; opacity: 0.5;"));
        let old = realm.call_method(&style, "removeProperty", &[Value::string("color")]).unwrap();
        assert_eq!(old, Value::string("red"));
        assert_eq!(realm.get(body, "style").unwrap(), style);
    }

    #[test]
    fn test_legacy_style_is_readonly() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let body = realm.body().unwrap();
        let err = realm.set(body, "style", Value::string("x")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidProperty);
    }

    #[test]
    fn test_bounding_rect_size_from_9() {
        for (mode, has_size) in [(DocumentMode::IE8, false), (DocumentMode::IE9, true)] {
            let mut realm = Realm::new(mode);
            let body = realm.body().unwrap();
            let rect = realm.call_method(&Value::Object(body), "getBoundingClientRect", &[]).unwrap();
            let rect = rect.as_object().unwrap();
            assert_eq!(realm.has(rect, "width"), has_size);
            assert!(realm.has(rect, "left"));
        }
    }

    #[test]
    fn test_queries() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        realm
            .set_inner_html(body, "<div class=\"a b\"><span class=\"b\"></span></div><p></p>")
            .unwrap();
        assert_eq!(realm.elements_by_tag_name(body, "*").len(), 3);
        assert_eq!(realm.elements_by_tag_name(body, "SPAN").len(), 1);
        assert_eq!(realm.elements_by_class_name(body, "b").len(), 2);
        assert_eq!(realm.elements_by_class_name(body, "a b").len(), 1);

        let found = realm
            .call_method(&Value::Object(body), "querySelectorAll", &[Value::string("div .b")])
            .unwrap();
        assert_eq!(realm.get_value(&found, "length").unwrap(), Value::from(1));
        let err = realm
            .call_method(&Value::Object(body), "querySelector", &[Value::string("##")])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }

    #[test]
    fn test_click_runs_handler() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        let hit = realm.create_object();
        let f = realm.create_native_closure("onclick", 1, move |realm, _, args| {
            realm.set(hit, "event", arg(args, 0))?;
            Ok(Value::Undefined)
        });
        realm.set(body, "onclick", Value::Object(f)).unwrap();
        realm.call_method(&Value::Object(body), "click", &[]).unwrap();
        let event = realm.get(hit, "event").unwrap();
        assert_eq!(realm.object_to_string(&event), "[object MouseEvent]");
    }

    #[test]
    fn test_inner_text() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let div = realm.create_element("div").unwrap();
        realm.set(div, "innerText", Value::string("hello")).unwrap();
        assert_eq!(realm.get(div, "innerText").unwrap(), Value::string("hello"));
        assert_eq!(realm.get(div, "innerHTML").unwrap(), Value::string("hello"));
    }
}
