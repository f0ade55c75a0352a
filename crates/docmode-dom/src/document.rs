//! Documents
//!
//! `Document`, `DOMImplementation` and `DocumentType` natives.

use crate::error::{DomError, DomResult, ErrorKind};
use crate::mode::ModeCell;
use crate::node::{DocumentData, NodeKind, ReadyState};
use crate::object::ObjectData;
use crate::realm::{arg, Realm};
use crate::value::{ObjectId, Value};

fn valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
}

/// Merge one `document.cookie = "..."` assignment into the cookie string
fn merge_cookie(jar: &str, assignment: &str) -> String {
    let Some((name, value)) = assignment
        .split(';')
        .next()
        .and_then(|pair| pair.split_once('='))
        .map(|(n, v)| (n.trim(), v.trim()))
    else {
        return jar.to_string();
    };
    if name.is_empty() {
        return jar.to_string();
    }
    let mut pairs: Vec<(String, String)> = jar
        .split(';')
        .filter_map(|p| p.split_once('='))
        .map(|(n, v)| (n.trim().to_string(), v.trim().to_string()))
        .filter(|(n, _)| n != name)
        .collect();
    if !value.is_empty() {
        pairs.push((name.to_string(), value.to_string()));
    }
    pairs
        .iter()
        .map(|(n, v)| format!("{n}={v}"))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Realm {
    /// `document.getElementById`; below mode 8 the `name` attribute matches too
    pub fn element_by_id(&self, root: ObjectId, id: &str) -> Option<ObjectId> {
        let by_name = self.mode_version() < 8;
        self.descendant_elements(root).into_iter().find(|el| {
            self.attribute_text(*el, "id").is_some_and(|v| v == id)
                || (by_name && self.attribute_text(*el, "name").is_some_and(|v| v == id))
        })
    }

    pub fn elements_by_name(&self, root: ObjectId, name: &str) -> Vec<ObjectId> {
        self.descendant_elements(root)
            .into_iter()
            .filter(|el| self.attribute_text(*el, "name").is_some_and(|v| v == name))
            .collect()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.document_data(self.document())
            .map(|d| d.ready_state)
            .unwrap_or_default()
    }

    pub fn set_ready_state(&mut self, state: ReadyState) {
        let doc = self.document();
        if let Some(d) = self.document_data_mut(doc) {
            d.ready_state = state;
        }
    }

    pub fn document_url(&self) -> String {
        self.document_data(self.document())
            .map(|d| d.url.clone())
            .unwrap_or_default()
    }

    pub fn set_document_url(&mut self, url: &str) {
        let doc = self.document();
        if let Some(d) = self.document_data_mut(doc) {
            d.url = url.to_string();
        }
    }

    /// Detached document with an `html`/`head`/`body` skeleton
    pub fn create_html_document(&mut self, title: Option<&str>) -> DomResult<ObjectId> {
        let class = if self.graph().by_name("HTMLDocument").is_some() {
            "HTMLDocument"
        } else {
            "Document"
        };
        let doc = self.create_node(
            class,
            NodeKind::Document(DocumentData {
                url: "about:blank".to_string(),
                title: title.unwrap_or_default().to_string(),
                mode: ModeCell::bound(self.mode()),
                ..DocumentData::default()
            }),
        )?;
        let html = self.alloc_element("html");
        let head = self.alloc_element("head");
        let body = self.alloc_element("body");
        self.attach_child(doc, html);
        self.attach_child(html, head);
        self.attach_child(html, body);
        Ok(doc)
    }

    /// Detached document for an XML response with root element `root`.
    ///
    /// Mode 11 hands out an `XMLDocument`, mode 10 a plain `Document` and
    /// older modes the prototype-less MSXML object.
    pub fn create_xml_document(&mut self, root: Option<&str>) -> DomResult<ObjectId> {
        let class = match self.mode_version() {
            v if v >= 11 => "XMLDocument",
            10 => "Document",
            _ => "XMLDOMDocument",
        };
        let doc = self.create_node(
            class,
            NodeKind::Document(DocumentData {
                url: "about:blank".to_string(),
                xml: true,
                mode: ModeCell::bound(self.mode()),
                ..DocumentData::default()
            }),
        )?;
        if let Some(name) = root {
            let el = self.alloc_element(name);
            self.attach_child(doc, el);
        }
        Ok(doc)
    }

    /// `document.anchors`: named `a` elements of an HTML document
    pub fn anchors(&self, doc: ObjectId) -> Vec<ObjectId> {
        if self.document_data(doc).is_none_or(|d| d.xml) {
            return Vec::new();
        }
        self.descendant_elements(doc)
            .into_iter()
            .filter(|el| self.tag_name(*el) == Some("a") && self.has_attribute(*el, "name"))
            .collect()
    }
}

fn this_document(realm: &Realm, this: &Value) -> DomResult<ObjectId> {
    this.as_object()
        .filter(|id| realm.document_data(*id).is_some())
        .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
}

fn string_arg(realm: &mut Realm, args: &[Value], i: usize) -> DomResult<String> {
    realm.to_string(&arg(args, i))
}

fn list(realm: &mut Realm, items: Vec<ObjectId>) -> DomResult<Value> {
    realm.create_list("HTMLCollection", items).map(Value::Object)
}

pub(crate) fn install(realm: &mut Realm) {
    let natives = realm.natives_mut();

    // factories
    natives.method("Document", "createElement", |realm, this, args| {
        this_document(realm, this)?;
        let tag = string_arg(realm, args, 0)?;
        realm.create_element(&tag).map(Value::Object)
    });
    natives.method("Document", "createTextNode", |realm, this, args| {
        this_document(realm, this)?;
        let text = string_arg(realm, args, 0)?;
        realm.create_node("Text", NodeKind::Text(text)).map(Value::Object)
    });
    natives.method("Document", "createComment", |realm, this, args| {
        this_document(realm, this)?;
        let text = string_arg(realm, args, 0)?;
        realm.create_node("Comment", NodeKind::Comment(text)).map(Value::Object)
    });
    natives.method("Document", "createAttribute", |realm, this, args| {
        this_document(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        if !valid_name(&name) {
            return Err(DomError::new(ErrorKind::InvalidCharacter, name));
        }
        let name = if realm.mode().is_legacy() { name } else { name.to_ascii_lowercase() };
        realm
            .create_node("Attr", NodeKind::Attr { name, value: String::new() })
            .map(Value::Object)
    });
    natives.method("Document", "createDocumentFragment", |realm, this, _| {
        this_document(realm, this)?;
        realm.create_node("DocumentFragment", NodeKind::Fragment).map(Value::Object)
    });
    natives.method("Document", "createEvent", |realm, this, args| {
        this_document(realm, this)?;
        let kind = string_arg(realm, args, 0)?;
        realm.create_event(&kind).map(Value::Object)
    });
    natives.method("Document", "createEventObject", |realm, this, _| {
        this_document(realm, this)?;
        let event = realm.create_host("MSEventObj", ObjectData::Plain)?;
        for name in ["type", "returnValue"] {
            realm.obj_mut(event).fields.insert(name, Value::string(""));
        }
        realm.obj_mut(event).fields.insert("srcElement", Value::Null);
        realm.obj_mut(event).fields.insert("cancelBubble", Value::Bool(false));
        realm.obj_mut(event).fields.insert("keyCode", Value::from(0));
        Ok(Value::Object(event))
    });
    natives.method("Document", "createStyleSheet", |realm, this, _| {
        this_document(realm, this)?;
        let sheet = realm.create_object();
        realm.set(sheet, "cssText", Value::string(""))?;
        Ok(Value::Object(sheet))
    });

    // lookups
    natives.method("Document", "getElementById", |realm, this, args| {
        let doc = this_document(realm, this)?;
        let id = string_arg(realm, args, 0)?;
        Ok(realm.element_by_id(doc, &id).into())
    });
    natives.method("Document", "getElementsByName", |realm, this, args| {
        let doc = this_document(realm, this)?;
        let name = string_arg(realm, args, 0)?;
        let items = realm.elements_by_name(doc, &name);
        list(realm, items)
    });

    // tree shortcuts
    natives.getter("Document", "documentElement", |realm, this, _| {
        let doc = this_document(realm, this)?;
        Ok(realm.children(doc).into_iter().find(|c| realm.is_element(*c)).into())
    });
    for (name, tag) in [("body", "body"), ("head", "head")] {
        natives.getter("Document", name, move |realm, this, _| {
            let doc = this_document(realm, this)?;
            let found = realm
                .children(doc)
                .into_iter()
                .find(|c| realm.is_element(*c))
                .and_then(|html| {
                    realm
                        .children(html)
                        .into_iter()
                        .find(|c| realm.tag_name(*c) == Some(tag))
                });
            Ok(found.into())
        });
    }
    natives.getter("Document", "doctype", |realm, this, _| {
        let doc = this_document(realm, this)?;
        let doctype = realm
            .children(doc)
            .into_iter()
            .find(|c| matches!(realm.node(*c).map(|n| &n.kind), Some(NodeKind::Doctype { .. })));
        Ok(doctype.into())
    });

    // state
    natives.getter("Document", "documentMode", |realm, this, _| {
        let doc = this_document(realm, this)?;
        let mode = match realm.document_data(doc) {
            Some(data) => data.mode.get()?,
            None => realm.mode(),
        };
        Ok(Value::Number(f64::from(mode.version())))
    });
    natives.getter("Document", "compatMode", |realm, this, _| {
        this_document(realm, this)?;
        Ok(Value::string(realm.mode().compat_mode()))
    });
    natives.getter("Document", "readyState", |realm, this, _| {
        let doc = this_document(realm, this)?;
        let state = realm.document_data(doc).map(|d| d.ready_state).unwrap_or_default();
        Ok(Value::string(state.as_str()))
    });
    for name in ["defaultView", "parentWindow"] {
        natives.getter("Document", name, |realm, this, _| {
            let doc = this_document(realm, this)?;
            Ok(realm.document_window(doc).into())
        });
    }
    natives.getter("Document", "title", |realm, this, _| {
        let doc = this_document(realm, this)?;
        Ok(Value::String(realm.document_data(doc).map(|d| d.title.clone()).unwrap_or_default()))
    });
    natives.setter("Document", "title", |realm, this, args| {
        let doc = this_document(realm, this)?;
        let title = string_arg(realm, args, 0)?;
        if let Some(d) = realm.document_data_mut(doc) {
            d.title = title;
        }
        Ok(Value::Undefined)
    });
    natives.getter("Document", "URL", |realm, this, _| {
        let doc = this_document(realm, this)?;
        Ok(Value::String(realm.document_data(doc).map(|d| d.url.clone()).unwrap_or_default()))
    });
    natives.getter("Document", "location", |realm, this, _| {
        let doc = this_document(realm, this)?;
        match realm.document_window(doc) {
            Some(window) => realm.get(window, "location"),
            None => Ok(Value::Null),
        }
    });
    natives.setter("Document", "location", |realm, this, args| {
        let doc = this_document(realm, this)?;
        if let Some(window) = realm.document_window(doc) {
            realm.set(window, "location", arg(args, 0))?;
        }
        Ok(Value::Undefined)
    });
    natives.getter("Document", "cookie", |realm, this, _| {
        let doc = this_document(realm, this)?;
        Ok(realm.obj(doc).fields.get("cookie").cloned().unwrap_or(Value::string("")))
    });
    natives.setter("Document", "cookie", |realm, this, args| {
        let doc = this_document(realm, this)?;
        let assignment = string_arg(realm, args, 0)?;
        let jar = match realm.obj(doc).fields.get("cookie") {
            Some(Value::String(s)) => s.clone(),
            _ => String::new(),
        };
        let merged = merge_cookie(&jar, &assignment);
        tracing::trace!(cookie = %merged, "cookie updated");
        realm.obj_mut(doc).fields.insert("cookie", Value::String(merged));
        Ok(Value::Undefined)
    });
    natives.getter("Document", "mimeType", |realm, this, _| {
        let doc = this_document(realm, this)?;
        let xml = realm.document_data(doc).is_some_and(|d| d.xml);
        Ok(Value::string(if xml { "XML Document" } else { "HTML Document" }))
    });
    natives.getter("Document", "anchors", |realm, this, _| {
        let doc = this_document(realm, this)?;
        let items = realm.anchors(doc);
        list(realm, items)
    });

    natives.method("XMLDOMDocument", "createElement", |realm, this, args| {
        this_document(realm, this)?;
        let tag = string_arg(realm, args, 0)?;
        realm.create_element(&tag).map(Value::Object)
    });
    natives.getter("XMLDOMDocument", "documentElement", |realm, this, _| {
        let doc = this_document(realm, this)?;
        Ok(realm.children(doc).into_iter().find(|c| realm.is_element(*c)).into())
    });

    natives.getter("Document", "fileSize", |realm, this, _| {
        this_document(realm, this)?;
        Ok(Value::string("-1"))
    });
    natives.getter("Document", "implementation", |realm, this, _| {
        let doc = this_document(realm, this)?;
        realm.cached_host(doc, "implementation", "DOMImplementation", || ObjectData::Plain)
    });
    natives.getter("Document", "styleSheets", |realm, this, _| {
        this_document(realm, this)?;
        list(realm, Vec::new())
    });
    natives.getter("Document", "selection", |realm, this, _| {
        let doc = this_document(realm, this)?;
        if let Some(v @ Value::Object(_)) = realm.obj(doc).fields.get("selection") {
            return Ok(v.clone());
        }
        let selection = realm.create_object();
        realm.set(selection, "type", Value::string("None"))?;
        realm.obj_mut(doc).fields.insert("selection", Value::Object(selection));
        Ok(Value::Object(selection))
    });
    natives.getter("Document", "namespaces", |realm, this, _| {
        let doc = this_document(realm, this)?;
        if let Some(v @ Value::Object(_)) = realm.obj(doc).fields.get("namespaces") {
            return Ok(v.clone());
        }
        let namespaces = realm.create_object();
        realm.set(namespaces, "length", Value::from(0))?;
        realm.obj_mut(doc).fields.insert("namespaces", Value::Object(namespaces));
        Ok(Value::Object(namespaces))
    });

    // DOMImplementation
    natives.method("DOMImplementation", "hasFeature", |_, _, _| Ok(Value::Bool(true)));
    natives.method("DOMImplementation", "createHTMLDocument", |realm, _, args| {
        let title = match arg(args, 0) {
            Value::Undefined => None,
            v => Some(realm.to_string(&v)?),
        };
        realm.create_html_document(title.as_deref()).map(Value::Object)
    });
    natives.method("DOMImplementation", "createDocumentType", |realm, _, args| {
        let name = string_arg(realm, args, 0)?;
        if !valid_name(&name) {
            return Err(DomError::new(ErrorKind::InvalidCharacter, name));
        }
        realm
            .create_node("DocumentType", NodeKind::Doctype { name })
            .map(Value::Object)
    });
    natives.method("DOMImplementation", "createDocument", |realm, _, args| {
        let data = DocumentData {
            mode: ModeCell::bound(realm.mode()),
            ..DocumentData::default()
        };
        let doc = realm.create_node("Document", NodeKind::Document(data))?;
        if let Some(doctype) = arg(args, 2).as_object() {
            realm.append_child(doc, doctype)?;
        }
        let qualified = match arg(args, 1) {
            v if v.is_nullish() => String::new(),
            v => realm.to_string(&v)?,
        };
        if !qualified.is_empty() {
            if !valid_name(&qualified) {
                return Err(DomError::new(ErrorKind::InvalidCharacter, qualified));
            }
            let root = realm.alloc_element(&qualified);
            realm.attach_child(doc, root);
        }
        Ok(Value::Object(doc))
    });

    // DocumentType
    natives.getter("DocumentType", "name", |realm, this, _| {
        let id = realm.this_object(this)?;
        match realm.node(id).map(|n| &n.kind) {
            Some(NodeKind::Doctype { name }) => Ok(Value::String(name.clone())),
            _ => Err(DomError::kind(ErrorKind::Unexpected)),
        }
    });
    for name in ["publicId", "systemId"] {
        natives.getter("DocumentType", name, |_, _, _| Ok(Value::string("")));
    }
}
