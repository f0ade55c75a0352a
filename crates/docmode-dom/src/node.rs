//! Node Tree
//!
//! Node payloads and tree operations shared by documents and elements.

use crate::attributes::AttributeList;
use crate::error::{DomError, DomResult, ErrorKind};
use crate::mode::ModeCell;
use crate::object::ObjectData;
use crate::realm::{arg, Realm};
use crate::value::{ObjectId, Value};

/// Document loading state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyState {
    #[default]
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadyState::Loading => "loading",
            ReadyState::Interactive => "interactive",
            ReadyState::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ElementData {
    /// Lowercase tag name
    pub tag: String,
    pub attributes: AttributeList,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentData {
    pub ready_state: ReadyState,
    pub url: String,
    pub title: String,
    pub window: Option<ObjectId>,
    /// Parsed from an XML response rather than HTML markup
    pub xml: bool,
    /// Fixed when the document is created
    pub mode: ModeCell,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(ElementData),
    Document(DocumentData),
    Fragment,
    Text(String),
    Comment(String),
    Attr { name: String, value: String },
    Doctype { name: String },
}

impl NodeKind {
    pub fn node_type(&self) -> u16 {
        match self {
            NodeKind::Element(_) => 1,
            NodeKind::Attr { .. } => 2,
            NodeKind::Text(_) => 3,
            NodeKind::Comment(_) => 8,
            NodeKind::Document(_) => 9,
            NodeKind::Doctype { .. } => 10,
            NodeKind::Fragment => 11,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    pub parent: Option<ObjectId>,
    pub children: Vec<ObjectId>,
    pub owner_document: Option<ObjectId>,
}

impl NodeData {
    pub fn new(kind: NodeKind, owner_document: Option<ObjectId>) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            owner_document,
        }
    }

    pub fn element(&self) -> Option<&ElementData> {
        match &self.kind {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }
}

impl Realm {
    pub fn node(&self, id: ObjectId) -> Option<&NodeData> {
        self.obj(id).node()
    }

    pub fn is_element(&self, id: ObjectId) -> bool {
        self.node(id).is_some_and(|n| n.element().is_some())
    }

    pub fn element_data(&self, id: ObjectId) -> Option<&ElementData> {
        self.node(id).and_then(NodeData::element)
    }

    pub fn element_data_mut(&mut self, id: ObjectId) -> Option<&mut ElementData> {
        match self.obj_mut(id).node_mut().map(|n| &mut n.kind) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn document_data(&self, id: ObjectId) -> Option<&DocumentData> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Document(d)) => Some(d),
            _ => None,
        }
    }

    pub fn document_data_mut(&mut self, id: ObjectId) -> Option<&mut DocumentData> {
        match self.obj_mut(id).node_mut().map(|n| &mut n.kind) {
            Some(NodeKind::Document(d)) => Some(d),
            _ => None,
        }
    }

    /// Window of a document node, if it has one
    pub fn document_window(&self, id: ObjectId) -> Option<ObjectId> {
        self.document_data(id).and_then(|d| d.window)
    }

    pub fn parent_node(&self, id: ObjectId) -> Option<ObjectId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: ObjectId) -> Vec<ObjectId> {
        self.node(id).map(|n| n.children.clone()).unwrap_or_default()
    }

    pub fn tag_name(&self, id: ObjectId) -> Option<&str> {
        self.element_data(id).map(|e| e.tag.as_str())
    }

    /// Allocate a detached node of interface `class`
    pub fn create_node(&mut self, class: &str, kind: NodeKind) -> DomResult<ObjectId> {
        let owner = self.document_opt();
        self.create_host(class, ObjectData::Node(NodeData::new(kind, owner)))
    }

    /// True when `ancestor` is `node` or contains it
    pub fn is_inclusive_ancestor(&self, ancestor: ObjectId, node: ObjectId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == ancestor {
                return true;
            }
            cur = self.parent_node(n);
        }
        false
    }

    fn detach(&mut self, child: ObjectId) {
        if let Some(parent) = self.parent_node(child) {
            if let Some(n) = self.obj_mut(parent).node_mut() {
                n.children.retain(|c| *c != child);
            }
        }
        if let Some(n) = self.obj_mut(child).node_mut() {
            n.parent = None;
        }
    }

    /// Insert `child` before `reference` (append when `None`)
    pub fn insert_before(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
        reference: Option<ObjectId>,
    ) -> DomResult<ObjectId> {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return Err(DomError::kind(ErrorKind::TypeMismatch));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::new(ErrorKind::InvalidArg, "hierarchy request"));
        }
        if let Some(r) = reference {
            if self.parent_node(r) != Some(parent) {
                return Err(DomError::new(ErrorKind::InvalidArg, "reference is not a child"));
            }
        }

        let moving = match self.node(child).map(|n| &n.kind) {
            Some(NodeKind::Fragment) => self.children(child),
            _ => vec![child],
        };
        for node in &moving {
            self.detach(*node);
        }
        if let Some(n) = self.obj_mut(parent).node_mut() {
            let at = reference
                .and_then(|r| n.children.iter().position(|c| *c == r))
                .unwrap_or(n.children.len());
            for (i, node) in moving.iter().enumerate() {
                n.children.insert(at + i, *node);
            }
        }
        for node in moving {
            if let Some(n) = self.obj_mut(node).node_mut() {
                n.parent = Some(parent);
            }
        }
        Ok(child)
    }

    pub fn append_child(&mut self, parent: ObjectId, child: ObjectId) -> DomResult<ObjectId> {
        self.insert_before(parent, child, None)
    }

    pub fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> DomResult<ObjectId> {
        if self.parent_node(child) != Some(parent) {
            return Err(DomError::new(ErrorKind::InvalidArg, "not a child"));
        }
        self.detach(child);
        Ok(child)
    }

    /// Append without validation; both ids must be fresh nodes
    pub(crate) fn attach_child(&mut self, parent: ObjectId, child: ObjectId) {
        if let Some(n) = self.obj_mut(parent).node_mut() {
            n.children.push(child);
        }
        if let Some(n) = self.obj_mut(child).node_mut() {
            n.parent = Some(parent);
        }
    }

    /// Element descendants of `root` in tree order (root excluded)
    pub fn descendant_elements(&self, root: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack: Vec<ObjectId> = self.children(root).into_iter().rev().collect();
        while let Some(id) = stack.pop() {
            if self.is_element(id) {
                out.push(id);
            }
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    pub fn node_name(&self, id: ObjectId) -> String {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(e)) => e.tag.to_ascii_uppercase(),
            Some(NodeKind::Document(_)) => "#document".to_string(),
            Some(NodeKind::Fragment) => "#document-fragment".to_string(),
            Some(NodeKind::Text(_)) => "#text".to_string(),
            Some(NodeKind::Comment(_)) => "#comment".to_string(),
            Some(NodeKind::Attr { name, .. }) => name.clone(),
            Some(NodeKind::Doctype { name }) => name.clone(),
            None => String::new(),
        }
    }

    /// `textContent` getter
    pub fn text_content(&self, id: ObjectId) -> Option<String> {
        match &self.node(id)?.kind {
            NodeKind::Text(s) | NodeKind::Comment(s) => Some(s.clone()),
            NodeKind::Attr { value, .. } => Some(value.clone()),
            NodeKind::Document(_) | NodeKind::Doctype { .. } => None,
            NodeKind::Element(_) | NodeKind::Fragment => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                Some(out)
            }
        }
    }

    fn collect_text(&self, id: ObjectId, out: &mut String) {
        for child in self.children(id) {
            match self.node(child).map(|n| &n.kind) {
                Some(NodeKind::Text(s)) => out.push_str(s),
                Some(NodeKind::Element(_)) => self.collect_text(child, out),
                _ => {}
            }
        }
    }

    /// `textContent` setter: replaces children with one text node
    pub fn set_text_content(&mut self, id: ObjectId, text: &str) -> DomResult<()> {
        let replace_children = match self.obj_mut(id).node_mut().map(|n| &mut n.kind) {
            Some(NodeKind::Text(s) | NodeKind::Comment(s)) => {
                *s = text.to_string();
                false
            }
            Some(NodeKind::Attr { value, .. }) => {
                *value = text.to_string();
                false
            }
            Some(NodeKind::Element(_) | NodeKind::Fragment) => true,
            _ => false,
        };
        if replace_children {
            for child in self.children(id) {
                self.detach(child);
            }
            if !text.is_empty() {
                let node = self.create_node("Text", NodeKind::Text(text.to_string()))?;
                self.append_child(id, node)?;
            }
        }
        Ok(())
    }

    /// Wrap ids in a fresh list object of interface `class`
    pub fn create_list(&mut self, class: &str, items: Vec<ObjectId>) -> DomResult<ObjectId> {
        self.create_host(class, ObjectData::List(items))
    }

    pub fn list_items(&self, id: ObjectId) -> Option<&[ObjectId]> {
        match &self.obj(id).data {
            ObjectData::List(items) => Some(items),
            _ => None,
        }
    }

    fn this_node(&self, this: &Value) -> DomResult<ObjectId> {
        this.as_object()
            .filter(|id| self.node(*id).is_some())
            .ok_or_else(|| DomError::kind(ErrorKind::Unexpected))
    }
}

fn node_arg(realm: &Realm, v: &Value) -> DomResult<ObjectId> {
    v.as_object()
        .filter(|id| realm.node(*id).is_some())
        .ok_or_else(|| DomError::kind(ErrorKind::TypeMismatch))
}

/// Node and collection natives
pub(crate) fn install(realm: &mut Realm) {
    let natives = realm.natives_mut();

    natives.method("Node", "appendChild", |realm, this, args| {
        let parent = realm.this_node(this)?;
        let child = node_arg(realm, &arg(args, 0))?;
        realm.append_child(parent, child).map(Value::Object)
    });
    natives.method("Node", "removeChild", |realm, this, args| {
        let parent = realm.this_node(this)?;
        let child = node_arg(realm, &arg(args, 0))?;
        realm.remove_child(parent, child).map(Value::Object)
    });
    natives.method("Node", "insertBefore", |realm, this, args| {
        let parent = realm.this_node(this)?;
        let child = node_arg(realm, &arg(args, 0))?;
        let reference = arg(args, 1).as_object();
        realm.insert_before(parent, child, reference).map(Value::Object)
    });
    natives.method("Node", "hasChildNodes", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(Value::Bool(!realm.children(node).is_empty()))
    });
    natives.method("Node", "cloneNode", |realm, this, args| {
        let node = realm.this_node(this)?;
        realm.clone_node(node, arg(args, 0).truthy()).map(Value::Object)
    });
    natives.method("Node", "compareDocumentPosition", |realm, this, args| {
        let node = realm.this_node(this)?;
        let other = node_arg(realm, &arg(args, 0))?;
        Ok(Value::from(realm.compare_document_position(node, other) as i32))
    });

    natives.getter("Node", "parentNode", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.parent_node(node).into())
    });
    natives.getter("Node", "childNodes", |realm, this, _| {
        let node = realm.this_node(this)?;
        let children = realm.children(node);
        realm.create_list("NodeList", children).map(Value::Object)
    });
    natives.getter("Node", "firstChild", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.children(node).first().copied().into())
    });
    natives.getter("Node", "lastChild", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.children(node).last().copied().into())
    });
    natives.getter("Node", "previousSibling", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.sibling(node, -1).into())
    });
    natives.getter("Node", "nextSibling", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.sibling(node, 1).into())
    });
    natives.getter("Node", "nodeName", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(Value::String(realm.node_name(node)))
    });
    natives.getter("Node", "nodeType", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(Value::from(realm.node(node).map_or(0, |n| n.kind.node_type()) as i32))
    });
    natives.getter("Node", "nodeValue", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(match realm.node(node).map(|n| &n.kind) {
            Some(NodeKind::Text(_) | NodeKind::Comment(_) | NodeKind::Attr { .. }) => {
                realm.text_content(node).into()
            }
            _ => Value::Null,
        })
    });
    natives.getter("Node", "ownerDocument", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.node(node).and_then(|n| n.owner_document).into())
    });
    natives.getter("Node", "textContent", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.text_content(node).into())
    });
    natives.setter("Node", "textContent", |realm, this, args| {
        let node = realm.this_node(this)?;
        let v = arg(args, 0);
        let text = if v.is_null() { String::new() } else { realm.to_string(&v)? };
        realm.set_text_content(node, &text)?;
        Ok(Value::Undefined)
    });
    natives.getter("Node", "localName", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(match realm.node(node).map(|n| &n.kind) {
            Some(NodeKind::Element(e)) => Value::string(e.tag.clone()),
            Some(NodeKind::Attr { name, .. }) => Value::string(name.clone()),
            _ => Value::Null,
        })
    });
    natives.getter("Node", "prefix", |realm, this, _| {
        realm.this_node(this)?;
        Ok(Value::Null)
    });
    natives.getter("Node", "namespaceURI", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(if realm.is_element(node) {
            Value::string("http://www.w3.org/1999/xhtml")
        } else {
            Value::Null
        })
    });

    natives.getter("CharacterData", "data", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.text_content(node).into())
    });
    natives.setter("CharacterData", "data", |realm, this, args| {
        let node = realm.this_node(this)?;
        let text = realm.to_string(&arg(args, 0))?;
        realm.set_text_content(node, &text)?;
        Ok(Value::Undefined)
    });
    natives.getter("CharacterData", "length", |realm, this, _| {
        let node = realm.this_node(this)?;
        let len = realm.text_content(node).map_or(0, |s| s.encode_utf16().count());
        Ok(Value::Number(len as f64))
    });
    natives.method("CharacterData", "appendData", |realm, this, args| {
        let node = realm.this_node(this)?;
        let mut text = realm.text_content(node).unwrap_or_default();
        text.push_str(&realm.to_string(&arg(args, 0))?);
        realm.set_text_content(node, &text)?;
        Ok(Value::Undefined)
    });
    natives.method("Text", "toString", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.text_content(node).into())
    });

    natives.getter("Attr", "name", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(Value::String(realm.node_name(node)))
    });
    natives.getter("Attr", "value", |realm, this, _| {
        let node = realm.this_node(this)?;
        Ok(realm.text_content(node).into())
    });
    natives.setter("Attr", "value", |realm, this, args| {
        let node = realm.this_node(this)?;
        let text = realm.to_string(&arg(args, 0))?;
        realm.set_text_content(node, &text)?;
        Ok(Value::Undefined)
    });
    natives.getter("Attr", "specified", |realm, this, _| {
        realm.this_node(this)?;
        Ok(Value::Bool(true))
    });

    for iface in ["NodeList", "HTMLCollection"] {
        natives.getter(iface, "length", |realm, this, _| {
            let list = realm.this_object(this)?;
            Ok(Value::Number(realm.list_items(list).map_or(0, <[_]>::len) as f64))
        });
        natives.method(iface, "item", |realm, this, args| {
            let list = realm.this_object(this)?;
            let index = realm.to_number(&arg(args, 0))?;
            let item = realm
                .list_items(list)
                .and_then(|items| (index >= 0.0).then(|| items.get(index as usize).copied()).flatten());
            Ok(item.into())
        });
    }
}

impl Realm {
    fn sibling(&self, node: ObjectId, offset: isize) -> Option<ObjectId> {
        let parent = self.parent_node(node)?;
        let siblings = self.children(parent);
        let pos = siblings.iter().position(|c| *c == node)? as isize + offset;
        usize::try_from(pos).ok().and_then(|p| siblings.get(p).copied())
    }

    /// Copy a node; `deep` copies descendants too
    pub fn clone_node(&mut self, node: ObjectId, deep: bool) -> DomResult<ObjectId> {
        let Some(data) = self.node(node).cloned() else {
            return Err(DomError::kind(ErrorKind::TypeMismatch));
        };
        let class = self.obj(node).class;
        let class_name = self.graph().name(class);
        let copy = self.create_node(class_name, data.kind)?;
        if deep {
            for child in data.children {
                let c = self.clone_node(child, true)?;
                self.append_child(copy, c)?;
            }
        }
        Ok(copy)
    }

    /// Bitmask per DOM Level 3
    pub fn compare_document_position(&self, node: ObjectId, other: ObjectId) -> u16 {
        const DISCONNECTED: u16 = 0x01;
        const PRECEDING: u16 = 0x02;
        const FOLLOWING: u16 = 0x04;
        const CONTAINS: u16 = 0x08;
        const CONTAINED_BY: u16 = 0x10;

        if node == other {
            return 0;
        }
        let root = |mut n: ObjectId| {
            while let Some(p) = self.parent_node(n) {
                n = p;
            }
            n
        };
        if root(node) != root(other) {
            return DISCONNECTED | 0x20 | if node < other { FOLLOWING } else { PRECEDING };
        }
        if self.is_inclusive_ancestor(other, node) {
            return CONTAINS | PRECEDING;
        }
        if self.is_inclusive_ancestor(node, other) {
            return CONTAINED_BY | FOLLOWING;
        }
        let order = {
            let top = root(node);
            let mut all = vec![top];
            let mut stack: Vec<ObjectId> = self.children(top).into_iter().rev().collect();
            while let Some(id) = stack.pop() {
                all.push(id);
                stack.extend(self.children(id).into_iter().rev());
            }
            all
        };
        let a = order.iter().position(|n| *n == node);
        let b = order.iter().position(|n| *n == other);
        if b < a { PRECEDING } else { FOLLOWING }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DocumentMode;

    #[test]
    fn test_append_and_remove() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        let div = realm.create_element("div").unwrap();
        realm.append_child(body, div).unwrap();
        assert_eq!(realm.parent_node(div), Some(body));
        realm.remove_child(body, div).unwrap();
        assert_eq!(realm.parent_node(div), None);
        assert!(realm.remove_child(body, div).is_err());
    }

    #[test]
    fn test_hierarchy_rejected() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let outer = realm.create_element("div").unwrap();
        let inner = realm.create_element("span").unwrap();
        realm.append_child(outer, inner).unwrap();
        assert!(realm.append_child(inner, outer).is_err());
    }

    #[test]
    fn test_text_content() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let p = realm.create_element("p").unwrap();
        realm.set_text_content(p, "Test content").unwrap();
        assert_eq!(realm.text_content(p).as_deref(), Some("Test content"));
        assert_eq!(realm.children(p).len(), 1);
    }

    #[test]
    fn test_compare_document_position() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let body = realm.body().unwrap();
        let a = realm.create_element("div").unwrap();
        let b = realm.create_element("div").unwrap();
        realm.append_child(body, a).unwrap();
        realm.append_child(body, b).unwrap();
        assert_eq!(realm.compare_document_position(a, b), 0x04);
        assert_eq!(realm.compare_document_position(b, a), 0x02);
        assert_eq!(realm.compare_document_position(body, a), 0x10 | 0x04);
    }
}
