//! Attribute Reflection
//!
//! Content attributes, reflected IDL properties and `on*` handler slots.

use crate::attributes::AttributeList;
use crate::error::DomResult;
use crate::events::HandlerValue;
use crate::interfaces::MemberKind;
use crate::mode::{DocumentMode, Feature};
use crate::object::{FunctionKind, ObjectData, PropertyValue};
use crate::realm::Realm;
use crate::value::{ObjectId, Value};

/// Where an element keeps its attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeModel {
    /// Modes 5-7: attributes are properties of the element
    Properties,
    /// Mode 8: one store shared by expandos and content attributes
    Shared,
    /// Modes 9-11: string content attributes, expandos are plain properties
    Strings,
}

impl AttributeModel {
    pub fn for_mode(mode: DocumentMode) -> Self {
        if mode.supports(Feature::AttributeProperties) {
            AttributeModel::Properties
        } else if mode.supports(Feature::SharedAttributeStore) {
            AttributeModel::Shared
        } else {
            AttributeModel::Strings
        }
    }
}

struct Reflected {
    iface: &'static str,
    member: &'static str,
    content: &'static str,
}

const fn reflect(iface: &'static str, member: &'static str, content: &'static str) -> Reflected {
    Reflected {
        iface,
        member,
        content,
    }
}

/// IDL properties backed by a content attribute
static REFLECTED: &[Reflected] = &[
    reflect("HTMLElement", "id", "id"),
    reflect("HTMLElement", "className", "class"),
    reflect("HTMLElement", "title", "title"),
    reflect("HTMLElement", "lang", "lang"),
    reflect("HTMLElement", "dir", "dir"),
    reflect("HTMLAnchorElement", "href", "href"),
    reflect("HTMLAnchorElement", "target", "target"),
    reflect("HTMLAnchorElement", "name", "name"),
    reflect("HTMLAreaElement", "href", "href"),
    reflect("HTMLAreaElement", "alt", "alt"),
    reflect("HTMLAreaElement", "shape", "shape"),
    reflect("HTMLImageElement", "src", "src"),
    reflect("HTMLImageElement", "alt", "alt"),
    reflect("HTMLImageElement", "border", "border"),
    reflect("HTMLLabelElement", "htmlFor", "for"),
    reflect("HTMLIFrameElement", "src", "src"),
    reflect("HTMLIFrameElement", "name", "name"),
    reflect("HTMLIFrameElement", "frameBorder", "frameborder"),
    reflect("HTMLInputElement", "value", "value"),
    reflect("HTMLInputElement", "type", "type"),
    reflect("HTMLInputElement", "name", "name"),
    reflect("HTMLScriptElement", "src", "src"),
    reflect("HTMLScriptElement", "type", "type"),
    reflect("HTMLStyleElement", "media", "media"),
    reflect("HTMLStyleElement", "type", "type"),
    reflect("HTMLOptionElement", "value", "value"),
    reflect("HTMLFormElement", "action", "action"),
    reflect("HTMLFormElement", "method", "method"),
    reflect("HTMLBodyElement", "bgColor", "bgcolor"),
    reflect("HTMLMediaElement", "src", "src"),
];

fn reflected_entry(realm: &Realm, el: ObjectId, member: &str) -> Option<&'static Reflected> {
    let class = realm.obj(el).class;
    REFLECTED
        .iter()
        .find(|r| r.member == member && realm.graph().implements_name(class, r.iface))
}

fn reflects_content(realm: &Realm, el: ObjectId, name: &str) -> bool {
    let class = realm.obj(el).class;
    REFLECTED
        .iter()
        .any(|r| r.content.eq_ignore_ascii_case(name) && realm.graph().implements_name(class, r.iface))
}

/// Handler member of `el` called `name`
fn handler_member(realm: &Realm, el: ObjectId, name: &str) -> Option<&'static str> {
    match realm.graph().find_member(realm.obj(el).class, name) {
        Some((_, m)) if m.kind == MemberKind::EventHandler => Some(m.name),
        _ => None,
    }
}

fn attrs(realm: &Realm, el: ObjectId) -> Option<&AttributeList> {
    realm.element_data(el).map(|e| &e.attributes)
}

fn attrs_mut(realm: &mut Realm, el: ObjectId) -> Option<&mut AttributeList> {
    realm.element_data_mut(el).map(|e| &mut e.attributes)
}

/// Names an element answers through its schema rather than as expandos
pub(crate) fn is_claimed(realm: &Realm, el: ObjectId, key: &str) -> bool {
    let class = realm.obj(el).class;
    realm
        .graph()
        .flattened_members(class)
        .iter()
        .any(|(_, m)| m.name.eq_ignore_ascii_case(key))
        || reflects_content(realm, el, key)
}

/// String stored by a reflected property; modes 8 and 9 print plain script
/// objects as `[object]`
pub(crate) fn reflect_string(realm: &mut Realm, value: &Value) -> DomResult<String> {
    if let Value::Object(id) = value {
        let v = realm.mode_version();
        let plain = matches!(realm.obj(*id).data, ObjectData::Ordinary | ObjectData::Array(_));
        if (8..=9).contains(&v) && plain {
            let props = &realm.obj(*id).props;
            if !props.contains("toString") && !props.contains("valueOf") {
                return Ok("[object]".to_string());
            }
        }
    }
    realm.host_to_string(value)
}

fn stored_string(realm: &mut Realm, value: &Value) -> DomResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => realm.host_to_string(other),
    }
}

/// Getter half of a reflected property; `None` when `member` is not reflected
pub(crate) fn reflected_get(realm: &mut Realm, el: ObjectId, member: &'static str) -> DomResult<Option<Value>> {
    if !realm.is_element(el) {
        return Ok(None);
    }
    let Some(entry) = reflected_entry(realm, el, member) else {
        return Ok(None);
    };
    let raw = match AttributeModel::for_mode(realm.mode()) {
        AttributeModel::Properties => realm.obj(el).fields.get(member).cloned(),
        AttributeModel::Shared | AttributeModel::Strings => {
            attrs(realm, el).and_then(|a| a.get(entry.content)).map(|a| a.value.clone())
        }
    };
    let text = match raw {
        Some(v) => stored_string(realm, &v)?,
        None => String::new(),
    };
    Ok(Some(Value::String(text)))
}

/// Setter half of a reflected property; false when `member` is not reflected
pub(crate) fn reflected_set(realm: &mut Realm, el: ObjectId, member: &'static str, value: &Value) -> DomResult<bool> {
    if !realm.is_element(el) {
        return Ok(false);
    }
    let Some(entry) = reflected_entry(realm, el, member) else {
        return Ok(false);
    };
    let text = Value::String(reflect_string(realm, value)?);
    match AttributeModel::for_mode(realm.mode()) {
        AttributeModel::Properties => {
            realm.obj_mut(el).fields.insert(member, text);
        }
        AttributeModel::Shared | AttributeModel::Strings => {
            if let Some(a) = attrs_mut(realm, el) {
                a.set(entry.content, text);
            }
        }
    }
    Ok(true)
}

// ============================================================================
// Mode 8 expandos
// ============================================================================

pub(crate) fn expando_get(realm: &Realm, el: ObjectId, key: &str) -> Option<Value> {
    attrs(realm, el).and_then(|a| a.get(key)).map(|a| a.value.clone())
}

pub(crate) fn expando_set(realm: &mut Realm, el: ObjectId, key: &str, value: Value) {
    if let Some(a) = attrs_mut(realm, el) {
        a.set(key, value);
    }
}

pub(crate) fn expando_delete(realm: &mut Realm, el: ObjectId, key: &str) -> bool {
    attrs_mut(realm, el).is_some_and(|a| a.remove(key).is_some())
}

/// Expandos living in the attribute store, in attribute order
pub(crate) fn expando_names(realm: &Realm, id: ObjectId) -> Vec<String> {
    if !realm.mode().supports(Feature::SharedAttributeStore) || !realm.is_element(id) {
        return Vec::new();
    }
    attrs(realm, id)
        .map(|a| a.names())
        .unwrap_or_default()
        .into_iter()
        .filter(|n| !is_claimed(realm, id, n))
        .collect()
}

// ============================================================================
// Handler slots of elements
// ============================================================================

fn slot_value(realm: &Realm, el: ObjectId, name: &'static str) -> Option<HandlerValue> {
    realm.obj(el).target.handlers.get(name).and_then(|s| s.value.clone())
}

fn set_slot(realm: &mut Realm, el: ObjectId, name: &'static str, value: Option<HandlerValue>) {
    realm.obj_mut(el).target.handlers.entry(name).or_default().value = value;
}

pub(crate) fn element_handler_get(realm: &mut Realm, el: ObjectId, name: &'static str) -> DomResult<Value> {
    let legacy = realm.mode().is_legacy();
    Ok(match slot_value(realm, el, name) {
        None => Value::Null,
        Some(HandlerValue::Function(f)) => Value::Object(f),
        Some(HandlerValue::Raw(v)) => v,
        Some(HandlerValue::Source(src)) if legacy => Value::String(src),
        Some(HandlerValue::Source(src)) => Value::Object(realm.compile_handler(el, name, src)),
        Some(HandlerValue::Compiled { func, .. }) => Value::Object(func),
    })
}

/// Handler property assignment; never touches the content attribute
pub(crate) fn element_handler_set(realm: &mut Realm, el: ObjectId, name: &'static str, value: Value) -> DomResult<()> {
    let callable = realm.is_callable(&value);
    let new = match value {
        Value::Object(f) if callable => Some(HandlerValue::Function(f)),
        Value::Null => None,
        other if realm.mode().is_legacy() => Some(HandlerValue::Raw(other)),
        _ => None,
    };
    set_slot(realm, el, name, new);
    Ok(())
}

/// Content attribute removed from under a handler
fn clear_content_handler(realm: &mut Realm, el: ObjectId, name: &'static str) {
    let emptied = realm.obj(el).target.handlers.get(name).is_some_and(|s| s.emptied);
    if realm.mode_version() >= 11 && !emptied {
        let f = realm.create_function_object(FunctionKind::Empty, name, 0);
        let slot = realm.obj_mut(el).target.handlers.entry(name).or_default();
        slot.value = Some(HandlerValue::Function(f));
        slot.emptied = true;
    } else {
        set_slot(realm, el, name, None);
    }
}

fn namespace_arg(realm: &mut Realm, ns: &Value) -> DomResult<Option<String>> {
    match ns {
        Value::Undefined | Value::Null => Ok(None),
        other => realm.host_to_string(other).map(Some),
    }
}

impl Realm {
    /// Attribute model of this realm
    pub fn attribute_model(&self) -> AttributeModel {
        AttributeModel::for_mode(self.mode())
    }

    /// `el.getAttribute(name)`
    pub fn get_attribute(&mut self, el: ObjectId, name: &str) -> DomResult<Value> {
        match self.attribute_model() {
            AttributeModel::Properties => {
                if self.has(el, name) {
                    self.get(el, name)
                } else {
                    Ok(Value::Null)
                }
            }
            AttributeModel::Shared => {
                if let Some(handler) = handler_member(self, el, name) {
                    return Ok(match slot_value(self, el, handler) {
                        None | Some(HandlerValue::Function(_)) => Value::Null,
                        Some(HandlerValue::Raw(v)) => Value::String(stored_string(self, &v)?),
                        Some(HandlerValue::Source(src) | HandlerValue::Compiled { source: src, .. }) => {
                            Value::String(src)
                        }
                    });
                }
                match expando_get(self, el, name) {
                    Some(v) => Ok(Value::String(stored_string(self, &v)?)),
                    None => Ok(Value::Null),
                }
            }
            AttributeModel::Strings => Ok(attrs(self, el)
                .and_then(|a| a.get(name))
                .map_or(Value::Null, |a| a.value.clone())),
        }
    }

    /// `el.setAttribute(name, value)`
    pub fn set_attribute(&mut self, el: ObjectId, name: &str, value: Value) -> DomResult<()> {
        match self.attribute_model() {
            AttributeModel::Properties => {
                if let Some((_, m)) = self.graph().find_member(self.obj(el).class, name) {
                    if m.is_readonly() {
                        return Ok(());
                    }
                }
                self.set(el, name, value)
            }
            AttributeModel::Shared => {
                if let Some(handler) = handler_member(self, el, name) {
                    let text = reflect_string(self, &value)?;
                    set_slot(self, el, handler, Some(HandlerValue::Raw(Value::String(text))));
                    return Ok(());
                }
                let stored = if is_claimed(self, el, name) {
                    Value::String(reflect_string(self, &value)?)
                } else {
                    value
                };
                expando_set(self, el, name, stored);
                Ok(())
            }
            AttributeModel::Strings => {
                let handler = handler_member(self, el, name);
                let text = if handler.is_some() || reflects_content(self, el, name) {
                    reflect_string(self, &value)?
                } else {
                    self.host_to_string(&value)?
                };
                if let Some(a) = attrs_mut(self, el) {
                    a.set(name, Value::String(text.clone()));
                }
                if let Some(handler) = handler {
                    set_slot(self, el, handler, Some(HandlerValue::Source(text)));
                }
                Ok(())
            }
        }
    }

    /// `el.removeAttribute(name)`; legacy modes report whether anything
    /// was removed, standard modes return undefined
    pub fn remove_attribute(&mut self, el: ObjectId, name: &str) -> DomResult<Value> {
        match self.attribute_model() {
            AttributeModel::Properties => {
                let class = self.obj(el).class;
                if let Some((_, m)) = self.graph().find_member(class, name) {
                    let removed = match m.kind {
                        MemberKind::EventHandler => {
                            let is_string = matches!(
                                slot_value(self, el, m.name),
                                Some(HandlerValue::Raw(Value::String(_)) | HandlerValue::Source(_))
                            );
                            if is_string {
                                set_slot(self, el, m.name, None);
                            }
                            is_string
                        }
                        MemberKind::Property { readonly: true } => true,
                        MemberKind::Property { readonly: false } => {
                            self.obj_mut(el).fields.remove(m.name);
                            true
                        }
                        MemberKind::Method { .. } => self.obj_mut(el).props.remove(name).is_some(),
                    };
                    return Ok(Value::Bool(removed));
                }
                Ok(Value::Bool(self.obj_mut(el).props.remove(name).is_some()))
            }
            AttributeModel::Shared => {
                if let Some(handler) = handler_member(self, el, name) {
                    let removed = match slot_value(self, el, handler) {
                        None => false,
                        Some(HandlerValue::Function(_)) => {
                            set_slot(self, el, handler, None);
                            false
                        }
                        Some(_) => {
                            set_slot(self, el, handler, None);
                            true
                        }
                    };
                    return Ok(Value::Bool(removed));
                }
                let removed = expando_delete(self, el, name);
                Ok(Value::Bool(removed || name.eq_ignore_ascii_case("style")))
            }
            AttributeModel::Strings => {
                let removed = attrs_mut(self, el).is_some_and(|a| a.remove(name).is_some());
                if removed {
                    if let Some(handler) = handler_member(self, el, name) {
                        clear_content_handler(self, el, handler);
                    }
                }
                Ok(Value::Undefined)
            }
        }
    }

    /// `el.hasAttribute(name)`
    pub fn has_attribute(&self, el: ObjectId, name: &str) -> bool {
        match self.attribute_model() {
            AttributeModel::Properties => self.has(el, name),
            AttributeModel::Shared => {
                if let Some(handler) = handler_member(self, el, name) {
                    return slot_value(self, el, handler).is_some();
                }
                attrs(self, el).is_some_and(|a| a.has(name))
            }
            AttributeModel::Strings => attrs(self, el).is_some_and(|a| a.has(name)),
        }
    }

    /// `el.getAttributeNS(ns, local)`; `""` when missing
    pub fn get_attribute_ns(&mut self, el: ObjectId, ns: &Value, local: &str) -> DomResult<Value> {
        let ns = namespace_arg(self, ns)?;
        let value = attrs(self, el)
            .and_then(|a| a.get_ns(ns.as_deref(), local))
            .map(|a| a.value.clone());
        match value {
            Some(v) => Ok(Value::String(stored_string(self, &v)?)),
            None => Ok(Value::string("")),
        }
    }

    /// `el.setAttributeNS(ns, qualified, value)`
    pub fn set_attribute_ns(&mut self, el: ObjectId, ns: &Value, qualified: &str, value: &Value) -> DomResult<()> {
        let ns = namespace_arg(self, ns)?;
        let text = self.to_string(value)?;
        match attrs_mut(self, el) {
            Some(a) => a.set_ns(ns.as_deref(), qualified, Value::String(text)),
            None => Ok(()),
        }
    }

    pub fn remove_attribute_ns(&mut self, el: ObjectId, ns: &Value, local: &str) -> DomResult<()> {
        let ns = namespace_arg(self, ns)?;
        if let Some(a) = attrs_mut(self, el) {
            a.remove_ns(ns.as_deref(), local);
        }
        Ok(())
    }

    pub fn has_attribute_ns(&mut self, el: ObjectId, ns: &Value, local: &str) -> DomResult<bool> {
        let ns = namespace_arg(self, ns)?;
        Ok(attrs(self, el).is_some_and(|a| a.has_ns(ns.as_deref(), local)))
    }

    /// Content attribute text as selectors and id lookups see it
    pub fn attribute_text(&self, el: ObjectId, name: &str) -> Option<String> {
        match self.attribute_model() {
            AttributeModel::Properties => {
                let class = self.obj(el).class;
                let member = REFLECTED
                    .iter()
                    .find(|r| r.content.eq_ignore_ascii_case(name) && self.graph().implements_name(class, r.iface))
                    .map(|r| r.member);
                let obj = self.obj(el);
                let value = match member {
                    Some(m) => obj.fields.get(m).cloned(),
                    None => match obj.props.get(name).map(|p| &p.value) {
                        Some(PropertyValue::Data(v)) => Some(v.clone()),
                        _ => None,
                    },
                };
                value.and_then(|v| v.primitive_to_string())
            }
            AttributeModel::Shared | AttributeModel::Strings => attrs(self, el)
                .and_then(|a| a.get(name))
                .and_then(|a| a.value.primitive_to_string()),
        }
    }
}
