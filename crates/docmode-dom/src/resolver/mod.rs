//! Property Resolution
//!
//! Mode-dependent get/set/delete/enumerate over host and script objects.

pub(crate) mod legacy;
pub(crate) mod standard;

use crate::error::{DomError, DomResult, ErrorKind};
use crate::graph::InterfaceId;
use crate::interfaces::{MemberDescriptor, MemberKind};
use crate::mode::{DocumentMode, Feature};
use crate::object::{NamedSlot, ObjectData, Property, PropertyFlags, PropertyValue};
use crate::realm::Realm;
use crate::reflect;
use crate::value::{array_index, ObjectId, Value};
use std::collections::HashSet;

/// Which resolution rules a realm uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyModel {
    /// Flat host objects without prototype chains (modes 5-8)
    Legacy { expando_delete: bool },
    /// Interface prototype objects (modes 9-11)
    Standard { proto_accessor: bool },
}

impl PropertyModel {
    pub fn for_mode(mode: DocumentMode) -> Self {
        if mode.is_legacy() {
            PropertyModel::Legacy {
                expando_delete: mode.supports(Feature::ExpandoDelete),
            }
        } else {
            PropertyModel::Standard {
                proto_accessor: mode.supports(Feature::ProtoAccessor),
            }
        }
    }

    pub fn is_legacy(self) -> bool {
        matches!(self, PropertyModel::Legacy { .. })
    }
}

/// `Object.getOwnPropertyDescriptor` shape; absent fields are `None`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyDescriptor {
    pub value: Option<Value>,
    pub get: Option<Value>,
    pub set: Option<Value>,
    pub writable: Option<bool>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: Value, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            value: Some(value),
            writable: Some(writable),
            enumerable: Some(enumerable),
            configurable: Some(configurable),
            ..Self::default()
        }
    }

    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }
}

/// Read a schema property or handler through its accessor
pub(crate) fn accessor_get(
    realm: &mut Realm,
    iface: InterfaceId,
    member: &'static MemberDescriptor,
    receiver: &Value,
) -> DomResult<Value> {
    let desc = realm.graph().node(iface).desc;
    if desc.is_script_builtin() {
        return match realm.natives().resolve(desc, member.name, crate::object::NativeRole::Getter) {
            Some(f) => f(realm, receiver, &[]),
            None => Ok(Value::Undefined),
        };
    }
    let Some(id) = receiver.as_object() else {
        return Ok(Value::Undefined);
    };
    let legacy = realm.model().is_legacy();
    if realm.obj(id).is_prototype() {
        return Ok(Value::Undefined);
    }
    if !realm.graph().implements(realm.obj(id).class, iface) {
        return Err(DomError::kind(if legacy {
            ErrorKind::InvalidProcedureCall
        } else {
            ErrorKind::Unexpected
        }));
    }
    if let Some(f) = realm
        .natives()
        .resolve(desc, member.name, crate::object::NativeRole::Getter)
    {
        return f(realm, receiver, &[]);
    }
    if member.kind == MemberKind::EventHandler {
        return realm.handler_value(id, member.name);
    }
    if let Some(v) = reflect::reflected_get(realm, id, member.name)? {
        return Ok(v);
    }
    Ok(realm.obj(id).fields.get(member.name).cloned().unwrap_or_default())
}

/// Assign a schema property or handler through its accessor
pub(crate) fn accessor_set(
    realm: &mut Realm,
    iface: InterfaceId,
    member: &'static MemberDescriptor,
    receiver: &Value,
    value: Value,
) -> DomResult<()> {
    let legacy = realm.model().is_legacy();
    if member.is_readonly() {
        return if legacy {
            Err(DomError::kind(ErrorKind::InvalidProperty))
        } else {
            Ok(())
        };
    }
    let desc = realm.graph().node(iface).desc;
    if desc.is_script_builtin() {
        if let Some(f) = realm
            .natives()
            .resolve(desc, member.name, crate::object::NativeRole::Setter)
        {
            f(realm, receiver, &[value])?;
        }
        return Ok(());
    }
    let Some(id) = receiver.as_object() else {
        return Ok(());
    };
    if realm.obj(id).is_prototype() {
        return Ok(());
    }
    if !realm.graph().implements(realm.obj(id).class, iface) {
        return Err(DomError::kind(if legacy {
            ErrorKind::InvalidProcedureCall
        } else {
            ErrorKind::Unexpected
        }));
    }
    if let Some(f) = realm
        .natives()
        .resolve(desc, member.name, crate::object::NativeRole::Setter)
    {
        f(realm, receiver, &[value])?;
        return Ok(());
    }
    if member.kind == MemberKind::EventHandler {
        return realm.set_handler_value(id, member.name, value);
    }
    if reflect::reflected_set(realm, id, member.name, &value)? {
        return Ok(());
    }
    realm.obj_mut(id).fields.insert(member.name, value);
    Ok(())
}

/// Whether `key` names a schema member of `class`
pub(crate) fn is_schema_name(realm: &Realm, class: InterfaceId, key: &str) -> bool {
    realm.graph().find_member(class, key).is_some()
}

impl Realm {
    /// `obj[key]`
    pub fn get(&mut self, obj: ObjectId, key: &str) -> DomResult<Value> {
        if self.is_legacy_host(obj) {
            legacy::get(self, obj, key)
        } else {
            standard::get(self, obj, key, &Value::Object(obj))
        }
    }

    /// `base[key]` for any base value
    pub fn get_value(&mut self, base: &Value, key: &str) -> DomResult<Value> {
        let proto = match base {
            Value::Object(id) => return self.get(*id, key),
            Value::Undefined | Value::Null => return Err(DomError::kind(ErrorKind::ObjectExpected)),
            Value::String(s) => {
                if key == "length" {
                    return Ok(Value::Number(s.encode_utf16().count() as f64));
                }
                if let Some(i) = array_index(key) {
                    return Ok(s
                        .chars()
                        .nth(i)
                        .map_or(Value::Undefined, |c| Value::String(c.to_string())));
                }
                self.intrinsics().string_prototype
            }
            Value::Number(_) => self.intrinsics().number_prototype,
            Value::Bool(_) => self.intrinsics().boolean_prototype,
        };
        standard::get(self, proto, key, base)
    }

    /// `obj[key] = value`
    pub fn set(&mut self, obj: ObjectId, key: &str, value: Value) -> DomResult<()> {
        if self.is_legacy_host(obj) {
            legacy::set(self, obj, key, value)
        } else {
            standard::set(self, obj, key, value)
        }
    }

    /// `base[key] = value`; primitives swallow the write
    pub fn set_value(&mut self, base: &Value, key: &str, value: Value) -> DomResult<()> {
        match base {
            Value::Object(id) => self.set(*id, key, value),
            Value::Undefined | Value::Null => Err(DomError::kind(ErrorKind::ObjectExpected)),
            _ => Ok(()),
        }
    }

    /// `delete obj[key]`
    pub fn delete(&mut self, obj: ObjectId, key: &str) -> DomResult<bool> {
        if self.is_legacy_host(obj) {
            legacy::delete(self, obj, key)
        } else {
            standard::delete(self, obj, key)
        }
    }

    /// `key in obj`
    pub fn has(&self, obj: ObjectId, key: &str) -> bool {
        let mut cur = Some(obj);
        while let Some(id) = cur {
            if self.is_legacy_host(id) {
                return legacy::has(self, id, key);
            }
            if standard::own_slot(self, id, key).is_some() {
                return true;
            }
            cur = self.obj(id).proto;
        }
        false
    }

    /// `obj.hasOwnProperty(key)`
    pub fn has_own(&self, obj: ObjectId, key: &str) -> bool {
        if self.is_legacy_host(obj) {
            legacy::has_own(self, obj, key)
        } else {
            standard::own_slot(self, obj, key).is_some()
        }
    }

    /// `Object.getOwnPropertyNames(obj)`
    pub fn own_keys(&self, obj: ObjectId) -> Vec<String> {
        if self.is_legacy_host(obj) {
            legacy::own_keys(self, obj)
        } else {
            standard::own_keys(self, obj, false)
        }
    }

    /// `Object.keys(obj)`
    pub fn keys(&self, obj: ObjectId) -> Vec<String> {
        if self.is_legacy_host(obj) {
            legacy::own_keys(self, obj)
        } else {
            standard::own_keys(self, obj, true)
        }
    }

    /// Live `for..in` cursor over `obj` and its prototypes
    pub fn for_in(&self, obj: ObjectId) -> ForIn {
        ForIn::new(self, obj)
    }

    /// Drain a `for..in` enumeration
    pub fn for_in_keys(&self, obj: ObjectId) -> Vec<String> {
        let mut it = self.for_in(obj);
        std::iter::from_fn(|| it.next(self)).collect()
    }

    /// `target.name(...args)`
    pub fn call_method(&mut self, target: &Value, name: &str, args: &[Value]) -> DomResult<Value> {
        let f = self.get_value(target, name)?;
        if !self.is_callable(&f) {
            let kind = if self.model().is_legacy() {
                ErrorKind::InvalidProperty
            } else {
                ErrorKind::FunctionExpected
            };
            return Err(DomError::new(kind, name));
        }
        self.call(&f, target.clone(), args)
    }

    pub fn get_prototype_of(&self, obj: ObjectId) -> Option<ObjectId> {
        self.obj(obj).proto
    }

    /// `Object.setPrototypeOf` / `__proto__` assignment
    pub fn set_prototype_of(&mut self, obj: ObjectId, proto: Option<ObjectId>) -> DomResult<()> {
        if self.obj(obj).proto == proto {
            return Ok(());
        }
        if !self.obj(obj).extensible {
            return Err(DomError::kind(ErrorKind::NotExtensible));
        }
        let mut cur = proto;
        while let Some(p) = cur {
            if p == obj {
                return Err(DomError::kind(ErrorKind::CyclicProto));
            }
            cur = self.obj(p).proto;
        }
        self.obj_mut(obj).proto = proto;
        Ok(())
    }

    pub fn get_own_property_descriptor(
        &mut self,
        obj: ObjectId,
        key: &str,
    ) -> DomResult<Option<PropertyDescriptor>> {
        let Some(slot) = standard::own_slot(self, obj, key) else {
            return Ok(None);
        };
        Ok(Some(match slot {
            standard::Slot::Data {
                value,
                flags,
            } => PropertyDescriptor::data(value, flags.writable, flags.enumerable, flags.configurable),
            standard::Slot::Accessor { get, set, flags } => PropertyDescriptor {
                get: Some(get.map_or(Value::Undefined, Value::Object)),
                set: Some(set.map_or(Value::Undefined, Value::Object)),
                enumerable: Some(flags.enumerable),
                configurable: Some(flags.configurable),
                ..PropertyDescriptor::default()
            },
            standard::Slot::Member {
                holder,
                iface,
                member,
            } => {
                let role = crate::object::NativeRole::Method;
                if member.is_method() {
                    let f = self.member_function(holder, iface, member, role, None);
                    PropertyDescriptor::data(Value::Object(f), true, false, true)
                } else {
                    let enumerable = self.graph().node(iface).desc.enumerable_members;
                    let get = self.member_function(holder, iface, member, crate::object::NativeRole::Getter, None);
                    let set = if member.is_readonly() {
                        Value::Undefined
                    } else {
                        Value::Object(self.member_function(
                            holder,
                            iface,
                            member,
                            crate::object::NativeRole::Setter,
                            None,
                        ))
                    };
                    PropertyDescriptor {
                        get: Some(Value::Object(get)),
                        set: Some(set),
                        enumerable: Some(enumerable),
                        configurable: Some(true),
                        ..PropertyDescriptor::default()
                    }
                }
            }
        }))
    }

    /// `Object.defineProperty(obj, key, desc)`
    pub fn define_property(&mut self, obj: ObjectId, key: &str, desc: PropertyDescriptor) -> DomResult<()> {
        if let Some(i) = array_index(key) {
            if let ObjectData::Array(items) = &mut self.obj_mut(obj).data {
                if items.len() <= i {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = desc.value.unwrap_or_default();
                return Ok(());
            }
        }
        let existing = self.obj(obj).props.get(key).cloned();
        let current = match &existing {
            Some(p) => p.flags,
            None => {
                if !self.obj(obj).extensible {
                    return Err(DomError::new(ErrorKind::NotExtensible, key));
                }
                PropertyFlags {
                    enumerable: false,
                    writable: false,
                    configurable: false,
                }
            }
        };
        if let Some(p) = &existing {
            if !p.flags.configurable {
                let widens = desc.configurable == Some(true)
                    || desc.enumerable.is_some_and(|e| e != p.flags.enumerable)
                    || desc.is_accessor() != p.is_accessor();
                let rewrites = match &p.value {
                    PropertyValue::Data(old) => {
                        !p.flags.writable
                            && (desc.writable == Some(true) || desc.value.as_ref().is_some_and(|v| v != old))
                    }
                    PropertyValue::Accessor { .. } => desc.is_accessor(),
                };
                if widens || rewrites {
                    return Err(DomError::new(ErrorKind::NonConfigurable, key));
                }
            }
        }

        let flags = PropertyFlags {
            enumerable: desc.enumerable.unwrap_or(current.enumerable),
            writable: desc.writable.unwrap_or(current.writable),
            configurable: desc.configurable.unwrap_or(current.configurable),
        };
        let prop = if desc.is_accessor() {
            let (old_get, old_set) = match existing.as_ref().map(|p| &p.value) {
                Some(PropertyValue::Accessor { get, set }) => (*get, *set),
                _ => (None, None),
            };
            let get = desc.get.as_ref().map_or(old_get, Value::as_object);
            let set = desc.set.as_ref().map_or(old_set, Value::as_object);
            Property::accessor(get, set, flags)
        } else {
            let value = match (desc.value, existing.map(|p| p.value)) {
                (Some(v), _) => v,
                (None, Some(PropertyValue::Data(old))) => old,
                _ => Value::Undefined,
            };
            Property::with_flags(value, flags)
        };
        self.obj_mut(obj).props.insert(key, prop);
        Ok(())
    }

    pub fn prevent_extensions(&mut self, obj: ObjectId) {
        self.obj_mut(obj).extensible = false;
    }

    pub fn is_extensible(&self, obj: ObjectId) -> bool {
        self.obj(obj).extensible
    }

    /// `Object.freeze`
    pub fn freeze(&mut self, obj: ObjectId) {
        let o = self.obj_mut(obj);
        o.extensible = false;
        let keys: Vec<String> = o.props.keys().map(str::to_string).collect();
        for key in keys {
            if let Some(p) = o.props.get_mut(&key) {
                p.flags.configurable = false;
                if !p.is_accessor() {
                    p.flags.writable = false;
                }
            }
        }
    }

    pub fn is_frozen(&self, obj: ObjectId) -> bool {
        let o = self.obj(obj);
        !o.extensible
            && o.props
                .iter()
                .all(|(_, p)| !p.flags.configurable && (p.is_accessor() || !p.flags.writable))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Schema,
    Index,
    Overlay,
    Expando,
    Named,
    Next,
}

/// Lazy `for..in` enumeration; properties added to objects not yet
/// visited still show up
#[derive(Debug)]
pub struct ForIn {
    current: Option<ObjectId>,
    phase: Phase,
    index: usize,
    pending: Vec<String>,
    /// Named slots present when the current object was entered
    named_limit: usize,
    visited: HashSet<String>,
}

impl ForIn {
    fn new(realm: &Realm, obj: ObjectId) -> Self {
        let mut it = Self {
            current: Some(obj),
            phase: Phase::Schema,
            index: 0,
            pending: Vec::new(),
            named_limit: 0,
            visited: HashSet::new(),
        };
        it.enter(realm, obj);
        it
    }

    fn enter(&mut self, realm: &Realm, obj: ObjectId) {
        self.phase = Phase::Schema;
        self.index = 0;
        self.pending = schema_keys(realm, obj);
        self.named_limit = realm.obj(obj).named_items().map_or(0, |h| h.named_slot_count());
    }

    fn advance(&mut self, phase: Phase) {
        self.phase = phase;
        self.index = 0;
    }

    /// Next enumerable key, or `None` when done
    pub fn next(&mut self, realm: &Realm) -> Option<String> {
        loop {
            let id = self.current?;
            let obj = realm.obj(id);
            let candidate = match self.phase {
                Phase::Schema => match self.pending.get(self.index) {
                    Some(k) => Some(k.clone()),
                    None => {
                        self.advance(Phase::Index);
                        continue;
                    }
                },
                Phase::Index => {
                    let len = match &obj.data {
                        ObjectData::Array(items) => items.len(),
                        ObjectData::List(items) => items.len(),
                        _ => 0,
                    };
                    if self.index < len {
                        Some(self.index.to_string())
                    } else {
                        self.advance(Phase::Overlay);
                        continue;
                    }
                }
                Phase::Overlay => {
                    if self.index >= obj.props.slot_count() {
                        self.advance(Phase::Expando);
                        self.pending = reflect::expando_names(realm, id);
                        continue;
                    }
                    obj.props
                        .slot(self.index)
                        .filter(|(_, p)| p.flags.enumerable)
                        .map(|(k, _)| k.to_string())
                }
                Phase::Expando => match self.pending.get(self.index) {
                    Some(k) => Some(k.clone()),
                    None => {
                        self.advance(Phase::Named);
                        continue;
                    }
                },
                Phase::Named if self.index >= self.named_limit => {
                    self.advance(Phase::Next);
                    continue;
                }
                Phase::Named => match obj.named_items().map(|h| h.named_slot(self.index)) {
                    Some(NamedSlot::Live(name)) => Some(name),
                    Some(NamedSlot::Vacant) => None,
                    Some(NamedSlot::End) | None => {
                        self.advance(Phase::Next);
                        continue;
                    }
                },
                Phase::Next => {
                    self.current = if realm.is_legacy_host(id) { None } else { obj.proto };
                    if let Some(next) = self.current {
                        self.enter(realm, next);
                    }
                    continue;
                }
            };
            self.index += 1;
            if let Some(key) = candidate {
                if self.visited.insert(key.clone()) {
                    return Some(key);
                }
            }
        }
    }
}

/// Non-method schema members an object enumerates as its own
fn schema_keys(realm: &Realm, id: ObjectId) -> Vec<String> {
    let obj = realm.obj(id);
    let desc = realm.graph().node(obj.class).desc;
    if !desc.enumerable_members || obj.is_function() {
        return Vec::new();
    }
    let members: Vec<&'static MemberDescriptor> = if realm.is_legacy_host(id) {
        if obj.is_prototype() {
            return Vec::new();
        }
        realm
            .graph()
            .flattened_members(obj.class)
            .into_iter()
            .map(|(_, m)| m)
            .collect()
    } else if obj.is_prototype() {
        realm.graph().node(obj.class).members.clone()
    } else if desc.prototype_less {
        realm
            .graph()
            .flattened_members(obj.class)
            .into_iter()
            .map(|(_, m)| m)
            .collect()
    } else {
        return Vec::new();
    };
    members
        .into_iter()
        .filter(|m| !m.is_method() && !obj.removed.contains(&m.name))
        .map(|m| m.name.to_string())
        .collect()
}
