//! Prototype-chain resolution used by standard modes and by script objects
//! in every mode.

use super::{accessor_get, accessor_set, is_schema_name, legacy};
use crate::error::{DomError, DomResult, ErrorKind};
use crate::graph::InterfaceId;
use crate::interfaces::MemberDescriptor;
use crate::object::{NativeRole, ObjectData, Property, PropertyFlags, PropertyValue};
use crate::realm::Realm;
use crate::value::{array_index, ObjectId, Value};

/// What an object holds under one key, before inheritance
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    Data {
        value: Value,
        flags: PropertyFlags,
    },
    Accessor {
        get: Option<ObjectId>,
        set: Option<ObjectId>,
        flags: PropertyFlags,
    },
    /// Schema member owned by a prototype (or prototype-less instance)
    Member {
        holder: ObjectId,
        iface: InterfaceId,
        member: &'static MemberDescriptor,
    },
}

const INDEXED: PropertyFlags = PropertyFlags {
    enumerable: true,
    writable: false,
    configurable: true,
};

const GLOBAL: PropertyFlags = PropertyFlags {
    enumerable: false,
    writable: true,
    configurable: true,
};

/// Schema member held directly by `id`
pub(crate) fn own_member(realm: &Realm, id: ObjectId, key: &str) -> Option<(InterfaceId, &'static MemberDescriptor)> {
    let obj = realm.obj(id);
    if obj.removed.iter().any(|r| *r == key) {
        return None;
    }
    let node = realm.graph().node(obj.class);
    match obj.data {
        ObjectData::Prototype => node.own_member(key).map(|m| (obj.class, m)),
        ObjectData::Function(_) | ObjectData::Interface | ObjectData::Ordinary | ObjectData::Array(_) => None,
        _ if node.desc.prototype_less => realm.graph().find_member(obj.class, key),
        _ => None,
    }
}

/// Own property lookup: exotic indices, named items, overlay, schema,
/// window globals
pub(crate) fn own_slot(realm: &Realm, id: ObjectId, key: &str) -> Option<Slot> {
    let obj = realm.obj(id);
    match &obj.data {
        ObjectData::Array(items) => {
            if key == "length" {
                return Some(Slot::Data {
                    value: Value::Number(items.len() as f64),
                    flags: PropertyFlags {
                        enumerable: false,
                        writable: true,
                        configurable: false,
                    },
                });
            }
            if let Some(v) = array_index(key).and_then(|i| items.get(i)) {
                return Some(Slot::Data {
                    value: v.clone(),
                    flags: PropertyFlags::DEFAULT,
                });
            }
        }
        ObjectData::List(items) => {
            if let Some(item) = array_index(key).and_then(|i| items.get(i)) {
                return Some(Slot::Data {
                    value: Value::Object(*item),
                    flags: INDEXED,
                });
            }
        }
        _ => {}
    }

    if let Some(named) = obj.named_items() {
        if !obj.props.contains(key) && !is_schema_name(realm, obj.class, key) {
            if let Some(value) = named.named_item(key) {
                return Some(Slot::Data {
                    value,
                    flags: PropertyFlags::DEFAULT,
                });
            }
        }
    }

    if let Some(prop) = obj.props.get(key) {
        return Some(match &prop.value {
            PropertyValue::Data(v) => Slot::Data {
                value: v.clone(),
                flags: prop.flags,
            },
            PropertyValue::Accessor { get, set } => Slot::Accessor {
                get: *get,
                set: *set,
                flags: prop.flags,
            },
        });
    }

    if let Some((iface, member)) = own_member(realm, id, key) {
        return Some(Slot::Member {
            holder: id,
            iface,
            member,
        });
    }

    if id == realm.window() {
        if let Some(value) = realm.global_value(key) {
            return Some(Slot::Data { value, flags: GLOBAL });
        }
    }
    None
}

fn read_slot(realm: &mut Realm, slot: Slot, receiver: &Value) -> DomResult<Value> {
    match slot {
        Slot::Data { value, .. } => Ok(value),
        Slot::Accessor { get: Some(g), .. } => realm.call(&Value::Object(g), receiver.clone(), &[]),
        Slot::Accessor { get: None, .. } => Ok(Value::Undefined),
        Slot::Member {
            holder,
            iface,
            member,
        } => {
            if member.is_method() {
                let f = realm.member_function(holder, iface, member, NativeRole::Method, None);
                Ok(Value::Object(f))
            } else {
                accessor_get(realm, iface, member, receiver)
            }
        }
    }
}

/// `[[Get]]` starting at `start` with `receiver` as `this` for accessors
pub(crate) fn get(realm: &mut Realm, start: ObjectId, key: &str, receiver: &Value) -> DomResult<Value> {
    let mut cur = Some(start);
    while let Some(id) = cur {
        if realm.is_legacy_host(id) {
            return legacy::get(realm, id, key);
        }
        if let Some(slot) = own_slot(realm, id, key) {
            return read_slot(realm, slot, receiver);
        }
        cur = realm.obj(id).proto;
    }
    Ok(Value::Undefined)
}

/// `[[Set]]` with `obj` as receiver
pub(crate) fn set(realm: &mut Realm, obj: ObjectId, key: &str, value: Value) -> DomResult<()> {
    {
        let o = realm.obj(obj);
        let routed = o.named_items().is_some() && !o.props.contains(key) && !is_schema_name(realm, o.class, key);
        if routed {
            let text = realm.to_string(&value)?;
            let stored = realm
                .obj_mut(obj)
                .named_items_mut()
                .is_some_and(|h| h.set_named_item(key, &text));
            if !stored {
                return Err(DomError::new(ErrorKind::InvalidArg, format!("cannot store {key}")));
            }
            return Ok(());
        }
    }

    let receiver = Value::Object(obj);
    let mut cur = Some(obj);
    while let Some(id) = cur {
        if realm.is_legacy_host(id) {
            break;
        }
        match own_slot(realm, id, key) {
            Some(Slot::Data { flags, .. }) => {
                if !flags.writable {
                    return Ok(());
                }
                break;
            }
            Some(Slot::Accessor { set, .. }) => {
                return match set {
                    Some(s) => realm.call(&Value::Object(s), receiver, &[value]).map(drop),
                    None => Ok(()),
                };
            }
            Some(Slot::Member { iface, member, .. }) => {
                if member.is_method() {
                    break;
                }
                return accessor_set(realm, iface, member, &receiver, value);
            }
            None => cur = realm.obj(id).proto,
        }
    }
    define_own_data(realm, obj, key, value);
    Ok(())
}

/// Create or update a plain data property on `obj`
fn define_own_data(realm: &mut Realm, obj: ObjectId, key: &str, value: Value) {
    let o = realm.obj_mut(obj);
    match &mut o.data {
        ObjectData::Array(items) => {
            if key == "length" {
                if let Some(n) = value.as_number().filter(|n| *n >= 0.0 && n.fract() == 0.0) {
                    items.resize(n as usize, Value::Undefined);
                }
                return;
            }
            if let Some(i) = array_index(key) {
                if items.len() <= i {
                    items.resize(i + 1, Value::Undefined);
                }
                items[i] = value;
                return;
            }
        }
        ObjectData::List(_) if array_index(key).is_some() => return,
        _ => {}
    }
    match o.props.get_mut(key) {
        Some(prop) => {
            if prop.flags.writable {
                prop.value = PropertyValue::Data(value);
            }
        }
        None => {
            if o.extensible {
                o.props.insert(key, Property::data(value));
            }
        }
    }
}

/// `delete obj[key]`
pub(crate) fn delete(realm: &mut Realm, obj: ObjectId, key: &str) -> DomResult<bool> {
    let class = realm.obj(obj).class;
    let schema_name = is_schema_name(realm, class, key);

    if realm.obj(obj).named_items().is_some() && !schema_name {
        let deleted = realm
            .obj_mut(obj)
            .named_items_mut()
            .is_some_and(|h| h.delete_named_item(key));
        if deleted {
            return Ok(true);
        }
    }

    let holds_member = own_member(realm, obj, key);
    let o = realm.obj_mut(obj);
    if let Some(prop) = o.props.get(key) {
        if !prop.flags.configurable {
            return Err(DomError::new(ErrorKind::NonConfigurable, key));
        }
        o.props.remove(key);
        if let Some((_, member)) = holds_member {
            o.removed.push(member.name);
        }
        return Ok(true);
    }
    if let Some((_, member)) = holds_member {
        o.removed.push(member.name);
        return Ok(true);
    }
    if let ObjectData::Array(items) = &mut o.data {
        if key == "length" {
            return Ok(false);
        }
        if let Some(slot) = array_index(key).and_then(|i| items.get_mut(i)) {
            *slot = Value::Undefined;
        }
    }
    Ok(true)
}

/// Own keys in enumeration order; `enumerable_only` gives `Object.keys`
pub(crate) fn own_keys(realm: &Realm, obj: ObjectId, enumerable_only: bool) -> Vec<String> {
    let o = realm.obj(obj);
    let mut keys: Vec<String> = Vec::new();
    match &o.data {
        ObjectData::Array(items) => keys.extend((0..items.len()).map(|i| i.to_string())),
        ObjectData::List(items) => keys.extend((0..items.len()).map(|i| i.to_string())),
        _ => {}
    }
    let node = realm.graph().node(o.class);
    let members: Vec<&'static MemberDescriptor> = match o.data {
        ObjectData::Prototype => node.members.clone(),
        ObjectData::Function(_) | ObjectData::Interface | ObjectData::Ordinary | ObjectData::Array(_) => Vec::new(),
        _ if node.desc.prototype_less => realm
            .graph()
            .flattened_members(o.class)
            .into_iter()
            .map(|(_, m)| m)
            .collect(),
        _ => Vec::new(),
    };
    let members_enumerable = node.desc.enumerable_members;
    for m in members {
        if o.removed.contains(&m.name) {
            continue;
        }
        if enumerable_only && (m.is_method() || !members_enumerable) {
            continue;
        }
        keys.push(m.name.to_string());
    }
    for (k, p) in o.props.iter() {
        if (!enumerable_only || p.flags.enumerable) && !keys.iter().any(|seen| seen == k) {
            keys.push(k.to_string());
        }
    }
    if let Some(named) = o.named_items() {
        let mut i = 0;
        loop {
            match named.named_slot(i) {
                crate::object::NamedSlot::Live(name) => {
                    if !keys.contains(&name) {
                        keys.push(name);
                    }
                }
                crate::object::NamedSlot::Vacant => {}
                crate::object::NamedSlot::End => break,
            }
            i += 1;
        }
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DocumentMode;

    #[test]
    fn test_proto_member_slot() {
        let realm = Realm::new(DocumentMode::IE9);
        let proto = realm.prototype("Element").unwrap();
        assert!(matches!(own_slot(&realm, proto, "tagName"), Some(Slot::Member { .. })));
        let div_proto = realm.prototype("HTMLDivElement").unwrap();
        assert!(own_slot(&realm, div_proto, "tagName").is_none());
    }

    #[test]
    fn test_delete_schema_member_from_prototype() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let proto = realm.prototype("Event").unwrap();
        assert!(realm.delete(proto, "timeStamp").unwrap());
        assert!(!realm.has_own(proto, "timeStamp"));
        realm.set(proto, "timeStamp", Value::from(3)).unwrap();
        assert_eq!(realm.get(proto, "timeStamp").unwrap(), Value::from(3));
        assert!(realm.obj(proto).props.contains("timeStamp"));
    }

    #[test]
    fn test_array_length_write() {
        let mut realm = Realm::new(DocumentMode::IE10);
        let arr = realm.create_array(vec![Value::from(1), Value::from(2)]);
        realm.set(arr, "5", Value::from(6)).unwrap();
        assert_eq!(realm.get(arr, "length").unwrap(), Value::from(6));
        realm.set(arr, "length", Value::from(1)).unwrap();
        assert_eq!(realm.array_items(arr).unwrap().len(), 1);
    }

    #[test]
    fn test_non_configurable_delete() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let ctor = realm.interface_object("Element").unwrap();
        let err = realm.delete(ctor, "prototype").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NonConfigurable);
    }
}
