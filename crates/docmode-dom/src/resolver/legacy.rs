//! Flat host-object resolution of modes 5-8: schema members are own
//! properties of every instance, prototypes are detached bags of overrides.

use super::accessor_get;
use super::accessor_set;
use crate::error::{DomError, DomResult, ErrorKind};
use crate::mode::Feature;
use crate::object::{FunctionKind, NativeRole, ObjectData, Property, PropertyValue};
use crate::realm::Realm;
use crate::reflect;
use crate::value::{array_index, ObjectId, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Native method object
    Method,
    /// `f.call` / `f.apply`
    Helper,
    Prototype,
    Interface,
    Instance,
}

fn shape(realm: &Realm, id: ObjectId) -> Shape {
    match &realm.obj(id).data {
        ObjectData::Function(FunctionKind::CallHelper { .. }) => Shape::Helper,
        ObjectData::Function(_) => Shape::Method,
        ObjectData::Prototype => Shape::Prototype,
        ObjectData::Interface => Shape::Interface,
        _ => Shape::Instance,
    }
}

fn overlay(realm: &Realm, id: ObjectId, key: &str) -> Option<Value> {
    match realm.obj(id).props.get(key).map(|p| &p.value) {
        Some(PropertyValue::Data(v)) => Some(v.clone()),
        _ => None,
    }
}

/// Mode 8 keeps element expandos in the attribute store
fn uses_attribute_store(realm: &Realm, id: ObjectId) -> bool {
    realm.mode().supports(Feature::SharedAttributeStore) && realm.is_element(id)
}

fn list_item(realm: &Realm, id: ObjectId, key: &str) -> Option<Value> {
    let items = realm.list_items(id)?;
    let i = array_index(key)?;
    Some(items.get(i).map_or(Value::Undefined, |o| Value::Object(*o)))
}

pub(crate) fn get(realm: &mut Realm, id: ObjectId, key: &str) -> DomResult<Value> {
    match shape(realm, id) {
        Shape::Method => {
            if key == "call" || key == "apply" {
                let helper = FunctionKind::CallHelper {
                    target: id,
                    apply: key == "apply",
                };
                let f = realm.create_function_object(helper, key, 0);
                return Ok(Value::Object(f));
            }
            Ok(Value::Undefined)
        }
        Shape::Helper => Ok(Value::Undefined),
        Shape::Prototype => {
            if let Some(v) = overlay(realm, id, key) {
                return Ok(v);
            }
            let class = realm.obj(id).class;
            match realm.graph().find_member(class, key) {
                Some((iface, member)) if member.is_method() => {
                    let f = realm.member_function(id, iface, member, NativeRole::Method, None);
                    Ok(Value::Object(f))
                }
                _ => Ok(Value::Undefined),
            }
        }
        Shape::Interface => Ok(overlay(realm, id, key).unwrap_or_default()),
        Shape::Instance => instance_get(realm, id, key),
    }
}

fn instance_get(realm: &mut Realm, id: ObjectId, key: &str) -> DomResult<Value> {
    if let Some(v) = list_item(realm, id, key) {
        return Ok(v);
    }
    if uses_attribute_store(realm, id) && !reflect::is_claimed(realm, id, key) {
        if let Some(v) = reflect::expando_get(realm, id, key) {
            return Ok(v);
        }
    }
    if let Some(v) = overlay(realm, id, key) {
        return Ok(v);
    }

    let class = realm.obj(id).class;
    let proto = realm.obj(id).proto;
    if let Some((iface, member)) = realm.graph().find_member(class, key) {
        if member.is_method() {
            if let Some(v) = proto.and_then(|p| overlay(realm, p, member.name)) {
                return Ok(v);
            }
            let f = realm.member_function(id, iface, member, NativeRole::Method, Some(id));
            return Ok(Value::Object(f));
        }
        return accessor_get(realm, iface, member, &Value::Object(id));
    }

    if let Some(v) = realm.obj(id).named_items().and_then(|h| h.named_item(key)) {
        return Ok(v);
    }
    if id == realm.window() {
        if let Some(v) = realm.global_value(key) {
            return Ok(v);
        }
    }
    Ok(proto.and_then(|p| overlay(realm, p, key)).unwrap_or_default())
}

pub(crate) fn set(realm: &mut Realm, id: ObjectId, key: &str, value: Value) -> DomResult<()> {
    match shape(realm, id) {
        Shape::Method | Shape::Helper => Err(DomError::new(ErrorKind::InvalidProperty, key)),
        Shape::Prototype => {
            let class = realm.obj(id).class;
            match realm.graph().find_member(class, key) {
                Some((_, member)) if !member.is_method() => Ok(()),
                _ => {
                    realm.obj_mut(id).props.insert(key, Property::data(value));
                    Ok(())
                }
            }
        }
        Shape::Interface => {
            realm.obj_mut(id).props.insert(key, Property::data(value));
            Ok(())
        }
        Shape::Instance => instance_set(realm, id, key, value),
    }
}

fn instance_set(realm: &mut Realm, id: ObjectId, key: &str, value: Value) -> DomResult<()> {
    if list_item(realm, id, key).is_some() {
        return Ok(());
    }
    let class = realm.obj(id).class;
    if let Some((iface, member)) = realm.graph().find_member(class, key) {
        if member.is_method() {
            realm.obj_mut(id).props.insert(key, Property::data(value));
            return Ok(());
        }
        return accessor_set(realm, iface, member, &Value::Object(id), value);
    }
    if realm.obj(id).named_items().is_some() {
        let text = realm.to_string(&value)?;
        let stored = realm
            .obj_mut(id)
            .named_items_mut()
            .is_some_and(|h| h.set_named_item(key, &text));
        return if stored {
            Ok(())
        } else {
            Err(DomError::new(ErrorKind::InvalidArg, format!("cannot store {key}")))
        };
    }
    if uses_attribute_store(realm, id) && !reflect::is_claimed(realm, id, key) {
        reflect::expando_set(realm, id, key, value);
        return Ok(());
    }
    realm.obj_mut(id).props.insert(key, Property::data(value));
    Ok(())
}

pub(crate) fn delete(realm: &mut Realm, id: ObjectId, key: &str) -> DomResult<bool> {
    let refused = || DomError::new(ErrorKind::InvalidAction, key.to_string());
    let expando_delete = matches!(
        realm.model(),
        super::PropertyModel::Legacy { expando_delete: true }
    );
    if !expando_delete || id == realm.window() {
        return Err(refused());
    }
    match shape(realm, id) {
        Shape::Method | Shape::Helper => Err(refused()),
        Shape::Prototype | Shape::Interface => {
            if realm.obj_mut(id).props.remove(key).is_some() {
                return Ok(true);
            }
            let class = realm.obj(id).class;
            if realm.graph().find_member(class, key).is_some() {
                return Ok(true);
            }
            Err(refused())
        }
        Shape::Instance => {
            if list_item(realm, id, key).is_some() {
                return Ok(true);
            }
            if uses_attribute_store(realm, id)
                && !reflect::is_claimed(realm, id, key)
                && reflect::expando_delete(realm, id, key)
            {
                return Ok(true);
            }
            if realm.obj_mut(id).props.remove(key).is_some() {
                return Ok(true);
            }
            let class = realm.obj(id).class;
            if realm.graph().find_member(class, key).is_some() {
                return Ok(true);
            }
            let deleted = realm
                .obj_mut(id)
                .named_items_mut()
                .is_some_and(|h| h.delete_named_item(key));
            if deleted {
                return Ok(true);
            }
            Err(refused())
        }
    }
}

pub(crate) fn has_own(realm: &Realm, id: ObjectId, key: &str) -> bool {
    match shape(realm, id) {
        Shape::Method => key == "call" || key == "apply",
        Shape::Helper => false,
        Shape::Prototype => {
            overlay(realm, id, key).is_some() || realm.graph().find_member(realm.obj(id).class, key).is_some()
        }
        Shape::Interface => overlay(realm, id, key).is_some(),
        Shape::Instance => {
            if list_item(realm, id, key).is_some_and(|v| !v.is_undefined()) {
                return true;
            }
            if uses_attribute_store(realm, id)
                && !reflect::is_claimed(realm, id, key)
                && reflect::expando_get(realm, id, key).is_some()
            {
                return true;
            }
            let obj = realm.obj(id);
            obj.props.contains(key)
                || realm.graph().find_member(obj.class, key).is_some()
                || obj.named_items().is_some_and(|h| h.named_item(key).is_some())
        }
    }
}

pub(crate) fn has(realm: &Realm, id: ObjectId, key: &str) -> bool {
    if has_own(realm, id, key) {
        return true;
    }
    if shape(realm, id) != Shape::Instance {
        return false;
    }
    if id == realm.window() && realm.global_value(key).is_some() {
        return true;
    }
    realm
        .obj(id)
        .proto
        .is_some_and(|p| overlay(realm, p, key).is_some())
}

/// Own enumerable names: schema properties, overlay, expandos, named items
pub(crate) fn own_keys(realm: &Realm, id: ObjectId) -> Vec<String> {
    // legacy hosts end their for..in walk at themselves
    realm.for_in_keys(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DocumentMode;

    #[test]
    fn test_call_helpers_are_fresh() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let doc = realm.document();
        let f = realm.get(doc, "createElement").unwrap().as_object().unwrap();
        let a = realm.get(f, "call").unwrap();
        let b = realm.get(f, "call").unwrap();
        assert_ne!(a, b);
        assert_eq!(realm.get(f, "length").unwrap(), Value::Undefined);
        let helper = a.as_object().unwrap();
        assert!(!realm.has(helper, "call"));
        let err = realm.set(f, "apply", Value::from(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidProperty);
    }

    #[test]
    fn test_delete_refused_before_8() {
        let mut realm = Realm::new(DocumentMode::IE7);
        let body = realm.body().unwrap();
        realm.set(body, "prop1", Value::from(1)).unwrap();
        let err = realm.delete(body, "prop1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidAction);
    }

    #[test]
    fn test_window_delete_always_throws() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let window = realm.window();
        realm.set(window, "globalprop1", Value::from(1)).unwrap();
        assert!(realm.delete(window, "globalprop1").is_err());
        assert_eq!(realm.get(window, "globalprop1").unwrap(), Value::from(1));
    }

    #[test]
    fn test_prototype_override_reaches_instances() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let proto = realm.prototype("HTMLElement").unwrap();
        realm.set(proto, "winetestprop", Value::string("test")).unwrap();
        let image = realm.named_constructor("Image").unwrap();
        let img = realm.construct(&Value::Object(image), &[]).unwrap();
        let img_proto = realm.prototype("HTMLImageElement").unwrap();
        realm.set(img_proto, "winetestprop", Value::string("img")).unwrap();
        assert_eq!(realm.get_value(&img, "winetestprop").unwrap(), Value::string("img"));
    }
}
