//! Script Builtins
//!
//! `Object`, `Function` and `Array` natives shared by every mode.

use crate::error::{DomError, DomResult, ErrorKind};
use crate::graph::InterfaceId;
use crate::object::{FunctionKind, ObjectData, Property};
use crate::realm::{arg, Realm};
use crate::resolver::PropertyDescriptor;
use crate::value::{ObjectId, Value};

fn object_arg(args: &[Value], i: usize) -> DomResult<ObjectId> {
    arg(args, i)
        .as_object()
        .ok_or_else(|| DomError::kind(ErrorKind::ObjectExpected))
}

fn key_arg(realm: &mut Realm, args: &[Value], i: usize) -> DomResult<String> {
    realm.to_string(&arg(args, i))
}

fn function_this(realm: &Realm, this: &Value) -> DomResult<ObjectId> {
    match this.as_object() {
        Some(id) if realm.is_callable(this) => Ok(id),
        _ => Err(DomError::kind(ErrorKind::FunctionExpected)),
    }
}

fn array_this(realm: &Realm, this: &Value) -> DomResult<ObjectId> {
    match this.as_object() {
        Some(id) if realm.array_items(id).is_some() => Ok(id),
        _ => Err(DomError::kind(ErrorKind::ObjectExpected)),
    }
}

fn array_items_mut(realm: &mut Realm, id: ObjectId) -> Option<&mut Vec<Value>> {
    match &mut realm.obj_mut(id).data {
        ObjectData::Array(items) => Some(items),
        _ => None,
    }
}

fn string_array(realm: &mut Realm, keys: Vec<String>) -> Value {
    Value::Object(realm.create_array(keys.into_iter().map(Value::String).collect()))
}

/// Relative index argument of `splice` clamped into `0..=len`
fn relative_index(realm: &mut Realm, v: &Value, len: usize) -> DomResult<usize> {
    let n = realm.to_number(v)?;
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    let len_f = len as f64;
    let idx = if n < 0.0 { (len_f + n).max(0.0) } else { n.min(len_f) };
    Ok(idx as usize)
}

fn join(realm: &mut Realm, this: &Value, sep: &str) -> DomResult<Value> {
    let items = realm.array_like(this)?;
    let mut parts = Vec::with_capacity(items.len());
    for item in &items {
        parts.push(if item.is_nullish() {
            String::new()
        } else {
            realm.to_string(item)?
        });
    }
    Ok(Value::String(parts.join(sep)))
}

fn field(realm: &mut Realm, id: ObjectId, key: &str) -> DomResult<Option<Value>> {
    if realm.has(id, key) {
        realm.get(id, key).map(Some)
    } else {
        Ok(None)
    }
}

/// `ToPropertyDescriptor`
fn to_descriptor(realm: &mut Realm, v: &Value) -> DomResult<PropertyDescriptor> {
    let id = v
        .as_object()
        .ok_or_else(|| DomError::kind(ErrorKind::ObjectExpected))?;
    let mut desc = PropertyDescriptor {
        value: field(realm, id, "value")?,
        writable: field(realm, id, "writable")?.map(|v| v.truthy()),
        enumerable: field(realm, id, "enumerable")?.map(|v| v.truthy()),
        configurable: field(realm, id, "configurable")?.map(|v| v.truthy()),
        ..PropertyDescriptor::default()
    };
    for (key, slot) in [("get", &mut desc.get), ("set", &mut desc.set)] {
        if let Some(f) = field(realm, id, key)? {
            if !f.is_undefined() && !realm.is_callable(&f) {
                return Err(DomError::new(ErrorKind::FunctionExpected, key));
            }
            *slot = Some(f);
        }
    }
    Ok(desc)
}

/// `FromPropertyDescriptor`
fn from_descriptor(realm: &mut Realm, desc: PropertyDescriptor) -> Value {
    let obj = realm.create_object();
    let fields = [
        ("value", desc.value),
        ("writable", desc.writable.map(Value::Bool)),
        ("get", desc.get),
        ("set", desc.set),
        ("enumerable", desc.enumerable.map(Value::Bool)),
        ("configurable", desc.configurable.map(Value::Bool)),
    ];
    for (key, value) in fields {
        if let Some(v) = value {
            realm.obj_mut(obj).props.insert(key, Property::data(v));
        }
    }
    Value::Object(obj)
}

fn define_properties(realm: &mut Realm, target: ObjectId, props: &Value) -> DomResult<()> {
    let source = props
        .as_object()
        .ok_or_else(|| DomError::kind(ErrorKind::ObjectExpected))?;
    for key in realm.keys(source) {
        let raw = realm.get(source, &key)?;
        let desc = to_descriptor(realm, &raw)?;
        realm.define_property(target, &key, desc)?;
    }
    Ok(())
}

/// ES5 statics hung on the `Object` interface object
const OBJECT_STATICS: &[(&str, u8, u8)] = &[
    ("keys", 1, 9),
    ("getOwnPropertyNames", 1, 9),
    ("getOwnPropertyDescriptor", 2, 9),
    ("getPrototypeOf", 1, 9),
    ("setPrototypeOf", 2, 11),
    ("defineProperty", 3, 9),
    ("defineProperties", 2, 9),
    ("create", 2, 9),
    ("preventExtensions", 1, 9),
    ("isExtensible", 1, 9),
    ("freeze", 1, 9),
    ("isFrozen", 1, 9),
];

pub(crate) fn install(realm: &mut Realm) {
    install_object(realm);
    install_function(realm);
    install_array(realm);

    let Some(object) = realm.interface_object("Object") else {
        return;
    };
    let version = realm.mode_version();
    for &(name, length, since) in OBJECT_STATICS {
        if version < since {
            continue;
        }
        let f = realm.static_function(object, InterfaceId::OBJECT, name, length);
        realm.obj_mut(object).props.insert(name, Property::hidden(Value::Object(f)));
    }
}

fn install_object(realm: &mut Realm) {
    let natives = realm.natives_mut();

    natives.method("Object", "toString", |realm, this, _| {
        Ok(Value::String(realm.object_to_string(this)))
    });
    natives.method("Object", "toLocaleString", |realm, this, _| {
        realm.call_method(this, "toString", &[])
    });
    natives.method("Object", "valueOf", |_, this, _| Ok(this.clone()));
    natives.method("Object", "hasOwnProperty", |realm, this, args| {
        let key = key_arg(realm, args, 0)?;
        Ok(Value::Bool(match this {
            Value::Object(id) => realm.has_own(*id, &key),
            Value::String(s) => key == "length" || crate::value::array_index(&key).is_some_and(|i| i < s.chars().count()),
            _ => false,
        }))
    });
    natives.method("Object", "isPrototypeOf", |realm, this, args| {
        let (Some(proto), Some(mut cur)) = (this.as_object(), arg(args, 0).as_object()) else {
            return Ok(Value::Bool(false));
        };
        while let Some(p) = realm.get_prototype_of(cur) {
            if p == proto {
                return Ok(Value::Bool(true));
            }
            cur = p;
        }
        Ok(Value::Bool(false))
    });
    natives.method("Object", "propertyIsEnumerable", |realm, this, args| {
        let key = key_arg(realm, args, 0)?;
        let Some(id) = this.as_object() else {
            return Ok(Value::Bool(false));
        };
        if realm.is_legacy_host(id) {
            return Ok(Value::Bool(realm.has_own(id, &key)));
        }
        let desc = realm.get_own_property_descriptor(id, &key)?;
        Ok(Value::Bool(desc.and_then(|d| d.enumerable).unwrap_or(false)))
    });

    natives.getter("Object", "__proto__", |realm, this, _| {
        let proto = match this {
            Value::Object(id) => realm.get_prototype_of(*id),
            Value::String(_) => Some(realm.intrinsics().string_prototype),
            Value::Number(_) => Some(realm.intrinsics().number_prototype),
            Value::Bool(_) => Some(realm.intrinsics().boolean_prototype),
            Value::Undefined | Value::Null => return Err(DomError::kind(ErrorKind::ObjectExpected)),
        };
        Ok(proto.into())
    });
    natives.setter("Object", "__proto__", |realm, this, args| {
        let Some(id) = this.as_object() else {
            return Ok(Value::Undefined);
        };
        match arg(args, 0) {
            Value::Object(p) => realm.set_prototype_of(id, Some(p))?,
            Value::Null => realm.set_prototype_of(id, None)?,
            _ => {}
        }
        Ok(Value::Undefined)
    });

    natives.call("Object", |realm, _, args| match arg(args, 0) {
        v @ Value::Object(_) => Ok(v),
        _ => Ok(Value::Object(realm.create_object())),
    });
    natives.constructor("Object", |realm, _, args| match arg(args, 0) {
        v @ Value::Object(_) => Ok(v),
        _ => Ok(Value::Object(realm.create_object())),
    });

    natives.static_fn("Object", "keys", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        let keys = realm.keys(obj);
        Ok(string_array(realm, keys))
    });
    natives.static_fn("Object", "getOwnPropertyNames", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        let keys = realm.own_keys(obj);
        Ok(string_array(realm, keys))
    });
    natives.static_fn("Object", "getOwnPropertyDescriptor", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        let key = key_arg(realm, args, 1)?;
        match realm.get_own_property_descriptor(obj, &key)? {
            Some(desc) => Ok(from_descriptor(realm, desc)),
            None => Ok(Value::Undefined),
        }
    });
    natives.static_fn("Object", "getPrototypeOf", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        Ok(realm.get_prototype_of(obj).into())
    });
    natives.static_fn("Object", "setPrototypeOf", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        let proto = match arg(args, 1) {
            Value::Object(p) => Some(p),
            Value::Null => None,
            _ => return Err(DomError::kind(ErrorKind::ObjectExpected)),
        };
        realm.set_prototype_of(obj, proto)?;
        Ok(Value::Object(obj))
    });
    natives.static_fn("Object", "defineProperty", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        let key = key_arg(realm, args, 1)?;
        let desc = to_descriptor(realm, &arg(args, 2))?;
        realm.define_property(obj, &key, desc)?;
        Ok(Value::Object(obj))
    });
    natives.static_fn("Object", "defineProperties", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        define_properties(realm, obj, &arg(args, 1))?;
        Ok(Value::Object(obj))
    });
    natives.static_fn("Object", "create", |realm, _, args| {
        let proto = match arg(args, 0) {
            Value::Object(p) => Some(p),
            Value::Null => None,
            _ => return Err(DomError::kind(ErrorKind::ObjectExpected)),
        };
        let obj = realm.create_object_with_proto(proto);
        let props = arg(args, 1);
        if !props.is_undefined() {
            define_properties(realm, obj, &props)?;
        }
        Ok(Value::Object(obj))
    });
    natives.static_fn("Object", "preventExtensions", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        realm.prevent_extensions(obj);
        Ok(Value::Object(obj))
    });
    natives.static_fn("Object", "isExtensible", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        Ok(Value::Bool(realm.is_extensible(obj)))
    });
    natives.static_fn("Object", "freeze", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        realm.freeze(obj);
        Ok(Value::Object(obj))
    });
    natives.static_fn("Object", "isFrozen", |realm, _, args| {
        let obj = object_arg(args, 0)?;
        Ok(Value::Bool(realm.is_frozen(obj)))
    });
}

fn install_function(realm: &mut Realm) {
    let natives = realm.natives_mut();

    natives.method("Function", "toString", |realm, this, _| {
        let f = function_this(realm, this)?;
        if realm.is_legacy_host(f) {
            return Err(DomError::kind(ErrorKind::InvalidProperty));
        }
        realm
            .function_source(f)
            .map(Value::String)
            .ok_or_else(|| DomError::kind(ErrorKind::FunctionExpected))
    });
    natives.method("Function", "call", |realm, this, args| {
        function_this(realm, this)?;
        let rest = args.get(1..).unwrap_or_default();
        realm.call(this, arg(args, 0), rest)
    });
    natives.method("Function", "apply", |realm, this, args| {
        function_this(realm, this)?;
        let rest = realm.array_like(&arg(args, 1))?;
        realm.call(this, arg(args, 0), &rest)
    });
    natives.method("Function", "bind", |realm, this, args| {
        let target = function_this(realm, this)?;
        let bound = args.get(1..).unwrap_or_default().to_vec();
        let length = match realm.obj(target).fields.get("length").and_then(Value::as_number) {
            Some(n) => (n as usize).saturating_sub(bound.len()) as u32,
            None => 0,
        };
        let name = format!("bound {}", realm.function_name(target));
        let kind = FunctionKind::Bound {
            target,
            this: arg(args, 0),
            args: bound,
        };
        Ok(Value::Object(realm.create_function_object(kind, &name, length)))
    });
}

fn install_array(realm: &mut Realm) {
    let natives = realm.natives_mut();

    natives.method("Array", "toString", |realm, this, _| join(realm, this, ","));
    natives.method("Array", "join", |realm, this, args| {
        let sep = match arg(args, 0) {
            Value::Undefined => ",".to_string(),
            v => realm.to_string(&v)?,
        };
        join(realm, this, &sep)
    });
    natives.method("Array", "push", |realm, this, args| {
        let id = array_this(realm, this)?;
        let items = array_items_mut(realm, id).ok_or_else(|| DomError::kind(ErrorKind::ObjectExpected))?;
        items.extend_from_slice(args);
        Ok(Value::Number(items.len() as f64))
    });
    natives.method("Array", "pop", |realm, this, _| {
        let id = array_this(realm, this)?;
        Ok(array_items_mut(realm, id).and_then(Vec::pop).unwrap_or_default())
    });
    natives.method("Array", "splice", |realm, this, args| {
        let id = array_this(realm, this)?;
        let len = realm.array_items(id).map_or(0, <[_]>::len);
        let start = relative_index(realm, &arg(args, 0), len)?;
        let count = match args.get(1) {
            None => len - start,
            Some(v) => {
                let n = realm.to_number(v)?;
                if n.is_nan() || n <= 0.0 { 0 } else { (n as usize).min(len - start) }
            }
        };
        let inserted = args.get(2..).unwrap_or_default().to_vec();
        let removed: Vec<Value> = match array_items_mut(realm, id) {
            Some(items) => items.splice(start..start + count, inserted).collect(),
            None => Vec::new(),
        };
        Ok(Value::Object(realm.create_array(removed)))
    });

    let build = |realm: &mut Realm, args: &[Value]| -> DomResult<Value> {
        let items = match args {
            [Value::Number(n)] => {
                if *n < 0.0 || n.fract() != 0.0 || *n > u32::MAX as f64 {
                    return Err(DomError::new(ErrorKind::InvalidArg, "array length"));
                }
                vec![Value::Undefined; *n as usize]
            }
            _ => args.to_vec(),
        };
        Ok(Value::Object(realm.create_array(items)))
    };
    natives.call("Array", move |realm, _, args| build(realm, args));
    natives.constructor("Array", move |realm, _, args| build(realm, args));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::DocumentMode;

    fn object_ctor(realm: &Realm) -> Value {
        Value::Object(realm.interface_object("Object").unwrap())
    }

    #[test]
    fn test_statics_only_from_9() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let object = object_ctor(&realm);
        assert_eq!(realm.get_value(&object, "keys").unwrap(), Value::Undefined);

        let mut realm = Realm::new(DocumentMode::IE9);
        let object = object_ctor(&realm);
        let keys = realm.get_value(&object, "keys").unwrap();
        assert_eq!(realm.type_of(&keys), "function");
        assert!(!realm.keys(object.as_object().unwrap()).contains(&"keys".to_string()));
        assert_eq!(realm.get_value(&object, "setPrototypeOf").unwrap(), Value::Undefined);
    }

    #[test]
    fn test_keys_skip_non_enumerable() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let object = object_ctor(&realm);
        let obj = realm.create_object();
        realm.set(obj, "a", Value::from(1)).unwrap();
        realm
            .define_property(obj, "b", PropertyDescriptor::data(Value::from(2), true, false, true))
            .unwrap();

        let keys = realm.call_method(&object, "keys", &[Value::Object(obj)]).unwrap();
        let keys = realm.array_items(keys.as_object().unwrap()).unwrap().to_vec();
        assert_eq!(keys, vec![Value::string("a")]);

        let names = realm
            .call_method(&object, "getOwnPropertyNames", &[Value::Object(obj)])
            .unwrap();
        assert_eq!(realm.array_items(names.as_object().unwrap()).unwrap().len(), 2);
    }

    #[test]
    fn test_define_property_via_descriptor_object() {
        let mut realm = Realm::new(DocumentMode::IE10);
        let object = object_ctor(&realm);
        let obj = realm.create_object();
        let desc = realm.create_object();
        realm.set(desc, "value", Value::from(5)).unwrap();
        realm
            .call_method(&object, "defineProperty", &[Value::Object(obj), Value::string("x"), Value::Object(desc)])
            .unwrap();
        assert_eq!(realm.get(obj, "x").unwrap(), Value::from(5));
        let err = realm.delete(obj, "x").unwrap_err();
        assert_eq!(err.kind, ErrorKind::NonConfigurable);

        realm.call_method(&object, "freeze", &[Value::Object(obj)]).unwrap();
        let frozen = realm.call_method(&object, "isFrozen", &[Value::Object(obj)]).unwrap();
        assert_eq!(frozen, Value::Bool(true));
    }

    #[test]
    fn test_proto_accessor_from_11() {
        let mut realm = Realm::new(DocumentMode::IE10);
        let obj = realm.create_object();
        assert_eq!(realm.get(obj, "__proto__").unwrap(), Value::Undefined);

        let mut realm = Realm::new(DocumentMode::IE11);
        let obj = realm.create_object();
        let proto = Value::Object(realm.intrinsics().object_prototype);
        assert_eq!(realm.get(obj, "__proto__").unwrap(), proto);

        let a = realm.create_object();
        let b = realm.create_object_with_proto(Some(a));
        let err = realm.set(a, "__proto__", Value::Object(b)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CyclicProto);
    }

    #[test]
    fn test_function_call_apply_bind() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let f = realm.create_native_closure("f", 2, |realm, this, args| {
            let sum = args.iter().filter_map(Value::as_number).sum::<f64>();
            let base = match this {
                Value::Object(id) => realm.get(id, "base")?.as_number().unwrap_or(0.0),
                _ => 0.0,
            };
            Ok(Value::Number(base + sum))
        });
        let f = Value::Object(f);
        let this = realm.create_object();
        realm.set(this, "base", Value::from(10)).unwrap();

        let r = realm
            .call_method(&f, "call", &[Value::Object(this), Value::from(1), Value::from(2)])
            .unwrap();
        assert_eq!(r, Value::from(13));

        let args = realm.create_array(vec![Value::from(4)]);
        let r = realm
            .call_method(&f, "apply", &[Value::Object(this), Value::Object(args)])
            .unwrap();
        assert_eq!(r, Value::from(14));

        let bound = realm
            .call_method(&f, "bind", &[Value::Object(this), Value::from(100)])
            .unwrap();
        assert_eq!(realm.get_value(&bound, "length").unwrap(), Value::from(1));
        let r = realm.call(&bound, Value::Undefined, &[Value::from(1)]).unwrap();
        assert_eq!(r, Value::from(111));
    }

    #[test]
    fn test_array_methods() {
        let mut realm = Realm::new(DocumentMode::IE8);
        let arr = Value::Object(realm.create_array(vec![Value::from(1), Value::Null]));
        assert_eq!(realm.to_string(&arr).unwrap(), "1,");
        assert_eq!(realm.call_method(&arr, "push", &[Value::from(3)]).unwrap(), Value::from(3));
        assert_eq!(
            realm.call_method(&arr, "join", &[Value::string("-")]).unwrap(),
            Value::string("1--3")
        );
        assert_eq!(realm.call_method(&arr, "pop", &[]).unwrap(), Value::from(3));

        let removed = realm
            .call_method(&arr, "splice", &[Value::from(0), Value::from(1), Value::string("x")])
            .unwrap();
        assert_eq!(realm.to_string(&removed).unwrap(), "1");
        assert_eq!(realm.to_string(&arr).unwrap(), "x,");
    }

    #[test]
    fn test_object_prototype_to_string_on_hosts() {
        let mut realm = Realm::new(DocumentMode::IE9);
        let proto = Value::Object(realm.intrinsics().object_prototype);
        let to_string = realm.get_value(&proto, "toString").unwrap();
        let doc = Value::Object(realm.document());
        let r = realm.call(&to_string, doc, &[]).unwrap();
        assert_eq!(r, Value::string("[object Document]"));
    }
}
